//! Connection lifecycle and command delivery for one amplifier.
//!
//! An [`AmpSession`] owns at most one GATT link at a time and pushes one
//! frame at a time through it. Power and volume are write-through caches:
//! the amplifier offers no readback, so the session remembers what it last
//! commanded successfully and nothing else.

use crate::protocol;
use serde::{Deserialize, Serialize};
use sinilink_core::{AmpError, BleResolver, GattLink, Source};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Tunables for the connect path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Upper bound on one GATT connect attempt.
    pub connect_timeout: Duration,
    /// Pause after a reported connect before the link is trusted; some BLE
    /// stacks report connected before writes are reliably accepted.
    pub settle_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(20),
            settle_delay: Duration::from_secs(1),
        }
    }
}

impl SessionConfig {
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }
}

/// Mutable session state. Guarded by one async mutex, which also serializes
/// sends: concurrent writes to the same GATT handle are not safe.
struct Inner {
    link: Option<Box<dyn GattLink>>,
    power_on: bool,
    /// Last successfully commanded intensity (0-255), device units.
    volume: Option<u8>,
    muted: bool,
}

/// One managed connection and command interface to a single amplifier.
pub struct AmpSession {
    address: String,
    resolver: Arc<dyn BleResolver>,
    config: SessionConfig,
    inner: Mutex<Inner>,
}

impl AmpSession {
    /// Create a session for the amplifier at `address`.
    ///
    /// No connection is opened here; the link is established lazily on the
    /// first command (or an explicit [`AmpSession::connect`]).
    pub fn new(address: impl Into<String>, resolver: Arc<dyn BleResolver>) -> Self {
        Self::with_config(address, resolver, SessionConfig::default())
    }

    pub fn with_config(
        address: impl Into<String>,
        resolver: Arc<dyn BleResolver>,
        config: SessionConfig,
    ) -> Self {
        Self {
            address: address.into(),
            resolver,
            config,
            inner: Mutex::new(Inner {
                link: None,
                power_on: false,
                volume: None,
                muted: false,
            }),
        }
    }

    /// Hardware address this session controls.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Last commanded power state.
    pub async fn is_on(&self) -> bool {
        self.inner.lock().await.power_on
    }

    /// Last commanded volume intensity (0-255), if any was ever set.
    pub async fn volume(&self) -> Option<u8> {
        self.inner.lock().await.volume
    }

    pub async fn is_muted(&self) -> bool {
        self.inner.lock().await.muted
    }

    /// Turn the amplifier on, restoring the last commanded volume (or the
    /// device default when none is known).
    pub async fn turn_on(&self) -> Result<(), AmpError> {
        let mut inner = self.inner.lock().await;
        let bucket = inner
            .volume
            .map(protocol::volume_bucket)
            .unwrap_or(protocol::DEFAULT_VOLUME_BUCKET);
        let frame = protocol::power_on_frame(bucket);
        self.send(&mut inner, &frame).await?;
        inner.power_on = true;
        Ok(())
    }

    /// Turn the amplifier off.
    pub async fn turn_off(&self) -> Result<(), AmpError> {
        let mut inner = self.inner.lock().await;
        let frame = protocol::power_off_frame();
        self.send(&mut inner, &frame).await?;
        inner.power_on = false;
        Ok(())
    }

    /// Set the output volume from a host intensity (0-255).
    pub async fn set_volume(&self, intensity: u8) -> Result<(), AmpError> {
        let mut inner = self.inner.lock().await;
        let frame = protocol::volume_frame(intensity);
        self.send(&mut inner, &frame).await?;
        inner.volume = Some(intensity);
        Ok(())
    }

    /// Set the output volume from a host level in `0.0..=1.0`.
    pub async fn set_volume_level(&self, level: f64) -> Result<(), AmpError> {
        if !level.is_finite() || !(0.0..=1.0).contains(&level) {
            return Err(AmpError::InvalidParameter(format!(
                "volume level {level} outside 0.0..=1.0"
            )));
        }
        self.set_volume((level * 255.0).round() as u8).await
    }

    /// Mute or unmute. Muting commands volume 0 without forgetting the
    /// cached volume; unmuting re-commands the cached volume.
    pub async fn set_mute(&self, muted: bool) -> Result<(), AmpError> {
        let mut inner = self.inner.lock().await;
        let frame = if muted {
            protocol::volume_frame(0)
        } else {
            match inner.volume {
                Some(intensity) => protocol::volume_frame(intensity),
                None => protocol::power_on_frame(protocol::DEFAULT_VOLUME_BUCKET),
            }
        };
        self.send(&mut inner, &frame).await?;
        inner.muted = muted;
        Ok(())
    }

    /// Switch the input source. Does not touch the power/volume cache.
    pub async fn select_source(&self, source: Source) -> Result<(), AmpError> {
        let mut inner = self.inner.lock().await;
        self.send(&mut inner, protocol::source_frame(source)).await
    }

    /// Open the connection eagerly instead of on the first command.
    pub async fn connect(&self) -> Result<(), AmpError> {
        let mut inner = self.inner.lock().await;
        self.ensure_connected(&mut inner).await
    }

    /// Best-effort graceful close. Transport errors during close are
    /// swallowed; the link is cleared regardless.
    pub async fn disconnect(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(link) = inner.link.take() {
            match link.disconnect().await {
                Ok(()) => tracing::info!("disconnected from {}", self.address),
                Err(e) => tracing::warn!("error disconnecting from {}: {e}", self.address),
            }
        }
    }

    /// Deliver one frame, with at most one reconnect-and-retry cycle.
    ///
    /// Bounded at 2 connects + 2 writes per call: a retry storm against an
    /// absent peripheral helps nobody.
    async fn send(&self, inner: &mut Inner, frame: &[u8]) -> Result<(), AmpError> {
        tracing::debug!("sending frame {} to {}", hex::encode(frame), self.address);
        self.ensure_connected(inner).await?;

        let first = Self::write(inner, frame).await;
        let Err(write_err) = first else {
            return Ok(());
        };

        tracing::warn!(
            "write to {} failed: {write_err}; reconnecting for one retry",
            self.address
        );
        Self::teardown(inner).await;
        if let Err(connect_err) = self.open_link(inner).await {
            tracing::error!(
                "reconnect to {} failed after write error: {connect_err}",
                self.address
            );
            return Err(connect_err);
        }

        Self::write(inner, frame).await.map_err(|retry_err| {
            tracing::error!("retried write to {} failed: {retry_err}", self.address);
            retry_err
        })
    }

    async fn write(inner: &Inner, frame: &[u8]) -> Result<(), AmpError> {
        match &inner.link {
            Some(link) => {
                link.write_characteristic(protocol::WRITE_CHARACTERISTIC_UUID, frame)
                    .await
            }
            None => Err(AmpError::WriteFailed {
                reason: "no active connection".to_string(),
            }),
        }
    }

    /// Make sure a live link exists, revalidating any held one: a link can
    /// silently go stale at the transport level after a successful connect.
    async fn ensure_connected(&self, inner: &mut Inner) -> Result<(), AmpError> {
        if let Some(link) = &inner.link {
            if link.is_connected().await {
                return Ok(());
            }
            tracing::debug!("link to {} went stale, reconnecting", self.address);
            Self::teardown(inner).await;
        }
        self.open_link(inner).await
    }

    /// Resolve + connect + settle. Any failure tears down whatever was
    /// partially opened and leaves the session disconnected.
    async fn open_link(&self, inner: &mut Inner) -> Result<(), AmpError> {
        tracing::debug!("connecting to {}", self.address);
        let device = match self.resolver.resolve(&self.address).await {
            Ok(Some(device)) => device,
            Ok(None) => {
                tracing::error!("device {} not found by the BLE stack", self.address);
                return Err(AmpError::ResolutionFailed {
                    address: self.address.clone(),
                });
            }
            Err(e) => {
                tracing::error!("resolving {} failed: {e}", self.address);
                return Err(e);
            }
        };

        let link = device.connect(self.config.connect_timeout).await?;
        tokio::time::sleep(self.config.settle_delay).await;

        if !link.is_connected().await {
            if let Err(e) = link.disconnect().await {
                tracing::debug!("ignoring teardown error for {}: {e}", self.address);
            }
            tracing::error!(
                "connect attempt to {} finished, but device is not connected",
                self.address
            );
            return Err(AmpError::ConnectFailed {
                address: self.address.clone(),
                reason: "stack reports not connected after connect".to_string(),
            });
        }

        tracing::info!("connected to {}", self.address);
        inner.link = Some(link);
        Ok(())
    }

    /// Drop the held link, swallowing transport errors during close.
    async fn teardown(inner: &mut Inner) {
        if let Some(link) = inner.link.take() {
            if let Err(e) = link.disconnect().await {
                tracing::debug!("ignoring teardown error: {e}");
            }
        }
    }
}

impl std::fmt::Debug for AmpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmpSession")
            .field("address", &self.address)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
