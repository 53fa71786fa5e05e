//! btleplug-backed implementation of the core BLE capability traits.
//!
//! This is the production stack behind [`crate::session::AmpSession`]; tests
//! substitute scripted fakes instead.

use async_trait::async_trait;
use btleplug::api::{Central, CharPropFlags, Manager as _, Peripheral as _, ScanFilter, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral};
use sinilink_core::{AmpError, BleDeviceRef, BleResolver, GattLink};
use std::time::Duration;
use uuid::Uuid;

/// Resolver over the first available BLE adapter.
pub struct BtleplugResolver {
    adapter: Adapter,
    scan_timeout: Duration,
}

impl BtleplugResolver {
    /// Create a resolver on the first adapter the OS exposes.
    pub async fn new() -> Result<Self, AmpError> {
        let manager = Manager::new().await.map_err(backend_err)?;
        let adapter = manager
            .adapters()
            .await
            .map_err(backend_err)?
            .into_iter()
            .next()
            .ok_or_else(|| AmpError::Backend("no BLE adapter available".to_string()))?;
        Ok(Self {
            adapter,
            scan_timeout: Duration::from_secs(2),
        })
    }

    /// How long to scan when an address is not already in the adapter's
    /// peripheral cache.
    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    async fn find_peripheral(&self, address: &str) -> Result<Option<Peripheral>, AmpError> {
        for peripheral in self.adapter.peripherals().await.map_err(backend_err)? {
            if peripheral.address().to_string().eq_ignore_ascii_case(address) {
                return Ok(Some(peripheral));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl BleResolver for BtleplugResolver {
    async fn resolve(&self, address: &str) -> Result<Option<Box<dyn BleDeviceRef>>, AmpError> {
        if let Some(peripheral) = self.find_peripheral(address).await? {
            return Ok(Some(Box::new(BtleplugDeviceRef { peripheral })));
        }

        // Not in the adapter cache; scan briefly and look again.
        tracing::debug!("{address} not cached, scanning for {:?}", self.scan_timeout);
        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(backend_err)?;
        tokio::time::sleep(self.scan_timeout).await;
        if let Err(e) = self.adapter.stop_scan().await {
            tracing::debug!("ignoring stop_scan error: {e}");
        }

        Ok(self
            .find_peripheral(address)
            .await?
            .map(|peripheral| Box::new(BtleplugDeviceRef { peripheral }) as Box<dyn BleDeviceRef>))
    }
}

struct BtleplugDeviceRef {
    peripheral: Peripheral,
}

#[async_trait]
impl BleDeviceRef for BtleplugDeviceRef {
    async fn connect(&self, timeout: Duration) -> Result<Box<dyn GattLink>, AmpError> {
        let address = self.peripheral.address().to_string();
        match tokio::time::timeout(timeout, self.peripheral.connect()).await {
            Err(_) => Err(AmpError::ConnectTimeout { address, timeout }),
            Ok(Err(e)) => Err(AmpError::ConnectFailed {
                address,
                reason: e.to_string(),
            }),
            Ok(Ok(())) => {
                // Characteristic handles are only valid after discovery.
                self.peripheral
                    .discover_services()
                    .await
                    .map_err(|e| AmpError::ConnectFailed {
                        address,
                        reason: format!("service discovery failed: {e}"),
                    })?;
                Ok(Box::new(BtleplugLink {
                    peripheral: self.peripheral.clone(),
                }))
            }
        }
    }
}

struct BtleplugLink {
    peripheral: Peripheral,
}

#[async_trait]
impl GattLink for BtleplugLink {
    async fn write_characteristic(&self, uuid: Uuid, payload: &[u8]) -> Result<(), AmpError> {
        let characteristic = self
            .peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == uuid)
            .ok_or_else(|| AmpError::WriteFailed {
                reason: format!("characteristic {uuid} not found on device"),
            })?;
        let write_type = if characteristic.properties.contains(CharPropFlags::WRITE) {
            WriteType::WithResponse
        } else {
            WriteType::WithoutResponse
        };
        self.peripheral
            .write(&characteristic, payload, write_type)
            .await
            .map_err(|e| AmpError::WriteFailed {
                reason: e.to_string(),
            })
    }

    async fn is_connected(&self) -> bool {
        self.peripheral.is_connected().await.unwrap_or(false)
    }

    async fn disconnect(&self) -> Result<(), AmpError> {
        self.peripheral.disconnect().await.map_err(backend_err)
    }
}

fn backend_err(e: btleplug::Error) -> AmpError {
    AmpError::Backend(e.to_string())
}
