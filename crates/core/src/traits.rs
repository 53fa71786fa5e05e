use crate::error::AmpError;
use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

/// Trait for the BLE resolution service that maps a hardware address to a
/// connectable device reference.
///
/// Injected into the session rather than reached through a process-wide
/// singleton, so tests can substitute a scripted stack.
#[async_trait]
pub trait BleResolver: Send + Sync {
    /// Look up a connectable device for `address`.
    ///
    /// `Ok(None)` means the stack does not currently know the device; a
    /// backend failure while asking the stack is an error.
    async fn resolve(&self, address: &str) -> Result<Option<Box<dyn BleDeviceRef>>, AmpError>;
}

/// A connectable device reference returned by a [`BleResolver`].
#[async_trait]
pub trait BleDeviceRef: Send + Sync {
    /// Open a GATT connection, bounded by `timeout`.
    async fn connect(&self, timeout: Duration) -> Result<Box<dyn GattLink>, AmpError>;
}

/// An open GATT connection to one device.
///
/// A link may silently go stale at the transport level after a successful
/// connect; callers must re-check [`GattLink::is_connected`] before reuse.
#[async_trait]
pub trait GattLink: Send + Sync {
    /// Write `payload` to the characteristic identified by `uuid`.
    async fn write_characteristic(&self, uuid: Uuid, payload: &[u8]) -> Result<(), AmpError>;

    /// Whether the stack still considers this link connected.
    async fn is_connected(&self) -> bool;

    /// Close the link.
    async fn disconnect(&self) -> Result<(), AmpError>;
}
