//! Sinilink BLE amplifier control.
//!
//! Drives a Sinilink audio amplifier over its vendor GATT characteristic:
//! power, volume, and input-source selection. The amplifier offers no state
//! readback, so the session keeps a write-through cache of what it last
//! commanded successfully.
//!
//! - [`protocol`] — byte-exact frame construction with CRC-8/MAXIM checksums
//! - [`session`] — connection lifecycle and the bounded send-with-retry loop
//! - [`discovery`] — BLE scan filtered to the amplifier's advertised name
//! - [`transport`] — btleplug implementation of the injected BLE traits

pub mod discovery;
pub mod protocol;
pub mod session;
pub mod transport;

#[cfg(test)]
mod test_utils;

pub use discovery::{discover_amps, discover_amps_quick};
pub use protocol::WRITE_CHARACTERISTIC_UUID;
pub use session::{AmpSession, SessionConfig};
pub use transport::BtleplugResolver;

// Re-export the domain types callers need alongside the session.
pub use sinilink_core::{AmpError, DiscoveredAmp, Source, DEVICE_NAME_PREFIX};
