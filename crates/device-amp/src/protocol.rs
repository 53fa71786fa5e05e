//! Wire protocol for Sinilink BLE amplifiers.
//!
//! Frames are written to a single vendor characteristic. The power/volume
//! frame is a fixed 16-byte layout: a 3-byte header, one command byte (the
//! volume bucket), 10 zero parameter bytes, a suffix byte derived from the
//! command byte, and a trailing CRC-8/MAXIM checksum over everything before
//! it. Source selection uses short pre-baked literals instead.
//!
//! The hardware is byte-exact about all of this; a frame that differs in any
//! position is silently ignored by the amplifier.

use crc::{Crc, CRC_8_MAXIM_DOW};
use sinilink_core::Source;
use uuid::Uuid;

/// Vendor write characteristic all commands go to.
pub const WRITE_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x0000ae10_0000_1000_8000_00805f9b34fb);

/// Header of every power/volume frame.
pub const FRAME_HEADER: [u8; 3] = [0x7e, 0x0f, 0x1d];

/// Bucket restored by a power-on when no volume was ever commanded
/// (intensity ~35 of 255).
pub const DEFAULT_VOLUME_BUCKET: u8 = 7;

/// Zero-padded parameter block length in the power/volume frame.
const PARAM_PADDING: usize = 10;

/// The suffix byte is `command + 0xAA`; bucket 0 (power off) yields the
/// fixed `0xAA` the vendor app sends.
const SUFFIX_BASE: u8 = 0xaa;

/// Source-select literals, checksum byte pre-baked. These are not CRC-8
/// framed; the trailing byte is an additive checksum the vendor app ships
/// as-is, so they must never be recomputed.
const AUX_FRAME: [u8; 5] = [0x7e, 0x05, 0x16, 0x00, 0x99];
const BLUETOOTH_FRAME: [u8; 5] = [0x7e, 0x05, 0x14, 0x00, 0x97];

/// CRC-8/MAXIM (poly 0x31 reflected, init 0x00, xorout 0x00), the
/// Maxim/Dallas 1-Wire variant this device family checks frames with.
const CRC8: Crc<u8> = Crc::<u8>::new(&CRC_8_MAXIM_DOW);

/// Map a host intensity (0-255) to the device's volume bucket (0-51).
pub fn volume_bucket(intensity: u8) -> u8 {
    intensity / 5
}

/// Build the 16-byte power/volume frame for a bucket.
fn command_frame(bucket: u8) -> Vec<u8> {
    let mut frame = Vec::with_capacity(FRAME_HEADER.len() + 2 + PARAM_PADDING + 1);
    frame.extend_from_slice(&FRAME_HEADER);
    frame.push(bucket);
    frame.extend_from_slice(&[0u8; PARAM_PADDING]);
    frame.push(bucket.wrapping_add(SUFFIX_BASE));
    frame.push(CRC8.checksum(&frame));
    frame
}

/// Frame that sets the output volume from a host intensity.
pub fn volume_frame(intensity: u8) -> Vec<u8> {
    command_frame(volume_bucket(intensity))
}

/// Frame that powers the amplifier on, restoring `last_bucket`.
///
/// The device has no discrete power-on opcode; turning on is commanding a
/// non-zero volume.
pub fn power_on_frame(last_bucket: u8) -> Vec<u8> {
    command_frame(last_bucket)
}

/// Frame that powers the amplifier off (bucket 0).
pub fn power_off_frame() -> Vec<u8> {
    command_frame(0)
}

/// Frame that switches the input source.
pub fn source_frame(source: Source) -> &'static [u8] {
    match source {
        Source::Aux => &AUX_FRAME,
        Source::Bluetooth => &BLUETOOTH_FRAME,
    }
}
