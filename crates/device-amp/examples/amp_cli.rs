/// Example: discover a Sinilink amplifier and drive it
///
/// Usage: cargo run -p sinilink-device-amp --example amp_cli [ADDRESS]
///
/// Without an address this scans for the first advertised "Sinilink-APP"
/// device, then powers it on, sets a moderate volume, and switches the
/// input to Bluetooth.
use anyhow::{Context, Result};
use sinilink_device_amp::{discover_amps, AmpSession, BtleplugResolver, Source};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let address = match std::env::args().nth(1) {
        Some(address) => address,
        None => {
            println!("Scanning for amplifiers...");
            let amps = discover_amps(Duration::from_secs(5)).await?;
            let amp = amps.first().context("no Sinilink amplifier found")?;
            println!("Found {} at {}", amp.name, amp.address);
            amp.address.clone()
        }
    };

    let resolver = Arc::new(BtleplugResolver::new().await?);
    let session = AmpSession::new(address, resolver);

    println!("Powering on...");
    session.turn_on().await?;

    println!("Setting volume to 40%...");
    session.set_volume_level(0.4).await?;

    println!("Switching input to Bluetooth...");
    session.select_source(Source::Bluetooth).await?;

    session.disconnect().await;
    println!("Done.");
    Ok(())
}
