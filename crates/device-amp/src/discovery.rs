use anyhow::{Context, Result};
use btleplug::api::{Central, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::Manager;
use sinilink_core::{matches_device_name, DiscoveredAmp};
use std::time::Duration;

/// Discover Sinilink amplifiers by scanning for their advertised name prefix.
///
/// Scans on the first available adapter for `timeout`, then returns every
/// peripheral whose local name matches, de-duplicated by address.
pub async fn discover_amps(timeout: Duration) -> Result<Vec<DiscoveredAmp>> {
    tracing::info!("starting BLE scan for amplifiers ({timeout:?})");

    let manager = Manager::new().await.context("failed to create BLE manager")?;
    let adapter = manager
        .adapters()
        .await
        .context("failed to list BLE adapters")?
        .into_iter()
        .next()
        .context("no BLE adapter available")?;

    adapter
        .start_scan(ScanFilter::default())
        .await
        .context("failed to start BLE scan")?;
    tokio::time::sleep(timeout).await;
    adapter.stop_scan().await.ok();

    let mut discovered: Vec<DiscoveredAmp> = Vec::new();
    for peripheral in adapter
        .peripherals()
        .await
        .context("failed to list scanned peripherals")?
    {
        let Ok(Some(props)) = peripheral.properties().await else {
            continue;
        };
        let Some(name) = props.local_name else {
            continue;
        };
        if !matches_device_name(&name) {
            continue;
        }

        let address = props.address.to_string();
        if discovered.iter().any(|amp| amp.address == address) {
            continue;
        }

        tracing::debug!("discovered amplifier {name} at {address} (rssi {:?})", props.rssi);
        discovered.push(DiscoveredAmp {
            name,
            address,
            rssi: props.rssi,
        });
    }

    tracing::info!("scan complete, found {} amplifier(s)", discovered.len());
    Ok(discovered)
}

/// Quick discovery with a 3 second scan.
pub async fn discover_amps_quick() -> Result<Vec<DiscoveredAmp>> {
    discover_amps(Duration::from_secs(3)).await
}
