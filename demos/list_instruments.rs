//! List all attached WFS instruments.
//!
//! Run with: cargo run --example list_instruments
//! (add --features wfs_hardware to query real hardware)

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use wfs_driver::WfsSession;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let instruments = WfsSession::instruments()?;
    if instruments.is_empty() {
        println!("No WFS instruments detected");
        return Ok(());
    }

    println!("=== WFS Instruments ===\n");
    for (index, info) in instruments.iter().enumerate() {
        println!(
            "[{}] {} (SN {}) device_id={} resource={} {}",
            index,
            info.instrument_name,
            info.serial_number,
            info.device_id,
            info.resource_name,
            if info.in_use { "IN USE" } else { "available" },
        );
    }
    Ok(())
}
