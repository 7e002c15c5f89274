//! Acquire one wavefront from the first available instrument and print a
//! coarse height map to stdout.
//!
//! Run with: cargo run --example acquire_wavefront
//! (add --features wfs_hardware to use real hardware)

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use wfs_driver::camera::{CameraConfig, WfsCamera};
use wfs_driver::WfsSession;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let session = WfsSession::open(0)?;
    println!(
        "Opened {} (SN {})",
        session.info().instrument_name,
        session.info().serial_number
    );

    let mut camera = WfsCamera::new(session);

    // Close the session on every exit path, including acquisition failure.
    let result = run(&mut camera);
    camera.close();
    result
}

fn run(camera: &mut WfsCamera) -> Result<()> {
    camera.configure(Some(CameraConfig::default()))?;
    let wavefront = camera.acquire_wavefront()?;

    println!(
        "Wavefront: {} x {} spots (um heights)",
        wavefront.cols(),
        wavefront.rows()
    );
    for row in 0..wavefront.rows() {
        let line: String = wavefront
            .row(row)
            .unwrap_or(&[])
            .iter()
            .map(|h| match h {
                h if *h <= 0.0 => ' ',
                h if *h < 0.1 => '.',
                h if *h < 0.3 => '+',
                _ => '#',
            })
            .collect();
        println!("{line}");
    }
    Ok(())
}
