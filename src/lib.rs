//! Thorlabs WFS Shack-Hartmann Wavefront Sensor Driver
//!
//! Layered wrapper over the vendor's closed-source instrument library:
//! - `wfs-sys`: raw foreign function declarations matching the vendor ABI
//! - [`WfsSession`]: one open instrument, discovery/lifecycle and the fixed
//!   acquisition pipeline
//! - [`camera::WfsCamera`]: declarative configuration plus one-call
//!   wavefront acquisition
//!
//! All optics processing (spot detection, centroiding, deviation and
//! wavefront reconstruction) happens inside the vendor library; this crate
//! sequences the calls, marshals the buffers and turns status codes into
//! typed errors.
//!
//! Everything is synchronous and blocking. The vendor driver serializes
//! access per instrument itself; a session owns exactly one handle.
//!
//! Hardware access requires the `wfs_hardware` feature and an installed
//! Thorlabs WFS SDK. The default build is mock mode: a simulated instrument
//! backs the full API so orchestration can be tested anywhere.

pub mod camera;
pub mod components;
pub mod error;

pub use crate::components::acquisition::{AutoExposure, Wavefront};
pub use crate::components::connection::InstrumentInfo;
pub use crate::components::features::{
    DriverRevision, ExposureRange, HighspeedOptions, InstrumentIdentity, PixelFormat,
    PupilGeometry, ReferencePlane, SpotGrid, WavefrontType,
};
pub use crate::error::{WfsError, WfsResult};

use crate::components::acquisition::WfsAcquisition;
use crate::components::connection::WfsConnection;
use crate::components::features::WfsFeatures;

/// One open WFS instrument session.
///
/// Owns the native handle from open to close; dropping the session closes
/// it. The session remembers the spot grid reported by the last
/// [`configure_cam`](Self::configure_cam) call, which bounds every wavefront
/// array produced afterwards. Selecting a different microlens array
/// invalidates the remembered grid, and wavefront calculation refuses to run
/// until the camera is reconfigured; the alternative is silently mis-cropped
/// output.
#[derive(Debug)]
pub struct WfsSession {
    connection: WfsConnection,
    info: InstrumentInfo,
    spots: Option<SpotGrid>,
}

impl WfsSession {
    /// Enumerate all attached WFS instruments.
    ///
    /// Re-queries the driver every call; descriptors are valid only until
    /// the next enumeration.
    pub fn instruments() -> WfsResult<Vec<InstrumentInfo>> {
        WfsConnection::new().list_instruments()
    }

    /// Number of attached WFS instruments.
    pub fn instrument_count() -> WfsResult<usize> {
        Ok(Self::instruments()?.len())
    }

    /// Open the instrument at the given enumeration index.
    ///
    /// Re-enumerates first (the driver opens by resource name, not index)
    /// and fails with [`WfsError::DeviceBusy`] before any native init call
    /// if the instrument reports itself in use. The in-use check is
    /// best-effort: a race with another process between check and open is
    /// caught by the driver's own init status, not locally.
    pub fn open(index: usize) -> WfsResult<Self> {
        let mut connection = WfsConnection::new();
        let info = connection.open(index)?;
        Ok(Self {
            connection,
            info,
            spots: None,
        })
    }

    /// Enumeration descriptor of the opened instrument.
    pub fn info(&self) -> &InstrumentInfo {
        &self.info
    }

    /// Direct access to the underlying connection.
    pub fn connection(&self) -> &WfsConnection {
        &self.connection
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Set the camera resolution (8-bit pixel format) and remember the
    /// maximum detectable spot grid the driver reports back.
    pub fn configure_cam(&mut self, resolution_index: i32) -> WfsResult<SpotGrid> {
        let spots =
            WfsFeatures::configure_cam(&self.connection, PixelFormat::Mono8, resolution_index)?;
        self.spots = Some(spots);
        Ok(spots)
    }

    /// Spot grid from the last configure call, if still valid.
    pub fn spot_grid(&self) -> Option<SpotGrid> {
        self.spots
    }

    /// Number of calibrated microlens arrays.
    pub fn mla_count(&self) -> WfsResult<i32> {
        WfsFeatures::get_mla_count(&self.connection)
    }

    /// Select a microlens array. The remembered spot grid becomes stale and
    /// is cleared; reconfigure before the next wavefront calculation.
    pub fn select_mla(&mut self, mla_index: i32) -> WfsResult<()> {
        WfsFeatures::select_mla(&self.connection, mla_index)?;
        self.spots = None;
        Ok(())
    }

    /// Select the reference plane for deviation calculation.
    pub fn set_reference_plane(&mut self, plane: ReferencePlane) -> WfsResult<()> {
        WfsFeatures::set_reference_plane(&self.connection, plane)
    }

    /// Currently selected reference plane.
    pub fn reference_plane(&self) -> WfsResult<ReferencePlane> {
        WfsFeatures::get_reference_plane(&self.connection)
    }

    /// Set the pupil centre and diameter in millimetres. Ranges are
    /// validated by the driver, not here.
    pub fn set_pupil(&mut self, pupil: PupilGeometry) -> WfsResult<()> {
        WfsFeatures::set_pupil(&self.connection, pupil)
    }

    /// Current pupil geometry.
    pub fn pupil(&self) -> WfsResult<PupilGeometry> {
        WfsFeatures::get_pupil(&self.connection)
    }

    /// Switch the camera's hardware centroiding (highspeed) mode.
    pub fn set_highspeed_mode(&mut self, options: HighspeedOptions) -> WfsResult<()> {
        WfsFeatures::set_highspeed_mode(&self.connection, options)
    }

    /// Exposure time range at the current configuration.
    pub fn exposure_time_range(&self) -> WfsResult<ExposureRange> {
        WfsFeatures::get_exposure_time_range(&self.connection)
    }

    /// Set the exposure time manually; returns the applied value.
    pub fn set_exposure_time(&mut self, exposure_ms: f64) -> WfsResult<f64> {
        WfsFeatures::set_exposure_time(&self.connection, exposure_ms)
    }

    /// Set the master gain; returns the applied value.
    pub fn set_master_gain(&mut self, gain: f64) -> WfsResult<f64> {
        WfsFeatures::set_master_gain(&self.connection, gain)
    }

    /// Identity strings of the open instrument.
    pub fn identity(&self) -> WfsResult<InstrumentIdentity> {
        WfsFeatures::get_instrument_identity(&self.connection)
    }

    /// Instrument driver and firmware revisions.
    pub fn revision(&self) -> WfsResult<DriverRevision> {
        WfsFeatures::get_revision(&self.connection)
    }

    /// Raw device status bitfield.
    pub fn status(&self) -> WfsResult<i32> {
        WfsFeatures::get_status(&self.connection)
    }

    // =========================================================================
    // Acquisition Pipeline
    // =========================================================================

    /// Capture one spotfield frame with driver auto-exposure. Blocks until
    /// the frame is acquired. Must precede the calc steps of a cycle.
    pub fn take_spotfield_image_auto_expos(&mut self) -> WfsResult<AutoExposure> {
        WfsAcquisition::take_spotfield_image_auto_expos(&self.connection)
    }

    /// Locate spot centroids in the captured frame.
    pub fn calc_spots(&mut self, dynamic_noise_cut: bool, calc_diameters: bool) -> WfsResult<()> {
        WfsAcquisition::calc_spots(&self.connection, dynamic_noise_cut, calc_diameters)
    }

    /// Compute deviations of the located spots against the reference plane.
    pub fn calc_deviations(&mut self, cancel_wavefront_tilt: bool) -> WfsResult<()> {
        WfsAcquisition::calc_deviations(&self.connection, cancel_wavefront_tilt)
    }

    /// Reconstruct the wavefront from the computed deviations, cropped to
    /// the spot grid of the last configure call.
    ///
    /// Fails with [`WfsError::NotConfigured`] if the camera was never
    /// configured or the grid went stale after an MLA change.
    pub fn calc_wavefront(
        &mut self,
        wavefront_type: WavefrontType,
        limit_to_pupil: bool,
    ) -> WfsResult<Wavefront> {
        let spots = self.spots.ok_or(WfsError::NotConfigured {
            operation: "calc_wavefront",
        })?;
        WfsAcquisition::calc_wavefront(&self.connection, wavefront_type, limit_to_pupil, spots)
    }

    /// Close the session, releasing the native handle.
    ///
    /// Dropping the session has the same effect; the explicit form exists
    /// for call sites that want the close to be visible in the control flow.
    pub fn close(mut self) {
        self.connection.close();
    }
}
