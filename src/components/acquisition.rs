//! WFS acquisition pipeline.
//!
//! One measurement cycle is a strict sequence of driver calls: capture a
//! spotfield image, locate spot centroids, compute deviations against the
//! reference plane, then reconstruct the wavefront. All of the optics math
//! happens inside the vendor library; this layer only sequences the calls
//! and marshals the output buffer.
//!
//! Calling the calc functions out of order yields garbage from the driver,
//! not an error. [`crate::WfsSession`] and [`crate::camera::WfsCamera`]
//! always run the full sequence.

use crate::components::connection::WfsConnection;
use crate::components::features::{SpotGrid, WavefrontType};
use crate::error::WfsResult;
use wfs_sys::{MAX_SPOTS_X, MAX_SPOTS_Y};

#[cfg(feature = "wfs_hardware")]
use crate::components::connection::check_status;
#[cfg(feature = "wfs_hardware")]
use crate::error::WfsError;
#[cfg(feature = "wfs_hardware")]
use wfs_sys::*;

/// A reconstructed wavefront: a dense 2-D grid of height values in
/// micrometres, one per microlens spot.
///
/// Produced fresh on every [`WfsAcquisition::calc_wavefront`] call; nothing
/// is cached. Dimensions are the spot grid reported by the last camera
/// configuration, never the hardware maximum.
#[derive(Debug, Clone, PartialEq)]
pub struct Wavefront {
    cols: usize,
    rows: usize,
    data: Vec<f32>,
}

impl Wavefront {
    pub(crate) fn new(cols: usize, rows: usize, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), cols * rows);
        Self { cols, rows, data }
    }

    /// Grid width (spot columns).
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Grid height (spot rows).
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Height value at (column, row), in micrometres.
    pub fn get(&self, col: usize, row: usize) -> Option<f32> {
        if col < self.cols && row < self.rows {
            Some(self.data[row * self.cols + col])
        } else {
            None
        }
    }

    /// One grid row as a slice.
    pub fn row(&self, row: usize) -> Option<&[f32]> {
        if row < self.rows {
            Some(&self.data[row * self.cols..(row + 1) * self.cols])
        } else {
            None
        }
    }

    /// The whole grid, row-major.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

/// Auto-exposure result from a spotfield capture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoExposure {
    /// Exposure time the driver settled on, in milliseconds.
    pub exposure_time_ms: f64,
    /// Master gain the driver settled on.
    pub master_gain: f64,
}

/// Stateless acquisition functions operating on an open connection.
pub struct WfsAcquisition;

impl WfsAcquisition {
    /// Capture one spotfield frame, letting the driver auto-tune exposure
    /// and gain. Blocks until the frame is acquired; there is no timeout
    /// beyond what the driver itself imposes.
    ///
    /// Must precede any spot, deviation or wavefront calculation in the
    /// same measurement cycle.
    pub fn take_spotfield_image_auto_expos(conn: &WfsConnection) -> WfsResult<AutoExposure> {
        #[cfg(feature = "wfs_hardware")]
        {
            let h = conn.handle().ok_or(WfsError::NotOpen)?;
            let mut exposure: ViReal64 = 0.0;
            let mut gain: ViReal64 = 0.0;
            unsafe {
                // SAFETY: h is a valid open handle; exposure/gain are valid
                // out pointers.
                check_status(
                    "WFS_TakeSpotfieldImageAutoExpos",
                    WFS_TakeSpotfieldImageAutoExpos(h, &mut exposure, &mut gain),
                )?;
            }
            tracing::debug!(exposure_ms = exposure, gain, "spotfield image captured");
            Ok(AutoExposure {
                exposure_time_ms: exposure,
                master_gain: gain,
            })
        }
        #[cfg(not(feature = "wfs_hardware"))]
        {
            let mut state = conn.mock_state.lock().unwrap();
            state.call_log.push("WFS_TakeSpotfieldImageAutoExpos");
            Ok(AutoExposure {
                exposure_time_ms: state.exposure_time_ms,
                master_gain: state.master_gain,
            })
        }
    }

    /// Locate spot centroids in the captured frame.
    ///
    /// `dynamic_noise_cut` enables the driver's adaptive background
    /// suppression; `calculate_diameters` additionally measures per-spot
    /// diameters (slower).
    pub fn calc_spots(
        conn: &WfsConnection,
        dynamic_noise_cut: bool,
        calculate_diameters: bool,
    ) -> WfsResult<()> {
        #[cfg(feature = "wfs_hardware")]
        {
            let h = conn.handle().ok_or(WfsError::NotOpen)?;
            unsafe {
                // SAFETY: h is a valid open handle.
                check_status(
                    "WFS_CalcSpotsCentrDiaIntens",
                    WFS_CalcSpotsCentrDiaIntens(
                        h,
                        dynamic_noise_cut as i32,
                        calculate_diameters as i32,
                    ),
                )?;
            }
            Ok(())
        }
        #[cfg(not(feature = "wfs_hardware"))]
        {
            let _ = (dynamic_noise_cut, calculate_diameters);
            let mut state = conn.mock_state.lock().unwrap();
            state.call_log.push("WFS_CalcSpotsCentrDiaIntens");
            Ok(())
        }
    }

    /// Compute spot deviations against the selected reference plane.
    /// Requires a preceding [`Self::calc_spots`] in the same cycle.
    pub fn calc_deviations(conn: &WfsConnection, cancel_wavefront_tilt: bool) -> WfsResult<()> {
        #[cfg(feature = "wfs_hardware")]
        {
            let h = conn.handle().ok_or(WfsError::NotOpen)?;
            unsafe {
                // SAFETY: h is a valid open handle.
                check_status(
                    "WFS_CalcSpotToReferenceDeviations",
                    WFS_CalcSpotToReferenceDeviations(h, cancel_wavefront_tilt as i32),
                )?;
            }
            Ok(())
        }
        #[cfg(not(feature = "wfs_hardware"))]
        {
            let _ = cancel_wavefront_tilt;
            let mut state = conn.mock_state.lock().unwrap();
            state.call_log.push("WFS_CalcSpotToReferenceDeviations");
            Ok(())
        }
    }

    /// Reconstruct the wavefront from the computed deviations.
    ///
    /// The driver fills a fixed `MAX_SPOTS_Y x MAX_SPOTS_X` buffer; only the
    /// sub-rectangle given by `spots` carries data, and that is what is
    /// returned. `spots` must come from the configure call matching the
    /// current resolution and MLA.
    pub fn calc_wavefront(
        conn: &WfsConnection,
        wavefront_type: WavefrontType,
        limit_to_pupil: bool,
        spots: SpotGrid,
    ) -> WfsResult<Wavefront> {
        let cols = spots.x.max(0) as usize;
        let rows = spots.y.max(0) as usize;

        #[cfg(feature = "wfs_hardware")]
        {
            let h = conn.handle().ok_or(WfsError::NotOpen)?;
            let mut buffer = vec![0f32; MAX_SPOTS_Y * MAX_SPOTS_X];
            unsafe {
                // SAFETY: buffer holds MAX_SPOTS_Y * MAX_SPOTS_X floats as
                // the driver requires; h is a valid open handle.
                check_status(
                    "WFS_CalcWavefront",
                    WFS_CalcWavefront(
                        h,
                        wavefront_type.to_wfs(),
                        limit_to_pupil as i32,
                        buffer.as_mut_ptr(),
                    ),
                )?;
            }
            Ok(Self::crop(&buffer, cols, rows))
        }
        #[cfg(not(feature = "wfs_hardware"))]
        {
            let _ = wavefront_type;
            let mut state = conn.mock_state.lock().unwrap();
            state.call_log.push("WFS_CalcWavefront");
            state.last_limit_to_pupil = Some(limit_to_pupil);

            // Synthetic defocus surface over the full driver buffer, so the
            // crop path is exercised exactly as with hardware.
            let mut buffer = vec![0f32; MAX_SPOTS_Y * MAX_SPOTS_X];
            for row in 0..rows {
                for col in 0..cols {
                    let u = col as f32 / cols.max(1) as f32 - 0.5;
                    let v = row as f32 / rows.max(1) as f32 - 0.5;
                    let inside_pupil = u * u + v * v <= 0.25;
                    buffer[row * MAX_SPOTS_X + col] = if limit_to_pupil && !inside_pupil {
                        0.0
                    } else {
                        u * u + v * v
                    };
                }
            }
            Ok(Self::crop(&buffer, cols, rows))
        }
    }

    /// Extract the configured sub-rectangle from the driver's fixed-size
    /// output buffer.
    fn crop(buffer: &[f32], cols: usize, rows: usize) -> Wavefront {
        let mut data = Vec::with_capacity(cols * rows);
        for row in 0..rows {
            let start = row * MAX_SPOTS_X;
            data.extend_from_slice(&buffer[start..start + cols]);
        }
        Wavefront::new(cols, rows, data)
    }
}
