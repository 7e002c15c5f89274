//! WFS feature control.
//!
//! Typed one-shot setters and info queries: camera resolution, microlens
//! array selection, reference plane, pupil geometry, highspeed mode,
//! exposure and gain. Range validation is delegated entirely to the driver
//! status codes; this layer only converts between Rust types and the raw
//! `ViInt32`/`ViReal64` values the ABI expects.

use crate::components::connection::WfsConnection;
use crate::error::WfsResult;

#[cfg(feature = "wfs_hardware")]
use crate::components::connection::{buffer_to_string, check_status};
#[cfg(feature = "wfs_hardware")]
use crate::error::WfsError;
#[cfg(feature = "wfs_hardware")]
use wfs_sys::*;

// =============================================================================
// Data Structures
// =============================================================================

/// Maximum detectable spot grid reported by `WFS_ConfigureCam`.
///
/// Depends on both the camera resolution and the selected microlens array.
/// Wavefront arrays returned later are cropped to these dimensions, so the
/// grid must be refreshed whenever either changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpotGrid {
    /// Spot columns.
    pub x: i32,
    /// Spot rows.
    pub y: i32,
}

/// Pupil position and size, in millimetres on the sensor plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PupilGeometry {
    pub center_mm: (f64, f64),
    pub diameter_mm: (f64, f64),
}

/// Reference plane used for spot deviation calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferencePlane {
    /// Factory-calibrated internal reference.
    Internal,
    /// User-defined reference previously stored on the instrument.
    User,
}

impl ReferencePlane {
    pub fn from_wfs(value: i32) -> Self {
        match value {
            1 => ReferencePlane::User,
            _ => ReferencePlane::Internal,
        }
    }

    pub fn to_wfs(self) -> i32 {
        match self {
            ReferencePlane::Internal => 0,
            ReferencePlane::User => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReferencePlane::Internal => "Internal",
            ReferencePlane::User => "User",
        }
    }
}

/// Pixel format for `WFS_ConfigureCam`. The driver currently supports
/// 8 bit only; 16 bit is reserved by the vendor header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Mono8,
    Mono16,
}

impl PixelFormat {
    pub fn to_wfs(self) -> i32 {
        match self {
            PixelFormat::Mono8 => 0,
            PixelFormat::Mono16 => 1,
        }
    }
}

/// Wavefront type selector for `WFS_CalcWavefront`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavefrontType {
    /// Measured wavefront.
    Measured,
    /// Wavefront reconstructed from the Zernike fit.
    Reconstructed,
    /// Difference between measured and reconstructed.
    Difference,
}

impl WavefrontType {
    pub fn from_wfs(value: i32) -> Self {
        match value {
            1 => WavefrontType::Reconstructed,
            2 => WavefrontType::Difference,
            _ => WavefrontType::Measured,
        }
    }

    pub fn to_wfs(self) -> i32 {
        match self {
            WavefrontType::Measured => 0,
            WavefrontType::Reconstructed => 1,
            WavefrontType::Difference => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WavefrontType::Measured => "Measured",
            WavefrontType::Reconstructed => "Reconstructed",
            WavefrontType::Difference => "Difference",
        }
    }
}

/// Options for the camera's highspeed (hardware centroiding) mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighspeedOptions {
    pub enabled: bool,
    pub adapt_centroids: bool,
    pub subtract_offset: i32,
    pub allow_auto_exposure: bool,
}

/// Exposure time range supported at the current camera configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExposureRange {
    pub min_ms: f64,
    pub max_ms: f64,
    pub increment_ms: f64,
}

/// Identity strings of the open instrument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentIdentity {
    pub manufacturer: String,
    pub instrument_name: String,
    pub serial_number_wfs: String,
    pub serial_number_camera: String,
}

/// Driver and firmware revision strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverRevision {
    pub instrument_driver: String,
    pub firmware: String,
}

// =============================================================================
// Feature Functions
// =============================================================================

/// Stateless feature functions operating on an open connection.
pub struct WfsFeatures;

#[cfg(feature = "wfs_hardware")]
fn require_handle(conn: &WfsConnection) -> WfsResult<ViSession> {
    conn.handle().ok_or(WfsError::NotOpen)
}

impl WfsFeatures {
    /// Configure camera resolution, receiving back the maximum detectable
    /// spot grid for the current resolution and MLA.
    ///
    /// The returned grid bounds every wavefront array produced afterwards;
    /// callers must refresh it after any MLA or resolution change or stale
    /// bounds will crop results incorrectly.
    pub fn configure_cam(
        conn: &WfsConnection,
        pixel_format: PixelFormat,
        resolution_index: i32,
    ) -> WfsResult<SpotGrid> {
        #[cfg(feature = "wfs_hardware")]
        {
            let h = require_handle(conn)?;
            let mut spots_x: ViInt32 = 0;
            let mut spots_y: ViInt32 = 0;
            unsafe {
                // SAFETY: h is a valid open handle; spots_x/spots_y are
                // valid out pointers.
                check_status(
                    "WFS_ConfigureCam",
                    WFS_ConfigureCam(
                        h,
                        pixel_format.to_wfs(),
                        resolution_index,
                        &mut spots_x,
                        &mut spots_y,
                    ),
                )?;
            }
            tracing::debug!(resolution_index, spots_x, spots_y, "camera configured");
            Ok(SpotGrid {
                x: spots_x,
                y: spots_y,
            })
        }
        #[cfg(not(feature = "wfs_hardware"))]
        {
            let _ = pixel_format;
            let mut state = conn.mock_state.lock().unwrap();
            state.call_log.push("WFS_ConfigureCam");
            let spots =
                crate::components::connection::MockInstrumentState::spot_grid_for_resolution(
                    resolution_index,
                );
            state.spots = spots;
            tracing::debug!(
                resolution_index,
                spots_x = spots.0,
                spots_y = spots.1,
                "camera configured (mock)"
            );
            Ok(SpotGrid {
                x: spots.0,
                y: spots.1,
            })
        }
    }

    /// Number of microlens arrays calibrated for this instrument.
    pub fn get_mla_count(conn: &WfsConnection) -> WfsResult<i32> {
        #[cfg(feature = "wfs_hardware")]
        {
            let h = require_handle(conn)?;
            let mut count: ViInt32 = 0;
            unsafe {
                // SAFETY: h is a valid open handle; count is a valid out pointer.
                check_status("WFS_GetMlaCount", WFS_GetMlaCount(h, &mut count))?;
            }
            Ok(count)
        }
        #[cfg(not(feature = "wfs_hardware"))]
        {
            Ok(conn.mock_state.lock().unwrap().mla_count)
        }
    }

    /// Select the microlens array by calibration index.
    ///
    /// Invalidates any previously reported spot grid; the session layer
    /// forces a reconfigure before the next wavefront calculation.
    pub fn select_mla(conn: &WfsConnection, mla_index: i32) -> WfsResult<()> {
        #[cfg(feature = "wfs_hardware")]
        {
            let h = require_handle(conn)?;
            unsafe {
                // SAFETY: h is a valid open handle.
                check_status("WFS_SelectMla", WFS_SelectMla(h, mla_index))?;
            }
            Ok(())
        }
        #[cfg(not(feature = "wfs_hardware"))]
        {
            let mut state = conn.mock_state.lock().unwrap();
            state.call_log.push("WFS_SelectMla");
            if mla_index < 0 || mla_index >= state.mla_count {
                // The real driver rejects out-of-range indices with a status
                // code; the mock mirrors that.
                return Err(crate::error::WfsError::Api {
                    function: "WFS_SelectMla",
                    status: -20005,
                    message: format!("MLA index {} out of range", mla_index),
                });
            }
            state.selected_mla = mla_index;
            Ok(())
        }
    }

    /// Select the reference plane used for deviation calculation.
    pub fn set_reference_plane(conn: &WfsConnection, plane: ReferencePlane) -> WfsResult<()> {
        #[cfg(feature = "wfs_hardware")]
        {
            let h = require_handle(conn)?;
            unsafe {
                // SAFETY: h is a valid open handle.
                check_status(
                    "WFS_SetReferencePlane",
                    WFS_SetReferencePlane(h, plane.to_wfs()),
                )?;
            }
            Ok(())
        }
        #[cfg(not(feature = "wfs_hardware"))]
        {
            let mut state = conn.mock_state.lock().unwrap();
            state.call_log.push("WFS_SetReferencePlane");
            state.reference_plane = plane.to_wfs();
            Ok(())
        }
    }

    /// Currently selected reference plane.
    pub fn get_reference_plane(conn: &WfsConnection) -> WfsResult<ReferencePlane> {
        #[cfg(feature = "wfs_hardware")]
        {
            let h = require_handle(conn)?;
            let mut index: ViInt32 = 0;
            unsafe {
                // SAFETY: h is a valid open handle; index is a valid out pointer.
                check_status("WFS_GetReferencePlane", WFS_GetReferencePlane(h, &mut index))?;
            }
            Ok(ReferencePlane::from_wfs(index))
        }
        #[cfg(not(feature = "wfs_hardware"))]
        {
            Ok(ReferencePlane::from_wfs(
                conn.mock_state.lock().unwrap().reference_plane,
            ))
        }
    }

    /// Set the pupil centre and diameter in millimetres.
    pub fn set_pupil(conn: &WfsConnection, pupil: PupilGeometry) -> WfsResult<()> {
        #[cfg(feature = "wfs_hardware")]
        {
            let h = require_handle(conn)?;
            unsafe {
                // SAFETY: h is a valid open handle; all arguments by value.
                check_status(
                    "WFS_SetPupil",
                    WFS_SetPupil(
                        h,
                        pupil.center_mm.0,
                        pupil.center_mm.1,
                        pupil.diameter_mm.0,
                        pupil.diameter_mm.1,
                    ),
                )?;
            }
            Ok(())
        }
        #[cfg(not(feature = "wfs_hardware"))]
        {
            let mut state = conn.mock_state.lock().unwrap();
            state.call_log.push("WFS_SetPupil");
            state.pupil_center_mm = pupil.center_mm;
            state.pupil_diameter_mm = pupil.diameter_mm;
            Ok(())
        }
    }

    /// Current pupil geometry.
    pub fn get_pupil(conn: &WfsConnection) -> WfsResult<PupilGeometry> {
        #[cfg(feature = "wfs_hardware")]
        {
            let h = require_handle(conn)?;
            let mut cx: ViReal64 = 0.0;
            let mut cy: ViReal64 = 0.0;
            let mut dx: ViReal64 = 0.0;
            let mut dy: ViReal64 = 0.0;
            unsafe {
                // SAFETY: h is a valid open handle; all out pointers valid.
                check_status(
                    "WFS_GetPupil",
                    WFS_GetPupil(h, &mut cx, &mut cy, &mut dx, &mut dy),
                )?;
            }
            Ok(PupilGeometry {
                center_mm: (cx, cy),
                diameter_mm: (dx, dy),
            })
        }
        #[cfg(not(feature = "wfs_hardware"))]
        {
            let state = conn.mock_state.lock().unwrap();
            Ok(PupilGeometry {
                center_mm: state.pupil_center_mm,
                diameter_mm: state.pupil_diameter_mm,
            })
        }
    }

    /// Switch the camera's hardware centroiding (highspeed) mode.
    pub fn set_highspeed_mode(conn: &WfsConnection, options: HighspeedOptions) -> WfsResult<()> {
        #[cfg(feature = "wfs_hardware")]
        {
            let h = require_handle(conn)?;
            unsafe {
                // SAFETY: h is a valid open handle; all arguments by value.
                check_status(
                    "WFS_SetHighspeedMode",
                    WFS_SetHighspeedMode(
                        h,
                        if options.enabled {
                            WFS_HIGHSPEED_ON
                        } else {
                            WFS_HIGHSPEED_OFF
                        },
                        options.adapt_centroids as i32,
                        options.subtract_offset,
                        options.allow_auto_exposure as i32,
                    ),
                )?;
            }
            Ok(())
        }
        #[cfg(not(feature = "wfs_hardware"))]
        {
            let mut state = conn.mock_state.lock().unwrap();
            state.call_log.push("WFS_SetHighspeedMode");
            state.highspeed_mode = options.enabled as i32;
            Ok(())
        }
    }

    /// Exposure time range supported at the current configuration.
    pub fn get_exposure_time_range(conn: &WfsConnection) -> WfsResult<ExposureRange> {
        #[cfg(feature = "wfs_hardware")]
        {
            let h = require_handle(conn)?;
            let mut min: ViReal64 = 0.0;
            let mut max: ViReal64 = 0.0;
            let mut incr: ViReal64 = 0.0;
            unsafe {
                // SAFETY: h is a valid open handle; all out pointers valid.
                check_status(
                    "WFS_GetExposureTimeRange",
                    WFS_GetExposureTimeRange(h, &mut min, &mut max, &mut incr),
                )?;
            }
            Ok(ExposureRange {
                min_ms: min,
                max_ms: max,
                increment_ms: incr,
            })
        }
        #[cfg(not(feature = "wfs_hardware"))]
        {
            let _ = conn;
            Ok(ExposureRange {
                min_ms: 0.079,
                max_ms: 66.6,
                increment_ms: 0.013,
            })
        }
    }

    /// Set the exposure time manually. Returns the value actually applied,
    /// which the driver rounds to its internal increment.
    pub fn set_exposure_time(conn: &WfsConnection, exposure_ms: f64) -> WfsResult<f64> {
        #[cfg(feature = "wfs_hardware")]
        {
            let h = require_handle(conn)?;
            let mut actual: ViReal64 = 0.0;
            unsafe {
                // SAFETY: h is a valid open handle; actual is a valid out pointer.
                check_status(
                    "WFS_SetExposureTime",
                    WFS_SetExposureTime(h, exposure_ms, &mut actual),
                )?;
            }
            Ok(actual)
        }
        #[cfg(not(feature = "wfs_hardware"))]
        {
            let mut state = conn.mock_state.lock().unwrap();
            state.call_log.push("WFS_SetExposureTime");
            state.exposure_time_ms = exposure_ms;
            Ok(exposure_ms)
        }
    }

    /// Set the master gain. Returns the value actually applied.
    pub fn set_master_gain(conn: &WfsConnection, gain: f64) -> WfsResult<f64> {
        #[cfg(feature = "wfs_hardware")]
        {
            let h = require_handle(conn)?;
            let mut actual: ViReal64 = 0.0;
            unsafe {
                // SAFETY: h is a valid open handle; actual is a valid out pointer.
                check_status("WFS_SetMasterGain", WFS_SetMasterGain(h, gain, &mut actual))?;
            }
            Ok(actual)
        }
        #[cfg(not(feature = "wfs_hardware"))]
        {
            let mut state = conn.mock_state.lock().unwrap();
            state.call_log.push("WFS_SetMasterGain");
            state.master_gain = gain;
            Ok(gain)
        }
    }

    /// Identity strings of the open instrument.
    pub fn get_instrument_identity(conn: &WfsConnection) -> WfsResult<InstrumentIdentity> {
        #[cfg(feature = "wfs_hardware")]
        {
            let h = require_handle(conn)?;
            let mut manufacturer = [0 as ViChar; WFS_BUFFER_SIZE];
            let mut name = [0 as ViChar; WFS_BUFFER_SIZE];
            let mut serial_wfs = [0 as ViChar; WFS_BUFFER_SIZE];
            let mut serial_cam = [0 as ViChar; WFS_BUFFER_SIZE];
            unsafe {
                // SAFETY: all buffers are writable and sized per the driver
                // requirement (WFS_BUFFER_SIZE bytes).
                check_status(
                    "WFS_GetInstrumentInfo",
                    WFS_GetInstrumentInfo(
                        h,
                        manufacturer.as_mut_ptr(),
                        name.as_mut_ptr(),
                        serial_wfs.as_mut_ptr(),
                        serial_cam.as_mut_ptr(),
                    ),
                )?;
            }
            Ok(InstrumentIdentity {
                manufacturer: buffer_to_string(&manufacturer),
                instrument_name: buffer_to_string(&name),
                serial_number_wfs: buffer_to_string(&serial_wfs),
                serial_number_camera: buffer_to_string(&serial_cam),
            })
        }
        #[cfg(not(feature = "wfs_hardware"))]
        {
            let state = conn.mock_state.lock().unwrap();
            let opened = state.opened.and_then(|i| state.instruments.get(i));
            Ok(InstrumentIdentity {
                manufacturer: "Thorlabs".to_string(),
                instrument_name: opened
                    .map(|i| i.instrument_name.clone())
                    .unwrap_or_default(),
                serial_number_wfs: opened.map(|i| i.serial_number.clone()).unwrap_or_default(),
                serial_number_camera: "C00112233".to_string(),
            })
        }
    }

    /// Instrument driver and camera firmware revisions.
    pub fn get_revision(conn: &WfsConnection) -> WfsResult<DriverRevision> {
        #[cfg(feature = "wfs_hardware")]
        {
            let h = require_handle(conn)?;
            let mut driver = [0 as ViChar; WFS_BUFFER_SIZE];
            let mut firmware = [0 as ViChar; WFS_BUFFER_SIZE];
            unsafe {
                // SAFETY: buffers writable and sized per the driver requirement.
                check_status(
                    "WFS_revision_query",
                    WFS_revision_query(h, driver.as_mut_ptr(), firmware.as_mut_ptr()),
                )?;
            }
            Ok(DriverRevision {
                instrument_driver: buffer_to_string(&driver),
                firmware: buffer_to_string(&firmware),
            })
        }
        #[cfg(not(feature = "wfs_hardware"))]
        {
            let _ = conn;
            Ok(DriverRevision {
                instrument_driver: "5.0.1 (mock)".to_string(),
                firmware: "1.8 (mock)".to_string(),
            })
        }
    }

    /// Raw device status bitfield from `WFS_GetStatus`.
    pub fn get_status(conn: &WfsConnection) -> WfsResult<i32> {
        #[cfg(feature = "wfs_hardware")]
        {
            let h = require_handle(conn)?;
            let mut status: ViInt32 = 0;
            unsafe {
                // SAFETY: h is a valid open handle; status is a valid out pointer.
                check_status("WFS_GetStatus", WFS_GetStatus(h, &mut status))?;
            }
            Ok(status)
        }
        #[cfg(not(feature = "wfs_hardware"))]
        {
            let _ = conn;
            Ok(0)
        }
    }
}
