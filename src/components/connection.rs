//! WFS connection management.
//!
//! Handles instrument enumeration, opening and closing sessions, and the
//! translation of native status codes into [`WfsError::Api`].
//!
//! The vendor driver owns all instrument state: the `in_use` flag reported
//! by enumeration is the only busy indication available, and there is a
//! benign race between checking it and calling `WFS_init` if two processes
//! probe the same instrument simultaneously. The losing open surfaces as a
//! failed `WFS_init` status in that case.

use crate::error::{WfsError, WfsResult};

#[cfg(feature = "wfs_hardware")]
use std::ffi::{CStr, CString};
#[cfg(feature = "wfs_hardware")]
use wfs_sys::*;

/// One entry from the instrument enumeration.
///
/// Valid only until the next enumeration call; the vendor driver re-assigns
/// list indices whenever instruments are attached or removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentInfo {
    /// Driver-assigned device ID.
    pub device_id: i32,
    /// Whether another session (possibly in another process) has the
    /// instrument open.
    pub in_use: bool,
    /// Instrument model name, e.g. "WFS150-5C".
    pub instrument_name: String,
    /// Instrument serial number.
    pub serial_number: String,
    /// VISA resource name used to open the instrument.
    pub resource_name: String,
}

/// Translate a nonzero status into a structured error.
///
/// Queries `WFS_error_message` for the vendor's description of the code.
/// The message query itself is best-effort; if it fails the raw status code
/// still reaches the caller.
#[cfg(feature = "wfs_hardware")]
pub(crate) fn check_status(function: &'static str, status: ViStatus) -> WfsResult<()> {
    if status == VI_SUCCESS {
        return Ok(());
    }
    let message = unsafe {
        let mut buf = [0 as ViChar; WFS_ERR_DESCR_BUFFER_SIZE];
        // SAFETY: buf is writable and sized per the driver requirement
        // (WFS_ERR_DESCR_BUFFER_SIZE bytes); handle 0 is accepted for
        // error-message queries.
        WFS_error_message(0, status, buf.as_mut_ptr());
        CStr::from_ptr(buf.as_ptr()).to_string_lossy().into_owned()
    };
    tracing::error!(function, status, %message, "WFS driver call failed");
    Err(WfsError::Api {
        function,
        status,
        message,
    })
}

/// Read a NUL-terminated driver string buffer.
#[cfg(feature = "wfs_hardware")]
pub(crate) fn buffer_to_string(buf: &[ViChar]) -> String {
    unsafe {
        // SAFETY: the driver always NUL-terminates its string outputs within
        // WFS_BUFFER_SIZE.
        CStr::from_ptr(buf.as_ptr()).to_string_lossy().into_owned()
    }
}

/// Manages the connection to one WFS instrument.
#[derive(Debug, Default)]
pub struct WfsConnection {
    /// Instrument session handle from WFS_init.
    #[cfg(feature = "wfs_hardware")]
    handle: Option<ViSession>,

    /// Simulated instrument state for testing without hardware.
    #[cfg(not(feature = "wfs_hardware"))]
    pub mock_state: std::sync::Mutex<MockInstrumentState>,
}

/// Simulated driver state backing the mock build.
///
/// Records every native call the driver layer would have made, so tests can
/// assert call ordering and absence (e.g. that a busy instrument is never
/// handed to `WFS_init`).
#[cfg(not(feature = "wfs_hardware"))]
#[derive(Debug, Clone)]
pub struct MockInstrumentState {
    pub instruments: Vec<InstrumentInfo>,
    pub opened: Option<usize>,
    pub call_log: Vec<&'static str>,

    pub selected_mla: i32,
    pub mla_count: i32,
    pub reference_plane: i32,
    pub pupil_center_mm: (f64, f64),
    pub pupil_diameter_mm: (f64, f64),
    pub highspeed_mode: i32,
    pub exposure_time_ms: f64,
    pub master_gain: f64,

    /// Spot grid reported by the last WFS_ConfigureCam.
    pub spots: (i32, i32),
    /// limitToPupil argument seen by the last WFS_CalcWavefront.
    pub last_limit_to_pupil: Option<bool>,
}

#[cfg(not(feature = "wfs_hardware"))]
impl Default for MockInstrumentState {
    fn default() -> Self {
        Self {
            instruments: vec![
                InstrumentInfo {
                    device_id: 1,
                    in_use: false,
                    instrument_name: "WFS150-5C".to_string(),
                    serial_number: "M00224955".to_string(),
                    resource_name: "USB::0x1313::0x0000::1".to_string(),
                },
                InstrumentInfo {
                    device_id: 2,
                    in_use: true,
                    instrument_name: "WFS30-5C".to_string(),
                    serial_number: "M00301123".to_string(),
                    resource_name: "USB::0x1313::0x0000::2".to_string(),
                },
            ],
            opened: None,
            call_log: Vec::new(),
            selected_mla: 0,
            mla_count: 2,
            reference_plane: 0,
            pupil_center_mm: (0.0, 0.0),
            pupil_diameter_mm: (4.76, 4.76),
            highspeed_mode: 0,
            exposure_time_ms: 1.0,
            master_gain: 1.0,
            spots: (0, 0),
            last_limit_to_pupil: None,
        }
    }
}

#[cfg(not(feature = "wfs_hardware"))]
impl MockInstrumentState {
    /// Simulated spot grid for a camera resolution index. Lower indices are
    /// larger frames and therefore more detectable spots.
    pub fn spot_grid_for_resolution(resolution_index: i32) -> (i32, i32) {
        match resolution_index {
            0 => (47, 35),
            1 => (39, 31),
            2 => (31, 23),
            _ => (23, 17),
        }
    }
}

impl WfsConnection {
    /// Create a new, unconnected connection manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enumerate all attached WFS instruments.
    ///
    /// Re-queries the driver on every call; there is no caching. Results are
    /// valid only until the next enumeration.
    #[cfg(feature = "wfs_hardware")]
    pub fn list_instruments(&self) -> WfsResult<Vec<InstrumentInfo>> {
        let mut count: ViInt32 = 0;
        unsafe {
            // SAFETY: count is a valid out pointer; enumeration takes no
            // session handle (VI_NULL).
            check_status(
                "WFS_GetInstrumentListLen",
                WFS_GetInstrumentListLen(0, &mut count),
            )?;
        }

        let mut instruments = Vec::with_capacity(count as usize);
        for index in 0..count {
            let mut device_id: ViInt32 = 0;
            let mut in_use: ViInt32 = 0;
            let mut name = [0 as ViChar; WFS_BUFFER_SIZE];
            let mut serial = [0 as ViChar; WFS_BUFFER_SIZE];
            let mut resource = [0 as ViChar; WFS_BUFFER_SIZE];
            unsafe {
                // SAFETY: all out pointers are valid; string buffers are
                // writable and sized per the driver requirement.
                check_status(
                    "WFS_GetInstrumentListInfo",
                    WFS_GetInstrumentListInfo(
                        0,
                        index,
                        &mut device_id,
                        &mut in_use,
                        name.as_mut_ptr(),
                        serial.as_mut_ptr(),
                        resource.as_mut_ptr(),
                    ),
                )?;
            }
            instruments.push(InstrumentInfo {
                device_id,
                in_use: in_use != 0,
                instrument_name: buffer_to_string(&name),
                serial_number: buffer_to_string(&serial),
                resource_name: buffer_to_string(&resource),
            });
        }
        Ok(instruments)
    }

    /// Enumerate all attached WFS instruments (mock mode).
    #[cfg(not(feature = "wfs_hardware"))]
    pub fn list_instruments(&self) -> WfsResult<Vec<InstrumentInfo>> {
        let mut state = self.mock_state.lock().unwrap();
        state.call_log.push("WFS_GetInstrumentListInfo");
        Ok(state.instruments.clone())
    }

    /// Open the instrument at the given enumeration index.
    ///
    /// Re-enumerates first: the driver opens by resource name, not index,
    /// and the list may have changed since any previous query. An instrument
    /// whose `in_use` flag is set is rejected with [`WfsError::DeviceBusy`]
    /// before any native init call.
    pub fn open(&mut self, index: usize) -> WfsResult<InstrumentInfo> {
        let instruments = self.list_instruments()?;
        if instruments.is_empty() {
            return Err(WfsError::NoInstruments);
        }
        let info = instruments
            .get(index)
            .ok_or(WfsError::InvalidInstrumentIndex {
                index,
                count: instruments.len(),
            })?
            .clone();
        if info.in_use {
            tracing::warn!(
                index,
                resource = %info.resource_name,
                "instrument already in use, refusing to open"
            );
            return Err(WfsError::DeviceBusy {
                index,
                resource_name: info.resource_name,
            });
        }

        self.open_resource(&info)?;
        tracing::info!(
            index,
            instrument = %info.instrument_name,
            serial = %info.serial_number,
            "WFS instrument opened"
        );
        Ok(info)
    }

    #[cfg(feature = "wfs_hardware")]
    fn open_resource(&mut self, info: &InstrumentInfo) -> WfsResult<()> {
        if self.handle.is_some() {
            return Ok(()); // Already open
        }
        let resource =
            CString::new(info.resource_name.as_str()).map_err(|_| WfsError::InvalidResourceName {
                resource_name: info.resource_name.clone(),
            })?;
        let mut handle: ViSession = 0;
        unsafe {
            // SAFETY: resource is a valid NUL-terminated string; handle is a
            // valid out pointer.
            check_status(
                "WFS_init",
                WFS_init(resource.as_ptr(), VI_FALSE, VI_FALSE, &mut handle),
            )?;
        }
        self.handle = Some(handle);
        Ok(())
    }

    #[cfg(not(feature = "wfs_hardware"))]
    fn open_resource(&mut self, info: &InstrumentInfo) -> WfsResult<()> {
        let mut state = self.mock_state.lock().unwrap();
        state.call_log.push("WFS_init");
        let index = state
            .instruments
            .iter()
            .position(|i| i.resource_name == info.resource_name);
        state.opened = index;
        Ok(())
    }

    /// Close the instrument session if open.
    ///
    /// Afterwards the native handle is dead; the driver gives no guarantee
    /// about calls on a closed handle.
    pub fn close(&mut self) {
        #[cfg(feature = "wfs_hardware")]
        if let Some(h) = self.handle.take() {
            unsafe {
                // SAFETY: h was returned by WFS_init and is still owned by
                // this connection.
                WFS_close(h);
            }
            tracing::info!("WFS instrument closed");
        }

        #[cfg(not(feature = "wfs_hardware"))]
        {
            let mut state = self.mock_state.lock().unwrap();
            if state.opened.take().is_some() {
                state.call_log.push("WFS_close");
                tracing::info!("WFS instrument closed (mock)");
            }
        }
    }

    /// Whether a session is currently open.
    pub fn is_open(&self) -> bool {
        #[cfg(feature = "wfs_hardware")]
        {
            self.handle.is_some()
        }
        #[cfg(not(feature = "wfs_hardware"))]
        {
            self.mock_state.lock().unwrap().opened.is_some()
        }
    }

    /// Get the raw instrument session handle.
    #[cfg(feature = "wfs_hardware")]
    pub fn handle(&self) -> Option<ViSession> {
        self.handle
    }
}

impl Drop for WfsConnection {
    fn drop(&mut self) {
        self.close();
    }
}
