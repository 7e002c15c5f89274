//! Raw FFI bindings for the Thorlabs WFS instrument driver.
//!
//! The WFS driver is a VXIpnp-style instrument library: every entry point
//! returns a `ViStatus` (zero on success) and takes an instrument session
//! handle obtained from `WFS_init`. The declarations below reproduce the
//! vendor ABI exactly; the signatures must not be changed, the library on
//! the other side cannot be.
//!
//! Linking is controlled by the `wfs-sdk` cargo feature (see `build.rs`).
//! Without it the declarations still compile but no symbol may be called.

#![allow(non_snake_case)]

use std::os::raw::{c_char, c_ulong};

// VISA scalar types, named as in the vendor header.
pub type ViStatus = i32;
pub type ViSession = c_ulong;
pub type ViBoolean = u16;
pub type ViInt32 = i32;
pub type ViUInt32 = u32;
pub type ViReal64 = f64;
pub type ViChar = c_char;
pub type ViRsrc = *const ViChar;

/// Status code returned by every call on success.
pub const VI_SUCCESS: ViStatus = 0;
pub const VI_TRUE: ViBoolean = 1;
pub const VI_FALSE: ViBoolean = 0;

/// Size of general string buffers (instrument name, serial, resource name).
pub const WFS_BUFFER_SIZE: usize = 256;
/// Size of the buffer passed to `WFS_error_message`.
pub const WFS_ERR_DESCR_BUFFER_SIZE: usize = 512;

/// Hardware-imposed maximum spot grid; bounds the wavefront output array.
pub const MAX_SPOTS_X: usize = 80;
pub const MAX_SPOTS_Y: usize = 80;

// Pixel formats for WFS_ConfigureCam. The driver currently supports 8 bit only.
pub const PIXEL_FORMAT_MONO8: ViInt32 = 0;
pub const PIXEL_FORMAT_MONO16: ViInt32 = 1;

// Reference plane selectors for WFS_SetReferencePlane.
pub const WFS_REF_INTERNAL: ViInt32 = 0;
pub const WFS_REF_USER: ViInt32 = 1;

// Wavefront type selectors for WFS_CalcWavefront.
pub const WAVEFRONT_MEAS: ViInt32 = 0;
pub const WAVEFRONT_REC: ViInt32 = 1;
pub const WAVEFRONT_DIFF: ViInt32 = 2;

// Highspeed mode selectors for WFS_SetHighspeedMode.
pub const WFS_HIGHSPEED_OFF: ViInt32 = 0;
pub const WFS_HIGHSPEED_ON: ViInt32 = 1;

extern "system" {
    // General session management
    pub fn WFS_init(
        resourceName: ViRsrc,
        IDQuery: ViBoolean,
        resetDevice: ViBoolean,
        instrumentHandle: *mut ViSession,
    ) -> ViStatus;
    pub fn WFS_close(instrumentHandle: ViSession) -> ViStatus;

    // Instrument discovery. The list functions take VI_NULL (0) as handle;
    // enumeration happens before any session exists.
    pub fn WFS_GetInstrumentListLen(
        instrumentHandle: ViSession,
        instrumentCount: *mut ViInt32,
    ) -> ViStatus;
    pub fn WFS_GetInstrumentListInfo(
        instrumentHandle: ViSession,
        instrumentListIndex: ViInt32,
        deviceID: *mut ViInt32,
        inUse: *mut ViInt32,
        instrumentName: *mut ViChar,
        instrumentSN: *mut ViChar,
        resourceName: *mut ViChar,
    ) -> ViStatus;

    // Configuration functions
    pub fn WFS_GetInstrumentInfo(
        instrumentHandle: ViSession,
        manufacturerName: *mut ViChar,
        instrumentNameWFS: *mut ViChar,
        serialNumberWFS: *mut ViChar,
        serialNumberCam: *mut ViChar,
    ) -> ViStatus;
    pub fn WFS_ConfigureCam(
        instrumentHandle: ViSession,
        pixelFormat: ViInt32,
        camResolIndex: ViInt32,
        spotsX: *mut ViInt32,
        spotsY: *mut ViInt32,
    ) -> ViStatus;
    pub fn WFS_SetHighspeedMode(
        instrumentHandle: ViSession,
        highspeedMode: ViInt32,
        adaptCentroids: ViInt32,
        subtractOffset: ViInt32,
        allowAutoExposure: ViInt32,
    ) -> ViStatus;
    pub fn WFS_GetHighspeedWindows(
        instrumentHandle: ViSession,
        windowCountX: *mut ViInt32,
        windowCountY: *mut ViInt32,
        windowSizeX: *mut ViInt32,
        windowSizeY: *mut ViInt32,
        windowStartpositionX: *mut ViInt32,
        windowStartpositionY: *mut ViInt32,
    ) -> ViStatus;
    pub fn WFS_CheckHighspeedCentroids(instrumentHandle: ViSession) -> ViStatus;

    // Exposure and gain
    pub fn WFS_GetExposureTimeRange(
        instrumentHandle: ViSession,
        exposureTimeMin: *mut ViReal64,
        exposureTimeMax: *mut ViReal64,
        exposureTimeIncr: *mut ViReal64,
    ) -> ViStatus;
    pub fn WFS_SetExposureTime(
        instrumentHandle: ViSession,
        exposureTimeSet: ViReal64,
        exposureTimeAct: *mut ViReal64,
    ) -> ViStatus;
    pub fn WFS_GetExposureTime(
        instrumentHandle: ViSession,
        exposureTimeAct: *mut ViReal64,
    ) -> ViStatus;
    pub fn WFS_SetMasterGain(
        instrumentHandle: ViSession,
        masterGainSet: ViReal64,
        masterGainAct: *mut ViReal64,
    ) -> ViStatus;
    pub fn WFS_GetMasterGain(
        instrumentHandle: ViSession,
        masterGainAct: *mut ViReal64,
    ) -> ViStatus;

    // Microlens array selection
    pub fn WFS_GetMlaCount(instrumentHandle: ViSession, mlaCount: *mut ViInt32) -> ViStatus;
    pub fn WFS_SelectMla(instrumentHandle: ViSession, mlaIndex: ViInt32) -> ViStatus;

    // Reference plane and pupil
    pub fn WFS_SetReferencePlane(
        instrumentHandle: ViSession,
        referenceIndex: ViInt32,
    ) -> ViStatus;
    pub fn WFS_GetReferencePlane(
        instrumentHandle: ViSession,
        referenceIndex: *mut ViInt32,
    ) -> ViStatus;
    pub fn WFS_SetPupil(
        instrumentHandle: ViSession,
        pupilCenterXMm: ViReal64,
        pupilCenterYMm: ViReal64,
        pupilDiameterXMm: ViReal64,
        pupilDiameterYMm: ViReal64,
    ) -> ViStatus;
    pub fn WFS_GetPupil(
        instrumentHandle: ViSession,
        pupilCenterXMm: *mut ViReal64,
        pupilCenterYMm: *mut ViReal64,
        pupilDiameterXMm: *mut ViReal64,
        pupilDiameterYMm: *mut ViReal64,
    ) -> ViStatus;

    // Acquisition and calculation pipeline. The calc functions must run in
    // order: spots, then deviations, then wavefront.
    pub fn WFS_TakeSpotfieldImageAutoExpos(
        instrumentHandle: ViSession,
        exposureTimeAct: *mut ViReal64,
        masterGainAct: *mut ViReal64,
    ) -> ViStatus;
    pub fn WFS_CalcSpotsCentrDiaIntens(
        instrumentHandle: ViSession,
        dynamicNoiseCut: ViInt32,
        calculateDiameters: ViInt32,
    ) -> ViStatus;
    pub fn WFS_CalcSpotToReferenceDeviations(
        instrumentHandle: ViSession,
        cancelWavefrontTilt: ViInt32,
    ) -> ViStatus;
    /// `arrayWavefront` must point to `MAX_SPOTS_Y * MAX_SPOTS_X` floats; the
    /// driver fills the sub-rectangle given by the configured spot count.
    pub fn WFS_CalcWavefront(
        instrumentHandle: ViSession,
        wavefrontType: ViInt32,
        limitToPupil: ViInt32,
        arrayWavefront: *mut f32,
    ) -> ViStatus;

    // Utility
    pub fn WFS_GetStatus(instrumentHandle: ViSession, deviceStatus: *mut ViInt32) -> ViStatus;
    pub fn WFS_error_message(
        instrumentHandle: ViSession,
        errorCode: ViStatus,
        errorMessage: *mut ViChar,
    ) -> ViStatus;
    pub fn WFS_revision_query(
        instrumentHandle: ViSession,
        instrumentDriverRevision: *mut ViChar,
        firmwareRevision: *mut ViChar,
    ) -> ViStatus;
}
