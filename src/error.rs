//! Error types for the WFS driver.
//!
//! Every native call returns a `ViStatus`; nonzero statuses are translated
//! through `WFS_error_message` into [`WfsError::Api`] and propagated to the
//! caller. The driver never logs-and-continues past a failed call: callers
//! get a structured error they can match on.

use thiserror::Error;
use wfs_sys::ViStatus;

/// Convenience alias for results using the driver error type.
pub type WfsResult<T> = std::result::Result<T, WfsError>;

#[derive(Error, Debug)]
pub enum WfsError {
    /// A native driver call returned a nonzero status code.
    #[error("{function} failed with status {status}: {message}")]
    Api {
        function: &'static str,
        status: ViStatus,
        message: String,
    },

    /// The instrument is already open in another session or process.
    #[error("instrument {index} ({resource_name}) is in use by another session")]
    DeviceBusy { index: usize, resource_name: String },

    /// No WFS instruments are attached.
    #[error("no WFS instruments detected")]
    NoInstruments,

    /// The enumerated resource name cannot be passed to the driver.
    #[error("resource name {resource_name:?} is not a valid C string")]
    InvalidResourceName { resource_name: String },

    /// The requested enumeration index does not exist.
    #[error("instrument index {index} out of range (found {count} instruments)")]
    InvalidInstrumentIndex { index: usize, count: usize },

    /// The camera has not been configured (or the spot grid went stale after
    /// an MLA change), so wavefront output bounds are unknown.
    #[error("camera not configured: call configure_cam() before {operation}")]
    NotConfigured { operation: &'static str },

    /// An operation requiring an open session was called before open.
    #[error("no instrument session open")]
    NotOpen,

    /// Hardware support was not compiled in.
    #[error("WFS hardware support not enabled. Rebuild with --features wfs_hardware")]
    FeatureDisabled,

    /// Configuration could not be parsed.
    #[error("invalid camera configuration: {0}")]
    Config(#[from] serde_json::Error),
}
