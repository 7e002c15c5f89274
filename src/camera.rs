//! Camera facade: declarative configuration plus one-call acquisition.
//!
//! [`WfsCamera`] wraps a [`WfsSession`] behind a [`CameraConfig`], an
//! ordered list of typed feature settings applied in insertion order. The
//! settings are a closed enum mapped to typed session setters; a feature
//! name with no matching setter cannot be expressed, and unknown names in a
//! serialized configuration are a parse error rather than a silent no-op.

use serde::{Deserialize, Serialize};

use crate::components::acquisition::Wavefront;
use crate::components::features::{PupilGeometry, ReferencePlane, WavefrontType};
use crate::error::WfsResult;
use crate::WfsSession;

/// One camera feature assignment.
///
/// The serialized form matches the configuration dictionary shape the
/// driver has always used, e.g. `{"mla": {"mla_index": 0}}` or
/// `{"pupil": {"center": [0.0, 0.0], "diameter": [3.0, 3.0]}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSetting {
    /// Microlens array selection by calibration index.
    Mla { mla_index: i32 },
    /// Camera resolution by driver index. Must come after any `mla` entry:
    /// an MLA change invalidates the spot grid this call establishes.
    Resolution { cam_resol_index: i32 },
    /// Reference plane: internal (factory) or user-defined.
    ReferencePlane { internal: bool },
    /// Pupil centre and diameter in millimetres.
    Pupil { center: [f64; 2], diameter: [f64; 2] },
}

/// An ordered camera configuration, applied front to back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CameraConfig(pub Vec<FeatureSetting>);

impl CameraConfig {
    /// Parse a configuration from JSON. Unknown feature names or malformed
    /// arguments fail here, before anything reaches the instrument.
    pub fn from_json(json: &str) -> WfsResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for CameraConfig {
    /// Baseline configuration: first MLA, mid camera resolution, internal
    /// reference plane, 3 mm centred pupil.
    fn default() -> Self {
        CameraConfig(vec![
            FeatureSetting::Mla { mla_index: 0 },
            FeatureSetting::Resolution { cam_resol_index: 2 },
            FeatureSetting::ReferencePlane { internal: true },
            FeatureSetting::Pupil {
                center: [0.0, 0.0],
                diameter: [3.0, 3.0],
            },
        ])
    }
}

/// A configured wavefront camera.
///
/// Holds the session plus the configuration state; acquisition lazily
/// applies the default configuration if none has been applied yet, then
/// runs the fixed capture → spots → deviations → wavefront pipeline.
pub struct WfsCamera {
    session: WfsSession,
    default_configuration: CameraConfig,
    configuration: Option<CameraConfig>,
}

impl WfsCamera {
    /// Wrap an open session with the baseline default configuration.
    pub fn new(session: WfsSession) -> Self {
        Self::with_default_config(session, CameraConfig::default())
    }

    /// Wrap an open session with a caller-supplied default configuration.
    pub fn with_default_config(session: WfsSession, default_configuration: CameraConfig) -> Self {
        Self {
            session,
            default_configuration,
            configuration: None,
        }
    }

    /// The default configuration used when [`configure`](Self::configure)
    /// is called with `None`.
    pub fn default_configuration(&self) -> &CameraConfig {
        &self.default_configuration
    }

    /// The configuration currently applied, if any.
    pub fn configuration(&self) -> Option<&CameraConfig> {
        self.configuration.as_ref()
    }

    /// The underlying session.
    pub fn session(&self) -> &WfsSession {
        &self.session
    }

    /// Apply a configuration, or the default when `None`, setting each
    /// feature in insertion order. Stops at the first driver rejection.
    pub fn configure(&mut self, configuration: Option<CameraConfig>) -> WfsResult<()> {
        let config = configuration.unwrap_or_else(|| self.default_configuration.clone());
        for setting in &config.0 {
            Self::apply_setting(&mut self.session, setting)?;
        }
        self.configuration = Some(config);
        Ok(())
    }

    fn apply_setting(session: &mut WfsSession, setting: &FeatureSetting) -> WfsResult<()> {
        match setting {
            FeatureSetting::Mla { mla_index } => session.select_mla(*mla_index),
            FeatureSetting::Resolution { cam_resol_index } => {
                session.configure_cam(*cam_resol_index).map(|_| ())
            }
            FeatureSetting::ReferencePlane { internal } => session.set_reference_plane(if *internal
            {
                ReferencePlane::Internal
            } else {
                ReferencePlane::User
            }),
            FeatureSetting::Pupil { center, diameter } => session.set_pupil(PupilGeometry {
                center_mm: (center[0], center[1]),
                diameter_mm: (diameter[0], diameter[1]),
            }),
        }
    }

    /// Acquire one wavefront, cropped to the pupil.
    ///
    /// Configures with the default configuration first if none has been
    /// applied yet.
    pub fn acquire_wavefront(&mut self) -> WfsResult<Wavefront> {
        self.acquire(true)
    }

    /// Acquire one wavefront over the full spot grid, without pupil
    /// cropping. Output is never smaller than the pupil-limited variant for
    /// the same configuration.
    pub fn acquire_wavefront_full(&mut self) -> WfsResult<Wavefront> {
        self.acquire(false)
    }

    fn acquire(&mut self, limit_to_pupil: bool) -> WfsResult<Wavefront> {
        if self.configuration.is_none() {
            tracing::debug!("no configuration applied, using defaults");
            self.configure(None)?;
        }
        // Fixed measurement cycle; the driver requires exactly this order.
        self.session.take_spotfield_image_auto_expos()?;
        self.session.calc_spots(true, false)?;
        self.session.calc_deviations(true)?;
        self.session
            .calc_wavefront(WavefrontType::Measured, limit_to_pupil)
    }

    /// Close the camera, releasing the instrument session.
    pub fn close(self) {
        self.session.close();
    }
}
