//! Tests for typed feature setters and the configuration model.
//!
//! Unit-level conversions run in any mode; the setter round-trips use the
//! mock connection.

mod common;

use wfs_driver::camera::{CameraConfig, FeatureSetting};
use wfs_driver::{PixelFormat, ReferencePlane, WavefrontType};

// =============================================================================
// Unit Tests: Type Conversions
// =============================================================================

mod type_conversions {
    use super::*;

    #[test]
    fn reference_plane_round_trip() {
        for plane in [ReferencePlane::Internal, ReferencePlane::User] {
            assert_eq!(ReferencePlane::from_wfs(plane.to_wfs()), plane);
        }
        assert_eq!(ReferencePlane::Internal.to_wfs(), 0);
        assert_eq!(ReferencePlane::User.to_wfs(), 1);
        // Unknown driver values fall back to the internal plane.
        assert_eq!(ReferencePlane::from_wfs(99), ReferencePlane::Internal);
    }

    #[test]
    fn wavefront_type_round_trip() {
        for wf in [
            WavefrontType::Measured,
            WavefrontType::Reconstructed,
            WavefrontType::Difference,
        ] {
            assert_eq!(WavefrontType::from_wfs(wf.to_wfs()), wf);
        }
        assert_eq!(WavefrontType::Measured.as_str(), "Measured");
    }

    #[test]
    fn pixel_format_values() {
        assert_eq!(PixelFormat::Mono8.to_wfs(), 0);
        assert_eq!(PixelFormat::Mono16.to_wfs(), 1);
    }
}

// =============================================================================
// Configuration Model
// =============================================================================

mod configuration {
    use super::*;

    #[test]
    fn parses_legacy_dictionary_shape() {
        let config = CameraConfig::from_json(
            r#"[
                {"mla": {"mla_index": 0}},
                {"resolution": {"cam_resol_index": 2}},
                {"reference_plane": {"internal": true}},
                {"pupil": {"center": [0.0, 0.0], "diameter": [3.0, 3.0]}}
            ]"#,
        )
        .unwrap();

        assert_eq!(config.0.len(), 4);
        assert_eq!(config.0[0], FeatureSetting::Mla { mla_index: 0 });
        assert_eq!(
            config.0[3],
            FeatureSetting::Pupil {
                center: [0.0, 0.0],
                diameter: [3.0, 3.0],
            }
        );
    }

    #[test]
    fn insertion_order_is_preserved() {
        let config = CameraConfig::from_json(
            r#"[
                {"reference_plane": {"internal": false}},
                {"mla": {"mla_index": 1}}
            ]"#,
        )
        .unwrap();
        assert!(matches!(
            config.0[0],
            FeatureSetting::ReferencePlane { internal: false }
        ));
        assert!(matches!(config.0[1], FeatureSetting::Mla { mla_index: 1 }));
    }

    #[test]
    fn unknown_feature_name_is_an_error() {
        // A typo like "pupill" used to be silently skipped; it must now fail
        // at parse time.
        let err = CameraConfig::from_json(
            r#"[{"pupill": {"center": [0.0, 0.0], "diameter": [3.0, 3.0]}}]"#,
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("pupill"), "unexpected error: {message}");
    }

    #[test]
    fn malformed_arguments_are_an_error() {
        assert!(CameraConfig::from_json(r#"[{"mla": {"mla_index": "zero"}}]"#).is_err());
        assert!(CameraConfig::from_json(r#"[{"pupil": {"center": [0.0]}}]"#).is_err());
    }

    #[test]
    fn default_configuration_shape() {
        let config = CameraConfig::default();
        assert_eq!(config.0.len(), 4);
        // MLA selection precedes the resolution entry so the spot grid
        // established by configure stays valid.
        assert!(matches!(config.0[0], FeatureSetting::Mla { .. }));
        assert!(matches!(config.0[1], FeatureSetting::Resolution { .. }));
    }

    #[test]
    fn serde_round_trip() {
        let config = CameraConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed = CameraConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
    }
}

// =============================================================================
// Mock Setter Round-Trips
// =============================================================================

#[cfg(not(feature = "wfs_hardware"))]
mod mock_setters {
    use super::common;
    use wfs_driver::{HighspeedOptions, PupilGeometry, ReferencePlane, WfsSession};

    #[test]
    fn pupil_round_trip() {
        common::init_tracing();
        let mut session = WfsSession::open(0).unwrap();
        let pupil = PupilGeometry {
            center_mm: (0.25, -0.5),
            diameter_mm: (3.0, 3.0),
        };
        session.set_pupil(pupil).unwrap();
        assert_eq!(session.pupil().unwrap(), pupil);
    }

    #[test]
    fn reference_plane_round_trip() {
        let mut session = WfsSession::open(0).unwrap();
        session.set_reference_plane(ReferencePlane::User).unwrap();
        assert_eq!(session.reference_plane().unwrap(), ReferencePlane::User);
    }

    #[test]
    fn mla_count_reported() {
        let session = WfsSession::open(0).unwrap();
        assert_eq!(session.mla_count().unwrap(), 2);
    }

    #[test]
    fn exposure_and_gain_setters_report_applied_values() {
        let mut session = WfsSession::open(0).unwrap();
        let range = session.exposure_time_range().unwrap();
        assert!(range.min_ms < range.max_ms);

        assert_eq!(session.set_exposure_time(5.0).unwrap(), 5.0);
        assert_eq!(session.set_master_gain(2.0).unwrap(), 2.0);
    }

    #[test]
    fn highspeed_mode_logged() {
        let mut session = WfsSession::open(0).unwrap();
        session
            .set_highspeed_mode(HighspeedOptions {
                enabled: true,
                adapt_centroids: true,
                subtract_offset: 0,
                allow_auto_exposure: true,
            })
            .unwrap();
        let log = session
            .connection()
            .mock_state
            .lock()
            .unwrap()
            .call_log
            .clone();
        assert!(log.contains(&"WFS_SetHighspeedMode"));
    }

    #[test]
    fn identity_and_revision_queries() {
        let session = WfsSession::open(0).unwrap();
        let identity = session.identity().unwrap();
        assert_eq!(identity.manufacturer, "Thorlabs");
        assert_eq!(identity.instrument_name, "WFS150-5C");

        let revision = session.revision().unwrap();
        assert!(!revision.instrument_driver.is_empty());
        assert_eq!(session.status().unwrap(), 0);
    }
}
