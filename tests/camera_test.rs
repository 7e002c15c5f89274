//! Integration tests for the camera facade.
//!
//! Verifies the fixed acquisition pipeline ordering, lazy default
//! configuration, and the pupil-cropping contract between the two
//! acquisition entry points. All tests run against the mock connection.

mod common;

#[cfg(not(feature = "wfs_hardware"))]
mod mock_camera {
    use super::common;
    use wfs_driver::camera::{CameraConfig, FeatureSetting, WfsCamera};
    use wfs_driver::WfsSession;

    fn open_camera() -> WfsCamera {
        common::init_tracing();
        WfsCamera::new(WfsSession::open(0).unwrap())
    }

    fn call_log(camera: &WfsCamera) -> Vec<&'static str> {
        camera
            .session()
            .connection()
            .mock_state
            .lock()
            .unwrap()
            .call_log
            .clone()
    }

    #[test]
    fn pipeline_runs_in_fixed_order() {
        let mut camera = open_camera();
        camera.acquire_wavefront().unwrap();

        let log = call_log(&camera);
        let position = |name: &str| {
            log.iter()
                .position(|c| *c == name)
                .unwrap_or_else(|| panic!("{name} missing from {log:?}"))
        };

        let capture = position("WFS_TakeSpotfieldImageAutoExpos");
        let spots = position("WFS_CalcSpotsCentrDiaIntens");
        let deviations = position("WFS_CalcSpotToReferenceDeviations");
        let wavefront = position("WFS_CalcWavefront");
        assert!(capture < spots);
        assert!(spots < deviations);
        assert!(deviations < wavefront);
    }

    #[test]
    fn lazy_default_configuration() {
        let mut camera = open_camera();
        assert!(camera.configuration().is_none());

        camera.acquire_wavefront().unwrap();
        assert_eq!(camera.configuration(), Some(&CameraConfig::default()));

        // Configuration ran before the capture.
        let log = call_log(&camera);
        let configure = log.iter().position(|c| *c == "WFS_ConfigureCam").unwrap();
        let capture = log
            .iter()
            .position(|c| *c == "WFS_TakeSpotfieldImageAutoExpos")
            .unwrap();
        assert!(configure < capture);
    }

    #[test]
    fn configure_applies_settings_in_insertion_order() {
        let mut camera = open_camera();
        camera
            .configure(Some(CameraConfig(vec![
                FeatureSetting::Mla { mla_index: 1 },
                FeatureSetting::Resolution { cam_resol_index: 0 },
                FeatureSetting::ReferencePlane { internal: true },
            ])))
            .unwrap();

        let log = call_log(&camera);
        let mla = log.iter().position(|c| *c == "WFS_SelectMla").unwrap();
        let resolution = log.iter().position(|c| *c == "WFS_ConfigureCam").unwrap();
        let reference = log
            .iter()
            .position(|c| *c == "WFS_SetReferencePlane")
            .unwrap();
        assert!(mla < resolution);
        assert!(resolution < reference);

        // Resolution index 0 is the largest frame in the mock grid table.
        let grid = camera.session().spot_grid().unwrap();
        assert_eq!((grid.x, grid.y), (47, 35));
    }

    #[test]
    fn configure_stops_at_first_driver_rejection() {
        let mut camera = open_camera();
        let result = camera.configure(Some(CameraConfig(vec![
            FeatureSetting::Mla { mla_index: 99 },
            FeatureSetting::Resolution { cam_resol_index: 0 },
        ])));
        assert!(result.is_err());

        // The rejected configuration is not recorded as applied, and the
        // resolution entry after the failure never ran.
        assert!(camera.configuration().is_none());
        assert!(!call_log(&camera).contains(&"WFS_ConfigureCam"));
    }

    #[test]
    fn full_acquisition_disables_pupil_cropping() {
        let mut camera = open_camera();
        camera.acquire_wavefront().unwrap();
        assert_eq!(
            camera
                .session()
                .connection()
                .mock_state
                .lock()
                .unwrap()
                .last_limit_to_pupil,
            Some(true)
        );

        camera.acquire_wavefront_full().unwrap();
        assert_eq!(
            camera
                .session()
                .connection()
                .mock_state
                .lock()
                .unwrap()
                .last_limit_to_pupil,
            Some(false)
        );
    }

    #[test]
    fn full_output_never_smaller_than_cropped() {
        let mut camera = open_camera();
        let cropped = camera.acquire_wavefront().unwrap();
        let full = camera.acquire_wavefront_full().unwrap();

        assert!(full.cols() >= cropped.cols());
        assert!(full.rows() >= cropped.rows());

        // With cropping disabled, corner samples outside the pupil carry
        // data instead of being blanked.
        let corner = (0, 0);
        assert_eq!(cropped.get(corner.0, corner.1), Some(0.0));
        assert!(full.get(corner.0, corner.1).unwrap() > 0.0);
    }

    #[test]
    fn wavefront_shape_follows_configured_resolution() {
        let mut camera = open_camera();
        camera
            .configure(Some(CameraConfig(vec![FeatureSetting::Resolution {
                cam_resol_index: 3,
            }])))
            .unwrap();

        let wavefront = camera.acquire_wavefront().unwrap();
        assert_eq!((wavefront.cols(), wavefront.rows()), (23, 17));
    }

    #[test]
    fn each_acquisition_is_computed_fresh() {
        let mut camera = open_camera();
        camera.acquire_wavefront().unwrap();
        camera.acquire_wavefront().unwrap();

        let log = call_log(&camera);
        assert_eq!(
            log.iter()
                .filter(|c| **c == "WFS_TakeSpotfieldImageAutoExpos")
                .count(),
            2
        );
        assert_eq!(log.iter().filter(|c| **c == "WFS_CalcWavefront").count(), 2);
    }

    #[test]
    fn close_releases_session() {
        let camera = open_camera();
        camera.close();
    }
}
