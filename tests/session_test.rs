//! Integration tests for the session layer.
//!
//! Covers discovery, the open/close lifecycle, the busy-instrument check,
//! and the spot-grid bookkeeping around camera configuration.
//!
//! ## Running Tests
//!
//! ```bash
//! # Mock mode tests (no hardware required)
//! cargo test --test session_test
//!
//! # Hardware tests
//! cargo test --test session_test --features "wfs_hardware,hardware_tests"
//! ```

mod common;

// =============================================================================
// Mock Mode Session Tests
// =============================================================================

#[cfg(not(feature = "wfs_hardware"))]
mod mock_session {
    use super::common;
    use wfs_driver::components::connection::WfsConnection;
    use wfs_driver::{WfsError, WfsSession};

    #[test]
    fn enumerate_instruments() {
        common::init_tracing();
        let instruments = WfsSession::instruments().unwrap();
        assert_eq!(instruments.len(), 2);
        assert_eq!(instruments[0].instrument_name, "WFS150-5C");
        assert_eq!(instruments[0].serial_number, "M00224955");
        assert!(!instruments[0].in_use);
        assert!(instruments[1].in_use);
    }

    #[test]
    fn instrument_count_requeries() {
        assert_eq!(WfsSession::instrument_count().unwrap(), 2);
        // Every count call is a fresh enumeration, not a cached value.
        let conn = WfsConnection::new();
        conn.list_instruments().unwrap();
        conn.list_instruments().unwrap();
        let log = conn.mock_state.lock().unwrap().call_log.clone();
        assert_eq!(
            log.iter()
                .filter(|c| **c == "WFS_GetInstrumentListInfo")
                .count(),
            2
        );
    }

    #[test]
    fn open_available_instrument() {
        let session = WfsSession::open(0).unwrap();
        assert!(session.connection().is_open());
        assert_eq!(session.info().device_id, 1);
        assert_eq!(session.info().resource_name, "USB::0x1313::0x0000::1");
    }

    #[test]
    fn open_busy_instrument_never_calls_init() {
        let mut conn = WfsConnection::new();
        let err = conn.open(1).unwrap_err();
        assert!(matches!(err, WfsError::DeviceBusy { index: 1, .. }));

        let log = conn.mock_state.lock().unwrap().call_log.clone();
        assert!(
            !log.contains(&"WFS_init"),
            "busy instrument must be rejected before native init, log: {:?}",
            log
        );
    }

    #[test]
    fn open_out_of_range_index() {
        let err = WfsSession::open(7).unwrap_err();
        assert!(matches!(
            err,
            WfsError::InvalidInstrumentIndex { index: 7, count: 2 }
        ));
    }

    #[test]
    fn open_with_no_instruments_attached() {
        let mut conn = WfsConnection::new();
        conn.mock_state.lock().unwrap().instruments.clear();
        let err = conn.open(0).unwrap_err();
        assert!(matches!(err, WfsError::NoInstruments));
    }

    #[test]
    fn close_releases_handle_once() {
        let mut conn = WfsConnection::new();
        conn.open(0).unwrap();
        assert!(conn.is_open());

        conn.close();
        assert!(!conn.is_open());
        conn.close(); // Second close is a no-op

        let log = conn.mock_state.lock().unwrap().call_log.clone();
        assert_eq!(log.iter().filter(|c| **c == "WFS_close").count(), 1);
    }

    #[test]
    fn configure_reports_spot_grid() {
        let mut session = WfsSession::open(0).unwrap();
        assert!(session.spot_grid().is_none());

        let grid = session.configure_cam(0).unwrap();
        assert_eq!((grid.x, grid.y), (47, 35));
        assert_eq!(session.spot_grid(), Some(grid));

        // A lower resolution yields a smaller grid.
        let grid = session.configure_cam(2).unwrap();
        assert_eq!((grid.x, grid.y), (31, 23));
    }

    #[test]
    fn wavefront_dimensions_never_exceed_spot_grid() {
        let mut session = WfsSession::open(0).unwrap();
        let grid = session.configure_cam(1).unwrap();

        session.take_spotfield_image_auto_expos().unwrap();
        session.calc_spots(true, false).unwrap();
        session.calc_deviations(true).unwrap();
        let wavefront = session
            .calc_wavefront(wfs_driver::WavefrontType::Measured, true)
            .unwrap();

        assert!(wavefront.cols() <= grid.x as usize);
        assert!(wavefront.rows() <= grid.y as usize);
        assert_eq!(wavefront.as_slice().len(), wavefront.cols() * wavefront.rows());
    }

    #[test]
    fn wavefront_without_configure_is_rejected() {
        let mut session = WfsSession::open(0).unwrap();
        session.take_spotfield_image_auto_expos().unwrap();
        session.calc_spots(true, false).unwrap();
        session.calc_deviations(true).unwrap();

        let err = session
            .calc_wavefront(wfs_driver::WavefrontType::Measured, true)
            .unwrap_err();
        assert!(matches!(err, WfsError::NotConfigured { .. }));
    }

    #[test]
    fn mla_change_invalidates_spot_grid() {
        let mut session = WfsSession::open(0).unwrap();
        session.configure_cam(1).unwrap();
        assert!(session.spot_grid().is_some());

        session.select_mla(1).unwrap();
        assert!(session.spot_grid().is_none(), "grid is stale after MLA change");

        session.take_spotfield_image_auto_expos().unwrap();
        session.calc_spots(true, false).unwrap();
        session.calc_deviations(true).unwrap();
        let err = session
            .calc_wavefront(wfs_driver::WavefrontType::Measured, true)
            .unwrap_err();
        assert!(matches!(err, WfsError::NotConfigured { .. }));

        // Reconfiguring restores a usable grid.
        session.configure_cam(1).unwrap();
        let wavefront = session
            .calc_wavefront(wfs_driver::WavefrontType::Measured, true)
            .unwrap();
        assert_eq!(wavefront.cols(), 39);
        assert_eq!(wavefront.rows(), 31);
    }

    #[test]
    fn select_mla_out_of_range_is_driver_error() {
        let mut session = WfsSession::open(0).unwrap();
        let err = session.select_mla(5).unwrap_err();
        assert!(matches!(
            err,
            WfsError::Api {
                function: "WFS_SelectMla",
                ..
            }
        ));
    }

    #[test]
    fn recapture_restarts_cycle() {
        let mut session = WfsSession::open(0).unwrap();
        session.configure_cam(2).unwrap();

        for _ in 0..2 {
            session.take_spotfield_image_auto_expos().unwrap();
            session.calc_spots(true, false).unwrap();
            session.calc_deviations(true).unwrap();
            session
                .calc_wavefront(wfs_driver::WavefrontType::Measured, true)
                .unwrap();
        }

        let log = session
            .connection()
            .mock_state
            .lock()
            .unwrap()
            .call_log
            .clone();
        assert_eq!(
            log.iter().filter(|c| **c == "WFS_CalcWavefront").count(),
            2,
            "results are computed fresh on every cycle"
        );
    }
}

// =============================================================================
// Hardware Session Tests (require an attached instrument)
// =============================================================================

#[cfg(all(feature = "wfs_hardware", feature = "hardware_tests"))]
mod hardware_session {
    use super::common;
    use wfs_driver::WfsSession;

    #[test]
    fn enumerate_and_open_first() {
        common::init_tracing();
        let instruments = WfsSession::instruments().unwrap();
        assert!(!instruments.is_empty(), "no WFS instrument attached");

        let mut session = WfsSession::open(0).unwrap();
        let grid = session.configure_cam(0).unwrap();
        assert!(grid.x > 0 && grid.y > 0);
        session.close();
    }
}
