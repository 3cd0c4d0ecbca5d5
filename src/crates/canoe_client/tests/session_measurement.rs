#![cfg(feature = "test-support")]

#[path = "support.rs"]
mod support;

use std::time::Duration;

use canoe_client::fake::FakeBusTool;
use canoe_client::{ClientError, ErrorKind, MeasurementPhase, Session};
use support::{fast_config, opened_session, opened_session_with};

fn measurement_requests(fake: &FakeBusTool) -> Vec<String> {
    fake.calls()
        .into_iter()
        .filter(|call| call == "Measurement.Start" || call == "Measurement.Stop")
        .collect()
}

#[test]
fn start_waits_until_running() {
    let (mut session, fake, _workdir) =
        opened_session_with(FakeBusTool::demo().with_transition_polls(5), fast_config());
    assert_eq!(session.phase(), MeasurementPhase::Stopped);

    session.start().expect("start should complete");

    assert!(fake.is_running());
    assert!(session.is_running().expect("query"));
    assert_eq!(session.phase(), MeasurementPhase::Running);
}

#[test]
fn stop_waits_until_stopped() {
    let (mut session, fake, _workdir) = opened_session();
    session.start().expect("start");

    session.stop().expect("stop should complete");

    assert!(!fake.is_running());
    assert!(!session.is_running().expect("query"));
    assert_eq!(session.phase(), MeasurementPhase::Stopped);
}

#[test]
fn start_and_stop_are_idempotent() {
    let (mut session, fake, _workdir) = opened_session();

    session.stop().expect("stopping a stopped measurement");
    session.start().expect("start");
    session.start().expect("starting a running measurement");

    assert_eq!(measurement_requests(&fake), vec!["Measurement.Start"]);
}

#[test]
fn reset_is_stop_then_start() {
    let (mut session, fake, _workdir) = opened_session();
    session.start().expect("start");

    session.reset().expect("reset");

    assert!(fake.is_running());
    assert_eq!(session.phase(), MeasurementPhase::Running);
    assert_eq!(
        measurement_requests(&fake),
        vec!["Measurement.Start", "Measurement.Stop", "Measurement.Start"]
    );
}

#[test]
fn reset_from_stopped_only_starts() {
    let (mut session, fake, _workdir) = opened_session();

    session.reset().expect("reset");

    assert!(fake.is_running());
    assert_eq!(measurement_requests(&fake), vec!["Measurement.Start"]);
}

#[test]
fn start_times_out_without_rollback() {
    let config = fast_config().with_measurement_timeout(Duration::from_millis(40));
    let (mut session, fake, _workdir) = opened_session_with(FakeBusTool::demo().stalled(), config);

    let err = session.start().expect_err("stalled start");

    match err {
        ClientError::MeasurementTimeout { operation, timeout } => {
            assert_eq!(operation, "start");
            assert_eq!(timeout, Duration::from_millis(40));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(session.phase(), MeasurementPhase::Starting);
    assert_eq!(measurement_requests(&fake), vec!["Measurement.Start"]);

    // The request may still land later; the caller re-queries.
    fake.set_running(true);
    assert!(session.is_running().expect("query"));
    assert_eq!(session.phase(), MeasurementPhase::Running);
}

#[test]
fn stop_times_out_when_tool_never_settles() {
    let config = fast_config().with_measurement_timeout(Duration::from_millis(30));
    let (mut session, fake, _workdir) =
        opened_session_with(FakeBusTool::demo().with_transition_polls(u32::MAX), config);
    fake.set_running(true);

    let err = session.stop().expect_err("stop never settles");

    assert_eq!(err.kind(), ErrorKind::MeasurementTimeout);
    assert_eq!(session.phase(), MeasurementPhase::Stopping);
    assert!(fake.is_running());
}

#[test]
fn reset_fails_with_first_error_and_skips_start() {
    let config = fast_config().with_measurement_timeout(Duration::from_millis(30));
    let (mut session, fake, _workdir) =
        opened_session_with(FakeBusTool::demo().with_transition_polls(u32::MAX), config);
    fake.set_running(true);

    let err = session.reset().expect_err("stop half stalls");

    match err {
        ClientError::MeasurementTimeout { operation, .. } => assert_eq!(operation, "reset"),
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(session.phase(), MeasurementPhase::Resetting);
    assert_eq!(measurement_requests(&fake), vec!["Measurement.Stop"]);
}

#[test]
fn start_without_configuration_is_rejected() {
    let mut session = Session::new(FakeBusTool::demo(), fast_config());
    session.connect().expect("connect");

    let err = session.start().expect_err("nothing to run");

    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn is_running_tracks_external_changes() {
    let (mut session, fake, _workdir) = opened_session();

    fake.set_running(true);
    assert!(session.is_running().expect("query"));
    fake.set_running(false);
    assert!(!session.is_running().expect("query"));
    assert_eq!(session.phase(), MeasurementPhase::Stopped);
}
