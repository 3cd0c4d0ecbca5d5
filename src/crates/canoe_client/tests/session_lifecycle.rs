#![cfg(feature = "test-support")]

#[path = "support.rs"]
mod support;

use std::fs;

use canoe_client::fake::FakeBusTool;
use canoe_client::{ClientError, ErrorKind, MeasurementPhase, Session, VariableRef};
use support::{fast_config, opened_session, write_file};
use tempfile::TempDir;

#[test]
fn connect_is_idempotent() {
    let fake = FakeBusTool::demo();
    let mut session = Session::new(fake.clone(), fast_config());

    session.connect().expect("first connect");
    session.connect().expect("second connect");

    assert!(session.is_connected());
    assert_eq!(fake.activations(), 1);
}

#[test]
fn unreachable_tool_is_a_connection_error() {
    let mut session = Session::new(FakeBusTool::unavailable(), fast_config());

    let err = session.connect().expect_err("activation should fail");
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert!(!session.is_connected());
}

#[test]
fn lifecycle_queries_connect_lazily() {
    let fake = FakeBusTool::demo().with_version("CANoe 17.3.91");
    let mut session = Session::new(fake.clone(), fast_config());

    assert_eq!(session.version().expect("version"), "CANoe 17.3.91");
    assert_eq!(fake.activations(), 1);
}

#[test]
fn non_lifecycle_operations_fail_fast_before_connect() {
    let fake = FakeBusTool::demo();
    let mut session = Session::new(fake.clone(), fast_config());

    let err = session.is_running().expect_err("not connected");
    assert_eq!(err.kind(), ErrorKind::Connection);
    let err = session
        .get_value(&VariableRef::environment("int_var"))
        .expect_err("not connected");
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert_eq!(fake.activations(), 0);
    assert_eq!(fake.dispatch_count(), 0);
}

#[test]
fn status_succeeds_without_configuration() {
    let mut session = Session::new(FakeBusTool::demo(), fast_config());

    let status = session.status().expect("status should succeed");
    assert!(!status.version.is_empty());
    assert!(!status.measurement_running);
    assert_eq!(status.configuration, None);

    let json = serde_json::to_value(&status).expect("status serializes");
    assert!(json["configuration"].is_null());
    assert_eq!(json["measurement_running"], false);
}

#[test]
fn status_reports_open_configuration() {
    let (mut session, _fake, workdir) = opened_session();

    let status = session.status().expect("status");
    let expected = fs::canonicalize(workdir.path().join("demo.cfg")).expect("canonical path");
    assert_eq!(status.configuration, Some(expected));
}

#[test]
fn opening_missing_configuration_leaves_active_one() {
    let (mut session, fake, workdir) = opened_session();
    let before = session.configuration_path().map(|path| path.to_path_buf());

    let err = session
        .open(workdir.path().join("missing.cfg"))
        .expect_err("missing file should fail");

    match err {
        ClientError::Configuration { path, .. } => {
            assert_eq!(path, Some(workdir.path().join("missing.cfg")));
        }
        other => panic!("expected configuration error, got {other:?}"),
    }
    assert_eq!(session.configuration_path().map(|p| p.to_path_buf()), before);
    assert_eq!(fake.configuration_path(), before);
}

#[test]
fn vanished_configuration_is_a_configuration_error() {
    let workdir = TempDir::new().expect("temp workdir");
    let configuration = write_file(workdir.path(), "flaky.cfg");
    let fake = FakeBusTool::demo();
    let mut session = Session::new(fake.clone(), fast_config());
    session.connect().expect("connect");

    let resolved = fs::canonicalize(&configuration).expect("canonical path");
    fs::remove_file(&configuration).expect("remove");
    let err = session.open(&resolved).expect_err("vanished file");

    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(!fake.has_configuration());
}

#[test]
fn new_configuration_discards_cached_path() {
    let (mut session, fake, _workdir) = opened_session();
    assert!(session.configuration_path().is_some());

    session
        .new_configuration(false, false)
        .expect("new configuration");

    assert_eq!(session.configuration_path(), None);
    assert!(fake.has_configuration());
    assert_eq!(fake.configuration_path(), None);
}

#[test]
fn save_requires_a_file_name() {
    let mut session = Session::new(FakeBusTool::demo(), fast_config());
    session
        .new_configuration(false, false)
        .expect("new configuration");

    let err = session.save().expect_err("unnamed configuration");
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn save_as_moves_cached_path_only_on_success() {
    let (mut session, fake, workdir) = opened_session();
    let original = session.configuration_path().map(|path| path.to_path_buf());

    let unwritable = workdir.path().join("no_such_dir").join("copy.cfg");
    let err = session.save_as(&unwritable).expect_err("parent missing");
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(session.configuration_path().map(|p| p.to_path_buf()), original);

    let copy = workdir.path().join("copy.cfg");
    session.save_as(&copy).expect("save as");
    assert_eq!(session.configuration_path(), Some(copy.as_path()));
    assert_eq!(fake.configuration_path(), Some(copy.clone()));
    assert!(copy.is_file());

    session.save().expect("save to the new name");
}

#[test]
fn configuration_change_stops_running_measurement() {
    let (mut session, fake, workdir) = opened_session();
    session.start().expect("start");

    let other = write_file(workdir.path(), "other.cfg");
    session.open(&other).expect("open other");

    assert!(!fake.is_running());
    assert_eq!(session.phase(), MeasurementPhase::Stopped);
}

#[test]
fn quit_releases_handles_and_requires_reconnect() {
    let (mut session, fake, _workdir) = opened_session();

    session.quit().expect("quit");

    assert!(fake.quit_requested());
    assert_eq!(fake.releases(), 1);
    assert!(!session.is_connected());
    assert_eq!(session.configuration_path(), None);
    let err = session.start().expect_err("connection is gone");
    assert_eq!(err.kind(), ErrorKind::Connection);

    session.quit().expect("quitting twice is a no-op");
}

#[test]
fn dropping_the_session_keeps_the_tool_running() {
    let (session, fake, _workdir) = opened_session();

    drop(session);

    assert!(!fake.quit_requested());
    assert_eq!(fake.releases(), 1);
    assert!(fake.has_configuration());
}

#[test]
fn cached_path_goes_stale_until_status_refreshes_it() {
    let (mut session, fake, workdir) = opened_session();
    let other = write_file(workdir.path(), "other.cfg");

    fake.load_configuration(other.clone());
    assert_ne!(session.configuration_path(), Some(other.as_path()));

    let status = session.status().expect("status");
    assert_eq!(status.configuration, Some(other.clone()));
    assert_eq!(session.configuration_path(), Some(other.as_path()));
}

#[test]
fn failed_initial_state_query_leaves_the_session_disconnected() {
    let fake = FakeBusTool::demo();
    fake.fail_property("Running", "measurement object busy");
    let mut session = Session::new(fake.clone(), fast_config());

    let err = session.connect().expect_err("running state unreadable");
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert!(!session.is_connected());
    assert_eq!(fake.releases(), 1);

    let err = session.connect().expect_err("still unreadable");
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert_eq!(fake.activations(), 2);

    fake.restore_property("Running");
    fake.set_running(true);
    session.connect().expect("connect after recovery");
    assert!(session.is_connected());
    assert_eq!(session.phase(), MeasurementPhase::Running);
    assert_eq!(fake.activations(), 3);
}
