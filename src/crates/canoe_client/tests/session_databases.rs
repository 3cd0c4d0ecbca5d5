#![cfg(feature = "test-support")]

#[path = "support.rs"]
mod support;

use std::fs;

use canoe_client::fake::FakeBusTool;
use canoe_client::{ClientError, ErrorKind, Session};
use support::{fast_config, opened_session, write_file};

#[test]
fn databases_attach_and_detach() {
    let (mut session, fake, workdir) = opened_session();
    let first = write_file(workdir.path(), "body.dbc");
    let second = write_file(workdir.path(), "powertrain.dbc");

    session.add_database(&first).expect("attach first");
    session.add_database(&second).expect("attach second");

    let first = fs::canonicalize(first).expect("canonical");
    let second = fs::canonicalize(second).expect("canonical");
    let mut attached = session.databases().expect("list");
    attached.sort();
    assert_eq!(attached, vec![first.clone(), second.clone()]);

    session.remove_database(&first).expect("detach");
    assert_eq!(fake.databases(), vec![second]);
}

#[test]
fn missing_database_file_is_a_database_error() {
    let (mut session, fake, workdir) = opened_session();
    let missing = workdir.path().join("missing.dbc");

    let err = session.add_database(&missing).expect_err("no such file");

    match err {
        ClientError::Database { path, .. } => assert_eq!(path, missing),
        other => panic!("expected database error, got {other:?}"),
    }
    assert!(fake.databases().is_empty());
}

#[test]
fn duplicate_attach_is_rejected_by_the_tool() {
    let (mut session, _fake, workdir) = opened_session();
    let database = write_file(workdir.path(), "body.dbc");
    session.add_database(&database).expect("attach");

    let err = session.add_database(&database).expect_err("already attached");

    assert_eq!(err.kind(), ErrorKind::Database);
}

#[test]
fn removing_unattached_database_fails() {
    let (mut session, _fake, workdir) = opened_session();
    let database = write_file(workdir.path(), "body.dbc");

    let err = session.remove_database(&database).expect_err("not attached");

    assert_eq!(err.kind(), ErrorKind::Database);
}

#[test]
fn database_deleted_from_disk_can_still_be_detached() {
    let (mut session, fake, workdir) = opened_session();
    let database = write_file(workdir.path(), "body.dbc");
    session.add_database(&database).expect("attach");
    let resolved = fs::canonicalize(&database).expect("canonical");

    fs::remove_file(&resolved).expect("delete file");
    session.remove_database(&resolved).expect("detach");

    assert!(fake.databases().is_empty());
}

#[test]
fn database_operations_need_a_configuration() {
    let workdir = tempfile::tempdir().expect("temp workdir");
    let database = write_file(workdir.path(), "body.dbc");
    let mut session = Session::new(FakeBusTool::demo(), fast_config());
    session.connect().expect("connect");

    let err = session.add_database(&database).expect_err("no configuration");

    assert_eq!(err.kind(), ErrorKind::Database);
}

#[test]
fn new_configuration_starts_without_databases() {
    let (mut session, _fake, workdir) = opened_session();
    let database = write_file(workdir.path(), "body.dbc");
    session.add_database(&database).expect("attach");

    session
        .new_configuration(false, false)
        .expect("new configuration");

    assert!(session.databases().expect("list").is_empty());
    session
        .add_database(&database)
        .expect("attach to the blank configuration");
}
