#![cfg(feature = "test-support")]
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use canoe_client::fake::FakeBusTool;
use canoe_client::{ClientConfig, Session};
use tempfile::TempDir;

pub fn fast_config() -> ClientConfig {
    ClientConfig::new()
        .with_capl_functions(["addition_function", "hello_world"])
        .with_poll_interval(Duration::from_millis(1))
        .with_measurement_timeout(Duration::from_secs(2))
}

pub fn write_file(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"fixture\n").expect("fixture should be written");
    path
}

/// Demo fake plus a session connected to it with `demo.cfg` opened.
pub fn opened_session() -> (Session<FakeBusTool>, FakeBusTool, TempDir) {
    opened_session_with(FakeBusTool::demo(), fast_config())
}

pub fn opened_session_with(
    fake: FakeBusTool,
    config: ClientConfig,
) -> (Session<FakeBusTool>, FakeBusTool, TempDir) {
    let workdir = TempDir::new().expect("temp workdir");
    let configuration = write_file(workdir.path(), "demo.cfg");

    let mut session = Session::new(fake.clone(), config);
    session.connect().expect("fake should activate");
    session
        .open(&configuration)
        .expect("configuration should open");
    (session, fake, workdir)
}
