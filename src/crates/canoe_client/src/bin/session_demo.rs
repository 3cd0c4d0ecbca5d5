//! Walks every session operation against the in-memory fake bus tool.

use std::fs;
use std::time::Duration;

use canoe_client::fake::FakeBusTool;
use canoe_client::{ClientConfig, ClientError, Session, SignalRef, Value, VariableRef};
use tracing::{info, warn, Level};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let workdir = std::env::temp_dir().join(format!("canoe_client_demo_{}", std::process::id()));
    fs::create_dir_all(&workdir)?;
    let configuration = workdir.join("demo.cfg");
    let database = workdir.join("demo.dbc");
    fs::write(&configuration, b"demo configuration\n")?;
    fs::write(&database, b"VERSION \"\"\n")?;

    let config = ClientConfig::new()
        .with_capl_functions(["addition_function", "hello_world"])
        .with_poll_interval(Duration::from_millis(20))
        .with_measurement_timeout(Duration::from_secs(2))
        .with_log_level(Level::INFO);
    let mut session = Session::new(FakeBusTool::demo(), config);

    session.connect()?;
    info!(version = %session.version()?, "bus tool reachable");
    println!("{}", serde_json::to_string_pretty(&session.status()?)?);

    session.new_configuration(false, false)?;
    session.open(&configuration)?;
    session.save()?;
    session.save_as(workdir.join("my_test_config.cfg"))?;

    session.start()?;
    session.reset()?;

    let flash_light = SignalRef::new("CAN", 1, "LightState", "FlashLight");
    info!(signal = %session.signal_full_name(&flash_light)?, "signal resolved");
    session.set_signal_value(&flash_light, 1)?;
    info!(value = %session.get_signal_value(&flash_light)?, "signal value");

    session.set_value(&VariableRef::environment("int_var"), 100)?;
    session.set_value(&VariableRef::environment("float_var"), 123.456)?;
    session.set_value(&VariableRef::environment("string_var"), "Hello from Rust")?;
    session.set_array(&VariableRef::environment("data_var"), vec![1_i64, 2, 3, 4, 5])?;

    let speed = VariableRef::parse_system("sys_var_demo::speed")?;
    session.set_value(&speed, 50)?;
    info!(value = %session.get_value(&speed)?, "system variable read back");
    let int_array = VariableRef::parse_system("sys_var_demo::int_array_var")?;
    session.set_array(&int_array, vec![10_i64, 20, 30, 40, 50])?;
    info!(values = ?session.get_array(&int_array)?, "system array read back");

    let report = session.compile_all()?;
    info!(success = report.success, "CAPL compile finished");
    let sum = session.call("addition_function", &[Value::from(10), Value::from(20)])?;
    info!(result = ?sum, "addition_function returned");
    session.call("hello_world", &[])?;
    match session.call("multiply_function", &[Value::from(1), Value::from(2)]) {
        Err(err @ ClientError::UnauthorizedFunction { .. }) => warn!(%err, "call refused"),
        other => warn!(result = ?other, "multiply_function was expected to be refused"),
    }

    session.add_database(&database)?;
    info!(databases = ?session.databases()?, "database attached");
    session.remove_database(&database)?;

    session.stop()?;
    session.quit()?;
    fs::remove_dir_all(&workdir)?;
    Ok(())
}
