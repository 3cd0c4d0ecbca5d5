//! Session client for driving the CANoe bus tool through its automation
//! interface: lifecycle and configuration control, measurement start/stop with
//! bounded readiness polling, typed access to environment variables, system
//! variables and bus signals, CAPL function calls and database attachment.
//!
//! The automation transport is abstracted behind [`Connector`] and
//! [`Connection`]; enable the `test-support` feature for an in-memory
//! [`fake::FakeBusTool`].
//!
//! Typical usage:
//! ```no_run
//! # #[cfg(feature = "test-support")]
//! # fn main() -> Result<(), canoe_client::ClientError> {
//! use canoe_client::fake::FakeBusTool;
//! use canoe_client::{ClientConfig, Session, Value, VariableRef};
//!
//! let config = ClientConfig::new().with_capl_functions(["addition_function", "hello_world"]);
//! let mut session = Session::new(FakeBusTool::demo(), config);
//! session.connect()?;
//! session.open("demo_cfg/demo.cfg")?;
//! session.start()?;
//!
//! let speed = VariableRef::parse_system("sys_var_demo::speed")?;
//! session.set_value(&speed, 50)?;
//! assert_eq!(session.get_value(&speed)?, Value::Int(50));
//!
//! session.compile_all()?;
//! let sum = session.call("addition_function", &[Value::from(10), Value::from(20)])?;
//! println!("addition_function returned {sum:?}");
//!
//! session.stop()?;
//! session.quit()?;
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "test-support"))]
//! # fn main() {}
//! ```

mod automation;
mod config;
mod error;
pub mod logging;
mod poll;
mod refs;
mod registry;
mod session;
mod variant;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use automation::{AutomationError, Connection, Connector};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult, ErrorKind};
pub use poll::{wait_until, PollPolicy, Readiness};
pub use refs::{SignalRef, VariableRef};
pub use session::{CompileReport, MeasurementPhase, Session, Status, MAX_CAPL_ARGUMENTS};
pub use variant::{ArrayValue, CoercionError, ObjectRef, Value, ValueKind, Variant};
