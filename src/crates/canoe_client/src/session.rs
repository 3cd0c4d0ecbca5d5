use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::automation::{AutomationError, Connection, Connector};
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::logging;
use crate::poll::{wait_until, Readiness};
use crate::refs::{SignalRef, VariableRef};
use crate::registry::{HandleRegistry, Role};
use crate::variant::{ArrayValue, CoercionError, ObjectRef, Value, Variant};

/// The tool accepts at most this many positional arguments per CAPL call.
pub const MAX_CAPL_ARGUMENTS: usize = 10;

/// Client-side view of the measurement run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MeasurementPhase {
    Stopped,
    Starting,
    Running,
    Stopping,
    Resetting,
}

/// Snapshot returned by [`Session::status`].
#[derive(Debug, Clone, Serialize)]
pub struct Status {
    pub version: String,
    pub measurement_running: bool,
    pub configuration: Option<PathBuf>,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of [`Session::compile_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileReport {
    pub success: bool,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum MeasurementRequest {
    Start,
    Stop,
}

impl MeasurementRequest {
    fn method(self) -> &'static str {
        match self {
            MeasurementRequest::Start => "Start",
            MeasurementRequest::Stop => "Stop",
        }
    }

    fn wants_running(self) -> bool {
        matches!(self, MeasurementRequest::Start)
    }

    fn settled(self) -> MeasurementPhase {
        match self {
            MeasurementRequest::Start => MeasurementPhase::Running,
            MeasurementRequest::Stop => MeasurementPhase::Stopped,
        }
    }
}

/// Owns the automation connection to the bus tool and sequences every
/// operation through it.
///
/// The connection is established lazily by the lifecycle calls (`connect`,
/// `version`, `status` and the configuration operations). Everything else fails
/// fast with [`ClientError::Connection`] until then.
pub struct Session<C: Connector> {
    connector: C,
    connection: Option<C::Connection>,
    registry: HandleRegistry,
    config: ClientConfig,
    configuration_path: Option<PathBuf>,
    phase: MeasurementPhase,
}

impl<C: Connector> Session<C> {
    /// Build a disconnected session. Installs a log subscriber when the config asks for one.
    pub fn new(connector: C, config: ClientConfig) -> Self {
        if let Some(level) = config.log_level {
            logging::init(level);
        }
        Self {
            connector,
            connection: None,
            registry: HandleRegistry::default(),
            config,
            configuration_path: None,
            phase: MeasurementPhase::Stopped,
        }
    }

    /// Settings the session was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Whether a live automation connection is held.
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Last observed measurement phase. Transitional phases persist after a
    /// timed-out request until [`is_running`](Self::is_running) observes the tool again.
    pub fn phase(&self) -> MeasurementPhase {
        self.phase
    }

    /// Cached path of the open configuration. Best effort: changes made to the
    /// tool outside this session are only picked up by [`status`](Self::status).
    pub fn configuration_path(&self) -> Option<&Path> {
        self.configuration_path.as_deref()
    }

    /// Activate the bus tool, or reuse the live connection.
    pub fn connect(&mut self) -> ClientResult<()> {
        if self.connection.is_some() {
            return Ok(());
        }

        let mut connection = self
            .connector
            .activate()
            .map_err(|err| ClientError::connection(err.to_string()))?;
        let registry = match HandleRegistry::populate(&mut connection) {
            Ok(registry) => registry,
            Err(err) => {
                connection.release();
                return Err(ClientError::connection(format!(
                    "failed to resolve automation objects: {err}"
                )));
            }
        };
        self.connection = Some(connection);
        self.registry = registry;

        if let Err(err) = self.observe_connected_state() {
            warn!(error = %err, "initial state query failed; releasing connection");
            self.teardown();
            return Err(err);
        }
        info!(
            configuration = ?self.configuration_path,
            phase = ?self.phase,
            "connected to bus tool"
        );
        Ok(())
    }

    /// Full version string reported by the tool.
    pub fn version(&mut self) -> ClientResult<String> {
        self.connect()?;
        let version = self.handle(Role::Version)?;
        let name = self.get_property(version, "FullName", unexpected)?;
        match name {
            Variant::Str(text) => Ok(text),
            other => Err(ClientError::connection(format!(
                "version reported as {}",
                other.describe()
            ))),
        }
    }

    /// Version, run state and open configuration. Succeeds with no configuration open.
    pub fn status(&mut self) -> ClientResult<Status> {
        let version = self.version()?;
        let measurement_running = self.query_running()?;
        let configuration = self.live_configuration_path()?;
        self.configuration_path = configuration.clone();
        Ok(Status {
            version,
            measurement_running,
            configuration,
            timestamp: Utc::now(),
        })
    }

    /// Discard the active configuration and start a blank one.
    pub fn new_configuration(&mut self, auto_save: bool, prompt_user: bool) -> ClientResult<()> {
        self.connect()?;
        let application = self.handle(Role::Application)?;
        self.invoke(
            application,
            "New",
            &[Variant::Bool(auto_save), Variant::Bool(prompt_user)],
            |err| ClientError::configuration(None, err.to_string()),
        )?;

        self.registry.invalidate_configuration();
        self.configuration_path = None;
        self.observe_phase()?;
        info!(auto_save, prompt_user, "created new configuration");
        Ok(())
    }

    /// Load the configuration at `path`, which must reference an existing file.
    pub fn open(&mut self, path: impl AsRef<Path>) -> ClientResult<()> {
        let path = path.as_ref();
        let absolute = fs::canonicalize(path)
            .map_err(|err| ClientError::configuration(Some(path), err.to_string()))?;
        if !absolute.is_file() {
            return Err(ClientError::configuration(
                Some(&absolute),
                "not a configuration file",
            ));
        }

        self.connect()?;
        let application = self.handle(Role::Application)?;
        self.invoke(
            application,
            "Open",
            &[
                Variant::from(absolute.display().to_string()),
                Variant::Bool(false),
                Variant::Bool(false),
            ],
            |err| ClientError::configuration(Some(&absolute), err.to_string()),
        )?;

        self.registry.invalidate_configuration();
        self.configuration_path = Some(absolute);
        self.observe_phase()?;
        info!(path = %path.display(), "opened configuration");
        Ok(())
    }

    /// Save the active configuration in place. Fails for a configuration that has never been named.
    pub fn save(&mut self) -> ClientResult<()> {
        self.connect()?;
        let configuration = self.require_configuration()?;
        let current = self.live_configuration_path()?;
        let Some(current) = current else {
            return Err(ClientError::configuration(
                None,
                "configuration has never been saved; use save_as",
            ));
        };

        self.invoke(configuration, "Save", &[], |err| {
            ClientError::configuration(Some(&current), err.to_string())
        })?;
        info!(path = %current.display(), "saved configuration");
        self.configuration_path = Some(current);
        Ok(())
    }

    /// Persist the configuration under a new path. The cached path only moves on success.
    pub fn save_as(&mut self, path: impl AsRef<Path>) -> ClientResult<()> {
        let path = path.as_ref();
        let absolute = std::path::absolute(path)
            .map_err(|err| ClientError::configuration(Some(path), err.to_string()))?;

        self.connect()?;
        let configuration = self.require_configuration()?;
        self.invoke(
            configuration,
            "SaveAs",
            &[
                Variant::from(absolute.display().to_string()),
                Variant::Bool(false),
            ],
            |err| ClientError::configuration(Some(&absolute), err.to_string()),
        )?;

        info!(path = %absolute.display(), "saved configuration as");
        self.configuration_path = Some(absolute);
        Ok(())
    }

    /// Ask the tool to exit and release every handle. A no-op when not connected.
    pub fn quit(&mut self) -> ClientResult<()> {
        let Some(application) = self.registry_handle(Role::Application) else {
            return Ok(());
        };
        let result = self.invoke(application, "Quit", &[], unexpected);
        self.teardown();
        info!("quit bus tool");
        result.map(|_| ())
    }

    /// Single query of the tool's run state.
    pub fn is_running(&mut self) -> ClientResult<bool> {
        let running = self.query_running()?;
        self.phase = if running {
            MeasurementPhase::Running
        } else {
            MeasurementPhase::Stopped
        };
        Ok(running)
    }

    /// Request a measurement start and wait until the tool reports it running.
    pub fn start(&mut self) -> ClientResult<()> {
        self.drive(MeasurementRequest::Start, MeasurementPhase::Starting, "start")
    }

    /// Request a measurement stop and wait until the tool reports it stopped.
    pub fn stop(&mut self) -> ClientResult<()> {
        self.drive(MeasurementRequest::Stop, MeasurementPhase::Stopping, "stop")
    }

    /// Stop followed by start. The first failure ends the reset; nothing is rolled back.
    pub fn reset(&mut self) -> ClientResult<()> {
        info!("resetting measurement");
        self.drive(
            MeasurementRequest::Stop,
            MeasurementPhase::Resetting,
            "reset",
        )?;
        self.drive(
            MeasurementRequest::Start,
            MeasurementPhase::Resetting,
            "reset",
        )
    }

    /// Read a scalar variable.
    pub fn get_value(&mut self, reference: &VariableRef) -> ClientResult<Value> {
        let variable = self.lookup_variable(reference)?;
        let stored = self.read_value(variable, &reference.to_string())?;
        Value::from_variant(&stored).map_err(|err| coercion_failure(reference.to_string(), err))
    }

    /// Write a scalar variable, converted to the kind the tool currently stores.
    pub fn set_value(&mut self, reference: &VariableRef, value: impl Into<Value>) -> ClientResult<()> {
        let value = value.into();
        let label = reference.to_string();
        let variable = self.lookup_variable(reference)?;
        let stored = self.read_value(variable, &label)?;
        let converted = value
            .coerce_for(&stored)
            .map_err(|err| coercion_failure(label.clone(), err))?;
        self.write_value(variable, converted, &label)?;
        debug!(reference = %label, %value, "variable written");
        Ok(())
    }

    /// Read every element of an array variable; the tool's declared length decides how many.
    pub fn get_array(&mut self, reference: &VariableRef) -> ClientResult<ArrayValue> {
        let variable = self.lookup_variable(reference)?;
        let stored = self.read_value(variable, &reference.to_string())?;
        ArrayValue::from_variant(&stored)
            .map_err(|err| coercion_failure(reference.to_string(), err))
    }

    /// Overwrite a whole array variable. A length that differs from the declared
    /// one fails before anything is written.
    pub fn set_array(
        &mut self,
        reference: &VariableRef,
        values: impl Into<ArrayValue>,
    ) -> ClientResult<()> {
        let values = values.into();
        let label = reference.to_string();
        let variable = self.lookup_variable(reference)?;
        let stored = self.read_value(variable, &label)?;
        let converted = values
            .coerce_for(&stored)
            .map_err(|err| coercion_failure(label.clone(), err))?;
        self.write_value(variable, converted, &label)?;
        debug!(reference = %label, len = values.len(), "array variable written");
        Ok(())
    }

    /// Fully qualified name the tool uses for `signal`.
    pub fn signal_full_name(&mut self, signal: &SignalRef) -> ClientResult<String> {
        let object = self.lookup_signal(signal)?;
        let label = signal.to_string();
        match self.get_property(object, "FullName", |err| {
            ClientError::variable_not_found(format!("{label}: {err}"))
        })? {
            Variant::Str(name) => Ok(name),
            other => Err(ClientError::type_mismatch(label, "string", other.describe())),
        }
    }

    /// Read a signal's current value. Requires a running measurement.
    pub fn get_signal_value(&mut self, signal: &SignalRef) -> ClientResult<Value> {
        let label = signal.to_string();
        self.require_running(|| format!("reading signal {label}"))?;
        let object = self.lookup_signal(signal)?;
        let stored = self.read_value(object, &label)?;
        Value::from_variant(&stored).map_err(|err| coercion_failure(label, err))
    }

    /// Write a signal value. Requires a running measurement.
    pub fn set_signal_value(&mut self, signal: &SignalRef, value: impl Into<Value>) -> ClientResult<()> {
        let value = value.into();
        let label = signal.to_string();
        self.require_running(|| format!("writing signal {label}"))?;
        let object = self.lookup_signal(signal)?;
        let stored = self.read_value(object, &label)?;
        let converted = value
            .coerce_for(&stored)
            .map_err(|err| coercion_failure(label.clone(), err))?;
        self.write_value(object, converted, &label)?;
        debug!(signal = %label, %value, "signal written");
        Ok(())
    }

    /// Recompile every CAPL node of the active configuration.
    pub fn compile_all(&mut self) -> ClientResult<CompileReport> {
        let capl = self.handle(Role::Capl)?;
        self.require_configuration()?;
        let compile_failure = |err: AutomationError| ClientError::configuration(None, err.to_string());
        self.invoke(capl, "Compile", &[], compile_failure)?;

        let result = self
            .get_property(capl, "CompileResult", compile_failure)?
            .as_object()
            .ok_or_else(|| ClientError::configuration(None, "compile result unavailable"))?;
        let code = self.get_property(result, "result", compile_failure)?;
        let success = code.as_i64() == Some(0);
        let message = if success {
            None
        } else {
            self.get_property(result, "errorMessage", compile_failure)?
                .as_str()
                .map(str::to_string)
        };

        if success {
            info!("CAPL nodes compiled");
        } else {
            warn!(message = message.as_deref().unwrap_or(""), "CAPL compilation failed");
        }
        Ok(CompileReport { success, message })
    }

    /// Call an allow-listed CAPL function. `None` means the function returned nothing.
    pub fn call(&mut self, name: &str, args: &[Value]) -> ClientResult<Option<Value>> {
        if !self.config.allows(name) {
            warn!(name, "refusing CAPL call outside the allow-list");
            return Err(ClientError::UnauthorizedFunction {
                name: name.to_string(),
            });
        }
        if args.len() > MAX_CAPL_ARGUMENTS {
            return Err(ClientError::UnsupportedType {
                reference: name.to_string(),
                kind: format!("{} arguments (at most {MAX_CAPL_ARGUMENTS})", args.len()),
            });
        }

        let capl = self.handle(Role::Capl)?;
        self.require_configuration()?;
        let call_failure = |err: AutomationError| match err {
            AutomationError::NotFound { .. } | AutomationError::UnknownMember { .. } => {
                ClientError::function_not_found(name)
            }
            AutomationError::WrongType { message, .. } => {
                ClientError::type_mismatch(name, "compatible arguments", message)
            }
            AutomationError::Rejected { message, .. } => ClientError::function_failed(name, message),
            other => ClientError::function_failed(name, other.to_string()),
        };
        let function = self
            .invoke(capl, "GetFunction", &[Variant::from(name)], call_failure)?
            .as_object()
            .ok_or_else(|| ClientError::function_not_found(name))?;

        let variants: Vec<Variant> = args.iter().map(Value::to_variant).collect();
        let returned = self.invoke(function, "Call", &variants, call_failure)?;
        info!(name, args = args.len(), "called CAPL function");
        match returned {
            Variant::Empty => Ok(None),
            other => Value::from_variant(&other)
                .map(Some)
                .map_err(|err| coercion_failure(name.to_string(), err)),
        }
    }

    /// Attach a database file to the active configuration.
    pub fn add_database(&mut self, path: impl AsRef<Path>) -> ClientResult<()> {
        let path = path.as_ref();
        let absolute =
            fs::canonicalize(path).map_err(|err| ClientError::database(path, err.to_string()))?;
        if !absolute.is_file() {
            return Err(ClientError::database(&absolute, "not a database file"));
        }

        let databases = self.require_databases(&absolute)?;
        self.invoke(
            databases,
            "Add",
            &[Variant::from(absolute.display().to_string())],
            |err| ClientError::database(&absolute, err.to_string()),
        )?;
        info!(path = %absolute.display(), "database attached");
        Ok(())
    }

    /// Detach a database. The file itself may already be gone from disk.
    pub fn remove_database(&mut self, path: impl AsRef<Path>) -> ClientResult<()> {
        let path = path.as_ref();
        let absolute = fs::canonicalize(path)
            .or_else(|_| std::path::absolute(path))
            .map_err(|err| ClientError::database(path, err.to_string()))?;

        let attached = self.databases()?;
        let Some(position) = attached.iter().position(|entry| *entry == absolute) else {
            return Err(ClientError::database(&absolute, "database is not attached"));
        };

        let databases = self.require_databases(&absolute)?;
        // The collection is 1-based.
        let index = i64::try_from(position + 1)
            .map_err(|_| ClientError::database(&absolute, "database index out of range"))?;
        self.invoke(databases, "Remove", &[Variant::Int(index)], |err| {
            ClientError::database(&absolute, err.to_string())
        })?;
        info!(path = %absolute.display(), "database detached");
        Ok(())
    }

    /// Paths of every database attached to the active configuration.
    pub fn databases(&mut self) -> ClientResult<Vec<PathBuf>> {
        let label = self
            .configuration_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("<active configuration>"));
        let databases = self.require_databases(&label)?;
        let failure = |err: AutomationError| ClientError::database(&label, err.to_string());

        let count = self
            .get_property(databases, "Count", failure)?
            .as_i64()
            .ok_or_else(|| ClientError::database(&label, "database count unavailable"))?;
        let mut paths = Vec::new();
        for index in 1..=count {
            let item = self
                .invoke(databases, "Item", &[Variant::Int(index)], failure)?
                .as_object()
                .ok_or_else(|| ClientError::database(&label, "database entry unavailable"))?;
            if let Variant::Str(name) = self.get_property(item, "FullName", failure)? {
                paths.push(PathBuf::from(name));
            }
        }
        Ok(paths)
    }

    fn drive(
        &mut self,
        request: MeasurementRequest,
        transitional: MeasurementPhase,
        operation: &'static str,
    ) -> ClientResult<()> {
        let measurement = self.handle(Role::Measurement)?;
        let target = request.wants_running();
        if self.query_running()? == target {
            self.phase = request.settled();
            debug!(operation, phase = ?self.phase, "measurement already settled");
            return Ok(());
        }

        self.phase = transitional;
        info!(operation, request = request.method(), "requesting measurement transition");
        let configuration = self.configuration_path.clone();
        self.invoke(measurement, request.method(), &[], |err| {
            ClientError::configuration(
                configuration.as_deref(),
                format!("measurement {operation} rejected: {err}"),
            )
        })?;

        let policy = self.config.poll_policy();
        match wait_until(policy, || Ok::<_, ClientError>(self.query_running()? == target))? {
            Readiness::Ready { elapsed } => {
                self.phase = request.settled();
                info!(
                    operation,
                    elapsed = ?elapsed,
                    phase = ?self.phase,
                    "measurement transition complete"
                );
                Ok(())
            }
            Readiness::TimedOut { waited } => {
                warn!(
                    operation,
                    waited = ?waited,
                    "measurement transition timed out"
                );
                Err(ClientError::MeasurementTimeout {
                    operation,
                    timeout: policy.timeout,
                })
            }
        }
    }

    fn observe_connected_state(&mut self) -> ClientResult<()> {
        self.configuration_path = self.live_configuration_path()?;
        self.observe_phase()
    }

    fn query_running(&mut self) -> ClientResult<bool> {
        let measurement = self.handle(Role::Measurement)?;
        let running = self.get_property(measurement, "Running", unexpected)?;
        running.as_bool().ok_or_else(|| {
            ClientError::connection(format!(
                "measurement state reported as {}",
                running.describe()
            ))
        })
    }

    fn observe_phase(&mut self) -> ClientResult<()> {
        self.is_running().map(|_| ())
    }

    fn require_running(&mut self, operation: impl FnOnce() -> String) -> ClientResult<()> {
        if self.query_running()? {
            Ok(())
        } else {
            Err(ClientError::not_running(operation()))
        }
    }

    fn require_configuration(&mut self) -> ClientResult<ObjectRef> {
        self.role(Role::Configuration)?
            .ok_or_else(|| ClientError::configuration(None, "no configuration is open"))
    }

    fn require_databases(&mut self, label: &Path) -> ClientResult<ObjectRef> {
        self.role(Role::Databases)?
            .ok_or_else(|| ClientError::database(label, "no configuration is open"))
    }

    fn live_configuration_path(&mut self) -> ClientResult<Option<PathBuf>> {
        let Some(configuration) = self.role(Role::Configuration)? else {
            return Ok(None);
        };
        match self.get_property(configuration, "FullName", unexpected)? {
            Variant::Str(name) if !name.is_empty() => Ok(Some(PathBuf::from(name))),
            _ => Ok(None),
        }
    }

    fn lookup_variable(&mut self, reference: &VariableRef) -> ClientResult<ObjectRef> {
        self.require_configuration()?;
        let label = reference.to_string();
        let missing = |_: AutomationError| ClientError::variable_not_found(label.clone());

        let found = match reference {
            VariableRef::Environment(name) => {
                let environment = self.handle(Role::Environment)?;
                self.invoke(environment, "GetVariable", &[Variant::from(name.as_str())], missing)?
            }
            VariableRef::System { namespace, name } => {
                let namespaces = self.handle(Role::SystemNamespaces)?;
                let space = self
                    .invoke(namespaces, "Item", &[Variant::from(namespace.as_str())], missing)?
                    .as_object()
                    .ok_or_else(|| ClientError::variable_not_found(label.clone()))?;
                let variables = self
                    .get_property(space, "Variables", missing)?
                    .as_object()
                    .ok_or_else(|| ClientError::variable_not_found(label.clone()))?;
                self.invoke(variables, "Item", &[Variant::from(name.as_str())], missing)?
            }
        };
        found
            .as_object()
            .ok_or_else(|| ClientError::variable_not_found(label))
    }

    fn lookup_signal(&mut self, signal: &SignalRef) -> ClientResult<ObjectRef> {
        self.require_configuration()?;
        let label = signal.to_string();
        let missing = |_: AutomationError| ClientError::variable_not_found(label.clone());

        let application = self.handle(Role::Application)?;
        let bus = self
            .invoke(application, "GetBus", &[Variant::from(signal.bus.as_str())], missing)?
            .as_object()
            .ok_or_else(|| ClientError::variable_not_found(label.clone()))?;
        self.invoke(
            bus,
            "GetSignal",
            &[
                Variant::Int(i64::from(signal.channel)),
                Variant::from(signal.message.as_str()),
                Variant::from(signal.signal.as_str()),
            ],
            missing,
        )?
        .as_object()
        .ok_or_else(|| ClientError::variable_not_found(label))
    }

    fn read_value(&mut self, object: ObjectRef, label: &str) -> ClientResult<Variant> {
        self.get_property(object, "Value", |err| {
            ClientError::variable_not_found(format!("{label}: {err}"))
        })
    }

    fn write_value(&mut self, object: ObjectRef, value: Variant, label: &str) -> ClientResult<()> {
        self.set_property(object, "Value", value, |err| match err {
            AutomationError::WrongType { message, .. } | AutomationError::Rejected { message, .. } => {
                ClientError::type_mismatch(label, "value accepted by the tool", message)
            }
            other => ClientError::variable_not_found(format!("{label}: {other}")),
        })
    }

    fn handle(&mut self, role: Role) -> ClientResult<ObjectRef> {
        self.role(role)?.ok_or_else(|| {
            ClientError::connection(format!("automation object for {role:?} unavailable"))
        })
    }

    fn registry_handle(&mut self, role: Role) -> Option<ObjectRef> {
        let connection = self.connection.as_mut()?;
        self.registry.resolve(connection, role).ok().flatten()
    }

    fn role(&mut self, role: Role) -> ClientResult<Option<ObjectRef>> {
        let connection = self.connection.as_mut().ok_or_else(not_connected)?;
        self.registry
            .resolve(connection, role)
            .map_err(|err| classify(err, unexpected))
    }

    fn get_property(
        &mut self,
        object: ObjectRef,
        name: &str,
        on_error: impl FnOnce(AutomationError) -> ClientError,
    ) -> ClientResult<Variant> {
        let connection = self.connection.as_mut().ok_or_else(not_connected)?;
        connection
            .get_property(object, name)
            .map_err(|err| classify(err, on_error))
    }

    fn set_property(
        &mut self,
        object: ObjectRef,
        name: &str,
        value: Variant,
        on_error: impl FnOnce(AutomationError) -> ClientError,
    ) -> ClientResult<()> {
        let connection = self.connection.as_mut().ok_or_else(not_connected)?;
        connection
            .set_property(object, name, value)
            .map_err(|err| classify(err, on_error))
    }

    fn invoke(
        &mut self,
        object: ObjectRef,
        method: &str,
        args: &[Variant],
        on_error: impl FnOnce(AutomationError) -> ClientError,
    ) -> ClientResult<Variant> {
        let connection = self.connection.as_mut().ok_or_else(not_connected)?;
        connection
            .invoke(object, method, args)
            .map_err(|err| classify(err, on_error))
    }

    fn teardown(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            connection.release();
        }
        self.registry.clear();
        self.configuration_path = None;
        self.phase = MeasurementPhase::Stopped;
    }
}

impl<C: Connector> Drop for Session<C> {
    fn drop(&mut self) {
        // The tool outlives the session; only the handles are given back.
        if self.connection.is_some() {
            debug!("releasing automation connection");
        }
        self.teardown();
    }
}

fn not_connected() -> ClientError {
    ClientError::connection("not connected to the bus tool; call connect() first")
}

fn unexpected(err: AutomationError) -> ClientError {
    ClientError::connection(format!("unexpected automation failure: {err}"))
}

/// A dropped server or released handle is always a connection failure; anything
/// else is interpreted by the operation in progress.
fn classify(
    err: AutomationError,
    otherwise: impl FnOnce(AutomationError) -> ClientError,
) -> ClientError {
    match err {
        AutomationError::Unavailable(_) | AutomationError::Released => {
            ClientError::connection(err.to_string())
        }
        other => {
            debug!(error = %other, "automation call failed");
            otherwise(other)
        }
    }
}

fn coercion_failure(reference: String, err: CoercionError) -> ClientError {
    match err {
        CoercionError::Mismatch { expected, found } => {
            ClientError::type_mismatch(reference, expected, found)
        }
        CoercionError::Unsupported(kind) => ClientError::unsupported(reference, kind),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tracing_test::traced_test;

    use super::*;
    use crate::error::ErrorKind;
    use crate::fake::FakeBusTool;

    fn opened(fake: FakeBusTool) -> (Session<FakeBusTool>, tempfile::TempDir) {
        let workdir = tempfile::tempdir().unwrap();
        let configuration = workdir.path().join("demo.cfg");
        fs::write(&configuration, b"demo\n").unwrap();
        let config = ClientConfig::new()
            .with_capl_function("hello_world")
            .with_poll_interval(Duration::from_millis(1));
        let mut session = Session::new(fake, config);
        session.open(&configuration).unwrap();
        (session, workdir)
    }

    #[test]
    #[traced_test]
    fn measurement_transitions_are_logged() {
        let (mut session, _workdir) = opened(FakeBusTool::demo());

        session.start().unwrap();
        session.stop().unwrap();

        assert!(logs_contain("requesting measurement transition"));
        assert!(logs_contain("measurement transition complete"));
    }

    #[test]
    #[traced_test]
    fn refused_capl_calls_are_logged() {
        let (mut session, _workdir) = opened(FakeBusTool::demo());

        let err = session.call("multiply_function", &[]).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::UnauthorizedFunction);
        assert!(logs_contain("refusing CAPL call outside the allow-list"));
    }

    #[test]
    fn configuration_handles_follow_the_active_configuration() {
        let fake = FakeBusTool::demo();
        let (mut session, _workdir) = opened(fake.clone());
        assert!(session.role(Role::Databases).unwrap().is_some());

        session.new_configuration(false, false).unwrap();

        assert!(session.role(Role::Configuration).unwrap().is_some());
        assert_eq!(session.live_configuration_path().unwrap(), None);
        assert!(fake.has_configuration());
    }

    #[test]
    fn released_handles_surface_as_connection_errors() {
        let err = classify(AutomationError::Released, |_| {
            ClientError::variable_not_found("unused")
        });
        assert_eq!(err.kind(), ErrorKind::Connection);

        let err = classify(
            AutomationError::NotFound {
                item: "speed".to_string(),
            },
            |_| ClientError::variable_not_found("sys:ns::speed"),
        );
        assert_eq!(err.kind(), ErrorKind::VariableNotFound);
    }

    #[test]
    fn configured_log_level_installs_the_global_subscriber() {
        let config = ClientConfig::new().with_log_level(tracing::Level::DEBUG);
        let session = Session::new(FakeBusTool::demo(), config);

        assert_eq!(session.config().log_level, Some(tracing::Level::DEBUG));
        assert!(!logging::init(tracing::Level::INFO));
    }
}
