//! In-process stand-in for the bus tool's automation server.
//!
//! [`FakeBusTool`] models the slice of the tool's object graph the session
//! touches: the application object, measurement, configuration with its
//! database collection, environment and system variables, bus signals and the
//! CAPL function table. Clones share state, so a test can keep one clone for
//! inspection after handing another to a [`Session`](crate::Session).

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::automation::{AutomationError, Connection, Connector};
use crate::variant::{ObjectRef, Variant};

/// Body of a fake CAPL function.
pub type CaplBehavior = Arc<dyn Fn(&[Variant]) -> Result<Variant, String> + Send + Sync>;

type SignalKey = (String, u32, String, String);

#[derive(Debug, Clone, PartialEq)]
enum FakeObject {
    Application,
    Version,
    Measurement,
    Environment,
    EnvironmentVariable(String),
    System,
    Namespaces,
    Namespace(String),
    Variables(String),
    SystemVariable(String, String),
    Capl,
    CompileResult,
    CaplFunction(String),
    Bus(String),
    Signal(SignalKey),
    Configuration,
    GeneralSetup,
    DatabaseSetup,
    Databases,
    Database(PathBuf),
}

impl FakeObject {
    fn needs_configuration(&self) -> bool {
        matches!(
            self,
            FakeObject::Configuration
                | FakeObject::GeneralSetup
                | FakeObject::DatabaseSetup
                | FakeObject::Databases
                | FakeObject::Database(_)
        )
    }
}

#[derive(Clone)]
struct FakeFunction {
    params: usize,
    compiled: bool,
    behavior: CaplBehavior,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    running: bool,
    polls_left: u32,
}

#[derive(Debug, Clone, Default)]
struct FakeConfiguration {
    path: Option<PathBuf>,
    databases: Vec<PathBuf>,
}

struct FakeState {
    available: bool,
    version: String,
    running: bool,
    pending: Option<Pending>,
    transition_polls: u32,
    stalled: bool,
    configuration: Option<FakeConfiguration>,
    environment: BTreeMap<String, Variant>,
    system: BTreeMap<String, BTreeMap<String, Variant>>,
    signals: BTreeMap<SignalKey, Variant>,
    functions: BTreeMap<String, FakeFunction>,
    compile_error: Option<String>,
    last_compile_error: Option<String>,
    failing_properties: BTreeMap<String, String>,
    objects: Vec<FakeObject>,
    calls: Vec<String>,
    activations: u32,
    releases: u32,
    quit: bool,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            available: true,
            version: "CANoe 17.0.0 (fake)".to_string(),
            running: false,
            pending: None,
            transition_polls: 2,
            stalled: false,
            configuration: None,
            environment: BTreeMap::new(),
            system: BTreeMap::new(),
            signals: BTreeMap::new(),
            functions: BTreeMap::new(),
            compile_error: None,
            last_compile_error: None,
            failing_properties: BTreeMap::new(),
            objects: vec![FakeObject::Application],
            calls: Vec::new(),
            activations: 0,
            releases: 0,
            quit: false,
        }
    }
}

/// Shared, clonable fake of the bus tool.
#[derive(Clone, Default)]
pub struct FakeBusTool {
    state: Arc<Mutex<FakeState>>,
}

impl fmt::Debug for FakeBusTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("FakeBusTool")
            .field("running", &state.running)
            .field("configuration", &state.configuration)
            .field("calls", &state.calls.len())
            .finish()
    }
}

impl FakeBusTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fake pre-loaded with the variables, signal and CAPL functions of the
    /// demo configuration.
    pub fn demo() -> Self {
        Self::new()
            .with_environment_variable("int_var", Variant::Int(0))
            .with_environment_variable("float_var", Variant::Float(0.0))
            .with_environment_variable("string_var", Variant::from(""))
            .with_environment_variable("data_var", Variant::Array(vec![Variant::Int(0); 5]))
            .with_system_variable("sys_var_demo", "speed", Variant::Int(0))
            .with_system_variable(
                "sys_var_demo",
                "int_array_var",
                Variant::Array(vec![Variant::Int(0); 5]),
            )
            .with_system_variable(
                "sys_var_demo",
                "float_array_var",
                Variant::Array(vec![Variant::Float(0.0); 3]),
            )
            .with_signal("CAN", 1, "LightState", "FlashLight", Variant::Int(0))
            .with_capl_function("addition_function", 2, |args| {
                let sum = args.iter().filter_map(Variant::as_i64).sum::<i64>();
                Ok(Variant::Int(sum))
            })
            .with_capl_function("multiply_function", 2, |args| {
                let product = args.iter().filter_map(Variant::as_i64).product::<i64>();
                Ok(Variant::Int(product))
            })
            .with_capl_function("hello_world", 0, |_| Ok(Variant::Empty))
    }

    /// Activation fails as if the tool were not installed.
    pub fn unavailable() -> Self {
        let fake = Self::new();
        fake.lock().available = false;
        fake
    }

    pub fn with_version(self, version: impl Into<String>) -> Self {
        self.lock().version = version.into();
        self
    }

    pub fn with_environment_variable(self, name: impl Into<String>, value: Variant) -> Self {
        self.lock().environment.insert(name.into(), value);
        self
    }

    pub fn with_system_variable(
        self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        value: Variant,
    ) -> Self {
        self.lock()
            .system
            .entry(namespace.into())
            .or_default()
            .insert(name.into(), value);
        self
    }

    pub fn with_signal(
        self,
        bus: impl Into<String>,
        channel: u32,
        message: impl Into<String>,
        signal: impl Into<String>,
        value: Variant,
    ) -> Self {
        let key = (bus.into(), channel, message.into(), signal.into());
        self.lock().signals.insert(key, value);
        self
    }

    /// Register a CAPL function. It becomes callable after the next compile.
    pub fn with_capl_function<F>(self, name: impl Into<String>, params: usize, behavior: F) -> Self
    where
        F: Fn(&[Variant]) -> Result<Variant, String> + Send + Sync + 'static,
    {
        self.lock().functions.insert(
            name.into(),
            FakeFunction {
                params,
                compiled: false,
                behavior: Arc::new(behavior),
            },
        );
        self
    }

    /// Make every compile fail with `message`.
    pub fn with_compile_error(self, message: impl Into<String>) -> Self {
        self.lock().compile_error = Some(message.into());
        self
    }

    /// Number of `Running` reads a start or stop takes to complete.
    pub fn with_transition_polls(self, polls: u32) -> Self {
        self.lock().transition_polls = polls;
        self
    }

    /// Start and stop requests are accepted but never complete.
    pub fn stalled(self) -> Self {
        self.lock().stalled = true;
        self
    }

    /// Reads of property `member` on any object are rejected with `message`
    /// until [`restore_property`](Self::restore_property) is called.
    pub fn fail_property(&self, member: impl Into<String>, message: impl Into<String>) {
        self.lock()
            .failing_properties
            .insert(member.into(), message.into());
    }

    pub fn restore_property(&self, member: &str) {
        self.lock().failing_properties.remove(member);
    }

    /// Every member access made through any connection, as `Object.member`.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn dispatch_count(&self) -> usize {
        self.lock().calls.len()
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    /// Flip the run state behind the session's back.
    pub fn set_running(&self, running: bool) {
        let mut state = self.lock();
        state.running = running;
        state.pending = None;
    }

    pub fn has_configuration(&self) -> bool {
        self.lock().configuration.is_some()
    }

    pub fn configuration_path(&self) -> Option<PathBuf> {
        self.lock()
            .configuration
            .as_ref()
            .and_then(|configuration| configuration.path.clone())
    }

    /// Load a configuration without going through a session.
    pub fn load_configuration(&self, path: impl Into<PathBuf>) {
        let mut state = self.lock();
        state.configuration = Some(FakeConfiguration {
            path: Some(path.into()),
            databases: Vec::new(),
        });
    }

    pub fn databases(&self) -> Vec<PathBuf> {
        self.lock()
            .configuration
            .as_ref()
            .map(|configuration| configuration.databases.clone())
            .unwrap_or_default()
    }

    pub fn environment_value(&self, name: &str) -> Option<Variant> {
        self.lock().environment.get(name).cloned()
    }

    pub fn system_value(&self, namespace: &str, name: &str) -> Option<Variant> {
        self.lock()
            .system
            .get(namespace)
            .and_then(|variables| variables.get(name))
            .cloned()
    }

    pub fn activations(&self) -> u32 {
        self.lock().activations
    }

    pub fn releases(&self) -> u32 {
        self.lock().releases
    }

    pub fn quit_requested(&self) -> bool {
        self.lock().quit
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Connector for FakeBusTool {
    type Connection = FakeConnection;

    fn activate(&self) -> Result<FakeConnection, AutomationError> {
        let mut state = self.lock();
        if !state.available {
            return Err(AutomationError::Unavailable(
                "bus tool is not registered on this machine".to_string(),
            ));
        }
        state.activations += 1;
        state.quit = false;
        Ok(FakeConnection {
            state: Arc::clone(&self.state),
            released: false,
        })
    }
}

/// Connection handed out by [`FakeBusTool::activate`].
pub struct FakeConnection {
    state: Arc<Mutex<FakeState>>,
    released: bool,
}

impl FakeConnection {
    fn enter(&mut self) -> Result<MutexGuard<'_, FakeState>, AutomationError> {
        if self.released {
            return Err(AutomationError::Released);
        }
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.quit {
            return Err(AutomationError::Unavailable("bus tool has exited".to_string()));
        }
        Ok(state)
    }
}

impl Connection for FakeConnection {
    fn root(&self) -> ObjectRef {
        ObjectRef::new(0)
    }

    fn get_property(&mut self, object: ObjectRef, name: &str) -> Result<Variant, AutomationError> {
        let mut state = self.enter()?;
        let target = state.resolve(object)?;
        state.record(&target, name);
        if let Some(message) = state.failing_properties.get(name) {
            return Err(rejected(name, message.clone()));
        }
        state.get(target, name)
    }

    fn set_property(
        &mut self,
        object: ObjectRef,
        name: &str,
        value: Variant,
    ) -> Result<(), AutomationError> {
        let mut state = self.enter()?;
        let target = state.resolve(object)?;
        state.record(&target, name);
        state.set(target, name, value)
    }

    fn invoke(
        &mut self,
        object: ObjectRef,
        method: &str,
        args: &[Variant],
    ) -> Result<Variant, AutomationError> {
        let mut state = self.enter()?;
        let target = state.resolve(object)?;
        state.record(&target, method);
        state.call(target, method, args)
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.releases += 1;
        }
    }
}

impl FakeState {
    fn intern(&mut self, object: FakeObject) -> Variant {
        let index = match self.objects.iter().position(|known| *known == object) {
            Some(index) => index,
            None => {
                self.objects.push(object);
                self.objects.len() - 1
            }
        };
        Variant::Object(ObjectRef::new(index as u64))
    }

    fn resolve(&self, object: ObjectRef) -> Result<FakeObject, AutomationError> {
        let target = usize::try_from(object.id())
            .ok()
            .and_then(|index| self.objects.get(index))
            .cloned()
            .ok_or(AutomationError::Released)?;
        if target.needs_configuration() && self.configuration.is_none() {
            return Err(AutomationError::Released);
        }
        Ok(target)
    }

    fn record(&mut self, target: &FakeObject, member: &str) {
        self.calls.push(format!("{target:?}.{member}"));
    }

    fn get(&mut self, target: FakeObject, name: &str) -> Result<Variant, AutomationError> {
        match (target, name) {
            (FakeObject::Application, "Version") => Ok(self.intern(FakeObject::Version)),
            (FakeObject::Application, "Measurement") => Ok(self.intern(FakeObject::Measurement)),
            (FakeObject::Application, "Environment") => Ok(self.intern(FakeObject::Environment)),
            (FakeObject::Application, "System") => Ok(self.intern(FakeObject::System)),
            (FakeObject::Application, "CAPL") => Ok(self.intern(FakeObject::Capl)),
            (FakeObject::Application, "Configuration") => match self.configuration {
                Some(_) => Ok(self.intern(FakeObject::Configuration)),
                None => Ok(Variant::Empty),
            },
            (FakeObject::Version, "FullName") => Ok(Variant::from(self.version.clone())),
            (FakeObject::Measurement, "Running") => {
                self.advance_measurement();
                Ok(Variant::Bool(self.running))
            }
            (FakeObject::System, "Namespaces") => Ok(self.intern(FakeObject::Namespaces)),
            (FakeObject::Namespace(namespace), "Variables") => {
                Ok(self.intern(FakeObject::Variables(namespace)))
            }
            (FakeObject::EnvironmentVariable(variable), "Value") => self
                .environment
                .get(&variable)
                .cloned()
                .ok_or(AutomationError::NotFound { item: variable }),
            (FakeObject::SystemVariable(namespace, variable), "Value") => self
                .system
                .get(&namespace)
                .and_then(|variables| variables.get(&variable))
                .cloned()
                .ok_or(AutomationError::NotFound {
                    item: format!("{namespace}::{variable}"),
                }),
            (FakeObject::Signal(key), "Value") => {
                self.signals
                    .get(&key)
                    .cloned()
                    .ok_or_else(|| AutomationError::NotFound {
                        item: signal_name(&key),
                    })
            }
            (FakeObject::Signal(key), "FullName") => Ok(Variant::from(signal_name(&key))),
            (FakeObject::Capl, "CompileResult") => Ok(self.intern(FakeObject::CompileResult)),
            (FakeObject::CompileResult, "result") => Ok(Variant::Int(i64::from(
                self.last_compile_error.is_some(),
            ))),
            (FakeObject::CompileResult, "errorMessage") => Ok(Variant::from(
                self.last_compile_error.clone().unwrap_or_default(),
            )),
            (FakeObject::Configuration, "FullName") => Ok(Variant::from(
                self.configuration
                    .as_ref()
                    .and_then(|configuration| configuration.path.as_ref())
                    .map(|path| path.display().to_string())
                    .unwrap_or_default(),
            )),
            (FakeObject::Configuration, "GeneralSetup") => {
                Ok(self.intern(FakeObject::GeneralSetup))
            }
            (FakeObject::GeneralSetup, "DatabaseSetup") => {
                Ok(self.intern(FakeObject::DatabaseSetup))
            }
            (FakeObject::DatabaseSetup, "Databases") => Ok(self.intern(FakeObject::Databases)),
            (FakeObject::Databases, "Count") => Ok(Variant::Int(
                self.configuration
                    .as_ref()
                    .map_or(0, |configuration| configuration.databases.len() as i64),
            )),
            (FakeObject::Database(path), "FullName") => {
                Ok(Variant::from(path.display().to_string()))
            }
            _ => Err(unknown(name)),
        }
    }

    fn set(&mut self, target: FakeObject, name: &str, value: Variant) -> Result<(), AutomationError> {
        let slot = match (target, name) {
            (FakeObject::EnvironmentVariable(variable), "Value") => self
                .environment
                .get_mut(&variable)
                .ok_or(AutomationError::NotFound { item: variable })?,
            (FakeObject::SystemVariable(namespace, variable), "Value") => self
                .system
                .get_mut(&namespace)
                .and_then(|variables| variables.get_mut(&variable))
                .ok_or(AutomationError::NotFound {
                    item: format!("{namespace}::{variable}"),
                })?,
            (FakeObject::Signal(key), "Value") => {
                let item = signal_name(&key);
                self.signals
                    .get_mut(&key)
                    .ok_or(AutomationError::NotFound { item })?
            }
            _ => return Err(unknown(name)),
        };

        if !same_shape(slot, &value) {
            return Err(AutomationError::WrongType {
                member: name.to_string(),
                message: format!("cannot store {} in {}", value.describe(), slot.describe()),
            });
        }
        *slot = value;
        Ok(())
    }

    fn call(
        &mut self,
        target: FakeObject,
        method: &str,
        args: &[Variant],
    ) -> Result<Variant, AutomationError> {
        match (target, method) {
            (FakeObject::Application, "New") => {
                arg_bool(args, 0, method)?;
                arg_bool(args, 1, method)?;
                self.replace_configuration(FakeConfiguration::default());
                Ok(Variant::Empty)
            }
            (FakeObject::Application, "Open") => {
                let path = PathBuf::from(arg_str(args, 0, method)?);
                if !path.is_file() {
                    return Err(rejected(method, format!("{} does not exist", path.display())));
                }
                self.replace_configuration(FakeConfiguration {
                    path: Some(path),
                    databases: Vec::new(),
                });
                Ok(Variant::Empty)
            }
            (FakeObject::Application, "Quit") => {
                self.running = false;
                self.pending = None;
                self.quit = true;
                Ok(Variant::Empty)
            }
            (FakeObject::Application, "GetBus") => {
                let bus = arg_str(args, 0, method)?;
                if self.signals.keys().any(|key| key.0 == bus) {
                    Ok(self.intern(FakeObject::Bus(bus)))
                } else {
                    Err(AutomationError::NotFound { item: bus })
                }
            }
            (FakeObject::Measurement, "Start") => {
                if self.configuration.is_none() {
                    return Err(rejected(method, "no configuration loaded"));
                }
                self.request_measurement(true);
                Ok(Variant::Empty)
            }
            (FakeObject::Measurement, "Stop") => {
                self.request_measurement(false);
                Ok(Variant::Empty)
            }
            (FakeObject::Environment, "GetVariable") => {
                let name = arg_str(args, 0, method)?;
                if self.environment.contains_key(&name) {
                    Ok(self.intern(FakeObject::EnvironmentVariable(name)))
                } else {
                    Err(AutomationError::NotFound { item: name })
                }
            }
            (FakeObject::Namespaces, "Item") => {
                let namespace = arg_str(args, 0, method)?;
                if self.system.contains_key(&namespace) {
                    Ok(self.intern(FakeObject::Namespace(namespace)))
                } else {
                    Err(AutomationError::NotFound { item: namespace })
                }
            }
            (FakeObject::Variables(namespace), "Item") => {
                let name = arg_str(args, 0, method)?;
                let known = self
                    .system
                    .get(&namespace)
                    .is_some_and(|variables| variables.contains_key(&name));
                if known {
                    Ok(self.intern(FakeObject::SystemVariable(namespace, name)))
                } else {
                    Err(AutomationError::NotFound {
                        item: format!("{namespace}::{name}"),
                    })
                }
            }
            (FakeObject::Bus(bus), "GetSignal") => {
                let channel = u32::try_from(arg_int(args, 0, method)?)
                    .map_err(|err| wrong_type(method, err.to_string()))?;
                let key = (
                    bus,
                    channel,
                    arg_str(args, 1, method)?,
                    arg_str(args, 2, method)?,
                );
                if self.signals.contains_key(&key) {
                    Ok(self.intern(FakeObject::Signal(key)))
                } else {
                    Err(AutomationError::NotFound {
                        item: signal_name(&key),
                    })
                }
            }
            (FakeObject::Capl, "Compile") => {
                if self.configuration.is_none() {
                    return Err(rejected(method, "no configuration loaded"));
                }
                self.last_compile_error = self.compile_error.clone();
                if self.last_compile_error.is_none() {
                    for function in self.functions.values_mut() {
                        function.compiled = true;
                    }
                }
                Ok(Variant::Empty)
            }
            (FakeObject::Capl, "GetFunction") => {
                let name = arg_str(args, 0, method)?;
                match self.functions.get(&name) {
                    Some(function) if function.compiled => {
                        Ok(self.intern(FakeObject::CaplFunction(name)))
                    }
                    _ => Err(AutomationError::NotFound { item: name }),
                }
            }
            (FakeObject::CaplFunction(name), "Call") => {
                let function = self
                    .functions
                    .get(&name)
                    .cloned()
                    .ok_or(AutomationError::NotFound { item: name })?;
                if args.len() != function.params {
                    return Err(wrong_type(
                        method,
                        format!("expected {} arguments, got {}", function.params, args.len()),
                    ));
                }
                (function.behavior)(args).map_err(|message| rejected(method, message))
            }
            (FakeObject::Configuration, "Save") => {
                let path = self
                    .configuration
                    .as_ref()
                    .and_then(|configuration| configuration.path.clone())
                    .ok_or_else(|| rejected(method, "configuration has no file name"))?;
                write_configuration(&path).map_err(|message| rejected(method, message))?;
                Ok(Variant::Empty)
            }
            (FakeObject::Configuration, "SaveAs") => {
                let path = PathBuf::from(arg_str(args, 0, method)?);
                write_configuration(&path).map_err(|message| rejected(method, message))?;
                if let Some(configuration) = self.configuration.as_mut() {
                    configuration.path = Some(path);
                }
                Ok(Variant::Empty)
            }
            (FakeObject::Databases, "Add") => {
                let path = PathBuf::from(arg_str(args, 0, method)?);
                if !path.is_file() {
                    return Err(rejected(method, format!("{} does not exist", path.display())));
                }
                let databases = self.databases_mut()?;
                if databases.contains(&path) {
                    return Err(rejected(method, "database already attached"));
                }
                databases.push(path);
                Ok(Variant::Empty)
            }
            (FakeObject::Databases, "Item") => {
                let index = collection_index(arg_int(args, 0, method)?, method)?;
                let path = self
                    .databases_mut()?
                    .get(index)
                    .cloned()
                    .ok_or_else(|| AutomationError::NotFound {
                        item: format!("database #{}", index + 1),
                    })?;
                Ok(self.intern(FakeObject::Database(path)))
            }
            (FakeObject::Databases, "Remove") => {
                let index = collection_index(arg_int(args, 0, method)?, method)?;
                let databases = self.databases_mut()?;
                if index >= databases.len() {
                    return Err(AutomationError::NotFound {
                        item: format!("database #{}", index + 1),
                    });
                }
                databases.remove(index);
                Ok(Variant::Empty)
            }
            _ => Err(unknown(method)),
        }
    }

    fn replace_configuration(&mut self, configuration: FakeConfiguration) {
        self.running = false;
        self.pending = None;
        self.last_compile_error = None;
        for function in self.functions.values_mut() {
            function.compiled = false;
        }
        self.configuration = Some(configuration);
    }

    fn databases_mut(&mut self) -> Result<&mut Vec<PathBuf>, AutomationError> {
        self.configuration
            .as_mut()
            .map(|configuration| &mut configuration.databases)
            .ok_or(AutomationError::Released)
    }

    fn request_measurement(&mut self, running: bool) {
        if self.running == running {
            self.pending = None;
        } else if self.transition_polls == 0 && !self.stalled {
            self.running = running;
            self.pending = None;
        } else {
            self.pending = Some(Pending {
                running,
                polls_left: self.transition_polls,
            });
        }
    }

    fn advance_measurement(&mut self) {
        if self.stalled {
            return;
        }
        if let Some(pending) = self.pending.as_mut() {
            if pending.polls_left == 0 {
                self.running = pending.running;
                self.pending = None;
            } else {
                pending.polls_left -= 1;
            }
        }
    }
}

fn same_shape(stored: &Variant, value: &Variant) -> bool {
    match (stored, value) {
        (Variant::Array(current), Variant::Array(next)) => {
            current.len() == next.len() && stored.kind() == value.kind()
        }
        _ => stored.kind() == value.kind(),
    }
}

fn signal_name(key: &SignalKey) -> String {
    format!("{}{}::{}::{}", key.0, key.1, key.2, key.3)
}

fn write_configuration(path: &Path) -> Result<(), String> {
    fs::write(path, b"fake bus tool configuration\n").map_err(|err| err.to_string())
}

fn collection_index(index: i64, method: &str) -> Result<usize, AutomationError> {
    index
        .checked_sub(1)
        .and_then(|index| usize::try_from(index).ok())
        .ok_or_else(|| wrong_type(method, format!("collection index {index} out of range")))
}

fn arg<'a>(args: &'a [Variant], index: usize, method: &str) -> Result<&'a Variant, AutomationError> {
    args.get(index)
        .ok_or_else(|| wrong_type(method, format!("missing argument {index}")))
}

fn arg_str(args: &[Variant], index: usize, method: &str) -> Result<String, AutomationError> {
    let value = arg(args, index, method)?;
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| wrong_type(method, format!("argument {index} is {}", value.describe())))
}

fn arg_int(args: &[Variant], index: usize, method: &str) -> Result<i64, AutomationError> {
    let value = arg(args, index, method)?;
    value
        .as_i64()
        .ok_or_else(|| wrong_type(method, format!("argument {index} is {}", value.describe())))
}

fn arg_bool(args: &[Variant], index: usize, method: &str) -> Result<bool, AutomationError> {
    match arg(args, index, method)? {
        Variant::Bool(flag) => Ok(*flag),
        other => Err(wrong_type(
            method,
            format!("argument {index} is {}", other.describe()),
        )),
    }
}

fn unknown(member: &str) -> AutomationError {
    AutomationError::UnknownMember {
        member: member.to_string(),
    }
}

fn rejected(member: &str, message: impl Into<String>) -> AutomationError {
    AutomationError::Rejected {
        member: member.to_string(),
        message: message.into(),
    }
}

fn wrong_type(member: &str, message: impl Into<String>) -> AutomationError {
    AutomationError::WrongType {
        member: member.to_string(),
        message: message.into(),
    }
}
