use std::fmt;

use crate::error::{ClientError, ClientResult};

/// Qualified reference to a data variable. The scope is always stated by the
/// caller; it is never inferred from the shape of the name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VariableRef {
    /// Configuration-scoped environment variable, addressed by flat name.
    Environment(String),
    /// System variable living in `namespace`.
    System { namespace: String, name: String },
}

impl VariableRef {
    pub fn environment(name: impl Into<String>) -> Self {
        VariableRef::Environment(name.into())
    }

    pub fn system(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        VariableRef::System {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Parse a `namespace::name` system variable reference.
    pub fn parse_system(qualified: &str) -> ClientResult<Self> {
        match qualified.rsplit_once("::") {
            Some((namespace, name)) if !namespace.is_empty() && !name.is_empty() => {
                Ok(Self::system(namespace, name))
            }
            _ => Err(ClientError::variable_not_found(format!(
                "{qualified} (expected namespace::name)"
            ))),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            VariableRef::Environment(name) => name,
            VariableRef::System { name, .. } => name,
        }
    }
}

impl fmt::Display for VariableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableRef::Environment(name) => write!(f, "env:{name}"),
            VariableRef::System { namespace, name } => write!(f, "sys:{namespace}::{name}"),
        }
    }
}

/// A signal inside a message on a given bus channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignalRef {
    pub bus: String,
    pub channel: u32,
    pub message: String,
    pub signal: String,
}

impl SignalRef {
    pub fn new(
        bus: impl Into<String>,
        channel: u32,
        message: impl Into<String>,
        signal: impl Into<String>,
    ) -> Self {
        Self {
            bus: bus.into(),
            channel,
            message: message.into(),
            signal: signal.into(),
        }
    }
}

impl fmt::Display for SignalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}::{}::{}",
            self.bus, self.channel, self.message, self.signal
        )
    }
}
