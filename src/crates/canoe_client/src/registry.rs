use std::collections::HashMap;

use tracing::debug;

use crate::automation::{AutomationError, Connection};
use crate::variant::{ObjectRef, Variant};

/// Logical sub-objects of the bus tool the session talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Role {
    Application,
    Version,
    Measurement,
    Environment,
    SystemNamespaces,
    Capl,
    Configuration,
    Databases,
}

impl Role {
    const APPLICATION_SCOPED: [Role; 6] = [
        Role::Application,
        Role::Version,
        Role::Measurement,
        Role::Environment,
        Role::SystemNamespaces,
        Role::Capl,
    ];

    /// Property chain leading from the application object to this role.
    fn path(self) -> &'static [&'static str] {
        match self {
            Role::Application => &[],
            Role::Version => &["Version"],
            Role::Measurement => &["Measurement"],
            Role::Environment => &["Environment"],
            Role::SystemNamespaces => &["System", "Namespaces"],
            Role::Capl => &["CAPL"],
            Role::Configuration => &["Configuration"],
            Role::Databases => &[
                "Configuration",
                "GeneralSetup",
                "DatabaseSetup",
                "Databases",
            ],
        }
    }

    /// Roles that hang off the active configuration and change with it.
    fn is_configuration_scoped(self) -> bool {
        matches!(self, Role::Configuration | Role::Databases)
    }
}

/// Flat mapping from [`Role`] to the object currently serving it.
///
/// Application-scoped roles are resolved once per connection. Configuration-scoped
/// roles are resolved on first use and dropped whenever the active configuration
/// is replaced.
#[derive(Debug, Default)]
pub(crate) struct HandleRegistry {
    handles: HashMap<Role, ObjectRef>,
}

impl HandleRegistry {
    pub(crate) fn populate<C: Connection>(connection: &mut C) -> Result<Self, AutomationError> {
        let mut registry = Self::default();
        for role in Role::APPLICATION_SCOPED {
            match walk(connection, role)? {
                Some(object) => {
                    registry.handles.insert(role, object);
                }
                None => {
                    return Err(AutomationError::NotFound {
                        item: role.path().join("."),
                    })
                }
            }
        }
        debug!(handles = registry.handles.len(), "automation handles resolved");
        Ok(registry)
    }

    /// Fetch a handle, resolving configuration-scoped roles on demand. Returns
    /// `None` when the tool has nothing to serve the role with (no configuration).
    pub(crate) fn resolve<C: Connection>(
        &mut self,
        connection: &mut C,
        role: Role,
    ) -> Result<Option<ObjectRef>, AutomationError> {
        if let Some(object) = self.handles.get(&role) {
            return Ok(Some(*object));
        }
        if !role.is_configuration_scoped() {
            return Ok(None);
        }

        let resolved = walk(connection, role)?;
        if let Some(object) = resolved {
            self.handles.insert(role, object);
        }
        Ok(resolved)
    }

    pub(crate) fn invalidate_configuration(&mut self) {
        self.handles.retain(|role, _| !role.is_configuration_scoped());
    }

    pub(crate) fn clear(&mut self) {
        self.handles.clear();
    }
}

fn walk<C: Connection>(connection: &mut C, role: Role) -> Result<Option<ObjectRef>, AutomationError> {
    let mut current = connection.root();
    for segment in role.path() {
        match connection.get_property(current, segment)? {
            Variant::Object(object) => current = object,
            Variant::Empty => return Ok(None),
            other => {
                return Err(AutomationError::WrongType {
                    member: (*segment).to_string(),
                    message: format!("expected object, found {}", other.describe()),
                })
            }
        }
    }
    Ok(Some(current))
}
