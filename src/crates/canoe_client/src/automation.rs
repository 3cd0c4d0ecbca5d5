//! Contract the session consumes from the automation transport.
//!
//! The transport is a synchronous property/method dispatch into a long-lived
//! object graph owned by the bus tool, in the manner of a COM `IDispatch`
//! interface. Objects are addressed through opaque [`ObjectRef`]s handed out
//! by the transport itself, starting from [`Connection::root`].

use thiserror::Error;

use crate::variant::{ObjectRef, Variant};

/// Failures reported by the transport. The session maps these onto
/// [`ClientError`](crate::ClientError) according to the operation in progress.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AutomationError {
    #[error("automation server unavailable: {0}")]
    Unavailable(String),
    #[error("unknown member {member}")]
    UnknownMember { member: String },
    #[error("no item named {item}")]
    NotFound { item: String },
    #[error("{member} rejected the call: {message}")]
    Rejected { member: String, message: String },
    #[error("{member} received an argument of the wrong type: {message}")]
    WrongType { member: String, message: String },
    #[error("object reference has been released")]
    Released,
}

/// Entry point that activates (or attaches to) the bus tool.
pub trait Connector {
    type Connection: Connection;

    fn activate(&self) -> Result<Self::Connection, AutomationError>;
}

/// Live dispatch handle into the running application.
pub trait Connection {
    /// The application object every other object is reached from.
    fn root(&self) -> ObjectRef;

    fn get_property(&mut self, object: ObjectRef, name: &str) -> Result<Variant, AutomationError>;

    fn set_property(
        &mut self,
        object: ObjectRef,
        name: &str,
        value: Variant,
    ) -> Result<(), AutomationError>;

    fn invoke(
        &mut self,
        object: ObjectRef,
        method: &str,
        args: &[Variant],
    ) -> Result<Variant, AutomationError>;

    /// Drop every object reference held on behalf of this connection.
    fn release(&mut self);
}
