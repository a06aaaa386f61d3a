//! The narrow interface a storage engine exposes to the layer.
//!
//! [`Session`] is object-safe on purpose: the unit of work holds a
//! `Box<dyn Session>` and never learns which engine is behind it. Engines
//! hand sessions out through a [`SessionFactory`], which is injected where it
//! is needed; there is no process-wide holder.

pub mod sql;

use crate::criteria::Criteria;
use crate::entity::EntityMeta;
use crate::procedure::ProcedureCall;
use crate::record::Record;
use crate::value::Value;

/// Collaborator-side failures, converted to
/// [`crate::PersistenceError`] at the layer boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// Driver or engine failure with its own message.
    Backend(String),
    /// A keyed mutation addressed a row that is not there.
    RowNotFound { entity: String, key: Value },
    /// An insert collided with an existing key.
    DuplicateKey { entity: String, key: Value },
    /// Transaction control used out of order.
    TransactionState(String),
    /// The session does not provide this capability.
    Unsupported(String),
    /// The session or its factory has been closed.
    Closed,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Backend(message) => write!(f, "backend failure: {}", message),
            SessionError::RowNotFound { entity, key } => {
                write!(f, "no {} row with key {}", entity, key)
            }
            SessionError::DuplicateKey { entity, key } => {
                write!(f, "duplicate key {} in {}", key, entity)
            }
            SessionError::TransactionState(message) => write!(f, "{}", message),
            SessionError::Unsupported(what) => write!(f, "unsupported operation: {}", what),
            SessionError::Closed => write!(f, "session is closed"),
        }
    }
}

impl std::error::Error for SessionError {}

/// One conversation with the storage engine.
///
/// All methods take `&self`; implementations use interior mutability where
/// they need state. A session is single-threaded by contract, so no `Send`
/// bound is imposed. Dropping the session releases it; a transaction left
/// open at drop time is the implementation's problem to roll back.
pub trait Session {
    fn begin(&self) -> Result<(), SessionError>;
    fn commit(&self) -> Result<(), SessionError>;
    fn rollback(&self) -> Result<(), SessionError>;

    /// Store a new record; returns the stored row, key assigned.
    fn insert(&self, entity: &EntityMeta, record: Record) -> Result<Record, SessionError>;

    /// Replace the row addressed by the record's key column.
    fn merge(&self, entity: &EntityMeta, record: Record) -> Result<Record, SessionError>;

    /// Delete the row with the given key.
    fn remove(&self, entity: &EntityMeta, key: &Value) -> Result<(), SessionError>;

    /// Keyed lookup; `Ok(None)` when the row is absent.
    fn get(&self, entity: &EntityMeta, key: &Value) -> Result<Option<Record>, SessionError>;

    /// Execute a criteria query and return the matching rows.
    fn select(&self, criteria: &Criteria) -> Result<Vec<Record>, SessionError>;

    /// Invoke a stored procedure and collect its result rows.
    fn call_procedure(&self, call: &ProcedureCall) -> Result<Vec<Record>, SessionError>;

    /// Run a native statement with positional parameters.
    fn query_native(&self, sql: &str, params: &[Value]) -> Result<Vec<Record>, SessionError>;
}

impl std::fmt::Debug for dyn Session + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

/// Hands out sessions; owns whatever the engine needs to build them.
pub trait SessionFactory {
    fn open_session(&self) -> Result<Box<dyn Session>, SessionError>;

    /// Release the engine's resources. Idempotent; `open_session` fails
    /// afterwards with [`SessionError::Closed`].
    fn shutdown(&self);
}
