//! The crate-wide error type.
//!
//! Every public operation converges on [`PersistenceError`]; collaborator
//! failures ([`SessionError`]) convert into it, transaction wrappers fold the
//! underlying cause into `Transaction` after rolling back.

use std::fmt;

use crate::session::SessionError;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum PersistenceError {
    /// A begin/mutation/commit step failed; rollback was attempted and the
    /// original cause's message is carried here.
    Transaction { message: String },
    /// `delete_by_id` addressed a key with no row.
    NotFound { entity: &'static str, key: Value },
    /// `unique()` matched more than one row.
    Ambiguous { entity: &'static str, found: usize },
    /// A procedure parameter's runtime type is outside the supported set.
    UnresolvedParameter {
        procedure: String,
        parameter: String,
        value: Value,
    },
    /// An operation that needs a live session ran without one.
    Closed,
    /// A session failure outside any transaction wrapper.
    Session(SessionError),
    /// Record-to-entity extraction failed.
    Decode {
        column: String,
        expected: &'static str,
        message: String,
    },
    /// The criteria cannot be executed as built (unknown alias path, ...).
    Criteria(String),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::Transaction { message } => {
                write!(f, "transaction failed: {}", message)
            }
            PersistenceError::NotFound { entity, key } => {
                write!(f, "no {} row with key {}", entity, key)
            }
            PersistenceError::Ambiguous { entity, found } => {
                write!(f, "expected at most one {} row, found {}", entity, found)
            }
            PersistenceError::UnresolvedParameter {
                procedure,
                parameter,
                value,
            } => write!(
                f,
                "no supported parameter type for value {} ({}) bound to \"{}\" of procedure \"{}\"",
                value,
                value.kind(),
                parameter,
                procedure
            ),
            PersistenceError::Closed => write!(f, "no open session; call open() first"),
            PersistenceError::Session(err) => write!(f, "session error: {}", err),
            PersistenceError::Decode {
                column,
                expected,
                message,
            } => write!(
                f,
                "cannot decode column \"{}\" as {}: {}",
                column, expected, message
            ),
            PersistenceError::Criteria(message) => write!(f, "invalid criteria: {}", message),
        }
    }
}

impl std::error::Error for PersistenceError {}

impl From<SessionError> for PersistenceError {
    fn from(err: SessionError) -> Self {
        PersistenceError::Session(err)
    }
}
