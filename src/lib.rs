//! # Purser
//!
//! A generic data-access layer: unit-of-work transaction management, a
//! fluent criteria query builder, and typed stored-procedure invocation over
//! a narrow session interface.
//!
//! The pieces:
//!
//! - [`UnitOfWork`]: owns one session at a time, wraps every mutation in a
//!   transaction, rolls back on failure.
//! - [`Query`]: builds [`Criteria`] fluently; null arguments skip their
//!   directive instead of producing `WHERE x = NULL`.
//! - [`ProcedureCall`]: stored-procedure invocation with parameter types
//!   resolved at runtime against a closed scalar whitelist.
//! - [`Session`] / [`SessionFactory`]: the engine seam. [`MemoryEngine`] is
//!   the built-in in-memory engine; [`SqlSession`] renders PostgreSQL for any
//!   [`SqlExecutor`].
//!
//! ```
//! use purser::{Entity, EntityMeta, MemoryEngine, PersistenceError, Record, UnitOfWork};
//!
//! #[derive(Debug, Clone)]
//! struct Note {
//!     id: Option<i64>,
//!     body: String,
//! }
//!
//! impl Entity for Note {
//!     fn meta() -> EntityMeta {
//!         EntityMeta::new("notes", "id")
//!     }
//!     fn key(&self) -> purser::Value {
//!         self.id.into()
//!     }
//!     fn to_record(&self) -> Record {
//!         Record::new().with("id", self.id).with("body", self.body.clone())
//!     }
//!     fn from_record(record: &Record) -> Result<Self, PersistenceError> {
//!         Ok(Self {
//!             id: record.try_get("id")?,
//!             body: record.try_get("body")?,
//!         })
//!     }
//! }
//!
//! # fn main() -> Result<(), PersistenceError> {
//! let engine = std::sync::Arc::new(MemoryEngine::new());
//! let mut uow = UnitOfWork::new(engine);
//! uow.open()?;
//!
//! let note = uow.create(&Note { id: None, body: "hello".into() })?;
//! let found: Vec<Note> = uow.find::<Note>()?.eq("body", "hello").list()?;
//! assert_eq!(found.len(), 1);
//!
//! uow.delete_by_id::<Note>(note.id)?;
//! uow.close();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod criteria;
pub mod entity;
pub mod error;
pub mod memory;
pub mod procedure;
pub mod record;
pub mod session;
pub mod unit_of_work;
pub mod value;

pub use config::EngineConfig;
pub use criteria::{
    AliasDef, Criteria, FetchHint, FetchMode, Filter, IntoOptionalFilter, JoinKind, Projection,
    Query, SortDir, SortKey, COUNT_COLUMN,
};
pub use entity::{Entity, EntityMeta, Relation};
pub use error::PersistenceError;
pub use memory::{MemoryEngine, MemorySession};
pub use procedure::{ProcParam, ProcedureCall, ScalarType};
pub use record::Record;
pub use session::sql::{SqlExecutor, SqlSession};
pub use session::{Session, SessionError, SessionFactory};
pub use unit_of_work::UnitOfWork;
pub use value::{FromValue, Value};
