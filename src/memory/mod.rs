//! In-memory reference engine.
//!
//! A complete [`crate::session::SessionFactory`] backed by process-local
//! tables: snapshot transactions, sequence-assigned keys, criteria
//! evaluation with the same null and wildcard semantics the SQL session
//! renders, and a registry for procedure stand-ins. It exists so the access
//! layer can be exercised end to end without a database; it is also the
//! engine the integration tests run against.

mod engine;
mod eval;
mod session;
mod store;

pub use engine::MemoryEngine;
pub use session::MemorySession;
pub use store::ProcedureFn;
