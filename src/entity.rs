//! The persistent-type contract.
//!
//! An [`Entity`] maps itself to and from a [`Record`] and names itself
//! through an [`EntityMeta`] descriptor, which is what the unit of work hands
//! to sessions at call time; sessions never see the concrete type.

use crate::error::PersistenceError;
use crate::record::Record;
use crate::value::Value;

/// Type descriptor for an entity: its storage name and key column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityMeta {
    pub name: &'static str,
    pub key_column: &'static str,
}

impl EntityMeta {
    pub const fn new(name: &'static str, key_column: &'static str) -> Self {
        Self { name, key_column }
    }
}

/// A to-one association reachable from an entity, joinable under an alias.
///
/// `name` is the path used in `alias(...)`; the join condition is
/// `owner.owner_column = target.target_column`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    pub name: &'static str,
    pub target: &'static str,
    pub owner_column: &'static str,
    pub target_column: &'static str,
}

/// A type that can be stored and queried through the layer.
pub trait Entity: Sized + Clone + std::fmt::Debug {
    /// Storage name and key column for this type.
    fn meta() -> EntityMeta;

    /// Identity value; [`Value::Null`] while the entity is transient.
    fn key(&self) -> Value;

    /// Association paths available to `alias(...)`.
    fn relations() -> Vec<Relation> {
        Vec::new()
    }

    fn to_record(&self) -> Record;

    fn from_record(record: &Record) -> Result<Self, PersistenceError>;
}
