//! Backend-neutral criteria: what a query wants, not how to run it.
//!
//! The fluent builder ([`Query`]) accumulates a [`Criteria`]; sessions
//! interpret it, the reference engine by evaluation and the SQL session by
//! rendering through sea-query. Everything here is inert data with read
//! accessors for session implementations.

pub mod filter;
pub mod query;
pub mod sql;

#[doc(inline)]
pub use filter::{Filter, IntoOptionalFilter};
#[doc(inline)]
pub use query::Query;

use crate::entity::{EntityMeta, Relation};

/// Column name sessions use for the scalar produced by a row-count
/// projection.
pub const COUNT_COLUMN: &str = "count";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

/// One sort key; keys apply in the order they were added.
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub path: String,
    pub direction: SortDir,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
}

/// An association path joined under an alias.
#[derive(Debug, Clone, PartialEq)]
pub struct AliasDef {
    pub path: String,
    pub alias: String,
    pub join: JoinKind,
    pub(crate) relation: Option<Relation>,
}

impl AliasDef {
    /// The relation backing this alias, resolved from the entity's declared
    /// associations when the alias was added. `None` means the path is
    /// unknown and terminals will refuse to execute the criteria.
    pub fn relation(&self) -> Option<&Relation> {
        self.relation.as_ref()
    }
}

/// Eager/lazy association fetch strategy. Advisory: sessions may use it to
/// shape their access pattern, the reference engine ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    Select,
    Join,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchHint {
    pub path: String,
    pub mode: FetchMode,
}

/// What the query projects.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// Whole entity rows (the default).
    Entity,
    /// An explicit column list.
    Columns(Vec<String>),
    /// Group-by projection on a single path, one row per distinct value.
    Group(String),
    /// A single scalar row count under [`COUNT_COLUMN`].
    Count,
}

/// An executable description of a select.
#[derive(Debug, Clone, PartialEq)]
pub struct Criteria {
    pub(crate) entity: EntityMeta,
    pub(crate) filters: Vec<Filter>,
    pub(crate) orders: Vec<SortKey>,
    pub(crate) aliases: Vec<AliasDef>,
    pub(crate) fetch_hints: Vec<FetchHint>,
    pub(crate) projection: Projection,
    pub(crate) offset: Option<u64>,
    pub(crate) limit: Option<u64>,
}

impl Criteria {
    /// Empty criteria over an entity: match every row, project the entity.
    pub fn new(entity: EntityMeta) -> Self {
        Self {
            entity,
            filters: Vec::new(),
            orders: Vec::new(),
            aliases: Vec::new(),
            fetch_hints: Vec::new(),
            projection: Projection::Entity,
            offset: None,
            limit: None,
        }
    }

    pub fn entity(&self) -> &EntityMeta {
        &self.entity
    }

    /// Top-level filters; they combine as a conjunction.
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn orders(&self) -> &[SortKey] {
        &self.orders
    }

    pub fn aliases(&self) -> &[AliasDef] {
        &self.aliases
    }

    pub fn fetch_hints(&self) -> &[FetchHint] {
        &self.fetch_hints
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// First alias whose path did not resolve to a declared relation.
    pub fn unresolved_alias(&self) -> Option<&AliasDef> {
        self.aliases.iter().find(|a| a.relation.is_none())
    }
}
