//! The fluent query builder and its terminal operations.

use std::marker::PhantomData;

use crate::criteria::filter::{Filter, IntoOptionalFilter};
use crate::criteria::{
    AliasDef, Criteria, FetchHint, FetchMode, JoinKind, Projection, SortDir, SortKey, COUNT_COLUMN,
};
use crate::entity::Entity;
use crate::error::PersistenceError;
use crate::record::Record;
use crate::session::Session;
use crate::value::Value;

/// Criteria builder bound to a live session.
///
/// Directives thread the builder by value (`mut self -> Self`); nothing is
/// shared or mutated in place. Null-valued arguments silently skip their
/// directive except where a variant is documented as unconditional.
///
/// ```no_run
/// # use purser::{Entity, Query, Session};
/// # fn demo<E: Entity>(session: &dyn Session) -> Result<(), purser::PersistenceError> {
/// let open_orders = Query::<E>::new(session)
///     .eq("status", "OPEN")
///     .ge("total", 100.0)
///     .order_by_desc("total")
///     .take(10u64)
///     .list()?;
/// # let _ = open_orders; Ok(())
/// # }
/// ```
pub struct Query<'s, E: Entity> {
    session: &'s dyn Session,
    criteria: Criteria,
    _entity: PhantomData<E>,
}

impl<'s, E: Entity> Query<'s, E> {
    pub fn new(session: &'s dyn Session) -> Self {
        Self {
            session,
            criteria: Criteria::new(E::meta()),
            _entity: PhantomData,
        }
    }

    /// The accumulated criteria, mostly for inspection in tests and logs.
    pub fn criteria(&self) -> &Criteria {
        &self.criteria
    }

    fn push(mut self, filter: Filter) -> Self {
        self.criteria.filters.push(filter);
        self
    }

    fn push_opt(self, filter: Option<Filter>) -> Self {
        match filter {
            Some(filter) => self.push(filter),
            None => self,
        }
    }

    /// Unconditional equality; a null argument compares against NULL and
    /// matches nothing.
    pub fn eq(self, path: &str, value: impl Into<Value>) -> Self {
        self.push(Filter::eq(path, value))
    }

    /// Equality, skipped when the argument is null.
    pub fn eq_not_null(self, path: &str, value: impl Into<Value>) -> Self {
        self.push_opt(Filter::eq_not_null(path, value))
    }

    /// Inequality, skipped when the argument is null.
    pub fn ne(self, path: &str, value: impl Into<Value>) -> Self {
        self.push_opt(Filter::ne(path, value))
    }

    /// Inclusive lower bound, skipped when the argument is null.
    pub fn ge(self, path: &str, value: impl Into<Value>) -> Self {
        self.push_opt(Filter::ge(path, value))
    }

    /// Inclusive upper bound, skipped when the argument is null.
    pub fn le(self, path: &str, value: impl Into<Value>) -> Self {
        self.push_opt(Filter::le(path, value))
    }

    /// Inclusive range, skipped when either bound is null.
    pub fn between(self, path: &str, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        self.push_opt(Filter::between(path, low, high))
    }

    /// Substring match (`%value%`), skipped when the argument is null.
    pub fn like(self, path: &str, value: impl Into<Value>) -> Self {
        self.push_opt(Filter::like(path, value))
    }

    /// Case-insensitive substring match, skipped when the argument is null.
    pub fn ilike(self, path: &str, value: impl Into<Value>) -> Self {
        self.push_opt(Filter::ilike(path, value))
    }

    /// Membership test, skipped when the collection itself is absent.
    pub fn is_in<V: Into<Value>>(self, path: &str, values: Option<Vec<V>>) -> Self {
        self.push_opt(Filter::is_in(path, values))
    }

    pub fn is_null(self, path: &str) -> Self {
        self.push(Filter::is_null(path))
    }

    pub fn is_not_null(self, path: &str) -> Self {
        self.push(Filter::is_not_null(path))
    }

    pub fn is_empty(self, path: &str) -> Self {
        self.push(Filter::is_empty(path))
    }

    pub fn is_not_empty(self, path: &str) -> Self {
        self.push(Filter::is_not_empty(path))
    }

    /// Add an already-built predicate (or nothing, if it is absent).
    pub fn filter(self, filter: impl IntoOptionalFilter) -> Self {
        self.push_opt(filter.into_optional_filter())
    }

    /// Conjunction of two predicate values; skipped if either is absent.
    pub fn and(self, lhs: impl IntoOptionalFilter, rhs: impl IntoOptionalFilter) -> Self {
        match (lhs.into_optional_filter(), rhs.into_optional_filter()) {
            (Some(lhs), Some(rhs)) => self.push(lhs.and(rhs)),
            _ => self,
        }
    }

    /// Disjunction of two predicate values; skipped if either is absent.
    pub fn or(self, lhs: impl IntoOptionalFilter, rhs: impl IntoOptionalFilter) -> Self {
        match (lhs.into_optional_filter(), rhs.into_optional_filter()) {
            (Some(lhs), Some(rhs)) => self.push(lhs.or(rhs)),
            _ => self,
        }
    }

    /// Disjunction over every present predicate; absent ones contribute
    /// nothing and an all-absent set skips the directive.
    pub fn any<I>(self, filters: I) -> Self
    where
        I: IntoIterator,
        I::Item: IntoOptionalFilter,
    {
        self.push_opt(Filter::any_of(filters))
    }

    /// Join an association path under an alias (left-outer by default).
    /// Skipped when the alias name is null.
    pub fn alias<'a>(self, path: &str, alias: impl Into<Option<&'a str>>) -> Self {
        self.alias_join(path, alias, JoinKind::LeftOuter)
    }

    /// [`Query::alias`] with an explicit join kind.
    pub fn alias_join<'a>(
        mut self,
        path: &str,
        alias: impl Into<Option<&'a str>>,
        join: JoinKind,
    ) -> Self {
        let Some(alias) = alias.into() else {
            return self;
        };
        let relation = E::relations().into_iter().find(|r| r.name == path);
        self.criteria.aliases.push(AliasDef {
            path: path.to_owned(),
            alias: alias.to_owned(),
            join,
            relation,
        });
        self
    }

    pub fn order_by_asc(mut self, path: &str) -> Self {
        self.criteria.orders.push(SortKey {
            path: path.to_owned(),
            direction: SortDir::Asc,
        });
        self
    }

    pub fn order_by_desc(mut self, path: &str) -> Self {
        self.criteria.orders.push(SortKey {
            path: path.to_owned(),
            direction: SortDir::Desc,
        });
        self
    }

    /// Result offset, skipped when the argument is null.
    pub fn skip(mut self, n: impl Into<Option<u64>>) -> Self {
        if let Some(n) = n.into() {
            self.criteria.offset = Some(n);
        }
        self
    }

    /// Result limit, skipped when the argument is null.
    pub fn take(mut self, n: impl Into<Option<u64>>) -> Self {
        if let Some(n) = n.into() {
            self.criteria.limit = Some(n);
        }
        self
    }

    /// Association fetch hint; advisory, see [`FetchMode`].
    pub fn fetch(mut self, path: &str, mode: FetchMode) -> Self {
        self.criteria.fetch_hints.push(FetchHint {
            path: path.to_owned(),
            mode,
        });
        self
    }

    /// Replace the projection with a group-by projection on `path`; results
    /// come back through [`Query::records`], one per distinct value.
    pub fn group_by(mut self, path: &str) -> Self {
        self.criteria.projection = Projection::Group(path.to_owned());
        self
    }

    /// Replace the projection with an explicit column list; results come
    /// back through [`Query::records`].
    pub fn columns<I>(mut self, paths: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.criteria.projection =
            Projection::Columns(paths.into_iter().map(Into::into).collect());
        self
    }

    fn execute(&self) -> Result<Vec<Record>, PersistenceError> {
        if let Some(alias) = self.criteria.unresolved_alias() {
            return Err(PersistenceError::Criteria(format!(
                "no relation \"{}\" declared on {}",
                alias.path, self.criteria.entity.name
            )));
        }
        Ok(self.session.select(&self.criteria)?)
    }

    /// Every matching entity.
    pub fn list(self) -> Result<Vec<E>, PersistenceError> {
        self.execute()?.iter().map(E::from_record).collect()
    }

    /// Every matching row as raw records, the terminal to use with
    /// [`Query::columns`] and [`Query::group_by`].
    pub fn records(self) -> Result<Vec<Record>, PersistenceError> {
        self.execute()
    }

    /// At most one entity; more than one row is an [`PersistenceError::Ambiguous`].
    pub fn unique(self) -> Result<Option<E>, PersistenceError> {
        let records = self.execute()?;
        match records.len() {
            0 => Ok(None),
            1 => E::from_record(&records[0]).map(Some),
            found => Err(PersistenceError::Ambiguous {
                entity: E::meta().name,
                found,
            }),
        }
    }

    /// First row or `None`; forces a limit of one.
    pub fn first(mut self) -> Result<Option<E>, PersistenceError> {
        self.criteria.limit = Some(1);
        let records = self.execute()?;
        records.first().map(E::from_record).transpose()
    }

    /// Row count for the criteria. Swaps the projection for a count and
    /// drops ordering and paging, which have no meaning on a scalar.
    pub fn count(mut self) -> Result<u64, PersistenceError> {
        self.criteria.projection = Projection::Count;
        self.criteria.orders.clear();
        self.criteria.offset = None;
        self.criteria.limit = None;
        let records = self.execute()?;
        match records.first() {
            Some(record) => record.try_get::<i64>(COUNT_COLUMN).map(|n| n.max(0) as u64),
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityMeta, Relation};
    use crate::session::SessionError;

    #[derive(Debug, Clone)]
    struct Widget {
        id: i64,
        name: String,
    }

    impl Entity for Widget {
        fn meta() -> EntityMeta {
            EntityMeta::new("widgets", "id")
        }

        fn key(&self) -> Value {
            Value::BigInt(self.id)
        }

        fn relations() -> Vec<Relation> {
            vec![Relation {
                name: "vendor",
                target: "vendors",
                owner_column: "vendor_id",
                target_column: "id",
            }]
        }

        fn to_record(&self) -> Record {
            Record::new().with("id", self.id).with("name", self.name.clone())
        }

        fn from_record(record: &Record) -> Result<Self, PersistenceError> {
            Ok(Widget {
                id: record.try_get("id")?,
                name: record.try_get("name")?,
            })
        }
    }

    /// Session stub for builder-state tests; terminals are not exercised.
    struct Disconnected;

    impl Session for Disconnected {
        fn begin(&self) -> Result<(), SessionError> {
            Err(SessionError::Unsupported("stub".into()))
        }
        fn commit(&self) -> Result<(), SessionError> {
            Err(SessionError::Unsupported("stub".into()))
        }
        fn rollback(&self) -> Result<(), SessionError> {
            Err(SessionError::Unsupported("stub".into()))
        }
        fn insert(&self, _: &EntityMeta, _: Record) -> Result<Record, SessionError> {
            Err(SessionError::Unsupported("stub".into()))
        }
        fn merge(&self, _: &EntityMeta, _: Record) -> Result<Record, SessionError> {
            Err(SessionError::Unsupported("stub".into()))
        }
        fn remove(&self, _: &EntityMeta, _: &Value) -> Result<(), SessionError> {
            Err(SessionError::Unsupported("stub".into()))
        }
        fn get(&self, _: &EntityMeta, _: &Value) -> Result<Option<Record>, SessionError> {
            Err(SessionError::Unsupported("stub".into()))
        }
        fn select(&self, _: &Criteria) -> Result<Vec<Record>, SessionError> {
            Ok(Vec::new())
        }
        fn call_procedure(
            &self,
            _: &crate::procedure::ProcedureCall,
        ) -> Result<Vec<Record>, SessionError> {
            Err(SessionError::Unsupported("stub".into()))
        }
        fn query_native(&self, _: &str, _: &[Value]) -> Result<Vec<Record>, SessionError> {
            Err(SessionError::Unsupported("stub".into()))
        }
    }

    #[test]
    fn null_arguments_skip_their_directives() {
        let session = Disconnected;
        let query = Query::<Widget>::new(&session)
            .eq_not_null("name", None::<String>)
            .ne("name", None::<String>)
            .between("id", None::<i64>, 10i64)
            .is_in("name", None::<Vec<String>>)
            .take(None)
            .skip(None);

        let criteria = query.criteria();
        assert!(criteria.filters().is_empty());
        assert_eq!(criteria.limit(), None);
        assert_eq!(criteria.offset(), None);
    }

    #[test]
    fn plain_eq_applies_even_when_null() {
        let session = Disconnected;
        let query = Query::<Widget>::new(&session).eq("name", None::<String>);
        assert_eq!(query.criteria().filters().len(), 1);
    }

    #[test]
    fn group_by_replaces_projection() {
        let session = Disconnected;
        let query = Query::<Widget>::new(&session)
            .columns(["name", "id"])
            .group_by("name");
        assert_eq!(
            query.criteria().projection(),
            &Projection::Group("name".into())
        );
    }

    #[test]
    fn alias_resolves_declared_relations() {
        let session = Disconnected;
        let query = Query::<Widget>::new(&session)
            .alias("vendor", "v")
            .alias("bogus", "b");

        let aliases = query.criteria().aliases();
        assert!(aliases[0].relation().is_some());
        assert!(aliases[1].relation().is_none());
        assert_eq!(aliases[0].join, JoinKind::LeftOuter);
    }

    #[test]
    fn null_alias_name_skips_the_join() {
        let session = Disconnected;
        let query = Query::<Widget>::new(&session).alias("vendor", None);
        assert!(query.criteria().aliases().is_empty());
    }

    #[test]
    fn unresolved_alias_fails_terminals() {
        let session = Disconnected;
        let err = Query::<Widget>::new(&session)
            .alias("bogus", "b")
            .list()
            .unwrap_err();
        assert!(matches!(err, PersistenceError::Criteria(_)));
    }

    #[test]
    fn or_skips_when_a_side_is_absent() {
        let session = Disconnected;
        let query = Query::<Widget>::new(&session).or(
            Filter::ilike("name", None::<String>),
            Filter::eq("name", "x"),
        );
        assert!(query.criteria().filters().is_empty());

        let query = Query::<Widget>::new(&session).or(
            Filter::eq("name", "x"),
            Filter::eq("name", "y"),
        );
        assert_eq!(query.criteria().filters().len(), 1);
    }
}
