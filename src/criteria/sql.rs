//! Criteria-to-SQL translation.
//!
//! Renders a [`Criteria`] into a sea-query [`SelectStatement`] and from
//! there into Postgres SQL with bind values. The reference engine never
//! touches this; it exists for SQL-backed sessions
//! ([`crate::session::sql::SqlSession`]) and for anyone who wants the
//! statement objects directly.
//!
//! Simple paths render as bare columns; alias-qualified paths (`"c.city"`)
//! split into qualified references. Callers who join and reuse a column name
//! on both sides should qualify their base paths explicitly.

use sea_query::extension::postgres::PgExpr;
use sea_query::{
    Alias, Asterisk, ColumnRef, Condition, Expr, ExprTrait, Func, Iden, IntoColumnRef, JoinType,
    Order, PostgresQueryBuilder, SelectStatement, Values,
};

use crate::criteria::filter::Filter;
use crate::criteria::{Criteria, JoinKind, Projection, SortDir, COUNT_COLUMN};
use crate::error::PersistenceError;
use crate::value::Value;

/// Storage-name iden, borrowed for the statement's lifetime.
pub(crate) struct TableName(pub &'static str);

impl Iden for TableName {
    fn unquoted(&self) -> &str {
        self.0
    }
}

/// Column reference for a possibly alias-qualified path.
pub(crate) fn column_ref(path: &str) -> ColumnRef {
    match path.split_once('.') {
        Some((qualifier, column)) => {
            (Alias::new(qualifier), Alias::new(column)).into_column_ref()
        }
        None => Alias::new(path).into_column_ref(),
    }
}

/// Bind-value conversion. Null binds as an untyped null.
pub(crate) fn sql_value(value: &Value) -> sea_query::Value {
    match value {
        Value::Null => sea_query::Value::String(None),
        Value::Bool(v) => (*v).into(),
        Value::Int(v) => (*v).into(),
        Value::BigInt(v) => (*v).into(),
        Value::Double(v) => (*v).into(),
        Value::Decimal(v) => (*v).into(),
        Value::Text(v) => v.clone().into(),
        Value::Date(v) => (*v).into(),
        Value::DateTime(v) => (*v).into(),
        Value::Uuid(v) => (*v).into(),
        Value::Json(v) => v.clone().into(),
        Value::Bytes(v) => v.clone().into(),
    }
}

/// Translate one predicate tree into a sea-query condition.
pub fn filter_condition(filter: &Filter) -> Condition {
    match filter {
        Filter::Eq { path, value } => {
            Condition::all().add(Expr::col(column_ref(path)).eq(sql_value(value)))
        }
        Filter::Ne { path, value } => {
            Condition::all().add(Expr::col(column_ref(path)).ne(sql_value(value)))
        }
        Filter::Ge { path, value } => {
            Condition::all().add(Expr::col(column_ref(path)).gte(sql_value(value)))
        }
        Filter::Le { path, value } => {
            Condition::all().add(Expr::col(column_ref(path)).lte(sql_value(value)))
        }
        Filter::Between { path, low, high } => Condition::all()
            .add(Expr::col(column_ref(path)).between(sql_value(low), sql_value(high))),
        Filter::Like {
            path,
            pattern,
            case_insensitive: false,
        } => Condition::all().add(Expr::col(column_ref(path)).like(pattern.as_str())),
        Filter::Like {
            path,
            pattern,
            case_insensitive: true,
        } => Condition::all().add(Expr::col(column_ref(path)).ilike(pattern.as_str())),
        Filter::In { path, values } => {
            if values.is_empty() {
                // `IN ()` is not SQL; an empty set matches nothing.
                Condition::all().add(Expr::cust("FALSE"))
            } else {
                Condition::all()
                    .add(Expr::col(column_ref(path)).is_in(values.iter().map(sql_value)))
            }
        }
        Filter::IsNull { path } => Condition::all().add(Expr::col(column_ref(path)).is_null()),
        Filter::IsNotNull { path } => {
            Condition::all().add(Expr::col(column_ref(path)).is_not_null())
        }
        Filter::IsEmpty { path } => {
            Condition::all().add(Func::char_length(Expr::col(column_ref(path))).eq(0i32))
        }
        Filter::IsNotEmpty { path } => {
            Condition::all().add(Func::char_length(Expr::col(column_ref(path))).ne(0i32))
        }
        Filter::And(filters) => filters
            .iter()
            .fold(Condition::all(), |cond, f| cond.add(filter_condition(f))),
        Filter::Or(filters) => filters
            .iter()
            .fold(Condition::any(), |cond, f| cond.add(filter_condition(f))),
    }
}

/// Build the select statement for a criteria.
pub fn select_statement(criteria: &Criteria) -> Result<SelectStatement, PersistenceError> {
    let meta = criteria.entity();
    let mut query = SelectStatement::default();

    match criteria.projection() {
        Projection::Entity => {
            query.column(Asterisk);
        }
        Projection::Columns(paths) => {
            for path in paths {
                query.column(column_ref(path));
            }
        }
        Projection::Group(path) => {
            query.column(column_ref(path));
            query.group_by_col(column_ref(path));
        }
        Projection::Count => {
            query.expr_as(Func::count(Expr::col(Asterisk)), Alias::new(COUNT_COLUMN));
        }
    }

    query.from(TableName(meta.name));

    for alias in criteria.aliases() {
        let relation = alias.relation().ok_or_else(|| {
            PersistenceError::Criteria(format!(
                "no relation \"{}\" declared on {}",
                alias.path, meta.name
            ))
        })?;
        let join = match alias.join {
            JoinKind::Inner => JoinType::InnerJoin,
            JoinKind::LeftOuter => JoinType::LeftJoin,
            JoinKind::RightOuter => JoinType::RightJoin,
            JoinKind::FullOuter => JoinType::FullOuterJoin,
        };
        query.join_as(
            join,
            TableName(relation.target),
            Alias::new(&alias.alias),
            Expr::col((TableName(meta.name), Alias::new(relation.owner_column)))
                .equals((Alias::new(&alias.alias), Alias::new(relation.target_column))),
        );
    }

    for filter in criteria.filters() {
        query.cond_where(filter_condition(filter));
    }

    for key in criteria.orders() {
        let direction = match key.direction {
            SortDir::Asc => Order::Asc,
            SortDir::Desc => Order::Desc,
        };
        query.order_by(column_ref(&key.path), direction);
    }

    if let Some(offset) = criteria.offset() {
        query.offset(offset);
    }
    if let Some(limit) = criteria.limit() {
        query.limit(limit);
    }

    Ok(query)
}

/// Render to Postgres SQL plus bind values.
pub fn select_sql(criteria: &Criteria) -> Result<(String, Values), PersistenceError> {
    Ok(select_statement(criteria)?.build(PostgresQueryBuilder))
}
