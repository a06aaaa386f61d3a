//! SQL-rendering session.
//!
//! [`SqlSession`] turns session calls into PostgreSQL statements and hands
//! them to a [`SqlExecutor`], the thin seam a driver implements. Criteria
//! selects render through sea-query; keyed writes render as prepared
//! statements with `$n` placeholders and `RETURNING *`, so the executor only
//! ever sees SQL text plus a bind list, and only it knows how rows decode
//! into [`Record`]s.

use sea_query::Values;

use crate::criteria::{sql, Criteria};
use crate::entity::EntityMeta;
use crate::procedure::ProcedureCall;
use crate::record::Record;
use crate::session::{Session, SessionError};
use crate::value::Value;

/// Executes rendered SQL against some driver.
///
/// `execute` is for statements where only the affected-row count matters;
/// `query` is for anything that produces rows, `RETURNING` clauses included.
pub trait SqlExecutor {
    fn execute(&self, sql: &str, binds: &Values) -> Result<u64, SessionError>;
    fn query(&self, sql: &str, binds: &Values) -> Result<Vec<Record>, SessionError>;
}

/// A [`Session`] over any [`SqlExecutor`].
pub struct SqlSession<X> {
    executor: X,
}

impl<X: SqlExecutor> SqlSession<X> {
    pub fn new(executor: X) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &X {
        &self.executor
    }

    pub fn into_executor(self) -> X {
        self.executor
    }
}

fn no_binds() -> Values {
    Values(Vec::new())
}

/// Double-quotes an identifier, each dot-separated segment on its own, with
/// embedded quotes doubled.
fn quote_ident(name: &str) -> String {
    name.split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

impl<X: SqlExecutor> Session for SqlSession<X> {
    fn begin(&self) -> Result<(), SessionError> {
        self.executor.execute("BEGIN", &no_binds()).map(|_| ())
    }

    fn commit(&self) -> Result<(), SessionError> {
        self.executor.execute("COMMIT", &no_binds()).map(|_| ())
    }

    fn rollback(&self) -> Result<(), SessionError> {
        self.executor.execute("ROLLBACK", &no_binds()).map(|_| ())
    }

    fn insert(&self, entity: &EntityMeta, record: Record) -> Result<Record, SessionError> {
        let mut columns = Vec::new();
        let mut binds = Vec::new();
        for (column, value) in record.iter() {
            // A null key is left to the database default or sequence.
            if column == entity.key_column && value.is_null() {
                continue;
            }
            columns.push(quote_ident(column));
            binds.push(sql::sql_value(value));
        }

        let statement = if columns.is_empty() {
            format!(
                "INSERT INTO {} DEFAULT VALUES RETURNING *",
                quote_ident(entity.name)
            )
        } else {
            let placeholders: Vec<String> =
                (1..=binds.len()).map(|n| format!("${}", n)).collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
                quote_ident(entity.name),
                columns.join(", "),
                placeholders.join(", ")
            )
        };

        let mut rows = self.executor.query(&statement, &Values(binds))?;
        if rows.is_empty() {
            return Err(SessionError::Backend(
                "insert returned no row".into(),
            ));
        }
        Ok(rows.swap_remove(0))
    }

    fn merge(&self, entity: &EntityMeta, record: Record) -> Result<Record, SessionError> {
        let key = record.get(entity.key_column).cloned().unwrap_or(Value::Null);
        if key.is_null() {
            return Err(SessionError::RowNotFound {
                entity: entity.name.to_owned(),
                key,
            });
        }

        let mut assignments = Vec::new();
        let mut binds = Vec::new();
        for (column, value) in record.iter() {
            binds.push(sql::sql_value(value));
            assignments.push(format!("{} = ${}", quote_ident(column), binds.len()));
        }
        binds.push(sql::sql_value(&key));
        let statement = format!(
            "UPDATE {} SET {} WHERE {} = ${} RETURNING *",
            quote_ident(entity.name),
            assignments.join(", "),
            quote_ident(entity.key_column),
            binds.len()
        );

        let mut rows = self.executor.query(&statement, &Values(binds))?;
        if rows.is_empty() {
            return Err(SessionError::RowNotFound {
                entity: entity.name.to_owned(),
                key,
            });
        }
        Ok(rows.swap_remove(0))
    }

    fn remove(&self, entity: &EntityMeta, key: &Value) -> Result<(), SessionError> {
        let statement = format!(
            "DELETE FROM {} WHERE {} = $1",
            quote_ident(entity.name),
            quote_ident(entity.key_column)
        );
        let affected = self
            .executor
            .execute(&statement, &Values(vec![sql::sql_value(key)]))?;
        if affected == 0 {
            return Err(SessionError::RowNotFound {
                entity: entity.name.to_owned(),
                key: key.clone(),
            });
        }
        Ok(())
    }

    fn get(&self, entity: &EntityMeta, key: &Value) -> Result<Option<Record>, SessionError> {
        if key.is_null() {
            return Ok(None);
        }
        let statement = format!(
            "SELECT * FROM {} WHERE {} = $1",
            quote_ident(entity.name),
            quote_ident(entity.key_column)
        );
        let mut rows = self
            .executor
            .query(&statement, &Values(vec![sql::sql_value(key)]))?;
        if rows.is_empty() {
            Ok(None)
        } else {
            Ok(Some(rows.swap_remove(0)))
        }
    }

    fn select(&self, criteria: &Criteria) -> Result<Vec<Record>, SessionError> {
        let (statement, binds) =
            sql::select_sql(criteria).map_err(|e| SessionError::Backend(e.to_string()))?;
        self.executor.query(&statement, &binds)
    }

    fn call_procedure(&self, call: &ProcedureCall) -> Result<Vec<Record>, SessionError> {
        // Each parameter is cast to its resolved scalar type, so the server
        // never has to guess a prepared-statement type.
        let mut binds = Vec::with_capacity(call.params.len());
        let mut placeholders = Vec::with_capacity(call.params.len());
        for param in &call.params {
            binds.push(sql::sql_value(&param.value));
            placeholders.push(format!("${}::{}", binds.len(), param.ty.sql_type()));
        }
        let statement = format!(
            "SELECT * FROM {}({})",
            quote_ident(&call.name),
            placeholders.join(", ")
        );
        self.executor.query(&statement, &Values(binds))
    }

    fn query_native(&self, sql_text: &str, params: &[Value]) -> Result<Vec<Record>, SessionError> {
        let binds = Values(params.iter().map(sql::sql_value).collect());
        self.executor.query(sql_text, &binds)
    }
}
