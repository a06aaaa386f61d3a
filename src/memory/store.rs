//! Shared state behind the reference engine.
//!
//! One `Store` sits behind an `Arc<Mutex<..>>`; sessions take the lock per
//! call. Transactions are whole-store snapshots: `begin` clones the tables,
//! `rollback` puts the clone back, `commit` throws it away. One transaction
//! at a time, owned by the session that began it.

use std::collections::HashMap;

use crate::config::EngineConfig;
use crate::criteria::Criteria;
use crate::entity::EntityMeta;
use crate::memory::eval;
use crate::procedure::ProcedureCall;
use crate::record::Record;
use crate::session::SessionError;
use crate::value::Value;

/// A registered procedure: a pure function of its call. It runs under the
/// store lock, so it cannot re-enter the store.
pub type ProcedureFn =
    Box<dyn Fn(&ProcedureCall) -> Result<Vec<Record>, SessionError> + Send + Sync>;

#[derive(Debug, Clone)]
pub(crate) struct Table {
    pub(crate) rows: Vec<Record>,
    next_key: i64,
}

impl Table {
    fn new(sequence_start: i64) -> Self {
        Self {
            rows: Vec::new(),
            next_key: sequence_start,
        }
    }

    fn position_by_key(&self, key_column: &str, key: &Value) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.get(key_column).is_some_and(|v| v.equals(key)))
    }
}

struct ActiveTxn {
    owner: u64,
    tables: HashMap<String, Table>,
}

pub(crate) struct Store {
    config: EngineConfig,
    tables: HashMap<String, Table>,
    procedures: HashMap<String, ProcedureFn>,
    active_txn: Option<ActiveTxn>,
    open_sessions: usize,
    next_session: u64,
    closed: bool,
}

impl Store {
    pub(crate) fn new(config: EngineConfig) -> Self {
        Self {
            config,
            tables: HashMap::new(),
            procedures: HashMap::new(),
            active_txn: None,
            open_sessions: 0,
            next_session: 0,
            closed: false,
        }
    }

    fn ensure_live(&self) -> Result<(), SessionError> {
        if self.closed {
            Err(SessionError::Closed)
        } else {
            Ok(())
        }
    }

    // -- session bookkeeping ------------------------------------------------

    pub(crate) fn try_open(&mut self) -> Result<u64, SessionError> {
        self.ensure_live()?;
        if self.open_sessions >= self.config.max_open_sessions {
            return Err(SessionError::Backend(format!(
                "session limit reached ({} open)",
                self.open_sessions
            )));
        }
        self.open_sessions += 1;
        self.next_session += 1;
        Ok(self.next_session)
    }

    /// Called when a session drops. A transaction the session left open is
    /// rolled back; dropping mid-transaction must not leak writes.
    pub(crate) fn release(&mut self, session: u64) {
        self.open_sessions = self.open_sessions.saturating_sub(1);
        match self.active_txn.take() {
            Some(txn) if txn.owner == session => {
                self.tables = txn.tables;
                log::warn!("session dropped with an open transaction; rolled back");
            }
            other => self.active_txn = other,
        }
    }

    pub(crate) fn open_sessions(&self) -> usize {
        self.open_sessions
    }

    pub(crate) fn shutdown(&mut self) {
        self.closed = true;
    }

    // -- transactions -------------------------------------------------------

    pub(crate) fn begin(&mut self, session: u64) -> Result<(), SessionError> {
        self.ensure_live()?;
        if self.active_txn.is_some() {
            return Err(SessionError::TransactionState(
                "transaction already in progress".into(),
            ));
        }
        self.active_txn = Some(ActiveTxn {
            owner: session,
            tables: self.tables.clone(),
        });
        Ok(())
    }

    pub(crate) fn commit(&mut self, session: u64) -> Result<(), SessionError> {
        self.ensure_live()?;
        self.end_txn(session).map(|_| ())
    }

    pub(crate) fn rollback(&mut self, session: u64) -> Result<(), SessionError> {
        self.ensure_live()?;
        let txn = self.end_txn(session)?;
        self.tables = txn.tables;
        Ok(())
    }

    fn end_txn(&mut self, session: u64) -> Result<ActiveTxn, SessionError> {
        match self.active_txn.take() {
            None => Err(SessionError::TransactionState(
                "no active transaction".into(),
            )),
            Some(txn) if txn.owner != session => {
                let owner = txn.owner;
                self.active_txn = Some(txn);
                Err(SessionError::TransactionState(format!(
                    "transaction is owned by session {}",
                    owner
                )))
            }
            Some(txn) => Ok(txn),
        }
    }

    // -- rows ---------------------------------------------------------------

    pub(crate) fn insert(
        &mut self,
        meta: &EntityMeta,
        mut record: Record,
    ) -> Result<Record, SessionError> {
        self.ensure_live()?;
        let sequence_start = self.config.sequence_start;
        let table = self
            .tables
            .entry(meta.name.to_owned())
            .or_insert_with(|| Table::new(sequence_start));

        let pending = record.get(meta.key_column).cloned();
        match pending {
            None | Some(Value::Null) => {
                let key = table.next_key;
                table.next_key += 1;
                record.set(meta.key_column, Value::BigInt(key));
            }
            Some(key) => {
                if table.position_by_key(meta.key_column, &key).is_some() {
                    return Err(SessionError::DuplicateKey {
                        entity: meta.name.to_owned(),
                        key,
                    });
                }
                // Keep the sequence ahead of explicitly chosen integer keys.
                if let Some(k) = match key {
                    Value::Int(k) => Some(i64::from(k)),
                    Value::BigInt(k) => Some(k),
                    _ => None,
                } {
                    table.next_key = table.next_key.max(k + 1);
                }
            }
        }

        table.rows.push(record.clone());
        Ok(record)
    }

    pub(crate) fn merge(
        &mut self,
        meta: &EntityMeta,
        record: Record,
    ) -> Result<Record, SessionError> {
        self.ensure_live()?;
        let key = record.get(meta.key_column).cloned().unwrap_or(Value::Null);
        let position = self
            .tables
            .get(meta.name)
            .and_then(|t| t.position_by_key(meta.key_column, &key));
        match position {
            Some(i) => {
                // position_by_key only succeeds for tables that exist.
                if let Some(table) = self.tables.get_mut(meta.name) {
                    table.rows[i] = record.clone();
                }
                Ok(record)
            }
            None => Err(SessionError::RowNotFound {
                entity: meta.name.to_owned(),
                key,
            }),
        }
    }

    pub(crate) fn remove(&mut self, meta: &EntityMeta, key: &Value) -> Result<(), SessionError> {
        self.ensure_live()?;
        let position = self
            .tables
            .get(meta.name)
            .and_then(|t| t.position_by_key(meta.key_column, key));
        match position {
            Some(i) => {
                if let Some(table) = self.tables.get_mut(meta.name) {
                    table.rows.remove(i);
                }
                Ok(())
            }
            None => Err(SessionError::RowNotFound {
                entity: meta.name.to_owned(),
                key: key.clone(),
            }),
        }
    }

    pub(crate) fn get(
        &self,
        meta: &EntityMeta,
        key: &Value,
    ) -> Result<Option<Record>, SessionError> {
        self.ensure_live()?;
        Ok(self
            .tables
            .get(meta.name)
            .and_then(|t| t.position_by_key(meta.key_column, key).map(|i| t.rows[i].clone())))
    }

    pub(crate) fn select(&self, criteria: &Criteria) -> Result<Vec<Record>, SessionError> {
        self.ensure_live()?;
        eval::select(&self.tables, criteria)
    }

    // -- procedures ---------------------------------------------------------

    pub(crate) fn register_procedure(&mut self, name: String, procedure: ProcedureFn) {
        self.procedures.insert(name, procedure);
    }

    pub(crate) fn call_procedure(
        &self,
        call: &ProcedureCall,
    ) -> Result<Vec<Record>, SessionError> {
        self.ensure_live()?;
        match self.procedures.get(&call.name) {
            Some(procedure) => procedure(call),
            None => Err(SessionError::Backend(format!(
                "unknown procedure \"{}\"",
                call.name
            ))),
        }
    }

    #[cfg(test)]
    pub(crate) fn into_tables(self) -> HashMap<String, Table> {
        self.tables
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("tables", &self.tables.len())
            .field("procedures", &self.procedures.len())
            .field("open_sessions", &self.open_sessions)
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> EntityMeta {
        EntityMeta::new("parts", "id")
    }

    fn store() -> Store {
        Store::new(EngineConfig::default())
    }

    #[test]
    fn insert_assigns_sequential_keys_for_null_keys() {
        let mut store = store();
        let a = store
            .insert(&meta(), Record::new().with("id", Value::Null).with("sku", "A"))
            .unwrap();
        let b = store
            .insert(&meta(), Record::new().with("sku", "B"))
            .unwrap();
        assert_eq!(a.get("id"), Some(&Value::BigInt(1)));
        assert_eq!(b.get("id"), Some(&Value::BigInt(2)));
    }

    #[test]
    fn explicit_keys_bump_the_sequence_and_reject_duplicates() {
        let mut store = store();
        store
            .insert(&meta(), Record::new().with("id", 10i64))
            .unwrap();
        let next = store.insert(&meta(), Record::new()).unwrap();
        assert_eq!(next.get("id"), Some(&Value::BigInt(11)));

        let err = store
            .insert(&meta(), Record::new().with("id", 10i32))
            .unwrap_err();
        assert!(matches!(err, SessionError::DuplicateKey { .. }));
    }

    #[test]
    fn rollback_restores_the_snapshot() {
        let mut store = store();
        store
            .insert(&meta(), Record::new().with("sku", "keep"))
            .unwrap();

        store.begin(1).unwrap();
        store
            .insert(&meta(), Record::new().with("sku", "discard"))
            .unwrap();
        store.remove(&meta(), &Value::BigInt(1)).unwrap();
        store.rollback(1).unwrap();

        let rows = &store.tables["parts"].rows;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("sku"), Some(&Value::Text("keep".into())));
    }

    #[test]
    fn nested_begin_is_rejected() {
        let mut store = store();
        store.begin(1).unwrap();
        let err = store.begin(1).unwrap_err();
        assert!(matches!(err, SessionError::TransactionState(_)));
    }

    #[test]
    fn commit_requires_the_owning_session() {
        let mut store = store();
        store.begin(1).unwrap();
        assert!(store.commit(2).is_err());
        store.commit(1).unwrap();
        assert!(store.commit(1).is_err());
    }

    #[test]
    fn releasing_a_session_mid_transaction_rolls_back() {
        let mut store = store();
        let session = store.try_open().unwrap();
        store.begin(session).unwrap();
        store
            .insert(&meta(), Record::new().with("sku", "leak"))
            .unwrap();
        store.release(session);

        assert!(store.tables.get("parts").map_or(true, |t| t.rows.is_empty()));
        assert_eq!(store.open_sessions(), 0);
    }

    #[test]
    fn merge_and_remove_demand_an_existing_row() {
        let mut store = store();
        let err = store
            .merge(&meta(), Record::new().with("id", 5i64))
            .unwrap_err();
        assert!(matches!(err, SessionError::RowNotFound { .. }));

        let err = store.remove(&meta(), &Value::Null).unwrap_err();
        assert!(matches!(err, SessionError::RowNotFound { .. }));
    }

    #[test]
    fn session_cap_is_enforced() {
        let mut store = Store::new(EngineConfig {
            max_open_sessions: 1,
            ..EngineConfig::default()
        });
        let first = store.try_open().unwrap();
        assert!(store.try_open().is_err());
        store.release(first);
        assert!(store.try_open().is_ok());
    }
}
