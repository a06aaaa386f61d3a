use std::sync::{Arc, Mutex, MutexGuard};

use crate::criteria::Criteria;
use crate::entity::EntityMeta;
use crate::memory::store::Store;
use crate::procedure::ProcedureCall;
use crate::record::Record;
use crate::session::{Session, SessionError};
use crate::value::Value;

/// A session handle onto the shared store. Every call takes the store lock;
/// dropping the handle releases its slot and rolls back a transaction it
/// left open.
pub struct MemorySession {
    store: Arc<Mutex<Store>>,
    id: u64,
}

impl MemorySession {
    pub(crate) fn new(store: Arc<Mutex<Store>>, id: u64) -> Self {
        Self { store, id }
    }

    fn store(&self) -> Result<MutexGuard<'_, Store>, SessionError> {
        self.store
            .lock()
            .map_err(|_| SessionError::Backend("store lock poisoned".into()))
    }
}

impl Session for MemorySession {
    fn begin(&self) -> Result<(), SessionError> {
        self.store()?.begin(self.id)
    }

    fn commit(&self) -> Result<(), SessionError> {
        self.store()?.commit(self.id)
    }

    fn rollback(&self) -> Result<(), SessionError> {
        self.store()?.rollback(self.id)
    }

    fn insert(&self, meta: &EntityMeta, record: Record) -> Result<Record, SessionError> {
        self.store()?.insert(meta, record)
    }

    fn merge(&self, meta: &EntityMeta, record: Record) -> Result<Record, SessionError> {
        self.store()?.merge(meta, record)
    }

    fn remove(&self, meta: &EntityMeta, key: &Value) -> Result<(), SessionError> {
        self.store()?.remove(meta, key)
    }

    fn get(&self, meta: &EntityMeta, key: &Value) -> Result<Option<Record>, SessionError> {
        self.store()?.get(meta, key)
    }

    fn select(&self, criteria: &Criteria) -> Result<Vec<Record>, SessionError> {
        self.store()?.select(criteria)
    }

    fn call_procedure(&self, call: &ProcedureCall) -> Result<Vec<Record>, SessionError> {
        self.store()?.call_procedure(call)
    }

    fn query_native(&self, _sql: &str, _binds: &[Value]) -> Result<Vec<Record>, SessionError> {
        Err(SessionError::Unsupported(
            "native SQL in the reference engine".into(),
        ))
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        if let Ok(mut store) = self.store.lock() {
            store.release(self.id);
        }
    }
}

impl std::fmt::Debug for MemorySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySession").field("id", &self.id).finish()
    }
}
