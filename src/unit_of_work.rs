//! The unit-of-work manager.
//!
//! Owns at most one live [`Session`] and wraps every mutation in
//! begin/commit, rolling back on failure. The session factory is injected;
//! nothing here is global. Stored-procedure calls manage their own
//! short-lived session and leave the unit of work's session alone.

use std::sync::Arc;

use crate::criteria::{Criteria, Query};
use crate::entity::Entity;
use crate::error::PersistenceError;
use crate::procedure::{ProcedureCall, ScalarType};
use crate::record::Record;
use crate::session::{Session, SessionError, SessionFactory};
use crate::value::Value;

/// One logical conversation with the store.
///
/// ```no_run
/// # use std::sync::Arc;
/// # use purser::{MemoryEngine, SessionFactory, UnitOfWork};
/// let engine = Arc::new(MemoryEngine::new());
/// let mut uow = UnitOfWork::new(engine.clone());
/// uow.open()?;
/// // ... create / find / delete ...
/// uow.close();
/// engine.shutdown();
/// # Ok::<(), purser::PersistenceError>(())
/// ```
pub struct UnitOfWork {
    factory: Arc<dyn SessionFactory>,
    session: Option<Box<dyn Session>>,
}

impl UnitOfWork {
    /// A closed unit of work; call [`UnitOfWork::open`] before using it.
    pub fn new(factory: Arc<dyn SessionFactory>) -> Self {
        Self {
            factory,
            session: None,
        }
    }

    /// Open a session if none is live. Calling it again is a no-op.
    pub fn open(&mut self) -> Result<(), PersistenceError> {
        if self.session.is_none() {
            self.session = Some(self.factory.open_session()?);
        }
        Ok(())
    }

    /// Drop the live session, if any. Release is RAII; closing twice is fine.
    pub fn close(&mut self) {
        self.session = None;
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    fn session(&self) -> Result<&dyn Session, PersistenceError> {
        self.session.as_deref().ok_or(PersistenceError::Closed)
    }

    /// Start a criteria query over `E` on the live session.
    pub fn find<E: Entity>(&self) -> Result<Query<'_, E>, PersistenceError> {
        Ok(Query::new(self.session()?))
    }

    /// Persist a new entity inside begin/commit; returns the stored entity
    /// with its engine-assigned key.
    pub fn create<E: Entity>(&self, entity: &E) -> Result<E, PersistenceError> {
        let session = self.session()?;
        let record =
            Self::in_transaction(session, |s| s.insert(&E::meta(), entity.to_record()))?;
        E::from_record(&record)
    }

    /// Merge an entity's state over the row addressed by its key, inside
    /// begin/commit. A missing row is a transaction failure, not an upsert.
    pub fn update<E: Entity>(&self, entity: &E) -> Result<E, PersistenceError> {
        let session = self.session()?;
        let record =
            Self::in_transaction(session, |s| s.merge(&E::meta(), entity.to_record()))?;
        E::from_record(&record)
    }

    /// Delete the row addressed by the entity's key, inside begin/commit.
    /// A transient entity (null key) fails inside the wrapper.
    pub fn delete<E: Entity>(&self, entity: &E) -> Result<(), PersistenceError> {
        let session = self.session()?;
        let key = entity.key();
        Self::in_transaction(session, |s| s.remove(&E::meta(), &key))
    }

    /// Keyed lookup; `Ok(None)` when absent. Runs outside any transaction.
    pub fn find_by_id<E: Entity>(
        &self,
        key: impl Into<Value>,
    ) -> Result<Option<E>, PersistenceError> {
        let record = self.session()?.get(&E::meta(), &key.into())?;
        record.as_ref().map(E::from_record).transpose()
    }

    /// Delete by key. A missing row fails fast with
    /// [`PersistenceError::NotFound`] so callers can tell "deleted" from
    /// "was never there".
    pub fn delete_by_id<E: Entity>(&self, key: impl Into<Value>) -> Result<(), PersistenceError> {
        let key = key.into();
        let session = self.session()?;
        let meta = E::meta();
        if session.get(&meta, &key)?.is_none() {
            return Err(PersistenceError::NotFound {
                entity: meta.name,
                key,
            });
        }
        Self::in_transaction(session, |s| s.remove(&meta, &key))
    }

    /// Every row of `E`, unbounded; pagination awareness is the caller's
    /// responsibility.
    pub fn find_all<E: Entity>(&self) -> Result<Vec<E>, PersistenceError> {
        let records = self.session()?.select(&Criteria::new(E::meta()))?;
        records.iter().map(E::from_record).collect()
    }

    /// Run a native statement with positional parameters on the live
    /// session.
    pub fn query_native(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<Vec<Record>, PersistenceError> {
        Ok(self.session()?.query_native(sql, params)?)
    }

    /// Call a procedure without parameters.
    pub fn call_procedure(&self, name: &str) -> Result<Vec<Record>, PersistenceError> {
        self.run_procedure(ProcedureCall::new(name))
    }

    /// Call a procedure with exactly one named parameter of an explicit
    /// type.
    pub fn call_procedure_with(
        &self,
        name: &str,
        parameter: &str,
        ty: ScalarType,
        value: impl Into<Value>,
    ) -> Result<Vec<Record>, PersistenceError> {
        self.run_procedure(ProcedureCall::new(name).with_param(parameter, ty, value))
    }

    /// Call a procedure with named parameters whose types are resolved from
    /// their runtime values. A value outside the whitelist refuses the whole
    /// call, naming the parameter and procedure.
    pub fn call_procedure_map<K, V, I>(
        &self,
        name: &str,
        params: I,
    ) -> Result<Vec<Record>, PersistenceError>
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut call = ProcedureCall::new(name);
        for (parameter, value) in params {
            let parameter = parameter.into();
            let value = value.into();
            let ty =
                ScalarType::of(&value).ok_or_else(|| PersistenceError::UnresolvedParameter {
                    procedure: name.to_owned(),
                    parameter: parameter.clone(),
                    value: value.clone(),
                })?;
            call = call.with_param(parameter, ty, value);
        }
        self.run_procedure(call)
    }

    /// Procedure calls scope their own session: open from the factory,
    /// execute, and release on every path. The unit of work's own session,
    /// open or not, is never involved.
    fn run_procedure(&self, call: ProcedureCall) -> Result<Vec<Record>, PersistenceError> {
        let session = self.factory.open_session()?;
        Ok(session.call_procedure(&call)?)
    }

    fn in_transaction<T>(
        session: &dyn Session,
        operation: impl FnOnce(&dyn Session) -> Result<T, SessionError>,
    ) -> Result<T, PersistenceError> {
        session.begin().map_err(|err| PersistenceError::Transaction {
            message: err.to_string(),
        })?;
        match operation(session) {
            Ok(value) => match session.commit() {
                Ok(()) => Ok(value),
                Err(err) => {
                    Self::try_rollback(session);
                    Err(PersistenceError::Transaction {
                        message: err.to_string(),
                    })
                }
            },
            Err(err) => {
                Self::try_rollback(session);
                Err(PersistenceError::Transaction {
                    message: err.to_string(),
                })
            }
        }
    }

    fn try_rollback(session: &dyn Session) {
        if let Err(err) = session.rollback() {
            // Keep the original failure; the rollback failure is only logged.
            log::warn!("rollback after a failed transaction also failed: {}", err);
        }
    }
}
