use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::EngineConfig;
use crate::memory::session::MemorySession;
use crate::memory::store::Store;
use crate::procedure::ProcedureCall;
use crate::record::Record;
use crate::session::{Session, SessionError, SessionFactory};

/// The in-memory session factory.
///
/// Cheap to construct, safe to share across threads (clone the handle or put
/// it in an `Arc`), and scoped like any other backend: [`SessionFactory::shutdown`]
/// closes it for good, and sessions are counted against
/// [`EngineConfig::max_open_sessions`].
#[derive(Clone)]
pub struct MemoryEngine {
    store: Arc<Mutex<Store>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            store: Arc::new(Mutex::new(Store::new(config))),
        }
    }

    fn store(&self) -> Result<MutexGuard<'_, Store>, SessionError> {
        self.store
            .lock()
            .map_err(|_| SessionError::Backend("store lock poisoned".into()))
    }

    /// Registers a procedure under `name`, replacing any previous one. The
    /// function runs under the store lock and must not open sessions of its
    /// own.
    pub fn register_procedure<F>(&self, name: impl Into<String>, procedure: F) -> Result<(), SessionError>
    where
        F: Fn(&ProcedureCall) -> Result<Vec<Record>, SessionError> + Send + Sync + 'static,
    {
        self.store()?
            .register_procedure(name.into(), Box::new(procedure));
        Ok(())
    }

    /// Number of sessions currently checked out.
    pub fn open_sessions(&self) -> usize {
        self.store().map(|s| s.open_sessions()).unwrap_or(0)
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionFactory for MemoryEngine {
    fn open_session(&self) -> Result<Box<dyn Session>, SessionError> {
        let id = self.store()?.try_open()?;
        log::debug!("opened session {}", id);
        Ok(Box::new(MemorySession::new(Arc::clone(&self.store), id)))
    }

    fn shutdown(&self) {
        if let Ok(mut store) = self.store.lock() {
            store.shutdown();
            log::debug!("engine shut down");
        }
    }
}

impl std::fmt::Debug for MemoryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEngine").finish_non_exhaustive()
    }
}
