//! Memoized, single-flight acquisition of capabilities.
//!
//! The first request for a module starts its fetch; every request that
//! arrives before the fetch finishes joins the same in-flight future. A
//! successful result is cached for the lifetime of the loader. A failed
//! fetch is reported to every waiter and leaves the slot empty.

use crate::capability::{Capability, ModuleId};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("module {0} is not provided by this source")]
    Unavailable(ModuleId),
    #[error("failed to load module {module}: {message}")]
    Fetch { module: ModuleId, message: String },
}

pub type LoadResult = Result<Capability, LoadError>;

/// Where modules come from. `fetch` is called at most once per module while
/// a previous fetch is in flight or has succeeded.
pub trait ModuleSource: Send + Sync + 'static {
    fn fetch(&self, module: ModuleId) -> BoxFuture<'static, LoadResult>;
}

/// Outcome of a non-blocking acquisition.
#[derive(Debug, Clone)]
pub enum Acquire {
    Ready(Capability),
    Pending,
}

type InFlight = Shared<BoxFuture<'static, LoadResult>>;

enum Slot {
    Loading(InFlight),
    Ready(Capability),
}

pub struct ModuleLoader {
    source: Arc<dyn ModuleSource>,
    slots: Mutex<HashMap<ModuleId, Slot>>,
}

impl ModuleLoader {
    pub fn new(source: impl ModuleSource) -> Self {
        Self {
            source: Arc::new(source),
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// The cached capability, if its fetch already completed.
    pub fn cached(&self, module: ModuleId) -> Option<Capability> {
        match self.slots.lock().get(&module) {
            Some(Slot::Ready(cap)) => Some(cap.clone()),
            _ => None,
        }
    }

    pub fn is_loading(&self, module: ModuleId) -> bool {
        matches!(self.slots.lock().get(&module), Some(Slot::Loading(_)))
    }

    /// Waits for the module, starting its fetch if nobody has yet.
    pub async fn load(&self, module: ModuleId) -> LoadResult {
        let in_flight = {
            let mut slots = self.slots.lock();
            match slots.get(&module) {
                Some(Slot::Ready(cap)) => return Ok(cap.clone()),
                Some(Slot::Loading(fut)) => fut.clone(),
                None => {
                    tracing::debug!(%module, "fetching module");
                    let fut = self.source.fetch(module).shared();
                    slots.insert(module, Slot::Loading(fut.clone()));
                    fut
                }
            }
        };

        let result = in_flight.clone().await;

        let mut slots = self.slots.lock();
        let owns_slot = matches!(
            slots.get(&module),
            Some(Slot::Loading(current)) if current.ptr_eq(&in_flight)
        );
        if owns_slot {
            match &result {
                Ok(cap) => {
                    tracing::debug!(%module, "module loaded");
                    slots.insert(module, Slot::Ready(cap.clone()));
                }
                Err(err) => {
                    tracing::warn!(%module, error = %err, "module load failed");
                    slots.remove(&module);
                }
            }
        }
        result
    }

    /// Returns the capability immediately when cached. Otherwise starts or
    /// joins the fetch on the current tokio runtime, hands the outcome to
    /// `on_ready` once it completes, and returns `Acquire::Pending`.
    pub fn acquire<F>(self: &Arc<Self>, module: ModuleId, on_ready: F) -> Acquire
    where
        F: FnOnce(LoadResult) + Send + 'static,
    {
        if let Some(cap) = self.cached(module) {
            return Acquire::Ready(cap);
        }

        let loader = Arc::clone(self);
        tokio::spawn(async move {
            let result = loader.load(module).await;
            on_ready(result);
        });
        Acquire::Pending
    }
}

impl std::fmt::Debug for ModuleLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slots = self.slots.lock();
        let mut ready: Vec<&'static str> = slots
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Ready(_)))
            .map(|(id, _)| id.as_str())
            .collect();
        ready.sort_unstable();
        f.debug_struct("ModuleLoader").field("ready", &ready).finish()
    }
}
