//! Handler registry.
//!
//! Maps `module.action` keys to handlers. Keys are only ever added: the
//! first handler registered under a key is kept for the lifetime of the
//! registry and later registrations under the same key are ignored.
//!
//! Registration takes the write lock for a single critical section, so
//! discovery passes may run concurrently. Lookups take the read lock just
//! long enough to clone an `Arc<Handler>` and never hold it across a call.

use crate::config::DispatchConfig;
use crate::error::{DispatchError, Result};
use crate::handler::Handler;
use crate::identity::registry_key;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, error, info, trace, warn};

/// Pluggable discovery mechanism feeding handlers into the registry.
pub trait HandlerSource: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Build every handler this source knows about.
    fn discover(&self) -> Vec<Handler>;
}

impl<F> HandlerSource for (&'static str, F)
where
    F: Fn() -> Vec<Handler> + Send + Sync,
{
    fn name(&self) -> &str {
        self.0
    }

    fn discover(&self) -> Vec<Handler> {
        (self.1)()
    }
}

/// Result of [`HandlerRegistry::shutdown`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Handlers released without error.
    pub released: usize,
    /// Keys of handlers whose release failed or panicked.
    pub failed: Vec<String>,
}

impl ShutdownReport {
    pub fn total(&self) -> usize {
        self.released + self.failed.len()
    }
}

/// Process-wide mapping from registry key to handler.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Arc<Handler>>>,
    closed: AtomicBool,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler unless its key is already taken.
    ///
    /// Returns whether the handler was inserted.
    pub fn register(&self, handler: Handler) -> bool {
        let key = handler.key();

        if self.closed.load(Ordering::Acquire) {
            warn!("Registry is shut down, not registering handler {}", key);
            return false;
        }

        let mut handlers = self.handlers.write().unwrap_or_else(|e| e.into_inner());
        if handlers.contains_key(&key) {
            debug!("Handler {} already registered, skipping duplicate", key);
            return false;
        }

        trace!("Registered {} handler {}", handler.modality(), key);
        handlers.insert(key, Arc::new(handler));
        true
    }

    /// Register every handler from `source`.
    ///
    /// Returns how many were newly inserted.
    pub fn register_all<I>(&self, source: I) -> usize
    where
        I: IntoIterator<Item = Handler>,
    {
        source
            .into_iter()
            .map(|handler| self.register(handler))
            .filter(|inserted| *inserted)
            .count()
    }

    /// Run a discovery source and register what it finds.
    pub fn register_from(&self, source: &dyn HandlerSource) -> usize {
        let discovered = source.discover();
        let total = discovered.len();
        let inserted = self.register_all(discovered);
        info!(
            "Loaded {} of {} handlers from {}",
            inserted,
            total,
            source.name()
        );
        inserted
    }

    /// Find the handler for `action` in `module`.
    ///
    /// A missing module means the default module.
    pub fn resolve(&self, action: Option<&str>, module: Option<&str>) -> Result<Arc<Handler>> {
        let action = action.ok_or(DispatchError::ActionNotDefined)?;
        let module = module.unwrap_or(DispatchConfig::DEFAULT_MODULE);

        if self.closed.load(Ordering::Acquire) {
            return Err(DispatchError::RegistryClosed);
        }

        let key = registry_key(module, action);
        let handlers = self.handlers.read().unwrap_or_else(|e| e.into_inner());
        handlers
            .get(&key)
            .cloned()
            .ok_or(DispatchError::HandlerNotLoaded { key })
    }

    pub fn contains(&self, key: &str) -> bool {
        let handlers = self.handlers.read().unwrap_or_else(|e| e.into_inner());
        handlers.contains_key(key)
    }

    pub fn len(&self) -> usize {
        let handlers = self.handlers.read().unwrap_or_else(|e| e.into_inner());
        handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let handlers = self.handlers.read().unwrap_or_else(|e| e.into_inner());
        let mut keys: Vec<String> = handlers.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Release every registered handler exactly once.
    ///
    /// A failing or panicking release does not stop the others. After
    /// shutdown the registry resolves nothing and accepts nothing; calling
    /// shutdown again does nothing.
    pub fn shutdown(&self) -> ShutdownReport {
        if self.closed.swap(true, Ordering::AcqRel) {
            debug!("Registry already shut down");
            return ShutdownReport::default();
        }

        let handlers: Vec<(String, Arc<Handler>)> = {
            let handlers = self.handlers.read().unwrap_or_else(|e| e.into_inner());
            handlers
                .iter()
                .map(|(k, h)| (k.clone(), Arc::clone(h)))
                .collect()
        };

        let mut report = ShutdownReport::default();
        for (key, handler) in handlers {
            match catch_unwind(AssertUnwindSafe(|| handler.release())) {
                Ok(Ok(())) => {
                    trace!("Released handler {}", key);
                    report.released += 1;
                }
                Ok(Err(e)) => {
                    error!("Failed to release handler {}: {}", key, e);
                    report.failed.push(key);
                }
                Err(_) => {
                    error!("Handler {} panicked while releasing", key);
                    report.failed.push(key);
                }
            }
        }

        report.failed.sort();
        info!(
            "Released {} handlers ({} failed)",
            report.released,
            report.failed.len()
        );
        report
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("keys", &self.keys())
            .field("closed", &self.is_closed())
            .finish()
    }
}
