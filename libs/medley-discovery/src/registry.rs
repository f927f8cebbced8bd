use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::DiscoveryError;
use crate::provider::ResolvedProvider;
use crate::resolver::ProviderResolver;
use crate::worker;

/// One active provider tracked by the registry.
struct ProviderEntry {
    /// Registry-local id; names may repeat, ids never do.
    id: u64,
    name: String,
    provider: ResolvedProvider,
    cancel: CancellationToken,
    worker: Option<thread::JoinHandle<()>>,
}

/// The mutex-guarded, insertion-ordered collection of active discovery
/// providers.
///
/// One lock guards every read and write of the sequence, and it is never held
/// across worker-thread creation or a join: removal takes its entry out under
/// the lock, then cancels and joins with the lock released, so a worker whose
/// run loop itself needs the registry cannot deadlock against its own
/// teardown.
///
/// Names are not forced to be unique. Registering a name twice keeps both
/// entries; `remove` and `is_loaded` treat the first match as authoritative.
///
/// Dropping the registry does not stop running workers; call [`shutdown`]
/// first.
///
/// [`shutdown`]: DiscoveryRegistry::shutdown
pub struct DiscoveryRegistry {
    resolver: Arc<dyn ProviderResolver>,
    entries: Mutex<Vec<ProviderEntry>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for DiscoveryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = self.loaded_names();
        f.debug_struct("DiscoveryRegistry")
            .field("providers", &names)
            .finish()
    }
}

impl DiscoveryRegistry {
    pub fn new(resolver: Arc<dyn ProviderResolver>) -> Self {
        Self {
            resolver,
            entries: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Resolve `name` and register the resulting provider.
    ///
    /// Synchronous providers are active as soon as they are registered.
    /// Background providers additionally get a dedicated worker thread; if
    /// that thread cannot be created the registration is rolled back and the
    /// provider released, so a failed `add` leaves no trace.
    pub fn add(&self, name: &str) -> Result<(), DiscoveryError> {
        let resolved = self.resolver.resolve(name)?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let background = match &resolved {
            ResolvedProvider::Background(p) => Some(Arc::clone(p)),
            ResolvedProvider::Synchronous(_) => None,
        };

        {
            let mut entries = self.entries.lock();
            if entries.iter().any(|e| e.name == name) {
                debug!(provider = name, "a provider with this name is already loaded");
            }
            entries.push(ProviderEntry {
                id,
                name: name.to_string(),
                provider: resolved,
                cancel: cancel.clone(),
                worker: None,
            });
        }

        let Some(provider) = background else {
            debug!(provider = name, "synchronous provider registered");
            return Ok(());
        };

        match worker::spawn(name, provider, cancel.clone()) {
            Ok(handle) => {
                let unclaimed = {
                    let mut entries = self.entries.lock();
                    match entries.iter_mut().find(|e| e.id == id) {
                        Some(entry) => {
                            entry.worker = Some(handle);
                            None
                        }
                        None => Some(handle),
                    }
                };
                // A concurrent remove can take the entry before the handle is
                // stored; the remover cancelled the token but had nothing to
                // join, so the join happens here instead.
                if let Some(handle) = unclaimed {
                    cancel.cancel();
                    join_worker(name, handle);
                } else {
                    debug!(provider = name, "background provider registered");
                }
                Ok(())
            }
            Err(source) => {
                let entry = {
                    let mut entries = self.entries.lock();
                    entries
                        .iter()
                        .position(|e| e.id == id)
                        .map(|i| entries.remove(i))
                };
                if let Some(entry) = entry {
                    self.resolver.release(&entry.name, entry.provider);
                }
                Err(DiscoveryError::WorkerStart {
                    name: name.to_string(),
                    source,
                })
            }
        }
    }

    /// Unregister the first provider named `name`, stop its worker and hand
    /// the provider back to the resolver.
    ///
    /// Cancellation is cooperative: this call blocks, without a timeout,
    /// until the provider's run loop observes its token and returns.
    pub fn remove(&self, name: &str) -> Result<(), DiscoveryError> {
        let entry = {
            let mut entries = self.entries.lock();
            match entries.iter().position(|e| e.name == name) {
                Some(i) => entries.remove(i),
                None => {
                    return Err(DiscoveryError::NotLoaded {
                        name: name.to_string(),
                    });
                }
            }
        };
        self.teardown(entry);
        debug!(provider = name, "provider removed");
        Ok(())
    }

    /// Whether a provider named `name` is currently registered.
    pub fn is_loaded(&self, name: &str) -> bool {
        self.entries.lock().iter().any(|e| e.name == name)
    }

    /// Names of all registered providers, in insertion order.
    pub fn loaded_names(&self) -> Vec<String> {
        self.entries.lock().iter().map(|e| e.name.clone()).collect()
    }

    /// Unregister every provider, newest first, stopping workers as it goes.
    pub fn shutdown(&self) {
        let mut drained = {
            let mut entries = self.entries.lock();
            std::mem::take(&mut *entries)
        };
        while let Some(entry) = drained.pop() {
            debug!(provider = %entry.name, "shutting down provider");
            self.teardown(entry);
        }
    }

    /// Cancel, join and release one entry. Must run with the registry lock
    /// released: the worker's run loop may need it to finish.
    fn teardown(&self, mut entry: ProviderEntry) {
        entry.cancel.cancel();
        if let Some(handle) = entry.worker.take() {
            join_worker(&entry.name, handle);
        }
        self.resolver.release(&entry.name, entry.provider);
    }
}

fn join_worker(name: &str, handle: thread::JoinHandle<()>) {
    if handle.join().is_err() {
        warn!(provider = name, "discovery worker panicked");
    }
}
