use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// Base contract every discovery provider implements.
pub trait DiscoveryProvider: Send + Sync {
    /// Short human-readable description, used in logs.
    fn description(&self) -> &str;
}

/// A provider with a long-running discovery loop.
///
/// `run` executes on a dedicated worker thread owned by the registry. The
/// loop must poll `cancel` at reasonable intervals and return promptly once
/// the token is cancelled: removal blocks on that return and applies no
/// timeout, so a provider that never checks its token hangs the removal.
pub trait BackgroundDiscovery: DiscoveryProvider {
    fn run(&self, cancel: CancellationToken) -> anyhow::Result<()>;
}

/// What kind of provider a name resolved to.
#[derive(Clone)]
pub enum ResolvedProvider {
    /// Active purely by being resolved and registered; no worker.
    Synchronous(Arc<dyn DiscoveryProvider>),
    /// Runs a discovery loop on a dedicated worker thread until cancelled.
    Background(Arc<dyn BackgroundDiscovery>),
}

impl std::fmt::Debug for ResolvedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolvedProvider::Synchronous(p) => f
                .debug_tuple("Synchronous")
                .field(&p.description())
                .finish(),
            ResolvedProvider::Background(p) => {
                f.debug_tuple("Background").field(&p.description()).finish()
            }
        }
    }
}

impl ResolvedProvider {
    pub fn description(&self) -> &str {
        match self {
            ResolvedProvider::Synchronous(p) => p.description(),
            ResolvedProvider::Background(p) => p.description(),
        }
    }

    pub fn is_background(&self) -> bool {
        matches!(self, ResolvedProvider::Background(_))
    }
}
