use std::sync::Arc;
use std::thread;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, warn};

use crate::provider::BackgroundDiscovery;

/// Runs a background provider's discovery loop on a dedicated named thread.
///
/// The wrapper adds nothing beyond a tracing span and exit logging: no
/// retries, no supervision, no timeout. A provider that ignores its token
/// keeps the thread alive and blocks whichever removal waits on it.
pub(crate) fn spawn(
    name: &str,
    provider: Arc<dyn BackgroundDiscovery>,
    cancel: CancellationToken,
) -> std::io::Result<thread::JoinHandle<()>> {
    let provider_name = name.to_string();
    thread::Builder::new()
        .name(format!("discovery-{name}"))
        .spawn(move || {
            let span = info_span!("discovery_worker", provider = %provider_name);
            let _guard = span.enter();
            debug!("worker started");
            if let Err(e) = provider.run(cancel) {
                warn!(error = %e, "discovery loop exited with error");
            }
            debug!("worker finished");
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::DiscoveryProvider;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    struct FlagProvider {
        entered: Arc<AtomicBool>,
    }

    impl DiscoveryProvider for FlagProvider {
        fn description(&self) -> &str {
            "flag"
        }
    }

    impl BackgroundDiscovery for FlagProvider {
        fn run(&self, cancel: CancellationToken) -> anyhow::Result<()> {
            self.entered.store(true, Ordering::SeqCst);
            while !cancel.is_cancelled() {
                thread::sleep(Duration::from_millis(2));
            }
            Ok(())
        }
    }

    #[test]
    fn worker_runs_the_entry_and_returns_on_cancel() {
        let entered = Arc::new(AtomicBool::new(false));
        let cancel = CancellationToken::new();
        let handle = spawn(
            "flag",
            Arc::new(FlagProvider {
                entered: Arc::clone(&entered),
            }),
            cancel.clone(),
        )
        .unwrap();

        cancel.cancel();
        handle.join().unwrap();
        assert!(entered.load(Ordering::SeqCst));
    }

    struct FailingProvider;

    impl DiscoveryProvider for FailingProvider {
        fn description(&self) -> &str {
            "failing"
        }
    }

    impl BackgroundDiscovery for FailingProvider {
        fn run(&self, _cancel: CancellationToken) -> anyhow::Result<()> {
            anyhow::bail!("broken antenna")
        }
    }

    #[test]
    fn worker_swallows_a_run_error() {
        let handle = spawn("failing", Arc::new(FailingProvider), CancellationToken::new()).unwrap();
        // The error is logged, not propagated; the thread still exits cleanly.
        handle.join().unwrap();
    }
}
