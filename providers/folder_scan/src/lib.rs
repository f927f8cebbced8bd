//! Folder-scan discovery provider.
//!
//! Periodically rescans a configured directory tree for media files and
//! announces anything it has not seen before. Runs as a background provider:
//! the scan loop lives on a registry-owned worker thread and exits once its
//! cancellation token fires.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, warn};

use medley_discovery::{
    BackgroundDiscovery, CancellationToken, DiscoveredItem, DiscoveryProvider, ItemSink,
    ProviderCtx, ProviderRegistration, ResolvedProvider,
};

pub const PROVIDER_NAME: &str = "folder_scan";

/// How often the token is polled while waiting out the rescan interval.
const CANCEL_POLL: Duration = Duration::from_millis(100);

fn default_rescan_secs() -> u64 {
    30
}

fn default_extensions() -> Vec<String> {
    ["mp3", "flac", "ogg", "wav", "m4a", "opus"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FolderScanConfig {
    /// Directory to watch for media files.
    pub path: PathBuf,
    #[serde(default = "default_rescan_secs")]
    pub rescan_secs: u64,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

pub struct FolderScanProvider {
    config: FolderScanConfig,
    sink: Arc<dyn ItemSink>,
    source: String,
}

impl FolderScanProvider {
    pub fn build(ctx: &ProviderCtx) -> anyhow::Result<ResolvedProvider> {
        let config: FolderScanConfig = ctx.config()?;
        Ok(ResolvedProvider::Background(Arc::new(Self {
            source: ctx.name().to_string(),
            sink: ctx.sink(),
            config,
        })))
    }

    fn matches_extension(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.config
            .extensions
            .iter()
            .any(|want| want.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }

    /// One pass over the tree; announces files not in `seen` yet.
    fn scan(&self, seen: &mut HashSet<PathBuf>) {
        let mut pending = vec![self.config.path.clone()];
        while let Some(dir) = pending.pop() {
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "cannot read directory");
                    continue;
                }
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    pending.push(path);
                    continue;
                }
                if !self.matches_extension(&path) {
                    continue;
                }
                if !seen.insert(path.clone()) {
                    continue;
                }
                debug!(file = %path.display(), "announcing discovered file");
                let title = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .map(str::to_string);
                self.sink.announce(DiscoveredItem {
                    uri: path.to_string_lossy().into_owned(),
                    title,
                    source: self.source.clone(),
                });
            }
        }
    }
}

impl DiscoveryProvider for FolderScanProvider {
    fn description(&self) -> &str {
        "local folder scan"
    }
}

impl BackgroundDiscovery for FolderScanProvider {
    fn run(&self, cancel: CancellationToken) -> anyhow::Result<()> {
        let mut seen = HashSet::new();
        while !cancel.is_cancelled() {
            self.scan(&mut seen);
            wait_interval(&cancel, Duration::from_secs(self.config.rescan_secs));
        }
        Ok(())
    }
}

/// Sleep out `interval` in short slices so cancellation is observed promptly.
fn wait_interval(cancel: &CancellationToken, interval: Duration) {
    let deadline = Instant::now() + interval;
    while !cancel.is_cancelled() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        thread::sleep(remaining.min(CANCEL_POLL));
    }
}

inventory::submit! {
    ProviderRegistration {
        name: PROVIDER_NAME,
        build: FolderScanProvider::build,
    }
}
