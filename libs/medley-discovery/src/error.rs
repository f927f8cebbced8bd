use thiserror::Error;

/// Structured errors for the discovery registry.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// No provider implementation matched the requested name, or the matching
    /// factory failed to construct one. Nothing was registered.
    #[error("cannot resolve discovery provider '{name}'")]
    Resolution {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    /// The worker thread for a background provider could not be created. The
    /// registration was rolled back and the provider released.
    #[error("cannot start discovery worker for '{name}'")]
    WorkerStart {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// The named provider is not present in the registry.
    #[error("discovery provider '{name}' is not loaded")]
    NotLoaded { name: String },
}
