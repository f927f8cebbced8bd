//! # Medley Discovery - pluggable playlist discovery providers
//!
//! Lifecycle management for named, dynamically-selected discovery providers
//! attached to the media library's playlist.
//!
//! A *discovery provider* is a pluggable unit that feeds the playlist with
//! items it finds somewhere (a folder, a network directory, a station list).
//! This crate owns the registry those providers live in:
//!
//! - [`DiscoveryRegistry::add`] resolves a provider by name and registers it.
//!   Background providers get a dedicated worker thread for their discovery
//!   loop; synchronous providers are active just by being registered.
//! - [`DiscoveryRegistry::remove`] unregisters a provider, cancels its worker
//!   cooperatively and blocks until the worker has returned.
//! - [`DiscoveryRegistry::add_all`] bulk-loads a `:`-separated provider list,
//!   best-effort.
//!
//! Cancellation is strictly cooperative: a background provider's run loop
//! must poll the [`CancellationToken`] it is given and return promptly once
//! it is cancelled. The registry never interrupts a worker preemptively.
//!
//! ```rust,ignore
//! let resolver = Arc::new(FactoryResolver::discover(sink));
//! let registry = DiscoveryRegistry::new(resolver);
//!
//! registry.add_all("folder_scan:static_channels");
//! assert!(registry.is_loaded("folder_scan"));
//! registry.remove("folder_scan")?;
//! ```

pub mod error;
pub mod item;
pub mod loader;
pub mod provider;
pub mod registry;
pub mod resolver;
mod worker;

pub use error::DiscoveryError;
pub use item::{DiscoveredItem, ItemSink};
pub use loader::BulkLoadReport;
pub use provider::{BackgroundDiscovery, DiscoveryProvider, ResolvedProvider};
pub use registry::DiscoveryRegistry;
pub use resolver::{FactoryResolver, ProviderCtx, ProviderRegistration, ProviderResolver};

// Re-exported for provider crates: `inventory` backs `ProviderRegistration`
// submission, the token is the cancellation contract of `BackgroundDiscovery`.
pub use inventory;
pub use tokio_util::sync::CancellationToken;
