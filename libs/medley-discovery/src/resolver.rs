use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use serde::de::DeserializeOwned;

use crate::error::DiscoveryError;
use crate::item::ItemSink;
use crate::provider::ResolvedProvider;

/// Construction function for one provider kind.
pub type BuildFn = fn(&ProviderCtx) -> anyhow::Result<ResolvedProvider>;

/// Context handed to a provider factory during resolution: the name the
/// provider is being registered under, its configuration section and the item
/// sink announcements go to.
pub struct ProviderCtx {
    name: String,
    config: serde_json::Value,
    sink: Arc<dyn ItemSink>,
}

impl ProviderCtx {
    pub fn new(
        name: impl Into<String>,
        config: serde_json::Value,
        sink: Arc<dyn ItemSink>,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            sink,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Deserialize this provider's configuration section. A missing section
    /// behaves like an empty map, so configs whose fields all have serde
    /// defaults need no entry in the configuration file.
    pub fn config<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        let value = match &self.config {
            serde_json::Value::Null => serde_json::Value::Object(serde_json::Map::new()),
            other => other.clone(),
        };
        serde_json::from_value(value)
            .with_context(|| format!("invalid config for provider '{}'", self.name))
    }

    pub fn raw_config(&self) -> &serde_json::Value {
        &self.config
    }

    pub fn sink(&self) -> Arc<dyn ItemSink> {
        Arc::clone(&self.sink)
    }
}

/// A provider factory submitted at link time.
///
/// Provider crates register themselves with `inventory::submit!`; everything
/// submitted is collected by [`FactoryResolver::discover`].
pub struct ProviderRegistration {
    pub name: &'static str,
    pub build: BuildFn,
}

inventory::collect!(ProviderRegistration);

/// Resolves provider names into runnable providers.
///
/// `resolve` may be called concurrently from any number of threads. A
/// successfully resolved provider is owned by the registry until handed back
/// through `release`, which the registry calls exactly once per resolution.
pub trait ProviderResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Result<ResolvedProvider, DiscoveryError>;

    /// Take back a provider previously produced by `resolve`. The default
    /// implementation simply drops it.
    fn release(&self, name: &str, provider: ResolvedProvider) {
        let _ = (name, provider);
    }
}

/// Factory-table resolver: provider name → construction function, plus the
/// per-provider configuration bag and the shared item sink.
pub struct FactoryResolver {
    factories: HashMap<&'static str, BuildFn>,
    configs: HashMap<String, serde_json::Value>,
    sink: Arc<dyn ItemSink>,
}

impl FactoryResolver {
    pub fn new(sink: Arc<dyn ItemSink>) -> Self {
        Self {
            factories: HashMap::new(),
            configs: HashMap::new(),
            sink,
        }
    }

    /// Resolver over every factory submitted via `inventory`.
    pub fn discover(sink: Arc<dyn ItemSink>) -> Self {
        let mut resolver = Self::new(sink);
        for registration in inventory::iter::<ProviderRegistration> {
            resolver.register(registration.name, registration.build);
        }
        resolver
    }

    /// Register a factory explicitly; the last registration for a name wins.
    pub fn register(&mut self, name: &'static str, build: BuildFn) -> &mut Self {
        if self.factories.insert(name, build).is_some() {
            tracing::debug!(provider = name, "provider factory re-registered");
        }
        self
    }

    /// Attach per-provider configuration sections (provider name → value).
    pub fn with_configs(mut self, configs: HashMap<String, serde_json::Value>) -> Self {
        self.configs = configs;
        self
    }

    /// Names of all registered factories, sorted.
    pub fn factory_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl ProviderResolver for FactoryResolver {
    fn resolve(&self, name: &str) -> Result<ResolvedProvider, DiscoveryError> {
        let build = self
            .factories
            .get(name)
            .ok_or_else(|| DiscoveryError::Resolution {
                name: name.to_string(),
                source: anyhow::anyhow!("no provider factory registered under this name"),
            })?;
        let config = self
            .configs
            .get(name)
            .cloned()
            .unwrap_or(serde_json::Value::Null);
        let ctx = ProviderCtx::new(name, config, Arc::clone(&self.sink));
        build(&ctx).map_err(|source| DiscoveryError::Resolution {
            name: name.to_string(),
            source,
        })
    }
}
