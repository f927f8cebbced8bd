use tracing::{info, warn};

use crate::error::DiscoveryError;
use crate::registry::DiscoveryRegistry;

/// Outcome of a best-effort bulk load.
///
/// The bulk load itself always completes; per-name failures are collected
/// here (and logged) instead of aborting the remaining names.
#[derive(Debug, Default)]
pub struct BulkLoadReport {
    pub added: Vec<String>,
    pub failures: Vec<(String, DiscoveryError)>,
}

impl BulkLoadReport {
    pub fn all_added(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Split a `:`-separated provider list into names.
///
/// Spaces around names and empty segments from repeated separators are
/// skipped. There is no escaping for names containing `:`.
fn parse_provider_list(list: &str) -> impl Iterator<Item = &str> + '_ {
    list.split(':').map(str::trim).filter(|name| !name.is_empty())
}

impl DiscoveryRegistry {
    /// Register every provider named in `list` (e.g. `"sap:shout:upnp"`),
    /// best-effort: a name that fails to resolve or start is reported and the
    /// rest still load. Empty or separator-only input is a no-op.
    pub fn add_all(&self, list: &str) -> BulkLoadReport {
        let mut report = BulkLoadReport::default();
        for name in parse_provider_list(list) {
            match self.add(name) {
                Ok(()) => report.added.push(name.to_string()),
                Err(e) => {
                    warn!(provider = name, error = %e, "skipping discovery provider");
                    report.failures.push((name.to_string(), e));
                }
            }
        }
        if !report.added.is_empty() {
            info!(count = report.added.len(), "discovery providers loaded");
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{DiscoveryProvider, ResolvedProvider};
    use crate::resolver::ProviderResolver;
    use anyhow::anyhow;
    use std::sync::Arc;

    struct InertProvider;

    impl DiscoveryProvider for InertProvider {
        fn description(&self) -> &str {
            "inert"
        }
    }

    /// Fails resolution for names starting with "bad".
    struct FussyResolver;

    impl ProviderResolver for FussyResolver {
        fn resolve(&self, name: &str) -> Result<ResolvedProvider, DiscoveryError> {
            if name.starts_with("bad") {
                return Err(DiscoveryError::Resolution {
                    name: name.to_string(),
                    source: anyhow!("no factory registered"),
                });
            }
            Ok(ResolvedProvider::Synchronous(Arc::new(InertProvider)))
        }
    }

    fn registry() -> DiscoveryRegistry {
        DiscoveryRegistry::new(Arc::new(FussyResolver))
    }

    #[test]
    fn parses_a_simple_list() {
        let names: Vec<_> = parse_provider_list("a:b:c").collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn skips_spaces_and_empty_segments() {
        let names: Vec<_> = parse_provider_list(" a : b::c ").collect();
        assert_eq!(names, vec!["a", "b", "c"]);

        let names: Vec<_> = parse_provider_list("  a  ").collect();
        assert_eq!(names, vec!["a"]);
    }

    #[test]
    fn empty_and_separator_only_inputs_yield_nothing() {
        assert_eq!(parse_provider_list("").count(), 0);
        assert_eq!(parse_provider_list(":::").count(), 0);
        assert_eq!(parse_provider_list("  :  : ").count(), 0);
    }

    #[test]
    fn add_all_is_best_effort() {
        let registry = registry();

        let report = registry.add_all("a:bad:c");

        assert_eq!(report.added, vec!["a", "c"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, "bad");
        assert!(!report.all_added());

        assert!(registry.is_loaded("a"));
        assert!(registry.is_loaded("c"));
        assert!(!registry.is_loaded("bad"));
    }

    #[test]
    fn add_all_tolerates_decorated_lists() {
        let registry = registry();
        let report = registry.add_all(" a : b ");
        assert_eq!(report.added, vec!["a", "b"]);
        assert_eq!(registry.loaded_names(), vec!["a", "b"]);
    }

    #[test]
    fn add_all_with_empty_input_is_a_noop() {
        let registry = registry();
        let report = registry.add_all(":::");
        assert!(report.all_added());
        assert!(report.added.is_empty());
        assert!(registry.loaded_names().is_empty());
    }
}
