//! Static channel-list discovery provider.
//!
//! Announces a configured set of stream URLs once, while being resolved; the
//! provider is then active without a worker thread (a synchronous provider).

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use medley_discovery::{
    DiscoveredItem, DiscoveryProvider, ProviderCtx, ProviderRegistration, ResolvedProvider,
};

pub const PROVIDER_NAME: &str = "static_channels";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelEntry {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticChannelsConfig {
    #[serde(default)]
    pub channels: Vec<ChannelEntry>,
}

pub struct StaticChannelsProvider {
    description: String,
}

impl StaticChannelsProvider {
    pub fn build(ctx: &ProviderCtx) -> anyhow::Result<ResolvedProvider> {
        let config: StaticChannelsConfig = ctx.config()?;
        let sink = ctx.sink();
        for channel in &config.channels {
            debug!(channel = %channel.name, "announcing static channel");
            sink.announce(DiscoveredItem {
                uri: channel.url.clone(),
                title: Some(channel.name.clone()),
                source: ctx.name().to_string(),
            });
        }
        Ok(ResolvedProvider::Synchronous(Arc::new(Self {
            description: format!("static channel list ({} channels)", config.channels.len()),
        })))
    }
}

impl DiscoveryProvider for StaticChannelsProvider {
    fn description(&self) -> &str {
        &self.description
    }
}

inventory::submit! {
    ProviderRegistration {
        name: PROVIDER_NAME,
        build: StaticChannelsProvider::build,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medley_discovery::ItemSink;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        items: Mutex<Vec<DiscoveredItem>>,
    }

    impl ItemSink for RecordingSink {
        fn announce(&self, item: DiscoveredItem) {
            self.items.lock().unwrap().push(item);
        }
    }

    #[test]
    fn announces_configured_channels_during_resolution() {
        let sink = Arc::new(RecordingSink::default());
        let ctx = ProviderCtx::new(
            PROVIDER_NAME,
            json!({
                "channels": [
                    { "name": "Jazz 24/7", "url": "http://radio.example/jazz" },
                    { "name": "News", "url": "http://radio.example/news" },
                ]
            }),
            sink.clone(),
        );

        let resolved = StaticChannelsProvider::build(&ctx).unwrap();

        assert!(!resolved.is_background());
        assert_eq!(resolved.description(), "static channel list (2 channels)");

        let items = sink.items.lock().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].uri, "http://radio.example/jazz");
        assert_eq!(items[0].title.as_deref(), Some("Jazz 24/7"));
        assert!(items.iter().all(|i| i.source == PROVIDER_NAME));
    }

    #[test]
    fn missing_config_section_means_no_channels() {
        let sink = Arc::new(RecordingSink::default());
        let ctx = ProviderCtx::new(PROVIDER_NAME, serde_json::Value::Null, sink.clone());

        let resolved = StaticChannelsProvider::build(&ctx).unwrap();

        assert!(!resolved.is_background());
        assert!(sink.items.lock().unwrap().is_empty());
    }

    #[test]
    fn unknown_config_fields_are_rejected() {
        let sink = Arc::new(RecordingSink::default());
        let ctx = ProviderCtx::new(PROVIDER_NAME, json!({ "channel": [] }), sink);
        assert!(StaticChannelsProvider::build(&ctx).is_err());
    }
}
