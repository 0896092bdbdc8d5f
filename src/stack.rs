//! Startup wiring: broadcaster, sinks, extensions and host from one config

use eyre::{Context, Result};
use std::sync::Arc;

use crate::broadcast::{Broadcaster, SubscriptionId};
use crate::config::Config;
use crate::extension::ExtensionRegistry;
use crate::host::ServiceHost;
use crate::sink::sinks_from_config;

/// Everything a tapped host needs, built in startup order
pub struct TapStack {
    pub broadcaster: Arc<Broadcaster>,
    pub registry: ExtensionRegistry,
    pub host: ServiceHost,
    pub subscriptions: Vec<SubscriptionId>,
    /// Hooks attached by the configured behaviors
    pub attached: usize,
}

impl TapStack {
    pub fn from_config(config: &Config) -> Result<Self> {
        let broadcaster = Arc::new(
            Broadcaster::with_delivery(config.tap.delivery(), config.tap.failure_policy)
                .context("Failed to create broadcaster")?,
        );

        let subscriptions = sinks_from_config(&config.sinks)
            .into_iter()
            .map(|sink| broadcaster.subscribe_arc(sink))
            .collect();

        let registry = ExtensionRegistry::with_defaults(Arc::clone(&broadcaster));

        let behaviors = registry
            .create_all(config.host.behaviors.as_slice())
            .context("Failed to create configured behaviors")?;

        let mut host = ServiceHost::from_config(&config.host).context("Failed to build host")?;
        let attached = host.apply_behaviors(&behaviors)?;

        Ok(Self {
            broadcaster,
            registry,
            host,
            subscriptions,
            attached,
        })
    }
}
