//! In-process model of a service host
//!
//! Just enough of an RPC host for behaviors to walk its dispatchers and attach
//! inspectors, and for calls to run through an endpoint's pipeline. Transport,
//! framing and host lifecycle are out of scope.

use eyre::{Context, Result};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::Arc;

pub mod dispatch;

use crate::config::HostConfig;
use crate::hook::MessageInspector;

/// Extension point that can rewire a host at startup
pub trait ServiceBehavior: Send + Sync {
    fn name(&self) -> &str;

    fn add_binding_parameters(&self, host: &ServiceHost, parameters: &mut BindingParameters) -> Result<()>;

    /// Wire the behavior into the host's dispatchers. Returns how many hooks were attached.
    fn apply_dispatch_behavior(&self, host: &mut ServiceHost) -> Result<usize>;

    fn validate(&self, host: &ServiceHost) -> Result<()>;
}

/// Name-keyed settings behaviors may contribute to bindings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingParameters {
    values: IndexMap<String, String>,
}

impl BindingParameters {
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

/// Inspectors run for every call on an endpoint, in insertion order
#[derive(Default)]
pub struct DispatchRuntime {
    pub inspectors: Vec<Arc<dyn MessageInspector>>,
}

impl DispatchRuntime {
    pub fn add_inspector(&mut self, inspector: Arc<dyn MessageInspector>) {
        self.inspectors.push(inspector);
    }

    pub fn inspector_count(&self) -> usize {
        self.inspectors.len()
    }
}

/// One addressable endpoint and its pipeline
pub struct EndpointDispatcher {
    pub name: String,
    pub contract: String,
    pub runtime: DispatchRuntime,
}

impl EndpointDispatcher {
    pub fn new(name: impl Into<String>, contract: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contract: contract.into(),
            runtime: DispatchRuntime::default(),
        }
    }
}

/// A listener and the endpoints it serves
pub struct ChannelDispatcher {
    pub listen_uri: String,
    pub endpoints: Vec<EndpointDispatcher>,
}

impl ChannelDispatcher {
    pub fn new(listen_uri: impl Into<String>) -> Self {
        Self {
            listen_uri: listen_uri.into(),
            endpoints: Vec::new(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: EndpointDispatcher) -> Self {
        self.endpoints.push(endpoint);
        self
    }
}

/// A service host: dispatchers, and the binding parameters its behaviors contributed
pub struct ServiceHost {
    pub name: String,
    pub dispatchers: Vec<ChannelDispatcher>,
    pub binding_parameters: BindingParameters,
}

impl ServiceHost {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dispatchers: Vec::new(),
            binding_parameters: BindingParameters::default(),
        }
    }

    pub fn with_dispatcher(mut self, dispatcher: ChannelDispatcher) -> Self {
        self.dispatchers.push(dispatcher);
        self
    }

    /// Build the host described by the `host` config section
    ///
    /// Endpoint names must be unique across all dispatchers, since calls are
    /// routed by name.
    pub fn from_config(config: &HostConfig) -> Result<Self> {
        let mut host = ServiceHost::new(&config.name);
        let mut seen = HashSet::new();
        for dispatcher in &config.dispatchers {
            let mut channel = ChannelDispatcher::new(&dispatcher.listen_uri);
            for endpoint in &dispatcher.endpoints {
                if !seen.insert(endpoint.name.as_str()) {
                    eyre::bail!(
                        "Duplicate endpoint '{}' in host '{}' ({})",
                        endpoint.name,
                        config.name,
                        dispatcher.listen_uri
                    );
                }
                channel.endpoints.push(EndpointDispatcher::new(&endpoint.name, &endpoint.contract));
            }
            host.dispatchers.push(channel);
        }
        Ok(host)
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &EndpointDispatcher> {
        self.dispatchers.iter().flat_map(|d| d.endpoints.iter())
    }

    pub fn endpoint_count(&self) -> usize {
        self.endpoints().count()
    }

    /// First endpoint with this name, in dispatcher order
    pub fn endpoint(&self, name: &str) -> Option<&EndpointDispatcher> {
        self.endpoints().find(|e| e.name == name)
    }

    /// Run the startup sequence for each behavior: validate, binding parameters, dispatch wiring
    pub fn apply_behaviors(&mut self, behaviors: &[Box<dyn ServiceBehavior>]) -> Result<usize> {
        for behavior in behaviors {
            behavior
                .validate(self)
                .with_context(|| format!("Behavior '{}' rejected host '{}'", behavior.name(), self.name))?;
        }

        let mut parameters = std::mem::take(&mut self.binding_parameters);
        for behavior in behaviors {
            behavior
                .add_binding_parameters(self, &mut parameters)
                .with_context(|| format!("Behavior '{}' failed to add binding parameters", behavior.name()))?;
        }
        self.binding_parameters = parameters;

        let mut attached = 0;
        for behavior in behaviors {
            attached += behavior
                .apply_dispatch_behavior(self)
                .with_context(|| format!("Behavior '{}' failed to apply", behavior.name()))?;
        }

        log::info!(
            "Applied {} behaviors to host '{}' ({} hooks attached)",
            behaviors.len(),
            self.name,
            attached
        );
        Ok(attached)
    }
}
