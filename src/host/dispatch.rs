//! Call dispatching through an endpoint's inspector pipeline

use eyre::{Context, Result};

use super::{EndpointDispatcher, ServiceHost};
use crate::hook::CorrelationToken;
use crate::message::Message;

/// The operation behind an endpoint: returns the reply, or `None` for one-way calls
pub type Operation<'a> = dyn FnOnce(&dyn Message) -> Result<Option<Box<dyn Message>>> + 'a;

impl EndpointDispatcher {
    /// Run one call: inspect the request, invoke the operation, inspect the reply
    ///
    /// The reply callbacks only run for two-way calls. A one-way request never
    /// produces a reply, whatever the operation returns.
    pub fn dispatch<F>(&self, request: &dyn Message, operation: F) -> Result<Option<Box<dyn Message>>>
    where
        F: FnOnce(&dyn Message) -> Result<Option<Box<dyn Message>>>,
    {
        let mut tokens: Vec<CorrelationToken> = Vec::with_capacity(self.runtime.inspectors.len());
        for inspector in &self.runtime.inspectors {
            let token = inspector
                .after_receive_request(request)
                .with_context(|| format!("Inspector '{}' failed on request to {}", inspector.name(), self.name))?;
            tokens.push(token);
        }

        let reply = operation(request).with_context(|| format!("Operation on {} failed", self.name))?;

        if request.is_one_way() {
            if reply.is_some() {
                log::debug!("Discarding reply to one-way call on {}", self.name);
            }
            return Ok(None);
        }

        if let Some(reply) = &reply {
            for (inspector, token) in self.runtime.inspectors.iter().zip(tokens) {
                inspector
                    .before_send_reply(reply.as_ref(), token)
                    .with_context(|| format!("Inspector '{}' failed on reply from {}", inspector.name(), self.name))?;
            }
        }

        Ok(reply)
    }
}

impl ServiceHost {
    /// Dispatch a call to the named endpoint
    pub fn dispatch(
        &self,
        endpoint: &str,
        request: &dyn Message,
        operation: Box<Operation<'_>>,
    ) -> Result<Option<Box<dyn Message>>> {
        let Some(target) = self.endpoint(endpoint) else {
            eyre::bail!("Unknown endpoint '{}' on host '{}'", endpoint, self.name);
        };
        target.dispatch(request, operation)
    }
}
