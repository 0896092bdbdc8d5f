//! The message tap inspector

use eyre::{Result, WrapErr};
use std::sync::Arc;

use super::{CorrelationToken, MessageInspector};
use crate::broadcast::{Broadcaster, FailurePolicy};
use crate::event::{Direction, LogEvent};
use crate::message::Message;

/// Publishes every request and reply it sees as a `LogEvent`
///
/// Messages are only read, never modified. Failures follow the broadcaster's
/// `FailurePolicy`: with `Isolate` a message that cannot be rendered is logged
/// and the call carries on, with `Propagate` the error reaches the host.
pub struct MessageTap {
    broadcaster: Arc<Broadcaster>,
    endpoint: Option<String>,
}

impl MessageTap {
    pub fn new(broadcaster: Arc<Broadcaster>) -> Self {
        Self {
            broadcaster,
            endpoint: None,
        }
    }

    pub fn for_endpoint(broadcaster: Arc<Broadcaster>, endpoint: impl Into<String>) -> Self {
        Self {
            broadcaster,
            endpoint: Some(endpoint.into()),
        }
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub fn policy(&self) -> FailurePolicy {
        self.broadcaster.policy()
    }

    fn publish(&self, message: &dyn Message, direction: Direction) -> Result<()> {
        let text = match message.render() {
            Ok(text) => text,
            Err(e) => {
                let e = e.wrap_err(format!("Failed to render {} message", direction));
                return self.handle_failure(e);
            }
        };

        let mut event = LogEvent::new(text, direction);
        if let Some(endpoint) = &self.endpoint {
            event = event.with_endpoint(endpoint.clone());
        }

        log::debug!(
            "Tapped {} message on {} ({} bytes)",
            direction,
            self.endpoint.as_deref().unwrap_or("<detached>"),
            event.message().len()
        );

        match self
            .broadcaster
            .notify(&event)
            .wrap_err_with(|| format!("Failed to deliver {} message", direction))
        {
            Ok(()) => Ok(()),
            Err(e) => self.handle_failure(e),
        }
    }

    fn handle_failure(&self, e: eyre::Report) -> Result<()> {
        match self.policy() {
            FailurePolicy::Propagate => Err(e),
            FailurePolicy::Isolate => {
                log::warn!("Message tap on {}: {:#}", self.endpoint.as_deref().unwrap_or("<detached>"), e);
                Ok(())
            }
        }
    }
}

impl MessageInspector for MessageTap {
    fn after_receive_request(&self, request: &dyn Message) -> Result<CorrelationToken> {
        self.publish(request, Direction::Inbound)?;
        Ok(CorrelationToken::none())
    }

    fn before_send_reply(&self, reply: &dyn Message, _token: CorrelationToken) -> Result<()> {
        self.publish(reply, Direction::Outbound)
    }

    fn name(&self) -> &str {
        "message-tap"
    }
}
