//! Message inspection hooks
//!
//! The host calls an inspector after it receives a request and before it sends
//! the reply. `MessageTap` is the inspector that republishes both messages.

use std::any::Any;
use std::fmt;

use crate::message::Message;

pub mod tap;

pub use tap::MessageTap;

/// Opaque value handed from the request callback to the matching reply callback
#[derive(Default)]
pub struct CorrelationToken(Option<Box<dyn Any + Send>>);

impl CorrelationToken {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn new<T: Any + Send>(value: T) -> Self {
        Self(Some(Box::new(value)))
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_ref().and_then(|value| value.downcast_ref::<T>())
    }

    pub fn downcast<T: Any>(self) -> Option<T> {
        self.0.and_then(|value| value.downcast::<T>().ok()).map(|value| *value)
    }
}

impl fmt::Debug for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => f.write_str("CorrelationToken(..)"),
            None => f.write_str("CorrelationToken(none)"),
        }
    }
}

/// Hook the host calls around each dispatched operation
///
/// `before_send_reply` is never called for one-way calls.
pub trait MessageInspector: Send + Sync {
    fn after_receive_request(&self, request: &dyn Message) -> eyre::Result<CorrelationToken>;

    fn before_send_reply(&self, reply: &dyn Message, token: CorrelationToken) -> eyre::Result<()>;

    /// Label used in host logs
    fn name(&self) -> &str {
        "inspector"
    }
}
