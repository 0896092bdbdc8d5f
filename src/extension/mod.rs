//! Behavior extensions
//!
//! A host configuration names behaviors; an extension turns a name into a
//! fresh behavior instance. The `ExtensionRegistry` maps names to extensions.

use std::any::type_name;
use std::sync::Arc;

pub mod registry;

pub use registry::ExtensionRegistry;

use crate::behavior::MessageLoggingBehavior;
use crate::broadcast::Broadcaster;
use crate::host::ServiceBehavior;

/// Name under which the message tap behavior is registered
pub const MESSAGE_LOGGER: &str = "messageLogger";

/// Factory for a named service behavior
pub trait BehaviorExtension: Send + Sync {
    /// Name used in configuration
    fn name(&self) -> &str;

    /// Type of behavior this extension produces
    fn behavior_type(&self) -> &'static str;

    /// Build a new behavior instance
    fn create_behavior(&self) -> Box<dyn ServiceBehavior>;
}

/// Produces `MessageLoggingBehavior`. Takes no configuration options.
pub struct MessageLoggerExtension {
    broadcaster: Arc<Broadcaster>,
}

impl MessageLoggerExtension {
    pub fn new(broadcaster: Arc<Broadcaster>) -> Self {
        Self { broadcaster }
    }
}

impl BehaviorExtension for MessageLoggerExtension {
    fn name(&self) -> &str {
        MESSAGE_LOGGER
    }

    fn behavior_type(&self) -> &'static str {
        type_name::<MessageLoggingBehavior>()
    }

    fn create_behavior(&self) -> Box<dyn ServiceBehavior> {
        Box::new(MessageLoggingBehavior::new(Arc::clone(&self.broadcaster)))
    }
}
