//! msgtap: a request/reply message tap for RPC service hosts
//!
//! A `MessageTap` sits in an endpoint's inspector pipeline and republishes
//! every request and reply as a `LogEvent` through a shared `Broadcaster`.
//! `MessageLoggingBehavior` attaches one tap per endpoint at host startup, and
//! `ExtensionRegistry` lets configuration name that behavior.
//!
//! ```no_run
//! use std::sync::Arc;
//! use msgtap::{Broadcaster, LogEvent, MessageLoggingBehavior, ServiceBehavior};
//! use msgtap::host::{ChannelDispatcher, EndpointDispatcher, ServiceHost};
//!
//! let broadcaster = Arc::new(Broadcaster::new());
//! broadcaster.subscribe(|event: &LogEvent| -> eyre::Result<()> {
//!     println!("{} {}", event.direction(), event.message());
//!     Ok(())
//! });
//!
//! let mut host = ServiceHost::new("orders").with_dispatcher(
//!     ChannelDispatcher::new("http://localhost:8080/orders")
//!         .with_endpoint(EndpointDispatcher::new("basic", "IOrders")),
//! );
//! MessageLoggingBehavior::new(broadcaster).apply_dispatch_behavior(&mut host)?;
//! # Ok::<(), eyre::Report>(())
//! ```

pub mod behavior;
pub mod broadcast;
pub mod config;
pub mod event;
pub mod extension;
pub mod hook;
pub mod host;
pub mod message;
pub mod sink;
pub mod stack;

pub use behavior::MessageLoggingBehavior;
pub use broadcast::{Broadcaster, Delivery, FailurePolicy, Observer, SubscriptionId};
pub use event::{Direction, LogEvent};
pub use extension::{BehaviorExtension, ExtensionRegistry, MessageLoggerExtension};
pub use hook::{CorrelationToken, MessageInspector, MessageTap};
pub use host::ServiceBehavior;
pub use message::{Message, StreamedMessage, TextMessage};
pub use stack::TapStack;
