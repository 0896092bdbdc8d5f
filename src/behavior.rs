//! Service behavior that puts a message tap on every endpoint

use eyre::Result;
use std::sync::Arc;

use crate::broadcast::Broadcaster;
use crate::hook::MessageTap;
use crate::host::{BindingParameters, ServiceBehavior, ServiceHost};

/// Attaches one `MessageTap` per endpoint when the host starts
///
/// Taps share the broadcaster and its failure policy. Applying it twice
/// attaches two taps per endpoint, so every message is published twice. The
/// host decides how often behaviors run.
pub struct MessageLoggingBehavior {
    broadcaster: Arc<Broadcaster>,
}

impl MessageLoggingBehavior {
    pub fn new(broadcaster: Arc<Broadcaster>) -> Self {
        Self { broadcaster }
    }
}

impl ServiceBehavior for MessageLoggingBehavior {
    fn name(&self) -> &str {
        "messageLogger"
    }

    fn add_binding_parameters(&self, _host: &ServiceHost, _parameters: &mut BindingParameters) -> Result<()> {
        Ok(())
    }

    fn apply_dispatch_behavior(&self, host: &mut ServiceHost) -> Result<usize> {
        let mut attached = 0;

        for dispatcher in &mut host.dispatchers {
            for endpoint in &mut dispatcher.endpoints {
                let tap = MessageTap::for_endpoint(Arc::clone(&self.broadcaster), endpoint.name.clone());
                endpoint.runtime.add_inspector(Arc::new(tap));
                attached += 1;
                log::debug!("Attached message tap to {} ({})", endpoint.name, dispatcher.listen_uri);
            }
        }

        log::info!("Message tap attached to {} endpoints of '{}'", attached, host.name);
        Ok(attached)
    }

    fn validate(&self, _host: &ServiceHost) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::{Delivery, FailurePolicy};
    use crate::event::LogEvent;
    use crate::host::{ChannelDispatcher, EndpointDispatcher};
    use crate::message::{Message, TextMessage};
    use parking_lot::Mutex;

    fn host(layout: &[usize]) -> ServiceHost {
        let mut host = ServiceHost::new("svc");
        for (d, count) in layout.iter().enumerate() {
            let mut dispatcher = ChannelDispatcher::new(format!("http://localhost:{}", 8000 + d));
            for e in 0..*count {
                dispatcher = dispatcher.with_endpoint(EndpointDispatcher::new(format!("ep-{}-{}", d, e), "IEcho"));
            }
            host = host.with_dispatcher(dispatcher);
        }
        host
    }

    #[test]
    fn test_attaches_one_tap_per_endpoint() {
        let mut host = host(&[2, 3, 0]);
        let behavior = MessageLoggingBehavior::new(Arc::new(Broadcaster::new()));

        let attached = behavior.apply_dispatch_behavior(&mut host).unwrap();

        assert_eq!(attached, 5);
        assert!(host.endpoints().all(|e| e.runtime.inspector_count() == 1));
    }

    #[test]
    fn test_applying_twice_doubles_notifications() {
        let broadcaster = Arc::new(Broadcaster::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        broadcaster.subscribe(move |event: &LogEvent| -> Result<()> {
            sink.lock().push(event.message().to_string());
            Ok(())
        });

        let mut host = host(&[1]);
        let behavior = MessageLoggingBehavior::new(Arc::clone(&broadcaster));
        behavior.apply_dispatch_behavior(&mut host).unwrap();
        behavior.apply_dispatch_behavior(&mut host).unwrap();

        host.endpoint("ep-0-0")
            .unwrap()
            .dispatch(&TextMessage::one_way("REQ"), |_| Ok(None))
            .unwrap();

        assert_eq!(*seen.lock(), vec!["REQ", "REQ"]);
    }

    #[test]
    fn test_noop_capabilities() {
        let host = host(&[1]);
        let behavior = MessageLoggingBehavior::new(Arc::new(Broadcaster::new()));
        let mut parameters = BindingParameters::default();

        behavior.add_binding_parameters(&host, &mut parameters).unwrap();
        behavior.validate(&host).unwrap();

        assert!(parameters.is_empty());
    }

    #[test]
    fn test_propagating_broadcaster_fails_the_call() {
        let broadcaster = Arc::new(Broadcaster::with_delivery(Delivery::Inline, FailurePolicy::Propagate).unwrap());
        broadcaster.subscribe(|_: &LogEvent| -> Result<()> { eyre::bail!("collector unavailable") });
        let later = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&later);
        broadcaster.subscribe(move |_: &LogEvent| -> Result<()> {
            *counter.lock() += 1;
            Ok(())
        });

        let mut host = host(&[1]);
        MessageLoggingBehavior::new(Arc::clone(&broadcaster))
            .apply_dispatch_behavior(&mut host)
            .unwrap();

        let result = host
            .endpoint("ep-0-0")
            .unwrap()
            .dispatch(&TextMessage::one_way("REQ"), |_| Ok(None));

        // a skipped observer is never hidden behind a successful call
        assert!(result.is_err());
        assert_eq!(*later.lock(), 0);
    }

    #[test]
    fn test_isolating_broadcaster_reaches_every_observer() {
        let broadcaster = Arc::new(Broadcaster::new());
        broadcaster.subscribe(|_: &LogEvent| -> Result<()> { eyre::bail!("collector unavailable") });
        let later = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&later);
        broadcaster.subscribe(move |_: &LogEvent| -> Result<()> {
            *counter.lock() += 1;
            Ok(())
        });

        let mut host = host(&[1]);
        MessageLoggingBehavior::new(Arc::clone(&broadcaster))
            .apply_dispatch_behavior(&mut host)
            .unwrap();

        host.endpoint("ep-0-0")
            .unwrap()
            .dispatch(&TextMessage::one_way("REQ"), |_| Ok(None))
            .unwrap();

        assert_eq!(*later.lock(), 1);
    }

    #[test]
    fn test_taps_carry_endpoint_name() {
        let broadcaster = Arc::new(Broadcaster::new());
        let endpoints = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&endpoints);
        broadcaster.subscribe(move |event: &LogEvent| -> Result<()> {
            sink.lock().push(event.endpoint().map(str::to_string));
            Ok(())
        });

        let mut host = host(&[2]);
        MessageLoggingBehavior::new(Arc::clone(&broadcaster))
            .apply_dispatch_behavior(&mut host)
            .unwrap();

        host.endpoint("ep-0-1")
            .unwrap()
            .dispatch(&TextMessage::new("REQ"), |_| {
                Ok(Some(Box::new(TextMessage::new("RESP")) as Box<dyn Message>))
            })
            .unwrap();

        assert_eq!(
            *endpoints.lock(),
            vec![Some("ep-0-1".to_string()), Some("ep-0-1".to_string())]
        );
    }
}
