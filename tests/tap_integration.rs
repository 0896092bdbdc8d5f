//! End-to-end tests for the message tap
//!
//! These tests wire a host, the logging behavior and observers together and
//! drive calls through endpoint pipelines.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use parking_lot::Mutex;

use msgtap::broadcast::DEFAULT_DRAIN_TIMEOUT;
use msgtap::host::{ChannelDispatcher, EndpointDispatcher, ServiceHost};
use msgtap::{
    Broadcaster, Delivery, Direction, ExtensionRegistry, FailurePolicy, LogEvent, Message, MessageLoggingBehavior,
    ServiceBehavior, StreamedMessage, TextMessage,
};

type Seen = Arc<Mutex<Vec<(String, Direction, Option<String>)>>>;

fn record_into(broadcaster: &Broadcaster) -> Seen {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    broadcaster.subscribe(move |event: &LogEvent| -> eyre::Result<()> {
        sink.lock().push((
            event.message().to_string(),
            event.direction(),
            event.endpoint().map(str::to_string),
        ));
        Ok(())
    });
    seen
}

fn orders_host() -> ServiceHost {
    ServiceHost::new("orders").with_dispatcher(
        ChannelDispatcher::new("http://localhost:8080/orders")
            .with_endpoint(EndpointDispatcher::new("basic", "IOrders"))
            .with_endpoint(EndpointDispatcher::new("secure", "IOrders")),
    )
}

fn echo(reply: &'static str) -> impl FnOnce(&dyn Message) -> eyre::Result<Option<Box<dyn Message>>> {
    move |_| Ok(Some(Box::new(TextMessage::new(reply)) as Box<dyn Message>))
}

#[test]
fn test_two_way_call_through_one_of_two_endpoints() {
    let broadcaster = Arc::new(Broadcaster::new());
    let seen = record_into(&broadcaster);

    let mut host = orders_host();
    let attached = MessageLoggingBehavior::new(Arc::clone(&broadcaster))
        .apply_dispatch_behavior(&mut host)
        .unwrap();
    assert_eq!(attached, 2);

    let reply = host.endpoint("basic").unwrap().dispatch(&TextMessage::new("REQ"), echo("RESP")).unwrap();
    assert_eq!(reply.unwrap().render().unwrap(), "RESP");

    assert_eq!(
        *seen.lock(),
        vec![
            ("REQ".to_string(), Direction::Inbound, Some("basic".to_string())),
            ("RESP".to_string(), Direction::Outbound, Some("basic".to_string())),
        ]
    );
}

#[test]
fn test_one_way_call_never_fires_outbound() {
    let broadcaster = Arc::new(Broadcaster::new());
    let seen = record_into(&broadcaster);

    let mut host = orders_host();
    MessageLoggingBehavior::new(Arc::clone(&broadcaster))
        .apply_dispatch_behavior(&mut host)
        .unwrap();

    host.endpoint("secure")
        .unwrap()
        .dispatch(&TextMessage::one_way("NOTIFY"), |_| Ok(None))
        .unwrap();

    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].1, Direction::Inbound);
}

#[test]
fn test_attach_count_matches_total_endpoints() {
    let broadcaster = Arc::new(Broadcaster::new());
    let mut host = ServiceHost::new("multi")
        .with_dispatcher(
            ChannelDispatcher::new("net.tcp://localhost:9000")
                .with_endpoint(EndpointDispatcher::new("tcp-a", "IA"))
                .with_endpoint(EndpointDispatcher::new("tcp-b", "IB"))
                .with_endpoint(EndpointDispatcher::new("tcp-c", "IC")),
        )
        .with_dispatcher(
            ChannelDispatcher::new("http://localhost:9001").with_endpoint(EndpointDispatcher::new("http-a", "IA")),
        )
        .with_dispatcher(ChannelDispatcher::new("http://localhost:9002"));

    let before: usize = host.endpoints().map(|e| e.runtime.inspector_count()).sum();
    let attached = MessageLoggingBehavior::new(broadcaster)
        .apply_dispatch_behavior(&mut host)
        .unwrap();
    let after: usize = host.endpoints().map(|e| e.runtime.inspector_count()).sum();

    assert_eq!(host.endpoint_count(), 4);
    assert_eq!(attached, 4);
    assert_eq!(after - before, 4);
}

#[test]
fn test_n_observers_then_detach_one() {
    let broadcaster = Arc::new(Broadcaster::new());
    let calls = Arc::new(AtomicUsize::new(0));

    let ids: Vec<_> = (0..4)
        .map(|_| {
            let calls = Arc::clone(&calls);
            broadcaster.subscribe(move |_: &LogEvent| -> eyre::Result<()> {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        })
        .collect();

    let mut host = orders_host();
    MessageLoggingBehavior::new(Arc::clone(&broadcaster))
        .apply_dispatch_behavior(&mut host)
        .unwrap();
    let endpoint = host.endpoint("basic").unwrap();

    endpoint.dispatch(&TextMessage::one_way("one"), |_| Ok(None)).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 4);

    broadcaster.unsubscribe(ids[0]);
    endpoint.dispatch(&TextMessage::one_way("two"), |_| Ok(None)).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 7);
}

#[test]
fn test_concurrent_calls_keep_per_call_order() {
    let broadcaster = Arc::new(Broadcaster::new());
    let seen = record_into(&broadcaster);

    let mut host = orders_host();
    MessageLoggingBehavior::new(Arc::clone(&broadcaster))
        .apply_dispatch_behavior(&mut host)
        .unwrap();

    thread::scope(|scope| {
        for worker in 0..8 {
            let host = &host;
            scope.spawn(move || {
                let endpoint = if worker % 2 == 0 { "basic" } else { "secure" };
                for call in 0..25 {
                    let request = format!("req-{}-{}", worker, call);
                    let reply = format!("resp-{}-{}", worker, call);
                    host.endpoint(endpoint)
                        .unwrap()
                        .dispatch(&TextMessage::new(request), move |_| {
                            Ok(Some(Box::new(TextMessage::new(reply)) as Box<dyn Message>))
                        })
                        .unwrap();
                }
            });
        }
    });

    let seen = seen.lock();
    assert_eq!(seen.len(), 8 * 25 * 2);

    for worker in 0..8 {
        for call in 0..25 {
            let req = format!("req-{}-{}", worker, call);
            let resp = format!("resp-{}-{}", worker, call);
            let req_at = seen.iter().position(|(m, d, _)| *m == req && *d == Direction::Inbound).unwrap();
            let resp_at = seen.iter().position(|(m, d, _)| *m == resp && *d == Direction::Outbound).unwrap();
            assert!(req_at < resp_at, "{} delivered after {}", req, resp);
        }
    }
}

#[test]
fn test_isolated_failures_do_not_break_the_call() {
    let broadcaster = Arc::new(Broadcaster::new());
    broadcaster.subscribe(|_: &LogEvent| -> eyre::Result<()> { eyre::bail!("collector unavailable") });
    let seen = record_into(&broadcaster);

    let mut host = orders_host();
    MessageLoggingBehavior::new(Arc::clone(&broadcaster))
        .apply_dispatch_behavior(&mut host)
        .unwrap();

    let consumed = StreamedMessage::new("already read");
    consumed.read_body().unwrap();

    let reply = host.endpoint("basic").unwrap().dispatch(&consumed, echo("RESP")).unwrap();

    assert!(reply.is_some());
    // the consumed request could not be rendered; the reply still got through
    assert_eq!(*seen.lock(), vec![("RESP".to_string(), Direction::Outbound, Some("basic".to_string()))]);
}

#[test]
fn test_propagating_failures_abort_the_call() {
    let broadcaster = Arc::new(Broadcaster::with_delivery(Delivery::Inline, FailurePolicy::Propagate).unwrap());
    broadcaster.subscribe(|_: &LogEvent| -> eyre::Result<()> { eyre::bail!("collector unavailable") });

    let mut host = orders_host();
    MessageLoggingBehavior::new(Arc::clone(&broadcaster))
        .apply_dispatch_behavior(&mut host)
        .unwrap();

    let operation_ran = Arc::new(AtomicUsize::new(0));
    let ran = Arc::clone(&operation_ran);
    let result = host.endpoint("basic").unwrap().dispatch(&TextMessage::new("REQ"), move |_| {
        ran.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    });

    let err = result.err().unwrap();
    assert!(format!("{:#}", err).contains("collector unavailable"));
    assert_eq!(operation_ran.load(Ordering::SeqCst), 0);
}

#[test]
fn test_registry_driven_startup() {
    let broadcaster = Arc::new(Broadcaster::new());
    let seen = record_into(&broadcaster);
    let registry = ExtensionRegistry::with_defaults(Arc::clone(&broadcaster));

    let behaviors = registry.create_all(&["messageLogger"]).unwrap();
    let mut host = orders_host();
    let attached = host.apply_behaviors(&behaviors).unwrap();
    assert_eq!(attached, 2);

    host.dispatch(
        "secure",
        &TextMessage::new("REQ"),
        Box::new(|_: &dyn Message| -> eyre::Result<Option<Box<dyn Message>>> {
            Ok(Some(Box::new(TextMessage::new("RESP")) as Box<dyn Message>))
        }),
    )
    .unwrap();

    assert_eq!(seen.lock().len(), 2);
}

#[test]
fn test_queued_delivery_end_to_end() {
    let broadcaster =
        Arc::new(Broadcaster::with_delivery(Delivery::Queued { capacity: 256 }, FailurePolicy::Isolate).unwrap());
    let seen = record_into(&broadcaster);

    let mut host = orders_host();
    MessageLoggingBehavior::new(Arc::clone(&broadcaster))
        .apply_dispatch_behavior(&mut host)
        .unwrap();

    for i in 0..20 {
        host.endpoint("basic")
            .unwrap()
            .dispatch(&TextMessage::new(format!("req-{}", i)), move |_| {
                Ok(Some(Box::new(TextMessage::new(format!("resp-{}", i))) as Box<dyn Message>))
            })
            .unwrap();
    }
    broadcaster.shutdown(DEFAULT_DRAIN_TIMEOUT);

    let seen = seen.lock();
    assert_eq!(seen.len(), 40);
    for i in 0..20 {
        assert_eq!(seen[2 * i].0, format!("req-{}", i));
        assert_eq!(seen[2 * i + 1].0, format!("resp-{}", i));
    }
    assert_eq!(broadcaster.dropped(), 0);
}
