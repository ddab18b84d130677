//! End-to-end tests through the public bridge API.
//!
//! Each test builds a [`Bridge`] over a [`MemoryTransport`] and plays the
//! transport and host sides against it.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::StreamExt;
use pushbridge::{
    Bridge, BridgeError, ChannelOptions, Config, Disposition, MemoryTransport, MessageReceiver,
    MessageStream, NotificationEvent, Payload, PresentationSurface, Reply, TokenStream,
};
use serde_json::json;

fn message(id: &str) -> NotificationEvent {
    NotificationEvent::new()
        .with("google.message_id", id)
        .with("body", format!("body of {id}"))
}

fn bridge_with(config: Config) -> Bridge {
    Bridge::builder(config)
        .transport(Arc::new(MemoryTransport::with_token("initial-token")))
        .build()
        .unwrap()
}

fn bridge() -> Bridge {
    bridge_with(Config::default())
}

async fn next_message(stream: &mut MessageStream) -> Payload {
    tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("timed out waiting for a message")
        .expect("message stream ended")
}

async fn next_token(stream: &mut TokenStream) -> Result<String, BridgeError> {
    tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("timed out waiting for a token")
        .expect("token stream ended")
}

async fn assert_quiet(bridge: &Bridge, stream: &mut MessageStream) {
    bridge.ui().barrier().await;
    assert!(stream.try_recv().is_none(), "unexpected delivery");
}

#[tokio::test]
async fn test_events_without_listener_arrive_in_order_once() {
    let bridge = bridge();
    bridge.on_resume();
    let sink = bridge.transport_sink();

    for id in ["a", "b", "c"] {
        assert_eq!(sink.message(message(id)), Disposition::Buffered);
    }

    let mut stream = bridge.on_message_received();
    for id in ["a", "b", "c"] {
        assert_eq!(next_message(&mut stream).await["google.message_id"], json!(id));
    }
    assert_quiet(&bridge, &mut stream).await;

    // A second flush has nothing left to deliver.
    assert_eq!(bridge.on_resume(), 0);
    assert_quiet(&bridge, &mut stream).await;
}

#[tokio::test]
async fn test_cold_start_payload_is_first_delivery() {
    let launch = NotificationEvent::new()
        .with("google.message_id", "launch")
        .with("title", "Opened from tray");
    let bridge = Bridge::builder(Config::default())
        .transport(Arc::new(MemoryTransport::new()))
        .launch_extras(launch)
        .build()
        .unwrap();
    assert_eq!(bridge.pending_messages(), 1);

    let sink = bridge.transport_sink();
    sink.message(message("later"));

    let mut stream = bridge.on_message_received();
    let first = next_message(&mut stream).await;
    assert_eq!(first["google.message_id"], json!("launch"));
    assert_eq!(first["messageType"], json!("notification"));
    assert_eq!(first["tap"], json!("background"));
    assert_eq!(next_message(&mut stream).await["google.message_id"], json!("later"));
}

#[tokio::test]
async fn test_two_events_while_backgrounded_then_resume() {
    let bridge = bridge();
    bridge.on_resume();
    let mut stream = bridge.on_message_received();

    bridge.on_pause();
    let sink = bridge.transport_sink();
    assert_eq!(sink.message(message("e1")), Disposition::Buffered);
    assert_eq!(sink.message(message("e2")), Disposition::Buffered);
    assert_quiet(&bridge, &mut stream).await;

    assert_eq!(bridge.on_resume(), 2);
    assert_eq!(next_message(&mut stream).await["google.message_id"], json!("e1"));
    assert_eq!(next_message(&mut stream).await["google.message_id"], json!("e2"));

    // Foreground events go straight through.
    assert_eq!(sink.message(message("e3")), Disposition::Dispatched);
    assert_eq!(next_message(&mut stream).await["google.message_id"], json!("e3"));
}

#[tokio::test]
async fn test_immediate_delivery_ignores_background() {
    let config = Config {
        immediate_payload_delivery: true,
        ..Config::default()
    };
    let bridge = bridge_with(config);
    let mut stream = bridge.on_message_received();
    assert!(bridge.lifecycle().in_background());

    let sink = bridge.transport_sink();
    assert_eq!(sink.message(message("now")), Disposition::Dispatched);
    assert_eq!(next_message(&mut stream).await["google.message_id"], json!("now"));
}

#[tokio::test]
async fn test_flush_without_listener_keeps_buffer() {
    let bridge = bridge();
    bridge.transport_sink().message(message("kept"));

    assert_eq!(bridge.on_resume(), 0);
    assert_eq!(bridge.pending_messages(), 1);

    let mut stream = bridge.on_message_received();
    assert_eq!(next_message(&mut stream).await["google.message_id"], json!("kept"));
}

#[tokio::test]
async fn test_events_after_reset_buffer_for_next_listener() {
    let bridge = bridge();
    bridge.on_resume();
    let first = bridge.on_message_received();
    drop(first);

    bridge.on_reset();
    let sink = bridge.transport_sink();
    assert_eq!(sink.message(message("after-reset")), Disposition::Buffered);

    let mut second = bridge.on_message_received();
    assert_eq!(
        next_message(&mut second).await["google.message_id"],
        json!("after-reset")
    );
}

#[tokio::test]
async fn test_new_intent_with_message_is_tagged() {
    let bridge = bridge();
    bridge.on_resume();
    let mut stream = bridge.on_message_received();

    let ignored = NotificationEvent::new().with("deep_link", "/settings");
    assert_eq!(bridge.on_new_intent(ignored), None);

    let tapped = NotificationEvent::new().with("google.message_id", "tap-1");
    assert_eq!(bridge.on_new_intent(tapped), Some(Disposition::Dispatched));
    let payload = next_message(&mut stream).await;
    assert_eq!(payload["tap"], json!("background"));
    assert_quiet(&bridge, &mut stream).await;
}

#[tokio::test]
async fn test_receiver_claims_silent_pushes() {
    #[derive(Default)]
    struct SilentPushes {
        seen: Mutex<Vec<String>>,
    }

    impl MessageReceiver for SilentPushes {
        fn name(&self) -> &str {
            "silent-pushes"
        }

        fn can_handle(&self, event: &NotificationEvent) -> bool {
            event.contains_key("silent")
        }

        fn handle(&self, event: NotificationEvent) {
            let id = format!("{:?}", event.get("google.message_id"));
            self.seen.lock().unwrap().push(id);
        }
    }

    let receiver = Arc::new(SilentPushes::default());
    let bridge = bridge();
    bridge.register_receiver(Arc::clone(&receiver) as Arc<dyn MessageReceiver>);

    let sink = bridge.transport_sink();
    assert_eq!(
        sink.message(message("quiet").with("silent", true)),
        Disposition::Handled
    );
    assert_eq!(sink.message(message("loud")), Disposition::Buffered);
    assert_eq!(bridge.pending_messages(), 1);
    assert_eq!(receiver.seen.lock().unwrap().len(), 1);
}

#[test]
fn test_set_default_channel_replaces_previous_default() {
    let bridge = bridge();
    bridge
        .create_channel(&ChannelOptions::new("news", "News"))
        .unwrap();
    bridge
        .set_default_channel(&ChannelOptions::new("alerts", "Alerts"))
        .unwrap();

    let ids: Vec<String> = bridge.list_channels().into_iter().map(|c| c.id).collect();
    assert!(ids.contains(&"alerts".to_string()));
    assert!(ids.contains(&"news".to_string()));
    assert!(!ids.contains(&"fcm_default_channel".to_string()));
}

#[test]
fn test_delete_unknown_channel_succeeds() {
    let bridge = bridge();
    assert!(bridge.delete_channel("does-not-exist").is_ok());
    assert_eq!(bridge.list_channels().len(), 1);
}

#[test]
fn test_channel_without_name_is_rejected() {
    let bridge = bridge();
    let options = ChannelOptions::from_json(json!({"id": "c1"})).unwrap();

    let err = bridge.create_channel(&options).unwrap_err();
    assert!(matches!(err, BridgeError::InvalidArgument(_)));
    assert!(bridge.channel("c1").is_none());
    assert_eq!(bridge.list_channels().len(), 1);
}

#[test]
fn test_channels_unsupported_succeed_as_noops() {
    let config = Config {
        channels_supported: false,
        ..Config::default()
    };
    let bridge = bridge_with(config);

    bridge
        .create_channel(&ChannelOptions::new("news", "News"))
        .unwrap();
    bridge.delete_channel("news").unwrap();
    assert!(bridge.list_channels().is_empty());

    let invalid = ChannelOptions::from_json(json!({"name": "No id"})).unwrap();
    assert!(bridge.create_channel(&invalid).is_err());
}

#[tokio::test]
async fn test_token_refresh_without_subscriber_is_dropped() {
    let bridge = bridge();
    let sink = bridge.transport_sink();

    sink.token("lost-token");
    bridge.ui().barrier().await;

    let mut tokens = bridge.on_token_refresh().await;
    assert_eq!(next_token(&mut tokens).await.unwrap(), "initial-token");

    sink.token("second-token");
    assert_eq!(next_token(&mut tokens).await.unwrap(), "second-token");

    bridge.ui().barrier().await;
    assert!(tokens.try_recv().is_none());
}

#[tokio::test]
async fn test_transport_errors_are_verbatim() {
    let transport = Arc::new(MemoryTransport::new());
    let bridge = Bridge::builder(Config::default())
        .transport(Arc::clone(&transport) as Arc<dyn pushbridge::PushTransport>)
        .build()
        .unwrap();

    transport.fail_next("SERVICE_NOT_AVAILABLE");
    let err = bridge.subscribe("weather").await.unwrap_err();
    assert_eq!(err, BridgeError::Transport("SERVICE_NOT_AVAILABLE".to_string()));
    assert_eq!(err.to_string(), "SERVICE_NOT_AVAILABLE");

    bridge.subscribe("weather").await.unwrap();
    assert_eq!(transport.topics(), vec!["weather".to_string()]);
}

#[tokio::test]
async fn test_installation_id_change_reaches_surface_after_page_load() {
    #[derive(Default)]
    struct Surface {
        scripts: Mutex<Vec<String>>,
    }

    impl PresentationSurface for Surface {
        fn evaluate(&self, script: &str) -> anyhow::Result<()> {
            self.scripts.lock().unwrap().push(script.to_string());
            Ok(())
        }
    }

    let surface = Arc::new(Surface::default());
    let bridge = Bridge::builder(Config::default())
        .transport(Arc::new(MemoryTransport::new()))
        .surface(Arc::clone(&surface) as Arc<dyn PresentationSurface>)
        .build()
        .unwrap();

    bridge.transport_sink().installation_id("fid-123");
    bridge.ui().barrier().await;
    assert!(surface.scripts.lock().unwrap().is_empty());
    assert_eq!(
        bridge.identity_record().installation_id.as_deref(),
        Some("fid-123")
    );

    assert_eq!(bridge.on_page_finished(), 1);
    assert_eq!(bridge.on_page_finished(), 0);
    bridge.ui().barrier().await;
    assert_eq!(
        *surface.scripts.lock().unwrap(),
        vec![r#"PushBridge._onInstallationIdChangeCallback("fid-123")"#.to_string()]
    );
}

#[tokio::test]
async fn test_actions_by_name() {
    let bridge = bridge();

    let reply = bridge.invoke("hasPermission", &[]).await.unwrap();
    assert_eq!(reply.to_json(), Some(json!(true)));

    let reply = bridge.invoke("getBadgeNumber", &[]).await.unwrap();
    assert!(matches!(reply, Reply::Done));

    let err = bridge.invoke("notAThing", &[]).await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid action: notAThing");

    let id = bridge.invoke("getInstallationId", &[]).await.unwrap();
    let legacy = bridge.invoke("getId", &[]).await.unwrap();
    assert_eq!(id.to_json(), legacy.to_json());

    bridge.invoke("deleteInstallationId", &[]).await.unwrap();
    assert_eq!(bridge.identity_record().installation_id, None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_producers_keep_per_thread_order() {
    const THREADS: i64 = 4;
    const PER_THREAD: i64 = 50;

    let bridge = bridge();
    bridge.on_resume();
    let mut first = bridge.on_message_received();
    let sink = bridge.transport_sink();

    let producers: Vec<_> = (0..THREADS)
        .map(|thread| {
            let sink = sink.clone();
            std::thread::spawn(move || {
                for seq in 0..PER_THREAD {
                    let event = NotificationEvent::new()
                        .with("google.message_id", format!("{thread}-{seq}"))
                        .with("thread", thread)
                        .with("seq", seq);
                    sink.message(event);
                    if seq % 10 == 0 {
                        std::thread::yield_now();
                    }
                }
            })
        })
        .collect();

    // Race lifecycle changes and a listener replacement against the producers.
    for _ in 0..5 {
        bridge.on_pause();
        tokio::task::yield_now().await;
        bridge.on_resume();
    }
    let mut second = bridge.on_message_received();
    for _ in 0..5 {
        bridge.on_pause();
        tokio::task::yield_now().await;
        bridge.on_resume();
    }

    for producer in producers {
        producer.join().unwrap();
    }
    bridge.on_resume();
    bridge.ui().barrier().await;
    assert_eq!(bridge.pending_messages(), 0);

    // Everything the first listener got was delivered before the second registered.
    let mut delivered = Vec::new();
    while let Some(payload) = first.try_recv() {
        delivered.push(payload);
    }
    while let Some(payload) = second.try_recv() {
        delivered.push(payload);
    }
    assert_eq!(delivered.len(), (THREADS * PER_THREAD) as usize);

    let mut last_seq = vec![-1_i64; THREADS as usize];
    for payload in &delivered {
        let thread = payload["thread"].as_i64().unwrap() as usize;
        let seq = payload["seq"].as_i64().unwrap();
        assert_eq!(seq, last_seq[thread] + 1, "thread {thread} out of order");
        last_seq[thread] = seq;
    }
    assert!(last_seq.iter().all(|&seq| seq == PER_THREAD - 1));
}
