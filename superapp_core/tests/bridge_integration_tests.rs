use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use superapp_core::bridge::{
    pump, BridgeError, GuestTransport, OutboundKind, OutboundMessage, DEFAULT_NAMESPACE,
};
use superapp_core::capability::{BridgeHandler, ALLOWED_BRIDGE_METHODS_CONFIG_KEY};
use superapp_core::host::HostServices;
use superapp_core::token::{self, SessionCredentials, TokenExchanger};
use superapp_core::{
    AppRegistry, BridgeContext, BridgeRouter, CapabilityRegistry, Dispatch, DropReason, MicroApp,
    Outbound, TokenBroker,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::instrument::WithSubscriber;

const APP_ID: &str = "wallet";

struct CountingExchanger {
    calls: AtomicUsize,
}

#[async_trait]
impl TokenExchanger for CountingExchanger {
    async fn exchange(&self, _: &str, _: Option<&str>, _: &str) -> token::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("refreshed".to_string())
    }

    fn is_expiring_soon(&self, token: &str) -> bool {
        token.starts_with("expiring")
    }
}

/// Resolves with its params and counts invocations
struct EchoHandler {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl BridgeHandler for EchoHandler {
    fn topic(&self) -> &'static str {
        "echo"
    }

    async fn handle(&self, params: Value, ctx: &mut BridgeContext) -> superapp_core::bridge::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ctx.resolve(params);
        Ok(())
    }
}

struct FailingHandler;

#[async_trait]
impl BridgeHandler for FailingHandler {
    fn topic(&self) -> &'static str {
        "failing"
    }

    async fn handle(&self, _: Value, _: &mut BridgeContext) -> superapp_core::bridge::Result<()> {
        Err(BridgeError::Handler("backend unavailable".into()))
    }
}

struct PanickingHandler;

#[async_trait]
impl BridgeHandler for PanickingHandler {
    fn topic(&self) -> &'static str {
        "panicking"
    }

    async fn handle(&self, _: Value, _: &mut BridgeContext) -> superapp_core::bridge::Result<()> {
        panic!("handler bug");
    }
}

#[derive(Default)]
struct RecordingTransport {
    scripts: Mutex<Vec<String>>,
}

impl GuestTransport for RecordingTransport {
    fn inject(&self, script: &str) {
        self.scripts.lock().push(script.to_string());
    }
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

struct Harness {
    router: BridgeRouter,
    rx: UnboundedReceiver<OutboundMessage>,
    exchanger: Arc<CountingExchanger>,
    echo_calls: Arc<AtomicUsize>,
}

fn harness(apps: Vec<MicroApp>) -> Harness {
    let registry = AppRegistry::with_apps(apps);
    let (outbound, rx) = Outbound::channel();
    let exchanger = Arc::new(CountingExchanger {
        calls: AtomicUsize::new(0),
    });
    let broker = TokenBroker::new(
        SessionCredentials::new(APP_ID, "client-1"),
        exchanger.clone(),
        registry.clone(),
        outbound.clone(),
    );

    let echo_calls = Arc::new(AtomicUsize::new(0));
    let mut capabilities = CapabilityRegistry::with_defaults();
    capabilities.register(Arc::new(EchoHandler {
        calls: echo_calls.clone(),
    }));
    capabilities.register(Arc::new(FailingHandler));
    capabilities.register(Arc::new(PanickingHandler));

    let router = BridgeRouter::new(
        registry,
        Arc::new(capabilities),
        broker,
        outbound,
        HostServices::headless(),
    );
    Harness {
        router,
        rx,
        exchanger,
        echo_calls,
    }
}

fn app_allowing(topics: Value) -> MicroApp {
    MicroApp::new(APP_ID, "Wallet").with_config(ALLOWED_BRIDGE_METHODS_CONFIG_KEY, topics)
}

#[tokio::test]
async fn test_disallowed_topics_never_reach_handlers() {
    let cases = vec![
        ("missing app", vec![]),
        ("no configs", vec![MicroApp::new(APP_ID, "Wallet")]),
        ("empty list", vec![app_allowing(json!([]))]),
        ("topic not listed", vec![app_allowing(json!(["alert"]))]),
        ("not a list", vec![app_allowing(json!("echo"))]),
    ];

    for (case, apps) in cases {
        let mut h = harness(apps);
        let dispatch = h
            .router
            .on_message(r#"{"topic": "echo", "data": {}, "requestId": "r1"}"#)
            .await;
        assert_eq!(dispatch, Dispatch::Dropped(DropReason::NotAllowed), "{}", case);
        assert_eq!(h.echo_calls.load(Ordering::SeqCst), 0, "{}", case);
        assert!(h.rx.try_recv().is_err(), "{}", case);
    }
}

#[tokio::test]
async fn test_allowed_topic_invokes_handler_once_per_message() {
    let mut h = harness(vec![app_allowing(json!(["echo"]))]);

    for i in 0..3 {
        let raw = json!({"topic": "echo", "data": {"n": i}, "requestId": format!("r{}", i)});
        assert_eq!(h.router.on_message(&raw.to_string()).await, Dispatch::Handled);
    }
    assert_eq!(h.echo_calls.load(Ordering::SeqCst), 3);

    for i in 0..3 {
        let sent = h.rx.try_recv().unwrap();
        assert_eq!(sent.kind, OutboundKind::Resolve);
        assert_eq!(sent.method, "resolveEcho");
        assert_eq!(sent.payload, json!({"n": i}));
        assert_eq!(sent.request_id, Some(format!("r{}", i)));
    }
}

#[tokio::test]
async fn test_token_with_valid_cached_token_resolves_without_refresh() {
    let h = harness(vec![app_allowing(json!(["token"]))]);
    h.router.token_broker().set_token("abc");

    let transport = Arc::new(RecordingTransport::default());
    let pump_task = tokio::spawn(pump(h.rx, transport.clone(), DEFAULT_NAMESPACE.to_string()));

    let dispatch = h
        .router
        .on_message(r#"{"topic": "token", "requestId": "r1"}"#)
        .await;
    assert_eq!(dispatch, Dispatch::Handled);
    assert_eq!(h.exchanger.calls.load(Ordering::SeqCst), 0);

    drop(h.router);
    pump_task.await.unwrap();
    assert_eq!(
        *transport.scripts.lock(),
        vec![r#"window.nativebridge.resolveToken("abc", "r1");"#.to_string()]
    );
}

#[tokio::test]
async fn test_expiring_token_triggers_refresh_and_resolves_request() {
    let mut h = harness(vec![app_allowing(json!(["token"]))]);
    h.router.token_broker().set_token("expiring-1");

    h.router
        .on_message(r#"{"topic": "token", "requestId": "r7"}"#)
        .await;
    assert_eq!(h.exchanger.calls.load(Ordering::SeqCst), 1);

    let push = h.rx.try_recv().unwrap();
    assert_eq!(push.kind, OutboundKind::Push);
    assert_eq!(push.method, "resolveToken");
    assert_eq!(push.payload, json!("refreshed"));

    let reply = h.rx.try_recv().unwrap();
    assert_eq!(reply.kind, OutboundKind::Resolve);
    assert_eq!(reply.request_id.as_deref(), Some("r7"));
    assert_eq!(reply.payload, json!("refreshed"));
}

#[tokio::test]
async fn test_disallowed_topic_logs_and_injects_nothing() {
    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();

    let h = harness(vec![app_allowing(json!(["alert"]))]);
    let transport = Arc::new(RecordingTransport::default());
    let pump_task = tokio::spawn(pump(h.rx, transport.clone(), DEFAULT_NAMESPACE.to_string()));

    let router = h.router;
    let dispatch = async { router.on_message(r#"{"topic": "token", "requestId": "r1"}"#).await }
        .with_subscriber(subscriber)
        .await;
    assert_eq!(dispatch, Dispatch::Dropped(DropReason::NotAllowed));

    drop(router);
    pump_task.await.unwrap();
    assert!(transport.scripts.lock().is_empty());
    assert!(logs.contents().contains("token not allowed"));
}

#[tokio::test]
async fn test_handler_failures_leave_router_usable() {
    let mut h = harness(vec![app_allowing(json!(["failing", "panicking", "echo"]))]);

    assert_eq!(
        h.router.on_message(r#"{"topic": "failing", "requestId": "r1"}"#).await,
        Dispatch::HandlerFailed
    );
    assert_eq!(
        h.router.on_message(r#"{"topic": "panicking", "requestId": "r2"}"#).await,
        Dispatch::HandlerFailed
    );
    assert!(h.rx.try_recv().is_err());

    assert_eq!(
        h.router.on_message(r#"{"topic": "echo", "requestId": "r3"}"#).await,
        Dispatch::Handled
    );
    assert_eq!(h.rx.try_recv().unwrap().request_id.as_deref(), Some("r3"));
}

#[tokio::test]
async fn test_local_data_round_trip_through_bridge() {
    let mut h = harness(vec![app_allowing(json!(["save_local_data", "get_local_data"]))]);

    h.router
        .on_message(r#"{"topic": "save_local_data", "data": {"key": "theme", "value": "dark"}, "requestId": "s1"}"#)
        .await;
    assert_eq!(h.rx.try_recv().unwrap().method, "resolveSave_local_data");

    h.router
        .on_message(r#"{"topic": "get_local_data", "data": {"key": "theme"}, "requestId": "g1"}"#)
        .await;
    let found = h.rx.try_recv().unwrap();
    assert_eq!(found.payload, json!({"value": "dark"}));

    h.router
        .on_message(r#"{"topic": "get_local_data", "data": {"key": "missing"}, "requestId": "g2"}"#)
        .await;
    assert_eq!(h.rx.try_recv().unwrap().payload, json!({"value": null}));
}

#[tokio::test]
async fn test_confirm_alert_resolves_cancel_on_headless_host() {
    let mut h = harness(vec![app_allowing(json!(["confirm_alert", "device_safe_area_insets"]))]);

    h.router
        .on_message(
            r#"{"topic": "confirm_alert", "data": {"title": "Pay", "message": "Send 10?"}, "requestId": "c1"}"#,
        )
        .await;
    let reply = h.rx.try_recv().unwrap();
    assert_eq!(reply.method, "resolveConfirm_alert");
    assert_eq!(reply.payload, json!("cancel"));

    h.router
        .on_message(r#"{"topic": "device_safe_area_insets", "requestId": "d1"}"#)
        .await;
    assert_eq!(
        h.rx.try_recv().unwrap().payload,
        json!({"insets": {"top": 0.0, "bottom": 0.0, "left": 0.0, "right": 0.0}})
    );
}

#[tokio::test]
async fn test_push_notification_is_unkeyed() {
    let mut h = harness(vec![]);
    h.router
        .push("resolveNotificationData", json!({"title": "Payday"}));

    let sent = h.rx.try_recv().unwrap();
    assert_eq!(sent.kind, OutboundKind::Push);
    assert_eq!(
        sent.to_script(DEFAULT_NAMESPACE),
        r#"window.nativebridge.resolveNotificationData({"title":"Payday"});"#
    );
}
