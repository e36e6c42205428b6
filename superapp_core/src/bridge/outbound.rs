use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Object the guest page exposes its callbacks on
pub const DEFAULT_NAMESPACE: &str = "window.nativebridge";

/// Callback name used to resolve a request on `topic`, e.g. `resolveToken`
pub fn resolve_method(topic: &str) -> String {
    format!("resolve{}", capitalize(topic))
}

/// Callback name used to reject a request on `topic`, e.g. `rejectToken`
pub fn reject_method(topic: &str) -> String {
    format!("reject{}", capitalize(topic))
}

fn capitalize(topic: &str) -> String {
    let mut chars = topic.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboundKind {
    Resolve,
    Reject,
    /// Unsolicited host notification, not tied to a request
    Push,
}

/// A host-to-guest callback invocation
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub kind: OutboundKind,
    pub method: String,
    pub request_id: Option<String>,
    pub payload: Value,
}

impl OutboundMessage {
    /// Render as `<namespace>.<method>(<json>[, "<requestId>"]);`
    pub fn to_script(&self, namespace: &str) -> String {
        let payload = self.payload.to_string();
        match &self.request_id {
            Some(request_id) => format!(
                "{}.{}({}, {});",
                namespace,
                self.method,
                payload,
                Value::String(request_id.clone())
            ),
            None => format!("{}.{}({});", namespace, self.method, payload),
        }
    }
}

/// Mechanism that evaluates a script inside the guest content view
pub trait GuestTransport: Send + Sync {
    fn inject(&self, script: &str);
}

/// Sending half of a guest session's outbound channel.
///
/// Delivery is one-way: once the receiving side is gone (the view was torn
/// down) messages are silently dropped.
#[derive(Debug, Clone)]
pub struct Outbound {
    tx: mpsc::UnboundedSender<OutboundMessage>,
}

impl Outbound {
    /// Create an outbound channel; feed the receiver to [`pump`]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, message: OutboundMessage) {
        if let Err(e) = self.tx.send(message) {
            debug!("Guest view gone, dropping {}", e.0.method);
        }
    }

    pub fn resolve(&self, topic: &str, data: Value, request_id: Option<String>) {
        self.send(OutboundMessage {
            kind: OutboundKind::Resolve,
            method: resolve_method(topic),
            request_id,
            payload: data,
        });
    }

    pub fn reject(&self, topic: &str, error: String, request_id: Option<String>) {
        self.send(OutboundMessage {
            kind: OutboundKind::Reject,
            method: reject_method(topic),
            request_id,
            payload: Value::String(error),
        });
    }

    /// Fan out `data` to `method` without a correlation id
    pub fn push(&self, method: impl Into<String>, data: Value) {
        self.send(OutboundMessage {
            kind: OutboundKind::Push,
            method: method.into(),
            request_id: None,
            payload: data,
        });
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Drive outbound messages into the guest until every sender is dropped
pub async fn pump(
    mut rx: mpsc::UnboundedReceiver<OutboundMessage>,
    transport: Arc<dyn GuestTransport>,
    namespace: String,
) {
    while let Some(message) = rx.recv().await {
        transport.inject(&message.to_script(&namespace));
    }
    debug!("Outbound channel closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    #[derive(Default)]
    struct RecordingTransport {
        scripts: Mutex<Vec<String>>,
    }

    impl GuestTransport for RecordingTransport {
        fn inject(&self, script: &str) {
            self.scripts.lock().push(script.to_string());
        }
    }

    #[test]
    fn test_method_names() {
        assert_eq!(resolve_method("token"), "resolveToken");
        assert_eq!(reject_method("qr_request"), "rejectQr_request");
        assert_eq!(resolve_method(""), "resolve");
    }

    #[test]
    fn test_script_rendering() {
        let keyed = OutboundMessage {
            kind: OutboundKind::Resolve,
            method: "resolveToken".into(),
            request_id: Some("r1".into()),
            payload: json!("abc"),
        };
        assert_eq!(
            keyed.to_script(DEFAULT_NAMESPACE),
            r#"window.nativebridge.resolveToken("abc", "r1");"#
        );

        let unkeyed = OutboundMessage {
            kind: OutboundKind::Push,
            method: "resolveToken".into(),
            request_id: None,
            payload: json!("abc"),
        };
        assert_eq!(
            unkeyed.to_script(DEFAULT_NAMESPACE),
            r#"window.nativebridge.resolveToken("abc");"#
        );
    }

    #[test]
    fn test_reject_payload_is_escaped() {
        let (outbound, mut rx) = Outbound::channel();
        outbound.reject("alert", r#"bad "quote""#.into(), Some(r#"r"1"#.into()));
        let script = rx.try_recv().unwrap().to_script("ns");
        assert_eq!(script, r#"ns.rejectAlert("bad \"quote\"", "r\"1");"#);
    }

    #[test]
    fn test_send_after_teardown_is_silent() {
        let (outbound, rx) = Outbound::channel();
        drop(rx);
        assert!(outbound.is_closed());
        outbound.push("resolveNotificationData", json!({}));
    }

    #[tokio::test]
    async fn test_pump_injects_in_order() {
        let (outbound, rx) = Outbound::channel();
        let transport = Arc::new(RecordingTransport::default());

        outbound.resolve("token", json!("t"), Some("r1".into()));
        outbound.reject("token", "nope".into(), Some("r2".into()));
        drop(outbound);

        pump(rx, transport.clone(), DEFAULT_NAMESPACE.to_string()).await;

        let scripts = transport.scripts.lock();
        assert_eq!(scripts.len(), 2);
        assert!(scripts[0].starts_with("window.nativebridge.resolveToken"));
        assert!(scripts[1].starts_with("window.nativebridge.rejectToken"));
    }
}
