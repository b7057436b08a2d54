//! Best-effort webhook alerts.
//!
//! Events flow through a bounded queue into one dispatcher loop, so a burst
//! of domain events cannot spawn unbounded concurrent network calls. Delivery
//! is single-attempt; failures are logged and never surfaced to the operation
//! that raised the event.

use std::time::Duration;

use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Queue depth before `notify` starts dropping events.
const QUEUE_CAPACITY: usize = 64;
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// A structured event payload sent to webhook endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookEvent {
    /// Event type identifier, e.g. "limit_reached".
    pub event_type: String,
    /// ISO-8601 timestamp of when the event occurred.
    pub timestamp: String,
    /// Tenant (project) the event belongs to.
    pub tenant_id: String,
    /// Human-readable tenant name.
    pub tenant_name: String,
    /// Event-specific details (limit kind, usage counters, etc.).
    pub details: serde_json::Value,
}

impl WebhookEvent {
    pub fn limit_reached(
        tenant_id: Uuid,
        tenant_name: &str,
        limit_kind: &str,
        current_usage: i64,
        limit: i64,
    ) -> Self {
        Self {
            event_type: "limit_reached".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            tenant_id: tenant_id.to_string(),
            tenant_name: tenant_name.to_string(),
            details: serde_json::json!({
                "limit_kind": limit_kind,
                "current_usage": current_usage,
                "limit": limit,
            }),
        }
    }
}

/// Compute HMAC-SHA256 of `payload` using `secret`.
/// Returns "sha256=<lowercase hex digest>".
fn hmac_sha256_hex(secret: &str, payload: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(payload);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

/// Handle for enqueueing events toward the dispatcher loop.
///
/// With no configured URLs the handle is a silent no-op. `notify` never
/// blocks: a full queue drops the event with a warning.
#[derive(Clone)]
pub struct WebhookDispatcher {
    tx: Option<mpsc::Sender<WebhookEvent>>,
}

impl WebhookDispatcher {
    /// A dispatcher with no endpoints; every `notify` is a no-op.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Spawn the dispatcher loop. Call once at startup.
    pub fn spawn(urls: Vec<String>, signing_secret: Option<String>) -> Self {
        if urls.is_empty() {
            return Self::disabled();
        }

        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        tokio::spawn(deliver_loop(rx, urls, signing_secret));
        Self { tx: Some(tx) }
    }

    /// Enqueue an event, fire-and-forget.
    pub fn notify(&self, event: WebhookEvent) {
        let Some(tx) = &self.tx else {
            debug!("no webhook endpoints configured, skipping dispatch");
            return;
        };
        if let Err(e) = tx.try_send(event) {
            warn!(error = %e, "webhook queue full or closed, event dropped");
        }
    }
}

async fn deliver_loop(
    mut rx: mpsc::Receiver<WebhookEvent>,
    urls: Vec<String>,
    signing_secret: Option<String>,
) {
    let client = reqwest::Client::builder()
        .timeout(DELIVERY_TIMEOUT)
        .user_agent("chat-notify-webhook/1.0")
        .build()
        .expect("failed to build webhook HTTP client");

    while let Some(event) = rx.recv().await {
        let payload = match serde_json::to_vec(&event) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "webhook serialize error, event dropped");
                continue;
            }
        };
        let delivery_id = Uuid::new_v4().to_string();
        let signature = signing_secret
            .as_deref()
            .map(|s| hmac_sha256_hex(s, &payload));

        for url in &urls {
            let mut req = client
                .post(url)
                .header("content-type", "application/json")
                .header("x-notify-delivery-id", &delivery_id)
                .header("x-notify-event", &event.event_type);

            if let Some(ref sig) = signature {
                req = req.header("x-notify-signature", sig.as_str());
            }

            match req.body(payload.clone()).send().await {
                Ok(resp) if resp.status().is_success() => {
                    info!(
                        url,
                        event_type = %event.event_type,
                        delivery_id = %delivery_id,
                        status = %resp.status(),
                        "webhook delivered"
                    );
                }
                Ok(resp) => {
                    warn!(
                        url,
                        event_type = %event.event_type,
                        delivery_id = %delivery_id,
                        status = %resp.status(),
                        "webhook delivery failed (non-2xx)"
                    );
                }
                Err(e) => {
                    warn!(
                        url,
                        event_type = %event.event_type,
                        delivery_id = %delivery_id,
                        error = %e,
                        "webhook request error"
                    );
                }
            }
        }
    }
}
