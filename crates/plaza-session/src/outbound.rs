//! Outbound seam between session components and the transport.

use serde::Serialize;
use tracing::warn;

/// Best-effort frame sink. Implementations never fail loudly: a send while
/// disconnected is logged and dropped.
pub trait Outbound: Send + Sync {
    fn send(&self, message_type: &str, data: String);
}

/// Serialize `payload` and hand it to `outbound`.
pub(crate) fn send_payload<T: Serialize>(outbound: &dyn Outbound, message_type: &str, payload: &T) {
    match serde_json::to_string(payload) {
        Ok(data) => outbound.send(message_type, data),
        Err(e) => warn!(message_type, error = %e, "Failed to encode outbound payload"),
    }
}
