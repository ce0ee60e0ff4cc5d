//! Shared fixtures for unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use plaza_common::PeerId;
use serde::de::DeserializeOwned;

use crate::outbound::Outbound;
use crate::protocol::Envelope;
use crate::signaling::{IceCandidate, MediaNegotiator, NegotiationError};

/// Records every outbound frame instead of sending it.
#[derive(Default)]
pub(crate) struct RecordingOutbound {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingOutbound {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Message types sent so far, in order.
    pub(crate) fn types(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(t, _)| t.clone())
            .collect()
    }

    /// Decoded payloads of every frame of `message_type`.
    pub(crate) fn payloads<T: DeserializeOwned>(&self, message_type: &str) -> Vec<T> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t == message_type)
            .map(|(_, data)| serde_json::from_str(data).unwrap())
            .collect()
    }

    pub(crate) fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

impl Outbound for RecordingOutbound {
    fn send(&self, message_type: &str, data: String) {
        self.sent
            .lock()
            .unwrap()
            .push((message_type.to_string(), data));
    }
}

/// Envelope carrying `payload` serialized as JSON.
pub(crate) fn envelope<T: serde::Serialize>(
    message_type: &str,
    sender: &str,
    payload: &T,
) -> Envelope {
    Envelope::new(
        message_type,
        PeerId::from(sender),
        serde_json::to_string(payload).unwrap(),
    )
}

/// Media layer stand-in that answers instantly and logs every call.
#[derive(Default)]
pub(crate) struct FakeNegotiator {
    log: Mutex<Vec<String>>,
    fail_offers: AtomicBool,
}

impl FakeNegotiator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing_offers() -> Self {
        let negotiator = Self::default();
        negotiator.fail_offers.store(true, Ordering::SeqCst);
        negotiator
    }

    pub(crate) fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl MediaNegotiator for FakeNegotiator {
    async fn create_offer(&self, peer: &PeerId) -> Result<String, NegotiationError> {
        self.record(format!("offer {peer}"));
        if self.fail_offers.load(Ordering::SeqCst) {
            return Err(NegotiationError::Media("no microphone".to_string()));
        }
        Ok(format!("v=0 offer-to-{peer}"))
    }

    async fn accept_offer(&self, peer: &PeerId, sdp: &str) -> Result<String, NegotiationError> {
        self.record(format!("accept-offer {peer} {sdp}"));
        Ok(format!("v=0 answer-to-{peer}"))
    }

    async fn accept_answer(&self, peer: &PeerId, sdp: &str) -> Result<(), NegotiationError> {
        self.record(format!("accept-answer {peer} {sdp}"));
        Ok(())
    }

    async fn add_remote_candidate(
        &self,
        peer: &PeerId,
        candidate: &IceCandidate,
    ) -> Result<(), NegotiationError> {
        self.record(format!("candidate {peer} {}", candidate.candidate));
        Ok(())
    }

    async fn close(&self, peer: &PeerId) {
        self.record(format!("close {peer}"));
    }
}
