//! Seam to the media pipeline.

use async_trait::async_trait;
use plaza_common::PeerId;

use super::types::IceCandidate;

#[derive(Debug, Clone, thiserror::Error)]
pub enum NegotiationError {
    #[error("invalid session description: {0}")]
    InvalidDescription(String),

    #[error("media layer error: {0}")]
    Media(String),
}

/// Produces and applies session descriptions for one peer connection per
/// remote peer. Implemented by the embedder's media layer.
#[async_trait]
pub trait MediaNegotiator: Send + Sync {
    /// Create a local offer toward `peer`.
    async fn create_offer(&self, peer: &PeerId) -> Result<String, NegotiationError>;

    /// Apply a remote offer and return the local answer.
    async fn accept_offer(&self, peer: &PeerId, sdp: &str) -> Result<String, NegotiationError>;

    async fn accept_answer(&self, peer: &PeerId, sdp: &str) -> Result<(), NegotiationError>;

    async fn add_remote_candidate(
        &self,
        peer: &PeerId,
        candidate: &IceCandidate,
    ) -> Result<(), NegotiationError>;

    /// Release everything held for `peer`. Must tolerate unknown peers.
    async fn close(&self, peer: &PeerId);
}
