//! Call Signaling Relay.
//!
//! Negotiates one voice session per remote roster peer by relaying
//! offer/answer/candidate payloads over the session transport. The media
//! pipeline itself sits behind [`MediaNegotiator`].
//!
//! Initiator rule: the peer already present in the room offers to the
//! newcomer. Peers learned from a roster snapshot wait for an offer.

mod negotiator;
mod relay;
mod types;


pub use negotiator::{MediaNegotiator, NegotiationError};
pub use relay::{CallRelay, SUBSCRIBED_TYPES};
pub use types::{CallConfig, CallEvent, CallSession, CallState, IceCandidate, MediaState};
