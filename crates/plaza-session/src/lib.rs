pub mod outbound;
pub mod participant;
pub mod pose;
pub mod protocol;
pub mod replication;
pub mod room;
pub mod router;
pub mod signaling;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use outbound::Outbound;
pub use participant::{Participant, ParticipantConfig, SessionEvent};
pub use pose::{AvatarPose, Quat, TrackedPose, Vec3};
pub use protocol::{message_types, Envelope, RoomInfo, RoomKind};
pub use replication::{ReplicationConfig, ReplicationEngine};
pub use room::{HostLossPolicy, LeaveReason, Phase, RoomConfig, RoomEvent, RoomManager, RosterEntry};
pub use router::{MessageRouter, Subscription, SubscriptionId};
pub use signaling::{
    CallConfig, CallEvent, CallRelay, CallState, IceCandidate, MediaNegotiator, MediaState,
    NegotiationError,
};
pub use transport::{TransportClient, TransportConfig, TransportEvent};
