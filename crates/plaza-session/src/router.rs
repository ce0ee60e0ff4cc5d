//! Message Router: fans inbound envelopes out to subscribers by type.
//!
//! Each subscription is a channel, so a subscriber that has gone away (or
//! fails while handling a message on its own turn) never blocks delivery to
//! the others. Messages sent by the local peer are dropped before dispatch,
//! except the self-addressed `welcome`, from which the router learns the
//! local identity.

use std::collections::HashMap;

use plaza_common::PeerId;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::protocol::{message_types, Envelope};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Receiving end of a subscription.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub rx: mpsc::UnboundedReceiver<Envelope>,
}

struct Subscriber {
    id: SubscriptionId,
    tx: mpsc::UnboundedSender<Envelope>,
}

#[derive(Default)]
pub struct MessageRouter {
    local_id: Option<PeerId>,
    next_id: u64,
    /// Subscribers per message type, in subscription order.
    subscribers: HashMap<String, Vec<Subscriber>>,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one or more message types with a single receiver.
    pub fn subscribe(&mut self, message_types: &[&str]) -> Subscription {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        let (tx, rx) = mpsc::unbounded_channel();
        for message_type in message_types {
            self.subscribers
                .entry((*message_type).to_string())
                .or_default()
                .push(Subscriber { id, tx: tx.clone() });
        }
        Subscription { id, rx }
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        for subscribers in self.subscribers.values_mut() {
            subscribers.retain(|s| s.id != id);
        }
        self.subscribers.retain(|_, subscribers| !subscribers.is_empty());
    }

    /// Deliver `envelope` to every subscriber of its type, in subscription
    /// order. Returns the number of subscribers reached.
    pub fn publish(&mut self, envelope: Envelope) -> usize {
        if envelope.message_type == message_types::WELCOME {
            debug!(peer = %envelope.sender_id, "Local identity assigned");
            self.local_id = Some(envelope.sender_id.clone());
        } else if self.local_id.as_ref() == Some(&envelope.sender_id) {
            trace!(message_type = %envelope.message_type, "Dropping loop-back message");
            return 0;
        }

        let Some(subscribers) = self.subscribers.get_mut(&envelope.message_type) else {
            trace!(message_type = %envelope.message_type, "No subscribers");
            return 0;
        };

        let mut delivered = 0;
        subscribers.retain(|subscriber| match subscriber.tx.send(envelope.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(_) => {
                debug!(message_type = %envelope.message_type, "Pruning closed subscriber");
                false
            }
        });
        delivered
    }

    pub fn local_id(&self) -> Option<&PeerId> {
        self.local_id.as_ref()
    }

    /// Forget the local identity (transport disconnected).
    pub fn clear_local_id(&mut self) {
        self.local_id = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(message_type: &str, sender: &str) -> Envelope {
        Envelope::new(message_type, PeerId::from(sender), "{}".to_string())
    }

    #[test]
    fn delivers_in_subscription_order_by_type() {
        let mut router = MessageRouter::new();
        let mut first = router.subscribe(&[message_types::ROOM_JOIN]);
        let mut second = router.subscribe(&[message_types::ROOM_JOIN, message_types::ROOM_LEAVE]);

        assert_eq!(router.publish(env(message_types::ROOM_JOIN, "a")), 2);
        assert_eq!(router.publish(env(message_types::ROOM_LEAVE, "a")), 1);

        assert_eq!(first.rx.try_recv().unwrap().message_type, "room-join");
        assert!(first.rx.try_recv().is_err());
        assert_eq!(second.rx.try_recv().unwrap().message_type, "room-join");
        assert_eq!(second.rx.try_recv().unwrap().message_type, "room-leave");
    }

    #[test]
    fn unsubscribed_receiver_gets_nothing() {
        let mut router = MessageRouter::new();
        let mut sub = router.subscribe(&[message_types::ROOM_JOIN]);
        router.unsubscribe(sub.id);
        assert_eq!(router.publish(env(message_types::ROOM_JOIN, "a")), 0);
        assert!(sub.rx.try_recv().is_err());
    }

    #[test]
    fn dropped_subscriber_does_not_block_others() {
        let mut router = MessageRouter::new();
        let dead = router.subscribe(&[message_types::VR_POSITION]);
        let mut alive = router.subscribe(&[message_types::VR_POSITION]);
        drop(dead);

        assert_eq!(router.publish(env(message_types::VR_POSITION, "a")), 1);
        assert!(alive.rx.try_recv().is_ok());
    }

    #[test]
    fn welcome_sets_identity_and_is_delivered() {
        let mut router = MessageRouter::new();
        let mut sub = router.subscribe(&[message_types::WELCOME]);
        assert_eq!(router.publish(Envelope::welcome(PeerId::from("me"))), 1);
        assert_eq!(router.local_id(), Some(&PeerId::from("me")));
        assert!(sub.rx.try_recv().unwrap().is_welcome());
    }

    #[test]
    fn loop_back_messages_are_dropped() {
        let mut router = MessageRouter::new();
        let mut sub = router.subscribe(&[message_types::ROOM_AVAILABLE]);
        router.publish(Envelope::welcome(PeerId::from("me")));

        assert_eq!(router.publish(env(message_types::ROOM_AVAILABLE, "me")), 0);
        assert_eq!(router.publish(env(message_types::ROOM_AVAILABLE, "other")), 1);
        assert_eq!(sub.rx.try_recv().unwrap().sender_id, PeerId::from("other"));
        assert!(sub.rx.try_recv().is_err());
    }

    #[test]
    fn clearing_identity_stops_loop_back_filter() {
        let mut router = MessageRouter::new();
        let _sub = router.subscribe(&[message_types::ROOM_AVAILABLE]);
        router.publish(Envelope::welcome(PeerId::from("me")));
        router.clear_local_id();
        assert_eq!(router.publish(env(message_types::ROOM_AVAILABLE, "me")), 1);
    }
}
