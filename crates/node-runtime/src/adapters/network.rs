//! # In-Memory Network
//!
//! Moves encoded messages between peers of the same process. Every peer
//! attaches an inbox under its address; `send` encodes the message with the
//! wire codec and drops the bytes into the target's inbox. The receiving
//! peer decodes them again, so the codec runs on every hop.

use crate::adapters::topology::RingMembership;
use async_trait::async_trait;
use dashmap::DashMap;
use rl_02_routing::{PeerContact, Transport, TransportError};
use shared_types::codec::encode_message;
use shared_types::{Message, NodeId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Inbox of one attached peer.
pub type Inbox = mpsc::UnboundedReceiver<Vec<u8>>;

/// Shared fabric connecting in-process peers.
#[derive(Default)]
pub struct InMemoryNetwork {
    inboxes: DashMap<String, mpsc::UnboundedSender<Vec<u8>>>,
    rings: DashMap<String, Arc<RingMembership>>,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl InMemoryNetwork {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Conventional address of `node_id` in `overlay`.
    #[must_use]
    pub fn address_of(overlay: &str, node_id: &NodeId) -> String {
        format!("mem://{overlay}/{}", node_id.as_identifier().to_hex())
    }

    /// Start receiving at `address`. Returns `None` if the address is taken.
    pub fn attach(&self, address: &str) -> Option<Inbox> {
        let (tx, rx) = mpsc::unbounded_channel();
        match self.inboxes.entry(address.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => None,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(tx);
                Some(rx)
            }
        }
    }

    /// Stop receiving at `address`. The inbox closes once drained.
    pub fn detach(&self, address: &str) {
        self.inboxes.remove(address);
    }

    #[must_use]
    pub fn is_attached(&self, address: &str) -> bool {
        self.inboxes.contains_key(address)
    }

    /// Membership of `overlay`, created on first use.
    #[must_use]
    pub fn ring(&self, overlay: &str) -> Arc<RingMembership> {
        self.rings
            .entry(overlay.to_string())
            .or_insert_with(|| Arc::new(RingMembership::default()))
            .clone()
    }

    /// Messages handed to an inbox so far.
    #[must_use]
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Messages sent to an address nobody listens on.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn deliver(&self, address: &str, bytes: Vec<u8>) -> Result<(), TransportError> {
        let sent = self
            .inboxes
            .get(address)
            .map(|inbox| inbox.send(bytes).is_ok())
            .unwrap_or(false);
        if sent {
            self.delivered.fetch_add(1, Ordering::Relaxed);
            Ok(())
        } else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            Err(TransportError::Unreachable(address.to_string()))
        }
    }
}

#[async_trait]
impl Transport for InMemoryNetwork {
    async fn send(&self, message: Message, next_hop: PeerContact) -> Result<(), TransportError> {
        let bytes = encode_message(&message)?;
        debug!(
            to = %next_hop,
            tx = message.transaction_id(),
            bytes = bytes.len(),
            "Frame sent"
        );
        self.deliver(&next_hop.address, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::codec::decode_message;
    use shared_types::{Destination, MessageBody, StaticKindRegistry, ID_LEN};

    fn node(b: u8) -> NodeId {
        let mut bytes = [0u8; ID_LEN];
        bytes[0] = b;
        NodeId::new(bytes)
    }

    #[tokio::test]
    async fn test_send_delivers_encoded_frame() {
        let network = InMemoryNetwork::new();
        let address = InMemoryNetwork::address_of("red", &node(2));
        let mut inbox = network.attach(&address).unwrap();
        let message = Message::request(
            node(1),
            7,
            vec![Destination::Node(node(2))],
            MessageBody::PingReq,
        );

        network
            .send(message.clone(), PeerContact::new(node(2), address))
            .await
            .unwrap();

        let bytes = inbox.recv().await.unwrap();
        let decoded = decode_message(&bytes, &StaticKindRegistry::with_base_kinds()).unwrap();
        assert_eq!(decoded, message);
        assert_eq!(network.delivered(), 1);
    }

    #[tokio::test]
    async fn test_unknown_address_is_unreachable() {
        let network = InMemoryNetwork::new();
        let message = Message::request(node(1), 7, vec![], MessageBody::PingReq);
        let err = network
            .send(message, PeerContact::new(node(2), "mem://red/none"))
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::Unreachable("mem://red/none".into()));
        assert_eq!(network.dropped(), 1);
    }

    #[test]
    fn test_address_cannot_be_attached_twice() {
        let network = InMemoryNetwork::new();
        assert!(network.attach("mem://a").is_some());
        assert!(network.attach("mem://a").is_none());
        network.detach("mem://a");
        assert!(!network.is_attached("mem://a"));
        assert!(network.attach("mem://a").is_some());
    }

    #[test]
    fn test_rings_are_per_overlay() {
        let network = InMemoryNetwork::new();
        assert!(Arc::ptr_eq(&network.ring("red"), &network.ring("red")));
        assert!(!Arc::ptr_eq(&network.ring("red"), &network.ring("blue")));
    }
}
