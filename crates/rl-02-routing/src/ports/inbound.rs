//! # Driving Ports (Inbound API)
//!
//! The API the transport's receive loop, ReDiR and the gateway relay use.

use crate::domain::{PeerState, RoutingError};
use async_trait::async_trait;
use shared_types::{Destination, Message, MessageBody, NodeId};

/// Router API.
#[async_trait]
pub trait RoutingApi: Send + Sync {
    /// This peer's id.
    fn node_id(&self) -> NodeId;

    /// This peer's overlay.
    fn overlay_name(&self) -> &str;

    /// Current lifecycle state.
    fn state(&self) -> PeerState;

    /// A signed request toward `destination` with a fresh transaction id.
    fn create_message(
        &self,
        destination: Destination,
        body: MessageBody,
    ) -> Result<Message, RoutingError>;

    /// Sign `message` with this peer's security block.
    fn sign(&self, message: &mut Message) -> Result<(), RoutingError>;

    /// Process a message that arrived from the network.
    fn on_receive(&self, message: Message);

    /// Process a message handed over locally (e.g. by a gateway). Skips loop
    /// detection.
    fn inject(&self, message: Message);

    /// Route a locally built message toward the head of its destination list.
    fn submit(&self, message: Message) -> Result<(), RoutingError>;

    /// Send a request and wait for its answer body.
    ///
    /// # Errors
    ///
    /// - `Timeout`: no answer within the configured timeout
    /// - `Remote`: the answer was an `Error` message
    /// - `ShuttingDown`: the peer left while waiting
    async fn request(
        &self,
        destination: Destination,
        body: MessageBody,
    ) -> Result<MessageBody, RoutingError>;

    /// Send an already built request and wait for its answer body.
    async fn request_message(&self, message: Message) -> Result<MessageBody, RoutingError>;
}
