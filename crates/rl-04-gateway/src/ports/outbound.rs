//! # Driven Ports (Outbound SPI)
//!
//! The relay talks to its overlay only through these traits; the peer
//! runtime adapts the router and the ReDiR service to them.

use crate::domain::errors::GatewayError;
use async_trait::async_trait;
use shared_types::{Destination, ErrorAnswer, Message, MessageBody, NodeId};

/// Access to the local overlay's router.
#[async_trait]
pub trait OverlayMessenger: Send + Sync {
    /// This peer's id.
    fn local_node_id(&self) -> NodeId;

    /// A signed request with a fresh transaction id.
    fn create_message(
        &self,
        destination: Destination,
        body: MessageBody,
    ) -> Result<Message, GatewayError>;

    /// Replace the message signature with this peer's.
    fn sign(&self, message: &mut Message) -> Result<(), GatewayError>;

    /// Route a message toward the head of its destination list.
    fn submit(&self, message: Message) -> Result<(), GatewayError>;

    /// Answer `request` with an `Error` carrying `error`.
    fn reject(&self, request: &Message, error: ErrorAnswer) -> Result<(), GatewayError>;

    /// Hand a message to the local router as if it had just arrived.
    fn deliver_local(&self, message: Message);

    /// Send a request and wait for the answer body.
    async fn request(&self, message: Message) -> Result<MessageBody, GatewayError>;
}

/// Resolves a namespace to the node serving it.
#[async_trait]
pub trait ServiceResolver: Send + Sync {
    async fn resolve(&self, namespace: &str) -> Result<NodeId, GatewayError>;
}
