//! # Message and Data Security
//!
//! The overlay treats signing and access control as opaque capabilities:
//!
//! - `SecurityBlock` signs and verifies byte strings on behalf of a peer.
//! - `AccessController` decides whether a request may be served and whether a
//!   stored value's signature is acceptable.
//!
//! `HmacSecurityBlock` implements signing with HMAC-SHA256 under an
//! overlay-wide key. Its signature embeds the signer's node id so any holder
//! of the key can verify without knowing the signer in advance.

use crate::codec::{encode_stored_value, signable_bytes, Writer};
use crate::data_model::{KindId, StoredData};
use crate::errors::CodecError;
use crate::identifiers::{NodeId, ResourceId, ID_LEN};
use crate::message::Message;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 output length.
const MAC_LEN: usize = 32;

/// Signing capability of one peer.
pub trait SecurityBlock: Send + Sync {
    /// Identity the signatures are made under.
    fn identity(&self) -> NodeId;

    /// Sign `payload`.
    fn sign(&self, payload: &[u8]) -> Vec<u8>;

    /// Check `signature` over `payload`.
    fn verify(&self, payload: &[u8], signature: &[u8]) -> bool;
}

/// Authorization decisions for the peer.
pub trait AccessController: Send + Sync {
    /// Whether a request arriving at this peer may be served.
    fn request_permitted(&self, message: &Message) -> bool;

    /// Whether a signed value may be written under `resource`.
    fn data_signature_valid(&self, resource: &ResourceId, kind: KindId, data: &StoredData) -> bool;
}

/// Bytes covered by a stored value's signature.
pub fn stored_data_signable_bytes(
    resource: &ResourceId,
    kind: KindId,
    data: &StoredData,
) -> Result<Vec<u8>, CodecError> {
    let mut w = Writer::new();
    w.bytes8("resource", resource.as_bytes())?;
    w.u32(kind);
    w.u64(data.storage_time);
    w.u32(data.lifetime);
    encode_stored_value(&mut w, &data.value)?;
    Ok(w.into_bytes())
}

/// Sign `message` in place.
pub fn sign_message(security: &dyn SecurityBlock, message: &mut Message) -> Result<(), CodecError> {
    let payload = signable_bytes(message)?;
    message.signature = security.sign(&payload);
    Ok(())
}

/// Verify the signature on `message`. Unsigned messages fail.
#[must_use]
pub fn verify_message(security: &dyn SecurityBlock, message: &Message) -> bool {
    if message.signature.is_empty() {
        return false;
    }
    signable_bytes(message)
        .map(|payload| security.verify(&payload, &message.signature))
        .unwrap_or(false)
}

/// Sign a value about to be stored under `resource`.
pub fn sign_stored_data(
    security: &dyn SecurityBlock,
    resource: &ResourceId,
    kind: KindId,
    data: &mut StoredData,
) -> Result<(), CodecError> {
    let payload = stored_data_signable_bytes(resource, kind, data)?;
    data.signature = security.sign(&payload);
    Ok(())
}

// =============================================================================
// HMAC IMPLEMENTATION
// =============================================================================

/// HMAC-SHA256 signer keyed per overlay.
#[derive(Clone)]
pub struct HmacSecurityBlock {
    identity: NodeId,
    key: Vec<u8>,
}

impl HmacSecurityBlock {
    /// Signer for `identity` under the overlay `key`.
    #[must_use]
    pub fn new(identity: NodeId, key: impl Into<Vec<u8>>) -> Self {
        Self {
            identity,
            key: key.into(),
        }
    }

    fn mac(&self, signer: &NodeId, payload: &[u8]) -> Option<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.key).ok()?;
        mac.update(signer.as_bytes());
        mac.update(payload);
        Some(mac)
    }

    /// Signer id embedded in a signature produced by this scheme.
    #[must_use]
    pub fn signer_of(signature: &[u8]) -> Option<NodeId> {
        if signature.len() != ID_LEN + MAC_LEN {
            return None;
        }
        NodeId::from_slice(&signature[..ID_LEN]).ok()
    }
}

impl std::fmt::Debug for HmacSecurityBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacSecurityBlock")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

impl SecurityBlock for HmacSecurityBlock {
    fn identity(&self) -> NodeId {
        self.identity
    }

    fn sign(&self, payload: &[u8]) -> Vec<u8> {
        let mut out = self.identity.as_bytes().to_vec();
        // HMAC accepts keys of any length, so the mac is always constructible.
        if let Some(mac) = self.mac(&self.identity, payload) {
            out.extend_from_slice(&mac.finalize().into_bytes());
        }
        out
    }

    fn verify(&self, payload: &[u8], signature: &[u8]) -> bool {
        let Some(signer) = Self::signer_of(signature) else {
            debug!(len = signature.len(), "Malformed signature");
            return false;
        };
        match self.mac(&signer, payload) {
            Some(mac) => mac.verify_slice(&signature[ID_LEN..]).is_ok(),
            None => false,
        }
    }
}

// =============================================================================
// ACCESS CONTROLLERS
// =============================================================================

/// Grants everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveAccessController;

impl AccessController for PermissiveAccessController {
    fn request_permitted(&self, _message: &Message) -> bool {
        true
    }

    fn data_signature_valid(&self, _resource: &ResourceId, _kind: KindId, _data: &StoredData) -> bool {
        true
    }
}

/// Requires valid overlay-key signatures on requests and stored values.
#[derive(Clone)]
pub struct HmacAccessController {
    verifier: Arc<HmacSecurityBlock>,
}

impl HmacAccessController {
    /// Verify with the given signer (any identity under the overlay key).
    #[must_use]
    pub fn new(verifier: Arc<HmacSecurityBlock>) -> Self {
        Self { verifier }
    }
}

impl AccessController for HmacAccessController {
    fn request_permitted(&self, message: &Message) -> bool {
        verify_message(self.verifier.as_ref(), message)
    }

    fn data_signature_valid(&self, resource: &ResourceId, kind: KindId, data: &StoredData) -> bool {
        stored_data_signable_bytes(resource, kind, data)
            .map(|payload| self.verifier.verify(&payload, &data.signature))
            .unwrap_or(false)
    }
}
