//! Peer fixtures shared by the flows.

use node_runtime::{InMemoryNetwork, OverlayPeer, PeerConfig};
use shared_types::{
    now_millis, well_known, DataValue, NodeId, StoreKindData, StoredData, StoredValue, ID_LEN,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on any awaited answer.
pub const ANSWER_TIMEOUT: Duration = Duration::from_secs(5);

/// Node id with `b` as its leading byte.
pub fn node(b: u8) -> NodeId {
    let mut bytes = [0u8; ID_LEN];
    bytes[0] = b;
    NodeId::new(bytes)
}

/// Await `future`, panicking if it outlives [`ANSWER_TIMEOUT`].
pub async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(ANSWER_TIMEOUT, future)
        .await
        .expect("no answer in time")
}

/// One overlay of peers on a shared network.
pub struct Overlay {
    pub name: String,
    pub peers: Vec<Arc<OverlayPeer>>,
}

impl Overlay {
    /// Start one peer per leading byte in `ids`.
    pub fn start(network: &Arc<InMemoryNetwork>, name: &str, ids: &[u8]) -> Self {
        let peers = ids
            .iter()
            .map(|b| OverlayPeer::start(PeerConfig::new(node(*b), name), network).unwrap())
            .collect();
        Self {
            name: name.to_string(),
            peers,
        }
    }

    /// Add a peer built from `config`.
    pub fn join(&mut self, network: &Arc<InMemoryNetwork>, config: PeerConfig) -> Arc<OverlayPeer> {
        assert_eq!(config.overlay, self.name);
        let peer = OverlayPeer::start(config, network).unwrap();
        self.peers.push(peer.clone());
        peer
    }

    /// The peer whose id leads with `b`.
    pub fn peer(&self, b: u8) -> &Arc<OverlayPeer> {
        self.peers
            .iter()
            .find(|p| p.node_id() == node(b))
            .expect("no such peer")
    }
}

/// A `SIP-REGISTRATION` entry under `key`.
pub fn sip_registration(key: &str, contact: &str) -> StoreKindData {
    StoreKindData::new(
        well_known::SIP_REGISTRATION,
        1,
        vec![StoredData::new(
            now_millis(),
            3600,
            StoredValue::Dictionary {
                key: key.to_string(),
                value: DataValue::new(contact.as_bytes().to_vec()),
            },
        )],
    )
}

/// A `TURN-SERVICE` value.
pub fn turn_service(payload: &[u8]) -> StoreKindData {
    StoreKindData::new(
        well_known::TURN_SERVICE,
        1,
        vec![StoredData::new(
            now_millis(),
            3600,
            StoredValue::Single(DataValue::new(payload.to_vec())),
        )],
    )
}
