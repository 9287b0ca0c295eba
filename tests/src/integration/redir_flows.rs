//! # ReDiR Flows
//!
//! Providers register a namespace through the DHT of a live ring; any peer
//! then resolves the provider closest after its key.

#[cfg(test)]
mod tests {
    use crate::integration::support::{node, within, Overlay};
    use node_runtime::{InMemoryNetwork, PeerConfig};
    use rl_01_storage::StorageApi;
    use rl_03_redir::{bucket_resource, RedirApi, RedirError};
    use shared_bus::{EventFilter, EventTopic, OverlayEvent};

    fn ring() -> Overlay {
        Overlay::start(
            &InMemoryNetwork::new(),
            "red",
            &[0x08, 0x28, 0x48, 0x68, 0x88, 0xA8, 0xC8, 0xE8],
        )
    }

    #[tokio::test]
    async fn test_announced_provider_found_by_every_peer() {
        let network = InMemoryNetwork::new();
        let mut overlay = Overlay::start(&network, "red", &[0x08, 0x48, 0x88, 0xC8]);
        let provider = overlay.join(&network, PeerConfig::new(node(0x60), "red").serving("voicemail"));

        let registrations = within(provider.announce()).await.unwrap();
        assert_eq!(registrations.len(), 1);
        assert_eq!(registrations[0].namespace, "voicemail");
        assert_eq!(registrations[0].levels.first(), Some(&2));

        for peer in &overlay.peers {
            let found = within(peer.redir().lookup("voicemail")).await.unwrap();
            assert_eq!(found, node(0x60), "looked up from {}", peer.node_id());
        }
    }

    #[tokio::test]
    async fn test_lookup_picks_closest_successor_of_key() {
        let overlay = ring();
        for b in [0x28, 0x88, 0xE8] {
            within(overlay.peer(b).redir().register("stun")).await.unwrap();
        }

        let looker = overlay.peer(0x48).redir();
        assert_eq!(within(looker.lookup_key("stun", node(0x30))).await.unwrap(), node(0x88));
        assert_eq!(within(looker.lookup_key("stun", node(0x88))).await.unwrap(), node(0x88));
        assert_eq!(within(looker.lookup_key("stun", node(0xF0))).await.unwrap(), node(0x28));
        assert_eq!(within(looker.lookup("stun")).await.unwrap(), node(0x88));
    }

    #[tokio::test]
    async fn test_records_live_on_bucket_owners() {
        let overlay = ring();
        within(overlay.peer(0x68).redir().register("turn")).await.unwrap();

        let bucket = bucket_resource("turn", 2, 1);
        let holders = overlay
            .peers
            .iter()
            .filter(|p| p.storage().store_kind_data_for(&bucket).is_some())
            .count();
        assert_eq!(holders, 1);
    }

    #[tokio::test]
    async fn test_lookup_without_provider_fails_with_event() {
        let overlay = ring();
        let looker = overlay.peer(0x28);
        let mut events = looker.events().subscribe(EventFilter::topics(vec![EventTopic::Redir]));

        let err = within(looker.redir().lookup("nobody")).await.unwrap_err();
        assert_eq!(
            err,
            RedirError::LookupFailed {
                namespace: "nobody".into(),
                key: node(0x28)
            }
        );
        let event = within(events.recv()).await.unwrap();
        assert!(matches!(event, OverlayEvent::LookupFailed { ref namespace, .. } if namespace == "nobody"));
    }

    #[tokio::test]
    async fn test_registration_publishes_event_on_provider() {
        let overlay = ring();
        let provider = overlay.peer(0xC8);
        let mut events = provider.events().subscribe(EventFilter::topics(vec![EventTopic::Redir]));

        within(provider.redir().register("presence")).await.unwrap();

        let event = within(events.recv()).await.unwrap();
        assert!(matches!(
            event,
            OverlayEvent::RegistrationCompleted { ref namespace, node_id, .. }
                if namespace == "presence" && node_id == node(0xC8)
        ));
    }
}
