//! # Gateway Flows
//!
//! Two overlays joined by one gateway node present in both.
//!
//! ```text
//!   red: 0x20 0x90 [G=0x50]          blue: 0x30 0xC0 [G=0x50]
//!                    │  registers "blue"       │  registers "red"
//!                    └──────── bridge ─────────┘
//! ```
//!
//! A red peer resolves "blue" through red ReDiR, sends to G, G hands the
//! message into blue, and the answer retraces the same path.

#[cfg(test)]
mod tests {
    use crate::integration::support::{node, sip_registration, turn_service, within, Overlay};
    use node_runtime::{InMemoryNetwork, OverlayPeer, PeerConfig};
    use rl_01_storage::StorageApi;
    use rl_02_routing::{RoutingApi, RoutingError};
    use rl_04_gateway::GatewayError;
    use shared_bus::{EventFilter, EventTopic, OverlayEvent};
    use shared_types::{
        well_known, Destination, ErrorCode, MessageBody, OverlayForwardingOptions, ResourceId,
        StoredDataSpecifier, ID_LEN,
    };
    use std::sync::Arc;

    const GATEWAY: u8 = 0x50;

    struct Federation {
        red: Overlay,
        blue: Overlay,
        red_gateway: Arc<OverlayPeer>,
        blue_gateway: Arc<OverlayPeer>,
    }

    async fn federation() -> Federation {
        let network = InMemoryNetwork::new();
        let mut red = Overlay::start(&network, "red", &[0x20, 0x90]);
        let mut blue = Overlay::start(&network, "blue", &[0x30, 0xC0]);

        let red_gateway = red.join(&network, PeerConfig::new(node(GATEWAY), "red").serving("blue"));
        let blue_gateway =
            blue.join(&network, PeerConfig::new(node(GATEWAY), "blue").serving("red"));
        red_gateway.bridge(&blue_gateway);

        within(red_gateway.announce()).await.unwrap();
        within(blue_gateway.announce()).await.unwrap();

        Federation {
            red,
            blue,
            red_gateway,
            blue_gateway,
        }
    }

    fn turn_spec() -> Vec<StoredDataSpecifier> {
        vec![StoredDataSpecifier::single(well_known::TURN_SERVICE)]
    }

    // =========================================================================
    // FETCH / STORE ACROSS OVERLAYS
    // =========================================================================

    #[tokio::test]
    async fn test_red_peer_fetches_value_stored_in_blue() {
        let f = federation().await;
        let resource = ResourceId::new([0xB0; ID_LEN]);
        within(f.blue.peer(0x30).store(resource, vec![turn_service(b"blue-turn")]))
            .await
            .unwrap();

        let answer = within(f.red.peer(0x20).fetch_in("blue", resource, turn_spec()))
            .await
            .unwrap();

        let values = &answer.kind_responses[0].values;
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].value.data_value().value, b"blue-turn".to_vec());
    }

    #[tokio::test]
    async fn test_value_held_by_gateway_itself_is_answered() {
        let f = federation().await;
        // 0x40 falls to the gateway in both rings.
        let resource = ResourceId::new([0x40; ID_LEN]);
        within(f.blue.peer(0xC0).store(resource, vec![turn_service(b"at-gateway")]))
            .await
            .unwrap();
        assert!(f.blue_gateway.storage().store_kind_data_for(&resource).is_some());

        let answer = within(f.red.peer(0x90).fetch_in("blue", resource, turn_spec()))
            .await
            .unwrap();
        assert_eq!(
            answer.kind_responses[0].values[0].value.data_value().value,
            b"at-gateway".to_vec()
        );
    }

    #[tokio::test]
    async fn test_blue_peer_stores_into_red() {
        let f = federation().await;
        let resource = ResourceId::new([0x80; ID_LEN]);

        let stored = within(f.blue.peer(0xC0).store_in(
            "red",
            resource,
            vec![sip_registration("carol", "sip:carol@blue")],
        ))
        .await
        .unwrap();
        assert_eq!(stored.kinds.len(), 1);

        // 0x90 succeeds 0x80 in red.
        assert!(f.red.peer(0x90).storage().store_kind_data_for(&resource).is_some());
        let local = within(f.red.peer(0x20).fetch(
            resource,
            vec![StoredDataSpecifier::dictionary(
                well_known::SIP_REGISTRATION,
                vec!["carol".to_string()],
            )],
        ))
        .await
        .unwrap();
        assert_eq!(local.kind_responses[0].values.len(), 1);
    }

    #[tokio::test]
    async fn test_gateway_resolved_once_per_namespace() {
        let f = federation().await;
        let requester = f.red.peer(0x20);
        let resource = ResourceId::new([0xB0; ID_LEN]);

        for _ in 0..3 {
            within(requester.fetch_in("blue", resource, turn_spec()))
                .await
                .unwrap();
        }

        assert_eq!(requester.gateway().lookups_started(), 1);
        assert_eq!(
            requester.gateway().cached_gateway("blue"),
            Some(f.red_gateway.node_id())
        );
    }

    #[tokio::test]
    async fn test_remote_rejection_crosses_back() {
        let f = federation().await;
        let huge = vec![0u8; 64 * 1024 + 1];

        let err = within(f.red.peer(0x20).store_in(
            "blue",
            ResourceId::new([0xB0; ID_LEN]),
            vec![turn_service(&huge)],
        ))
        .await
        .unwrap_err();
        assert!(
            matches!(err, GatewayError::Remote { code: ErrorCode::DataTooLarge, .. }),
            "{err:?}"
        );
    }

    // =========================================================================
    // FAILURES
    // =========================================================================

    #[tokio::test]
    async fn test_unserved_namespace_fails_lookup_with_event() {
        let f = federation().await;
        let requester = f.red.peer(0x90);
        let mut events = requester
            .events()
            .subscribe(EventFilter::topics(vec![EventTopic::Gateway]));

        let err = within(requester.fetch_in("green", ResourceId::from_name("x"), turn_spec()))
            .await
            .unwrap_err();
        assert!(
            matches!(err, GatewayError::LookupFailed { ref namespace, .. } if namespace == "green"),
            "{err:?}"
        );

        let event = within(events.recv()).await.unwrap();
        assert!(matches!(
            event,
            OverlayEvent::GatewayRequestFailed { ref namespace, request: "fetch", .. }
                if namespace == "green"
        ));
        assert_eq!(requester.gateway().cached_gateway("green"), None);
    }

    #[tokio::test]
    async fn test_relayed_request_to_unserved_namespace_answered_with_error() {
        let f = federation().await;
        let requester = f.red.peer(0x20);
        let request = requester
            .router()
            .create_message(Destination::Node(node(GATEWAY)), MessageBody::PingReq)
            .unwrap()
            .with_overlay_options(OverlayForwardingOptions::new("red", "green"));

        // Answered by the gateway, well inside the request timeout.
        let err = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            requester.router().request_message(request),
        )
        .await
        .expect("no answer from gateway")
        .unwrap_err();
        assert!(
            matches!(err, RoutingError::Remote { code: ErrorCode::NotFound, .. }),
            "{err:?}"
        );
        assert_eq!(f.red_gateway.gateway().queued("green"), 0);
    }

    #[tokio::test]
    async fn test_requests_time_out_once_far_gateway_leaves() {
        let f = federation().await;
        let requester = f.red.peer(0x20);
        let resource = ResourceId::new([0xB0; ID_LEN]);
        within(requester.fetch_in("blue", resource, turn_spec()))
            .await
            .unwrap();

        f.blue_gateway.shutdown();

        let err = within(requester.fetch_in("blue", resource, turn_spec()))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Routing(_)), "{err:?}");
    }
}
