//! # Storage Flows
//!
//! Store and Fetch routed to the responsible peer of a four peer ring.
//!
//! ```text
//! ring: 0x20 ── 0x60 ── 0xA0 ── 0xE0 ── (wraps)
//! resource 0x50.. lives on 0x60, resource 0xF0.. on 0x20
//! ```

#[cfg(test)]
mod tests {
    use crate::integration::support::{node, sip_registration, turn_service, within, Overlay};
    use node_runtime::InMemoryNetwork;
    use rl_01_storage::StorageApi;
    use rl_02_routing::RoutingError;
    use shared_types::security::sign_stored_data;
    use shared_types::{
        now_millis, well_known, ArrayRange, DataValue, ErrorCode, HmacSecurityBlock, ResourceId,
        StoreKindData, StoredData, StoredDataSpecifier, StoredValue, APPEND_INDEX, ID_LEN,
    };

    fn ring() -> Overlay {
        Overlay::start(&InMemoryNetwork::new(), "red", &[0x20, 0x60, 0xA0, 0xE0])
    }

    fn certificate(payload: &[u8]) -> StoreKindData {
        StoreKindData::new(
            well_known::CERTIFICATE_BY_NODE,
            1,
            vec![StoredData::new(
                now_millis(),
                3600,
                StoredValue::Array {
                    index: APPEND_INDEX,
                    value: DataValue::new(payload.to_vec()),
                },
            )],
        )
    }

    // =========================================================================
    // PLACEMENT
    // =========================================================================

    #[tokio::test]
    async fn test_value_lands_on_successor_of_resource() {
        let overlay = ring();
        let resource = ResourceId::new([0x50; ID_LEN]);

        within(overlay.peer(0xE0).store(resource, vec![turn_service(b"turn.example:3478")]))
            .await
            .unwrap();

        for peer in &overlay.peers {
            let holds = peer.storage().store_kind_data_for(&resource).is_some();
            assert_eq!(holds, peer.node_id() == node(0x60), "peer {}", peer.node_id());
        }
    }

    #[tokio::test]
    async fn test_resource_past_last_peer_wraps_to_first() {
        let overlay = ring();
        let resource = ResourceId::new([0xF0; ID_LEN]);

        within(overlay.peer(0x60).store(resource, vec![turn_service(b"wrap")]))
            .await
            .unwrap();

        assert!(overlay
            .peer(0x20)
            .storage()
            .store_kind_data_for(&resource)
            .is_some());
    }

    // =========================================================================
    // FETCH
    // =========================================================================

    #[tokio::test]
    async fn test_registration_visible_from_every_peer() {
        let overlay = ring();
        let resource = ResourceId::from_name("alice@example.com");

        within(overlay.peer(0x20).store(
            resource,
            vec![sip_registration("alice", "sip:alice@192.0.2.1")],
        ))
        .await
        .unwrap();

        for peer in &overlay.peers {
            let answer = within(peer.fetch(
                resource,
                vec![StoredDataSpecifier::dictionary(
                    well_known::SIP_REGISTRATION,
                    vec!["alice".to_string()],
                )],
            ))
            .await
            .unwrap();
            let response = &answer.kind_responses[0];
            assert_eq!(response.generation, 1);
            assert_eq!(response.values.len(), 1);
            assert_eq!(
                response.values[0].value.data_value().value,
                b"sip:alice@192.0.2.1".to_vec()
            );
        }
    }

    #[tokio::test]
    async fn test_appends_from_two_peers_fetched_by_range() {
        let overlay = ring();
        let resource = ResourceId::from_name("certificates");

        within(overlay.peer(0x20).store(resource, vec![certificate(b"cert-a")]))
            .await
            .unwrap();
        within(overlay.peer(0xA0).store(resource, vec![certificate(b"cert-b")]))
            .await
            .unwrap();

        let all = within(overlay.peer(0x60).fetch(
            resource,
            vec![StoredDataSpecifier::array(well_known::CERTIFICATE_BY_NODE, vec![]).unwrap()],
        ))
        .await
        .unwrap();
        assert_eq!(all.kind_responses[0].values.len(), 2);

        let second = within(overlay.peer(0x60).fetch(
            resource,
            vec![StoredDataSpecifier::array(
                well_known::CERTIFICATE_BY_NODE,
                vec![ArrayRange::new(1, 1)],
            )
            .unwrap()],
        ))
        .await
        .unwrap();
        let values = &second.kind_responses[0].values;
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].value.data_value().value, b"cert-b".to_vec());
    }

    #[tokio::test]
    async fn test_generation_floor_hides_older_values() {
        let overlay = ring();
        let resource = ResourceId::from_name("bob@example.com");

        within(overlay.peer(0x20).store(resource, vec![sip_registration("bob", "sip:bob@h1")]))
            .await
            .unwrap();

        let spec = StoredDataSpecifier::dictionary(well_known::SIP_REGISTRATION, vec![])
            .with_generation_floor(5);
        let answer = within(overlay.peer(0xE0).fetch(resource, vec![spec]))
            .await
            .unwrap();
        assert!(answer.kind_responses[0].values.is_empty());
    }

    // =========================================================================
    // REJECTIONS
    // =========================================================================

    #[tokio::test]
    async fn test_oversized_value_rejected_remotely() {
        let overlay = ring();
        let resource = ResourceId::new([0x50; ID_LEN]);
        let huge = vec![0u8; 64 * 1024 + 1];

        let err = within(overlay.peer(0x20).store(resource, vec![turn_service(&huge)]))
            .await
            .unwrap_err();
        assert!(
            matches!(err, RoutingError::Remote { code: ErrorCode::DataTooLarge, .. }),
            "{err:?}"
        );
        assert!(overlay
            .peer(0x60)
            .storage()
            .store_kind_data_for(&resource)
            .is_none());
    }

    #[tokio::test]
    async fn test_unknown_kind_rejected_remotely() {
        let overlay = ring();
        let resource = ResourceId::new([0x50; ID_LEN]);
        let unknown = StoreKindData::new(
            900,
            1,
            vec![StoredData::new(
                now_millis(),
                60,
                StoredValue::Single(DataValue::new(b"x".to_vec())),
            )],
        );

        let err = within(overlay.peer(0x20).store(resource, vec![unknown]))
            .await
            .unwrap_err();
        assert!(
            matches!(err, RoutingError::Remote { code: ErrorCode::UnknownKind, .. }),
            "{err:?}"
        );
    }

    #[tokio::test]
    async fn test_value_signed_under_foreign_key_forbidden() {
        let overlay = ring();
        let resource = ResourceId::new([0x50; ID_LEN]);
        let outsider = HmacSecurityBlock::new(node(0x99), b"not-this-overlay".to_vec());

        let mut kind_data = turn_service(b"forged");
        sign_stored_data(
            &outsider,
            &resource,
            well_known::TURN_SERVICE,
            &mut kind_data.values[0],
        )
        .unwrap();

        let err = within(overlay.peer(0x20).store(resource, vec![kind_data]))
            .await
            .unwrap_err();
        assert!(
            matches!(err, RoutingError::Remote { code: ErrorCode::Forbidden, .. }),
            "{err:?}"
        );
    }
}
