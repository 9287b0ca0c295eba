//! # Provider Records
//!
//! A bucket `(namespace, level, index)` is the DHT resource named
//! `"{namespace},{level},{index}"`. It holds a `REDIR` dictionary keyed by
//! the registrant's node id in hex; the value is the namespace, so a record
//! filed under the wrong bucket can be detected.

use crate::domain::errors::RedirError;
use shared_types::{
    well_known, DataValue, NodeId, ResourceId, StoreKindData, StoredData, StoredDataSpecifier,
    StoredValue, Timestamp,
};

/// Name of the resource holding a bucket.
#[must_use]
pub fn bucket_name(namespace: &str, level: u32, index: u64) -> String {
    format!("{namespace},{level},{index}")
}

/// Resource id of a bucket.
#[must_use]
pub fn bucket_resource(namespace: &str, level: u32, index: u64) -> ResourceId {
    ResourceId::from_name(&bucket_name(namespace, level, index))
}

/// The record announcing `provider` under `namespace`.
#[must_use]
pub fn provider_record(
    provider: NodeId,
    namespace: &str,
    now_ms: Timestamp,
    lifetime_secs: u32,
) -> StoreKindData {
    let value = StoredData::new(
        now_ms,
        lifetime_secs,
        StoredValue::Dictionary {
            key: provider.0.to_hex(),
            value: DataValue::new(namespace.as_bytes().to_vec()),
        },
    );
    StoreKindData::new(well_known::REDIR, 0, vec![value])
}

/// Specifier fetching every registrant of a bucket.
#[must_use]
pub fn all_registrants() -> StoredDataSpecifier {
    StoredDataSpecifier::dictionary(well_known::REDIR, Vec::new())
}

/// Registrants found in a bucket, sorted and deduplicated. Tombstones are
/// skipped.
///
/// # Errors
///
/// `ProtocolViolation` if a record is not a dictionary entry, has a malformed
/// key, or announces another namespace.
pub fn parse_registrants(namespace: &str, values: &[StoredData]) -> Result<Vec<NodeId>, RedirError> {
    let mut registrants = Vec::with_capacity(values.len());
    for data in values {
        let StoredValue::Dictionary { key, value } = &data.value else {
            return Err(RedirError::ProtocolViolation(
                "provider record is not a dictionary entry".to_string(),
            ));
        };
        if !value.exists {
            continue;
        }
        if value.value != namespace.as_bytes() {
            return Err(RedirError::ProtocolViolation(format!(
                "record for {key} announces namespace {:?}, expected {namespace:?}",
                String::from_utf8_lossy(&value.value)
            )));
        }
        let node_id = NodeId::from_hex(key).map_err(|err| {
            RedirError::ProtocolViolation(format!("malformed provider key {key:?}: {err}"))
        })?;
        registrants.push(node_id);
    }
    registrants.sort();
    registrants.dedup();
    Ok(registrants)
}
