//! # DHT Client over the Router
//!
//! ReDiR reaches the DHT through ordinary Store and Fetch requests routed to
//! the responsible peer.

use async_trait::async_trait;
use rl_02_routing::{RoutingApi, RoutingError};
use rl_03_redir::{DhtClient, RedirError};
use shared_types::{
    Destination, FetchRequest, MessageBody, ResourceId, StoreKindData, StoreRequest, StoredData,
    StoredDataSpecifier,
};
use std::sync::Arc;

/// `DhtClient` that sends requests through a router.
pub struct RouterDhtClient {
    router: Arc<dyn RoutingApi>,
}

impl RouterDhtClient {
    #[must_use]
    pub fn new(router: Arc<dyn RoutingApi>) -> Self {
        Self { router }
    }
}

fn dht_error(err: RoutingError) -> RedirError {
    match err {
        RoutingError::Timeout { .. } => RedirError::Timeout,
        other => RedirError::Dht(other.to_string()),
    }
}

#[async_trait]
impl DhtClient for RouterDhtClient {
    async fn store(&self, resource: ResourceId, kind_data: StoreKindData) -> Result<(), RedirError> {
        let body = MessageBody::StoreReq(StoreRequest {
            resource,
            replica_number: 0,
            kind_data: vec![kind_data],
        });
        match self
            .router
            .request(Destination::Resource(resource), body)
            .await
            .map_err(dht_error)?
        {
            MessageBody::StoreAns(_) => Ok(()),
            other => Err(RedirError::Dht(format!(
                "store answered with code {}",
                other.code()
            ))),
        }
    }

    async fn fetch(
        &self,
        resource: ResourceId,
        specifier: StoredDataSpecifier,
    ) -> Result<Vec<StoredData>, RedirError> {
        let body = MessageBody::FetchReq(FetchRequest {
            resource,
            specifiers: vec![specifier],
        });
        match self
            .router
            .request(Destination::Resource(resource), body)
            .await
            .map_err(dht_error)?
        {
            MessageBody::FetchAns(answer) => Ok(answer
                .kind_responses
                .into_iter()
                .flat_map(|response| response.values)
                .collect()),
            other => Err(RedirError::Dht(format!(
                "fetch answered with code {}",
                other.code()
            ))),
        }
    }
}
