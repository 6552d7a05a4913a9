//! Data source backed by a REST API, one endpoint per source.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use crate::retrieve::ky_http::ApiClient;
use crate::retrieve::resilient::TransportError;
use crate::sources::{DataSource, SourceId};

pub struct HttpDataSource {
    client: ApiClient,
}

impl HttpDataSource {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Path of `source`, relative to the client's base URL.
    pub fn endpoint(source: SourceId) -> &'static str {
        match source {
            SourceId::DailySales => "/sales/daily",
            SourceId::TopProducts => "/sales/top-products",
            SourceId::UserStats => "/users/stats",
            SourceId::UserActivity => "/users/activity",
            SourceId::Kpis => "/business/kpis",
            SourceId::RegionalData => "/business/regions",
        }
    }
}

#[async_trait]
impl DataSource for HttpDataSource {
    // One attempt per call; the orchestrator owns retries and timeouts.
    async fn fetch(&self, source: SourceId) -> Result<Value, TransportError> {
        self.client
            .send_once(Method::GET, Self::endpoint(source), None)
            .await
    }
}
