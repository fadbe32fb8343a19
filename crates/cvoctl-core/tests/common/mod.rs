//! Mock Cloud Manager server shared by the integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use cvoctl_core::{HttpTransport, OccmClient, PollingConfig, StaticToken};
use serde_json::{Value, json};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN: &str = "test-token";
pub const AGENT_ID: &str = "connector-1";

pub struct MockOccmServer {
    server: MockServer,
}

impl MockOccmServer {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn server(&self) -> &MockServer {
        &self.server
    }

    /// Client with zero delays and the default budgets
    pub fn client(&self) -> OccmClient {
        self.client_with(PollingConfig::immediate())
    }

    pub fn client_with(&self, polling: PollingConfig) -> OccmClient {
        let transport = HttpTransport::new(&self.server.uri(), AGENT_ID).unwrap();
        OccmClient::new(Arc::new(transport), Arc::new(StaticToken::new(TOKEN))).with_polling(polling)
    }

    /// Client whose requests give up after `timeout`
    pub fn client_with_timeout(&self, timeout: Duration) -> OccmClient {
        let transport = HttpTransport::with_timeout(&self.server.uri(), AGENT_ID, timeout).unwrap();
        OccmClient::new(Arc::new(transport), Arc::new(StaticToken::new(TOKEN)))
            .with_polling(PollingConfig::immediate())
    }

    /// GET matcher with the auth headers every request must carry
    pub fn get(&self, route: &str) -> wiremock::MockBuilder {
        Mock::given(method("GET"))
            .and(path(route.to_string()))
            .and(header("Authorization", format!("Bearer {}", TOKEN).as_str()))
            .and(header("X-Agent-Id", AGENT_ID))
    }

    pub async fn mock_inventory(&self, inventory: Value) {
        self.get("/occm/api/working-environments")
            .respond_with(ResponseTemplate::new(200).set_body_json(inventory))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_direct_lookup(&self, id: &str, provider: &str, is_ha: bool) {
        self.get(&format!("/occm/api/working-environments/{}", id))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "publicId": id,
                "cloudProviderName": provider,
                "isHA": is_ha
            })))
            .mount(&self.server)
            .await;
    }

    /// Properties snapshot answered `times` times (then falls through to later mocks)
    pub async fn mock_snapshot(&self, api_root: &str, id: &str, snapshot: Value, times: u64) {
        self.get(&format!("{}/working-environments/{}", api_root, id))
            .respond_with(ResponseTemplate::new(200).set_body_json(snapshot))
            .up_to_n_times(times)
            .mount(&self.server)
            .await;
    }
}

/// Snapshot with the given status and reported version
pub fn snapshot(status: &str, version: &str) -> Value {
    json!({
        "publicId": "VsaWorkingEnvironment-1",
        "status": {"status": status, "message": ""},
        "ontapClusterProperties": {"ontapVersion": version}
    })
}
