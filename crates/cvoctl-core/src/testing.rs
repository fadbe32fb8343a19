//! In-memory transport for unit tests

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::auth::StaticToken;
use crate::client::OccmClient;
use crate::config::PollingConfig;
use crate::transport::{ApiRequest, ApiResponse, Transport, TransportError};

type Scripted = Result<ApiResponse, String>;

#[derive(Default)]
struct State {
    responses: VecDeque<Scripted>,
    requests: Vec<ApiRequest>,
}

/// Replays scripted responses in order and records every request
#[derive(Clone, Default)]
pub(crate) struct ScriptedTransport {
    state: Arc<Mutex<State>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_json(&self, status: u16, body: Value) {
        self.push(Ok(ApiResponse {
            status,
            body: serde_json::to_vec(&body).unwrap(),
        }));
    }

    pub fn push_text(&self, status: u16, body: &str) {
        self.push(Ok(ApiResponse {
            status,
            body: body.as_bytes().to_vec(),
        }));
    }

    pub fn push_transport_error(&self, message: &str) {
        self.push(Err(message.to_string()));
    }

    fn push(&self, response: Scripted) {
        self.state.lock().unwrap().responses.push_back(response);
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.path).collect()
    }

    /// Client with zero delays and the default budgets
    pub fn client(&self) -> OccmClient {
        OccmClient::new(Arc::new(self.clone()), Arc::new(StaticToken::new("token")))
            .with_polling(PollingConfig::immediate())
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn call(&self, request: &ApiRequest, _token: &str) -> Result<ApiResponse, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.requests.push(request.clone());
        match state.responses.pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(TransportError::new(request, message)),
            None => Err(TransportError::new(request, "no scripted response left")),
        }
    }
}
