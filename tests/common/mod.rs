//! Shared fixtures for the scenario tests in `tests/scenarios.rs`.

use std::sync::Mutex;

use async_trait::async_trait;
use reqweave::transport::{
    dispatch_table, RequestDescriptor, ResponseDescriptor, Transport, TransportError,
};

/// A transport that replays a fixed sequence of outcomes, one per call,
/// repeating the last outcome once the sequence is exhausted.
pub struct SequenceTransport {
    outcomes: Mutex<Vec<Result<ResponseDescriptor, TransportError>>>,
    cursor: Mutex<usize>,
}

impl SequenceTransport {
    pub fn new(outcomes: Vec<Result<ResponseDescriptor, TransportError>>) -> Self {
        Self { outcomes: Mutex::new(outcomes), cursor: Mutex::new(0) }
    }
}

#[async_trait]
impl Transport for SequenceTransport {
    async fn send(
        &self,
        _req: &RequestDescriptor,
    ) -> Result<ResponseDescriptor, TransportError> {
        let outcomes = self.outcomes.lock().unwrap();
        let mut cursor = self.cursor.lock().unwrap();
        let index = (*cursor).min(outcomes.len() - 1);
        *cursor += 1;
        outcomes[index].clone()
    }
}

/// A JSON `200` response with the given body.
pub fn ok(body: serde_json::Value) -> Result<ResponseDescriptor, TransportError> {
    Ok(ResponseDescriptor {
        status: 200,
        headers: Default::default(),
        body,
        transport_handle: None,
    })
}

/// A plain response with the given status and body.
pub fn status(code: u16, body: serde_json::Value) -> Result<ResponseDescriptor, TransportError> {
    Ok(ResponseDescriptor {
        status: code,
        headers: Default::default(),
        body,
        transport_handle: None,
    })
}

/// Register `transport` as the handler for `GET url`.
pub fn register_get(url: &url::Url, transport: std::sync::Arc<dyn Transport>) {
    dispatch_table().register(http::Method::GET, url.to_string(), transport);
}
