//! Scripted in-memory chat backend
//!
//! Compiled into both the library's unit tests and the integration tests, so
//! the including module must have `ChatBackend`, `ChatRequest`, `ClientError`,
//! `CallBudget` and `LlmClient` in scope.

#![allow(dead_code)]

use super::{CallBudget, ChatBackend, ChatRequest, ClientError, LlmClient};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

type Handler = dyn Fn(&ChatRequest) -> Result<String, ClientError> + Send + Sync;

/// In-memory backend answering from a closure and recording every request
pub struct ScriptedBackend {
    handler: Box<Handler>,
    calls: Mutex<Vec<ChatRequest>>,
    credentials: bool,
}

impl ScriptedBackend {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&ChatRequest) -> Result<String, ClientError> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
            credentials: true,
        }
    }

    /// Backend that always answers `reply`
    pub fn replying(reply: &'static str) -> Self {
        Self::new(move |_| Ok(reply.to_string()))
    }

    /// Backend reporting no configured credentials
    pub fn without_credentials() -> Self {
        Self {
            credentials: false,
            ..Self::new(|_| Err(ClientError::CredentialsMissing))
        }
    }

    pub fn calls(&self) -> Vec<ChatRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Calls addressed to `model`
    pub fn calls_to(&self, model: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.model == model)
            .count()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn send(&self, request: &ChatRequest) -> Result<String, ClientError> {
        self.calls.lock().unwrap().push(request.clone());
        (self.handler)(request)
    }

    fn has_credentials(&self) -> bool {
        self.credentials
    }
}

/// Client over `backend` with a fresh budget
pub fn client_with(backend: Arc<ScriptedBackend>, limit: usize) -> LlmClient {
    LlmClient::new(backend, Arc::new(CallBudget::new(limit)))
}
