//! Scripted transport for exercising the engine without a server
//!
//! Responses are served in the order they were pushed and every request is
//! recorded for later inspection.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use super::{HttpRequest, HttpResponse, Transport};
use crate::common::{Error, Result};

#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<std::result::Result<HttpResponse, String>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a JSON response
    pub fn push_json(&self, status: u16, body: Value) -> &Self {
        self.push(Ok(HttpResponse {
            status,
            text: body.to_string(),
        }))
    }

    /// Queue a raw text response
    pub fn push_text(&self, status: u16, text: &str) -> &Self {
        self.push(Ok(HttpResponse {
            status,
            text: text.to_string(),
        }))
    }

    /// Queue a network failure
    pub fn push_error(&self, message: &str) -> &Self {
        self.push(Err(message.to_string()))
    }

    /// Requests sent so far, in order
    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.requests).clone()
    }

    /// Number of queued responses not yet consumed
    pub fn remaining(&self) -> usize {
        lock(&self.responses).len()
    }

    fn push(&self, response: std::result::Result<HttpResponse, String>) -> &Self {
        lock(&self.responses).push_back(response);
        self
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let url = request.url.clone();
        lock(&self.requests).push(request);
        match lock(&self.responses).pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(Error::transport(&url, message)),
            None => Err(Error::transport(&url, "no scripted response left")),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
