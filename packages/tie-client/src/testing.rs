//! Test doubles for the transport and sleep seams.
//!
//! `ScriptedTransport` replays a queue of canned responses and records every
//! request it receives. `RecordingSleeper` returns immediately and remembers
//! each requested delay, so backoff behaviour can be asserted without
//! waiting.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{Result, TieError};
use crate::retry::Sleeper;
use crate::transport::{HttpResponse, Transport};

// =============================================================================
// Scripted transport
// =============================================================================

/// Arguments captured from a request
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: &'static str,
    pub url: String,
    pub accept: String,
    pub token: String,
    pub form: Vec<(String, String)>,
}

#[derive(Clone, Default)]
pub struct ScriptedTransport {
    responses: Arc<Mutex<VecDeque<Result<HttpResponse>>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response. Once the queue is empty every request fails with a
    /// transport error.
    pub fn with(self, response: HttpResponse) -> Self {
        self.responses.lock().unwrap().push_back(Ok(response));
        self
    }

    /// Queue a transport failure.
    pub fn with_error(self, error: TieError) -> Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn json_response(status: u16, body: serde_json::Value) -> HttpResponse {
        HttpResponse {
            status,
            content_type: Some("application/json; charset=utf-8".to_string()),
            link: None,
            body: Bytes::from(body.to_string()),
        }
    }

    pub fn text_response(status: u16, content_type: &str, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            content_type: Some(content_type.to_string()),
            link: None,
            body: Bytes::from(body.to_string()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.url).collect()
    }

    /// Responses not consumed yet.
    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap().len()
    }

    fn next(&self, call: RecordedCall) -> Result<HttpResponse> {
        let url = call.url.clone();
        self.calls.lock().unwrap().push(call);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TieError::Transport(format!("no scripted response for {}", url))))
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, url: &str, accept: &str, token: &str) -> Result<HttpResponse> {
        self.next(RecordedCall {
            method: "GET",
            url: url.to_string(),
            accept: accept.to_string(),
            token: token.to_string(),
            form: Vec::new(),
        })
    }

    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, String)],
        token: &str,
    ) -> Result<HttpResponse> {
        self.next(RecordedCall {
            method: "POST",
            url: url.to_string(),
            accept: String::new(),
            token: token.to_string(),
            form: form
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        })
    }
}

// =============================================================================
// Recording sleeper
// =============================================================================

#[derive(Clone, Default)]
pub struct RecordingSleeper {
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }

    pub fn total(&self) -> Duration {
        self.sleeps().iter().sum()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}
