//! Test doubles and common utilities for client contract tests
//!
//! This module provides a scripted transport that replays canned responses
//! and records every request it receives.

#![allow(dead_code)]

use papi_core::error::{Error, Result};
use papi_core::traits::{HttpRequest, HttpResponse, Transport};
use papi_core::PapiClient;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A transport that answers from a queue of scripted outcomes
pub struct ScriptedTransport {
    /// Outcomes handed out in order
    script: Arc<Mutex<VecDeque<Result<HttpResponse>>>>,
    /// Every request received, in order
    requests: Arc<Mutex<Vec<HttpRequest>>>,
    /// Call counter for execute()
    call_count: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queue a response with a JSON body
    pub fn respond(self, status: u16, body: serde_json::Value) -> Self {
        self.respond_with(HttpResponse::new(status, body.to_string()))
    }

    /// Queue a response with a raw body
    pub fn respond_raw(self, status: u16, body: &str) -> Self {
        self.respond_with(HttpResponse::new(status, body))
    }

    /// Queue a fully built response
    pub fn respond_with(self, response: HttpResponse) -> Self {
        self.script.lock().unwrap().push_back(Ok(response));
        self
    }

    /// Queue a transport failure
    pub fn fail(self, message: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Err(Error::transport(message)));
        self
    }

    /// Get the number of times execute() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Get every request received so far
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Get the only request received; panics unless exactly one was sent
    pub fn single_request(&self) -> HttpRequest {
        let requests = self.requests();
        assert_eq!(requests.len(), 1, "expected exactly one request");
        requests.into_iter().next().unwrap()
    }

    /// Create a transport that shares script and recordings with an existing one
    pub fn sharing_state_with(other: &Self) -> Self {
        Self {
            script: Arc::clone(&other.script),
            requests: Arc::clone(&other.requests),
            call_count: Arc::clone(&other.call_count),
        }
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::transport("script exhausted")))
    }

    fn transport_name(&self) -> &'static str {
        "scripted"
    }
}

/// Build a client over a scripted transport, keeping a handle for assertions
pub fn client_with(transport: ScriptedTransport) -> (PapiClient, ScriptedTransport) {
    let handle = ScriptedTransport::sharing_state_with(&transport);
    (PapiClient::new(Box::new(transport)), handle)
}

/// A small but representative rule tree document
pub fn sample_rules() -> serde_json::Value {
    serde_json::json!({
        "name": "default",
        "criteria": [],
        "behaviors": [
            {
                "name": "origin",
                "options": {
                    "hostname": "origin.example.com",
                    "httpPort": 80,
                    "httpsPort": 443
                }
            }
        ],
        "children": [
            {
                "name": "Static Content",
                "criteria": [
                    {
                        "name": "fileExtension",
                        "options": { "matchOperator": "IS_ONE_OF", "values": ["css", "js"] }
                    }
                ],
                "behaviors": [
                    { "name": "caching", "options": { "behavior": "MAX_AGE", "ttl": "7d" } }
                ]
            }
        ],
        "options": { "is_secure": false }
    })
}
