//! Recording fakes for controller tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use serde_json::Value;
use shared::error::ApiError;

use crate::{
    error::GatewayError,
    gateway::{ApiRequest, ApiResponse, Body, HttpGateway, Method},
    prompt::{ComposeRequest, ConfirmRequest, ConfirmationPrompt, Decision},
    screens::ScreenContext,
};

type Reply = Result<ApiResponse, GatewayError>;

/// Answers queued per `(method, path)`; the last queued answer repeats.
/// Unrouted calls get a 404.
#[derive(Default)]
pub struct FakeGateway {
    routes: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, method: Method, path: &str, reply: Reply) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    pub fn ok(&self, method: Method, path: &str, body: Value) -> &Self {
        self.reply(method, path, Ok(ApiResponse::new(200, body)))
    }

    pub fn created(&self, method: Method, path: &str, body: Value) -> &Self {
        self.reply(method, path, Ok(ApiResponse::new(201, body)))
    }

    pub fn status(&self, method: Method, path: &str, status: u16, body: Value) -> &Self {
        self.reply(
            method,
            path,
            Err(ApiError::from_response(status, &body).into()),
        )
    }

    pub fn unreachable(&self, method: Method, path: &str) -> &Self {
        self.reply(
            method,
            path,
            Err(GatewayError::Transport("connection refused".into())),
        )
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self, method: Method, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|req| req.method == method && req.path == path)
            .count()
    }

    pub fn writes(&self) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|req| req.method != Method::Get)
            .collect()
    }

    pub fn last_json(&self, method: Method, path: &str) -> Option<Value> {
        self.requests()
            .into_iter()
            .rev()
            .find(|req| req.method == method && req.path == path)
            .and_then(|req| match req.body {
                Body::Json(value) => Some(value),
                _ => None,
            })
    }

    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }
}

#[async_trait]
impl HttpGateway for FakeGateway {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, GatewayError> {
        let key = (request.method, request.path.clone());
        self.requests.lock().unwrap().push(request);

        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => Err(ApiError::from_response(404, &Value::Null).into()),
        }
    }
}

/// Plays back queued answers; declines once the queue runs dry.
#[derive(Default)]
pub struct ScriptedPrompt {
    decisions: Mutex<VecDeque<Decision>>,
    compositions: Mutex<VecDeque<Option<String>>>,
    asked: Mutex<Vec<ConfirmRequest>>,
    composed: Mutex<Vec<ComposeRequest>>,
}

impl ScriptedPrompt {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn confirming() -> Arc<Self> {
        let prompt = Self::default();
        prompt.decisions.lock().unwrap().push_back(Decision::Confirmed);
        Arc::new(prompt)
    }

    pub fn cancelling() -> Arc<Self> {
        let prompt = Self::default();
        prompt.decisions.lock().unwrap().push_back(Decision::Cancelled);
        Arc::new(prompt)
    }

    pub fn composing(text: &str) -> Arc<Self> {
        let prompt = Self::default();
        prompt
            .compositions
            .lock()
            .unwrap()
            .push_back(Some(text.to_string()));
        Arc::new(prompt)
    }

    pub fn asked(&self) -> Vec<ConfirmRequest> {
        self.asked.lock().unwrap().clone()
    }

    pub fn composed(&self) -> usize {
        self.composed.lock().unwrap().len()
    }
}

#[async_trait]
impl ConfirmationPrompt for ScriptedPrompt {
    async fn confirm(&self, request: ConfirmRequest) -> Decision {
        self.asked.lock().unwrap().push(request);
        self.decisions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Decision::Cancelled)
    }

    async fn compose(&self, request: ComposeRequest) -> Option<String> {
        self.composed.lock().unwrap().push(request);
        self.compositions
            .lock()
            .unwrap()
            .pop_front()
            .flatten()
            .filter(|text| !text.trim().is_empty())
    }
}

pub fn context(gateway: &Arc<FakeGateway>, prompt: &Arc<ScriptedPrompt>) -> ScreenContext {
    ScreenContext::new(gateway.clone(), prompt.clone()).with_redirect_delay(Duration::from_secs(2))
}
