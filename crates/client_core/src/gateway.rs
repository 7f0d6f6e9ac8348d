//! The single choke point for outbound REST calls.

use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use shared::{error::ApiError, protocol::Envelope};
use tracing::{debug, warn};

use crate::{error::GatewayError, forms::FileUpload};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl From<Method> for reqwest::Method {
    fn from(value: Method) -> Self {
        match value {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    File(FileUpload),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Body {
    #[default]
    Empty,
    Json(Value),
    Multipart(Vec<(String, Part)>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Body,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: Body::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    pub fn json<T: Serialize>(self, payload: &T) -> Result<Self, GatewayError> {
        let value = serde_json::to_value(payload)
            .map_err(|err| GatewayError::InvalidRequest(err.to_string()))?;
        Ok(self.with_body(Body::Json(value)))
    }

    pub fn multipart(self, parts: Vec<(String, Part)>) -> Self {
        self.with_body(Body::Multipart(parts))
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self.body, Body::Multipart(_))
    }
}

/// A 2xx response. `body` is `null` when the server sent nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, GatewayError> {
        Ok(serde_json::from_value(self.body.clone())?)
    }

    pub fn envelope(&self) -> Result<Envelope, GatewayError> {
        if self.body.is_null() {
            return Ok(Envelope::default());
        }
        Ok(Envelope::from_value(self.body.clone())?)
    }

    pub fn is_created(&self) -> bool {
        self.status == 201
    }
}

/// One attempt per call: no retry, no timeout, no backoff.
#[async_trait]
pub trait HttpGateway: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, GatewayError>;
}

pub struct ReqwestGateway {
    http: Client,
    base_url: String,
}

impl ReqwestGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn build_form(parts: Vec<(String, Part)>) -> Result<multipart::Form, GatewayError> {
    let mut form = multipart::Form::new();
    for (name, part) in parts {
        form = match part {
            Part::Text(value) => form.text(name, value),
            Part::File(file) => {
                let file_part = multipart::Part::bytes(file.bytes)
                    .file_name(file.filename)
                    .mime_str(&file.mime_type)
                    .map_err(|err| GatewayError::InvalidRequest(err.to_string()))?;
                form.part(name, file_part)
            }
        };
    }
    Ok(form)
}

fn decode_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

#[async_trait]
impl HttpGateway for ReqwestGateway {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, GatewayError> {
        let url = self.url_for(&request.path);
        debug!(method = ?request.method, url = %url, "gateway request");

        let mut builder = self.http.request(request.method.into(), &url);
        builder = match request.body {
            Body::Empty => builder,
            Body::Json(value) => builder.json(&value),
            Body::Multipart(parts) => builder.multipart(build_form(parts)?),
        };

        let response = builder.send().await.map_err(|err| {
            warn!(url = %url, error = %err, "gateway: no response");
            GatewayError::Transport(err.to_string())
        })?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;
        let body = decode_body(&bytes);

        if status.is_success() {
            debug!(url = %url, status = status.as_u16(), "gateway response");
            Ok(ApiResponse::new(status.as_u16(), body))
        } else {
            warn!(url = %url, status = status.as_u16(), "gateway: error status");
            Err(ApiError::from_response(status.as_u16(), &body).into())
        }
    }
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
