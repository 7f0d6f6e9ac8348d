use shared::error::ApiError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("server rejected request: {0}")]
    Status(#[from] ApiError),
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl GatewayError {
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Status(err) => Some(err.status),
            _ => None,
        }
    }

    pub fn display(&self, fallback: &str) -> String {
        match self {
            GatewayError::Status(err) => err.body.display(fallback),
            _ => fallback.to_string(),
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(value: serde_json::Error) -> Self {
        GatewayError::Decode(value.to_string())
    }
}

/// A form or input rejected before any request was built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub field: Option<String>,
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
        }
    }

    pub fn for_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("authentication required")]
    NotAuthenticated,
    /// A 2xx response whose envelope said `status: "error"`.
    #[error("request rejected: {0}")]
    Rejected(String),
}

impl ClientError {
    pub fn validation(message: impl Into<String>) -> Self {
        ClientError::Validation(ValidationError::new(message))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ClientError::Validation(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Gateway(err) => err.status(),
            _ => None,
        }
    }

    /// Inline message for the screen.
    pub fn display(&self, fallback: &str) -> String {
        match self {
            ClientError::Validation(err) => err.message.clone(),
            ClientError::Gateway(err) => err.display(fallback),
            ClientError::NotAuthenticated => "Authentication required. Please log in again.".into(),
            ClientError::Rejected(message) if !message.trim().is_empty() => message.clone(),
            ClientError::Rejected(_) => fallback.to_string(),
        }
    }
}

impl From<ApiError> for ClientError {
    fn from(value: ApiError) -> Self {
        ClientError::Gateway(GatewayError::Status(value))
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(value: serde_json::Error) -> Self {
        ClientError::Gateway(GatewayError::from(value))
    }
}
