use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Confirmed,
    Cancelled,
}

impl Decision {
    pub fn is_confirmed(self) -> bool {
        self == Decision::Confirmed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmRequest {
    pub title: String,
    pub body: String,
    pub confirm_label: String,
}

impl ConfirmRequest {
    pub fn new(
        title: impl Into<String>,
        body: impl Into<String>,
        confirm_label: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            confirm_label: confirm_label.into(),
        }
    }

    pub fn destructive(body: impl Into<String>) -> Self {
        Self::new("Are you sure?", body, "Yes, delete it!")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeRequest {
    pub title: String,
    pub placeholder: String,
    pub confirm_label: String,
}

impl ComposeRequest {
    pub fn new(title: impl Into<String>, placeholder: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            placeholder: placeholder.into(),
            confirm_label: "Send".into(),
        }
    }
}

/// Suspends the calling flow until the user answers.
#[async_trait]
pub trait ConfirmationPrompt: Send + Sync {
    async fn confirm(&self, request: ConfirmRequest) -> Decision;

    /// `None` when cancelled or when the text is blank.
    async fn compose(&self, request: ComposeRequest) -> Option<String>;
}

/// Stand-in for a surface with nobody to ask: every question is declined.
pub struct DeclineAllPrompt;

#[async_trait]
impl ConfirmationPrompt for DeclineAllPrompt {
    async fn confirm(&self, _request: ConfirmRequest) -> Decision {
        Decision::Cancelled
    }

    async fn compose(&self, _request: ComposeRequest) -> Option<String> {
        None
    }
}
