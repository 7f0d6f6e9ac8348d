//! One controller per screen.
//!
//! Controllers own their view state and are driven by `async fn`s taking
//! `&mut self`; a front-end calls `activate` and then the user actions, and
//! draws whatever state results.

use std::{sync::Arc, time::Duration};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use shared::session::{Session, StudentSession, TeacherSession};
use tracing::{debug, info};

use crate::{
    config::Settings,
    error::ClientError,
    gateway::{ApiRequest, HttpGateway, ReqwestGateway},
    media::FileUrlResolver,
    prompt::{ConfirmRequest, ConfirmationPrompt},
    view::{Navigation, Route, DEFAULT_REDIRECT_DELAY},
};

pub mod assignments;
pub mod auth;
pub mod chapters;
pub mod chat;
pub mod course_detail;
pub mod course_form;
pub mod courses;
pub mod home;
pub mod profile;
pub mod quiz_attempts;
pub mod quizzes;
pub mod students;
pub mod study_materials;

/// Capabilities every controller is built from.
#[derive(Clone)]
pub struct ScreenContext {
    pub gateway: Arc<dyn HttpGateway>,
    pub prompt: Arc<dyn ConfirmationPrompt>,
    pub media: FileUrlResolver,
    pub redirect_delay: Duration,
}

impl ScreenContext {
    pub fn new(gateway: Arc<dyn HttpGateway>, prompt: Arc<dyn ConfirmationPrompt>) -> Self {
        Self {
            gateway,
            prompt,
            media: FileUrlResolver::default(),
            redirect_delay: DEFAULT_REDIRECT_DELAY,
        }
    }

    pub fn from_settings(settings: &Settings, prompt: Arc<dyn ConfirmationPrompt>) -> Self {
        Self {
            gateway: Arc::new(ReqwestGateway::new(settings.api_base_url.clone())),
            prompt,
            media: FileUrlResolver::new(settings.media_base_url.clone()),
            redirect_delay: settings.redirect_delay,
        }
    }

    pub fn with_media(mut self, media: FileUrlResolver) -> Self {
        self.media = media;
        self
    }

    pub fn with_redirect_delay(mut self, redirect_delay: Duration) -> Self {
        self.redirect_delay = redirect_delay;
        self
    }

    pub fn redirect(&self, route: Route) -> Navigation {
        Navigation::delayed(route, self.redirect_delay)
    }

    /// GET a bare JSON array or object.
    pub(crate) async fn fetch<T: DeserializeOwned>(&self, path: String) -> Result<T, ClientError> {
        let response = self.gateway.send(ApiRequest::get(path)).await?;
        Ok(response.decode()?)
    }

    /// GET an enveloped list stored under `key`; a missing key is an empty list.
    pub(crate) async fn fetch_enveloped<T: DeserializeOwned>(
        &self,
        path: String,
        key: &str,
    ) -> Result<Vec<T>, ClientError> {
        let envelope = self.gateway.send(ApiRequest::get(path)).await?.envelope()?;
        if envelope.is_error() {
            return Err(ClientError::Rejected(
                envelope.message_text().unwrap_or_default().to_string(),
            ));
        }
        Ok(envelope.field::<Vec<T>>(key)?.unwrap_or_default())
    }

    /// Asks first; issues the DELETE only on an explicit confirmation.
    /// `Ok(false)` means the user cancelled and nothing was sent.
    pub(crate) async fn confirm_delete(
        &self,
        request: ConfirmRequest,
        path: String,
    ) -> Result<bool, ClientError> {
        if !self.prompt.confirm(request).await.is_confirmed() {
            debug!(path = %path, "delete cancelled");
            return Ok(false);
        }
        self.gateway.send(ApiRequest::delete(path.clone())).await?;
        info!(path = %path, "deleted");
        Ok(true)
    }
}

/// Overlays the fields present in `patch` onto `current`, the way the
/// screens spread a partial server record over the local row.
pub(crate) fn merge_record<T: Serialize + DeserializeOwned>(
    current: &T,
    patch: &Value,
) -> Result<T, ClientError> {
    let mut merged = serde_json::to_value(current)?;
    if let (Value::Object(target), Value::Object(fields)) = (&mut merged, patch) {
        for (key, value) in fields {
            target.insert(key.clone(), value.clone());
        }
    }
    Ok(serde_json::from_value(merged)?)
}

pub fn require_teacher(session: &Session) -> Result<&TeacherSession, ClientError> {
    session.teacher.as_ref().ok_or(ClientError::NotAuthenticated)
}

pub fn require_student(session: &Session) -> Result<&StudentSession, ClientError> {
    session.student.as_ref().ok_or(ClientError::NotAuthenticated)
}
