//! The chat panel, shared by teachers and students.
//!
//! Ids on the wire are role-relative: `/chat-users/{role}/{me}/` lists the
//! other side, and `/chat-messages/{role}/{me}/{other}/` loads one thread.

use serde::Deserialize;
use shared::{
    domain::{ChatCounterpart, ChatMessage, ChatUser, Role, StudentId, TeacherId},
    session::Session,
};
use tracing::{debug, info, warn};

use crate::{
    error::ClientError,
    gateway::ApiRequest,
    messages::{post_message, sent_message},
    prompt::ConfirmRequest,
    view::{Notice, Outcome, ViewState},
};

use super::{require_student, require_teacher, ScreenContext};

#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub other: ChatCounterpart,
    pub messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct Thread {
    #[serde(default)]
    messages: Vec<ChatMessage>,
    other_user: ChatCounterpart,
}

pub struct ChatScreen {
    ctx: ScreenContext,
    role: Role,
    me: Option<i64>,
    pub users: ViewState<Vec<ChatUser>>,
    pub conversation: Option<Conversation>,
    pub draft: String,
    pub notice: Notice,
}

impl ChatScreen {
    pub fn new(ctx: ScreenContext, role: Role) -> Self {
        Self {
            ctx,
            role,
            me: None,
            users: ViewState::Idle,
            conversation: None,
            draft: String::new(),
            notice: Notice::default(),
        }
    }

    /// Loads the sidebar. A teacher arriving from the student list has a
    /// pending selection, which is consumed here and opened.
    pub async fn activate(&mut self, session: &mut Session) -> Result<(), ClientError> {
        let me = match self.role {
            Role::Teacher => require_teacher(session)?.teacher_id.0,
            Role::Student => require_student(session)?.student_id.0,
        };
        self.me = Some(me);
        self.reload_users().await;

        if self.role == Role::Teacher {
            if let Some(student_id) = session.take_selected_student() {
                debug!(%student_id, "opening handed-over conversation");
                self.open_conversation(student_id.0).await;
            }
        }
        Ok(())
    }

    async fn reload_users(&mut self) {
        let Some(me) = self.me else {
            return;
        };
        let path = format!("/chat-users/{}/{me}/", self.role.as_str());
        self.users = match self.ctx.fetch_enveloped::<ChatUser>(path, "data").await {
            Ok(users) => ViewState::Ready(users),
            Err(err) => {
                warn!(role = self.role.as_str(), me, error = %err, "chat users: load failed");
                ViewState::Failed("Failed to load conversations".into())
            }
        };
    }

    pub fn chat_users(&self) -> &[ChatUser] {
        self.users.ready().map(Vec::as_slice).unwrap_or_default()
    }

    pub async fn open_conversation(&mut self, other: i64) -> Outcome {
        let Some(me) = self.me else {
            return Outcome::Failed;
        };
        let path = format!("/chat-messages/{}/{me}/{other}/", self.role.as_str());
        let result: Result<Thread, ClientError> = async {
            let envelope = self.ctx.gateway.send(ApiRequest::get(path)).await?.envelope()?;
            if !envelope.is_success() {
                return Err(ClientError::Rejected(
                    envelope.message_text().unwrap_or_default().to_string(),
                ));
            }
            envelope
                .field::<Thread>("data")?
                .ok_or_else(|| ClientError::Rejected(String::new()))
        }
        .await;

        match result {
            Ok(thread) => {
                self.conversation = Some(Conversation {
                    other: thread.other_user,
                    messages: thread.messages,
                });
                Outcome::done()
            }
            Err(err) => {
                warn!(me, other, error = %err, "chat messages: load failed");
                self.notice.set_error("Failed to load messages");
                Outcome::Failed
            }
        }
    }

    fn pair(&self, me: i64, other: i64) -> (TeacherId, StudentId) {
        match self.role {
            Role::Teacher => (TeacherId(me), StudentId(other)),
            Role::Student => (TeacherId(other), StudentId(me)),
        }
    }

    /// Sends the trimmed draft to the open conversation. A blank draft or no
    /// open conversation sends nothing.
    pub async fn send(&mut self) -> Outcome {
        let text = self.draft.trim().to_string();
        let (Some(me), Some(other)) = (self.me, self.conversation.as_ref().map(|c| c.other.id)) else {
            return Outcome::Cancelled;
        };
        if text.is_empty() {
            return Outcome::Cancelled;
        }
        self.notice.clear();

        let (teacher_id, student_id) = self.pair(me, other);
        let result = post_message(
            self.ctx.gateway.as_ref(),
            teacher_id,
            student_id,
            &text,
            self.role,
        )
        .await;

        match result {
            Ok(envelope) if envelope.is_success() => {
                if let (Some(message), Some(conversation)) =
                    (sent_message(&envelope), self.conversation.as_mut())
                {
                    conversation.messages.push(message);
                }
                self.draft.clear();
                info!(%teacher_id, %student_id, "chat message sent");
                self.reload_users().await;
                Outcome::done()
            }
            Ok(_) | Err(ClientError::Rejected(_)) => {
                self.notice.set_error("Failed to send message");
                Outcome::Failed
            }
            Err(err) => {
                warn!(%teacher_id, %student_id, error = %err, "chat send failed");
                self.notice
                    .set_error("An error occurred while sending your message");
                Outcome::Failed
            }
        }
    }

    pub async fn delete_conversation(&mut self) -> Outcome {
        let (Some(me), Some(other)) = (self.me, self.conversation.as_ref().map(|c| c.other.clone())) else {
            return Outcome::Cancelled;
        };
        let request = ConfirmRequest::new(
            "Delete Conversation",
            format!(
                "Are you sure you want to delete all messages with {}?",
                other.name
            ),
            "Delete",
        );
        if !self.ctx.prompt.confirm(request).await.is_confirmed() {
            return Outcome::Cancelled;
        }

        let (teacher_id, student_id) = self.pair(me, other.id);
        let path = format!("/delete-conversation/{teacher_id}/{student_id}/");
        let result: Result<bool, ClientError> = async {
            let envelope = self.ctx.gateway.send(ApiRequest::delete(path)).await?.envelope()?;
            Ok(envelope.is_success())
        }
        .await;

        match result {
            Ok(true) => {
                self.conversation = None;
                self.notice.set_success("Conversation deleted successfully");
                self.reload_users().await;
                Outcome::done()
            }
            Ok(false) => {
                self.notice.set_error("Failed to delete conversation");
                Outcome::Failed
            }
            Err(err) => {
                warn!(%teacher_id, %student_id, error = %err, "delete conversation failed");
                self.notice
                    .set_error("An error occurred while deleting the conversation");
                Outcome::Failed
            }
        }
    }
}

#[cfg(test)]
#[path = "../tests/chat_tests.rs"]
mod tests;
