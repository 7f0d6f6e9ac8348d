//! The teacher's enrolled-student list with direct and broadcast messaging.

use shared::{
    domain::{EnrolledStudent, Role, StudentId, TeacherId},
    session::Session,
};
use tracing::{info, warn};

use crate::{
    broadcast::{deliver_all, BroadcastSummary},
    error::ClientError,
    messages::post_message,
    prompt::ComposeRequest,
    view::{Navigation, Notice, Outcome, Route, ViewState},
};

use super::{require_teacher, ScreenContext};

pub struct StudentListScreen {
    ctx: ScreenContext,
    teacher_id: Option<TeacherId>,
    pub state: ViewState<Vec<EnrolledStudent>>,
    pub notice: Notice,
    pub last_broadcast: Option<BroadcastSummary>,
}

impl StudentListScreen {
    pub fn new(ctx: ScreenContext) -> Self {
        Self {
            ctx,
            teacher_id: None,
            state: ViewState::Idle,
            notice: Notice::default(),
            last_broadcast: None,
        }
    }

    pub async fn activate(&mut self, session: &Session) -> Result<(), ClientError> {
        let teacher_id = require_teacher(session)?.teacher_id;
        self.teacher_id = Some(teacher_id);
        self.state = ViewState::Loading;
        self.state = match self
            .ctx
            .fetch_enveloped::<EnrolledStudent>(
                format!("/teacher-enrolled-students/{teacher_id}/"),
                "data",
            )
            .await
        {
            Ok(students) => ViewState::Ready(students),
            Err(err) => {
                warn!(%teacher_id, error = %err, "students: load failed");
                ViewState::Failed("Failed to load students. Please try again later.".into())
            }
        };
        Ok(())
    }

    pub fn students(&self) -> &[EnrolledStudent] {
        self.state.ready().map(Vec::as_slice).unwrap_or_default()
    }

    /// Composes and sends one message to `student_id`.
    pub async fn message_student(&mut self, student_id: StudentId) -> Outcome {
        let Some(teacher_id) = self.teacher_id else {
            return Outcome::Failed;
        };
        let name = self
            .students()
            .iter()
            .find(|student| student.id == student_id)
            .map(|student| student.fullname.clone())
            .unwrap_or_default();
        let request = ComposeRequest {
            confirm_label: "Send Message".into(),
            ..ComposeRequest::new(format!("Message {name}"), "Enter your message here...")
        };
        let Some(message) = self.ctx.prompt.compose(request).await else {
            return Outcome::Cancelled;
        };

        self.notice.clear();
        let result = post_message(
            self.ctx.gateway.as_ref(),
            teacher_id,
            student_id,
            message.trim(),
            Role::Teacher,
        )
        .await;
        match result {
            Ok(envelope) if envelope.is_success() => {
                info!(%teacher_id, %student_id, "message sent");
                self.notice.set_success("Message sent successfully");
                Outcome::done()
            }
            Ok(envelope) => {
                warn!(%student_id, status = ?envelope.status, "message not accepted");
                self.notice
                    .set_error("Failed to send message. Please try again.");
                Outcome::Failed
            }
            Err(err) => {
                warn!(%student_id, error = %err, "message send failed");
                self.notice
                    .set_error("Failed to send message. Please try again.");
                Outcome::Failed
            }
        }
    }

    /// Composes one message and delivers it to every listed student in turn.
    pub async fn message_all(&mut self) -> Outcome {
        let Some(teacher_id) = self.teacher_id else {
            self.notice
                .set_error("No students to message or teacher ID not found.");
            return Outcome::Failed;
        };
        let recipients: Vec<StudentId> = self.students().iter().map(|student| student.id).collect();
        if recipients.is_empty() {
            self.notice
                .set_error("There are no enrolled students to message.");
            return Outcome::Failed;
        }

        let request = ComposeRequest {
            confirm_label: "Send to All".into(),
            ..ComposeRequest::new(
                format!("Message All Students ({})", recipients.len()),
                "Enter your message here...",
            )
        };
        let Some(message) = self.ctx.prompt.compose(request).await else {
            return Outcome::Cancelled;
        };

        self.notice.clear();
        let summary = deliver_all(
            self.ctx.gateway.as_ref(),
            teacher_id,
            &recipients,
            message.trim(),
        )
        .await;
        if summary.successes > 0 {
            self.notice.set_success(summary.report());
        } else {
            self.notice.set_error(summary.report());
        }
        self.last_broadcast = Some(summary);
        Outcome::done()
    }

    /// Hands the student over to the chat panel.
    pub fn open_chat(&self, session: &mut Session, student_id: StudentId) -> Navigation {
        session.select_student(student_id);
        Navigation::now(Route::TeacherChat)
    }
}

#[cfg(test)]
#[path = "../tests/students_tests.rs"]
mod tests;
