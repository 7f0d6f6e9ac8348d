//! Sign-in, sign-out and password change for both roles.

use shared::{
    domain::Role,
    protocol::{
        ChangePasswordRequest, StudentLoginRequest, StudentLoginResponse, TeacherLoginResponse,
    },
    session::{Session, StudentSession, TeacherSession},
};
use tracing::{info, warn};

use crate::{
    error::{ClientError, GatewayError, ValidationError},
    forms::{submit_form, Encoding, FieldSpec, FormData, FormSchema},
    gateway::{ApiRequest, Method},
    view::{Navigation, Notice, Outcome, Route},
};

use super::{require_student, require_teacher, ScreenContext};

const MIN_PASSWORD_LEN: usize = 6;

fn login_failure(err: &ClientError) -> String {
    match err {
        ClientError::Gateway(GatewayError::Transport(_)) => {
            "Network error. Please check your connection.".into()
        }
        other => other.display("Login failed. Please try again."),
    }
}

pub struct TeacherLoginScreen {
    ctx: ScreenContext,
    pub email: String,
    pub password: String,
    pub notice: Notice,
    pub submitting: bool,
}

impl TeacherLoginScreen {
    pub fn new(ctx: ScreenContext) -> Self {
        Self {
            ctx,
            email: String::new(),
            password: String::new(),
            notice: Notice::default(),
            submitting: false,
        }
    }

    fn schema() -> FormSchema {
        FormSchema::new(vec![
            FieldSpec::text("email", "Email"),
            FieldSpec::text("password", "Password"),
        ])
    }

    pub async fn submit(&mut self, session: &mut Session) -> Outcome {
        self.notice.clear();
        self.submitting = true;
        let result = self.login().await;
        self.submitting = false;

        match result {
            Ok(teacher) => {
                info!(teacher_id = %teacher.teacher_id, "teacher signed in");
                session.login_teacher(teacher);
                self.notice
                    .set_success("Login successful! Redirecting to dashboard...");
                Outcome::navigate(self.ctx.redirect(Route::TeacherDashboard))
            }
            Err(err) => {
                warn!(error = %err, "teacher login failed");
                self.notice.set_error(login_failure(&err));
                Outcome::Failed
            }
        }
    }

    async fn login(&self) -> Result<TeacherSession, ClientError> {
        let form = FormData::new()
            .with_text("email", self.email.trim())
            .with_text("password", self.password.clone());
        let response = submit_form(
            self.ctx.gateway.as_ref(),
            Method::Post,
            "/teacher-login/",
            &Self::schema(),
            &form,
            Encoding::Json,
        )
        .await?;
        let body: TeacherLoginResponse = response.decode()?;

        match (body.status.as_str(), body.teacher_id) {
            ("success", Some(teacher_id)) => Ok(TeacherSession {
                teacher_id,
                full_name: body.full_name.unwrap_or_default(),
                email: body.email.unwrap_or_else(|| self.email.trim().to_string()),
            }),
            _ => Err(ClientError::Rejected(body.message.unwrap_or_default())),
        }
    }
}

pub struct StudentLoginScreen {
    ctx: ScreenContext,
    pub username: String,
    pub password: String,
    pub notice: Notice,
    pub submitting: bool,
}

impl StudentLoginScreen {
    pub fn new(ctx: ScreenContext) -> Self {
        Self {
            ctx,
            username: String::new(),
            password: String::new(),
            notice: Notice::default(),
            submitting: false,
        }
    }

    pub async fn submit(&mut self, session: &mut Session) -> Outcome {
        self.notice.clear();
        self.submitting = true;
        let result = self.login().await;
        self.submitting = false;

        match result {
            Ok(student) => {
                info!(student_id = %student.student_id, "student signed in");
                session.login_student(student);
                self.notice.set_success("Login successful! Redirecting...");
                Outcome::navigate(self.ctx.redirect(Route::StudentDashboard))
            }
            Err(err) => {
                warn!(error = %err, "student login failed");
                self.notice.set_error(login_failure(&err));
                Outcome::Failed
            }
        }
    }

    async fn login(&self) -> Result<StudentSession, ClientError> {
        if self.username.trim().is_empty() || self.password.is_empty() {
            return Err(ValidationError::new("Username and password are required").into());
        }
        let request = ApiRequest::post("/student/login/").json(&StudentLoginRequest {
            username: self.username.trim().to_string(),
            password: self.password.clone(),
        })?;
        let body: StudentLoginResponse = self.ctx.gateway.send(request).await?.decode()?;

        match (body.status.as_str(), body.student_id) {
            ("success", Some(student_id)) => Ok(StudentSession {
                student_id,
                username: body
                    .username
                    .unwrap_or_else(|| self.username.trim().to_string()),
                fullname: body.fullname.unwrap_or_default(),
                email: body.email.unwrap_or_default(),
            }),
            _ => Err(ClientError::Rejected(body.message.unwrap_or_default())),
        }
    }
}

/// Signs `role` out; always lands on that role's login page.
pub fn logout(session: &mut Session, role: Role) -> Navigation {
    match role {
        Role::Teacher => {
            session.logout_teacher();
            Navigation::now(Route::TeacherLogin)
        }
        Role::Student => {
            session.logout_student();
            Navigation::now(Route::StudentLogin)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl PasswordChange {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.current_password.is_empty() {
            return Err(ValidationError::for_field(
                "current_password",
                "Current password is required",
            ));
        }
        if self.new_password.is_empty() {
            return Err(ValidationError::for_field(
                "new_password",
                "New password is required",
            ));
        }
        if self.new_password != self.confirm_password {
            return Err(ValidationError::for_field(
                "confirm_password",
                "New passwords do not match",
            ));
        }
        if self.new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::for_field(
                "new_password",
                format!("New password must be at least {MIN_PASSWORD_LEN} characters long"),
            ));
        }
        Ok(())
    }
}

pub struct ChangePasswordScreen {
    ctx: ScreenContext,
    role: Role,
    pub form: PasswordChange,
    pub notice: Notice,
}

impl ChangePasswordScreen {
    pub fn new(ctx: ScreenContext, role: Role) -> Self {
        Self {
            ctx,
            role,
            form: PasswordChange::default(),
            notice: Notice::default(),
        }
    }

    pub async fn submit(&mut self, session: &Session) -> Outcome {
        self.notice.clear();
        match self.change(session).await {
            Ok(message) => {
                self.form = PasswordChange::default();
                self.notice.set_success(message);
                let dashboard = match self.role {
                    Role::Teacher => Route::TeacherDashboard,
                    Role::Student => Route::StudentDashboard,
                };
                Outcome::navigate(self.ctx.redirect(dashboard))
            }
            Err(ClientError::NotAuthenticated) => {
                self.notice
                    .set_error("Authentication error. Please login again.");
                let login = match self.role {
                    Role::Teacher => Route::TeacherLogin,
                    Role::Student => Route::StudentLogin,
                };
                Outcome::navigate(Navigation::now(login))
            }
            Err(err) if err.status() == Some(401) => {
                self.notice.set_error("Current password is incorrect");
                Outcome::Failed
            }
            Err(err) => {
                warn!(error = %err, role = self.role.as_str(), "password change failed");
                self.notice
                    .set_error(err.display("Failed to change password. Please try again."));
                Outcome::Failed
            }
        }
    }

    async fn change(&self, session: &Session) -> Result<String, ClientError> {
        let path = match self.role {
            Role::Teacher => format!(
                "/teacher-change-password/{}/",
                require_teacher(session)?.teacher_id
            ),
            Role::Student => format!(
                "/student-change-password/{}/",
                require_student(session)?.student_id
            ),
        };
        self.form.validate()?;

        let request = ApiRequest::post(path).json(&ChangePasswordRequest {
            current_password: self.form.current_password.clone(),
            new_password: self.form.new_password.clone(),
        })?;
        let envelope = self.ctx.gateway.send(request).await?.envelope()?;
        if !envelope.is_success() {
            return Err(ClientError::Rejected(
                envelope
                    .message_text()
                    .unwrap_or("Failed to change password")
                    .to_string(),
            ));
        }
        Ok(envelope
            .message_text()
            .unwrap_or("Password changed successfully!")
            .to_string())
    }
}

#[cfg(test)]
#[path = "../tests/auth_tests.rs"]
mod tests;
