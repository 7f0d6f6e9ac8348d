//! Profile settings for the signed-in teacher or student.

use serde_json::Value;
use shared::{
    domain::{Role, StudentProfile, TeacherProfile},
    protocol::RemoveProfileImageRequest,
    session::Session,
};
use tracing::{info, warn};

use crate::{
    error::{ClientError, ValidationError},
    forms::{FileInput, FileUpload, MB},
    gateway::{ApiRequest, ApiResponse, Part},
    view::{Notice, Outcome, ViewState},
};

use super::{merge_record, require_student, require_teacher, ScreenContext};

pub const PROFILE_IMAGE_MAX_BYTES: u64 = 2 * MB;

#[derive(Debug, Clone, PartialEq)]
pub enum Profile {
    Teacher(TeacherProfile),
    Student(StudentProfile),
}

impl Profile {
    pub fn display_name(&self) -> &str {
        match self {
            Profile::Teacher(teacher) => &teacher.full_name,
            Profile::Student(student) => &student.fullname,
        }
    }

    pub fn profile_img(&self) -> Option<&str> {
        match self {
            Profile::Teacher(teacher) => teacher.profile_img.as_deref(),
            Profile::Student(student) => student.profile_img.as_deref(),
        }
    }

    fn clear_image(&mut self) {
        match self {
            Profile::Teacher(teacher) => teacher.profile_img = None,
            Profile::Student(student) => student.profile_img = None,
        }
    }

    /// Overlays a (possibly partial) server record.
    fn merged(&self, patch: &Value) -> Result<Profile, ClientError> {
        Ok(match self {
            Profile::Teacher(teacher) => Profile::Teacher(merge_record(teacher, patch)?),
            Profile::Student(student) => Profile::Student(merge_record(student, patch)?),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileDetails {
    Teacher {
        qualification: String,
        mobile_number: String,
        skills: String,
    },
    Student {
        username: String,
        interested_categories: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileDraft {
    pub full_name: String,
    pub email: String,
    /// Sent only when non-empty.
    pub password: String,
    pub image: FileInput,
    pub details: ProfileDetails,
}

fn image_input() -> FileInput {
    FileInput::new("profile_img", "Profile image", PROFILE_IMAGE_MAX_BYTES).accept("image/")
}

impl ProfileDraft {
    pub fn from_profile(profile: &Profile) -> Self {
        match profile {
            Profile::Teacher(teacher) => Self {
                full_name: teacher.full_name.clone(),
                email: teacher.email.clone(),
                password: String::new(),
                image: image_input(),
                details: ProfileDetails::Teacher {
                    qualification: teacher.qualification.clone(),
                    mobile_number: teacher.mobile_number.clone(),
                    skills: teacher.skills.clone(),
                },
            },
            Profile::Student(student) => Self {
                full_name: student.fullname.clone(),
                email: student.email.clone(),
                password: String::new(),
                image: image_input(),
                details: ProfileDetails::Student {
                    username: student.username.clone(),
                    interested_categories: student.interested_categories.clone(),
                },
            },
        }
    }

    fn parts(&self) -> Vec<(String, Part)> {
        let text = |name: &str, value: &str| (name.to_string(), Part::Text(value.to_string()));
        let name_key = match self.details {
            ProfileDetails::Teacher { .. } => "full_name",
            ProfileDetails::Student { .. } => "fullname",
        };
        let mut parts = vec![text(name_key, &self.full_name), text("email", &self.email)];
        match &self.details {
            ProfileDetails::Teacher {
                qualification,
                mobile_number,
                skills,
            } => {
                parts.push(text("qualification", qualification));
                parts.push(text("mobile_number", mobile_number));
                parts.push(text("skills", skills));
            }
            ProfileDetails::Student {
                username,
                interested_categories,
            } => {
                parts.push(text("username", username));
                parts.push(text("interested_categories", interested_categories));
            }
        }
        if !self.password.is_empty() {
            parts.push(text("password", &self.password));
        }
        if let Some(file) = self.image.selected() {
            parts.push(("profile_img".into(), Part::File(file.clone())));
        }
        parts
    }
}

pub struct ProfileScreen {
    ctx: ScreenContext,
    role: Role,
    id: Option<i64>,
    pub state: ViewState<Profile>,
    pub draft: Option<ProfileDraft>,
    pub notice: Notice,
}

impl ProfileScreen {
    pub fn new(ctx: ScreenContext, role: Role) -> Self {
        Self {
            ctx,
            role,
            id: None,
            state: ViewState::Idle,
            draft: None,
            notice: Notice::default(),
        }
    }

    fn path(&self, id: i64) -> String {
        format!("/{}/{id}/", self.role.as_str())
    }

    pub async fn activate(&mut self, session: &Session) -> Result<(), ClientError> {
        let id = match self.role {
            Role::Teacher => require_teacher(session)?.teacher_id.0,
            Role::Student => require_student(session)?.student_id.0,
        };
        self.id = Some(id);
        self.state = ViewState::Loading;

        let result: Result<Profile, ClientError> = async {
            let response = self.ctx.gateway.send(ApiRequest::get(self.path(id))).await?;
            match self.role {
                Role::Teacher => Ok(Profile::Teacher(response.decode()?)),
                Role::Student => {
                    let data = enveloped_record(&response)?;
                    Ok(Profile::Student(serde_json::from_value(data)?))
                }
            }
        }
        .await;

        match result {
            Ok(profile) => {
                self.draft = Some(ProfileDraft::from_profile(&profile));
                self.state = ViewState::Ready(profile);
            }
            Err(err) => {
                warn!(role = self.role.as_str(), id, error = %err, "profile: load failed");
                self.state = ViewState::Failed("Failed to load profile data".into());
            }
        }
        Ok(())
    }

    pub fn image_url(&self) -> String {
        self.ctx
            .media
            .resolve(self.state.ready().and_then(Profile::profile_img))
    }

    pub fn select_image(&mut self, file: FileUpload) -> Result<(), ValidationError> {
        let Some(draft) = self.draft.as_mut() else {
            return Err(ValidationError::new("Profile is not loaded"));
        };
        let result = draft.image.select(file);
        if let Err(err) = &result {
            self.notice.set_error(err.message.clone());
        }
        result
    }

    /// Saves the draft and refreshes the signed-in user's cached name and email.
    pub async fn save(&mut self, session: &mut Session) -> Outcome {
        let (Some(id), Some(draft)) = (self.id, self.draft.clone()) else {
            return Outcome::Failed;
        };
        self.notice.clear();

        let request = ApiRequest::put(self.path(id)).multipart(draft.parts());
        let result: Result<Value, ClientError> = async {
            let response = self.ctx.gateway.send(request).await?;
            match self.role {
                Role::Teacher => Ok(response.body),
                Role::Student => enveloped_record(&response),
            }
        }
        .await;

        let updated = result.and_then(|patch| match self.state.ready() {
            Some(current) => current.merged(&patch),
            None => Err(ClientError::Rejected(String::new())),
        });

        match updated {
            Ok(profile) => {
                refresh_session(session, &profile);
                info!(role = self.role.as_str(), id, "profile updated");
                self.draft = Some(ProfileDraft::from_profile(&profile));
                self.state = ViewState::Ready(profile);
                self.notice.set_success("Profile updated successfully");
                Outcome::done()
            }
            Err(err) => {
                warn!(role = self.role.as_str(), id, error = %err, "profile update failed");
                self.notice
                    .set_error(err.display("Failed to update profile"));
                Outcome::Failed
            }
        }
    }

    pub async fn remove_image(&mut self) -> Outcome {
        let Some(id) = self.id else {
            return Outcome::Failed;
        };
        self.notice.clear();

        let result: Result<(), ClientError> = async {
            let request = ApiRequest::patch(self.path(id))
                .json(&RemoveProfileImageRequest { remove_profile_img: true })?;
            self.ctx.gateway.send(request).await?;
            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                if let Some(profile) = self.state.ready_mut() {
                    profile.clear_image();
                }
                if let Some(draft) = self.draft.as_mut() {
                    draft.image.clear();
                }
                self.notice.set_success("Profile image removed successfully");
                Outcome::done()
            }
            Err(err) => {
                warn!(role = self.role.as_str(), id, error = %err, "profile image removal failed");
                self.notice.set_error("Failed to remove profile image");
                Outcome::Failed
            }
        }
    }
}

/// Student profile endpoints wrap the record as `{status, data}`.
fn enveloped_record(response: &ApiResponse) -> Result<Value, ClientError> {
    let envelope = response.envelope()?;
    if !envelope.is_success() {
        return Err(ClientError::Rejected(
            envelope.message_text().unwrap_or_default().to_string(),
        ));
    }
    Ok(envelope.fields.get("data").cloned().unwrap_or(Value::Null))
}

fn refresh_session(session: &mut Session, profile: &Profile) {
    match profile {
        Profile::Teacher(teacher) => {
            if let Some(cached) = session.teacher.as_mut() {
                cached.full_name = teacher.full_name.clone();
                cached.email = teacher.email.clone();
            }
        }
        Profile::Student(student) => {
            if let Some(cached) = session.student.as_mut() {
                cached.fullname = student.fullname.clone();
                cached.email = student.email.clone();
                if !student.username.is_empty() {
                    cached.username = student.username.clone();
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "../tests/profile_tests.rs"]
mod tests;
