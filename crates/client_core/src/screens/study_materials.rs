//! Per-course study materials: list, upload, delete.

use shared::{
    domain::{Course, CourseId, MaterialId, StudyMaterial, TeacherId},
    session::Session,
};
use tracing::{info, warn};

use crate::{
    error::{ClientError, ValidationError},
    forms::{submit_form, Encoding, FieldSpec, FileInput, FileUpload, FormData, FormSchema, MB},
    gateway::Method,
    prompt::ConfirmRequest,
    view::{Notice, Outcome, ViewState},
};

use super::{require_teacher, ScreenContext};

pub const MATERIAL_MAX_BYTES: u64 = 10 * MB;

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialDraft {
    pub title: String,
    pub description: String,
    pub remarks: String,
    pub file: FileInput,
}

impl Default for MaterialDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            remarks: String::new(),
            file: FileInput::new("file", "File", MATERIAL_MAX_BYTES),
        }
    }
}

fn material_schema() -> FormSchema {
    FormSchema::new(vec![
        FieldSpec::text("title", "Title").min_len(3),
        FieldSpec::text("description", "Description").optional(),
        FieldSpec::file("file", "File", MATERIAL_MAX_BYTES),
        FieldSpec::text("remarks", "Remarks").optional(),
        FieldSpec::select("course", "Course"),
        FieldSpec::select("teacher", "Teacher"),
    ])
}

pub struct StudyMaterialsScreen {
    ctx: ScreenContext,
    course_id: CourseId,
    teacher_id: Option<TeacherId>,
    pub course: ViewState<Course>,
    pub state: ViewState<Vec<StudyMaterial>>,
    pub notice: Notice,
    pub draft: MaterialDraft,
}

impl StudyMaterialsScreen {
    pub fn new(ctx: ScreenContext, course_id: CourseId) -> Self {
        Self {
            ctx,
            course_id,
            teacher_id: None,
            course: ViewState::Idle,
            state: ViewState::Idle,
            notice: Notice::default(),
            draft: MaterialDraft::default(),
        }
    }

    pub async fn activate(&mut self, session: &Session) -> Result<(), ClientError> {
        self.teacher_id = Some(require_teacher(session)?.teacher_id);
        self.reload().await;

        self.course = ViewState::Loading;
        self.course = match self
            .ctx
            .fetch::<Course>(format!("/course/{}/", self.course_id))
            .await
        {
            Ok(course) => ViewState::Ready(course),
            Err(err) => {
                warn!(course_id = %self.course_id, error = %err, "study materials: course load failed");
                ViewState::Failed("Failed to load course details".into())
            }
        };
        Ok(())
    }

    async fn reload(&mut self) {
        self.state = ViewState::Loading;
        self.state = match self
            .ctx
            .fetch::<Vec<StudyMaterial>>(format!("/study-materials/{}/", self.course_id))
            .await
        {
            Ok(materials) => ViewState::Ready(materials),
            Err(err) => {
                warn!(course_id = %self.course_id, error = %err, "study materials: load failed");
                ViewState::Failed("Failed to load study materials. Please try again later.".into())
            }
        };
    }

    pub fn materials(&self) -> &[StudyMaterial] {
        self.state.ready().map(Vec::as_slice).unwrap_or_default()
    }

    /// Absolute download link for a material's file.
    pub fn file_url(&self, material: &StudyMaterial) -> String {
        self.ctx.media.resolve(material.file.as_deref())
    }

    pub fn select_file(&mut self, file: FileUpload) -> Result<(), ValidationError> {
        let result = self.draft.file.select(file);
        if let Err(err) = &result {
            self.notice.set_error(err.message.clone());
        }
        result
    }

    pub async fn upload(&mut self) -> Outcome {
        self.notice.clear();
        if self.draft.title.trim().chars().count() < 3 {
            self.notice
                .set_error("Title must be at least 3 characters long.");
            return Outcome::Failed;
        }
        if self.draft.file.selected().is_none() {
            self.notice.set_error("Please select a file to upload.");
            return Outcome::Failed;
        }

        let form = FormData::new()
            .with_text("title", self.draft.title.trim())
            .with_text("description", self.draft.description.clone())
            .with_file("file", self.draft.file.selected().cloned())
            .with_text("remarks", self.draft.remarks.clone())
            .with_choice("course", Some(self.course_id.0))
            .with_choice("teacher", self.teacher_id.map(|id| id.0));

        let result = submit_form(
            self.ctx.gateway.as_ref(),
            Method::Post,
            "/study-materials/",
            &material_schema(),
            &form,
            Encoding::Multipart,
        )
        .await;

        match result {
            Ok(response) if response.is_created() => {
                info!(course_id = %self.course_id, "study material uploaded");
                self.draft = MaterialDraft::default();
                self.notice
                    .set_success("Study material uploaded successfully!");
                self.reload().await;
                Outcome::done()
            }
            Ok(_) => Outcome::done(),
            Err(err) => {
                warn!(course_id = %self.course_id, error = %err, "study material upload failed");
                self.notice.set_error(
                    err.display("Failed to upload study material. Please try again."),
                );
                Outcome::Failed
            }
        }
    }

    pub async fn delete_material(&mut self, material_id: MaterialId) -> Outcome {
        match self
            .ctx
            .confirm_delete(
                ConfirmRequest::destructive("You won't be able to revert this!"),
                format!("/study-material-detail/{material_id}/"),
            )
            .await
        {
            Ok(false) => Outcome::Cancelled,
            Ok(true) => {
                if let Some(materials) = self.state.ready_mut() {
                    materials.retain(|material| material.id != material_id);
                }
                self.notice.set_success("Study material has been deleted.");
                Outcome::done()
            }
            Err(err) => {
                warn!(%material_id, error = %err, "study material delete failed");
                self.notice.set_error("Failed to delete study material.");
                Outcome::Failed
            }
        }
    }
}

#[cfg(test)]
#[path = "../tests/study_materials_tests.rs"]
mod tests;
