//! Add-course and edit-course forms, including the inline category creator.

use serde::Deserialize;
use shared::{
    domain::{Category, CategoryId, Course, CourseId},
    session::Session,
};
use tracing::{info, warn};

use crate::{
    error::{ClientError, ValidationError},
    forms::{submit_form, Encoding, FieldSpec, FileInput, FileUpload, FormData, FormSchema, MB},
    gateway::{ApiRequest, Method, Part},
    view::{Navigation, Notice, Outcome, Route, ViewState},
};

use super::{require_teacher, ScreenContext};

pub const COURSE_IMAGE_MAX_BYTES: u64 = 2 * MB;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseFormMode {
    Add,
    Edit(CourseId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CourseDraft {
    pub category: Option<CategoryId>,
    pub title: String,
    pub description: String,
    pub price: String,
    pub technologies: String,
    pub image: FileInput,
    /// Current image of an edited course, already resolved to a URL.
    pub current_image: Option<String>,
}

impl Default for CourseDraft {
    fn default() -> Self {
        Self {
            category: None,
            title: String::new(),
            description: String::new(),
            price: String::new(),
            technologies: String::new(),
            image: FileInput::new("featured_img", "Image", COURSE_IMAGE_MAX_BYTES).accept("image/"),
            current_image: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryDraft {
    pub title: String,
    pub description: String,
}

#[derive(Deserialize)]
struct CreatedRecord {
    id: i64,
}

fn course_schema(mode: CourseFormMode) -> FormSchema {
    let image = FieldSpec::file("featured_img", "Image", COURSE_IMAGE_MAX_BYTES).accept("image/");
    let mut fields = vec![
        FieldSpec::select("category", "Category"),
        FieldSpec::text("title", "Title").min_len(3),
        FieldSpec::text("description", "Description").min_len(10),
        FieldSpec::number("price", "Price")
            .optional()
            .range(Some(0.0), None),
        match mode {
            CourseFormMode::Add => image,
            CourseFormMode::Edit(_) => image.optional(),
        },
        FieldSpec::text("technologies", "Technologies"),
    ];
    if mode == CourseFormMode::Add {
        fields.push(FieldSpec::select("teacher", "Teacher"));
    }
    FormSchema::new(fields)
}

pub struct CourseFormScreen {
    ctx: ScreenContext,
    mode: CourseFormMode,
    pub categories: ViewState<Vec<Category>>,
    pub draft: CourseDraft,
    pub category_draft: CategoryDraft,
    pub notice: Notice,
    pub submitting: bool,
}

impl CourseFormScreen {
    pub fn new(ctx: ScreenContext, mode: CourseFormMode) -> Self {
        Self {
            ctx,
            mode,
            categories: ViewState::Idle,
            draft: CourseDraft::default(),
            category_draft: CategoryDraft::default(),
            notice: Notice::default(),
            submitting: false,
        }
    }

    pub fn mode(&self) -> CourseFormMode {
        self.mode
    }

    pub async fn activate(&mut self, session: &Session) -> Result<(), ClientError> {
        require_teacher(session)?;

        if let CourseFormMode::Edit(course_id) = self.mode {
            match self.ctx.fetch::<Course>(format!("/course/{course_id}/")).await {
                Ok(course) => self.prefill(&course),
                Err(err) => {
                    warn!(%course_id, error = %err, "edit course: load failed");
                    self.notice.set_error("Failed to load course data");
                }
            }
        }

        self.load_categories().await;
        Ok(())
    }

    fn prefill(&mut self, course: &Course) {
        self.draft.category = course.category.as_ref().map(|category| category.id());
        self.draft.title = course.title.clone();
        self.draft.description = course.description.clone();
        self.draft.price = course.price.to_string();
        self.draft.technologies = course.technologies.clone();
        self.draft.current_image = course
            .featured_img
            .as_deref()
            .map(|path| self.ctx.media.resolve(Some(path)));
    }

    async fn load_categories(&mut self) {
        self.categories = ViewState::Loading;
        self.categories = match self.ctx.fetch::<Vec<Category>>("/category/".into()).await {
            Ok(categories) => ViewState::Ready(categories),
            Err(err) => {
                warn!(error = %err, "course form: categories unavailable");
                ViewState::Failed("Failed to load categories. Please try again later.".into())
            }
        };
    }

    /// Picks the featured image; a rejected file leaves no selection.
    pub fn select_image(&mut self, file: FileUpload) -> Result<(), ValidationError> {
        let result = self.draft.image.select(file);
        if let Err(err) = &result {
            self.notice.set_error(err.message.clone());
        }
        result
    }

    pub async fn create_category(&mut self) -> Outcome {
        let title = self.category_draft.title.trim().to_string();
        let description = self.category_draft.description.trim().to_string();
        if title.is_empty() || description.is_empty() {
            self.notice.set_error("Please fill in all category fields");
            return Outcome::Failed;
        }

        let request = ApiRequest::post("/category/").multipart(vec![
            ("title".into(), Part::Text(title)),
            ("description".into(), Part::Text(description)),
        ]);
        let created = match self.ctx.gateway.send(request).await {
            Ok(response) => response.decode::<CreatedRecord>(),
            Err(err) => Err(err),
        };

        match created {
            Ok(record) => {
                info!(category_id = record.id, "category created");
                self.load_categories().await;
                self.draft.category = Some(CategoryId(record.id));
                self.category_draft = CategoryDraft::default();
                self.notice.set_success("Category created successfully!");
                Outcome::done()
            }
            Err(err) => {
                warn!(error = %err, "create category failed");
                self.notice.set_error("Failed to create category");
                Outcome::Failed
            }
        }
    }

    fn form_data(&self, session: &Session) -> FormData {
        let form = FormData::new()
            .with_choice("category", self.draft.category.map(|id| id.0))
            .with_text("title", self.draft.title.trim())
            .with_text("description", self.draft.description.trim())
            .with_text("price", self.draft.price.trim())
            .with_file("featured_img", self.draft.image.selected().cloned())
            .with_text("technologies", self.draft.technologies.trim());
        match self.mode {
            CourseFormMode::Add => form.with_choice(
                "teacher",
                session.teacher.as_ref().map(|teacher| teacher.teacher_id.0),
            ),
            CourseFormMode::Edit(_) => form,
        }
    }

    pub async fn submit(&mut self, session: &Session) -> Outcome {
        self.notice.clear();
        if require_teacher(session).is_err() {
            self.notice.set_error("Teacher authentication required");
            return Outcome::navigate(Navigation::now(Route::TeacherLogin));
        }

        let (method, path, fallback) = match self.mode {
            CourseFormMode::Add => (
                Method::Post,
                "/course/".to_string(),
                "Failed to add course. Please try again.",
            ),
            CourseFormMode::Edit(course_id) => (
                Method::Put,
                format!("/course/{course_id}/"),
                "Failed to update course. Please try again.",
            ),
        };

        self.submitting = true;
        let result = submit_form(
            self.ctx.gateway.as_ref(),
            method,
            path,
            &course_schema(self.mode),
            &self.form_data(session),
            Encoding::Multipart,
        )
        .await;
        self.submitting = false;

        match result {
            Ok(response) => {
                info!(status = response.status, mode = ?self.mode, "course saved");
                match self.mode {
                    CourseFormMode::Add => {
                        self.draft = CourseDraft::default();
                        self.notice.set_success("Course added successfully!");
                    }
                    CourseFormMode::Edit(_) => {
                        self.draft.image.clear();
                        self.notice.set_success("Course updated successfully!");
                    }
                }
                Outcome::navigate(self.ctx.redirect(Route::TeacherCourses))
            }
            Err(err) => {
                warn!(error = %err, mode = ?self.mode, "course save failed");
                self.notice.set_error(err.display(fallback));
                Outcome::Failed
            }
        }
    }
}

#[cfg(test)]
#[path = "../tests/course_form_tests.rs"]
mod tests;
