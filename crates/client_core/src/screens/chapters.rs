//! Course chapters: list, edit in place, delete, and the add-chapter form.

use shared::{
    domain::{Chapter, ChapterId, Course, CourseId},
    session::Session,
};
use tracing::{info, warn};

use crate::{
    error::{ClientError, ValidationError},
    forms::{submit_form, Encoding, FieldSpec, FileInput, FileUpload, FormData, FormSchema, MB},
    gateway::{ApiRequest, Method, Part},
    prompt::ConfirmRequest,
    view::{Notice, Outcome, Route, ViewState},
};

use super::{require_teacher, ScreenContext};

pub const CHAPTER_VIDEO_MAX_BYTES: u64 = 50 * MB;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContentKind {
    #[default]
    Video,
    YouTube,
    Text,
}

impl ContentKind {
    /// What an existing chapter is primarily made of.
    pub fn of(chapter: &Chapter) -> Self {
        let filled = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.trim().is_empty());
        if filled(&chapter.video) {
            ContentKind::Video
        } else if filled(&chapter.video_url) {
            ContentKind::YouTube
        } else if filled(&chapter.text_content) {
            ContentKind::Text
        } else {
            ContentKind::Video
        }
    }
}

fn video_input() -> FileInput {
    FileInput::new("video", "Video", CHAPTER_VIDEO_MAX_BYTES)
}

/// Edits to an existing chapter. Switching the content kind blanks the
/// fields of the other kinds on the server.
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterEdit {
    pub title: String,
    pub description: String,
    pub remarks: String,
    pub kind: ContentKind,
    pub video: FileInput,
    pub video_url: String,
    pub text_content: String,
}

impl ChapterEdit {
    pub fn from_chapter(chapter: &Chapter) -> Self {
        Self {
            title: chapter.title.clone(),
            description: chapter.description.clone(),
            remarks: chapter.remarks.clone().unwrap_or_default(),
            kind: ContentKind::of(chapter),
            video: video_input(),
            video_url: chapter.video_url.clone().unwrap_or_default(),
            text_content: chapter.text_content.clone().unwrap_or_default(),
        }
    }

    fn parts(&self) -> Vec<(String, Part)> {
        let text = |name: &str, value: &str| (name.to_string(), Part::Text(value.to_string()));
        let mut parts = vec![
            text("title", &self.title),
            text("description", &self.description),
            text("remarks", &self.remarks),
        ];
        match self.kind {
            ContentKind::Video => {
                if let Some(file) = self.video.selected() {
                    parts.push(("video".into(), Part::File(file.clone())));
                }
                parts.push(text("video_url", ""));
                parts.push(text("text_content", ""));
            }
            ContentKind::YouTube => {
                parts.push(text("video_url", &self.video_url));
                parts.push(text("video", ""));
                parts.push(text("text_content", ""));
            }
            ContentKind::Text => {
                parts.push(text("text_content", &self.text_content));
                parts.push(text("video", ""));
                parts.push(text("video_url", ""));
            }
        }
        parts
    }
}

pub struct ChaptersScreen {
    ctx: ScreenContext,
    course_id: CourseId,
    pub state: ViewState<Vec<Chapter>>,
    pub notice: Notice,
    pub editing: Option<(ChapterId, ChapterEdit)>,
}

impl ChaptersScreen {
    pub fn new(ctx: ScreenContext, course_id: CourseId) -> Self {
        Self {
            ctx,
            course_id,
            state: ViewState::Idle,
            notice: Notice::default(),
            editing: None,
        }
    }

    pub async fn activate(&mut self) {
        self.state = ViewState::Loading;
        self.state = match self.fetch_chapters().await {
            Ok(chapters) => ViewState::Ready(chapters),
            Err(err) => {
                warn!(course_id = %self.course_id, error = %err, "chapters: load failed");
                ViewState::Failed("Failed to load chapters. Please try again later.".into())
            }
        };
    }

    async fn fetch_chapters(&self) -> Result<Vec<Chapter>, ClientError> {
        let path = format!("/course-chapters/{}/", self.course_id);
        let response = self.ctx.gateway.send(ApiRequest::get(path)).await?;
        // Older backends return a bare list, newer ones wrap it.
        if response.body.is_array() {
            return Ok(response.decode()?);
        }
        let envelope = response.envelope()?;
        Ok(envelope.field::<Vec<Chapter>>("chapters")?.unwrap_or_default())
    }

    pub fn chapters(&self) -> &[Chapter] {
        self.state.ready().map(Vec::as_slice).unwrap_or_default()
    }

    pub fn begin_edit(&mut self, chapter_id: ChapterId) -> bool {
        let edit = self
            .chapters()
            .iter()
            .find(|chapter| chapter.id == chapter_id)
            .map(ChapterEdit::from_chapter);
        match edit {
            Some(edit) => {
                self.editing = Some((chapter_id, edit));
                true
            }
            None => false,
        }
    }

    pub fn select_video(&mut self, file: FileUpload) -> Result<(), ValidationError> {
        let Some((_, edit)) = self.editing.as_mut() else {
            return Err(ValidationError::new("No chapter is being edited"));
        };
        let result = edit.video.select(file);
        if let Err(err) = &result {
            self.notice.set_error(err.message.clone());
        }
        result
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    pub async fn save_edit(&mut self) -> Outcome {
        let Some((chapter_id, edit)) = self.editing.clone() else {
            return Outcome::Cancelled;
        };
        self.notice.clear();

        let request = ApiRequest::put(format!("/chapter/{chapter_id}/")).multipart(edit.parts());
        match self.ctx.gateway.send(request).await {
            Ok(response) => {
                match response.decode::<Chapter>() {
                    Ok(updated) => {
                        if let Some(chapters) = self.state.ready_mut() {
                            if let Some(slot) = chapters.iter_mut().find(|c| c.id == chapter_id) {
                                *slot = updated;
                            }
                        }
                    }
                    Err(_) => self.activate().await,
                }
                info!(%chapter_id, "chapter updated");
                self.editing = None;
                self.notice.set_success("Chapter updated successfully!");
                Outcome::done()
            }
            Err(err) => {
                warn!(%chapter_id, error = %err, "chapter update failed");
                self.notice
                    .set_error("Failed to update chapter. Please try again later.");
                Outcome::Failed
            }
        }
    }

    pub async fn delete_chapter(&mut self, chapter_id: ChapterId) -> Outcome {
        let request = ConfirmRequest::new(
            "Delete Chapter",
            "Are you sure you want to delete this chapter? This action cannot be undone.",
            "Yes, delete it!",
        );
        match self
            .ctx
            .confirm_delete(request, format!("/chapter/{chapter_id}/"))
            .await
        {
            Ok(false) => Outcome::Cancelled,
            Ok(true) => {
                if let Some(chapters) = self.state.ready_mut() {
                    chapters.retain(|chapter| chapter.id != chapter_id);
                }
                self.notice
                    .set_success("Chapter has been deleted successfully.");
                Outcome::done()
            }
            Err(err) => {
                warn!(%chapter_id, error = %err, "chapter delete failed");
                self.notice
                    .set_error("Failed to delete chapter. Please try again later.");
                Outcome::Failed
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChapterDraft {
    pub title: String,
    pub description: String,
    pub kind: ContentKind,
    pub video: FileInput,
    pub video_url: String,
    pub text_content: String,
    pub remarks: String,
}

impl Default for ChapterDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            kind: ContentKind::Video,
            video: video_input(),
            video_url: String::new(),
            text_content: String::new(),
            remarks: String::new(),
        }
    }
}

impl ChapterDraft {
    fn check_content(&self) -> Result<(), ValidationError> {
        let has_text = !self.text_content.trim().is_empty();
        match self.kind {
            ContentKind::Video if self.video.selected().is_none() && !has_text => Err(
                ValidationError::new("Please upload a video or provide text content"),
            ),
            ContentKind::YouTube if self.video_url.trim().is_empty() && !has_text => Err(
                ValidationError::new("Please provide a YouTube URL or text content"),
            ),
            _ => Ok(()),
        }
    }

    fn form_data(&self) -> FormData {
        let video_url = self.video_url.trim();
        let mut form = FormData::new()
            .with_text("title", self.title.trim())
            .with_text("description", self.description.trim())
            .with_file("video", self.video.selected().cloned())
            .with_text("text_content", self.text_content.clone())
            .with_text("remarks", self.remarks.clone());
        if !video_url.is_empty() {
            form = form.with_text("video_url", video_url);
        }
        form
    }
}

fn chapter_schema() -> FormSchema {
    FormSchema::new(vec![
        FieldSpec::text("title", "Title"),
        FieldSpec::text("description", "Description"),
        FieldSpec::file("video", "Video", CHAPTER_VIDEO_MAX_BYTES).optional(),
        FieldSpec::text("video_url", "YouTube URL").optional(),
        FieldSpec::text("text_content", "Text content").optional(),
        FieldSpec::text("remarks", "Remarks").optional(),
    ])
}

pub struct AddChapterScreen {
    ctx: ScreenContext,
    course_id: CourseId,
    pub course: ViewState<Course>,
    pub draft: ChapterDraft,
    pub notice: Notice,
}

impl AddChapterScreen {
    pub fn new(ctx: ScreenContext, course_id: CourseId) -> Self {
        Self {
            ctx,
            course_id,
            course: ViewState::Idle,
            draft: ChapterDraft::default(),
            notice: Notice::default(),
        }
    }

    pub async fn activate(&mut self, session: &Session) -> Result<(), ClientError> {
        require_teacher(session)?;
        self.course = ViewState::Loading;
        self.course = match self
            .ctx
            .fetch::<Course>(format!("/course/{}/", self.course_id))
            .await
        {
            Ok(course) => ViewState::Ready(course),
            Err(err) => ViewState::Failed(err.display("Failed to load course details")),
        };
        Ok(())
    }

    pub fn select_video(&mut self, file: FileUpload) -> Result<(), ValidationError> {
        let result = self.draft.video.select(file);
        if let Err(err) = &result {
            self.notice.set_error(err.message.clone());
        }
        result
    }

    pub async fn submit(&mut self) -> Outcome {
        self.notice.clear();
        if let Err(err) = self.draft.check_content() {
            self.notice.set_error(err.message);
            return Outcome::Failed;
        }

        let result = submit_form(
            self.ctx.gateway.as_ref(),
            Method::Post,
            format!("/course/{}/chapters/", self.course_id),
            &chapter_schema(),
            &self.draft.form_data(),
            Encoding::Multipart,
        )
        .await;

        match result {
            Ok(_) => {
                info!(course_id = %self.course_id, "chapter added");
                self.draft = ChapterDraft::default();
                self.notice.set_success("Chapter added successfully!");
                Outcome::navigate(self.ctx.redirect(Route::TeacherCourses))
            }
            Err(err) => {
                warn!(course_id = %self.course_id, error = %err, "add chapter failed");
                self.notice
                    .set_error(err.display("Failed to add chapter. Please try again."));
                Outcome::Failed
            }
        }
    }
}

#[cfg(test)]
#[path = "../tests/chapters_tests.rs"]
mod tests;
