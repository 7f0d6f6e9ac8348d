//! Assignment review and grading (teacher), creation (teacher) and
//! submission (student).

use chrono::NaiveDate;
use serde_json::Value;
use shared::{
    domain::{Assignment, AssignmentId, Course, CourseId, StudentId, StudentProfile},
    protocol::{Envelope, GradeRequest},
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

use super::{merge_record, require_student, ScreenContext};

pub const GRADES: [&str; 5] = ["A", "B", "C", "D", "F"];
pub const SUBMISSION_MAX_BYTES: u64 = 10 * MB;

fn rejected(envelope: &Envelope, fallback: &str) -> ClientError {
    ClientError::Rejected(envelope.message_text().unwrap_or(fallback).to_string())
}

fn patch_row(rows: &mut [Assignment], id: AssignmentId, patch: &Value) {
    if let Some(row) = rows.iter_mut().find(|row| row.id == id) {
        match merge_record(row, patch) {
            Ok(merged) => *row = merged,
            Err(err) => warn!(assignment_id = %id, error = %err, "could not merge assignment"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentAssignments {
    pub student_name: String,
    pub assignments: Vec<Assignment>,
}

async fn load_assignments(
    ctx: &ScreenContext,
    student_id: StudentId,
) -> Result<StudentAssignments, ClientError> {
    let envelope = ctx
        .gateway
        .send(ApiRequest::get(format!("/student-assignments/{student_id}/")))
        .await?
        .envelope()?;
    if !envelope.is_success() {
        return Err(rejected(
            &envelope,
            "Failed to load assignments. Please try again later.",
        ));
    }
    Ok(StudentAssignments {
        student_name: envelope.field::<String>("student_name")?.unwrap_or_default(),
        assignments: envelope.field("assignments")?.unwrap_or_default(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentEdit {
    pub title: String,
    pub description: String,
    pub due_date: String,
}

pub struct CheckAssignmentsScreen {
    ctx: ScreenContext,
    student_id: StudentId,
    pub state: ViewState<StudentAssignments>,
    pub notice: Notice,
    pub editing: Option<(AssignmentId, AssignmentEdit)>,
}

impl CheckAssignmentsScreen {
    pub fn new(ctx: ScreenContext, student_id: StudentId) -> Self {
        Self {
            ctx,
            student_id,
            state: ViewState::Idle,
            notice: Notice::default(),
            editing: None,
        }
    }

    pub async fn activate(&mut self) {
        self.state = ViewState::Loading;
        self.state = match load_assignments(&self.ctx, self.student_id).await {
            Ok(data) => ViewState::Ready(data),
            Err(err) => {
                warn!(student_id = %self.student_id, error = %err, "check assignments: load failed");
                ViewState::Failed("Failed to load assignments. Please try again later.".into())
            }
        };
    }

    pub fn assignments(&self) -> &[Assignment] {
        self.state
            .ready()
            .map(|data| data.assignments.as_slice())
            .unwrap_or_default()
    }

    fn rows_mut(&mut self) -> Option<&mut Vec<Assignment>> {
        self.state.ready_mut().map(|data| &mut data.assignments)
    }

    pub async fn delete_assignment(&mut self, assignment_id: AssignmentId) -> Outcome {
        let request = ConfirmRequest::destructive("This action cannot be undone!");
        if !self.ctx.prompt.confirm(request).await.is_confirmed() {
            return Outcome::Cancelled;
        }

        let result: Result<(), ClientError> = async {
            let envelope = self
                .ctx
                .gateway
                .send(ApiRequest::delete(format!("/delete-assignment/{assignment_id}/")))
                .await?
                .envelope()?;
            if envelope.is_success() {
                Ok(())
            } else {
                Err(rejected(&envelope, "Failed to delete assignment"))
            }
        }
        .await;

        match result {
            Ok(()) => {
                if let Some(rows) = self.rows_mut() {
                    rows.retain(|row| row.id != assignment_id);
                }
                self.notice.set_success("Assignment deleted successfully!");
                Outcome::done()
            }
            Err(err) => {
                warn!(%assignment_id, error = %err, "delete assignment failed");
                self.notice
                    .set_error("Failed to delete assignment. Please try again later.");
                Outcome::Failed
            }
        }
    }

    /// Grades a submitted assignment. Unsubmitted work is refused locally.
    pub async fn grade(&mut self, assignment_id: AssignmentId, grade: &str) -> Outcome {
        self.notice.clear();
        let submitted = self
            .assignments()
            .iter()
            .find(|a| a.id == assignment_id)
            .map(Assignment::is_submitted);
        let Some(submitted) = submitted else {
            self.notice.set_error("Assignment not found");
            return Outcome::Failed;
        };
        if !submitted {
            self.notice
                .set_error("Cannot grade an assignment that has not been submitted yet.");
            return Outcome::Failed;
        }
        if !GRADES.contains(&grade) {
            self.notice.set_error(format!(
                "Invalid grade. Must be one of: {}",
                GRADES.join(", ")
            ));
            return Outcome::Failed;
        }

        let result: Result<(), ClientError> = async {
            let request = ApiRequest::post(format!("/grade-assignment/{assignment_id}/")).json(
                &GradeRequest {
                    grade: grade.to_string(),
                },
            )?;
            let envelope = self.ctx.gateway.send(request).await?.envelope()?;
            if envelope.is_success() {
                Ok(())
            } else {
                Err(rejected(&envelope, "Failed to grade assignment. Please try again."))
            }
        }
        .await;

        match result {
            Ok(()) => {
                if let Some(row) = self
                    .rows_mut()
                    .and_then(|rows| rows.iter_mut().find(|row| row.id == assignment_id))
                {
                    row.grade = Some(grade.to_string());
                }
                info!(%assignment_id, grade, "assignment graded");
                self.notice.set_success("Assignment graded successfully!");
                Outcome::done()
            }
            Err(err) => {
                warn!(%assignment_id, error = %err, "grading failed");
                self.notice
                    .set_error(err.display("Failed to grade assignment"));
                Outcome::Failed
            }
        }
    }

    pub fn begin_edit(&mut self, assignment_id: AssignmentId) -> bool {
        let edit = self
            .assignments()
            .iter()
            .find(|a| a.id == assignment_id)
            .map(|a| AssignmentEdit {
                title: a.title.clone(),
                description: a.description.clone(),
                due_date: a.due_date.format("%Y-%m-%d").to_string(),
            });
        match edit {
            Some(edit) => {
                self.editing = Some((assignment_id, edit));
                true
            }
            None => false,
        }
    }

    pub async fn save_edit(&mut self) -> Outcome {
        let Some((assignment_id, edit)) = self.editing.clone() else {
            return Outcome::Cancelled;
        };
        self.notice.clear();
        if edit.title.trim().is_empty() || edit.due_date.trim().is_empty() {
            self.notice.set_error("Title and due date are required");
            return Outcome::Failed;
        }
        if NaiveDate::parse_from_str(edit.due_date.trim(), "%Y-%m-%d").is_err() {
            self.notice.set_error("Due date must be a date (YYYY-MM-DD)");
            return Outcome::Failed;
        }

        let request = ApiRequest::put(format!("/update-assignment/{assignment_id}/")).multipart(vec![
            ("title".into(), Part::Text(edit.title.trim().to_string())),
            ("description".into(), Part::Text(edit.description.clone())),
            ("due_date".into(), Part::Text(edit.due_date.trim().to_string())),
        ]);
        let result: Result<Value, ClientError> = async {
            let envelope = self.ctx.gateway.send(request).await?.envelope()?;
            if envelope.is_success() {
                Ok(envelope.fields.get("data").cloned().unwrap_or(Value::Null))
            } else {
                Err(rejected(&envelope, "Failed to update assignment. Please try again."))
            }
        }
        .await;

        match result {
            Ok(patch) => {
                if let Some(rows) = self.rows_mut() {
                    patch_row(rows, assignment_id, &patch);
                }
                self.editing = None;
                self.notice.set_success("Assignment updated successfully!");
                Outcome::done()
            }
            Err(err) => {
                warn!(%assignment_id, error = %err, "assignment update failed");
                self.notice
                    .set_error(err.display("Failed to update assignment"));
                Outcome::Failed
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentDraft {
    pub title: String,
    pub description: String,
    pub due_date: String,
    pub course: Option<CourseId>,
    pub file: FileInput,
}

impl Default for AssignmentDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            due_date: String::new(),
            course: None,
            file: FileInput::new("assignment_file", "Assignment", SUBMISSION_MAX_BYTES),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentTarget {
    pub student: StudentProfile,
    pub courses: Vec<Course>,
}

fn assignment_schema() -> FormSchema {
    FormSchema::new(vec![
        FieldSpec::text("title", "Title"),
        FieldSpec::text("description", "Description"),
        FieldSpec::date("due_date", "Due date"),
        FieldSpec::select("course", "Course"),
        FieldSpec::file("assignment_file", "Assignment", SUBMISSION_MAX_BYTES).optional(),
    ])
}

pub struct AddAssignmentScreen {
    ctx: ScreenContext,
    student_id: StudentId,
    pub target: ViewState<AssignmentTarget>,
    pub draft: AssignmentDraft,
    pub notice: Notice,
}

impl AddAssignmentScreen {
    pub fn new(ctx: ScreenContext, student_id: StudentId) -> Self {
        Self {
            ctx,
            student_id,
            target: ViewState::Idle,
            draft: AssignmentDraft::default(),
            notice: Notice::default(),
        }
    }

    pub async fn activate(&mut self) {
        self.target = ViewState::Loading;
        self.target = match self.load_target().await {
            Ok(target) => ViewState::Ready(target),
            Err(err) => {
                warn!(student_id = %self.student_id, error = %err, "add assignment: load failed");
                ViewState::Failed(err.display("Failed to load student data. Please try again later."))
            }
        };
    }

    async fn load_target(&self) -> Result<AssignmentTarget, ClientError> {
        let student: StudentProfile = self.ctx.fetch(format!("/student/{}/", self.student_id)).await?;
        let courses = self
            .ctx
            .fetch_enveloped::<Course>(format!("/student-courses/{}/", self.student_id), "courses")
            .await?;
        Ok(AssignmentTarget { student, courses })
    }

    pub fn select_file(&mut self, file: FileUpload) -> Result<(), ValidationError> {
        let result = self.draft.file.select(file);
        if let Err(err) = &result {
            self.notice.set_error(err.message.clone());
        }
        result
    }

    pub async fn submit(&mut self) -> Outcome {
        self.notice.clear();
        let form = FormData::new()
            .with_text("title", self.draft.title.trim())
            .with_text("description", self.draft.description.trim())
            .with_text("due_date", self.draft.due_date.trim())
            .with_choice("course", self.draft.course.map(|id| id.0))
            .with_file("assignment_file", self.draft.file.selected().cloned());

        let result: Result<Option<Assignment>, ClientError> = async {
            let envelope = submit_form(
                self.ctx.gateway.as_ref(),
                Method::Post,
                format!("/add-assignment/{}/", self.student_id),
                &assignment_schema(),
                &form,
                Encoding::Multipart,
            )
            .await?
            .envelope()?;
            if envelope.is_success() {
                Ok(envelope.field::<Assignment>("data").ok().flatten())
            } else {
                Err(rejected(&envelope, "Failed to add assignment. Please try again."))
            }
        }
        .await;

        match result {
            Ok(created) => {
                let attached = created
                    .and_then(|assignment| assignment.assignment_file)
                    .and_then(|path| path.rsplit('/').next().map(str::to_string))
                    .filter(|name| !name.is_empty());
                match attached {
                    Some(name) => self
                        .notice
                        .set_success(format!("Assignment added successfully with file: {name}")),
                    None => self.notice.set_success("Assignment added successfully!"),
                }
                self.draft = AssignmentDraft::default();
                Outcome::navigate(self.ctx.redirect(Route::CheckAssignments(self.student_id)))
            }
            Err(err) if err.is_validation() => {
                self.notice.set_error(err.display(""));
                Outcome::Failed
            }
            Err(err) => {
                warn!(student_id = %self.student_id, error = %err, "add assignment failed");
                self.notice
                    .set_error("Failed to add assignment. Please try again.");
                Outcome::Failed
            }
        }
    }
}

/// The signed-in student's own assignments, with file submission.
pub struct StudentAssignmentsScreen {
    ctx: ScreenContext,
    pub state: ViewState<StudentAssignments>,
    pub notice: Notice,
}

impl StudentAssignmentsScreen {
    pub fn new(ctx: ScreenContext) -> Self {
        Self {
            ctx,
            state: ViewState::Idle,
            notice: Notice::default(),
        }
    }

    pub async fn activate(&mut self, session: &Session) -> Result<(), ClientError> {
        let student_id = require_student(session)?.student_id;
        self.state = ViewState::Loading;
        self.state = match load_assignments(&self.ctx, student_id).await {
            Ok(data) => ViewState::Ready(data),
            Err(err) => {
                warn!(%student_id, error = %err, "student assignments: load failed");
                ViewState::Failed("Failed to load assignments. Please try again later.".into())
            }
        };
        Ok(())
    }

    pub fn assignments(&self) -> &[Assignment] {
        self.state
            .ready()
            .map(|data| data.assignments.as_slice())
            .unwrap_or_default()
    }

    pub async fn submit(&mut self, assignment_id: AssignmentId, file: Option<FileUpload>) -> Outcome {
        self.notice.clear();
        let Some(file) = file else {
            self.notice.set_error("Please select a file to submit");
            return Outcome::Failed;
        };
        if file.size() > SUBMISSION_MAX_BYTES {
            self.notice
                .set_error("Please select a file smaller than 10MB");
            return Outcome::Failed;
        }

        let request = ApiRequest::post(format!("/submit-assignment/{assignment_id}/"))
            .multipart(vec![("submitted_file".into(), Part::File(file))]);
        let result: Result<Value, ClientError> = async {
            let envelope = self.ctx.gateway.send(request).await?.envelope()?;
            if envelope.is_success() {
                Ok(envelope.fields.get("data").cloned().unwrap_or(Value::Null))
            } else {
                Err(rejected(&envelope, "Failed to submit assignment"))
            }
        }
        .await;

        match result {
            Ok(patch) => {
                if let Some(data) = self.state.ready_mut() {
                    patch_row(&mut data.assignments, assignment_id, &patch);
                }
                info!(%assignment_id, "assignment submitted");
                self.notice
                    .set_success("Your assignment has been submitted successfully!");
                Outcome::done()
            }
            Err(err) => {
                warn!(%assignment_id, error = %err, "submission failed");
                self.notice
                    .set_error(err.display("Failed to submit assignment"));
                Outcome::Failed
            }
        }
    }
}

#[cfg(test)]
#[path = "../tests/assignments_tests.rs"]
mod tests;
