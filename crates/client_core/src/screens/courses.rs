use shared::{
    domain::{Course, CourseId, EnrolledStudent},
    session::Session,
};
use tracing::warn;

use crate::{
    error::ClientError,
    prompt::ConfirmRequest,
    view::{Notice, Outcome, ViewState},
};

use super::{require_teacher, ScreenContext};

/// Roster shown for one course.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrolledRoster {
    pub course_id: CourseId,
    pub students: Vec<EnrolledStudent>,
}

pub struct TeacherCoursesScreen {
    ctx: ScreenContext,
    pub state: ViewState<Vec<Course>>,
    pub notice: Notice,
    pub roster: Option<EnrolledRoster>,
}

impl TeacherCoursesScreen {
    pub fn new(ctx: ScreenContext) -> Self {
        Self {
            ctx,
            state: ViewState::Idle,
            notice: Notice::default(),
            roster: None,
        }
    }

    pub async fn activate(&mut self, session: &Session) -> Result<(), ClientError> {
        let teacher_id = require_teacher(session)?.teacher_id;
        self.state = ViewState::Loading;
        self.state = match self
            .ctx
            .fetch::<Vec<Course>>(format!("/teacher-courses/{teacher_id}/"))
            .await
        {
            Ok(courses) => ViewState::Ready(courses),
            Err(err) => {
                warn!(%teacher_id, error = %err, "teacher courses: load failed");
                ViewState::Failed("Failed to load courses. Please try again later.".into())
            }
        };
        Ok(())
    }

    pub fn courses(&self) -> &[Course] {
        self.state.ready().map(Vec::as_slice).unwrap_or_default()
    }

    pub async fn delete_course(&mut self, course_id: CourseId) -> Outcome {
        let request = ConfirmRequest::destructive("You won't be able to revert this!");
        match self
            .ctx
            .confirm_delete(request, format!("/course/{course_id}/"))
            .await
        {
            Ok(false) => Outcome::Cancelled,
            Ok(true) => {
                if let Some(courses) = self.state.ready_mut() {
                    courses.retain(|course| course.id != course_id);
                }
                self.notice.set_success("Your course has been deleted.");
                Outcome::done()
            }
            Err(err) => {
                warn!(%course_id, error = %err, "delete course failed");
                self.notice
                    .set_error("Failed to delete course. Please try again later.");
                Outcome::Failed
            }
        }
    }

    pub async fn view_enrolled(&mut self, course_id: CourseId) -> Outcome {
        match self
            .ctx
            .fetch_enveloped::<EnrolledStudent>(
                format!("/course-enrolled-students/{course_id}/"),
                "data",
            )
            .await
        {
            Ok(students) => {
                if students.is_empty() {
                    self.notice
                        .set_success("No students enrolled in this course yet.");
                }
                self.roster = Some(EnrolledRoster {
                    course_id,
                    students,
                });
                Outcome::done()
            }
            Err(err) => {
                warn!(%course_id, error = %err, "enrolled students: load failed");
                self.roster = None;
                self.notice
                    .set_error("Failed to load enrolled students. Please try again later.");
                Outcome::Failed
            }
        }
    }
}

#[cfg(test)]
#[path = "../tests/courses_tests.rs"]
mod tests;
