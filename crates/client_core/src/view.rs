//! View state shared by every screen controller.

use std::time::Duration;

use shared::domain::{CourseId, QuizId, StudentId};

pub const DEFAULT_REDIRECT_DELAY: Duration = Duration::from_secs(2);

/// `Idle → Loading → Ready | Failed` for one screen's primary data.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ViewState<T> {
    #[default]
    Idle,
    Loading,
    Ready(T),
    Failed(String),
}

impl<T> ViewState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, ViewState::Loading)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            ViewState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn ready_mut(&mut self) -> Option<&mut T> {
        match self {
            ViewState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ViewState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// Inline success/error banner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Notice {
    pub error: Option<String>,
    pub success: Option<String>,
}

impl Notice {
    pub fn clear(&mut self) {
        self.error = None;
        self.success = None;
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.success = None;
        self.error = Some(message.into());
    }

    pub fn set_success(&mut self, message: impl Into<String>) {
        self.error = None;
        self.success = Some(message.into());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    TeacherLogin,
    StudentLogin,
    TeacherDashboard,
    StudentDashboard,
    TeacherCourses,
    CourseChapters(CourseId),
    CheckAssignments(StudentId),
    QuizQuestions(QuizId),
    TeacherChat,
    AvailableQuizzes,
    StudentQuizResults,
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".into(),
            Route::TeacherLogin => "/teacher-login".into(),
            Route::StudentLogin => "/user-login".into(),
            Route::TeacherDashboard => "/teacher-dashboard".into(),
            Route::StudentDashboard => "/user-dashboard".into(),
            Route::TeacherCourses => "/teacher-courses".into(),
            Route::CourseChapters(course_id) => format!("/course-chapters/{course_id}"),
            Route::CheckAssignments(student_id) => format!("/check-assignments/{student_id}"),
            Route::QuizQuestions(quiz_id) => format!("/add-quiz-question/{quiz_id}"),
            Route::TeacherChat => "/teacher-chat".into(),
            Route::AvailableQuizzes => "/student-available-quizzes".into(),
            Route::StudentQuizResults => "/student-quiz-results".into(),
        }
    }
}

/// A navigation the front-end performs, possibly after a delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub route: Route,
    pub after: Duration,
}

impl Navigation {
    pub fn now(route: Route) -> Self {
        Self {
            route,
            after: Duration::ZERO,
        }
    }

    pub fn delayed(route: Route, after: Duration) -> Self {
        Self { route, after }
    }
}

/// Result of a user action on a screen. Failures are already in the
/// screen's [`Notice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed(Option<Navigation>),
    Cancelled,
    Failed,
}

impl Outcome {
    pub fn done() -> Self {
        Outcome::Completed(None)
    }

    pub fn navigate(navigation: Navigation) -> Self {
        Outcome::Completed(Some(navigation))
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }

    pub fn navigation(&self) -> Option<&Navigation> {
        match self {
            Outcome::Completed(navigation) => navigation.as_ref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IndicatorSize {
    Small,
    #[default]
    Medium,
    Large,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadingIndicator {
    pub size: IndicatorSize,
    pub caption: String,
}

impl Default for LoadingIndicator {
    fn default() -> Self {
        Self {
            size: IndicatorSize::Medium,
            caption: "Processing your request...".into(),
        }
    }
}

impl LoadingIndicator {
    pub fn sized(size: IndicatorSize) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    pub fn render(&self) -> String {
        let dots = match self.size {
            IndicatorSize::Small => 3,
            IndicatorSize::Medium => 5,
            IndicatorSize::Large => 8,
        };
        format!("[{}] {}", ".".repeat(dots), self.caption)
    }
}
