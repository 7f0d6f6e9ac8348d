//! Teacher quiz management: the quiz list, a quiz's questions, and
//! assigning a quiz to courses.

use shared::{
    domain::{Course, CourseId, CourseQuizId, QuestionId, Quiz, QuizAssignment, QuizId, QuizQuestion, TeacherId},
    protocol::{AssignQuizRequest, CreateQuizRequest, NewQuestionRequest},
    session::Session,
};
use tracing::{debug, info, warn};

use crate::{
    error::{ClientError, ValidationError},
    gateway::ApiRequest,
    prompt::ConfirmRequest,
    view::{Notice, Outcome, ViewState},
};

use super::{require_teacher, ScreenContext};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuizDraft {
    pub title: String,
    pub description: String,
    pub total_marks: String,
}

impl QuizDraft {
    fn to_request(&self) -> Result<CreateQuizRequest, ValidationError> {
        if [&self.title, &self.description, &self.total_marks]
            .iter()
            .any(|value| value.trim().is_empty())
        {
            return Err(ValidationError::new("Please fill all the fields"));
        }
        let total_marks = self
            .total_marks
            .trim()
            .parse::<i64>()
            .map_err(|_| ValidationError::for_field("total_marks", "Total marks must be a number"))?;
        Ok(CreateQuizRequest {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            total_marks,
        })
    }
}

pub struct TeacherQuizzesScreen {
    ctx: ScreenContext,
    teacher_id: Option<TeacherId>,
    pub state: ViewState<Vec<Quiz>>,
    pub notice: Notice,
    pub draft: QuizDraft,
}

impl TeacherQuizzesScreen {
    pub fn new(ctx: ScreenContext) -> Self {
        Self {
            ctx,
            teacher_id: None,
            state: ViewState::Idle,
            notice: Notice::default(),
            draft: QuizDraft::default(),
        }
    }

    pub async fn activate(&mut self, session: &Session) -> Result<(), ClientError> {
        self.teacher_id = Some(require_teacher(session)?.teacher_id);
        self.reload().await;
        Ok(())
    }

    async fn reload(&mut self) {
        let Some(teacher_id) = self.teacher_id else {
            return;
        };
        self.state = ViewState::Loading;
        self.state = match self
            .ctx
            .fetch::<Vec<Quiz>>(format!("/teacher-quizzes/{teacher_id}/"))
            .await
        {
            Ok(quizzes) => ViewState::Ready(quizzes),
            Err(err) => {
                warn!(%teacher_id, error = %err, "quizzes: load failed");
                ViewState::Failed("Failed to load quizzes. Please try again later.".into())
            }
        };
    }

    pub fn quizzes(&self) -> &[Quiz] {
        self.state.ready().map(Vec::as_slice).unwrap_or_default()
    }

    pub async fn create_quiz(&mut self) -> Outcome {
        self.notice.clear();
        let Some(teacher_id) = self.teacher_id else {
            self.notice.set_error(ClientError::NotAuthenticated.display(""));
            return Outcome::Failed;
        };
        let payload = match self.draft.to_request() {
            Ok(payload) => payload,
            Err(err) => {
                self.notice.set_error(err.message);
                return Outcome::Failed;
            }
        };

        let result: Result<bool, ClientError> = async {
            let request = ApiRequest::post(format!("/teacher-quizzes/{teacher_id}/")).json(&payload)?;
            Ok(self.ctx.gateway.send(request).await?.is_created())
        }
        .await;

        match result {
            Ok(true) => {
                info!(%teacher_id, title = %payload.title, "quiz created");
                self.draft = QuizDraft::default();
                self.notice.set_success("Quiz has been created successfully");
                self.reload().await;
                Outcome::done()
            }
            Ok(false) => Outcome::done(),
            Err(err) => {
                warn!(%teacher_id, error = %err, "quiz create failed");
                self.notice
                    .set_error("Failed to create quiz. Please try again.");
                Outcome::Failed
            }
        }
    }

    pub async fn delete_quiz(&mut self, quiz_id: QuizId) -> Outcome {
        match self
            .ctx
            .confirm_delete(
                ConfirmRequest::destructive("You won't be able to revert this!"),
                format!("/quiz-detail/{quiz_id}/"),
            )
            .await
        {
            Ok(false) => Outcome::Cancelled,
            Ok(true) => {
                self.notice.set_success("Your quiz has been deleted.");
                self.reload().await;
                Outcome::done()
            }
            Err(err) => {
                warn!(%quiz_id, error = %err, "quiz delete failed");
                self.notice
                    .set_error("Failed to delete quiz. It might be used in courses.");
                Outcome::Failed
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionDraft {
    pub question_text: String,
    pub ans1: String,
    pub ans2: String,
    pub ans3: String,
    pub ans4: String,
    pub right_ans: String,
}

impl QuestionDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let options = [&self.ans1, &self.ans2, &self.ans3, &self.ans4];
        if self.question_text.is_empty()
            || self.right_ans.is_empty()
            || options.iter().any(|option| option.is_empty())
        {
            return Err(ValidationError::new("All fields are required"));
        }
        if !options.contains(&&self.right_ans) {
            return Err(ValidationError::for_field(
                "right_ans",
                "The right answer must match one of the options",
            ));
        }
        Ok(())
    }

    fn to_request(&self) -> NewQuestionRequest {
        NewQuestionRequest {
            question_text: self.question_text.clone(),
            ans1: self.ans1.clone(),
            ans2: self.ans2.clone(),
            ans3: self.ans3.clone(),
            ans4: self.ans4.clone(),
            right_ans: self.right_ans.clone(),
        }
    }
}

pub struct QuizQuestionsScreen {
    ctx: ScreenContext,
    quiz_id: QuizId,
    pub quiz: ViewState<Quiz>,
    pub questions: ViewState<Vec<QuizQuestion>>,
    pub notice: Notice,
    pub draft: QuestionDraft,
}

impl QuizQuestionsScreen {
    pub fn new(ctx: ScreenContext, quiz_id: QuizId) -> Self {
        Self {
            ctx,
            quiz_id,
            quiz: ViewState::Idle,
            questions: ViewState::Idle,
            notice: Notice::default(),
            draft: QuestionDraft::default(),
        }
    }

    pub async fn activate(&mut self, session: &Session) -> Result<(), ClientError> {
        require_teacher(session)?;
        self.quiz = ViewState::Loading;
        self.quiz = match self
            .ctx
            .fetch::<Quiz>(format!("/quiz-detail/{}/", self.quiz_id))
            .await
        {
            Ok(quiz) => ViewState::Ready(quiz),
            Err(err) => {
                warn!(quiz_id = %self.quiz_id, error = %err, "quiz detail: load failed");
                ViewState::Failed("Failed to load quiz details. Please try again.".into())
            }
        };
        self.reload_questions().await;
        Ok(())
    }

    async fn reload_questions(&mut self) {
        self.questions = ViewState::Loading;
        self.questions = match self
            .ctx
            .fetch_enveloped::<QuizQuestion>(format!("/quiz-questions/{}/", self.quiz_id), "questions")
            .await
        {
            Ok(questions) => ViewState::Ready(questions),
            Err(err) => {
                warn!(quiz_id = %self.quiz_id, error = %err, "quiz questions: load failed");
                ViewState::Failed("Failed to load quiz questions. Please try again.".into())
            }
        };
    }

    pub fn question_list(&self) -> &[QuizQuestion] {
        self.questions.ready().map(Vec::as_slice).unwrap_or_default()
    }

    pub async fn add_question(&mut self) -> Outcome {
        self.notice.clear();
        if let Err(err) = self.draft.validate() {
            self.notice.set_error(err.message);
            return Outcome::Failed;
        }

        let payload = self.draft.to_request();
        let result: Result<bool, ClientError> = async {
            let request =
                ApiRequest::post(format!("/add-quiz-question/{}/", self.quiz_id)).json(&payload)?;
            Ok(self.ctx.gateway.send(request).await?.is_created())
        }
        .await;

        match result {
            Ok(true) => {
                info!(quiz_id = %self.quiz_id, "question added");
                self.notice.set_success("Question added successfully!");
                self.draft = QuestionDraft::default();
                self.reload_questions().await;
                Outcome::done()
            }
            Ok(false) => Outcome::done(),
            Err(err) => {
                warn!(quiz_id = %self.quiz_id, error = %err, "add question failed");
                self.notice
                    .set_error("Failed to add question. Please try again.");
                Outcome::Failed
            }
        }
    }

    pub async fn delete_question(&mut self, question_id: QuestionId) -> Outcome {
        self.notice.clear();
        match self
            .ctx
            .confirm_delete(
                ConfirmRequest::destructive("You won't be able to revert this!"),
                format!("/quiz-question-detail/{question_id}/"),
            )
            .await
        {
            Ok(false) => Outcome::Cancelled,
            Ok(true) => {
                self.notice
                    .set_success("Question has been deleted successfully!");
                self.reload_questions().await;
                Outcome::done()
            }
            Err(err) => {
                warn!(%question_id, error = %err, "question delete failed");
                self.notice
                    .set_error("Failed to delete question. Please try again.");
                Outcome::Failed
            }
        }
    }
}

pub struct AssignQuizScreen {
    ctx: ScreenContext,
    quiz_id: QuizId,
    pub quiz: ViewState<Quiz>,
    pub courses: ViewState<Vec<Course>>,
    pub assigned: Vec<QuizAssignment>,
    pub selected_course: Option<CourseId>,
    pub notice: Notice,
}

impl AssignQuizScreen {
    pub fn new(ctx: ScreenContext, quiz_id: QuizId) -> Self {
        Self {
            ctx,
            quiz_id,
            quiz: ViewState::Idle,
            courses: ViewState::Idle,
            assigned: Vec::new(),
            selected_course: None,
            notice: Notice::default(),
        }
    }

    pub async fn activate(&mut self, session: &Session) -> Result<(), ClientError> {
        let teacher_id = require_teacher(session)?.teacher_id;

        self.quiz = ViewState::Loading;
        self.quiz = match self
            .ctx
            .fetch::<Quiz>(format!("/quiz-detail/{}/", self.quiz_id))
            .await
        {
            Ok(quiz) => ViewState::Ready(quiz),
            Err(err) => {
                warn!(quiz_id = %self.quiz_id, error = %err, "assign quiz: quiz load failed");
                ViewState::Failed("Failed to load quiz details. Please try again.".into())
            }
        };

        self.courses = ViewState::Loading;
        self.courses = match self
            .ctx
            .fetch::<Vec<Course>>(format!("/teacher-courses/{teacher_id}/"))
            .await
        {
            Ok(courses) => ViewState::Ready(courses),
            Err(err) => {
                warn!(%teacher_id, error = %err, "assign quiz: courses load failed");
                ViewState::Failed("Failed to load courses. Please try again.".into())
            }
        };

        self.reload_assigned().await;
        Ok(())
    }

    /// The endpoint is keyed by quiz id, but rows for other quizzes are
    /// dropped. A failed load leaves an empty list without a notice.
    async fn reload_assigned(&mut self) {
        let path = format!("/course-assigned-quizzes/{}/", self.quiz_id);
        self.assigned = match self.ctx.fetch_enveloped::<QuizAssignment>(path, "data").await {
            Ok(rows) => rows
                .into_iter()
                .filter(|row| row.quiz == self.quiz_id)
                .collect(),
            Err(err) => {
                debug!(quiz_id = %self.quiz_id, error = %err, "assigned courses unavailable");
                Vec::new()
            }
        };
    }

    pub fn is_assigned(&self, course_id: CourseId) -> bool {
        self.assigned.iter().any(|row| row.course == course_id)
    }

    /// Courses the quiz can still be assigned to.
    pub fn available_courses(&self) -> Vec<&Course> {
        self.courses
            .ready()
            .map(|courses| {
                courses
                    .iter()
                    .filter(|course| !self.is_assigned(course.id))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub async fn assign(&mut self) -> Outcome {
        let Some(course_id) = self.selected_course else {
            self.notice.set_error("Please select a course");
            return Outcome::Failed;
        };
        if self.is_assigned(course_id) {
            self.notice
                .set_error("This quiz is already assigned to the selected course");
            return Outcome::Failed;
        }
        self.notice.clear();

        let payload = AssignQuizRequest {
            quiz_id: self.quiz_id,
            course_id,
        };
        let result: Result<Option<String>, ClientError> = async {
            let request = ApiRequest::post("/assign-quiz-to-course/").json(&payload)?;
            let response = self.ctx.gateway.send(request).await?;
            if !response.is_created() {
                return Ok(None);
            }
            let envelope = response.envelope()?;
            Ok(Some(
                envelope
                    .message_text()
                    .unwrap_or("Quiz assigned successfully!")
                    .to_string(),
            ))
        }
        .await;

        match result {
            Ok(Some(message)) => {
                info!(quiz_id = %self.quiz_id, %course_id, "quiz assigned");
                self.notice.set_success(message);
                self.selected_course = None;
                self.reload_assigned().await;
                Outcome::done()
            }
            Ok(None) => Outcome::done(),
            Err(err) => {
                warn!(quiz_id = %self.quiz_id, %course_id, error = %err, "assign quiz failed");
                self.notice
                    .set_error("Failed to assign quiz. Please try again.");
                Outcome::Failed
            }
        }
    }

    pub async fn remove_assignment(&mut self, assignment_id: CourseQuizId) -> Outcome {
        let request = ConfirmRequest::new(
            "Are you sure?",
            "This will remove the quiz from the course and students will no longer have access to it.",
            "Yes, remove it!",
        );
        self.notice.clear();
        match self
            .ctx
            .confirm_delete(request, format!("/remove-quiz-from-course/{assignment_id}/"))
            .await
        {
            Ok(false) => Outcome::Cancelled,
            Ok(true) => {
                self.notice
                    .set_success("Quiz has been removed from the course successfully.");
                self.reload_assigned().await;
                Outcome::done()
            }
            Err(err) => {
                warn!(%assignment_id, error = %err, "remove quiz assignment failed");
                self.notice.set_error("Failed to remove quiz from course.");
                Outcome::Failed
            }
        }
    }
}

#[cfg(test)]
#[path = "../tests/quizzes_tests.rs"]
mod tests;
