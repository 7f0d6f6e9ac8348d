//! Taking quizzes and reviewing the results: the student's available
//! quizzes, a timed attempt, and the teacher's view of completed attempts.

use std::{collections::BTreeMap, time::Duration};

use shared::{
    domain::{
        AttemptId, AttemptQuestion, AvailableQuiz, CourseId, QuestionId, QuizAttemptRecord,
        QuizId, QuizOverview, QuizScore, StudentId, TeacherId,
    },
    protocol::{QuizAnswer, SubmitQuizRequest},
    session::Session,
};
use tracing::{debug, info, warn};

use crate::{
    error::{ClientError, ValidationError},
    gateway::ApiRequest,
    prompt::ConfirmRequest,
    view::{Notice, Outcome, Route, ViewState},
};

use super::{require_student, require_teacher, ScreenContext};

const SECONDS_PER_QUESTION: u64 = 120;
const MINIMUM_TIME_LIMIT: Duration = Duration::from_secs(600);
const PASSING_PERCENTAGE: f64 = 60.0;

pub struct AvailableQuizzesScreen {
    ctx: ScreenContext,
    pub state: ViewState<Vec<AvailableQuiz>>,
}

impl AvailableQuizzesScreen {
    pub fn new(ctx: ScreenContext) -> Self {
        Self {
            ctx,
            state: ViewState::Idle,
        }
    }

    pub async fn activate(&mut self, session: &Session) -> Result<(), ClientError> {
        let student_id = require_student(session)?.student_id;
        self.state = ViewState::Loading;
        self.state = match self
            .ctx
            .fetch_enveloped::<AvailableQuiz>(format!("/student-available-quizzes/{student_id}/"), "data")
            .await
        {
            Ok(quizzes) => ViewState::Ready(quizzes),
            Err(err) => {
                warn!(%student_id, error = %err, "available quizzes: load failed");
                ViewState::Failed("Failed to load quizzes. Please try again later.".into())
            }
        };
        Ok(())
    }

    /// Quizzes the student has not completed yet.
    pub fn pending(&self) -> Vec<&AvailableQuiz> {
        self.state
            .ready()
            .map(|quizzes| quizzes.iter().filter(|quiz| !quiz.already_attempted).collect())
            .unwrap_or_default()
    }
}

/// Two minutes per question, never under ten minutes.
pub fn time_limit(question_count: usize) -> Duration {
    Duration::from_secs(question_count as u64 * SECONDS_PER_QUESTION).max(MINIMUM_TIME_LIMIT)
}

/// `m:ss`
pub fn format_time(remaining: Duration) -> String {
    let seconds = remaining.as_secs();
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

pub struct AttemptQuizScreen {
    ctx: ScreenContext,
    quiz_id: QuizId,
    course_id: CourseId,
    attempt_id: Option<AttemptId>,
    pub quiz: ViewState<QuizOverview>,
    pub questions: Vec<AttemptQuestion>,
    pub current: usize,
    pub answers: BTreeMap<QuestionId, String>,
    pub time_left: Duration,
    pub started: bool,
    pub score: Option<QuizScore>,
    pub notice: Notice,
}

impl AttemptQuizScreen {
    pub fn new(ctx: ScreenContext, quiz_id: QuizId, course_id: CourseId) -> Self {
        Self {
            ctx,
            quiz_id,
            course_id,
            attempt_id: None,
            quiz: ViewState::Idle,
            questions: Vec::new(),
            current: 0,
            answers: BTreeMap::new(),
            time_left: Duration::ZERO,
            started: false,
            score: None,
            notice: Notice::default(),
        }
    }

    /// Opens the attempt, or resumes the one left incomplete.
    pub async fn activate(&mut self, session: &Session) -> Result<(), ClientError> {
        let student_id = require_student(session)?.student_id;
        self.quiz = ViewState::Loading;

        let path = format!(
            "/get-quiz-for-attempt/{}/{student_id}/{}/",
            self.quiz_id, self.course_id
        );
        let result: Result<(QuizOverview, Vec<AttemptQuestion>, AttemptId), ClientError> = async {
            let envelope = self.ctx.gateway.send(ApiRequest::get(path)).await?.envelope()?;
            if !envelope.is_success() {
                return Err(ClientError::Rejected(
                    envelope.message_text().unwrap_or_default().to_string(),
                ));
            }
            let quiz = envelope
                .field::<QuizOverview>("quiz")?
                .ok_or_else(|| ClientError::Rejected(String::new()))?;
            let attempt_id = envelope
                .field::<AttemptId>("attempt_id")?
                .ok_or_else(|| ClientError::Rejected(String::new()))?;
            let questions = envelope.field::<Vec<AttemptQuestion>>("questions")?.unwrap_or_default();
            Ok((quiz, questions, attempt_id))
        }
        .await;

        self.quiz = match result {
            Ok((quiz, questions, attempt_id)) => {
                debug!(quiz_id = %self.quiz_id, %attempt_id, questions = questions.len(), "attempt opened");
                self.time_left = time_limit(questions.len());
                self.questions = questions;
                self.attempt_id = Some(attempt_id);
                ViewState::Ready(quiz)
            }
            Err(err) => {
                warn!(quiz_id = %self.quiz_id, %student_id, error = %err, "quiz attempt: load failed");
                ViewState::Failed(err.display("Failed to load quiz. Please try again later."))
            }
        };
        Ok(())
    }

    pub fn current_question(&self) -> Option<&AttemptQuestion> {
        self.questions.get(self.current)
    }

    pub fn next_question(&mut self) {
        if self.current + 1 < self.questions.len() {
            self.current += 1;
        }
    }

    pub fn previous_question(&mut self) {
        self.current = self.current.saturating_sub(1);
    }

    /// Records `answer` for the question; it must be one of its four options.
    pub fn select_answer(&mut self, question_id: QuestionId, answer: &str) -> Result<(), ValidationError> {
        let question = self
            .questions
            .iter()
            .find(|question| question.id == question_id)
            .ok_or_else(|| ValidationError::new("Unknown question"))?;
        if !question.options().contains(&answer) {
            return Err(ValidationError::for_field(
                "selected_answer",
                "The answer must be one of the options",
            ));
        }
        self.answers.insert(question_id, answer.to_string());
        Ok(())
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    /// Starting starts the clock, which cannot be paused.
    pub async fn start(&mut self) -> Outcome {
        if self.quiz.ready().is_none() {
            return Outcome::Failed;
        }
        let request = ConfirmRequest::new(
            "Ready to Start?",
            format!(
                "You'll have {} to complete this quiz. Once you start, the timer cannot be paused.",
                format_time(self.time_left)
            ),
            "Start Quiz",
        );
        if !self.ctx.prompt.confirm(request).await.is_confirmed() {
            return Outcome::Cancelled;
        }
        self.started = true;
        Outcome::done()
    }

    /// Advances the clock; when it runs out the answers given so far are
    /// submitted without asking.
    pub async fn tick(&mut self, elapsed: Duration) -> Option<Outcome> {
        if !self.started || self.score.is_some() {
            return None;
        }
        self.time_left = self.time_left.saturating_sub(elapsed);
        if !self.time_left.is_zero() {
            return None;
        }
        info!(quiz_id = %self.quiz_id, "time is up");
        Some(self.send_answers().await)
    }

    /// Asks before submitting a partially answered quiz.
    pub async fn submit(&mut self) -> Outcome {
        let total = self.questions.len();
        let answered = self.answered_count();
        if answered < total {
            let request = ConfirmRequest::new(
                "Warning!",
                format!(
                    "You've only answered {answered} out of {total} questions. Are you sure you want to submit?"
                ),
                "Submit Quiz",
            );
            if !self.ctx.prompt.confirm(request).await.is_confirmed() {
                return Outcome::Cancelled;
            }
        }
        self.send_answers().await
    }

    async fn send_answers(&mut self) -> Outcome {
        if self.score.is_some() {
            return Outcome::done();
        }
        let Some(attempt_id) = self.attempt_id else {
            self.notice.set_error("Failed to submit quiz. Please try again.");
            return Outcome::Failed;
        };
        self.notice.clear();

        let payload = SubmitQuizRequest {
            answers: self
                .answers
                .iter()
                .map(|(question_id, answer)| QuizAnswer {
                    question_id: *question_id,
                    selected_answer: answer.clone(),
                })
                .collect(),
        };
        let result: Result<(String, QuizScore), ClientError> = async {
            let request =
                ApiRequest::post(format!("/submit-quiz-attempt/{attempt_id}/")).json(&payload)?;
            let envelope = self.ctx.gateway.send(request).await?.envelope()?;
            let score = match envelope.field::<QuizScore>("result")? {
                Some(score) if envelope.is_success() => score,
                _ => {
                    return Err(ClientError::Rejected(
                        envelope.message_text().unwrap_or_default().to_string(),
                    ))
                }
            };
            let message = envelope
                .message_text()
                .unwrap_or("Quiz submitted successfully")
                .to_string();
            Ok((message, score))
        }
        .await;

        match result {
            Ok((message, score)) => {
                info!(
                    %attempt_id,
                    correct = score.correct_answers,
                    total = score.total_questions,
                    "quiz submitted"
                );
                self.started = false;
                self.score = Some(score);
                self.notice.set_success(message);
                Outcome::navigate(self.ctx.redirect(Route::StudentQuizResults))
            }
            Err(err) => {
                warn!(%attempt_id, error = %err, "quiz submit failed");
                self.notice.set_error("Failed to submit quiz. Please try again.");
                Outcome::Failed
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Excellent,
    Pass,
    Fail,
}

impl ScoreBand {
    pub fn for_percentage(percentage: f64) -> Self {
        if percentage >= 80.0 {
            ScoreBand::Excellent
        } else if percentage >= PASSING_PERCENTAGE {
            ScoreBand::Pass
        } else {
            ScoreBand::Fail
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScoreBand::Excellent => "Excellent",
            ScoreBand::Pass => "Pass",
            ScoreBand::Fail => "Fail",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuizAnalytics {
    pub average_score: f64,
    pub pass_rate: f64,
    pub total_attempts: usize,
}

/// Averages over the share of correct answers, not the marks.
pub fn analytics(attempts: &[QuizAttemptRecord]) -> Option<QuizAnalytics> {
    if attempts.is_empty() {
        return None;
    }
    let total = attempts.len() as f64;
    let sum: f64 = attempts.iter().map(QuizAttemptRecord::score_percentage).sum();
    let passed = attempts
        .iter()
        .filter(|attempt| attempt.score_percentage() >= PASSING_PERCENTAGE)
        .count();
    Some(QuizAnalytics {
        average_score: sum / total,
        pass_rate: passed as f64 / total * 100.0,
        total_attempts: attempts.len(),
    })
}

/// Completed attempts on the teacher's quizzes and courses, optionally
/// narrowed to one student.
pub struct QuizResultsScreen {
    ctx: ScreenContext,
    teacher_id: Option<TeacherId>,
    student_id: Option<StudentId>,
    pub state: ViewState<Vec<QuizAttemptRecord>>,
    pub selected: Option<QuizAttemptRecord>,
}

impl QuizResultsScreen {
    pub fn new(ctx: ScreenContext, student_id: Option<StudentId>) -> Self {
        Self {
            ctx,
            teacher_id: None,
            student_id,
            state: ViewState::Idle,
            selected: None,
        }
    }

    fn results_path(teacher_id: TeacherId, student_id: Option<StudentId>) -> String {
        match student_id {
            Some(student_id) => format!("/teacher-student-quiz-attempts/{teacher_id}/{student_id}/"),
            None => format!("/teacher-all-quiz-attempts/{teacher_id}/"),
        }
    }

    pub async fn activate(&mut self, session: &Session) -> Result<(), ClientError> {
        let teacher_id = require_teacher(session)?.teacher_id;
        self.teacher_id = Some(teacher_id);

        self.state = ViewState::Loading;
        self.state = match self
            .ctx
            .fetch_enveloped::<QuizAttemptRecord>(Self::results_path(teacher_id, self.student_id), "data")
            .await
        {
            Ok(attempts) => ViewState::Ready(attempts),
            Err(err) => {
                warn!(%teacher_id, error = %err, "quiz results: load failed");
                ViewState::Failed("Failed to load quiz results. Please try again later.".into())
            }
        };

        if let Some(student_id) = self.student_id {
            self.selected = self
                .attempts()
                .iter()
                .find(|attempt| attempt.student == student_id)
                .cloned();
        }
        Ok(())
    }

    pub fn attempts(&self) -> &[QuizAttemptRecord] {
        self.state.ready().map(Vec::as_slice).unwrap_or_default()
    }

    pub fn analytics(&self) -> Option<QuizAnalytics> {
        analytics(self.attempts())
    }

    /// Shows one attempt. Rows listed without their answers are completed
    /// from the per-student listing; a failed lookup keeps the bare row.
    pub async fn select(&mut self, attempt_id: AttemptId) -> Outcome {
        let Some(mut attempt) = self
            .attempts()
            .iter()
            .find(|attempt| attempt.id == attempt_id)
            .cloned()
        else {
            return Outcome::Failed;
        };

        if attempt.questions_data.is_none() {
            if let Some(teacher_id) = self.teacher_id {
                let path = Self::results_path(teacher_id, Some(attempt.student));
                match self.ctx.fetch_enveloped::<QuizAttemptRecord>(path, "data").await {
                    Ok(rows) => {
                        attempt.questions_data = rows
                            .into_iter()
                            .find(|row| {
                                row.id == attempt.id
                                    || (row.student == attempt.student && row.quiz == attempt.quiz)
                            })
                            .and_then(|row| row.questions_data);
                    }
                    Err(err) => {
                        debug!(%attempt_id, error = %err, "attempt answers unavailable");
                    }
                }
            }
        }

        self.selected = Some(attempt);
        Outcome::done()
    }
}

#[cfg(test)]
#[path = "../tests/quiz_attempts_tests.rs"]
mod tests;
