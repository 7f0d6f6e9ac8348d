use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(TeacherId);
id_newtype!(StudentId);
id_newtype!(CategoryId);
id_newtype!(CourseId);
id_newtype!(ChapterId);
id_newtype!(AssignmentId);
id_newtype!(QuizId);
id_newtype!(QuestionId);
id_newtype!(CourseQuizId);
id_newtype!(MessageId);
id_newtype!(MaterialId);
id_newtype!(RatingId);
id_newtype!(AttemptId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Teacher,
    Student,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Teacher => "teacher",
            Role::Student => "student",
        }
    }
}

/// A foreign key that the backend sends either as a bare id or as the nested record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Related<I, T> {
    Id(I),
    Record(T),
}

impl<I: Copy, T: HasId<I>> Related<I, T> {
    pub fn id(&self) -> I {
        match self {
            Related::Id(id) => *id,
            Related::Record(record) => record.id(),
        }
    }

    pub fn record(&self) -> Option<&T> {
        match self {
            Related::Id(_) => None,
            Related::Record(record) => Some(record),
        }
    }
}

pub trait HasId<I> {
    fn id(&self) -> I;
}

/// Decimal columns arrive as JSON strings ("4.50") or numbers depending on the endpoint.
fn lenient_decimal<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(value)) => Ok(Some(value)),
        Some(Raw::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(Raw::Text(text)) => text
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl HasId<CategoryId> for Category {
    fn id(&self) -> CategoryId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeacherProfile {
    pub id: TeacherId,
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub profile_img: Option<String>,
    #[serde(default)]
    pub qualification: String,
    #[serde(default)]
    pub mobile_number: String,
    #[serde(default)]
    pub skills: String,
    #[serde(default)]
    pub bio: Option<String>,
}

impl HasId<TeacherId> for TeacherProfile {
    fn id(&self) -> TeacherId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub id: StudentId,
    pub fullname: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub profile_img: Option<String>,
    #[serde(default)]
    pub interested_categories: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: i64,
    pub category: Option<Related<CategoryId, Category>>,
    #[serde(default)]
    pub featured_img: Option<String>,
    pub teacher: Option<Related<TeacherId, TeacherProfile>>,
    #[serde(default)]
    pub technologies: String,
    #[serde(default)]
    pub total_enrolled: u32,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub average_rating: Option<f64>,
    #[serde(default)]
    pub total_ratings: u32,
}

impl HasId<CourseId> for Course {
    fn id(&self) -> CourseId {
        self.id
    }
}

impl Course {
    pub fn teacher_id(&self) -> Option<TeacherId> {
        self.teacher.as_ref().map(Related::id)
    }

    pub fn rating_or_zero(&self) -> f64 {
        self.average_rating.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: ChapterId,
    pub course: CourseId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub video: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub text_content: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: AssignmentId,
    pub student: StudentId,
    pub course: CourseId,
    #[serde(default)]
    pub course_title: Option<String>,
    #[serde(default)]
    pub student_name: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub assignment_file: Option<String>,
    #[serde(default)]
    pub submitted_file: Option<String>,
    #[serde(default)]
    pub submission_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub grade: Option<String>,
}

impl Assignment {
    pub fn is_submitted(&self) -> bool {
        self.submission_date.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: QuizId,
    pub teacher: TeacherId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub total_marks: i64,
    #[serde(default)]
    pub total_questions: u32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: QuestionId,
    pub quiz: QuizId,
    pub question_text: String,
    pub ans1: String,
    pub ans2: String,
    pub ans3: String,
    pub ans4: String,
    pub right_ans: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizAssignment {
    pub id: CourseQuizId,
    pub quiz: QuizId,
    pub course: CourseId,
    #[serde(default)]
    pub course_title: Option<String>,
    #[serde(default)]
    pub assigned_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub teacher: TeacherId,
    pub student: StudentId,
    pub message: String,
    #[serde(default)]
    pub message_from: Option<Role>,
    #[serde(default, alias = "timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// One row of the chat sidebar: the counterpart and the latest exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatUser {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub profile_img: Option<String>,
    #[serde(default)]
    pub unread_count: u32,
    #[serde(default)]
    pub last_message: String,
    #[serde(default)]
    pub last_message_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCounterpart {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRef {
    pub id: CourseId,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrolledStudent {
    pub id: StudentId,
    pub fullname: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub courses: Vec<CourseRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyMaterial {
    pub id: MaterialId,
    /// Nested on reads, a bare id on writes.
    pub course: Related<CourseId, Course>,
    #[serde(default)]
    pub teacher: Option<Related<TeacherId, TeacherProfile>>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
}

impl StudyMaterial {
    pub fn course_id(&self) -> CourseId {
        self.course.id()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Testimonial {
    pub id: RatingId,
    pub student_name: String,
    pub course_title: String,
    pub rating: u8,
    #[serde(default)]
    pub review: String,
}

/// A student's own rating of a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRating {
    pub id: RatingId,
    pub course: CourseId,
    pub student: StudentId,
    pub rating: u8,
    #[serde(default)]
    pub review: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A quiz assigned to one of the student's enrolled courses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailableQuiz {
    pub id: CourseQuizId,
    pub course_id: CourseId,
    pub course_title: String,
    pub quiz_id: QuizId,
    pub quiz_title: String,
    #[serde(default)]
    pub total_questions: u32,
    #[serde(default)]
    pub total_marks: i64,
    #[serde(default)]
    pub assigned_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub already_attempted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizOverview {
    pub id: QuizId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub total_marks: i64,
    #[serde(default)]
    pub total_questions: u32,
}

/// A question as served to the student; the right answer is withheld.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptQuestion {
    pub id: QuestionId,
    pub question_text: String,
    pub ans1: String,
    pub ans2: String,
    pub ans3: String,
    pub ans4: String,
}

impl AttemptQuestion {
    pub fn options(&self) -> [&str; 4] {
        [&self.ans1, &self.ans2, &self.ans3, &self.ans4]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizScore {
    pub total_questions: u32,
    pub correct_answers: u32,
    pub obtained_marks: f64,
    pub total_marks: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnsweredQuestion {
    pub question_text: String,
    pub selected_option: String,
    pub correct_option: String,
    pub is_correct: bool,
}

/// One completed attempt as listed to the teacher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizAttemptRecord {
    pub id: AttemptId,
    pub student: StudentId,
    pub student_name: String,
    #[serde(default)]
    pub username: String,
    pub quiz: QuizId,
    pub quiz_title: String,
    pub course: CourseId,
    pub course_title: String,
    pub total_questions: u32,
    /// Correct answers, not marks.
    pub total_score: u32,
    #[serde(default)]
    pub obtained_marks: f64,
    #[serde(default)]
    pub total_marks: f64,
    #[serde(default)]
    pub percentage: f64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// JSON-encoded list of [`AnsweredQuestion`]s.
    #[serde(default)]
    pub questions_data: Option<String>,
}

impl QuizAttemptRecord {
    /// Share of questions answered correctly, as a percentage.
    pub fn score_percentage(&self) -> f64 {
        if self.total_questions == 0 {
            return 0.0;
        }
        f64::from(self.total_score) / f64::from(self.total_questions) * 100.0
    }

    pub fn answers(&self) -> serde_json::Result<Vec<AnsweredQuestion>> {
        match self.questions_data.as_deref() {
            None | Some("") => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(raw),
        }
    }
}
