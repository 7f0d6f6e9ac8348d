use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{ChapterId, CourseId, QuestionId, QuizId, Role, StudentId, TeacherId};

/// `{status, message, ...}` wrapper most function-style endpoints return.
///
/// The payload key varies by endpoint (`data`, `assignments`, `chapters`,
/// `questions`, `courses`), so everything past `status`/`message` is kept as
/// raw fields and pulled out with [`Envelope::field`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<Value>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Envelope {
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success")
    }

    pub fn is_error(&self) -> bool {
        self.status.as_deref() == Some("error")
    }

    pub fn message_text(&self) -> Option<&str> {
        match &self.message {
            Some(Value::String(text)) if !text.trim().is_empty() => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn field<T: DeserializeOwned>(&self, key: &str) -> serde_json::Result<Option<T>> {
        match self.fields.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone()).map(Some),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeacherLoginResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub teacher_id: Option<TeacherId>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentLoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentLoginResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub student_id: Option<StudentId>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub fullname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub teacher_id: TeacherId,
    pub student_id: StudentId,
    pub message: String,
    pub message_from: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignQuizRequest {
    pub quiz_id: QuizId,
    pub course_id: CourseId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeRequest {
    pub grade: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateQuizRequest {
    pub title: String,
    pub description: String,
    pub total_marks: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewQuestionRequest {
    pub question_text: String,
    pub ans1: String,
    pub ans2: String,
    pub ans3: String,
    pub ans4: String,
    pub right_ans: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveProfileImageRequest {
    pub remove_profile_img: bool,
}

/// Body for the enrollment, favorite and similar student/course toggles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentCourseRequest {
    pub student_id: StudentId,
    pub course_id: CourseId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateCourseRequest {
    pub student_id: StudentId,
    pub course_id: CourseId,
    pub rating: u8,
    pub review: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterProgressRequest {
    pub student_id: StudentId,
    pub chapter_id: ChapterId,
    pub course_id: CourseId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizAnswer {
    pub question_id: QuestionId,
    pub selected_answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitQuizRequest {
    pub answers: Vec<QuizAnswer>,
}
