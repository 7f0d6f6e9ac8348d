use serde::{Deserialize, Serialize};

use crate::domain::{StudentId, TeacherId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherSession {
    pub teacher_id: TeacherId,
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentSession {
    pub student_id: StudentId,
    pub username: String,
    pub fullname: String,
    pub email: String,
}

/// Who is signed in on this client, plus the chat hand-off pointer.
///
/// Invalidation points: [`Session::logout_teacher`] also drops the selected
/// student; [`Session::take_selected_student`] consumes the pointer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub teacher: Option<TeacherSession>,
    pub student: Option<StudentSession>,
    pub selected_student: Option<StudentId>,
}

impl Session {
    pub fn is_teacher_logged_in(&self) -> bool {
        self.teacher.is_some()
    }

    pub fn is_student_logged_in(&self) -> bool {
        self.student.is_some()
    }

    pub fn login_teacher(&mut self, teacher: TeacherSession) {
        self.teacher = Some(teacher);
    }

    pub fn login_student(&mut self, student: StudentSession) {
        self.student = Some(student);
    }

    pub fn logout_teacher(&mut self) {
        self.teacher = None;
        self.selected_student = None;
    }

    pub fn logout_student(&mut self) {
        self.student = None;
    }

    pub fn select_student(&mut self, student_id: StudentId) {
        self.selected_student = Some(student_id);
    }

    pub fn take_selected_student(&mut self) -> Option<StudentId> {
        self.selected_student.take()
    }
}
