use super::*;
use crate::{
    gateway::Method,
    test_support::{context, FakeGateway, ScriptedPrompt},
};
use serde_json::json;
use shared::session::TeacherSession;

fn teacher() -> Session {
    Session {
        teacher: Some(TeacherSession {
            teacher_id: TeacherId(4),
            full_name: "Grace".into(),
            email: "grace@example.org".into(),
        }),
        ..Session::default()
    }
}

fn roster() -> serde_json::Value {
    json!({"status": "success", "data": [
        {"id": 7, "fullname": "Ada", "courses": [{"id": 3, "title": "Rust"}]},
        {"id": 8, "fullname": "Alan"},
        {"id": 9, "fullname": "Barbara"}
    ]})
}

#[tokio::test]
async fn message_to_one_student_posts_teacher_message() {
    let gateway = FakeGateway::new();
    let prompt = ScriptedPrompt::composing("  Office hours moved  ");
    gateway
        .ok(Method::Get, "/teacher-enrolled-students/4/", roster())
        .ok(Method::Post, "/send-message/", json!({"status": "success"}));
    let mut screen = StudentListScreen::new(context(&gateway, &prompt));
    screen.activate(&teacher()).await.expect("activate");
    assert_eq!(screen.students().len(), 3);

    assert!(screen.message_student(StudentId(7)).await.is_completed());

    assert_eq!(
        gateway.last_json(Method::Post, "/send-message/"),
        Some(json!({
            "teacher_id": 4,
            "student_id": 7,
            "message": "Office hours moved",
            "message_from": "teacher"
        }))
    );
    assert_eq!(screen.notice.success.as_deref(), Some("Message sent successfully"));
}

#[tokio::test]
async fn cancelled_compose_sends_nothing() {
    let gateway = FakeGateway::new();
    let prompt = ScriptedPrompt::new();
    gateway.ok(Method::Get, "/teacher-enrolled-students/4/", roster());
    let mut screen = StudentListScreen::new(context(&gateway, &prompt));
    screen.activate(&teacher()).await.expect("activate");

    assert_eq!(screen.message_student(StudentId(7)).await, Outcome::Cancelled);
    assert_eq!(screen.message_all().await, Outcome::Cancelled);
    assert_eq!(prompt.composed(), 2);
    assert!(gateway.writes().is_empty());
}

#[tokio::test]
async fn broadcast_counts_partial_failures() {
    let gateway = FakeGateway::new();
    let prompt = ScriptedPrompt::composing("Exam on Friday");
    gateway
        .ok(Method::Get, "/teacher-enrolled-students/4/", roster())
        .ok(Method::Post, "/send-message/", json!({"status": "success"}))
        .status(Method::Post, "/send-message/", 500, json!({}))
        .ok(Method::Post, "/send-message/", json!({"status": "success"}));
    let mut screen = StudentListScreen::new(context(&gateway, &prompt));
    screen.activate(&teacher()).await.expect("activate");

    assert!(screen.message_all().await.is_completed());

    let summary = screen.last_broadcast.clone().expect("summary");
    assert_eq!(summary.successes, 2);
    assert_eq!(summary.failures, 1);
    assert_eq!(summary.failed, vec![StudentId(8)]);
    assert_eq!(gateway.calls(Method::Post, "/send-message/"), 3);
    assert_eq!(
        screen.notice.success.as_deref(),
        Some("Message sent to 2 students. Failed to send to 1 students.")
    );
}

#[tokio::test]
async fn broadcast_to_nobody_is_refused() {
    let gateway = FakeGateway::new();
    let prompt = ScriptedPrompt::composing("hello");
    gateway.ok(
        Method::Get,
        "/teacher-enrolled-students/4/",
        json!({"status": "success", "data": []}),
    );
    let mut screen = StudentListScreen::new(context(&gateway, &prompt));
    screen.activate(&teacher()).await.expect("activate");

    assert_eq!(screen.message_all().await, Outcome::Failed);
    assert_eq!(
        screen.notice.error.as_deref(),
        Some("There are no enrolled students to message.")
    );
    assert_eq!(prompt.composed(), 0);
}

#[tokio::test]
async fn open_chat_records_the_selection() {
    let gateway = FakeGateway::new();
    let prompt = ScriptedPrompt::new();
    let screen = StudentListScreen::new(context(&gateway, &prompt));
    let mut session = teacher();

    let navigation = screen.open_chat(&mut session, StudentId(9));

    assert_eq!(navigation.route, Route::TeacherChat);
    assert_eq!(navigation.after, std::time::Duration::ZERO);
    assert_eq!(session.selected_student, Some(StudentId(9)));
}
