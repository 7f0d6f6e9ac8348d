use super::*;
use crate::{
    gateway::Method,
    test_support::{context, FakeGateway, ScriptedPrompt},
};
use serde_json::json;
use shared::session::{StudentSession, TeacherSession};

fn teacher_with_selection(selected: Option<StudentId>) -> Session {
    Session {
        teacher: Some(TeacherSession {
            teacher_id: TeacherId(4),
            full_name: "Grace".into(),
            email: "grace@example.org".into(),
        }),
        selected_student: selected,
        ..Session::default()
    }
}

fn users() -> serde_json::Value {
    json!({"status": "success", "data": [
        {"id": 7, "name": "Ada", "last_message": "See you", "unread_count": 1}
    ]})
}

fn thread() -> serde_json::Value {
    json!({"status": "success", "data": {
        "messages": [
            {"id": 1, "teacher": 4, "student": 7, "message": "Hi", "message_from": "teacher",
             "timestamp": "2024-05-01T09:00:00Z"}
        ],
        "other_user": {"id": 7, "name": "Ada"}
    }})
}

#[tokio::test]
async fn handed_over_student_is_opened_and_consumed() {
    let gateway = FakeGateway::new();
    let prompt = ScriptedPrompt::new();
    gateway
        .ok(Method::Get, "/chat-users/teacher/4/", users())
        .ok(Method::Get, "/chat-messages/teacher/4/7/", thread());
    let mut session = teacher_with_selection(Some(StudentId(7)));
    let mut screen = ChatScreen::new(context(&gateway, &prompt), Role::Teacher);

    screen.activate(&mut session).await.expect("activate");

    assert_eq!(session.selected_student, None);
    assert_eq!(screen.chat_users().len(), 1);
    let conversation = screen.conversation.as_ref().expect("opened");
    assert_eq!(conversation.other.name, "Ada");
    assert_eq!(conversation.messages.len(), 1);
    assert!(conversation.messages[0].created_at.is_some());
}

#[tokio::test]
async fn without_selection_no_thread_is_loaded() {
    let gateway = FakeGateway::new();
    let prompt = ScriptedPrompt::new();
    gateway.ok(Method::Get, "/chat-users/teacher/4/", users());
    let mut session = teacher_with_selection(None);
    let mut screen = ChatScreen::new(context(&gateway, &prompt), Role::Teacher);

    screen.activate(&mut session).await.expect("activate");

    assert!(screen.conversation.is_none());
    assert_eq!(gateway.requests().len(), 1);
}

#[tokio::test]
async fn send_trims_and_appends_the_echoed_message() {
    let gateway = FakeGateway::new();
    let prompt = ScriptedPrompt::new();
    gateway
        .ok(Method::Get, "/chat-users/teacher/4/", users())
        .ok(Method::Get, "/chat-messages/teacher/4/7/", thread())
        .ok(
            Method::Post,
            "/send-message/",
            json!({"status": "success", "data": {
                "id": 2, "teacher": 4, "student": 7, "message": "Homework is up",
                "message_from": "teacher"
            }}),
        );
    let mut session = teacher_with_selection(Some(StudentId(7)));
    let mut screen = ChatScreen::new(context(&gateway, &prompt), Role::Teacher);
    screen.activate(&mut session).await.expect("activate");

    screen.draft = "   ".into();
    assert_eq!(screen.send().await, Outcome::Cancelled);
    assert!(gateway.writes().is_empty());

    screen.draft = "  Homework is up \n".into();
    assert!(screen.send().await.is_completed());

    assert_eq!(
        gateway.last_json(Method::Post, "/send-message/"),
        Some(json!({
            "teacher_id": 4, "student_id": 7,
            "message": "Homework is up", "message_from": "teacher"
        }))
    );
    let messages = &screen.conversation.as_ref().expect("open").messages;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].message, "Homework is up");
    assert!(screen.draft.is_empty());
}

#[tokio::test]
async fn student_side_swaps_the_id_pair() {
    let gateway = FakeGateway::new();
    let prompt = ScriptedPrompt::new();
    gateway
        .ok(
            Method::Get,
            "/chat-users/student/7/",
            json!({"status": "success", "data": [{"id": 4, "name": "Grace"}]}),
        )
        .ok(
            Method::Get,
            "/chat-messages/student/7/4/",
            json!({"status": "success", "data": {"messages": [], "other_user": {"id": 4, "name": "Grace"}}}),
        )
        .ok(Method::Post, "/send-message/", json!({"status": "error", "message": "blocked"}));
    let mut session = Session {
        student: Some(StudentSession {
            student_id: StudentId(7),
            username: "ada".into(),
            fullname: "Ada".into(),
            email: "ada@example.org".into(),
        }),
        ..Session::default()
    };
    let mut screen = ChatScreen::new(context(&gateway, &prompt), Role::Student);
    screen.activate(&mut session).await.expect("activate");
    assert!(screen.open_conversation(4).await.is_completed());

    screen.draft = "Question about lifetimes".into();
    assert_eq!(screen.send().await, Outcome::Failed);

    assert_eq!(
        gateway.last_json(Method::Post, "/send-message/"),
        Some(json!({
            "teacher_id": 4, "student_id": 7,
            "message": "Question about lifetimes", "message_from": "student"
        }))
    );
    assert_eq!(screen.notice.error.as_deref(), Some("Failed to send message"));
}

#[tokio::test]
async fn confirmed_delete_clears_the_conversation() {
    let gateway = FakeGateway::new();
    let prompt = ScriptedPrompt::confirming();
    gateway
        .ok(Method::Get, "/chat-users/teacher/4/", users())
        .ok(Method::Get, "/chat-messages/teacher/4/7/", thread())
        .ok(Method::Delete, "/delete-conversation/4/7/", json!({"status": "success"}));
    let mut session = teacher_with_selection(Some(StudentId(7)));
    let mut screen = ChatScreen::new(context(&gateway, &prompt), Role::Teacher);
    screen.activate(&mut session).await.expect("activate");

    assert!(screen.delete_conversation().await.is_completed());

    assert!(screen.conversation.is_none());
    assert_eq!(
        prompt.asked()[0].body,
        "Are you sure you want to delete all messages with Ada?"
    );
    assert_eq!(gateway.calls(Method::Delete, "/delete-conversation/4/7/"), 1);
}

#[tokio::test]
async fn cancelled_delete_keeps_everything() {
    let gateway = FakeGateway::new();
    let prompt = ScriptedPrompt::cancelling();
    gateway
        .ok(Method::Get, "/chat-users/teacher/4/", users())
        .ok(Method::Get, "/chat-messages/teacher/4/7/", thread());
    let mut session = teacher_with_selection(Some(StudentId(7)));
    let mut screen = ChatScreen::new(context(&gateway, &prompt), Role::Teacher);
    screen.activate(&mut session).await.expect("activate");

    assert_eq!(screen.delete_conversation().await, Outcome::Cancelled);
    assert!(screen.conversation.is_some());
    assert!(gateway.writes().is_empty());
}
