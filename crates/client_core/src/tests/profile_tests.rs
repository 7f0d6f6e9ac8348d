use super::*;
use crate::{
    gateway::{Body, Method},
    test_support::{context, FakeGateway, ScriptedPrompt},
};
use serde_json::json;
use shared::{
    domain::{StudentId, TeacherId},
    session::{StudentSession, TeacherSession},
};

fn teacher_session() -> Session {
    Session {
        teacher: Some(TeacherSession {
            teacher_id: TeacherId(4),
            full_name: "Grace".into(),
            email: "grace@example.org".into(),
        }),
        ..Session::default()
    }
}

fn teacher_json() -> serde_json::Value {
    json!({
        "id": 4, "full_name": "Grace", "email": "grace@example.org",
        "profile_img": "/media/teacher_profile_imgs/grace.png",
        "qualification": "PhD", "mobile_number": "555", "skills": "Rust,COBOL"
    })
}

fn part_names(body: &Body) -> Vec<String> {
    match body {
        Body::Multipart(parts) => parts.iter().map(|(name, _)| name.clone()).collect(),
        _ => Vec::new(),
    }
}

#[tokio::test]
async fn teacher_profile_loads_into_draft() {
    let gateway = FakeGateway::new();
    let prompt = ScriptedPrompt::new();
    gateway.ok(Method::Get, "/teacher/4/", teacher_json());
    let mut screen = ProfileScreen::new(context(&gateway, &prompt), Role::Teacher);

    screen.activate(&teacher_session()).await.expect("activate");

    let draft = screen.draft.as_ref().expect("draft");
    assert_eq!(draft.full_name, "Grace");
    assert!(draft.password.is_empty());
    assert_eq!(
        screen.image_url(),
        "http://127.0.0.1:8000/media/teacher_profile_imgs/grace.png"
    );
}

#[tokio::test]
async fn save_omits_blank_password_and_unselected_image() {
    let gateway = FakeGateway::new();
    let prompt = ScriptedPrompt::new();
    let mut updated = teacher_json();
    updated["full_name"] = json!("Grace Hopper");
    gateway
        .ok(Method::Get, "/teacher/4/", teacher_json())
        .ok(Method::Put, "/teacher/4/", updated);
    let mut session = teacher_session();
    let mut screen = ProfileScreen::new(context(&gateway, &prompt), Role::Teacher);
    screen.activate(&session).await.expect("activate");
    if let Some(draft) = screen.draft.as_mut() {
        draft.full_name = "Grace Hopper".into();
    }

    assert!(screen.save(&mut session).await.is_completed());

    let names = part_names(&gateway.writes()[0].body);
    assert_eq!(
        names,
        vec!["full_name", "email", "qualification", "mobile_number", "skills"]
    );
    assert_eq!(
        session.teacher.as_ref().map(|t| t.full_name.as_str()),
        Some("Grace Hopper")
    );
    assert_eq!(
        screen.state.ready().map(Profile::display_name),
        Some("Grace Hopper")
    );
}

#[tokio::test]
async fn password_and_image_are_sent_when_set() {
    let gateway = FakeGateway::new();
    let prompt = ScriptedPrompt::new();
    gateway
        .ok(Method::Get, "/teacher/4/", teacher_json())
        .ok(Method::Put, "/teacher/4/", teacher_json());
    let mut session = teacher_session();
    let mut screen = ProfileScreen::new(context(&gateway, &prompt), Role::Teacher);
    screen.activate(&session).await.expect("activate");
    screen
        .select_image(FileUpload::new("me.png", "image/png", vec![1; 128]))
        .expect("image");
    if let Some(draft) = screen.draft.as_mut() {
        draft.password = "hunter22".into();
    }

    assert!(screen.save(&mut session).await.is_completed());

    let names = part_names(&gateway.writes()[0].body);
    assert!(names.contains(&"password".to_string()));
    assert!(names.contains(&"profile_img".to_string()));
    assert!(screen.draft.as_ref().is_some_and(|d| d.password.is_empty()));
}

#[tokio::test]
async fn non_image_upload_is_rejected_locally() {
    let gateway = FakeGateway::new();
    let prompt = ScriptedPrompt::new();
    gateway.ok(Method::Get, "/teacher/4/", teacher_json());
    let mut screen = ProfileScreen::new(context(&gateway, &prompt), Role::Teacher);
    screen.activate(&teacher_session()).await.expect("activate");

    let err = screen
        .select_image(FileUpload::new("cv.pdf", "application/pdf", vec![1; 10]))
        .expect_err("not an image");

    assert_eq!(err.message, "Please select an image file");
    assert!(gateway.writes().is_empty());
}

#[tokio::test]
async fn remove_image_patches_flag_and_clears_local_copy() {
    let gateway = FakeGateway::new();
    let prompt = ScriptedPrompt::new();
    gateway
        .ok(Method::Get, "/teacher/4/", teacher_json())
        .ok(Method::Patch, "/teacher/4/", json!({}));
    let mut screen = ProfileScreen::new(context(&gateway, &prompt), Role::Teacher);
    screen.activate(&teacher_session()).await.expect("activate");

    assert!(screen.remove_image().await.is_completed());

    assert_eq!(
        gateway.last_json(Method::Patch, "/teacher/4/"),
        Some(json!({"remove_profile_img": true}))
    );
    assert_eq!(screen.image_url(), "");
}

#[tokio::test]
async fn student_profile_uses_envelopes_and_refreshes_session() {
    let gateway = FakeGateway::new();
    let prompt = ScriptedPrompt::new();
    gateway
        .ok(
            Method::Get,
            "/student/7/",
            json!({"status": "success", "data": {
                "id": 7, "fullname": "Ada", "username": "ada", "email": "ada@example.org",
                "interested_categories": "systems"
            }}),
        )
        .ok(
            Method::Put,
            "/student/7/",
            json!({"status": "success", "data": {"fullname": "Ada Lovelace", "email": "ada@example.org"}}),
        );
    let mut session = Session {
        student: Some(StudentSession {
            student_id: StudentId(7),
            username: "ada".into(),
            fullname: "Ada".into(),
            email: "ada@example.org".into(),
        }),
        ..Session::default()
    };
    let mut screen = ProfileScreen::new(context(&gateway, &prompt), Role::Student);
    screen.activate(&session).await.expect("activate");
    if let Some(draft) = screen.draft.as_mut() {
        draft.full_name = "Ada Lovelace".into();
    }

    assert!(screen.save(&mut session).await.is_completed());

    assert_eq!(
        part_names(&gateway.writes()[0].body),
        vec!["fullname", "email", "username", "interested_categories"]
    );
    assert_eq!(
        session.student.as_ref().map(|s| s.fullname.as_str()),
        Some("Ada Lovelace")
    );
}

#[tokio::test]
async fn missing_session_is_not_authenticated() {
    let gateway = FakeGateway::new();
    let prompt = ScriptedPrompt::new();
    let mut screen = ProfileScreen::new(context(&gateway, &prompt), Role::Student);

    let err = screen.activate(&Session::default()).await.expect_err("no student");

    assert!(matches!(err, ClientError::NotAuthenticated));
    assert!(gateway.requests().is_empty());
}
