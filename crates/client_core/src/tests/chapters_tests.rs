use super::*;
use crate::{
    gateway::Body,
    test_support::{context, FakeGateway, ScriptedPrompt},
};
use serde_json::json;
use shared::{domain::TeacherId, session::TeacherSession};

fn chapters_json() -> serde_json::Value {
    json!([
        {"id": 1, "course": 3, "title": "Intro", "description": "d", "video_url": "https://youtu.be/x"},
        {"id": 2, "course": 3, "title": "Borrowing", "description": "d", "text_content": "<p>hi</p>"}
    ])
}

fn text_part<'a>(body: &'a Body, name: &str) -> Option<&'a str> {
    match body {
        Body::Multipart(parts) => parts.iter().find_map(|(key, part)| match part {
            Part::Text(value) if key == name => Some(value.as_str()),
            _ => None,
        }),
        _ => None,
    }
}

#[tokio::test]
async fn loads_wrapped_or_bare_chapter_lists() {
    let gateway = FakeGateway::new();
    let prompt = ScriptedPrompt::new();
    gateway
        .ok(Method::Get, "/course-chapters/3/", chapters_json())
        .ok(
            Method::Get,
            "/course-chapters/3/",
            json!({"status": "success", "chapters": chapters_json()}),
        );
    let mut screen = ChaptersScreen::new(context(&gateway, &prompt), CourseId(3));

    screen.activate().await;
    assert_eq!(screen.chapters().len(), 2);
    screen.activate().await;
    assert_eq!(screen.chapters().len(), 2);
    assert_eq!(ContentKind::of(&screen.chapters()[0]), ContentKind::YouTube);
    assert_eq!(ContentKind::of(&screen.chapters()[1]), ContentKind::Text);
}

#[tokio::test]
async fn delete_waits_for_confirmation() {
    let gateway = FakeGateway::new();
    let prompt = ScriptedPrompt::cancelling();
    gateway.ok(Method::Get, "/course-chapters/3/", chapters_json());
    let mut screen = ChaptersScreen::new(context(&gateway, &prompt), CourseId(3));
    screen.activate().await;

    assert_eq!(screen.delete_chapter(ChapterId(1)).await, Outcome::Cancelled);
    assert!(gateway.writes().is_empty());
    assert_eq!(prompt.asked()[0].title, "Delete Chapter");
}

#[tokio::test]
async fn confirmed_delete_drops_the_chapter() {
    let gateway = FakeGateway::new();
    let prompt = ScriptedPrompt::confirming();
    gateway
        .ok(Method::Get, "/course-chapters/3/", chapters_json())
        .ok(Method::Delete, "/chapter/1/", serde_json::Value::Null);
    let mut screen = ChaptersScreen::new(context(&gateway, &prompt), CourseId(3));
    screen.activate().await;

    assert!(screen.delete_chapter(ChapterId(1)).await.is_completed());
    assert_eq!(screen.chapters().len(), 1);
    assert_eq!(screen.chapters()[0].id, ChapterId(2));
}

#[tokio::test]
async fn edit_replaces_row_in_place_and_blanks_other_content() {
    let gateway = FakeGateway::new();
    let prompt = ScriptedPrompt::new();
    gateway
        .ok(Method::Get, "/course-chapters/3/", chapters_json())
        .ok(
            Method::Put,
            "/chapter/2/",
            json!({"id": 2, "course": 3, "title": "Borrowing rules", "description": "d", "video_url": "https://youtu.be/y"}),
        );
    let mut screen = ChaptersScreen::new(context(&gateway, &prompt), CourseId(3));
    screen.activate().await;

    assert!(screen.begin_edit(ChapterId(2)));
    if let Some((_, edit)) = screen.editing.as_mut() {
        edit.title = "Borrowing rules".into();
        edit.kind = ContentKind::YouTube;
        edit.video_url = "https://youtu.be/y".into();
    }
    assert!(screen.save_edit().await.is_completed());

    let put = &gateway.writes()[0];
    assert_eq!(text_part(&put.body, "video_url"), Some("https://youtu.be/y"));
    assert_eq!(text_part(&put.body, "text_content"), Some(""));
    assert_eq!(text_part(&put.body, "video"), Some(""));
    assert_eq!(screen.chapters()[1].title, "Borrowing rules");
    assert!(screen.editing.is_none());
    assert_eq!(gateway.calls(Method::Get, "/course-chapters/3/"), 1);
}

fn teacher() -> Session {
    Session {
        teacher: Some(TeacherSession {
            teacher_id: TeacherId(1),
            full_name: "T".into(),
            email: "t@example.org".into(),
        }),
        ..Session::default()
    }
}

#[tokio::test]
async fn video_chapter_needs_video_or_text() {
    let gateway = FakeGateway::new();
    let prompt = ScriptedPrompt::new();
    gateway.ok(Method::Get, "/course/3/", json!({"id": 3, "title": "Rust"}));
    let mut screen = AddChapterScreen::new(context(&gateway, &prompt), CourseId(3));
    screen.activate(&teacher()).await.expect("activate");
    screen.draft.title = "Traits".into();
    screen.draft.description = "Shared behaviour".into();

    assert_eq!(screen.submit().await, Outcome::Failed);
    assert_eq!(
        screen.notice.error.as_deref(),
        Some("Please upload a video or provide text content")
    );
    screen.draft.kind = ContentKind::YouTube;
    assert_eq!(screen.submit().await, Outcome::Failed);
    assert_eq!(
        screen.notice.error.as_deref(),
        Some("Please provide a YouTube URL or text content")
    );
    assert!(gateway.writes().is_empty());
}

#[tokio::test]
async fn oversized_video_is_rejected() {
    let gateway = FakeGateway::new();
    let prompt = ScriptedPrompt::new();
    let mut screen = AddChapterScreen::new(context(&gateway, &prompt), CourseId(3));

    let err = screen
        .select_video(FileUpload::new(
            "lecture.mp4",
            "video/mp4",
            vec![0u8; (CHAPTER_VIDEO_MAX_BYTES + 1) as usize],
        ))
        .expect_err("too large");

    assert_eq!(err.message, "Video size should not exceed 50MB");
    assert!(screen.draft.video.selected().is_none());
}

#[tokio::test]
async fn text_chapter_posts_multipart_and_redirects() {
    let gateway = FakeGateway::new();
    let prompt = ScriptedPrompt::new();
    gateway.created(Method::Post, "/course/3/chapters/", json!({"id": 9}));
    let mut screen = AddChapterScreen::new(context(&gateway, &prompt), CourseId(3));
    screen.draft.title = "Traits".into();
    screen.draft.description = "Shared behaviour".into();
    screen.draft.kind = ContentKind::Text;
    screen.draft.text_content = "<p>trait objects</p>".into();

    let outcome = screen.submit().await;

    assert_eq!(
        outcome.navigation().map(|nav| nav.route.clone()),
        Some(Route::TeacherCourses)
    );
    let writes = gateway.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(text_part(&writes[0].body, "text_content"), Some("<p>trait objects</p>"));
    assert_eq!(text_part(&writes[0].body, "video_url"), None);
    assert_eq!(screen.draft, ChapterDraft::default());
}
