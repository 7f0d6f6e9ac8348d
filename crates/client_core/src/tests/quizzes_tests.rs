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

fn quiz_json() -> serde_json::Value {
    json!({"id": 11, "teacher": 4, "title": "Ownership", "description": "", "total_marks": 10})
}

fn questions_json(count: usize) -> serde_json::Value {
    let questions: Vec<_> = (1..=count)
        .map(|id| {
            json!({"id": id, "quiz": 11, "question_text": format!("Q{id}"),
                   "ans1": "a", "ans2": "b", "ans3": "c", "ans4": "d", "right_ans": "a"})
        })
        .collect();
    json!({"status": "success", "questions": questions})
}

#[tokio::test]
async fn quiz_list_requires_a_teacher() {
    let gateway = FakeGateway::new();
    let prompt = ScriptedPrompt::new();
    let mut screen = TeacherQuizzesScreen::new(context(&gateway, &prompt));

    let err = screen.activate(&Session::default()).await.expect_err("no teacher");

    assert!(matches!(err, ClientError::NotAuthenticated));
    assert!(gateway.requests().is_empty());
}

#[tokio::test]
async fn created_quiz_resets_form_and_reloads() {
    let gateway = FakeGateway::new();
    let prompt = ScriptedPrompt::new();
    gateway
        .ok(Method::Get, "/teacher-quizzes/4/", json!([]))
        .ok(Method::Get, "/teacher-quizzes/4/", json!([quiz_json()]))
        .created(Method::Post, "/teacher-quizzes/4/", quiz_json());
    let mut screen = TeacherQuizzesScreen::new(context(&gateway, &prompt));
    screen.activate(&teacher()).await.expect("activate");
    assert!(screen.quizzes().is_empty());

    screen.draft = QuizDraft {
        title: "Ownership".into(),
        description: "Moves and borrows".into(),
        total_marks: "10".into(),
    };
    assert!(screen.create_quiz().await.is_completed());

    assert_eq!(
        gateway.last_json(Method::Post, "/teacher-quizzes/4/"),
        Some(json!({"title": "Ownership", "description": "Moves and borrows", "total_marks": 10}))
    );
    assert_eq!(screen.draft, QuizDraft::default());
    assert_eq!(screen.quizzes().len(), 1);
}

#[tokio::test]
async fn incomplete_quiz_is_not_sent() {
    let gateway = FakeGateway::new();
    let prompt = ScriptedPrompt::new();
    gateway.ok(Method::Get, "/teacher-quizzes/4/", json!([]));
    let mut screen = TeacherQuizzesScreen::new(context(&gateway, &prompt));
    screen.activate(&teacher()).await.expect("activate");
    screen.draft.title = "Ownership".into();

    assert_eq!(screen.create_quiz().await, Outcome::Failed);
    assert_eq!(screen.notice.error.as_deref(), Some("Please fill all the fields"));
    assert!(gateway.writes().is_empty());
}

#[tokio::test]
async fn failed_quiz_delete_explains_course_usage() {
    let gateway = FakeGateway::new();
    let prompt = ScriptedPrompt::confirming();
    gateway
        .ok(Method::Get, "/teacher-quizzes/4/", json!([quiz_json()]))
        .status(Method::Delete, "/quiz-detail/11/", 500, json!({}));
    let mut screen = TeacherQuizzesScreen::new(context(&gateway, &prompt));
    screen.activate(&teacher()).await.expect("activate");

    assert_eq!(screen.delete_quiz(QuizId(11)).await, Outcome::Failed);
    assert_eq!(
        screen.notice.error.as_deref(),
        Some("Failed to delete quiz. It might be used in courses.")
    );
}

#[test]
fn right_answer_must_be_an_option() {
    let mut draft = QuestionDraft {
        question_text: "Which trait enables `?`".into(),
        ans1: "From".into(),
        ans2: "Into".into(),
        ans3: "Try".into(),
        ans4: "Deref".into(),
        right_ans: "AsRef".into(),
    };
    assert_eq!(
        draft.validate().map_err(|err| err.message),
        Err("The right answer must match one of the options".to_string())
    );

    draft.right_ans = "Try".into();
    assert!(draft.validate().is_ok());

    draft.ans3.clear();
    assert_eq!(
        draft.validate().map_err(|err| err.message),
        Err("All fields are required".to_string())
    );
}

#[tokio::test]
async fn added_question_resets_form_and_refetches() {
    let gateway = FakeGateway::new();
    let prompt = ScriptedPrompt::new();
    gateway
        .ok(Method::Get, "/quiz-detail/11/", quiz_json())
        .ok(Method::Get, "/quiz-questions/11/", questions_json(1))
        .ok(Method::Get, "/quiz-questions/11/", questions_json(2))
        .created(Method::Post, "/add-quiz-question/11/", json!({"id": 2}));
    let mut screen = QuizQuestionsScreen::new(context(&gateway, &prompt), QuizId(11));
    screen.activate(&teacher()).await.expect("activate");
    assert_eq!(screen.quiz.ready().map(|q| q.title.as_str()), Some("Ownership"));
    assert_eq!(screen.question_list().len(), 1);

    screen.draft = QuestionDraft {
        question_text: "Q2".into(),
        ans1: "a".into(),
        ans2: "b".into(),
        ans3: "c".into(),
        ans4: "d".into(),
        right_ans: "b".into(),
    };
    assert!(screen.add_question().await.is_completed());

    assert_eq!(screen.notice.success.as_deref(), Some("Question added successfully!"));
    assert_eq!(screen.draft, QuestionDraft::default());
    assert_eq!(screen.question_list().len(), 2);
    assert_eq!(gateway.calls(Method::Get, "/quiz-questions/11/"), 2);
}

#[tokio::test]
async fn question_delete_needs_confirmation_then_refetches() {
    let gateway = FakeGateway::new();
    let cancelling = ScriptedPrompt::cancelling();
    gateway
        .ok(Method::Get, "/quiz-detail/11/", quiz_json())
        .ok(Method::Get, "/quiz-questions/11/", questions_json(2))
        .ok(Method::Get, "/quiz-questions/11/", questions_json(1))
        .ok(Method::Delete, "/quiz-question-detail/2/", serde_json::Value::Null);

    let mut screen = QuizQuestionsScreen::new(context(&gateway, &cancelling), QuizId(11));
    screen.activate(&teacher()).await.expect("activate");
    assert_eq!(screen.delete_question(QuestionId(2)).await, Outcome::Cancelled);
    assert!(gateway.writes().is_empty());

    let confirming = ScriptedPrompt::confirming();
    let mut screen = QuizQuestionsScreen::new(context(&gateway, &confirming), QuizId(11));
    screen.activate(&teacher()).await.expect("activate");
    assert!(screen.delete_question(QuestionId(2)).await.is_completed());
    assert_eq!(gateway.calls(Method::Delete, "/quiz-question-detail/2/"), 1);
    assert_eq!(screen.question_list().len(), 1);
}

fn assign_fixtures(gateway: &FakeGateway) {
    gateway
        .ok(Method::Get, "/quiz-detail/11/", quiz_json())
        .ok(
            Method::Get,
            "/teacher-courses/4/",
            json!([{"id": 1, "title": "Rust"}, {"id": 2, "title": "Go"}]),
        )
        .ok(
            Method::Get,
            "/course-assigned-quizzes/11/",
            json!({"status": "success", "data": [
                {"id": 30, "quiz": 11, "course": 1},
                {"id": 31, "quiz": 12, "course": 2}
            ]}),
        );
}

#[tokio::test]
async fn assigned_rows_are_filtered_to_this_quiz() {
    let gateway = FakeGateway::new();
    let prompt = ScriptedPrompt::new();
    assign_fixtures(&gateway);
    let mut screen = AssignQuizScreen::new(context(&gateway, &prompt), QuizId(11));
    screen.activate(&teacher()).await.expect("activate");

    assert_eq!(screen.assigned.len(), 1);
    assert!(screen.is_assigned(CourseId(1)));
    assert!(!screen.is_assigned(CourseId(2)));
    let available: Vec<_> = screen.available_courses().iter().map(|c| c.id).collect();
    assert_eq!(available, vec![CourseId(2)]);
}

#[tokio::test]
async fn already_assigned_course_is_refused_locally() {
    let gateway = FakeGateway::new();
    let prompt = ScriptedPrompt::new();
    assign_fixtures(&gateway);
    let mut screen = AssignQuizScreen::new(context(&gateway, &prompt), QuizId(11));
    screen.activate(&teacher()).await.expect("activate");

    assert_eq!(screen.assign().await, Outcome::Failed);
    assert_eq!(screen.notice.error.as_deref(), Some("Please select a course"));

    screen.selected_course = Some(CourseId(1));
    assert_eq!(screen.assign().await, Outcome::Failed);
    assert_eq!(
        screen.notice.error.as_deref(),
        Some("This quiz is already assigned to the selected course")
    );
    assert!(gateway.writes().is_empty());
}

#[tokio::test]
async fn assigning_posts_ids_and_uses_server_message() {
    let gateway = FakeGateway::new();
    let prompt = ScriptedPrompt::new();
    assign_fixtures(&gateway);
    gateway.created(
        Method::Post,
        "/assign-quiz-to-course/",
        json!({"status": "success", "message": "Quiz assigned to Go"}),
    );
    let mut screen = AssignQuizScreen::new(context(&gateway, &prompt), QuizId(11));
    screen.activate(&teacher()).await.expect("activate");
    screen.selected_course = Some(CourseId(2));

    assert!(screen.assign().await.is_completed());
    assert_eq!(
        gateway.last_json(Method::Post, "/assign-quiz-to-course/"),
        Some(json!({"quiz_id": 11, "course_id": 2}))
    );
    assert_eq!(screen.notice.success.as_deref(), Some("Quiz assigned to Go"));
    assert_eq!(screen.selected_course, None);
    assert_eq!(gateway.calls(Method::Get, "/course-assigned-quizzes/11/"), 2);
}

#[tokio::test]
async fn removing_an_assignment_asks_first() {
    let gateway = FakeGateway::new();
    let prompt = ScriptedPrompt::confirming();
    assign_fixtures(&gateway);
    gateway.ok(Method::Delete, "/remove-quiz-from-course/30/", json!({}));
    let mut screen = AssignQuizScreen::new(context(&gateway, &prompt), QuizId(11));
    screen.activate(&teacher()).await.expect("activate");

    assert!(screen.remove_assignment(CourseQuizId(30)).await.is_completed());
    assert_eq!(prompt.asked()[0].confirm_label, "Yes, remove it!");
    assert_eq!(
        screen.notice.success.as_deref(),
        Some("Quiz has been removed from the course successfully.")
    );
}
