use super::*;
use crate::{
    gateway::Method,
    test_support::{context, FakeGateway, ScriptedPrompt},
};
use serde_json::{json, Value};
use shared::{domain::TeacherId, session::TeacherSession};

fn course(id: i64, teacher: i64, rating: Value) -> Value {
    json!({
        "id": id,
        "title": format!("Course {id}"),
        "description": "",
        "price": 0,
        "category": 1,
        "teacher": {"id": teacher, "full_name": format!("Teacher {teacher}")},
        "average_rating": rating,
    })
}

fn teacher(id: i64) -> Value {
    json!({"id": id, "full_name": format!("Teacher {id}"), "email": format!("t{id}@example.org")})
}

fn seed(gateway: &FakeGateway, courses: Vec<Value>, teachers: Vec<Value>) {
    gateway
        .ok(Method::Get, "/course/", Value::Array(courses))
        .ok(Method::Get, "/teacher/", Value::Array(teachers))
        .ok(
            Method::Get,
            "/get-top-course-ratings/",
            json!({"status": "success", "data": [
                {"id": 1, "student_name": "Ana", "course_title": "Course 1", "rating": 5, "review": "Great"}
            ]}),
        );
}

#[tokio::test]
async fn showcases_latest_popular_and_featured() {
    let gateway = FakeGateway::new();
    let prompt = ScriptedPrompt::new();
    seed(
        &gateway,
        vec![
            course(1, 10, json!("3.50")),
            course(2, 10, Value::Null),
            course(3, 11, json!(4.9)),
            course(4, 12, json!("4.10")),
            course(5, 10, json!("5.00")),
        ],
        vec![teacher(10), teacher(11), teacher(12), teacher(13)],
    );

    let mut screen = HomeScreen::new(context(&gateway, &prompt));
    screen.activate(&Session::default()).await;

    let data = screen.state.ready().expect("home loaded");
    let latest: Vec<i64> = data.latest.iter().map(|c| c.id.0).collect();
    assert_eq!(latest, vec![1, 2, 3, 4]);
    let popular: Vec<i64> = data.popular.iter().map(|c| c.id.0).collect();
    assert_eq!(popular, vec![5, 3, 4, 1]);

    let featured: Vec<(i64, usize)> = data
        .featured_teachers
        .iter()
        .map(|f| (f.teacher.id.0, f.course_count))
        .collect();
    assert_eq!(featured, vec![(10, 3), (11, 1), (12, 1)]);

    assert_eq!(data.testimonials.len(), 1);
    assert!(data.my_courses.is_empty());
    assert_eq!(
        data.stats,
        SiteStats {
            total_courses: 5,
            total_teachers: 4,
            estimated_students: 75,
            estimated_lessons: 40,
        }
    );
    assert_eq!(gateway.calls(Method::Get, "/teacher-courses/7/"), 0);
}

#[tokio::test]
async fn signed_in_teacher_also_gets_own_courses() {
    let gateway = FakeGateway::new();
    let prompt = ScriptedPrompt::new();
    seed(&gateway, vec![course(1, 7, json!(4))], vec![teacher(7)]);
    gateway.ok(
        Method::Get,
        "/teacher-courses/7/",
        json!([course(1, 7, json!(4))]),
    );

    let session = Session {
        teacher: Some(TeacherSession {
            teacher_id: TeacherId(7),
            full_name: "Teacher 7".into(),
            email: "t7@example.org".into(),
        }),
        ..Session::default()
    };
    let mut screen = HomeScreen::new(context(&gateway, &prompt));
    screen.activate(&session).await;

    let data = screen.state.ready().expect("home loaded");
    assert_eq!(data.my_courses.len(), 1);
}

#[tokio::test]
async fn course_fetch_failure_is_reported_inline() {
    let gateway = FakeGateway::new();
    let prompt = ScriptedPrompt::new();
    gateway.unreachable(Method::Get, "/course/");

    let mut screen = HomeScreen::new(context(&gateway, &prompt));
    screen.activate(&Session::default()).await;

    assert_eq!(screen.state.error(), Some("Failed to load the home page"));
}

#[test]
fn estimated_students_are_capped() {
    assert_eq!(site_stats(1_000, 3).estimated_students, 10_000);
    assert_eq!(site_stats(2, 3).estimated_students, 30);
}
