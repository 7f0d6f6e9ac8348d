use super::*;
use shared::domain::TeacherId;

fn teacher() -> TeacherSession {
    TeacherSession {
        teacher_id: TeacherId(7),
        full_name: "Ada Lovelace".into(),
        email: "ada@example.com".into(),
    }
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let store = SessionStore::new("sqlite::memory:").await.expect("db");
    store.health_check().await.expect("health check");
}

#[tokio::test]
async fn empty_store_loads_logged_out_session() {
    let store = SessionStore::new("sqlite::memory:").await.expect("db");
    let session = store.load_session().await.expect("load");
    assert_eq!(session, Session::default());
}

#[tokio::test]
async fn saves_and_reloads_teacher_session() {
    let store = SessionStore::new("sqlite::memory:").await.expect("db");
    let mut session = Session::default();
    session.login_teacher(teacher());
    session.select_student(StudentId(3));

    store.save_session(&session).await.expect("save");
    let loaded = store.load_session().await.expect("load");

    assert_eq!(loaded, session);
    assert_eq!(
        store
            .get_raw(SessionKey::TeacherLoginStatus)
            .await
            .expect("raw")
            .as_deref(),
        Some("true")
    );
}

#[tokio::test]
async fn teacher_data_without_login_flag_is_ignored() {
    let store = SessionStore::new("sqlite::memory:").await.expect("db");
    store
        .put_json(SessionKey::TeacherData, &teacher())
        .await
        .expect("put");

    let loaded = store.load_session().await.expect("load");
    assert!(loaded.teacher.is_none());
}

#[tokio::test]
async fn logout_removes_teacher_entries_and_selection() {
    let store = SessionStore::new("sqlite::memory:").await.expect("db");
    let mut session = Session::default();
    session.login_teacher(teacher());
    session.select_student(StudentId(3));
    store.save_session(&session).await.expect("save");

    session.logout_teacher();
    store.save_session(&session).await.expect("save");

    let entries = store.entries().await.expect("entries");
    assert!(entries.is_empty(), "left over entries: {entries:?}");
}

#[tokio::test]
async fn undecodable_entry_reads_as_absent() {
    let store = SessionStore::new("sqlite::memory:").await.expect("db");
    store
        .put_raw(SessionKey::StudentInfo, "{not json")
        .await
        .expect("put");

    let loaded = store.load_session().await.expect("load");
    assert!(loaded.student.is_none());
}

#[tokio::test]
async fn put_overwrites_existing_value() {
    let store = SessionStore::new("sqlite::memory:").await.expect("db");
    store
        .put_json(SessionKey::SelectedStudentId, &StudentId(1))
        .await
        .expect("first");
    store
        .put_json(SessionKey::SelectedStudentId, &StudentId(2))
        .await
        .expect("second");

    let value: Option<StudentId> = store
        .get_json(SessionKey::SelectedStudentId)
        .await
        .expect("get");
    assert_eq!(value, Some(StudentId(2)));
    assert_eq!(store.entries().await.expect("entries").len(), 1);
}

#[test]
fn sqlite_path_skips_memory_urls() {
    assert!(sqlite_path("sqlite::memory:").is_none());
    assert_eq!(
        sqlite_path("sqlite://./data/session.db?mode=rwc"),
        Some(PathBuf::from("./data/session.db"))
    );
}
