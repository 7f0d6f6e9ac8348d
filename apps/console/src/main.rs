use std::{io::Write, sync::Arc, time::Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{
    load_settings,
    screens::{
        assignments::CheckAssignmentsScreen,
        auth::{logout, StudentLoginScreen, TeacherLoginScreen},
        chapters::ChaptersScreen,
        chat::ChatScreen,
        course_detail::CourseDetailScreen,
        courses::TeacherCoursesScreen,
        home::HomeScreen,
        profile::ProfileScreen,
        quiz_attempts::{
            format_time, AttemptQuizScreen, AvailableQuizzesScreen, QuizResultsScreen, ScoreBand,
        },
        quizzes::{AssignQuizScreen, QuizQuestionsScreen},
        students::StudentListScreen,
    },
    ClientError, ComposeRequest, ConfirmRequest, ConfirmationPrompt, Decision, LoadingIndicator,
    Notice, Outcome, Route, ScreenContext, ViewState,
};
use shared::{
    domain::{AssignmentId, AttemptId, ChapterId, CourseId, CourseQuizId, QuestionId, QuizId, Role, StudentId},
    session::Session,
};
use storage::SessionStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "knoology", about = "Terminal front-end for the Knoology LMS")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RoleArg {
    Teacher,
    Student,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Teacher => Role::Teacher,
            RoleArg::Student => Role::Student,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Latest and popular courses, featured teachers and site totals.
    Home,
    TeacherLogin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    StudentLogin {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    Logout {
        #[arg(long, value_enum)]
        role: RoleArg,
    },
    Courses {
        /// Also list the students enrolled in this course.
        #[arg(long)]
        enrolled: Option<i64>,
    },
    DeleteCourse {
        course_id: i64,
    },
    Chapters {
        course_id: i64,
        #[arg(long)]
        delete: Option<i64>,
    },
    Assignments {
        student_id: i64,
        #[arg(long)]
        delete: Option<i64>,
    },
    Grade {
        student_id: i64,
        assignment_id: i64,
        grade: String,
    },
    QuizQuestions {
        quiz_id: i64,
    },
    AssignQuiz {
        quiz_id: i64,
        #[arg(long)]
        course: Option<i64>,
        #[arg(long)]
        remove: Option<i64>,
    },
    Students {
        #[arg(long)]
        message: Option<i64>,
        /// Hand this student to the chat panel.
        #[arg(long)]
        chat: Option<i64>,
    },
    MessageAll,
    Chat {
        #[arg(long, value_enum)]
        role: RoleArg,
        #[arg(long)]
        with: Option<i64>,
        #[arg(long)]
        send: Option<String>,
        #[arg(long)]
        delete: bool,
    },
    Profile {
        #[arg(long, value_enum)]
        role: RoleArg,
        #[arg(long)]
        remove_image: bool,
    },
    /// Course page; the actions need a student login.
    CourseDetail {
        course_id: i64,
        #[arg(long)]
        enroll: bool,
        /// Stars, 1 to 5.
        #[arg(long)]
        rate: Option<u8>,
        #[arg(long, default_value = "")]
        review: String,
        #[arg(long)]
        favorite: bool,
        /// Mark this chapter as completed.
        #[arg(long)]
        complete: Option<i64>,
    },
    AvailableQuizzes,
    AttemptQuiz {
        quiz_id: i64,
        course_id: i64,
        /// `<question id>=<option text>`, once per answered question.
        #[arg(long = "answer", value_parser = parse_answer)]
        answers: Vec<(i64, String)>,
    },
    QuizResults {
        #[arg(long)]
        student: Option<i64>,
        #[arg(long)]
        show: Option<i64>,
    },
}

impl Command {
    /// The login a command falls back to when nobody is signed in.
    fn role(&self) -> Role {
        match self {
            Command::StudentLogin { .. }
            | Command::CourseDetail { .. }
            | Command::AvailableQuizzes
            | Command::AttemptQuiz { .. } => Role::Student,
            Command::Logout { role } | Command::Chat { role, .. } | Command::Profile { role, .. } => {
                (*role).into()
            }
            _ => Role::Teacher,
        }
    }
}

fn login_route(role: Role) -> Route {
    match role {
        Role::Teacher => Route::TeacherLogin,
        Role::Student => Route::StudentLogin,
    }
}

fn is_not_authenticated(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<ClientError>(), Some(ClientError::NotAuthenticated))
}

fn parse_answer(raw: &str) -> Result<(i64, String), String> {
    let (question, answer) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected <question id>=<answer>, got `{raw}`"))?;
    let question = question
        .trim()
        .parse::<i64>()
        .map_err(|err| format!("bad question id `{question}`: {err}"))?;
    Ok((question, answer.trim().to_string()))
}

/// Asks on the terminal; anything but `y`/`yes` declines.
struct StdinPrompt;

#[async_trait]
impl ConfirmationPrompt for StdinPrompt {
    async fn confirm(&self, request: ConfirmRequest) -> Decision {
        let question = format!(
            "{}\n{}\n{} [y/N] ",
            request.title, request.body, request.confirm_label
        );
        match read_answer(question).await.as_deref() {
            Some("y" | "Y" | "yes" | "Yes") => Decision::Confirmed,
            _ => Decision::Cancelled,
        }
    }

    async fn compose(&self, request: ComposeRequest) -> Option<String> {
        let question = format!(
            "{}\n{} ({}): ",
            request.title, request.placeholder, request.confirm_label
        );
        read_answer(question).await.filter(|text| !text.is_empty())
    }
}

async fn read_answer(question: String) -> Option<String> {
    tokio::task::spawn_blocking(move || {
        let mut stdout = std::io::stdout();
        write!(stdout, "{question}").ok()?;
        stdout.flush().ok()?;
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).ok()?;
        Some(line.trim().to_string())
    })
    .await
    .ok()
    .flatten()
}

fn print_state<T>(state: &ViewState<T>, render: impl FnOnce(&T)) {
    if state.is_loading() {
        println!("{}", LoadingIndicator::default().render());
    } else if let Some(message) = state.error() {
        println!("error: {message}");
    } else if let Some(value) = state.ready() {
        render(value);
    }
}

fn print_notice(notice: &Notice) {
    if let Some(message) = &notice.success {
        println!("{message}");
    }
    if let Some(message) = &notice.error {
        println!("error: {message}");
    }
}

async fn follow(outcome: &Outcome) {
    if let Some(navigation) = outcome.navigation() {
        tokio::time::sleep(navigation.after).await;
        println!("-> {}", navigation.route.path());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let settings = load_settings();
    let store = SessionStore::new(&settings.session_db_url)
        .await
        .context("failed to open the session store")?;
    let mut session = store.load_session().await?;
    let ctx = ScreenContext::from_settings(&settings, Arc::new(StdinPrompt));
    info!(api = %settings.api_base_url, "console started");

    let result = run_or_login(cli.command, ctx, &mut session).await;

    store
        .save_session(&session)
        .await
        .context("failed to persist the session")?;
    result
}

/// A screen that needs a login sends the user to the login page instead of
/// failing, so the session is still saved.
async fn run_or_login(command: Command, ctx: ScreenContext, session: &mut Session) -> Result<()> {
    let role = command.role();
    match run(command, ctx, session).await {
        Err(err) if is_not_authenticated(&err) => {
            println!("-> {}", login_route(role).path());
            Ok(())
        }
        other => other,
    }
}

async fn run(command: Command, ctx: ScreenContext, session: &mut Session) -> Result<()> {
    match command {
        Command::Home => {
            let mut screen = HomeScreen::new(ctx);
            screen.activate(session).await;
            print_state(&screen.state, |home| {
                println!("Latest courses:");
                for course in &home.latest {
                    println!("  #{} {}", course.id, course.title);
                }
                println!("Popular courses:");
                for course in &home.popular {
                    let rating = course.average_rating.unwrap_or_default();
                    println!("  #{} {} ({rating:.1})", course.id, course.title);
                }
                println!("Featured teachers:");
                for featured in &home.featured_teachers {
                    println!(
                        "  {} ({} courses)",
                        featured.teacher.full_name, featured.course_count
                    );
                }
                let stats = &home.stats;
                println!(
                    "{} courses, {} teachers, ~{} students, ~{} lessons",
                    stats.total_courses,
                    stats.total_teachers,
                    stats.estimated_students,
                    stats.estimated_lessons
                );
            });
        }
        Command::TeacherLogin { email, password } => {
            let mut screen = TeacherLoginScreen::new(ctx);
            screen.email = email;
            screen.password = password;
            let outcome = screen.submit(session).await;
            print_notice(&screen.notice);
            follow(&outcome).await;
        }
        Command::StudentLogin { username, password } => {
            let mut screen = StudentLoginScreen::new(ctx);
            screen.username = username;
            screen.password = password;
            let outcome = screen.submit(session).await;
            print_notice(&screen.notice);
            follow(&outcome).await;
        }
        Command::Logout { role } => {
            let navigation = logout(session, role.into());
            println!("-> {}", navigation.route.path());
        }
        Command::Courses { enrolled } => {
            let mut screen = TeacherCoursesScreen::new(ctx);
            screen.activate(session).await?;
            print_state(&screen.state, |courses| {
                for course in courses {
                    println!(
                        "#{} {} ({} enrolled)",
                        course.id, course.title, course.total_enrolled
                    );
                }
            });
            if let Some(course_id) = enrolled {
                screen.view_enrolled(CourseId(course_id)).await;
                if let Some(roster) = &screen.roster {
                    for student in &roster.students {
                        println!("  {} <{}>", student.fullname, student.email);
                    }
                }
            }
            print_notice(&screen.notice);
        }
        Command::DeleteCourse { course_id } => {
            let mut screen = TeacherCoursesScreen::new(ctx);
            screen.activate(session).await?;
            screen.delete_course(CourseId(course_id)).await;
            print_notice(&screen.notice);
        }
        Command::Chapters { course_id, delete } => {
            let mut screen = ChaptersScreen::new(ctx, CourseId(course_id));
            screen.activate().await;
            if let Some(chapter_id) = delete {
                screen.delete_chapter(ChapterId(chapter_id)).await;
            }
            print_state(&screen.state, |chapters| {
                for chapter in chapters {
                    println!("#{} {}", chapter.id, chapter.title);
                }
            });
            print_notice(&screen.notice);
        }
        Command::Assignments { student_id, delete } => {
            let mut screen = CheckAssignmentsScreen::new(ctx, StudentId(student_id));
            screen.activate().await;
            if let Some(assignment_id) = delete {
                screen.delete_assignment(AssignmentId(assignment_id)).await;
            }
            print_state(&screen.state, |work| {
                println!("Assignments for {}:", work.student_name);
                for assignment in &work.assignments {
                    let status = match (&assignment.grade, &assignment.submission_date) {
                        (Some(grade), _) => format!("graded {grade}"),
                        (None, Some(_)) => "submitted".to_string(),
                        (None, None) => "pending".to_string(),
                    };
                    println!(
                        "  #{} {} due {} [{status}]",
                        assignment.id, assignment.title, assignment.due_date
                    );
                }
            });
            print_notice(&screen.notice);
        }
        Command::Grade {
            student_id,
            assignment_id,
            grade,
        } => {
            let mut screen = CheckAssignmentsScreen::new(ctx, StudentId(student_id));
            screen.activate().await;
            screen.grade(AssignmentId(assignment_id), &grade).await;
            print_notice(&screen.notice);
        }
        Command::QuizQuestions { quiz_id } => {
            let mut screen = QuizQuestionsScreen::new(ctx, QuizId(quiz_id));
            screen.activate(session).await?;
            print_state(&screen.quiz, |quiz| {
                println!("{} ({} marks)", quiz.title, quiz.total_marks);
            });
            print_state(&screen.questions, |questions| {
                for (index, question) in questions.iter().enumerate() {
                    println!("  {}. {}", index + 1, question.question_text);
                }
            });
            print_notice(&screen.notice);
        }
        Command::AssignQuiz {
            quiz_id,
            course,
            remove,
        } => {
            let mut screen = AssignQuizScreen::new(ctx, QuizId(quiz_id));
            screen.activate(session).await?;
            if let Some(assignment_id) = remove {
                screen.remove_assignment(CourseQuizId(assignment_id)).await;
            } else if let Some(course_id) = course {
                screen.selected_course = Some(CourseId(course_id));
                screen.assign().await;
            }
            for row in &screen.assigned {
                let title = row.course_title.as_deref().unwrap_or_default();
                println!("assigned #{} course {} {title}", row.id, row.course);
            }
            for course in screen.available_courses() {
                println!("available #{} {}", course.id, course.title);
            }
            print_notice(&screen.notice);
        }
        Command::Students { message, chat } => {
            let mut screen = StudentListScreen::new(ctx);
            screen.activate(session).await?;
            print_state(&screen.state, |students| {
                for student in students {
                    let courses: Vec<&str> =
                        student.courses.iter().map(|c| c.title.as_str()).collect();
                    println!(
                        "#{} {} <{}> {}",
                        student.id,
                        student.fullname,
                        student.email,
                        courses.join(", ")
                    );
                }
            });
            if let Some(student_id) = message {
                screen.message_student(StudentId(student_id)).await;
            }
            if let Some(student_id) = chat {
                let navigation = screen.open_chat(session, StudentId(student_id));
                println!("-> {}", navigation.route.path());
            }
            print_notice(&screen.notice);
        }
        Command::MessageAll => {
            let mut screen = StudentListScreen::new(ctx);
            screen.activate(session).await?;
            screen.message_all().await;
            print_notice(&screen.notice);
        }
        Command::Chat {
            role,
            with,
            send,
            delete,
        } => {
            let mut screen = ChatScreen::new(ctx, role.into());
            screen.activate(session).await?;
            if let Some(other) = with {
                screen.open_conversation(other).await;
            }
            if let Some(text) = send {
                screen.draft = text;
                screen.send().await;
            }
            if delete {
                screen.delete_conversation().await;
            }
            match &screen.conversation {
                Some(conversation) => {
                    println!("Conversation with {}", conversation.other.name);
                    for message in &conversation.messages {
                        let from = message.message_from.map(Role::as_str).unwrap_or("?");
                        println!("  [{from}] {}", message.message);
                    }
                }
                None => print_state(&screen.users, |users| {
                    for user in users {
                        println!(
                            "#{} {} ({} unread) {}",
                            user.id, user.name, user.unread_count, user.last_message
                        );
                    }
                }),
            }
            print_notice(&screen.notice);
        }
        Command::Profile { role, remove_image } => {
            let mut screen = ProfileScreen::new(ctx, role.into());
            screen.activate(session).await?;
            if remove_image {
                screen.remove_image().await;
            }
            print_state(&screen.state, |profile| {
                println!("{}", profile.display_name());
            });
            let image = screen.image_url();
            if !image.is_empty() {
                println!("image: {image}");
            }
            print_notice(&screen.notice);
        }
        Command::CourseDetail {
            course_id,
            enroll,
            rate,
            review,
            favorite,
            complete,
        } => {
            let mut screen = CourseDetailScreen::new(ctx, CourseId(course_id));
            screen.activate(session).await?;
            let mut outcomes = Vec::new();
            if enroll {
                outcomes.push(screen.enroll().await);
            }
            if let Some(stars) = rate {
                outcomes.push(screen.rate(stars, &review).await);
            }
            if favorite {
                outcomes.push(screen.toggle_favorite().await);
            }
            if let Some(chapter_id) = complete {
                outcomes.push(screen.mark_chapter_complete(ChapterId(chapter_id)).await);
            }

            print_state(&screen.course, |course| {
                let rating = course.rating_or_zero();
                println!(
                    "{} ({} enrolled, {rating:.1}/5 from {} ratings)",
                    course.title, course.total_enrolled, course.total_ratings
                );
            });
            for (index, chapter) in screen.chapters.iter().enumerate() {
                let mark = if screen.is_completed(chapter.id) {
                    "x"
                } else if screen.chapter_accessible(index) {
                    " "
                } else {
                    "-"
                };
                println!("  [{mark}] #{} {}", chapter.id, chapter.title);
            }
            for material in &screen.materials {
                println!("  material: {}", material.title);
            }
            for related in &screen.related {
                println!("  related #{} {}", related.id, related.title);
            }
            if !session.is_student_logged_in() {
                println!("Log in as a student to enroll, rate or save this course.");
            } else if let Some(own) = &screen.user_rating {
                println!("your rating: {}/5", own.rating);
            }
            print_notice(&screen.notice);
            if let Some(outcome) = outcomes.iter().find(|outcome| outcome.navigation().is_some()) {
                follow(outcome).await;
            }
        }
        Command::AvailableQuizzes => {
            let mut screen = AvailableQuizzesScreen::new(ctx);
            screen.activate(session).await?;
            print_state(&screen.state, |quizzes| {
                for quiz in quizzes {
                    let status = if quiz.already_attempted { "done" } else { "open" };
                    println!(
                        "quiz #{} course #{} {} / {} ({} questions) [{status}]",
                        quiz.quiz_id, quiz.course_id, quiz.quiz_title, quiz.course_title, quiz.total_questions
                    );
                }
            });
        }
        Command::AttemptQuiz {
            quiz_id,
            course_id,
            answers,
        } => {
            let mut screen = AttemptQuizScreen::new(ctx, QuizId(quiz_id), CourseId(course_id));
            screen.activate(session).await?;
            print_state(&screen.quiz, |quiz| {
                println!("{} ({} marks)", quiz.title, quiz.total_marks);
            });
            if screen.quiz.error().is_some() {
                println!("-> {}", Route::AvailableQuizzes.path());
                return Ok(());
            }
            if !screen.start().await.is_completed() {
                return Ok(());
            }
            let started = Instant::now();
            println!("time allowed: {}", format_time(screen.time_left));
            for question in &screen.questions {
                println!("  #{} {} [{}]", question.id, question.question_text, question.options().join(" | "));
            }
            for (question_id, answer) in answers {
                if let Err(err) = screen.select_answer(QuestionId(question_id), &answer) {
                    println!("error: question {question_id}: {err}");
                }
            }
            let outcome = match screen.tick(started.elapsed()).await {
                Some(outcome) => outcome,
                None => screen.submit().await,
            };
            if let Some(score) = &screen.score {
                println!(
                    "{} of {} correct, {} / {} marks",
                    score.correct_answers, score.total_questions, score.obtained_marks, score.total_marks
                );
            }
            print_notice(&screen.notice);
            follow(&outcome).await;
        }
        Command::QuizResults { student, show } => {
            let mut screen = QuizResultsScreen::new(ctx, student.map(StudentId));
            screen.activate(session).await?;
            print_state(&screen.state, |attempts| {
                for attempt in attempts {
                    println!(
                        "#{} {} / {}: {}/{} [{}]",
                        attempt.id,
                        attempt.student_name,
                        attempt.quiz_title,
                        attempt.total_score,
                        attempt.total_questions,
                        ScoreBand::for_percentage(attempt.score_percentage()).label()
                    );
                }
            });
            if let Some(summary) = screen.analytics() {
                println!(
                    "{} attempts, average {:.2}%, pass rate {:.2}%",
                    summary.total_attempts, summary.average_score, summary.pass_rate
                );
            }
            if let Some(attempt_id) = show {
                screen.select(AttemptId(attempt_id)).await;
            }
            if let Some(selected) = &screen.selected {
                println!("{} on {}:", selected.student_name, selected.quiz_title);
                match selected.answers() {
                    Ok(answers) => {
                        for answer in answers {
                            let mark = if answer.is_correct { "ok" } else { "wrong" };
                            println!(
                                "  {} -> {} (correct: {}) {mark}",
                                answer.question_text, answer.selected_option, answer.correct_option
                            );
                        }
                    }
                    Err(err) => println!("error: unreadable answers: {err}"),
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
