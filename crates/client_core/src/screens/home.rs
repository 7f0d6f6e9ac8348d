use std::{cmp::Ordering, collections::HashMap};

use shared::{
    domain::{Course, TeacherId, TeacherProfile, Testimonial},
    session::Session,
};
use tracing::warn;

use crate::{
    error::ClientError,
    view::ViewState,
};

use super::ScreenContext;

const SHOWCASE_LEN: usize = 4;
const STUDENTS_PER_COURSE: usize = 15;
const LESSONS_PER_COURSE: usize = 8;
const MAX_ESTIMATED_STUDENTS: usize = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub struct FeaturedTeacher {
    pub teacher: TeacherProfile,
    pub course_count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SiteStats {
    pub total_courses: usize,
    pub total_teachers: usize,
    pub estimated_students: usize,
    pub estimated_lessons: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HomeData {
    pub latest: Vec<Course>,
    pub popular: Vec<Course>,
    pub featured_teachers: Vec<FeaturedTeacher>,
    pub testimonials: Vec<Testimonial>,
    /// Only filled when a teacher is signed in.
    pub my_courses: Vec<Course>,
    pub stats: SiteStats,
}

pub struct HomeScreen {
    ctx: ScreenContext,
    pub state: ViewState<HomeData>,
}

impl HomeScreen {
    pub fn new(ctx: ScreenContext) -> Self {
        Self {
            ctx,
            state: ViewState::Idle,
        }
    }

    pub async fn activate(&mut self, session: &Session) {
        self.state = ViewState::Loading;
        self.state = match self.load(session).await {
            Ok(data) => ViewState::Ready(data),
            Err(err) => {
                warn!(error = %err, "home: failed to load");
                ViewState::Failed(err.display("Failed to load the home page"))
            }
        };
    }

    async fn load(&self, session: &Session) -> Result<HomeData, ClientError> {
        let my_courses = match &session.teacher {
            Some(teacher) => {
                self.ctx
                    .fetch(format!("/teacher-courses/{}/", teacher.teacher_id))
                    .await?
            }
            None => Vec::new(),
        };

        let courses: Vec<Course> = self.ctx.fetch("/course/".into()).await?;
        let teachers: Vec<TeacherProfile> = self.ctx.fetch("/teacher/".into()).await?;
        let testimonials = self
            .ctx
            .fetch_enveloped::<Testimonial>("/get-top-course-ratings/".into(), "data")
            .await
            .unwrap_or_else(|err| {
                warn!(error = %err, "home: testimonials unavailable");
                Vec::new()
            });

        let stats = site_stats(courses.len(), teachers.len());
        Ok(HomeData {
            latest: courses.iter().take(SHOWCASE_LEN).cloned().collect(),
            popular: top_rated(&courses, SHOWCASE_LEN),
            featured_teachers: featured_teachers(&courses, teachers, SHOWCASE_LEN),
            testimonials,
            my_courses,
            stats,
        })
    }
}

/// Highest `average_rating` first; unrated courses count as zero. Ties keep
/// the backend's order.
pub fn top_rated(courses: &[Course], limit: usize) -> Vec<Course> {
    let mut sorted = courses.to_vec();
    sorted.sort_by(|a, b| {
        b.rating_or_zero()
            .partial_cmp(&a.rating_or_zero())
            .unwrap_or(Ordering::Equal)
    });
    sorted.truncate(limit);
    sorted
}

/// Teachers with at least one course, most courses first.
pub fn featured_teachers(
    courses: &[Course],
    teachers: Vec<TeacherProfile>,
    limit: usize,
) -> Vec<FeaturedTeacher> {
    let mut counts: HashMap<TeacherId, usize> = HashMap::new();
    for teacher_id in courses.iter().filter_map(Course::teacher_id) {
        *counts.entry(teacher_id).or_default() += 1;
    }

    let mut featured: Vec<FeaturedTeacher> = teachers
        .into_iter()
        .filter_map(|teacher| {
            let course_count = counts.get(&teacher.id).copied().unwrap_or(0);
            (course_count > 0).then_some(FeaturedTeacher {
                teacher,
                course_count,
            })
        })
        .collect();
    featured.sort_by(|a, b| b.course_count.cmp(&a.course_count));
    featured.truncate(limit);
    featured
}

pub fn site_stats(total_courses: usize, total_teachers: usize) -> SiteStats {
    SiteStats {
        total_courses,
        total_teachers,
        estimated_students: (total_courses * STUDENTS_PER_COURSE).min(MAX_ESTIMATED_STUDENTS),
        estimated_lessons: total_courses * LESSONS_PER_COURSE,
    }
}

#[cfg(test)]
#[path = "../tests/home_tests.rs"]
mod tests;
