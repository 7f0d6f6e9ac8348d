//! Public course page: enrollment, rating, favorites and chapter progress.
//!
//! Anyone can open it. The per-student lookups only run when a student is
//! logged in, and only an enrolled student sees ratings and materials.

use shared::{
    domain::{Chapter, ChapterId, Course, CourseId, CourseRating, StudentId, StudyMaterial},
    protocol::{ChapterProgressRequest, RateCourseRequest, StudentCourseRequest},
    session::Session,
};
use tracing::{debug, info, warn};

use crate::{
    error::ClientError,
    gateway::ApiRequest,
    view::{Navigation, Notice, Outcome, Route, ViewState},
};

use super::ScreenContext;

const RELATED_LIMIT: usize = 4;

pub struct CourseDetailScreen {
    ctx: ScreenContext,
    course_id: CourseId,
    student_id: Option<StudentId>,
    is_teacher: bool,
    pub course: ViewState<Course>,
    pub chapters: Vec<Chapter>,
    pub related: Vec<Course>,
    pub materials: Vec<StudyMaterial>,
    pub is_enrolled: bool,
    pub is_favorite: bool,
    pub user_rating: Option<CourseRating>,
    pub completed: Vec<ChapterId>,
    pub notice: Notice,
}

impl CourseDetailScreen {
    pub fn new(ctx: ScreenContext, course_id: CourseId) -> Self {
        Self {
            ctx,
            course_id,
            student_id: None,
            is_teacher: false,
            course: ViewState::Idle,
            chapters: Vec::new(),
            related: Vec::new(),
            materials: Vec::new(),
            is_enrolled: false,
            is_favorite: false,
            user_rating: None,
            completed: Vec::new(),
            notice: Notice::default(),
        }
    }

    pub async fn activate(&mut self, session: &Session) -> Result<(), ClientError> {
        self.student_id = session.student.as_ref().map(|student| student.student_id);
        self.is_teacher = session.is_teacher_logged_in();

        self.course = ViewState::Loading;
        let result: Result<Course, ClientError> = async {
            let course = self
                .ctx
                .fetch::<Course>(format!("/course/{}/", self.course_id))
                .await?;
            if let Some(student_id) = self.student_id {
                self.load_student_state(student_id).await?;
            }
            self.chapters = self
                .ctx
                .fetch_enveloped::<Chapter>(format!("/course-chapters/{}/", self.course_id), "chapters")
                .await?;
            let catalog = self.ctx.fetch::<Vec<Course>>("/course/".into()).await?;
            self.related = related_courses(&course, catalog);
            Ok(course)
        }
        .await;

        self.course = match result {
            Ok(course) => ViewState::Ready(course),
            Err(err) => {
                warn!(course_id = %self.course_id, error = %err, "course detail: load failed");
                ViewState::Failed("Failed to load course data. Please try again later.".into())
            }
        };
        Ok(())
    }

    async fn load_student_state(&mut self, student_id: StudentId) -> Result<(), ClientError> {
        let course_id = self.course_id;
        let enrollment = self
            .ctx
            .gateway
            .send(ApiRequest::get(format!("/check-enrollment/{student_id}/{course_id}/")))
            .await?
            .envelope()?;
        self.is_enrolled = enrollment.field::<bool>("is_enrolled")?.unwrap_or(false);

        let favorite: Result<Option<bool>, ClientError> = async {
            let path = format!("/check-favorite/{student_id}/{course_id}/");
            let envelope = self.ctx.gateway.send(ApiRequest::get(path)).await?.envelope()?;
            Ok(envelope.field::<bool>("is_favorite")?)
        }
        .await;
        self.is_favorite = match favorite {
            Ok(is_favorite) => is_favorite.unwrap_or(false),
            Err(err) => {
                debug!(%student_id, %course_id, error = %err, "favorite status unavailable");
                false
            }
        };

        if self.is_enrolled {
            self.load_rating(student_id).await;
            self.load_materials().await;
        }

        let progress = self
            .ctx
            .gateway
            .send(ApiRequest::get(format!("/get-completed-chapters/{student_id}/{course_id}/")))
            .await?
            .envelope()?;
        if progress.is_success() {
            self.completed = progress
                .field::<Vec<ChapterId>>("completed_chapters")?
                .unwrap_or_default();
        }
        Ok(())
    }

    /// A 404 means the student has not rated the course yet.
    async fn load_rating(&mut self, student_id: StudentId) {
        let path = format!("/check-rating/{student_id}/{}/", self.course_id);
        let result: Result<Option<CourseRating>, ClientError> = async {
            let envelope = self.ctx.gateway.send(ApiRequest::get(path)).await?.envelope()?;
            Ok(envelope.field::<CourseRating>("rating")?)
        }
        .await;
        self.user_rating = match result {
            Ok(rating) => rating,
            Err(err) => {
                debug!(%student_id, course_id = %self.course_id, error = %err, "no previous rating");
                None
            }
        };
    }

    /// A missing list is not an error on this page.
    async fn load_materials(&mut self) {
        self.materials = match self
            .ctx
            .fetch::<Vec<StudyMaterial>>(format!("/study-materials/{}/", self.course_id))
            .await
        {
            Ok(materials) => materials,
            Err(err) => {
                debug!(course_id = %self.course_id, error = %err, "study materials unavailable");
                Vec::new()
            }
        };
    }

    pub fn is_completed(&self, chapter_id: ChapterId) -> bool {
        self.completed.contains(&chapter_id)
    }

    /// Chapters unlock in order: each needs every earlier one completed.
    pub fn chapter_accessible(&self, index: usize) -> bool {
        if self.is_teacher || index == 0 {
            return true;
        }
        if !self.is_enrolled {
            return false;
        }
        self.chapters
            .iter()
            .take(index)
            .all(|chapter| self.is_completed(chapter.id))
    }

    fn login_required(&self) -> Outcome {
        Outcome::navigate(Navigation::now(Route::StudentLogin))
    }

    pub async fn enroll(&mut self) -> Outcome {
        let Some(student_id) = self.student_id else {
            return self.login_required();
        };
        let Some(price) = self.course.ready().map(|course| course.price) else {
            return Outcome::Failed;
        };
        self.notice.clear();
        if price != 0 {
            self.notice
                .set_error("Paid courses can only be purchased from the website.");
            return Outcome::Failed;
        }

        let payload = StudentCourseRequest {
            student_id,
            course_id: self.course_id,
        };
        let result: Result<(), ClientError> = async {
            let request = ApiRequest::post("/course-enroll/").json(&payload)?;
            let envelope = self.ctx.gateway.send(request).await?.envelope()?;
            if !envelope.is_success() {
                return Err(ClientError::Rejected(
                    envelope.message_text().unwrap_or_default().to_string(),
                ));
            }
            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                info!(%student_id, course_id = %self.course_id, "enrolled");
                self.is_enrolled = true;
                if let Some(course) = self.course.ready_mut() {
                    course.total_enrolled += 1;
                }
                self.notice.set_success("Enrolled Successfully!");
                self.load_materials().await;
                Outcome::done()
            }
            Err(err) => {
                warn!(%student_id, course_id = %self.course_id, error = %err, "enrollment failed");
                self.notice.set_error(err.display("Enrollment failed"));
                Outcome::Failed
            }
        }
    }

    pub async fn rate(&mut self, rating: u8, review: &str) -> Outcome {
        let Some(student_id) = self.student_id else {
            return self.login_required();
        };
        if !(1..=5).contains(&rating) {
            self.notice.set_error("Please select a rating between 1 and 5.");
            return Outcome::Failed;
        }
        self.notice.clear();

        let payload = RateCourseRequest {
            student_id,
            course_id: self.course_id,
            rating,
            review: review.to_string(),
        };
        let result: Result<(String, Option<f64>, Option<u32>), ClientError> = async {
            let request = ApiRequest::post("/rate-course/").json(&payload)?;
            let envelope = self.ctx.gateway.send(request).await?.envelope()?;
            if !envelope.is_success() {
                return Err(ClientError::Rejected(
                    envelope.message_text().unwrap_or_default().to_string(),
                ));
            }
            Ok((
                envelope
                    .message_text()
                    .unwrap_or("Rating submitted successfully")
                    .to_string(),
                envelope.field::<f64>("average_rating")?,
                envelope.field::<u32>("total_ratings")?,
            ))
        }
        .await;

        match result {
            Ok((message, average_rating, total_ratings)) => {
                info!(%student_id, course_id = %self.course_id, rating, "course rated");
                if let Some(course) = self.course.ready_mut() {
                    course.average_rating = average_rating.or(course.average_rating);
                    course.total_ratings = total_ratings.unwrap_or(course.total_ratings);
                }
                self.load_rating(student_id).await;
                self.notice.set_success(message);
                Outcome::done()
            }
            Err(err) => {
                warn!(%student_id, course_id = %self.course_id, error = %err, "rating failed");
                self.notice
                    .set_error(err.display("Failed to submit rating. Please try again."));
                Outcome::Failed
            }
        }
    }

    pub async fn toggle_favorite(&mut self) -> Outcome {
        let Some(student_id) = self.student_id else {
            return self.login_required();
        };
        self.notice.clear();

        let payload = StudentCourseRequest {
            student_id,
            course_id: self.course_id,
        };
        let result: Result<bool, ClientError> = async {
            let request = ApiRequest::post("/toggle-favorite/").json(&payload)?;
            let envelope = self.ctx.gateway.send(request).await?.envelope()?;
            if !envelope.is_success() {
                return Err(ClientError::Rejected(
                    envelope.message_text().unwrap_or_default().to_string(),
                ));
            }
            Ok(envelope.field::<bool>("is_favorite")?.unwrap_or(!self.is_favorite))
        }
        .await;

        match result {
            Ok(is_favorite) => {
                self.is_favorite = is_favorite;
                self.notice.set_success(if is_favorite {
                    "Added to favorites!"
                } else {
                    "Removed from favorites!"
                });
                Outcome::done()
            }
            Err(err) => {
                warn!(%student_id, course_id = %self.course_id, error = %err, "favorite toggle failed");
                self.notice.set_error(
                    err.display("Failed to update favorite status. Please try again."),
                );
                Outcome::Failed
            }
        }
    }

    /// Marks locally first; a failed save is only logged.
    pub async fn mark_chapter_complete(&mut self, chapter_id: ChapterId) -> Outcome {
        let Some(student_id) = self.student_id else {
            return self.login_required();
        };
        if self.is_completed(chapter_id) {
            return Outcome::done();
        }
        self.completed.push(chapter_id);
        self.notice.set_success("Chapter Completed!");

        let payload = ChapterProgressRequest {
            student_id,
            chapter_id,
            course_id: self.course_id,
        };
        let result: Result<(), ClientError> = async {
            let request = ApiRequest::post("/mark-chapter-complete/").json(&payload)?;
            self.ctx.gateway.send(request).await?;
            Ok(())
        }
        .await;
        if let Err(err) = result {
            warn!(%student_id, %chapter_id, error = %err, "chapter progress not saved");
        }
        Outcome::done()
    }
}

fn technologies(course: &Course) -> Vec<String> {
    course
        .technologies
        .split(',')
        .map(|tech| tech.trim().to_lowercase())
        .filter(|tech| !tech.is_empty())
        .collect()
}

/// Up to four other courses sharing at least one technology.
fn related_courses(course: &Course, catalog: Vec<Course>) -> Vec<Course> {
    let wanted = technologies(course);
    catalog
        .into_iter()
        .filter(|other| other.id != course.id)
        .filter(|other| technologies(other).iter().any(|tech| wanted.contains(tech)))
        .take(RELATED_LIMIT)
        .collect()
}

#[cfg(test)]
#[path = "../tests/course_detail_tests.rs"]
mod tests;
