use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::StudentId,
    session::{Session, StudentSession, TeacherSession},
};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::warn;

/// Keys the client persists between runs. Values are JSON text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKey {
    TeacherLoginStatus,
    TeacherData,
    StudentInfo,
    SelectedStudentId,
}

impl SessionKey {
    pub const ALL: [SessionKey; 4] = [
        SessionKey::TeacherLoginStatus,
        SessionKey::TeacherData,
        SessionKey::StudentInfo,
        SessionKey::SelectedStudentId,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SessionKey::TeacherLoginStatus => "teacher_login_status",
            SessionKey::TeacherData => "teacher_data",
            SessionKey::StudentInfo => "student_info",
            SessionKey::SelectedStudentId => "selected_student_id",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SessionStore {
    pool: Pool<Sqlite>,
}

impl SessionStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid session database url '{database_url}'"))?
            .create_if_missing(true);
        // every in-memory connection is its own database
        let max_connections = if database_url.contains(":memory:") { 1 } else { 4 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to open session database '{database_url}'"))?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run session store migrations")?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn put_raw(&self, key: SessionKey, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO session_entries (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key.as_str())
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to write session entry '{}'", key.as_str()))?;
        Ok(())
    }

    pub async fn get_raw(&self, key: SessionKey) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM session_entries WHERE key = ?1")
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to read session entry '{}'", key.as_str()))?;
        Ok(row.map(|r| r.get::<String, _>(0)))
    }

    pub async fn remove(&self, key: SessionKey) -> Result<()> {
        sqlx::query("DELETE FROM session_entries WHERE key = ?1")
            .bind(key.as_str())
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to remove session entry '{}'", key.as_str()))?;
        Ok(())
    }

    pub async fn put_json<T: Serialize>(&self, key: SessionKey, value: &T) -> Result<()> {
        let encoded = serde_json::to_string(value)
            .with_context(|| format!("failed to encode session entry '{}'", key.as_str()))?;
        self.put_raw(key, &encoded).await
    }

    /// Reads and decodes an entry. An entry that no longer decodes is treated
    /// as absent: entries carry no schema version.
    pub async fn get_json<T: DeserializeOwned>(&self, key: SessionKey) -> Result<Option<T>> {
        let Some(raw) = self.get_raw(key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                warn!(key = key.as_str(), error = %err, "session: dropping undecodable entry");
                Ok(None)
            }
        }
    }

    pub async fn entries(&self) -> Result<Vec<SessionEntry>> {
        let rows = sqlx::query("SELECT key, value, updated_at FROM session_entries ORDER BY key")
            .fetch_all(&self.pool)
            .await
            .context("failed to list session entries")?;
        rows.into_iter()
            .map(|row| {
                Ok(SessionEntry {
                    key: row.try_get("key")?,
                    value: row.try_get("value")?,
                    updated_at: row.try_get("updated_at")?,
                })
            })
            .collect()
    }

    pub async fn load_session(&self) -> Result<Session> {
        let teacher_logged_in = self
            .get_json::<bool>(SessionKey::TeacherLoginStatus)
            .await?
            .unwrap_or(false);
        let teacher = if teacher_logged_in {
            self.get_json::<TeacherSession>(SessionKey::TeacherData)
                .await?
        } else {
            None
        };
        let student = self
            .get_json::<StudentSession>(SessionKey::StudentInfo)
            .await?;
        let selected_student = self
            .get_json::<StudentId>(SessionKey::SelectedStudentId)
            .await?;

        Ok(Session {
            teacher,
            student,
            selected_student,
        })
    }

    /// Writes the whole session; absent parts remove their entries.
    pub async fn save_session(&self, session: &Session) -> Result<()> {
        match &session.teacher {
            Some(teacher) => {
                self.put_json(SessionKey::TeacherLoginStatus, &true).await?;
                self.put_json(SessionKey::TeacherData, teacher).await?;
            }
            None => {
                self.remove(SessionKey::TeacherLoginStatus).await?;
                self.remove(SessionKey::TeacherData).await?;
            }
        }

        match &session.student {
            Some(student) => self.put_json(SessionKey::StudentInfo, student).await?,
            None => self.remove(SessionKey::StudentInfo).await?,
        }

        match session.selected_student {
            Some(student_id) => {
                self.put_json(SessionKey::SelectedStudentId, &student_id)
                    .await?
            }
            None => self.remove(SessionKey::SelectedStudentId).await?,
        }

        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        for key in SessionKey::ALL {
            self.remove(key).await?;
        }
        Ok(())
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.contains(":memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
