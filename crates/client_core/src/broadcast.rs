//! Sequential "message all students" delivery.

use futures::{stream, StreamExt};
use shared::domain::{Role, StudentId, TeacherId};
use tracing::{info, warn};

use crate::{gateway::HttpGateway, messages::post_message};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastSummary {
    pub successes: usize,
    pub failures: usize,
    pub failed: Vec<StudentId>,
}

impl BroadcastSummary {
    pub fn attempted(&self) -> usize {
        self.successes + self.failures
    }

    pub fn report(&self) -> String {
        if self.failures == 0 {
            format!("Message sent to {} students", self.successes)
        } else {
            format!(
                "Message sent to {} students. Failed to send to {} students.",
                self.successes, self.failures
            )
        }
    }
}

/// Sends `message` to each student once, in order, one call at a time.
/// A failed send is counted and the fold moves on; nothing is rolled back.
pub async fn deliver_all(
    gateway: &dyn HttpGateway,
    teacher_id: TeacherId,
    students: &[StudentId],
    message: &str,
) -> BroadcastSummary {
    let summary = stream::iter(students.iter().copied())
        .then(|student_id| async move {
            let result =
                post_message(gateway, teacher_id, student_id, message, Role::Teacher).await;
            (student_id, result)
        })
        .fold(BroadcastSummary::default(), |mut summary, (student_id, result)| async move {
            match result {
                Ok(envelope) if envelope.is_success() => summary.successes += 1,
                Ok(envelope) => {
                    warn!(%student_id, status = ?envelope.status, "broadcast: unexpected status");
                    summary.failures += 1;
                    summary.failed.push(student_id);
                }
                Err(err) => {
                    warn!(%student_id, error = %err, "broadcast: send failed");
                    summary.failures += 1;
                    summary.failed.push(student_id);
                }
            }
            summary
        })
        .await;

    info!(
        %teacher_id,
        successes = summary.successes,
        failures = summary.failures,
        "broadcast finished"
    );
    summary
}

#[cfg(test)]
#[path = "tests/broadcast_tests.rs"]
mod tests;
