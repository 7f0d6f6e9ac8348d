use shared::{
    domain::{ChatMessage, Role, StudentId, TeacherId},
    protocol::{Envelope, SendMessageRequest},
};
use tracing::debug;

use crate::{
    error::ClientError,
    gateway::{ApiRequest, HttpGateway},
};

pub const SEND_MESSAGE_PATH: &str = "/send-message/";

/// Posts one chat message. A 2xx envelope with `status: "error"` is a
/// [`ClientError::Rejected`].
pub async fn post_message(
    gateway: &dyn HttpGateway,
    teacher_id: TeacherId,
    student_id: StudentId,
    message: &str,
    from: Role,
) -> Result<Envelope, ClientError> {
    let payload = SendMessageRequest {
        teacher_id,
        student_id,
        message: message.to_string(),
        message_from: from,
    };
    let request = ApiRequest::post(SEND_MESSAGE_PATH).json(&payload)?;
    let envelope = gateway.send(request).await?.envelope()?;
    debug!(%teacher_id, %student_id, from = from.as_str(), status = ?envelope.status, "message posted");

    if envelope.is_error() {
        return Err(ClientError::Rejected(
            envelope.message_text().unwrap_or_default().to_string(),
        ));
    }
    Ok(envelope)
}

/// The created message, when the backend echoes it under `data`.
pub fn sent_message(envelope: &Envelope) -> Option<ChatMessage> {
    envelope.field::<ChatMessage>("data").ok().flatten()
}
