use crate::{
    error::ClientError,
    types::{ClientEvent, SendAck},
};

/// Internal helper describing send command success/failure before
/// normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Send succeeded and produced a server-assigned message id.
    Success { message_id: i64 },
    /// Send failed with client error details.
    Failure { error: ClientError },
}

/// Convert a send command outcome to a stable `ClientEvent::SendAck`.
pub fn normalize_send_outcome(chat_id: impl Into<String>, outcome: SendOutcome) -> ClientEvent {
    let chat_id = chat_id.into();
    match outcome {
        SendOutcome::Success { message_id } => ClientEvent::SendAck(SendAck {
            chat_id,
            message_id: Some(message_id),
            error_code: None,
        }),
        SendOutcome::Failure { error } => ClientEvent::SendAck(SendAck {
            chat_id,
            message_id: None,
            error_code: Some(error.code),
        }),
    }
}
