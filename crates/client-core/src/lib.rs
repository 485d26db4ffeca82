//! Core client contract shared between the runtime and frontend consumers.
//!
//! This crate defines the command/event protocol, the message/chat model, the
//! ordered message buffer used for pagination merges, the session lifecycle
//! model, and common error/channel abstractions.

/// Ordered in-memory message buffer and merge rules.
pub mod buffer;
/// Async command/event channel primitives.
pub mod channel;
/// Stable client error types and HTTP classification helpers.
pub mod error;
/// Event normalization helpers (for example send acknowledgements).
pub mod normalization;
/// Session lifecycle state machine.
pub mod state_machine;
/// Frontend-facing protocol types (commands, events, payloads).
pub mod types;

pub use buffer::{BufferError, MessageBuffer};
pub use channel::{ClientChannelError, ClientChannels, EventStream};
pub use error::{ClientError, ClientErrorCategory, classify_http_status};
pub use normalization::{SendOutcome, normalize_send_outcome};
pub use state_machine::SessionStateMachine;
pub use types::{
    Chat, ChatListState, ClientCommand, ClientEvent, Message, MessageBody, MessagesState,
    PageAnchor, SendAck, SessionState, UNASSIGNED_MESSAGE_ID,
};
