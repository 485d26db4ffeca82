use serde::{Deserialize, Serialize};

/// Reserved placeholder id for a locally composed message whose server id has
/// not been assigned yet. Such messages never enter a [`MessageBuffer`];
/// the server-assigned id replaces the placeholder first.
///
/// [`MessageBuffer`]: crate::buffer::MessageBuffer
pub const UNASSIGNED_MESSAGE_ID: i64 = 0;

/// Message payload, exactly one variant per message.
///
/// The wire shape is a pair of nullable objects; the adapter layer converts
/// it to this enum and rejects both-set and neither-set payloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum MessageBody {
    /// Plain text message.
    Text {
        /// Message text.
        text: String,
    },
    /// Image message carried as a link; decoding/rendering is out of scope.
    Image {
        /// Image URL.
        link: String,
    },
}

/// A single chat message in the client's canonical representation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Server-assigned id, monotonically increasing within a chat.
    /// [`UNASSIGNED_MESSAGE_ID`] for a locally composed, unconfirmed message.
    pub id: i64,
    /// Sender identifier.
    pub from: String,
    /// Chat/channel identifier.
    pub to: String,
    /// Text or image payload.
    pub body: MessageBody,
    /// Millisecond-precision timestamp encoded as a decimal string.
    /// Client clock for optimistic entries, server-assigned otherwise.
    pub time: String,
}

impl Message {
    /// Whether the server id has not been assigned yet.
    pub fn is_unassigned(&self) -> bool {
        self.id == UNASSIGNED_MESSAGE_ID
    }
}

/// A named chat plus its currently loaded message history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chat {
    /// Unique chat title.
    pub title: String,
    /// Loaded messages, ascending by id.
    pub messages: Vec<Message>,
}

/// Async load lifecycle of the channel list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChatListState {
    /// Initial/transient state while the list is being fetched.
    Loading,
    /// Channel titles in server order.
    Success(Vec<String>),
    /// Human-readable failure reason; all sources exhausted.
    Error(String),
}

/// Async load lifecycle of one chat's message history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum MessagesState {
    /// Initial/transient state while the first page is being fetched.
    Loading,
    /// Chat with its loaded history, ascending by id.
    Success(Chat),
    /// Human-readable failure reason.
    Error(String),
}

/// Exclusive pagination bound for a page request.
///
/// The wire encodes the bound as a `lastKnownId` integer where `0` means
/// "no bound". Keeping the enum distinct from [`UNASSIGNED_MESSAGE_ID`]
/// prevents the two meanings of zero from being conflated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PageAnchor {
    /// No bound; fetch from the edge the request's direction implies.
    Unbounded,
    /// Strict bound: only messages past this id, never the id itself.
    Exclusive(i64),
}

impl PageAnchor {
    /// Wire encoding of the anchor as the `lastKnownId` query value.
    pub fn last_known_id(self) -> i64 {
        match self {
            PageAnchor::Unbounded => 0,
            PageAnchor::Exclusive(id) => id,
        }
    }
}

/// Session lifecycle reported to the frontend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SessionState {
    /// No authentication has happened yet. Reads are available.
    Idle,
    /// A login flow is currently running.
    Authenticating,
    /// A bearer token is held; sending is available.
    Authenticated,
    /// Session ended and the token was discarded.
    LoggedOut,
}

/// Command channel input accepted by the client runtime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ClientCommand {
    /// Login with name and password, obtaining a bearer token.
    Login {
        /// Account name.
        name: String,
        /// Account password.
        password: String,
    },
    /// Emit the latest channel list (remote, cache fallback).
    ListChats,
    /// Open a chat and load its initial page, seeded after the latest
    /// known id so a reopened chat resumes rather than restarts.
    OpenChat {
        /// Target chat title.
        chat_id: String,
    },
    /// Load one page of older messages for an open chat.
    LoadOlder {
        /// Target chat title.
        chat_id: String,
    },
    /// Send a text message to an open chat.
    SendText {
        /// Target chat title.
        chat_id: String,
        /// Message text.
        body: String,
    },
    /// Create a channel by announcing it; refreshes the chat list on success.
    CreateChat {
        /// New channel name without the `@channel` suffix.
        name: String,
    },
    /// Discard the bearer token and end the session.
    Logout,
}

/// Acknowledgement for a send or create-chat command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendAck {
    /// Chat the message was addressed to.
    pub chat_id: String,
    /// Server-assigned message id on success.
    pub message_id: Option<i64>,
    /// Stable client error code on failure.
    pub error_code: Option<String>,
}

/// Event channel output emitted by the client runtime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ClientEvent {
    /// Session lifecycle transition.
    StateChanged {
        /// New session state.
        state: SessionState,
    },
    /// Result of the login flow.
    AuthResult {
        /// `true` when a non-empty token was obtained.
        success: bool,
        /// Stable client error code when `success == false`.
        error_code: Option<String>,
    },
    /// Channel list replacement.
    ChatList(ChatListState),
    /// Message history replacement for one chat.
    ChatMessages {
        /// Target chat title.
        chat_id: String,
        /// Latest history state.
        state: MessagesState,
    },
    /// Send acknowledgement (`SendText`, `CreateChat`).
    SendAck(SendAck),
}
