//! Client runtime: command loop, controllers, and the remote/cache gateway.
//!
//! The runtime owns one consumer task over the command channel and serializes
//! every mutation of controller state through it. Frontends talk to the
//! runtime exclusively through [`ClientCommand`]s and [`ClientEvent`]s.
//!
//! [`ClientCommand`]: client_core::ClientCommand
//! [`ClientEvent`]: client_core::ClientEvent

/// Chat list controller with cache fallback.
pub mod chats;
/// Combined remote/cache data access behind the [`ChatGateway`] trait.
pub mod gateway;
/// Per-chat message controller (paging, send, cache fallback).
pub mod messages;
/// Command loop and runtime spawning.
pub mod runtime;

pub use chats::ChatListController;
pub use gateway::{ChatGateway, ChatRepository};
pub use messages::MessagesController;
pub use runtime::{ClientRuntimeConfig, ClientRuntimeHandle, spawn_runtime};
