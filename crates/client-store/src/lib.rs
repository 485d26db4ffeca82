//! # client-store
//!
//! Persistent local cache for chats and messages, backed by SQLite.
//!
//! The crate exposes a synchronous [`Database`] handle wrapping a
//! `rusqlite::Connection` with typed helpers for the two cache tables:
//! known chat titles and cached messages keyed by `(chat_name, id)`.
//! Every successfully fetched or sent message is upserted here so the
//! client can serve history while offline.

pub mod chats;
pub mod database;
pub mod messages;
pub mod migrations;
pub mod models;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::CachedMessage;
