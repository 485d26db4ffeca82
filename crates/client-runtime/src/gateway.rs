use std::sync::Arc;

use client_api::ChannelApi;
use client_core::{ClientError, ClientErrorCategory, Message, PageAnchor};
use client_store::{Database, StoreError};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Data access seam between controllers and the remote server plus local
/// cache.
///
/// `fetch_page` and `list_channels` talk to the server and persist what they
/// fetch; the `cached_*` methods read the local cache only. The gateway never
/// falls back on its own: choosing between the two sources is controller
/// policy.
pub trait ChatGateway {
    /// Exchange credentials for a bearer token.
    async fn login(&self, name: &str, password: &str) -> Result<String, ClientError>;

    /// Fetch channel titles from the server, caching them on success.
    async fn list_channels(&self) -> Result<Vec<String>, ClientError>;

    /// Channel titles from the local cache only.
    async fn cached_channels(&self) -> Result<Vec<String>, ClientError>;

    /// Highest known message id for the chat, `0` when nothing is known.
    async fn latest_known_id(&self, chat_id: &str) -> i64;

    /// Fetch up to `limit` newest messages strictly below `anchor`,
    /// normalized ascending by id, caching them on success.
    async fn fetch_page(
        &self,
        chat_id: &str,
        anchor: PageAnchor,
        limit: u32,
    ) -> Result<Vec<Message>, ClientError>;

    /// Full message history for the chat from the local cache only,
    /// ascending by id.
    async fn cached_history(&self, chat_id: &str) -> Result<Vec<Message>, ClientError>;

    /// Submit a message and return its server-assigned id.
    async fn send(&self, token: &str, message: &Message) -> Result<i64, ClientError>;
}

/// Production [`ChatGateway`] combining the HTTP API with the sqlite cache.
#[derive(Clone)]
pub struct ChatRepository {
    api: ChannelApi,
    store: Arc<Mutex<Database>>,
}

impl ChatRepository {
    pub fn new(api: ChannelApi, store: Database) -> Self {
        Self {
            api,
            store: Arc::new(Mutex::new(store)),
        }
    }

    /// Cache writes are best effort; a failed write never fails the fetch
    /// that produced the data.
    async fn cache_messages(&self, chat_id: &str, messages: &[Message]) {
        let store = self.store.lock().await;
        if let Err(err) = store.upsert_chat(chat_id) {
            warn!(%chat_id, error = %err, "failed to cache chat title");
            return;
        }
        for message in messages {
            if let Err(err) = store.upsert_message(chat_id, message) {
                warn!(%chat_id, id = message.id, error = %err, "failed to cache message");
            }
        }
    }
}

impl ChatGateway for ChatRepository {
    async fn login(&self, name: &str, password: &str) -> Result<String, ClientError> {
        self.api.login(name, password).await
    }

    async fn list_channels(&self) -> Result<Vec<String>, ClientError> {
        let titles = self.api.channels().await?;

        let store = self.store.lock().await;
        for title in &titles {
            if let Err(err) = store.upsert_chat(title) {
                warn!(%title, error = %err, "failed to cache chat title");
            }
        }

        Ok(titles)
    }

    async fn cached_channels(&self) -> Result<Vec<String>, ClientError> {
        let store = self.store.lock().await;
        store.all_chat_titles().map_err(map_store_error)
    }

    async fn latest_known_id(&self, chat_id: &str) -> i64 {
        // Probe for the single newest message; an unbounded anchor encodes
        // as lastKnownId = 0, so the probe uses the maximum id instead.
        // A failed probe yields 0 rather than the cached maximum: anchoring
        // below messages the cache has not seen would skip them.
        match self.api.channel_page(chat_id, i64::MAX, 1, true).await {
            Ok(page) => page.first().map(|message| message.id).unwrap_or(0),
            Err(err) => {
                debug!(%chat_id, error = %err, "latest-id probe failed");
                0
            }
        }
    }

    async fn fetch_page(
        &self,
        chat_id: &str,
        anchor: PageAnchor,
        limit: u32,
    ) -> Result<Vec<Message>, ClientError> {
        let mut page = self
            .api
            .channel_page(chat_id, anchor.last_known_id(), limit, true)
            .await?;

        // The server returns newest first; controllers expect ascending.
        page.reverse();
        self.cache_messages(chat_id, &page).await;
        Ok(page)
    }

    async fn cached_history(&self, chat_id: &str) -> Result<Vec<Message>, ClientError> {
        let store = self.store.lock().await;
        store.messages_for_chat(chat_id).map_err(map_store_error)
    }

    async fn send(&self, token: &str, message: &Message) -> Result<i64, ClientError> {
        self.api.send_message(token, message).await
    }
}

fn map_store_error(err: StoreError) -> ClientError {
    ClientError::new(ClientErrorCategory::Storage, "cache_error", err.to_string())
}
