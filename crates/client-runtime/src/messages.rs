use client_core::{
    Chat, ClientError, Message, MessageBody, MessageBuffer, MessagesState, PageAnchor, SendOutcome,
    UNASSIGNED_MESSAGE_ID,
};
use tracing::{debug, warn};

use crate::gateway::ChatGateway;

/// Per-chat controller owning the message buffer and pagination policy.
///
/// All loading goes through one in-flight flag: while a page request is
/// running, further requests for the same chat are ignored rather than
/// queued. Cache fallback applies to transport-like failures only, and only
/// when the requested anchor id is not already buffered; the fallback merges
/// through the buffer, so it never duplicates messages.
#[derive(Debug)]
pub struct MessagesController {
    chat_id: String,
    buffer: MessageBuffer,
    state: MessagesState,
    in_flight: bool,
    page_size: u32,
    pivot: usize,
}

impl MessagesController {
    pub fn new(chat_id: impl Into<String>, page_size: u32, pivot: usize) -> Self {
        Self {
            chat_id: chat_id.into(),
            buffer: MessageBuffer::new(),
            state: MessagesState::Loading,
            in_flight: false,
            page_size: page_size.max(1),
            pivot,
        }
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    /// Latest published history state.
    pub fn state(&self) -> &MessagesState {
        &self.state
    }

    /// Oldest loaded id, `0` when nothing is loaded. This is the exclusive
    /// anchor the next older page would use.
    pub fn oldest_loaded_id(&self) -> i64 {
        self.buffer.oldest_id()
    }

    /// Whether scrolling to `distance_from_edge` items from the oldest end
    /// should trigger an older-page load. Never `true` while a load runs.
    pub fn wants_older_page(&self, distance_from_edge: usize) -> bool {
        !self.in_flight && !self.buffer.is_empty() && distance_from_edge <= self.pivot
    }

    /// Load the newest page, seeding the anchor just past the latest known
    /// id so a reopened chat resumes instead of restarting.
    pub async fn initial_load<G: ChatGateway>(&mut self, gateway: &G) -> MessagesState {
        if self.in_flight {
            return self.state.clone();
        }
        self.in_flight = true;
        self.state = MessagesState::Loading;

        let latest = gateway.latest_known_id(&self.chat_id).await;
        let anchor = if latest > 0 {
            PageAnchor::Exclusive(latest + 1)
        } else {
            PageAnchor::Unbounded
        };

        let state = self.load_page(gateway, anchor).await;
        self.in_flight = false;
        state
    }

    /// Load one page of messages older than the current buffer front.
    ///
    /// Ignored while another load is in flight; delegates to
    /// [`Self::initial_load`] when nothing is loaded yet.
    pub async fn load_older<G: ChatGateway>(&mut self, gateway: &G) -> MessagesState {
        if self.in_flight {
            debug!(chat_id = %self.chat_id, "older-page load already in flight");
            return self.state.clone();
        }
        if self.buffer.is_empty() {
            return self.initial_load(gateway).await;
        }

        self.in_flight = true;
        let anchor = PageAnchor::Exclusive(self.buffer.oldest_id());
        let state = self.load_page(gateway, anchor).await;
        self.in_flight = false;
        state
    }

    /// Compose and send a text or image message.
    ///
    /// Requires a token; without one no network call is made. On success the
    /// server-assigned id replaces the placeholder before the message enters
    /// the buffer. On failure an error state is published and the buffer is
    /// left unchanged.
    pub async fn send<G: ChatGateway>(
        &mut self,
        gateway: &G,
        token: Option<&str>,
        from: &str,
        body: MessageBody,
        time: String,
    ) -> SendOutcome {
        let Some(token) = token else {
            return SendOutcome::Failure {
                error: ClientError::auth_token_missing(),
            };
        };

        let mut message = Message {
            id: UNASSIGNED_MESSAGE_ID,
            from: from.to_owned(),
            to: self.chat_id.clone(),
            body,
            time,
        };

        match gateway.send(token, &message).await {
            Ok(message_id) => {
                message.id = message_id;
                if let Err(err) = self.buffer.append_sent(message) {
                    // The id can be stale when another page load already
                    // merged the confirmed message.
                    warn!(chat_id = %self.chat_id, message_id, error = %err, "sent message not appended");
                }
                self.publish_success();
                SendOutcome::Success { message_id }
            }
            Err(error) => {
                self.state = MessagesState::Error(error.to_string());
                SendOutcome::Failure { error }
            }
        }
    }

    async fn load_page<G: ChatGateway>(
        &mut self,
        gateway: &G,
        anchor: PageAnchor,
    ) -> MessagesState {
        match gateway.fetch_page(&self.chat_id, anchor, self.page_size).await {
            Ok(page) => {
                let merged = self.buffer.merge(page);
                debug!(chat_id = %self.chat_id, merged, "merged fetched page");
                self.publish_success();
            }
            Err(err) if err.allows_cache_fallback() && !self.anchor_is_buffered(anchor) => {
                warn!(chat_id = %self.chat_id, error = %err, "page fetch failed, trying cache");
                self.merge_cached(gateway, err).await;
            }
            Err(err) => {
                self.state = MessagesState::Error(err.to_string());
            }
        }

        self.state.clone()
    }

    /// Whether the requested anchor id is already part of the buffer. A
    /// buffered anchor means the cache was consulted for this range before,
    /// so the fallback must not read it again.
    fn anchor_is_buffered(&self, anchor: PageAnchor) -> bool {
        match anchor {
            PageAnchor::Unbounded => false,
            PageAnchor::Exclusive(id) => self.buffer.contains(id),
        }
    }

    async fn merge_cached<G: ChatGateway>(&mut self, gateway: &G, fetch_err: ClientError) {
        match gateway.cached_history(&self.chat_id).await {
            Ok(cached) => {
                let merged = self.buffer.merge(cached);
                debug!(chat_id = %self.chat_id, merged, "merged cached history");
                if self.buffer.is_empty() {
                    self.state = MessagesState::Error(fetch_err.to_string());
                } else {
                    self.publish_success();
                }
            }
            Err(cache_err) => {
                warn!(chat_id = %self.chat_id, error = %cache_err, "cache fallback failed");
                if self.buffer.is_empty() {
                    self.state = MessagesState::Error(fetch_err.to_string());
                } else {
                    self.publish_success();
                }
            }
        }
    }

    fn publish_success(&mut self) {
        self.state = MessagesState::Success(Chat {
            title: self.chat_id.clone(),
            messages: self.buffer.messages().to_vec(),
        });
    }
}
