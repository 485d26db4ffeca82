use client_core::ChatListState;
use tracing::warn;

use crate::gateway::ChatGateway;

/// Controller for the channel list.
///
/// Refresh prefers the server and falls back to cached titles on
/// transport-like failures, so a previously seen list survives going
/// offline.
#[derive(Debug)]
pub struct ChatListController {
    state: ChatListState,
}

impl Default for ChatListController {
    fn default() -> Self {
        Self {
            state: ChatListState::Loading,
        }
    }
}

impl ChatListController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ChatListState {
        &self.state
    }

    pub async fn refresh<G: ChatGateway>(&mut self, gateway: &G) -> ChatListState {
        match gateway.list_channels().await {
            Ok(titles) => {
                self.state = ChatListState::Success(titles);
            }
            Err(err) if err.allows_cache_fallback() => {
                warn!(error = %err, "channel list fetch failed, trying cache");
                self.state = match gateway.cached_channels().await {
                    Ok(titles) if !titles.is_empty() => ChatListState::Success(titles),
                    Ok(_) => ChatListState::Error(err.to_string()),
                    Err(cache_err) => {
                        warn!(error = %cache_err, "cached channel list unavailable");
                        ChatListState::Error(err.to_string())
                    }
                };
            }
            Err(err) => {
                self.state = ChatListState::Error(err.to_string());
            }
        }

        self.state.clone()
    }
}

#[cfg(test)]
mod tests {
    use client_core::{ClientError, ClientErrorCategory, Message, PageAnchor};

    use super::*;

    struct ListGateway {
        remote: Result<Vec<String>, ClientError>,
        cached: Vec<String>,
    }

    impl ChatGateway for ListGateway {
        async fn login(&self, _: &str, _: &str) -> Result<String, ClientError> {
            unreachable!()
        }

        async fn list_channels(&self) -> Result<Vec<String>, ClientError> {
            self.remote.clone()
        }

        async fn cached_channels(&self) -> Result<Vec<String>, ClientError> {
            Ok(self.cached.clone())
        }

        async fn latest_known_id(&self, _: &str) -> i64 {
            0
        }

        async fn fetch_page(
            &self,
            _: &str,
            _: PageAnchor,
            _: u32,
        ) -> Result<Vec<Message>, ClientError> {
            unreachable!()
        }

        async fn cached_history(&self, _: &str) -> Result<Vec<Message>, ClientError> {
            unreachable!()
        }

        async fn send(&self, _: &str, _: &Message) -> Result<i64, ClientError> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn refresh_prefers_the_server_list() {
        let gateway = ListGateway {
            remote: Ok(vec!["rust@channel".to_owned(), "lobby@channel".to_owned()]),
            cached: vec!["stale@channel".to_owned()],
        };
        let mut controller = ChatListController::new();

        let state = controller.refresh(&gateway).await;
        assert_eq!(
            state,
            ChatListState::Success(vec!["rust@channel".to_owned(), "lobby@channel".to_owned()])
        );
    }

    #[tokio::test]
    async fn refresh_falls_back_to_cached_titles_when_offline() {
        let gateway = ListGateway {
            remote: Err(ClientError::new(
                ClientErrorCategory::Network,
                "transport_error",
                "offline",
            )),
            cached: vec!["rust@channel".to_owned()],
        };
        let mut controller = ChatListController::new();

        let state = controller.refresh(&gateway).await;
        assert_eq!(state, ChatListState::Success(vec!["rust@channel".to_owned()]));
    }

    #[tokio::test]
    async fn refresh_reports_an_error_when_both_sources_fail() {
        let gateway = ListGateway {
            remote: Err(ClientError::new(
                ClientErrorCategory::Network,
                "transport_error",
                "offline",
            )),
            cached: Vec::new(),
        };
        let mut controller = ChatListController::new();

        let state = controller.refresh(&gateway).await;
        assert!(matches!(state, ChatListState::Error(_)));
    }
}
