use std::{
    collections::HashMap,
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

use client_api::{ChannelApi, DEFAULT_BASE_URL};
use client_core::{
    ClientChannelError, ClientChannels, ClientCommand, ClientError, ClientErrorCategory,
    ClientEvent, Message, MessageBody, MessagesState, SendOutcome, SessionStateMachine,
    EventStream, UNASSIGNED_MESSAGE_ID, normalize_send_outcome,
};
use client_store::Database;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::{
    chats::ChatListController,
    gateway::{ChatGateway, ChatRepository},
    messages::MessagesController,
};

const DEFAULT_PAGE_SIZE: u32 = 20;
const DEFAULT_PAGINATION_PIVOT: usize = 20;

/// Runtime construction parameters.
#[derive(Debug, Clone)]
pub struct ClientRuntimeConfig {
    pub base_url: String,
    pub db_path: PathBuf,
    pub page_size: u32,
    pub pagination_pivot: usize,
}

impl ClientRuntimeConfig {
    pub fn new(base_url: impl Into<String>, db_path: impl Into<PathBuf>) -> Self {
        Self {
            base_url: base_url.into(),
            db_path: db_path.into(),
            page_size: DEFAULT_PAGE_SIZE,
            pagination_pivot: DEFAULT_PAGINATION_PIVOT,
        }
    }
}

impl Default for ClientRuntimeConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, PathBuf::from("wrenchat.sqlite"))
    }
}

/// Frontend handle to a spawned runtime.
#[derive(Clone, Debug)]
pub struct ClientRuntimeHandle {
    channels: ClientChannels,
}

impl ClientRuntimeHandle {
    pub async fn send(&self, command: ClientCommand) -> Result<(), ClientChannelError> {
        self.channels.send_command(command).await
    }

    pub fn subscribe(&self) -> EventStream {
        self.channels.subscribe()
    }
}

/// Build the HTTP/cache gateway and spawn the runtime command loop.
pub fn spawn_runtime(config: ClientRuntimeConfig) -> Result<ClientRuntimeHandle, ClientError> {
    let api = ChannelApi::new(&config.base_url)?;
    let store = Database::open_at(&config.db_path).map_err(|err| {
        ClientError::new(ClientErrorCategory::Storage, "cache_error", err.to_string())
    })?;

    let gateway = ChatRepository::new(api, store);
    let (channels, command_rx) = ClientChannels::new();
    let runtime = ClientRuntime::new(channels.clone(), command_rx, gateway, &config);

    tokio::spawn(async move {
        runtime.run().await;
    });
    info!(base_url = %config.base_url, "client runtime started");

    Ok(ClientRuntimeHandle { channels })
}

struct ClientRuntime<G> {
    channels: ClientChannels,
    command_rx: mpsc::Receiver<ClientCommand>,
    state_machine: SessionStateMachine,
    gateway: G,
    token: Option<String>,
    user: Option<String>,
    controllers: HashMap<String, MessagesController>,
    chat_list: ChatListController,
    page_size: u32,
    pagination_pivot: usize,
}

impl<G: ChatGateway> ClientRuntime<G> {
    fn new(
        channels: ClientChannels,
        command_rx: mpsc::Receiver<ClientCommand>,
        gateway: G,
        config: &ClientRuntimeConfig,
    ) -> Self {
        Self {
            channels,
            command_rx,
            state_machine: SessionStateMachine::default(),
            gateway,
            token: None,
            user: None,
            controllers: HashMap::new(),
            chat_list: ChatListController::new(),
            page_size: config.page_size,
            pagination_pivot: config.pagination_pivot,
        }
    }

    async fn run(mut self) {
        while let Some(command) = self.command_rx.recv().await {
            if let Err(err) = self.handle_command(command).await {
                error!(code = %err.code, message = %err.message, "command failed");
            }
        }
    }

    async fn handle_command(&mut self, command: ClientCommand) -> Result<(), ClientError> {
        match command {
            ClientCommand::Login { name, password } => {
                self.handle_login(name, password).await;
                Ok(())
            }
            ClientCommand::ListChats => self.handle_list_chats().await,
            ClientCommand::OpenChat { chat_id } => self.handle_open_chat(chat_id).await,
            ClientCommand::LoadOlder { chat_id } => self.handle_load_older(chat_id).await,
            ClientCommand::SendText { chat_id, body } => {
                self.handle_send_text(chat_id, body).await;
                Ok(())
            }
            ClientCommand::CreateChat { name } => {
                self.handle_create_chat(name).await;
                Ok(())
            }
            ClientCommand::Logout => self.handle_logout(),
        }
    }

    async fn handle_login(&mut self, name: String, password: String) {
        let transition = self.validate_transition(ClientCommand::Login {
            name: String::new(),
            password: String::new(),
        });
        let Ok((candidate, transition_events)) = transition else {
            if let Err(err) = transition {
                self.channels.emit(ClientEvent::AuthResult {
                    success: false,
                    error_code: Some(err.code),
                });
            }
            return;
        };
        self.commit_transition(candidate, transition_events);

        match self.gateway.login(&name, &password).await {
            Ok(token) => {
                self.token = Some(token);
                self.user = Some(name);
                self.finish_auth(true, None);
            }
            Err(err) => self.finish_auth(false, Some(err)),
        }
    }

    fn handle_logout(&mut self) -> Result<(), ClientError> {
        let (candidate, transition_events) = self.validate_transition(ClientCommand::Logout)?;

        // Loaded history stays readable; only the credentials are dropped.
        self.token = None;
        self.user = None;

        self.commit_transition(candidate, transition_events);
        Ok(())
    }

    async fn handle_list_chats(&mut self) -> Result<(), ClientError> {
        self.validate_transition(ClientCommand::ListChats)?;
        let state = self.chat_list.refresh(&self.gateway).await;
        self.channels.emit(ClientEvent::ChatList(state));
        Ok(())
    }

    async fn handle_open_chat(&mut self, chat_id: String) -> Result<(), ClientError> {
        self.validate_transition(ClientCommand::OpenChat {
            chat_id: String::new(),
        })?;

        self.channels.emit(ClientEvent::ChatMessages {
            chat_id: chat_id.clone(),
            state: MessagesState::Loading,
        });

        let gateway = &self.gateway;
        let (page_size, pivot) = (self.page_size, self.pagination_pivot);
        let controller = self
            .controllers
            .entry(chat_id.clone())
            .or_insert_with(|| MessagesController::new(chat_id.clone(), page_size, pivot));

        let state = controller.initial_load(gateway).await;
        self.channels.emit(ClientEvent::ChatMessages { chat_id, state });
        Ok(())
    }

    async fn handle_load_older(&mut self, chat_id: String) -> Result<(), ClientError> {
        self.validate_transition(ClientCommand::LoadOlder {
            chat_id: String::new(),
        })?;

        let gateway = &self.gateway;
        let Some(controller) = self.controllers.get_mut(&chat_id) else {
            return Err(ClientError::new(
                ClientErrorCategory::Config,
                "chat_not_open",
                format!("chat is not open: {chat_id}"),
            ));
        };

        let state = controller.load_older(gateway).await;
        self.channels.emit(ClientEvent::ChatMessages { chat_id, state });
        Ok(())
    }

    async fn handle_send_text(&mut self, chat_id: String, body: String) {
        let validation = self.validate_transition(ClientCommand::SendText {
            chat_id: String::new(),
            body: String::new(),
        });
        if let Err(err) = validation {
            self.channels.emit(normalize_send_outcome(
                chat_id,
                SendOutcome::Failure { error: err },
            ));
            return;
        }

        let from = self.user.clone().unwrap_or_default();
        let token = self.token.clone();
        let gateway = &self.gateway;
        let (page_size, pivot) = (self.page_size, self.pagination_pivot);
        let controller = self
            .controllers
            .entry(chat_id.clone())
            .or_insert_with(|| MessagesController::new(chat_id.clone(), page_size, pivot));

        let outcome = controller
            .send(
                gateway,
                token.as_deref(),
                &from,
                MessageBody::Text { text: body },
                now_millis(),
            )
            .await;

        self.channels.emit(ClientEvent::ChatMessages {
            chat_id: chat_id.clone(),
            state: controller.state().clone(),
        });
        self.channels.emit(normalize_send_outcome(chat_id, outcome));
    }

    /// A channel comes into existence by being posted to, so creation is an
    /// announcement message addressed to the new channel.
    async fn handle_create_chat(&mut self, name: String) {
        let chat_id = format!("{name}@channel");

        let validation = self.validate_transition(ClientCommand::CreateChat {
            name: String::new(),
        });
        if let Err(err) = validation {
            self.channels.emit(normalize_send_outcome(
                chat_id,
                SendOutcome::Failure { error: err },
            ));
            return;
        }

        let Some(token) = self.token.clone() else {
            self.channels.emit(normalize_send_outcome(
                chat_id,
                SendOutcome::Failure {
                    error: ClientError::auth_token_missing(),
                },
            ));
            return;
        };

        let announcement = Message {
            id: UNASSIGNED_MESSAGE_ID,
            from: self.user.clone().unwrap_or_default(),
            to: chat_id.clone(),
            body: MessageBody::Text {
                text: format!("channel {name} created"),
            },
            time: now_millis(),
        };

        match self.gateway.send(&token, &announcement).await {
            Ok(message_id) => {
                self.channels.emit(normalize_send_outcome(
                    chat_id,
                    SendOutcome::Success { message_id },
                ));
                let state = self.chat_list.refresh(&self.gateway).await;
                self.channels.emit(ClientEvent::ChatList(state));
            }
            Err(error) => {
                self.channels
                    .emit(normalize_send_outcome(chat_id, SendOutcome::Failure { error }));
            }
        }
    }

    fn validate_transition(
        &self,
        command: ClientCommand,
    ) -> Result<(SessionStateMachine, Vec<ClientEvent>), ClientError> {
        let mut candidate = self.state_machine.clone();
        let events = candidate.apply(&command)?;
        Ok((candidate, events))
    }

    fn commit_transition(&mut self, candidate: SessionStateMachine, events: Vec<ClientEvent>) {
        self.state_machine = candidate;
        for event in events {
            self.channels.emit(event);
        }
    }

    fn finish_auth(&mut self, success: bool, error: Option<ClientError>) {
        if let Ok(state_event) = self.state_machine.on_auth_result(success) {
            self.channels.emit(state_event);
        }

        self.channels.emit(ClientEvent::AuthResult {
            success,
            error_code: error.map(|err| err.code),
        });
    }
}

fn now_millis() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis().to_string())
        .unwrap_or_else(|_| "0".to_owned())
}

#[cfg(test)]
mod tests {
    use client_core::{ChatListState, PageAnchor, SessionState};

    use super::*;

    /// Gateway double for runtime tests: static channel list and history,
    /// login accepted only for one known credential pair.
    struct FixtureGateway {
        messages: Vec<Message>,
    }

    impl FixtureGateway {
        fn new() -> Self {
            let messages = (1..=5)
                .map(|id| Message {
                    id,
                    from: "bob".to_owned(),
                    to: "rust@channel".to_owned(),
                    body: MessageBody::Text {
                        text: format!("msg-{id}"),
                    },
                    time: format!("{}", 1_724_995_200_000_i64 + id),
                })
                .collect();
            Self { messages }
        }
    }

    impl ChatGateway for FixtureGateway {
        async fn login(&self, name: &str, password: &str) -> Result<String, ClientError> {
            if name == "alice" && password == "secret" {
                Ok("token-1".to_owned())
            } else {
                Err(ClientError::new(
                    ClientErrorCategory::Auth,
                    "invalid_credentials",
                    "login rejected",
                ))
            }
        }

        async fn list_channels(&self) -> Result<Vec<String>, ClientError> {
            Ok(vec!["rust@channel".to_owned()])
        }

        async fn cached_channels(&self) -> Result<Vec<String>, ClientError> {
            Ok(Vec::new())
        }

        async fn latest_known_id(&self, _chat_id: &str) -> i64 {
            self.messages.last().map(|m| m.id).unwrap_or(0)
        }

        async fn fetch_page(
            &self,
            _chat_id: &str,
            anchor: PageAnchor,
            limit: u32,
        ) -> Result<Vec<Message>, ClientError> {
            let bound = match anchor {
                PageAnchor::Unbounded => i64::MAX,
                PageAnchor::Exclusive(id) => id,
            };
            let mut page: Vec<Message> = self
                .messages
                .iter()
                .filter(|m| m.id < bound)
                .cloned()
                .collect();
            let keep = page.len().saturating_sub(limit as usize);
            page.drain(..keep);
            Ok(page)
        }

        async fn cached_history(&self, _chat_id: &str) -> Result<Vec<Message>, ClientError> {
            Ok(Vec::new())
        }

        async fn send(&self, token: &str, _message: &Message) -> Result<i64, ClientError> {
            if token == "token-1" {
                Ok(6)
            } else {
                Err(ClientError::new(
                    ClientErrorCategory::Auth,
                    "invalid_token",
                    "token rejected",
                ))
            }
        }
    }

    fn test_runtime() -> (ClientRuntime<FixtureGateway>, ClientChannels) {
        let (channels, command_rx) = ClientChannels::new();
        let runtime = ClientRuntime::new(
            channels.clone(),
            command_rx,
            FixtureGateway::new(),
            &ClientRuntimeConfig::new("http://localhost:8008/", "unused.sqlite"),
        );
        (runtime, channels)
    }

    #[tokio::test]
    async fn login_send_and_logout_round_trip() {
        let (mut runtime, channels) = test_runtime();
        let mut events = channels.subscribe();

        runtime
            .handle_command(ClientCommand::Login {
                name: "alice".to_owned(),
                password: "secret".to_owned(),
            })
            .await
            .expect("login command should run");

        assert_eq!(
            events.recv().await.expect("state event"),
            ClientEvent::StateChanged {
                state: SessionState::Authenticating
            }
        );
        assert_eq!(
            events.recv().await.expect("state event"),
            ClientEvent::StateChanged {
                state: SessionState::Authenticated
            }
        );
        assert_eq!(
            events.recv().await.expect("auth event"),
            ClientEvent::AuthResult {
                success: true,
                error_code: None
            }
        );

        runtime
            .handle_command(ClientCommand::SendText {
                chat_id: "rust@channel".to_owned(),
                body: "hello".to_owned(),
            })
            .await
            .expect("send command should run");

        // Updated history first, then the acknowledgement.
        match events.recv().await.expect("history event") {
            ClientEvent::ChatMessages { chat_id, state } => {
                assert_eq!(chat_id, "rust@channel");
                match state {
                    MessagesState::Success(chat) => {
                        assert_eq!(chat.messages.last().map(|m| m.id), Some(6));
                    }
                    other => panic!("unexpected state: {other:?}"),
                }
            }
            other => panic!("unexpected event: {other:?}"),
        }
        match events.recv().await.expect("ack event") {
            ClientEvent::SendAck(ack) => {
                assert_eq!(ack.message_id, Some(6));
                assert_eq!(ack.error_code, None);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        runtime
            .handle_command(ClientCommand::Logout)
            .await
            .expect("logout should run");
        assert_eq!(
            events.recv().await.expect("state event"),
            ClientEvent::StateChanged {
                state: SessionState::LoggedOut
            }
        );
    }

    #[tokio::test]
    async fn failed_login_reports_the_error_code_and_returns_to_idle() {
        let (mut runtime, channels) = test_runtime();
        let mut events = channels.subscribe();

        runtime
            .handle_command(ClientCommand::Login {
                name: "alice".to_owned(),
                password: "wrong".to_owned(),
            })
            .await
            .expect("login command should run");

        assert_eq!(
            events.recv().await.expect("state event"),
            ClientEvent::StateChanged {
                state: SessionState::Authenticating
            }
        );
        assert_eq!(
            events.recv().await.expect("state event"),
            ClientEvent::StateChanged {
                state: SessionState::Idle
            }
        );
        assert_eq!(
            events.recv().await.expect("auth event"),
            ClientEvent::AuthResult {
                success: false,
                error_code: Some("invalid_credentials".to_owned())
            }
        );
    }

    #[tokio::test]
    async fn open_chat_loads_history_without_authentication() {
        let (mut runtime, channels) = test_runtime();
        let mut events = channels.subscribe();

        runtime
            .handle_command(ClientCommand::OpenChat {
                chat_id: "rust@channel".to_owned(),
            })
            .await
            .expect("open should run");

        assert_eq!(
            events.recv().await.expect("loading event"),
            ClientEvent::ChatMessages {
                chat_id: "rust@channel".to_owned(),
                state: MessagesState::Loading
            }
        );
        match events.recv().await.expect("history event") {
            ClientEvent::ChatMessages { state, .. } => match state {
                MessagesState::Success(chat) => {
                    let ids: Vec<i64> = chat.messages.iter().map(|m| m.id).collect();
                    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
                }
                other => panic!("unexpected state: {other:?}"),
            },
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn send_without_login_yields_a_failed_ack() {
        let (mut runtime, channels) = test_runtime();
        let mut events = channels.subscribe();

        runtime
            .handle_command(ClientCommand::SendText {
                chat_id: "rust@channel".to_owned(),
                body: "hello".to_owned(),
            })
            .await
            .expect("send command should run");

        match events.recv().await.expect("ack event") {
            ClientEvent::SendAck(ack) => {
                assert_eq!(ack.message_id, None);
                assert_eq!(ack.error_code.as_deref(), Some("invalid_state_transition"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_chat_acknowledges_and_refreshes_the_list() {
        let (mut runtime, channels) = test_runtime();
        let mut events = channels.subscribe();

        runtime
            .handle_command(ClientCommand::Login {
                name: "alice".to_owned(),
                password: "secret".to_owned(),
            })
            .await
            .expect("login should run");
        for _ in 0..3 {
            events.recv().await.expect("login events");
        }

        runtime
            .handle_command(ClientCommand::CreateChat {
                name: "lobby".to_owned(),
            })
            .await
            .expect("create should run");

        match events.recv().await.expect("ack event") {
            ClientEvent::SendAck(ack) => {
                assert_eq!(ack.chat_id, "lobby@channel");
                assert_eq!(ack.message_id, Some(6));
            }
            other => panic!("unexpected event: {other:?}"),
        }
        match events.recv().await.expect("list event") {
            ClientEvent::ChatList(ChatListState::Success(titles)) => {
                assert_eq!(titles, vec!["rust@channel".to_owned()]);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
