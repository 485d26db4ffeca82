//! Headless scripted session against a messenger server.
//!
//! Lists channels, opens one chat, pages back once, and (when credentials
//! are configured) logs in and sends a message. Useful as a smoke check of
//! the runtime without a frontend.

mod config;
mod logging;

use std::time::Duration;

use client_core::{ChatListState, ClientCommand, ClientEvent, MessagesState};
use client_runtime::{ClientRuntimeHandle, spawn_runtime};
use tokio::time::timeout;
use tracing::info;

use crate::config::CliConfig;

const EVENT_WAIT: Duration = Duration::from_secs(15);

#[tokio::main]
async fn main() {
    logging::init();

    let config = match CliConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Invalid configuration: {err}");
            std::process::exit(1);
        }
    };

    let handle = match spawn_runtime(config.runtime_config()) {
        Ok(handle) => handle,
        Err(err) => {
            eprintln!("Failed to start runtime: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = run_session(&handle, &config).await {
        eprintln!("Session failed: {err}");
        std::process::exit(1);
    }
}

async fn run_session(handle: &ClientRuntimeHandle, config: &CliConfig) -> Result<(), String> {
    let mut events = handle.subscribe();

    send(handle, ClientCommand::ListChats).await?;
    match next_event(&mut events).await? {
        ClientEvent::ChatList(ChatListState::Success(titles)) => {
            println!("Channels ({}):", titles.len());
            for title in titles {
                println!("  {title}");
            }
        }
        ClientEvent::ChatList(ChatListState::Error(reason)) => {
            println!("Channel list unavailable: {reason}");
        }
        other => info!(?other, "skipping event"),
    }

    send(
        handle,
        ClientCommand::OpenChat {
            chat_id: config.chat.clone(),
        },
    )
    .await?;
    wait_for_history(&mut events, &config.chat).await?;

    send(
        handle,
        ClientCommand::LoadOlder {
            chat_id: config.chat.clone(),
        },
    )
    .await?;
    wait_for_history(&mut events, &config.chat).await?;

    if !config.has_credentials() {
        println!("Set WRENCHAT_USER and WRENCHAT_PASSWORD to run the send leg.");
        return Ok(());
    }
    let (Some(user), Some(password)) = (config.user.clone(), config.password.clone()) else {
        return Ok(());
    };

    send(
        handle,
        ClientCommand::Login {
            name: user,
            password,
        },
    )
    .await?;
    loop {
        match next_event(&mut events).await? {
            ClientEvent::AuthResult { success: true, .. } => {
                println!("Logged in.");
                break;
            }
            ClientEvent::AuthResult {
                success: false,
                error_code,
            } => {
                return Err(format!(
                    "login failed: {}",
                    error_code.unwrap_or_else(|| "unknown".to_owned())
                ));
            }
            other => info!(?other, "skipping event"),
        }
    }

    if let Some(text) = config.send_text.clone() {
        send(
            handle,
            ClientCommand::SendText {
                chat_id: config.chat.clone(),
                body: text,
            },
        )
        .await?;
        loop {
            match next_event(&mut events).await? {
                ClientEvent::SendAck(ack) => {
                    match ack.message_id {
                        Some(id) => println!("Sent message {id} to {}.", ack.chat_id),
                        None => {
                            return Err(format!(
                                "send failed: {}",
                                ack.error_code.unwrap_or_else(|| "unknown".to_owned())
                            ));
                        }
                    }
                    break;
                }
                other => info!(?other, "skipping event"),
            }
        }
    }

    send(handle, ClientCommand::Logout).await?;
    Ok(())
}

async fn send(handle: &ClientRuntimeHandle, command: ClientCommand) -> Result<(), String> {
    handle
        .send(command)
        .await
        .map_err(|err| format!("runtime is gone: {err}"))
}

async fn next_event(
    events: &mut client_core::EventStream,
) -> Result<ClientEvent, String> {
    match timeout(EVENT_WAIT, events.recv()).await {
        Ok(Ok(event)) => Ok(event),
        Ok(Err(err)) => Err(format!("event stream closed: {err}")),
        Err(_) => Err("timed out waiting for runtime events".to_owned()),
    }
}

async fn wait_for_history(
    events: &mut client_core::EventStream,
    chat: &str,
) -> Result<(), String> {
    loop {
        match next_event(events).await? {
            ClientEvent::ChatMessages { chat_id, state } if chat_id == chat => match state {
                MessagesState::Loading => {}
                MessagesState::Success(chat) => {
                    println!("{}: {} messages loaded", chat.title, chat.messages.len());
                    for message in chat.messages.iter().rev().take(5).rev() {
                        println!("  [{}] {}: {:?}", message.id, message.from, message.body);
                    }
                    return Ok(());
                }
                MessagesState::Error(reason) => {
                    println!("{chat}: history unavailable: {reason}");
                    return Ok(());
                }
            },
            other => info!(?other, "skipping event"),
        }
    }
}
