//! HTTP adapter for the remote channel API.
//!
//! Four endpoints: paginated channel history, channel list, login, and
//! message submission. The wire message payload is a pair of nullable
//! objects; this crate converts it to the core [`MessageBody`] enum and
//! rejects shapes that break the exactly-one-set convention.
//!
//! The client object is constructed explicitly and passed to the repository;
//! there is no process-wide singleton.

use client_core::{ClientError, ClientErrorCategory, Message, MessageBody, classify_http_status};
use reqwest::{Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default base URL of the public messenger server.
pub const DEFAULT_BASE_URL: &str = "https://faerytea.name:8008/";

const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Wire shape of one message as the server encodes it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WireMessage {
    pub id: i64,
    pub from: String,
    pub to: String,
    pub data: WireData,
    pub time: String,
}

/// Wire payload: nominally allows both or neither variant; conversion to the
/// core model enforces exactly one.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WireData {
    #[serde(rename = "Image", default, skip_serializing_if = "Option::is_none")]
    pub image: Option<WireImage>,
    #[serde(rename = "Text", default, skip_serializing_if = "Option::is_none")]
    pub text: Option<WireText>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WireImage {
    #[serde(default)]
    pub link: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WireText {
    #[serde(default)]
    pub text: String,
}

impl TryFrom<WireMessage> for Message {
    type Error = ClientError;

    fn try_from(wire: WireMessage) -> Result<Self, Self::Error> {
        let body = match (wire.data.text, wire.data.image) {
            (Some(text), None) => MessageBody::Text { text: text.text },
            (None, Some(image)) => MessageBody::Image { link: image.link },
            (Some(_), Some(_)) => {
                return Err(payload_convention_error(wire.id, "both Text and Image set"));
            }
            (None, None) => {
                return Err(payload_convention_error(wire.id, "neither Text nor Image set"));
            }
        };

        Ok(Message {
            id: wire.id,
            from: wire.from,
            to: wire.to,
            body,
            time: wire.time,
        })
    }
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        let data = match &message.body {
            MessageBody::Text { text } => WireData {
                text: Some(WireText { text: text.clone() }),
                image: None,
            },
            MessageBody::Image { link } => WireData {
                image: Some(WireImage { link: link.clone() }),
                text: None,
            },
        };

        Self {
            id: message.id,
            from: message.from.clone(),
            to: message.to.clone(),
            data,
            time: message.time.clone(),
        }
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    name: &'a str,
    password: &'a str,
}

/// HTTP client for the remote channel API.
#[derive(Debug, Clone)]
pub struct ChannelApi {
    http: reqwest::Client,
    base_url: Url,
}

impl ChannelApi {
    /// Build an API client against the given base URL.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Build an API client reusing an existing `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: &str) -> Result<Self, ClientError> {
        // Url::join drops the last path segment without a trailing slash.
        let normalized = if base_url.ends_with('/') {
            base_url.to_owned()
        } else {
            format!("{base_url}/")
        };

        let base_url = Url::parse(&normalized).map_err(|err| {
            ClientError::new(
                ClientErrorCategory::Config,
                "invalid_base_url",
                format!("invalid base url '{base_url}': {err}"),
            )
        })?;

        Ok(Self { http, base_url })
    }

    /// Base URL this client talks to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `POST /login`: exchange credentials for a bearer token.
    ///
    /// The server signals invalid credentials either with 401 or with an
    /// empty token body.
    pub async fn login(&self, name: &str, password: &str) -> Result<String, ClientError> {
        let url = self.endpoint("login")?;
        let response = self
            .http
            .post(url)
            .json(&LoginRequest { name, password })
            .send()
            .await
            .map_err(map_transport_error)?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(invalid_credentials_error());
        }
        let response = check_status(response)?;

        let token = response
            .text()
            .await
            .map_err(map_transport_error)?
            .trim()
            .trim_matches('"')
            .to_owned();

        if token.is_empty() {
            return Err(invalid_credentials_error());
        }
        Ok(token)
    }

    /// `GET /channels`: list channel names.
    pub async fn channels(&self) -> Result<Vec<String>, ClientError> {
        let url = self.endpoint("channels")?;
        let response = check_status(
            self.http
                .get(url)
                .send()
                .await
                .map_err(map_transport_error)?,
        )?;

        response.json().await.map_err(map_transport_error)
    }

    /// `GET /channel/{name}`: one page of messages, in server order
    /// (`reverse = true` yields newest first). `last_known_id` is always an
    /// exclusive bound; `0` means no bound.
    pub async fn channel_page(
        &self,
        channel: &str,
        last_known_id: i64,
        limit: u32,
        reverse: bool,
    ) -> Result<Vec<Message>, ClientError> {
        let mut url = self.endpoint(&format!("channel/{channel}"))?;
        url.query_pairs_mut()
            .append_pair("lastKnownId", &last_known_id.to_string())
            .append_pair("limit", &limit.to_string())
            .append_pair("reverse", if reverse { "true" } else { "false" });

        debug!(%channel, last_known_id, limit, reverse, "fetching channel page");

        let response = check_status(
            self.http
                .get(url)
                .send()
                .await
                .map_err(map_transport_error)?,
        )?;

        let wire: Vec<WireMessage> = response.json().await.map_err(map_transport_error)?;
        wire.into_iter().map(Message::try_from).collect()
    }

    /// `POST /messages`: submit a message and return the server-assigned id.
    ///
    /// Success is decided by transport status alone; no retry is attempted.
    pub async fn send_message(&self, token: &str, message: &Message) -> Result<i64, ClientError> {
        let url = self.endpoint("messages")?;
        let response = check_status(
            self.http
                .post(url)
                .header(AUTH_TOKEN_HEADER, token)
                .json(&WireMessage::from(message))
                .send()
                .await
                .map_err(map_transport_error)?,
        )?;

        let body = response.text().await.map_err(map_transport_error)?;
        body.trim().parse::<i64>().map_err(|err| {
            ClientError::new(
                ClientErrorCategory::Serialization,
                "invalid_send_response",
                format!("server returned a non-integer message id '{}': {err}", body.trim()),
            )
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url.join(path).map_err(|err| {
            ClientError::new(
                ClientErrorCategory::Config,
                "invalid_endpoint",
                format!("cannot build endpoint '{path}': {err}"),
            )
        })
    }
}

fn invalid_credentials_error() -> ClientError {
    ClientError::new(
        ClientErrorCategory::Auth,
        "invalid_credentials",
        "login rejected: invalid name or password",
    )
}

fn payload_convention_error(id: i64, reason: &str) -> ClientError {
    ClientError::new(
        ClientErrorCategory::Serialization,
        "invalid_message_payload",
        format!("wire message {id} breaks the payload convention: {reason}"),
    )
}

fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    Err(ClientError::new(
        classify_http_status(status.as_u16()),
        "http_status",
        format!("server responded with status {status}"),
    ))
}

fn map_transport_error(err: reqwest::Error) -> ClientError {
    if err.is_decode() {
        ClientError::new(
            ClientErrorCategory::Serialization,
            "decode_error",
            err.to_string(),
        )
    } else {
        ClientError::new(
            ClientErrorCategory::Network,
            "transport_error",
            err.to_string(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(text: Option<&str>, image: Option<&str>) -> WireMessage {
        WireMessage {
            id: 5,
            from: "alice".to_owned(),
            to: "rust@channel".to_owned(),
            data: WireData {
                text: text.map(|t| WireText { text: t.to_owned() }),
                image: image.map(|l| WireImage { link: l.to_owned() }),
            },
            time: "1724995200000".to_owned(),
        }
    }

    #[test]
    fn converts_text_and_image_wire_messages() {
        let text = Message::try_from(wire(Some("hello"), None)).expect("text converts");
        assert_eq!(
            text.body,
            MessageBody::Text {
                text: "hello".to_owned()
            }
        );

        let image =
            Message::try_from(wire(None, Some("https://example.org/cat.png"))).expect("image converts");
        assert_eq!(
            image.body,
            MessageBody::Image {
                link: "https://example.org/cat.png".to_owned()
            }
        );
    }

    #[test]
    fn rejects_wire_payloads_breaking_the_convention() {
        let both = Message::try_from(wire(Some("hello"), Some("link")))
            .expect_err("both-set must fail");
        assert_eq!(both.code, "invalid_message_payload");
        assert_eq!(both.category, ClientErrorCategory::Serialization);

        let neither = Message::try_from(wire(None, None)).expect_err("neither-set must fail");
        assert_eq!(neither.code, "invalid_message_payload");
    }

    #[test]
    fn wire_encoding_uses_capitalized_payload_keys() {
        let message = Message {
            id: 0,
            from: "alice".to_owned(),
            to: "rust@channel".to_owned(),
            body: MessageBody::Text {
                text: "hello".to_owned(),
            },
            time: "1724995200000".to_owned(),
        };

        let encoded =
            serde_json::to_value(WireMessage::from(&message)).expect("wire should serialize");
        assert_eq!(encoded["data"]["Text"]["text"], "hello");
        assert!(encoded["data"].get("Image").is_none());
    }

    #[test]
    fn parses_wire_messages_from_server_json() {
        let raw = r#"{
            "id": 57,
            "from": "bob",
            "to": "rust@channel",
            "data": {"Image": {"link": "https://example.org/cat.png"}},
            "time": "1724995200000"
        }"#;

        let wire: WireMessage = serde_json::from_str(raw).expect("wire should parse");
        let message = Message::try_from(wire).expect("wire should convert");
        assert_eq!(message.id, 57);
        assert_eq!(
            message.body,
            MessageBody::Image {
                link: "https://example.org/cat.png".to_owned()
            }
        );
    }

    #[test]
    fn normalizes_base_url_trailing_slash() {
        let api = ChannelApi::new("https://faerytea.name:8008").expect("url should parse");
        let endpoint = api.endpoint("channel/rust@channel").expect("join");
        assert_eq!(
            endpoint.as_str(),
            "https://faerytea.name:8008/channel/rust@channel"
        );
    }

    #[test]
    fn rejects_unparseable_base_url() {
        let err = ChannelApi::new("not a url").expect_err("must fail");
        assert_eq!(err.code, "invalid_base_url");
    }
}
