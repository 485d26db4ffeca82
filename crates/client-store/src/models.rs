use client_core::{Message, MessageBody};

use crate::error::StoreError;

/// One row of the `messages` table.
///
/// The payload is stored as the nullable `text`/`image_link` pair matching
/// the wire shape; conversion back to [`Message`] enforces the
/// exactly-one-set convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedMessage {
    pub chat_name: String,
    pub id: i64,
    pub sender: String,
    pub recipient: String,
    pub text: Option<String>,
    pub image_link: Option<String>,
    pub time: String,
}

impl CachedMessage {
    /// Build a cache row for a message belonging to `chat_name`.
    pub fn from_message(chat_name: impl Into<String>, message: &Message) -> Self {
        let (text, image_link) = match &message.body {
            MessageBody::Text { text } => (Some(text.clone()), None),
            MessageBody::Image { link } => (None, Some(link.clone())),
        };

        Self {
            chat_name: chat_name.into(),
            id: message.id,
            sender: message.from.clone(),
            recipient: message.to.clone(),
            text,
            image_link,
            time: message.time.clone(),
        }
    }

    /// Convert the row back into the canonical message representation.
    pub fn into_message(self) -> Result<Message, StoreError> {
        let body = match (self.text, self.image_link) {
            (Some(text), None) => MessageBody::Text { text },
            (None, Some(link)) => MessageBody::Image { link },
            (Some(_), Some(_)) => {
                return Err(StoreError::CorruptRow {
                    chat: self.chat_name,
                    id: self.id,
                    reason: "both text and image_link are set".to_owned(),
                });
            }
            (None, None) => {
                return Err(StoreError::CorruptRow {
                    chat: self.chat_name,
                    id: self.id,
                    reason: "neither text nor image_link is set".to_owned(),
                });
            }
        };

        Ok(Message {
            id: self.id,
            from: self.sender,
            to: self.recipient,
            body,
            time: self.time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_text_and_image_rows() {
        let text = Message {
            id: 3,
            from: "alice".to_owned(),
            to: "rust@channel".to_owned(),
            body: MessageBody::Text {
                text: "hello".to_owned(),
            },
            time: "1724995200000".to_owned(),
        };
        let image = Message {
            id: 4,
            from: "bob".to_owned(),
            to: "rust@channel".to_owned(),
            body: MessageBody::Image {
                link: "https://example.org/cat.png".to_owned(),
            },
            time: "1724995200001".to_owned(),
        };

        for message in [text, image] {
            let row = CachedMessage::from_message("rust@channel", &message);
            assert_eq!(row.into_message().expect("row should convert"), message);
        }
    }

    #[test]
    fn rejects_rows_breaking_the_payload_convention() {
        let row = CachedMessage {
            chat_name: "rust@channel".to_owned(),
            id: 9,
            sender: "alice".to_owned(),
            recipient: "rust@channel".to_owned(),
            text: None,
            image_link: None,
            time: "1724995200000".to_owned(),
        };

        let err = row.into_message().expect_err("empty payload must fail");
        assert!(matches!(err, StoreError::CorruptRow { id: 9, .. }));
    }
}
