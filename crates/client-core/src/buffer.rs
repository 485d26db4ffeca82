use std::collections::HashSet;

use thiserror::Error;
use tracing::warn;

use crate::types::{Message, UNASSIGNED_MESSAGE_ID};

/// Errors that can occur while appending a sent message to the buffer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BufferError {
    /// The message still carries the placeholder id; the server-assigned id
    /// must replace it before the append.
    #[error("message id is unassigned; reconcile the server id before appending")]
    UnassignedId,
    /// The message id is not newer than the buffer tail, so appending it
    /// would break the ordering invariant.
    #[error("message id {id} is not newer than the buffer tail {newest}")]
    NotNewest {
        /// Rejected message id.
        id: i64,
        /// Current newest buffered id.
        newest: i64,
    },
}

/// In-memory ordered message buffer for one open chat.
///
/// Messages are kept ascending by id and the buffer is never re-sorted:
/// older pages are merged at the front, sent messages appended at the back,
/// and any id already present is skipped, which makes merges idempotent.
#[derive(Debug, Clone, Default)]
pub struct MessageBuffer {
    messages: Vec<Message>,
    known_ids: HashSet<i64>,
}

impl MessageBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffered messages, ascending by id.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of buffered messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the buffer holds no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Whether the given id is already buffered.
    pub fn contains(&self, id: i64) -> bool {
        self.known_ids.contains(&id)
    }

    /// Oldest buffered id, the exclusive anchor for the next older page.
    /// `0` when the buffer is empty.
    pub fn oldest_id(&self) -> i64 {
        self.messages.first().map(|message| message.id).unwrap_or(0)
    }

    /// Newest buffered id, `0` when the buffer is empty.
    pub fn newest_id(&self) -> i64 {
        self.messages.last().map(|message| message.id).unwrap_or(0)
    }

    /// Merge a fetched page into the buffer and return how many messages
    /// were actually inserted.
    ///
    /// The page must be ascending by id (the repository normalizes fetches).
    /// Messages older than the current front are prepended, newer than the
    /// current tail appended. Duplicates and unassigned ids are skipped, so
    /// merging the same page twice leaves the buffer unchanged. An entry
    /// that falls strictly inside the buffered range but is not buffered
    /// cannot come from a contiguous page and is dropped with a warning.
    pub fn merge(&mut self, page: Vec<Message>) -> usize {
        debug_assert!(
            page.windows(2).all(|pair| pair[0].id < pair[1].id),
            "page must be ascending by id"
        );

        let mut front: Vec<Message> = Vec::new();
        let mut back: Vec<Message> = Vec::new();

        for message in page {
            if message.id == UNASSIGNED_MESSAGE_ID || self.known_ids.contains(&message.id) {
                continue;
            }

            let oldest = self.messages.first().map(|m| m.id);
            let newest = self.messages.last().map(|m| m.id);
            match (oldest, newest) {
                // Empty buffer: the ascending page fills it in order.
                (None, None) => {
                    self.known_ids.insert(message.id);
                    back.push(message);
                }
                (Some(oldest), Some(newest)) => {
                    if message.id < oldest {
                        self.known_ids.insert(message.id);
                        front.push(message);
                    } else if message.id > newest {
                        self.known_ids.insert(message.id);
                        back.push(message);
                    } else {
                        warn!(
                            id = message.id,
                            "dropping interior page entry absent from the buffer"
                        );
                    }
                }
                _ => unreachable!("first and last are present or absent together"),
            }
        }

        let merged = front.len() + back.len();
        if !front.is_empty() {
            self.messages.splice(0..0, front);
        }
        self.messages.extend(back);
        merged
    }

    /// Append a confirmed sent message at the most-recent end.
    ///
    /// The server-assigned id must already be in place.
    pub fn append_sent(&mut self, message: Message) -> Result<(), BufferError> {
        if message.is_unassigned() {
            return Err(BufferError::UnassignedId);
        }
        let newest = self.newest_id();
        if !self.messages.is_empty() && message.id <= newest {
            return Err(BufferError::NotNewest {
                id: message.id,
                newest,
            });
        }

        self.known_ids.insert(message.id);
        self.messages.push(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageBody;

    fn message(id: i64) -> Message {
        Message {
            id,
            from: "alice".to_owned(),
            to: "rust@channel".to_owned(),
            body: MessageBody::Text {
                text: format!("msg-{id}"),
            },
            time: format!("{}", 1_724_995_200_000_i64 + id),
        }
    }

    fn ids(buffer: &MessageBuffer) -> Vec<i64> {
        buffer.messages().iter().map(|m| m.id).collect()
    }

    #[test]
    fn merge_is_idempotent() {
        let mut buffer = MessageBuffer::new();
        let page = vec![message(4), message(5), message(6)];

        assert_eq!(buffer.merge(page.clone()), 3);
        assert_eq!(buffer.merge(page), 0);
        assert_eq!(ids(&buffer), vec![4, 5, 6]);
    }

    #[test]
    fn merge_prepends_older_pages_and_keeps_order_monotonic() {
        let mut buffer = MessageBuffer::new();
        buffer.merge(vec![message(40), message(41)]);
        buffer.merge(vec![message(20), message(21)]);
        buffer.merge(vec![message(42)]);

        let ids = ids(&buffer);
        assert_eq!(ids, vec![20, 21, 40, 41, 42]);
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn merge_skips_overlapping_cache_content() {
        let mut buffer = MessageBuffer::new();
        buffer.merge(vec![message(10), message(11), message(12)]);

        // Cache fallback returns the full history including buffered ids.
        let cached = vec![message(8), message(9), message(10), message(11), message(12)];
        assert_eq!(buffer.merge(cached.clone()), 2);
        assert_eq!(buffer.merge(cached), 0);
        assert_eq!(ids(&buffer), vec![8, 9, 10, 11, 12]);
    }

    #[test]
    fn merge_drops_unassigned_ids() {
        let mut buffer = MessageBuffer::new();
        assert_eq!(buffer.merge(vec![message(0), message(3)]), 1);
        assert_eq!(ids(&buffer), vec![3]);
    }

    #[test]
    fn anchor_is_zero_for_empty_buffer() {
        let buffer = MessageBuffer::new();
        assert_eq!(buffer.oldest_id(), 0);
        assert_eq!(buffer.newest_id(), 0);
    }

    #[test]
    fn append_sent_requires_a_reconciled_id() {
        let mut buffer = MessageBuffer::new();
        let err = buffer
            .append_sent(message(0))
            .expect_err("placeholder id must be rejected");
        assert_eq!(err, BufferError::UnassignedId);
    }

    #[test]
    fn append_sent_rejects_stale_ids() {
        let mut buffer = MessageBuffer::new();
        buffer.merge(vec![message(10), message(11)]);

        let err = buffer
            .append_sent(message(11))
            .expect_err("stale id must be rejected");
        assert_eq!(err, BufferError::NotNewest { id: 11, newest: 11 });

        buffer.append_sent(message(12)).expect("newer id appends");
        assert_eq!(ids(&buffer), vec![10, 11, 12]);
    }
}
