use std::io::Cursor;
use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Headers;

/// Envelope fields of an inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageMetadata {
    pub message_id: Uuid,
    pub message_type: String,
    pub sender_account_id: Uuid,
    pub receiver_account_id: Uuid,
    pub ttl: Duration,
    pub in_reply_to: Option<Uuid>,
    pub headers: Option<Headers>,
    /// Set when the broker redelivers a message that was not acknowledged.
    pub resent: bool,
}

/// One inbound message as handed to a subscription callback.
///
/// The content is the still-encrypted body; decrypting it is up to the application.
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    pub metadata: MessageMetadata,
    content: Bytes,
}

impl ReceivedMessage {
    pub fn new(metadata: MessageMetadata, content: impl Into<Bytes>) -> Self {
        Self {
            metadata,
            content: content.into(),
        }
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    /// A fresh reader over the content
    pub fn reader(&self) -> Cursor<Bytes> {
        Cursor::new(self.content.clone())
    }

    pub fn into_content(self) -> Bytes {
        self.content
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelReason {
    /// The broker closed the delivery stream (queue removed, connection dropped).
    ConnectionClosed,
    ChannelError(String),
}

/// Broker-initiated end of a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerCanceled {
    pub consumer_tag: String,
    pub reason: CancelReason,
}

impl ConsumerCanceled {
    pub fn new(consumer_tag: impl Into<String>, reason: CancelReason) -> Self {
        Self {
            consumer_tag: consumer_tag.into(),
            reason,
        }
    }
}
