use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Headers;
use crate::error::{FiksIoError, FiksIoResult};

/// The envelope of an outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendRequest {
    sender_account_id: Uuid,
    receiver_account_id: Uuid,
    message_type: String,
    ttl: Duration,
    headers: Option<Headers>,
    in_reply_to: Option<Uuid>,
}

impl SendRequest {
    pub fn new(
        sender_account_id: Uuid,
        receiver_account_id: Uuid,
        message_type: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            sender_account_id,
            receiver_account_id,
            message_type: message_type.into(),
            ttl,
            headers: None,
            in_reply_to: None,
        }
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(Headers::new)
            .insert(key.into(), value.into());
        self
    }

    /// Mark this message as a reply to a previously received message.
    pub fn in_reply_to(mut self, message_id: Uuid) -> Self {
        self.in_reply_to = Some(message_id);
        self
    }

    pub fn sender_account_id(&self) -> Uuid {
        self.sender_account_id
    }

    pub fn receiver_account_id(&self) -> Uuid {
        self.receiver_account_id
    }

    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn headers(&self) -> Option<&Headers> {
        self.headers.as_ref()
    }

    pub fn reply_to(&self) -> Option<Uuid> {
        self.in_reply_to
    }

    /// Check the request is sendable from `own_account_id`.
    pub fn validate_for(&self, own_account_id: Uuid) -> FiksIoResult<()> {
        if self.sender_account_id != own_account_id {
            return Err(FiksIoError::invalid_request(format!(
                "sender account {} is not the client account {}",
                self.sender_account_id, own_account_id
            )));
        }
        if self.receiver_account_id.is_nil() {
            return Err(FiksIoError::invalid_request("receiver account id is nil"));
        }
        if self.message_type.trim().is_empty() {
            return Err(FiksIoError::invalid_request("message type is empty"));
        }
        if self.ttl.is_zero() {
            return Err(FiksIoError::invalid_request("time-to-live must be positive"));
        }
        Ok(())
    }
}

/// Confirmation of a message accepted by the send service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentMessage {
    pub message_id: Uuid,
    pub correlation_id: Option<Uuid>,
    pub external_reference: String,
    pub message_type: String,
    pub sender_account_id: Uuid,
    pub receiver_account_id: Uuid,
    pub ttl: Duration,
    pub headers: Option<Headers>,
}
