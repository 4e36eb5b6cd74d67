//! Subscription collaborator backed by Redis pub/sub.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use futures_util::StreamExt;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::dispatch::run_consumer;
use super::{ConsumerCanceledHandler, MessageReceivedHandler, SubscriptionHandle, SubscriptionHandler};
use crate::cancellation::CancellationToken;
use crate::error::{FiksIoError, FiksIoResult};
use crate::models::{Headers, MessageMetadata, ReceivedMessage};

/// The channel messages for `account_id` are published on.
pub fn queue_name(account_id: Uuid) -> String {
    format!("fiksio.konto.{account_id}")
}

#[derive(Debug, Clone)]
pub struct RedisSubscriptionHandler {
    client: redis::Client,
    queue: String,
}

impl RedisSubscriptionHandler {
    /// No connection is made until the first subscription.
    pub fn new(url: &str, account_id: Uuid) -> FiksIoResult<Self> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            queue: queue_name(account_id),
        })
    }

    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = queue.into();
        self
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }
}

#[async_trait]
impl SubscriptionHandler for RedisSubscriptionHandler {
    async fn add_message_received_handler(
        &self,
        on_received: MessageReceivedHandler,
        on_canceled: ConsumerCanceledHandler,
    ) -> FiksIoResult<SubscriptionHandle> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(&self.queue).await?;

        let consumer_tag = format!("{}.{}", self.queue, Uuid::new_v4());
        info!(queue = %self.queue, consumer_tag = %consumer_tag, "subscription registered");

        let deliveries = pubsub
            .into_on_message()
            .map(|message| decode_delivery(message.get_payload_bytes()));

        let shutdown = CancellationToken::new();
        let consumer = tokio::spawn(run_consumer(
            consumer_tag.clone(),
            deliveries,
            on_received.clone(),
            on_canceled.clone(),
            shutdown.clone(),
        ));

        Ok(SubscriptionHandle::new(consumer_tag, on_received, on_canceled)
            .with_consumer(shutdown, consumer))
    }
}

#[derive(Debug, Deserialize)]
struct DeliveryEnvelope {
    metadata: DeliveryMetadata,
    /// Base64 of the encrypted body
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct DeliveryMetadata {
    #[serde(rename = "meldingId")]
    message_id: Uuid,
    #[serde(rename = "meldingType")]
    message_type: String,
    #[serde(rename = "avsenderKontoId")]
    sender_account_id: Uuid,
    #[serde(rename = "mottakerKontoId")]
    receiver_account_id: Uuid,
    /// Milliseconds
    ttl: u64,
    #[serde(rename = "svarPaMelding", default)]
    in_reply_to: Option<Uuid>,
    #[serde(rename = "headere", default)]
    headers: Option<Headers>,
    #[serde(rename = "resendt", default)]
    resent: bool,
}

pub(crate) fn decode_delivery(payload: &[u8]) -> FiksIoResult<ReceivedMessage> {
    let envelope: DeliveryEnvelope = serde_json::from_slice(payload)?;
    let content = STANDARD
        .decode(envelope.content.as_bytes())
        .map_err(|err| FiksIoError::delivery(format!("content is not base64: {err}")))?;

    let metadata = envelope.metadata;
    Ok(ReceivedMessage::new(
        MessageMetadata {
            message_id: metadata.message_id,
            message_type: metadata.message_type,
            sender_account_id: metadata.sender_account_id,
            receiver_account_id: metadata.receiver_account_id,
            ttl: Duration::from_millis(metadata.ttl),
            in_reply_to: metadata.in_reply_to,
            headers: metadata.headers,
            resent: metadata.resent,
        },
        content,
    ))
}
