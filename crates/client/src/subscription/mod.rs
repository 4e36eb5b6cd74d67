//! Inbound message subscriptions.
//!
//! Delivery is push based: callers register a message handler and an optional
//! cancellation handler and get back a [`SubscriptionHandle`]. Handlers run on
//! tasks owned by the collaborator, concurrently with each other and with any
//! other call made through the client. No ordering is promised across
//! deliveries beyond what the queue itself provides.
//!
//! A message handler that returns an error or panics is logged and its delivery
//! dropped; the subscription keeps running and the cancellation handler is not
//! invoked. The cancellation handler is only called when the broker ends the
//! subscription.

pub mod dispatch;
pub mod pubsub;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cancellation::CancellationToken;
use crate::error::FiksIoResult;
use crate::models::{ConsumerCanceled, ReceivedMessage};

pub use pubsub::RedisSubscriptionHandler;
pub use dispatch::run_consumer;

/// Future returned by subscription callbacks
pub type HandlerFuture = BoxFuture<'static, anyhow::Result<()>>;

pub type MessageReceivedHandler = Arc<dyn Fn(ReceivedMessage) -> HandlerFuture + Send + Sync>;

pub type ConsumerCanceledHandler = Arc<dyn Fn(ConsumerCanceled) -> HandlerFuture + Send + Sync>;

/// Wrap an async closure as a [`MessageReceivedHandler`].
pub fn message_handler<F, Fut>(handler: F) -> MessageReceivedHandler
where
    F: Fn(ReceivedMessage) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |message| handler(message).boxed())
}

/// Wrap an async closure as a [`ConsumerCanceledHandler`].
pub fn canceled_handler<F, Fut>(handler: F) -> ConsumerCanceledHandler
where
    F: Fn(ConsumerCanceled) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |event| handler(event).boxed())
}

/// The handler used when the caller does not supply one.
pub fn noop_canceled_handler() -> ConsumerCanceledHandler {
    canceled_handler(|event: ConsumerCanceled| async move {
        debug!(
            consumer_tag = %event.consumer_tag,
            reason = ?event.reason,
            "subscription canceled by broker"
        );
        Ok(())
    })
}

/// Registers handlers against the inbound queue of one account.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionHandler: Send + Sync {
    /// Returns once the broker has acknowledged the registration.
    async fn add_message_received_handler(
        &self,
        on_received: MessageReceivedHandler,
        on_canceled: ConsumerCanceledHandler,
    ) -> FiksIoResult<SubscriptionHandle>;
}

/// A live registration. Dropping it stops delivery, as does [`dispose`](Self::dispose).
pub struct SubscriptionHandle {
    consumer_tag: String,
    on_received: MessageReceivedHandler,
    on_canceled: ConsumerCanceledHandler,
    shutdown: CancellationToken,
    consumer: Option<JoinHandle<()>>,
}

impl SubscriptionHandle {
    pub fn new(
        consumer_tag: impl Into<String>,
        on_received: MessageReceivedHandler,
        on_canceled: ConsumerCanceledHandler,
    ) -> Self {
        Self {
            consumer_tag: consumer_tag.into(),
            on_received,
            on_canceled,
            shutdown: CancellationToken::new(),
            consumer: None,
        }
    }

    /// Attach the consumer task and the token that stops it.
    pub fn with_consumer(mut self, shutdown: CancellationToken, consumer: JoinHandle<()>) -> Self {
        self.shutdown = shutdown;
        self.consumer = Some(consumer);
        self
    }

    pub fn consumer_tag(&self) -> &str {
        &self.consumer_tag
    }

    pub fn message_received_handler(&self) -> &MessageReceivedHandler {
        &self.on_received
    }

    pub fn canceled_handler(&self) -> &ConsumerCanceledHandler {
        &self.on_canceled
    }

    /// False once disposed or once the broker ended the delivery stream.
    pub fn is_active(&self) -> bool {
        if self.shutdown.is_cancelled() {
            return false;
        }
        self.consumer
            .as_ref()
            .map_or(true, |consumer| !consumer.is_finished())
    }

    /// Stop delivery and wait for the consumer task to wind down.
    pub async fn dispose(mut self) {
        self.shutdown.cancel();
        if let Some(consumer) = self.consumer.take() {
            if let Err(error) = consumer.await {
                warn!(consumer_tag = %self.consumer_tag, %error, "consumer task ended abnormally");
            }
        }
        debug!(consumer_tag = %self.consumer_tag, "subscription disposed");
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("consumer_tag", &self.consumer_tag)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}
