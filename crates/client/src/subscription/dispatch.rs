//! Consumer loop shared by subscription collaborators.

use std::panic::AssertUnwindSafe;

use futures_util::{FutureExt, Stream, StreamExt};
use tracing::{debug, error, info, warn};

use super::{ConsumerCanceledHandler, MessageReceivedHandler};
use crate::cancellation::CancellationToken;
use crate::error::{FiksIoError, FiksIoResult};
use crate::models::{CancelReason, ConsumerCanceled, ReceivedMessage};

/// Drive `deliveries` until the broker closes the stream or `shutdown` fires.
///
/// Each delivery is handed to `on_received` on its own task. Undecodable
/// deliveries are logged and skipped. When the stream ends, or yields a
/// transport failure, `on_canceled` is invoked once; a local shutdown returns
/// without invoking it.
pub async fn run_consumer<S>(
    consumer_tag: String,
    deliveries: S,
    on_received: MessageReceivedHandler,
    on_canceled: ConsumerCanceledHandler,
    shutdown: CancellationToken,
) where
    S: Stream<Item = FiksIoResult<ReceivedMessage>> + Send,
{
    let mut deliveries = std::pin::pin!(deliveries);
    debug!(consumer_tag = %consumer_tag, "consumer started");

    let reason = loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                debug!(consumer_tag = %consumer_tag, "consumer stopped by handle");
                return;
            }
            delivery = deliveries.next() => match delivery {
                Some(Ok(message)) => dispatch(&consumer_tag, &on_received, message),
                Some(Err(FiksIoError::Transport { message })) => {
                    break CancelReason::ChannelError(message);
                }
                Some(Err(error)) => {
                    warn!(consumer_tag = %consumer_tag, %error, "skipping undecodable delivery");
                }
                None => break CancelReason::ConnectionClosed,
            },
        }
    };

    info!(consumer_tag = %consumer_tag, ?reason, "delivery stream ended by broker");
    let event = ConsumerCanceled::new(consumer_tag.clone(), reason);
    if let Err(error) = on_canceled(event).await {
        warn!(consumer_tag = %consumer_tag, error = %error, "cancellation handler failed");
    }
}

fn dispatch(consumer_tag: &str, on_received: &MessageReceivedHandler, message: ReceivedMessage) {
    let message_id = message.metadata.message_id;
    let consumer_tag = consumer_tag.to_string();
    let handler = on_received.clone();

    debug!(%message_id, consumer_tag = %consumer_tag, "dispatching delivery");
    tokio::spawn(async move {
        let outcome = AssertUnwindSafe(async move { handler(message).await })
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(failure)) => warn!(
                %message_id,
                consumer_tag = %consumer_tag,
                error = %failure,
                "message handler failed, delivery dropped"
            ),
            Err(_) => error!(
                %message_id,
                consumer_tag = %consumer_tag,
                "message handler panicked, delivery dropped"
            ),
        }
    });
}
