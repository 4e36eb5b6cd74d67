//! Consumer loop behaviour: fan-out to handlers, failure isolation and cancellation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::channel::mpsc;
use futures::SinkExt;
use tokio::sync::Notify;
use tokio::time::timeout;
use uuid::Uuid;

use fiks_io_client::subscription::run_consumer;
use fiks_io_client::{
    canceled_handler, message_handler, CancelReason, CancellationToken, ConsumerCanceled,
    FiksIoError, FiksIoResult, MessageMetadata, ReceivedMessage,
};

const WAIT: Duration = Duration::from_secs(5);

fn delivery(message_type: &str) -> FiksIoResult<ReceivedMessage> {
    Ok(ReceivedMessage::new(
        MessageMetadata {
            message_id: Uuid::new_v4(),
            message_type: message_type.to_string(),
            sender_account_id: Uuid::new_v4(),
            receiver_account_id: Uuid::new_v4(),
            ttl: Duration::from_secs(60),
            in_reply_to: None,
            headers: None,
            resent: false,
        },
        Bytes::from_static(b"payload"),
    ))
}

/// Counts invocations and wakes waiters on each one.
#[derive(Default)]
struct HitCounter {
    count: AtomicUsize,
    notify: Notify,
}

impl HitCounter {
    fn hit(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    async fn wait_for(&self, expected: usize) {
        timeout(WAIT, async {
            while self.count() < expected {
                let notified = self.notify.notified();
                if self.count() >= expected {
                    break;
                }
                notified.await;
            }
        })
        .await
        .expect("counter was not hit in time");
    }
}

#[tokio::test]
async fn every_delivery_reaches_the_handler() {
    let received = Arc::new(HitCounter::default());
    let counter = received.clone();
    let on_received = message_handler(move |_message| {
        let counter = counter.clone();
        async move {
            counter.hit();
            Ok(())
        }
    });

    let deliveries = futures::stream::iter(vec![
        delivery("a"),
        delivery("b"),
        delivery("c"),
    ]);
    run_consumer(
        "tag".to_string(),
        deliveries,
        on_received,
        canceled_handler(|_event| async { Ok(()) }),
        CancellationToken::new(),
    )
    .await;

    received.wait_for(3).await;
    assert_eq!(received.count(), 3);
}

#[tokio::test]
async fn failing_and_panicking_handlers_do_not_stop_the_subscription() {
    let received = Arc::new(HitCounter::default());
    let canceled = Arc::new(HitCounter::default());

    let counter = received.clone();
    let on_received = message_handler(move |message: ReceivedMessage| {
        let counter = counter.clone();
        async move {
            counter.hit();
            match message.metadata.message_type.as_str() {
                "fail" => anyhow::bail!("handler rejected message"),
                "panic" => panic!("handler blew up"),
                _ => Ok(()),
            }
        }
    });
    let canceled_counter = canceled.clone();
    let on_canceled = canceled_handler(move |_event| {
        let counter = canceled_counter.clone();
        async move {
            counter.hit();
            Ok(())
        }
    });

    let (mut tx, rx) = mpsc::unbounded();
    let shutdown = CancellationToken::new();
    let consumer = tokio::spawn(run_consumer(
        "tag".to_string(),
        rx,
        on_received,
        on_canceled,
        shutdown.clone(),
    ));

    tx.send(delivery("fail")).await.expect("send");
    tx.send(delivery("panic")).await.expect("send");
    tx.send(delivery("ok")).await.expect("send");
    received.wait_for(3).await;

    assert!(!consumer.is_finished());
    assert_eq!(canceled.count(), 0);

    shutdown.cancel();
    timeout(WAIT, consumer).await.expect("consumer stops").expect("join");
    assert_eq!(canceled.count(), 0);
}

#[tokio::test]
async fn undecodable_deliveries_are_skipped() {
    let received = Arc::new(HitCounter::default());
    let counter = received.clone();
    let on_received = message_handler(move |_message| {
        let counter = counter.clone();
        async move {
            counter.hit();
            Ok(())
        }
    });

    let deliveries = futures::stream::iter(vec![
        Err(FiksIoError::delivery("content is not base64")),
        delivery("ok"),
    ]);
    run_consumer(
        "tag".to_string(),
        deliveries,
        on_received,
        canceled_handler(|_event| async { Ok(()) }),
        CancellationToken::new(),
    )
    .await;

    received.wait_for(1).await;
    assert_eq!(received.count(), 1);
}

#[tokio::test]
async fn broker_closing_the_stream_invokes_cancel_handler_once() {
    let events = Arc::new(std::sync::Mutex::new(Vec::<ConsumerCanceled>::new()));
    let recorded = events.clone();
    let on_canceled = canceled_handler(move |event| {
        let recorded = recorded.clone();
        async move {
            recorded.lock().expect("events lock").push(event);
            Ok(())
        }
    });

    let (tx, rx) = mpsc::unbounded::<FiksIoResult<ReceivedMessage>>();
    let consumer = tokio::spawn(run_consumer(
        "consumer-7".to_string(),
        rx,
        message_handler(|_message| async { Ok(()) }),
        on_canceled,
        CancellationToken::new(),
    ));

    drop(tx);
    timeout(WAIT, consumer).await.expect("consumer ends").expect("join");

    let events = events.lock().expect("events lock").clone();
    assert_eq!(
        events,
        vec![ConsumerCanceled::new("consumer-7", CancelReason::ConnectionClosed)]
    );
}

#[tokio::test]
async fn local_shutdown_does_not_invoke_cancel_handler() {
    let canceled = Arc::new(HitCounter::default());
    let counter = canceled.clone();
    let on_canceled = canceled_handler(move |_event| {
        let counter = counter.clone();
        async move {
            counter.hit();
            Ok(())
        }
    });

    let (_tx, rx) = mpsc::unbounded::<FiksIoResult<ReceivedMessage>>();
    let shutdown = CancellationToken::new();
    let consumer = tokio::spawn(run_consumer(
        "tag".to_string(),
        rx,
        message_handler(|_message| async { Ok(()) }),
        on_canceled,
        shutdown.clone(),
    ));

    shutdown.cancel();
    timeout(WAIT, consumer).await.expect("consumer stops").expect("join");
    assert_eq!(canceled.count(), 0);
}

#[tokio::test]
async fn transport_failure_ends_subscription_with_channel_error() {
    let events = Arc::new(std::sync::Mutex::new(Vec::<ConsumerCanceled>::new()));
    let recorded = events.clone();
    let on_canceled = canceled_handler(move |event| {
        let recorded = recorded.clone();
        async move {
            recorded.lock().expect("events lock").push(event);
            Ok(())
        }
    });

    let deliveries = futures::stream::iter(vec![
        Err(FiksIoError::transport("connection reset")),
        delivery("never dispatched"),
    ]);
    run_consumer(
        "consumer-9".to_string(),
        deliveries,
        message_handler(|_message| async { anyhow::bail!("stream should have stopped") }),
        on_canceled,
        CancellationToken::new(),
    )
    .await;

    let events = events.lock().expect("events lock").clone();
    assert_eq!(
        events,
        vec![ConsumerCanceled::new(
            "consumer-9",
            CancelReason::ChannelError("connection reset".to_string())
        )]
    );
}
