//! # Fiks IO Client
//!
//! Account-scoped client for the Fiks IO messaging service. A [`FiksIoClient`]
//! is bound to one account and exposes four operations: look up a receiving
//! account, send a message with payloads, reply to a received message and
//! subscribe to inbound messages.
//!
//! ## Architecture
//!
//! - **Catalog**: account directory and public keys ([`CatalogHandler`])
//! - **Send**: sealed multipart upload ([`SendHandler`], [`PayloadSealer`])
//! - **Subscription**: push delivery into caller handlers ([`SubscriptionHandler`])
//! - **Payload**: the single normalizer over every send input shape
//! - **Auth**: optional integration credentials and Maskinporten tokens
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fiks_io_client::{FiksIoClient, LookupRequest, SendInput, SendRequest};
//!
//! let client = FiksIoClient::builder(account_id)
//!     .catalog(catalog)
//!     .sender(sender)
//!     .subscriptions(subscriptions)
//!     .build()?;
//!
//! let receiver = client
//!     .lookup(&LookupRequest::new("999999999", "no.ks.fiks.test", 3))
//!     .await?;
//! let request = SendRequest::new(account_id, receiver.account_id, "no.ks.fiks.test", ttl);
//! let sent = client.send(&request, SendInput::text("hei", "hei.txt")).await?;
//! ```

pub mod auth;
pub mod cancellation;
pub mod catalog;
pub mod client;
pub mod crypto;
pub mod error;
pub mod models;
pub mod payload;
pub mod send;
pub mod subscription;

pub(crate) mod transport;

pub use auth::{IntegrationCredentials, StaticTokenSource, TokenSource};
pub use cancellation::CancellationToken;
pub use catalog::{CatalogHandler, HttpCatalogHandler};
pub use client::{FiksIoClient, FiksIoClientBuilder, FiksIoCollaborators, DEFAULT_TTL};
pub use crypto::PayloadSealer;
pub use error::{FiksIoError, FiksIoResult};
pub use models::{
    Account, CancelReason, ConsumerCanceled, Headers, LookupRequest, MessageMetadata,
    ReceivedMessage, SendRequest, SentMessage,
};
pub use payload::{normalize, PayloadItem, PayloadStream, SendInput};
pub use send::{HttpSendHandler, SendHandler};
pub use subscription::{
    canceled_handler, message_handler, noop_canceled_handler, ConsumerCanceledHandler,
    MessageReceivedHandler, RedisSubscriptionHandler, SubscriptionHandle, SubscriptionHandler,
};
