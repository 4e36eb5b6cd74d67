//! Outbound message capability.

pub mod http;

use async_trait::async_trait;

use crate::cancellation::CancellationToken;
use crate::error::FiksIoResult;
use crate::models::{SendRequest, SentMessage};
use crate::payload::PayloadItem;

pub use http::HttpSendHandler;

/// Transmits one message with its payloads.
///
/// A triggered token at call time must fail with `Canceled` before any network
/// I/O. A message is either accepted whole, yielding one [`SentMessage`], or the
/// call fails; there is no partial success.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SendHandler: Send + Sync {
    async fn send(
        &self,
        request: &SendRequest,
        payloads: Vec<PayloadItem>,
        cancellation: &CancellationToken,
    ) -> FiksIoResult<SentMessage>;
}
