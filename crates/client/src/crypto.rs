//! Encryption seam used by the send path.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::FiksIoResult;
use crate::payload::PayloadItem;

/// Packs and encrypts payloads for one receiver.
///
/// The sealer owns the sender's key material; the receiver's key is supplied per
/// call. It reads every payload stream to the end, and any read failure must
/// fail the whole seal so that no partial message is ever uploaded.
#[async_trait]
pub trait PayloadSealer: Send + Sync {
    async fn seal(
        &self,
        receiver_public_key: &str,
        payloads: Vec<PayloadItem>,
    ) -> FiksIoResult<Bytes>;
}
