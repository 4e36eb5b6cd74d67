//! Account directory capability.

pub mod http;

use async_trait::async_trait;
use uuid::Uuid;

use crate::cancellation::CancellationToken;
use crate::error::FiksIoResult;
use crate::models::{Account, LookupRequest};

pub use http::HttpCatalogHandler;

/// Resolves accounts and their published encryption keys.
///
/// Implementations are shared by every concurrent call of a client and must be
/// safe to use from many tasks at once.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogHandler: Send + Sync {
    /// Resolve exactly one account, or fail with `NotFound`.
    async fn lookup(
        &self,
        request: &LookupRequest,
        cancellation: &CancellationToken,
    ) -> FiksIoResult<Account>;

    /// The PEM encoded public key currently published for `account_id`.
    async fn public_key(
        &self,
        account_id: Uuid,
        cancellation: &CancellationToken,
    ) -> FiksIoResult<String>;
}
