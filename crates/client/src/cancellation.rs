//! Helpers for threading an explicit cancellation token through suspending calls.

use std::future::Future;

pub use tokio_util::sync::CancellationToken;

use crate::error::{FiksIoError, FiksIoResult};

/// Fail fast with [`FiksIoError::Canceled`] when the token is already triggered.
pub fn ensure_not_canceled(cancellation: &CancellationToken) -> FiksIoResult<()> {
    if cancellation.is_cancelled() {
        return Err(FiksIoError::Canceled);
    }
    Ok(())
}

/// Race `operation` against the token; the operation is dropped when the token fires first.
pub async fn run_cancellable<F, T>(cancellation: &CancellationToken, operation: F) -> FiksIoResult<T>
where
    F: Future<Output = FiksIoResult<T>>,
{
    ensure_not_canceled(cancellation)?;

    tokio::select! {
        biased;
        _ = cancellation.cancelled() => Err(FiksIoError::Canceled),
        result = operation => result,
    }
}
