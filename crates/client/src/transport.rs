//! Status mapping shared by the HTTP collaborators.

use reqwest::{Response, StatusCode};
use tracing::warn;

use crate::error::{FiksIoError, FiksIoResult};

/// Map a non-success response onto the error taxonomy; `subject` names what was requested.
pub(crate) async fn check_status(response: Response, subject: &str) -> FiksIoResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    warn!(%status, subject, "remote service rejected request");

    Err(match status {
        StatusCode::NOT_FOUND => FiksIoError::not_found(subject.to_string()),
        StatusCode::BAD_REQUEST => FiksIoError::invalid_request(format!("{subject}: {body}")),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            FiksIoError::unauthorized(format!("{subject}: {status}"))
        }
        _ => FiksIoError::transport(format!("{subject}: {status} {body}")),
    })
}

pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}
