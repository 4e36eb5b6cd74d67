//! Optional authentication of outbound HTTP calls.
//!
//! A client built without [`IntegrationCredentials`] sends unauthenticated
//! requests; nothing else about the call shape changes.

pub mod maskinporten;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::RequestBuilder;
use uuid::Uuid;

use crate::error::FiksIoResult;

pub use maskinporten::{MaskinportenSettings, MaskinportenTokenSource};

pub const INTEGRATION_ID_HEADER: &str = "IntegrasjonId";
pub const INTEGRATION_PASSWORD_HEADER: &str = "IntegrasjonPassord";

/// Source of bearer tokens for outbound calls.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> FiksIoResult<String>;
}

/// A token acquired elsewhere and used as-is.
#[derive(Clone)]
pub struct StaticTokenSource {
    token: String,
}

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn access_token(&self) -> FiksIoResult<String> {
        Ok(self.token.clone())
    }
}

/// Integration identity plus token source, applied to every authenticated request.
#[derive(Clone)]
pub struct IntegrationCredentials {
    integration_id: Uuid,
    integration_password: String,
    token_source: Arc<dyn TokenSource>,
}

impl IntegrationCredentials {
    pub fn new(
        integration_id: Uuid,
        integration_password: impl Into<String>,
        token_source: Arc<dyn TokenSource>,
    ) -> Self {
        Self {
            integration_id,
            integration_password: integration_password.into(),
            token_source,
        }
    }

    pub fn integration_id(&self) -> Uuid {
        self.integration_id
    }

    /// Attach the bearer token and integration headers.
    pub async fn authorize(&self, request: RequestBuilder) -> FiksIoResult<RequestBuilder> {
        let token = self.token_source.access_token().await?;
        Ok(request
            .bearer_auth(token)
            .header(INTEGRATION_ID_HEADER, self.integration_id.to_string())
            .header(INTEGRATION_PASSWORD_HEADER, &self.integration_password))
    }
}

impl fmt::Debug for IntegrationCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntegrationCredentials")
            .field("integration_id", &self.integration_id)
            .field("integration_password", &"<redacted>")
            .finish_non_exhaustive()
    }
}

/// Apply credentials when present, otherwise pass the request through untouched.
pub(crate) async fn authorize_optional(
    credentials: Option<&IntegrationCredentials>,
    request: RequestBuilder,
) -> FiksIoResult<RequestBuilder> {
    match credentials {
        Some(credentials) => credentials.authorize(request).await,
        None => Ok(request),
    }
}
