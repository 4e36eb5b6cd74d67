//! Maskinporten token source using the JWT bearer grant.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::TokenSource;
use crate::error::{FiksIoError, FiksIoResult};

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Tokens are renewed this long before the issuer says they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct MaskinportenSettings {
    pub token_endpoint: String,
    pub audience: String,
    pub issuer: String,
    pub scope: String,
    pub grant_lifetime: Duration,
    pub request_timeout: Duration,
}

/// Grant claims
#[derive(Debug, Serialize)]
struct GrantClaims<'a> {
    aud: &'a str,
    iss: &'a str,
    scope: &'a str,
    iat: u64,
    exp: u64,
    jti: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    refresh_at: Instant,
}

pub struct MaskinportenTokenSource {
    http: reqwest::Client,
    settings: MaskinportenSettings,
    encoding_key: EncodingKey,
    cached: RwLock<Option<CachedToken>>,
}

impl MaskinportenTokenSource {
    /// Build a token source signing grants with the RSA private key in `private_key_pem`.
    pub fn new(settings: MaskinportenSettings, private_key_pem: &[u8]) -> FiksIoResult<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(private_key_pem)?;
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()?;

        Ok(Self {
            http,
            settings,
            encoding_key,
            cached: RwLock::new(None),
        })
    }

    fn grant_assertion(&self) -> FiksIoResult<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| FiksIoError::auth("system time is before the unix epoch"))?;

        let claims = GrantClaims {
            aud: &self.settings.audience,
            iss: &self.settings.issuer,
            scope: &self.settings.scope,
            iat: now.as_secs(),
            exp: (now + self.settings.grant_lifetime).as_secs(),
            jti: Uuid::new_v4().to_string(),
        };

        Ok(encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    async fn request_token(&self) -> FiksIoResult<CachedToken> {
        let assertion = self.grant_assertion()?;
        let requested_at = Instant::now();

        let response = self
            .http
            .post(&self.settings.token_endpoint)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|err| FiksIoError::auth(format!("token endpoint unreachable: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FiksIoError::auth(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|err| FiksIoError::auth(format!("invalid token response: {err}")))?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(EXPIRY_MARGIN);
        info!(
            issuer = %self.settings.issuer,
            expires_in = token.expires_in,
            "acquired maskinporten access token"
        );

        Ok(CachedToken {
            access_token: token.access_token,
            refresh_at: requested_at + lifetime,
        })
    }
}

#[async_trait]
impl TokenSource for MaskinportenTokenSource {
    async fn access_token(&self) -> FiksIoResult<String> {
        if let Some(token) = self.cached.read().await.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.access_token.clone());
            }
        }

        let mut cached = self.cached.write().await;
        // Another caller may have refreshed while this one waited for the lock.
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.access_token.clone());
            }
        }

        debug!("refreshing maskinporten access token");
        let token = self.request_token().await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }
}
