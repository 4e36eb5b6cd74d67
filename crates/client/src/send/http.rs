use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::SendHandler;
use crate::auth::{authorize_optional, IntegrationCredentials};
use crate::cancellation::{ensure_not_canceled, run_cancellable, CancellationToken};
use crate::catalog::CatalogHandler;
use crate::crypto::PayloadSealer;
use crate::error::{FiksIoError, FiksIoResult};
use crate::models::{Headers, SendRequest, SentMessage};
use crate::payload::PayloadItem;
use crate::transport::{check_status, join_url};

const SEND_PATH: &str = "fiks-io/api/v1/send";
const DATA_FILENAME: &str = "data.zip";

/// Send collaborator uploading one sealed multipart body per message.
pub struct HttpSendHandler {
    http: Client,
    base_url: String,
    catalog: Arc<dyn CatalogHandler>,
    sealer: Arc<dyn PayloadSealer>,
    credentials: Option<IntegrationCredentials>,
}

impl HttpSendHandler {
    pub fn new(
        base_url: impl Into<String>,
        request_timeout: Duration,
        catalog: Arc<dyn CatalogHandler>,
        sealer: Arc<dyn PayloadSealer>,
    ) -> FiksIoResult<Self> {
        let http = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            catalog,
            sealer,
            credentials: None,
        })
    }

    pub fn with_credentials(mut self, credentials: IntegrationCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }
}

#[async_trait]
impl SendHandler for HttpSendHandler {
    async fn send(
        &self,
        request: &SendRequest,
        payloads: Vec<PayloadItem>,
        cancellation: &CancellationToken,
    ) -> FiksIoResult<SentMessage> {
        ensure_not_canceled(cancellation)?;

        let receiver = request.receiver_account_id();
        let public_key = self.catalog.public_key(receiver, cancellation).await?;

        let payload_count = payloads.len();
        let sealed = run_cancellable(cancellation, self.sealer.seal(&public_key, payloads)).await?;
        debug!(
            %receiver,
            payload_count,
            sealed_bytes = sealed.len(),
            "sealed payloads"
        );

        let metadata = serde_json::to_string(&OutboundMetadataModel::from(request))?;
        let form = Form::new()
            .part(
                "metadata",
                Part::text(metadata).mime_str("application/json")?,
            )
            .part(
                "data",
                Part::bytes(sealed.to_vec())
                    .file_name(DATA_FILENAME)
                    .mime_str("application/octet-stream")?,
            );

        let url = join_url(&self.base_url, SEND_PATH);
        let builder = self.http.post(url).multipart(form);

        let sent = run_cancellable(cancellation, async {
            let builder = authorize_optional(self.credentials.as_ref(), builder).await?;
            let response = check_status(builder.send().await?, "message send").await?;
            let model: SentMessageModel = response.json().await?;
            Ok::<_, FiksIoError>(SentMessage::from(model))
        })
        .await?;

        info!(
            message_id = %sent.message_id,
            message_type = %sent.message_type,
            %receiver,
            "message accepted by send service"
        );
        Ok(sent)
    }
}

#[derive(Debug, Serialize)]
struct OutboundMetadataModel<'a> {
    #[serde(rename = "avsenderKontoId")]
    sender_account_id: Uuid,
    #[serde(rename = "mottakerKontoId")]
    receiver_account_id: Uuid,
    #[serde(rename = "meldingType")]
    message_type: &'a str,
    /// Milliseconds
    ttl: u64,
    #[serde(rename = "headere", skip_serializing_if = "Option::is_none")]
    headers: Option<&'a Headers>,
    #[serde(rename = "svarPaMelding", skip_serializing_if = "Option::is_none")]
    in_reply_to: Option<Uuid>,
}

impl<'a> From<&'a SendRequest> for OutboundMetadataModel<'a> {
    fn from(request: &'a SendRequest) -> Self {
        Self {
            sender_account_id: request.sender_account_id(),
            receiver_account_id: request.receiver_account_id(),
            message_type: request.message_type(),
            ttl: u64::try_from(request.ttl().as_millis()).unwrap_or(u64::MAX),
            headers: request.headers(),
            in_reply_to: request.reply_to(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SentMessageModel {
    #[serde(rename = "meldingId")]
    message_id: Uuid,
    #[serde(rename = "meldingType")]
    message_type: String,
    #[serde(rename = "avsenderKontoId")]
    sender_account_id: Uuid,
    #[serde(rename = "mottakerKontoId")]
    receiver_account_id: Uuid,
    ttl: u64,
    #[serde(rename = "dokumentlagerId", default)]
    document_store_id: Option<String>,
    #[serde(rename = "svarPaMelding", default)]
    in_reply_to: Option<Uuid>,
    #[serde(rename = "headere", default)]
    headers: Option<Headers>,
}

impl From<SentMessageModel> for SentMessage {
    fn from(model: SentMessageModel) -> Self {
        Self {
            message_id: model.message_id,
            correlation_id: model.in_reply_to,
            external_reference: model.document_store_id.unwrap_or_default(),
            message_type: model.message_type,
            sender_account_id: model.sender_account_id,
            receiver_account_id: model.receiver_account_id,
            ttl: Duration::from_millis(model.ttl),
            headers: model.headers,
        }
    }
}
