use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::CatalogHandler;
use crate::auth::{authorize_optional, IntegrationCredentials};
use crate::cancellation::{ensure_not_canceled, run_cancellable, CancellationToken};
use crate::error::{FiksIoError, FiksIoResult};
use crate::models::{Account, LookupRequest};
use crate::transport::{check_status, join_url};

const LOOKUP_PATH: &str = "fiks-io/katalog/api/v1/lookup";
const ACCOUNTS_PATH: &str = "fiks-io/katalog/api/v1/kontoer";

/// Catalog collaborator speaking the JSON directory API.
#[derive(Debug, Clone)]
pub struct HttpCatalogHandler {
    http: Client,
    base_url: String,
    credentials: Option<IntegrationCredentials>,
}

impl HttpCatalogHandler {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> FiksIoResult<Self> {
        let http = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            credentials: None,
        })
    }

    pub fn with_credentials(mut self, credentials: IntegrationCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl CatalogHandler for HttpCatalogHandler {
    async fn lookup(
        &self,
        request: &LookupRequest,
        cancellation: &CancellationToken,
    ) -> FiksIoResult<Account> {
        ensure_not_canceled(cancellation)?;
        debug!(
            identifier = request.identifier(),
            protocol = request.message_protocol(),
            security_level = request.security_level(),
            "catalog lookup"
        );

        let url = join_url(&self.base_url, LOOKUP_PATH);
        let security_level = request.security_level().to_string();
        let builder = self.http.get(url).query(&[
            ("identifikator", request.identifier()),
            ("meldingProtokoll", request.message_protocol()),
            ("sikkerhetsniva", security_level.as_str()),
        ]);

        let account = run_cancellable(cancellation, async {
            let builder = authorize_optional(self.credentials.as_ref(), builder).await?;
            let response = check_status(builder.send().await?, "account lookup").await?;
            let model: AccountModel = response.json().await?;
            Ok::<_, FiksIoError>(Account::from(model))
        })
        .await?;

        info!(account_id = %account.account_id, "catalog lookup resolved account");
        Ok(account)
    }

    async fn public_key(
        &self,
        account_id: Uuid,
        cancellation: &CancellationToken,
    ) -> FiksIoResult<String> {
        ensure_not_canceled(cancellation)?;
        debug!(%account_id, "fetching public key");

        let url = join_url(
            &self.base_url,
            &format!("{ACCOUNTS_PATH}/{account_id}/offentligNokkel"),
        );
        let builder = self.http.get(url);

        run_cancellable(cancellation, async {
            let builder = authorize_optional(self.credentials.as_ref(), builder).await?;
            let subject = format!("public key for account {account_id}");
            let response = check_status(builder.send().await?, &subject).await?;
            let model: PublicKeyModel = response.json().await?;
            Ok::<_, FiksIoError>(model.key)
        })
        .await
    }
}

#[derive(Debug, Deserialize)]
struct AccountModel {
    #[serde(rename = "kontoId")]
    account_id: Uuid,
    #[serde(rename = "kontoNavn")]
    account_name: String,
    #[serde(rename = "fiksOrgId")]
    organization_id: Uuid,
    #[serde(rename = "fiksOrgNavn")]
    organization_name: String,
    #[serde(default)]
    status: AccountStatusModel,
}

#[derive(Debug, Default, Deserialize)]
struct AccountStatusModel {
    #[serde(rename = "gyldigAvsender", default)]
    valid_sender: bool,
    #[serde(rename = "gyldigMottaker", default)]
    valid_receiver: bool,
}

#[derive(Debug, Deserialize)]
struct PublicKeyModel {
    #[serde(rename = "nokkel")]
    key: String,
}

impl From<AccountModel> for Account {
    fn from(model: AccountModel) -> Self {
        Self {
            account_id: model.account_id,
            account_name: model.account_name,
            is_valid_sender: model.status.valid_sender,
            is_valid_receiver: model.status.valid_receiver,
            organization_id: model.organization_id,
            organization_name: model.organization_name,
        }
    }
}
