use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use fiks_io_client::auth::{MaskinportenSettings, MaskinportenTokenSource};
use fiks_io_client::{
    FiksIoClient, HttpCatalogHandler, HttpSendHandler, IntegrationCredentials, PayloadSealer,
    RedisSubscriptionHandler,
};
use fiks_io_config::{AuthConfig, FiksIoConfig};
use tracing::info;

pub mod telemetry {
    use anyhow::Result;
    use tracing::Level;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_max_level(Level::TRACE)
            .with_env_filter(env_filter)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

/// A ready client plus the pieces it was assembled from.
#[derive(Clone)]
pub struct ClientServices {
    pub client: FiksIoClient,
    pub catalog: Arc<HttpCatalogHandler>,
    pub credentials: Option<IntegrationCredentials>,
}

impl ClientServices {
    pub async fn initialise(config: &FiksIoConfig, sealer: Arc<dyn PayloadSealer>) -> Result<Self> {
        let account_id = config
            .account
            .account_id
            .context("account.account_id is required")?;

        let credentials = match &config.auth {
            Some(auth) => Some(
                integration_credentials(auth)
                    .await
                    .context("failed to configure authentication")?,
            ),
            None => {
                info!("no auth configured, requests will be unauthenticated");
                None
            }
        };

        let mut catalog = HttpCatalogHandler::new(
            config.catalog.base_url.clone(),
            Duration::from_secs(config.catalog.request_timeout_seconds),
        )
        .context("failed to build catalog client")?;
        if let Some(credentials) = &credentials {
            catalog = catalog.with_credentials(credentials.clone());
        }
        let catalog = Arc::new(catalog);

        let mut sender = HttpSendHandler::new(
            config.send.base_url.clone(),
            Duration::from_secs(config.send.request_timeout_seconds),
            catalog.clone(),
            sealer,
        )
        .context("failed to build send client")?;
        if let Some(credentials) = &credentials {
            sender = sender.with_credentials(credentials.clone());
        }

        let mut subscriptions = RedisSubscriptionHandler::new(&config.subscription.url, account_id)
            .context("invalid subscription url")?;
        if let Some(queue) = &config.subscription.queue {
            subscriptions = subscriptions.with_queue(queue.clone());
        }

        let client = FiksIoClient::builder(account_id)
            .catalog(catalog.clone())
            .sender(Arc::new(sender))
            .subscriptions(Arc::new(subscriptions))
            .credentials(credentials.clone())
            .default_ttl(Duration::from_secs(config.account.default_ttl_seconds))
            .build()
            .context("failed to assemble fiks io client")?;

        info!(
            %account_id,
            authenticated = client.is_authenticated(),
            catalog = %config.catalog.base_url,
            "fiks io client ready"
        );

        Ok(Self {
            client,
            catalog,
            credentials,
        })
    }
}

async fn integration_credentials(auth: &AuthConfig) -> Result<IntegrationCredentials> {
    let maskinporten = &auth.maskinporten;
    let private_key = tokio::fs::read(&maskinporten.private_key_pem_path)
        .await
        .with_context(|| {
            format!(
                "failed to read maskinporten private key {}",
                maskinporten.private_key_pem_path.display()
            )
        })?;

    let settings = MaskinportenSettings {
        token_endpoint: maskinporten.token_endpoint.clone(),
        audience: maskinporten.audience.clone(),
        issuer: maskinporten.issuer.clone(),
        scope: maskinporten.scope.clone(),
        grant_lifetime: Duration::from_secs(maskinporten.token_lifetime_seconds),
        request_timeout: Duration::from_secs(30),
    };
    let token_source = MaskinportenTokenSource::new(settings, &private_key)
        .context("invalid maskinporten private key")?;

    Ok(IntegrationCredentials::new(
        auth.integration_id,
        auth.integration_password.clone(),
        Arc::new(token_source),
    ))
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
