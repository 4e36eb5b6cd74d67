//! The account-scoped façade over the catalog, send and subscription collaborators.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::IntegrationCredentials;
use crate::cancellation::{ensure_not_canceled, CancellationToken};
use crate::catalog::CatalogHandler;
use crate::error::{FiksIoError, FiksIoResult};
use crate::models::{Account, LookupRequest, ReceivedMessage, SendRequest, SentMessage};
use crate::payload::{self, SendInput};
use crate::send::SendHandler;
use crate::subscription::{
    noop_canceled_handler, ConsumerCanceledHandler, MessageReceivedHandler, SubscriptionHandle,
    SubscriptionHandler,
};

/// Two days, the send service's own default time-to-live.
pub const DEFAULT_TTL: Duration = Duration::from_secs(2 * 24 * 60 * 60);

/// The collaborators a client is composed of.
#[derive(Clone)]
pub struct FiksIoCollaborators {
    pub catalog: Arc<dyn CatalogHandler>,
    pub sender: Arc<dyn SendHandler>,
    pub subscriptions: Arc<dyn SubscriptionHandler>,
}

/// Client for one Fiks IO account.
///
/// Holds no mutable state; every call is delegated to a collaborator shared
/// by all concurrent calls. Collaborator failures are passed through as-is.
#[derive(Clone)]
pub struct FiksIoClient {
    account_id: Uuid,
    catalog: Arc<dyn CatalogHandler>,
    sender: Arc<dyn SendHandler>,
    subscriptions: Arc<dyn SubscriptionHandler>,
    credentials: Option<IntegrationCredentials>,
    default_ttl: Duration,
}

impl FiksIoClient {
    /// Unauthenticated client with the default time-to-live.
    pub fn new(account_id: Uuid, collaborators: FiksIoCollaborators) -> FiksIoResult<Self> {
        Self::builder(account_id)
            .catalog(collaborators.catalog)
            .sender(collaborators.sender)
            .subscriptions(collaborators.subscriptions)
            .build()
    }

    pub fn builder(account_id: Uuid) -> FiksIoClientBuilder {
        FiksIoClientBuilder::new(account_id)
    }

    /// The owning account; fixed for the lifetime of the client.
    pub fn account_id(&self) -> Uuid {
        self.account_id
    }

    /// Whether integration credentials were supplied at construction.
    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub async fn lookup(&self, request: &LookupRequest) -> FiksIoResult<Account> {
        self.lookup_with_cancellation(request, &CancellationToken::new())
            .await
    }

    pub async fn lookup_with_cancellation(
        &self,
        request: &LookupRequest,
        cancellation: &CancellationToken,
    ) -> FiksIoResult<Account> {
        ensure_not_canceled(cancellation)?;
        request.validate()?;

        debug!(
            account_id = %self.account_id,
            identifier = request.identifier(),
            "looking up account"
        );
        self.catalog.lookup(request, cancellation).await
    }

    /// The receiver key the send path encrypts with.
    pub async fn public_key(&self, account_id: Uuid) -> FiksIoResult<String> {
        self.public_key_with_cancellation(account_id, &CancellationToken::new())
            .await
    }

    pub async fn public_key_with_cancellation(
        &self,
        account_id: Uuid,
        cancellation: &CancellationToken,
    ) -> FiksIoResult<String> {
        ensure_not_canceled(cancellation)?;
        self.catalog.public_key(account_id, cancellation).await
    }

    /// Send with a token that is never canceled.
    pub async fn send(
        &self,
        request: &SendRequest,
        input: impl Into<SendInput>,
    ) -> FiksIoResult<SentMessage> {
        self.send_with_cancellation(request, input, &CancellationToken::new())
            .await
    }

    pub async fn send_with_cancellation(
        &self,
        request: &SendRequest,
        input: impl Into<SendInput>,
        cancellation: &CancellationToken,
    ) -> FiksIoResult<SentMessage> {
        ensure_not_canceled(cancellation)?;
        request.validate_for(self.account_id)?;

        let payloads = payload::normalize(input.into()).await?;
        debug!(
            receiver = %request.receiver_account_id(),
            message_type = request.message_type(),
            payload_count = payloads.len(),
            authenticated = self.is_authenticated(),
            "sending message"
        );

        self.sender.send(request, payloads, cancellation).await
    }

    /// Answer `received`, addressing its sender and referencing its message id.
    pub async fn reply(
        &self,
        received: &ReceivedMessage,
        message_type: impl Into<String>,
        input: impl Into<SendInput>,
    ) -> FiksIoResult<SentMessage> {
        self.reply_with_cancellation(received, message_type, input, &CancellationToken::new())
            .await
    }

    pub async fn reply_with_cancellation(
        &self,
        received: &ReceivedMessage,
        message_type: impl Into<String>,
        input: impl Into<SendInput>,
        cancellation: &CancellationToken,
    ) -> FiksIoResult<SentMessage> {
        ensure_not_canceled(cancellation)?;
        let metadata = &received.metadata;
        if metadata.receiver_account_id != self.account_id {
            return Err(FiksIoError::invalid_request(format!(
                "message {} was addressed to account {}, not {}",
                metadata.message_id, metadata.receiver_account_id, self.account_id
            )));
        }

        let request = SendRequest::new(
            self.account_id,
            metadata.sender_account_id,
            message_type,
            self.default_ttl,
        )
        .in_reply_to(metadata.message_id);

        self.send_with_cancellation(&request, input, cancellation)
            .await
    }

    /// Subscribe with the default no-op cancellation handler.
    pub async fn new_subscription(
        &self,
        on_received: MessageReceivedHandler,
    ) -> FiksIoResult<SubscriptionHandle> {
        self.new_subscription_with_cancel_handler(on_received, noop_canceled_handler())
            .await
    }

    pub async fn new_subscription_with_cancel_handler(
        &self,
        on_received: MessageReceivedHandler,
        on_canceled: ConsumerCanceledHandler,
    ) -> FiksIoResult<SubscriptionHandle> {
        let handle = self
            .subscriptions
            .add_message_received_handler(on_received, on_canceled)
            .await?;

        info!(
            account_id = %self.account_id,
            consumer_tag = handle.consumer_tag(),
            "subscription started"
        );
        Ok(handle)
    }
}

impl fmt::Debug for FiksIoClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FiksIoClient")
            .field("account_id", &self.account_id)
            .field("credentials", &self.credentials)
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

/// Piecewise construction of a [`FiksIoClient`].
pub struct FiksIoClientBuilder {
    account_id: Uuid,
    catalog: Option<Arc<dyn CatalogHandler>>,
    sender: Option<Arc<dyn SendHandler>>,
    subscriptions: Option<Arc<dyn SubscriptionHandler>>,
    credentials: Option<IntegrationCredentials>,
    default_ttl: Duration,
}

impl FiksIoClientBuilder {
    fn new(account_id: Uuid) -> Self {
        Self {
            account_id,
            catalog: None,
            sender: None,
            subscriptions: None,
            credentials: None,
            default_ttl: DEFAULT_TTL,
        }
    }

    pub fn catalog(mut self, catalog: Arc<dyn CatalogHandler>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn sender(mut self, sender: Arc<dyn SendHandler>) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn subscriptions(mut self, subscriptions: Arc<dyn SubscriptionHandler>) -> Self {
        self.subscriptions = Some(subscriptions);
        self
    }

    pub fn credentials(mut self, credentials: Option<IntegrationCredentials>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn build(self) -> FiksIoResult<FiksIoClient> {
        if self.account_id.is_nil() {
            return Err(FiksIoError::configuration("account id must not be nil"));
        }
        if self.default_ttl.is_zero() {
            return Err(FiksIoError::configuration("default time-to-live must be positive"));
        }

        let catalog = self
            .catalog
            .ok_or_else(|| FiksIoError::configuration("catalog collaborator is required"))?;
        let sender = self
            .sender
            .ok_or_else(|| FiksIoError::configuration("send collaborator is required"))?;
        let subscriptions = self
            .subscriptions
            .ok_or_else(|| FiksIoError::configuration("subscription collaborator is required"))?;

        Ok(FiksIoClient {
            account_id: self.account_id,
            catalog,
            sender,
            subscriptions,
            credentials: self.credentials,
            default_ttl: self.default_ttl,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenSource;
    use crate::catalog::MockCatalogHandler;
    use crate::payload::PayloadItem;
    use crate::send::MockSendHandler;
    use crate::subscription::{canceled_handler, message_handler, MockSubscriptionHandler};

    fn client_with(
        account_id: Uuid,
        catalog: MockCatalogHandler,
        sender: MockSendHandler,
        subscriptions: MockSubscriptionHandler,
    ) -> FiksIoClient {
        FiksIoClient::new(
            account_id,
            FiksIoCollaborators {
                catalog: Arc::new(catalog),
                sender: Arc::new(sender),
                subscriptions: Arc::new(subscriptions),
            },
        )
        .expect("valid client")
    }

    fn sent_message(request: &SendRequest) -> SentMessage {
        SentMessage {
            message_id: Uuid::new_v4(),
            correlation_id: None,
            external_reference: Uuid::new_v4().to_string(),
            message_type: request.message_type().to_string(),
            sender_account_id: request.sender_account_id(),
            receiver_account_id: request.receiver_account_id(),
            ttl: request.ttl(),
            headers: None,
        }
    }

    #[test]
    fn account_id_matches_construction_value() {
        let account_id = Uuid::new_v4();
        let client = client_with(
            account_id,
            MockCatalogHandler::new(),
            MockSendHandler::new(),
            MockSubscriptionHandler::new(),
        );
        assert_eq!(client.account_id(), account_id);
        assert!(!client.is_authenticated());
    }

    #[tokio::test]
    async fn lookup_forwards_exact_request() {
        let expected = LookupRequest::new("testIdentifier", "testType", 3);
        let forwarded = expected.clone();

        let mut catalog = MockCatalogHandler::new();
        catalog
            .expect_lookup()
            .withf(move |request, _| *request == forwarded)
            .times(1)
            .returning(|_, _| {
                Ok(Account {
                    account_id: Uuid::nil(),
                    account_name: String::new(),
                    is_valid_sender: false,
                    is_valid_receiver: false,
                    organization_id: Uuid::nil(),
                    organization_name: String::new(),
                })
            });

        let client = client_with(
            Uuid::new_v4(),
            catalog,
            MockSendHandler::new(),
            MockSubscriptionHandler::new(),
        );
        client.lookup(&expected).await.expect("lookup succeeds");
    }

    #[tokio::test]
    async fn lookup_rejects_invalid_request_without_calling_catalog() {
        let mut catalog = MockCatalogHandler::new();
        catalog.expect_lookup().times(0);

        let client = client_with(
            Uuid::new_v4(),
            catalog,
            MockSendHandler::new(),
            MockSubscriptionHandler::new(),
        );
        let err = client
            .lookup(&LookupRequest::new("", "testType", 3))
            .await
            .expect_err("invalid request");
        assert!(matches!(err, FiksIoError::InvalidRequest { .. }));
    }

    #[tokio::test]
    async fn lookup_passes_not_found_through() {
        let mut catalog = MockCatalogHandler::new();
        catalog
            .expect_lookup()
            .returning(|_, _| Err(FiksIoError::not_found("account lookup")));

        let client = client_with(
            Uuid::new_v4(),
            catalog,
            MockSendHandler::new(),
            MockSubscriptionHandler::new(),
        );
        let err = client
            .lookup(&LookupRequest::new("id", "type", 1))
            .await
            .expect_err("not found");
        assert!(matches!(err, FiksIoError::NotFound { .. }));
    }

    #[tokio::test]
    async fn send_with_triggered_token_never_reaches_sender() {
        let account_id = Uuid::new_v4();
        let mut sender = MockSendHandler::new();
        sender.expect_send().times(0);

        let client = client_with(
            account_id,
            MockCatalogHandler::new(),
            sender,
            MockSubscriptionHandler::new(),
        );
        let request = SendRequest::new(account_id, Uuid::new_v4(), "type", DEFAULT_TTL);
        let token = CancellationToken::new();
        token.cancel();

        let err = client
            .send_with_cancellation(&request, SendInput::none(), &token)
            .await
            .expect_err("canceled");
        assert!(err.is_canceled());
    }

    #[tokio::test]
    async fn send_with_empty_list_calls_sender_with_zero_payloads() {
        let account_id = Uuid::new_v4();
        let mut sender = MockSendHandler::new();
        sender
            .expect_send()
            .withf(|_, payloads, _| payloads.is_empty())
            .times(1)
            .returning(|request, _, _| Ok(sent_message(request)));

        let client = client_with(
            account_id,
            MockCatalogHandler::new(),
            sender,
            MockSubscriptionHandler::new(),
        );
        let request = SendRequest::new(account_id, Uuid::new_v4(), "type", DEFAULT_TTL);
        client
            .send(&request, Vec::<PayloadItem>::new())
            .await
            .expect("empty send succeeds");
    }

    #[tokio::test]
    async fn send_rejects_foreign_sender_locally() {
        let mut sender = MockSendHandler::new();
        sender.expect_send().times(0);

        let client = client_with(
            Uuid::new_v4(),
            MockCatalogHandler::new(),
            sender,
            MockSubscriptionHandler::new(),
        );
        let request = SendRequest::new(Uuid::new_v4(), Uuid::new_v4(), "type", DEFAULT_TTL);
        let err = client
            .send(&request, SendInput::text("x", "x.txt"))
            .await
            .expect_err("foreign sender");
        assert!(matches!(err, FiksIoError::InvalidRequest { .. }));
    }

    #[tokio::test]
    async fn new_subscription_supplies_default_cancel_handler() {
        let on_received = message_handler(|_message| async { Ok(()) });
        let expected = on_received.clone();

        let mut subscriptions = MockSubscriptionHandler::new();
        subscriptions
            .expect_add_message_received_handler()
            .withf(move |received, _| Arc::ptr_eq(received, &expected))
            .times(1)
            .returning(|received, canceled| Ok(SubscriptionHandle::new("tag", received, canceled)));

        let client = client_with(
            Uuid::new_v4(),
            MockCatalogHandler::new(),
            MockSendHandler::new(),
            subscriptions,
        );
        let handle = client
            .new_subscription(on_received)
            .await
            .expect("subscription registers");

        let event = crate::models::ConsumerCanceled::new(
            "tag",
            crate::models::CancelReason::ConnectionClosed,
        );
        assert!((handle.canceled_handler())(event).await.is_ok());
    }

    #[tokio::test]
    async fn new_subscription_passes_both_handlers_verbatim() {
        let on_received = message_handler(|_message| async { Ok(()) });
        let on_canceled = canceled_handler(|_event| async { Ok(()) });
        let expected_received = on_received.clone();
        let expected_canceled = on_canceled.clone();

        let mut subscriptions = MockSubscriptionHandler::new();
        subscriptions
            .expect_add_message_received_handler()
            .withf(move |received, canceled| {
                Arc::ptr_eq(received, &expected_received) && Arc::ptr_eq(canceled, &expected_canceled)
            })
            .times(1)
            .returning(|received, canceled| Ok(SubscriptionHandle::new("tag", received, canceled)));

        let client = client_with(
            Uuid::new_v4(),
            MockCatalogHandler::new(),
            MockSendHandler::new(),
            subscriptions,
        );
        let handle = client
            .new_subscription_with_cancel_handler(on_received.clone(), on_canceled.clone())
            .await
            .expect("subscription registers");

        assert!(Arc::ptr_eq(handle.message_received_handler(), &on_received));
        assert!(Arc::ptr_eq(handle.canceled_handler(), &on_canceled));
    }

    #[test]
    fn builder_requires_every_collaborator() {
        let err = FiksIoClient::builder(Uuid::new_v4())
            .catalog(Arc::new(MockCatalogHandler::new()))
            .build()
            .expect_err("sender missing");
        assert!(matches!(err, FiksIoError::Configuration { .. }));
    }

    #[test]
    fn builder_records_credentials() {
        let credentials = IntegrationCredentials::new(
            Uuid::new_v4(),
            "password",
            Arc::new(StaticTokenSource::new("token")),
        );
        let client = FiksIoClient::builder(Uuid::new_v4())
            .catalog(Arc::new(MockCatalogHandler::new()))
            .sender(Arc::new(MockSendHandler::new()))
            .subscriptions(Arc::new(MockSubscriptionHandler::new()))
            .credentials(Some(credentials))
            .default_ttl(Duration::from_secs(60))
            .build()
            .expect("client builds");

        assert!(client.is_authenticated());
        assert_eq!(client.default_ttl(), Duration::from_secs(60));
    }

    #[test]
    fn new_rejects_nil_account_id() {
        let result = FiksIoClient::new(
            Uuid::nil(),
            FiksIoCollaborators {
                catalog: Arc::new(MockCatalogHandler::new()),
                sender: Arc::new(MockSendHandler::new()),
                subscriptions: Arc::new(MockSubscriptionHandler::new()),
            },
        );
        assert!(matches!(result, Err(FiksIoError::Configuration { .. })));
    }

    #[tokio::test]
    async fn public_key_with_triggered_token_never_reaches_catalog() {
        let mut catalog = MockCatalogHandler::new();
        catalog.expect_public_key().times(0);

        let client = client_with(
            Uuid::new_v4(),
            catalog,
            MockSendHandler::new(),
            MockSubscriptionHandler::new(),
        );
        let token = CancellationToken::new();
        token.cancel();

        let err = client
            .public_key_with_cancellation(Uuid::new_v4(), &token)
            .await
            .expect_err("canceled");
        assert!(err.is_canceled());
    }

    #[tokio::test]
    async fn reply_with_triggered_token_never_reaches_sender() {
        let account_id = Uuid::new_v4();
        let mut sender = MockSendHandler::new();
        sender.expect_send().times(0);

        let client = client_with(
            account_id,
            MockCatalogHandler::new(),
            sender,
            MockSubscriptionHandler::new(),
        );
        let received = ReceivedMessage::new(
            crate::models::MessageMetadata {
                message_id: Uuid::new_v4(),
                message_type: "no.ks.fiks.request".to_string(),
                sender_account_id: Uuid::new_v4(),
                receiver_account_id: account_id,
                ttl: DEFAULT_TTL,
                in_reply_to: None,
                headers: None,
                resent: false,
            },
            bytes::Bytes::new(),
        );
        let token = CancellationToken::new();
        token.cancel();

        let err = client
            .reply_with_cancellation(&received, "no.ks.fiks.response", SendInput::none(), &token)
            .await
            .expect_err("canceled");
        assert!(err.is_canceled());
    }
}
