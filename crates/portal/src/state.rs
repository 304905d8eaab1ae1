//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use crate::config::PortalConfig;
use crate::identity::{IdentityClient, IdentityError, IdentityUser};
use crate::services::{ChatService, EntitlementService, JournalService, LiveService, PendingPayments};
use crate::storage::BlobStore;
use crate::stripe::{StripeClient, StripeError};

/// How long a resolved bearer token stays cached.
const USER_CACHE_TTL: Duration = Duration::from_secs(60);
const USER_CACHE_CAPACITY: u64 = 10_000;

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("identity client: {0}")]
    Identity(#[from] IdentityError),
    #[error("stripe client: {0}")]
    Stripe(#[from] StripeError),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: PortalConfig,
    store: BlobStore,
    identity: IdentityClient,
    stripe: Option<StripeClient>,
    entitlements: EntitlementService,
    chat: ChatService,
    journal: JournalService,
    live: LiveService,
    user_cache: Cache<String, IdentityUser>,
}

impl AppState {
    /// Create a new application state over `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if an API client cannot be built.
    pub fn new(config: PortalConfig, store: BlobStore) -> Result<Self, StateError> {
        let identity = IdentityClient::new(&config.identity)?;
        let stripe = config.stripe.as_ref().map(StripeClient::new).transpose()?;

        let entitlements = EntitlementService::new(
            identity.clone(),
            stripe.clone(),
            PendingPayments::new(store.clone()),
        );
        let chat = ChatService::new(store.clone());
        let journal = JournalService::new(store.clone(), config.utc_offset);
        let live = LiveService::new(store.clone());

        let user_cache = Cache::builder()
            .max_capacity(USER_CACHE_CAPACITY)
            .time_to_live(USER_CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                identity,
                stripe,
                entitlements,
                chat,
                journal,
                live,
                user_cache,
            }),
        })
    }

    /// Get a reference to the portal configuration.
    #[must_use]
    pub fn config(&self) -> &PortalConfig {
        &self.inner.config
    }

    /// Get a reference to the blob store.
    #[must_use]
    pub fn store(&self) -> &BlobStore {
        &self.inner.store
    }

    /// Get a reference to the identity client.
    #[must_use]
    pub fn identity(&self) -> &IdentityClient {
        &self.inner.identity
    }

    /// Get the Stripe client, when Stripe is configured.
    #[must_use]
    pub fn stripe(&self) -> Option<&StripeClient> {
        self.inner.stripe.as_ref()
    }

    #[must_use]
    pub fn entitlements(&self) -> &EntitlementService {
        &self.inner.entitlements
    }

    #[must_use]
    pub fn chat(&self) -> &ChatService {
        &self.inner.chat
    }

    #[must_use]
    pub fn journal(&self) -> &JournalService {
        &self.inner.journal
    }

    #[must_use]
    pub fn live(&self) -> &LiveService {
        &self.inner.live
    }

    /// Bearer token (hashed) to identity user, 60 s TTL.
    #[must_use]
    pub fn user_cache(&self) -> &Cache<String, IdentityUser> {
        &self.inner.user_cache
    }
}
