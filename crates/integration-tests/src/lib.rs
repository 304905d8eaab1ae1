//! Integration tests for the BookVision portal.
//!
//! Every test spawns the real portal router on an ephemeral port, backed by
//! the in-memory blob store, and points it at in-process mock identity and
//! Stripe servers. Nothing external is needed:
//!
//! ```bash
//! cargo test -p bookvision-integration-tests
//! ```
//!
//! The mocks record what the portal sent them so tests can assert on role
//! updates and lookups.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderName, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::get,
};
use bookvision_core::Email;
use bookvision_portal::{
    app::app,
    config::{
        IdentityConfig, LogFormat, PagBankConfig, PortalConfig, SentryConfig, StripeConfig,
    },
    services::PendingPayments,
    state::AppState,
    storage::BlobStore,
};
use chrono::{FixedOffset, Utc};
use hmac::{Hmac, Mac};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use tokio::net::TcpListener;

/// Admin token the mock identity service expects.
pub const IDENTITY_ADMIN_TOKEN: &str = "identity-admin-token-for-tests";
/// Stripe webhook signing secret.
pub const STRIPE_WEBHOOK_SECRET: &str = "whsec_integration_tests_3f9a";
/// Live-room admin account.
pub const ADMIN_EMAIL: &str = "admin@bookvision.com.br";

// =============================================================================
// Signatures
// =============================================================================

fn hmac_sha256(key: &[u8], message: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

/// A valid `Stripe-Signature` header for `body`, signed now.
#[must_use]
pub fn stripe_signature(body: &str) -> String {
    let timestamp = Utc::now().timestamp();
    let sig = hex::encode(hmac_sha256(
        STRIPE_WEBHOOK_SECRET.as_bytes(),
        format!("{timestamp}.{body}").as_bytes(),
    ));
    format!("t={timestamp},v1={sig}")
}

/// A valid PagBank `x-authenticity-token` for `body`.
#[must_use]
pub fn pagbank_signature(token: &str, body: &str) -> String {
    hex::encode(Sha256::digest(format!("{token}-{body}").as_bytes()))
}

/// A valid identity webhook JWT for `body`.
#[must_use]
pub fn identity_signature(secret: &str, body: &str) -> String {
    identity_signature_with(Algorithm::HS256, secret, body)
}

/// An identity webhook JWT for `body` signed with `alg`.
#[must_use]
pub fn identity_signature_with(alg: Algorithm, secret: &str, body: &str) -> String {
    let claims = json!({
        "exp": Utc::now().timestamp() + 300,
        "iss": "identity",
        "sha256": hex::encode(Sha256::digest(body.as_bytes())),
    });
    jsonwebtoken::encode(
        &Header::new(alg),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("Failed to sign identity webhook token")
}

// =============================================================================
// Servers
// =============================================================================

async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind ephemeral port");
    let addr = listener.local_addr().expect("Listener has no address");
    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("Test server error");
    });
    format!("http://{addr}")
}

// =============================================================================
// Mock identity service
// =============================================================================

/// A user known to the mock identity service.
#[derive(Debug, Clone)]
pub struct MockUser {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub roles: Vec<String>,
    /// Bearer token the browser would send.
    pub token: String,
}

impl MockUser {
    #[must_use]
    pub fn new(id: &str, email: &str, roles: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            email: email.to_string(),
            full_name: None,
            roles: roles.iter().map(ToString::to_string).collect(),
            token: format!("token-{id}"),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.full_name = Some(name.to_string());
        self
    }

    /// The user as the identity API returns it.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "aud": "",
            "email": self.email,
            "app_metadata": { "provider": "email", "roles": self.roles },
            "user_metadata": self
                .full_name
                .as_ref()
                .map_or_else(|| json!({}), |name| json!({ "full_name": name })),
        })
    }
}

#[derive(Debug, Default)]
struct IdentityData {
    users: Vec<MockUser>,
    role_updates: Vec<(String, Vec<String>)>,
    signups: Vec<Value>,
    lookups: usize,
    user_calls: usize,
    fail_admin: bool,
}

/// In-process stand-in for the identity service.
#[derive(Debug, Clone)]
pub struct MockIdentity {
    pub url: String,
    data: Arc<Mutex<IdentityData>>,
}

#[derive(Debug, Deserialize)]
struct EmailQuery {
    email: Option<String>,
}

fn admin_authorized(headers: &HeaderMap) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {IDENTITY_ADMIN_TOKEN}"))
}

fn identity_error(status: StatusCode, msg: &str) -> Response {
    (status, Json(json!({ "code": status.as_u16(), "msg": msg }))).into_response()
}

async fn identity_list_users(
    State(mock): State<MockIdentity>,
    headers: HeaderMap,
    Query(query): Query<EmailQuery>,
) -> Response {
    if !admin_authorized(&headers) {
        return identity_error(StatusCode::UNAUTHORIZED, "Invalid token");
    }
    let mut data = mock.lock();
    data.lookups += 1;
    if data.fail_admin {
        return identity_error(StatusCode::INTERNAL_SERVER_ERROR, "database unavailable");
    }
    let users: Vec<Value> = data
        .users
        .iter()
        .filter(|user| {
            query
                .email
                .as_deref()
                .is_none_or(|email| user.email.eq_ignore_ascii_case(email))
        })
        .map(MockUser::to_json)
        .collect();
    Json(json!({ "aud": "", "users": users })).into_response()
}

async fn identity_update_user(
    State(mock): State<MockIdentity>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if !admin_authorized(&headers) {
        return identity_error(StatusCode::UNAUTHORIZED, "Invalid token");
    }
    let roles: Vec<String> = body["app_metadata"]["roles"]
        .as_array()
        .map(|roles| {
            roles
                .iter()
                .filter_map(|r| r.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();

    let mut data = mock.lock();
    data.role_updates.push((id.clone(), roles.clone()));
    let Some(user) = data.users.iter_mut().find(|u| u.id == id) else {
        return identity_error(StatusCode::NOT_FOUND, "User not found");
    };
    user.roles = roles;
    Json(user.to_json()).into_response()
}

async fn identity_current_user(State(mock): State<MockIdentity>, headers: HeaderMap) -> Response {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default()
        .to_string();

    let mut data = mock.lock();
    data.user_calls += 1;
    data.users
        .iter()
        .find(|u| u.token == token)
        .map_or_else(
            || identity_error(StatusCode::UNAUTHORIZED, "Invalid JWT"),
            |user| Json(user.to_json()).into_response(),
        )
}

async fn identity_signup(State(mock): State<MockIdentity>, Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default().to_string();
    let mut data = mock.lock();
    data.signups.push(body.clone());

    if data.users.iter().any(|u| u.email.eq_ignore_ascii_case(&email)) {
        return identity_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "A user with this email address has already been registered",
        );
    }

    let id = format!("user-{}", data.users.len() + 1);
    let mut user = MockUser::new(&id, &email, &[]);
    user.full_name = body["data"]["full_name"].as_str().map(String::from);
    data.users.push(user.clone());
    Json(user.to_json()).into_response()
}

impl MockIdentity {
    /// Start a mock identity service.
    pub async fn start() -> Self {
        let data = Arc::new(Mutex::new(IdentityData::default()));
        let placeholder = Self {
            url: String::new(),
            data: Arc::clone(&data),
        };
        let router = Router::new()
            .route("/admin/users", get(identity_list_users))
            .route("/admin/users/{id}", axum::routing::put(identity_update_user))
            .route("/user", get(identity_current_user))
            .route("/signup", axum::routing::post(identity_signup))
            .with_state(placeholder);
        let url = serve(router).await;
        Self { url, data }
    }

    fn lock(&self) -> MutexGuard<'_, IdentityData> {
        self.data.lock().expect("mock identity state poisoned")
    }

    pub fn add_user(&self, user: MockUser) {
        self.lock().users.push(user);
    }

    /// Make every admin API call fail with 500.
    pub fn fail_admin_api(&self) {
        self.lock().fail_admin = true;
    }

    /// Current roles of the user with `id`.
    #[must_use]
    pub fn roles_of(&self, id: &str) -> Option<Vec<String>> {
        self.lock().users.iter().find(|u| u.id == id).map(|u| u.roles.clone())
    }

    /// Every `PUT /admin/users/{id}` received, in order.
    #[must_use]
    pub fn role_updates(&self) -> Vec<(String, Vec<String>)> {
        self.lock().role_updates.clone()
    }

    /// Every `POST /signup` body received.
    #[must_use]
    pub fn signups(&self) -> Vec<Value> {
        self.lock().signups.clone()
    }

    /// Number of `GET /admin/users` calls.
    #[must_use]
    pub fn lookups(&self) -> usize {
        self.lock().lookups
    }

    /// Number of `GET /user` calls.
    #[must_use]
    pub fn user_calls(&self) -> usize {
        self.lock().user_calls
    }
}

// =============================================================================
// Mock Stripe
// =============================================================================

#[derive(Debug, Default)]
struct StripeData {
    customers: HashMap<String, String>,
    active: HashSet<String>,
    requests: usize,
}

/// In-process stand-in for the Stripe API.
#[derive(Debug, Clone)]
pub struct MockStripe {
    pub url: String,
    data: Arc<Mutex<StripeData>>,
}

#[derive(Debug, Deserialize)]
struct StripeListQuery {
    email: Option<String>,
    customer: Option<String>,
}

fn stripe_list(data: Vec<Value>) -> Json<Value> {
    Json(json!({ "object": "list", "data": data, "has_more": false }))
}

async fn stripe_customers(
    State(mock): State<MockStripe>,
    Query(query): Query<StripeListQuery>,
) -> Json<Value> {
    let mut data = mock.lock();
    data.requests += 1;
    let found = data
        .customers
        .iter()
        .filter(|(_, email)| {
            query
                .email
                .as_deref()
                .is_some_and(|q| email.eq_ignore_ascii_case(q))
        })
        .map(|(id, email)| json!({ "id": id, "object": "customer", "email": email }))
        .take(1)
        .collect();
    stripe_list(found)
}

async fn stripe_customer(State(mock): State<MockStripe>, Path(id): Path<String>) -> Response {
    let mut data = mock.lock();
    data.requests += 1;
    data.customers.get(&id).map_or_else(
        || {
            (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": { "message": format!("No such customer: '{id}'") } })),
            )
                .into_response()
        },
        |email| Json(json!({ "id": id, "object": "customer", "email": email })).into_response(),
    )
}

async fn stripe_subscriptions(
    State(mock): State<MockStripe>,
    Query(query): Query<StripeListQuery>,
) -> Json<Value> {
    let mut data = mock.lock();
    data.requests += 1;
    let active = query
        .customer
        .as_ref()
        .is_some_and(|customer| data.active.contains(customer));
    if active {
        stripe_list(vec![json!({ "id": "sub_active", "status": "active" })])
    } else {
        stripe_list(Vec::new())
    }
}

impl MockStripe {
    /// Start a mock Stripe API.
    pub async fn start() -> Self {
        let data = Arc::new(Mutex::new(StripeData::default()));
        let placeholder = Self {
            url: String::new(),
            data: Arc::clone(&data),
        };
        let router = Router::new()
            .route("/v1/customers", get(stripe_customers))
            .route("/v1/customers/{id}", get(stripe_customer))
            .route("/v1/subscriptions", get(stripe_subscriptions))
            .with_state(placeholder);
        let url = serve(router).await;
        Self { url, data }
    }

    fn lock(&self) -> MutexGuard<'_, StripeData> {
        self.data.lock().expect("mock stripe state poisoned")
    }

    pub fn add_customer(&self, id: &str, email: &str, active: bool) {
        let mut data = self.lock();
        data.customers.insert(id.to_string(), email.to_string());
        if active {
            data.active.insert(id.to_string());
        }
    }

    /// Number of Stripe API calls received.
    #[must_use]
    pub fn requests(&self) -> usize {
        self.lock().requests
    }
}

// =============================================================================
// Portal
// =============================================================================

/// Knobs for [`TestPortal::start_with`].
#[derive(Debug, Clone)]
pub struct PortalOptions {
    pub stripe: bool,
    pub pagbank_token: Option<String>,
    pub identity_webhook_secret: Option<String>,
    pub admin_email: Option<String>,
    /// Lowercase proxy header trusted for the client IP.
    pub client_ip_header: Option<&'static str>,
}

impl Default for PortalOptions {
    fn default() -> Self {
        Self {
            stripe: true,
            pagbank_token: None,
            identity_webhook_secret: None,
            admin_email: Some(ADMIN_EMAIL.to_string()),
            client_ip_header: None,
        }
    }
}

/// A running portal plus its mocks.
pub struct TestPortal {
    pub url: String,
    pub client: reqwest::Client,
    pub identity: MockIdentity,
    pub stripe: MockStripe,
    pub store: BlobStore,
}

impl TestPortal {
    /// Start a portal with default options (Stripe on, no PagBank token).
    pub async fn start() -> Self {
        Self::start_with(PortalOptions::default()).await
    }

    /// Start a portal with `options`.
    pub async fn start_with(options: PortalOptions) -> Self {
        let identity = MockIdentity::start().await;
        let stripe = MockStripe::start().await;

        let config = PortalConfig {
            host: [127, 0, 0, 1].into(),
            port: 0,
            database_url: None,
            site_url: Some("https://bookvision.com.br".to_string()),
            admin_email: options
                .admin_email
                .map(|email| Email::parse(&email).expect("valid admin email")),
            utc_offset: FixedOffset::west_opt(3 * 3600).expect("valid offset"),
            client_ip_header: options.client_ip_header.map(HeaderName::from_static),
            identity: IdentityConfig {
                url: url::Url::parse(&identity.url).expect("valid mock URL"),
                admin_token: SecretString::from(IDENTITY_ADMIN_TOKEN),
                webhook_secret: options.identity_webhook_secret.map(SecretString::from),
            },
            stripe: options.stripe.then(|| StripeConfig {
                secret_key: SecretString::from("sk_test_integration"),
                webhook_secret: SecretString::from(STRIPE_WEBHOOK_SECRET),
                api_base: stripe.url.clone(),
            }),
            pagbank: PagBankConfig {
                token: options.pagbank_token.map(SecretString::from),
            },
            sentry: SentryConfig::default(),
            log_format: LogFormat::Pretty,
        };

        let store = BlobStore::memory();
        let state = AppState::new(config, store.clone()).expect("Failed to build state");
        let url = serve(app(state)).await;

        Self {
            url,
            client: reqwest::Client::new(),
            identity,
            stripe,
            store,
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.url)
    }

    /// Pending payments in the portal's store.
    #[must_use]
    pub fn pending(&self) -> PendingPayments {
        PendingPayments::new(self.store.clone())
    }

    /// POST a signed Stripe event.
    pub async fn send_stripe_event(&self, event: &Value) -> reqwest::Response {
        let body = event.to_string();
        self.client
            .post(self.url("/webhooks/stripe"))
            .header("stripe-signature", stripe_signature(&body))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .expect("Failed to send Stripe event")
    }

    /// POST a PagBank notification, signed when `token` is given.
    pub async fn send_pagbank(&self, notification: &Value, token: Option<&str>) -> reqwest::Response {
        let body = notification.to_string();
        let mut request = self
            .client
            .post(self.url("/webhooks/pagbank"))
            .header("content-type", "application/json");
        if let Some(token) = token {
            request = request.header("x-authenticity-token", pagbank_signature(token, &body));
        }
        request
            .body(body)
            .send()
            .await
            .expect("Failed to send PagBank notification")
    }

    /// GET `path` as `user`.
    pub async fn get_as(&self, user: &MockUser, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(&user.token)
            .send()
            .await
            .expect("Request failed")
    }
}

/// A Stripe event envelope.
#[must_use]
pub fn stripe_event(event_type: &str, object: Value) -> Value {
    json!({
        "id": format!("evt_{}", event_type.replace('.', "_")),
        "object": "event",
        "type": event_type,
        "data": { "object": object },
    })
}

/// A PagBank order notification.
#[must_use]
pub fn pagbank_notification(status: &str, email: &str) -> Value {
    json!({
        "id": "ORDE_1A2B3C",
        "customer": { "name": "Cliente", "email": email },
        "charges": [{ "id": "CHAR_1", "status": status }],
    })
}
