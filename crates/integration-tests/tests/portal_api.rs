//! Portal JSON API: auth, chat, live video, trade journal, storage, signup.

use bookvision_integration_tests::{ADMIN_EMAIL, MockUser, PortalOptions, TestPortal};
use reqwest::StatusCode;
use serde_json::{Value, json};

fn subscriber() -> MockUser {
    MockUser::new("sub-1", "ana@example.com", &["Assinante"]).with_name("Ana Souza")
}

fn member() -> MockUser {
    MockUser::new("mem-1", "bruno@example.com", &[])
}

fn admin() -> MockUser {
    MockUser::new("adm-1", ADMIN_EMAIL, &["Assinante"])
}

async fn portal_with_users() -> TestPortal {
    let portal = TestPortal::start().await;
    portal.identity.add_user(subscriber());
    portal.identity.add_user(member());
    portal.identity.add_user(admin());
    portal
}

async fn json_body(response: reqwest::Response) -> Value {
    response.json().await.expect("JSON body")
}

// =============================================================================
// Health & public endpoints
// =============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let portal = TestPortal::start().await;

    let live = portal.client.get(portal.url("/health")).send().await.expect("request");
    assert_eq!(live.status(), StatusCode::OK);
    assert_eq!(live.text().await.expect("body"), "ok");

    let ready = portal
        .client
        .get(portal.url("/health/ready"))
        .send()
        .await
        .expect("request");
    assert_eq!(ready.status(), StatusCode::OK);
    assert_eq!(json_body(ready).await["storage"], "memory");
}

#[tokio::test]
async fn test_portal_config() {
    let portal = TestPortal::start().await;

    let response = portal
        .client
        .get(portal.url("/api/portal-config"))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["chat_poll_ms"], 3000);
    assert_eq!(body["live_poll_ms"], 10000);
    assert!(
        body["identity_url"]
            .as_str()
            .is_some_and(|url| url.starts_with(&portal.identity.url))
    );
}

#[tokio::test]
async fn test_security_headers_and_request_id() {
    let portal = TestPortal::start().await;

    let response = portal.client.get(portal.url("/health")).send().await.expect("request");
    assert_eq!(
        response.headers().get("x-content-type-options").and_then(|v| v.to_str().ok()),
        Some("nosniff")
    );
    assert!(response.headers().contains_key("x-request-id"));
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn test_me_requires_token() {
    let portal = portal_with_users().await;

    let anonymous = portal.client.get(portal.url("/api/me")).send().await.expect("request");
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let bad = portal
        .client
        .get(portal.url("/api/me"))
        .bearer_auth("not-a-token")
        .send()
        .await
        .expect("request");
    assert_eq!(bad.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_reports_flags() {
    let portal = portal_with_users().await;

    let body = json_body(portal.get_as(&subscriber(), "/api/me").await).await;
    assert_eq!(body["id"], "sub-1");
    assert_eq!(body["name"], "Ana Souza");
    assert_eq!(body["subscriber"], true);
    assert_eq!(body["admin"], false);

    let body = json_body(portal.get_as(&admin(), "/api/me").await).await;
    assert_eq!(body["admin"], true);
    assert_eq!(body["name"], "admin");
}

#[tokio::test]
async fn test_tokens_are_cached() {
    let portal = portal_with_users().await;

    for _ in 0..3 {
        let response = portal.get_as(&subscriber(), "/api/me").await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(portal.identity.user_calls(), 1);
}

#[tokio::test]
async fn test_non_subscriber_is_forbidden() {
    let portal = portal_with_users().await;

    for path in ["/api/chat", "/api/live", "/api/trades", "/api/storage"] {
        let response = portal.get_as(&member(), path).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{path}");
    }
    let body = json_body(portal.get_as(&member(), "/api/chat").await).await;
    assert_eq!(body["error"], "Assinatura necessária para acessar este conteúdo");
}

// =============================================================================
// Chat
// =============================================================================

#[tokio::test]
async fn test_chat_post_and_poll() {
    let portal = portal_with_users().await;
    let user = subscriber();

    let first = portal
        .client
        .post(portal.url("/api/chat"))
        .bearer_auth(&user.token)
        .json(&json!({ "text": "  Bom dia!  " }))
        .send()
        .await
        .expect("request");
    assert_eq!(first.status(), StatusCode::CREATED);
    let first = json_body(first).await;
    assert_eq!(first["user"], "Ana Souza");
    assert_eq!(first["text"], "Bom dia!");
    let since = first["timestamp"].as_i64().expect("timestamp");

    let body = json_body(portal.get_as(&user, "/api/chat").await).await;
    assert_eq!(body["messages"].as_array().map(Vec::len), Some(1));

    let body = json_body(portal.get_as(&user, &format!("/api/chat?since={since}")).await).await;
    assert_eq!(body["messages"], json!([]));
}

async fn post_chat_from(portal: &TestPortal, header: &str, ip: &str) -> StatusCode {
    portal
        .client
        .post(portal.url("/api/chat"))
        .bearer_auth(&subscriber().token)
        .header(header, ip)
        .json(&json!({ "text": "oi" }))
        .send()
        .await
        .expect("request")
        .status()
}

#[tokio::test]
async fn test_write_limit_ignores_forged_client_ip() {
    let portal = portal_with_users().await;

    let mut limited = false;
    for i in 0..25 {
        let status = post_chat_from(&portal, "x-forwarded-for", &format!("198.51.100.{i}")).await;
        limited |= status == StatusCode::TOO_MANY_REQUESTS;
    }
    assert!(limited);
}

#[tokio::test]
async fn test_write_limit_keys_on_trusted_header() {
    let portal = TestPortal::start_with(PortalOptions {
        client_ip_header: Some("x-nf-client-connection-ip"),
        ..PortalOptions::default()
    })
    .await;
    portal.identity.add_user(subscriber());

    let mut limited = false;
    for _ in 0..25 {
        let status = post_chat_from(&portal, "x-nf-client-connection-ip", "203.0.113.7").await;
        limited |= status == StatusCode::TOO_MANY_REQUESTS;
    }
    assert!(limited);

    let other = post_chat_from(&portal, "x-nf-client-connection-ip", "203.0.113.8").await;
    assert_eq!(other, StatusCode::CREATED);
}

#[tokio::test]
async fn test_chat_rejects_blank_text() {
    let portal = portal_with_users().await;

    let response = portal
        .client
        .post(portal.url("/api/chat"))
        .bearer_auth(&subscriber().token)
        .json(&json!({ "text": "   " }))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Live video
// =============================================================================

#[tokio::test]
async fn test_admin_sets_and_clears_live_video() {
    let portal = portal_with_users().await;

    let body = json_body(portal.get_as(&subscriber(), "/api/live").await).await;
    assert_eq!(body["video_id"], Value::Null);

    let set = portal
        .client
        .put(portal.url("/api/live"))
        .bearer_auth(&admin().token)
        .json(&json!({ "video_id": "https://www.youtube.com/watch?v=dQw4w9WgXcQ" }))
        .send()
        .await
        .expect("request");
    assert_eq!(set.status(), StatusCode::OK);

    let body = json_body(portal.get_as(&subscriber(), "/api/live").await).await;
    assert_eq!(body["video_id"], "dQw4w9WgXcQ");

    let cleared = portal
        .client
        .delete(portal.url("/api/live"))
        .bearer_auth(&admin().token)
        .send()
        .await
        .expect("request");
    assert_eq!(cleared.status(), StatusCode::NO_CONTENT);

    let body = json_body(portal.get_as(&subscriber(), "/api/live").await).await;
    assert_eq!(body["video_id"], Value::Null);
}

#[tokio::test]
async fn test_only_admin_sets_live_video() {
    let portal = portal_with_users().await;

    let response = portal
        .client
        .put(portal.url("/api/live"))
        .bearer_auth(&subscriber().token)
        .json(&json!({ "video_id": "dQw4w9WgXcQ" }))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let invalid = portal
        .client
        .put(portal.url("/api/live"))
        .bearer_auth(&admin().token)
        .json(&json!({ "video_id": "<script>" }))
        .send()
        .await
        .expect("request");
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Trade journal
// =============================================================================

#[tokio::test]
async fn test_trade_journal_lifecycle() {
    let portal = portal_with_users().await;
    let user = subscriber();

    let mut ids = Vec::new();
    for (result, value) in [("gain", 150.5), ("loss", 50.0)] {
        let response = portal
            .client
            .post(portal.url("/api/trades"))
            .bearer_auth(&user.token)
            .json(&json!({
                "asset": "WINJ25",
                "type": "buy",
                "result": result,
                "value": value,
                "note": "",
            }))
            .send()
            .await
            .expect("request");
        assert_eq!(response.status(), StatusCode::CREATED);
        ids.push(json_body(response).await["id"].as_str().expect("id").to_string());
    }

    let body = json_body(portal.get_as(&user, "/api/trades").await).await;
    let trades = body["trades"].as_array().expect("trades");
    assert_eq!(trades.len(), 2);
    assert_eq!(trades[0]["id"], ids[1].as_str());

    let stats = json_body(portal.get_as(&user, "/api/trades/stats").await).await;
    assert_eq!(stats["count"], 2);
    assert_eq!(stats["gains"], 1);
    assert_eq!(stats["losses"], 1);
    assert_eq!(stats["total"], 100.5);

    let deleted = portal
        .client
        .delete(portal.url(&format!("/api/trades/{}", ids[0])))
        .bearer_auth(&user.token)
        .send()
        .await
        .expect("request");
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let again = portal
        .client
        .delete(portal.url(&format!("/api/trades/{}", ids[0])))
        .bearer_auth(&user.token)
        .send()
        .await
        .expect("request");
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_trades_are_private() {
    let portal = portal_with_users().await;

    let response = portal
        .client
        .post(portal.url("/api/trades"))
        .bearer_auth(&subscriber().token)
        .json(&json!({ "asset": "PETR4", "type": "sell", "result": "gain", "value": 10 }))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = json_body(portal.get_as(&admin(), "/api/trades").await).await;
    assert_eq!(body["trades"], json!([]));
}

#[tokio::test]
async fn test_trade_validation() {
    let portal = portal_with_users().await;

    let response = portal
        .client
        .post(portal.url("/api/trades"))
        .bearer_auth(&subscriber().token)
        .json(&json!({ "asset": " ", "type": "buy", "result": "gain", "value": 10 }))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    for _ in 0..2 {
        let response = portal
            .client
            .post(portal.url("/api/trades"))
            .bearer_auth(&subscriber().token)
            .json(&json!({ "asset": "WIN", "type": "buy", "result": "gain", "value": 5e28 }))
            .send()
            .await
            .expect("request");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let stats = portal.get_as(&subscriber(), "/api/trades/stats").await;
    assert_eq!(stats.status(), StatusCode::OK);
}

// =============================================================================
// Storage
// =============================================================================

#[tokio::test]
async fn test_storage_shared_by_default() {
    let portal = portal_with_users().await;

    let put = portal
        .client
        .put(portal.url("/api/storage/aviso"))
        .bearer_auth(&subscriber().token)
        .body("Live às 9h")
        .send()
        .await
        .expect("request");
    assert_eq!(put.status(), StatusCode::OK);
    assert_eq!(json_body(put).await["shared"], true);

    let body = json_body(portal.get_as(&admin(), "/api/storage/aviso").await).await;
    assert_eq!(body["value"], "Live às 9h");

    let body = json_body(portal.get_as(&admin(), "/api/storage?prefix=av").await).await;
    assert_eq!(body["keys"], json!(["aviso"]));
}

#[tokio::test]
async fn test_private_storage_is_per_user() {
    let portal = portal_with_users().await;

    let put = portal
        .client
        .put(portal.url("/api/storage/rascunho?shared=false"))
        .bearer_auth(&subscriber().token)
        .body("segredo")
        .send()
        .await
        .expect("request");
    assert_eq!(put.status(), StatusCode::OK);

    let own = portal
        .get_as(&subscriber(), "/api/storage/rascunho?shared=false")
        .await;
    assert_eq!(json_body(own).await["value"], "segredo");

    let other = portal.get_as(&admin(), "/api/storage/rascunho?shared=false").await;
    assert_eq!(other.status(), StatusCode::NOT_FOUND);

    let shared = portal.get_as(&subscriber(), "/api/storage/rascunho").await;
    assert_eq!(shared.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reserved_shared_keys_are_protected() {
    let portal = portal_with_users().await;

    for key in ["chat-messages", "current-live-id"] {
        let response = portal
            .client
            .put(portal.url(&format!("/api/storage/{key}")))
            .bearer_auth(&subscriber().token)
            .body("[]")
            .send()
            .await
            .expect("request");
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{key}");
    }
}

#[tokio::test]
async fn test_trade_journal_key_is_protected() {
    let portal = portal_with_users().await;

    let response = portal
        .client
        .put(portal.url("/api/storage/user-trades?shared=false"))
        .bearer_auth(&subscriber().token)
        .body("oops")
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let trades = portal.get_as(&subscriber(), "/api/trades").await;
    assert_eq!(trades.status(), StatusCode::OK);
    let stats = portal.get_as(&subscriber(), "/api/trades/stats").await;
    assert_eq!(stats.status(), StatusCode::OK);

    // A shared key of the same name is ordinary storage.
    let shared = portal
        .client
        .put(portal.url("/api/storage/user-trades"))
        .bearer_auth(&subscriber().token)
        .body("[]")
        .send()
        .await
        .expect("request");
    assert_eq!(shared.status(), StatusCode::OK);
}

// =============================================================================
// Signup
// =============================================================================

#[tokio::test]
async fn test_signup_forwards_to_identity() {
    let portal = TestPortal::start().await;

    let response = portal
        .client
        .post(portal.url("/api/signup"))
        .json(&json!({
            "email": "Nova@Example.com",
            "password": "segredo1",
            "confirmPassword": "segredo1",
            "fullName": "Nova Pessoa",
        }))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let signups = portal.identity.signups();
    assert_eq!(signups.len(), 1);
    assert_eq!(signups[0]["email"], "nova@example.com");
    assert_eq!(signups[0]["data"]["full_name"], "Nova Pessoa");
}

#[tokio::test]
async fn test_signup_validation_messages() {
    let portal = TestPortal::start().await;

    let cases = [
        (json!({ "email": "a@b.com" }), "Por favor, preencha todos os campos."),
        (
            json!({ "email": "a@b.com", "password": "123", "confirm_password": "123", "full_name": "A" }),
            "A senha deve ter no mínimo 6 caracteres.",
        ),
        (
            json!({ "email": "a@b.com", "password": "123456", "confirm_password": "654321", "full_name": "A" }),
            "As senhas não coincidem.",
        ),
    ];
    for (form, message) in cases {
        let response = portal
            .client
            .post(portal.url("/api/signup"))
            .json(&form)
            .send()
            .await
            .expect("request");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], message);
    }
    assert!(portal.identity.signups().is_empty());
}

#[tokio::test]
async fn test_signup_duplicate_email() {
    let portal = portal_with_users().await;

    let response = portal
        .client
        .post(portal.url("/api/signup"))
        .json(&json!({
            "email": "ana@example.com",
            "password": "segredo1",
            "confirm_password": "segredo1",
            "full_name": "Ana",
        }))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["error"],
        "A user with this email address has already been registered"
    );
}
