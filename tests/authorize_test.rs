mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{query_param, CreatedClient, TestApp};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serial_test::serial;

const REDIRECT_URI: &str = "https://widgets.example/cb";

/// Helper: create two scopes, a client allowed both, and an account.
async fn setup_flow(app: &TestApp) -> CreatedClient {
    app.admin_create_scope(
        "profile",
        serde_json::json!([{"name": "display_name", "access": "read"}]),
        serde_json::json!([]),
    )
    .await;
    app.admin_create_scope(
        "email",
        serde_json::json!([{"name": "email", "access": "read"}]),
        serde_json::json!([]),
    )
    .await;

    let client = app
        .admin_create_client("Widget App", REDIRECT_URI, &["profile", "email"])
        .await;

    let resp = app
        .register_account(
            "alice",
            "Password1!",
            serde_json::json!({"display_name": "Alice", "email": "alice@example.com"}),
        )
        .await;
    resp.assert_status(StatusCode::OK);

    client
}

// ─── Authorize request validation ───────────────────────────────────────────

#[serial]
#[tokio::test]
async fn valid_request_redirects_to_login_page() {
    let app = TestApp::new().await;
    let client = setup_flow(&app).await;
    let (_, challenge) = TestApp::pkce_pair();

    let resp = app
        .authorize(&client.client_id, REDIRECT_URI, "profile", "xyz", &challenge)
        .await;

    resp.assert_status(StatusCode::FOUND);
    let location = resp.location();
    assert!(location.starts_with("http://localhost:5173/login"));
    assert!(query_param(&location, "state_token").is_some());
}

#[serial]
#[tokio::test]
async fn unknown_client_is_answered_directly() {
    let app = TestApp::new().await;
    setup_flow(&app).await;
    let (_, challenge) = TestApp::pkce_pair();

    let resp = app
        .authorize("client_nope", REDIRECT_URI, "profile", "xyz", &challenge)
        .await;

    // No redirect: the redirect URI cannot be trusted without a known client.
    resp.assert_status(StatusCode::UNAUTHORIZED);
    let json: serde_json::Value = resp.json();
    assert_eq!(json["error"], "invalid_client");
}

#[serial]
#[tokio::test]
async fn mismatched_redirect_uri_is_answered_directly() {
    let app = TestApp::new().await;
    let client = setup_flow(&app).await;
    let (_, challenge) = TestApp::pkce_pair();

    let resp = app
        .authorize(
            &client.client_id,
            "https://evil.example/cb",
            "profile",
            "xyz",
            &challenge,
        )
        .await;

    resp.assert_status(StatusCode::BAD_REQUEST);
    let json: serde_json::Value = resp.json();
    assert_eq!(json["error"], "invalid_redirect");
}

#[serial]
#[tokio::test]
async fn wrong_response_type_bounces_back_to_client() {
    let app = TestApp::new().await;
    let client = setup_flow(&app).await;
    let (_, challenge) = TestApp::pkce_pair();

    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("client_id", &client.client_id)
        .append_pair("redirect_uri", REDIRECT_URI)
        .append_pair("response_type", "token")
        .append_pair("scope", "profile")
        .append_pair("state", "xyz")
        .append_pair("code_challenge", &challenge)
        .append_pair("code_challenge_method", "S256")
        .finish();
    let req = Request::builder()
        .method("GET")
        .uri(format!("/oauth/authorize?{query}"))
        .body(Body::empty())
        .unwrap();

    let resp = app.request(req).await;
    resp.assert_status(StatusCode::FOUND);
    let location = resp.location();
    assert!(location.starts_with(REDIRECT_URI));
    assert_eq!(
        query_param(&location, "error").as_deref(),
        Some("unsupported_response_type")
    );
    assert_eq!(query_param(&location, "state").as_deref(), Some("xyz"));
}

#[serial]
#[tokio::test]
async fn scope_outside_client_registration_bounces_back() {
    let app = TestApp::new().await;
    let client = setup_flow(&app).await;
    let (_, challenge) = TestApp::pkce_pair();

    let resp = app
        .authorize(
            &client.client_id,
            REDIRECT_URI,
            "profile payments",
            "xyz",
            &challenge,
        )
        .await;

    resp.assert_status(StatusCode::FOUND);
    assert_eq!(
        query_param(&resp.location(), "error").as_deref(),
        Some("invalid_scope")
    );
}

#[serial]
#[tokio::test]
async fn empty_scope_bounces_back_as_invalid_request() {
    let app = TestApp::new().await;
    let client = setup_flow(&app).await;
    let (_, challenge) = TestApp::pkce_pair();

    let resp = app
        .authorize(&client.client_id, REDIRECT_URI, "", "xyz", &challenge)
        .await;

    resp.assert_status(StatusCode::FOUND);
    assert_eq!(
        query_param(&resp.location(), "error").as_deref(),
        Some("invalid_request")
    );
}

#[serial]
#[tokio::test]
async fn malformed_code_challenge_bounces_back() {
    let app = TestApp::new().await;
    let client = setup_flow(&app).await;

    let resp = app
        .authorize(&client.client_id, REDIRECT_URI, "profile", "xyz", "short")
        .await;

    resp.assert_status(StatusCode::FOUND);
    assert_eq!(
        query_param(&resp.location(), "error").as_deref(),
        Some("invalid_request")
    );
}

#[serial]
#[tokio::test]
async fn plain_pkce_method_is_rejected() {
    let app = TestApp::new().await;
    let client = setup_flow(&app).await;
    let (_, challenge) = TestApp::pkce_pair();

    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("client_id", &client.client_id)
        .append_pair("redirect_uri", REDIRECT_URI)
        .append_pair("response_type", "code")
        .append_pair("scope", "profile")
        .append_pair("state", "xyz")
        .append_pair("code_challenge", &challenge)
        .append_pair("code_challenge_method", "plain")
        .finish();
    let req = Request::builder()
        .method("GET")
        .uri(format!("/oauth/authorize?{query}"))
        .body(Body::empty())
        .unwrap();

    let resp = app.request(req).await;
    resp.assert_status(StatusCode::FOUND);
    assert_eq!(
        query_param(&resp.location(), "error").as_deref(),
        Some("invalid_request")
    );
}

// ─── Login ───────────────────────────────────────────────────────────────────

#[serial]
#[tokio::test]
async fn login_rejects_wrong_password() {
    let app = TestApp::new().await;
    let client = setup_flow(&app).await;
    let (_, challenge) = TestApp::pkce_pair();

    let resp = app
        .authorize(&client.client_id, REDIRECT_URI, "profile", "xyz", &challenge)
        .await;
    let state_token = query_param(&resp.location(), "state_token").unwrap();

    let resp = app.login(&state_token, "alice", "WrongPassword!").await;
    resp.assert_status(StatusCode::UNAUTHORIZED);
    let json: serde_json::Value = resp.json();
    assert_eq!(json["error"], "invalid_credentials");
}

#[serial]
#[tokio::test]
async fn login_rejects_unknown_account() {
    let app = TestApp::new().await;
    let client = setup_flow(&app).await;
    let (_, challenge) = TestApp::pkce_pair();

    let resp = app
        .authorize(&client.client_id, REDIRECT_URI, "profile", "xyz", &challenge)
        .await;
    let state_token = query_param(&resp.location(), "state_token").unwrap();

    let resp = app.login(&state_token, "mallory", "Password1!").await;
    resp.assert_status(StatusCode::UNAUTHORIZED);
}

#[serial]
#[tokio::test]
async fn login_rejects_garbage_state_token() {
    let app = TestApp::new().await;
    setup_flow(&app).await;

    let resp = app.login("not-a-jwt", "alice", "Password1!").await;
    resp.assert_status(StatusCode::BAD_REQUEST);
    let json: serde_json::Value = resp.json();
    assert_eq!(json["error"], "invalid_state");
}

#[serial]
#[tokio::test]
async fn expired_state_token_is_reported_as_expired() {
    // Issue tokens that are already expired, beyond the verifier's leeway.
    let app = TestApp::with_config(|c| c.state_token_ttl_secs = -120).await;
    let client = setup_flow(&app).await;
    let (_, challenge) = TestApp::pkce_pair();

    let resp = app
        .authorize(&client.client_id, REDIRECT_URI, "profile", "xyz", &challenge)
        .await;
    let state_token = query_param(&resp.location(), "state_token").unwrap();

    let resp = app.login(&state_token, "alice", "Password1!").await;
    resp.assert_status(StatusCode::BAD_REQUEST);
    let json: serde_json::Value = resp.json();
    assert_eq!(json["error"], "expired_state");
}

// ─── Consent ─────────────────────────────────────────────────────────────────

#[serial]
#[tokio::test]
async fn first_login_prompts_for_consent() {
    let app = TestApp::new().await;
    let client = setup_flow(&app).await;
    let (_, challenge) = TestApp::pkce_pair();

    let resp = app
        .authorize(
            &client.client_id,
            REDIRECT_URI,
            "profile email",
            "xyz",
            &challenge,
        )
        .await;
    let state_token = query_param(&resp.location(), "state_token").unwrap();

    let resp = app.login(&state_token, "alice", "Password1!").await;
    resp.assert_status(StatusCode::OK);
    let json: serde_json::Value = resp.json();

    assert!(json["redirect_to"].is_null());
    assert!(json["state_token"].as_str().is_some());

    let consent = &json["consent"];
    assert_eq!(consent["client_name"], "Widget App");
    assert_eq!(consent["connected"], false);

    let pending: Vec<String> = consent["pending_scopes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(pending.len(), 2);
    assert!(pending.contains(&"profile".to_string()));
    assert!(pending.contains(&"email".to_string()));

    let reads: Vec<String> = consent["account_access"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["name"].as_str().unwrap().to_string())
        .collect();
    assert!(reads.contains(&"display_name".to_string()));
    assert!(reads.contains(&"email".to_string()));
}

#[serial]
#[tokio::test]
async fn consent_accept_redirects_with_code_and_state() {
    let app = TestApp::new().await;
    let client = setup_flow(&app).await;
    let (_, challenge) = TestApp::pkce_pair();

    let resp = app
        .authorize(
            &client.client_id,
            REDIRECT_URI,
            "profile",
            "round-trip-state",
            &challenge,
        )
        .await;
    let state_token = query_param(&resp.location(), "state_token").unwrap();

    let resp = app.login(&state_token, "alice", "Password1!").await;
    let login: serde_json::Value = resp.json();
    let continuation = login["state_token"].as_str().unwrap();

    let resp = app.consent(continuation, "accept").await;
    resp.assert_status(StatusCode::OK);
    let json: serde_json::Value = resp.json();
    let redirect_to = json["redirect_to"].as_str().unwrap();

    assert!(redirect_to.starts_with(REDIRECT_URI));
    assert!(query_param(redirect_to, "code").is_some());
    assert_eq!(
        query_param(redirect_to, "state").as_deref(),
        Some("round-trip-state")
    );
}

#[serial]
#[tokio::test]
async fn consent_decline_redirects_with_access_denied() {
    let app = TestApp::new().await;
    let client = setup_flow(&app).await;
    let (_, challenge) = TestApp::pkce_pair();

    let resp = app
        .authorize(&client.client_id, REDIRECT_URI, "profile", "xyz", &challenge)
        .await;
    let state_token = query_param(&resp.location(), "state_token").unwrap();

    let resp = app.login(&state_token, "alice", "Password1!").await;
    let login: serde_json::Value = resp.json();
    let continuation = login["state_token"].as_str().unwrap();

    let resp = app.consent(continuation, "decline").await;
    resp.assert_status(StatusCode::OK);
    let json: serde_json::Value = resp.json();
    let redirect_to = json["redirect_to"].as_str().unwrap();

    assert!(redirect_to.starts_with(REDIRECT_URI));
    assert!(query_param(redirect_to, "code").is_none());
    assert_eq!(
        query_param(redirect_to, "error").as_deref(),
        Some("access_denied")
    );
    assert_eq!(query_param(redirect_to, "state").as_deref(), Some("xyz"));
}

#[serial]
#[tokio::test]
async fn pre_login_state_token_is_rejected_at_consent() {
    let app = TestApp::new().await;
    let client = setup_flow(&app).await;
    let (_, challenge) = TestApp::pkce_pair();

    let resp = app
        .authorize(&client.client_id, REDIRECT_URI, "profile", "xyz", &challenge)
        .await;
    let pre_login_token = query_param(&resp.location(), "state_token").unwrap();

    // The token has no authenticated subject yet.
    let resp = app.consent(&pre_login_token, "accept").await;
    resp.assert_status(StatusCode::BAD_REQUEST);
    let json: serde_json::Value = resp.json();
    assert_eq!(json["error"], "invalid_state");
}

// ─── Re-authorization ────────────────────────────────────────────────────────

#[serial]
#[tokio::test]
async fn silent_reauth_skips_consent_after_first_grant() {
    let app = TestApp::new().await;
    let client = setup_flow(&app).await;
    let (_, challenge) = TestApp::pkce_pair();

    app.obtain_code(
        &client.client_id,
        REDIRECT_URI,
        "profile",
        "alice",
        "Password1!",
        &challenge,
    )
    .await;

    // Same scopes again: login goes straight back to the client.
    let resp = app
        .authorize(&client.client_id, REDIRECT_URI, "profile", "xyz", &challenge)
        .await;
    let state_token = query_param(&resp.location(), "state_token").unwrap();

    let resp = app.login(&state_token, "alice", "Password1!").await;
    resp.assert_status(StatusCode::OK);
    let json: serde_json::Value = resp.json();

    assert!(json["consent"].is_null());
    let redirect_to = json["redirect_to"].as_str().unwrap();
    assert!(query_param(redirect_to, "code").is_some());
}

#[serial]
#[tokio::test]
async fn disabled_silent_reauth_always_prompts() {
    let app = TestApp::with_config(|c| c.silent_reauth = false).await;
    let client = setup_flow(&app).await;
    let (_, challenge) = TestApp::pkce_pair();

    app.obtain_code(
        &client.client_id,
        REDIRECT_URI,
        "profile",
        "alice",
        "Password1!",
        &challenge,
    )
    .await;

    let resp = app
        .authorize(&client.client_id, REDIRECT_URI, "profile", "xyz", &challenge)
        .await;
    let state_token = query_param(&resp.location(), "state_token").unwrap();

    let resp = app.login(&state_token, "alice", "Password1!").await;
    resp.assert_status(StatusCode::OK);
    let json: serde_json::Value = resp.json();

    // Everything is already granted, but the prompt still appears.
    assert!(json["redirect_to"].is_null());
    let consent = &json["consent"];
    assert_eq!(consent["connected"], true);
    assert_eq!(consent["pending_scopes"].as_array().unwrap().len(), 0);
    let granted: Vec<String> = consent["already_granted"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s.as_str().unwrap().to_string())
        .collect();
    assert!(granted.contains(&"profile".to_string()));
}

#[serial]
#[tokio::test]
async fn incremental_consent_prompts_only_new_scopes() {
    let app = TestApp::new().await;
    let client = setup_flow(&app).await;
    let (_, challenge) = TestApp::pkce_pair();

    app.obtain_code(
        &client.client_id,
        REDIRECT_URI,
        "profile",
        "alice",
        "Password1!",
        &challenge,
    )
    .await;

    // A broader request only asks about the new scope.
    let resp = app
        .authorize(
            &client.client_id,
            REDIRECT_URI,
            "profile email",
            "xyz",
            &challenge,
        )
        .await;
    let state_token = query_param(&resp.location(), "state_token").unwrap();

    let resp = app.login(&state_token, "alice", "Password1!").await;
    let json: serde_json::Value = resp.json();

    let consent = &json["consent"];
    assert_eq!(consent["connected"], true);
    let pending: Vec<String> = consent["pending_scopes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(pending, vec!["email".to_string()]);

    let granted: Vec<String> = consent["already_granted"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s.as_str().unwrap().to_string())
        .collect();
    assert_eq!(granted, vec!["profile".to_string()]);
}

#[serial]
#[tokio::test]
async fn re_consent_unions_scopes_without_duplicates() {
    let app = TestApp::new().await;
    let client = setup_flow(&app).await;
    let (_, challenge) = TestApp::pkce_pair();

    app.obtain_code(
        &client.client_id,
        REDIRECT_URI,
        "profile",
        "alice",
        "Password1!",
        &challenge,
    )
    .await;
    app.obtain_code(
        &client.client_id,
        REDIRECT_URI,
        "profile email",
        "alice",
        "Password1!",
        &challenge,
    )
    .await;

    let rows = entity::consent::Entity::find()
        .filter(entity::consent::Column::ClientId.eq(client.client_id.as_str()))
        .filter(entity::consent::Column::Username.eq("alice"))
        .all(&app.state.db)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    let mut scopes = rows[0].scope_names();
    scopes.sort();
    assert_eq!(scopes, vec!["email".to_string(), "profile".to_string()]);

    // Everything is granted now, so a third pass skips the prompt entirely.
    let resp = app
        .authorize(
            &client.client_id,
            REDIRECT_URI,
            "profile email",
            "xyz",
            &challenge,
        )
        .await;
    let state_token = query_param(&resp.location(), "state_token").unwrap();
    let resp = app.login(&state_token, "alice", "Password1!").await;
    let json: serde_json::Value = resp.json();
    assert!(json["redirect_to"].as_str().is_some());
}

#[serial]
#[tokio::test]
async fn first_link_announces_stored_attributes() {
    let app = TestApp::new().await;
    app.admin_create_scope(
        "profile",
        serde_json::json!([{"name": "display_name", "access": "read"}]),
        serde_json::json!([]),
    )
    .await;

    let client = app
        .admin_create_client_full(serde_json::json!({
            "name": "Widget App",
            "redirect_uri": REDIRECT_URI,
            "scopes": ["profile"],
            "profile_metadata_attributes": [
                {"name": "theme", "description": "UI theme", "kind": "string"}
            ],
            "profile_defaults": {"theme": "light"},
        }))
        .await;

    app.register_account("alice", "Password1!", serde_json::json!({}))
        .await
        .assert_status(StatusCode::OK);

    let (_, challenge) = TestApp::pkce_pair();
    let resp = app
        .authorize(&client.client_id, REDIRECT_URI, "profile", "xyz", &challenge)
        .await;
    let state_token = query_param(&resp.location(), "state_token").unwrap();

    let resp = app.login(&state_token, "alice", "Password1!").await;
    let json: serde_json::Value = resp.json();

    let consent = &json["consent"];
    assert_eq!(consent["connected"], false);
    let stored: Vec<String> = consent["stored_attributes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(stored, vec!["theme".to_string()]);
}
