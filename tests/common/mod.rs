#![allow(dead_code)]

use std::sync::OnceLock;

use authz_service::auth::crypto::{self, CodeCipher};
use authz_service::auth::jwt::TokenSigner;
use authz_service::config::Config;
use authz_service::keys::generate_rsa_pem_pair;
use authz_service::routes::create_router;
use authz_service::AppState;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use base64::Engine;
use http_body_util::BodyExt;
use migration::MigratorTrait;
use sea_orm::Database;
use tower::ServiceExt;

pub const ADMIN_KEY: &str = "test-admin-key-12345";

/// RSA keygen is slow, so every TestApp shares one process-wide pair.
static TEST_KEYS: OnceLock<(String, String)> = OnceLock::new();

fn test_keys() -> &'static (String, String) {
    TEST_KEYS.get_or_init(|| generate_rsa_pem_pair(2048).expect("Failed to generate RSA test keys"))
}

// ─── TestResponse ────────────────────────────────────────────────────────────

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    body_bytes: Vec<u8>,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body_bytes).to_string()
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body_bytes).unwrap_or_else(|e| {
            panic!(
                "Failed to deserialize response as {}: {e}\nBody: {}",
                std::any::type_name::<T>(),
                self.text()
            )
        })
    }

    pub fn assert_status(&self, expected: StatusCode) {
        assert_eq!(
            self.status, expected,
            "Expected status {expected}, got {}. Body: {}",
            self.status,
            self.text()
        );
    }

    pub fn location(&self) -> String {
        self.headers
            .get("location")
            .expect("response has no Location header")
            .to_str()
            .expect("Location header is not valid UTF-8")
            .to_string()
    }
}

/// Pull one query parameter out of a redirect URL.
pub fn query_param(url: &str, name: &str) -> Option<String> {
    let parsed = url::Url::parse(url).expect("redirect URL should parse");
    parsed
        .query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.to_string())
}

// ─── CreatedClient ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CreatedClient {
    pub client_id: String,
    pub client_secret: String,
}

// ─── TestApp ─────────────────────────────────────────────────────────────────

pub struct TestApp {
    router: Router,
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(customize: impl FnOnce(&mut Config)) -> Self {
        let mut config = Config {
            database_url: "sqlite::memory:".to_string(),
            jwt_private_key_path: "unused-in-tests".to_string(),
            jwt_public_key_path: "unused-in-tests".to_string(),
            jwt_issuer: "authz-service-test".to_string(),
            access_token_ttl_secs: 900,
            refresh_token_ttl_secs: 86400,
            state_token_ttl_secs: 60,
            auth_code_ttl_secs: 600,
            auth_code_secret: base64::engine::general_purpose::STANDARD.encode([0u8; 32]),
            admin_api_key: ADMIN_KEY.to_string(),
            login_page_url: "http://localhost:5173/login".to_string(),
            silent_reauth: true,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
        };
        customize(&mut config);

        let db = Database::connect(&config.database_url)
            .await
            .expect("Failed to connect to in-memory SQLite");

        migration::Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        let (private_pem, public_pem) = test_keys();
        let signer = TokenSigner::from_pem(private_pem, public_pem, &config)
            .expect("Failed to init TokenSigner");
        let code_cipher =
            CodeCipher::new(&config.auth_code_secret).expect("Failed to init CodeCipher");

        let state = AppState {
            db,
            signer,
            code_cipher,
            config,
        };

        let router = create_router(state.clone());

        Self { router, state }
    }

    pub async fn request(&self, req: Request<Body>) -> TestResponse {
        let resp = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("oneshot failed");

        let status = resp.status();
        let headers = resp.headers().clone();
        let body_bytes = resp
            .into_body()
            .collect()
            .await
            .expect("failed to read body")
            .to_bytes()
            .to_vec();

        TestResponse {
            status,
            headers,
            body_bytes,
        }
    }

    pub async fn post_json(&self, uri: &str, body: &serde_json::Value) -> TestResponse {
        let req = Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap();
        self.request(req).await
    }

    // ── Admin helpers ────────────────────────────────────────────────────

    pub async fn admin_create_scope(
        &self,
        name: &str,
        account_attributes: serde_json::Value,
        client_attributes: serde_json::Value,
    ) {
        let body = serde_json::json!({
            "name": name,
            "description": format!("Test scope {name}"),
            "account_attributes": account_attributes,
            "client_attributes": client_attributes,
        });

        let req = Request::builder()
            .method("POST")
            .uri("/admin/scopes")
            .header("Content-Type", "application/json")
            .header("X-Admin-Key", ADMIN_KEY)
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();

        let resp = self.request(req).await;
        resp.assert_status(StatusCode::OK);
    }

    pub async fn admin_create_client_full(&self, body: serde_json::Value) -> CreatedClient {
        let req = Request::builder()
            .method("POST")
            .uri("/admin/clients")
            .header("Content-Type", "application/json")
            .header("X-Admin-Key", ADMIN_KEY)
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();

        let resp = self.request(req).await;
        resp.assert_status(StatusCode::OK);
        let json: serde_json::Value = resp.json();

        CreatedClient {
            client_id: json["client_id"].as_str().unwrap().to_string(),
            client_secret: json["client_secret"].as_str().unwrap().to_string(),
        }
    }

    pub async fn admin_create_client(
        &self,
        name: &str,
        redirect_uri: &str,
        scopes: &[&str],
    ) -> CreatedClient {
        self.admin_create_client_full(serde_json::json!({
            "name": name,
            "redirect_uri": redirect_uri,
            "scopes": scopes,
        }))
        .await
    }

    // ── Account helpers ──────────────────────────────────────────────────

    pub async fn register_account(
        &self,
        username: &str,
        password: &str,
        attributes: serde_json::Value,
    ) -> TestResponse {
        self.post_json(
            "/api/accounts/register",
            &serde_json::json!({
                "username": username,
                "password": password,
                "attributes": attributes,
            }),
        )
        .await
    }

    // ── Authorization flow helpers ───────────────────────────────────────

    pub fn pkce_pair() -> (String, String) {
        let verifier = format!(
            "{}{}",
            uuid::Uuid::new_v4().simple(),
            uuid::Uuid::new_v4().simple()
        );
        let challenge = crypto::pkce_challenge(&verifier);
        (verifier, challenge)
    }

    pub async fn authorize(
        &self,
        client_id: &str,
        redirect_uri: &str,
        scope: &str,
        state: &str,
        code_challenge: &str,
    ) -> TestResponse {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", scope)
            .append_pair("state", state)
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", "S256")
            .finish();

        let req = Request::builder()
            .method("GET")
            .uri(format!("/oauth/authorize?{query}"))
            .body(Body::empty())
            .unwrap();

        self.request(req).await
    }

    pub async fn login(&self, state_token: &str, username: &str, password: &str) -> TestResponse {
        self.post_json(
            "/oauth/login",
            &serde_json::json!({
                "state_token": state_token,
                "username": username,
                "password": password,
            }),
        )
        .await
    }

    pub async fn consent(&self, state_token: &str, decision: &str) -> TestResponse {
        self.post_json(
            "/oauth/consent",
            &serde_json::json!({
                "state_token": state_token,
                "decision": decision,
            }),
        )
        .await
    }

    /// Run authorize -> login -> consent(accept) and return the code from
    /// the final redirect.
    pub async fn obtain_code(
        &self,
        client_id: &str,
        redirect_uri: &str,
        scope: &str,
        username: &str,
        password: &str,
        code_challenge: &str,
    ) -> String {
        let resp = self
            .authorize(client_id, redirect_uri, scope, "xyz", code_challenge)
            .await;
        resp.assert_status(StatusCode::FOUND);
        let state_token =
            query_param(&resp.location(), "state_token").expect("login redirect has state_token");

        let resp = self.login(&state_token, username, password).await;
        resp.assert_status(StatusCode::OK);
        let login: serde_json::Value = resp.json();

        let redirect_to = if let Some(to) = login["redirect_to"].as_str() {
            // Silent re-authorization skipped the consent prompt.
            to.to_string()
        } else {
            let continuation = login["state_token"]
                .as_str()
                .expect("consent prompt carries a state_token");
            let resp = self.consent(continuation, "accept").await;
            resp.assert_status(StatusCode::OK);
            let consent: serde_json::Value = resp.json();
            consent["redirect_to"].as_str().unwrap().to_string()
        };

        query_param(&redirect_to, "code").expect("client redirect carries a code")
    }

    // ── Token endpoint helpers ───────────────────────────────────────────

    pub async fn exchange_code(
        &self,
        client_id: &str,
        client_secret: &str,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> TestResponse {
        self.post_json(
            "/oauth/token",
            &serde_json::json!({
                "grant_type": "authorization_code",
                "client_id": client_id,
                "client_secret": client_secret,
                "code": code,
                "code_verifier": code_verifier,
                "redirect_uri": redirect_uri,
            }),
        )
        .await
    }

    pub async fn refresh(
        &self,
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
    ) -> TestResponse {
        self.post_json(
            "/oauth/token",
            &serde_json::json!({
                "grant_type": "refresh_token",
                "client_id": client_id,
                "client_secret": client_secret,
                "refresh_token": refresh_token,
            }),
        )
        .await
    }

    pub fn basic_auth_header(client_id: &str, secret: &str) -> String {
        let raw = format!("{client_id}:{secret}");
        let encoded = base64::engine::general_purpose::STANDARD.encode(raw);
        format!("Basic {encoded}")
    }
}
