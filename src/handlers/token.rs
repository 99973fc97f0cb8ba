use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::auth::exchange;
use crate::auth::middleware::{self, BasicCredentials};
use crate::auth::tokens::{self, TokenPair};
use crate::error::AppError;
use crate::AppState;

// --- Request / Response types ---

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub grant_type: String,
    // client authentication when the Basic header is absent
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    // authorization_code flow
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    pub code_verifier: Option<String>,
    // refresh_token flow
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        TokenResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: "bearer".to_string(),
            expires_in: pair.expires_in,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RevokeRequest {
    pub token: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

// --- Handlers ---

/// Token endpoint. The client is authenticated before the grant type is
/// even looked at, so credential failures shadow grant failures.
pub async fn token(
    State(state): State<AppState>,
    basic: Option<BasicCredentials>,
    Json(req): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let client = middleware::authenticate_client_request(
        &state.db,
        basic,
        req.client_id.as_deref(),
        req.client_secret.as_deref(),
    )
    .await?;

    match req.grant_type.as_str() {
        "authorization_code" => handle_authorization_code(&state, &client, &req).await,
        "refresh_token" => handle_refresh_token(&state, &client, &req).await,
        other => Err(AppError::InvalidRequest(format!(
            "Unsupported grant_type: {other}"
        ))),
    }
}

async fn handle_authorization_code(
    state: &AppState,
    client: &entity::client::Model,
    req: &TokenRequest,
) -> Result<Json<TokenResponse>, AppError> {
    let code = req
        .code
        .as_deref()
        .ok_or_else(|| AppError::InvalidRequest("Missing 'code' parameter".to_string()))?;
    let code_verifier = req
        .code_verifier
        .as_deref()
        .ok_or_else(|| AppError::InvalidRequest("Missing 'code_verifier' parameter".to_string()))?;
    let redirect_uri = req
        .redirect_uri
        .as_deref()
        .ok_or_else(|| AppError::InvalidRequest("Missing 'redirect_uri' parameter".to_string()))?;

    let pair = exchange::redeem_code(
        &state.db,
        &state.signer,
        &state.code_cipher,
        client,
        code,
        code_verifier,
        redirect_uri,
    )
    .await?;

    Ok(Json(pair.into()))
}

async fn handle_refresh_token(
    state: &AppState,
    client: &entity::client::Model,
    req: &TokenRequest,
) -> Result<Json<TokenResponse>, AppError> {
    let refresh_token = req
        .refresh_token
        .as_deref()
        .ok_or_else(|| AppError::InvalidRequest("Missing 'refresh_token' parameter".to_string()))?;

    let pair =
        tokens::refresh_token_pair(&state.db, &state.signer, &client.client_id, refresh_token)
            .await?;

    Ok(Json(pair.into()))
}

pub async fn revoke(
    State(state): State<AppState>,
    basic: Option<BasicCredentials>,
    Json(req): Json<RevokeRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    middleware::authenticate_client_request(
        &state.db,
        basic,
        req.client_id.as_deref(),
        req.client_secret.as_deref(),
    )
    .await?;

    tokens::revoke_presented_token(&state.db, &state.signer, &req.token).await?;

    // Per RFC 7009, always return 200
    Ok(Json(serde_json::json!({})))
}
