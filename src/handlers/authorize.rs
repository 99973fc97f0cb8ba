use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::consent::ConsentPrompt;
use crate::auth::flow::{self, AuthorizeRequest, BeginOutcome, ConsentDecision, LoginOutcome};
use crate::auth::password::verify_secret;
use crate::auth::registry;
use crate::error::AppError;
use crate::AppState;

// --- Request / Response types ---

#[derive(Debug, Deserialize)]
pub struct AuthorizeParams {
    pub client_id: String,
    pub redirect_uri: String,
    pub response_type: String,
    pub scope: String,
    pub state: String,
    pub code_challenge: String,
    pub code_challenge_method: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub state_token: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Set when consent was skipped; the user-agent goes straight back to
    /// the client with a code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consent: Option<ConsentPrompt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConsentRequest {
    pub state_token: String,
    pub decision: ConsentDecision,
}

#[derive(Debug, Serialize)]
pub struct ConsentResponse {
    pub redirect_to: String,
}

// --- Handlers ---

/// Entry point of the authorization code flow. Valid requests bounce to
/// the login page; invalid ones either bounce back to the client with an
/// error or, when the redirect URI itself is suspect, answer directly.
pub async fn authorize(
    State(state): State<AppState>,
    Query(params): Query<AuthorizeParams>,
) -> Result<Response, AppError> {
    let request = AuthorizeRequest {
        client_id: params.client_id,
        redirect_uri: params.redirect_uri,
        response_type: params.response_type,
        scope: params.scope,
        state: params.state,
        code_challenge: params.code_challenge,
        code_challenge_method: params.code_challenge_method,
    };

    let redirect_to = match flow::begin(&state.db, &state.signer, &state.config, request).await? {
        BeginOutcome::Login { redirect_to } => redirect_to,
        BeginOutcome::Error { redirect_to } => redirect_to,
    };

    Ok((StatusCode::FOUND, [(header::LOCATION, redirect_to)]).into_response())
}

/// Password check plus flow continuation. Unknown accounts and wrong
/// passwords are indistinguishable from the outside.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let account = registry::find_account(&state.db, &req.username)
        .await?
        .ok_or(AppError::InvalidCredentials)?;
    if !verify_secret(&req.password, &account.password_hash)? {
        return Err(AppError::InvalidCredentials);
    }

    let outcome = flow::on_authenticated(
        &state.db,
        &state.signer,
        &state.code_cipher,
        &state.config,
        &req.state_token,
        &account.username,
    )
    .await?;

    Ok(Json(match outcome {
        LoginOutcome::Authorized { redirect_to } => LoginResponse {
            redirect_to: Some(redirect_to),
            consent: None,
            state_token: None,
        },
        LoginOutcome::ConsentRequired {
            prompt,
            state_token,
        } => LoginResponse {
            redirect_to: None,
            consent: Some(prompt),
            state_token: Some(state_token),
        },
    }))
}

pub async fn consent(
    State(state): State<AppState>,
    Json(req): Json<ConsentRequest>,
) -> Result<Json<ConsentResponse>, AppError> {
    let redirect_to = flow::on_consent(
        &state.db,
        &state.signer,
        &state.code_cipher,
        &state.config,
        &req.state_token,
        req.decision,
    )
    .await?;

    Ok(Json(ConsentResponse { redirect_to }))
}
