use sea_orm::DatabaseConnection;
use serde::Deserialize;
use url::Url;

use crate::auth::codes;
use crate::auth::consent::{self, ConsentPrompt};
use crate::auth::crypto::{self, CodeCipher};
use crate::auth::jwt::{StatePayload, TokenSigner};
use crate::auth::registry;
use crate::config::Config;
use crate::error::AppError;

/// An authorization request as it arrives at the authorize endpoint.
#[derive(Debug, Clone)]
pub struct AuthorizeRequest {
    pub client_id: String,
    pub redirect_uri: String,
    pub response_type: String,
    /// Space-separated scope names.
    pub scope: String,
    pub state: String,
    pub code_challenge: String,
    pub code_challenge_method: Option<String>,
}

/// Where the user-agent is sent after `begin`.
#[derive(Debug)]
pub enum BeginOutcome {
    /// Request is valid; continue at the login page with a state token.
    Login { redirect_to: String },
    /// Request failed validation after the redirect URI was trusted; the
    /// error rides back to the client as query parameters.
    Error { redirect_to: String },
}

/// What the login endpoint reports once the password check passed.
#[derive(Debug)]
pub enum LoginOutcome {
    /// Every requested scope was granted before; the consent step is
    /// skipped and a code is already waiting at the redirect target.
    Authorized { redirect_to: String },
    /// The user still has something to approve.
    ConsentRequired {
        prompt: ConsentPrompt,
        state_token: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentDecision {
    Accept,
    Decline,
}

/// Validate an authorization request and hand the user-agent to the login
/// page. `InvalidClient` and `InvalidRedirect` surface directly; once the
/// redirect URI is known good, failures redirect back to the client.
pub async fn begin(
    db: &DatabaseConnection,
    signer: &TokenSigner,
    config: &Config,
    request: AuthorizeRequest,
) -> Result<BeginOutcome, AppError> {
    // Nothing may be reflected onto the redirect URI until the client and
    // its registered URI have checked out.
    let client = registry::require_client(db, &request.client_id).await?;
    if client.redirect_uri != request.redirect_uri {
        return Err(AppError::InvalidRedirect);
    }

    if let Err(err) = validate_request(&client, &request) {
        return Ok(BeginOutcome::Error {
            redirect_to: error_redirect(&request.redirect_uri, &err, &request.state)?,
        });
    }

    let state_token = signer.issue_state_token(StatePayload {
        username: None,
        client_id: client.client_id,
        scopes: split_scopes(&request.scope),
        redirect_uri: request.redirect_uri,
        state: request.state,
        code_challenge: request.code_challenge,
    })?;

    let mut login = Url::parse(&config.login_page_url)
        .map_err(|e| AppError::Internal(format!("Invalid login page URL: {e}")))?;
    login.query_pairs_mut().append_pair("state_token", &state_token);

    Ok(BeginOutcome::Login {
        redirect_to: login.to_string(),
    })
}

/// Resume the flow after the external login step verified `username`.
/// Either skips straight to a code (everything already granted and silent
/// re-authorization enabled) or returns the consent prompt together with a
/// state token now bound to the account.
pub async fn on_authenticated(
    db: &DatabaseConnection,
    signer: &TokenSigner,
    cipher: &CodeCipher,
    config: &Config,
    state_token: &str,
    username: &str,
) -> Result<LoginOutcome, AppError> {
    let claims = signer.verify_state_token(state_token)?;

    let client = registry::require_client(db, &claims.client_id).await?;
    let consent_row = registry::find_consent(db, &client.client_id, username).await?;
    let requested = registry::require_scopes(db, &claims.scopes).await?;

    let prompt = consent::resolve(&client, consent_row.as_ref(), &requested);

    if prompt.pending_scopes.is_empty() && config.silent_reauth {
        let code = codes::create(
            db,
            cipher,
            &client.client_id,
            username,
            &claims.redirect_uri,
            &claims.scopes,
            &claims.code_challenge,
            config.auth_code_ttl_secs,
        )
        .await?;
        tracing::debug!(client_id = %client.client_id, "silent re-authorization, consent skipped");
        return Ok(LoginOutcome::Authorized {
            redirect_to: code_redirect(&claims.redirect_uri, &code, &claims.state)?,
        });
    }

    let continuation = signer.issue_state_token(StatePayload {
        username: Some(username.to_string()),
        client_id: claims.client_id,
        scopes: claims.scopes,
        redirect_uri: claims.redirect_uri,
        state: claims.state,
        code_challenge: claims.code_challenge,
    })?;

    Ok(LoginOutcome::ConsentRequired {
        prompt,
        state_token: continuation,
    })
}

/// Apply the user's consent decision. Both branches end in a redirect: a
/// declined request carries `error=access_denied`, an accepted one records
/// the grant and carries a fresh authorization code.
pub async fn on_consent(
    db: &DatabaseConnection,
    signer: &TokenSigner,
    cipher: &CodeCipher,
    config: &Config,
    state_token: &str,
    decision: ConsentDecision,
) -> Result<String, AppError> {
    let claims = signer.verify_state_token(state_token)?;
    // Only the post-login continuation token names an account; the initial
    // one must not reach this endpoint.
    let username = claims.sub.ok_or(AppError::InvalidState)?;

    if decision == ConsentDecision::Decline {
        tracing::info!(client_id = %claims.client_id, "consent declined");
        return error_redirect(&claims.redirect_uri, &AppError::ConsentDenied, &claims.state);
    }

    let client = registry::require_client(db, &claims.client_id).await?;
    consent::grant_scopes(db, &client, &username, &claims.scopes).await?;

    let code = codes::create(
        db,
        cipher,
        &client.client_id,
        &username,
        &claims.redirect_uri,
        &claims.scopes,
        &claims.code_challenge,
        config.auth_code_ttl_secs,
    )
    .await?;

    code_redirect(&claims.redirect_uri, &code, &claims.state)
}

fn validate_request(
    client: &entity::client::Model,
    request: &AuthorizeRequest,
) -> Result<(), AppError> {
    if request.response_type != "code" {
        return Err(AppError::UnsupportedResponseType);
    }

    let scopes = split_scopes(&request.scope);
    if scopes.is_empty() {
        return Err(AppError::InvalidRequest("no scopes requested".to_string()));
    }
    let allowed = client.scope_names();
    if scopes.iter().any(|s| !allowed.contains(s)) {
        return Err(AppError::InvalidScope);
    }

    if let Some(method) = request.code_challenge_method.as_deref() {
        if method != "S256" {
            return Err(AppError::InvalidRequest(
                "code_challenge_method must be S256".to_string(),
            ));
        }
    }
    if !crypto::challenge_is_well_formed(&request.code_challenge) {
        return Err(AppError::InvalidRequest(
            "code_challenge must be a base64url SHA-256 digest".to_string(),
        ));
    }

    Ok(())
}

fn split_scopes(scope: &str) -> Vec<String> {
    scope.split_whitespace().map(str::to_string).collect()
}

fn code_redirect(redirect_uri: &str, code: &str, state: &str) -> Result<String, AppError> {
    let mut url = Url::parse(redirect_uri).map_err(|_| AppError::InvalidRedirect)?;
    url.query_pairs_mut()
        .append_pair("code", code)
        .append_pair("state", state);
    Ok(url.to_string())
}

fn error_redirect(redirect_uri: &str, err: &AppError, state: &str) -> Result<String, AppError> {
    let mut url = Url::parse(redirect_uri).map_err(|_| AppError::InvalidRedirect)?;
    url.query_pairs_mut()
        .append_pair("error", err.wire_code())
        .append_pair("state", state);
    Ok(url.to_string())
}
