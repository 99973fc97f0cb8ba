use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Authorize-request validation
    #[error("Unknown or invalid client")]
    InvalidClient,

    #[error("Redirect URI does not match the registered URI")]
    InvalidRedirect,

    #[error("Requested scope is not allowed for this client")]
    InvalidScope,

    #[error("Only response_type=code is supported")]
    UnsupportedResponseType,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // State-token verification
    #[error("Invalid state token")]
    InvalidState,

    #[error("State token expired")]
    ExpiredState,

    // Code exchange
    #[error("Invalid authorization code")]
    InvalidCode,

    #[error("Authorization code expired")]
    ExpiredCode,

    #[error("Authorization code already used")]
    CodeAlreadyUsed,

    #[error("Code was issued to a different client or redirect URI")]
    ClientMismatch,

    #[error("PKCE verification failed")]
    PkceVerificationFailed,

    // Token verification and rotation
    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    ExpiredToken,

    #[error("Refresh token reuse detected")]
    TokenReuseDetected,

    #[error("Refresh token family revoked")]
    FamilyRevoked,

    // Consent
    #[error("The user denied the authorization request")]
    ConsentDenied,

    // Accounts and resources
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account not found")]
    AccountNotFound,

    #[error("Account already exists")]
    AccountExists,

    #[error("Scope not found: {0}")]
    ScopeNotFound(String),

    #[error("Unknown attribute: {0}")]
    UnknownAttribute(String),

    #[error("Attribute is not writable with the granted scopes: {0}")]
    AttributeNotWritable(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    // Infrastructure
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    /// Stable machine-readable code, used both in JSON error bodies and as
    /// the `error` query parameter on redirect-based failures.
    pub fn wire_code(&self) -> &'static str {
        match self {
            AppError::InvalidClient => "invalid_client",
            AppError::InvalidRedirect => "invalid_redirect",
            AppError::InvalidScope => "invalid_scope",
            AppError::UnsupportedResponseType => "unsupported_response_type",
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::InvalidState => "invalid_state",
            AppError::ExpiredState => "expired_state",
            AppError::InvalidCode => "invalid_code",
            AppError::ExpiredCode => "expired_code",
            AppError::CodeAlreadyUsed => "code_already_used",
            AppError::ClientMismatch => "client_mismatch",
            AppError::PkceVerificationFailed => "pkce_verification_failed",
            AppError::InvalidToken => "invalid_token",
            AppError::ExpiredToken => "expired_token",
            AppError::TokenReuseDetected => "token_reuse_detected",
            AppError::FamilyRevoked => "family_revoked",
            AppError::ConsentDenied => "access_denied",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::AccountNotFound => "account_not_found",
            AppError::AccountExists => "account_exists",
            AppError::ScopeNotFound(_) => "scope_not_found",
            AppError::UnknownAttribute(_) => "unknown_attribute",
            AppError::AttributeNotWritable(_) => "attribute_not_writable",
            AppError::Unauthorized => "unauthorized",
            AppError::Forbidden => "forbidden",
            AppError::Internal(_) | AppError::Database(_) => "internal_error",
            AppError::Jwt(_) => "invalid_token",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidClient
            | AppError::InvalidToken
            | AppError::ExpiredToken
            | AppError::TokenReuseDetected
            | AppError::FamilyRevoked
            | AppError::InvalidCredentials
            | AppError::Unauthorized
            | AppError::Jwt(_) => StatusCode::UNAUTHORIZED,

            AppError::ConsentDenied
            | AppError::AttributeNotWritable(_)
            | AppError::Forbidden => StatusCode::FORBIDDEN,

            AppError::AccountNotFound | AppError::ScopeNotFound(_) => StatusCode::NOT_FOUND,

            AppError::AccountExists => StatusCode::CONFLICT,

            AppError::Internal(_) | AppError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }

            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match &self {
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e}");
                "Internal server error".to_string()
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                "Internal server error".to_string()
            }
            AppError::Jwt(_) => "Invalid token".to_string(),
            other => other.to_string(),
        };

        let body = json!({
            "error": self.wire_code(),
            "message": message,
        });

        (self.status(), axum::Json(body)).into_response()
    }
}
