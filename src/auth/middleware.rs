use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use base64::Engine;
use sea_orm::DatabaseConnection;
use subtle::ConstantTimeEq;

use crate::auth::registry;
use crate::error::AppError;

/// Extracts the authenticated account from a Bearer access token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub username: String,
    pub client_id: String,
    pub scopes: Vec<String>,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync + AsRef<crate::AppState>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state: &crate::AppState = state.as_ref();

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AppError::Unauthorized)?;

        let claims = app_state.signer.verify_access_token(token)?;

        Ok(AuthenticatedUser {
            username: claims.sub,
            client_id: claims.client_id,
            scopes: claims.scopes,
        })
    }
}

/// Client credentials taken from an HTTP Basic authorization header.
#[derive(Debug, Clone)]
pub struct BasicCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for BasicCredentials
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let encoded = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Basic "))
            .ok_or(AppError::InvalidClient)?;

        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|_| AppError::InvalidClient)?;
        let decoded = String::from_utf8(decoded).map_err(|_| AppError::InvalidClient)?;

        let (client_id, client_secret) =
            decoded.split_once(':').ok_or(AppError::InvalidClient)?;

        Ok(BasicCredentials {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        })
    }
}

/// Token-endpoint client authentication. The Basic header wins when
/// present; body fields are the fallback. Either way the secret is checked
/// against the stored hash before any grant logic runs.
pub async fn authenticate_client_request(
    db: &DatabaseConnection,
    basic: Option<BasicCredentials>,
    body_client_id: Option<&str>,
    body_client_secret: Option<&str>,
) -> Result<entity::client::Model, AppError> {
    let (client_id, client_secret) = match basic {
        Some(creds) => (creds.client_id, creds.client_secret),
        None => match (body_client_id, body_client_secret) {
            (Some(id), Some(secret)) => (id.to_string(), secret.to_string()),
            _ => return Err(AppError::InvalidClient),
        },
    };
    registry::authenticate_client(db, &client_id, &client_secret).await
}

/// Admin auth via the X-Admin-Key header, compared in constant time.
pub struct AdminKey;

#[async_trait]
impl<S> FromRequestParts<S> for AdminKey
where
    S: Send + Sync + AsRef<crate::AppState>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state: &crate::AppState = state.as_ref();

        let provided = parts
            .headers
            .get("X-Admin-Key")
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        let expected = app_state.config.admin_api_key.as_bytes();
        if bool::from(provided.as_bytes().ct_eq(expected)) {
            Ok(AdminKey)
        } else {
            Err(AppError::Forbidden)
        }
    }
}
