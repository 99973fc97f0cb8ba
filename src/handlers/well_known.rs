use axum::{extract::State, Json};

use crate::auth::jwt::JsonWebKeySet;
use crate::error::AppError;
use crate::AppState;

/// Public half of the signing key, published so resource servers can
/// verify access tokens without sharing secrets.
pub async fn jwks(State(state): State<AppState>) -> Result<Json<JsonWebKeySet>, AppError> {
    Ok(Json(state.signer.jwks()?))
}
