use sea_orm::DatabaseConnection;

use crate::auth::codes;
use crate::auth::crypto::{self, CodeCipher};
use crate::auth::jwt::TokenSigner;
use crate::auth::tokens::{self, TokenPair};
use crate::error::AppError;

/// Redeem an authorization code for a token pair, exactly once.
///
/// The client is authenticated before dispatch. Checks run in order:
/// envelope and row, expiry, request binding, PKCE, then the atomic
/// consume. A PKCE failure burns the code, so retrying the same code with
/// the correct verifier still fails.
pub async fn redeem_code(
    db: &DatabaseConnection,
    signer: &TokenSigner,
    cipher: &CodeCipher,
    client: &entity::client::Model,
    code: &str,
    code_verifier: &str,
    redirect_uri: &str,
) -> Result<TokenPair, AppError> {
    let record = codes::load(db, cipher, code).await?;

    if record.expires_at < chrono::Utc::now().naive_utc() {
        return Err(AppError::ExpiredCode);
    }

    if record.client_id != client.client_id || record.redirect_uri != redirect_uri {
        return Err(AppError::ClientMismatch);
    }

    if !crypto::verify_pkce(code_verifier, &record.code_challenge) {
        codes::invalidate(db, &record.id).await?;
        return Err(AppError::PkceVerificationFailed);
    }

    codes::consume(db, &record.id).await?;

    tokens::issue_token_pair(
        db,
        signer,
        &record.username,
        &client.client_id,
        record.scope_names(),
    )
    .await
}
