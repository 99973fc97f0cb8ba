use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::auth::jwt::TokenSigner;
use crate::error::AppError;

/// Freshly issued access/refresh pair. Wire shaping is up to the handler.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

/// Start a new session for (account, client): open a rotation family at
/// generation zero and sign a pair against it.
pub async fn issue_token_pair(
    db: &DatabaseConnection,
    signer: &TokenSigner,
    username: &str,
    client_id: &str,
    scopes: Vec<String>,
) -> Result<TokenPair, AppError> {
    let family_id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().naive_utc();

    entity::refresh_token_family::ActiveModel {
        family_id: Set(family_id.clone()),
        username: Set(username.to_string()),
        client_id: Set(client_id.to_string()),
        generation: Set(0),
        revoked: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    let access_token = signer.issue_access_token(username, client_id, scopes.clone())?;
    let refresh_token = signer.issue_refresh_token(username, client_id, scopes, &family_id, 0)?;

    Ok(TokenPair {
        access_token,
        refresh_token,
        expires_in: signer.access_token_ttl_secs(),
    })
}

/// Rotate a refresh token. The presented generation must match the ledger
/// exactly; a stale generation is evidence the token was already rotated
/// away, so the whole family is revoked before the caller is refused.
pub async fn refresh_token_pair(
    db: &DatabaseConnection,
    signer: &TokenSigner,
    client_id: &str,
    refresh_token: &str,
) -> Result<TokenPair, AppError> {
    let claims = signer.verify_refresh_token(refresh_token)?;

    if claims.client_id != client_id {
        return Err(AppError::ClientMismatch);
    }

    let family = entity::refresh_token_family::Entity::find_by_id(&claims.family_id)
        .one(db)
        .await?
        .ok_or(AppError::InvalidToken)?;

    if family.revoked {
        return Err(AppError::FamilyRevoked);
    }

    if family.generation != claims.generation {
        revoke_family(db, &claims.family_id).await?;
        tracing::warn!(
            family_id = %claims.family_id,
            presented = claims.generation,
            current = family.generation,
            "refresh token replay detected, family revoked"
        );
        return Err(AppError::TokenReuseDetected);
    }

    // Advance the ledger only if nobody rotated first. The loser of a
    // concurrent race is indistinguishable from a replay and is treated
    // as one.
    let next_generation = claims.generation + 1;
    let result = entity::refresh_token_family::Entity::update_many()
        .col_expr(
            entity::refresh_token_family::Column::Generation,
            Expr::value(next_generation),
        )
        .col_expr(
            entity::refresh_token_family::Column::UpdatedAt,
            Expr::value(chrono::Utc::now().naive_utc()),
        )
        .filter(entity::refresh_token_family::Column::FamilyId.eq(&claims.family_id))
        .filter(entity::refresh_token_family::Column::Generation.eq(claims.generation))
        .filter(entity::refresh_token_family::Column::Revoked.eq(false))
        .exec(db)
        .await?;

    if result.rows_affected != 1 {
        revoke_family(db, &claims.family_id).await?;
        tracing::warn!(
            family_id = %claims.family_id,
            "lost rotation check-and-set, family revoked"
        );
        return Err(AppError::TokenReuseDetected);
    }

    let access_token = signer.issue_access_token(&claims.sub, client_id, claims.scopes.clone())?;
    let refresh_token = signer.issue_refresh_token(
        &claims.sub,
        client_id,
        claims.scopes,
        &claims.family_id,
        next_generation,
    )?;

    Ok(TokenPair {
        access_token,
        refresh_token,
        expires_in: signer.access_token_ttl_secs(),
    })
}

/// Flip a family to revoked. The row stays behind so later replays of its
/// tokens are refused as revoked rather than unknown.
pub async fn revoke_family(db: &DatabaseConnection, family_id: &str) -> Result<(), AppError> {
    entity::refresh_token_family::Entity::update_many()
        .col_expr(entity::refresh_token_family::Column::Revoked, Expr::value(true))
        .col_expr(
            entity::refresh_token_family::Column::UpdatedAt,
            Expr::value(chrono::Utc::now().naive_utc()),
        )
        .filter(entity::refresh_token_family::Column::FamilyId.eq(family_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Best-effort revocation for the revoke endpoint. A token that does not
/// verify is dropped silently; the endpoint must not leak validity.
pub async fn revoke_presented_token(
    db: &DatabaseConnection,
    signer: &TokenSigner,
    token: &str,
) -> Result<(), AppError> {
    if let Ok(claims) = signer.verify_refresh_token(token) {
        revoke_family(db, &claims.family_id).await?;
        tracing::info!(family_id = %claims.family_id, "refresh token family revoked on request");
    }
    Ok(())
}
