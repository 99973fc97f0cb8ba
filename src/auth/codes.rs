use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::auth::crypto::{self, CodeCipher};
use crate::error::AppError;

/// Mint an authorization code for an approved request. The persisted row
/// carries everything the token endpoint later checks; the string handed to
/// the client is an encrypted envelope around `username:id`.
pub async fn create(
    db: &DatabaseConnection,
    cipher: &CodeCipher,
    client_id: &str,
    username: &str,
    redirect_uri: &str,
    scopes: &[String],
    code_challenge: &str,
    ttl_secs: i64,
) -> Result<String, AppError> {
    let id = crypto::generate_code_id();
    let now = chrono::Utc::now().naive_utc();

    let model = entity::authorization_code::ActiveModel {
        id: Set(id.clone()),
        client_id: Set(client_id.to_string()),
        username: Set(username.to_string()),
        redirect_uri: Set(redirect_uri.to_string()),
        granted_scopes: Set(serde_json::to_string(scopes).unwrap_or_default()),
        code_challenge: Set(code_challenge.to_string()),
        consumed: Set(false),
        expires_at: Set(now + chrono::Duration::seconds(ttl_secs)),
        created_at: Set(now),
    };
    model.insert(db).await?;

    cipher.seal(&format!("{username}:{id}"))
}

/// Decrypt a presented code and look up its record. Any envelope defect,
/// unknown id, or username mismatch collapses to `InvalidCode`.
pub async fn load(
    db: &DatabaseConnection,
    cipher: &CodeCipher,
    code: &str,
) -> Result<entity::authorization_code::Model, AppError> {
    let plaintext = cipher.open(code)?;
    let (username, id) = plaintext.split_once(':').ok_or(AppError::InvalidCode)?;

    let record = entity::authorization_code::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(AppError::InvalidCode)?;

    if record.username != username {
        return Err(AppError::InvalidCode);
    }
    Ok(record)
}

/// Atomically flip the code from fresh to consumed. Loses the race (or
/// retries a spent code) exactly when no row was updated.
pub async fn consume(db: &DatabaseConnection, id: &str) -> Result<(), AppError> {
    let result = entity::authorization_code::Entity::update_many()
        .col_expr(entity::authorization_code::Column::Consumed, Expr::value(true))
        .filter(entity::authorization_code::Column::Id.eq(id))
        .filter(entity::authorization_code::Column::Consumed.eq(false))
        .exec(db)
        .await?;

    if result.rows_affected != 1 {
        return Err(AppError::CodeAlreadyUsed);
    }
    Ok(())
}

/// Mark a code consumed regardless of its current state. Used when a
/// redemption attempt fails verification and the code must not stay live.
pub async fn invalidate(db: &DatabaseConnection, id: &str) -> Result<(), AppError> {
    entity::authorization_code::Entity::update_many()
        .col_expr(entity::authorization_code::Column::Consumed, Expr::value(true))
        .filter(entity::authorization_code::Column::Id.eq(id))
        .exec(db)
        .await?;
    Ok(())
}
