use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use crate::auth::password::verify_secret;
use crate::error::AppError;

pub async fn find_client(
    db: &DatabaseConnection,
    client_id: &str,
) -> Result<Option<entity::client::Model>, AppError> {
    Ok(entity::client::Entity::find_by_id(client_id).one(db).await?)
}

pub async fn require_client(
    db: &DatabaseConnection,
    client_id: &str,
) -> Result<entity::client::Model, AppError> {
    find_client(db, client_id).await?.ok_or(AppError::InvalidClient)
}

/// Look up a client and verify its secret against the stored hash.
pub async fn authenticate_client(
    db: &DatabaseConnection,
    client_id: &str,
    client_secret: &str,
) -> Result<entity::client::Model, AppError> {
    let client = require_client(db, client_id).await?;
    if !verify_secret(client_secret, &client.client_secret_hash)? {
        return Err(AppError::InvalidClient);
    }
    Ok(client)
}

pub async fn find_account(
    db: &DatabaseConnection,
    username: &str,
) -> Result<Option<entity::account::Model>, AppError> {
    Ok(entity::account::Entity::find()
        .filter(entity::account::Column::Username.eq(username))
        .one(db)
        .await?)
}

pub async fn require_account(
    db: &DatabaseConnection,
    username: &str,
) -> Result<entity::account::Model, AppError> {
    find_account(db, username).await?.ok_or(AppError::AccountNotFound)
}

/// Load every named scope definition, failing on the first unknown name.
pub async fn require_scopes(
    db: &DatabaseConnection,
    names: &[String],
) -> Result<Vec<entity::scope::Model>, AppError> {
    let mut scopes = Vec::with_capacity(names.len());
    for name in names {
        let scope = entity::scope::Entity::find_by_id(name)
            .one(db)
            .await?
            .ok_or_else(|| AppError::ScopeNotFound(name.clone()))?;
        scopes.push(scope);
    }
    Ok(scopes)
}

pub async fn find_consent(
    db: &DatabaseConnection,
    client_id: &str,
    username: &str,
) -> Result<Option<entity::consent::Model>, AppError> {
    Ok(entity::consent::Entity::find()
        .filter(entity::consent::Column::ClientId.eq(client_id))
        .filter(entity::consent::Column::Username.eq(username))
        .one(db)
        .await?)
}
