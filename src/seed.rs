use entity::types::{AccessType, AttributeAccess};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::auth::crypto::{generate_client_id, generate_client_secret};
use crate::auth::password::hash_secret;
use crate::error::AppError;

/// Result of a bootstrap/seed run.
#[derive(Debug)]
pub struct SeedResult {
    /// What happened to the baseline scope: "created" or "exists".
    pub scope_action: &'static str,
    pub client_id: String,
    /// Only set when a new client is created.
    pub client_secret: Option<String>,
}

/// Bootstrap the baseline `profile` scope and the default client.
///
/// Idempotent: reruns find the existing rows and change nothing. The
/// client secret is only known on the run that creates it.
pub async fn bootstrap(
    db: &DatabaseConnection,
    client_name: &str,
    redirect_uri: &str,
) -> Result<SeedResult, AppError> {
    // 1. Baseline profile scope
    let existing_scope = entity::scope::Entity::find_by_id("profile").one(db).await?;
    let scope_action = if existing_scope.is_some() {
        "exists"
    } else {
        let grants = vec![AttributeAccess {
            name: "display_name".to_string(),
            access: AccessType::Read,
        }];
        let scope = entity::scope::ActiveModel {
            name: Set("profile".to_string()),
            description: Set("Basic profile information".to_string()),
            client_attributes: Set("[]".to_string()),
            account_attributes: Set(serde_json::to_string(&grants).unwrap_or_default()),
            created_at: Set(chrono::Utc::now().naive_utc()),
        };
        scope.insert(db).await?;
        "created"
    };

    // 2. Default client, looked up by name
    let existing_client = entity::client::Entity::find()
        .filter(entity::client::Column::Name.eq(client_name))
        .one(db)
        .await?;

    let (client_id, client_secret) = if let Some(client) = existing_client {
        (client.client_id, None)
    } else {
        let client_id = generate_client_id();
        let client_secret = generate_client_secret();
        let client_secret_hash = hash_secret(&client_secret)?;
        let now = chrono::Utc::now().naive_utc();

        let client = entity::client::ActiveModel {
            client_id: Set(client_id.clone()),
            client_secret_hash: Set(client_secret_hash),
            name: Set(client_name.to_string()),
            description: Set("Default client".to_string()),
            redirect_uri: Set(redirect_uri.to_string()),
            scopes: Set(serde_json::to_string(&["profile"]).unwrap_or_default()),
            profile_metadata_attributes: Set("[]".to_string()),
            profile_defaults: Set("{}".to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        client.insert(db).await?;

        (client_id, Some(client_secret))
    };

    Ok(SeedResult {
        scope_action,
        client_id,
        client_secret,
    })
}
