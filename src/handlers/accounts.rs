use axum::{extract::Path, extract::State, Json};
use sea_orm::{ActiveModelTrait, IntoActiveModel, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::consent;
use crate::auth::middleware::AuthenticatedUser;
use crate::auth::password::hash_secret;
use crate::auth::registry;
use crate::error::AppError;
use crate::AppState;

// --- Request / Response types ---

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    /// Initial account-owned attributes; these names define what is
    /// writable later.
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub username: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAccountRequest {
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// The account as one client is allowed to see it.
#[derive(Debug, Serialize)]
pub struct ScopedAccountResponse {
    pub username: String,
    pub attributes: serde_json::Map<String, serde_json::Value>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

// --- Handlers ---

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, AppError> {
    let existing = registry::find_account(&state.db, &req.username).await?;
    if existing.is_some() {
        return Err(AppError::AccountExists);
    }

    let now = chrono::Utc::now().naive_utc();
    let password_hash = hash_secret(&req.password)?;

    let account = entity::account::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        username: Set(req.username),
        password_hash: Set(password_hash),
        attributes: Set(serde_json::to_string(&req.attributes).unwrap_or_default()),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let account = account.insert(&state.db).await?;

    tracing::info!(username = %account.username, "account registered");

    Ok(Json(RegisterResponse {
        username: account.username,
        created_at: account.created_at.to_string(),
    }))
}

/// Scoped attribute read. `me` resolves to the token subject; any other
/// username must match the subject exactly.
pub async fn get_account(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<ScopedAccountResponse>, AppError> {
    let username = resolve_username(&user, &username)?.to_string();
    let account = registry::require_account(&state.db, &username).await?;

    Ok(Json(scoped_view(&state, &user, &account).await?))
}

/// Scoped attribute write. Each attribute needs write access; names are
/// validated against the account's existing attributes or, for metadata,
/// the client's declared definitions and value kinds.
pub async fn update_account(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(req): Json<UpdateAccountRequest>,
) -> Result<Json<ScopedAccountResponse>, AppError> {
    let username = resolve_username(&user, &username)?.to_string();
    let account = registry::require_account(&state.db, &username).await?;
    let client = registry::require_client(&state.db, &user.client_id).await?;

    let scopes = registry::require_scopes(&state.db, &user.scopes).await?;
    let access = consent::effective_access(&scopes);

    let mut attributes = account.attribute_map();
    for (name, value) in &req.attributes {
        if !attributes.contains_key(name) {
            return Err(AppError::UnknownAttribute(name.clone()));
        }
        if !access.account_access(name).can_write() {
            return Err(AppError::AttributeNotWritable(name.clone()));
        }
        attributes.insert(name.clone(), value.clone());
    }

    let declared = client.metadata_attributes();
    for (name, value) in &req.metadata {
        let def = declared
            .iter()
            .find(|d| &d.name == name)
            .ok_or_else(|| AppError::UnknownAttribute(name.clone()))?;
        if !access.metadata_access(name).can_write() {
            return Err(AppError::AttributeNotWritable(name.clone()));
        }
        if !def.kind.accepts(value) {
            return Err(AppError::InvalidRequest(format!(
                "Attribute '{}' expects a {} value",
                name,
                format!("{:?}", def.kind).to_lowercase()
            )));
        }
    }

    let now = chrono::Utc::now().naive_utc();

    if !req.attributes.is_empty() {
        let mut active = account.clone().into_active_model();
        active.attributes = Set(serde_json::to_string(&attributes).unwrap_or_default());
        active.updated_at = Set(now);
        active.update(&state.db).await?;
    }

    if !req.metadata.is_empty() {
        // Metadata lives on the consent row; no link, no namespace.
        let consent_row = registry::find_consent(&state.db, &user.client_id, &username)
            .await?
            .ok_or(AppError::Forbidden)?;
        let mut metadata = consent_row.metadata_map();
        for (name, value) in &req.metadata {
            metadata.insert(name.clone(), value.clone());
        }
        let mut active: entity::consent::ActiveModel = consent_row.into();
        active.metadata = Set(serde_json::to_string(&metadata).unwrap_or_default());
        active.updated_at = Set(now);
        active.update(&state.db).await?;
    }

    let account = registry::require_account(&state.db, &username).await?;
    Ok(Json(scoped_view(&state, &user, &account).await?))
}

fn resolve_username<'a>(user: &'a AuthenticatedUser, path: &'a str) -> Result<&'a str, AppError> {
    if path == "me" || path == user.username {
        Ok(&user.username)
    } else {
        Err(AppError::Forbidden)
    }
}

/// Filter the account through the caller's effective access: account
/// attributes and the caller's own metadata namespace, readable entries
/// only.
async fn scoped_view(
    state: &AppState,
    user: &AuthenticatedUser,
    account: &entity::account::Model,
) -> Result<ScopedAccountResponse, AppError> {
    let scopes = registry::require_scopes(&state.db, &user.scopes).await?;
    let access = consent::effective_access(&scopes);

    let attributes = account
        .attribute_map()
        .into_iter()
        .filter(|(name, _)| access.account_access(name).can_read())
        .collect();

    let metadata = registry::find_consent(&state.db, &user.client_id, &account.username)
        .await?
        .map(|c| c.metadata_map())
        .unwrap_or_default()
        .into_iter()
        .filter(|(name, _)| access.metadata_access(name).can_read())
        .collect();

    Ok(ScopedAccountResponse {
        username: account.username.clone(),
        attributes,
        metadata,
    })
}
