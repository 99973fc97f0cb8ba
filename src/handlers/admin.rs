use axum::{
    extract::{Path, State},
    Json,
};
use entity::types::{AttributeAccess, AttributeDef};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::{Deserialize, Serialize};

use crate::auth::crypto::{generate_client_id, generate_client_secret};
use crate::auth::middleware::AdminKey;
use crate::auth::password::hash_secret;
use crate::auth::registry;
use crate::error::AppError;
use crate::AppState;

// --- Request / Response types ---

#[derive(Debug, Deserialize)]
pub struct CreateClientRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    #[serde(default)]
    pub profile_metadata_attributes: Vec<AttributeDef>,
    #[serde(default)]
    pub profile_defaults: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct CreateClientResponse {
    pub client_id: String,
    pub client_secret: String, // Only returned on create
    pub name: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ClientResponse {
    pub client_id: String,
    pub name: String,
    pub description: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct RotateSecretResponse {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateScopeRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub account_attributes: Vec<AttributeAccess>,
    #[serde(default)]
    pub client_attributes: Vec<AttributeAccess>,
}

#[derive(Debug, Serialize)]
pub struct ScopeResponse {
    pub name: String,
    pub description: String,
    pub account_attributes: Vec<AttributeAccess>,
    pub client_attributes: Vec<AttributeAccess>,
    pub created_at: String,
}

// --- Handlers ---

pub async fn create_client(
    _admin: AdminKey,
    State(state): State<AppState>,
    Json(req): Json<CreateClientRequest>,
) -> Result<Json<CreateClientResponse>, AppError> {
    // The client may only be registered for scopes that exist, and its
    // metadata defaults must satisfy its own declared kinds.
    registry::require_scopes(&state.db, &req.scopes).await?;
    for (name, value) in &req.profile_defaults {
        let def = req
            .profile_metadata_attributes
            .iter()
            .find(|d| &d.name == name)
            .ok_or_else(|| AppError::UnknownAttribute(name.clone()))?;
        if !def.kind.accepts(value) {
            return Err(AppError::InvalidRequest(format!(
                "Default for '{name}' does not match its declared kind"
            )));
        }
    }

    let client_id = generate_client_id();
    let client_secret = generate_client_secret();
    let client_secret_hash = hash_secret(&client_secret)?;
    let now = chrono::Utc::now().naive_utc();

    let model = entity::client::ActiveModel {
        client_id: Set(client_id.clone()),
        client_secret_hash: Set(client_secret_hash),
        name: Set(req.name.clone()),
        description: Set(req.description),
        redirect_uri: Set(req.redirect_uri.clone()),
        scopes: Set(serde_json::to_string(&req.scopes).unwrap_or_default()),
        profile_metadata_attributes: Set(
            serde_json::to_string(&req.profile_metadata_attributes).unwrap_or_default()
        ),
        profile_defaults: Set(serde_json::to_string(&req.profile_defaults).unwrap_or_default()),
        created_at: Set(now),
        updated_at: Set(now),
    };
    model.insert(&state.db).await?;

    tracing::info!(client_id = %client_id, name = %req.name, "client registered");

    Ok(Json(CreateClientResponse {
        client_id,
        client_secret,
        name: req.name,
        redirect_uri: req.redirect_uri,
        scopes: req.scopes,
    }))
}

pub async fn list_clients(
    _admin: AdminKey,
    State(state): State<AppState>,
) -> Result<Json<Vec<ClientResponse>>, AppError> {
    let clients = entity::client::Entity::find().all(&state.db).await?;

    let responses: Vec<ClientResponse> = clients
        .into_iter()
        .map(|c| ClientResponse {
            scopes: c.scope_names(),
            client_id: c.client_id,
            name: c.name,
            description: c.description,
            redirect_uri: c.redirect_uri,
            created_at: c.created_at.to_string(),
        })
        .collect();

    Ok(Json(responses))
}

pub async fn rotate_secret(
    _admin: AdminKey,
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> Result<Json<RotateSecretResponse>, AppError> {
    let client = registry::require_client(&state.db, &client_id).await?;

    let new_secret = generate_client_secret();
    let new_hash = hash_secret(&new_secret)?;

    let mut active: entity::client::ActiveModel = client.into();
    active.client_secret_hash = Set(new_hash);
    active.updated_at = Set(chrono::Utc::now().naive_utc());
    let updated = active.update(&state.db).await?;

    tracing::info!(client_id = %updated.client_id, "client secret rotated");

    Ok(Json(RotateSecretResponse {
        client_id: updated.client_id,
        client_secret: new_secret,
    }))
}

pub async fn create_scope(
    _admin: AdminKey,
    State(state): State<AppState>,
    Json(req): Json<CreateScopeRequest>,
) -> Result<Json<ScopeResponse>, AppError> {
    let existing = entity::scope::Entity::find_by_id(&req.name)
        .one(&state.db)
        .await?;
    if existing.is_some() {
        return Err(AppError::InvalidRequest(format!(
            "Scope '{}' already exists",
            req.name
        )));
    }

    let now = chrono::Utc::now().naive_utc();
    let model = entity::scope::ActiveModel {
        name: Set(req.name.clone()),
        description: Set(req.description.clone()),
        client_attributes: Set(serde_json::to_string(&req.client_attributes).unwrap_or_default()),
        account_attributes: Set(
            serde_json::to_string(&req.account_attributes).unwrap_or_default()
        ),
        created_at: Set(now),
    };
    model.insert(&state.db).await?;

    Ok(Json(ScopeResponse {
        name: req.name,
        description: req.description,
        account_attributes: req.account_attributes,
        client_attributes: req.client_attributes,
        created_at: now.to_string(),
    }))
}

pub async fn list_scopes(
    _admin: AdminKey,
    State(state): State<AppState>,
) -> Result<Json<Vec<ScopeResponse>>, AppError> {
    let scopes = entity::scope::Entity::find().all(&state.db).await?;

    let responses: Vec<ScopeResponse> = scopes
        .into_iter()
        .map(|s| ScopeResponse {
            account_attributes: s.account_grants(),
            client_attributes: s.client_grants(),
            name: s.name,
            description: s.description,
            created_at: s.created_at.to_string(),
        })
        .collect();

    Ok(Json(responses))
}
