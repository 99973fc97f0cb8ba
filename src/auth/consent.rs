use std::collections::{BTreeMap, HashSet};

use entity::types::{AccessType, AttributeDef};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde::Serialize;

use crate::auth::registry;
use crate::error::AppError;

/// Attribute-level access resolved from a set of scopes, split into the
/// account-owned namespace and the client's metadata namespace.
#[derive(Debug, Default, Clone)]
pub struct EffectiveAccess {
    pub account: BTreeMap<String, AccessType>,
    pub metadata: BTreeMap<String, AccessType>,
}

impl EffectiveAccess {
    pub fn account_access(&self, attribute: &str) -> AccessType {
        self.account.get(attribute).copied().unwrap_or(AccessType::None)
    }

    pub fn metadata_access(&self, attribute: &str) -> AccessType {
        self.metadata.get(attribute).copied().unwrap_or(AccessType::None)
    }
}

/// Merge attribute grants across scopes by name. When two scopes disagree
/// on the same attribute the stronger grant wins: write > read > none.
pub fn effective_access<'a, I>(scopes: I) -> EffectiveAccess
where
    I: IntoIterator<Item = &'a entity::scope::Model>,
{
    let mut access = EffectiveAccess::default();
    for scope in scopes {
        for grant in scope.account_grants() {
            access
                .account
                .entry(grant.name)
                .and_modify(|a| *a = (*a).max(grant.access))
                .or_insert(grant.access);
        }
        for grant in scope.client_grants() {
            access
                .metadata
                .entry(grant.name)
                .and_modify(|a| *a = (*a).max(grant.access))
                .or_insert(grant.access);
        }
    }
    access
}

#[derive(Debug, Clone, Serialize)]
pub struct ScopeSummary {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttributeGrant {
    pub name: String,
    pub access: AccessType,
}

/// Everything the consent page needs to render a decision, resolved from
/// registry data with no side effects.
#[derive(Debug, Clone, Serialize)]
pub struct ConsentPrompt {
    pub client_name: String,
    pub client_description: String,
    /// Whether the account is already linked to this client.
    pub connected: bool,
    /// Scopes that still need the user's approval. Empty when everything
    /// requested was granted before.
    pub pending_scopes: Vec<ScopeSummary>,
    /// Account-owned attributes the pending scopes would share.
    pub account_access: Vec<AttributeGrant>,
    /// Client-metadata attributes the pending scopes would expose.
    pub metadata_access: Vec<AttributeGrant>,
    /// Attribute definitions the client will store on the account,
    /// populated on first link only.
    pub stored_attributes: Vec<AttributeDef>,
    /// Previously granted scope names, so the prompt never hides what is
    /// already shared.
    pub already_granted: Vec<String>,
}

impl ConsentPrompt {
    /// Names of the scopes awaiting approval.
    pub fn pending_scope_names(&self) -> Vec<String> {
        self.pending_scopes.iter().map(|s| s.name.clone()).collect()
    }
}

/// Resolve a consent prompt for the requested scopes against an existing
/// consent record. Pure over the loaded registry rows.
pub fn resolve(
    client: &entity::client::Model,
    consent: Option<&entity::consent::Model>,
    requested_scopes: &[entity::scope::Model],
) -> ConsentPrompt {
    let already_granted: Vec<String> = consent.map(|c| c.scope_names()).unwrap_or_default();
    let granted_set: HashSet<&str> = already_granted.iter().map(String::as_str).collect();
    let connected = consent.is_some();

    let pending: Vec<&entity::scope::Model> = requested_scopes
        .iter()
        .filter(|s| !granted_set.contains(s.name.as_str()))
        .collect();

    let access = effective_access(pending.iter().copied());

    let to_grants = |map: &BTreeMap<String, AccessType>| {
        map.iter()
            .map(|(name, access)| AttributeGrant {
                name: name.clone(),
                access: *access,
            })
            .collect()
    };

    ConsentPrompt {
        client_name: client.name.clone(),
        client_description: client.description.clone(),
        connected,
        pending_scopes: pending
            .iter()
            .map(|s| ScopeSummary {
                name: s.name.clone(),
                description: s.description.clone(),
            })
            .collect(),
        account_access: to_grants(&access.account),
        metadata_access: to_grants(&access.metadata),
        stored_attributes: if connected {
            Vec::new()
        } else {
            client.metadata_attributes()
        },
        already_granted,
    }
}

/// Persist a consent decision: create the (client, account) link on first
/// acceptance, union newly granted scopes into an existing one. Granting an
/// already-granted scope is a no-op, never a duplicate row.
pub async fn grant_scopes(
    db: &DatabaseConnection,
    client: &entity::client::Model,
    username: &str,
    scopes: &[String],
) -> Result<entity::consent::Model, AppError> {
    let now = chrono::Utc::now().naive_utc();

    match registry::find_consent(db, &client.client_id, username).await? {
        Some(existing) => {
            let mut granted = existing.scope_names();
            let known: HashSet<String> = granted.iter().cloned().collect();
            let new_scopes: Vec<String> = scopes
                .iter()
                .filter(|s| !known.contains(*s))
                .cloned()
                .collect();

            if new_scopes.is_empty() {
                return Ok(existing);
            }

            granted.extend(new_scopes);
            let mut active: entity::consent::ActiveModel = existing.into();
            active.granted_scopes = Set(serde_json::to_string(&granted).unwrap_or_default());
            active.updated_at = Set(now);
            Ok(active.update(db).await?)
        }
        None => {
            // First link: materialize the client's metadata defaults.
            let defaults = client.default_metadata();
            let model = entity::consent::ActiveModel {
                id: Set(uuid::Uuid::new_v4().to_string()),
                client_id: Set(client.client_id.clone()),
                username: Set(username.to_string()),
                granted_scopes: Set(serde_json::to_string(&scopes).unwrap_or_default()),
                metadata: Set(serde_json::to_string(&defaults).unwrap_or_default()),
                is_connected: Set(true),
                created_at: Set(now),
                updated_at: Set(now),
            };
            Ok(model.insert(db).await?)
        }
    }
}
