use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::types::AttributeDef;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "clients")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub client_id: String,
    pub client_secret_hash: String,
    pub name: String,
    pub description: String,
    pub redirect_uri: String,
    /// JSON list of scope names this client may request.
    pub scopes: String,
    /// JSON list of typed attribute definitions the client stores on linked accounts.
    pub profile_metadata_attributes: String,
    /// JSON map of initial values for the client's metadata namespace.
    pub profile_defaults: String,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

impl Model {
    pub fn scope_names(&self) -> Vec<String> {
        serde_json::from_str(&self.scopes).unwrap_or_default()
    }

    pub fn metadata_attributes(&self) -> Vec<AttributeDef> {
        serde_json::from_str(&self.profile_metadata_attributes).unwrap_or_default()
    }

    pub fn default_metadata(&self) -> serde_json::Map<String, serde_json::Value> {
        serde_json::from_str(&self.profile_defaults).unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::consent::Entity")]
    Consents,
    #[sea_orm(has_many = "super::authorization_code::Entity")]
    AuthorizationCodes,
    #[sea_orm(has_many = "super::refresh_token_family::Entity")]
    RefreshTokenFamilies,
}

impl Related<super::consent::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Consents.def()
    }
}

impl Related<super::authorization_code::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AuthorizationCodes.def()
    }
}

impl Related<super::refresh_token_family::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RefreshTokenFamilies.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
