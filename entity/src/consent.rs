use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One row per (client, account) link. Unique index enforced in the migration.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "consents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub client_id: String,
    pub username: String,
    /// JSON list of granted scope names.
    pub granted_scopes: String,
    /// JSON map of the client's metadata namespace for this account.
    pub metadata: String,
    pub is_connected: bool,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

impl Model {
    pub fn scope_names(&self) -> Vec<String> {
        serde_json::from_str(&self.granted_scopes).unwrap_or_default()
    }

    pub fn metadata_map(&self) -> serde_json::Map<String, serde_json::Value> {
        serde_json::from_str(&self.metadata).unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::client::Entity",
        from = "Column::ClientId",
        to = "super::client::Column::ClientId"
    )]
    Client,
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::Username",
        to = "super::account::Column::Username"
    )]
    Account,
}

impl Related<super::client::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Client.def()
    }
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
