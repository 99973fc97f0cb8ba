use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Server-side half of an issued authorization code. The value handed to the
/// client is an encrypted envelope around `username:id`; only the random `id`
/// is stored here.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "authorization_codes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub client_id: String,
    pub username: String,
    pub redirect_uri: String,
    /// JSON list of the scope names bound at issuance.
    pub granted_scopes: String,
    pub code_challenge: String,
    pub consumed: bool,
    pub expires_at: chrono::NaiveDateTime,
    pub created_at: chrono::NaiveDateTime,
}

impl Model {
    pub fn scope_names(&self) -> Vec<String> {
        serde_json::from_str(&self.granted_scopes).unwrap_or_default()
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
