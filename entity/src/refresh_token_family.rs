use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Revocation ledger for refresh-token rotation: one row per active session,
/// tracking the latest valid generation. Rows are flipped to `revoked`, never
/// deleted, so replay after revocation stays distinguishable from a forged id.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "refresh_token_families")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub family_id: String,
    pub username: String,
    pub client_id: String,
    pub generation: i64,
    pub revoked: bool,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
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
