use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::types::AttributeAccess;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "scopes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub name: String,
    pub description: String,
    /// JSON list of grants on the client's metadata namespace.
    pub client_attributes: String,
    /// JSON list of grants on the account-owned namespace.
    pub account_attributes: String,
    pub created_at: chrono::NaiveDateTime,
}

impl Model {
    pub fn client_grants(&self) -> Vec<AttributeAccess> {
        serde_json::from_str(&self.client_attributes).unwrap_or_default()
    }

    pub fn account_grants(&self) -> Vec<AttributeAccess> {
        serde_json::from_str(&self.account_attributes).unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
