pub use sea_orm_migration::prelude::*;

mod m20260821_000001_create_clients;
mod m20260821_000002_create_accounts;
mod m20260821_000003_create_scopes;
mod m20260821_000004_create_consents;
mod m20260821_000005_create_authorization_codes;
mod m20260821_000006_create_refresh_token_families;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260821_000001_create_clients::Migration),
            Box::new(m20260821_000002_create_accounts::Migration),
            Box::new(m20260821_000003_create_scopes::Migration),
            Box::new(m20260821_000004_create_consents::Migration),
            Box::new(m20260821_000005_create_authorization_codes::Migration),
            Box::new(m20260821_000006_create_refresh_token_families::Migration),
        ]
    }
}
