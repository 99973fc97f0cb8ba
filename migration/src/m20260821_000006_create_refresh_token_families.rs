use sea_orm_migration::prelude::*;

use crate::m20260821_000001_create_clients::Clients;
use crate::m20260821_000002_create_accounts::Accounts;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RefreshTokenFamilies::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RefreshTokenFamilies::FamilyId)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RefreshTokenFamilies::Username)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RefreshTokenFamilies::ClientId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RefreshTokenFamilies::Generation)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(RefreshTokenFamilies::Revoked)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(RefreshTokenFamilies::CreatedAt)
                            .date_time()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(RefreshTokenFamilies::UpdatedAt)
                            .date_time()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-refresh_token_families-client_id")
                            .from(
                                RefreshTokenFamilies::Table,
                                RefreshTokenFamilies::ClientId,
                            )
                            .to(Clients::Table, Clients::ClientId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-refresh_token_families-username")
                            .from(
                                RefreshTokenFamilies::Table,
                                RefreshTokenFamilies::Username,
                            )
                            .to(Accounts::Table, Accounts::Username),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(RefreshTokenFamilies::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum RefreshTokenFamilies {
    Table,
    FamilyId,
    Username,
    ClientId,
    Generation,
    Revoked,
    CreatedAt,
    UpdatedAt,
}
