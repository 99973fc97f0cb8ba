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
                    .table(Consents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Consents::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Consents::ClientId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Consents::Username)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Consents::GrantedScopes).text().not_null())
                    .col(ColumnDef::new(Consents::Metadata).text().not_null())
                    .col(
                        ColumnDef::new(Consents::IsConnected)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Consents::CreatedAt)
                            .date_time()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Consents::UpdatedAt)
                            .date_time()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-consents-client_id")
                            .from(Consents::Table, Consents::ClientId)
                            .to(Clients::Table, Clients::ClientId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-consents-username")
                            .from(Consents::Table, Consents::Username)
                            .to(Accounts::Table, Accounts::Username),
                    )
                    .to_owned(),
            )
            .await?;

        // One consent row per (client, account) pair.
        manager
            .create_index(
                Index::create()
                    .name("idx-consents-client_id-username")
                    .table(Consents::Table)
                    .col(Consents::ClientId)
                    .col(Consents::Username)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Consents::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Consents {
    Table,
    Id,
    ClientId,
    Username,
    GrantedScopes,
    Metadata,
    IsConnected,
    CreatedAt,
    UpdatedAt,
}
