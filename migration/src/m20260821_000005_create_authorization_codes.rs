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
                    .table(AuthorizationCodes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AuthorizationCodes::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AuthorizationCodes::ClientId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AuthorizationCodes::Username)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AuthorizationCodes::RedirectUri)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AuthorizationCodes::GrantedScopes)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AuthorizationCodes::CodeChallenge)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AuthorizationCodes::Consumed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(AuthorizationCodes::ExpiresAt)
                            .date_time()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AuthorizationCodes::CreatedAt)
                            .date_time()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-authorization_codes-client_id")
                            .from(
                                AuthorizationCodes::Table,
                                AuthorizationCodes::ClientId,
                            )
                            .to(Clients::Table, Clients::ClientId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-authorization_codes-username")
                            .from(
                                AuthorizationCodes::Table,
                                AuthorizationCodes::Username,
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
                    .table(AuthorizationCodes::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum AuthorizationCodes {
    Table,
    Id,
    ClientId,
    Username,
    RedirectUri,
    GrantedScopes,
    CodeChallenge,
    Consumed,
    ExpiresAt,
    CreatedAt,
}
