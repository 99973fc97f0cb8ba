use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Clients::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Clients::ClientId)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Clients::ClientSecretHash)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Clients::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Clients::Description).text().not_null())
                    .col(ColumnDef::new(Clients::RedirectUri).text().not_null())
                    .col(ColumnDef::new(Clients::Scopes).text().not_null())
                    .col(
                        ColumnDef::new(Clients::ProfileMetadataAttributes)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Clients::ProfileDefaults)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Clients::CreatedAt)
                            .date_time()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Clients::UpdatedAt)
                            .date_time()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Clients::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Clients {
    Table,
    ClientId,
    ClientSecretHash,
    Name,
    Description,
    RedirectUri,
    Scopes,
    ProfileMetadataAttributes,
    ProfileDefaults,
    CreatedAt,
    UpdatedAt,
}
