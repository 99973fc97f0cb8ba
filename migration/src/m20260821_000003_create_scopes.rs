use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Scopes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Scopes::Name)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Scopes::Description).text().not_null())
                    .col(
                        ColumnDef::new(Scopes::ClientAttributes)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Scopes::AccountAttributes)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Scopes::CreatedAt)
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
            .drop_table(Table::drop().table(Scopes::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Scopes {
    Table,
    Name,
    Description,
    ClientAttributes,
    AccountAttributes,
    CreatedAt,
}
