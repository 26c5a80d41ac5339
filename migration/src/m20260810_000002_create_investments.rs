use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Investments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Investments::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Investments::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(Investments::EthAmount)
                            .decimal() // numeric in PostgreSQL
                            .not_null(),
                    )
                    .col(ColumnDef::new(Investments::EurValue).decimal().not_null())
                    .col(
                        ColumnDef::new(Investments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_investments_user_id")
                    .table(Investments::Table)
                    .col(Investments::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Investments::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Investments {
    Table,
    Id,
    UserId,
    EthAmount,
    EurValue,
    CreatedAt,
}
