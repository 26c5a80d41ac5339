use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Stakes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Stakes::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Stakes::UserId).uuid().not_null())
                    .col(ColumnDef::new(Stakes::Amount).decimal().not_null())
                    .col(ColumnDef::new(Stakes::Period).integer().not_null())
                    .col(ColumnDef::new(Stakes::Apy).decimal().not_null())
                    .col(
                        ColumnDef::new(Stakes::StartDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Stakes::UnlockDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Stakes::ProjectedReward)
                            .decimal()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Stakes::Status)
                            .string()
                            .not_null()
                            .default("locked"),
                    )
                    .col(
                        ColumnDef::new(Stakes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .col(
                        ColumnDef::new(Stakes::UpdatedAt)
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
                    .name("idx_stakes_user_id")
                    .table(Stakes::Table)
                    .col(Stakes::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Stakes::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Stakes {
    Table,
    Id,
    UserId,
    Amount,
    Period,
    Apy,
    StartDate,
    UnlockDate,
    ProjectedReward,
    Status,
    CreatedAt,
    UpdatedAt,
}
