use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ApiCalls::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ApiCalls::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ApiCalls::UserId).text().not_null())
                    .col(
                        ColumnDef::new(ApiCalls::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Every admission counts and sweeps by (user_id, timestamp).
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_api_calls_user_id_timestamp")
                    .table(ApiCalls::Table)
                    .col(ApiCalls::UserId)
                    .col(ApiCalls::Timestamp)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ApiCalls::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ApiCalls {
    Table,
    Id,
    UserId,
    Timestamp,
}
