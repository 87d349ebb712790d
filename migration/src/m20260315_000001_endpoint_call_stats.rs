//! 端点调用统计
//!
//! 每个端点一行：累计调用数、当日调用数及其所属日期。

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EndpointCallStats::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EndpointCallStats::EndpointId)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(EndpointCallStats::TotalCalls)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(EndpointCallStats::TodayCalls)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(EndpointCallStats::StatsDate)
                            .string_len(10)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EndpointCallStats::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EndpointCallStats::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum EndpointCallStats {
    Table,
    EndpointId,
    TotalCalls,
    TodayCalls,
    StatsDate,
    UpdatedAt,
}
