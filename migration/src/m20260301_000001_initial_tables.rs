//! 初始表结构
//!
//! - api_endpoints: 可路由的随机端点
//! - data_sources: 端点下的数据源，config 为按类型区分的 JSON
//! - url_replace_rules: 解析后的 URL 替换规则（全局或端点级）

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 创建 api_endpoints 表
        manager
            .create_table(
                Table::create()
                    .table(ApiEndpoints::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ApiEndpoints::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ApiEndpoints::Name).string_len(255).not_null())
                    .col(
                        ColumnDef::new(ApiEndpoints::Url)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(ApiEndpoints::Description)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(ApiEndpoints::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(ApiEndpoints::ShowOnHomepage)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(ApiEndpoints::SortOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ApiEndpoints::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ApiEndpoints::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_api_endpoints_sort_order")
                    .table(ApiEndpoints::Table)
                    .col(ApiEndpoints::SortOrder)
                    .to_owned(),
            )
            .await?;

        // 创建 data_sources 表
        manager
            .create_table(
                Table::create()
                    .table(DataSources::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DataSources::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DataSources::EndpointId).integer().not_null())
                    .col(ColumnDef::new(DataSources::Name).string_len(255).not_null())
                    .col(
                        ColumnDef::new(DataSources::SourceType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(DataSources::Config).text().not_null())
                    .col(
                        ColumnDef::new(DataSources::CacheDuration)
                            .big_integer()
                            .not_null()
                            .default(3600),
                    )
                    .col(
                        ColumnDef::new(DataSources::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(DataSources::LastSync)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(DataSources::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DataSources::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 按端点查询数据源
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_data_sources_endpoint_id")
                    .table(DataSources::Table)
                    .col(DataSources::EndpointId)
                    .to_owned(),
            )
            .await?;

        // 创建 url_replace_rules 表
        manager
            .create_table(
                Table::create()
                    .table(UrlReplaceRules::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UrlReplaceRules::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(UrlReplaceRules::Name)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(UrlReplaceRules::EndpointId).integer().null())
                    .col(ColumnDef::new(UrlReplaceRules::FromUrl).text().not_null())
                    .col(ColumnDef::new(UrlReplaceRules::ToUrl).text().not_null())
                    .col(
                        ColumnDef::new(UrlReplaceRules::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(UrlReplaceRules::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UrlReplaceRules::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_url_replace_rules_endpoint_id")
                    .table(UrlReplaceRules::Table)
                    .col(UrlReplaceRules::EndpointId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UrlReplaceRules::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(DataSources::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(ApiEndpoints::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ApiEndpoints {
    Table,
    Id,
    Name,
    Url,
    Description,
    IsActive,
    ShowOnHomepage,
    SortOrder,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum DataSources {
    Table,
    Id,
    EndpointId,
    Name,
    SourceType,
    Config,
    CacheDuration,
    IsActive,
    LastSync,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum UrlReplaceRules {
    Table,
    Id,
    Name,
    EndpointId,
    FromUrl,
    ToUrl,
    IsActive,
    CreatedAt,
    UpdatedAt,
}
