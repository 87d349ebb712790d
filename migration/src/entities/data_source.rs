use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "data_sources")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub endpoint_id: i32,
    pub name: String,
    /// manual / lankong / api_get / api_post / endpoint / s3
    pub source_type: String,
    /// JSON，结构由 source_type 决定
    #[sea_orm(column_type = "Text")]
    pub config: String,
    pub cache_duration: i64,
    pub is_active: bool,
    pub last_sync: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::api_endpoint::Entity",
        from = "Column::EndpointId",
        to = "super::api_endpoint::Column::Id"
    )]
    ApiEndpoint,
}

impl Related<super::api_endpoint::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ApiEndpoint.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
