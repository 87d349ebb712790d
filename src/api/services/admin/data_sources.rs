//! Admin API 数据源管理

use actix_web::{Responder, Result as ActixResult, web};
use tracing::info;

use crate::model::DataSource;
use crate::services::{AppServices, CreateDataSourceRequest, UpdateDataSourceRequest};

use super::helpers::{api_result, created_response, error_from_domain};
use super::types::{DataSourceResponse, ToggleRequest};

fn to_response(services: &AppServices, source: DataSource) -> DataSourceResponse {
    let candidate_count = services.pools.get(source.id).map(|p| p.len());
    let syncing = services.sync.is_in_flight(source.id);
    DataSourceResponse::new(source, candidate_count, syncing)
}

/// 端点下的数据源
pub async fn list_data_sources(
    path: web::Path<i32>,
    services: web::Data<AppServices>,
) -> ActixResult<impl Responder> {
    let result = services
        .endpoints
        .list_data_sources(path.into_inner())
        .map(|sources| {
            sources
                .into_iter()
                .map(|s| to_response(&services, s))
                .collect::<Vec<_>>()
        });
    Ok(api_result(result))
}

pub async fn get_data_source(
    path: web::Path<i32>,
    services: web::Data<AppServices>,
) -> ActixResult<impl Responder> {
    let result = services
        .endpoints
        .get_data_source(path.into_inner())
        .map(|s| to_response(&services, s));
    Ok(api_result(result))
}

pub async fn create_data_source(
    path: web::Path<i32>,
    body: web::Json<CreateDataSourceRequest>,
    services: web::Data<AppServices>,
) -> ActixResult<impl Responder> {
    let endpoint_id = path.into_inner();
    match services
        .endpoints
        .create_data_source(endpoint_id, body.into_inner())
        .await
    {
        Ok(source) => {
            info!(
                "Admin API: data source {} created on endpoint {}",
                source.id, endpoint_id
            );
            Ok(created_response(to_response(&services, source)))
        }
        Err(e) => Ok(error_from_domain(&e)),
    }
}

pub async fn update_data_source(
    path: web::Path<i32>,
    body: web::Json<UpdateDataSourceRequest>,
    services: web::Data<AppServices>,
) -> ActixResult<impl Responder> {
    let result = services
        .endpoints
        .update_data_source(path.into_inner(), body.into_inner())
        .await
        .map(|s| to_response(&services, s));
    Ok(api_result(result))
}

/// 启用 / 停用
pub async fn toggle_data_source(
    path: web::Path<i32>,
    body: web::Json<ToggleRequest>,
    services: web::Data<AppServices>,
) -> ActixResult<impl Responder> {
    let result = services
        .endpoints
        .set_data_source_active(path.into_inner(), body.is_active)
        .await
        .map(|s| to_response(&services, s));
    Ok(api_result(result))
}

pub async fn delete_data_source(
    path: web::Path<i32>,
    services: web::Data<AppServices>,
) -> ActixResult<impl Responder> {
    let id = path.into_inner();
    let result = services
        .endpoints
        .delete_data_source(id)
        .await
        .map(|_| serde_json::json!({ "deleted": id }));
    Ok(api_result(result))
}

/// 立即同步；已有同步进行中时返回 409
pub async fn sync_data_source(
    path: web::Path<i32>,
    services: web::Data<AppServices>,
) -> ActixResult<impl Responder> {
    let result = services.endpoints.sync_data_source(path.into_inner()).await;
    Ok(api_result(result))
}
