//! Admin API 端点管理

use actix_web::{Responder, Result as ActixResult, web};
use tracing::{info, trace};

use crate::model::Endpoint;
use crate::services::{
    AppServices, CreateEndpointRequest, SortOrderUpdate, UpdateEndpointRequest,
};

use super::helpers::{api_result, created_response, error_from_domain, success_response};
use super::types::{EndpointResponse, PreviewQuery, PreviewResponse, RefreshResponse};

const DEFAULT_PREVIEW_COUNT: usize = 5;
const MAX_PREVIEW_COUNT: usize = 50;

fn to_response(services: &AppServices, endpoint: Endpoint) -> EndpointResponse {
    let count = services.catalog.snapshot().sources_of(endpoint.id).count();
    EndpointResponse::new(endpoint, count)
}

/// 获取全部端点（按排序）
pub async fn list_endpoints(services: web::Data<AppServices>) -> ActixResult<impl Responder> {
    let catalog = services.catalog.snapshot();
    let endpoints: Vec<EndpointResponse> = catalog
        .endpoints()
        .map(|e| EndpointResponse::new(e.clone(), catalog.sources_of(e.id).count()))
        .collect();
    trace!("Admin API: returning {} endpoints", endpoints.len());
    Ok(success_response(endpoints))
}

pub async fn get_endpoint(
    path: web::Path<i32>,
    services: web::Data<AppServices>,
) -> ActixResult<impl Responder> {
    let result = services
        .endpoints
        .get_endpoint(path.into_inner())
        .map(|e| to_response(&services, e));
    Ok(api_result(result))
}

pub async fn create_endpoint(
    body: web::Json<CreateEndpointRequest>,
    services: web::Data<AppServices>,
) -> ActixResult<impl Responder> {
    match services.endpoints.create_endpoint(body.into_inner()).await {
        Ok(endpoint) => {
            info!("Admin API: endpoint {} created", endpoint.id);
            Ok(created_response(to_response(&services, endpoint)))
        }
        Err(e) => Ok(error_from_domain(&e)),
    }
}

pub async fn update_endpoint(
    path: web::Path<i32>,
    body: web::Json<UpdateEndpointRequest>,
    services: web::Data<AppServices>,
) -> ActixResult<impl Responder> {
    let result = services
        .endpoints
        .update_endpoint(path.into_inner(), body.into_inner())
        .await
        .map(|e| to_response(&services, e));
    Ok(api_result(result))
}

pub async fn delete_endpoint(
    path: web::Path<i32>,
    services: web::Data<AppServices>,
) -> ActixResult<impl Responder> {
    let id = path.into_inner();
    let result = services
        .endpoints
        .delete_endpoint(id)
        .await
        .map(|_| serde_json::json!({ "deleted": id }));
    Ok(api_result(result))
}

/// 批量排序 `PUT /endpoints/sort-order`
pub async fn reorder_endpoints(
    body: web::Json<Vec<SortOrderUpdate>>,
    services: web::Data<AppServices>,
) -> ActixResult<impl Responder> {
    let result = services
        .endpoints
        .reorder_endpoints(&body)
        .await
        .map(|endpoints| {
            endpoints
                .into_iter()
                .map(|e| to_response(&services, e))
                .collect::<Vec<_>>()
        });
    Ok(api_result(result))
}

/// 立即同步端点下所有数据源
pub async fn refresh_endpoint(
    path: web::Path<i32>,
    services: web::Data<AppServices>,
) -> ActixResult<impl Responder> {
    let endpoint_id = path.into_inner();
    let result = services
        .preloader
        .refresh_endpoint(endpoint_id)
        .await
        .map(|results| RefreshResponse {
            endpoint_id,
            results,
        });
    Ok(api_result(result))
}

/// 预览：当前候选池大小与若干随机抽样（已套用替换规则）
pub async fn preview_endpoint(
    path: web::Path<i32>,
    query: web::Query<PreviewQuery>,
    services: web::Data<AppServices>,
) -> ActixResult<impl Responder> {
    let endpoint_id = path.into_inner();
    let count = query
        .count
        .unwrap_or(DEFAULT_PREVIEW_COUNT)
        .clamp(1, MAX_PREVIEW_COUNT);
    let wait = services.resolver.default_timeout();

    let candidates = match services.resolver.candidates(endpoint_id, wait).await {
        Ok(candidates) => candidates,
        Err(e) => return Ok(error_from_domain(&e)),
    };

    let mut samples = Vec::with_capacity(count);
    if !candidates.is_empty() {
        for _ in 0..count {
            match services.resolver.resolve(endpoint_id, wait).await {
                Ok(resolution) => samples.push(resolution.url),
                Err(e) => return Ok(error_from_domain(&e)),
            }
        }
    }

    Ok(success_response(PreviewResponse {
        endpoint_id,
        candidate_count: candidates.len(),
        samples,
    }))
}
