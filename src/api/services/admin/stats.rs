//! Admin API 调用统计

use actix_web::{Responder, Result as ActixResult, web};
use tracing::trace;

use crate::services::AppServices;

use super::helpers::{api_result, success_response};
use super::types::{CallStatsResponse, EndpointCallStatsResponse};

/// 全部端点的调用计数，按展示顺序
pub async fn list_call_stats(services: web::Data<AppServices>) -> ActixResult<impl Responder> {
    let endpoints: Vec<EndpointCallStatsResponse> = services
        .endpoints
        .list_call_stats()
        .into_iter()
        .map(|(endpoint, calls)| EndpointCallStatsResponse::new(endpoint, calls))
        .collect();
    let total_calls = endpoints.iter().map(|e| e.total_calls).sum();
    let today_calls = endpoints.iter().map(|e| e.today_calls).sum();
    trace!("Admin API: returning call stats for {} endpoints", endpoints.len());
    Ok(success_response(CallStatsResponse {
        total_calls,
        today_calls,
        endpoints,
    }))
}

pub async fn get_call_stats(
    path: web::Path<i32>,
    services: web::Data<AppServices>,
) -> ActixResult<impl Responder> {
    let result = services
        .endpoints
        .get_call_stats(path.into_inner())
        .map(|(endpoint, calls)| EndpointCallStatsResponse::new(endpoint, calls));
    Ok(api_result(result))
}
