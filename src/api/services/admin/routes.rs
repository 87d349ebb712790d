//! Admin API 路由配置
//!
//! 将 /v1 下的路由按功能模块拆分。

use actix_web::http::StatusCode;
use actix_web::{error, web};

use super::data_sources::{
    create_data_source, delete_data_source, get_data_source, list_data_sources,
    sync_data_source, toggle_data_source, update_data_source,
};
use super::endpoints::{
    create_endpoint, delete_endpoint, get_endpoint, list_endpoints, preview_endpoint,
    refresh_endpoint, reorder_endpoints, update_endpoint,
};
use super::error_code::ErrorCode;
use super::helpers::error_response;
use super::oauth::{issue_state, verify_state};
use super::rules::{create_rule, delete_rule, get_rule, list_rules, update_rule};
use super::stats::{get_call_stats, list_call_stats};

/// JSON 请求体解析失败时返回统一的错误结构
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(256 * 1024)
        .error_handler(|err, _req| {
            let message = format!("Invalid JSON body: {}", err);
            error::InternalError::from_response(
                err,
                error_response(StatusCode::BAD_REQUEST, ErrorCode::BadRequest, &message),
            )
            .into()
        })
}

/// 端点路由 `/endpoints`
///
/// 包含：
/// - GET/POST /endpoints
/// - PUT /endpoints/sort-order - 批量排序（整批原子提交）
/// - GET/PUT/DELETE /endpoints/{id}
/// - POST /endpoints/{id}/refresh - 同步全部数据源
/// - GET /endpoints/{id}/preview - 抽样预览
/// - GET/POST /endpoints/{id}/data-sources
pub fn endpoints_routes() -> actix_web::Scope {
    web::scope("/endpoints")
        .route("", web::get().to(list_endpoints))
        .route("", web::head().to(list_endpoints))
        .route("", web::post().to(create_endpoint))
        // 必须在 /{id} 之前
        .route("/sort-order", web::put().to(reorder_endpoints))
        .route("/{id:\\d+}", web::get().to(get_endpoint))
        .route("/{id:\\d+}", web::put().to(update_endpoint))
        .route("/{id:\\d+}", web::delete().to(delete_endpoint))
        .route("/{id:\\d+}/refresh", web::post().to(refresh_endpoint))
        .route("/{id:\\d+}/preview", web::get().to(preview_endpoint))
        .route("/{id:\\d+}/data-sources", web::get().to(list_data_sources))
        .route("/{id:\\d+}/data-sources", web::post().to(create_data_source))
}

/// 数据源路由 `/data-sources`
pub fn data_sources_routes() -> actix_web::Scope {
    web::scope("/data-sources")
        .route("/{id:\\d+}", web::get().to(get_data_source))
        .route("/{id:\\d+}", web::put().to(update_data_source))
        .route("/{id:\\d+}", web::delete().to(delete_data_source))
        .route("/{id:\\d+}/toggle", web::post().to(toggle_data_source))
        .route("/{id:\\d+}/sync", web::post().to(sync_data_source))
}

/// 替换规则路由 `/rules`
pub fn rules_routes() -> actix_web::Scope {
    web::scope("/rules")
        .route("", web::get().to(list_rules))
        .route("", web::post().to(create_rule))
        .route("/{id:\\d+}", web::get().to(get_rule))
        .route("/{id:\\d+}", web::put().to(update_rule))
        .route("/{id:\\d+}", web::delete().to(delete_rule))
}

/// OAuth state 路由 `/oauth`
pub fn oauth_routes() -> actix_web::Scope {
    web::scope("/oauth")
        .route("/state", web::post().to(issue_state))
        .route("/verify", web::post().to(verify_state))
}

/// 调用统计路由 `/stats`
pub fn stats_routes() -> actix_web::Scope {
    web::scope("/stats")
        .route("", web::get().to(list_call_stats))
        .route("/{id:\\d+}", web::get().to(get_call_stats))
}

/// Admin API v1 全部路由
pub fn admin_v1_routes() -> actix_web::Scope {
    web::scope("/v1")
        .app_data(json_config())
        .service(endpoints_routes())
        .service(data_sources_routes())
        .service(rules_routes())
        .service(oauth_routes())
        .service(stats_routes())
}
