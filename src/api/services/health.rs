use actix_web::http::StatusCode;
use actix_web::{HttpResponse, Responder, web};
use std::time::{Duration, Instant};
use tracing::{error, trace};

use crate::api::services::admin::{
    ApiResponse, ErrorCode, HealthCatalogCheck, HealthChecks, HealthResponse, HealthStorageCheck,
};
use crate::services::AppServices;

// 应用启动时间结构体
#[derive(Clone, Debug)]
pub struct AppStartTime {
    pub start_datetime: chrono::DateTime<chrono::Utc>,
}

/// Health Service
///
/// 存储只做一次 ping；目录与同步概况直接读内存快照。
pub struct HealthService;

impl HealthService {
    pub async fn health_check(
        services: web::Data<AppServices>,
        app_start_time: web::Data<AppStartTime>,
    ) -> impl Responder {
        let start_time = Instant::now();
        trace!("Received health check request");

        let backend = services.storage.get_backend_config().storage_type;
        let storage_status =
            match tokio::time::timeout(Duration::from_secs(5), services.storage.ping()).await {
                Ok(Ok(())) => HealthStorageCheck {
                    status: "healthy".to_string(),
                    backend,
                    error: None,
                },
                Ok(Err(e)) => {
                    error!("Storage health check failed: {}", e);
                    HealthStorageCheck {
                        status: "unhealthy".to_string(),
                        backend,
                        error: Some(format!("database error: {}", e)),
                    }
                }
                Err(_) => {
                    error!("Storage health check timeout");
                    HealthStorageCheck {
                        status: "unhealthy".to_string(),
                        backend,
                        error: Some("timeout".to_string()),
                    }
                }
            };

        let catalog = services.catalog.snapshot();
        let sync_stats = services.sync.stats();
        let catalog_status = HealthCatalogCheck {
            endpoints: catalog.endpoints().count(),
            data_sources: catalog.data_sources().count(),
            rules: catalog.rules().len(),
            pools: services.pools.len(),
            candidates: services.pools.total_candidates(),
            syncs_in_flight: sync_stats.in_flight,
            syncs_succeeded: sync_stats.succeeded,
            syncs_failed: sync_stats.failed,
            total_calls: services.call_stats.total_calls(),
        };

        let now = chrono::Utc::now();
        let uptime_seconds = (now - app_start_time.start_datetime).num_seconds().max(0) as u32;
        let is_healthy = storage_status.status == "healthy";

        let health_data = HealthResponse {
            status: if is_healthy {
                "healthy".to_string()
            } else {
                "unhealthy".to_string()
            },
            timestamp: now.to_rfc3339(),
            uptime: uptime_seconds,
            checks: HealthChecks {
                storage: storage_status,
                catalog: catalog_status,
            },
            response_time_ms: start_time.elapsed().as_millis() as u32,
        };

        let (status, code, message) = if is_healthy {
            (StatusCode::OK, ErrorCode::Success, "OK")
        } else {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorCode::ServiceUnavailable,
                "Service Unavailable",
            )
        };

        HttpResponse::build(status)
            .append_header(("Content-Type", "application/json; charset=utf-8"))
            .json(ApiResponse {
                code: code as i32,
                message: message.to_string(),
                data: Some(health_data),
            })
    }

    /// 存活探针
    pub async fn liveness_check() -> impl Responder {
        HttpResponse::NoContent().finish()
    }
}

pub fn health_routes(prefix: &str) -> actix_web::Scope {
    web::scope(prefix)
        .route("", web::get().to(HealthService::health_check))
        .route("", web::head().to(HealthService::health_check))
        .route("/live", web::get().to(HealthService::liveness_check))
        .route("/live", web::head().to(HealthService::liveness_check))
}
