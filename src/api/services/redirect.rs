use actix_web::http::StatusCode;
use actix_web::{HttpResponse, Responder, web};
use tracing::{debug, error, trace};

use crate::errors::RandomApiError;
use crate::services::AppServices;

pub struct RedirectService {}

impl RedirectService {
    pub async fn handle_redirect(
        path: web::Path<String>,
        services: web::Data<AppServices>,
    ) -> impl Responder {
        let captured_path = path.into_inner();
        let captured_path = captured_path.trim_matches('/');

        if captured_path.is_empty() {
            return Self::not_found_response();
        }

        match services.resolver.resolve_by_url(captured_path).await {
            Ok(resolution) => {
                trace!(
                    "Redirect /{} -> {} ({} candidates)",
                    captured_path, resolution.url, resolution.candidate_count
                );
                services.call_stats.increment(resolution.endpoint_id);
                Self::finish_redirect(&resolution.url)
            }
            Err(RandomApiError::NotFound(msg)) => {
                debug!("Redirect /{} not resolvable: {}", captured_path, msg);
                Self::not_found_response()
            }
            Err(RandomApiError::CyclicReference(msg)) => {
                error!("Endpoint /{} has a reference cycle: {}", captured_path, msg);
                HttpResponse::build(StatusCode::LOOP_DETECTED)
                    .insert_header(("Content-Type", "text/plain; charset=utf-8"))
                    .body("Loop Detected")
            }
            Err(e) => {
                error!("Redirect /{} failed: {}", captured_path, e);
                Self::error_response()
            }
        }
    }

    /// 每次请求结果都可能不同，禁止缓存
    #[inline]
    fn finish_redirect(url: &str) -> HttpResponse {
        HttpResponse::build(StatusCode::FOUND)
            .insert_header(("Location", url))
            .insert_header(("Cache-Control", "no-store"))
            .finish()
    }

    #[inline]
    fn not_found_response() -> HttpResponse {
        HttpResponse::build(StatusCode::NOT_FOUND)
            .insert_header(("Content-Type", "text/html; charset=utf-8"))
            .insert_header(("Cache-Control", "public, max-age=60"))
            .body("Not Found")
    }

    #[inline]
    fn error_response() -> HttpResponse {
        HttpResponse::build(StatusCode::INTERNAL_SERVER_ERROR)
            .insert_header(("Content-Type", "text/html; charset=utf-8"))
            .body("Internal Server Error")
    }
}

/// 重定向路由（必须最后注册）
pub fn redirect_routes() -> actix_web::Scope {
    use actix_web::web;

    web::scope("")
        .route("/{path:.*}", web::get().to(RedirectService::handle_redirect))
        .route("/{path:.*}", web::head().to(RedirectService::handle_redirect))
}
