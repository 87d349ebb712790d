use actix_web::middleware::Next;
use actix_web::{
    Error, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    http::Method,
    web,
};
use subtle::ConstantTimeEq;
use tracing::{debug, info};

use crate::api::services::admin::{ApiResponse, ErrorCode};
use crate::config::AdminConfig;

pub struct AuthMiddleware;

impl AuthMiddleware {
    /// Admin API 身份验证中间件
    ///
    /// token 取自 app_data 中的 `AdminConfig`，未注册时读全局配置。
    pub async fn admin_auth(
        req: ServiceRequest,
        next: Next<BoxBody>,
    ) -> Result<ServiceResponse<BoxBody>, Error> {
        if req.method() == Method::OPTIONS {
            // 对于 OPTIONS 请求，直接返回 204 No Content
            return Ok(req.into_response(
                HttpResponse::NoContent()
                    .insert_header(("Content-Type", "text/plain; charset=utf-8"))
                    .finish(),
            ));
        }

        let admin_token = match req.app_data::<web::Data<AdminConfig>>() {
            Some(admin) => admin.token.clone(),
            None => crate::config::get_config().admin.token.clone(),
        };

        // 如果 token 为空，认为 Admin API 被禁用
        if admin_token.is_empty() {
            debug!("Admin token not configured - returning 404");
            return Ok(req.into_response(
                HttpResponse::NotFound()
                    .insert_header(("Content-Type", "text/plain; charset=utf-8"))
                    .body("Not Found"),
            ));
        }

        let authorized = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.as_bytes().strip_prefix(b"Bearer "))
            .is_some_and(|provided| bool::from(provided.ct_eq(admin_token.as_bytes())));

        if authorized {
            debug!("Admin API authentication succeeded");
            return next.call(req).await;
        }

        info!("Admin API authentication failed: token mismatch or missing Authorization header");
        Ok(req.into_response(
            HttpResponse::Unauthorized()
                .append_header(("Content-Type", "application/json; charset=utf-8"))
                .json(ApiResponse::<()> {
                    code: ErrorCode::Unauthorized as i32,
                    message: "Unauthorized: Invalid or missing token".to_string(),
                    data: None,
                }),
        ))
    }
}
