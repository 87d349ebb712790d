//! Admin API 帮助函数

use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use serde::Serialize;
use tracing::error;

use crate::errors::RandomApiError;

use super::error_code::ErrorCode;
use super::types::ApiResponse;

/// 构建 JSON 响应
pub fn json_response<T: Serialize>(
    status: StatusCode,
    code: ErrorCode,
    message: impl Into<String>,
    data: Option<T>,
) -> HttpResponse {
    HttpResponse::build(status)
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(ApiResponse {
            code: code as i32,
            message: message.into(),
            data,
        })
}

/// 构建成功响应
pub fn success_response<T: Serialize>(data: T) -> HttpResponse {
    json_response(StatusCode::OK, ErrorCode::Success, "OK", Some(data))
}

/// 构建创建成功响应（201）
pub fn created_response<T: Serialize>(data: T) -> HttpResponse {
    json_response(StatusCode::CREATED, ErrorCode::Success, "Created", Some(data))
}

/// 构建错误响应
pub fn error_response(status: StatusCode, error_code: ErrorCode, message: &str) -> HttpResponse {
    json_response::<()>(status, error_code, message, None)
}

/// 从 RandomApiError 构建错误响应（自动映射 HTTP 状态码和 ErrorCode）
pub fn error_from_domain(err: &RandomApiError) -> HttpResponse {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        error!("Admin API error: {}", err);
    }
    error_response(status, ErrorCode::from(err), err.message())
}

/// 统一 Result → HttpResponse 转换
///
/// 成功时返回 200 OK + JSON 数据，失败时自动映射 RandomApiError。
pub fn api_result<T: Serialize>(result: Result<T, RandomApiError>) -> HttpResponse {
    match result {
        Ok(data) => success_response(data),
        Err(e) => error_from_domain(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let resp = error_from_domain(&RandomApiError::cyclic_reference("1 -> 2 -> 1"));
        assert_eq!(resp.status().as_u16(), 508);

        let resp = error_from_domain(&RandomApiError::validation("bad"));
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = api_result::<()>(Err(RandomApiError::sync_in_flight("busy")));
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_success() {
        let resp = success_response(vec![1, 2]);
        assert_eq!(resp.status(), StatusCode::OK);
        let resp = created_response("x");
        assert_eq!(resp.status(), StatusCode::CREATED);
    }
}
