//! 统一 API 错误码定义

use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::errors::RandomApiError;

/// API 错误码枚举
///
/// 使用 serde_repr 序列化为数字。按千位分域：
/// - 0: 成功
/// - 1000-1099: 通用错误
/// - 2000-2099: 认证 / OAuth 错误
/// - 3000-3099: 端点与数据源错误
/// - 5000-5099: 存储错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum ErrorCode {
    // 成功
    Success = 0,

    // 通用错误 1000-1099
    BadRequest = 1000,
    Unauthorized = 1001,
    NotFound = 1004,
    InternalServerError = 1005,
    ServiceUnavailable = 1030,

    // 认证错误 2000-2099
    OAuthStateInvalid = 2000,

    // 端点与数据源错误 3000-3099
    ValidationFailed = 3000,
    FieldPathNotFound = 3001,
    FieldTypeMismatch = 3002,
    CyclicReference = 3003,
    SyncInFlight = 3004,
    FetchFailed = 3005,
    InvalidUpstreamResponse = 3006,
    SyncTimeout = 3007,

    // 存储错误 5000-5099
    DatabaseError = 5000,
}

impl From<&RandomApiError> for ErrorCode {
    fn from(err: &RandomApiError) -> Self {
        match err {
            RandomApiError::Validation(_) => ErrorCode::ValidationFailed,
            RandomApiError::PathNotFound(_) => ErrorCode::FieldPathNotFound,
            RandomApiError::TypeMismatch(_) => ErrorCode::FieldTypeMismatch,
            RandomApiError::InvalidResponse(_) => ErrorCode::InvalidUpstreamResponse,
            RandomApiError::CyclicReference(_) => ErrorCode::CyclicReference,
            RandomApiError::SyncInFlight(_) => ErrorCode::SyncInFlight,
            RandomApiError::NotFound(_) => ErrorCode::NotFound,
            RandomApiError::FetchFailed(_) => ErrorCode::FetchFailed,
            RandomApiError::Timeout(_) => ErrorCode::SyncTimeout,
            RandomApiError::OAuthState(_) => ErrorCode::OAuthStateInvalid,
            RandomApiError::DatabaseConfig(_)
            | RandomApiError::DatabaseConnection(_)
            | RandomApiError::DatabaseOperation(_) => ErrorCode::DatabaseError,
            RandomApiError::Serialization(_) | RandomApiError::FileOperation(_) => {
                ErrorCode::InternalServerError
            }
        }
    }
}
