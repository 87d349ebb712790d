use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RandomApiError {
    Validation(String),
    PathNotFound(String),
    TypeMismatch(String),
    InvalidResponse(String),
    CyclicReference(String),
    SyncInFlight(String),
    NotFound(String),
    FetchFailed(String),
    Timeout(String),
    OAuthState(String),
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    Serialization(String),
    FileOperation(String),
}

impl RandomApiError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            RandomApiError::Validation(_) => "E001",
            RandomApiError::PathNotFound(_) => "E002",
            RandomApiError::TypeMismatch(_) => "E003",
            RandomApiError::InvalidResponse(_) => "E004",
            RandomApiError::CyclicReference(_) => "E005",
            RandomApiError::SyncInFlight(_) => "E006",
            RandomApiError::NotFound(_) => "E007",
            RandomApiError::FetchFailed(_) => "E008",
            RandomApiError::Timeout(_) => "E009",
            RandomApiError::OAuthState(_) => "E010",
            RandomApiError::DatabaseConfig(_) => "E011",
            RandomApiError::DatabaseConnection(_) => "E012",
            RandomApiError::DatabaseOperation(_) => "E013",
            RandomApiError::Serialization(_) => "E014",
            RandomApiError::FileOperation(_) => "E015",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            RandomApiError::Validation(_) => "Validation Error",
            RandomApiError::PathNotFound(_) => "Field Path Not Found",
            RandomApiError::TypeMismatch(_) => "Field Type Mismatch",
            RandomApiError::InvalidResponse(_) => "Invalid Response",
            RandomApiError::CyclicReference(_) => "Cyclic Endpoint Reference",
            RandomApiError::SyncInFlight(_) => "Sync Already In Flight",
            RandomApiError::NotFound(_) => "Resource Not Found",
            RandomApiError::FetchFailed(_) => "Fetch Failed",
            RandomApiError::Timeout(_) => "Timeout",
            RandomApiError::OAuthState(_) => "OAuth State Error",
            RandomApiError::DatabaseConfig(_) => "Database Configuration Error",
            RandomApiError::DatabaseConnection(_) => "Database Connection Error",
            RandomApiError::DatabaseOperation(_) => "Database Operation Error",
            RandomApiError::Serialization(_) => "Serialization Error",
            RandomApiError::FileOperation(_) => "File Operation Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            RandomApiError::Validation(msg)
            | RandomApiError::PathNotFound(msg)
            | RandomApiError::TypeMismatch(msg)
            | RandomApiError::InvalidResponse(msg)
            | RandomApiError::CyclicReference(msg)
            | RandomApiError::SyncInFlight(msg)
            | RandomApiError::NotFound(msg)
            | RandomApiError::FetchFailed(msg)
            | RandomApiError::Timeout(msg)
            | RandomApiError::OAuthState(msg)
            | RandomApiError::DatabaseConfig(msg)
            | RandomApiError::DatabaseConnection(msg)
            | RandomApiError::DatabaseOperation(msg)
            | RandomApiError::Serialization(msg)
            | RandomApiError::FileOperation(msg) => msg,
        }
    }

    /// 对应的 HTTP 状态码
    pub fn http_status(&self) -> u16 {
        match self {
            RandomApiError::Validation(_)
            | RandomApiError::PathNotFound(_)
            | RandomApiError::TypeMismatch(_) => 400,
            RandomApiError::OAuthState(_) => 403,
            RandomApiError::NotFound(_) => 404,
            RandomApiError::SyncInFlight(_) => 409,
            RandomApiError::CyclicReference(_) => 508,
            RandomApiError::InvalidResponse(_) | RandomApiError::FetchFailed(_) => 502,
            RandomApiError::Timeout(_) => 504,
            RandomApiError::DatabaseConfig(_)
            | RandomApiError::DatabaseConnection(_)
            | RandomApiError::DatabaseOperation(_)
            | RandomApiError::Serialization(_)
            | RandomApiError::FileOperation(_) => 500,
        }
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for RandomApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for RandomApiError {}

// 便捷的构造函数
impl RandomApiError {
    pub fn validation<T: Into<String>>(msg: T) -> Self {
        RandomApiError::Validation(msg.into())
    }

    pub fn path_not_found<T: Into<String>>(msg: T) -> Self {
        RandomApiError::PathNotFound(msg.into())
    }

    pub fn type_mismatch<T: Into<String>>(msg: T) -> Self {
        RandomApiError::TypeMismatch(msg.into())
    }

    pub fn invalid_response<T: Into<String>>(msg: T) -> Self {
        RandomApiError::InvalidResponse(msg.into())
    }

    pub fn cyclic_reference<T: Into<String>>(msg: T) -> Self {
        RandomApiError::CyclicReference(msg.into())
    }

    pub fn sync_in_flight<T: Into<String>>(msg: T) -> Self {
        RandomApiError::SyncInFlight(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        RandomApiError::NotFound(msg.into())
    }

    pub fn fetch_failed<T: Into<String>>(msg: T) -> Self {
        RandomApiError::FetchFailed(msg.into())
    }

    pub fn timeout<T: Into<String>>(msg: T) -> Self {
        RandomApiError::Timeout(msg.into())
    }

    pub fn oauth_state<T: Into<String>>(msg: T) -> Self {
        RandomApiError::OAuthState(msg.into())
    }

    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        RandomApiError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        RandomApiError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        RandomApiError::DatabaseOperation(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        RandomApiError::Serialization(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        RandomApiError::FileOperation(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for RandomApiError {
    fn from(err: sea_orm::DbErr) -> Self {
        RandomApiError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for RandomApiError {
    fn from(err: std::io::Error) -> Self {
        RandomApiError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for RandomApiError {
    fn from(err: serde_json::Error) -> Self {
        RandomApiError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RandomApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique() {
        let errors = [
            RandomApiError::validation(""),
            RandomApiError::path_not_found(""),
            RandomApiError::type_mismatch(""),
            RandomApiError::invalid_response(""),
            RandomApiError::cyclic_reference(""),
            RandomApiError::sync_in_flight(""),
            RandomApiError::not_found(""),
            RandomApiError::fetch_failed(""),
            RandomApiError::timeout(""),
            RandomApiError::oauth_state(""),
            RandomApiError::database_config(""),
            RandomApiError::database_connection(""),
            RandomApiError::database_operation(""),
            RandomApiError::serialization(""),
            RandomApiError::file_operation(""),
        ];
        let mut codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_display_uses_simple_format() {
        let err = RandomApiError::not_found("endpoint 'cats'");
        assert_eq!(err.to_string(), "Resource Not Found: endpoint 'cats'");
        assert_eq!(err.http_status(), 404);
    }
}
