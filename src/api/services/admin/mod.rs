//! Admin API 服务模块
//!
//! 该模块包含管理 API 的所有端点，包括：
//! - 端点 CRUD、批量排序、刷新与预览
//! - 数据源 CRUD、启停与同步
//! - URL 替换规则 CRUD
//! - OAuth state 签发与校验
//! - 端点调用统计

mod data_sources;
mod endpoints;
pub mod error_code;
mod helpers;
mod oauth;
mod rules;
pub mod routes;
mod stats;
mod types;

// 重新导出类型
pub use types::*;

// 重新导出帮助函数
pub use helpers::{api_result, error_from_domain, error_response, success_response};

// 重新导出错误码
pub use error_code::ErrorCode;

pub use routes::admin_v1_routes;
