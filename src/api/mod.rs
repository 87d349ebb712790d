//! HTTP 层：重定向、健康检查与管理 API

pub mod middleware;
pub mod services;
