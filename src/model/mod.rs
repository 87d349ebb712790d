//! 领域模型
//!
//! - `field_path`: 响应字段路径解析
//! - `source_config`: 按类型区分的数据源配置
//! - `data_source`: 数据源与缓存契约
//! - `endpoint`: 端点与排序校验
//! - `rewrite`: URL 替换规则

pub mod data_source;
pub mod endpoint;
pub mod field_path;
pub mod rewrite;
pub mod source_config;

pub use data_source::{DataSource, SyncOutcome};
pub use endpoint::{Endpoint, normalize_endpoint_url, validate_reorder};
pub use field_path::{extract_url, resolve_field_path};
pub use rewrite::{UrlReplaceRule, apply_rules};
pub use source_config::{
    ApiConfig, ApiMethod, ApiRequest, DataSourceConfig, EndpointConfig, LankongConfig,
    ListObjectsVersion, ManualConfig, S3Config, SourceConfig, SourceType,
};
