//! Admin API 类型定义

use serde::{Deserialize, Serialize};

use crate::model::{DataSource, Endpoint, SourceType, UrlReplaceRule};
use crate::services::{EndpointCalls, SourceRefresh};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

// ============ 端点 ============

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EndpointResponse {
    pub id: i32,
    pub name: String,
    pub url: String,
    pub description: String,
    pub is_active: bool,
    pub show_on_homepage: bool,
    pub sort_order: i32,
    pub data_source_count: usize,
    pub created_at: String,
    pub updated_at: String,
}

impl EndpointResponse {
    pub fn new(endpoint: Endpoint, data_source_count: usize) -> Self {
        Self {
            id: endpoint.id,
            name: endpoint.name,
            url: endpoint.url,
            description: endpoint.description,
            is_active: endpoint.is_active,
            show_on_homepage: endpoint.show_on_homepage,
            sort_order: endpoint.sort_order,
            data_source_count,
            created_at: endpoint.created_at.to_rfc3339(),
            updated_at: endpoint.updated_at.to_rfc3339(),
        }
    }
}

// ============ 调用统计 ============

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EndpointCallStatsResponse {
    pub endpoint_id: i32,
    pub name: String,
    pub url: String,
    pub total_calls: u64,
    pub today_calls: u64,
    /// `today_calls` 所属日期（服务器本地时区）
    pub stats_date: String,
}

impl EndpointCallStatsResponse {
    pub fn new(endpoint: Endpoint, calls: EndpointCalls) -> Self {
        Self {
            endpoint_id: endpoint.id,
            name: endpoint.name,
            url: endpoint.url,
            total_calls: calls.total_calls,
            today_calls: calls.today_calls,
            stats_date: calls.date.format("%Y-%m-%d").to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CallStatsResponse {
    pub total_calls: u64,
    pub today_calls: u64,
    pub endpoints: Vec<EndpointCallStatsResponse>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PreviewQuery {
    /// 抽样个数，默认 5，最多 50
    pub count: Option<usize>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PreviewResponse {
    pub endpoint_id: i32,
    pub candidate_count: usize,
    /// 已套用替换规则的抽样结果
    pub samples: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RefreshResponse {
    pub endpoint_id: i32,
    pub results: Vec<SourceRefresh>,
}

// ============ 数据源 ============

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DataSourceResponse {
    pub id: i32,
    pub endpoint_id: i32,
    pub name: String,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub config: serde_json::Value,
    pub cache_duration: u64,
    pub is_active: bool,
    pub last_sync: Option<String>,
    /// 内存中候选池大小；尚未同步为 None
    pub candidate_count: Option<usize>,
    pub syncing: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl DataSourceResponse {
    pub fn new(source: DataSource, candidate_count: Option<usize>, syncing: bool) -> Self {
        Self {
            id: source.id,
            endpoint_id: source.endpoint_id,
            name: source.name,
            source_type: source.config.source_type(),
            config: source.config.to_json(),
            cache_duration: source.cache_duration,
            is_active: source.is_active,
            last_sync: source.last_sync.map(|t| t.to_rfc3339()),
            candidate_count,
            syncing,
            created_at: source.created_at.to_rfc3339(),
            updated_at: source.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ToggleRequest {
    pub is_active: bool,
}

// ============ 替换规则 ============

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RuleResponse {
    pub id: i32,
    pub name: String,
    pub endpoint_id: Option<i32>,
    pub from_url: String,
    pub to_url: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<UrlReplaceRule> for RuleResponse {
    fn from(rule: UrlReplaceRule) -> Self {
        Self {
            id: rule.id,
            name: rule.name,
            endpoint_id: rule.endpoint_id,
            from_url: rule.from_url,
            to_url: rule.to_url,
            is_active: rule.is_active,
            created_at: rule.created_at.to_rfc3339(),
            updated_at: rule.updated_at.to_rfc3339(),
        }
    }
}

// ============ OAuth state ============

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct IssueStateRequest {
    pub session_id: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct IssueStateResponse {
    pub state: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct VerifyStateRequest {
    pub session_id: String,
    /// 回调中 provider 带回的 state
    pub state: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct VerifyStateResponse {
    pub verified: bool,
    pub provider_state_missing: bool,
}

// ============ 健康检查 ============

/// 存储健康检查状态
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct HealthStorageCheck {
    pub status: String,
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 目录与同步概况
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct HealthCatalogCheck {
    pub endpoints: usize,
    pub data_sources: usize,
    pub rules: usize,
    pub pools: usize,
    pub candidates: usize,
    pub syncs_in_flight: usize,
    pub syncs_succeeded: u64,
    pub syncs_failed: u64,
    /// 自统计开始以来全部端点的成功重定向次数
    pub total_calls: u64,
}

/// 健康检查项容器
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct HealthChecks {
    pub storage: HealthStorageCheck,
    pub catalog: HealthCatalogCheck,
}

/// 健康检查响应
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub uptime: u32,
    pub checks: HealthChecks,
    pub response_time_ms: u32,
}
