//! 写操作的输入结构
//!
//! 由服务层在完成校验后构造，存储层只负责落库。

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::DataSourceConfig;

#[derive(Debug, Clone)]
pub struct NewEndpoint {
    pub name: String,
    pub url: String,
    pub description: String,
    pub is_active: bool,
    pub show_on_homepage: bool,
    /// None 时追加到末尾（当前最大值 + 1）
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct EndpointChanges {
    pub name: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub show_on_homepage: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct NewDataSource {
    pub endpoint_id: i32,
    pub name: String,
    pub config: DataSourceConfig,
    pub cache_duration: u64,
    pub is_active: bool,
}

/// 数据源更新；`last_sync` 不受配置修改影响
#[derive(Debug, Clone, Default)]
pub struct DataSourceChanges {
    pub name: Option<String>,
    pub config: Option<DataSourceConfig>,
    pub cache_duration: Option<u64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct NewRule {
    pub name: String,
    pub endpoint_id: Option<i32>,
    pub from_url: String,
    pub to_url: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RuleChanges {
    pub name: Option<String>,
    /// `Some(None)` 改为全局规则
    pub endpoint_id: Option<Option<i32>>,
    pub from_url: Option<String>,
    pub to_url: Option<String>,
    pub is_active: Option<bool>,
}

/// 一个端点的调用计数，整行写入
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointCallRecord {
    pub endpoint_id: i32,
    pub total_calls: u64,
    pub today_calls: u64,
    /// `today_calls` 所属日期
    pub stats_date: NaiveDate,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StorageConfig {
    pub storage_type: String,
}

/// 写入 last_sync 时使用的时间戳
pub fn now() -> DateTime<Utc> {
    Utc::now()
}
