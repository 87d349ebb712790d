//! 端点管理服务
//!
//! 端点、数据源、替换规则的增删改与排序。所有写操作：
//! 持写锁 → 基于当前目录校验 → 落库 → 重建目录并替换 → 清理失效的候选池。

mod data_sources;
mod endpoints;
mod rules;
mod stats;

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Deserializer};
use tracing::error;

use crate::config::StaticConfig;
use crate::errors::Result;
use crate::model::SourceType;
use crate::services::call_stats::CallStats;
use crate::services::catalog::CatalogStore;
use crate::services::pool::PoolStore;
use crate::services::preloader::Preloader;
use crate::services::sync::SyncCoordinator;
use crate::storage::SeaOrmStorage;

// ============ Request DTOs ============

fn default_true() -> bool {
    true
}

/// 区分「字段缺省」与「显式 null」
fn double_option<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEndpointRequest {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "default_true")]
    pub show_on_homepage: bool,
    /// 缺省时追加到末尾
    #[serde(default)]
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEndpointRequest {
    pub name: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub show_on_homepage: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDataSourceRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    /// JSON 对象；manual 也接受纯文本字符串
    #[serde(default)]
    pub config: serde_json::Value,
    #[serde(default)]
    pub cache_duration: Option<u64>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDataSourceRequest {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub source_type: Option<SourceType>,
    pub config: Option<serde_json::Value>,
    pub cache_duration: Option<u64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRuleRequest {
    #[serde(default)]
    pub name: String,
    /// null 为全局规则
    #[serde(default)]
    pub endpoint_id: Option<i32>,
    pub from_url: String,
    #[serde(default)]
    pub to_url: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRuleRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub endpoint_id: Option<Option<i32>>,
    pub from_url: Option<String>,
    pub to_url: Option<String>,
    pub is_active: Option<bool>,
}

/// 单个排序项
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SortOrderUpdate {
    pub id: i32,
    pub sort_order: i32,
}

/// 请求里的 config 值转为待解析的原始文本
fn raw_config(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ============ EndpointService Implementation ============

pub struct EndpointService {
    storage: Arc<SeaOrmStorage>,
    catalog: Arc<CatalogStore>,
    pools: Arc<PoolStore>,
    sync: Arc<SyncCoordinator>,
    preloader: Arc<Preloader>,
    call_stats: Arc<CallStats>,
    reserved_segments: Vec<String>,
    default_cache_duration: u64,
    preload_on_save: bool,
}

impl EndpointService {
    pub fn new(
        storage: Arc<SeaOrmStorage>,
        catalog: Arc<CatalogStore>,
        pools: Arc<PoolStore>,
        sync: Arc<SyncCoordinator>,
        preloader: Arc<Preloader>,
        call_stats: Arc<CallStats>,
        config: &StaticConfig,
    ) -> Self {
        Self {
            storage,
            catalog,
            pools,
            sync,
            preloader,
            call_stats,
            reserved_segments: config.routes.reserved_segments(),
            default_cache_duration: config.sync.default_cache_duration,
            preload_on_save: config.sync.preload_on_save,
        }
    }

    /// 执行一次写操作：调用方已持写锁，完成后重建目录
    async fn apply<T, Fut>(&self, write: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        let value = write.await?;
        match self.catalog.reload().await {
            Ok(catalog) => {
                self.pools.retain_current(&catalog);
                self.call_stats.retain_current(&catalog);
                Ok(value)
            }
            Err(e) => {
                error!("Catalog reload after write failed: {}", e);
                Err(e)
            }
        }
    }

    fn maybe_preload(&self, source_id: i32) {
        if self.preload_on_save {
            self.preloader.preload_source(source_id);
        }
    }
}
