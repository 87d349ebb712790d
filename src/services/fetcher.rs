//! 数据源获取器
//!
//! 每种 `SourceType` 对应一个 `SourceFetcher`。内置只有 manual；图床、通用 API、
//! S3 等外部客户端由调用方实现后注册。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::errors::{RandomApiError, Result};
use crate::model::{DataSource, DataSourceConfig, SourceType};

/// 获取一个数据源的候选 URL 列表
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, source: &DataSource) -> Result<Vec<String>>;

    /// Provider 名称（用于日志）
    fn name(&self) -> &'static str;
}

/// 手动列表：配置即候选池
pub struct ManualFetcher;

#[async_trait]
impl SourceFetcher for ManualFetcher {
    async fn fetch(&self, source: &DataSource) -> Result<Vec<String>> {
        match &source.config {
            DataSourceConfig::Manual(config) => Ok(config.urls.clone()),
            other => Err(RandomApiError::fetch_failed(format!(
                "manual fetcher cannot handle '{}' source {}",
                other.source_type(),
                source.id
            ))),
        }
    }

    fn name(&self) -> &'static str {
        "manual"
    }
}

/// 按类型分派的获取器表
#[derive(Clone)]
pub struct FetcherRegistry {
    fetchers: HashMap<SourceType, Arc<dyn SourceFetcher>>,
}

impl Default for FetcherRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FetcherRegistry {
    /// 带内置 manual 获取器
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(SourceType::Manual, Arc::new(ManualFetcher));
        registry
    }

    pub fn empty() -> Self {
        Self {
            fetchers: HashMap::new(),
        }
    }

    /// 注册（覆盖同类型已有的获取器）
    pub fn register(&mut self, source_type: SourceType, fetcher: Arc<dyn SourceFetcher>) {
        info!("Fetcher registered: {} -> {}", source_type, fetcher.name());
        self.fetchers.insert(source_type, fetcher);
    }

    pub fn with(mut self, source_type: SourceType, fetcher: Arc<dyn SourceFetcher>) -> Self {
        self.register(source_type, fetcher);
        self
    }

    pub fn get(&self, source_type: SourceType) -> Option<Arc<dyn SourceFetcher>> {
        self.fetchers.get(&source_type).cloned()
    }

    pub fn is_registered(&self, source_type: SourceType) -> bool {
        self.fetchers.contains_key(&source_type)
    }

    /// 分派到对应获取器；未注册的类型返回 `FetchFailed`
    pub async fn fetch(&self, source: &DataSource) -> Result<Vec<String>> {
        let source_type = source.source_type();
        let Some(fetcher) = self.get(source_type) else {
            return Err(RandomApiError::fetch_failed(format!(
                "no fetcher registered for source type '{}'",
                source_type
            )));
        };
        debug!(
            "Fetching data source {} ({}) via {}",
            source.id,
            source_type,
            fetcher.name()
        );
        fetcher.fetch(source).await
    }
}
