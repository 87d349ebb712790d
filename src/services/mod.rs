//! Service layer for business logic
//!
//! 目录快照、候选池、同步、解析、预加载、调用统计与管理操作，供 HTTP 层和测试共用。

pub mod call_stats;
pub mod catalog;
pub mod endpoint_service;
pub mod fetcher;
pub mod oauth_state;
pub mod pool;
pub mod preloader;
pub mod resolver;
pub mod sync;

use std::sync::Arc;
use std::time::Duration;

pub use call_stats::{CallStats, EndpointCalls};
pub use catalog::{Catalog, CatalogStore};
pub use endpoint_service::*;
pub use fetcher::{FetcherRegistry, ManualFetcher, SourceFetcher};
pub use oauth_state::{OAuthStateStore, StateCheck};
pub use pool::{CandidatePool, PoolStore};
pub use preloader::{Preloader, ScanReport, SourceRefresh};
pub use resolver::{Resolution, Resolver};
pub use sync::{SyncCoordinator, SyncStats};

use crate::config::StaticConfig;
use crate::errors::Result;
use crate::storage::SeaOrmStorage;

/// 组装好的服务集合
#[derive(Clone)]
pub struct AppServices {
    pub storage: Arc<SeaOrmStorage>,
    pub catalog: Arc<CatalogStore>,
    pub pools: Arc<PoolStore>,
    pub sync: Arc<SyncCoordinator>,
    pub resolver: Arc<Resolver>,
    pub preloader: Arc<Preloader>,
    pub endpoints: Arc<EndpointService>,
    pub oauth: Arc<OAuthStateStore>,
    pub call_stats: Arc<CallStats>,
}

impl AppServices {
    /// 加载目录并装配各服务
    pub async fn build(
        storage: Arc<SeaOrmStorage>,
        fetchers: FetcherRegistry,
        config: &StaticConfig,
    ) -> Result<Self> {
        let catalog = Arc::new(CatalogStore::load(storage.clone()).await?);
        let pools = Arc::new(PoolStore::new());
        let call_stats =
            Arc::new(CallStats::load(storage.clone(), &catalog.snapshot()).await?);
        let sync = Arc::new(SyncCoordinator::new(
            storage.clone(),
            catalog.clone(),
            pools.clone(),
            Arc::new(fetchers),
        ));
        let resolver = Arc::new(Resolver::new(
            catalog.clone(),
            pools.clone(),
            sync.clone(),
            Duration::from_millis(config.sync.resolve_timeout_ms),
        ));
        let preloader = Arc::new(Preloader::new(catalog.clone(), pools.clone(), sync.clone()));
        let endpoints = Arc::new(EndpointService::new(
            storage.clone(),
            catalog.clone(),
            pools.clone(),
            sync.clone(),
            preloader.clone(),
            call_stats.clone(),
            config,
        ));
        let oauth = Arc::new(OAuthStateStore::from_config(&config.oauth));

        Ok(Self {
            storage,
            catalog,
            pools,
            sync,
            resolver,
            preloader,
            endpoints,
            oauth,
            call_stats,
        })
    }
}
