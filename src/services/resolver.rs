//! 端点解析
//!
//! 收集可达端点下启用数据源的候选池，缺失或过期的池在后台同步并限时等待，
//! 超时或失败时退回上一次的池。随机抽取一个 URL 后套用替换规则。

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use rand::RngExt;
use serde::Serialize;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, trace, warn};

use crate::errors::{RandomApiError, Result};
use crate::services::catalog::{Catalog, CatalogStore};
use crate::services::pool::PoolStore;
use crate::services::sync::SyncCoordinator;

/// 一次解析的结果
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub endpoint_id: i32,
    /// 替换规则之后的最终 URL
    pub url: String,
    pub candidate_count: usize,
}

pub struct Resolver {
    catalog: Arc<CatalogStore>,
    pools: Arc<PoolStore>,
    sync: Arc<SyncCoordinator>,
    default_timeout: Duration,
}

impl Resolver {
    pub fn new(
        catalog: Arc<CatalogStore>,
        pools: Arc<PoolStore>,
        sync: Arc<SyncCoordinator>,
        default_timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            pools,
            sync,
            default_timeout,
        }
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// 按路由路径解析，使用默认等待时间
    pub async fn resolve_by_url(&self, path: &str) -> Result<Resolution> {
        let path = path.trim_matches('/');
        let endpoint_id = self
            .catalog
            .snapshot()
            .endpoint_by_url(path)
            .map(|e| e.id)
            .ok_or_else(|| RandomApiError::not_found(format!("endpoint '{}' not found", path)))?;
        self.resolve(endpoint_id, self.default_timeout).await
    }

    pub async fn resolve(&self, endpoint_id: i32, wait: Duration) -> Result<Resolution> {
        let candidates = self.candidates(endpoint_id, wait).await?;
        if candidates.is_empty() {
            return Err(RandomApiError::not_found(format!(
                "endpoint {} has no candidate URLs",
                endpoint_id
            )));
        }

        let picked = &candidates[rand::rng().random_range(0..candidates.len())];
        // 规则以解析结束时的目录为准
        let url = self.catalog.snapshot().rewrite(endpoint_id, picked);
        trace!("Endpoint {} resolved {} -> {}", endpoint_id, picked, url);

        Ok(Resolution {
            endpoint_id,
            url,
            candidate_count: candidates.len(),
        })
    }

    /// 端点当前的有效候选池（去重，保持顺序），必要时触发同步
    pub async fn candidates(&self, endpoint_id: i32, wait: Duration) -> Result<Vec<String>> {
        let catalog = self.catalog.snapshot();
        match catalog.endpoint(endpoint_id) {
            Some(endpoint) if endpoint.is_active => {}
            Some(_) => {
                return Err(RandomApiError::not_found(format!(
                    "endpoint {} is inactive",
                    endpoint_id
                )));
            }
            None => {
                return Err(RandomApiError::not_found(format!(
                    "endpoint {} not found",
                    endpoint_id
                )));
            }
        }

        let reachable = catalog.reachable_endpoints(endpoint_id)?;
        self.refresh_stale(&catalog, &reachable, wait).await;
        Ok(self.pools.union_for(&catalog, &reachable))
    }

    /// 对过期或缺失的池启动（或加入）同步，统一截止时间
    async fn refresh_stale(&self, catalog: &Catalog, endpoint_ids: &[i32], wait: Duration) {
        let now = Utc::now();
        let mut seen = HashSet::new();
        let mut waiters = Vec::new();

        for endpoint_id in endpoint_ids {
            for source in catalog.sources_of(*endpoint_id) {
                if !source.is_active || source.is_aggregate() || !seen.insert(source.id) {
                    continue;
                }
                if !self.pools.needs_refresh(source, now) && self.pools.get(source.id).is_some() {
                    continue;
                }
                if let Some(waiter) = self.sync.spawn_or_join(source.clone()) {
                    waiters.push((source.id, waiter));
                }
            }
        }

        if waiters.is_empty() {
            return;
        }

        let deadline = Instant::now() + wait;
        let results = join_all(waiters.into_iter().map(|(source_id, mut waiter)| async move {
            let finished = timeout_at(deadline, waiter.wait_for(|done| *done)).await;
            (source_id, finished.is_ok())
        }))
        .await;

        for (source_id, finished) in results {
            if finished {
                debug!("Data source {} sync completed within deadline", source_id);
            } else {
                warn!(
                    "Data source {} sync exceeded {:?}, using last known pool",
                    source_id, wait
                );
            }
        }
    }
}
