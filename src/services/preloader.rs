//! 预加载
//!
//! 保存数据源后立即在后台同步；周期性扫描过期或缺失的池；按端点手动刷新。

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::{RandomApiError, Result};
use crate::services::catalog::CatalogStore;
use crate::services::pool::PoolStore;
use crate::services::sync::SyncCoordinator;

/// 单个数据源的刷新结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRefresh {
    pub data_source_id: i32,
    pub success: bool,
    pub candidate_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 最近一次周期扫描
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ScanReport {
    pub started_at: DateTime<Utc>,
    pub scheduled: usize,
}

pub struct Preloader {
    catalog: Arc<CatalogStore>,
    pools: Arc<PoolStore>,
    sync: Arc<SyncCoordinator>,
    last_scan: Mutex<Option<ScanReport>>,
}

impl Preloader {
    pub fn new(
        catalog: Arc<CatalogStore>,
        pools: Arc<PoolStore>,
        sync: Arc<SyncCoordinator>,
    ) -> Self {
        Self {
            catalog,
            pools,
            sync,
            last_scan: Mutex::new(None),
        }
    }

    pub fn last_scan(&self) -> Option<ScanReport> {
        *self.last_scan.lock()
    }

    /// 保存后预加载；停用、endpoint 类型或已在同步中的数据源不处理
    pub fn preload_source(&self, source_id: i32) -> bool {
        let catalog = self.catalog.snapshot();
        let Some(source) = catalog.data_source(source_id) else {
            return false;
        };
        if !source.is_active || source.is_aggregate() {
            return false;
        }
        let scheduled = self.sync.spawn_or_join(source.clone()).is_some();
        if scheduled {
            debug!("Preloading data source {}", source_id);
        }
        scheduled
    }

    /// 扫描一次：同步所有 `cache_duration > 0` 且过期或无池的启用数据源，等待全部结束
    pub async fn scan_once(&self) -> usize {
        let catalog = self.catalog.snapshot();
        let now = Utc::now();

        let waiters: Vec<_> = catalog
            .data_sources()
            .filter(|s| s.is_active && !s.is_aggregate() && s.cache_duration > 0)
            .filter(|s| {
                catalog.endpoint(s.endpoint_id).is_some_and(|e| e.is_active)
            })
            .filter(|s| self.pools.needs_refresh(s, now) || self.pools.get(s.id).is_none())
            .filter_map(|s| self.sync.spawn_or_join(s.clone()))
            .collect();

        let scheduled = waiters.len();
        *self.last_scan.lock() = Some(ScanReport {
            started_at: now,
            scheduled,
        });

        join_all(waiters.into_iter().map(|mut waiter| async move {
            let _ = waiter.wait_for(|done| *done).await;
        }))
        .await;

        if scheduled > 0 {
            info!("Preload scan finished: {} data sources refreshed", scheduled);
        }
        scheduled
    }

    /// 启动周期扫描任务；interval 为 0 时不启动
    pub fn start(self: Arc<Self>, interval: Duration) -> Option<JoinHandle<()>> {
        if interval.is_zero() {
            info!("Periodic preload disabled");
            return None;
        }
        info!("Periodic preload every {:?}", interval);
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                self.scan_once().await;
            }
        }))
    }

    /// 并行同步端点下所有启用的非 endpoint 类型数据源
    pub async fn refresh_endpoint(&self, endpoint_id: i32) -> Result<Vec<SourceRefresh>> {
        let catalog = self.catalog.snapshot();
        if catalog.endpoint(endpoint_id).is_none() {
            return Err(RandomApiError::not_found(format!(
                "endpoint {} not found",
                endpoint_id
            )));
        }

        let ids: Vec<i32> = catalog
            .sources_of(endpoint_id)
            .filter(|s| s.is_active && !s.is_aggregate())
            .map(|s| s.id)
            .collect();

        let reports = join_all(ids.into_iter().map(|id| async move {
            match self.sync.sync_now(id).await {
                Ok(outcome) => SourceRefresh {
                    data_source_id: id,
                    success: true,
                    candidate_count: outcome.candidate_count,
                    error: None,
                },
                Err(e) => {
                    warn!("Refresh of data source {} failed: {}", id, e);
                    SourceRefresh {
                        data_source_id: id,
                        success: false,
                        candidate_count: self.pools.get(id).map(|p| p.len()).unwrap_or(0),
                        error: Some(e.message().to_string()),
                    }
                }
            }
        }))
        .await;

        Ok(reports)
    }
}
