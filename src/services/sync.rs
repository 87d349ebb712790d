//! 数据源同步协调
//!
//! 同一数据源同一时刻最多一个同步。认领只在 DashMap 上短暂持有，获取过程不持任何锁；
//! 提交前后都对照当前目录校验版本，已删除或已修改的数据源的结果直接丢弃。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::errors::{RandomApiError, Result};
use crate::model::{DataSource, SyncOutcome};
use crate::services::catalog::CatalogStore;
use crate::services::fetcher::FetcherRegistry;
use crate::services::pool::{CandidatePool, PoolStore, dedup_urls};
use crate::storage::SeaOrmStorage;

type InFlight = DashMap<i32, watch::Receiver<bool>>;

/// 同步认领；drop 时释放并通知等待方
pub struct SyncClaim {
    source_id: i32,
    in_flight: Arc<InFlight>,
    done: watch::Sender<bool>,
}

impl Drop for SyncClaim {
    fn drop(&mut self) {
        self.in_flight.remove(&self.source_id);
        self.done.send_replace(true);
    }
}

/// 同步计数
#[derive(Debug, Default)]
struct SyncCounters {
    succeeded: AtomicU64,
    failed: AtomicU64,
    discarded: AtomicU64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SyncStats {
    pub succeeded: u64,
    pub failed: u64,
    pub discarded: u64,
    pub in_flight: usize,
}

pub struct SyncCoordinator {
    storage: Arc<SeaOrmStorage>,
    catalog: Arc<CatalogStore>,
    pools: Arc<PoolStore>,
    fetchers: Arc<FetcherRegistry>,
    in_flight: Arc<InFlight>,
    counters: SyncCounters,
}

impl SyncCoordinator {
    pub fn new(
        storage: Arc<SeaOrmStorage>,
        catalog: Arc<CatalogStore>,
        pools: Arc<PoolStore>,
        fetchers: Arc<FetcherRegistry>,
    ) -> Self {
        Self {
            storage,
            catalog,
            pools,
            fetchers,
            in_flight: Arc::new(DashMap::new()),
            counters: SyncCounters::default(),
        }
    }

    /// 尝试认领；已有同步进行中时返回 None
    pub fn claim(&self, source_id: i32) -> Option<SyncClaim> {
        match self.in_flight.entry(source_id) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                let (done, waiter) = watch::channel(false);
                slot.insert(waiter);
                Some(SyncClaim {
                    source_id,
                    in_flight: self.in_flight.clone(),
                    done,
                })
            }
        }
    }

    pub fn is_in_flight(&self, source_id: i32) -> bool {
        self.in_flight.contains_key(&source_id)
    }

    pub fn stats(&self) -> SyncStats {
        SyncStats {
            succeeded: self.counters.succeeded.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            discarded: self.counters.discarded.load(Ordering::Relaxed),
            in_flight: self.in_flight.len(),
        }
    }

    /// 显式同步
    ///
    /// 同一数据源已有同步进行中时返回 `SyncInFlight`；endpoint 类型在进程内计算。
    pub async fn sync_now(&self, source_id: i32) -> Result<SyncOutcome> {
        let catalog = self.catalog.snapshot();
        let source = catalog
            .data_source(source_id)
            .cloned()
            .ok_or_else(|| RandomApiError::not_found(format!("data source {} not found", source_id)))?;

        if source.is_aggregate() {
            let referenced = source.config.referenced_endpoints();
            let mut endpoint_ids = Vec::new();
            for id in referenced {
                for reachable in catalog.reachable_endpoints(*id)? {
                    if !endpoint_ids.contains(&reachable) {
                        endpoint_ids.push(reachable);
                    }
                }
            }
            let count = self.pools.union_for(&catalog, &endpoint_ids).len();
            let mut source = source;
            return Ok(source.record_sync(true, count, Utc::now()));
        }

        let claim = self.claim(source_id).ok_or_else(|| {
            RandomApiError::sync_in_flight(format!(
                "data source {} is already being synchronized",
                source_id
            ))
        })?;
        self.run(claim, source).await
    }

    /// 认领成功则在后台启动同步；返回完成通知
    ///
    /// 已有同步进行中时加入等待。两者都不成立（刚刚完成）时返回 None。
    pub fn spawn_or_join(self: &Arc<Self>, source: DataSource) -> Option<watch::Receiver<bool>> {
        match self.claim(source.id) {
            Some(claim) => {
                let waiter = claim.done.subscribe();
                let coordinator = Arc::clone(self);
                tokio::spawn(async move {
                    let source_id = source.id;
                    if let Err(e) = coordinator.run(claim, source).await {
                        debug!("Background sync of data source {} ended: {}", source_id, e);
                    }
                });
                Some(waiter)
            }
            None => self.in_flight.get(&source.id).map(|w| w.clone()),
        }
    }

    /// 持有认领执行一次同步，结束时认领随 drop 释放
    async fn run(&self, claim: SyncClaim, source: DataSource) -> Result<SyncOutcome> {
        let started = std::time::Instant::now();
        let fetched = self.fetchers.fetch(&source).await;

        let result = match fetched {
            Ok(urls) => self.commit(&source, dedup_urls(urls)).await,
            Err(e) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "Sync of data source {} ({}) failed, keeping last pool: {}",
                    source.id,
                    source.source_type(),
                    e
                );
                Err(e)
            }
        };

        debug!(
            "Sync of data source {} finished in {:?}",
            source.id,
            started.elapsed()
        );
        drop(claim);
        result
    }

    /// 提交同步结果：校验版本 → 写 last_sync → 写池（含同步时间）→ 再次校验
    async fn commit(&self, source: &DataSource, urls: Vec<String>) -> Result<SyncOutcome> {
        let revision = source.revision();
        let still_current = |catalog: &crate::services::catalog::Catalog| {
            catalog
                .data_source(source.id)
                .is_some_and(|current| current.revision() == revision)
        };

        if !still_current(&self.catalog.snapshot()) {
            return Err(self.discard(source.id, "changed before commit"));
        }

        let synced_at = Utc::now();
        if !self.storage.record_sync(source.id, revision, synced_at).await? {
            return Err(self.discard(source.id, "changed in database"));
        }

        let count = urls.len();
        self.pools
            .insert(source.id, CandidatePool::new(urls, synced_at, revision));

        // 与删除/修改竞争：写入后再确认一次
        if !still_current(&self.catalog.snapshot()) {
            self.pools.remove_revision(source.id, revision);
            return Err(self.discard(source.id, "changed during commit"));
        }

        self.counters.succeeded.fetch_add(1, Ordering::Relaxed);
        info!("Data source {} synced: {} candidates", source.id, count);

        let mut source = source.clone();
        Ok(source.record_sync(true, count, synced_at))
    }

    fn discard(&self, source_id: i32, reason: &str) -> RandomApiError {
        self.counters.discarded.fetch_add(1, Ordering::Relaxed);
        info!("Discarding sync result of data source {}: {}", source_id, reason);
        RandomApiError::not_found(format!(
            "data source {} was deleted or modified during sync; result discarded",
            source_id
        ))
    }
}
