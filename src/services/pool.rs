//! 候选 URL 池
//!
//! 每个数据源一份最近一次成功同步的结果，整份替换。
//! 同步时间也记在这里，成功同步不需要重建目录快照。

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use crate::model::DataSource;
use crate::services::catalog::Catalog;

#[derive(Debug, Clone)]
pub struct CandidatePool {
    pub urls: Arc<[String]>,
    pub synced_at: DateTime<Utc>,
    /// 生成该池时数据源的配置版本
    pub revision: DateTime<Utc>,
}

impl CandidatePool {
    pub fn new(urls: Vec<String>, synced_at: DateTime<Utc>, revision: DateTime<Utc>) -> Self {
        Self {
            urls: urls.into(),
            synced_at,
            revision,
        }
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

#[derive(Default)]
pub struct PoolStore {
    pools: DashMap<i32, CandidatePool>,
    /// 最近一次成功同步的时间；配置修改后仍保留，数据源删除时清除
    synced: DashMap<i32, DateTime<Utc>>,
}

impl PoolStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, source_id: i32) -> Option<CandidatePool> {
        self.pools.get(&source_id).map(|p| p.clone())
    }

    pub fn insert(&self, source_id: i32, pool: CandidatePool) {
        self.synced
            .entry(source_id)
            .and_modify(|at| *at = (*at).max(pool.synced_at))
            .or_insert(pool.synced_at);
        self.pools.insert(source_id, pool);
    }

    /// 数据源的上次成功同步时间：目录中落库的值与进程内记录取较新者
    pub fn last_sync(&self, source: &DataSource) -> Option<DateTime<Utc>> {
        let recorded = self.synced.get(&source.id).map(|at| *at);
        source.last_sync.max(recorded)
    }

    /// 与 `DataSource::needs_refresh` 相同，但考虑尚未反映到目录中的同步
    pub fn needs_refresh(&self, source: &DataSource, now: DateTime<Utc>) -> bool {
        source.stale_since(self.last_sync(source), now)
    }

    /// 返回带最新 `last_sync` 的副本
    pub fn with_last_sync(&self, source: &DataSource) -> DataSource {
        let mut source = source.clone();
        source.last_sync = self.last_sync(&source);
        source
    }

    pub fn remove(&self, source_id: i32) {
        self.pools.remove(&source_id);
    }

    /// 仅当池仍是 `revision` 生成的那份时移除，不误删更新的结果
    pub fn remove_revision(&self, source_id: i32, revision: DateTime<Utc>) {
        self.pools
            .remove_if(&source_id, |_, pool| pool.revision == revision);
    }

    /// 目录替换后调用：丢弃已删除或配置已变化的数据源的池
    pub fn retain_current(&self, catalog: &Catalog) {
        let before = self.pools.len();
        self.pools.retain(|id, pool| {
            catalog
                .data_source(*id)
                .is_some_and(|source| source.revision() == pool.revision)
        });
        self.synced.retain(|id, _| catalog.data_source(*id).is_some());
        let dropped = before.saturating_sub(self.pools.len());
        if dropped > 0 {
            debug!("Dropped {} stale candidate pools", dropped);
        }
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    pub fn total_candidates(&self) -> usize {
        self.pools.iter().map(|p| p.len()).sum()
    }

    /// 一组端点下启用的非 endpoint 类型数据源的池并集（去重，保持首次出现顺序）
    ///
    /// 不触发同步，只读当前已有的池。
    pub fn union_for(&self, catalog: &Catalog, endpoint_ids: &[i32]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut urls = Vec::new();
        for endpoint_id in endpoint_ids {
            for source in catalog.sources_of(*endpoint_id) {
                if !source.is_active || source.is_aggregate() {
                    continue;
                }
                if let Some(pool) = self.get(source.id) {
                    for url in pool.urls.iter() {
                        if seen.insert(url.clone()) {
                            urls.push(url.clone());
                        }
                    }
                }
            }
        }
        urls
    }
}

/// 去重并保持顺序
pub fn dedup_urls(urls: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(urls.len());
    urls.into_iter()
        .filter(|u| seen.insert(u.clone()))
        .collect()
}
