//! 端点调用统计
//!
//! 每次成功重定向计一次：累计数与当日数。计数在内存中累加，定时整行刷入数据库；
//! 跨日后当日数在下一次读写时归零。

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use dashmap::{DashMap, DashSet};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::errors::Result;
use crate::services::catalog::Catalog;
use crate::storage::{EndpointCallRecord, SeaOrmStorage};

/// 当前本地日期，当日计数以此为界
fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EndpointCalls {
    pub total_calls: u64,
    pub today_calls: u64,
    /// `today_calls` 所属日期
    pub date: NaiveDate,
}

impl EndpointCalls {
    fn empty(date: NaiveDate) -> Self {
        Self {
            total_calls: 0,
            today_calls: 0,
            date,
        }
    }

    /// 跨日时清零当日计数，返回是否发生了变化
    fn roll_over(&mut self, today: NaiveDate) -> bool {
        if self.date == today {
            return false;
        }
        self.today_calls = 0;
        self.date = today;
        true
    }

    fn as_of(mut self, today: NaiveDate) -> Self {
        self.roll_over(today);
        self
    }
}

pub struct CallStats {
    storage: Arc<SeaOrmStorage>,
    counters: DashMap<i32, EndpointCalls>,
    /// 尚未写入数据库的端点
    dirty: DashSet<i32>,
    flush_lock: Mutex<()>,
}

impl CallStats {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self {
            storage,
            counters: DashMap::new(),
            dirty: DashSet::new(),
            flush_lock: Mutex::new(()),
        }
    }

    /// 从数据库恢复计数；目录中已不存在的端点忽略
    pub async fn load(storage: Arc<SeaOrmStorage>, catalog: &Catalog) -> Result<Self> {
        let stats = Self::new(storage);
        let records = stats.storage.load_call_stats().await?;
        for record in records {
            if catalog.endpoint(record.endpoint_id).is_none() {
                continue;
            }
            stats.counters.insert(
                record.endpoint_id,
                EndpointCalls {
                    total_calls: record.total_calls,
                    today_calls: record.today_calls,
                    date: record.stats_date,
                },
            );
        }
        debug!("Call stats restored for {} endpoints", stats.counters.len());
        Ok(stats)
    }

    pub fn increment(&self, endpoint_id: i32) {
        self.increment_on(endpoint_id, today());
    }

    fn increment_on(&self, endpoint_id: i32, today: NaiveDate) {
        let mut entry = self
            .counters
            .entry(endpoint_id)
            .or_insert_with(|| EndpointCalls::empty(today));
        entry.roll_over(today);
        entry.total_calls = entry.total_calls.saturating_add(1);
        entry.today_calls = entry.today_calls.saturating_add(1);
        drop(entry);

        self.dirty.insert(endpoint_id);
        trace!("CallStats: endpoint {} incremented", endpoint_id);
    }

    pub fn get(&self, endpoint_id: i32) -> Option<EndpointCalls> {
        self.get_on(endpoint_id, today())
    }

    fn get_on(&self, endpoint_id: i32, today: NaiveDate) -> Option<EndpointCalls> {
        self.counters.get(&endpoint_id).map(|c| c.as_of(today))
    }

    /// 没有调用记录时返回全零
    pub fn get_or_empty(&self, endpoint_id: i32) -> EndpointCalls {
        let today = today();
        self.get_on(endpoint_id, today)
            .unwrap_or_else(|| EndpointCalls::empty(today))
    }

    /// 全部端点的计数，按端点 id 升序
    pub fn snapshot(&self) -> Vec<(i32, EndpointCalls)> {
        let today = today();
        let mut all: Vec<(i32, EndpointCalls)> = self
            .counters
            .iter()
            .map(|entry| (*entry.key(), entry.value().as_of(today)))
            .collect();
        all.sort_unstable_by_key(|(id, _)| *id);
        all
    }

    pub fn total_calls(&self) -> u64 {
        self.counters.iter().map(|c| c.total_calls).sum()
    }

    /// 目录替换后调用：丢弃已删除端点的计数
    pub fn retain_current(&self, catalog: &Catalog) {
        self.counters.retain(|id, _| catalog.endpoint(*id).is_some());
        self.dirty.retain(|id| catalog.endpoint(*id).is_some());
    }

    /// 把有变化的计数写入数据库；失败时保留脏标记，下次重试
    pub async fn flush(&self) -> Result<usize> {
        let _guard = self.flush_lock.lock().await;

        // 逐个 remove，flush 期间新增的脏标记不受影响
        let ids: Vec<i32> = self.dirty.iter().map(|id| *id).collect();
        let mut pending = HashSet::with_capacity(ids.len());
        for id in ids {
            if self.dirty.remove(&id).is_some() {
                pending.insert(id);
            }
        }
        if pending.is_empty() {
            return Ok(0);
        }

        let today = today();
        let records: Vec<EndpointCallRecord> = pending
            .iter()
            .filter_map(|id| {
                self.counters.get(id).map(|c| {
                    let calls = c.as_of(today);
                    EndpointCallRecord {
                        endpoint_id: *id,
                        total_calls: calls.total_calls,
                        today_calls: calls.today_calls,
                        stats_date: calls.date,
                    }
                })
            })
            .collect();

        match self.storage.save_call_stats(&records).await {
            Ok(written) => Ok(written),
            Err(e) => {
                for id in pending {
                    self.dirty.insert(id);
                }
                Err(e)
            }
        }
    }

    /// 启动定时刷盘任务；interval 为 0 时不启动
    pub fn start(self: Arc<Self>, interval: Duration) -> Option<JoinHandle<()>> {
        if interval.is_zero() {
            info!("Call stats flush task disabled");
            return None;
        }
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = self.flush().await {
                    warn!("Failed to flush call stats: {}", e);
                }
            }
        }))
    }
}
