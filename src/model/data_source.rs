//! 数据源：端点下一个可缓存、可开关的配置绑定

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::model::source_config::{DataSourceConfig, SourceType};

#[derive(Debug, Clone, PartialEq)]
pub struct DataSource {
    pub id: i32,
    pub endpoint_id: i32,
    pub name: String,
    pub config: DataSourceConfig,
    /// 秒；0 表示每次请求都重新获取
    pub cache_duration: u64,
    pub is_active: bool,
    /// 仅由成功的同步写入
    pub last_sync: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 一次同步的结果摘要
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    pub success: bool,
    pub candidate_count: usize,
    pub timestamp: DateTime<Utc>,
}

impl DataSource {
    pub fn source_type(&self) -> SourceType {
        self.config.source_type()
    }

    /// endpoint 类型：不持有池，候选由被引用端点实时计算
    pub fn is_aggregate(&self) -> bool {
        matches!(self.config, DataSourceConfig::Endpoint(_))
    }

    /// 候选池是否需要刷新
    ///
    /// `cache_duration == 0`、从未同步、或距上次成功同步已满 `cache_duration` 秒。
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.stale_since(self.last_sync, now)
    }

    /// 以给定的上次同步时间判断是否过期
    pub fn stale_since(&self, last_sync: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        if self.cache_duration == 0 {
            return true;
        }
        let Some(last_sync) = last_sync else {
            return true;
        };
        let ttl = Duration::seconds(i64::try_from(self.cache_duration).unwrap_or(i64::MAX));
        now.signed_duration_since(last_sync) >= ttl
    }

    /// 记录一次同步；失败不改变 `last_sync`
    pub fn record_sync(
        &mut self,
        success: bool,
        candidate_count: usize,
        timestamp: DateTime<Utc>,
    ) -> SyncOutcome {
        if success {
            self.last_sync = Some(timestamp);
        }
        SyncOutcome {
            success,
            candidate_count,
            timestamp,
        }
    }

    /// 配置版本，用于丢弃基于旧配置的同步结果
    pub fn revision(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
