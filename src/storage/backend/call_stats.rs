//! Endpoint call statistics for SeaOrmStorage
//!
//! 计数在内存中累加，由 `CallStats` 定时整行写入（upsert）。

use chrono::NaiveDate;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue::Set, EntityTrait, TransactionTrait};
use tracing::{debug, warn};

use super::{SeaOrmStorage, retry};
use crate::errors::{RandomApiError, Result};
use crate::storage::models::{EndpointCallRecord, now};

use migration::entities::{api_endpoint, endpoint_call_stats};

fn to_record(model: endpoint_call_stats::Model) -> Option<EndpointCallRecord> {
    let Ok(stats_date) = model.stats_date.parse::<NaiveDate>() else {
        warn!(
            "Skipping call stats of endpoint {}: invalid date '{}'",
            model.endpoint_id, model.stats_date
        );
        return None;
    };
    Some(EndpointCallRecord {
        endpoint_id: model.endpoint_id,
        total_calls: u64::try_from(model.total_calls).unwrap_or(0),
        today_calls: u64::try_from(model.today_calls).unwrap_or(0),
        stats_date,
    })
}

impl SeaOrmStorage {
    pub async fn load_call_stats(&self) -> Result<Vec<EndpointCallRecord>> {
        let db = &self.db;
        let models = retry::with_retry("load_call_stats", self.retry_config, || async {
            endpoint_call_stats::Entity::find().all(db).await
        })
        .await
        .map_err(|e| RandomApiError::database_operation(format!("加载调用统计失败: {}", e)))?;

        Ok(models.into_iter().filter_map(to_record).collect())
    }

    /// 在一个事务里写入一批计数；端点已不存在的记录跳过
    pub async fn save_call_stats(&self, records: &[EndpointCallRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let txn = self.db.begin().await.map_err(|e| {
            RandomApiError::database_operation(format!("开始事务失败: {}", e))
        })?;
        let ts = now();
        let mut written = 0;

        for record in records {
            if api_endpoint::Entity::find_by_id(record.endpoint_id)
                .one(&txn)
                .await?
                .is_none()
            {
                debug!(
                    "Endpoint {} no longer exists, dropping its call stats",
                    record.endpoint_id
                );
                continue;
            }

            let model = endpoint_call_stats::ActiveModel {
                endpoint_id: Set(record.endpoint_id),
                total_calls: Set(i64::try_from(record.total_calls).unwrap_or(i64::MAX)),
                today_calls: Set(i64::try_from(record.today_calls).unwrap_or(i64::MAX)),
                stats_date: Set(record.stats_date.to_string()),
                updated_at: Set(ts),
            };
            endpoint_call_stats::Entity::insert(model)
                .on_conflict(
                    OnConflict::column(endpoint_call_stats::Column::EndpointId)
                        .update_columns([
                            endpoint_call_stats::Column::TotalCalls,
                            endpoint_call_stats::Column::TodayCalls,
                            endpoint_call_stats::Column::StatsDate,
                            endpoint_call_stats::Column::UpdatedAt,
                        ])
                        .to_owned(),
                )
                .exec_without_returning(&txn)
                .await
                .map_err(|e| {
                    RandomApiError::database_operation(format!("写入调用统计失败: {}", e))
                })?;
            written += 1;
        }

        txn.commit()
            .await
            .map_err(|e| RandomApiError::database_operation(format!("提交事务失败: {}", e)))?;

        debug!(
            "Call stats flushed to {} database ({} records)",
            self.backend_name.to_uppercase(),
            written
        );
        Ok(written)
    }
}
