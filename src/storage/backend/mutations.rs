//! Mutation operations for SeaOrmStorage
//!
//! This module contains all write database operations.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, ExprTrait, IntoActiveModel, QueryFilter,
    SqlErr, TransactionTrait, ActiveValue::Set, sea_query::Expr,
};
use tracing::{info, warn};

use super::converters::{
    model_to_data_source, model_to_endpoint, model_to_rule, new_data_source_to_active_model,
    new_endpoint_to_active_model, new_rule_to_active_model,
};
use super::{SeaOrmStorage, retry};
use crate::errors::{RandomApiError, Result};
use crate::model::{DataSource, Endpoint, UrlReplaceRule};
use crate::storage::models::{
    DataSourceChanges, EndpointChanges, NewDataSource, NewEndpoint, NewRule, RuleChanges, now,
};

use migration::entities::{api_endpoint, data_source, endpoint_call_stats, url_replace_rule};

/// 唯一约束冲突转为校验错误，其余为数据库错误
fn map_write_err(context: &str, err: DbErr) -> RandomApiError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            RandomApiError::validation(format!("{}: duplicate value ({})", context, detail))
        }
        _ => RandomApiError::database_operation(format!("{}: {}", context, err)),
    }
}

fn stored_config_invalid(id: i32) -> RandomApiError {
    RandomApiError::database_operation(format!("data source {} was stored with an invalid config", id))
}

impl SeaOrmStorage {
    // ============================================================
    // endpoints
    // ============================================================

    /// 插入端点
    ///
    /// 未指定位置时追加到末尾；指定位置时，同一事务内把该位置及之后的端点后移一位，
    /// 保证排序位置不重复。
    pub async fn insert_endpoint(&self, endpoint: NewEndpoint) -> Result<Endpoint> {
        let Some(sort_order) = endpoint.sort_order else {
            let sort_order = self
                .max_sort_order()
                .await?
                .map_or(0, |max| max.saturating_add(1));
            let model = new_endpoint_to_active_model(&endpoint, sort_order)
                .insert(&self.db)
                .await
                .map_err(|e| map_write_err("创建端点失败", e))?;
            info!("Endpoint created: {} (/{})", model.id, model.url);
            return Ok(model_to_endpoint(model));
        };

        let txn = self.db.begin().await.map_err(|e| {
            RandomApiError::database_operation(format!("开始事务失败: {}", e))
        })?;

        let shifted = api_endpoint::Entity::update_many()
            .col_expr(
                api_endpoint::Column::SortOrder,
                Expr::col(api_endpoint::Column::SortOrder).add(1),
            )
            .filter(api_endpoint::Column::SortOrder.gte(sort_order))
            .exec(&txn)
            .await
            .map_err(|e| RandomApiError::database_operation(format!("调整排序失败: {}", e)))?;

        let model = match new_endpoint_to_active_model(&endpoint, sort_order)
            .insert(&txn)
            .await
        {
            Ok(model) => model,
            Err(e) => {
                txn.rollback().await?;
                return Err(map_write_err("创建端点失败", e));
            }
        };

        txn.commit()
            .await
            .map_err(|e| RandomApiError::database_operation(format!("提交事务失败: {}", e)))?;

        info!(
            "Endpoint created: {} (/{}) at position {}, {} endpoints shifted",
            model.id, model.url, sort_order, shifted.rows_affected
        );
        Ok(model_to_endpoint(model))
    }

    pub async fn update_endpoint(&self, id: i32, changes: EndpointChanges) -> Result<Endpoint> {
        let model = api_endpoint::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| RandomApiError::not_found(format!("endpoint {} not found", id)))?;

        let mut active = model.into_active_model();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(url) = changes.url {
            active.url = Set(url);
        }
        if let Some(description) = changes.description {
            active.description = Set(description);
        }
        if let Some(is_active) = changes.is_active {
            active.is_active = Set(is_active);
        }
        if let Some(show_on_homepage) = changes.show_on_homepage {
            active.show_on_homepage = Set(show_on_homepage);
        }
        active.updated_at = Set(now());

        let model = active
            .update(&self.db)
            .await
            .map_err(|e| map_write_err("更新端点失败", e))?;
        Ok(model_to_endpoint(model))
    }

    /// 删除端点及其全部数据源（同一事务）
    ///
    /// 绑定该端点的替换规则保留但被停用，之后复用同一 id 的端点不会继承它们；
    /// 调用统计一并删除；其后的端点前移一位，排序保持连续。
    pub async fn delete_endpoint(&self, id: i32) -> Result<()> {
        let txn = self.db.begin().await.map_err(|e| {
            RandomApiError::database_operation(format!("开始事务失败: {}", e))
        })?;

        let Some(existing) = api_endpoint::Entity::find_by_id(id).one(&txn).await? else {
            txn.rollback().await?;
            return Err(RandomApiError::not_found(format!("endpoint {} not found", id)));
        };

        let removed_sources = data_source::Entity::delete_many()
            .filter(data_source::Column::EndpointId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| RandomApiError::database_operation(format!("删除数据源失败: {}", e)))?;

        let disabled_rules = url_replace_rule::Entity::update_many()
            .col_expr(url_replace_rule::Column::IsActive, Expr::value(false))
            .col_expr(url_replace_rule::Column::UpdatedAt, Expr::value(now()))
            .filter(url_replace_rule::Column::EndpointId.eq(id))
            .filter(url_replace_rule::Column::IsActive.eq(true))
            .exec(&txn)
            .await
            .map_err(|e| RandomApiError::database_operation(format!("停用替换规则失败: {}", e)))?;

        endpoint_call_stats::Entity::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(|e| RandomApiError::database_operation(format!("删除调用统计失败: {}", e)))?;

        api_endpoint::Entity::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(|e| RandomApiError::database_operation(format!("删除端点失败: {}", e)))?;

        api_endpoint::Entity::update_many()
            .col_expr(
                api_endpoint::Column::SortOrder,
                Expr::col(api_endpoint::Column::SortOrder).sub(1),
            )
            .filter(api_endpoint::Column::SortOrder.gt(existing.sort_order))
            .exec(&txn)
            .await
            .map_err(|e| RandomApiError::database_operation(format!("调整排序失败: {}", e)))?;

        txn.commit()
            .await
            .map_err(|e| RandomApiError::database_operation(format!("提交事务失败: {}", e)))?;

        info!(
            "Endpoint deleted: {} ({} data sources removed, {} rules disabled)",
            id, removed_sources.rows_affected, disabled_rules.rows_affected
        );
        Ok(())
    }

    /// 在一个事务内应用整批排序；任一行失败则整体回滚
    pub async fn reorder_endpoints(&self, updates: &[(i32, i32)]) -> Result<()> {
        let txn = self.db.begin().await.map_err(|e| {
            RandomApiError::database_operation(format!("开始事务失败: {}", e))
        })?;
        let ts = now();

        for &(id, sort_order) in updates {
            let result = api_endpoint::Entity::update_many()
                .col_expr(api_endpoint::Column::SortOrder, Expr::value(sort_order))
                .col_expr(api_endpoint::Column::UpdatedAt, Expr::value(ts))
                .filter(api_endpoint::Column::Id.eq(id))
                .exec(&txn)
                .await;

            let failure = match result {
                Ok(r) if r.rows_affected == 1 => None,
                Ok(_) => Some(RandomApiError::not_found(format!("endpoint {} not found", id))),
                Err(e) => Some(RandomApiError::database_operation(format!(
                    "更新端点 {} 排序失败: {}",
                    id, e
                ))),
            };

            if let Some(err) = failure {
                warn!("Sort order batch rolled back: {}", err);
                txn.rollback().await?;
                return Err(err);
            }
        }

        txn.commit()
            .await
            .map_err(|e| RandomApiError::database_operation(format!("提交事务失败: {}", e)))?;
        info!("Sort order updated for {} endpoints", updates.len());
        Ok(())
    }

    // ============================================================
    // data sources
    // ============================================================

    pub async fn insert_data_source(&self, source: NewDataSource) -> Result<DataSource> {
        if self.get_endpoint(source.endpoint_id).await?.is_none() {
            return Err(RandomApiError::not_found(format!(
                "endpoint {} not found",
                source.endpoint_id
            )));
        }

        let model = new_data_source_to_active_model(&source)
            .insert(&self.db)
            .await
            .map_err(|e| map_write_err("创建数据源失败", e))?;

        info!(
            "Data source created: {} ({}) on endpoint {}",
            model.id, model.source_type, model.endpoint_id
        );
        let id = model.id;
        model_to_data_source(model).ok_or_else(|| stored_config_invalid(id))
    }

    /// 更新配置；`last_sync` 保持不变，`updated_at` 前移使进行中的同步结果失效
    pub async fn update_data_source(
        &self,
        id: i32,
        changes: DataSourceChanges,
    ) -> Result<DataSource> {
        let model = data_source::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| RandomApiError::not_found(format!("data source {} not found", id)))?;

        let mut active = model.into_active_model();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(config) = changes.config {
            active.source_type = Set(config.source_type().to_string());
            active.config = Set(config.serialize());
        }
        if let Some(cache_duration) = changes.cache_duration {
            active.cache_duration = Set(i64::try_from(cache_duration).unwrap_or(i64::MAX));
        }
        if let Some(is_active) = changes.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(now());

        let model = active
            .update(&self.db)
            .await
            .map_err(|e| map_write_err("更新数据源失败", e))?;
        model_to_data_source(model).ok_or_else(|| stored_config_invalid(id))
    }

    pub async fn delete_data_source(&self, id: i32) -> Result<()> {
        let db = &self.db;
        let result = retry::with_retry(
            &format!("delete_data_source({})", id),
            self.retry_config,
            || async { data_source::Entity::delete_by_id(id).exec(db).await },
        )
        .await
        .map_err(|e| RandomApiError::database_operation(format!("删除数据源失败: {}", e)))?;

        if result.rows_affected == 0 {
            return Err(RandomApiError::not_found(format!("data source {} not found", id)));
        }
        info!("Data source deleted: {}", id);
        Ok(())
    }

    /// 写入成功同步的时间
    ///
    /// 仅当行仍存在且 `updated_at == revision`（配置未被修改）时写入，返回是否写入。
    pub async fn record_sync(
        &self,
        id: i32,
        revision: DateTime<Utc>,
        synced_at: DateTime<Utc>,
    ) -> Result<bool> {
        let db = &self.db;
        let result = retry::with_retry(
            &format!("record_sync({})", id),
            self.retry_config,
            || async {
                data_source::Entity::update_many()
                    .col_expr(data_source::Column::LastSync, Expr::value(Some(synced_at)))
                    .filter(data_source::Column::Id.eq(id))
                    .filter(data_source::Column::UpdatedAt.eq(revision))
                    .exec(db)
                    .await
            },
        )
        .await
        .map_err(|e| RandomApiError::database_operation(format!("写入同步时间失败: {}", e)))?;

        Ok(result.rows_affected == 1)
    }

    // ============================================================
    // url replace rules
    // ============================================================

    pub async fn insert_rule(&self, rule: NewRule) -> Result<UrlReplaceRule> {
        let model = new_rule_to_active_model(&rule)
            .insert(&self.db)
            .await
            .map_err(|e| map_write_err("创建替换规则失败", e))?;
        info!("URL replace rule created: {}", model.id);
        Ok(model_to_rule(model))
    }

    pub async fn update_rule(&self, id: i32, changes: RuleChanges) -> Result<UrlReplaceRule> {
        let model = url_replace_rule::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| RandomApiError::not_found(format!("rule {} not found", id)))?;

        let mut active = model.into_active_model();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(endpoint_id) = changes.endpoint_id {
            active.endpoint_id = Set(endpoint_id);
        }
        if let Some(from_url) = changes.from_url {
            active.from_url = Set(from_url);
        }
        if let Some(to_url) = changes.to_url {
            active.to_url = Set(to_url);
        }
        if let Some(is_active) = changes.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(now());

        let model = active
            .update(&self.db)
            .await
            .map_err(|e| map_write_err("更新替换规则失败", e))?;
        Ok(model_to_rule(model))
    }

    pub async fn delete_rule(&self, id: i32) -> Result<()> {
        let result = url_replace_rule::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(|e| RandomApiError::database_operation(format!("删除替换规则失败: {}", e)))?;

        if result.rows_affected == 0 {
            return Err(RandomApiError::not_found(format!("rule {} not found", id)));
        }
        info!("URL replace rule deleted: {}", id);
        Ok(())
    }
}
