//! Query operations for SeaOrmStorage
//!
//! This module contains all read-only database operations.

use sea_orm::{ColumnTrait, EntityTrait, QueryOrder, QuerySelect};
use tracing::debug;

use super::converters::{model_to_data_source, model_to_endpoint, model_to_rule};
use super::{SeaOrmStorage, retry};
use crate::errors::{RandomApiError, Result};
use crate::model::{DataSource, Endpoint, UrlReplaceRule};

use migration::entities::{api_endpoint, data_source, url_replace_rule};

impl SeaOrmStorage {
    /// 全部端点，按 sort_order、id 升序
    pub async fn load_endpoints(&self) -> Result<Vec<Endpoint>> {
        let db = &self.db;
        let models = retry::with_retry("load_endpoints", self.retry_config, || async {
            api_endpoint::Entity::find()
                .order_by_asc(api_endpoint::Column::SortOrder)
                .order_by_asc(api_endpoint::Column::Id)
                .all(db)
                .await
        })
        .await
        .map_err(|e| RandomApiError::database_operation(format!("加载端点失败: {}", e)))?;

        Ok(models.into_iter().map(model_to_endpoint).collect())
    }

    /// 全部数据源；config 无法解析的行被跳过
    pub async fn load_data_sources(&self) -> Result<Vec<DataSource>> {
        let db = &self.db;
        let models = retry::with_retry("load_data_sources", self.retry_config, || async {
            data_source::Entity::find()
                .order_by_asc(data_source::Column::Id)
                .all(db)
                .await
        })
        .await
        .map_err(|e| RandomApiError::database_operation(format!("加载数据源失败: {}", e)))?;

        let total = models.len();
        let sources: Vec<DataSource> = models.into_iter().filter_map(model_to_data_source).collect();
        if sources.len() != total {
            debug!(
                "Loaded {} data sources ({} skipped)",
                sources.len(),
                total - sources.len()
            );
        }
        Ok(sources)
    }

    /// 全部替换规则，按 id 升序
    pub async fn load_rules(&self) -> Result<Vec<UrlReplaceRule>> {
        let db = &self.db;
        let models = retry::with_retry("load_rules", self.retry_config, || async {
            url_replace_rule::Entity::find()
                .order_by_asc(url_replace_rule::Column::Id)
                .all(db)
                .await
        })
        .await
        .map_err(|e| RandomApiError::database_operation(format!("加载替换规则失败: {}", e)))?;

        Ok(models.into_iter().map(model_to_rule).collect())
    }

    pub async fn get_endpoint(&self, id: i32) -> Result<Option<Endpoint>> {
        let model = api_endpoint::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| RandomApiError::database_operation(format!("查询端点失败: {}", e)))?;
        Ok(model.map(model_to_endpoint))
    }

    pub async fn get_data_source(&self, id: i32) -> Result<Option<DataSource>> {
        let model = data_source::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| RandomApiError::database_operation(format!("查询数据源失败: {}", e)))?;
        Ok(model.and_then(model_to_data_source))
    }

    pub async fn get_rule(&self, id: i32) -> Result<Option<UrlReplaceRule>> {
        let model = url_replace_rule::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| RandomApiError::database_operation(format!("查询替换规则失败: {}", e)))?;
        Ok(model.map(model_to_rule))
    }

    /// 当前最大 sort_order，无端点时为 None
    pub async fn max_sort_order(&self) -> Result<Option<i32>> {
        let max: Option<Option<i32>> = api_endpoint::Entity::find()
            .select_only()
            .column_as(api_endpoint::Column::SortOrder.max(), "max_sort")
            .into_tuple()
            .one(&self.db)
            .await
            .map_err(|e| RandomApiError::database_operation(format!("查询排序失败: {}", e)))?;
        Ok(max.flatten())
    }
}
