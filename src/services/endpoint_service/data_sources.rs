use tracing::info;

use super::{CreateDataSourceRequest, EndpointService, UpdateDataSourceRequest, raw_config};
use crate::errors::{RandomApiError, Result};
use crate::model::{DataSource, DataSourceConfig, SyncOutcome};
use crate::services::catalog::Catalog;
use crate::storage::{DataSourceChanges, NewDataSource};

fn clean_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(RandomApiError::validation("data source name cannot be empty"));
    }
    Ok(name.to_string())
}

/// 需要目录才能做的校验：被引用端点存在、不引用自身、不成环
fn check_references(
    catalog: &Catalog,
    owner: i32,
    config: &DataSourceConfig,
    replacing: Option<i32>,
) -> Result<()> {
    let references = config.referenced_endpoints();
    for id in references {
        if *id == owner {
            return Err(RandomApiError::validation(format!(
                "endpoint data source cannot reference its own endpoint {}",
                owner
            )));
        }
        if catalog.endpoint(*id).is_none() {
            return Err(RandomApiError::validation(format!(
                "referenced endpoint {} does not exist",
                id
            )));
        }
    }
    if references.is_empty() {
        return Ok(());
    }
    catalog.check_new_references(owner, references, replacing)
}

impl EndpointService {
    /// 端点下的数据源，按 id 升序
    pub fn list_data_sources(&self, endpoint_id: i32) -> Result<Vec<DataSource>> {
        let catalog = self.catalog.snapshot();
        if catalog.endpoint(endpoint_id).is_none() {
            return Err(RandomApiError::not_found(format!(
                "endpoint {} not found",
                endpoint_id
            )));
        }
        Ok(catalog
            .sources_of(endpoint_id)
            .map(|s| self.pools.with_last_sync(s))
            .collect())
    }

    pub fn get_data_source(&self, id: i32) -> Result<DataSource> {
        self.catalog
            .snapshot()
            .data_source(id)
            .map(|s| self.pools.with_last_sync(s))
            .ok_or_else(|| RandomApiError::not_found(format!("data source {} not found", id)))
    }

    pub async fn create_data_source(
        &self,
        endpoint_id: i32,
        req: CreateDataSourceRequest,
    ) -> Result<DataSource> {
        let guard = self.catalog.lock_writes().await;
        let catalog = self.catalog.snapshot();
        if catalog.endpoint(endpoint_id).is_none() {
            return Err(RandomApiError::not_found(format!(
                "endpoint {} not found",
                endpoint_id
            )));
        }

        let name = clean_name(&req.name)?;
        let config = DataSourceConfig::parse(req.source_type, &raw_config(&req.config))?;
        check_references(&catalog, endpoint_id, &config, None)?;

        let source = self
            .apply(self.storage.insert_data_source(NewDataSource {
                endpoint_id,
                name,
                config,
                cache_duration: req.cache_duration.unwrap_or(self.default_cache_duration),
                is_active: req.is_active,
            }))
            .await?;
        drop(guard);

        info!(
            "EndpointService: created {} data source {} on endpoint {}",
            source.source_type(),
            source.id,
            endpoint_id
        );
        self.maybe_preload(source.id);
        Ok(source)
    }

    /// 更新数据源；`last_sync` 保留，候选池在目录替换后丢弃
    pub async fn update_data_source(
        &self,
        id: i32,
        req: UpdateDataSourceRequest,
    ) -> Result<DataSource> {
        let guard = self.catalog.lock_writes().await;
        let catalog = self.catalog.snapshot();
        let existing = catalog
            .data_source(id)
            .ok_or_else(|| RandomApiError::not_found(format!("data source {} not found", id)))?;

        let name = req.name.as_deref().map(clean_name).transpose()?;
        let config = match (req.source_type, req.config.as_ref()) {
            (None, None) => None,
            (source_type, value) => {
                let source_type = source_type.unwrap_or_else(|| existing.source_type());
                let raw = match value {
                    Some(value) => raw_config(value),
                    None => existing.config.serialize(),
                };
                Some(DataSourceConfig::parse(source_type, &raw)?)
            }
        };
        if let Some(config) = &config {
            check_references(&catalog, existing.endpoint_id, config, Some(id))?;
        }

        let source = self
            .apply(self.storage.update_data_source(
                id,
                DataSourceChanges {
                    name,
                    config,
                    cache_duration: req.cache_duration,
                    is_active: req.is_active,
                },
            ))
            .await?;
        drop(guard);

        info!("EndpointService: updated data source {}", id);
        self.maybe_preload(id);
        Ok(source)
    }

    /// 启用/停用；与同步状态无关
    pub async fn set_data_source_active(&self, id: i32, is_active: bool) -> Result<DataSource> {
        self.update_data_source(
            id,
            UpdateDataSourceRequest {
                is_active: Some(is_active),
                ..Default::default()
            },
        )
        .await
    }

    /// 删除立即生效；进行中的同步结果会在提交时被丢弃
    pub async fn delete_data_source(&self, id: i32) -> Result<()> {
        let _guard = self.catalog.lock_writes().await;
        if self.catalog.snapshot().data_source(id).is_none() {
            return Err(RandomApiError::not_found(format!("data source {} not found", id)));
        }

        // 先替换目录，再移除池
        self.apply(self.storage.delete_data_source(id)).await?;
        self.pools.remove(id);
        info!("EndpointService: deleted data source {}", id);
        Ok(())
    }

    /// 立即同步；同一数据源已有同步进行中时返回 `SyncInFlight`
    pub async fn sync_data_source(&self, id: i32) -> Result<SyncOutcome> {
        self.sync.sync_now(id).await
    }
}
