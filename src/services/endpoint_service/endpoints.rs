use tracing::info;

use super::{CreateEndpointRequest, EndpointService, SortOrderUpdate, UpdateEndpointRequest};
use crate::errors::{RandomApiError, Result};
use crate::model::{Endpoint, normalize_endpoint_url, validate_reorder};
use crate::services::catalog::Catalog;
use crate::storage::{EndpointChanges, NewEndpoint};

fn clean_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(RandomApiError::validation("endpoint name cannot be empty"));
    }
    Ok(name.to_string())
}

impl EndpointService {
    /// 按展示顺序
    pub fn list_endpoints(&self) -> Vec<Endpoint> {
        self.catalog.snapshot().endpoints().cloned().collect()
    }

    pub fn get_endpoint(&self, id: i32) -> Result<Endpoint> {
        self.catalog
            .snapshot()
            .endpoint(id)
            .cloned()
            .ok_or_else(|| RandomApiError::not_found(format!("endpoint {} not found", id)))
    }

    fn check_url_free(&self, catalog: &Catalog, url: &str, owner: Option<i32>) -> Result<()> {
        match catalog.endpoint_by_url(url) {
            Some(existing) if Some(existing.id) != owner => Err(RandomApiError::validation(
                format!("endpoint url '{}' is already used by endpoint {}", url, existing.id),
            )),
            _ => Ok(()),
        }
    }

    pub async fn create_endpoint(&self, req: CreateEndpointRequest) -> Result<Endpoint> {
        let _guard = self.catalog.lock_writes().await;
        let catalog = self.catalog.snapshot();

        let name = clean_name(&req.name)?;
        let url = normalize_endpoint_url(&req.url, &self.reserved_segments)?;
        self.check_url_free(&catalog, &url, None)?;
        if let Some(position) = req.sort_order.filter(|p| *p < 0) {
            return Err(RandomApiError::validation(format!(
                "sort order must not be negative, got {}",
                position
            )));
        }

        // 指定的位置已被占用时，存储层在同一事务里把后面的端点顺延
        let endpoint = self
            .apply(self.storage.insert_endpoint(NewEndpoint {
                name,
                url,
                description: req.description.trim().to_string(),
                is_active: req.is_active,
                show_on_homepage: req.show_on_homepage,
                sort_order: req.sort_order,
            }))
            .await?;

        info!(
            "EndpointService: created endpoint {} '/{}'",
            endpoint.id, endpoint.url
        );
        Ok(endpoint)
    }

    pub async fn update_endpoint(&self, id: i32, req: UpdateEndpointRequest) -> Result<Endpoint> {
        let _guard = self.catalog.lock_writes().await;
        let catalog = self.catalog.snapshot();
        if catalog.endpoint(id).is_none() {
            return Err(RandomApiError::not_found(format!("endpoint {} not found", id)));
        }

        let name = req.name.as_deref().map(clean_name).transpose()?;
        let url = match req.url.as_deref() {
            Some(raw) => {
                let url = normalize_endpoint_url(raw, &self.reserved_segments)?;
                self.check_url_free(&catalog, &url, Some(id))?;
                Some(url)
            }
            None => None,
        };

        let endpoint = self
            .apply(self.storage.update_endpoint(
                id,
                EndpointChanges {
                    name,
                    url,
                    description: req.description.map(|d| d.trim().to_string()),
                    is_active: req.is_active,
                    show_on_homepage: req.show_on_homepage,
                },
            ))
            .await?;

        info!("EndpointService: updated endpoint {}", id);
        Ok(endpoint)
    }

    /// 删除端点及其数据源；绑定该端点的替换规则保留但停用（成为孤儿规则）
    pub async fn delete_endpoint(&self, id: i32) -> Result<()> {
        let _guard = self.catalog.lock_writes().await;
        if self.catalog.snapshot().endpoint(id).is_none() {
            return Err(RandomApiError::not_found(format!("endpoint {} not found", id)));
        }

        self.apply(self.storage.delete_endpoint(id)).await?;
        info!("EndpointService: deleted endpoint {}", id);
        Ok(())
    }

    /// 批量调整排序，整批在一个事务里提交
    pub async fn reorder_endpoints(&self, updates: &[SortOrderUpdate]) -> Result<Vec<Endpoint>> {
        let _guard = self.catalog.lock_writes().await;
        let catalog = self.catalog.snapshot();

        let pairs: Vec<(i32, i32)> = updates.iter().map(|u| (u.id, u.sort_order)).collect();
        let current: Vec<Endpoint> = catalog.endpoints().cloned().collect();
        validate_reorder(&current, &pairs)?;

        self.apply(self.storage.reorder_endpoints(&pairs)).await?;
        info!("EndpointService: reordered {} endpoints", pairs.len());
        Ok(self.list_endpoints())
    }
}
