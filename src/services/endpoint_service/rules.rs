use tracing::info;

use super::{CreateRuleRequest, EndpointService, UpdateRuleRequest};
use crate::errors::{RandomApiError, Result};
use crate::model::UrlReplaceRule;
use crate::services::catalog::Catalog;
use crate::storage::{NewRule, RuleChanges};

fn check_scope(catalog: &Catalog, endpoint_id: Option<i32>) -> Result<()> {
    match endpoint_id {
        Some(id) if catalog.endpoint(id).is_none() => {
            Err(RandomApiError::not_found(format!("endpoint {} not found", id)))
        }
        _ => Ok(()),
    }
}

fn check_from_url(from_url: &str) -> Result<String> {
    let from_url = from_url.trim();
    if from_url.is_empty() {
        return Err(RandomApiError::validation("rule from_url cannot be empty"));
    }
    Ok(from_url.to_string())
}

impl EndpointService {
    /// 按 id 升序，即应用顺序
    pub fn list_rules(&self) -> Vec<UrlReplaceRule> {
        self.catalog.snapshot().rules().to_vec()
    }

    pub fn get_rule(&self, id: i32) -> Result<UrlReplaceRule> {
        self.catalog
            .snapshot()
            .rule(id)
            .cloned()
            .ok_or_else(|| RandomApiError::not_found(format!("rule {} not found", id)))
    }

    pub async fn create_rule(&self, req: CreateRuleRequest) -> Result<UrlReplaceRule> {
        let _guard = self.catalog.lock_writes().await;
        check_scope(&self.catalog.snapshot(), req.endpoint_id)?;
        let from_url = check_from_url(&req.from_url)?;

        let rule = self
            .apply(self.storage.insert_rule(NewRule {
                name: req.name.trim().to_string(),
                endpoint_id: req.endpoint_id,
                from_url,
                to_url: req.to_url.trim().to_string(),
                is_active: req.is_active,
            }))
            .await?;

        info!(
            "EndpointService: created rule {} ({})",
            rule.id,
            rule.endpoint_id
                .map_or_else(|| "global".to_string(), |id| format!("endpoint {}", id))
        );
        Ok(rule)
    }

    pub async fn update_rule(&self, id: i32, req: UpdateRuleRequest) -> Result<UrlReplaceRule> {
        let _guard = self.catalog.lock_writes().await;
        let catalog = self.catalog.snapshot();
        if catalog.rule(id).is_none() {
            return Err(RandomApiError::not_found(format!("rule {} not found", id)));
        }
        if let Some(endpoint_id) = req.endpoint_id {
            check_scope(&catalog, endpoint_id)?;
        }
        let from_url = req.from_url.as_deref().map(check_from_url).transpose()?;

        let rule = self
            .apply(self.storage.update_rule(
                id,
                RuleChanges {
                    name: req.name.map(|n| n.trim().to_string()),
                    endpoint_id: req.endpoint_id,
                    from_url,
                    to_url: req.to_url.map(|t| t.trim().to_string()),
                    is_active: req.is_active,
                },
            ))
            .await?;

        info!("EndpointService: updated rule {}", id);
        Ok(rule)
    }

    pub async fn delete_rule(&self, id: i32) -> Result<()> {
        let _guard = self.catalog.lock_writes().await;
        self.apply(self.storage.delete_rule(id)).await?;
        info!("EndpointService: deleted rule {}", id);
        Ok(())
    }
}
