use std::str::FromStr;

use sea_orm::ActiveValue::{NotSet, Set};
use tracing::warn;

use crate::model::{DataSource, DataSourceConfig, Endpoint, SourceType, UrlReplaceRule};
use crate::storage::models::{NewDataSource, NewEndpoint, NewRule};
use migration::entities::{api_endpoint, data_source, url_replace_rule};

pub fn model_to_endpoint(model: api_endpoint::Model) -> Endpoint {
    Endpoint {
        id: model.id,
        name: model.name,
        url: model.url,
        description: model.description,
        is_active: model.is_active,
        show_on_homepage: model.show_on_homepage,
        sort_order: model.sort_order,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

/// 行 -> DataSource；config 与 type 不符的行返回 None 并记录告警
pub fn model_to_data_source(model: data_source::Model) -> Option<DataSource> {
    let config = SourceType::from_str(&model.source_type)
        .and_then(|source_type| DataSourceConfig::parse(source_type, &model.config));

    match config {
        Ok(config) => Some(DataSource {
            id: model.id,
            endpoint_id: model.endpoint_id,
            name: model.name,
            config,
            cache_duration: model.cache_duration.max(0) as u64,
            is_active: model.is_active,
            last_sync: model.last_sync,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }),
        Err(e) => {
            warn!(
                "Skipping data source {} ({}): stored config is invalid: {}",
                model.id, model.source_type, e
            );
            None
        }
    }
}

pub fn model_to_rule(model: url_replace_rule::Model) -> UrlReplaceRule {
    UrlReplaceRule {
        id: model.id,
        name: model.name,
        endpoint_id: model.endpoint_id,
        from_url: model.from_url,
        to_url: model.to_url,
        is_active: model.is_active,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

pub fn new_endpoint_to_active_model(
    endpoint: &NewEndpoint,
    sort_order: i32,
) -> api_endpoint::ActiveModel {
    let now = crate::storage::models::now();
    api_endpoint::ActiveModel {
        id: NotSet,
        name: Set(endpoint.name.clone()),
        url: Set(endpoint.url.clone()),
        description: Set(endpoint.description.clone()),
        is_active: Set(endpoint.is_active),
        show_on_homepage: Set(endpoint.show_on_homepage),
        sort_order: Set(sort_order),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

pub fn new_data_source_to_active_model(source: &NewDataSource) -> data_source::ActiveModel {
    let now = crate::storage::models::now();
    data_source::ActiveModel {
        id: NotSet,
        endpoint_id: Set(source.endpoint_id),
        name: Set(source.name.clone()),
        source_type: Set(source.config.source_type().to_string()),
        config: Set(source.config.serialize()),
        cache_duration: Set(i64::try_from(source.cache_duration).unwrap_or(i64::MAX)),
        is_active: Set(source.is_active),
        last_sync: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

pub fn new_rule_to_active_model(rule: &NewRule) -> url_replace_rule::ActiveModel {
    let now = crate::storage::models::now();
    url_replace_rule::ActiveModel {
        id: NotSet,
        name: Set(rule.name.clone()),
        endpoint_id: Set(rule.endpoint_id),
        from_url: Set(rule.from_url.clone()),
        to_url: Set(rule.to_url.clone()),
        is_active: Set(rule.is_active),
        created_at: Set(now),
        updated_at: Set(now),
    }
}
