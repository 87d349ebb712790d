//! 端点：可路由的随机资源

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::errors::{RandomApiError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub id: i32,
    pub name: String,
    /// 唯一的路由路径段
    pub url: String,
    pub description: String,
    pub is_active: bool,
    pub show_on_homepage: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 端点 url 最大长度
const MAX_URL_LEN: usize = 255;

/// 规范化端点 url：去空白与首尾 `/`，校验字符集与保留前缀
///
/// 允许字母、数字、`-`、`_`、`.`，多级路径用 `/` 分隔。
pub fn normalize_endpoint_url(raw: &str, reserved: &[String]) -> Result<String> {
    let url = raw.trim().trim_matches('/');
    if url.is_empty() {
        return Err(RandomApiError::validation("endpoint url cannot be empty"));
    }
    if url.len() > MAX_URL_LEN {
        return Err(RandomApiError::validation(format!(
            "endpoint url exceeds {} characters",
            MAX_URL_LEN
        )));
    }

    for segment in url.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(RandomApiError::validation(format!(
                "endpoint url '{}' contains an empty or relative segment",
                url
            )));
        }
        if let Some(c) = segment
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(RandomApiError::validation(format!(
                "endpoint url '{}' contains invalid character '{}'",
                url, c
            )));
        }
    }

    let first = url.split('/').next().unwrap_or(url).to_ascii_lowercase();
    if reserved.iter().any(|r| *r == first) {
        return Err(RandomApiError::validation(format!(
            "endpoint url '{}' conflicts with reserved route '/{}'",
            url, first
        )));
    }

    Ok(url.to_string())
}

/// 校验一批排序更新
///
/// - 每个 id 必须存在，且在批次中只出现一次
/// - 应用后所有端点的位置互不相同
pub fn validate_reorder(current: &[Endpoint], updates: &[(i32, i32)]) -> Result<()> {
    if updates.is_empty() {
        return Err(RandomApiError::validation("sort order batch is empty"));
    }

    let mut positions: HashMap<i32, i32> = current.iter().map(|e| (e.id, e.sort_order)).collect();
    let mut seen = HashSet::with_capacity(updates.len());

    for &(id, sort_order) in updates {
        if !seen.insert(id) {
            return Err(RandomApiError::validation(format!(
                "endpoint {} appears more than once in sort order batch",
                id
            )));
        }
        match positions.get_mut(&id) {
            Some(position) => *position = sort_order,
            None => {
                return Err(RandomApiError::not_found(format!("endpoint {} not found", id)));
            }
        }
    }

    let mut taken = HashSet::with_capacity(positions.len());
    for (&id, &position) in &positions {
        if !taken.insert(position) {
            return Err(RandomApiError::validation(format!(
                "sort order {} is used by more than one endpoint (including {})",
                position, id
            )));
        }
    }
    Ok(())
}
