//! 解析后 URL 的字符串替换规则

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlReplaceRule {
    pub id: i32,
    pub name: String,
    /// None 为全局规则
    pub endpoint_id: Option<i32>,
    pub from_url: String,
    pub to_url: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UrlReplaceRule {
    /// 规则是否作用于该端点
    ///
    /// `endpoint_exists` 用于识别孤儿规则（绑定的端点已删除），孤儿规则视为停用。
    pub fn applies_to<F>(&self, endpoint_id: i32, endpoint_exists: F) -> bool
    where
        F: Fn(i32) -> bool,
    {
        if !self.is_active || self.from_url.is_empty() {
            return false;
        }
        match self.endpoint_id {
            None => true,
            Some(id) => id == endpoint_id && endpoint_exists(id),
        }
    }
}

/// 依次应用规则（调用方保证已按 id 升序过滤），每条规则替换全部出现
pub fn apply_rules<'a, I>(url: &str, rules: I) -> String
where
    I: IntoIterator<Item = &'a UrlReplaceRule>,
{
    rules.into_iter().fold(url.to_string(), |acc, rule| {
        if rule.from_url.is_empty() {
            acc
        } else {
            acc.replace(&rule.from_url, &rule.to_url)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: i32, endpoint_id: Option<i32>, from: &str, to: &str) -> UrlReplaceRule {
        let now = Utc::now();
        UrlReplaceRule {
            id,
            name: format!("rule-{}", id),
            endpoint_id,
            from_url: from.into(),
            to_url: to.into(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_pipeline_is_sequential() {
        let rules = [
            rule(1, None, "a.com", "b.com"),
            rule(2, Some(7), "b.com/x", "b.com/y"),
        ];
        assert_eq!(apply_rules("http://a.com/x", &rules), "http://b.com/y");
    }

    #[test]
    fn test_replaces_every_occurrence() {
        let rules = [rule(1, None, "http://", "https://")];
        assert_eq!(
            apply_rules("http://a/?next=http://b", &rules),
            "https://a/?next=https://b"
        );
    }

    #[test]
    fn test_applies_to() {
        let exists = |id: i32| id == 7;
        assert!(rule(1, None, "a", "b").applies_to(7, exists));
        assert!(rule(1, Some(7), "a", "b").applies_to(7, exists));
        assert!(!rule(1, Some(8), "a", "b").applies_to(7, exists));

        let mut inactive = rule(1, None, "a", "b");
        inactive.is_active = false;
        assert!(!inactive.applies_to(7, exists));
        assert!(!rule(1, None, "", "b").applies_to(7, exists));
    }

    #[test]
    fn test_orphaned_rule_never_matches() {
        let orphan = rule(3, Some(9), "a", "b");
        assert!(!orphan.applies_to(9, |_| false));
    }
}
