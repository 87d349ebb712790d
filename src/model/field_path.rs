//! 响应字段路径解析
//!
//! 从任意 JSON 响应中按声明式路径取出 URL 字符串。
//! 路径以 `.` 分段；对象按键查找，数组在段为非负整数时按下标查找。
//! `urls[0]` 与 `urls.0` 等价。

use serde_json::Value;

use crate::errors::{RandomApiError, Result};

/// 路径为空时使用的默认字段
pub const DEFAULT_URL_FIELD: &str = "url";

/// 把路径拆成段，`a.b[0][1]` -> `["a", "b", "0", "1"]`
///
/// 空路径（或仅空白）视为 `"url"`。
pub fn split_field_path(path: &str) -> Vec<&str> {
    let path = path.trim();
    let path = if path.is_empty() {
        DEFAULT_URL_FIELD
    } else {
        path
    };

    let mut segments = Vec::new();
    for part in path.split('.') {
        let mut rest = part;
        // 前缀键名（可能为空，例如 `[0]`）
        let key_end = rest.find('[').unwrap_or(rest.len());
        if key_end > 0 || !rest.starts_with('[') {
            segments.push(&rest[..key_end]);
        }
        rest = &rest[key_end..];

        while let Some(stripped) = rest.strip_prefix('[') {
            match stripped.find(']') {
                Some(close) => {
                    segments.push(&stripped[..close]);
                    rest = &stripped[close + 1..];
                }
                None => {
                    // 未闭合的括号按字面量处理，后续查找自然失败
                    segments.push(rest);
                    rest = "";
                }
            }
        }
        if !rest.is_empty() {
            segments.push(rest);
        }
    }
    segments
}

/// 按路径解析 JSON 值，最终值必须是字符串
///
/// - 任一段不存在：`PathNotFound`
/// - 最终值不是字符串：`TypeMismatch`
pub fn resolve_field_path<'a>(root: &'a Value, path: &str) -> Result<&'a str> {
    let mut current = root;
    let mut walked = String::new();

    for segment in split_field_path(path) {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };

        if !walked.is_empty() {
            walked.push('.');
        }
        walked.push_str(segment);

        current = next.ok_or_else(|| {
            RandomApiError::path_not_found(format!("field '{}' not found in response", walked))
        })?;
    }

    current.as_str().ok_or_else(|| {
        RandomApiError::type_mismatch(format!(
            "field '{}' is {}, expected string",
            walked,
            value_kind(current)
        ))
    })
}

/// 解析响应体并取出 URL
///
/// 响应体不是合法 JSON 时返回 `InvalidResponse`，不会进入路径解析。
pub fn extract_url(body: &str, path: &str) -> Result<String> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| RandomApiError::invalid_response(format!("response is not JSON: {}", e)))?;
    resolve_field_path(&value, path).map(str::to_string)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_object() {
        let v = json!({"data": {"url": "x"}});
        assert_eq!(resolve_field_path(&v, "data.url").unwrap(), "x");
    }

    #[test]
    fn test_array_index() {
        let v = json!({"urls": ["a", "b"]});
        assert_eq!(resolve_field_path(&v, "urls.1").unwrap(), "b");
        assert_eq!(resolve_field_path(&v, "urls[0]").unwrap(), "a");
    }

    #[test]
    fn test_empty_path_defaults_to_url() {
        let v = json!({"url": "x"});
        assert_eq!(resolve_field_path(&v, "").unwrap(), "x");
        assert_eq!(resolve_field_path(&v, "   ").unwrap(), "x");
    }

    #[test]
    fn test_missing_path() {
        let v = json!({});
        assert!(matches!(
            resolve_field_path(&v, "data.url"),
            Err(RandomApiError::PathNotFound(_))
        ));
    }

    #[test]
    fn test_non_string_value() {
        let v = json!({"url": 42});
        assert!(matches!(
            resolve_field_path(&v, "url"),
            Err(RandomApiError::TypeMismatch(_))
        ));
        let v = json!({"data": {"url": null}});
        assert!(matches!(
            resolve_field_path(&v, "data.url"),
            Err(RandomApiError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_index_out_of_range_and_bad_index() {
        let v = json!({"urls": ["a"]});
        assert!(matches!(
            resolve_field_path(&v, "urls.3"),
            Err(RandomApiError::PathNotFound(_))
        ));
        assert!(matches!(
            resolve_field_path(&v, "urls.first"),
            Err(RandomApiError::PathNotFound(_))
        ));
        assert!(matches!(
            resolve_field_path(&v, "urls.-1"),
            Err(RandomApiError::PathNotFound(_))
        ));
    }

    #[test]
    fn test_segment_on_scalar() {
        let v = json!({"url": "x"});
        assert!(matches!(
            resolve_field_path(&v, "url.host"),
            Err(RandomApiError::PathNotFound(_))
        ));
    }

    #[test]
    fn test_numeric_object_key() {
        // 对象上数字段仍按键查找
        let v = json!({"data": {"0": "zero"}});
        assert_eq!(resolve_field_path(&v, "data.0").unwrap(), "zero");
    }

    #[test]
    fn test_root_array() {
        let v = json!([{"url": "a"}, {"url": "b"}]);
        assert_eq!(resolve_field_path(&v, "[1].url").unwrap(), "b");
        assert_eq!(resolve_field_path(&v, "1.url").unwrap(), "b");
    }

    #[test]
    fn test_split_brackets() {
        assert_eq!(split_field_path("a.b[0][1]"), vec!["a", "b", "0", "1"]);
        assert_eq!(split_field_path("data.items[2].src"), vec!["data", "items", "2", "src"]);
        assert_eq!(split_field_path(""), vec!["url"]);
    }

    #[test]
    fn test_unclosed_bracket_does_not_panic() {
        let v = json!({"a": ["x"]});
        assert!(resolve_field_path(&v, "a[0").is_err());
        assert!(resolve_field_path(&v, "a]0[").is_err());
        assert!(resolve_field_path(&v, "..").is_err());
    }

    #[test]
    fn test_extract_url_invalid_json() {
        assert!(matches!(
            extract_url("<html>", "url"),
            Err(RandomApiError::InvalidResponse(_))
        ));
        assert_eq!(
            extract_url(r#"{"data":[{"link":"http://a"}]}"#, "data[0].link").unwrap(),
            "http://a"
        );
    }
}
