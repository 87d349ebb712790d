//! 数据源配置
//!
//! 每种数据源类型对应一个配置结构，`DataSourceConfig` 是按 `type` 区分的封闭枚举。
//! 存储与传输时 config 是 JSON 字符串，结构由 `type` 决定：
//!
//! | type | 结构 |
//! |---|---|
//! | manual | [`ManualConfig`] |
//! | lankong | [`LankongConfig`] |
//! | api_get / api_post | [`ApiConfig`] |
//! | endpoint | [`EndpointConfig`] |
//! | s3 | [`S3Config`] |
//!
//! 解析时缺省的可选字段取默认值，未知字段与类型不符一律拒绝；
//! 所有 URL / header 值在存储前去掉首尾空白。

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use strum::{AsRefStr, EnumIter};

use crate::errors::{RandomApiError, Result};
use crate::model::field_path::{self, DEFAULT_URL_FIELD};

/// 兰空图床默认 API 地址
pub const DEFAULT_LANKONG_BASE_URL: &str = "https://img.czl.net/api/v1/images";

/// S3 默认地区
pub const DEFAULT_S3_REGION: &str = "us-east-1";

/// 数据源类型
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SourceType {
    Manual,
    Lankong,
    ApiGet,
    ApiPost,
    Endpoint,
    S3,
}

impl SourceType {
    /// 是否需要外部 I/O 才能获取候选池
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Lankong | Self::ApiGet | Self::ApiPost | Self::S3
        )
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl FromStr for SourceType {
    type Err = RandomApiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "manual" => Ok(Self::Manual),
            "lankong" => Ok(Self::Lankong),
            "api_get" => Ok(Self::ApiGet),
            "api_post" => Ok(Self::ApiPost),
            "endpoint" => Ok(Self::Endpoint),
            "s3" => Ok(Self::S3),
            _ => Err(RandomApiError::validation(format!(
                "Invalid data source type: '{}'. Valid: manual, lankong, api_get, api_post, endpoint, s3",
                s
            ))),
        }
    }
}

/// 单个配置变体的解析 / 序列化契约
///
/// `parse(serialize_config(c)) == c` 对所有经 `parse` 得到的配置成立。
pub trait SourceConfig: Sized + Serialize + DeserializeOwned {
    /// 规范化并校验
    fn normalize(self) -> Result<Self>;

    fn parse(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|e| RandomApiError::validation(format!("invalid config: {}", e)))?;
        config.normalize()
    }

    fn serialize_config(&self) -> String {
        // 仅包含字符串、数字与集合，序列化不会失败
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

fn trim_owned(s: String) -> String {
    let trimmed = s.trim();
    if trimmed.len() == s.len() {
        s
    } else {
        trimmed.to_string()
    }
}

fn trim_optional(s: Option<String>) -> Option<String> {
    s.map(trim_owned).filter(|s| !s.is_empty())
}

fn require(value: &str, field: &str) -> Result<()> {
    if value.is_empty() {
        return Err(RandomApiError::validation(format!("{} is required", field)));
    }
    Ok(())
}

fn require_http_url(value: &str, field: &str) -> Result<()> {
    require(value, field)?;
    let parsed = url::Url::parse(value)
        .map_err(|e| RandomApiError::validation(format!("{} is not a valid URL: {}", field, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(RandomApiError::validation(format!(
            "{} must use http or https, got '{}'",
            field, other
        ))),
    }
}

// ============================================================
// manual
// ============================================================

/// 手动维护的 URL 列表
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManualConfig {
    #[serde(default)]
    pub urls: Vec<String>,
}

impl ManualConfig {
    /// 多行文本 -> 列表：逐行去空白，丢弃空行与 `#` 注释行
    pub fn from_text(text: &str) -> Self {
        Self {
            urls: text
                .split('\n')
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string)
                .collect(),
        }
    }

    /// 列表 -> 多行文本
    pub fn to_text(&self) -> String {
        self.urls.join("\n")
    }
}

impl SourceConfig for ManualConfig {
    fn normalize(self) -> Result<Self> {
        Ok(Self {
            urls: self
                .urls
                .into_iter()
                .map(trim_owned)
                .filter(|url| !url.is_empty() && !url.starts_with('#'))
                .collect(),
        })
    }

    /// 兼容旧数据：非 JSON 的纯文本按行解析
    fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        if trimmed.starts_with('{') {
            let config: Self = serde_json::from_str(trimmed)
                .map_err(|e| RandomApiError::validation(format!("invalid manual config: {}", e)))?;
            return config.normalize();
        }
        if trimmed.starts_with('[') {
            let urls: Vec<String> = serde_json::from_str(trimmed)
                .map_err(|e| RandomApiError::validation(format!("invalid manual config: {}", e)))?;
            return Self { urls }.normalize();
        }
        Ok(Self::from_text(raw))
    }
}

// ============================================================
// lankong
// ============================================================

/// 兰空图床相册
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LankongConfig {
    pub api_token: String,
    pub album_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// 兰空单页列表结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LankongPage {
    pub urls: Vec<String>,
    pub last_page: u32,
}

#[derive(Deserialize)]
struct LankongResponse {
    status: bool,
    #[serde(default)]
    message: String,
    data: Option<LankongPageData>,
}

#[derive(Deserialize)]
struct LankongPageData {
    #[serde(default)]
    last_page: u32,
    #[serde(default)]
    data: Vec<LankongImage>,
}

#[derive(Deserialize)]
struct LankongImage {
    links: LankongLinks,
}

#[derive(Deserialize)]
struct LankongLinks {
    #[serde(default)]
    url: String,
}

impl LankongConfig {
    pub fn effective_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or(DEFAULT_LANKONG_BASE_URL)
            .trim_end_matches('/')
    }

    /// 相册分页地址，页码从 1 开始
    pub fn page_url(&self, album_id: &str, page: u32) -> String {
        format!(
            "{}?album_id={}&page={}",
            self.effective_base_url(),
            urlencoding::encode(album_id),
            page
        )
    }

    pub fn auth_header(&self) -> (String, String) {
        (
            "Authorization".to_string(),
            format!("Bearer {}", self.api_token),
        )
    }

    /// 解析单页响应
    pub fn parse_page(body: &str) -> Result<LankongPage> {
        let response: LankongResponse = serde_json::from_str(body).map_err(|e| {
            RandomApiError::invalid_response(format!("failed to parse lankong response: {}", e))
        })?;
        if !response.status {
            return Err(RandomApiError::fetch_failed(format!(
                "lankong API error: {}",
                response.message
            )));
        }
        let data = response.data.ok_or_else(|| {
            RandomApiError::invalid_response("lankong response has no data".to_string())
        })?;
        Ok(LankongPage {
            urls: data
                .data
                .into_iter()
                .map(|image| image.links.url)
                .filter(|url| !url.is_empty())
                .collect(),
            last_page: data.last_page,
        })
    }
}

impl SourceConfig for LankongConfig {
    fn normalize(self) -> Result<Self> {
        let config = Self {
            api_token: trim_owned(self.api_token),
            album_ids: self
                .album_ids
                .into_iter()
                .map(trim_owned)
                .filter(|id| !id.is_empty())
                .collect(),
            base_url: trim_optional(self.base_url),
        };
        require(&config.api_token, "api_token")?;
        if config.album_ids.is_empty() {
            return Err(RandomApiError::validation(
                "album_ids must contain at least one album",
            ));
        }
        if let Some(base_url) = &config.base_url {
            require_http_url(base_url, "base_url")?;
        }
        Ok(config)
    }
}

// ============================================================
// api_get / api_post
// ============================================================

/// REST 请求方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, AsRefStr)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum ApiMethod {
    Get,
    Post,
}

impl<'de> Deserialize<'de> for ApiMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            other => Err(de::Error::custom(format!(
                "Invalid method '{}'. Valid: GET, POST",
                other
            ))),
        }
    }
}

/// 通用 REST 接口
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiConfig {
    pub url: String,
    pub method: ApiMethod,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub url_field: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawApiConfig {
    url: String,
    #[serde(default)]
    method: Option<ApiMethod>,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    url_field: Option<String>,
}

impl<'de> Deserialize<'de> for ApiConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = RawApiConfig::deserialize(deserializer)?;
        Ok(ApiConfig::from_raw(raw, ApiMethod::Get))
    }
}

/// 一次 REST 调用的完整描述，交给外部 HTTP 客户端执行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: ApiMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl ApiConfig {
    fn from_raw(raw: RawApiConfig, default_method: ApiMethod) -> Self {
        Self {
            url: raw.url,
            method: raw.method.unwrap_or(default_method),
            headers: raw.headers,
            body: raw.body,
            url_field: raw.url_field.unwrap_or_default(),
        }
    }

    /// 按数据源类型解析，`method` 缺省时取类型对应的方法
    pub fn parse_for(method: ApiMethod, raw: &str) -> Result<Self> {
        let parsed: RawApiConfig = serde_json::from_str(raw)
            .map_err(|e| RandomApiError::validation(format!("invalid api config: {}", e)))?;
        let config = Self::from_raw(parsed, method).normalize()?;
        if config.method != method {
            return Err(RandomApiError::validation(format!(
                "method {} does not match data source type (expected {})",
                config.method.as_ref(),
                method.as_ref()
            )));
        }
        Ok(config)
    }

    pub fn request_plan(&self) -> ApiRequest {
        let mut headers: Vec<(String, String)> = Vec::with_capacity(self.headers.len() + 1);
        let has_content_type = self
            .headers
            .keys()
            .any(|k| k.eq_ignore_ascii_case("content-type"));
        if self.body.is_some() && !has_content_type {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }
        headers.extend(self.headers.iter().map(|(k, v)| (k.clone(), v.clone())));

        ApiRequest {
            method: self.method,
            url: self.url.clone(),
            headers,
            body: self.body.clone(),
        }
    }

    /// 按 `url_field` 从响应体取出 URL
    pub fn extract(&self, body: &str) -> Result<String> {
        field_path::extract_url(body, &self.url_field)
    }
}

impl SourceConfig for ApiConfig {
    fn normalize(self) -> Result<Self> {
        let url_field = trim_owned(self.url_field);
        let config = Self {
            url: trim_owned(self.url),
            method: self.method,
            headers: self
                .headers
                .into_iter()
                .map(|(k, v)| (trim_owned(k), trim_owned(v)))
                .filter(|(k, _)| !k.is_empty())
                .collect(),
            body: self.body.filter(|b| !b.trim().is_empty()),
            url_field: if url_field.is_empty() {
                DEFAULT_URL_FIELD.to_string()
            } else {
                url_field
            },
        };
        require_http_url(&config.url, "url")?;
        if config.method == ApiMethod::Get && config.body.is_some() {
            return Err(RandomApiError::validation("GET requests cannot carry a body"));
        }
        Ok(config)
    }
}

// ============================================================
// endpoint
// ============================================================

/// 引用其他端点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointConfig {
    pub endpoint_ids: Vec<i32>,
}

impl SourceConfig for EndpointConfig {
    fn normalize(self) -> Result<Self> {
        let mut endpoint_ids = Vec::with_capacity(self.endpoint_ids.len());
        for id in self.endpoint_ids {
            if id <= 0 {
                return Err(RandomApiError::validation(format!(
                    "invalid endpoint id {}",
                    id
                )));
            }
            if !endpoint_ids.contains(&id) {
                endpoint_ids.push(id);
            }
        }
        if endpoint_ids.is_empty() {
            return Err(RandomApiError::validation(
                "endpoint_ids must reference at least one endpoint",
            ));
        }
        Ok(Self { endpoint_ids })
    }
}

// ============================================================
// s3
// ============================================================

/// ListObjects API 版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListObjectsVersion {
    V1,
    #[default]
    V2,
}

impl Serialize for ListObjectsVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(match self {
            Self::V1 => "v1",
            Self::V2 => "v2",
        })
    }
}

impl<'de> Deserialize<'de> for ListObjectsVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "v2" => Ok(Self::V2),
            "v1" => Ok(Self::V1),
            other => Err(de::Error::custom(format!(
                "Invalid list_objects_version '{}'. Valid: v1, v2",
                other
            ))),
        }
    }
}

/// S3 兼容对象存储
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct S3Config {
    pub endpoint: String,
    pub bucket_name: String,
    #[serde(default = "default_s3_region")]
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    #[serde(default)]
    pub list_objects_version: ListObjectsVersion,
    #[serde(default)]
    pub use_path_style: bool,
    #[serde(default)]
    pub remove_bucket: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_path: Option<String>,
    #[serde(default)]
    pub include_subfolders: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_extensions: Vec<String>,
}

fn default_s3_region() -> String {
    DEFAULT_S3_REGION.to_string()
}

impl S3Config {
    /// 列举前缀：去掉开头的 `/`，补齐结尾的 `/`
    pub fn listing_prefix(&self) -> Option<String> {
        let folder = self.folder_path.as_deref()?.trim_start_matches('/');
        if folder.is_empty() {
            return None;
        }
        if folder.ends_with('/') {
            Some(folder.to_string())
        } else {
            Some(format!("{}/", folder))
        }
    }

    /// 不包含子文件夹时按 `/` 分隔
    pub fn delimiter(&self) -> Option<&'static str> {
        if self.include_subfolders {
            None
        } else {
            Some("/")
        }
    }

    /// 对象是否进入候选池：跳过"文件夹"，按扩展名（不区分大小写）过滤
    pub fn accepts_key(&self, key: &str) -> bool {
        if key.is_empty() || key.ends_with('/') {
            return false;
        }
        if self.file_extensions.is_empty() {
            return true;
        }
        let key = key.to_ascii_lowercase();
        self.file_extensions.iter().any(|ext| {
            let ext = ext.to_ascii_lowercase();
            if ext.starts_with('.') {
                key.ends_with(&ext)
            } else {
                key.ends_with(&format!(".{}", ext))
            }
        })
    }

    /// 生成对象的公开访问地址
    pub fn object_url(&self, key: &str) -> String {
        if let Some(domain) = &self.custom_domain {
            let base = domain.trim_end_matches('/');
            let bucket_prefix = format!("{}/", self.bucket_name);
            let path = if self.remove_bucket {
                key.strip_prefix(&bucket_prefix).unwrap_or(key)
            } else {
                key
            };
            let path = encode_key_path(path);
            if path.starts_with('/') {
                return format!("{}{}", base, path);
            }
            return format!("{}/{}", base, path);
        }

        let encoded = encode_key_path(key);
        let endpoint = self.endpoint.trim_end_matches('/');
        if self.use_path_style {
            return format!("{}/{}/{}", endpoint, self.bucket_name, encoded);
        }

        let (scheme, host) = match endpoint.split_once("://") {
            Some((scheme, host)) if !scheme.is_empty() => (scheme, host),
            _ => ("https", endpoint),
        };
        if host.is_empty() {
            return format!("{}/{}/{}", endpoint, self.bucket_name, encoded);
        }
        format!("{}://{}.{}/{}", scheme, self.bucket_name, host, encoded)
    }
}

/// 按段编码对象 key，保留 `/`
fn encode_key_path(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

impl SourceConfig for S3Config {
    fn normalize(self) -> Result<Self> {
        let region = trim_owned(self.region);
        let config = Self {
            endpoint: trim_owned(self.endpoint),
            bucket_name: trim_owned(self.bucket_name),
            region: if region.is_empty() {
                default_s3_region()
            } else {
                region
            },
            access_key_id: trim_owned(self.access_key_id),
            secret_access_key: trim_owned(self.secret_access_key),
            list_objects_version: self.list_objects_version,
            use_path_style: self.use_path_style,
            remove_bucket: self.remove_bucket,
            custom_domain: trim_optional(self.custom_domain),
            folder_path: trim_optional(self.folder_path),
            include_subfolders: self.include_subfolders,
            file_extensions: self
                .file_extensions
                .into_iter()
                .map(trim_owned)
                .filter(|ext| !ext.is_empty() && ext != ".")
                .collect(),
        };
        require(&config.endpoint, "endpoint")?;
        require(&config.bucket_name, "bucket_name")?;
        require(&config.access_key_id, "access_key_id")?;
        require(&config.secret_access_key, "secret_access_key")?;
        if let Some(domain) = &config.custom_domain {
            require_http_url(domain, "custom_domain")?;
        }
        Ok(config)
    }
}

// ============================================================
// DataSourceConfig
// ============================================================

/// 按类型区分的数据源配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSourceConfig {
    Manual(ManualConfig),
    Lankong(LankongConfig),
    ApiGet(ApiConfig),
    ApiPost(ApiConfig),
    Endpoint(EndpointConfig),
    S3(S3Config),
}

impl DataSourceConfig {
    /// 按 `type` 解析 config JSON，类型与结构不符时返回校验错误
    pub fn parse(source_type: SourceType, raw: &str) -> Result<Self> {
        let config = match source_type {
            SourceType::Manual => Self::Manual(ManualConfig::parse(raw)?),
            SourceType::Lankong => Self::Lankong(LankongConfig::parse(raw)?),
            SourceType::ApiGet => Self::ApiGet(ApiConfig::parse_for(ApiMethod::Get, raw)?),
            SourceType::ApiPost => Self::ApiPost(ApiConfig::parse_for(ApiMethod::Post, raw)?),
            SourceType::Endpoint => Self::Endpoint(EndpointConfig::parse(raw)?),
            SourceType::S3 => Self::S3(S3Config::parse(raw)?),
        };
        Ok(config)
    }

    pub fn serialize(&self) -> String {
        match self {
            Self::Manual(c) => c.serialize_config(),
            Self::Lankong(c) => c.serialize_config(),
            Self::ApiGet(c) | Self::ApiPost(c) => c.serialize_config(),
            Self::Endpoint(c) => c.serialize_config(),
            Self::S3(c) => c.serialize_config(),
        }
    }

    pub fn source_type(&self) -> SourceType {
        match self {
            Self::Manual(_) => SourceType::Manual,
            Self::Lankong(_) => SourceType::Lankong,
            Self::ApiGet(_) => SourceType::ApiGet,
            Self::ApiPost(_) => SourceType::ApiPost,
            Self::Endpoint(_) => SourceType::Endpoint,
            Self::S3(_) => SourceType::S3,
        }
    }

    /// endpoint 类型引用的端点 id，其余类型为空
    pub fn referenced_endpoints(&self) -> &[i32] {
        match self {
            Self::Endpoint(c) => &c.endpoint_ids,
            _ => &[],
        }
    }

    /// 序列化为 JSON 值，供 API 输出
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::from_str(&self.serialize()).unwrap_or(serde_json::Value::Null)
    }
}
