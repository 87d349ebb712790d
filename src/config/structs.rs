use serde::{Deserialize, Serialize};

/// 静态配置（从 TOML 加载，启动时使用）
///
/// - server: 监听地址、端口、worker 数量
/// - database: 数据库连接与重试
/// - logging: 日志
/// - routes: 管理 / 健康检查路由前缀
/// - admin: 管理 API 鉴权
/// - sync: 数据源同步与预加载
/// - oauth: OAuth state 校验
/// - rate_limit: 随机重定向路由的按 IP 限流
/// - stats: 端点调用统计
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub routes: RoutesConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub oauth: OAuthConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub stats: StatsConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > config.toml > 默认值
    /// ENV 前缀：RA，分隔符：__
    /// 示例：RA__SERVER__PORT=9999
    pub fn load() -> Self {
        Self::load_from("config.toml")
    }

    pub fn load_from(path: &str) -> Self {
        use config::{Config, Environment, File};

        let builder = Config::builder()
            // 1. 从 TOML 文件加载（可选）
            .add_source(File::with_name(path).required(false))
            // 2. 从环境变量覆盖，前缀 RA，分隔符 __
            .add_source(
                Environment::with_prefix("RA")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        // logging 尚未初始化，只能写 stderr
        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<StaticConfig>() {
                Ok(config) => {
                    if std::path::Path::new(path).exists() {
                        eprintln!("[INFO] Configuration loaded from: {}", path);
                    }
                    config
                }
                Err(e) => {
                    eprintln!("[ERROR] Failed to deserialize config: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("[ERROR] Failed to build config: {}", e);
                Self::default()
            }
        }
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
}

/// 数据库连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_database_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_database_timeout")]
    pub timeout: u64,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

/// 路由前缀
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutesConfig {
    #[serde(default = "default_admin_prefix")]
    pub admin_prefix: String,
    #[serde(default = "default_health_prefix")]
    pub health_prefix: String,
}

impl RoutesConfig {
    /// 端点 url 不能占用的首段路径
    pub fn reserved_segments(&self) -> Vec<String> {
        [&self.admin_prefix, &self.health_prefix]
            .into_iter()
            .filter_map(|p| p.trim_matches('/').split('/').next())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_ascii_lowercase())
            .collect()
    }
}

/// 管理 API 配置；token 为空时管理 API 关闭
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AdminConfig {
    #[serde(default)]
    pub token: String,
}

/// 数据源同步配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// 请求路径上等待同步的最长时间
    #[serde(default = "default_resolve_timeout_ms")]
    pub resolve_timeout_ms: u64,
    /// 周期性预加载扫描间隔，0 表示关闭
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,
    #[serde(default = "default_preload_on_save")]
    pub preload_on_save: bool,
    #[serde(default = "default_cache_duration")]
    pub default_cache_duration: u64,
}

/// OAuth state 校验配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    #[serde(default = "default_state_ttl_secs")]
    pub state_ttl_secs: u64,
    /// 回调未携带 state 时是否直接拒绝（默认仅告警）
    #[serde(default)]
    pub require_provider_state: bool,
}

/// 重定向路由限流（令牌桶，按客户端 IP）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_rate_limit_enabled")]
    pub enabled: bool,
    /// 每秒补充的请求数
    #[serde(default = "default_rate_limit_per_second")]
    pub per_second: u64,
    #[serde(default = "default_rate_limit_burst")]
    pub burst: u32,
    /// 可信代理（单个 IP 或 CIDR）；来自这些地址的请求按 X-Forwarded-For 计
    #[serde(default)]
    pub trusted_proxies: Vec<String>,
}

impl RateLimitConfig {
    /// per_second 为 0 视同关闭
    pub fn is_active(&self) -> bool {
        self.enabled && self.per_second > 0
    }
}

/// 调用统计配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    /// 计数刷入数据库的间隔，0 表示只在关闭时写入
    #[serde(default = "default_stats_flush_interval_secs")]
    pub flush_interval_secs: u64,
}

// ============================================================
// Default value functions for static config
// ============================================================

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_database_url() -> String {
    "random-api.db".to_string()
}

fn default_database_pool_size() -> u32 {
    10
}

fn default_database_timeout() -> u64 {
    30
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    100
}

fn default_retry_max_delay_ms() -> u64 {
    2000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

fn default_admin_prefix() -> String {
    "/admin".to_string()
}

fn default_health_prefix() -> String {
    "/health".to_string()
}

fn default_resolve_timeout_ms() -> u64 {
    5000
}

fn default_scan_interval_secs() -> u64 {
    1800
}

fn default_preload_on_save() -> bool {
    true
}

fn default_cache_duration() -> u64 {
    3600
}

fn default_state_ttl_secs() -> u64 {
    600
}

fn default_rate_limit_enabled() -> bool {
    true
}

fn default_rate_limit_per_second() -> u64 {
    20
}

fn default_rate_limit_burst() -> u32 {
    40
}

fn default_stats_flush_interval_secs() -> u64 {
    3
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            cpu_count: default_cpu_count(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            pool_size: default_database_pool_size(),
            timeout: default_database_timeout(),
            retry_count: default_retry_count(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            admin_prefix: default_admin_prefix(),
            health_prefix: default_health_prefix(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            resolve_timeout_ms: default_resolve_timeout_ms(),
            scan_interval_secs: default_scan_interval_secs(),
            preload_on_save: default_preload_on_save(),
            default_cache_duration: default_cache_duration(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_rate_limit_enabled(),
            per_second: default_rate_limit_per_second(),
            burst: default_rate_limit_burst(),
            trusted_proxies: Vec::new(),
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            flush_interval_secs: default_stats_flush_interval_secs(),
        }
    }
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            state_ttl_secs: default_state_ttl_secs(),
            require_provider_state: false,
        }
    }
}
