use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::StaticConfig;
use crate::services::{AppServices, FetcherRegistry};
use crate::storage::StorageFactory;

pub struct StartupContext {
    pub services: AppServices,
    pub route_config: RouteConfig,
}

#[derive(Clone, Debug)]
pub struct RouteConfig {
    pub admin_prefix: String,
    pub health_prefix: String,
}

/// 准备服务器启动的上下文
/// 包括存储、目录快照、服务装配、预加载与统计刷盘任务
pub async fn prepare_server_startup(config: &StaticConfig) -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    let storage = StorageFactory::create()
        .await
        .context("Failed to create storage backend")?;
    info!(
        "Using storage backend: {}",
        storage.get_backend_config().storage_type
    );

    // 外部客户端（lankong / api / s3）由集成方注册，这里只有内置的 manual
    let fetchers = FetcherRegistry::new();
    let services = AppServices::build(storage, fetchers, config)
        .await
        .context("Failed to assemble services")?;

    let catalog = services.catalog.snapshot();
    info!(
        "Catalog loaded: {} endpoints, {} data sources, {} rules",
        catalog.endpoints().count(),
        catalog.data_sources().count(),
        catalog.rules().len()
    );

    let scan_interval = Duration::from_secs(config.sync.scan_interval_secs);
    match services.preloader.clone().start(scan_interval) {
        Some(_) => debug!(
            "Preloader started with {}s scan interval",
            config.sync.scan_interval_secs
        ),
        None => warn!("Periodic preloading disabled (sync.scan_interval_secs = 0)"),
    }

    let flush_interval = Duration::from_secs(config.stats.flush_interval_secs);
    if services.call_stats.clone().start(flush_interval).is_some() {
        debug!(
            "Call stats flush task started with {}s interval",
            config.stats.flush_interval_secs
        );
    }

    if config.rate_limit.is_active() {
        info!(
            "Redirect rate limit: {}/s per client, burst {}",
            config.rate_limit.per_second, config.rate_limit.burst
        );
    } else {
        warn!("Redirect rate limiting disabled");
    }

    let route_config = RouteConfig {
        admin_prefix: config.routes.admin_prefix.clone(),
        health_prefix: config.routes.health_prefix.clone(),
    };

    if config.admin.token.is_empty() {
        info!("Admin API is disabled (admin.token not set)");
    } else {
        info!("Admin API available at: {}", route_config.admin_prefix);
    }

    info!(
        "Pre-startup processing completed in {:?}",
        start_time.elapsed()
    );

    Ok(StartupContext {
        services,
        route_config,
    })
}
