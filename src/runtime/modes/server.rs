//! Server mode
//!
//! This module contains the HTTP server startup logic.
//! It configures and starts the HTTP server with all necessary routes.

use actix_web::{
    App, HttpServer,
    middleware::{Compress, Condition, from_fn},
    web,
};
use anyhow::{Context, Result};
use tracing::warn;

use crate::api::middleware::{AuthMiddleware, redirect_rate_limiter};
use crate::api::services::{AppStartTime, admin_v1_routes, health_routes, redirect_routes};
use crate::runtime::lifetime;

/// Run the HTTP server
///
/// **Note**: Logging system must be initialized before calling this function
pub async fn run_server() -> Result<()> {
    let app_start_time = AppStartTime {
        start_datetime: chrono::Utc::now(),
    };

    let config = crate::config::get_config();

    let startup = lifetime::startup::prepare_server_startup(&config)
        .await
        .map_err(|e| {
            tracing::error!("Server startup failed: {}", e);
            e
        })?;

    let services = startup.services.clone();
    let admin_prefix = startup.route_config.admin_prefix.clone();
    let health_prefix = startup.route_config.health_prefix.clone();
    let admin_config = config.admin.clone();

    // 限流状态需在所有 worker 间共享，只能在闭包外构建一次
    let rate_limit_enabled = config.rate_limit.is_active();
    let rate_limiter =
        redirect_rate_limiter(&config.rate_limit).context("Failed to build redirect rate limiter")?;

    let cpu_count = config.server.cpu_count.clamp(1, 32);
    warn!("Using {} CPU cores for the server", cpu_count);

    let server_services = services.clone();
    let server = HttpServer::new(move || {
        App::new()
            .wrap(Compress::default())
            .app_data(web::Data::new(server_services.clone()))
            .app_data(web::Data::new(app_start_time.clone()))
            .app_data(web::Data::new(admin_config.clone()))
            .app_data(web::PayloadConfig::new(1024 * 1024))
            .service(
                web::scope(&admin_prefix)
                    .wrap(from_fn(AuthMiddleware::admin_auth))
                    .service(admin_v1_routes()),
            )
            .service(health_routes(&health_prefix))
            .service(
                redirect_routes().wrap(Condition::new(rate_limit_enabled, rate_limiter.clone())),
            )
    })
    .keep_alive(std::time::Duration::from_secs(30))
    .client_request_timeout(std::time::Duration::from_millis(5000))
    .client_disconnect_timeout(std::time::Duration::from_millis(1000))
    .workers(cpu_count);

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    warn!("Starting server at http://{}", bind_address);
    let server = server
        .bind(&bind_address)
        .with_context(|| format!("Failed to bind {}", bind_address))?
        .run();

    tokio::select! {
        res = server => {
            res?;
        }
        _ = lifetime::shutdown::listen_for_shutdown(&services) => {
            warn!("Graceful shutdown completed");
        }
    }

    Ok(())
}
