use std::time::Duration;
use tokio::signal;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::services::AppServices;

/// 等待进行中同步的最长时间（秒）
const SHUTDOWN_TIMEOUT_SECS: u64 = 10;

pub async fn listen_for_shutdown(services: &AppServices) {
    // 等待 Ctrl+C 信号
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received, waiting for in-flight syncs...");
        }
        Err(e) => {
            warn!(
                "Failed to listen for Ctrl+C: {}. Proceeding with shutdown anyway.",
                e
            );
        }
    }

    // 同步结果只写回内存池和 last_sync，丢弃也无妨，这里只是尽量等一等
    let drained = timeout(Duration::from_secs(SHUTDOWN_TIMEOUT_SECS), async {
        while services.sync.stats().in_flight > 0 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    })
    .await;

    match drained {
        Ok(()) => info!("All in-flight syncs finished"),
        Err(_) => warn!(
            "{} syncs still running after {}s, abandoning them",
            services.sync.stats().in_flight,
            SHUTDOWN_TIMEOUT_SECS
        ),
    }

    match services.call_stats.flush().await {
        Ok(0) => {}
        Ok(n) => info!("Flushed call stats for {} endpoints", n),
        Err(e) => warn!("Failed to flush call stats on shutdown: {}", e),
    }
}
