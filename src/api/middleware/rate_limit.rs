//! 重定向路由的按客户端 IP 限流

use std::net::IpAddr;
use std::sync::Arc;

use actix_governor::{Governor, GovernorConfigBuilder, KeyExtractor, SimpleKeyExtractionError};
use actix_web::dev::ServiceRequest;
use governor::middleware::NoOpMiddleware;
use tracing::{debug, trace};

use crate::config::RateLimitConfig;
use crate::errors::{RandomApiError, Result};

/// 拿不到连接地址时（如单测里的请求）共用的 key
const UNKNOWN_CLIENT: &str = "unknown";

/// 按客户端 IP 提取限流 key
///
/// - 默认使用连接 IP（peer_addr），无法伪造
/// - 连接来自可信代理时改用 X-Forwarded-For / Forwarded 中的地址
#[derive(Clone)]
pub struct ClientIpKeyExtractor {
    trusted_proxies: Arc<[String]>,
}

impl ClientIpKeyExtractor {
    pub fn new(trusted_proxies: &[String]) -> Self {
        Self {
            trusted_proxies: trusted_proxies.into(),
        }
    }

    fn key_for(&self, peer_ip: Option<&str>, forwarded: Option<&str>) -> String {
        let Some(peer_ip) = peer_ip else {
            return forwarded.unwrap_or(UNKNOWN_CLIENT).to_string();
        };
        if is_trusted_proxy(peer_ip, &self.trusted_proxies) {
            let real_ip = forwarded.unwrap_or(peer_ip);
            trace!("Rate limit key from trusted proxy {}: {}", peer_ip, real_ip);
            real_ip.to_string()
        } else {
            peer_ip.to_string()
        }
    }
}

impl KeyExtractor for ClientIpKeyExtractor {
    type Key = String;
    type KeyExtractionError = SimpleKeyExtractionError<&'static str>;

    fn extract(&self, req: &ServiceRequest) -> std::result::Result<Self::Key, Self::KeyExtractionError> {
        let conn_info = req.connection_info();
        Ok(self.key_for(conn_info.peer_addr(), conn_info.realip_remote_addr()))
    }
}

/// 检查 IP 是否在可信代理列表中（单 IP 或 CIDR）
fn is_trusted_proxy(ip: &str, trusted_proxies: &[String]) -> bool {
    if trusted_proxies.is_empty() {
        return false;
    }
    let Ok(ip_addr) = ip.parse::<IpAddr>() else {
        return false;
    };

    trusted_proxies.iter().any(|proxy| {
        if proxy.contains('/') {
            ip_in_cidr(&ip_addr, proxy)
        } else {
            proxy.parse::<IpAddr>().is_ok_and(|addr| addr == ip_addr)
        }
    })
}

fn ip_in_cidr(ip: &IpAddr, cidr: &str) -> bool {
    let Some((network, prefix_len)) = cidr.split_once('/') else {
        return false;
    };
    let Ok(prefix_len) = prefix_len.parse::<u32>() else {
        return false;
    };
    let Ok(network_addr) = network.parse::<IpAddr>() else {
        return false;
    };

    match (ip, network_addr) {
        (IpAddr::V4(ip), IpAddr::V4(net)) if prefix_len <= 32 => {
            let mask = u32::MAX.checked_shl(32 - prefix_len).unwrap_or(0);
            (u32::from(*ip) & mask) == (u32::from(net) & mask)
        }
        (IpAddr::V6(ip), IpAddr::V6(net)) if prefix_len <= 128 => {
            let mask = u128::MAX.checked_shl(128 - prefix_len).unwrap_or(0);
            (u128::from(*ip) & mask) == (u128::from(net) & mask)
        }
        _ => false,
    }
}

/// 创建重定向限流器
///
/// 令牌按 `per_second` 补充，桶容量为 `burst`；超限返回 429 Too Many Requests。
/// 是否挂载由调用方根据 [`RateLimitConfig::is_active`] 决定。
pub fn redirect_rate_limiter(
    config: &RateLimitConfig,
) -> Result<Governor<ClientIpKeyExtractor, NoOpMiddleware>> {
    // 每秒超过 1000 次时按 1ms 一个令牌
    let interval_ms = (1000 / config.per_second.max(1)).max(1);
    let burst = config.burst.max(1);

    let governor_config = GovernorConfigBuilder::default()
        .milliseconds_per_request(interval_ms)
        .burst_size(burst)
        .key_extractor(ClientIpKeyExtractor::new(&config.trusted_proxies))
        .finish()
        .ok_or_else(|| {
            RandomApiError::validation(format!(
                "invalid rate limit: per_second={}, burst={}",
                config.per_second, config.burst
            ))
        })?;

    debug!(
        "Redirect rate limiter created: one token per {}ms, burst {}",
        interval_ms, burst
    );
    Ok(Governor::new(&governor_config))
}
