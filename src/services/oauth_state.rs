//! OAuth 登录的 state 校验
//!
//! 每个会话一个有过期时间的 state：签发 → 回调校验 → 清除。
//! 登录流程本身（跳转、换 token、会话存储）由外部负责。

use std::time::{Duration, Instant};

use moka::future::Cache;
use subtle::ConstantTimeEq;
use tracing::{trace, warn};

use crate::config::OAuthConfig;
use crate::errors::{RandomApiError, Result};

/// 最多同时保留的未完成登录数
const MAX_PENDING_STATES: u64 = 10_000;

/// 校验结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateCheck {
    Verified,
    /// 回调未携带 state，按配置放行
    MissingFromProvider,
}

/// 已签发的 state；到期判断以签发时间为准，不依赖缓存的淘汰时机
#[derive(Debug, Clone)]
struct PendingState {
    state: String,
    issued_at: Instant,
}

pub struct OAuthStateStore {
    states: Cache<String, PendingState>,
    ttl: Duration,
    require_provider_state: bool,
}

impl OAuthStateStore {
    pub fn new(ttl: Duration, require_provider_state: bool) -> Self {
        let states = Cache::builder()
            .max_capacity(MAX_PENDING_STATES)
            .time_to_live(ttl)
            .build();
        trace!(
            "OAuthStateStore initialized: ttl={:?}, require_provider_state={}",
            ttl, require_provider_state
        );
        Self {
            states,
            ttl,
            require_provider_state,
        }
    }

    pub fn from_config(config: &OAuthConfig) -> Self {
        Self::new(
            Duration::from_secs(config.state_ttl_secs),
            config.require_provider_state,
        )
    }

    /// 为会话签发新 state，覆盖该会话之前未使用的 state
    pub async fn issue(&self, session_id: &str) -> String {
        let state = uuid::Uuid::new_v4().simple().to_string();
        self.states
            .insert(
                session_id.to_string(),
                PendingState {
                    state: state.clone(),
                    issued_at: Instant::now(),
                },
            )
            .await;
        state
    }

    /// 校验回调中的 state；无论成功与否，已签发的 state 都被消费
    pub async fn verify(&self, session_id: &str, returned: Option<&str>) -> Result<StateCheck> {
        let Some(pending) = self.states.remove(session_id).await else {
            return Err(RandomApiError::oauth_state(
                "no pending OAuth state for this session (expired or never issued)",
            ));
        };
        if pending.issued_at.elapsed() >= self.ttl {
            return Err(RandomApiError::oauth_state("OAuth state expired"));
        }
        let expected = pending.state;

        match returned.filter(|s| !s.is_empty()) {
            Some(returned) => {
                if bool::from(returned.as_bytes().ct_eq(expected.as_bytes())) {
                    Ok(StateCheck::Verified)
                } else {
                    Err(RandomApiError::oauth_state("OAuth state mismatch"))
                }
            }
            None if self.require_provider_state => Err(RandomApiError::oauth_state(
                "OAuth provider did not return a state parameter",
            )),
            None => {
                warn!(
                    "OAuth provider returned no state for session {}; continuing",
                    session_id
                );
                Ok(StateCheck::MissingFromProvider)
            }
        }
    }
}
