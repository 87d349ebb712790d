pub mod auth;
pub mod rate_limit;

pub use auth::AuthMiddleware;
pub use rate_limit::{ClientIpKeyExtractor, redirect_rate_limiter};
