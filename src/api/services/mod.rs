pub mod admin;
pub mod health;
pub mod redirect;

pub use admin::admin_v1_routes;
pub use health::{AppStartTime, HealthService, health_routes};
pub use redirect::{RedirectService, redirect_routes};
