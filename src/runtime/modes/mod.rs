//! Mode routing
//!
//! 目前只有 HTTP 服务模式；`generate-config` 在 main 中直接处理。

pub mod server;

pub use server::run_server;
