//! random-api - random resource redirection service
//!
//! Endpoints aggregate typed data sources into candidate pools; each request
//! draws one URL uniformly at random, applies URL rewrite rules and redirects.
//!
//! # Architecture
//! - `model`: endpoints, data-source configs, field-path resolution, rewrite rules
//! - `storage`: SeaORM persistence and migrations
//! - `services`: catalog snapshot, candidate pools, sync, resolution, admin operations
//! - `api`: HTTP services and middleware
//! - `config`: Configuration management
//! - `runtime`: Application lifecycle and execution modes
//! - `system`: Logging

pub mod api;
pub mod config;
pub mod errors;
pub mod model;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
