//! API switch: a reverse proxy that spreads requests over groups of upstream
//! API platforms, with weighted or failover selection, circuit breaking and
//! cross-platform retries.

pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod security;

pub use config::schema::ProxyConfig;
pub use http::{HttpServer, ProxyService};
pub use lifecycle::{Shutdown, ShutdownSignal};
