//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → proxy.rs (authorize, resolve group, select, attempt loop)
//!         → body.rs (buffer the body once for replay)
//!         → request.rs (target URL per platform)
//!         → response.rs (relay upstream response, rejections)
//!     → Send to client
//! ```

pub mod body;
pub mod proxy;
pub mod request;
pub mod response;
pub mod server;

pub use proxy::{ProxyService, ServiceError};
pub use server::HttpServer;
