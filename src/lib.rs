//! rcc-client - Client-side synchronization for a remote configuration center.
//!
//! The client keeps the key/value configuration of one project/environment
//! pair in memory and follows the authority's active version:
//!
//! - Synchronous reads served from an internally synchronized cache
//! - Background version polling with diffed change events
//! - Local snapshot persistence used as a fallback at startup
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use rcc_client::{client::Client, config::Conf};
//!
//! # async fn run() -> rcc_client::Result<()> {
//! let conf = Conf {
//!     server_url: "http://rcc.internal:8080".to_string(),
//!     project_name: "shop".to_string(),
//!     env_name: "prod".to_string(),
//!     api_password: "secret".to_string(),
//!     enable_callback: true,
//!     enable_cache: true,
//!     ..Conf::default()
//! };
//!
//! let client = Client::new(conf)?;
//! client.start().await?;
//!
//! let mut changes = client.watch_update()?;
//! while let Some(event) = changes.next().await {
//!     println!("{} keys changed", event.len());
//! }
//! # Ok(())
//! # }
//! ```

/// Thread-safe key/value cache with file persistence.
pub mod cache;

/// Client facade: lifecycle, reads and change events.
pub mod client;

/// Client configuration and cache file locations.
pub mod config;

/// Error types and result alias.
pub mod error;

/// Version polling loop.
pub mod poller;

/// Tracing subscriber setup for binaries.
pub mod tracing_config;

/// Access to the configuration authority.
pub mod transport;

#[cfg(test)]
mod test_support;

pub use error::{RccError, Result};
