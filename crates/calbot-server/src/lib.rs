//! Calendar feed server for the Little Rock Soirée weekend guide.
//!
//! On each request to `/calbot/soiree/` the server:
//! - works out which Thursday's guide is current and where it lives
//! - serves the guide's events from cache when fresh
//! - otherwise fetches the page, runs the extraction pipeline and caches the result
//! - renders the events as `text/calendar`
//!
//! # Example
//!
//! ```rust,no_run
//! use calbot_server::{ServerConfig, ShutdownHandle, serve};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let shutdown = ShutdownHandle::new();
//!     shutdown.listen_for_signals()?;
//!     serve(ServerConfig::default(), shutdown).await?;
//!     Ok(())
//! }
//! ```

mod cache;
mod config;
mod error;
mod fetch;
mod guide;
mod http;
mod signals;

pub use cache::{CacheEntry, GuideCache};
pub use config::{DEFAULT_BASE_URL, DEFAULT_PORT, DEFAULT_USER_AGENT, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use fetch::{BoxFuture, GuideFetcher, GuideSource};
pub use guide::{guide_url, publication_thursday};
pub use http::{AppState, CALENDAR_PATH, HEALTH_PATH, router, serve};
pub use signals::{ShutdownHandle, ShutdownSignal};
