//! Server configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use calbot_core::DEFAULT_CALENDAR_NAME;
use url::Url;

use crate::error::{ServerError, ServerResult};

/// Site publishing the weekend guide.
pub const DEFAULT_BASE_URL: &str = "https://www.littlerocksoiree.com";

pub const DEFAULT_USER_AGENT: &str = "CalBot/1.0";

pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    pub listen_addr: SocketAddr,

    /// Root of the guide site; article paths are joined onto it.
    pub base_url: Url,

    /// `User-Agent` sent when fetching the guide.
    pub user_agent: String,

    /// Whole-request timeout for guide fetches.
    pub request_timeout: Duration,

    /// How long an extracted guide is served from memory.
    pub cache_ttl: Duration,

    /// Maximum number of guides kept in memory.
    pub cache_capacity: usize,

    /// How long in-flight requests may run after a shutdown signal.
    pub shutdown_timeout: Duration,

    /// `NAME` of the served calendar.
    pub calendar_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_PORT),
            base_url: Url::parse(DEFAULT_BASE_URL).expect("Invalid default base URL"),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(30),
            cache_ttl: Duration::from_secs(15 * 60),
            cache_capacity: 10,
            shutdown_timeout: Duration::from_secs(5),
            calendar_name: DEFAULT_CALENDAR_NAME.to_string(),
        }
    }
}

impl ServerConfig {
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            ..Default::default()
        }
    }

    /// Builder: set the guide site root.
    ///
    /// # Errors
    ///
    /// Fails if `base_url` is not an absolute http(s) URL.
    pub fn with_base_url(mut self, base_url: &str) -> ServerResult<Self> {
        let url = Url::parse(base_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ServerError::config(format!(
                "base URL must be http or https, got {}",
                url.scheme()
            )));
        }
        self.base_url = url;
        Ok(self)
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn with_calendar_name(mut self, name: impl Into<String>) -> Self {
        self.calendar_name = name.into();
        self
    }
}
