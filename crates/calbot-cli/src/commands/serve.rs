//! Serve command: runs the calendar feed server in the foreground.

use std::net::SocketAddr;

use calbot_server::{ShutdownHandle, serve};
use tracing::info;

use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Serves until SIGINT or SIGTERM.
pub async fn run(config: &ClientConfig, address: Option<SocketAddr>) -> ClientResult<()> {
    let mut server_config = config.to_server_config()?;
    if let Some(address) = address {
        server_config.listen_addr = address;
    }
    info!(
        base_url = %server_config.base_url,
        cache_ttl_secs = server_config.cache_ttl.as_secs(),
        cache_capacity = server_config.cache_capacity,
        "Server configuration"
    );

    let shutdown = ShutdownHandle::new();
    shutdown.listen_for_signals()?;
    serve(server_config, shutdown).await?;
    Ok(())
}
