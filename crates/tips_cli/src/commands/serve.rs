//! Serve command implementation.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tips_core::BrokerConfig;
use tips_server::{listener, ServerConfig, TipsServer};

/// Options for the serve command.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    /// Listen address.
    pub bind: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Default pull timeout in seconds.
    pub default_timeout: f64,
    /// Maximum pull timeout in seconds.
    pub max_timeout: f64,
    /// Maximum messages per pull.
    pub max_pull_limit: usize,
}

impl ServeOptions {
    /// Builds the server configuration.
    pub fn config(&self) -> Result<ServerConfig, Box<dyn std::error::Error>> {
        let default_timeout = Duration::try_from_secs_f64(self.default_timeout)
            .map_err(|e| format!("invalid --default-timeout: {e}"))?;
        let max_timeout = Duration::try_from_secs_f64(self.max_timeout)
            .map_err(|e| format!("invalid --max-timeout: {e}"))?;
        if self.max_connections == 0 {
            return Err("--max-connections must be at least 1".into());
        }

        let broker = BrokerConfig::new()
            .default_pull_timeout(default_timeout)
            .max_pull_timeout(max_timeout)
            .max_pull_limit(self.max_pull_limit);
        Ok(ServerConfig::new(self.bind)
            .with_max_connections(self.max_connections)
            .with_broker(broker))
    }
}

/// Runs the serve command until interrupted.
pub fn run(options: &ServeOptions) -> Result<(), Box<dyn std::error::Error>> {
    let config = options.config()?;
    let runtime = tokio::runtime::Runtime::new()?;

    runtime.block_on(async move {
        let server = Arc::new(TipsServer::new(config));
        let tcp = listener::bind(&server).await?;
        listener::serve(server, tcp, async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "failed to listen for ctrl-c");
            }
        })
        .await?;
        tracing::info!("server stopped");
        Ok::<_, Box<dyn std::error::Error>>(())
    })
}
