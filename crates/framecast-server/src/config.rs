//! Server configuration.

use framecast_core::constants::DEFAULT_PORT;
use std::net::SocketAddr;
use std::time::Duration;

/// Configuration for the frame server.
///
/// # Example
///
/// ```
/// use framecast_server::ServerConfig;
///
/// let config = ServerConfig {
///     bind_addr: "0.0.0.0:15099".parse().unwrap(),
///     ..ServerConfig::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the listening socket to.
    pub bind_addr: SocketAddr,

    /// Per-read socket timeout. `None` waits forever; with a timeout
    /// set, an idle interval is logged and the read retried.
    pub read_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            read_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_port() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 15099);
        assert!(config.read_timeout.is_none());
    }
}
