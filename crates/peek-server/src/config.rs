//! Server configuration.

use std::net::SocketAddr;
use std::time::Duration;

/// Configuration for the HTTP/WebSocket server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to. Loopback by default; the surface is plaintext.
    pub bind_addr: SocketAddr,
    /// Keep-alive ping interval for idle subscribers.
    pub ws_ping_interval: Duration,
    /// Records in the initial snapshot sent after a subscribe.
    pub snapshot_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            ws_ping_interval: Duration::from_secs(30),
            snapshot_limit: 100,
        }
    }
}

impl ServerConfig {
    /// Creates a configuration with the given bind address.
    #[must_use]
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Self::default()
        }
    }

    /// Sets the WebSocket keep-alive interval.
    #[must_use]
    pub const fn with_ws_ping_interval(mut self, interval: Duration) -> Self {
        self.ws_ping_interval = interval;
        self
    }

    /// Sets the snapshot page size.
    #[must_use]
    pub const fn with_snapshot_limit(mut self, limit: usize) -> Self {
        self.snapshot_limit = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_loopback() {
        let config = ServerConfig::default();
        assert!(config.bind_addr.ip().is_loopback());
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.ws_ping_interval, Duration::from_secs(30));
        assert_eq!(config.snapshot_limit, 100);
    }

    #[test]
    fn builder_overrides() {
        let addr = SocketAddr::from(([127, 0, 0, 1], 9999));
        let config = ServerConfig::new(addr)
            .with_ws_ping_interval(Duration::from_secs(5))
            .with_snapshot_limit(10);
        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.ws_ping_interval, Duration::from_secs(5));
        assert_eq!(config.snapshot_limit, 10);
    }
}
