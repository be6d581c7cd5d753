use clap::Parser;
use std::time::Duration;

/// Listening address and limits for the concert server
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(author, version, about, long_about = None)]
pub struct ServerConfig {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    pub host: String,

    /// Server port to listen on (0 picks a free port)
    #[arg(short, long, default_value = "8080")]
    pub port: u16,

    /// Maximum number of concurrent sessions
    #[arg(short, long, default_value = "64")]
    pub max_connections: usize,

    /// How long an over-capacity connection may take to send its first
    /// message before it is dropped, in milliseconds
    #[arg(long, default_value = "2000")]
    pub reject_timeout_ms: u64,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn reject_timeout(&self) -> Duration {
        Duration::from_millis(self.reject_timeout_ms)
    }

    /// Loopback on an OS-assigned port, for tests and embedding.
    pub fn ephemeral() -> Self {
        Self {
            port: 0,
            ..Self::default()
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            max_connections: 64,
            reject_timeout_ms: 2000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_cli_defaults() {
        let parsed = ServerConfig::parse_from(["server"]);
        assert_eq!(parsed, ServerConfig::default());
        assert_eq!(parsed.address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_cli_overrides() {
        let parsed = ServerConfig::parse_from(["server", "-H", "0.0.0.0", "-p", "9090", "-m", "2"]);
        assert_eq!(parsed.host, "0.0.0.0");
        assert_eq!(parsed.port, 9090);
        assert_eq!(parsed.max_connections, 2);
        assert_eq!(parsed.address(), "0.0.0.0:9090");
    }

    #[test]
    fn test_ephemeral_port() {
        let config = ServerConfig::ephemeral();
        assert_eq!(config.port, 0);
        assert_eq!(config.address(), "127.0.0.1:0");
    }

    #[test]
    fn test_reject_timeout() {
        let parsed = ServerConfig::parse_from(["server", "--reject-timeout-ms", "250"]);
        assert_eq!(parsed.reject_timeout(), Duration::from_millis(250));
        assert_eq!(
            ServerConfig::default().reject_timeout(),
            Duration::from_secs(2)
        );
    }

    #[tokio::test]
    async fn test_address_binds() {
        let listener = tokio::net::TcpListener::bind(ServerConfig::ephemeral().address())
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();

        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);
    }
}
