//! Listener configuration from the environment.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

pub const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid PORT value {0:?}: expected 0-65535")]
    InvalidPort(String),
}

/// Bind address is always all interfaces; only the port is configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_port_var(std::env::var("PORT").ok())
    }

    /// `None` or an empty value means the default port.
    pub fn from_port_var(port: Option<String>) -> Result<Self, ConfigError> {
        let port = match port.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_PORT,
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw.to_string()))?,
        };
        Ok(Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_defaults_to_8000_on_all_interfaces() {
        let cfg = ServerConfig::from_port_var(None).unwrap();
        assert_eq!(cfg.socket_addr().to_string(), "0.0.0.0:8000");
        assert_eq!(ServerConfig::from_port_var(Some(String::new())).unwrap().port, 8000);
    }

    #[test]
    fn port_is_read_and_validated() {
        assert_eq!(
            ServerConfig::from_port_var(Some("9090".to_string())).unwrap().port,
            9090
        );
        assert!(ServerConfig::from_port_var(Some("http".to_string())).is_err());
        assert!(ServerConfig::from_port_var(Some("70000".to_string())).is_err());
    }
}
