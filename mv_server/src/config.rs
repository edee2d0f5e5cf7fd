//! Server configuration management.
//!
//! Consolidates environment variable reads and provides validated
//! configuration.

use std::net::SocketAddr;

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Public URL the web UI should dial, served by `/api/runtime-env`
    pub public_url: String,
    /// Process-wide coin flip default
    pub coin_flip_default: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    pub fn from_env(bind_override: Option<SocketAddr>) -> Result<Self, ConfigError> {
        let bind = bind_override
            .or_else(|| {
                std::env::var("SERVER_BIND")
                    .ok()
                    .and_then(|s| s.parse().ok())
            })
            .unwrap_or_else(|| {
                "127.0.0.1:3000"
                    .parse()
                    .expect("Default bind address is valid")
            });

        let public_url =
            std::env::var("PUBLIC_URL").unwrap_or_else(|_| format!("http://{bind}"));

        let coin_flip_default = parse_env_or("COIN_FLIP_DEFAULT", true);

        Ok(ServerConfig {
            bind,
            public_url,
            coin_flip_default,
        })
    }

    /// Validate configuration after loading.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.public_url.starts_with("http://") && !self.public_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                var: "PUBLIC_URL".to_string(),
                reason: "Must start with http:// or https://".to_string(),
            });
        }
        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation_rejects_bad_public_url() {
        let config = ServerConfig {
            bind: "127.0.0.1:3000".parse().unwrap(),
            public_url: "ws://somewhere".to_string(),
            coin_flip_default: true,
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert!(err.to_string().contains("PUBLIC_URL"));
    }

    #[test]
    fn test_config_validation_accepts_http_urls() {
        let config = ServerConfig {
            bind: "127.0.0.1:3000".parse().unwrap(),
            public_url: "https://veto.example.org".to_string(),
            coin_flip_default: false,
        };
        assert!(config.validate().is_ok());
    }
}
