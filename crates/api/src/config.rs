//! Server configuration loaded from environment variables.

use common::BusinessEntityId;
use gateway::CheckoutUrls;
use thiserror::Error;
use url::Url;

/// Errors raised when a server variable is set to something unusable.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("PORT must be a port number, got {0:?}")]
    InvalidPort(String),

    #[error("PAYMENT_METHOD_ID must be an integer, got {0:?}")]
    InvalidPaymentMethod(String),

    #[error("PUBLIC_URL is not a valid URL: {0}")]
    InvalidPublicUrl(#[from] url::ParseError),
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default `0.0.0.0`)
/// - `PORT`: listen port (default `3000`)
/// - `RUST_LOG`: tracing filter directive (default `info`)
/// - `BUSINESS_ENTITY`: whose gateway credentials to load (default `default`)
/// - `PUBLIC_URL`: base of the provider return and cancel URLs
///   (default `http://localhost:3000`)
/// - `PAYMENT_METHOD_ID`: payment method recorded on new payments (default `1`)
/// - `DATABASE_URL`: PostgreSQL store when set, in-memory otherwise
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub business_entity: BusinessEntityId,
    pub public_url: String,
    pub payment_method_id: i64,
    pub database_url: Option<String>,
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults for
    /// unset or blank variables.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = match var("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidPort(raw))?,
            None => defaults.port,
        };
        let payment_method_id = match var("PAYMENT_METHOD_ID") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPaymentMethod(raw))?,
            None => defaults.payment_method_id,
        };
        let public_url = match var("PUBLIC_URL") {
            Some(raw) => Url::parse(raw.trim())?.to_string(),
            None => defaults.public_url,
        };

        Ok(Self {
            host: var("HOST").unwrap_or(defaults.host),
            port,
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
            business_entity: var("BUSINESS_ENTITY")
                .map(BusinessEntityId::new)
                .unwrap_or(defaults.business_entity),
            public_url,
            payment_method_id,
            database_url: var("DATABASE_URL"),
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Return and cancel URLs handed to the provider.
    pub fn checkout_urls(&self) -> Result<CheckoutUrls, ConfigError> {
        Ok(CheckoutUrls::new(Url::parse(&self.public_url)?))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            business_entity: BusinessEntityId::new("default"),
            public_url: "http://localhost:3000".to_string(),
            payment_method_id: 1,
            database_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.business_entity.as_str(), "default");
        assert_eq!(
            config.checkout_urls().unwrap().base().as_str(),
            "http://localhost:3000/"
        );
        assert_eq!(config.payment_method_id, 1);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_lookup_overrides_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "8081"),
            ("BUSINESS_ENTITY", "Acme"),
            ("PUBLIC_URL", "https://shop.acme.test/store/"),
            ("PAYMENT_METHOD_ID", "4"),
            ("DATABASE_URL", "postgres://localhost/checkout"),
            ("HOST", "   "),
        ]))
        .unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8081);
        assert_eq!(config.business_entity.as_str(), "acme");
        assert_eq!(config.payment_method_id, 4);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/checkout")
        );
        assert_eq!(
            config.checkout_urls().unwrap().base().as_str(),
            "https://shop.acme.test/store/"
        );
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            Config::from_lookup(lookup(&[("PORT", "http")])),
            Err(ConfigError::InvalidPort(_))
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("PAYMENT_METHOD_ID", "paypal")])),
            Err(ConfigError::InvalidPaymentMethod(_))
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("PUBLIC_URL", "not a url")])),
            Err(ConfigError::InvalidPublicUrl(_))
        ));
    }
}
