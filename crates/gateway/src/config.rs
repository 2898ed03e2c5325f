//! Gateway configuration, loaded once per business entity.

use common::BusinessEntityId;
use thiserror::Error;

use crate::remote::PaymentAction;

/// Provider environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Sandbox,
    Live,
}

impl Mode {
    /// Parses the configured server value. Blank means sandbox.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_lowercase().as_str() {
            "" | "sandbox" => Ok(Mode::Sandbox),
            "live" | "production" => Ok(Mode::Live),
            other => Err(ConfigError::InvalidMode(other.to_string())),
        }
    }

    /// Name-value-pair API endpoint for signature credentials.
    pub fn nvp_endpoint(&self) -> &'static str {
        match self {
            Mode::Sandbox => "https://api-3t.sandbox.paypal.com/nvp",
            Mode::Live => "https://api-3t.paypal.com/nvp",
        }
    }

    /// Base URL of the hosted checkout page.
    pub fn checkout_base(&self) -> &'static str {
        match self {
            Mode::Sandbox => "https://www.sandbox.paypal.com/cgi-bin/webscr",
            Mode::Live => "https://www.paypal.com/cgi-bin/webscr",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid gateway server mode: {0}")]
    InvalidMode(String),
}

/// Credentials and checkout preferences for one business entity.
///
/// Reads `{ENTITY}_PAYPAL_GATEWAY_{KEY}` variables:
/// - `LOGIN`, `PASSWORD`, `SIGNATURE`: API credentials
/// - `SERVER`: `sandbox` (default) or `live`
/// - `SOLUTION`: `Mark` (default) or `Sole`; `Sole` requires a shipping address
/// - `LANDING_PAGE`: `Billing` (default) or `Login`
/// - `LOGOURL`: header image on the hosted page
/// - `USE_AUTHORIZATION`: `true` to authorize only and capture later
#[derive(Clone)]
pub struct GatewayConfig {
    pub business_entity: BusinessEntityId,
    pub login: String,
    pub password: String,
    pub signature: String,
    pub mode: Mode,
    pub solution: String,
    pub landing_page: String,
    pub logo_url: String,
    pub use_authorization: bool,
}

impl GatewayConfig {
    /// Loads configuration from environment variables.
    pub fn from_env(business_entity: BusinessEntityId) -> Result<Self, ConfigError> {
        Self::from_lookup(business_entity, |key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn from_lookup(
        business_entity: BusinessEntityId,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let prefix = business_entity.env_prefix();
        let get = |key: &str| {
            lookup(&format!("{prefix}_PAYPAL_GATEWAY_{key}"))
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };

        Ok(Self {
            login: get("LOGIN"),
            password: get("PASSWORD"),
            signature: get("SIGNATURE"),
            mode: Mode::parse(&get("SERVER"))?,
            solution: non_blank_or(get("SOLUTION"), "Mark"),
            landing_page: non_blank_or(get("LANDING_PAGE"), "Billing"),
            logo_url: get("LOGOURL"),
            use_authorization: get("USE_AUTHORIZATION") == "true",
            business_entity,
        })
    }

    /// Sandbox configuration with placeholder credentials.
    pub fn sandbox(business_entity: BusinessEntityId) -> Self {
        Self {
            business_entity,
            login: String::new(),
            password: String::new(),
            signature: String::new(),
            mode: Mode::Sandbox,
            solution: "Mark".to_string(),
            landing_page: "Billing".to_string(),
            logo_url: String::new(),
            use_authorization: false,
        }
    }

    /// True when settlement captures funds immediately.
    pub fn auto_capture(&self) -> bool {
        !self.use_authorization
    }

    /// Action used both when starting and when settling a session.
    pub fn payment_action(&self) -> PaymentAction {
        if self.auto_capture() {
            PaymentAction::Sale
        } else {
            PaymentAction::Authorization
        }
    }

    /// The `Sole` solution lets buyers pay without an account, which needs an address.
    pub fn address_required(&self) -> bool {
        self.solution == "Sole"
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("business_entity", &self.business_entity)
            .field("login", &self.login)
            .field("password", &"[redacted]")
            .field("signature", &"[redacted]")
            .field("mode", &self.mode)
            .field("solution", &self.solution)
            .field("landing_page", &self.landing_page)
            .field("logo_url", &self.logo_url)
            .field("use_authorization", &self.use_authorization)
            .finish()
    }
}

fn non_blank_or(value: String, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value
    }
}
