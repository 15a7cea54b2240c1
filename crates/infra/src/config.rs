//! Application configuration from `DUOBUNDLE_*` environment variables.

use thiserror::Error;

use duobundle_core::ShopId;
use duobundle_mapping::MatchStrategy;
use duobundle_observability::LogFormat;

pub const SHOP_DOMAIN_VAR: &str = "DUOBUNDLE_SHOP_DOMAIN";
pub const LOG_FORMAT_VAR: &str = "DUOBUNDLE_LOG_FORMAT";
pub const MATCH_STRATEGY_VAR: &str = "DUOBUNDLE_MATCH_STRATEGY";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(var: &'static str, value: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Single shop this deployment serves; `None` serves every shop.
    pub shop_domain: Option<ShopId>,
    pub log_format: LogFormat,
    pub match_strategy: MatchStrategy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            shop_domain: None,
            log_format: LogFormat::Json,
            match_strategy: MatchStrategy::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Unset or blank variables keep
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut config = Self::default();

        if let Some(raw) = get(SHOP_DOMAIN_VAR) {
            let shop = ShopId::parse(&raw)
                .map_err(|e| ConfigError::invalid(SHOP_DOMAIN_VAR, &raw, e.to_string()))?;
            config.shop_domain = Some(shop);
        }
        if let Some(raw) = get(LOG_FORMAT_VAR) {
            config.log_format = raw
                .parse()
                .map_err(|e: String| ConfigError::invalid(LOG_FORMAT_VAR, &raw, e))?;
        }
        if let Some(raw) = get(MATCH_STRATEGY_VAR) {
            config.match_strategy = raw
                .parse()
                .map_err(|e: String| ConfigError::invalid(MATCH_STRATEGY_VAR, &raw, e))?;
        }

        Ok(config)
    }

    /// Install the tracing subscriber in the configured format.
    pub fn init_observability(&self) {
        duobundle_observability::init_with(self.log_format);
    }
}
