//! Background removal through an external segmentation service.
//!
//! The pipeline only depends on the [`BackgroundRemover`] trait; the factory
//! builds the remove.bg client from config when a credential is available.

pub(crate) mod provider;
pub(crate) mod removebg;

pub use provider::{remove_background, BackgroundRemover, RemovalOutcome};
pub use removebg::RemoveBgRemover;

use crate::config::RemovalConfig;
use std::sync::Arc;
use std::time::Duration;

/// Resolve `${ENV_VAR}` references in config strings.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok().filter(|v| !v.is_empty())
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Builds the configured background remover.
pub struct RemoverFactory;

impl RemoverFactory {
    /// Create the remover described by `config`.
    ///
    /// Returns `None` when removal is disabled or no API key resolves. That is
    /// a valid setup: the pipeline then keeps every original background.
    pub fn create(config: &RemovalConfig) -> Option<Arc<dyn BackgroundRemover>> {
        if !config.enabled {
            tracing::debug!("Background removal disabled in config");
            return None;
        }

        let Some(api_key) = resolve_env_var(&config.api_key) else {
            tracing::warn!(
                "remove.bg API key not configured, photos on colored backgrounds will keep \
                 their background. Set REMOVE_BG_API_KEY to enable removal."
            );
            return None;
        };

        let remover = RemoveBgRemover::new(
            &config.endpoint,
            &api_key,
            Duration::from_millis(config.timeout_ms),
        )
        .with_options(&config.size, &config.bg_color);
        Some(Arc::new(remover))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_env_var() {
        assert_eq!(resolve_env_var("plain-key"), Some("plain-key".to_string()));
        assert_eq!(resolve_env_var(""), None);
        assert_eq!(resolve_env_var("${DEFINITELY_NOT_SET_XYZ_123}"), None);
    }

    #[test]
    fn test_factory_without_key_yields_no_remover() {
        let config = RemovalConfig {
            api_key: "${DEFINITELY_NOT_SET_XYZ_456}".to_string(),
            ..RemovalConfig::default()
        };
        assert!(RemoverFactory::create(&config).is_none());
    }

    #[test]
    fn test_factory_disabled_yields_no_remover() {
        let config = RemovalConfig {
            enabled: false,
            api_key: "literal-key".to_string(),
            ..RemovalConfig::default()
        };
        assert!(RemoverFactory::create(&config).is_none());
    }

    #[test]
    fn test_factory_with_literal_key() {
        let config = RemovalConfig {
            api_key: "literal-key".to_string(),
            timeout_ms: 1234,
            ..RemovalConfig::default()
        };
        let remover = RemoverFactory::create(&config).unwrap();
        assert_eq!(remover.name(), "remove.bg");
        assert_eq!(remover.timeout(), Duration::from_millis(1234));
    }
}
