//! Raw configuration types for TOML parsing

use super::*;
use serde::Deserialize;

/// Raw configuration as parsed from TOML
#[derive(Debug, Deserialize)]
pub struct RawConfig {
    pub server: Option<RawServerConfig>,
    pub logging: Option<RawLoggingConfig>,
    pub provider: Option<RawProviderConfig>,
    pub enrichment: Option<RawEnrichmentConfig>,
}

#[derive(Debug, Deserialize, Default)]
pub struct RawServerConfig {
    pub bind: Option<String>,
}

impl From<RawServerConfig> for ServerConfig {
    fn from(raw: RawServerConfig) -> Self {
        Self {
            bind: raw.bind.unwrap_or_else(|| DEFAULT_BIND.to_string()),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct RawLoggingConfig {
    pub level: Option<String>,
    pub format: Option<String>,
}

impl From<RawLoggingConfig> for LoggingConfig {
    fn from(raw: RawLoggingConfig) -> Self {
        Self {
            level: raw.level.unwrap_or_else(|| "info".to_string()),
            format: raw
                .format
                .as_deref()
                .map(LogFormat::parse)
                .unwrap_or(LogFormat::Pretty),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct RawProviderConfig {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub api_key: Option<String>,
    pub phone_number_id: Option<String>,
    pub assistants: Option<RawAssistants>,
}

#[derive(Debug, Deserialize, Default)]
pub struct RawAssistants {
    pub andy: Option<String>,
    pub mam: Option<String>,
}

impl TryFrom<RawProviderConfig> for ProviderConfig {
    type Error = ConfigError;

    fn try_from(raw: RawProviderConfig) -> Result<Self, Self::Error> {
        let base_url = match raw.base_url.as_deref() {
            Some(url) => parse_base_url(url)?,
            None => default_base_url(),
        };

        let timeout = request_timeout(
            "provider.timeout_secs",
            raw.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        )?;

        let mut assistants = HashMap::new();
        let raw_assistants = raw.assistants.unwrap_or_default();
        for (selector, id) in [
            (AssistantSelector::Andy, raw_assistants.andy),
            (AssistantSelector::Mam, raw_assistants.mam),
        ] {
            if let Some(id) = id.filter(|id| !id.trim().is_empty()) {
                assistants.insert(selector, id);
            }
        }

        Ok(Self {
            api_key: raw
                .api_key
                .filter(|k| !k.trim().is_empty())
                .map(Secret::new),
            assistants,
            phone_number_id: raw.phone_number_id.filter(|p| !p.trim().is_empty()),
            base_url,
            timeout,
            enrichment: EnrichmentConfig::default(),
        })
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct RawEnrichmentConfig {
    pub enabled: Option<bool>,
    pub delay_secs: Option<u64>,
}

impl From<RawEnrichmentConfig> for EnrichmentConfig {
    fn from(raw: RawEnrichmentConfig) -> Self {
        Self {
            enabled: raw.enabled.unwrap_or(true),
            delay: Duration::from_secs(raw.delay_secs.unwrap_or(DEFAULT_ENRICH_DELAY_SECS)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[server]
bind = "127.0.0.1:9000"

[logging]
level = "debug"
format = "json"

[provider]
base_url = "https://vapi.example.com"
timeout_secs = 45
phone_number_id = "phone-1"

[provider.assistants]
andy = "asst-andy"
mam = "asst-mam"

[enrichment]
enabled = false
delay_secs = 1
"#;

        let config = Config::parse(toml).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:9000");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.provider.base_url.as_str(), "https://vapi.example.com/");
        assert_eq!(config.provider.timeout, Duration::from_secs(45));
        assert_eq!(config.provider.phone_number_id.as_deref(), Some("phone-1"));
        assert_eq!(
            config.provider.assistants.get(&AssistantSelector::Mam).map(String::as_str),
            Some("asst-mam")
        );
        assert!(!config.provider.enrichment.enabled);
        assert_eq!(config.provider.enrichment.delay, Duration::from_secs(1));
        assert!(config.provider.api_key.is_none());
    }

    #[test]
    fn test_minimal_config() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.server.bind, DEFAULT_BIND);
        assert_eq!(config.provider.base_url.as_str(), "https://api.vapi.ai/");
        assert_eq!(config.provider.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert!(config.provider.enrichment.enabled);
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let err = Config::parse("[provider]\nbase_url = \"ftp://vapi.example.com\"").unwrap_err();
        assert!(err.to_string().contains("scheme"));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        assert!(Config::parse("[provider]\ntimeout_secs = 0").is_err());
    }

    #[test]
    fn test_env_overlay() {
        let config = Config::default()
            .with_env(env(&[
                ("VAPI_API_KEY", "sk-test"),
                ("ANDY", "asst-andy"),
                ("MAM", "asst-mam"),
                ("PHONE", "phone-1"),
                ("PORT", "9090"),
                ("VAPI_ENRICH", "false"),
            ]))
            .unwrap();

        assert_eq!(config.provider.api_key.as_ref().map(|k| k.expose()), Some("sk-test"));
        assert_eq!(config.provider.assistants.len(), 2);
        assert_eq!(config.provider.phone_number_id.as_deref(), Some("phone-1"));
        assert_eq!(config.server.bind, "0.0.0.0:9090");
        assert!(!config.provider.enrichment.enabled);
    }

    #[test]
    fn test_env_wins_over_file() {
        let config = Config::parse("[provider]\nphone_number_id = \"from-file\"")
            .unwrap()
            .with_env(env(&[("PHONE", "from-env")]))
            .unwrap();

        assert_eq!(config.provider.phone_number_id.as_deref(), Some("from-env"));
    }

    #[test]
    fn test_empty_env_values_are_unset() {
        let config = Config::default()
            .with_env(env(&[("VAPI_API_KEY", ""), ("ANDY", "   ")]))
            .unwrap();

        assert!(config.provider.api_key.is_none());
        assert!(config.provider.assistants.is_empty());
    }

    #[test]
    fn test_invalid_env_values() {
        assert!(Config::default().with_env(env(&[("PORT", "http")])).is_err());
        assert!(Config::default().with_env(env(&[("VAPI_ENRICH", "maybe")])).is_err());
        assert!(Config::default().with_env(env(&[("VAPI_TIMEOUT_SECS", "soon")])).is_err());

        let err = Config::default()
            .with_env(env(&[("VAPI_TIMEOUT_SECS", "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("VAPI_TIMEOUT_SECS"));
    }

    #[test]
    fn test_ipv6_host_is_bracketed() {
        let config = Config::default()
            .with_env(env(&[("HOST", "::"), ("PORT", "9000")]))
            .unwrap();
        assert_eq!(config.server.bind, "[::]:9000");
        assert_eq!(config.server.port(), 9000);
        assert!(config.server.bind.parse::<std::net::SocketAddr>().is_ok());

        let config = Config::default()
            .with_env(env(&[("HOST", "127.0.0.1"), ("PORT", "9000")]))
            .unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:9000");
    }

    #[test]
    fn test_resolve_lists_every_missing_variable() {
        let config = Config::default()
            .with_env(env(&[("ANDY", "asst-andy")]))
            .unwrap();

        let err = config.provider.resolve(AssistantSelector::Mam).unwrap_err();
        match err {
            ConfigError::MissingVariables(missing) => {
                assert_eq!(missing, vec!["VAPI_API_KEY", "MAM", "PHONE"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolve_complete() {
        let config = Config::default()
            .with_env(env(&[
                ("VAPI_API_KEY", "sk-test"),
                ("MAM", "asst-mam"),
                ("PHONE", "phone-1"),
            ]))
            .unwrap();

        let resolved = config.provider.resolve(AssistantSelector::Mam).unwrap();
        assert_eq!(resolved.assistant_id, "asst-mam");
        assert_eq!(resolved.phone_number_id, "phone-1");
        assert_eq!(resolved.api_key.expose(), "sk-test");
        assert!(config.provider.resolve(AssistantSelector::Andy).is_err());
    }
}
