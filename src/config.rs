// src/config.rs

pub mod credentials;

use self::credentials::{CredentialSource, load_or_create_external_config, resolve_credential};
use crate::{
    constants,
    error::{AppError, AppResult},
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, str::FromStr, time::Duration};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "production" | "prod" => Ok(Environment::Production),
            "development" | "dev" => Ok(Environment::Development),
            _ => Err(format!("Environnement inconnu: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BackendConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anon_key: Option<String>,
    #[serde(default = "default_storage_bucket")]
    pub storage_bucket: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_chat_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_chat_model")]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: default_chat_endpoint(),
            model: default_chat_model(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_site_origin")]
    pub origin: String,
    #[serde(default)]
    pub environment: Environment,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            origin: default_site_origin(),
            environment: Environment::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NetworkConfig {
    pub connect_timeout_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
}

fn default_storage_bucket() -> String {
    constants::DEFAULT_STORAGE_BUCKET.to_string()
}

fn default_chat_endpoint() -> String {
    constants::DEFAULT_CHAT_ENDPOINT.to_string()
}

fn default_chat_model() -> String {
    constants::DEFAULT_CHAT_MODEL.to_string()
}

fn default_site_origin() -> String {
    constants::DEFAULT_SITE_ORIGIN.to_string()
}

/// Shape of `~/.serrure-master/config.json`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExternalConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub network: NetworkConfig,
}

impl ExternalConfig {
    pub(crate) fn default_app_config() -> Self {
        Self {
            network: NetworkConfig {
                connect_timeout_secs: Some(10),
                timeout_secs: Some(30),
                max_retries: Some(2),
            },
            ..Default::default()
        }
    }
}

/// Values given on the command line; they win over the environment and the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub home: Option<PathBuf>,
    pub backend_url: Option<String>,
    pub backend_key: Option<String>,
    pub site_origin: Option<String>,
    pub environment: Option<Environment>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend_url: String,
    pub backend_key: String,
    pub storage_bucket: String,
    pub chat_endpoint: String,
    pub chat_model: String,
    pub chat_api_key: Option<String>,
    pub site_origin: String,
    pub environment: Environment,
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub timeout: Duration,
    pub max_retries: u32,
    pub home_dir: PathBuf,
}

impl AppConfig {
    pub fn new(overrides: &ConfigOverrides) -> AppResult<Self> {
        let home_dir = credentials::resolve_home_dir(overrides.home.as_deref())?;
        let external_config = load_or_create_external_config(&home_dir)?;
        Self::from_external(external_config, overrides, home_dir)
    }

    /// Resolves every setting in CLI > environment > file order.
    /// Missing backend credentials are a configuration error that blocks the whole application.
    pub fn from_external(
        external: ExternalConfig,
        overrides: &ConfigOverrides,
        home_dir: PathBuf,
    ) -> AppResult<Self> {
        let (backend_url, url_source) = resolve_credential(
            overrides.backend_url.as_deref(),
            "SUPABASE_URL",
            external.backend.url.as_deref(),
        );
        let (backend_key, key_source) = resolve_credential(
            overrides.backend_key.as_deref(),
            "SUPABASE_ANON_KEY",
            external.backend.anon_key.as_deref(),
        );

        let mut missing = Vec::new();
        if backend_url.is_none() {
            missing.push("SUPABASE_URL");
        }
        if backend_key.is_none() {
            missing.push("SUPABASE_ANON_KEY");
        }
        let (Some(backend_url), Some(backend_key)) = (backend_url, backend_key) else {
            return Err(AppError::Configuration(format!(
                "variables manquantes: {}",
                missing.join(", ")
            )));
        };
        debug!(
            "Backend résolu depuis {} (clé depuis {})",
            url_source, key_source
        );

        let (chat_api_key, chat_source) =
            resolve_credential(None, "GEMINI_API_KEY", external.chat.api_key.as_deref());
        if chat_source == CredentialSource::Missing {
            debug!("Aucune clé d'API de discussion, l'assistant répondra en mode dégradé");
        }

        let (site_origin, _) = resolve_credential(
            overrides.site_origin.as_deref(),
            "SITE_ORIGIN",
            Some(external.site.origin.as_str()),
        );

        let environment = match overrides.environment {
            Some(env) => env,
            None => match std::env::var("APP_ENVIRONMENT") {
                Ok(value) => value.parse().map_err(AppError::UserInputError)?,
                Err(_) => external.site.environment,
            },
        };

        Ok(Self {
            backend_url: backend_url.trim_end_matches('/').to_string(),
            backend_key,
            storage_bucket: external.backend.storage_bucket,
            chat_endpoint: external.chat.endpoint.trim_end_matches('/').to_string(),
            chat_model: external.chat.model,
            chat_api_key,
            site_origin: site_origin
                .unwrap_or_else(default_site_origin)
                .trim_end_matches('/')
                .to_string(),
            environment,
            user_agent: constants::USER_AGENT.into(),
            connect_timeout: Duration::from_secs(
                external.network.connect_timeout_secs.unwrap_or(10),
            ),
            timeout: Duration::from_secs(external.network.timeout_secs.unwrap_or(30)),
            max_retries: external.network.max_retries.unwrap_or(2),
            home_dir,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn store_dir(&self) -> PathBuf {
        self.home_dir.join(constants::STORE_DIR_NAME)
    }
}

#[cfg(feature = "testing")]
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:54321".to_string(),
            backend_key: "test-anon-key".to_string(),
            storage_bucket: constants::DEFAULT_STORAGE_BUCKET.to_string(),
            chat_endpoint: "http://127.0.0.1:54322".to_string(),
            chat_model: "test-model".to_string(),
            chat_api_key: Some("test-chat-key".to_string()),
            site_origin: "https://shop.test".to_string(),
            environment: Environment::Development,
            user_agent: "test-agent/1.0".to_string(),
            connect_timeout: Duration::from_secs(5),
            timeout: Duration::from_secs(15),
            max_retries: 0,
            home_dir: std::env::temp_dir().join(constants::CONFIG_DIR_NAME),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn external_with_backend() -> ExternalConfig {
        let mut external = ExternalConfig::default_app_config();
        external.backend.url = Some("https://demo.supabase.co/".into());
        external.backend.anon_key = Some("anon".into());
        external
    }

    #[test]
    fn missing_backend_credentials_is_a_configuration_error() {
        let overrides = ConfigOverrides::default();
        // Only meaningful when the developer's shell does not export them.
        if std::env::var("SUPABASE_URL").is_ok() || std::env::var("SUPABASE_ANON_KEY").is_ok() {
            return;
        }
        let err = AppConfig::from_external(ExternalConfig::default(), &overrides, PathBuf::new())
            .unwrap_err();
        assert!(matches!(err, AppError::Configuration(ref msg) if msg.contains("SUPABASE_URL")));
    }

    #[test]
    fn cli_overrides_win_and_trailing_slashes_are_trimmed() {
        let overrides = ConfigOverrides {
            backend_url: Some("https://cli.supabase.co/".into()),
            backend_key: Some("cli-key".into()),
            site_origin: Some("https://shop.example/".into()),
            environment: Some(Environment::Production),
            ..Default::default()
        };
        let config =
            AppConfig::from_external(external_with_backend(), &overrides, PathBuf::from("/tmp/x"))
                .unwrap();
        assert_eq!(config.backend_url, "https://cli.supabase.co");
        assert_eq!(config.backend_key, "cli-key");
        assert_eq!(config.site_origin, "https://shop.example");
        assert!(config.is_production());
        assert_eq!(config.store_dir(), PathBuf::from("/tmp/x/store"));
    }

    #[test]
    fn environment_parses_loosely() {
        assert_eq!("Prod".parse::<Environment>(), Ok(Environment::Production));
        assert_eq!("development".parse::<Environment>(), Ok(Environment::Development));
        assert!("staging".parse::<Environment>().is_err());
    }
}
