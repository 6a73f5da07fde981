// src/config/credentials.rs

use crate::{
    config::ExternalConfig,
    constants,
    error::{AppError, AppResult},
};
use anyhow::{Context, anyhow};
use log::{debug, info};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

/// Where a resolved setting came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    CommandLine,
    Environment,
    ConfigFile,
    Missing,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CredentialSource::CommandLine => "ligne de commande",
            CredentialSource::Environment => "variable d'environnement",
            CredentialSource::ConfigFile => "fichier de configuration",
            CredentialSource::Missing => "introuvable",
        };
        f.write_str(label)
    }
}

/// `--home` first, then `SERRURE_MASTER_HOME`, then `~/.serrure-master`.
pub fn resolve_home_dir(cli_home: Option<&Path>) -> AppResult<PathBuf> {
    if let Some(dir) = cli_home {
        return Ok(dir.to_path_buf());
    }
    if let Ok(dir) = std::env::var("SERRURE_MASTER_HOME")
        && !dir.is_empty()
    {
        return Ok(PathBuf::from(dir));
    }
    let path = dirs::home_dir()
        .ok_or_else(|| AppError::Other(anyhow!("Impossible de déterminer le dossier personnel")))?
        .join(constants::CONFIG_DIR_NAME);
    Ok(path)
}

pub(crate) fn load_or_create_external_config(home_dir: &Path) -> AppResult<ExternalConfig> {
    let config_path = home_dir.join(constants::CONFIG_FILE_NAME);
    if config_path.is_file() {
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Lecture de '{}' impossible", config_path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Analyse de '{}' impossible", config_path.display()))
            .map_err(AppError::from)
    } else {
        info!(
            "Fichier de configuration {:?} absent, création des valeurs par défaut.",
            config_path
        );
        let config = ExternalConfig::default_app_config();

        fs::create_dir_all(home_dir)?;
        let json_content = serde_json::to_string_pretty(&config)?;
        fs::write(&config_path, json_content)?;

        Ok(config)
    }
}

/// Persists backend credentials into the config file.
pub fn save_backend_credentials(home_dir: &Path, url: &str, anon_key: &str) -> AppResult<PathBuf> {
    let config_path = home_dir.join(constants::CONFIG_FILE_NAME);
    let mut config = load_or_create_external_config(home_dir)?;

    config.backend.url = Some(url.trim().to_string());
    config.backend.anon_key = Some(anon_key.trim().to_string());

    let json_content = serde_json::to_string_pretty(&config)?;
    fs::write(&config_path, json_content)
        .with_context(|| format!("Écriture de '{}' impossible", config_path.display()))?;

    info!("Accès backend enregistrés dans {}", config_path.display());
    Ok(config_path)
}

pub fn resolve_credential(
    cli_value: Option<&str>,
    env_key: &str,
    file_value: Option<&str>,
) -> (Option<String>, CredentialSource) {
    if let Some(value) = cli_value
        && !value.trim().is_empty()
    {
        debug!("{} fourni en ligne de commande", env_key);
        return (Some(value.trim().to_string()), CredentialSource::CommandLine);
    }
    if let Ok(value) = std::env::var(env_key)
        && !value.trim().is_empty()
    {
        debug!("{} lu depuis l'environnement", env_key);
        return (Some(value.trim().to_string()), CredentialSource::Environment);
    }
    if let Some(value) = file_value
        && !value.trim().is_empty()
    {
        debug!("{} lu depuis le fichier de configuration", env_key);
        return (Some(value.trim().to_string()), CredentialSource::ConfigFile);
    }
    debug!("{} introuvable", env_key);
    (None, CredentialSource::Missing)
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNSET_KEY: &str = "SERRURE_MASTER_TEST_SURELY_UNSET_KEY";

    #[test]
    fn command_line_value_wins() {
        let (value, source) = resolve_credential(Some(" cli "), UNSET_KEY, Some("file"));
        assert_eq!(value.as_deref(), Some("cli"));
        assert_eq!(source, CredentialSource::CommandLine);
    }

    #[test]
    fn blank_values_fall_through_to_the_file() {
        let (value, source) = resolve_credential(Some("  "), UNSET_KEY, Some("file"));
        assert_eq!(value.as_deref(), Some("file"));
        assert_eq!(source, CredentialSource::ConfigFile);

        let (value, source) = resolve_credential(None, UNSET_KEY, Some(""));
        assert_eq!(value, None);
        assert_eq!(source, CredentialSource::Missing);
    }

    #[test]
    fn config_file_is_created_then_reused() {
        let dir = tempfile::tempdir().unwrap();
        let home = dir.path().join("home");
        let created = load_or_create_external_config(&home).unwrap();
        assert!(created.backend.url.is_none());
        assert!(home.join(constants::CONFIG_FILE_NAME).is_file());

        save_backend_credentials(&home, "https://x.supabase.co", "anon").unwrap();
        let reloaded = load_or_create_external_config(&home).unwrap();
        assert_eq!(reloaded.backend.url.as_deref(), Some("https://x.supabase.co"));
        assert_eq!(reloaded.backend.anon_key.as_deref(), Some("anon"));
    }
}
