// src/logger.rs

use crate::{cli::LogLevel, config::credentials, constants};
use log::{LevelFilter, warn};
use std::path::{Path, PathBuf};

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn log_file_path(home: Option<&Path>) -> PathBuf {
    match credentials::resolve_home_dir(home) {
        Ok(dir) => dir.join(constants::LOG_FILE_NAME),
        Err(_) => {
            eprintln!("Attention: dossier personnel introuvable, journal écrit dans le dossier temporaire.");
            std::env::temp_dir()
                .join(clap::crate_name!())
                .join(constants::LOG_FILE_NAME)
        }
    }
}

/// File-only logging; nothing is written to the terminal so the command output stays clean.
pub fn init_logger(level: LogLevel, home: Option<&Path>) {
    if level == LogLevel::Off {
        return;
    }

    let path = log_file_path(home);
    if let Some(dir) = path.parent()
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!("Attention: impossible de créer {:?}: {}", dir, e);
    }

    let file = match fern::log_file(&path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Attention: journal {:?} inaccessible ({}), fichier de secours utilisé.", path, e);
            let fallback = std::env::temp_dir().join(format!(
                "{}-{}",
                clap::crate_name!(),
                constants::LOG_FALLBACK_FILE_NAME
            ));
            match fern::log_file(&fallback) {
                Ok(file) => {
                    warn!("Journal redirigé vers {:?}", fallback);
                    file
                }
                Err(e) => {
                    eprintln!("Erreur: aucun fichier journal utilisable ({}).", e);
                    return;
                }
            }
        }
    };

    let result = fern::Dispatch::new()
        .level(level.into())
        // reqwest and its pool are noisy at debug
        .level_for("hyper_util", LevelFilter::Warn)
        .level_for("reqwest", LevelFilter::Info)
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}] [{:<5}] [{}:{}] - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.line().unwrap_or(0),
                message
            ))
        })
        .chain(file)
        .apply();

    if let Err(e) = result {
        eprintln!("Attention: initialisation du journal impossible: {}", e);
    }
}
