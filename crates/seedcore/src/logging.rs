//! Logging initialization and configuration checking
//!
//! This module provides:
//! - Logger initialization (console + optional file)
//! - Startup diagnostics for the loaded configuration

use secrecy::ExposeSecret;
use simplelog::{ColorChoice, CombinedLogger, Config as LogConfig, LevelFilter, SharedLogger, TermLogger, TerminalMode, WriteLogger};
use std::fs::File;

use crate::config::{redact, Config};
use crate::error::{AppError, AppResult};

/// Initialize logger for console output and, when a path is given, a log file
///
/// # Arguments
/// * `log_file_path` - Optional path to the log file
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(AppError)` - Failed to create the log file or a logger is already installed
pub fn init_logger(log_file_path: Option<&str>) -> AppResult<()> {
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        LevelFilter::Info,
        LogConfig::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];

    if let Some(path) = log_file_path {
        let log_file = File::create(path)?;
        loggers.push(WriteLogger::new(LevelFilter::Info, LogConfig::default(), log_file));
    }

    CombinedLogger::init(loggers).map_err(|e| AppError::Logger(format!("Failed to initialize logger: {}", e)))?;

    Ok(())
}

/// Logs the effective configuration at application startup
///
/// Secrets are reduced to their length so a wrong token is still spottable.
pub fn log_configuration(config: &Config) {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("⚙️  SeedNote API configuration");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    for line in configuration_summary(config) {
        log::info!("{}", line);
    }

    if config.init_data_max_age.is_none() {
        log::warn!("⚠️  INIT_DATA_MAX_AGE_SECS=0: init data never expires");
    }
    if config.uses_local_bot_api() {
        log::info!("Local Bot API server detected, relaying through it");
    }
}

/// Human-readable configuration lines, secrets redacted.
pub fn configuration_summary(config: &Config) -> Vec<String> {
    vec![
        format!("BOT_TOKEN: {}", redact(config.bot_token.expose_secret())),
        format!("SUPABASE_URL: {}", config.supabase_url),
        format!(
            "SUPABASE_SERVICE_KEY: {}",
            redact(config.supabase_service_key.expose_secret())
        ),
        format!("STORAGE_BUCKET: {}", config.storage_bucket),
        format!("Listen address: {}", config.bind_addr),
        format!("Request timeout: {}s", config.request_timeout.as_secs()),
        format!("Lookup timeout: {}s", config.lookup_timeout.as_secs()),
        match config.init_data_max_age {
            Some(max_age) => format!("Init data max age: {}s", max_age.as_secs()),
            None => "Init data max age: disabled".to_string(),
        },
        match &config.bot_api_url {
            Some(url) => format!("BOT_API_URL: {}", url),
            None => "BOT_API_URL: https://api.telegram.org (default)".to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::NamedTempFile;

    fn test_config() -> Config {
        Config::from_lookup(|key| match key {
            "BOT_TOKEN" => Some("123456:SECRET".to_string()),
            "SUPABASE_URL" => Some("https://project.supabase.co".to_string()),
            "SUPABASE_SERVICE_KEY" => Some("service-role-key".to_string()),
            _ => None,
        })
        .unwrap()
    }

    #[test]
    fn test_init_logger_creates_log_file() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_str().unwrap();

        // A logger may already be installed by another test in this binary,
        // so only the file side effect is asserted.
        let _ = init_logger(Some(path));

        assert!(temp_file.path().exists());
    }

    #[test]
    fn test_configuration_summary_redacts_secrets() {
        let summary = configuration_summary(&test_config()).join("\n");

        assert!(!summary.contains("123456:SECRET"));
        assert!(!summary.contains("service-role-key"));
        assert!(summary.contains("STORAGE_BUCKET: memo-files"));
        assert!(summary.contains("Init data max age: 86400s"));
    }
}
