//! Configuration validation
//!
//! Validates critical configuration values at startup to catch misconfigurations early.

use anyhow::Result;
use rookvault_core::ServiceConfig;

/// Validate critical configuration values.
///
/// Returns the non-fatal warnings so the caller can log them once telemetry is up.
pub fn validate_config(config: &ServiceConfig) -> Result<Vec<&'static str>> {
    config.validate()?;

    let mut warnings = Vec::new();
    let env_var = std::env::var("ENVIRONMENT")
        .or_else(|_| std::env::var("APP_ENV"))
        .ok();

    if config.is_production() && env_var.is_none() {
        warnings.push(
            "Production mode detected but ENVIRONMENT/APP_ENV not set - error details may leak",
        );
    }

    if config.toolbox_path.is_none() {
        warnings.push("TOOLBOX_PATH not set - the cluster session must already be configured");
    }

    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn rejects_invalid_config() {
        let config = ServiceConfig {
            work_dir: PathBuf::from("relative"),
            ..ServiceConfig::default()
        };
        assert!(validate_config(&config).is_err());
        assert!(validate_config(&ServiceConfig::default()).is_ok());
    }

    #[test]
    fn missing_toolbox_is_reported_as_warning() {
        let warnings = validate_config(&ServiceConfig::default()).unwrap();
        assert!(warnings.iter().any(|w| w.starts_with("TOOLBOX_PATH not set")));

        let config = ServiceConfig {
            toolbox_path: Some("/usr/local/bin/toolbox.sh".to_string()),
            ..ServiceConfig::default()
        };
        let warnings = validate_config(&config).unwrap();
        assert!(!warnings.iter().any(|w| w.starts_with("TOOLBOX_PATH")));
    }
}
