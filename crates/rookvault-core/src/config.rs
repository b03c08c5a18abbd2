//! Configuration module
//!
//! Transfer Service configuration, read from the environment (and `.env` when present).

use std::env;
use std::path::PathBuf;

const SERVER_PORT: u16 = 9080;
const WORK_DIR: &str = "/tmp/backup";
const RBD_PATH: &str = "rbd";
const OBJECT_STORE_CLI: &str = "aws";
const HTTP_CONCURRENCY_LIMIT: usize = 64;

/// Transfer Service configuration
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub server_port: u16,
    pub environment: String,
    /// Root of the local working area, partitioned as `{work_dir}/{tag}/{pool}/{image}`.
    pub work_dir: PathBuf,
    /// Cluster CLI used for export, import and image listings.
    pub rbd_path: String,
    /// Object-store CLI used for upload, download, delete and listings.
    pub object_store_cli: String,
    /// Cluster session bootstrap script, run once at startup when set.
    pub toolbox_path: Option<String>,
    pub http_concurrency_limit: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            server_port: SERVER_PORT,
            environment: "development".to_string(),
            work_dir: PathBuf::from(WORK_DIR),
            rbd_path: RBD_PATH.to_string(),
            object_store_cli: OBJECT_STORE_CLI.to_string(),
            toolbox_path: None,
            http_concurrency_limit: HTTP_CONCURRENCY_LIMIT,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let server_port = match env::var("SERVER_PORT") {
            Ok(port) => port
                .parse::<u16>()
                .map_err(|e| anyhow::anyhow!("SERVER_PORT must be a port number: {}", e))?,
            Err(_) => SERVER_PORT,
        };

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let work_dir = env::var("WORK_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(WORK_DIR));

        let rbd_path = env::var("RBD_PATH").unwrap_or_else(|_| RBD_PATH.to_string());
        let object_store_cli =
            env::var("OBJECT_STORE_CLI").unwrap_or_else(|_| OBJECT_STORE_CLI.to_string());

        let toolbox_path = env::var("TOOLBOX_PATH")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let http_concurrency_limit = env::var("HTTP_CONCURRENCY_LIMIT")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(HTTP_CONCURRENCY_LIMIT);

        Ok(Self {
            server_port,
            environment,
            work_dir,
            rbd_path,
            object_store_cli,
            toolbox_path,
            http_concurrency_limit,
        })
    }

    /// Check if the service is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.server_port == 0 {
            return Err(anyhow::anyhow!("SERVER_PORT cannot be 0"));
        }

        if !self.work_dir.is_absolute() {
            return Err(anyhow::anyhow!(
                "WORK_DIR must be an absolute path, got {}",
                self.work_dir.display()
            ));
        }

        if self.rbd_path.trim().is_empty() {
            return Err(anyhow::anyhow!("RBD_PATH cannot be empty"));
        }

        if self.object_store_cli.trim().is_empty() {
            return Err(anyhow::anyhow!("OBJECT_STORE_CLI cannot be empty"));
        }

        if self.http_concurrency_limit == 0 {
            return Err(anyhow::anyhow!("HTTP_CONCURRENCY_LIMIT cannot be 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ServiceConfig::default();
        assert_eq!(config.server_port, 9080);
        assert_eq!(config.work_dir, PathBuf::from("/tmp/backup"));
        assert!(config.validate().is_ok());
        assert!(!config.is_production());
    }

    #[test]
    fn validate_rejects_relative_work_dir() {
        let config = ServiceConfig {
            work_dir: PathBuf::from("backup"),
            ..ServiceConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("WORK_DIR"));
    }

    #[test]
    fn validate_rejects_empty_tools() {
        let config = ServiceConfig {
            rbd_path: " ".to_string(),
            ..ServiceConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ServiceConfig {
            object_store_cli: String::new(),
            ..ServiceConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn production_detection() {
        let config = ServiceConfig {
            environment: "Prod".to_string(),
            ..ServiceConfig::default()
        };
        assert!(config.is_production());
    }
}
