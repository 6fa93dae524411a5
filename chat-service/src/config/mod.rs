use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_ARCHIVE_PREFIX: &str = "chat-logs/";

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub common: core_config::Config,
    pub gemini: GeminiSettings,
    pub archive: ArchiveConfig,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    /// Missing keys are reported per request, not at startup.
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    pub backend: ArchiveBackend,
    /// Archival is disabled when no bucket is configured.
    pub bucket: Option<String>,
    pub prefix: String,
    pub local_path: String,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveBackend {
    Local,
    S3,
}

impl ChatConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common_config = core_config::Config::load()?;

        Ok(ChatConfig {
            common: common_config,
            gemini: GeminiSettings {
                api_key: get_optional_env("GEMINI_API_KEY"),
                model: get_env_or("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
                api_base: get_env_or("GEMINI_API_BASE", DEFAULT_GEMINI_API_BASE),
            },
            archive: ArchiveConfig {
                backend: get_env_or("ARCHIVE_BACKEND", "s3")
                    .parse()
                    .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?,
                bucket: get_optional_env("S3_BUCKET_NAME"),
                prefix: get_env_or("ARCHIVE_PREFIX", DEFAULT_ARCHIVE_PREFIX),
                local_path: get_env_or("ARCHIVE_LOCAL_PATH", "archive"),
                region: get_optional_env("AWS_REGION"),
                endpoint_url: get_optional_env("S3_ENDPOINT_URL"),
            },
            otlp_endpoint: get_optional_env("OTLP_ENDPOINT"),
        })
    }
}

impl std::str::FromStr for ArchiveBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(ArchiveBackend::Local),
            "s3" => Ok(ArchiveBackend::S3),
            _ => Err(format!("Invalid archive backend: {}", s)),
        }
    }
}

/// Every setting has a default except the credential and the bucket, which
/// stay optional in every environment.
fn get_env_or(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Empty values count as unset, so `S3_BUCKET_NAME=` disables archival.
fn get_optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_case_insensitively() {
        assert_eq!("S3".parse::<ArchiveBackend>(), Ok(ArchiveBackend::S3));
        assert_eq!("local".parse::<ArchiveBackend>(), Ok(ArchiveBackend::Local));
        assert!("gcs".parse::<ArchiveBackend>().is_err());
    }

    #[test]
    fn prod_loads_with_only_credential_and_bucket() {
        for key in [
            "GEMINI_MODEL",
            "GEMINI_API_BASE",
            "ARCHIVE_BACKEND",
            "ARCHIVE_PREFIX",
            "ARCHIVE_LOCAL_PATH",
        ] {
            env::remove_var(key);
        }
        env::set_var("ENVIRONMENT", "prod");
        env::set_var("GEMINI_API_KEY", "k");
        env::set_var("S3_BUCKET_NAME", "b");

        let config = ChatConfig::load();

        for key in ["ENVIRONMENT", "GEMINI_API_KEY", "S3_BUCKET_NAME"] {
            env::remove_var(key);
        }
        let config = config.expect("prod config should load");
        assert_eq!(config.gemini.api_key.as_deref(), Some("k"));
        assert_eq!(config.gemini.model, DEFAULT_GEMINI_MODEL);
        assert_eq!(config.gemini.api_base, DEFAULT_GEMINI_API_BASE);
        assert_eq!(config.archive.backend, ArchiveBackend::S3);
        assert_eq!(config.archive.bucket.as_deref(), Some("b"));
        assert_eq!(config.archive.prefix, DEFAULT_ARCHIVE_PREFIX);
    }
}
