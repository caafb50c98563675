use anyhow::{Context, Result, bail};
use clap::Parser;
use std::{env, fmt};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_file: String,
    pub secret_key: String,
    pub storage: StorageConfig,
}

/// Object storage (Cloudflare R2 / S3-compatible) settings.
///
/// Values are kept raw here; `ObjectStorageService` validates them when it is
/// constructed.
#[derive(Clone, Default)]
pub struct StorageConfig {
    pub account_id: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub bucket_name: Option<String>,
    pub public_base_url: Option<String>,
    pub endpoint_url: Option<String>,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Document question-answering API")]
pub struct Args {
    /// Host to bind to (overrides HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Log level filter, e.g. `info` or `debug` (overrides LOG_LEVEL)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path of the log file (overrides LOG_FILE)
    #[arg(long)]
    pub log_file: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        let args = Args::parse();
        Self::resolve(args, |name| env::var(name).ok())
    }

    /// Merge CLI args over values looked up through `lookup`, falling back to defaults.
    pub fn resolve(args: Args, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let env_port = match var("PORT") {
            Some(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing PORT value `{}`", value))?,
            None => 8000,
        };

        let Some(secret_key) = var("SECRET_KEY") else {
            bail!("SECRET_KEY must be set");
        };

        let storage = StorageConfig {
            account_id: var("R2_ACCOUNT_ID"),
            access_key_id: var("R2_ACCESS_KEY_ID"),
            secret_access_key: var("R2_SECRET_ACCESS_KEY"),
            bucket_name: var("R2_BUCKET_NAME"),
            public_base_url: var("R2_PUBLIC_BASE_URL"),
            endpoint_url: var("R2_ENDPOINT_URL"),
        };

        Ok(Self {
            app_name: var("APP_NAME").unwrap_or_else(|| "Nexus RAG API".into()),
            host: args
                .host
                .or_else(|| var("HOST"))
                .unwrap_or_else(|| "0.0.0.0".into()),
            port: args.port.unwrap_or(env_port),
            log_level: args
                .log_level
                .or_else(|| var("LOG_LEVEL"))
                .unwrap_or_else(|| "info".into())
                .to_ascii_lowercase(),
            log_file: args
                .log_file
                .or_else(|| var("LOG_FILE"))
                .unwrap_or_else(|| "./logs/app.log".into()),
            secret_key,
            storage,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// Secrets are redacted so the config can be logged at startup.
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("app_name", &self.app_name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .field("log_file", &self.log_file)
            .field("secret_key", &"<redacted>")
            .field("storage", &self.storage)
            .finish()
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("account_id", &self.account_id)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .field("bucket_name", &self.bucket_name)
            .field("public_base_url", &self.public_base_url)
            .field("endpoint_url", &self.endpoint_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let cfg = AppConfig::resolve(Args::default(), env_of(&[("SECRET_KEY", "s3cr3t")])).unwrap();

        assert_eq!(cfg.app_name, "Nexus RAG API");
        assert_eq!(cfg.addr(), "0.0.0.0:8000");
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.log_file, "./logs/app.log");
        assert!(cfg.storage.bucket_name.is_none());
    }

    #[test]
    fn cli_args_override_environment() {
        let args = Args {
            host: Some("127.0.0.1".into()),
            port: Some(9001),
            log_level: None,
            log_file: None,
        };
        let cfg = AppConfig::resolve(
            args,
            env_of(&[
                ("SECRET_KEY", "k"),
                ("HOST", "10.0.0.1"),
                ("PORT", "7000"),
                ("LOG_LEVEL", "DEBUG"),
            ]),
        )
        .unwrap();

        assert_eq!(cfg.addr(), "127.0.0.1:9001");
        assert_eq!(cfg.log_level, "debug");
    }

    #[test]
    fn missing_secret_key_is_an_error() {
        let err = AppConfig::resolve(Args::default(), env_of(&[])).unwrap_err();
        assert!(err.to_string().contains("SECRET_KEY"));
    }

    #[test]
    fn invalid_port_reports_value() {
        let err = AppConfig::resolve(
            Args::default(),
            env_of(&[("SECRET_KEY", "k"), ("PORT", "eighty")]),
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("eighty"));
    }

    #[test]
    fn storage_settings_are_read_and_blank_values_ignored() {
        let cfg = AppConfig::resolve(
            Args::default(),
            env_of(&[
                ("SECRET_KEY", "k"),
                ("R2_ACCOUNT_ID", "acct"),
                ("R2_BUCKET_NAME", "docs"),
                ("R2_ENDPOINT_URL", "   "),
            ]),
        )
        .unwrap();

        assert_eq!(cfg.storage.account_id.as_deref(), Some("acct"));
        assert_eq!(cfg.storage.bucket_name.as_deref(), Some("docs"));
        assert!(cfg.storage.endpoint_url.is_none());
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let cfg = AppConfig::resolve(
            Args::default(),
            env_of(&[("SECRET_KEY", "topsecret"), ("R2_SECRET_ACCESS_KEY", "hidden")]),
        )
        .unwrap();
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("topsecret"));
        assert!(!rendered.contains("hidden"));
    }
}
