use std::net::IpAddr;
use std::path::PathBuf;

use ipnet::IpNet;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub storage: StorageConfig,
    pub id_scheme: IdScheme,
    pub max_body_size: usize,
    pub trusted_proxies: Vec<IpNet>,
    pub log_level: String,
    pub smtp: Option<SmtpConfig>,
    pub notify_email: Option<String>,
}

#[derive(Debug, Clone)]
pub enum StorageConfig {
    Filesystem { root: PathBuf },
    Blob { base_url: String, token: String },
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IdScheme {
    Uuid,
    Base36,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let host: IpAddr = env_or("FORMBOX_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid FORMBOX_HOST: {e}"))?;

        let port: u16 = env_or("FORMBOX_PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid FORMBOX_PORT: {e}"))?;

        let storage = match env_or("FORMBOX_STORAGE", "fs").as_str() {
            "fs" => StorageConfig::Filesystem {
                root: PathBuf::from(env_or("FORMBOX_DATA_DIR", "data/submissions")),
            },
            "blob" => StorageConfig::Blob {
                base_url: env_required("FORMBOX_BLOB_URL")?,
                token: env_required("FORMBOX_BLOB_TOKEN")?,
            },
            "memory" => StorageConfig::Memory,
            other => return Err(format!("Invalid FORMBOX_STORAGE: {other}")),
        };

        let id_scheme = match env_or("FORMBOX_ID_SCHEME", "uuid").as_str() {
            "uuid" => IdScheme::Uuid,
            "base36" => IdScheme::Base36,
            other => return Err(format!("Invalid FORMBOX_ID_SCHEME: {other}")),
        };

        let max_body_size: usize = env_or("FORMBOX_MAX_BODY_SIZE", "1048576")
            .parse()
            .map_err(|e| format!("Invalid FORMBOX_MAX_BODY_SIZE: {e}"))?;

        let trusted_proxies: Vec<IpNet> = env_or("FORMBOX_TRUSTED_PROXIES", "")
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                s.trim()
                    .parse()
                    .map_err(|e| format!("Invalid FORMBOX_TRUSTED_PROXIES entry '{s}': {e}"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let log_level = env_or("FORMBOX_LOG_LEVEL", "info");

        let smtp = match (
            std::env::var("FORMBOX_SMTP_HOST").ok(),
            std::env::var("FORMBOX_SMTP_PORT").ok(),
            std::env::var("FORMBOX_SMTP_USER").ok(),
            std::env::var("FORMBOX_SMTP_PASS").ok(),
            std::env::var("FORMBOX_SMTP_FROM").ok(),
        ) {
            (Some(host), Some(port), Some(user), Some(pass), Some(from)) => Some(SmtpConfig {
                host,
                port: port
                    .parse()
                    .map_err(|e| format!("Invalid FORMBOX_SMTP_PORT: {e}"))?,
                user,
                pass,
                from,
            }),
            _ => None,
        };

        let notify_email = std::env::var("FORMBOX_NOTIFY_EMAIL")
            .ok()
            .filter(|s| !s.trim().is_empty());

        Ok(Config {
            host,
            port,
            storage,
            id_scheme,
            max_body_size,
            trusted_proxies,
            log_level,
            smtp,
            notify_email,
        })
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
