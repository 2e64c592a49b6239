use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/portal";
const DEFAULT_UPLOAD_DIR: &str = "./uploads";
const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:3001";
const DEFAULT_SESSION_TTL_HOURS: i64 = 12;
/// Longest session lifetime accepted, thirty days.
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 30;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
const DEFAULT_UPLOAD_RETRIES: u32 = 3;
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

/// Credentials for the admin account created at startup when missing.
#[derive(Debug, Clone)]
pub struct AdminBootstrap {
    pub username: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub storage_backend: StorageBackend,
    pub bind_addr: SocketAddr,
    pub upload_dir: PathBuf,
    pub public_base_url: String,
    pub session_ttl_hours: i64,
    pub max_upload_bytes: usize,
    pub upload_retries: u32,
    pub menu_config_path: Option<PathBuf>,
    pub admin: Option<AdminBootstrap>,
    pub cors_allowed_origins: String,
    pub production: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let admin = match (lookup("ADMIN_USERNAME"), lookup("ADMIN_PASSWORD")) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Some(AdminBootstrap {
                    full_name: lookup("ADMIN_FULL_NAME").unwrap_or_else(|| username.clone()),
                    username,
                    password,
                })
            }
            _ => None,
        };

        Self {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            storage_backend: parse_or(&lookup, "STORAGE_BACKEND", StorageBackend::Postgres),
            bind_addr: parse_or(&lookup, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3001))),
            upload_dir: lookup("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR)),
            public_base_url: lookup("PUBLIC_BASE_URL")
                .unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            session_ttl_hours: session_ttl_hours(parse_or(
                &lookup,
                "SESSION_TTL_HOURS",
                DEFAULT_SESSION_TTL_HOURS,
            )),
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
            upload_retries: parse_or(&lookup, "UPLOAD_RETRIES", DEFAULT_UPLOAD_RETRIES).max(1),
            menu_config_path: lookup("MENU_CONFIG_PATH")
                .filter(|path| !path.is_empty())
                .map(PathBuf::from),
            admin,
            cors_allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_string()),
            production: lookup("RUST_ENV")
                .map(|v| v.to_lowercase() == "production")
                .unwrap_or(false),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn session_ttl_hours(requested: i64) -> i64 {
    let hours = requested.clamp(1, MAX_SESSION_TTL_HOURS);
    if hours != requested {
        tracing::warn!(
            "Config: SESSION_TTL_HOURS={} out of range, using {}",
            requested,
            hours
        );
    }
    hours
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Debug,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Config: invalid {}='{}', using {:?}", key, raw, default);
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.storage_backend, StorageBackend::Postgres);
        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:3001");
        assert_eq!(config.session_ttl_hours, DEFAULT_SESSION_TTL_HOURS);
        assert_eq!(config.upload_retries, DEFAULT_UPLOAD_RETRIES);
        assert!(config.admin.is_none());
        assert!(!config.production);
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = Config::from_lookup(lookup_from(&[
            ("SESSION_TTL_HOURS", "soon"),
            ("MAX_UPLOAD_BYTES", "-1"),
            ("STORAGE_BACKEND", "Memory"),
        ]));
        assert_eq!(config.session_ttl_hours, DEFAULT_SESSION_TTL_HOURS);
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert_eq!(config.storage_backend, StorageBackend::Memory);
    }

    #[test]
    fn test_session_ttl_is_clamped() {
        let config = Config::from_lookup(lookup_from(&[(
            "SESSION_TTL_HOURS",
            "9223372036854775807",
        )]));
        assert_eq!(config.session_ttl_hours, MAX_SESSION_TTL_HOURS);

        let config = Config::from_lookup(lookup_from(&[("SESSION_TTL_HOURS", "0")]));
        assert_eq!(config.session_ttl_hours, 1);

        let config = Config::from_lookup(lookup_from(&[("SESSION_TTL_HOURS", "48")]));
        assert_eq!(config.session_ttl_hours, 48);
    }

    #[test]
    fn test_admin_bootstrap_requires_both_credentials() {
        let config = Config::from_lookup(lookup_from(&[("ADMIN_USERNAME", "root")]));
        assert!(config.admin.is_none());

        let config = Config::from_lookup(lookup_from(&[
            ("ADMIN_USERNAME", "root"),
            ("ADMIN_PASSWORD", "correct horse"),
            ("PUBLIC_BASE_URL", "https://portal.example.com/"),
        ]));
        let admin = config.admin.unwrap();
        assert_eq!(admin.full_name, "root");
        assert_eq!(config.public_base_url, "https://portal.example.com");
    }
}
