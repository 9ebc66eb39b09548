//! Runtime configuration read from the environment (and `.env`, if present).

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

const DEV_JWT_SECRET: &str = "development-only-secret-change-me";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Relational database through sea-orm.
    Sql,
    /// In-process document collections.
    Document,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sql" | "relational" | "postgres" | "sqlite" => Ok(StoreBackend::Sql),
            "document" | "memory" => Ok(StoreBackend::Document),
            other => anyhow::bail!("unknown STORE_BACKEND: {other}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: IpAddr,
    pub port: u16,
    pub store_backend: StoreBackend,
    pub database_url: String,
    /// Snapshot file of the document store; `None` keeps it in memory only.
    pub document_store_path: Option<PathBuf>,
    pub jwt_secret: String,
    pub token_ttl_hours: u64,
    /// Requests per minute per client IP on `/api`; `0` disables limiting.
    pub rate_limit_per_minute: u32,
    pub cors_origins: Vec<String>,
    pub environment: String,
    /// Load the sample companies, users and jobs at startup.
    pub seed_on_start: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
            store_backend: StoreBackend::Sql,
            database_url: "sqlite:./jobboard.sqlite?mode=rwc".to_string(),
            document_store_path: None,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_ttl_hours: 24 * 7,
            rate_limit_per_minute: 0,
            cors_origins: vec!["*".to_string()],
            environment: "development".to_string(),
            seed_on_start: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let environment = env_or("ENVIRONMENT", defaults.environment);
        let jwt_secret = match std::env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ if environment.eq_ignore_ascii_case("production") => {
                anyhow::bail!("JWT_SECRET must be set in production")
            }
            _ => {
                tracing::warn!("JWT_SECRET not set; using the development secret");
                defaults.jwt_secret
            }
        };

        Ok(Self {
            host: parsed_env("HOST")?.unwrap_or(defaults.host),
            port: parsed_env("PORT")?.unwrap_or(defaults.port),
            store_backend: parsed_env("STORE_BACKEND")?.unwrap_or(defaults.store_backend),
            database_url: env_or("DATABASE_URL", defaults.database_url),
            document_store_path: std::env::var("DOCUMENT_STORE_PATH").ok().map(PathBuf::from),
            jwt_secret,
            token_ttl_hours: parsed_env("TOKEN_TTL_HOURS")?.unwrap_or(defaults.token_ttl_hours),
            rate_limit_per_minute: parsed_env("RATE_LIMIT_PER_MINUTE")?.unwrap_or(60),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|o| o.trim().to_string()).filter(|o| !o.is_empty()).collect())
                .unwrap_or(defaults.cors_origins),
            environment,
            seed_on_start: parsed_env("SEED_ON_START")?.unwrap_or(defaults.seed_on_start),
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn parsed_env<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("invalid {key}={raw}: {e}")),
        Err(_) => Ok(None),
    }
}
