use crate::directory::RoomDirectory;
use crate::ws::registry::RoomRegistry;
use anyhow::{bail, Context};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: String,
    pub environment: String,
    pub allowed_origins: Vec<String>,
    pub jwt_secret: String,
    /// Room directory database. `None` keeps rooms in memory.
    pub database_url: Option<String>,
    pub signaling: SignalingConfig,
}

/// Per-connection pump settings
#[derive(Clone, Debug)]
pub struct SignalingConfig {
    /// Capacity of each peer's outbound queue
    pub queue_capacity: usize,
    /// Keepalive ping period; must be shorter than `read_timeout`
    pub ping_interval: Duration,
    /// Longest silence tolerated from a peer, pongs included
    pub read_timeout: Duration,
    pub write_timeout: Duration,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            ping_interval: Duration::from_secs(54),
            read_timeout: Duration::from_secs(60),
            write_timeout: Duration::from_secs(10),
        }
    }
}

impl SignalingConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.queue_capacity == 0 {
            bail!("signaling queue capacity must be at least 1");
        }
        if self.ping_interval.is_zero() {
            bail!("ping interval must be greater than zero");
        }
        if self.write_timeout.is_zero() {
            bail!("write timeout must be greater than zero");
        }
        if self.ping_interval >= self.read_timeout {
            bail!(
                "ping interval ({:?}) must be shorter than the read timeout ({:?})",
                self.ping_interval,
                self.read_timeout
            );
        }
        Ok(())
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let bind_address = match std::env::var("BIND_ADDRESS") {
            Ok(addr) => addr,
            Err(_) => std::env::var("PORT")
                .map(|port| format!("0.0.0.0:{}", port))
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        };

        let environment =
            std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string())
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect();

        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set, using default (insecure for production!)");
            "dev-secret-change-in-production".to_string()
        });

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.is_empty());

        let defaults = SignalingConfig::default();
        let signaling = SignalingConfig {
            queue_capacity: env_or("SIGNAL_QUEUE_CAPACITY", defaults.queue_capacity)?,
            ping_interval: Duration::from_secs(env_or(
                "SIGNAL_PING_INTERVAL_SECS",
                defaults.ping_interval.as_secs(),
            )?),
            read_timeout: Duration::from_secs(env_or(
                "SIGNAL_READ_TIMEOUT_SECS",
                defaults.read_timeout.as_secs(),
            )?),
            write_timeout: Duration::from_secs(env_or(
                "SIGNAL_WRITE_TIMEOUT_SECS",
                defaults.write_timeout.as_secs(),
            )?),
        };
        signaling.validate()?;

        Ok(Config {
            bind_address,
            environment,
            allowed_origins,
            jwt_secret,
            database_url,
            signaling,
        })
    }
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<RoomRegistry>,
    pub directory: Arc<dyn RoomDirectory>,
}

impl AppState {
    pub fn new(config: Config, directory: Arc<dyn RoomDirectory>) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(RoomRegistry::new()),
            directory,
        }
    }
}
