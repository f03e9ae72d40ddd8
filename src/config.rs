// Runtime configuration for kota
// Reads from environment variables with sensible defaults

use std::env;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::warn;

/// Global configuration instance
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database read pool size (KOTA_POOL_SIZE)
    pub pool_size: u32,

    /// Database read pool minimum idle connections (KOTA_POOL_MIN_IDLE)
    pub pool_min_idle: u32,

    /// Resolution worker threads, 0 = one per core (KOTA_WORKERS)
    pub workers: usize,

    /// Sources larger than this are recorded as skipped (KOTA_MAX_FILE_SIZE_MB)
    pub max_file_size_mb: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pool_size: 4,
            pool_min_idle: 1,
            workers: 0,
            max_file_size_mb: 10,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Self {
        let mut config = Config::default();
        read_var("KOTA_POOL_SIZE", &mut config.pool_size);
        read_var("KOTA_POOL_MIN_IDLE", &mut config.pool_min_idle);
        read_var("KOTA_WORKERS", &mut config.workers);
        read_var("KOTA_MAX_FILE_SIZE_MB", &mut config.max_file_size_mb);
        config
    }

    /// Get the global configuration instance
    pub fn get() -> &'static Config {
        CONFIG.get_or_init(Config::from_env)
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}

fn read_var<T>(name: &str, slot: &mut T)
where
    T: FromStr + std::fmt::Display,
{
    let Ok(val) = env::var(name) else {
        return;
    };
    match val.parse() {
        Ok(parsed) => *slot = parsed,
        Err(_) => warn!("invalid {name} value: {val}, using default: {slot}"),
    }
}
