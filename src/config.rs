//! Ambient configuration (SPEC_FULL.md §10.3), loaded the way the original
//! service loaded its `host`/`port`/`log_level`: defaults set on a
//! `config::Config` builder, then overridden by `VANITY_`-prefixed
//! environment variables (and a `.env` file, via `dotenv`).

use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    pub worker_count: u32,
    pub batch_size: u32,
    pub shutdown_timeout_ms: u64,
    pub stats_window_ms: u64,
    pub scrypt_memory_budget_mb: u64,
    pub estimated_single_thread_speed: f64,
    pub kdf: String,
    pub output_dir: String,
    pub log_level: String,
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let default_workers = std::thread::available_parallelism().map(|n| n.get() as i64).unwrap_or(4);

        let cfg = config::Config::builder()
            .set_default("worker_count", default_workers)?
            .set_default("batch_size", 1000)?
            .set_default("shutdown_timeout_ms", 30000)?
            .set_default("stats_window_ms", 500)?
            .set_default("scrypt_memory_budget_mb", 2048)?
            .set_default("estimated_single_thread_speed", 50_000.0)?
            .set_default("kdf", "scrypt")?
            .set_default("output_dir", "./keystores")?
            .set_default("log_level", "info")?
            .add_source(config::Environment::with_prefix("VANITY"))
            .build()?;

        cfg.try_deserialize()
    }

    pub fn shutdown_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.shutdown_timeout_ms)
    }

    pub fn stats_window(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.stats_window_ms)
    }

    pub fn scrypt_memory_budget_bytes(&self) -> u64 {
        self.scrypt_memory_budget_mb * 1024 * 1024
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_without_any_env_vars() {
        let cfg = EngineConfig::from_env().unwrap();
        assert!(cfg.worker_count >= 1);
        assert_eq!(cfg.kdf, "scrypt");
        assert_eq!(cfg.shutdown_timeout(), std::time::Duration::from_millis(30000));
    }
}
