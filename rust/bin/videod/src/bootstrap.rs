//! First-start checks.

use crate::config::ServerConfig;

/// Refuse to start on a configuration that cannot work.
pub fn verify_config(config: &ServerConfig) -> anyhow::Result<()> {
    if config.jwt.secret.is_empty() {
        anyhow::bail!("JWT secret is empty in configuration.");
    }
    if config.storage.data_dir.is_empty() {
        anyhow::bail!("Storage data_dir is empty in configuration.");
    }
    if config.authority.base_url.trim().is_empty() {
        anyhow::bail!("Classification authority base_url is empty in configuration.");
    }
    if config.classification.expiration_days < 0 {
        anyhow::bail!("Classification expiration_days must not be negative.");
    }
    if config.classification.eviction_interval_secs == 0 {
        anyhow::bail!("Classification eviction_interval_secs must be positive.");
    }
    Ok(())
}
