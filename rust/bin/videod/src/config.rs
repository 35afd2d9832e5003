//! Server-side configuration, loaded from a TOML file.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use catalog::service::authority::AuthorityConfig;
use catalog::service::cache::DEFAULT_EXPIRATION_DAYS;

/// Complete `videod` configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub storage: StorageConfig,
    pub jwt: JwtConfig,
    pub authority: AuthorityConfig,
    #[serde(default)]
    pub classification: ClassificationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the SQLite database and the redb cache.
    pub data_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// HMAC secret for verifying bearer tokens.
    pub secret: String,
    /// Role that marks a caller as sys-admin.
    #[serde(default = "default_sys_admin_role")]
    pub sys_admin_role: String,
}

fn default_sys_admin_role() -> String {
    "catalog:sysadmin".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    /// Days before a user's grants are fetched again.
    pub expiration_days: i64,
    /// Seconds between physical evictions of expired cache entries.
    pub eviction_interval_secs: u64,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            expiration_days: DEFAULT_EXPIRATION_DAYS,
            eviction_interval_secs: 3600,
        }
    }
}

impl ServerConfig {
    /// Resolve a context name or path to a config file path.
    ///
    /// Anything containing `/` or `.` is taken as a path; a bare name
    /// maps to `/etc/videod/<name>.toml`.
    pub fn resolve_path(name_or_path: &str) -> PathBuf {
        if name_or_path.contains('/') || name_or_path.contains('.') {
            PathBuf::from(name_or_path)
        } else {
            PathBuf::from(format!("/etc/videod/{}.toml", name_or_path))
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {}", path.display(), e))?;
        Ok(toml::from_str(&content)?)
    }
}
