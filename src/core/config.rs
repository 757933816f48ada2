//! Process-wide configuration
//!
//! Configuration is loaded once (usually from a TOML file) and installed
//! before the first instance is created. After that it is read-only.
//!
//! ```toml
//! default_block_size = 8192
//! max_block_size = 1048576
//! audit_overflow = "reject"
//! default_fs_type = "virtual_disk"
//! ```

use crate::error::{Result, TyfsError};
use crate::geometry::{is_valid_block_size, BLOCK_BASE_SIZE};
use crate::instance::FsType;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use tracing::{info, warn};

/// What a segment audit log does when a record arrives at full capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOverflowPolicy {
    /// Refuse the record; the paired allocation or free is rolled back
    #[default]
    Reject,
    /// Drop the oldest record to make room
    EvictOldest,
}

/// TYFS configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TyfsConfig {
    /// Block size used by builders that don't set one
    pub default_block_size: u32,

    /// Largest block size accepted at instance construction
    pub max_block_size: u32,

    /// Overflow behaviour of newly created segment audit logs
    pub audit_overflow: AuditOverflowPolicy,

    /// File system type used by builders that don't set one
    pub default_fs_type: FsType,
}

impl Default for TyfsConfig {
    fn default() -> Self {
        TyfsConfig {
            default_block_size: BLOCK_BASE_SIZE,
            max_block_size: 1 << 24,
            audit_overflow: AuditOverflowPolicy::Reject,
            default_fs_type: FsType::VirtualDisk,
        }
    }
}

impl TyfsConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: TyfsConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&text)?;
        info!("Loaded TYFS config from {:?}", path.as_ref());
        Ok(config)
    }

    /// Serialize to a TOML document
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| TyfsError::InvalidConfiguration(e.to_string()))
    }

    /// Check block size settings against the geometry rules
    pub fn validate(&self) -> Result<()> {
        if !is_valid_block_size(self.max_block_size) {
            return Err(TyfsError::InvalidConfiguration(format!(
                "max_block_size {} is not 4096 * 2^k",
                self.max_block_size
            )));
        }

        if !is_valid_block_size(self.default_block_size) {
            return Err(TyfsError::InvalidConfiguration(format!(
                "default_block_size {} is not 4096 * 2^k",
                self.default_block_size
            )));
        }

        if self.default_block_size > self.max_block_size {
            return Err(TyfsError::InvalidConfiguration(format!(
                "default_block_size {} exceeds max_block_size {}",
                self.default_block_size, self.max_block_size
            )));
        }

        Ok(())
    }
}

static GLOBAL: OnceLock<TyfsConfig> = OnceLock::new();

/// Install the process-wide configuration
///
/// Only the first call takes effect. Returns `false` when a configuration was
/// already installed (or the defaults were already read through [`global`]).
pub fn install(config: TyfsConfig) -> Result<bool> {
    config.validate()?;
    let installed = GLOBAL.set(config).is_ok();
    if !installed {
        warn!("TYFS config already initialized, ignoring new config");
    }
    Ok(installed)
}

/// Process-wide configuration, defaults if none was installed
pub fn global() -> &'static TyfsConfig {
    GLOBAL.get_or_init(TyfsConfig::default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = TyfsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.audit_overflow, AuditOverflowPolicy::Reject);
    }

    #[test]
    fn test_parse_toml() {
        let config = TyfsConfig::from_toml_str(
            r#"
            default_block_size = 8192
            audit_overflow = "evict_oldest"
            default_fs_type = "sql_database"
            "#,
        )
        .unwrap();

        assert_eq!(config.default_block_size, 8192);
        assert_eq!(config.audit_overflow, AuditOverflowPolicy::EvictOldest);
        assert_eq!(config.default_fs_type, FsType::SqlDatabase);
        // Unset keys fall back to defaults
        assert_eq!(config.max_block_size, 1 << 24);
    }

    #[test]
    fn test_reject_bad_block_size() {
        let result = TyfsConfig::from_toml_str("default_block_size = 6144");
        assert!(matches!(result, Err(TyfsError::InvalidConfiguration(_))));

        let result = TyfsConfig::from_toml_str(
            "default_block_size = 65536\nmax_block_size = 8192",
        );
        assert!(matches!(result, Err(TyfsError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_reject_malformed_toml() {
        let result = TyfsConfig::from_toml_str("default_block_size = \"big\"");
        assert!(matches!(result, Err(TyfsError::ConfigParse(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "audit_overflow = \"evict_oldest\"").unwrap();

        let config = TyfsConfig::load(file.path()).unwrap();
        assert_eq!(config.audit_overflow, AuditOverflowPolicy::EvictOldest);
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = TyfsConfig {
            default_block_size: 16384,
            ..TyfsConfig::default()
        };

        let text = config.to_toml_string().unwrap();
        let parsed = TyfsConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_global_defaults() {
        assert!(global().validate().is_ok());
    }
}
