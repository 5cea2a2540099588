use crate::diff::NodeIdentity;
use crate::error::ConfigError;
use crate::planner::{PlannerOptions, TieBreakPolicy};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_termination_reason() -> String {
    "migrated".to_string()
}

fn default_true() -> bool {
    true
}

/// Tunables of a migration attempt.
///
/// ```toml
/// tie-break = "reject"
/// identity = "element-type"
/// termination-reason = "migrated"
/// activate-after-migration = true
/// reactivate-on-abort = false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MigrationConfig {
    /// Policy when several active nodes changed at once.
    #[serde(default)]
    pub tie_break: TieBreakPolicy,
    /// Which attributes make two node versions equal.
    #[serde(default)]
    pub identity: NodeIdentity,
    /// Reason recorded on a case replaced by relocation.
    #[serde(default = "default_termination_reason")]
    pub termination_reason: String,
    /// Resume a case after it was migrated in place.
    #[serde(default = "default_true")]
    pub activate_after_migration: bool,
    /// Resume the origin case after an aborted attempt. Off by default, so the
    /// case stays suspended for inspection.
    #[serde(default)]
    pub reactivate_on_abort: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            tie_break: TieBreakPolicy::default(),
            identity: NodeIdentity::default(),
            termination_reason: default_termination_reason(),
            activate_after_migration: true,
            reactivate_on_abort: false,
        }
    }
}

impl MigrationConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn planner_options(&self) -> PlannerOptions {
        PlannerOptions {
            tie_break: self.tie_break,
            identity: self.identity,
        }
    }
}
