//! Configuration management for the toolbox
//!
//! Gathers per-component options in one place and reads overrides from
//! the environment.

use crate::{
    core::{humanize::HumanizeConfig, procman::ProcessQuery, pypi::PypiConfig, timer::TimerConfig},
    error::{Result, ToolboxError},
    utils::env::EnvUtils,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEBUG_VAR: &str = "HANDY_TOOLBOX_DEBUG";
pub const DATA_DIR_VAR: &str = "HANDY_TOOLBOX_DATA_DIR";
pub const PYPI_INDEX_VAR: &str = "HANDY_TOOLBOX_PYPI_INDEX";
pub const PYPI_TIMEOUT_VAR: &str = "HANDY_TOOLBOX_PYPI_TIMEOUT";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Enable debug logging
    pub debug: bool,
    pub humanize: HumanizeConfig,
    /// Defaults for process lookups
    pub process: ProcessQuery,
    pub pypi: PypiConfig,
    pub timer: TimerConfig,
}

impl Config {
    /// Create configuration from defaults and `HANDY_TOOLBOX_*` variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(debug) = EnvUtils::get_var_flag(DEBUG_VAR) {
            config.debug = debug;
        }

        let data_dir = EnvUtils::get_var_or_default(DATA_DIR_VAR, "");
        if !data_dir.trim().is_empty() {
            config.timer.ledger_dir = PathBuf::from(data_dir.trim()).join("ledgers");
        }

        let index = EnvUtils::get_var_or_default(PYPI_INDEX_VAR, "");
        if !index.trim().is_empty() {
            config.pypi.index = index.parse()?;
        }

        let timeout = EnvUtils::get_var_or_default(PYPI_TIMEOUT_VAR, "");
        if !timeout.trim().is_empty() {
            config.pypi.timeout_secs = EnvUtils::get_var_parsed(PYPI_TIMEOUT_VAR).ok_or_else(|| {
                ToolboxError::config(format!(
                    "{PYPI_TIMEOUT_VAR} must be a whole number of seconds, got '{timeout}'"
                ))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.humanize.validate()?;
        self.pypi.validate()?;
        self.timer.validate()?;
        Ok(())
    }
}
