//! Logger name derivation
//!
//! Helpers compute dotted logger names (`root.component.operation`) and hand
//! them to `tracing` as span fields. Nothing here installs subscribers.

use crate::error::{Result, ToolboxError};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::Span;

/// Root segment the toolbox uses for its own loggers
pub const ROOT_LOG_NAME: &str = "handy_toolbox";

static DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.\-]+").expect("static regex is valid"));

static REPEATED_DOTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.{2,}").expect("static regex is valid"));

static VALID_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_\-]+(\.[A-Za-z0-9_\-]+)*$").expect("static regex is valid")
});

/// Normalize a logger name and leave the toolbox's own root segment out.
///
/// Disallowed characters become `_`, runs of dots collapse and
/// leading/trailing dots are trimmed. Fails when nothing usable remains.
pub fn force_lowkey_log_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    let without_root = trimmed
        .strip_prefix(ROOT_LOG_NAME)
        .filter(|rest| rest.is_empty() || rest.starts_with('.'))
        .unwrap_or(trimmed);

    let replaced = DISALLOWED.replace_all(without_root, "_");
    let collapsed = REPEATED_DOTS.replace_all(&replaced, ".");
    let normalized = collapsed.trim_matches('.');

    if normalized.is_empty() || normalized.chars().all(|c| c == '_') {
        return Err(ToolboxError::invalid_log_name(
            name,
            "nothing usable remains after normalization",
        ));
    }

    Ok(normalized.to_string())
}

/// Check that a dotted logger name is already well formed
pub fn is_valid_log_name(name: &str) -> bool {
    VALID_NAME.is_match(name)
}

/// A named root logging device that children hang off
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogDevice {
    name: String,
}

impl LogDevice {
    /// Create a device, rejecting malformed names
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if !is_valid_log_name(&name) {
            return Err(ToolboxError::invalid_log_device(name));
        }
        Ok(Self { name })
    }

    /// The toolbox's own root device
    pub fn root() -> Self {
        Self {
            name: ROOT_LOG_NAME.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for LogDevice {
    fn default() -> Self {
        Self::root()
    }
}

/// Logger name derived from a root device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildLogger {
    name: String,
}

impl ChildLogger {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// A debug-level span carrying this logger's name
    pub fn span(&self) -> Span {
        tracing::debug_span!("logger", name = %self.name)
    }
}

/// Derive `root.child` from a root device and a child name.
///
/// The child part is normalized with [`force_lowkey_log_name`]; a root
/// device whose name is malformed yields `InvalidLogDevice`.
pub fn add_isl_child(root: &LogDevice, child_name: &str) -> Result<ChildLogger> {
    if !is_valid_log_name(root.name()) {
        return Err(ToolboxError::invalid_log_device(root.name()));
    }

    let child = force_lowkey_log_name(child_name)?;
    Ok(ChildLogger {
        name: format!("{}.{}", root.name(), child),
    })
}

/// Child of the toolbox root device, or of the bare name when `lowkey` is set
pub(crate) fn component_logger(child_name: &str, lowkey: bool) -> Result<ChildLogger> {
    if lowkey {
        Ok(ChildLogger {
            name: force_lowkey_log_name(child_name)?,
        })
    } else {
        add_isl_child(&LogDevice::root(), child_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_force_lowkey_strips_root_and_junk() {
        assert_eq!(
            force_lowkey_log_name("handy_toolbox.procman.find").unwrap(),
            "procman.find"
        );
        assert_eq!(
            force_lowkey_log_name("  my app..worker/1 ").unwrap(),
            "my_app.worker_1"
        );
        assert_eq!(force_lowkey_log_name(".edge.").unwrap(), "edge");
        assert_eq!(
            force_lowkey_log_name("handy_toolboxes").unwrap(),
            "handy_toolboxes"
        );
    }

    #[test]
    fn test_force_lowkey_rejects_empty() {
        assert!(matches!(
            force_lowkey_log_name("   "),
            Err(ToolboxError::InvalidLogName { .. })
        ));
        assert!(force_lowkey_log_name("...").is_err());
        assert!(force_lowkey_log_name("handy_toolbox").is_err());
        assert!(force_lowkey_log_name("!!!").is_err());
    }

    #[test]
    fn test_add_child() {
        let root = LogDevice::new("service").unwrap();
        let child = add_isl_child(&root, "proc man.kill").unwrap();
        assert_eq!(child.name(), "service.proc_man.kill");

        let default_child = add_isl_child(&LogDevice::default(), "timer").unwrap();
        assert_eq!(default_child.name(), "handy_toolbox.timer");
    }

    #[test]
    fn test_invalid_devices() {
        assert!(matches!(
            LogDevice::new(""),
            Err(ToolboxError::InvalidLogDevice { .. })
        ));
        assert!(LogDevice::new("bad name").is_err());
        assert!(LogDevice::new("trailing.").is_err());

        let forged = LogDevice {
            name: "not valid!".to_string(),
        };
        assert!(matches!(
            add_isl_child(&forged, "child"),
            Err(ToolboxError::InvalidLogDevice { .. })
        ));
    }

    #[test]
    fn test_component_logger() {
        assert_eq!(
            component_logger("procman.find_all_by_name", false)
                .unwrap()
                .name(),
            "handy_toolbox.procman.find_all_by_name"
        );
        assert_eq!(
            component_logger("procman.find_all_by_name", true)
                .unwrap()
                .name(),
            "procman.find_all_by_name"
        );
    }
}
