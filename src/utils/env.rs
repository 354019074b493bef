//! Environment, privilege and data-location helpers

use std::{env, path::PathBuf};
use tracing::debug;

/// Name of the per-user data directory used for ledgers
pub const DATA_DIR_NAME: &str = "handy-toolbox";

/// Environment variable utilities
#[derive(Debug)]
pub struct EnvUtils;

impl EnvUtils {
    /// Get an environment variable with a default value
    pub fn get_var_or_default(key: &str, default: &str) -> String {
        env::var(key).unwrap_or_else(|_| default.to_string())
    }

    /// Get an environment variable and parse it to a specific type
    pub fn get_var_parsed<T>(key: &str) -> Option<T>
    where
        T: std::str::FromStr,
    {
        env::var(key).ok()?.trim().parse().ok()
    }

    /// Interpret an environment variable as a boolean flag
    pub fn get_var_flag(key: &str) -> Option<bool> {
        let value = env::var(key).ok()?;
        match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        }
    }

    /// Set environment variable (mainly for testing)
    pub fn set_var<K, V>(key: K, value: V)
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        unsafe { env::set_var(key.as_ref(), value.as_ref()) }
    }

    /// Remove environment variable (mainly for testing)
    pub fn remove_var<K: AsRef<str>>(key: K) {
        unsafe { env::remove_var(key.as_ref()) }
    }
}

/// Whether the current process runs with elevated privileges.
///
/// On Unix this means an effective user id of 0. Other platforms
/// always report `false`.
pub fn is_admin() -> bool {
    #[cfg(unix)]
    {
        // SAFETY: geteuid has no preconditions and cannot fail
        let euid = unsafe { libc::geteuid() };
        debug!("Effective uid: {}", euid);
        euid == 0
    }

    #[cfg(not(unix))]
    {
        debug!("Privilege check unsupported on this platform");
        false
    }
}

/// Per-user data directory for the toolbox, falling back to the
/// working directory when the platform has none
pub fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_DIR_NAME)
}

/// Default directory for timer ledgers
pub fn default_ledger_dir() -> PathBuf {
    data_dir().join("ledgers")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_utils() {
        let value = EnvUtils::get_var_or_default("HANDY_TOOLBOX_NONEXISTENT_VAR", "default");
        assert_eq!(value, "default");

        EnvUtils::set_var("HANDY_TOOLBOX_TEST_NUMBER", " 42 ");
        let number: Option<u64> = EnvUtils::get_var_parsed("HANDY_TOOLBOX_TEST_NUMBER");
        assert_eq!(number, Some(42));
        EnvUtils::remove_var("HANDY_TOOLBOX_TEST_NUMBER");

        EnvUtils::set_var("HANDY_TOOLBOX_TEST_FLAG", "Yes");
        assert_eq!(EnvUtils::get_var_flag("HANDY_TOOLBOX_TEST_FLAG"), Some(true));
        EnvUtils::set_var("HANDY_TOOLBOX_TEST_FLAG", "maybe");
        assert_eq!(EnvUtils::get_var_flag("HANDY_TOOLBOX_TEST_FLAG"), None);
        EnvUtils::remove_var("HANDY_TOOLBOX_TEST_FLAG");
    }

    #[cfg(unix)]
    #[test]
    fn test_is_admin_matches_euid() {
        let euid = unsafe { libc::geteuid() };
        assert_eq!(is_admin(), euid == 0);
    }

    #[test]
    fn test_ledger_dir_under_data_dir() {
        let ledgers = default_ledger_dir();
        assert!(ledgers.starts_with(data_dir()));
        assert!(ledgers.ends_with("ledgers"));
    }
}
