//! Error types for the toolbox
//!
//! Every helper reports failures through [`ToolboxError`]. Callers that only
//! care about the broad class of a failure can branch on
//! [`ToolboxError::category`].

use crate::core::timer::TimerState;
use std::path::PathBuf;
use thiserror::Error;

/// Broad classification of a [`ToolboxError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The caller passed something unusable; retrying will not help
    InvalidInput,
    /// A lookup came back empty and the caller asked for at least one hit
    NotFound,
    /// The OS, the network or the file system refused
    External,
    /// An operation was called from the wrong state
    State,
    /// Configuration values are inconsistent
    Config,
}

/// Main error type for the toolbox
#[derive(Error, Debug)]
pub enum ToolboxError {
    /// A value that should have been a number was not one
    #[error("Not a number: '{value}' ({message})")]
    NotANumber { value: String, message: String },

    /// The magnitude exceeds what the configured scale names can express
    #[error("Number {value} is too large to put into words (limit is {limit})")]
    NumberTooLarge { value: String, limit: String },

    /// Timer operation called from a state that does not allow it
    #[error("Cannot {operation} a timer that is {state}")]
    InvalidTimerState {
        operation: &'static str,
        state: TimerState,
    },

    /// No running process matched a name query
    #[error("No processes found matching '{name}'")]
    NoProcessesFound { name: String },

    /// No process exists with the given pid
    #[error("No process found with PID {pid}")]
    ProcessNotFound { pid: u32 },

    /// The OS refused or failed to terminate a process
    #[error("Failed to terminate process {name} ({pid}): {message}")]
    ProcessTermination {
        pid: u32,
        name: String,
        message: String,
    },

    /// The executable of a process could not be read
    #[error("Executable path of process {pid} is unavailable")]
    ExecutableUnavailable { pid: u32 },

    /// The package index has no such package
    #[error("Package '{package}' not found on {index}")]
    PackageNotFound { package: String, index: String },

    /// Transport or HTTP failure while talking to a package index
    #[error("Network error while querying {url}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The package index answered with something we could not decode
    #[error("Invalid response from {url}: {message}")]
    InvalidResponse { url: String, message: String },

    /// A version string could not be parsed
    #[error("Invalid version string: '{version}'")]
    InvalidVersion { version: String },

    /// A logger name is empty or unusable after normalization
    #[error("Invalid logger name '{name}': {reason}")]
    InvalidLogName { name: String, reason: String },

    /// The root logging device cannot have children attached
    #[error("Invalid logging device '{name}'")]
    InvalidLogDevice { name: String },

    /// A sub-command name or alias is already taken
    #[error("Sub-command name '{alias}' is already registered for '{existing}'")]
    AliasConflict { alias: String, existing: String },

    /// Command-line parsing failed
    #[error("Argument parsing failed: {message}")]
    ArgumentParse { message: String },

    /// File system operation errors
    #[error("File system error: {operation} failed on {path}")]
    FileSystem {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String },
}

impl ToolboxError {
    /// Create a new not-a-number error
    pub fn not_a_number(value: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotANumber {
            value: value.into(),
            message: message.into(),
        }
    }

    /// Create a new number-too-large error
    pub fn number_too_large(value: impl ToString, limit: impl ToString) -> Self {
        Self::NumberTooLarge {
            value: value.to_string(),
            limit: limit.to_string(),
        }
    }

    /// Create a new invalid timer state error
    pub const fn invalid_timer_state(operation: &'static str, state: TimerState) -> Self {
        Self::InvalidTimerState { operation, state }
    }

    /// Create a new no-processes-found error
    pub fn no_processes_found(name: impl Into<String>) -> Self {
        Self::NoProcessesFound { name: name.into() }
    }

    /// Create a new process termination error
    pub fn process_termination(
        pid: u32,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ProcessTermination {
            pid,
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a new package-not-found error
    pub fn package_not_found(package: impl Into<String>, index: impl Into<String>) -> Self {
        Self::PackageNotFound {
            package: package.into(),
            index: index.into(),
        }
    }

    /// Create a new network error
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Create a new invalid response error
    pub fn invalid_response(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a new invalid version error
    pub fn invalid_version(version: impl Into<String>) -> Self {
        Self::InvalidVersion {
            version: version.into(),
        }
    }

    /// Create a new invalid logger name error
    pub fn invalid_log_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidLogName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a new invalid logging device error
    pub fn invalid_log_device(name: impl Into<String>) -> Self {
        Self::InvalidLogDevice { name: name.into() }
    }

    /// Create a new alias conflict error
    pub fn alias_conflict(alias: impl Into<String>, existing: impl Into<String>) -> Self {
        Self::AliasConflict {
            alias: alias.into(),
            existing: existing.into(),
        }
    }

    /// Create a new argument parsing error
    pub fn argument_parse(message: impl Into<String>) -> Self {
        Self::ArgumentParse {
            message: message.into(),
        }
    }

    /// Create a new file system error
    pub fn file_system<P: Into<PathBuf>>(
        operation: impl Into<String>,
        path: P,
        source: std::io::Error,
    ) -> Self {
        Self::FileSystem {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Broad class of this error
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::NotANumber { .. }
            | Self::NumberTooLarge { .. }
            | Self::InvalidVersion { .. }
            | Self::InvalidLogName { .. }
            | Self::InvalidLogDevice { .. }
            | Self::AliasConflict { .. }
            | Self::ArgumentParse { .. }
            | Self::Validation { .. } => ErrorCategory::InvalidInput,
            Self::NoProcessesFound { .. }
            | Self::ProcessNotFound { .. }
            | Self::PackageNotFound { .. } => ErrorCategory::NotFound,
            Self::ProcessTermination { .. }
            | Self::ExecutableUnavailable { .. }
            | Self::Network { .. }
            | Self::InvalidResponse { .. }
            | Self::FileSystem { .. } => ErrorCategory::External,
            Self::InvalidTimerState { .. } => ErrorCategory::State,
            Self::Config { .. } => ErrorCategory::Config,
        }
    }

    /// Whether this error is a "nothing matched" condition
    pub const fn is_not_found(&self) -> bool {
        matches!(self.category(), ErrorCategory::NotFound)
    }
}

impl From<clap::Error> for ToolboxError {
    fn from(err: clap::Error) -> Self {
        Self::argument_parse(err.to_string())
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ToolboxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(
            ToolboxError::not_a_number("abc", "not numeric").category(),
            ErrorCategory::InvalidInput
        );
        assert_eq!(
            ToolboxError::no_processes_found("xyz").category(),
            ErrorCategory::NotFound
        );
        assert_eq!(
            ToolboxError::package_not_found("nope", "PyPI").category(),
            ErrorCategory::NotFound
        );
        assert_eq!(
            ToolboxError::process_termination(1, "init", "permission denied").category(),
            ErrorCategory::External
        );
        assert_eq!(
            ToolboxError::invalid_timer_state("pause", TimerState::Paused).category(),
            ErrorCategory::State
        );
        assert_eq!(
            ToolboxError::ExecutableUnavailable { pid: 1 }.category(),
            ErrorCategory::External
        );
        assert_eq!(ToolboxError::config("bad").category(), ErrorCategory::Config);
    }

    #[test]
    fn test_error_messages() {
        let err = ToolboxError::invalid_timer_state("pause", TimerState::Paused);
        assert_eq!(err.to_string(), "Cannot pause a timer that is paused");

        let err = ToolboxError::no_processes_found("ghost");
        assert_eq!(err.to_string(), "No processes found matching 'ghost'");
        assert!(err.is_not_found());
    }
}
