//! Utility modules for common functionality
//!
//! Provides reusable utilities for file operations, environment handling
//! and logger naming.

pub mod env;
pub mod fs;
pub mod log_name;

pub use env::{EnvUtils, is_admin};
pub use fs::FileSystemUtils;
pub use log_name::{ChildLogger, LogDevice, add_isl_child, force_lowkey_log_name};
