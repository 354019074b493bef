//! # Handy Toolbox
//!
//! Small, independent helpers that tend to get rewritten in every project.
//!
//! ## Features
//!
//! - Numbers to English words, thousands grouping and noun pluralization
//! - Pausable elapsed-time tracking with an append-only history ledger
//! - Process lookup and termination by name
//! - Installed-version freshness checks against PyPI
//! - Logger name derivation for `tracing` spans
//! - Sub-command aliases for clap command lines
//!
//! ## Example
//!
//! ```no_run
//! use handy_toolbox::core::{humanize, pypi};
//!
//! assert_eq!(humanize::to_words(1234)?, "one thousand, two hundred and thirty-four");
//! assert_eq!(humanize::describe_count("box", 3)?, "3 boxes");
//!
//! let freshness = pypi::up_to_date("requests", "2.0.0")?;
//! println!("{freshness}");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod utils;

pub use error::{Result as ToolboxResult, ToolboxError};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging with appropriate verbosity
pub fn setup_logging(debug: bool) -> anyhow::Result<()> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_level(true)
                .compact(),
        )
        .with(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
