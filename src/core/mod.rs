//! Core functionality of the toolbox
//!
//! Number humanizing, pausable timers and their history, process lookup
//! and termination, and package freshness checks.

pub mod history;
pub mod humanize;
pub mod procman;
pub mod pypi;
pub mod timer;

pub use history::{HistoryEntry, TimerAction, TimerHistory};
pub use humanize::{CountOptions, HumanizeConfig, Humanizer, Number};
pub use procman::{KillReport, ProcessMatches, ProcessQuery, ProcessRecord};
pub use pypi::{
    Freshness, PackageIndex, PypiClient, PypiConfig, ReleaseInfo, VersionDetails, VersionFilter,
};
pub use timer::{Clock, ManualClock, SystemClock, Timer, TimerConfig, TimerState};
