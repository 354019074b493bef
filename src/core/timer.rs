//! Pausable elapsed-time tracking
//!
//! A [`Timer`] moves through `Stopped -> Running <-> Paused -> Stopped` and
//! reports how long it has been running, leaving paused intervals out.
//! Every transition lands in the timer's [`TimerHistory`].

use crate::{
    core::history::{HistoryEntry, TimerAction, TimerHistory},
    error::{Result, ToolboxError},
    utils::{env::default_ledger_dir, log_name::component_logger},
};
use serde::{Deserialize, Serialize};
use std::{
    cell::Cell,
    fmt,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};
use tracing::{debug, instrument};

/// Source of monotonic time for a [`Timer`]
pub trait Clock {
    /// The current instant
    fn now(&self) -> Instant;
}

/// Clock backed by [`Instant::now`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Cell<Duration>,
}

impl ManualClock {
    /// Create a clock frozen at the current instant
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Cell::new(Duration::ZERO),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        self.offset.set(self.offset.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.offset.get()
    }
}

/// Lifecycle state of a [`Timer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Stopped,
    Running,
    Paused,
}

impl fmt::Display for TimerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stopped => "stopped",
            Self::Running => "running",
            Self::Paused => "paused",
        };
        f.write_str(name)
    }
}

/// Timer options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Where ledger snapshots are written
    pub ledger_dir: PathBuf,
    /// Start the timer as soon as it is created
    pub start_on_create: bool,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            ledger_dir: default_ledger_dir(),
            start_on_create: false,
        }
    }
}

impl TimerConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.ledger_dir.as_os_str().is_empty() {
            return Err(ToolboxError::config("Ledger directory must not be empty"));
        }
        if self.ledger_dir.is_file() {
            return Err(ToolboxError::config(format!(
                "Ledger directory is a file: {}",
                self.ledger_dir.display()
            )));
        }
        Ok(())
    }
}

/// Start/pause/resume wall-clock timer with an action history
#[derive(Debug)]
pub struct Timer<C: Clock = SystemClock> {
    clock: C,
    state: TimerState,
    started_at: Option<Instant>,
    pause_started: Option<Instant>,
    total_paused: Duration,
    was_paused: bool,
    history: TimerHistory,
    ledger_dir: PathBuf,
}

impl Timer<SystemClock> {
    /// Create a stopped timer using the system clock
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    /// Create a system-clock timer, started when the config asks for it
    pub fn from_config(config: &TimerConfig) -> Result<Self> {
        config.validate()?;
        let mut timer = Self::new().with_ledger_dir(&config.ledger_dir);
        if config.start_on_create {
            timer.start()?;
        }
        Ok(timer)
    }
}

impl Default for Timer<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Timer<C> {
    /// Create a stopped timer reading time from `clock`
    pub fn with_clock(clock: C) -> Self {
        let mut history = TimerHistory::new();
        history.record(TimerAction::Create, Duration::ZERO, None);

        Self {
            clock,
            state: TimerState::Stopped,
            started_at: None,
            pause_started: None,
            total_paused: Duration::ZERO,
            was_paused: false,
            history,
            ledger_dir: default_ledger_dir(),
        }
    }

    /// Write ledger snapshots to `dir` instead of the default data directory
    pub fn with_ledger_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.ledger_dir = dir.into();
        self
    }

    /// Start the timer
    #[instrument(skip(self))]
    pub fn start(&mut self) -> Result<()> {
        if self.state != TimerState::Stopped {
            return Err(ToolboxError::invalid_timer_state("start", self.state));
        }

        self.started_at = Some(self.clock.now());
        self.state = TimerState::Running;
        self.history.record(TimerAction::Start, Duration::ZERO, None);

        debug!("Timer started");
        Ok(())
    }

    /// Pause a running timer
    #[instrument(skip(self))]
    pub fn pause(&mut self) -> Result<()> {
        if self.state != TimerState::Running {
            return Err(ToolboxError::invalid_timer_state("pause", self.state));
        }

        let now = self.clock.now();
        let elapsed = self.elapsed_at(now);
        self.pause_started = Some(now);
        self.state = TimerState::Paused;
        self.was_paused = true;
        self.history.record(TimerAction::Pause, elapsed, None);

        debug!("Timer paused at {}", format_hhmmss(elapsed));
        Ok(())
    }

    /// Resume a paused timer
    #[instrument(skip(self))]
    pub fn unpause(&mut self) -> Result<()> {
        if self.state != TimerState::Paused {
            return Err(ToolboxError::invalid_timer_state("unpause", self.state));
        }

        let now = self.clock.now();
        if let Some(pause_started) = self.pause_started.take() {
            self.total_paused += now.saturating_duration_since(pause_started);
        }
        self.state = TimerState::Running;
        let elapsed = self.elapsed_at(now);
        self.history.record(TimerAction::Unpause, elapsed, None);

        debug!("Timer resumed, total paused {:?}", self.total_paused);
        Ok(())
    }

    /// Pause if running; returns whether anything changed
    pub fn try_pause(&mut self) -> bool {
        self.state == TimerState::Running && self.pause().is_ok()
    }

    /// Resume if paused; returns whether anything changed
    pub fn try_unpause(&mut self) -> bool {
        self.state == TimerState::Paused && self.unpause().is_ok()
    }

    /// Stop the timer and clear pause accounting, returning the final elapsed time
    #[instrument(skip(self))]
    pub fn reset(&mut self) -> Duration {
        let elapsed = self.elapsed_at(self.clock.now());
        self.history.record(TimerAction::Reset, elapsed, None);

        self.state = TimerState::Stopped;
        self.started_at = None;
        self.pause_started = None;
        self.total_paused = Duration::ZERO;
        self.was_paused = false;

        debug!("Timer reset after {}", format_hhmmss(elapsed));
        elapsed
    }

    /// Reset and immediately start again
    pub fn restart(&mut self) -> Result<()> {
        self.reset();
        self.start()
    }

    /// Running time so far, excluding paused intervals
    pub fn get_elapsed(&self) -> Result<Duration> {
        if self.state == TimerState::Stopped {
            return Err(ToolboxError::invalid_timer_state("query", self.state));
        }
        Ok(self.elapsed_at(self.clock.now()))
    }

    /// Record the current elapsed time with a label
    pub fn add(&mut self, label: impl Into<String>) -> &HistoryEntry {
        let elapsed = self.elapsed_at(self.clock.now());
        self.history
            .record(TimerAction::Mark, elapsed, Some(label.into()))
    }

    /// Append unwritten history entries to `path`
    pub fn write_history<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        self.history.write(path)
    }

    /// Write the whole history to a new ledger file in the ledger directory
    pub fn write_ledger(&self) -> Result<PathBuf> {
        let log = component_logger("timer.write_ledger", false)?;
        let _span = log.span().entered();
        self.history.write_to_dir(&self.ledger_dir)
    }

    pub fn ledger_dir(&self) -> &Path {
        &self.ledger_dir
    }

    pub const fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    pub fn is_paused(&self) -> bool {
        self.state == TimerState::Paused
    }

    /// Whether the timer was paused at least once since it was started
    pub const fn was_paused(&self) -> bool {
        self.was_paused
    }

    pub const fn history(&self) -> &TimerHistory {
        &self.history
    }

    pub const fn history_mut(&mut self) -> &mut TimerHistory {
        &mut self.history
    }

    pub const fn clock(&self) -> &C {
        &self.clock
    }

    fn elapsed_at(&self, now: Instant) -> Duration {
        let Some(started_at) = self.started_at else {
            return Duration::ZERO;
        };

        let mut paused = self.total_paused;
        if let Some(pause_started) = self.pause_started {
            paused += now.saturating_duration_since(pause_started);
        }
        now.saturating_duration_since(started_at).saturating_sub(paused)
    }
}

impl<C: Clock> fmt::Display for Timer<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let elapsed = self.elapsed_at(self.clock.now());
        write!(f, "Timer({}, {})", self.state, format_hhmmss(elapsed))
    }
}

/// Format a duration as `HH:MM:SS`
pub fn format_hhmmss(duration: Duration) -> String {
    let total = duration.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::history::list_ledgers;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_from_config() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config = TimerConfig {
            ledger_dir: temp_dir.path().to_path_buf(),
            start_on_create: true,
        };
        let mut timer = Timer::from_config(&config).unwrap();
        assert!(timer.is_running());
        assert_eq!(timer.ledger_dir(), temp_dir.path());

        timer.add("lap");
        let written = timer.write_ledger().unwrap();
        assert_eq!(written.parent(), Some(temp_dir.path()));
        assert_eq!(list_ledgers(temp_dir.path()).unwrap(), vec![written.clone()]);

        let content = std::fs::read_to_string(&written).unwrap();
        let actions: Vec<&str> = content
            .lines()
            .map(|line| line.split('\t').nth(2).unwrap())
            .collect();
        assert_eq!(actions, vec!["CREATE", "START", "MARK"]);

        let idle = Timer::from_config(&TimerConfig::default()).unwrap();
        assert_eq!(idle.state(), TimerState::Stopped);
        assert_eq!(idle.ledger_dir(), default_ledger_dir());

        let bad = TimerConfig {
            ledger_dir: PathBuf::new(),
            start_on_create: false,
        };
        assert!(matches!(
            Timer::from_config(&bad),
            Err(ToolboxError::Config { .. })
        ));
    }

    #[test]
    fn test_elapsed_frozen_while_paused() {
        let mut timer = Timer::with_clock(ManualClock::new());
        timer.start().unwrap();

        timer.clock().advance(secs(5));
        timer.pause().unwrap();
        let frozen = timer.get_elapsed().unwrap();
        assert_eq!(frozen, secs(5));

        timer.clock().advance(secs(30));
        assert_eq!(timer.get_elapsed().unwrap(), frozen);

        timer.unpause().unwrap();
        timer.clock().advance(secs(2));
        let resumed = timer.get_elapsed().unwrap();
        assert!(resumed > frozen);
        assert_eq!(resumed, secs(7));
    }

    #[test]
    fn test_elapsed_non_decreasing_while_running() {
        let mut timer = Timer::with_clock(ManualClock::new());
        timer.start().unwrap();

        let mut previous = timer.get_elapsed().unwrap();
        for _ in 0..10 {
            timer.clock().advance(Duration::from_millis(250));
            let current = timer.get_elapsed().unwrap();
            assert!(current >= previous);
            previous = current;
        }
        assert_eq!(previous, Duration::from_millis(2500));
    }

    #[test]
    fn test_invalid_transitions() {
        let mut timer = Timer::with_clock(ManualClock::new());

        assert!(matches!(
            timer.pause(),
            Err(ToolboxError::InvalidTimerState {
                operation: "pause",
                state: TimerState::Stopped
            })
        ));
        assert!(timer.get_elapsed().is_err());

        timer.start().unwrap();
        assert!(timer.start().is_err());
        assert!(timer.unpause().is_err());

        timer.pause().unwrap();
        assert!(matches!(
            timer.pause(),
            Err(ToolboxError::InvalidTimerState {
                state: TimerState::Paused,
                ..
            })
        ));
    }

    #[test]
    fn test_idempotent_variants() {
        let mut timer = Timer::with_clock(ManualClock::new());
        assert!(!timer.try_pause());

        timer.start().unwrap();
        assert!(timer.try_pause());
        assert!(!timer.try_pause());
        assert!(timer.is_paused());
        assert!(timer.try_unpause());
        assert!(!timer.try_unpause());
        assert!(timer.is_running());
        assert!(timer.was_paused());
    }

    #[test]
    fn test_reset_and_restart() {
        let mut timer = Timer::with_clock(ManualClock::new());
        timer.start().unwrap();
        timer.clock().advance(secs(4));
        timer.pause().unwrap();
        timer.clock().advance(secs(4));

        assert_eq!(timer.reset(), secs(4));
        assert_eq!(timer.state(), TimerState::Stopped);
        assert!(!timer.was_paused());

        timer.restart().unwrap();
        timer.clock().advance(secs(1));
        assert_eq!(timer.get_elapsed().unwrap(), secs(1));
        assert_eq!(timer.history().num_resets(), 2);
    }

    #[test]
    fn test_history_records_transitions() {
        let mut timer = Timer::with_clock(ManualClock::new());
        timer.start().unwrap();
        timer.clock().advance(secs(3));
        timer.add("lap one");
        timer.pause().unwrap();
        timer.unpause().unwrap();
        timer.reset();

        let actions: Vec<TimerAction> = timer.history().entries().iter().map(|e| e.action).collect();
        assert_eq!(
            actions,
            vec![
                TimerAction::Create,
                TimerAction::Start,
                TimerAction::Mark,
                TimerAction::Pause,
                TimerAction::Unpause,
                TimerAction::Reset,
            ]
        );

        let mark = &timer.history().entries()[2];
        assert_eq!(mark.label.as_deref(), Some("lap one"));
        assert_eq!(mark.elapsed, secs(3));
    }

    #[test]
    fn test_system_clock_timer() {
        let mut timer = Timer::new();
        timer.start().unwrap();
        std::thread::sleep(Duration::from_millis(20));
        assert!(timer.get_elapsed().unwrap() >= Duration::from_millis(20));
        assert!(timer.to_string().starts_with("Timer(running, 00:00:00"));
    }

    #[test]
    fn test_format_hhmmss() {
        assert_eq!(format_hhmmss(Duration::ZERO), "00:00:00");
        assert_eq!(format_hhmmss(secs(65)), "00:01:05");
        assert_eq!(format_hhmmss(secs(3 * 3600 + 59 * 60 + 59)), "03:59:59");
    }
}
