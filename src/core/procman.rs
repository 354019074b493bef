//! Process lookup and termination by name
//!
//! Every call takes a fresh snapshot of the OS process table; nothing is
//! cached between calls.

use crate::{
    core::humanize,
    error::{Result, ToolboxError},
    utils::{env::is_admin, log_name::component_logger},
};
use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use sysinfo::{Pid, Process, Signal, System, Uid, Users};
use tracing::{debug, info, instrument, warn};

/// How a process name is compared with the query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchMode {
    /// The process name contains the query
    #[default]
    Contains,
    /// The process name equals the query
    Exact,
}

/// Options for name-based process lookups
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessQuery {
    /// Compare names with letter case
    pub case_sensitive: bool,
    pub match_mode: MatchMode,
    /// Treat an empty result as an error
    pub require_match: bool,
    /// Leave the toolbox root out of the logger name
    pub lowkey_log_name: bool,
}

impl ProcessQuery {
    /// Whether `candidate` matches `needle` under these options
    pub fn is_match(&self, needle: &str, candidate: &str) -> bool {
        if self.case_sensitive {
            self.compare(needle, candidate)
        } else {
            self.compare(&needle.to_lowercase(), &candidate.to_lowercase())
        }
    }

    fn compare(&self, needle: &str, candidate: &str) -> bool {
        match self.match_mode {
            MatchMode::Contains => candidate.contains(needle),
            MatchMode::Exact => candidate == needle,
        }
    }
}

/// A process as seen at query time
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessRecord {
    pub pid: u32,
    pub name: String,
    /// Start time in seconds since the Unix epoch
    pub create_time: u64,
    pub create_time_readable: Option<DateTime<Local>>,
    pub user_id: Option<Uid>,
    pub username: Option<String>,
    /// Executable path, when the OS lets us read it
    pub exe: Option<PathBuf>,
}

impl ProcessRecord {
    fn from_process(process: &Process, users: &Users) -> Self {
        let user_id = process.user_id().cloned();
        let username = user_id
            .as_ref()
            .and_then(|uid| users.get_user_by_id(uid))
            .map(|user| user.name().to_string());
        let create_time = process.start_time();

        Self {
            pid: process.pid().as_u32(),
            name: process.name().to_string(),
            create_time,
            create_time_readable: i64::try_from(create_time)
                .ok()
                .and_then(|secs| Local.timestamp_opt(secs, 0).single()),
            user_id,
            username,
            exe: process.exe().map(Path::to_path_buf),
        }
    }
}

/// Lazily filtered view over a process snapshot
#[derive(Debug)]
pub struct ProcessMatches {
    records: std::vec::IntoIter<ProcessRecord>,
    needle: String,
    query: ProcessQuery,
    peeked: Option<ProcessRecord>,
}

impl ProcessMatches {
    pub(crate) fn new(records: Vec<ProcessRecord>, needle: &str, query: ProcessQuery) -> Self {
        Self {
            records: records.into_iter(),
            needle: needle.to_string(),
            query,
            peeked: None,
        }
    }

    /// Look at the next match without consuming it
    pub fn peek(&mut self) -> Option<&ProcessRecord> {
        if self.peeked.is_none() {
            self.peeked = self.find_next();
        }
        self.peeked.as_ref()
    }

    fn find_next(&mut self) -> Option<ProcessRecord> {
        let needle = &self.needle;
        let query = &self.query;
        self.records
            .find(|record| query.is_match(needle, &record.name))
    }
}

impl Iterator for ProcessMatches {
    type Item = ProcessRecord;

    fn next(&mut self) -> Option<Self::Item> {
        self.peeked.take().or_else(|| self.find_next())
    }
}

/// Result of terminating one process
#[derive(Debug)]
pub struct KillOutcome {
    pub record: ProcessRecord,
    pub result: Result<()>,
}

/// Per-process results of a batch termination
#[derive(Debug, Default)]
pub struct KillReport {
    pub outcomes: Vec<KillOutcome>,
    /// Matches left alone (owned by other users, or the calling process)
    pub skipped: Vec<ProcessRecord>,
}

impl KillReport {
    /// No process matched at all
    pub fn nothing_found(&self) -> bool {
        self.outcomes.is_empty() && self.skipped.is_empty()
    }

    pub fn killed(&self) -> impl Iterator<Item = &ProcessRecord> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.result.is_ok())
            .map(|outcome| &outcome.record)
    }

    pub fn failures(&self) -> impl Iterator<Item = &KillOutcome> {
        self.outcomes.iter().filter(|outcome| outcome.result.is_err())
    }

    pub fn killed_count(&self) -> usize {
        self.killed().count()
    }

    pub fn failed_count(&self) -> usize {
        self.failures().count()
    }

    /// Every attempted termination succeeded
    pub fn all_succeeded(&self) -> bool {
        self.failures().next().is_none()
    }
}

fn snapshot() -> Vec<ProcessRecord> {
    let mut system = System::new();
    system.refresh_processes();
    let users = Users::new_with_refreshed_list();

    system
        .processes()
        .values()
        .map(|process| ProcessRecord::from_process(process, &users))
        .collect()
}

fn current_pid() -> Option<u32> {
    sysinfo::get_current_pid().ok().map(Pid::as_u32)
}

fn current_user_id() -> Option<Uid> {
    let pid = sysinfo::get_current_pid().ok()?;
    let mut system = System::new();
    system.refresh_process(pid);
    system.process(pid)?.user_id().cloned()
}

/// Find running processes whose name matches `name`.
///
/// An empty result is not an error unless `query.require_match` is set.
#[instrument(skip(query))]
pub fn find_all_by_name(name: &str, query: &ProcessQuery) -> Result<ProcessMatches> {
    let log = component_logger("procman.find_all_by_name", query.lowkey_log_name)?;
    let _span = log.span().entered();

    if name.trim().is_empty() {
        return Err(ToolboxError::validation("Process name query must not be empty"));
    }

    if query.case_sensitive {
        debug!("Searching in case sensitive mode");
    }

    let records = snapshot();
    debug!("Scanning {} processes for '{}'", records.len(), name);

    let mut matches = ProcessMatches::new(records, name, query.clone());
    if query.require_match && matches.peek().is_none() {
        return Err(ToolboxError::no_processes_found(name));
    }
    Ok(matches)
}

/// Find a single process by pid
#[instrument]
pub fn find_by_pid(pid: u32) -> Result<ProcessRecord> {
    let sys_pid = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_process(sys_pid);
    let users = Users::new_with_refreshed_list();

    system
        .process(sys_pid)
        .map(|process| ProcessRecord::from_process(process, &users))
        .ok_or(ToolboxError::ProcessNotFound { pid })
}

/// Path of the executable a process was started from
#[instrument]
pub fn find_executable_path(pid: u32) -> Result<PathBuf> {
    find_by_pid(pid)?
        .exe
        .ok_or(ToolboxError::ExecutableUnavailable { pid })
}

/// Split matches into the ones the caller may signal and the ones left alone.
///
/// Administrators keep everything. Other callers keep only records owned by
/// `uid`; records without a known owner are left alone too. When the caller's
/// own uid is unknown nothing is filtered and the OS decides.
pub fn partition_by_owner(
    records: Vec<ProcessRecord>,
    admin: bool,
    uid: Option<&Uid>,
) -> (Vec<ProcessRecord>, Vec<ProcessRecord>) {
    match uid {
        Some(uid) if !admin => records
            .into_iter()
            .partition(|record| record.user_id.as_ref() == Some(uid)),
        _ => (records, Vec::new()),
    }
}

fn terminate(system: &mut System, record: &ProcessRecord) -> Result<()> {
    let pid = Pid::from_u32(record.pid);
    system.refresh_process(pid);
    let process = system
        .process(pid)
        .ok_or(ToolboxError::ProcessNotFound { pid: record.pid })?;

    // Interrupt first; platforms without signals fall back to a hard kill
    let delivered = match process.kill_with(Signal::Interrupt) {
        Some(sent) => sent,
        None => process.kill(),
    };

    if delivered {
        Ok(())
    } else {
        Err(ToolboxError::process_termination(
            record.pid,
            &record.name,
            "the operating system refused the termination request",
        ))
    }
}

/// Terminate a single process by pid
#[instrument]
pub fn kill_by_pid(pid: u32) -> Result<()> {
    let record = find_by_pid(pid)?;
    terminate(&mut System::new(), &record)
}

/// Request termination of every process in `records`.
///
/// Failures are collected per process; the batch never stops early. The
/// calling process is never signalled and ends up in `skipped`.
#[instrument(skip(records))]
pub fn kill_all_in_list<I>(records: I) -> KillReport
where
    I: IntoIterator<Item = ProcessRecord>,
{
    let own_pid = current_pid();
    let mut system = System::new();
    let mut report = KillReport::default();

    for record in records {
        if Some(record.pid) == own_pid {
            debug!("Not signalling the calling process ({})", record.pid);
            report.skipped.push(record);
            continue;
        }

        debug!("Killing {} ({})", record.name, record.pid);
        let result = terminate(&mut system, &record);
        match &result {
            Ok(()) => info!("Kill signal sent to {} ({})", record.name, record.pid),
            Err(e) => warn!("Could not kill {} ({}): {}", record.name, record.pid, e),
        }
        report.outcomes.push(KillOutcome { record, result });
    }

    report
}

/// Terminate every process whose name matches `name`.
///
/// Without administrator rights only processes owned by the current user
/// are targeted; the rest are reported as skipped.
#[instrument(skip(query))]
pub fn kill_all_by_name(name: &str, query: &ProcessQuery) -> Result<KillReport> {
    let log = component_logger("procman.kill_all_by_name", query.lowkey_log_name)?;
    let _span = log.span().entered();

    let matches: Vec<ProcessRecord> = find_all_by_name(name, query)?.collect();
    let found = humanize::describe_count("process", matches.len())?;
    debug!("Found {}", found);

    if matches.is_empty() {
        info!("No processes matching '{}', nothing to kill", name);
        return Ok(KillReport::default());
    }

    let admin = is_admin();
    let uid = if admin { None } else { current_user_id() };
    let (targets, foreign) = partition_by_owner(matches, admin, uid.as_ref());

    if !foreign.is_empty() {
        let skipped = humanize::describe_count("process", foreign.len())?;
        debug!("Skipping {} owned by other users", skipped);
    }

    let mut report = kill_all_in_list(targets);
    report.skipped.extend(foreign);

    let total = humanize::describe_count("process", report.outcomes.len() + report.skipped.len())?;
    info!("Killed {} of {} matching '{}'", report.killed_count(), total, name);
    Ok(report)
}
