//! Per-entry scheduling and tick execution.
//!
//! Every configured entry gets its own timer loop on the tokio runtime. When
//! the entry's cron expression fires, the tick's filesystem work is handed to
//! a blocking worker thread. An entry never runs twice at the same time: a
//! tick that fires while the previous one is still running is skipped.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Local};
use common::{ActionType, Condition, LogEntry};
use croner::Cron;
use croner::errors::CronError;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::condition::evaluate;
use crate::context::EngineContext;
use crate::deletion::DeletionExecutor;
use crate::error::{Error, Result};
use crate::resolver::{ResolvedFile, resolve};
use crate::rotation::RotationExecutor;

/// Outcome of a single tick of one entry.
#[derive(Debug)]
pub struct TickReport {
    pub run_id: Uuid,
    /// Distinct paths matched by the entry's patterns.
    pub matched: usize,
    pub qualified: usize,
    pub deleted: Vec<PathBuf>,
    pub rotated: Vec<PathBuf>,
    pub compressed: usize,
    pub pruned: usize,
    pub bytes_reclaimed: u64,
    pub failures: Vec<Error>,
}

impl TickReport {
    fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            matched: 0,
            qualified: 0,
            deleted: Vec::new(),
            rotated: Vec::new(),
            compressed: 0,
            pruned: 0,
            bytes_reclaimed: 0,
            failures: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub enum TickOutcome {
    Ran(TickReport),
    /// The previous tick of the same entry was still running.
    Skipped,
}

/// A configured entry together with its run guard.
#[derive(Debug)]
pub struct EntryTask {
    label: String,
    entry: LogEntry,
    running: AtomicBool,
}

/// Held for the duration of a tick; releases the entry when dropped.
#[derive(Debug)]
pub struct RunGuard {
    task: Arc<EntryTask>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.task.running.store(false, Ordering::Release);
    }
}

impl EntryTask {
    pub fn new(index: usize, entry: LogEntry) -> Self {
        Self {
            label: format!("#{index} {} [{}]", entry.action, entry.paths),
            entry,
            running: AtomicBool::new(false),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn entry(&self) -> &LogEntry {
        &self.entry
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Move the entry from idle to running. Returns `None` if it is already
    /// running.
    pub fn try_begin(self: &Arc<Self>) -> Option<RunGuard> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard {
                task: Arc::clone(self),
            })
    }

    /// Run one tick on the calling thread, unless one is already in progress.
    pub fn fire(self: &Arc<Self>, ctx: &EngineContext) -> TickOutcome {
        match self.try_begin() {
            Some(_guard) => TickOutcome::Ran(self.run_tick(ctx)),
            None => {
                self.skip(ctx);
                TickOutcome::Skipped
            }
        }
    }

    /// Hand one tick to a blocking worker thread. Returns `false` if the
    /// tick was skipped because the entry is still running.
    pub fn dispatch(self: &Arc<Self>, ctx: &EngineContext) -> bool {
        let Some(guard) = self.try_begin() else {
            self.skip(ctx);
            return false;
        };

        let task = Arc::clone(self);
        let ctx = ctx.clone();
        tokio::task::spawn_blocking(move || {
            let _guard = guard;
            task.run_tick(&ctx);
        });
        true
    }

    fn skip(&self, ctx: &EngineContext) {
        tracing::warn!(
            entry = %self.label,
            "Previous run still in progress, skipping this tick"
        );
        ctx.metrics().record_tick_skipped();
    }

    /// Resolve, evaluate and act on every pattern of the entry.
    ///
    /// Callers must hold the entry's [`RunGuard`].
    fn run_tick(&self, ctx: &EngineContext) -> TickReport {
        let mut report = TickReport::new();
        tracing::debug!(entry = %self.label, run_id = %report.run_id, "Tick started");

        // Resolve every pattern before acting so files produced by this tick
        // are never matched by a later pattern of the same entry.
        let mut seen = HashSet::new();
        let mut matched = Vec::new();
        for pattern in self.entry.paths.iter() {
            match resolve(pattern) {
                Ok(paths) => matched.extend(paths.into_iter().filter(|p| seen.insert(p.clone()))),
                Err(e) => {
                    tracing::error!(
                        entry = %self.label,
                        pattern = %pattern,
                        error = %e,
                        "Failed to resolve pattern"
                    );
                    report.failures.push(e);
                }
            }
        }
        report.matched = matched.len();

        let now = SystemTime::now();
        let mut qualifying = Vec::new();
        for path in matched {
            match self.qualify(&path, now) {
                Ok(Some(file)) => qualifying.push(file),
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(
                        entry = %self.label,
                        path = %path.display(),
                        error = %e,
                        "Failed to evaluate file"
                    );
                    report.failures.push(e);
                }
            }
        }

        report.qualified = qualifying.len();
        if !qualifying.is_empty() {
            self.execute(ctx, &qualifying, &mut report);
        }

        self.record(ctx, &report);
        report
    }

    /// Stat and evaluate one matched path. `Ok(None)` means the path is not a
    /// regular file or does not qualify.
    fn qualify(&self, path: &Path, now: SystemTime) -> Result<Option<ResolvedFile>> {
        let Some(file) = ResolvedFile::stat(path)? else {
            tracing::debug!(path = %path.display(), "Skipping non-regular file");
            return Ok(None);
        };

        let verdict = evaluate(self.entry.action, self.entry.condition.as_ref(), &file, now)?;
        tracing::debug!(
            entry = %self.label,
            path = %file.path.display(),
            verdict = ?verdict,
            "Evaluated file"
        );
        Ok(verdict.qualifies().then_some(file))
    }

    fn execute(&self, ctx: &EngineContext, files: &[ResolvedFile], report: &mut TickReport) {
        match self.entry.action {
            ActionType::Delete => {
                let result = DeletionExecutor::new(ctx).execute(files);
                report.bytes_reclaimed += result.bytes_freed;
                report.deleted.extend(result.deleted);
                report.failures.extend(result.failures);
            }
            ActionType::Rotate => {
                let default_condition = Condition::default();
                let condition = self.entry.condition.as_ref().unwrap_or(&default_condition);
                let result = RotationExecutor::new(ctx).execute(files, condition);
                report.compressed += result.compressed;
                report.pruned += result.pruned.len();
                report.bytes_reclaimed += result.bytes_reclaimed;
                report
                    .rotated
                    .extend(result.rotated.into_iter().map(|r| r.source));
                report.failures.extend(result.failures);
            }
        }
    }

    fn record(&self, ctx: &EngineContext, report: &TickReport) {
        let metrics = ctx.metrics();
        metrics.record_tick_run();
        metrics.record_deleted(report.deleted.len());
        metrics.record_rotated(report.rotated.len());
        metrics.record_compressed(report.compressed);
        metrics.record_pruned(report.pruned);
        metrics.record_failures(report.failures.len());
        metrics.record_bytes_reclaimed(report.bytes_reclaimed);

        tracing::info!(
            entry = %self.label,
            run_id = %report.run_id,
            dry_run = ctx.dry_run(),
            matched = report.matched,
            qualified = report.qualified,
            deleted = report.deleted.len(),
            rotated = report.rotated.len(),
            compressed = report.compressed,
            pruned = report.pruned,
            bytes_reclaimed = report.bytes_reclaimed,
            failures = report.failures.len(),
            "Tick completed"
        );
        metrics.summary().log();
    }
}

/// Parse an entry's cron expression. Five fields, with an optional leading
/// seconds field.
pub fn parse_schedule(label: &str, expression: &str) -> Result<Cron> {
    Cron::new(expression)
        .with_seconds_optional()
        .parse()
        .map_err(|e| Error::Scheduling {
            entry: label.to_string(),
            schedule: expression.to_string(),
            reason: e.to_string(),
        })
}

/// Owns one [`EntryTask`] per configured entry.
pub struct Dispatcher {
    ctx: EngineContext,
    tasks: Vec<Arc<EntryTask>>,
}

impl Dispatcher {
    pub fn new(ctx: EngineContext) -> Self {
        let tasks = ctx
            .config()
            .logs
            .iter()
            .cloned()
            .enumerate()
            .map(|(index, entry)| Arc::new(EntryTask::new(index, entry)))
            .collect();
        Self { ctx, tasks }
    }

    pub fn tasks(&self) -> &[Arc<EntryTask>] {
        &self.tasks
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    /// Start a timer loop for every entry.
    ///
    /// An entry whose schedule cannot be parsed is logged and left out; the
    /// remaining entries are still scheduled.
    pub fn start(&self) -> DispatcherHandle {
        let mut handle = DispatcherHandle {
            loops: Vec::new(),
            failures: Vec::new(),
        };

        for task in &self.tasks {
            let expression = self.ctx.config().schedule_for(task.entry());
            let cron = match parse_schedule(task.label(), expression) {
                Ok(cron) => cron,
                Err(e) => {
                    tracing::error!(entry = %task.label(), error = %e, "Failed to schedule entry");
                    handle.failures.push(e);
                    continue;
                }
            };

            tracing::info!(entry = %task.label(), schedule = %expression, "Scheduled entry");
            handle.loops.push(tokio::spawn(schedule_loop(
                Arc::clone(task),
                cron,
                self.ctx.clone(),
            )));
        }

        handle
    }

    /// Run one tick of every entry concurrently and wait for all of them.
    pub async fn run_once(&self) -> Vec<TickOutcome> {
        let handles: Vec<_> = self
            .tasks
            .iter()
            .map(|task| {
                let task = Arc::clone(task);
                let ctx = self.ctx.clone();
                tokio::task::spawn_blocking(move || task.fire(&ctx))
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => tracing::error!(error = %e, "Tick worker panicked"),
            }
        }
        outcomes
    }
}

/// Next firing of `cron` and how long to wait for it from `now`.
///
/// The search starts from the later of `now` and the previous firing, so a
/// wall clock that lags the timer never yields the same occurrence twice.
pub fn next_fire(
    cron: &Cron,
    now: DateTime<Local>,
    previous: Option<DateTime<Local>>,
) -> std::result::Result<(DateTime<Local>, Duration), CronError> {
    let from = previous.map_or(now, |prev| prev.max(now));
    let next = cron.find_next_occurrence(&from, false)?;
    let wait = (next - now).to_std().unwrap_or_default();
    Ok((next, wait))
}

async fn schedule_loop(task: Arc<EntryTask>, cron: Cron, ctx: EngineContext) {
    let mut previous = None;
    loop {
        let (next, wait) = match next_fire(&cron, Local::now(), previous) {
            Ok(found) => found,
            Err(e) => {
                tracing::error!(
                    entry = %task.label(),
                    error = %e,
                    "No further occurrence for schedule, stopping entry"
                );
                return;
            }
        };

        tracing::debug!(entry = %task.label(), next = %next, "Waiting for next tick");
        tokio::time::sleep(wait).await;
        previous = Some(next);

        task.dispatch(&ctx);
    }
}

/// Running timer loops plus the entries that could not be scheduled.
#[derive(Debug)]
pub struct DispatcherHandle {
    loops: Vec<JoinHandle<()>>,
    failures: Vec<Error>,
}

impl DispatcherHandle {
    pub fn scheduled(&self) -> usize {
        self.loops.len()
    }

    pub fn failures(&self) -> &[Error] {
        &self.failures
    }

    /// Stop every timer loop. Ticks already handed to a worker thread run to
    /// completion.
    pub fn shutdown(self) {
        for handle in self.loops {
            handle.abort();
        }
    }
}
