//! Reconciliation engine.
//!
//! One run scans every task of a project, computes whether it is overdue (own due
//! value, or an incomplete overdue subtask) and converges the flag recorded by the
//! active [`FlagStrategy`] to that state. Tasks already in the desired state are left
//! untouched, so a second run over an unchanged project performs no mutations.
//!
//! Tasks are processed strictly one after another. The first API error aborts the run.

mod aggregate;

pub use aggregate::{any_subtask_overdue, first_overdue_subtask};

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::asana::{AsanaClient, AsanaError, Task};
use crate::flag::{FlagStrategy, OverdueReason};
use crate::overdue::is_overdue;

/// Fields every task listing requests, before strategy-specific ones.
const BASE_TASK_FIELDS: &[&str] = &["name", "completed", "due_on", "due_at", "num_subtasks"];

/// What happened to a single task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Observed flag already matches the computed state.
    Unchanged,
    /// Flag applied (or would be, in a dry run).
    Marked(OverdueReason),
    /// Flag removed (or would be, in a dry run).
    Cleared,
}

impl TaskOutcome {
    pub fn is_mutation(&self) -> bool {
        matches!(self, TaskOutcome::Marked(_) | TaskOutcome::Cleared)
    }
}

/// Totals for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub scanned: usize,
    pub marked: usize,
    pub cleared: usize,
    pub unchanged: usize,
    /// Sleeps caused by 429 responses during this run
    pub rate_limit_waits: u64,
    pub dry_run: bool,
}

impl RunSummary {
    /// Tasks mutated, or that would have been in a dry run.
    pub fn mutated(&self) -> usize {
        self.marked + self.cleared
    }

    fn record(&mut self, outcome: &TaskOutcome) {
        self.scanned += 1;
        if !outcome.is_mutation() {
            self.unchanged += 1;
        } else if let TaskOutcome::Marked(_) = outcome {
            self.marked += 1;
        } else {
            self.cleared += 1;
        }
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let verb = if self.dry_run { "would mutate" } else { "mutated" };
        write!(
            f,
            "{} {} of {} tasks (marked {}, cleared {}, unchanged {}, rate-limit waits {})",
            verb,
            self.mutated(),
            self.scanned,
            self.marked,
            self.cleared,
            self.unchanged,
            self.rate_limit_waits
        )
    }
}

/// Drives one reconciliation pass over a project.
pub struct Reconciler {
    client: Arc<AsanaClient>,
    strategy: Box<dyn FlagStrategy>,
    dry_run: bool,
    now: Option<DateTime<Utc>>,
}

impl Reconciler {
    pub fn new(client: Arc<AsanaClient>, strategy: Box<dyn FlagStrategy>, dry_run: bool) -> Self {
        Self {
            client,
            strategy,
            dry_run,
            now: None,
        }
    }

    /// Evaluate due dates against a fixed instant instead of the wall clock.
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    fn task_fields(&self) -> String {
        BASE_TASK_FIELDS
            .iter()
            .chain(self.strategy.task_fields())
            .copied()
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Reconcile every task of `project_gid`.
    ///
    /// # Errors
    ///
    /// Returns the first API or transport error; tasks processed before it keep
    /// whatever mutation was already applied.
    pub async fn run(&mut self, project_gid: &str) -> Result<RunSummary, AsanaError> {
        let now = self.now.unwrap_or_else(Utc::now);
        let waits_before = self.client.rate_limit_waits();

        tracing::info!(
            "Starting overdue check for project {} (strategy={}, dry_run={}, today={})",
            project_gid,
            self.strategy.name(),
            self.dry_run,
            now.date_naive()
        );

        self.strategy.prepare(project_gid).await?;

        let tasks = self
            .client
            .list_project_tasks(
                project_gid,
                &self.task_fields(),
                self.strategy.includes_completed_tasks(),
            )
            .await?;
        tracing::info!("Found {} tasks to check", tasks.len());

        let mut summary = RunSummary {
            dry_run: self.dry_run,
            ..RunSummary::default()
        };
        for task in &tasks {
            let outcome = self.reconcile_task(task, now).await?;
            summary.record(&outcome);
        }
        summary.rate_limit_waits = self.client.rate_limit_waits() - waits_before;

        tracing::info!("Overdue check complete: {}", summary);
        Ok(summary)
    }

    /// Compute the desired state of one task and converge its flag.
    pub async fn reconcile_task(
        &self,
        task: &Task,
        now: DateTime<Utc>,
    ) -> Result<TaskOutcome, AsanaError> {
        let observed = self.strategy.read_state(task);
        let clearable = self.strategy.as_clearable();

        // Nothing a one-directional strategy could do for a flagged task.
        if observed && clearable.is_none() {
            tracing::debug!("'{}' ({}) already flagged, skipping", task.name, task.gid);
            return Ok(TaskOutcome::Unchanged);
        }

        let desired = self.overdue_reason(task, now).await?;

        match (desired, observed) {
            (Some(reason), false) => {
                tracing::info!(
                    "{}Flagging '{}' ({}) as overdue via {}: {:?}",
                    self.dry_run_marker(),
                    task.name,
                    task.gid,
                    self.strategy.name(),
                    reason
                );
                self.strategy.mark(task, &reason).await?;
                Ok(TaskOutcome::Marked(reason))
            }
            (None, true) => {
                if let Some(flag) = clearable {
                    tracing::info!(
                        "{}Clearing overdue flag from '{}' ({})",
                        self.dry_run_marker(),
                        task.name,
                        task.gid
                    );
                    flag.clear(task).await?;
                    return Ok(TaskOutcome::Cleared);
                }
                Ok(TaskOutcome::Unchanged)
            }
            _ => {
                tracing::debug!("'{}' ({}) already in the desired state", task.name, task.gid);
                Ok(TaskOutcome::Unchanged)
            }
        }
    }

    /// Why the task is overdue, or `None` if it is not.
    async fn overdue_reason(
        &self,
        task: &Task,
        now: DateTime<Utc>,
    ) -> Result<Option<OverdueReason>, AsanaError> {
        if is_overdue(task, now) {
            return Ok(Some(OverdueReason::OwnDue));
        }
        if !task.may_have_subtasks() {
            return Ok(None);
        }

        tracing::info!("Checking subtasks for '{}' ({})", task.name, task.gid);
        let subtask = first_overdue_subtask(&self.client, &task.gid, now).await?;
        Ok(subtask.map(|s| {
            tracing::info!("Found overdue subtask '{}' ({})", s.name, s.gid);
            OverdueReason::Subtask { name: s.name }
        }))
    }

    fn dry_run_marker(&self) -> &'static str {
        if self.dry_run {
            "[dry-run] "
        } else {
            ""
        }
    }
}
