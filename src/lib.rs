//! # Overdue Flagger
//!
//! One-shot reconciler that marks overdue tasks in an Asana project.
//!
//! A task is overdue when its own due date (or instant) has passed while it is
//! incomplete, or when any of its incomplete subtasks is overdue. Each run scans the
//! whole project, compares that computed state with the flag already recorded on the
//! task and issues only the calls needed to converge.
//!
//! ## Flow
//! 1. Load configuration from the environment
//! 2. Let the flag strategy prepare (e.g. find or create the tag)
//! 3. List every project task, following pagination to the end
//! 4. For each task: evaluate its due value, then its subtasks if needed
//! 5. Mark (or, for tags, clear) the flag where observed and desired state differ
//!
//! ## Modules
//! - `asana`: HTTP client with rate-limit retry and pagination
//! - `overdue`: the overdue predicate
//! - `flag`: tag, custom-field and name-prefix flag strategies
//! - `reconcile`: the reconciliation engine and subtask aggregation
//! - `config`: environment configuration

pub mod asana;
pub mod config;
pub mod flag;
pub mod overdue;
pub mod reconcile;

pub use asana::{AsanaClient, AsanaError};
pub use config::{Config, ConfigError, FlagConfig};
pub use flag::{build_strategy, FlagStrategy};
pub use reconcile::{Reconciler, RunSummary};
