//! Flag strategies: how overdue-ness is recorded on a task.
//!
//! Supports:
//! - `tag`: add/remove a workspace tag, with a comment on each transition
//! - `custom_field`: set an enum custom field to the "overdue" option (mark only)
//! - `name_prefix`: prepend a marker to the task name (mark only)
//!
//! Every strategy receives the dry-run toggle at construction. In dry-run mode
//! mutating calls are logged and reported as successful without reaching the API.

mod custom_field;
mod name_prefix;
mod tag;

pub use custom_field::CustomFieldFlag;
pub use name_prefix::NamePrefixFlag;
pub use tag::TagFlag;

use std::sync::Arc;

use async_trait::async_trait;

use crate::asana::{AsanaClient, AsanaError, Task};
use crate::config::FlagConfig;

/// Why a task is being marked overdue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverdueReason {
    /// The task's own due date or instant has passed.
    OwnDue,
    /// An incomplete subtask is overdue.
    Subtask { name: String },
}

impl OverdueReason {
    /// Comment posted when a strategy announces the flag.
    pub fn comment(&self) -> String {
        match self {
            OverdueReason::OwnDue => {
                "This task has been flagged as overdue: its due date has passed.".to_string()
            }
            OverdueReason::Subtask { name } => format!(
                "This task has been flagged as overdue: subtask '{}' is past its due date.",
                name
            ),
        }
    }
}

/// A way of recording overdue-ness on a task.
#[async_trait]
pub trait FlagStrategy: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Extra `opt_fields` the task listing must include for `read_state`.
    fn task_fields(&self) -> &'static [&'static str] {
        &[]
    }

    /// Whether completed tasks must be listed too (so their flag can be cleared).
    fn includes_completed_tasks(&self) -> bool {
        false
    }

    /// One-time setup before a run, e.g. resolving a tag.
    async fn prepare(&mut self, _project_gid: &str) -> Result<(), AsanaError> {
        Ok(())
    }

    /// Whether the snapshot already carries the overdue flag.
    fn read_state(&self, task: &Task) -> bool;

    /// Record the task as overdue.
    async fn mark(&self, task: &Task, reason: &OverdueReason) -> Result<(), AsanaError>;

    /// Clearing capability, for strategies that can unflag a task.
    fn as_clearable(&self) -> Option<&dyn ClearableFlag> {
        None
    }
}

/// Strategies whose flag can be removed once a task is no longer overdue.
#[async_trait]
pub trait ClearableFlag: Send + Sync {
    async fn clear(&self, task: &Task) -> Result<(), AsanaError>;
}

/// Build the strategy selected by configuration.
pub fn build_strategy(
    config: &FlagConfig,
    client: Arc<AsanaClient>,
    dry_run: bool,
) -> Box<dyn FlagStrategy> {
    match config {
        FlagConfig::Tag { tag_name } => Box::new(TagFlag::new(client, tag_name.clone(), dry_run)),
        FlagConfig::CustomField {
            field_gid,
            option_gid,
        } => Box::new(CustomFieldFlag::new(
            client,
            field_gid.clone(),
            option_gid.clone(),
            dry_run,
        )),
        FlagConfig::NamePrefix { prefix } => {
            Box::new(NamePrefixFlag::new(client, prefix.clone(), dry_run))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_strategy_selects_variant() {
        let client = Arc::new(AsanaClient::new("t"));

        let tag = build_strategy(
            &FlagConfig::Tag {
                tag_name: "Overdue".to_string(),
            },
            client.clone(),
            false,
        );
        assert_eq!(tag.name(), "tag");
        assert!(tag.as_clearable().is_some());
        assert!(tag.includes_completed_tasks());

        let field = build_strategy(
            &FlagConfig::CustomField {
                field_gid: "cf".to_string(),
                option_gid: "opt".to_string(),
            },
            client.clone(),
            false,
        );
        assert_eq!(field.name(), "custom_field");
        assert!(field.as_clearable().is_none());

        let prefix = build_strategy(
            &FlagConfig::NamePrefix {
                prefix: "[OVERDUE] ".to_string(),
            },
            client,
            true,
        );
        assert_eq!(prefix.name(), "name_prefix");
        assert!(prefix.as_clearable().is_none());
    }

    #[test]
    fn test_reason_comment() {
        assert!(OverdueReason::OwnDue.comment().contains("its due date has passed"));
        let reason = OverdueReason::Subtask {
            name: "Write docs".to_string(),
        };
        assert!(reason.comment().contains("'Write docs'"));
    }
}
