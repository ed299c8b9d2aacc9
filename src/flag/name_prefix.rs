//! Name-prefix strategy: overdue tasks get a marker in front of their name.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::{FlagStrategy, OverdueReason};
use crate::asana::{AsanaClient, AsanaError, Task};

/// Renames `name` to `prefix + name` and comments why. Mark only.
///
/// Not idempotent on its own: callers check `read_state` first.
pub struct NamePrefixFlag {
    client: Arc<AsanaClient>,
    prefix: String,
    dry_run: bool,
}

impl NamePrefixFlag {
    pub fn new(client: Arc<AsanaClient>, prefix: String, dry_run: bool) -> Self {
        Self {
            client,
            prefix,
            dry_run,
        }
    }

    pub fn flagged_name(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }
}

#[async_trait]
impl FlagStrategy for NamePrefixFlag {
    fn name(&self) -> &'static str {
        "name_prefix"
    }

    fn read_state(&self, task: &Task) -> bool {
        task.name.starts_with(&self.prefix)
    }

    async fn mark(&self, task: &Task, reason: &OverdueReason) -> Result<(), AsanaError> {
        let new_name = self.flagged_name(&task.name);
        let comment = reason.comment();

        if self.dry_run {
            tracing::info!(
                "[dry-run] Would rename '{}' ({}) to '{}' and comment: {}",
                task.name,
                task.gid,
                new_name,
                comment
            );
            return Ok(());
        }

        self.client
            .update_task(&task.gid, json!({ "name": new_name }))
            .await?;
        self.client.add_comment(&task.gid, &comment).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> Task {
        serde_json::from_value(json!({"gid": "1", "name": name})).unwrap()
    }

    #[test]
    fn test_prefix_detection_and_rename() {
        let flag = NamePrefixFlag::new(
            Arc::new(AsanaClient::new("t")),
            "[OVERDUE] ".to_string(),
            false,
        );

        assert!(flag.read_state(&named("[OVERDUE] Launch")));
        assert!(!flag.read_state(&named("Launch [OVERDUE] ")));
        assert!(!flag.read_state(&named("[OVERDUE]Launch")));
        assert_eq!(flag.flagged_name("Launch"), "[OVERDUE] Launch");
    }
}
