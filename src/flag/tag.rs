//! Tag strategy: a workspace tag marks overdue tasks.

use std::sync::Arc;

use async_trait::async_trait;

use super::{ClearableFlag, FlagStrategy, OverdueReason};
use crate::asana::{AsanaClient, AsanaError, Task};

const RESOLVED_COMMENT: &str =
    "Overdue flag removed: this task and its subtasks are no longer overdue.";

/// Adds the tag (plus a comment) when a task becomes overdue and removes it (plus a
/// comment) once it no longer is.
pub struct TagFlag {
    client: Arc<AsanaClient>,
    tag_name: String,
    /// Resolved by `prepare`. Stays `None` in a dry run when the tag does not exist yet.
    tag_gid: Option<String>,
    dry_run: bool,
}

impl TagFlag {
    pub fn new(client: Arc<AsanaClient>, tag_name: String, dry_run: bool) -> Self {
        Self {
            client,
            tag_name,
            tag_gid: None,
            dry_run,
        }
    }

    /// Use an already-known tag and skip the lookup.
    pub fn with_tag_gid(mut self, tag_gid: impl Into<String>) -> Self {
        self.tag_gid = Some(tag_gid.into());
        self
    }

    pub fn tag_gid(&self) -> Option<&str> {
        self.tag_gid.as_deref()
    }

    fn unresolved(&self) -> AsanaError {
        AsanaError::Unresolved(format!(
            "tag '{}' has no gid; call prepare first",
            self.tag_name
        ))
    }
}

#[async_trait]
impl FlagStrategy for TagFlag {
    fn name(&self) -> &'static str {
        "tag"
    }

    fn task_fields(&self) -> &'static [&'static str] {
        &["tags", "tags.name"]
    }

    fn includes_completed_tasks(&self) -> bool {
        true
    }

    /// Find the tag by name in the project's workspace, creating it if missing.
    async fn prepare(&mut self, project_gid: &str) -> Result<(), AsanaError> {
        if self.tag_gid.is_some() {
            return Ok(());
        }

        let workspace_gid = self.client.project_workspace(project_gid).await?;
        let tags = self.client.list_workspace_tags(&workspace_gid).await?;

        if let Some(tag) = tags.into_iter().find(|t| t.name == self.tag_name) {
            tracing::info!("Using tag '{}' ({})", tag.name, tag.gid);
            self.tag_gid = Some(tag.gid);
            return Ok(());
        }

        if self.dry_run {
            tracing::info!(
                "[dry-run] Would create tag '{}' in workspace {}",
                self.tag_name,
                workspace_gid
            );
            return Ok(());
        }

        let tag = self.client.create_tag(&workspace_gid, &self.tag_name).await?;
        tracing::info!("Created tag '{}' ({})", tag.name, tag.gid);
        self.tag_gid = Some(tag.gid);
        Ok(())
    }

    fn read_state(&self, task: &Task) -> bool {
        self.tag_gid
            .as_deref()
            .map_or(false, |gid| task.has_tag(gid))
    }

    async fn mark(&self, task: &Task, reason: &OverdueReason) -> Result<(), AsanaError> {
        let comment = reason.comment();
        match (&self.tag_gid, self.dry_run) {
            (Some(tag_gid), false) => {
                self.client.add_tag(&task.gid, tag_gid).await?;
                self.client.add_comment(&task.gid, &comment).await?;
            }
            (None, false) => return Err(self.unresolved()),
            (_, true) => {
                tracing::info!(
                    "[dry-run] Would tag '{}' ({}) with '{}' and comment: {}",
                    task.name,
                    task.gid,
                    self.tag_name,
                    comment
                );
            }
        }
        Ok(())
    }

    fn as_clearable(&self) -> Option<&dyn ClearableFlag> {
        Some(self)
    }
}

#[async_trait]
impl ClearableFlag for TagFlag {
    async fn clear(&self, task: &Task) -> Result<(), AsanaError> {
        match (&self.tag_gid, self.dry_run) {
            (Some(tag_gid), false) => {
                self.client.remove_tag(&task.gid, tag_gid).await?;
                self.client.add_comment(&task.gid, RESOLVED_COMMENT).await?;
            }
            (None, false) => return Err(self.unresolved()),
            (_, true) => {
                tracing::info!(
                    "[dry-run] Would remove tag '{}' from '{}' ({})",
                    self.tag_name,
                    task.name,
                    task.gid
                );
            }
        }
        Ok(())
    }
}
