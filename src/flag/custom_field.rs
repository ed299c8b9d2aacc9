//! Custom-field strategy: an enum custom field set to the "overdue" option.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::{FlagStrategy, OverdueReason};
use crate::asana::{AsanaClient, AsanaError, Task};

/// Sets `field_gid` to `option_gid`. Mark only: the field is never reset.
pub struct CustomFieldFlag {
    client: Arc<AsanaClient>,
    field_gid: String,
    option_gid: String,
    dry_run: bool,
}

impl CustomFieldFlag {
    pub fn new(
        client: Arc<AsanaClient>,
        field_gid: String,
        option_gid: String,
        dry_run: bool,
    ) -> Self {
        Self {
            client,
            field_gid,
            option_gid,
            dry_run,
        }
    }
}

#[async_trait]
impl FlagStrategy for CustomFieldFlag {
    fn name(&self) -> &'static str {
        "custom_field"
    }

    fn task_fields(&self) -> &'static [&'static str] {
        &["custom_fields", "custom_fields.enum_value"]
    }

    fn read_state(&self, task: &Task) -> bool {
        task.custom_field_option(&self.field_gid) == Some(self.option_gid.as_str())
    }

    async fn mark(&self, task: &Task, _reason: &OverdueReason) -> Result<(), AsanaError> {
        if self.dry_run {
            tracing::info!(
                "[dry-run] Would set custom field {} to {} on '{}' ({})",
                self.field_gid,
                self.option_gid,
                task.name,
                task.gid
            );
            return Ok(());
        }

        let mut custom_fields = serde_json::Map::new();
        custom_fields.insert(self.field_gid.clone(), json!(self.option_gid));
        self.client
            .update_task(&task.gid, json!({ "custom_fields": custom_fields }))
            .await
    }
}
