//! Snapshots of Asana records as returned by the REST API.
//!
//! Only the fields the reconciler reads are modelled; everything else is ignored.

use serde::{Deserialize, Deserializer};

/// Envelope of every Asana response: `{"data": ...}`.
#[derive(Debug, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

/// One page of a paged listing.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    /// Absent or `null` on the last page.
    #[serde(default)]
    pub next_page: Option<NextPage>,
}

/// Pointer to the following page.
#[derive(Debug, Clone, Deserialize)]
pub struct NextPage {
    /// Absolute URL that already encodes the first request's query.
    pub uri: String,
}

/// Compact reference to another record (`{"gid": "...", "name": "..."}`).
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Reference {
    pub gid: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

/// Project, reduced to what is needed to resolve its workspace.
#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    pub workspace: Reference,
}

/// A workspace tag.
pub type Tag = Reference;

/// Selected option of an enum custom field.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct EnumOption {
    pub gid: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// A custom field value on a task.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomFieldValue {
    pub gid: String,
    #[serde(default)]
    pub name: Option<String>,
    /// `null` when the field is empty or not an enum field.
    #[serde(default)]
    pub enum_value: Option<EnumOption>,
}

/// A task in the scanned project.
#[derive(Debug, Clone, Deserialize)]
pub struct Task {
    pub gid: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub completed: bool,
    /// Calendar due date, `YYYY-MM-DD`.
    #[serde(default)]
    pub due_on: Option<String>,
    /// Due instant, RFC 3339.
    #[serde(default)]
    pub due_at: Option<String>,
    /// Missing when not requested; `None` means "unknown", not zero.
    #[serde(default)]
    pub num_subtasks: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<Tag>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub custom_fields: Vec<CustomFieldValue>,
}

impl Task {
    pub fn has_tag(&self, tag_gid: &str) -> bool {
        self.tags.iter().any(|t| t.gid == tag_gid)
    }

    /// Selected enum option of a custom field, if the field is present and set.
    pub fn custom_field_option(&self, field_gid: &str) -> Option<&str> {
        self.custom_fields
            .iter()
            .find(|f| f.gid == field_gid)
            .and_then(|f| f.enum_value.as_ref())
            .map(|o| o.gid.as_str())
    }

    /// Whether subtasks must be fetched to know the aggregated state.
    pub fn may_have_subtasks(&self) -> bool {
        self.num_subtasks != Some(0)
    }
}

/// A subtask, one level below a project task.
#[derive(Debug, Clone, Deserialize)]
pub struct Subtask {
    pub gid: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub completed: bool,
    #[serde(default)]
    pub due_on: Option<String>,
    #[serde(default)]
    pub due_at: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_decodes_with_nulls_and_missing_fields() {
        let task: Task = serde_json::from_value(json!({
            "gid": "1",
            "name": null,
            "completed": false,
            "due_on": null,
            "tags": null,
            "custom_fields": [
                {"gid": "cf", "name": "Progress", "enum_value": null}
            ]
        }))
        .unwrap();

        assert_eq!(task.name, "");
        assert!(task.due_on.is_none());
        assert!(task.due_at.is_none());
        assert!(task.tags.is_empty());
        assert_eq!(task.custom_field_option("cf"), None);
        assert!(task.may_have_subtasks());
    }

    #[test]
    fn test_task_lookup_helpers() {
        let task: Task = serde_json::from_value(json!({
            "gid": "1",
            "name": "Ship it",
            "completed": false,
            "num_subtasks": 0,
            "tags": [{"gid": "t1", "name": "Overdue"}],
            "custom_fields": [
                {"gid": "cf", "enum_value": {"gid": "opt-overdue", "name": "Overdue"}},
                {"gid": "other", "enum_value": {"gid": "x"}}
            ]
        }))
        .unwrap();

        assert!(task.has_tag("t1"));
        assert!(!task.has_tag("t2"));
        assert_eq!(task.custom_field_option("cf"), Some("opt-overdue"));
        assert_eq!(task.custom_field_option("missing"), None);
        assert!(!task.may_have_subtasks());
    }

    #[test]
    fn test_page_next_pointer() {
        let page: Page<Subtask> = serde_json::from_value(json!({
            "data": [{"gid": "s1", "name": "a", "completed": true}],
            "next_page": {
                "offset": "abc",
                "path": "/tasks/1/subtasks?offset=abc",
                "uri": "https://app.asana.com/api/1.0/tasks/1/subtasks?offset=abc"
            }
        }))
        .unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(
            page.next_page.unwrap().uri,
            "https://app.asana.com/api/1.0/tasks/1/subtasks?offset=abc"
        );

        let last: Page<Subtask> =
            serde_json::from_value(json!({"data": [], "next_page": null})).unwrap();
        assert!(last.next_page.is_none());
    }
}
