//! Subtask aggregation: does any incomplete subtask make its parent overdue?

use chrono::{DateTime, Utc};

use crate::asana::{AsanaClient, AsanaError, Subtask};
use crate::overdue::is_overdue;

/// First overdue subtask of `parent_gid`, walking pages in order.
///
/// Each fetched page is evaluated in full; later pages are not requested once a
/// match is found.
pub async fn first_overdue_subtask(
    client: &AsanaClient,
    parent_gid: &str,
    now: DateTime<Utc>,
) -> Result<Option<Subtask>, AsanaError> {
    let mut page = client.first_subtask_page(parent_gid).await?;

    loop {
        let mut overdue = page.data.into_iter().filter(|s| is_overdue(s, now));
        let found = overdue.next();
        let also_overdue = overdue.count();

        if let Some(subtask) = found {
            tracing::debug!(
                "Task {} has overdue subtask '{}' ({} more on the same page)",
                parent_gid,
                subtask.name,
                also_overdue
            );
            return Ok(Some(subtask));
        }

        match page.next_page {
            Some(next) => page = client.fetch_page(&next.uri, &[]).await?,
            None => return Ok(None),
        }
    }
}

/// Whether any incomplete subtask of `parent_gid` is overdue.
pub async fn any_subtask_overdue(
    client: &AsanaClient,
    parent_gid: &str,
    now: DateTime<Utc>,
) -> Result<bool, AsanaError> {
    Ok(first_overdue_subtask(client, parent_gid, now).await?.is_some())
}
