//! Asana API access: HTTP client, pagination and record types.

mod client;
mod error;
pub mod types;

pub use client::{AsanaClient, RateLimitPolicy};
pub use error::{parse_retry_after, AsanaError, DEFAULT_RETRY_AFTER};
pub use types::{CustomFieldValue, EnumOption, NextPage, Page, Subtask, Tag, Task};
