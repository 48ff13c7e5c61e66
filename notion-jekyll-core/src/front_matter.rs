//! YAML front matter: writing it for new posts and recovering it from existing files.
//!
//! A managed post looks like
//!
//! ```text
//! ---
//! title: Hello
//! date: 2024-01-02T03:04:05Z
//! last_modified_at: 2024-01-03T00:00:00Z
//! notion_id: 0f1e2d3c-...
//! categories: []
//! tags:
//! - rust
//! ---
//!
//! body...
//! ```
//!
//! Decoding never fails: anything that does not look like the block above is reported
//! as "no header" and the file is left alone as unmanaged content.

use std::borrow::Cow;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::model::PageMetadata;

const OPEN: &str = "---\n";
const CLOSE: &str = "---\n\n";

/// Front matter keys written to and read from posts. Field order is the key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontMatter {
    #[serde(default)]
    pub title: String,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_modified_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notion_id: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl FrontMatter {
    /// The join key, if the header carries a usable one.
    pub fn stable_id(&self) -> Option<&str> {
        self.notion_id.as_deref().filter(|id| !id.trim().is_empty())
    }
}

impl From<&PageMetadata> for FrontMatter {
    fn from(page: &PageMetadata) -> Self {
        Self {
            title: page.title.clone(),
            date: Some(page.created_at),
            last_modified_at: Some(page.modified_at),
            notion_id: Some(page.stable_id.clone()),
            categories: page.categories.clone(),
            tags: page.tags.clone(),
        }
    }
}

/// Serialises the header block, including the trailing blank line.
pub fn encode(page: &PageMetadata) -> Result<String, serde_yaml::Error> {
    let yaml = serde_yaml::to_string(&FrontMatter::from(page))?;
    Ok(format!("{OPEN}{yaml}{CLOSE}"))
}

/// Recovers the header of an existing file. `None` means the file carries no
/// front matter this tool can read.
pub fn decode(content: &str) -> Option<FrontMatter> {
    let content: Cow<'_, str> = if content.contains("\r\n") {
        Cow::Owned(content.replace("\r\n", "\n"))
    } else {
        Cow::Borrowed(content)
    };

    let header = header_region(&content)?;
    match serde_yaml::from_str::<FrontMatter>(header) {
        Ok(front_matter) => Some(front_matter),
        Err(e) => {
            debug!(error = %e, "Front matter present but not parseable, treating as no header");
            None
        }
    }
}

/// The text between the first `---` line and the first following `---` line that is
/// followed by a blank line.
fn header_region(content: &str) -> Option<&str> {
    let open_at = if content.starts_with(OPEN) {
        0
    } else {
        content.find("\n---\n")? + 1
    };
    let rest = &content[open_at + OPEN.len()..];

    let close_at = if rest.starts_with(CLOSE) {
        0
    } else {
        rest.find("\n---\n\n")? + 1
    };
    Some(&rest[..close_at])
}

/// Accepts RFC 3339 and Jekyll's `YYYY-MM-DD HH:MM:SS +ZZZZ`; anything else is `None`
/// rather than a parse failure of the whole header.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_yaml::Value>::deserialize(deserializer)?;
    let Some(serde_yaml::Value::String(raw)) = raw else {
        return Ok(None);
    };
    Ok(parse_timestamp(&raw))
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S %z") {
        return Some(ts.with_timezone(&Utc));
    }
    // Offset-less timestamps, e.g. `2021-09-04T19:05:00.0000000`, are taken as UTC.
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}
