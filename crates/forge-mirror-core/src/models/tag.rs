//! Tags as read from version control.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tag in a repository's history.
///
/// `object_id` is the hex id of the object the tag resolves to (the peeled
/// target for annotated tags).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub name: String,
    pub object_id: String,
    pub tagger_time: Option<DateTime<Utc>>,
}

impl Tag {
    pub fn new(name: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            object_id: object_id.into(),
            tagger_time: None,
        }
    }

    pub fn with_tagger_time(mut self, when: DateTime<Utc>) -> Self {
        self.tagger_time = Some(when);
        self
    }

    /// Unix seconds of the tagger time, 0 when the tag carries none.
    pub fn created_unix(&self) -> i64 {
        self.tagger_time.map(|t| t.timestamp()).unwrap_or(0)
    }

    pub fn lower_name(&self) -> String {
        self.name.to_lowercase()
    }
}
