use serde::{Deserialize, Serialize};

/// Wrapper Redmine uses for single-issue payloads in both directions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueEnvelope<T> {
    pub issue: T,
}

/// Fields sent when updating an issue.
///
/// Optional fields are omitted from the JSON body entirely so that Redmine
/// leaves them untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IssuePatch {
    /// Journal note appended to the issue
    pub notes: String,
    /// New status id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_id: Option<u32>,
    /// New completion percentage; only ever set together with `status_id`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done_ratio: Option<u8>,
}

impl IssuePatch {
    pub fn new(notes: String) -> Self {
        Self {
            notes,
            ..Self::default()
        }
    }

    /// Move the issue to `status_id`, with an optional done ratio.
    pub fn transition(&mut self, status_id: u32, done_ratio: Option<u8>) {
        self.status_id = Some(status_id);
        self.done_ratio = done_ratio;
    }
}

/// The part of `GET /issues/{id}.json` needed for the guard check.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueState {
    #[serde(default)]
    pub status: Option<IssueStatusRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueStatusRef {
    pub id: Option<u32>,
}

/// Top-level shape of the issue read; `issue` may be missing on odd replies.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueStateResponse {
    #[serde(default)]
    pub issue: Option<IssueState>,
}

impl IssueStateResponse {
    pub fn status_id(&self) -> Option<u32> {
        self.issue.as_ref()?.status.as_ref()?.id
    }
}
