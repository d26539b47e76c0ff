use crate::types::{DocumentId, EntryId, Locale, Status, Timestamp};
use serde::{Deserialize, Serialize};

/// JSON object payload carried by every row.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

///
/// Entry
///
/// One physical row: a document in a specific locale and publication
/// status. Component rows reuse the same shape with the owning entry's
/// document id and no locale/status dimension of their own.
///
/// Invariant: for a given (document_id, locale) there is at most one
/// draft and at most one published entry.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Entry {
    pub id: EntryId,
    pub document_id: DocumentId,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<Locale>,

    /// `None` means draft; `Some` means published at that instant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<Timestamp>,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,

    pub data: JsonMap,
}

impl Entry {
    #[must_use]
    pub const fn status(&self) -> Status {
        if self.published_at.is_some() {
            Status::Published
        } else {
            Status::Draft
        }
    }

    #[must_use]
    pub const fn is_draft(&self) -> bool {
        self.published_at.is_none()
    }

    #[must_use]
    pub const fn is_published(&self) -> bool {
        self.published_at.is_some()
    }

    /// Fetch a scalar field from the payload.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.data.get(name)
    }
}
