use crate::error::{Error, ErrorOrigin};
use chrono::{DateTime, Utc};
use derive_more::{Deref, Display, FromStr};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::str::FromStr as _;
use ulid::Ulid;

///
/// DocumentId
///
/// Stable identifier of a logical document, independent of locale and
/// publication status. Not a storage primary key.
///

#[derive(
    Clone, Copy, Debug, Deref, Display, Eq, FromStr, Hash, Ord, PartialEq, PartialOrd,
)]
#[repr(transparent)]
pub struct DocumentId(Ulid);

impl DocumentId {
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new())
    }

    #[must_use]
    pub const fn nil() -> Self {
        Self(Ulid::nil())
    }

    pub fn parse(value: &str) -> Result<Self, Error> {
        Ulid::from_str(value)
            .map(Self)
            .map_err(|err| Error::validation(ErrorOrigin::Query, format!("invalid document id '{value}': {err}")))
    }
}

impl Serialize for DocumentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for DocumentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ulid::from_str(&raw).map(Self).map_err(de::Error::custom)
    }
}

///
/// EntryId
///
/// Storage primary key of one physical row (entry or component row).
///

#[derive(
    Clone, Copy, Debug, Deref, Display, Eq, FromStr, Hash, Ord, PartialEq, PartialOrd,
)]
#[repr(transparent)]
pub struct EntryId(Ulid);

impl EntryId {
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new())
    }

    #[must_use]
    pub const fn nil() -> Self {
        Self(Ulid::nil())
    }

    pub fn parse(value: &str) -> Result<Self, Error> {
        Ulid::from_str(value)
            .map(Self)
            .map_err(|err| Error::validation(ErrorOrigin::Query, format!("invalid entry id '{value}': {err}")))
    }
}

impl Serialize for EntryId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for EntryId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ulid::from_str(&raw).map(Self).map_err(de::Error::custom)
    }
}

///
/// Timestamp
/// (unix milliseconds)
///

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[repr(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const EPOCH: Self = Self(u64::MIN);

    /// Current wall-clock time. Falls back to the epoch if the clock
    /// reads before 1970.
    #[must_use]
    pub fn now() -> Self {
        let millis = Utc::now().timestamp_millis();
        Self(u64::try_from(millis).unwrap_or(u64::MIN))
    }

    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// RFC 3339 rendering for logs and projections.
    #[must_use]
    pub fn to_rfc3339(self) -> String {
        i64::try_from(self.0)
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map_or_else(|| "invalid".to_string(), |dt| dt.to_rfc3339())
    }
}

///
/// Status
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Draft,
    Published,
}

impl Status {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
        }
    }

    #[must_use]
    pub const fn is_published(self) -> bool {
        matches!(self, Self::Published)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

///
/// Locale
///

#[derive(
    Clone, Debug, Deref, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[repr(transparent)]
pub struct Locale(String);

impl Locale {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Locale {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

// ----------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::{DocumentId, Status, Timestamp};

    #[test]
    fn document_id_round_trips_through_its_string_form() {
        let id = DocumentId::generate();
        let parsed = DocumentId::parse(&id.to_string()).expect("rendered id should parse");
        assert_eq!(parsed, id);
    }

    #[test]
    fn document_id_rejects_garbage() {
        assert!(DocumentId::parse("not-a-ulid").is_err());
    }

    #[test]
    fn status_defaults_to_draft() {
        assert_eq!(Status::default(), Status::Draft);
        assert!(!Status::default().is_published());
    }

    #[test]
    fn timestamp_renders_rfc3339() {
        let ts = Timestamp::from_millis(0);
        assert!(ts.to_rfc3339().starts_with("1970-01-01"));
    }
}
