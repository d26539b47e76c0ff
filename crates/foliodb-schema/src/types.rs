use derive_more::Display;
use serde::{Deserialize, Serialize};

///
/// SchemaRef
///
/// Stable identifier of a registered content type or component, e.g.
/// `api::article` or `shared::seo`. Used as the registry key and as the
/// discriminator value stored for dynamic-zone and morph rows.
///

#[derive(
    Clone, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[repr(transparent)]
pub struct SchemaRef(String);

impl SchemaRef {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SchemaRef {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SchemaRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

///
/// RelationKind
///
/// Exhaustive relation taxonomy. Every consumer matches on this enum, so
/// adding a kind forces handling everywhere at compile time.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
#[remain::sorted]
pub enum RelationKind {
    ManyToMany,
    ManyToOne,
    MorphMany,
    MorphOne,
    MorphToMany,
    MorphToOne,
    OneToMany,
    OneToOne,
}

impl RelationKind {
    /// True for kinds whose declaring side holds a list of targets.
    #[must_use]
    pub const fn is_to_many(self) -> bool {
        matches!(
            self,
            Self::ManyToMany | Self::MorphMany | Self::MorphToMany | Self::OneToMany
        )
    }

    /// True for polymorphic kinds (target schema varies per row).
    #[must_use]
    pub const fn is_morph(self) -> bool {
        matches!(
            self,
            Self::MorphMany | Self::MorphOne | Self::MorphToMany | Self::MorphToOne
        )
    }

    /// True for the morph kinds that carry the discriminator themselves.
    #[must_use]
    pub const fn is_morph_to(self) -> bool {
        matches!(self, Self::MorphToMany | Self::MorphToOne)
    }

    /// True for kinds that require a fixed target schema reference.
    #[must_use]
    pub const fn requires_target(self) -> bool {
        !self.is_morph_to()
    }

    /// The kind the opposite side of a bidirectional pair must declare.
    #[must_use]
    pub const fn expected_inverse(self) -> Option<Self> {
        match self {
            Self::ManyToMany => Some(Self::ManyToMany),
            Self::ManyToOne => Some(Self::OneToMany),
            Self::OneToMany => Some(Self::ManyToOne),
            Self::OneToOne => Some(Self::OneToOne),
            Self::MorphMany | Self::MorphOne | Self::MorphToMany | Self::MorphToOne => None,
        }
    }
}

///
/// ScalarKind
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
#[remain::sorted]
pub enum ScalarKind {
    BigInteger,
    Boolean,
    Date,
    DateTime,
    Decimal,
    Email,
    Enumeration,
    Float,
    Integer,
    Json,
    Password,
    RichText,
    String,
    Text,
    Time,
    Uid,
}
