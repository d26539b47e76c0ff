use crate::types::SchemaRef;
use std::fmt;
use thiserror::Error as ThisError;

///
/// SchemaError
///
/// Configuration errors raised while registering or resolving a schema
/// graph. All variants are fatal for the registration they occur in: a
/// registry with an inconsistent relation graph must not be used.
///

#[derive(Debug, ThisError)]
pub enum SchemaError {
    #[error("schema '{0}' is not registered")]
    UnknownSchema(SchemaRef),

    #[error("schema '{0}' is already registered")]
    AlreadyRegistered(SchemaRef),

    #[error("schema '{0}' is not a content type")]
    NotAContentType(SchemaRef),

    #[error("'{schema}.{attribute}': relation requires a target schema")]
    MissingTargetRef { schema: SchemaRef, attribute: String },

    #[error("'{schema}.{attribute}': relation target '{target}' is not registered")]
    MissingTarget {
        schema: SchemaRef,
        attribute: String,
        target: SchemaRef,
    },

    #[error("'{schema}.{attribute}': a bidirectional one-to-many side cannot own the relation")]
    OneToManyOwner { schema: SchemaRef, attribute: String },

    #[error("'{schema}.{attribute}': target '{target}' does not declare morph attribute '{morph_by}'")]
    MissingMorphBy {
        schema: SchemaRef,
        attribute: String,
        target: SchemaRef,
        morph_by: String,
    },

    #[error("'{schema}.{attribute}': '{morph_by}' on '{target}' is not a morph-to relation")]
    InvalidMorphBy {
        schema: SchemaRef,
        attribute: String,
        target: SchemaRef,
        morph_by: String,
    },

    #[error("join table '{0}' is registered twice")]
    DuplicateJoinTable(String),

    #[error("validation failed: {0}")]
    Validation(ErrorTree),
}

///
/// ErrorTree
///
/// Accumulates validation failures across a whole registry walk so a
/// single resolve reports every configuration error, not just the first.
///

#[derive(Debug, Default)]
pub struct ErrorTree {
    errors: Vec<String>,
}

impl ErrorTree {
    #[must_use]
    pub const fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn add(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Collapse into `Err(self)` when any error was recorded.
    pub fn result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ErrorTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.errors.join("; "))
    }
}

/// Push a formatted message onto an [`ErrorTree`].
#[macro_export]
macro_rules! err {
    ($errs:expr, $($arg:tt)*) => {
        $errs.add(format!($($arg)*))
    };
}
