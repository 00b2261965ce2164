//! Error types returned by repository operations.

use std::fmt;

/// Which argument of a mutating operation was rejected.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Argument {
    /// The document passed to create.
    Document,
    /// The filter passed to update or delete.
    Filter,
    /// The field values passed to update.
    NewValues,
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Document => "document",
            Self::Filter => "filter",
            Self::NewValues => "new values",
        };
        f.write_str(name)
    }
}

/// Reason a mutating operation was rejected before the store was contacted.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum InvalidInput {
    /// The argument is not a mapping (a scalar, a sequence, or null).
    #[error("the {0} must be a mapping")]
    NotAMapping(Argument),
    /// The argument is a mapping without any field.
    #[error("the {0} must not be empty")]
    Empty(Argument),
    /// A field holds a value outside of string, number, boolean and null.
    #[error("field `{field}` of the {argument} holds an unsupported value")]
    UnsupportedValue {
        /// The rejected argument.
        argument: Argument,
        /// The offending field.
        field: String,
    },
    /// A field uses an operator that is not supported.
    #[error("field `{field}` of the {argument} uses unsupported operator `{operator}`")]
    UnsupportedOperator {
        /// The rejected argument.
        argument: Argument,
        /// The offending field.
        field: String,
        /// The operator as supplied.
        operator: String,
    },
    /// A field may not be written by this operation.
    #[error("field `{field}` of the {argument} is read-only")]
    ReadOnlyField {
        /// The rejected argument.
        argument: Argument,
        /// The offending field.
        field: String,
    },
}

/// Failure of a repository operation.
///
/// Invalid input is only ever reported by create, update and delete. Store failures are
/// propagated as they are, never replaced by a default result.
#[derive(Debug, thiserror::Error)]
pub enum Error<E> {
    /// The request was rejected before reaching the store.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInput),
    /// The store failed to serve the request.
    #[error("store failure: {0}")]
    Store(#[source] E),
}

impl<E> Error<E> {
    /// Whether the request was rejected before reaching the store.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}
