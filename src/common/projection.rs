use crate::common::value::{self, Document, IDENTITY_FIELD};

use aws_sdk_dynamodb::types;
use indexmap::IndexMap;
use serde::{Serialize, Serializer};

/// Fields returned by a read.
///
/// A projection listing any field other than the identity as `true` is inclusive: only
/// the listed fields are returned, plus the identity unless it is set to `false`.
/// Otherwise the projection is exclusive: every field set to `false` is dropped.
/// The default projection hides the identity and keeps everything else.
///
/// ```rust
/// use shelter_repository::common::projection::Projection;
///
/// let names_only = Projection::all()
///     .with("name", true)
///     .with("_id", false);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Projection {
    fields: IndexMap<String, bool>,
}

impl Default for Projection {
    fn default() -> Self {
        Self::all().with(IDENTITY_FIELD, false)
    }
}

impl Projection {
    /// Projection returning whole documents, identity included.
    pub fn all() -> Self {
        Self {
            fields: IndexMap::new(),
        }
    }

    /// Include or exclude a field.
    pub fn with(mut self, field: impl Into<String>, included: bool) -> Self {
        self.fields.insert(field.into(), included);
        self
    }

    fn is_inclusive(&self) -> bool {
        let mut fields = self
            .fields
            .iter()
            .filter(|(field, _)| field.as_str() != IDENTITY_FIELD)
            .peekable();
        if fields.peek().is_some() {
            fields.any(|(_, included)| *included)
        } else {
            self.fields.get(IDENTITY_FIELD).copied().unwrap_or(false)
        }
    }

    fn shows_identity(&self) -> bool {
        self.fields.get(IDENTITY_FIELD).copied().unwrap_or(true)
    }

    /// Fields an inclusive projection returns; `None` when the projection is exclusive.
    pub fn included_fields(&self) -> Option<Vec<String>> {
        if !self.is_inclusive() {
            return None;
        }
        let mut fields: Vec<String> = self
            .fields
            .iter()
            .filter(|(field, included)| **included && field.as_str() != IDENTITY_FIELD)
            .map(|(field, _)| field.clone())
            .collect();
        if self.shows_identity() {
            fields.insert(0, IDENTITY_FIELD.to_string());
        }
        Some(fields)
    }

    /// Keep only the fields the projection returns.
    pub fn apply(&self, mut document: Document) -> Document {
        if self.is_inclusive() {
            let shows_identity = self.shows_identity();
            document.retain(|field, _| {
                if field == IDENTITY_FIELD {
                    shows_identity
                } else {
                    self.fields.get(field).copied().unwrap_or(false)
                }
            });
        } else {
            document.retain(|field, _| self.fields.get(field).copied().unwrap_or(true));
        }
        document
    }

    /// Projection from a raw mapping of booleans, `0`/`1` also accepted.
    ///
    /// Mixing inclusion and exclusion on fields other than the identity is malformed.
    pub(crate) fn from_mapping(mapping: value::Mapping) -> Option<Self> {
        let mut entries: Vec<_> = mapping.into_iter().collect();
        entries.sort_by(|(left, _), (right, _)| left.cmp(right));
        let mut projection = Self::all();
        let mut mode = None;
        for (field, flag) in entries {
            let included = match flag {
                types::AttributeValue::Bool(included) => included,
                types::AttributeValue::N(number) => number.parse::<f64>().ok()? != 0.0,
                _ => return None,
            };
            if field != IDENTITY_FIELD && *mode.get_or_insert(included) != included {
                return None;
            }
            projection.fields.insert(field, included);
        }
        Some(projection)
    }

    /// Projection used by a read: a malformed argument hides the identity only.
    pub(crate) fn coerce<T: Serialize>(raw: T) -> Self {
        match value::to_mapping(raw).and_then(Self::from_mapping) {
            Some(projection) => projection,
            None => {
                #[cfg(feature = "tracing")]
                tracing::debug!("malformed projection coerced to hide the identity field");
                Self::default()
            }
        }
    }
}

impl Serialize for Projection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(&self.fields)
    }
}
