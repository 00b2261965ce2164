use crate::common::value::{Document, Value};

use std::cmp;

static NULL: Value = Value::Null;

/// Direction of a sort key.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum SortOrder {
    /// Smallest values first.
    #[default]
    Ascending,
    /// Largest values first.
    Descending,
}

impl TryFrom<i32> for SortOrder {
    type Error = i32;

    /// `1` sorts ascending, `-1` descending.
    fn try_from(direction: i32) -> Result<Self, Self::Error> {
        match direction {
            1 => Ok(Self::Ascending),
            -1 => Ok(Self::Descending),
            other => Err(other),
        }
    }
}

/// Ordered sort keys; earlier keys take precedence, later ones break ties.
///
/// ```rust
/// use shelter_repository::common::sort::{Sort, SortOrder};
///
/// let sort = Sort::default()
///     .by("age_upon_outcome_in_weeks", SortOrder::Ascending)
///     .by("name", SortOrder::Descending);
/// ```
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Sort {
    keys: Vec<(String, SortOrder)>,
}

impl Sort {
    /// Append a sort key.
    pub fn by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.keys.push((field.into(), order));
        self
    }

    /// Whether the sort has no key.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Sort keys in precedence order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, SortOrder)> {
        self.keys.iter().map(|(field, order)| (field.as_str(), *order))
    }

    /// Compare two documents; a missing field sorts like null.
    pub fn compare(&self, left: &Document, right: &Document) -> cmp::Ordering {
        for (field, order) in &self.keys {
            let left = left.get(field).unwrap_or(&NULL);
            let right = right.get(field).unwrap_or(&NULL);
            let ordering = match order {
                SortOrder::Ascending => left.total_cmp(right),
                SortOrder::Descending => right.total_cmp(left),
            };
            if ordering.is_ne() {
                return ordering;
            }
        }
        cmp::Ordering::Equal
    }
}

impl<S: Into<String>> FromIterator<(S, SortOrder)> for Sort {
    fn from_iter<I: IntoIterator<Item = (S, SortOrder)>>(keys: I) -> Self {
        let keys = keys
            .into_iter()
            .map(|(field, order)| (field.into(), order))
            .collect();
        Self { keys }
    }
}
