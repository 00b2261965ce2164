//! Collection handles the repository composes against.
//!
//! A collection is already connected and authenticated when it is handed to the
//! repository. This module provides:
//! - The [`Collection`] trait with its four primitives
//! - An in-process collection, mainly for tests and embedding
//! - A collection backed by an Amazon DynamoDB table

/// Collection backed by an Amazon DynamoDB table.
pub mod dynamodb;

/// In-process collection.
pub mod memory;

use crate::common::{
    filter::Filter,
    projection::Projection,
    sort::Sort,
    value::{Document, IDENTITY_FIELD, Value},
};

use uuid::Uuid;

/// Normalized read request handed to [`Collection::find`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FindQuery {
    /// Documents to select.
    pub filter: Filter,
    /// Fields to return.
    pub projection: Projection,
    /// Order applied before the limit.
    pub sort: Option<Sort>,
    /// Maximum number of documents, `0` for no limit.
    pub limit: usize,
}

impl FindQuery {
    /// Select, order, limit and project documents held in process.
    pub fn evaluate<I: IntoIterator<Item = Document>>(&self, documents: I) -> Vec<Document> {
        let matched = documents
            .into_iter()
            .filter(|document| self.filter.matches(document));
        self.arrange(matched)
    }

    /// Order, limit and project documents the filter was already applied to.
    pub fn arrange<I: IntoIterator<Item = Document>>(&self, documents: I) -> Vec<Document> {
        let mut documents: Vec<_> = documents.into_iter().collect();
        if let Some(sort) = &self.sort {
            documents.sort_by(|left, right| sort.compare(left, right));
        }
        if self.limit > 0 {
            documents.truncate(self.limit);
        }
        documents
            .into_iter()
            .map(|document| self.projection.apply(document))
            .collect()
    }

    /// Fields a store has to return so the query can be arranged in process.
    ///
    /// `None` means whole documents are needed.
    pub fn selection(&self) -> Option<Vec<String>> {
        let mut fields = self.projection.included_fields()?;
        if let Some(sort) = &self.sort {
            for (field, _) in sort.iter() {
                if !fields.iter().any(|selected| selected == field) {
                    fields.push(field.to_string());
                }
            }
        }
        Some(fields)
    }
}

/// Identity of a document, assigning a fresh one if it has none.
pub(crate) fn assign_identity(document: &mut Document) -> String {
    if let Some(Value::String(identity)) = document.get(IDENTITY_FIELD) {
        return identity.clone();
    }
    let identity = Uuid::new_v4().to_string();
    document.shift_insert(
        0,
        IDENTITY_FIELD.to_string(),
        Value::String(identity.clone()),
    );
    identity
}

/// Logical collection of documents in a document store.
///
/// Every primitive is a single request against the store. Implementations are shared
/// between concurrent callers and provide their own consistency guarantees.
pub trait Collection: Send + Sync {
    /// Failure reported by the store.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Insert one document, returning the identity the store acknowledged.
    fn insert_one(
        &self,
        document: Document,
    ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send;

    /// Documents matching the query, ordered and limited as requested.
    fn find(
        &self,
        query: &FindQuery,
    ) -> impl Future<Output = Result<Vec<Document>, Self::Error>> + Send;

    /// Merge field values into every matching document, returning how many changed.
    fn update_many(
        &self,
        filter: &Filter,
        new_values: &Document,
    ) -> impl Future<Output = Result<u64, Self::Error>> + Send;

    /// Remove every matching document, returning how many were removed.
    fn delete_many(
        &self,
        filter: &Filter,
    ) -> impl Future<Output = Result<u64, Self::Error>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{filter::Condition, sort::SortOrder};

    use rstest::rstest;

    fn animals() -> Vec<Document> {
        [("Rex", 3), ("Bella", 5), ("Milo", 1), ("Luna", 8), ("Max", 2)]
            .into_iter()
            .map(|(name, age)| {
                Document::from([
                    ("_id".to_string(), Value::from(name.to_lowercase())),
                    ("name".to_string(), Value::from(name)),
                    ("age".to_string(), Value::from(age)),
                ])
            })
            .collect()
    }

    fn names(documents: &[Document]) -> Vec<Value> {
        documents
            .iter()
            .filter_map(|document| document.get("name").cloned())
            .collect()
    }

    #[rstest]
    #[case::everything(FindQuery::default(), vec!["Rex", "Bella", "Milo", "Luna", "Max"])]
    #[case::sort_before_limit(
        FindQuery {
            sort: Some(Sort::default().by("age", SortOrder::Ascending)),
            limit: 3,
            ..Default::default()
        },
        vec!["Milo", "Max", "Rex"]
    )]
    #[case::filter_then_limit(
        FindQuery {
            filter: Filter::default().with("age", Condition::GreaterThan(Value::from(2))),
            limit: 2,
            ..Default::default()
        },
        vec!["Rex", "Bella"]
    )]
    fn test_evaluate(#[case] query: FindQuery, #[case] expected: Vec<&str>) {
        let actual = query.evaluate(animals());
        let expected: Vec<_> = expected.into_iter().map(Value::from).collect();
        assert_eq!(names(&actual), expected);
    }

    #[rstest]
    fn test_evaluate_projects_after_sorting() {
        let query = FindQuery {
            projection: Projection::all().with("name", true).with("_id", false),
            sort: Some(Sort::default().by("age", SortOrder::Descending)),
            limit: 1,
            ..Default::default()
        };
        let actual = query.evaluate(animals());
        assert_eq!(
            actual,
            vec![Document::from([("name".to_string(), Value::from("Luna"))])]
        );
    }

    #[rstest]
    #[case::exclusive(FindQuery::default(), None)]
    #[case::inclusive_with_sort(
        FindQuery {
            projection: Projection::all().with("name", true),
            sort: Some(
                Sort::default()
                    .by("age", SortOrder::Ascending)
                    .by("name", SortOrder::Ascending)
            ),
            ..Default::default()
        },
        Some(vec!["_id".to_string(), "name".to_string(), "age".to_string()])
    )]
    fn test_selection(#[case] query: FindQuery, #[case] expected: Option<Vec<String>>) {
        assert_eq!(query.selection(), expected);
    }

    #[rstest]
    fn test_assign_identity() {
        let mut supplied = Document::from([("_id".to_string(), Value::from("a1"))]);
        assert_eq!(assign_identity(&mut supplied), "a1");

        let mut fresh = Document::from([("name".to_string(), Value::from("Rex"))]);
        let identity = assign_identity(&mut fresh);
        assert_eq!(fresh.get_index(0), Some((&"_id".to_string(), &Value::from(identity))));
        assert_eq!(fresh.len(), 2);
    }
}
