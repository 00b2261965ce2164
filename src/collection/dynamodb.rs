//! Collection stored in an Amazon DynamoDB table.
//!
//! The table's partition key must be the string attribute `_id`. Filters are pushed
//! down as filter expressions; sorting, limiting and exclusive projections are applied
//! after the scan, since a scan returns items in no particular order. Updates and deletes
//! write each scanned item conditionally on it still matching the filter, so an item
//! changed in between is skipped and not counted.
//!
//! ```rust,no_run
//! use aws_sdk_dynamodb::Client;
//! use shelter_repository::collection::dynamodb::{DynamoArgs, DynamoCollection};
//! use shelter_repository::repository::Repository;
//! use std::sync::Arc;
//!
//! # async fn example(client: Client) {
//! let collection = DynamoCollection::new(
//!     client,
//!     DynamoArgs {
//!         table_name: "animals".to_string(),
//!         ..Default::default()
//!     },
//! );
//! let repository = Repository::new(Arc::new(collection));
//! # }
//! ```

/// Delete of one item, conditional on it still matching.
pub(crate) mod delete_item;

/// Conditional put of one item.
pub(crate) mod put_item;

/// Paginated, filtered scan.
pub(crate) mod scan;

/// Field merge on one item, conditional on it still matching.
pub(crate) mod update_item;

use crate::{
    collection::{self, Collection, FindQuery},
    common::{
        filter::Filter,
        value::{Document, IDENTITY_FIELD, Value},
    },
};

use aws_sdk_dynamodb::{Client, error, operation, types};
use std::collections;

/// DynamoDB item.
pub(crate) type Item = collections::HashMap<String, types::AttributeValue>;

/// Failure of a DynamoDB-backed collection.
#[derive(Debug, thiserror::Error)]
pub enum DynamoError {
    /// Deleting an item failed.
    #[error(transparent)]
    DeleteItem(#[from] error::SdkError<operation::delete_item::DeleteItemError>),
    /// Putting an item failed.
    #[error(transparent)]
    PutItem(#[from] error::SdkError<operation::put_item::PutItemError>),
    /// Scanning the table failed.
    #[error(transparent)]
    Scan(#[from] error::SdkError<operation::scan::ScanError>),
    /// Updating an item failed.
    #[error(transparent)]
    UpdateItem(#[from] error::SdkError<operation::update_item::UpdateItemError>),
    /// An item holds an attribute kind documents cannot represent.
    #[error("attribute `{0}` holds an unsupported value")]
    UnsupportedAttribute(String),
    /// An item has no string `_id` key.
    #[error("item has no string `_id` key")]
    MissingIdentity,
}

/// Table settings of a DynamoDB-backed collection.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct DynamoArgs {
    /// Whether scans use strongly consistent reads.
    ///
    /// `true` for strongly consistent reads, `false` or `None` for eventually consistent reads.
    pub consistent_read: Option<bool>,
    /// The name of the table holding the collection.
    pub table_name: String,
}

/// Collection stored in a DynamoDB table.
#[derive(Clone, Debug)]
pub struct DynamoCollection {
    args: DynamoArgs,
    client: Client,
}

impl DynamoCollection {
    /// Collection over an already configured client.
    pub fn new(client: Client, args: DynamoArgs) -> Self {
        Self { args, client }
    }

    async fn scan_identities(&self, filter: &Filter) -> Result<Vec<String>, DynamoError> {
        let scan = scan::Scan {
            args: &self.args,
            filter,
            selection: Some(vec![IDENTITY_FIELD.to_string()]),
        };
        let items = scan.send(&self.client).await?;
        items
            .into_iter()
            .map(|mut item| match item.remove(IDENTITY_FIELD) {
                Some(types::AttributeValue::S(identity)) => Ok(identity),
                _ => Err(DynamoError::MissingIdentity),
            })
            .collect()
    }
}

/// Document from a scanned item.
pub(crate) fn document_from_item(item: Item) -> Result<Document, DynamoError> {
    let mut document = Document::with_capacity(item.len());
    for (field, value) in item {
        match Value::from_attribute_value(value) {
            Some(value) => {
                document.insert(field, value);
            }
            None => return Err(DynamoError::UnsupportedAttribute(field)),
        }
    }
    document.sort_keys();
    if let Some(index) = document.get_index_of(IDENTITY_FIELD) {
        document.move_index(index, 0);
    }
    Ok(document)
}

impl Collection for DynamoCollection {
    type Error = DynamoError;

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "shelter_repository.dynamodb.insert_one", skip_all, err)
    )]
    async fn insert_one(&self, mut document: Document) -> Result<Option<String>, Self::Error> {
        let identity = collection::assign_identity(&mut document);
        let put_item = put_item::PutItem {
            args: &self.args,
            document,
        };
        put_item.send(&self.client).await?;
        Ok(Some(identity))
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "shelter_repository.dynamodb.find", skip_all, err)
    )]
    async fn find(&self, query: &FindQuery) -> Result<Vec<Document>, Self::Error> {
        let scan = scan::Scan {
            args: &self.args,
            filter: &query.filter,
            selection: query.selection(),
        };
        let items = scan.send(&self.client).await?;
        let documents = items
            .into_iter()
            .map(document_from_item)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(query.arrange(documents))
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "shelter_repository.dynamodb.update_many", skip_all, err)
    )]
    async fn update_many(&self, filter: &Filter, new_values: &Document) -> Result<u64, Self::Error> {
        let mut modified = 0;
        for identity in self.scan_identities(filter).await? {
            let update_item = update_item::UpdateItem {
                args: &self.args,
                filter,
                identity: &identity,
                new_values,
            };
            if update_item.send(&self.client).await? {
                modified += 1;
            }
        }
        Ok(modified)
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "shelter_repository.dynamodb.delete_many", skip_all, err)
    )]
    async fn delete_many(&self, filter: &Filter) -> Result<u64, Self::Error> {
        let mut deleted = 0;
        for identity in self.scan_identities(filter).await? {
            let delete_item = delete_item::DeleteItem {
                args: &self.args,
                filter,
                identity: &identity,
            };
            if delete_item.send(&self.client).await? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case::flat(
        Item::from(
            [
                (
                    "name".to_string(),
                    types::AttributeValue::S(
                        "Rex".to_string()
                    )
                ),
                (
                    "_id".to_string(),
                    types::AttributeValue::S(
                        "a1".to_string()
                    )
                ),
                (
                    "age".to_string(),
                    types::AttributeValue::N(
                        "3".to_string()
                    )
                ),
            ]
        ),
        Ok(
            vec![
                ("_id".to_string(), Value::from("a1")),
                ("age".to_string(), Value::from(3)),
                ("name".to_string(), Value::from("Rex")),
            ]
        )
    )]
    #[case::unsupported(
        Item::from(
            [
                (
                    "tags".to_string(),
                    types::AttributeValue::Ss(
                        vec!["friendly".to_string()]
                    )
                ),
            ]
        ),
        Err("tags".to_string())
    )]
    fn test_document_from_item(
        #[case] item: Item,
        #[case] expected: Result<Vec<(String, Value)>, String>,
    ) {
        let actual = match document_from_item(item) {
            Ok(document) => Ok(document.into_iter().collect::<Vec<_>>()),
            Err(DynamoError::UnsupportedAttribute(field)) => Err(field),
            Err(other) => panic!("unexpected error: {other}"),
        };
        assert_eq!(actual, expected);
    }
}
