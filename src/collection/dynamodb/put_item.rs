use crate::{
    collection::dynamodb::{DynamoArgs, Item},
    common::value::{Document, IDENTITY_FIELD},
};

use aws_sdk_dynamodb::{Client, error, operation};
use serde_dynamo::{Error, Result, to_item};
use std::collections;

/// put item operation
#[derive(Debug, PartialEq)]
struct PutItemInput {
    condition_expression: String,
    expression_attribute_names: collections::HashMap<String, String>,
    item: Item,
    table_name: String,
}

/// Put of a new item; an existing item with the same identity makes it fail.
#[derive(Debug, PartialEq)]
pub(crate) struct PutItem<'a> {
    /// Table settings.
    pub(crate) args: &'a DynamoArgs,
    /// The document to store, identity included.
    pub(crate) document: Document,
}

impl TryFrom<PutItem<'_>> for PutItemInput {
    type Error = Error;

    fn try_from(put_item: PutItem<'_>) -> Result<Self> {
        let item = to_item(put_item.document)?;
        let operation = Self {
            condition_expression: "attribute_not_exists(#id)".to_string(),
            expression_attribute_names: collections::HashMap::from([(
                "#id".to_string(),
                IDENTITY_FIELD.to_string(),
            )]),
            item,
            table_name: put_item.args.table_name.clone(),
        };
        Ok(operation)
    }
}

impl PutItem<'_> {
    /// Execute the put item operation.
    pub(crate) async fn send(
        self,
        client: &Client,
    ) -> Result<
        operation::put_item::PutItemOutput,
        error::SdkError<operation::put_item::PutItemError>,
    > {
        let put_item: PutItemInput = self.try_into().map_err(error::BuildError::other)?;
        client
            .put_item()
            .condition_expression(put_item.condition_expression)
            .set_expression_attribute_names(Some(put_item.expression_attribute_names))
            .set_item(Some(put_item.item))
            .table_name(put_item.table_name)
            .send()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::value::Value;

    use aws_sdk_dynamodb::types;
    use rstest::rstest;

    #[rstest]
    #[case::scalars(
        Document::from(
            [
                ("_id".to_string(), Value::from("a1")),
                ("name".to_string(), Value::from("Rex")),
                ("age".to_string(), Value::from(3)),
                ("adopted".to_string(), Value::from(false)),
                ("breed".to_string(), Value::Null),
            ]
        ),
        PutItemInput {
            condition_expression: "attribute_not_exists(#id)".to_string(),
            expression_attribute_names: collections::HashMap::from(
                [
                    ("#id".to_string(), "_id".to_string()),
                ]
            ),
            item: collections::HashMap::from(
                [
                    (
                        "_id".to_string(),
                        types::AttributeValue::S(
                            "a1".to_string()
                        )
                    ),
                    (
                        "name".to_string(),
                        types::AttributeValue::S(
                            "Rex".to_string()
                        )
                    ),
                    (
                        "age".to_string(),
                        types::AttributeValue::N(
                            "3".to_string()
                        )
                    ),
                    (
                        "adopted".to_string(),
                        types::AttributeValue::Bool(
                            false
                        )
                    ),
                    (
                        "breed".to_string(),
                        types::AttributeValue::Null(
                            true
                        )
                    ),
                ]
            ),
            table_name: "animals".to_string(),
        }
    )]
    fn test_put_item(#[case] document: Document, #[case] expected: PutItemInput) {
        let args = DynamoArgs {
            table_name: "animals".to_string(),
            ..Default::default()
        };
        let put_item = PutItem {
            args: &args,
            document,
        };
        let actual: PutItemInput = put_item.try_into().unwrap();
        assert_eq!(actual, expected);
    }
}
