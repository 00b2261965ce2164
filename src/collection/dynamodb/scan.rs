use crate::{
    collection::dynamodb::{DynamoArgs, Item},
    common::{self, filter::Filter},
};

use aws_sdk_dynamodb::{Client, error, operation, types};
use serde_dynamo::{Error, Result};
use std::collections;

/// scan operation
#[derive(Clone, Debug, Default, PartialEq)]
struct ScanInput {
    consistent_read: Option<bool>,
    expression_attribute_names: Option<collections::HashMap<String, String>>,
    expression_attribute_values: Option<collections::HashMap<String, types::AttributeValue>>,
    filter_expression: Option<String>,
    projection_expression: Option<String>,
    table_name: String,
}

/// Scan of the whole table, narrowed by a filter.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Scan<'a> {
    /// Table settings.
    pub(crate) args: &'a DynamoArgs,
    /// Items to return.
    pub(crate) filter: &'a Filter,
    /// Attributes to return, `None` for whole items.
    pub(crate) selection: Option<Vec<String>>,
}

impl TryFrom<Scan<'_>> for ScanInput {
    type Error = Error;

    fn try_from(scan: Scan<'_>) -> Result<Self> {
        let filter_operation: common::ExpressionInput = scan.filter.try_into()?;
        let selection_operation = scan
            .selection
            .map(|fields| common::ExpressionInput::selection(&fields));
        let (filter_expression, mut expression_attribute_names, expression_attribute_values) =
            filter_operation.into_parts();
        let projection_expression = match selection_operation {
            Some(selection_operation) => {
                expression_attribute_names
                    .get_or_insert_with(collections::HashMap::new)
                    .extend(selection_operation.expression_attribute_names);
                Some(selection_operation.expression)
            }
            None => None,
        };
        let operation = Self {
            consistent_read: scan.args.consistent_read,
            expression_attribute_names,
            expression_attribute_values,
            filter_expression,
            projection_expression,
            table_name: scan.args.table_name.clone(),
        };
        Ok(operation)
    }
}

impl Scan<'_> {
    /// Execute the scan, following pages until the table is exhausted.
    pub(crate) async fn send(
        self,
        client: &Client,
    ) -> Result<Vec<Item>, error::SdkError<operation::scan::ScanError>> {
        let scan: ScanInput = self.try_into().map_err(error::BuildError::other)?;
        let mut paginator = client
            .scan()
            .set_consistent_read(scan.consistent_read)
            .set_expression_attribute_names(scan.expression_attribute_names)
            .set_expression_attribute_values(scan.expression_attribute_values)
            .set_filter_expression(scan.filter_expression)
            .set_projection_expression(scan.projection_expression)
            .table_name(scan.table_name)
            .into_paginator()
            .send();
        let mut items = Vec::new();
        while let Some(page) = paginator.next().await {
            if let Some(page_items) = page?.items {
                items.extend(page_items);
            }
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{filter::Condition, value::Value};

    use rstest::rstest;

    #[rstest]
    #[case::empty(
        Filter::default(),
        None,
        ScanInput {
            table_name: "animals".to_string(),
            ..Default::default()
        }
    )]
    #[case::filter(
        Filter::default()
            .with("animal_type", Condition::Equals(Value::from("Dog"))),
        None,
        ScanInput {
            expression_attribute_names: Some(
                collections::HashMap::from(
                    [
                        ("#f0".to_string(), "animal_type".to_string()),
                    ]
                )
            ),
            expression_attribute_values: Some(
                collections::HashMap::from(
                    [
                        (
                            ":eq0".to_string(),
                            types::AttributeValue::S(
                                "Dog".to_string()
                            )
                        ),
                    ]
                )
            ),
            filter_expression: Some(
                "#f0 = :eq0".to_string()
            ),
            table_name: "animals".to_string(),
            ..Default::default()
        }
    )]
    #[case::selection_only(
        Filter::default(),
        Some(
            vec![
                "_id".to_string(),
            ]
        ),
        ScanInput {
            expression_attribute_names: Some(
                collections::HashMap::from(
                    [
                        ("#p0".to_string(), "_id".to_string()),
                    ]
                )
            ),
            projection_expression: Some(
                "#p0".to_string()
            ),
            table_name: "animals".to_string(),
            ..Default::default()
        }
    )]
    #[case::filter_without_values_and_selection(
        Filter::default()
            .with("breed", Condition::Missing),
        Some(
            vec![
                "_id".to_string(),
                "name".to_string(),
            ]
        ),
        ScanInput {
            expression_attribute_names: Some(
                collections::HashMap::from(
                    [
                        ("#f0".to_string(), "breed".to_string()),
                        ("#p0".to_string(), "_id".to_string()),
                        ("#p1".to_string(), "name".to_string()),
                    ]
                )
            ),
            filter_expression: Some(
                "attribute_not_exists(#f0)".to_string()
            ),
            projection_expression: Some(
                "#p0, #p1".to_string()
            ),
            table_name: "animals".to_string(),
            ..Default::default()
        }
    )]
    fn test_scan(
        #[case] filter: Filter,
        #[case] selection: Option<Vec<String>>,
        #[case] expected: ScanInput,
    ) {
        let args = DynamoArgs {
            table_name: "animals".to_string(),
            ..Default::default()
        };
        let scan = Scan {
            args: &args,
            filter: &filter,
            selection,
        };
        let actual: ScanInput = scan.try_into().unwrap();
        assert_eq!(actual, expected);
    }

    #[rstest]
    fn test_scan_consistent_read() {
        let args = DynamoArgs {
            consistent_read: Some(true),
            table_name: "animals".to_string(),
        };
        let filter = Filter::default();
        let scan = Scan {
            args: &args,
            filter: &filter,
            selection: None,
        };
        let actual: ScanInput = scan.try_into().unwrap();
        assert_eq!(actual.consistent_read, Some(true));
    }
}
