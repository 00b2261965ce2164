use crate::{
    collection::dynamodb::{DynamoArgs, Item},
    common::{
        self,
        filter::Filter,
        value::{Document, IDENTITY_FIELD, Value},
    },
};

use aws_sdk_dynamodb::{Client, error, operation, types};
use serde_dynamo::{Error, Result, to_attribute_value};
use std::collections;

/// update item operation
#[derive(Clone, Debug, Default, PartialEq)]
struct UpdateItemInput {
    condition_expression: String,
    expression_attribute_names: collections::HashMap<String, String>,
    expression_attribute_values: collections::HashMap<String, types::AttributeValue>,
    key: Item,
    table_name: String,
    update_expression: String,
}

/// Merge of field values into one existing item.
///
/// The write is conditional on the item still matching the filter and on at least one
/// field differing from its new value, so an item that changed since it was scanned, or
/// that already holds every value, is left untouched and not counted as modified.
#[derive(Debug, PartialEq)]
pub(crate) struct UpdateItem<'a> {
    /// Table settings.
    pub(crate) args: &'a DynamoArgs,
    /// Conditions the item must still satisfy when it is written.
    pub(crate) filter: &'a Filter,
    /// Identity of the item to update.
    pub(crate) identity: &'a str,
    /// Fields to set.
    pub(crate) new_values: &'a Document,
}

impl UpdateItem<'_> {
    fn get_set_expression(new_values: &Document) -> Result<common::ExpressionInput> {
        let mut operations = Vec::with_capacity(new_values.len());
        for (index, (field, value)) in new_values.iter().enumerate() {
            let placeholder = format!("#u{index}");
            let value_placeholder = format!(":u{index}");
            let expression = format!("{placeholder} = {value_placeholder}");
            let operation = common::ExpressionInput {
                expression,
                expression_attribute_names: collections::HashMap::from([(
                    placeholder,
                    field.clone(),
                )]),
                expression_attribute_values: collections::HashMap::from([(
                    value_placeholder,
                    to_attribute_value(value)?,
                )]),
            };
            operations.push(operation);
        }
        let mut operation = common::ExpressionInput::merge(", ", operations);
        operation.expression = format!("SET {}", operation.expression);
        Ok(operation)
    }

    fn get_changed_expression(new_values: &Document) -> common::ExpressionInput {
        let operations = new_values
            .iter()
            .enumerate()
            .map(|(index, (_, value))| {
                let placeholder = format!("#u{index}");
                match value {
                    Value::Null => {
                        let type_placeholder = format!(":utype{index}");
                        common::ExpressionInput {
                            expression: format!(
                                "attribute_not_exists({placeholder}) OR NOT attribute_type({placeholder}, {type_placeholder})"
                            ),
                            expression_attribute_values: collections::HashMap::from([(
                                type_placeholder,
                                types::AttributeValue::S("NULL".to_string()),
                            )]),
                            ..Default::default()
                        }
                    }
                    _ => common::ExpressionInput {
                        expression: format!(
                            "attribute_not_exists({placeholder}) OR {placeholder} <> :u{index}"
                        ),
                        ..Default::default()
                    },
                }
            })
            .collect();
        common::ExpressionInput::merge(&common::LogicalOperator::Or, operations)
    }
}

impl TryFrom<UpdateItem<'_>> for UpdateItemInput {
    type Error = Error;

    fn try_from(update_item: UpdateItem<'_>) -> Result<Self> {
        let key = Item::from([(
            IDENTITY_FIELD.to_string(),
            types::AttributeValue::S(update_item.identity.to_string()),
        )]);
        let set_operation = UpdateItem::get_set_expression(update_item.new_values)?;
        let filter_operation: common::ExpressionInput = update_item.filter.try_into()?;
        let changed_operation = UpdateItem::get_changed_expression(update_item.new_values);
        // the item must still exist, still match and still differ from the new values
        let condition_operation = common::ExpressionInput::merge(
            &common::LogicalOperator::And,
            vec![
                common::ExpressionInput::identity_exists(),
                filter_operation.grouped(),
                changed_operation.grouped(),
            ],
        );
        let mut expression_attribute_names = set_operation.expression_attribute_names;
        expression_attribute_names.extend(condition_operation.expression_attribute_names);
        let mut expression_attribute_values = set_operation.expression_attribute_values;
        expression_attribute_values.extend(condition_operation.expression_attribute_values);
        let operation = Self {
            condition_expression: condition_operation.expression,
            expression_attribute_names,
            expression_attribute_values,
            key,
            table_name: update_item.args.table_name.clone(),
            update_expression: set_operation.expression,
        };
        Ok(operation)
    }
}

impl UpdateItem<'_> {
    /// Execute the update, returning whether the item was modified.
    pub(crate) async fn send(
        self,
        client: &Client,
    ) -> Result<bool, error::SdkError<operation::update_item::UpdateItemError>> {
        let update_item: UpdateItemInput = self.try_into().map_err(error::BuildError::other)?;
        let result = client
            .update_item()
            .condition_expression(update_item.condition_expression)
            .set_expression_attribute_names(Some(update_item.expression_attribute_names))
            .set_expression_attribute_values(Some(update_item.expression_attribute_values))
            .set_key(Some(update_item.key))
            .table_name(update_item.table_name)
            .update_expression(update_item.update_expression)
            .send()
            .await;
        match result {
            Ok(_) => Ok(true),
            // item deleted or changed since the scan, or already holding every value
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|err| err.is_conditional_check_failed_exception()) =>
            {
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::filter::Condition;

    use rstest::rstest;

    #[rstest]
    #[case::single_field(
        Filter::default()
            .with("name", Condition::Equals(Value::from("Rex"))),
        Document::from(
            [
                ("outcome_type".to_string(), Value::from("Adoption")),
            ]
        ),
        UpdateItemInput {
            condition_expression: "attribute_exists(#id) AND (#f0 = :eq0) AND (attribute_not_exists(#u0) OR #u0 <> :u0)".to_string(),
            expression_attribute_names: collections::HashMap::from(
                [
                    ("#id".to_string(), "_id".to_string()),
                    ("#f0".to_string(), "name".to_string()),
                    ("#u0".to_string(), "outcome_type".to_string()),
                ]
            ),
            expression_attribute_values: collections::HashMap::from(
                [
                    (
                        ":eq0".to_string(),
                        types::AttributeValue::S(
                            "Rex".to_string()
                        )
                    ),
                    (
                        ":u0".to_string(),
                        types::AttributeValue::S(
                            "Adoption".to_string()
                        )
                    ),
                ]
            ),
            key: Item::from(
                [
                    (
                        "_id".to_string(),
                        types::AttributeValue::S(
                            "a1".to_string()
                        )
                    ),
                ]
            ),
            table_name: "animals".to_string(),
            update_expression: "SET #u0 = :u0".to_string(),
        }
    )]
    #[case::null_in_filter_and_values(
        Filter::default()
            .with("breed", Condition::Equals(Value::Null))
            .with("outcome_type", Condition::In(vec![Value::from("Hold"), Value::from("Stray")])),
        Document::from(
            [
                ("age".to_string(), Value::from(4)),
                ("breed".to_string(), Value::Null),
            ]
        ),
        UpdateItemInput {
            condition_expression: "attribute_exists(#id) AND ((attribute_not_exists(#f0) OR attribute_type(#f0, :null0)) AND (#f1 = :eq1 OR #f1 = :eq2)) AND (attribute_not_exists(#u0) OR #u0 <> :u0 OR attribute_not_exists(#u1) OR NOT attribute_type(#u1, :utype1))".to_string(),
            expression_attribute_names: collections::HashMap::from(
                [
                    ("#id".to_string(), "_id".to_string()),
                    ("#f0".to_string(), "breed".to_string()),
                    ("#f1".to_string(), "outcome_type".to_string()),
                    ("#u0".to_string(), "age".to_string()),
                    ("#u1".to_string(), "breed".to_string()),
                ]
            ),
            expression_attribute_values: collections::HashMap::from(
                [
                    (
                        ":null0".to_string(),
                        types::AttributeValue::S(
                            "NULL".to_string()
                        )
                    ),
                    (
                        ":eq1".to_string(),
                        types::AttributeValue::S(
                            "Hold".to_string()
                        )
                    ),
                    (
                        ":eq2".to_string(),
                        types::AttributeValue::S(
                            "Stray".to_string()
                        )
                    ),
                    (
                        ":u0".to_string(),
                        types::AttributeValue::N(
                            "4".to_string()
                        )
                    ),
                    (
                        ":u1".to_string(),
                        types::AttributeValue::Null(
                            true
                        )
                    ),
                    (
                        ":utype1".to_string(),
                        types::AttributeValue::S(
                            "NULL".to_string()
                        )
                    ),
                ]
            ),
            key: Item::from(
                [
                    (
                        "_id".to_string(),
                        types::AttributeValue::S(
                            "a1".to_string()
                        )
                    ),
                ]
            ),
            table_name: "animals".to_string(),
            update_expression: "SET #u0 = :u0, #u1 = :u1".to_string(),
        }
    )]
    fn test_update_item(
        #[case] filter: Filter,
        #[case] new_values: Document,
        #[case] expected: UpdateItemInput,
    ) {
        let args = DynamoArgs {
            table_name: "animals".to_string(),
            ..Default::default()
        };
        let update_item = UpdateItem {
            args: &args,
            filter: &filter,
            identity: "a1",
            new_values: &new_values,
        };
        let actual: UpdateItemInput = update_item.try_into().unwrap();
        assert_eq!(actual, expected);
    }

    #[rstest]
    fn test_update_item_placeholders_do_not_collide() {
        let args = DynamoArgs {
            table_name: "animals".to_string(),
            ..Default::default()
        };
        let filter = Filter::default()
            .with("breed", Condition::NotEqual(Value::Null))
            .with("color", Condition::Equals(Value::Null));
        let new_values = Document::from([
            ("breed".to_string(), Value::Null),
            ("color".to_string(), Value::Null),
        ]);
        let update_item = UpdateItem {
            args: &args,
            filter: &filter,
            identity: "a1",
            new_values: &new_values,
        };
        let actual: UpdateItemInput = update_item.try_into().unwrap();
        // two filter placeholders, two set values and two type checks
        assert_eq!(actual.expression_attribute_values.len(), 6);
        for placeholder in [":null0", ":null1", ":u0", ":u1", ":utype0", ":utype1"] {
            assert!(
                actual.condition_expression.contains(placeholder)
                    || actual.update_expression.contains(placeholder)
            );
        }
    }
}
