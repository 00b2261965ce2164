use crate::{
    collection::dynamodb::{DynamoArgs, Item},
    common::{self, filter::Filter, value::IDENTITY_FIELD},
};

use aws_sdk_dynamodb::{Client, error, operation, types};
use serde_dynamo::{Error, Result};
use std::collections;

/// delete item operation
#[derive(Clone, Debug, Default, PartialEq)]
struct DeleteItemInput {
    condition_expression: String,
    expression_attribute_names: collections::HashMap<String, String>,
    expression_attribute_values: Option<collections::HashMap<String, types::AttributeValue>>,
    key: Item,
    table_name: String,
}

/// Delete of one item, conditional on it still existing and still matching the filter.
#[derive(Debug, PartialEq)]
pub(crate) struct DeleteItem<'a> {
    /// Table settings.
    pub(crate) args: &'a DynamoArgs,
    /// Conditions the item must still satisfy when it is deleted.
    pub(crate) filter: &'a Filter,
    /// Identity of the item to delete.
    pub(crate) identity: &'a str,
}

impl TryFrom<DeleteItem<'_>> for DeleteItemInput {
    type Error = Error;

    fn try_from(delete_item: DeleteItem<'_>) -> Result<Self> {
        let filter_operation: common::ExpressionInput = delete_item.filter.try_into()?;
        let condition_operation = common::ExpressionInput::merge(
            &common::LogicalOperator::And,
            vec![
                common::ExpressionInput::identity_exists(),
                filter_operation.grouped(),
            ],
        );
        let (condition_expression, expression_attribute_names, expression_attribute_values) =
            condition_operation.into_parts();
        let operation = Self {
            condition_expression: condition_expression.unwrap_or_default(),
            expression_attribute_names: expression_attribute_names.unwrap_or_default(),
            expression_attribute_values,
            key: Item::from([(
                IDENTITY_FIELD.to_string(),
                types::AttributeValue::S(delete_item.identity.to_string()),
            )]),
            table_name: delete_item.args.table_name.clone(),
        };
        Ok(operation)
    }
}

impl DeleteItem<'_> {
    /// Execute the delete, returning whether the item was removed.
    pub(crate) async fn send(
        self,
        client: &Client,
    ) -> Result<bool, error::SdkError<operation::delete_item::DeleteItemError>> {
        let delete_item: DeleteItemInput = self.try_into().map_err(error::BuildError::other)?;
        let result = client
            .delete_item()
            .condition_expression(delete_item.condition_expression)
            .set_expression_attribute_names(Some(delete_item.expression_attribute_names))
            .set_expression_attribute_values(delete_item.expression_attribute_values)
            .set_key(Some(delete_item.key))
            .table_name(delete_item.table_name)
            .send()
            .await;
        match result {
            Ok(_) => Ok(true),
            // removed or changed by someone else since the scan
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
