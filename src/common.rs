//! Common building blocks shared by the repository and its collection backends.
//!
//! This module provides the document value model together with the filter, projection
//! and sort types a read or a mutation is normalized into.

/// Filter conditions selecting a subset of documents.
pub mod filter;

/// Field inclusion and exclusion for read results.
pub mod projection;

/// Result ordering.
pub mod sort;

/// Document values and raw argument normalization.
pub mod value;

use aws_sdk_dynamodb::types;
use std::{collections, ops};

/// Logical operator for combining expression fragments.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum LogicalOperator {
    And,
    Or,
}

impl ops::Deref for LogicalOperator {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        match self {
            Self::And => " AND ",
            Self::Or => " OR ",
        }
    }
}

fn get_expression(left: String, operator: &str, right: String) -> String {
    if left.is_empty() {
        right
    } else if right.is_empty() {
        left
    } else {
        format!("{left}{operator}{right}")
    }
}

fn non_empty<K, V>(map: collections::HashMap<K, V>) -> Option<collections::HashMap<K, V>> {
    Some(map).filter(|map| !map.is_empty())
}

/// expression operation
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct ExpressionInput {
    pub(crate) expression: String,
    pub(crate) expression_attribute_names: collections::HashMap<String, String>,
    pub(crate) expression_attribute_values: collections::HashMap<String, types::AttributeValue>,
}

impl ExpressionInput {
    pub(crate) fn merge(operator: &str, items: Vec<Self>) -> Self {
        let mut operation = Self::default();
        for item in items {
            operation
                .expression_attribute_names
                .extend(item.expression_attribute_names);
            operation
                .expression_attribute_values
                .extend(item.expression_attribute_values);
            operation.expression = get_expression(operation.expression, operator, item.expression);
        }
        operation
    }

    /// Condition on the item holding an identity, i.e. on the item existing.
    pub(crate) fn identity_exists() -> Self {
        Self {
            expression: "attribute_exists(#id)".to_string(),
            expression_attribute_names: collections::HashMap::from([(
                "#id".to_string(),
                value::IDENTITY_FIELD.to_string(),
            )]),
            ..Default::default()
        }
    }

    /// The same operation with its expression in parentheses, unless it is empty.
    pub(crate) fn grouped(mut self) -> Self {
        if !self.expression.is_empty() {
            self.expression = format!("({})", self.expression);
        }
        self
    }

    /// Projection expression over top-level attribute names.
    pub(crate) fn selection(fields: &[String]) -> Self {
        let operations = fields
            .iter()
            .enumerate()
            .map(|(index, field)| {
                let placeholder = format!("#p{index}");
                Self {
                    expression: placeholder.clone(),
                    expression_attribute_names: collections::HashMap::from([(
                        placeholder,
                        field.clone(),
                    )]),
                    ..Default::default()
                }
            })
            .collect();
        Self::merge(", ", operations)
    }

    /// Splits the operation into its expression and its placeholder maps, dropping empty maps.
    #[allow(clippy::type_complexity)]
    pub(crate) fn into_parts(
        self,
    ) -> (
        Option<String>,
        Option<collections::HashMap<String, String>>,
        Option<collections::HashMap<String, types::AttributeValue>>,
    ) {
        let expression = Some(self.expression).filter(|expression| !expression.is_empty());
        (
            expression,
            non_empty(self.expression_attribute_names),
            non_empty(self.expression_attribute_values),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case::single(
        vec![
            "name".to_string(),
        ],
        ExpressionInput {
            expression: "#p0".to_string(),
            expression_attribute_names: collections::HashMap::from(
                [
                    ("#p0".to_string(), "name".to_string()),
                ]
            ),
            ..Default::default()
        }
    )]
    #[case::multiple(
        vec![
            "_id".to_string(),
            "animal type".to_string(),
        ],
        ExpressionInput {
            expression: "#p0, #p1".to_string(),
            expression_attribute_names: collections::HashMap::from(
                [
                    ("#p0".to_string(), "_id".to_string()),
                    ("#p1".to_string(), "animal type".to_string()),
                ]
            ),
            ..Default::default()
        }
    )]
    fn test_selection(#[case] fields: Vec<String>, #[case] expected: ExpressionInput) {
        let actual = ExpressionInput::selection(&fields);
        assert_eq!(actual, expected);
    }

    #[rstest]
    #[case::single("#f0 = :eq0", "(#f0 = :eq0)")]
    #[case::disjunction("#f0 = :eq0 OR #f0 = :eq1", "(#f0 = :eq0 OR #f0 = :eq1)")]
    #[case::empty("", "")]
    fn test_grouped(#[case] expression: &str, #[case] expected: &str) {
        let operation = ExpressionInput {
            expression: expression.to_string(),
            ..Default::default()
        };
        assert_eq!(operation.grouped().expression, expected);
    }

    #[rstest]
    fn test_identity_exists_joined_with_empty_filter() {
        let actual = ExpressionInput::merge(
            &LogicalOperator::And,
            vec![ExpressionInput::identity_exists(), ExpressionInput::default().grouped()],
        );
        assert_eq!(actual.expression, "attribute_exists(#id)");
        assert_eq!(
            actual.expression_attribute_names,
            collections::HashMap::from([("#id".to_string(), "_id".to_string())])
        );
    }

    #[rstest]
    fn test_into_parts_drops_empty_maps() {
        let operation = ExpressionInput {
            expression: "attribute_exists(#f0)".to_string(),
            expression_attribute_names: collections::HashMap::from([(
                "#f0".to_string(),
                "breed".to_string(),
            )]),
            ..Default::default()
        };
        let (expression, names, values) = operation.into_parts();
        assert_eq!(expression.as_deref(), Some("attribute_exists(#f0)"));
        assert_eq!(names.map(|names| names.len()), Some(1));
        assert_eq!(values, None);
    }

    #[rstest]
    fn test_into_parts_of_empty_operation() {
        let (expression, names, values) = ExpressionInput::default().into_parts();
        assert_eq!(expression, None);
        assert_eq!(names, None);
        assert_eq!(values, None);
    }
}
