use crate::{
    common::{
        self,
        value::{self, Document, Value},
    },
    error::{Argument, InvalidInput},
};

use aws_sdk_dynamodb::types;
use indexmap::IndexMap;
use serde::{Serialize, Serializer, ser::SerializeMap};
use serde_dynamo::{Error, Result, to_attribute_value};
use std::{cmp, collections};

/// Condition applied to a single field.
///
/// ```rust
/// use shelter_repository::common::filter;
///
/// let eq = filter::Condition::Equals("Dog".into());
/// let gt = filter::Condition::GreaterThan(52.into());
/// let missing = filter::Condition::Missing;
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    /// The field equals the value; equality with null also matches a missing field.
    Equals(Value),
    /// The field does not equal the value; a missing field matches.
    NotEqual(Value),
    /// The field is greater than the value.
    GreaterThan(Value),
    /// The field is greater than or equal to the value.
    GreaterThanOrEqual(Value),
    /// The field is less than the value.
    LessThan(Value),
    /// The field is less than or equal to the value.
    LessThanOrEqual(Value),
    /// The field equals one of the values.
    In(Vec<Value>),
    /// The field equals none of the values.
    NotIn(Vec<Value>),
    /// The field is present, whatever its value.
    Exists,
    /// The field is absent.
    Missing,
}

fn equals(field: Option<&Value>, value: &Value) -> bool {
    match (field, value) {
        (None, Value::Null) => true,
        (None, _) => false,
        (Some(field), value) => field == value,
    }
}

fn is_ordered(field: Option<&Value>, value: &Value, accepted: &[cmp::Ordering]) -> bool {
    field
        .and_then(|field| field.compare(value))
        .is_some_and(|ordering| accepted.contains(&ordering))
}

impl Condition {
    /// Whether a field value, `None` when absent, satisfies the condition.
    pub fn matches(&self, field: Option<&Value>) -> bool {
        match self {
            Self::Equals(value) => equals(field, value),
            Self::NotEqual(value) => !equals(field, value),
            Self::GreaterThan(value) => is_ordered(field, value, &[cmp::Ordering::Greater]),
            Self::GreaterThanOrEqual(value) => is_ordered(
                field,
                value,
                &[cmp::Ordering::Greater, cmp::Ordering::Equal],
            ),
            Self::LessThan(value) => is_ordered(field, value, &[cmp::Ordering::Less]),
            Self::LessThanOrEqual(value) => {
                is_ordered(field, value, &[cmp::Ordering::Less, cmp::Ordering::Equal])
            }
            Self::In(values) => values.iter().any(|value| equals(field, value)),
            Self::NotIn(values) => !values.iter().any(|value| equals(field, value)),
            Self::Exists => field.is_some(),
            Self::Missing => field.is_none(),
        }
    }

    fn operator(&self) -> &'static str {
        match self {
            Self::Equals(_) => "$eq",
            Self::NotEqual(_) => "$ne",
            Self::GreaterThan(_) => "$gt",
            Self::GreaterThanOrEqual(_) => "$gte",
            Self::LessThan(_) => "$lt",
            Self::LessThanOrEqual(_) => "$lte",
            Self::In(_) => "$in",
            Self::NotIn(_) => "$nin",
            Self::Exists | Self::Missing => "$exists",
        }
    }

    fn parse(
        operator: &str,
        operand: types::AttributeValue,
    ) -> std::result::Result<Self, ConditionError> {
        let condition = match operator {
            "$eq" => Self::Equals(scalar(operand)?),
            "$ne" => Self::NotEqual(scalar(operand)?),
            "$gt" => Self::GreaterThan(orderable(operand)?),
            "$gte" => Self::GreaterThanOrEqual(orderable(operand)?),
            "$lt" => Self::LessThan(orderable(operand)?),
            "$lte" => Self::LessThanOrEqual(orderable(operand)?),
            "$in" => Self::In(scalars(operand)?),
            "$nin" => Self::NotIn(scalars(operand)?),
            "$exists" => {
                if flag(operand)? {
                    Self::Exists
                } else {
                    Self::Missing
                }
            }
            _ => return Err(ConditionError::Operator),
        };
        Ok(condition)
    }

    fn get_expression(
        &self,
        key_placeholder: &str,
        index: &mut usize,
    ) -> Result<common::ExpressionInput> {
        let mut expression_attribute_values = collections::HashMap::new();
        let expression = match self {
            Self::Equals(Value::Null) => {
                let value_placeholder = format!(":null{index}");
                *index += 1;
                let expression = format!(
                    "(attribute_not_exists({key_placeholder}) OR attribute_type({key_placeholder}, {value_placeholder}))"
                );
                expression_attribute_values
                    .insert(value_placeholder, types::AttributeValue::S("NULL".to_string()));
                expression
            }
            Self::Equals(value) => get_comparison_expression(
                ("eq", "="),
                value,
                key_placeholder,
                index,
                &mut expression_attribute_values,
            )?,
            Self::NotEqual(Value::Null) => {
                let value_placeholder = format!(":null{index}");
                *index += 1;
                let expression = format!(
                    "(attribute_exists({key_placeholder}) AND NOT attribute_type({key_placeholder}, {value_placeholder}))"
                );
                expression_attribute_values
                    .insert(value_placeholder, types::AttributeValue::S("NULL".to_string()));
                expression
            }
            Self::NotEqual(value) => {
                let expression = get_comparison_expression(
                    ("ne", "<>"),
                    value,
                    key_placeholder,
                    index,
                    &mut expression_attribute_values,
                )?;
                format!("(attribute_not_exists({key_placeholder}) OR {expression})")
            }
            Self::GreaterThan(value) => get_comparison_expression(
                ("gt", ">"),
                value,
                key_placeholder,
                index,
                &mut expression_attribute_values,
            )?,
            Self::GreaterThanOrEqual(value) => get_comparison_expression(
                ("gte", ">="),
                value,
                key_placeholder,
                index,
                &mut expression_attribute_values,
            )?,
            Self::LessThan(value) => get_comparison_expression(
                ("lt", "<"),
                value,
                key_placeholder,
                index,
                &mut expression_attribute_values,
            )?,
            Self::LessThanOrEqual(value) => get_comparison_expression(
                ("lte", "<="),
                value,
                key_placeholder,
                index,
                &mut expression_attribute_values,
            )?,
            Self::In(values) => return Self::get_in_expression(values, key_placeholder, index),
            Self::NotIn(values) => {
                let mut operation = Self::get_in_expression(values, key_placeholder, index)?;
                operation.expression = format!("NOT {}", operation.expression);
                return Ok(operation);
            }
            Self::Exists => format!("attribute_exists({key_placeholder})"),
            Self::Missing => format!("attribute_not_exists({key_placeholder})"),
        };
        let operation = common::ExpressionInput {
            expression,
            expression_attribute_values,
            ..Default::default()
        };
        Ok(operation)
    }

    fn get_in_expression(
        values: &[Value],
        key_placeholder: &str,
        index: &mut usize,
    ) -> Result<common::ExpressionInput> {
        if values.is_empty() {
            // nothing can equal an empty set of values
            let expression = format!(
                "(attribute_exists({key_placeholder}) AND attribute_not_exists({key_placeholder}))"
            );
            return Ok(common::ExpressionInput {
                expression,
                ..Default::default()
            });
        }
        let mut operations = Vec::with_capacity(values.len());
        for value in values {
            let operation =
                Self::Equals(value.clone()).get_expression(key_placeholder, index)?;
            operations.push(operation);
        }
        let mut operation = common::ExpressionInput::merge(&common::LogicalOperator::Or, operations);
        operation.expression = format!("({})", operation.expression);
        Ok(operation)
    }
}

fn get_comparison_expression(
    (tag, symbol): (&str, &str),
    value: &Value,
    key_placeholder: &str,
    index: &mut usize,
    expression_attribute_values: &mut collections::HashMap<String, types::AttributeValue>,
) -> Result<String> {
    let value = to_attribute_value(value)?;
    let value_placeholder = format!(":{tag}{index}");
    *index += 1;
    let expression = format!("{key_placeholder} {symbol} {value_placeholder}");
    expression_attribute_values.insert(value_placeholder, value);
    Ok(expression)
}

enum ConditionError {
    Operator,
    Operand,
}

fn scalar(operand: types::AttributeValue) -> std::result::Result<Value, ConditionError> {
    Value::from_attribute_value(operand).ok_or(ConditionError::Operand)
}

fn orderable(operand: types::AttributeValue) -> std::result::Result<Value, ConditionError> {
    match scalar(operand)? {
        value @ (Value::Number(_) | Value::String(_)) => Ok(value),
        _ => Err(ConditionError::Operand),
    }
}

/// Boolean operand, `0`/`1` also accepted.
fn flag(operand: types::AttributeValue) -> std::result::Result<bool, ConditionError> {
    match operand {
        types::AttributeValue::Bool(flag) => Ok(flag),
        types::AttributeValue::N(number) => number
            .parse::<f64>()
            .map(|number| number != 0.0)
            .map_err(|_| ConditionError::Operand),
        _ => Err(ConditionError::Operand),
    }
}

fn scalars(operand: types::AttributeValue) -> std::result::Result<Vec<Value>, ConditionError> {
    match operand {
        types::AttributeValue::L(values) if !values.is_empty() => {
            values.into_iter().map(scalar).collect()
        }
        _ => Err(ConditionError::Operand),
    }
}

/// Conditions selecting a subset of documents.
///
/// Every condition of every field must hold. An empty filter matches all documents.
///
/// ```rust
/// use shelter_repository::common::filter;
///
/// let filter = filter::Filter::default()
///     .with("animal_type", filter::Condition::Equals("Dog".into()))
///     .with("age_upon_outcome_in_weeks", filter::Condition::LessThan(52.into()));
/// assert!(!filter.is_empty());
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter {
    fields: IndexMap<String, Vec<Condition>>,
}

impl Filter {
    /// Add a condition on a field.
    pub fn with(mut self, field: impl Into<String>, condition: Condition) -> Self {
        self.fields.entry(field.into()).or_default().push(condition);
        self
    }

    /// Whether the filter matches every document.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields and the conditions applied to them.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Condition])> {
        self.fields
            .iter()
            .map(|(field, conditions)| (field.as_str(), conditions.as_slice()))
    }

    /// Whether a document satisfies every condition.
    pub fn matches(&self, document: &Document) -> bool {
        self.fields.iter().all(|(field, conditions)| {
            let value = document.get(field);
            conditions.iter().all(|condition| condition.matches(value))
        })
    }

    /// Filter from a raw mapping.
    ///
    /// A field holding a scalar means equality; a field holding a mapping of operators
    /// (`$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`, `$in`, `$nin`, `$exists`) means all of
    /// the listed conditions.
    pub(crate) fn from_mapping(
        mapping: value::Mapping,
        argument: Argument,
    ) -> std::result::Result<Self, InvalidInput> {
        let mut entries: Vec<_> = mapping.into_iter().collect();
        entries.sort_by(|(left, _), (right, _)| left.cmp(right));
        let mut filter = Self::default();
        for (field, value) in entries {
            if field.starts_with('$') {
                return Err(InvalidInput::UnsupportedOperator {
                    argument,
                    operator: field.clone(),
                    field,
                });
            }
            let conditions = match value {
                types::AttributeValue::M(operators) if !operators.is_empty() => {
                    let mut operators: Vec<_> = operators.into_iter().collect();
                    operators.sort_by(|(left, _), (right, _)| left.cmp(right));
                    let mut conditions = Vec::with_capacity(operators.len());
                    for (operator, operand) in operators {
                        match Condition::parse(&operator, operand) {
                            Ok(condition) => conditions.push(condition),
                            Err(ConditionError::Operator) if operator.starts_with('$') => {
                                return Err(InvalidInput::UnsupportedOperator {
                                    argument,
                                    field,
                                    operator,
                                });
                            }
                            Err(_) => {
                                return Err(InvalidInput::UnsupportedValue { argument, field });
                            }
                        }
                    }
                    conditions
                }
                value => match Value::from_attribute_value(value) {
                    Some(value) => vec![Condition::Equals(value)],
                    None => return Err(InvalidInput::UnsupportedValue { argument, field }),
                },
            };
            filter.fields.insert(field, conditions);
        }
        Ok(filter)
    }

    /// Filter required by a mutating operation: a non-empty, well-formed mapping.
    pub(crate) fn require<T: Serialize>(raw: T) -> std::result::Result<Self, InvalidInput> {
        let mapping = value::require_mapping(raw, Argument::Filter)?;
        Self::from_mapping(mapping, Argument::Filter)
    }

    /// Filter used by a read: a malformed argument matches every document.
    pub(crate) fn coerce<T: Serialize>(raw: T) -> Self {
        let filter = value::to_mapping(raw)
            .and_then(|mapping| Self::from_mapping(mapping, Argument::Filter).ok());
        match filter {
            Some(filter) => filter,
            None => {
                #[cfg(feature = "tracing")]
                tracing::debug!("malformed filter coerced to match every document");
                Self::default()
            }
        }
    }
}

/// Whether a raw argument is a mapping that parses into a filter.
///
/// ```rust
/// use serde_json::json;
/// use shelter_repository::common::filter;
///
/// assert!(filter::is_well_formed_filter(json!({"age": {"$gte": 3}})));
/// assert!(filter::is_well_formed_filter(json!({})));
/// assert!(!filter::is_well_formed_filter(json!({"age": {"$regex": "^3"}})));
/// assert!(!filter::is_well_formed_filter(json!("age")));
/// ```
pub fn is_well_formed_filter<T: Serialize>(raw: T) -> bool {
    value::to_mapping(raw)
        .is_some_and(|mapping| Filter::from_mapping(mapping, Argument::Filter).is_ok())
}

struct Operators<'a>(&'a [Condition]);

impl Serialize for Operators<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for condition in self.0 {
            match condition {
                Condition::Equals(value)
                | Condition::NotEqual(value)
                | Condition::GreaterThan(value)
                | Condition::GreaterThanOrEqual(value)
                | Condition::LessThan(value)
                | Condition::LessThanOrEqual(value) => {
                    map.serialize_entry(condition.operator(), value)?
                }
                Condition::In(values) | Condition::NotIn(values) => {
                    map.serialize_entry(condition.operator(), values)?
                }
                Condition::Exists => map.serialize_entry(condition.operator(), &true)?,
                Condition::Missing => map.serialize_entry(condition.operator(), &false)?,
            }
        }
        map.end()
    }
}

impl Serialize for Filter {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, conditions) in &self.fields {
            match conditions.as_slice() {
                [Condition::Equals(value)] => map.serialize_entry(field, value)?,
                conditions => map.serialize_entry(field, &Operators(conditions))?,
            }
        }
        map.end()
    }
}

impl TryFrom<&Filter> for common::ExpressionInput {
    type Error = Error;

    fn try_from(filter: &Filter) -> Result<Self> {
        let mut index = 0;
        let mut operations = Vec::new();
        for (field_index, (field, conditions)) in filter.iter().enumerate() {
            let key_placeholder = format!("#f{field_index}");
            for condition in conditions {
                let mut operation = condition.get_expression(&key_placeholder, &mut index)?;
                operation
                    .expression_attribute_names
                    .insert(key_placeholder.clone(), field.to_string());
                operations.push(operation);
            }
        }
        Ok(common::ExpressionInput::merge(
            &common::LogicalOperator::And,
            operations,
        ))
    }
}
