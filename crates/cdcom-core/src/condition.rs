// crates/cdcom-core/src/condition.rs
use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::property::PropertyValue;
use crate::EvalError;

/// Where a condition variable is looked up: a declared component
/// property, or per-instance state (for example the `horizontal`
/// orientation flag).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableSource {
    Property,
    State,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionComparison {
    Equal,
    NotEqual,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    /// Defined for boolean variables only.
    Truthy,
    /// Defined for boolean variables only.
    Falsy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOperator {
    And,
    Or,
}

/// A single comparison against one variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionLeaf {
    pub source: VariableSource,
    pub variable: String,
    pub comparison: ConditionComparison,
    pub operand: PropertyValue,
}

/// A boolean expression over component properties and instance state.
///
/// Trees are immutable once built. `Empty` always evaluates to true,
/// so an absent condition and an empty condition behave identically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConditionTree {
    Empty,
    Leaf(ConditionLeaf),
    Binary {
        op: BinaryOperator,
        left: Box<ConditionTree>,
        right: Box<ConditionTree>,
    },
}

/// Supplies variable values during evaluation. Implemented by whatever
/// owns a concrete component instance.
pub trait ConditionContext {
    fn property_value(&self, name: &str) -> Option<PropertyValue>;
    fn state_value(&self, name: &str) -> Option<PropertyValue>;
}

impl ConditionTree {
    pub fn leaf(
        source: VariableSource,
        variable: impl Into<String>,
        comparison: ConditionComparison,
        operand: PropertyValue,
    ) -> Self {
        ConditionTree::Leaf(ConditionLeaf {
            source,
            variable: variable.into(),
            comparison,
            operand,
        })
    }

    pub fn and(left: ConditionTree, right: ConditionTree) -> Self {
        ConditionTree::Binary {
            op: BinaryOperator::And,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: ConditionTree, right: ConditionTree) -> Self {
        ConditionTree::Binary {
            op: BinaryOperator::Or,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ConditionTree::Empty)
    }

    /// Evaluate against an instance. `And`/`Or` short-circuit on the
    /// left operand, so an error on the right side is only surfaced
    /// when the right side actually has to be consulted.
    pub fn evaluate(&self, context: &dyn ConditionContext) -> Result<bool, EvalError> {
        match self {
            ConditionTree::Empty => Ok(true),
            ConditionTree::Leaf(leaf) => leaf.evaluate(context),
            ConditionTree::Binary { op, left, right } => {
                let lhs = left.evaluate(context)?;
                match op {
                    BinaryOperator::And if !lhs => Ok(false),
                    BinaryOperator::Or if lhs => Ok(true),
                    _ => right.evaluate(context),
                }
            }
        }
    }
}

impl Default for ConditionTree {
    fn default() -> Self {
        ConditionTree::Empty
    }
}

impl ConditionLeaf {
    pub fn evaluate(&self, context: &dyn ConditionContext) -> Result<bool, EvalError> {
        let value = match self.source {
            VariableSource::Property => context.property_value(&self.variable),
            VariableSource::State => context.state_value(&self.variable),
        }
        .ok_or_else(|| EvalError::UnknownVariable(self.variable.clone()))?;

        match self.comparison {
            ConditionComparison::Truthy => self.boolean_binding(&value),
            ConditionComparison::Falsy => self.boolean_binding(&value).map(|b| !b),
            ConditionComparison::Equal => Ok(value.compare(&self.operand) == Ordering::Equal),
            ConditionComparison::NotEqual => Ok(value.compare(&self.operand) != Ordering::Equal),
            ConditionComparison::GreaterThan => {
                Ok(value.compare(&self.operand) == Ordering::Greater)
            }
            ConditionComparison::LessThan => Ok(value.compare(&self.operand) == Ordering::Less),
            ConditionComparison::GreaterThanOrEqual => {
                Ok(value.compare(&self.operand) != Ordering::Less)
            }
            ConditionComparison::LessThanOrEqual => {
                Ok(value.compare(&self.operand) != Ordering::Greater)
            }
        }
    }

    fn boolean_binding(&self, value: &PropertyValue) -> Result<bool, EvalError> {
        value
            .as_boolean()
            .ok_or_else(|| EvalError::UnsupportedComparison {
                variable: self.variable.clone(),
                comparison: self.comparison,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::HashMap;

    struct TestContext {
        properties: HashMap<String, PropertyValue>,
        state: HashMap<String, PropertyValue>,
        lookups: Cell<u32>,
    }

    impl TestContext {
        fn new() -> Self {
            Self {
                properties: HashMap::new(),
                state: HashMap::new(),
                lookups: Cell::new(0),
            }
        }

        fn with_property(mut self, name: &str, value: PropertyValue) -> Self {
            self.properties.insert(name.to_owned(), value);
            self
        }

        fn with_state(mut self, name: &str, value: PropertyValue) -> Self {
            self.state.insert(name.to_owned(), value);
            self
        }
    }

    impl ConditionContext for TestContext {
        fn property_value(&self, name: &str) -> Option<PropertyValue> {
            self.lookups.set(self.lookups.get() + 1);
            self.properties.get(name).cloned()
        }

        fn state_value(&self, name: &str) -> Option<PropertyValue> {
            self.lookups.set(self.lookups.get() + 1);
            self.state.get(name).cloned()
        }
    }

    fn resistance_leaf(comparison: ConditionComparison, operand: f64) -> ConditionTree {
        ConditionTree::leaf(
            VariableSource::Property,
            "Resistance",
            comparison,
            PropertyValue::Numeric(operand),
        )
    }

    #[test]
    fn test_empty_is_true() {
        let context = TestContext::new();
        assert!(ConditionTree::Empty.evaluate(&context).unwrap());
    }

    #[test]
    fn test_leaf_comparisons() {
        let context = TestContext::new().with_property("Resistance", PropertyValue::Numeric(4.7));

        assert!(resistance_leaf(ConditionComparison::Equal, 4.7)
            .evaluate(&context)
            .unwrap());
        assert!(resistance_leaf(ConditionComparison::NotEqual, 5.0)
            .evaluate(&context)
            .unwrap());
        assert!(resistance_leaf(ConditionComparison::GreaterThan, 4.0)
            .evaluate(&context)
            .unwrap());
        assert!(!resistance_leaf(ConditionComparison::LessThan, 4.0)
            .evaluate(&context)
            .unwrap());
        assert!(resistance_leaf(ConditionComparison::GreaterThanOrEqual, 4.7)
            .evaluate(&context)
            .unwrap());
        assert!(resistance_leaf(ConditionComparison::LessThanOrEqual, 4.7)
            .evaluate(&context)
            .unwrap());
    }

    #[test]
    fn test_truthy_state() {
        let context = TestContext::new().with_state("horizontal", PropertyValue::Boolean(true));

        let truthy = ConditionTree::leaf(
            VariableSource::State,
            "horizontal",
            ConditionComparison::Truthy,
            PropertyValue::Boolean(true),
        );
        let falsy = ConditionTree::leaf(
            VariableSource::State,
            "horizontal",
            ConditionComparison::Falsy,
            PropertyValue::Boolean(true),
        );
        assert!(truthy.evaluate(&context).unwrap());
        assert!(!falsy.evaluate(&context).unwrap());
    }

    #[test]
    fn test_truthy_on_non_boolean_fails() {
        let context = TestContext::new().with_property("Resistance", PropertyValue::Numeric(4.7));

        let tree = ConditionTree::leaf(
            VariableSource::Property,
            "Resistance",
            ConditionComparison::Truthy,
            PropertyValue::Boolean(true),
        );
        let err = tree.evaluate(&context).unwrap_err();
        assert_eq!(
            err,
            EvalError::UnsupportedComparison {
                variable: "Resistance".to_owned(),
                comparison: ConditionComparison::Truthy,
            }
        );
    }

    #[test]
    fn test_unknown_variable_fails() {
        let context = TestContext::new();
        let err = resistance_leaf(ConditionComparison::Equal, 1.0)
            .evaluate(&context)
            .unwrap_err();
        assert_eq!(err, EvalError::UnknownVariable("Resistance".to_owned()));
    }

    fn missing_leaf() -> ConditionTree {
        ConditionTree::leaf(
            VariableSource::Property,
            "Missing",
            ConditionComparison::Equal,
            PropertyValue::Numeric(1.0),
        )
    }

    #[test]
    fn test_and_short_circuits() {
        // Right side references a variable that does not exist; the
        // false left side must keep it from ever being looked up.
        let context = TestContext::new().with_property("Resistance", PropertyValue::Numeric(4.7));

        let tree = ConditionTree::and(
            resistance_leaf(ConditionComparison::GreaterThan, 100.0),
            missing_leaf(),
        );
        assert!(!tree.evaluate(&context).unwrap());
        assert_eq!(context.lookups.get(), 1);
    }

    #[test]
    fn test_or_short_circuits() {
        let context = TestContext::new().with_property("Resistance", PropertyValue::Numeric(4.7));

        let tree = ConditionTree::or(
            resistance_leaf(ConditionComparison::LessThan, 100.0),
            missing_leaf(),
        );
        assert!(tree.evaluate(&context).unwrap());
        assert_eq!(context.lookups.get(), 1);
    }

    #[test]
    fn test_structural_equality() {
        let a = ConditionTree::and(
            resistance_leaf(ConditionComparison::Equal, 1.0),
            ConditionTree::Empty,
        );
        let b = ConditionTree::and(
            resistance_leaf(ConditionComparison::Equal, 1.0),
            ConditionTree::Empty,
        );
        let c = ConditionTree::or(
            resistance_leaf(ConditionComparison::Equal, 1.0),
            ConditionTree::Empty,
        );
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
