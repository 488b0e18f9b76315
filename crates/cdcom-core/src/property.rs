// crates/cdcom-core/src/property.rs
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::condition::{ConditionContext, ConditionTree};
use crate::{EvalError, ValueError};

/// A single property value. Values are immutable once constructed; all
/// cross-kind coercion happens through [`PropertyValue::compare`] and
/// the [`fmt::Display`] impl.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Text(String),
    Numeric(f64),
    Boolean(bool),
}

impl PropertyValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            PropertyValue::Numeric(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            PropertyValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Parse a string under a declared property kind.
    ///
    /// Numeric kinds reject non-numeric input, `Integer` additionally
    /// rejects fractional input, and `Boolean` accepts only
    /// `true`/`false` (case-insensitive).
    pub fn parse_as(s: &str, kind: PropertyType) -> Result<PropertyValue, ValueError> {
        match kind {
            PropertyType::Text | PropertyType::Enumeration => {
                Ok(PropertyValue::Text(s.to_owned()))
            }
            PropertyType::Decimal => s
                .trim()
                .parse::<f64>()
                .map(PropertyValue::Numeric)
                .map_err(|_| ValueError::InvalidNumeric(s.to_owned())),
            PropertyType::Integer => s
                .trim()
                .parse::<i64>()
                .map(|v| PropertyValue::Numeric(v as f64))
                .map_err(|_| ValueError::InvalidInteger(s.to_owned())),
            PropertyType::Boolean => {
                let trimmed = s.trim();
                if trimmed.eq_ignore_ascii_case("true") {
                    Ok(PropertyValue::Boolean(true))
                } else if trimmed.eq_ignore_ascii_case("false") {
                    Ok(PropertyValue::Boolean(false))
                } else {
                    Err(ValueError::InvalidBoolean(s.to_owned()))
                }
            }
        }
    }

    /// Order two values. Same-kind pairs compare natively (floats via
    /// `total_cmp`, so the result is deterministic for every input);
    /// mixed-kind pairs fall back to comparing display strings.
    pub fn compare(&self, other: &PropertyValue) -> Ordering {
        match (self, other) {
            (PropertyValue::Text(a), PropertyValue::Text(b)) => a.cmp(b),
            (PropertyValue::Numeric(a), PropertyValue::Numeric(b)) => a.total_cmp(b),
            (PropertyValue::Boolean(a), PropertyValue::Boolean(b)) => a.cmp(b),
            _ => self.to_string().cmp(&other.to_string()),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Text(s) => f.write_str(s),
            PropertyValue::Numeric(n) => write!(f, "{}", n),
            PropertyValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl Default for PropertyValue {
    fn default() -> Self {
        PropertyValue::Text(String::new())
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::Text(s.to_owned())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::Text(s)
    }
}

impl From<f64> for PropertyValue {
    fn from(n: f64) -> Self {
        PropertyValue::Numeric(n)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Boolean(b)
    }
}

/// Declared kind of a component property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    Text,
    Decimal,
    Integer,
    Boolean,
    Enumeration,
}

/// Identifies an auxiliary per-property condition. The set is open so
/// unrecognised entries survive a round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OtherConditionType(pub u32);

impl OtherConditionType {
    /// Controls whether a property is written out with the document.
    pub const SERIALIZE: OtherConditionType = OtherConditionType(1);
}

/// A conditional display format for a property value. Rules are ordered;
/// the first rule whose conditions hold wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyFormatRule {
    pub conditions: ConditionTree,
    pub format: String,
}

/// A configurable property of a component description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentProperty {
    pub name: String,
    pub serialized_name: String,
    pub display_name: String,
    pub kind: PropertyType,
    pub default: PropertyValue,
    /// Permitted values, meaningful only for `Enumeration` properties.
    pub enum_options: Vec<String>,
    pub format_rules: Vec<PropertyFormatRule>,
    pub other_conditions: BTreeMap<OtherConditionType, ConditionTree>,
}

impl ComponentProperty {
    pub fn new(
        name: impl Into<String>,
        serialized_name: impl Into<String>,
        display_name: impl Into<String>,
        kind: PropertyType,
        default: PropertyValue,
    ) -> Self {
        Self {
            name: name.into(),
            serialized_name: serialized_name.into(),
            display_name: display_name.into(),
            kind,
            default,
            enum_options: Vec::new(),
            format_rules: Vec::new(),
            other_conditions: BTreeMap::new(),
        }
    }

    pub fn with_enum_options(mut self, options: Vec<String>) -> Self {
        self.enum_options = options;
        self
    }

    pub fn with_format_rule(mut self, conditions: ConditionTree, format: impl Into<String>) -> Self {
        self.format_rules.push(PropertyFormatRule {
            conditions,
            format: format.into(),
        });
        self
    }

    pub fn with_other_condition(
        mut self,
        kind: OtherConditionType,
        conditions: ConditionTree,
    ) -> Self {
        self.other_conditions.insert(kind, conditions);
        self
    }

    /// First format rule whose conditions hold for the given instance,
    /// or `None` when no rule applies.
    pub fn matching_format(&self, context: &dyn ConditionContext) -> Result<Option<&str>, EvalError> {
        for rule in &self.format_rules {
            if rule.conditions.evaluate(context)? {
                return Ok(Some(&rule.format));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal() {
        let value = PropertyValue::parse_as("4.7", PropertyType::Decimal).unwrap();
        assert_eq!(value, PropertyValue::Numeric(4.7));

        let err = PropertyValue::parse_as("red", PropertyType::Decimal).unwrap_err();
        assert_eq!(err, ValueError::InvalidNumeric("red".to_owned()));
    }

    #[test]
    fn test_parse_integer_rejects_fraction() {
        let value = PropertyValue::parse_as("12", PropertyType::Integer).unwrap();
        assert_eq!(value, PropertyValue::Numeric(12.0));

        assert!(PropertyValue::parse_as("4.7", PropertyType::Integer).is_err());
    }

    #[test]
    fn test_parse_boolean() {
        assert_eq!(
            PropertyValue::parse_as("True", PropertyType::Boolean).unwrap(),
            PropertyValue::Boolean(true)
        );
        assert_eq!(
            PropertyValue::parse_as(" false ", PropertyType::Boolean).unwrap(),
            PropertyValue::Boolean(false)
        );
        assert!(PropertyValue::parse_as("yes", PropertyType::Boolean).is_err());
    }

    #[test]
    fn test_compare_same_kind() {
        let a = PropertyValue::Numeric(4.7);
        let b = PropertyValue::Numeric(5.0);
        assert_eq!(a.compare(&b), Ordering::Less);
        assert_eq!(b.compare(&a), Ordering::Greater);
        assert_eq!(a.compare(&a.clone()), Ordering::Equal);
    }

    #[test]
    fn test_compare_mixed_kind_uses_display() {
        // "1" renders identically from both kinds, so they order equal
        // even though they are structurally different values.
        let numeric = PropertyValue::Numeric(1.0);
        let text = PropertyValue::Text("1".to_owned());
        assert_eq!(numeric.compare(&text), Ordering::Equal);
        assert_ne!(numeric, text);
    }

    #[test]
    fn test_display() {
        assert_eq!(PropertyValue::Numeric(4.7).to_string(), "4.7");
        assert_eq!(PropertyValue::Numeric(5.0).to_string(), "5");
        assert_eq!(PropertyValue::Boolean(true).to_string(), "true");
        assert_eq!(PropertyValue::Text("1k".to_owned()).to_string(), "1k");
    }

    #[test]
    fn test_matching_format_picks_first_rule() {
        use crate::condition::{ConditionComparison, VariableSource};
        use std::collections::HashMap;

        struct Ctx(HashMap<String, PropertyValue>);
        impl ConditionContext for Ctx {
            fn property_value(&self, name: &str) -> Option<PropertyValue> {
                self.0.get(name).cloned()
            }
            fn state_value(&self, _name: &str) -> Option<PropertyValue> {
                None
            }
        }

        let rule_conditions = ConditionTree::leaf(
            VariableSource::Property,
            "Resistance",
            ConditionComparison::GreaterThanOrEqual,
            PropertyValue::Numeric(1000.0),
        );
        let property = ComponentProperty::new(
            "Resistance",
            "resistance",
            "Resistance",
            PropertyType::Decimal,
            PropertyValue::Numeric(4700.0),
        )
        .with_format_rule(rule_conditions, "$Resistance k")
        .with_format_rule(ConditionTree::Empty, "$Resistance");

        let mut values = HashMap::new();
        values.insert("Resistance".to_owned(), PropertyValue::Numeric(4700.0));
        assert_eq!(
            property.matching_format(&Ctx(values)).unwrap(),
            Some("$Resistance k")
        );

        let mut values = HashMap::new();
        values.insert("Resistance".to_owned(), PropertyValue::Numeric(100.0));
        assert_eq!(
            property.matching_format(&Ctx(values)).unwrap(),
            Some("$Resistance")
        );
    }
}
