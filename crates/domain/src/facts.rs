//! Structural facts gathered about scanned units.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Declaration kind of a compiled unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// Neither an interface nor a metadata declaration.
    Standard,
    /// An interface declaration.
    Interface,
    /// A declaration-metadata (annotation) type.
    Metadata,
}

impl UnitKind {
    /// Stable identifier for output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Interface => "interface",
            Self::Metadata => "metadata",
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// A compile-time constant initializer value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ConstantValue {
    /// 32-bit integer.
    Int(i32),
    /// 64-bit integer.
    Long(i64),
    /// 16-bit integer.
    Short(i16),
    /// 8-bit integer.
    Byte(i8),
    /// Single character.
    Char(char),
    /// 32-bit float.
    Float(f32),
    /// 64-bit float.
    Double(f64),
    /// Boolean.
    Boolean(bool),
    /// String literal.
    String(String),
}

impl fmt::Display for ConstantValue {
    /// Chars are rendered in single quotes and strings in double quotes,
    /// with the quote character escaped.
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(formatter, "{value}"),
            Self::Long(value) => write!(formatter, "{value}"),
            Self::Short(value) => write!(formatter, "{value}"),
            Self::Byte(value) => write!(formatter, "{value}"),
            Self::Char('\'') => formatter.write_str("'\\''"),
            Self::Char(value) => write!(formatter, "'{value}'"),
            Self::Float(value) => write!(formatter, "{value}"),
            Self::Double(value) => write!(formatter, "{value}"),
            Self::Boolean(value) => write!(formatter, "{value}"),
            Self::String(value) => write!(formatter, "\"{}\"", value.replace('"', "\\\"")),
        }
    }
}

/// Constant values per unit name, then per field name.
pub type UnitConstants = BTreeMap<String, BTreeMap<String, ConstantValue>>;

/// Facts recorded for one unit by an external scanner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UnitFacts {
    /// Dotted unit name.
    pub name: String,
    /// Declaration kind.
    pub kind: UnitKind,
    /// Direct superclass, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superclass: Option<String>,
    /// Directly implemented or extended interfaces.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<String>,
    /// Unit names used as field types.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub field_types: Vec<String>,
    /// Metadata declarations attached to the unit.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metadata: Vec<String>,
    /// Literal constant initializers by field name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub constants: BTreeMap<String, ConstantValue>,
}

impl UnitFacts {
    /// Facts for a unit with no relationships.
    pub fn new(name: impl Into<String>, kind: UnitKind) -> Self {
        Self {
            name: name.into(),
            kind,
            superclass: None,
            interfaces: Vec::new(),
            field_types: Vec::new(),
            metadata: Vec::new(),
            constants: BTreeMap::new(),
        }
    }

    /// Set the direct superclass.
    #[must_use]
    pub fn extends(mut self, superclass: impl Into<String>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    /// Add a directly implemented (or, for interfaces, extended) interface.
    #[must_use]
    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// Add a field type reference.
    #[must_use]
    pub fn with_field_type(mut self, type_name: impl Into<String>) -> Self {
        self.field_types.push(type_name.into());
        self
    }

    /// Attach a metadata declaration.
    #[must_use]
    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata.push(metadata.into());
        self
    }

    /// Record a constant initializer.
    #[must_use]
    pub fn with_constant(mut self, field: impl Into<String>, value: ConstantValue) -> Self {
        self.constants.insert(field.into(), value);
        self
    }
}

/// Collect the per-unit constant map from a fact list.
pub fn constants_of(facts: &[UnitFacts]) -> UnitConstants {
    facts
        .iter()
        .filter(|unit| !unit.constants.is_empty())
        .map(|unit| (unit.name.clone(), unit.constants.clone()))
        .collect()
}

/// Split `Unit.field` at the last dot; `None` without a unit part.
#[must_use]
pub fn split_field_name(qualified: &str) -> Option<(&str, &str)> {
    let dot = qualified.rfind('.')?;
    if dot == 0 {
        return None;
    }
    let (unit, field) = (qualified.get(..dot)?, qualified.get(dot + 1..)?);
    if field.is_empty() {
        return None;
    }
    Some((unit, field))
}
