//! Store Types
//!
//! `TypeNode` is the canonical parsed form of a ClickHouse column type.
//! `Display` renders the canonical type string, and parsing that string
//! yields the same node.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::transpiler::traits::{escape_name, quote_string};

/// A parsed store type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeNode {
    /// Parameterless type: `Int32`, `String`, `UUID`, `Date`, ...
    Primitive(String),
    Nullable(Box<TypeNode>),
    LowCardinality(Box<TypeNode>),
    /// FixedString(N)
    FixedString(u32),
    /// Decimal(P, S). The sized forms `Decimal32(S)`..`Decimal256(S)` normalize here.
    Decimal { precision: u8, scale: u8 },
    /// `DateTime[('tz')]` when `precision` is `None`, `DateTime64(P[, 'tz'])` otherwise.
    DateTime {
        precision: Option<u8>,
        timezone: Option<String>,
    },
    Array(Box<TypeNode>),
    Map(Box<TypeNode>, Box<TypeNode>),
    Tuple(Vec<TupleElement>),
    /// Enum8 / Enum16
    Enum { bits: u8, members: Vec<EnumMember> },
    /// AggregateFunction(fn, T1, ..). `function` keeps its parameters: `quantiles(0.5, 0.9)`.
    AggregateFunction { function: String, args: Vec<TypeNode> },
    SimpleAggregateFunction { function: String, arg: Box<TypeNode> },
    Nested(Vec<NestedField>),
    Json(JsonParams),
}

/// Tuple element with an optional name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TupleElement {
    pub name: Option<String>,
    pub node: TypeNode,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnumMember {
    pub name: String,
    pub value: i16,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NestedField {
    pub name: String,
    pub node: TypeNode,
}

/// JSON column parameters. Unset limits are omitted from the rendered type
/// so the server applies its own defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JsonParams {
    pub max_dynamic_paths: Option<u32>,
    pub max_dynamic_types: Option<u32>,
    /// `path Type` hints
    pub typed_paths: Vec<(String, TypeNode)>,
    /// `SKIP path`
    pub skip_paths: Vec<String>,
    /// `SKIP REGEXP 'pattern'`
    pub skip_regexps: Vec<String>,
}

impl JsonParams {
    pub fn is_empty(&self) -> bool {
        self.max_dynamic_paths.is_none()
            && self.max_dynamic_types.is_none()
            && self.typed_paths.is_empty()
            && self.skip_paths.is_empty()
            && self.skip_regexps.is_empty()
    }
}

impl TupleElement {
    pub fn unnamed(node: TypeNode) -> Self {
        Self { name: None, node }
    }

    pub fn named(name: impl Into<String>, node: TypeNode) -> Self {
        Self {
            name: Some(name.into()),
            node,
        }
    }
}

impl EnumMember {
    pub fn new(name: impl Into<String>, value: i16) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

impl NestedField {
    pub fn new(name: impl Into<String>, node: TypeNode) -> Self {
        Self {
            name: name.into(),
            node,
        }
    }
}

impl TypeNode {
    pub fn primitive(name: impl Into<String>) -> Self {
        Self::Primitive(name.into())
    }

    pub fn nullable(inner: TypeNode) -> Self {
        Self::Nullable(Box::new(inner))
    }

    pub fn low_cardinality(inner: TypeNode) -> Self {
        Self::LowCardinality(Box::new(inner))
    }

    pub fn array(inner: TypeNode) -> Self {
        Self::Array(Box::new(inner))
    }

    pub fn map(key: TypeNode, value: TypeNode) -> Self {
        Self::Map(Box::new(key), Box::new(value))
    }

    pub fn datetime64(precision: u8, timezone: Option<&str>) -> Self {
        Self::DateTime {
            precision: Some(precision),
            timezone: timezone.map(str::to_string),
        }
    }

    pub fn is_nullable(&self) -> bool {
        match self {
            Self::Nullable(_) => true,
            Self::LowCardinality(inner) => inner.is_nullable(),
            _ => false,
        }
    }

    /// Peel `Nullable` and `LowCardinality` wrappers.
    pub fn unwrapped(&self) -> &TypeNode {
        match self {
            Self::Nullable(inner) | Self::LowCardinality(inner) => inner.unwrapped(),
            other => other,
        }
    }

    /// Whether the store accepts this type inside `Nullable(...)`.
    pub fn can_be_inside_nullable(&self) -> bool {
        !matches!(
            self,
            Self::Nullable(_)
                | Self::LowCardinality(_)
                | Self::Array(_)
                | Self::Map(..)
                | Self::Tuple(_)
                | Self::Nested(_)
                | Self::Json(_)
                | Self::AggregateFunction { .. }
                | Self::SimpleAggregateFunction { .. }
        )
    }

    /// Wrap in `Nullable(...)` where the store allows it. `LowCardinality(T)`
    /// becomes `LowCardinality(Nullable(T))`; composite types stay as they are.
    pub fn into_nullable(self) -> TypeNode {
        match self {
            Self::LowCardinality(inner) if inner.can_be_inside_nullable() => {
                Self::LowCardinality(Box::new(Self::Nullable(inner)))
            }
            node if node.can_be_inside_nullable() => Self::Nullable(Box::new(node)),
            node => node,
        }
    }

    /// Short kind name used in error messages.
    pub fn kind(&self) -> &str {
        match self {
            Self::Primitive(name) => name,
            Self::Nullable(_) => "Nullable",
            Self::LowCardinality(_) => "LowCardinality",
            Self::FixedString(_) => "FixedString",
            Self::Decimal { .. } => "Decimal",
            Self::DateTime { precision: None, .. } => "DateTime",
            Self::DateTime { .. } => "DateTime64",
            Self::Array(_) => "Array",
            Self::Map(..) => "Map",
            Self::Tuple(_) => "Tuple",
            Self::Enum { bits: 8, .. } => "Enum8",
            Self::Enum { .. } => "Enum16",
            Self::AggregateFunction { .. } => "AggregateFunction",
            Self::SimpleAggregateFunction { .. } => "SimpleAggregateFunction",
            Self::Nested(_) => "Nested",
            Self::Json(_) => "JSON",
        }
    }
}

fn write_list<T>(
    f: &mut fmt::Formatter<'_>,
    items: &[T],
    mut each: impl FnMut(&mut fmt::Formatter<'_>, &T) -> fmt::Result,
) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        each(f, item)?;
    }
    Ok(())
}

impl fmt::Display for TypeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(name) => write!(f, "{}", name),
            Self::Nullable(inner) => write!(f, "Nullable({})", inner),
            Self::LowCardinality(inner) => write!(f, "LowCardinality({})", inner),
            Self::FixedString(n) => write!(f, "FixedString({})", n),
            Self::Decimal { precision, scale } => write!(f, "Decimal({}, {})", precision, scale),
            Self::DateTime {
                precision: None,
                timezone: None,
            } => write!(f, "DateTime"),
            Self::DateTime {
                precision: None,
                timezone: Some(tz),
            } => write!(f, "DateTime({})", quote_string(tz)),
            Self::DateTime {
                precision: Some(p),
                timezone: None,
            } => write!(f, "DateTime64({})", p),
            Self::DateTime {
                precision: Some(p),
                timezone: Some(tz),
            } => write!(f, "DateTime64({}, {})", p, quote_string(tz)),
            Self::Array(inner) => write!(f, "Array({})", inner),
            Self::Map(key, value) => write!(f, "Map({}, {})", key, value),
            Self::Tuple(elements) => {
                write!(f, "Tuple(")?;
                write_list(f, elements, |f, el| match &el.name {
                    Some(name) => write!(f, "{} {}", escape_name(name), el.node),
                    None => write!(f, "{}", el.node),
                })?;
                write!(f, ")")
            }
            Self::Enum { bits, members } => {
                write!(f, "Enum{}(", bits)?;
                write_list(f, members, |f, m| {
                    write!(f, "{} = {}", quote_string(&m.name), m.value)
                })?;
                write!(f, ")")
            }
            Self::AggregateFunction { function, args } => {
                write!(f, "AggregateFunction({}", function)?;
                for arg in args {
                    write!(f, ", {}", arg)?;
                }
                write!(f, ")")
            }
            Self::SimpleAggregateFunction { function, arg } => {
                write!(f, "SimpleAggregateFunction({}, {})", function, arg)
            }
            Self::Nested(fields) => {
                write!(f, "Nested(")?;
                write_list(f, fields, |f, field| {
                    write!(f, "{} {}", escape_name(&field.name), field.node)
                })?;
                write!(f, ")")
            }
            Self::Json(params) if params.is_empty() => write!(f, "JSON"),
            Self::Json(params) => {
                let mut parts: Vec<String> = Vec::new();
                if let Some(n) = params.max_dynamic_paths {
                    parts.push(format!("max_dynamic_paths={}", n));
                }
                if let Some(n) = params.max_dynamic_types {
                    parts.push(format!("max_dynamic_types={}", n));
                }
                for (path, node) in &params.typed_paths {
                    parts.push(format!("{} {}", path, node));
                }
                for path in &params.skip_paths {
                    parts.push(format!("SKIP {}", path));
                }
                for pattern in &params.skip_regexps {
                    parts.push(format!("SKIP REGEXP {}", quote_string(pattern)));
                }
                write!(f, "JSON({})", parts.join(", "))
            }
        }
    }
}
