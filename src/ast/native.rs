//! Native Types
//!
//! Host-side descriptors for the values a column holds. The resolver maps
//! these onto store types and back.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A native (host) value type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NativeType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    I128,
    /// Arbitrary-precision integer
    BigInt,
    U8,
    U16,
    U32,
    U64,
    U128,
    F32,
    F64,
    Decimal,
    String,
    Char,
    Bytes,
    Uuid,
    Date,
    /// Naive timestamp (no offset)
    DateTime,
    /// Wall-clock time with a UTC offset
    DateTimeOffset,
    Time,
    Duration,
    Ipv4,
    Ipv6,
    Json,
    Nullable(Box<NativeType>),
    Sequence(Box<NativeType>),
    Map(Box<NativeType>, Box<NativeType>),
    Tuple(Vec<NativeType>),
    Enum {
        name: String,
        members: Vec<(String, i64)>,
    },
    /// Plain data aggregate with named fields
    Record {
        name: String,
        fields: Vec<(String, NativeType)>,
    },
    /// A type the bridge does not know how to map
    Opaque(String),
}

impl NativeType {
    pub fn nullable(inner: NativeType) -> Self {
        Self::Nullable(Box::new(inner))
    }

    pub fn sequence(inner: NativeType) -> Self {
        Self::Sequence(Box::new(inner))
    }

    pub fn map(key: NativeType, value: NativeType) -> Self {
        Self::Map(Box::new(key), Box::new(value))
    }

    pub fn record(name: impl Into<String>, fields: Vec<(&str, NativeType)>) -> Self {
        Self::Record {
            name: name.into(),
            fields: fields
                .into_iter()
                .map(|(n, t)| (n.to_string(), t))
                .collect(),
        }
    }

    pub fn enumeration(name: impl Into<String>, members: Vec<(&str, i64)>) -> Self {
        Self::Enum {
            name: name.into(),
            members: members
                .into_iter()
                .map(|(n, v)| (n.to_string(), v))
                .collect(),
        }
    }

    /// Scalar types with a direct registry entry.
    pub const fn is_primitive(&self) -> bool {
        !matches!(
            self,
            Self::Nullable(_)
                | Self::Sequence(_)
                | Self::Map(..)
                | Self::Tuple(_)
                | Self::Enum { .. }
                | Self::Record { .. }
                | Self::Opaque(_)
        )
    }

    pub const fn is_collection(&self) -> bool {
        matches!(self, Self::Sequence(_) | Self::Map(..))
    }

    /// Strip a single `Nullable` layer.
    pub fn unwrap_nullable(&self) -> &NativeType {
        match self {
            Self::Nullable(inner) => inner,
            other => other,
        }
    }

    /// Whether this type is (or wraps) a primitive, optionally nullable.
    pub fn is_primitively_mappable(&self) -> bool {
        match self {
            Self::Nullable(inner) => inner.is_primitively_mappable(),
            Self::Enum { .. } => true,
            other => other.is_primitive(),
        }
    }
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::I8 => write!(f, "i8"),
            Self::I16 => write!(f, "i16"),
            Self::I32 => write!(f, "i32"),
            Self::I64 => write!(f, "i64"),
            Self::I128 => write!(f, "i128"),
            Self::BigInt => write!(f, "BigInt"),
            Self::U8 => write!(f, "u8"),
            Self::U16 => write!(f, "u16"),
            Self::U32 => write!(f, "u32"),
            Self::U64 => write!(f, "u64"),
            Self::U128 => write!(f, "u128"),
            Self::F32 => write!(f, "f32"),
            Self::F64 => write!(f, "f64"),
            Self::Decimal => write!(f, "Decimal"),
            Self::String => write!(f, "String"),
            Self::Char => write!(f, "char"),
            Self::Bytes => write!(f, "Vec<u8>"),
            Self::Uuid => write!(f, "Uuid"),
            Self::Date => write!(f, "NaiveDate"),
            Self::DateTime => write!(f, "NaiveDateTime"),
            Self::DateTimeOffset => write!(f, "DateTime<FixedOffset>"),
            Self::Time => write!(f, "NaiveTime"),
            Self::Duration => write!(f, "Duration"),
            Self::Ipv4 => write!(f, "Ipv4Addr"),
            Self::Ipv6 => write!(f, "Ipv6Addr"),
            Self::Json => write!(f, "serde_json::Value"),
            Self::Nullable(inner) => write!(f, "Option<{}>", inner),
            Self::Sequence(inner) => write!(f, "Vec<{}>", inner),
            Self::Map(k, v) => write!(f, "HashMap<{}, {}>", k, v),
            Self::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Self::Enum { name, .. } | Self::Record { name, .. } | Self::Opaque(name) => {
                write!(f, "{}", name)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(NativeType::nullable(NativeType::I32).to_string(), "Option<i32>");
        assert_eq!(
            NativeType::map(NativeType::String, NativeType::sequence(NativeType::F64)).to_string(),
            "HashMap<String, Vec<f64>>"
        );
        assert_eq!(NativeType::Tuple(vec![NativeType::U8]).to_string(), "(u8,)");
    }

    #[test]
    fn test_primitive_classification() {
        assert!(NativeType::Uuid.is_primitive());
        assert!(!NativeType::sequence(NativeType::I32).is_primitive());
        assert!(NativeType::sequence(NativeType::I32).is_collection());
        assert!(NativeType::nullable(NativeType::Date).is_primitively_mappable());
        assert!(!NativeType::Opaque("Widget".into()).is_primitively_mappable());
        let rec = NativeType::record("Point", vec![("x", NativeType::F64)]);
        assert!(!rec.is_primitively_mappable());
    }
}
