//! Type Mappings
//!
//! A [`Mapping`] ties a store type to the native type its values use and to
//! the literal rule that formats them. Mappings are immutable and shared
//! behind `Arc` from the registry and the cache.

pub mod cache;
pub mod registry;
pub mod resolver;

pub use cache::{CacheStats, MappingCache};
pub use registry::MappingRegistry;
pub use resolver::TypeResolver;

use serde::Serialize;

use crate::ast::{NativeType, TypeNode};

/// Formatter selected for a store type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LiteralRule {
    /// Quoted, escaped string
    Text,
    /// Binary data as `unhex('..')`
    Hex,
    Bool,
    Integer { signed: bool, bits: u16 },
    Float,
    Decimal { scale: u8 },
    Uuid,
    Date,
    /// Timestamp with this many fractional digits
    DateTime { precision: u8 },
    Ipv4,
    Ipv6,
    Enum,
    Array,
    Map,
    Tuple,
    Nested,
    Json,
    /// Geo types, formatted through their tuple/array shape
    Geo,
    /// `Dynamic`: formatted from the value's own kind
    Dynamic,
    /// No literal form (aggregate states, `Nothing`)
    Unsupported,
}

impl LiteralRule {
    /// Pick the rule for a node. A `Bytes` native bound to a string type
    /// formats as `unhex`.
    pub fn for_node(node: &TypeNode, native: &NativeType) -> Self {
        let rule = Self::for_store(node);
        let binary_text = matches!(
            node.unwrapped(),
            TypeNode::FixedString(_) | TypeNode::Primitive(_)
        );
        if rule == Self::Text && binary_text && *native.unwrap_nullable() == NativeType::Bytes {
            Self::Hex
        } else {
            rule
        }
    }

    /// Rule from the store type alone.
    pub fn for_store(node: &TypeNode) -> Self {
        match node {
            TypeNode::Nullable(inner) | TypeNode::LowCardinality(inner) => Self::for_store(inner),
            TypeNode::SimpleAggregateFunction { arg, .. } => Self::for_store(arg),
            TypeNode::Primitive(name) => Self::for_primitive(name),
            TypeNode::FixedString(_) => Self::Text,
            TypeNode::Decimal { scale, .. } => Self::Decimal { scale: *scale },
            TypeNode::DateTime { precision, .. } => Self::DateTime {
                precision: precision.unwrap_or(0),
            },
            TypeNode::Array(_) => Self::Array,
            TypeNode::Map(..) => Self::Map,
            TypeNode::Tuple(_) => Self::Tuple,
            TypeNode::Enum { .. } => Self::Enum,
            TypeNode::Nested(_) => Self::Nested,
            TypeNode::Json(_) => Self::Json,
            TypeNode::AggregateFunction { .. } => Self::Unsupported,
        }
    }

    fn for_primitive(name: &str) -> Self {
        match name {
            "String" => Self::Text,
            "Bool" => Self::Bool,
            "Int8" => Self::Integer { signed: true, bits: 8 },
            "Int16" => Self::Integer { signed: true, bits: 16 },
            "Int32" => Self::Integer { signed: true, bits: 32 },
            "Int64" => Self::Integer { signed: true, bits: 64 },
            "Int128" => Self::Integer { signed: true, bits: 128 },
            "Int256" => Self::Integer { signed: true, bits: 256 },
            "UInt8" => Self::Integer { signed: false, bits: 8 },
            "UInt16" => Self::Integer { signed: false, bits: 16 },
            "UInt32" => Self::Integer { signed: false, bits: 32 },
            "UInt64" => Self::Integer { signed: false, bits: 64 },
            "UInt128" => Self::Integer { signed: false, bits: 128 },
            "UInt256" => Self::Integer { signed: false, bits: 256 },
            "Float32" | "Float64" | "BFloat16" => Self::Float,
            "UUID" => Self::Uuid,
            "Date" | "Date32" => Self::Date,
            "Time" => Self::Text,
            "IPv4" => Self::Ipv4,
            "IPv6" => Self::Ipv6,
            "Dynamic" => Self::Dynamic,
            "Point" | "Ring" | "LineString" | "MultiLineString" | "Polygon" | "MultiPolygon" => {
                Self::Geo
            }
            name if name.starts_with("Interval") => Self::Integer { signed: true, bits: 64 },
            _ => Self::Unsupported,
        }
    }
}

/// A resolved store type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Mapping {
    /// Canonical store type string
    pub store_type: String,
    pub native: NativeType,
    pub node: TypeNode,
    pub rule: LiteralRule,
}

impl Mapping {
    pub fn new(node: TypeNode, native: NativeType) -> Self {
        Self {
            store_type: node.to_string(),
            rule: LiteralRule::for_node(&node, &native),
            native,
            node,
        }
    }

    pub fn is_nullable(&self) -> bool {
        self.node.is_nullable()
    }
}
