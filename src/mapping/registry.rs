//! Mapping Registry
//!
//! Immutable tables built once at startup: native scalar kinds to their
//! default store types, and canonical simple store names to mappings.
//! Lookups never allocate.

use std::collections::HashMap;
use std::sync::Arc;

use super::Mapping;
use super::resolver::native_for;
use crate::ast::{JsonParams, NativeType, TypeNode};
use crate::config::{BridgeConfig, TypeConfig};
use crate::error::{ChError, ChResult};
use crate::parser::{SIMPLE_TYPES, canonical_simple_name, parse_type};

/// Native scalar kinds the registry knows defaults for.
const NATIVE_SCALARS: &[NativeType] = &[
    NativeType::Bool,
    NativeType::I8,
    NativeType::I16,
    NativeType::I32,
    NativeType::I64,
    NativeType::I128,
    NativeType::BigInt,
    NativeType::U8,
    NativeType::U16,
    NativeType::U32,
    NativeType::U64,
    NativeType::U128,
    NativeType::F32,
    NativeType::F64,
    NativeType::Decimal,
    NativeType::String,
    NativeType::Char,
    NativeType::Bytes,
    NativeType::Uuid,
    NativeType::Date,
    NativeType::DateTime,
    NativeType::DateTimeOffset,
    NativeType::Time,
    NativeType::Duration,
    NativeType::Ipv4,
    NativeType::Ipv6,
    NativeType::Json,
];

/// Default store type for a native scalar.
fn scalar_node(native: &NativeType, config: &TypeConfig, json: &JsonParams) -> Option<TypeNode> {
    let p = TypeNode::primitive;
    let node = match native {
        NativeType::Bool => p("Bool"),
        NativeType::I8 => p("Int8"),
        NativeType::I16 => p("Int16"),
        NativeType::I32 => p("Int32"),
        NativeType::I64 => p("Int64"),
        NativeType::I128 => p("Int128"),
        NativeType::BigInt => p("Int256"),
        NativeType::U8 => p("UInt8"),
        NativeType::U16 => p("UInt16"),
        NativeType::U32 => p("UInt32"),
        NativeType::U64 => p("UInt64"),
        NativeType::U128 => p("UInt128"),
        NativeType::F32 => p("Float32"),
        NativeType::F64 => p("Float64"),
        NativeType::Decimal => TypeNode::Decimal {
            precision: config.decimal_precision,
            scale: config.decimal_scale,
        },
        NativeType::String if config.low_cardinality_strings => {
            TypeNode::low_cardinality(p("String"))
        }
        NativeType::String | NativeType::Char | NativeType::Bytes => p("String"),
        NativeType::Uuid => p("UUID"),
        NativeType::Date => p("Date32"),
        NativeType::DateTime => TypeNode::datetime64(config.datetime_precision, None),
        NativeType::DateTimeOffset => {
            TypeNode::datetime64(config.datetime_precision, Some(&config.timezone))
        }
        NativeType::Time => p("Time"),
        NativeType::Duration => p("Int64"),
        NativeType::Ipv4 => p("IPv4"),
        NativeType::Ipv6 => p("IPv6"),
        NativeType::Json => TypeNode::Json(json.clone()),
        _ => return None,
    };
    Some(node)
}

/// Registry of default mappings.
#[derive(Debug, Clone)]
pub struct MappingRegistry {
    config: TypeConfig,
    json: JsonParams,
    by_native: HashMap<NativeType, Arc<Mapping>>,
    by_name: HashMap<&'static str, Arc<Mapping>>,
    fallback: Arc<Mapping>,
}

impl Default for MappingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MappingRegistry {
    /// Registry with built-in defaults.
    pub fn new() -> Self {
        let fallback = Arc::new(Mapping::new(
            TypeNode::primitive("String"),
            NativeType::String,
        ));
        Self::build(TypeConfig::default(), JsonParams::default(), fallback)
    }

    /// Registry honoring a validated configuration.
    pub fn with_config(config: &BridgeConfig) -> ChResult<Self> {
        config.validate()?;
        let node = parse_type(&config.types.fallback_type).ok_or_else(|| {
            ChError::invalid(format!(
                "fallback_type '{}' is not a valid store type",
                config.types.fallback_type
            ))
        })?;
        let native = native_for(&node, None);
        let fallback = Arc::new(Mapping::new(node, native));
        Ok(Self::build(
            config.types.clone(),
            config.json.params(),
            fallback,
        ))
    }

    fn build(config: TypeConfig, json: JsonParams, fallback: Arc<Mapping>) -> Self {
        let by_native = NATIVE_SCALARS
            .iter()
            .filter_map(|native| {
                let node = scalar_node(native, &config, &json)?;
                Some((native.clone(), Arc::new(Mapping::new(node, native.clone()))))
            })
            .collect();

        let by_name = SIMPLE_TYPES
            .iter()
            .map(|name| {
                let node = TypeNode::primitive(*name);
                let native = native_for(&node, None);
                (*name, Arc::new(Mapping::new(node, native)))
            })
            .collect();

        Self {
            config,
            json,
            by_native,
            by_name,
            fallback,
        }
    }

    /// Default mapping for a native scalar.
    pub fn for_native(&self, native: &NativeType) -> Option<Arc<Mapping>> {
        self.by_native.get(native).cloned()
    }

    /// Mapping for a simple store name or alias (`Int32`, `BIGINT`, `text`).
    pub fn simple(&self, raw: &str) -> Option<Arc<Mapping>> {
        let name = canonical_simple_name(raw)?;
        self.by_name.get(name).cloned()
    }

    pub fn fallback(&self) -> Arc<Mapping> {
        Arc::clone(&self.fallback)
    }

    pub fn config(&self) -> &TypeConfig {
        &self.config
    }

    pub fn json(&self) -> &JsonParams {
        &self.json
    }

    /// Number of native defaults.
    pub fn len(&self) -> usize {
        self.by_native.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_native.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::LiteralRule;

    #[test]
    fn test_native_defaults() {
        let registry = MappingRegistry::new();
        let cases = [
            (NativeType::I32, "Int32"),
            (NativeType::U64, "UInt64"),
            (NativeType::BigInt, "Int256"),
            (NativeType::Decimal, "Decimal(18, 4)"),
            (NativeType::Date, "Date32"),
            (NativeType::DateTime, "DateTime64(3)"),
            (NativeType::DateTimeOffset, "DateTime64(3, 'UTC')"),
            (NativeType::Duration, "Int64"),
            (NativeType::Json, "JSON"),
            (NativeType::Bytes, "String"),
        ];
        for (native, expected) in cases {
            let mapping = registry.for_native(&native).unwrap();
            assert_eq!(mapping.store_type, expected, "{}", native);
        }
        assert_eq!(registry.len(), NATIVE_SCALARS.len());
        assert_eq!(
            registry.for_native(&NativeType::Bytes).unwrap().rule,
            LiteralRule::Hex
        );
        assert!(registry.for_native(&NativeType::Opaque("X".into())).is_none());
    }

    #[test]
    fn test_simple_names_and_aliases() {
        let registry = MappingRegistry::new();
        assert_eq!(registry.simple("BIGINT").unwrap().store_type, "Int64");
        assert_eq!(registry.simple("text").unwrap().native, NativeType::String);
        assert_eq!(registry.simple("UInt256").unwrap().native, NativeType::BigInt);
        assert!(registry.simple("Array(Int32)").is_none());
    }

    #[test]
    fn test_with_config() {
        let mut config = BridgeConfig::default();
        config.types.decimal_precision = 38;
        config.types.decimal_scale = 10;
        config.types.datetime_precision = 6;
        config.types.timezone = "Europe/Berlin".into();
        config.types.low_cardinality_strings = true;
        config.types.fallback_type = "Nullable(String)".into();
        config.json.max_dynamic_paths = Some(128);

        let registry = MappingRegistry::with_config(&config).unwrap();
        let get = |n: NativeType| registry.for_native(&n).unwrap().store_type.clone();
        assert_eq!(get(NativeType::Decimal), "Decimal(38, 10)");
        assert_eq!(get(NativeType::DateTimeOffset), "DateTime64(6, 'Europe/Berlin')");
        assert_eq!(get(NativeType::String), "LowCardinality(String)");
        assert_eq!(get(NativeType::Json), "JSON(max_dynamic_paths=128)");
        assert_eq!(registry.fallback().store_type, "Nullable(String)");
    }

    #[test]
    fn test_with_invalid_config() {
        let mut config = BridgeConfig::default();
        config.types.datetime_precision = 10;
        assert!(matches!(
            MappingRegistry::with_config(&config),
            Err(ChError::InvalidConfiguration(_))
        ));
    }
}
