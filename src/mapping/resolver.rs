//! Type Resolver
//!
//! Two directions:
//! - native -> store: registry defaults for scalars, structural rules for
//!   nullable, sequence, map, tuple, record and enum natives.
//! - store -> native: an explicit store type goes through the cache and the
//!   parser; the native hint disambiguates nodes that several natives share
//!   (`DateTime64` with or without an offset, `String` holding bytes).

use std::sync::Arc;

use super::{Mapping, MappingCache, MappingRegistry};
use crate::ast::{EnumMember, NativeType, NestedField, TupleElement, TypeNode};
use crate::error::{ChError, ChResult};

/// Resolves native types and explicit store types to mappings.
#[derive(Debug)]
pub struct TypeResolver<'a> {
    registry: &'a MappingRegistry,
    cache: MappingCache,
}

impl<'a> TypeResolver<'a> {
    pub fn new(registry: &'a MappingRegistry) -> Self {
        Self {
            registry,
            cache: MappingCache::new(),
        }
    }

    pub fn registry(&self) -> &MappingRegistry {
        self.registry
    }

    pub fn cache(&self) -> &MappingCache {
        &self.cache
    }

    /// Resolve a column. An explicit store type wins over the native default;
    /// `hint` (or else `native`) guides the reverse mapping of its nodes.
    pub fn resolve(
        &self,
        native: &NativeType,
        explicit: Option<&str>,
        hint: Option<&NativeType>,
    ) -> Option<Arc<Mapping>> {
        match explicit {
            Some(raw) => self.resolve_store_type(raw, Some(hint.unwrap_or(native))),
            None => self.resolve_native(native),
        }
    }

    /// Resolve a store type string.
    pub fn resolve_store_type(
        &self,
        raw: &str,
        hint: Option<&NativeType>,
    ) -> Option<Arc<Mapping>> {
        // Simple names skip the cache unless the hint picks another native.
        if let Some(mapping) = self
            .registry
            .simple(raw)
            .filter(|m| hint.is_none_or(|h| m.native == *h))
        {
            return Some(mapping);
        }
        self.cache.get_or_parse(raw, hint)
    }

    /// Resolve a native type through the registry and the structural rules.
    pub fn resolve_native(&self, native: &NativeType) -> Option<Arc<Mapping>> {
        if let Some(mapping) = self.registry.for_native(native) {
            return Some(mapping);
        }
        let node = self.node_for(native)?;
        Some(Arc::new(Mapping::new(node, native.clone())))
    }

    /// Like [`resolve`](Self::resolve), substituting the configured fallback
    /// type when nothing matches. Nullability of the native is kept.
    pub fn resolve_or_fallback(
        &self,
        native: &NativeType,
        explicit: Option<&str>,
        hint: Option<&NativeType>,
    ) -> Arc<Mapping> {
        if let Some(mapping) = self.resolve(native, explicit, hint) {
            return mapping;
        }

        let fallback = self.registry.fallback();
        tracing::warn!(
            "Could not resolve {} ({}), falling back to {}",
            explicit.unwrap_or("native type"),
            native,
            fallback.store_type
        );

        if matches!(native, NativeType::Nullable(_)) && !fallback.is_nullable() {
            let node = fallback.node.clone().into_nullable();
            let native = NativeType::nullable(fallback.native.clone());
            return Arc::new(Mapping::new(node, native));
        }
        fallback
    }

    /// Like [`resolve`](Self::resolve), failing with `UnresolvedType`.
    pub fn resolve_required(
        &self,
        native: &NativeType,
        explicit: Option<&str>,
        hint: Option<&NativeType>,
    ) -> ChResult<Arc<Mapping>> {
        self.resolve(native, explicit, hint)
            .ok_or_else(|| ChError::UnresolvedType {
                store_type: explicit.map_or_else(|| native.to_string(), str::to_string),
            })
    }

    fn node_for(&self, native: &NativeType) -> Option<TypeNode> {
        if let Some(mapping) = self.registry.for_native(native) {
            return Some(mapping.node.clone());
        }
        match native {
            NativeType::Nullable(inner) => Some(self.node_for(inner)?.into_nullable()),
            NativeType::Sequence(inner) => match inner.as_ref() {
                NativeType::Record { name, fields } => self.nested_for(name, fields),
                element => Some(TypeNode::array(self.node_for(element)?)),
            },
            NativeType::Map(key, value) => {
                Some(TypeNode::map(self.node_for(key)?, self.node_for(value)?))
            }
            NativeType::Tuple(items) => {
                let elements = items
                    .iter()
                    .map(|item| Some(TupleElement::unnamed(self.node_for(item)?)))
                    .collect::<Option<Vec<_>>>()?;
                Some(TypeNode::Tuple(elements))
            }
            NativeType::Record { fields, .. } => {
                let elements = fields
                    .iter()
                    .map(|(name, ty)| Some(TupleElement::named(name, self.node_for(ty)?)))
                    .collect::<Option<Vec<_>>>()?;
                Some(TypeNode::Tuple(elements))
            }
            NativeType::Enum { name, members } => enum_node(name, members),
            _ => None,
        }
    }

    /// `Nested(...)` for a sequence of records whose fields are all scalars.
    fn nested_for(&self, name: &str, fields: &[(String, NativeType)]) -> Option<TypeNode> {
        if fields.is_empty() || !fields.iter().all(|(_, ty)| ty.is_primitively_mappable()) {
            tracing::debug!("Record '{}' has non-scalar fields, not mappable as Nested", name);
            return None;
        }
        let fields = fields
            .iter()
            .map(|(field, ty)| Some(NestedField::new(field, self.node_for(ty)?)))
            .collect::<Option<Vec<_>>>()?;
        Some(TypeNode::Nested(fields))
    }
}

/// Smallest enum width holding every member value.
fn enum_node(name: &str, members: &[(String, i64)]) -> Option<TypeNode> {
    if members.is_empty() {
        return None;
    }
    let bits = if members.iter().all(|(_, v)| i8::try_from(*v).is_ok()) {
        8
    } else if members.iter().all(|(_, v)| i16::try_from(*v).is_ok()) {
        16
    } else {
        tracing::debug!("Enum '{}' has values outside the Enum16 range", name);
        return None;
    };
    let members = members
        .iter()
        .map(|(member, value)| Some(EnumMember::new(member, i16::try_from(*value).ok()?)))
        .collect::<Option<Vec<_>>>()?;
    Some(TypeNode::Enum { bits, members })
}

/// Native type for a store node. The hint is followed where its shape
/// matches the node; a scalar hint applies to every leaf below.
pub fn native_for(node: &TypeNode, hint: Option<&NativeType>) -> NativeType {
    let hint = match node {
        TypeNode::Nullable(_) => hint,
        _ => hint.map(NativeType::unwrap_nullable),
    };
    match node {
        TypeNode::Nullable(inner) => NativeType::nullable(native_for(inner, hint)),
        TypeNode::LowCardinality(inner) => native_for(inner, hint),
        TypeNode::SimpleAggregateFunction { arg, .. } => native_for(arg, hint),
        TypeNode::AggregateFunction { .. } => NativeType::Opaque(node.to_string()),
        TypeNode::Primitive(name) => primitive_native(name, hint),
        TypeNode::FixedString(_) => match hint {
            Some(NativeType::Bytes) => NativeType::Bytes,
            _ => NativeType::String,
        },
        TypeNode::Decimal { .. } => NativeType::Decimal,
        TypeNode::DateTime { .. } => match hint {
            Some(NativeType::DateTimeOffset) => NativeType::DateTimeOffset,
            _ => NativeType::DateTime,
        },
        TypeNode::Array(inner) => {
            let hint = child(hint, |h| match h {
                NativeType::Sequence(element) => Some(element.as_ref()),
                _ => None,
            });
            NativeType::sequence(native_for(inner, hint))
        }
        TypeNode::Map(key, value) => {
            let (key_hint, value_hint) = match hint {
                Some(NativeType::Map(k, v)) => (Some(k.as_ref()), Some(v.as_ref())),
                h => (scalar(h), scalar(h)),
            };
            NativeType::map(native_for(key, key_hint), native_for(value, value_hint))
        }
        TypeNode::Tuple(elements) => tuple_native(elements, hint),
        TypeNode::Enum { bits, members } => NativeType::Enum {
            name: match hint {
                Some(NativeType::Enum { name, .. }) => name.clone(),
                _ => format!("Enum{}", bits),
            },
            members: members
                .iter()
                .map(|m| (m.name.clone(), i64::from(m.value)))
                .collect(),
        },
        TypeNode::Nested(fields) => {
            let (name, hints) = match hint {
                Some(NativeType::Sequence(element)) => match element.as_ref() {
                    NativeType::Record {
                        name,
                        fields: record_fields,
                    } => (name.clone(), Some(record_fields)),
                    _ => ("Nested".to_string(), None),
                },
                _ => ("Nested".to_string(), None),
            };
            let fields = fields
                .iter()
                .map(|field| {
                    let hint = hints.and_then(|h| {
                        h.iter()
                            .find(|(n, _)| *n == field.name)
                            .map(|(_, ty)| ty)
                    });
                    (field.name.clone(), native_for(&field.node, hint))
                })
                .collect();
            NativeType::sequence(NativeType::Record { name, fields })
        }
        TypeNode::Json(_) => NativeType::Json,
    }
}

fn scalar(hint: Option<&NativeType>) -> Option<&NativeType> {
    hint.filter(|h| h.is_primitive())
}

/// Hint for a child node: the structural part when `pick` matches, the
/// hint itself when it is a scalar.
fn child<'h>(
    hint: Option<&'h NativeType>,
    pick: impl Fn(&'h NativeType) -> Option<&'h NativeType>,
) -> Option<&'h NativeType> {
    hint.and_then(|h| pick(h).or_else(|| scalar(Some(h))))
}

fn tuple_native(elements: &[TupleElement], hint: Option<&NativeType>) -> NativeType {
    match hint {
        Some(NativeType::Record { name, fields }) if fields.len() == elements.len() => {
            NativeType::Record {
                name: name.clone(),
                fields: fields
                    .iter()
                    .zip(elements)
                    .map(|((field, ty), el)| (field.clone(), native_for(&el.node, Some(ty))))
                    .collect(),
            }
        }
        Some(NativeType::Tuple(items)) if items.len() == elements.len() => NativeType::Tuple(
            items
                .iter()
                .zip(elements)
                .map(|(ty, el)| native_for(&el.node, Some(ty)))
                .collect(),
        ),
        h => NativeType::Tuple(
            elements
                .iter()
                .map(|el| native_for(&el.node, scalar(h)))
                .collect(),
        ),
    }
}

fn point() -> NativeType {
    NativeType::Tuple(vec![NativeType::F64, NativeType::F64])
}

fn primitive_native(name: &str, hint: Option<&NativeType>) -> NativeType {
    match name {
        "Bool" => NativeType::Bool,
        "Int8" => NativeType::I8,
        "Int16" => NativeType::I16,
        "Int32" => NativeType::I32,
        "Int64" => match hint {
            Some(NativeType::Duration) => NativeType::Duration,
            _ => NativeType::I64,
        },
        "Int128" => NativeType::I128,
        "Int256" | "UInt256" => NativeType::BigInt,
        "UInt8" => NativeType::U8,
        "UInt16" => NativeType::U16,
        "UInt32" => NativeType::U32,
        "UInt64" => NativeType::U64,
        "UInt128" => NativeType::U128,
        "Float32" | "BFloat16" => NativeType::F32,
        "Float64" => NativeType::F64,
        "String" => match hint {
            Some(NativeType::Bytes) => NativeType::Bytes,
            Some(NativeType::Char) => NativeType::Char,
            _ => NativeType::String,
        },
        "UUID" => NativeType::Uuid,
        "Date" | "Date32" => NativeType::Date,
        "Time" => NativeType::Time,
        "IPv4" => NativeType::Ipv4,
        "IPv6" => NativeType::Ipv6,
        "Point" => point(),
        "Ring" | "LineString" => NativeType::sequence(point()),
        "MultiLineString" | "Polygon" => NativeType::sequence(NativeType::sequence(point())),
        "MultiPolygon" => {
            NativeType::sequence(NativeType::sequence(NativeType::sequence(point())))
        }
        name if name.starts_with("Interval") => match hint {
            Some(NativeType::Duration) => NativeType::Duration,
            _ => NativeType::I64,
        },
        other => NativeType::Opaque(other.to_string()),
    }
}
