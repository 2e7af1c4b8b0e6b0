//! Property tests for the store-type grammar.

use proptest::prelude::*;
use qail_clickhouse::prelude::*;

fn simple_type() -> impl Strategy<Value = TypeNode> {
    prop::sample::select(vec![
        "Int8", "Int16", "Int32", "Int64", "Int128", "Int256", "UInt8", "UInt16", "UInt32",
        "UInt64", "UInt128", "UInt256", "Float32", "Float64", "String", "Bool", "UUID", "Date",
        "Date32", "IPv4", "IPv6",
    ])
    .prop_map(TypeNode::primitive)
}

fn field_name() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => "f_[a-z0-9]{0,6}",
        1 => prop::sample::select(vec!["a.b", "order", "my col", "x`y", "x,y", "1st"])
            .prop_map(str::to_string),
    ]
}

fn json_path() -> impl Strategy<Value = String> {
    "p_[a-z]{1,3}(\\.[a-z_]{1,3}){0,2}"
}

fn aggregate_name() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["uniq", "sum", "argMax", "anyLast", "quantiles(0.5, 0.9)"])
        .prop_map(str::to_string)
}

fn scalar_type() -> impl Strategy<Value = TypeNode> {
    prop_oneof![
        4 => simple_type(),
        1 => (1u32..=64).prop_map(TypeNode::FixedString),
        1 => (1u8..=76)
            .prop_flat_map(|p| (Just(p), 0..=p))
            .prop_map(|(precision, scale)| TypeNode::Decimal { precision, scale }),
        1 => (
            prop::option::of(0u8..=9),
            prop::option::of(prop::sample::select(vec!["UTC", "Europe/Berlin", "Asia/Tokyo"]))
        )
            .prop_map(|(precision, tz)| TypeNode::DateTime {
                precision,
                timezone: tz.map(str::to_string),
            }),
        1 => prop::collection::btree_set("[a-z]{1,6}", 1..5).prop_map(|names| TypeNode::Enum {
            bits: 8,
            members: names
                .into_iter()
                .enumerate()
                .map(|(i, name)| EnumMember::new(name, i as i16 - 2))
                .collect(),
        }),
        1 => prop::collection::btree_set("[a-z]{1,6}", 1..5)
            .prop_flat_map(|names| {
                let n = names.len();
                (Just(names), prop::collection::btree_set(-1000i16..1000, n..=n))
            })
            .prop_map(|(names, values)| TypeNode::Enum {
                bits: 16,
                members: names
                    .into_iter()
                    .zip(values)
                    .map(|(name, value)| EnumMember::new(name, value))
                    .collect(),
            }),
    ]
}

fn nullable_scalar() -> impl Strategy<Value = TypeNode> {
    scalar_type().prop_map(|node| {
        if node.can_be_inside_nullable() {
            TypeNode::nullable(node)
        } else {
            node
        }
    })
}

fn arb_type() -> impl Strategy<Value = TypeNode> {
    let leaf = prop_oneof![3 => scalar_type(), 1 => nullable_scalar()];
    leaf.prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            inner.clone().prop_map(TypeNode::array),
            (simple_type(), inner.clone()).prop_map(|(k, v)| TypeNode::map(k, v)),
            prop::collection::vec(inner.clone(), 1..4).prop_map(|nodes| {
                TypeNode::Tuple(nodes.into_iter().map(TupleElement::unnamed).collect())
            }),
            prop::collection::btree_map(field_name(), inner.clone(), 1..4).prop_map(|fields| {
                TypeNode::Tuple(
                    fields
                        .into_iter()
                        .map(|(name, node)| TupleElement::named(name, node))
                        .collect(),
                )
            }),
            prop::collection::btree_map(field_name(), inner.clone(), 1..4).prop_map(|fields| {
                TypeNode::Nested(
                    fields
                        .into_iter()
                        .map(|(name, node)| NestedField::new(name, node))
                        .collect(),
                )
            }),
            inner.clone().prop_map(|node| match node {
                TypeNode::LowCardinality(_) => node,
                other => TypeNode::low_cardinality(other),
            }),
            (aggregate_name(), prop::collection::vec(inner.clone(), 1..3))
                .prop_map(|(function, args)| TypeNode::AggregateFunction { function, args }),
            (aggregate_name(), inner.clone()).prop_map(|(function, arg)| {
                TypeNode::SimpleAggregateFunction {
                    function,
                    arg: Box::new(arg),
                }
            }),
            (
                prop::option::of(0u32..4096),
                prop::option::of(0u32..256),
                prop::collection::vec((json_path(), inner), 0..3),
                prop::collection::vec(json_path(), 0..3),
                prop::collection::vec("[a-z.*']{1,6}", 0..2),
            )
                .prop_map(
                    |(max_dynamic_paths, max_dynamic_types, typed_paths, skip_paths, skip_regexps)| {
                        TypeNode::Json(JsonParams {
                            max_dynamic_paths,
                            max_dynamic_types,
                            typed_paths,
                            skip_paths,
                            skip_regexps,
                        })
                    },
                ),
        ]
    })
}

proptest! {
    #[test]
    fn canonical_form_round_trips(node in arb_type()) {
        let rendered = node.to_string();
        let parsed = parse_type(&rendered);
        prop_assert_eq!(parsed.as_ref(), Some(&node), "round trip failed for {}", rendered);
    }

    #[test]
    fn parsing_never_panics(raw in "\\PC{0,200}") {
        let _ = parse_type(&raw);
    }

    #[test]
    fn parsing_unbalanced_prefix_is_none(node in arb_type()) {
        let rendered = node.to_string();
        if let Some(cut) = rendered.rfind(')') {
            prop_assert_eq!(parse_type(&rendered[..cut]), None);
        }
    }

    #[test]
    fn resolve_is_idempotent(node in arb_type()) {
        let registry = MappingRegistry::new();
        let resolver = TypeResolver::new(&registry);
        let raw = node.to_string();

        let first = resolver.resolve_store_type(&raw, None);
        let size = resolver.cache().len();
        let second = resolver.resolve_store_type(&raw, None);

        prop_assert_eq!(first, second);
        prop_assert_eq!(resolver.cache().len(), size);
    }
}

#[test]
fn grammar_examples() {
    assert_eq!(
        parse_type("Nullable(Array(Int32))"),
        Some(TypeNode::nullable(TypeNode::array(TypeNode::primitive("Int32"))))
    );
    assert_eq!(
        parse_type("Decimal64(2)"),
        Some(TypeNode::Decimal {
            precision: 18,
            scale: 2
        })
    );
    assert_eq!(parse_type("Tuple(Int32,"), None);
    assert_eq!(parse_type(""), None);
    assert_eq!(
        parse_type("  map( String ,  UInt64 ) ").map(|n| n.to_string()),
        Some("Map(String, UInt64)".to_string())
    );
}

#[test]
fn documented_type_strings() {
    let decimal64 = TypeNode::Decimal {
        precision: 18,
        scale: 2,
    };

    let node = parse_type("LowCardinality(Nullable(Array(Decimal64(2))))").unwrap();
    assert_eq!(
        node,
        TypeNode::low_cardinality(TypeNode::nullable(TypeNode::array(decimal64.clone())))
    );
    assert_eq!(parse_type(&node.to_string()), Some(node));

    let node = parse_type("Map(String, Array(Decimal64(2)))").unwrap();
    assert_eq!(
        node,
        TypeNode::map(TypeNode::primitive("String"), TypeNode::array(decimal64))
    );
    assert_eq!(node.to_string(), "Map(String, Array(Decimal(18, 2)))");

    for raw in [
        "LowCardinality(Nullable(String))",
        "LowCardinality(Array(String))",
        "Enum16('low' = -1000, 'high' = 1000)",
        "AggregateFunction(uniq, UInt64)",
        "AggregateFunction(quantiles(0.5, 0.9), Float64)",
        "SimpleAggregateFunction(sum, UInt64)",
        "Nested(id UInt64, tags Array(String))",
        "Tuple(`a.b` Int32, `my col` String)",
        "JSON(max_dynamic_paths=1024, max_dynamic_types=32, a.b UInt32, SKIP a.c, SKIP REGEXP 'tmp.*')",
    ] {
        let node = parse_type(raw).unwrap_or_else(|| panic!("{} should parse", raw));
        assert_eq!(node.to_string(), raw);
    }
}
