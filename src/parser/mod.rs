//! Store-Type Grammar Parser
//!
//! Turns ClickHouse type strings such as
//! `LowCardinality(Nullable(Array(Decimal64(2))))` into a [`TypeNode`] tree.
//!
//! Parsing is total: malformed input yields `None`, never a panic, so callers
//! can fall back to a generic type. Lookup order is the simple-name table
//! first, then the composite rules in [`RULES`] order. The first rule whose
//! head matches and whose arguments all parse wins.

pub mod base;
pub mod split;


use nom::{
    Parser,
    bytes::complete::tag_no_case,
    character::complete::{char, multispace0, multispace1},
    combinator::opt,
    sequence::preceded,
};

use crate::ast::{EnumMember, JsonParams, NestedField, TupleElement, TypeNode};
use base::{
    complete, parse_identifier, parse_named_prefix, parse_path, parse_setting, parse_signed,
    parse_string_literal, parse_unsigned,
};
pub use split::{split_args, split_call};

/// Recursion limit; deeper input is rejected rather than risking the stack.
const MAX_DEPTH: usize = 128;

/// Canonical parameterless store types.
pub const SIMPLE_TYPES: &[&str] = &[
    "Int8",
    "Int16",
    "Int32",
    "Int64",
    "Int128",
    "Int256",
    "UInt8",
    "UInt16",
    "UInt32",
    "UInt64",
    "UInt128",
    "UInt256",
    "Float32",
    "Float64",
    "BFloat16",
    "String",
    "Bool",
    "UUID",
    "Date",
    "Date32",
    "Time",
    "IPv4",
    "IPv6",
    "Nothing",
    "Dynamic",
    "IntervalNanosecond",
    "IntervalMicrosecond",
    "IntervalMillisecond",
    "IntervalSecond",
    "IntervalMinute",
    "IntervalHour",
    "IntervalDay",
    "IntervalWeek",
    "IntervalMonth",
    "IntervalQuarter",
    "IntervalYear",
    "Point",
    "Ring",
    "LineString",
    "MultiLineString",
    "Polygon",
    "MultiPolygon",
];

/// SQL-compatibility aliases, matched on the upper-cased,
/// whitespace-normalized input.
const ALIASES: &[(&str, &str)] = &[
    ("BOOLEAN", "Bool"),
    ("BOOL", "Bool"),
    ("TINYINT", "Int8"),
    ("TINYINT SIGNED", "Int8"),
    ("INT1", "Int8"),
    ("INT1 SIGNED", "Int8"),
    ("BYTE", "Int8"),
    ("SMALLINT", "Int16"),
    ("SMALLINT SIGNED", "Int16"),
    ("INT2", "Int16"),
    ("INT", "Int32"),
    ("INT SIGNED", "Int32"),
    ("INTEGER", "Int32"),
    ("INTEGER SIGNED", "Int32"),
    ("MEDIUMINT", "Int32"),
    ("MEDIUMINT SIGNED", "Int32"),
    ("INT4", "Int32"),
    ("BIGINT", "Int64"),
    ("BIGINT SIGNED", "Int64"),
    ("SIGNED", "Int64"),
    ("TINYINT UNSIGNED", "UInt8"),
    ("INT1 UNSIGNED", "UInt8"),
    ("SMALLINT UNSIGNED", "UInt16"),
    ("INT UNSIGNED", "UInt32"),
    ("INTEGER UNSIGNED", "UInt32"),
    ("MEDIUMINT UNSIGNED", "UInt32"),
    ("UNSIGNED", "UInt64"),
    ("BIGINT UNSIGNED", "UInt64"),
    ("FLOAT", "Float32"),
    ("REAL", "Float32"),
    ("SINGLE", "Float32"),
    ("DOUBLE", "Float64"),
    ("DOUBLE PRECISION", "Float64"),
    ("TEXT", "String"),
    ("TINYTEXT", "String"),
    ("MEDIUMTEXT", "String"),
    ("LONGTEXT", "String"),
    ("CHAR", "String"),
    ("NCHAR", "String"),
    ("CHARACTER", "String"),
    ("CHAR VARYING", "String"),
    ("CHARACTER VARYING", "String"),
    ("NATIONAL CHAR", "String"),
    ("NATIONAL CHARACTER", "String"),
    ("VARCHAR", "String"),
    ("NVARCHAR", "String"),
    ("VARCHAR2", "String"),
    ("CLOB", "String"),
    ("BLOB", "String"),
    ("TINYBLOB", "String"),
    ("MEDIUMBLOB", "String"),
    ("LONGBLOB", "String"),
    ("BYTEA", "String"),
    ("BINARY", "String"),
    ("VARBINARY", "String"),
    ("BINARY LARGE OBJECT", "String"),
    ("INET4", "IPv4"),
    ("INET6", "IPv6"),
];

/// Resolve a parameterless name or alias to its canonical spelling.
pub fn canonical_simple_name(raw: &str) -> Option<&'static str> {
    let raw = raw.trim();
    if let Some(name) = SIMPLE_TYPES.iter().find(|name| **name == raw) {
        return Some(name);
    }
    let upper = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase();
    if let Some((_, canonical)) = ALIASES.iter().find(|(alias, _)| *alias == upper) {
        return Some(canonical);
    }
    SIMPLE_TYPES
        .iter()
        .copied()
        .find(|name| name.eq_ignore_ascii_case(raw))
}

/// Parse a store type string. Returns `None` for anything malformed.
pub fn parse_type(raw: &str) -> Option<TypeNode> {
    parse_at(raw, 0)
}

fn parse_at(raw: &str, depth: usize) -> Option<TypeNode> {
    if depth > MAX_DEPTH {
        return None;
    }
    let input = raw.trim();
    if input.is_empty() {
        return None;
    }
    if let Some(name) = canonical_simple_name(input) {
        return Some(TypeNode::primitive(name));
    }
    let (head, args) = split_call(input)?;
    let call = Call {
        head,
        args: args.as_deref(),
        depth,
    };
    RULES.iter().find_map(|rule| rule(&call))
}

/// A split `Head(arg, ..)` under consideration by the rules.
struct Call<'a> {
    head: &'a str,
    args: Option<&'a [&'a str]>,
    depth: usize,
}

impl Call<'_> {
    fn is(&self, name: &str) -> bool {
        self.head.eq_ignore_ascii_case(name)
    }

    fn single(&self) -> Option<&str> {
        match self.args {
            Some([one]) => Some(*one),
            _ => None,
        }
    }

    fn parse(&self, raw: &str) -> Option<TypeNode> {
        parse_at(raw, self.depth + 1)
    }

    /// `name Type` as used by named tuple elements and nested fields.
    fn parse_named(&self, raw: &str) -> Option<(String, TypeNode)> {
        let (rest, name) = parse_named_prefix(raw.trim()).ok()?;
        Some((name, self.parse(rest)?))
    }
}

type Rule = fn(&Call<'_>) -> Option<TypeNode>;

const RULES: &[Rule] = &[
    nullable,
    low_cardinality,
    fixed_string,
    decimal,
    datetime,
    array,
    map,
    tuple,
    enumeration,
    aggregate_function,
    simple_aggregate_function,
    nested,
    json,
    sized_string_alias,
];

fn nullable(call: &Call<'_>) -> Option<TypeNode> {
    if !call.is("Nullable") {
        return None;
    }
    // Composite inners are accepted as written; only double wrapping is rejected.
    let inner = call.parse(call.single()?)?;
    let allowed = !matches!(inner, TypeNode::Nullable(_) | TypeNode::LowCardinality(_));
    allowed.then(|| TypeNode::nullable(inner))
}

fn low_cardinality(call: &Call<'_>) -> Option<TypeNode> {
    if !call.is("LowCardinality") {
        return None;
    }
    // Any inner is accepted as written, including composites; only double
    // wrapping is rejected.
    let inner = call.parse(call.single()?)?;
    let allowed = !matches!(inner, TypeNode::LowCardinality(_));
    allowed.then(|| TypeNode::low_cardinality(inner))
}

fn fixed_string(call: &Call<'_>) -> Option<TypeNode> {
    if !call.is("FixedString") {
        return None;
    }
    let n = complete(call.single()?, parse_unsigned)?;
    let n = u32::try_from(n).ok().filter(|n| *n >= 1)?;
    Some(TypeNode::FixedString(n))
}

fn small_number(raw: &str) -> Option<u8> {
    complete(raw, parse_unsigned).and_then(|n| u8::try_from(n).ok())
}

fn quoted(raw: &str) -> Option<String> {
    complete(raw, parse_string_literal)
}

fn decimal(call: &Call<'_>) -> Option<TypeNode> {
    let head = call.head.to_ascii_lowercase();
    let (precision, scale) = match (head.as_str(), call.args) {
        ("decimal" | "numeric" | "dec", None) => (10, 0),
        ("decimal" | "numeric" | "dec", Some([p])) => (small_number(p)?, 0),
        ("decimal" | "numeric" | "dec", Some([p, s])) => (small_number(p)?, small_number(s)?),
        ("decimal32", Some([s])) => (9, small_number(s)?),
        ("decimal64", Some([s])) => (18, small_number(s)?),
        ("decimal128", Some([s])) => (38, small_number(s)?),
        ("decimal256", Some([s])) => (76, small_number(s)?),
        _ => return None,
    };
    ((1..=76).contains(&precision) && scale <= precision)
        .then_some(TypeNode::Decimal { precision, scale })
}

fn datetime(call: &Call<'_>) -> Option<TypeNode> {
    let head = call.head.to_ascii_lowercase();
    let (precision, timezone) = match (head.as_str(), call.args) {
        ("datetime" | "timestamp", None) => (None, None),
        ("datetime" | "timestamp", Some([tz])) => (None, Some(quoted(tz)?)),
        ("datetime64", None) => (Some(3), None),
        ("datetime64", Some([p])) => (Some(small_number(p)?), None),
        ("datetime64", Some([p, tz])) => (Some(small_number(p)?), Some(quoted(tz)?)),
        _ => return None,
    };
    if precision.is_some_and(|p| p > 9) {
        return None;
    }
    Some(TypeNode::DateTime {
        precision,
        timezone,
    })
}

fn array(call: &Call<'_>) -> Option<TypeNode> {
    if !call.is("Array") {
        return None;
    }
    Some(TypeNode::array(call.parse(call.single()?)?))
}

fn map(call: &Call<'_>) -> Option<TypeNode> {
    if !call.is("Map") {
        return None;
    }
    match call.args {
        Some([key, value]) => Some(TypeNode::map(call.parse(key)?, call.parse(value)?)),
        _ => None,
    }
}

fn tuple(call: &Call<'_>) -> Option<TypeNode> {
    if !call.is("Tuple") {
        return None;
    }
    let elements = call
        .args?
        .iter()
        .map(|raw| match call.parse(raw) {
            Some(node) => Some(TupleElement::unnamed(node)),
            None => {
                let (name, node) = call.parse_named(raw)?;
                Some(TupleElement::named(name, node))
            }
        })
        .collect::<Option<Vec<_>>>()?;
    Some(TypeNode::Tuple(elements))
}

fn enumeration(call: &Call<'_>) -> Option<TypeNode> {
    let requested = match call.head.to_ascii_lowercase().as_str() {
        "enum8" => Some(8),
        "enum16" => Some(16),
        "enum" => None,
        _ => return None,
    };
    let args = call.args.filter(|args| !args.is_empty())?;

    let mut members: Vec<EnumMember> = Vec::with_capacity(args.len());
    let mut next: i64 = 1;
    for raw in args {
        let (name, value) = complete(
            raw,
            (
                parse_string_literal,
                opt(preceded((multispace0, char('='), multispace0), parse_signed)),
            ),
        )?;
        let value = i16::try_from(value.unwrap_or(next)).ok()?;
        if members.iter().any(|m| m.name == name || m.value == value) {
            return None;
        }
        next = i64::from(value) + 1;
        members.push(EnumMember { name, value });
    }

    let fits_i8 = members.iter().all(|m| i8::try_from(m.value).is_ok());
    let bits = match requested {
        Some(8) if !fits_i8 => return None,
        Some(bits) => bits,
        None if fits_i8 => 8,
        None => 16,
    };
    Some(TypeNode::Enum { bits, members })
}

/// Aggregate function name, possibly parameterized: `quantiles(0.5, 0.9)`.
fn function_name(raw: &str) -> Option<String> {
    let (head, _) = split_call(raw)?;
    complete(head, parse_identifier)?;
    Some(raw.trim().to_string())
}

fn aggregate_function(call: &Call<'_>) -> Option<TypeNode> {
    if !call.is("AggregateFunction") {
        return None;
    }
    let (function, rest) = call.args?.split_first()?;
    let function = function_name(function)?;
    let args = rest
        .iter()
        .map(|raw| call.parse(raw))
        .collect::<Option<Vec<_>>>()?;
    Some(TypeNode::AggregateFunction { function, args })
}

fn simple_aggregate_function(call: &Call<'_>) -> Option<TypeNode> {
    if !call.is("SimpleAggregateFunction") {
        return None;
    }
    match call.args {
        Some([function, arg]) => Some(TypeNode::SimpleAggregateFunction {
            function: function_name(function)?,
            arg: Box::new(call.parse(arg)?),
        }),
        _ => None,
    }
}

fn nested(call: &Call<'_>) -> Option<TypeNode> {
    if !call.is("Nested") {
        return None;
    }
    let args = call.args.filter(|args| !args.is_empty())?;
    let fields = args
        .iter()
        .map(|raw| {
            let (name, node) = call.parse_named(raw)?;
            Some(NestedField::new(name, node))
        })
        .collect::<Option<Vec<_>>>()?;
    Some(TypeNode::Nested(fields))
}

fn json(call: &Call<'_>) -> Option<TypeNode> {
    if !call.is("JSON") {
        return None;
    }
    let mut params = JsonParams::default();
    for raw in call.args.unwrap_or_default() {
        json_param(call, raw, &mut params)?;
    }
    Some(TypeNode::Json(params))
}

fn json_param(call: &Call<'_>, raw: &str, params: &mut JsonParams) -> Option<()> {
    if let Some(n) = complete(raw, parse_setting("max_dynamic_paths")) {
        params.max_dynamic_paths = Some(u32::try_from(n).ok()?);
    } else if let Some(n) = complete(raw, parse_setting("max_dynamic_types")) {
        params.max_dynamic_types = Some(u32::try_from(n).ok()?);
    } else if let Some(pattern) = complete(
        raw,
        preceded(
            (
                tag_no_case("SKIP"),
                multispace1,
                tag_no_case("REGEXP"),
                multispace0,
            ),
            parse_string_literal,
        ),
    ) {
        params.skip_regexps.push(pattern);
    } else if let Some(path) = complete(raw, preceded((tag_no_case("SKIP"), multispace1), parse_path)) {
        params.skip_paths.push(path.to_string());
    } else {
        let (rest, (path, _)) = (parse_path, multispace1).parse(raw.trim()).ok()?;
        let node = call.parse(rest)?;
        params.typed_paths.push((path.to_string(), node));
    }
    Some(())
}

/// `VARCHAR(255)` and friends: the length is accepted and dropped.
fn sized_string_alias(call: &Call<'_>) -> Option<TypeNode> {
    let name = canonical_simple_name(call.head).filter(|name| *name == "String")?;
    complete(call.single()?, parse_unsigned)?;
    Some(TypeNode::primitive(name))
}
