//! Literal Formatting
//!
//! Renders native values as SQL literals for a resolved store type. Pure:
//! the same mapping and value always produce the same text.
//!
//! ```ignore
//! let mapping = resolver.resolve(&NativeType::nullable(NativeType::I32), None, None)?;
//! assert_eq!(format_literal(&mapping, &Value::Int(7))?, "7");
//! assert_eq!(format_literal(&mapping, &Value::Null)?, "NULL");
//! ```

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};
use std::cmp::Ordering;
use std::fmt::Write;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use uuid::Uuid;

use super::traits::quote_string;
use crate::ast::{EnumMember, NestedField, TupleElement, TypeNode, Value};
use crate::error::{ChError, ChResult};
use crate::mapping::{LiteralRule, Mapping};

/// 2^255 - 1
const INT256_MAX: &str =
    "57896044618658097711785492504343953926634992332820282019728792003956564819967";
/// 2^255
const INT256_MIN_ABS: &str =
    "57896044618658097711785492504343953926634992332820282019728792003956564819968";
/// 2^256 - 1
const UINT256_MAX: &str =
    "115792089237316195423570985008687907853269984665640564039457584007913129639935";

/// Format a value as a literal of the mapping's store type.
pub fn format_literal(mapping: &Mapping, value: &Value) -> ChResult<String> {
    render(&mapping.node, mapping.rule, value)
}

/// Format a value against a bare store node.
pub fn format_value(node: &TypeNode, value: &Value) -> ChResult<String> {
    render(node, LiteralRule::for_store(node), value)
}

fn render(node: &TypeNode, rule: LiteralRule, value: &Value) -> ChResult<String> {
    if let Value::Null = value {
        return if accepts_null(node) {
            Ok("NULL".to_string())
        } else {
            Err(mismatch(node, value))
        };
    }
    let node = strip(node);
    match rule {
        LiteralRule::Text => text(node, value),
        LiteralRule::Hex => match value {
            Value::Bytes(bytes) => Ok(unhex(bytes)),
            Value::String(s) => Ok(unhex(s.as_bytes())),
            _ => Err(mismatch(node, value)),
        },
        LiteralRule::Bool => match value {
            Value::Bool(b) => Ok(b.to_string()),
            Value::Int(0) | Value::UInt(0) => Ok("false".to_string()),
            Value::Int(1) | Value::UInt(1) => Ok("true".to_string()),
            _ => Err(mismatch(node, value)),
        },
        LiteralRule::Integer { signed, bits } => integer(node, signed, bits, value),
        LiteralRule::Float => float(node, value),
        LiteralRule::Decimal { .. } => decimal(node, value),
        LiteralRule::Uuid => uuid(node, value),
        LiteralRule::Date => date(node, value),
        LiteralRule::DateTime { precision } => {
            let ts = timestamp(value).ok_or_else(|| mismatch(node, value))?;
            Ok(format!("'{}'", format_timestamp(&ts, precision)))
        }
        LiteralRule::Ipv4 => ipv4(node, value),
        LiteralRule::Ipv6 => ipv6(node, value),
        LiteralRule::Enum => enumeration(node, value),
        LiteralRule::Array => array(node, value),
        LiteralRule::Map => map(node, value),
        LiteralRule::Tuple => tuple(node, value),
        LiteralRule::Nested => nested(node, value),
        LiteralRule::Json => Ok(match value {
            Value::String(s) => quote_string(s),
            other => quote_string(&other.to_json().to_string()),
        }),
        LiteralRule::Geo => match geo_shape(node) {
            Some(shape) => format_value(&shape, value),
            None => Err(mismatch(node, value)),
        },
        LiteralRule::Dynamic => dynamic(value),
        LiteralRule::Unsupported => Err(mismatch(node, value)),
    }
}

/// `Nullable` columns, and the types that hold NULL without that wrapper.
fn accepts_null(node: &TypeNode) -> bool {
    match node {
        TypeNode::Nullable(_) | TypeNode::Json(_) => true,
        TypeNode::LowCardinality(inner) => accepts_null(inner),
        TypeNode::SimpleAggregateFunction { arg, .. } => accepts_null(arg),
        TypeNode::Primitive(name) => name == "Dynamic" || name == "Nothing",
        _ => false,
    }
}

/// Peel wrappers that do not change the literal form.
fn strip(node: &TypeNode) -> &TypeNode {
    match node {
        TypeNode::Nullable(inner) | TypeNode::LowCardinality(inner) => strip(inner),
        TypeNode::SimpleAggregateFunction { arg, .. } => strip(arg),
        other => other,
    }
}

fn mismatch(node: &TypeNode, value: &Value) -> ChError {
    ChError::LiteralMismatch {
        store_type: node.to_string(),
        value: format!("{} value", value.kind()),
    }
}

fn out_of_range(node: &TypeNode, shown: impl ToString) -> ChError {
    ChError::ValueOutOfRange {
        store_type: node.to_string(),
        value: shown.to_string(),
    }
}

fn unhex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2 + 9);
    out.push_str("unhex('");
    for b in bytes {
        let _ = write!(out, "{:02X}", b);
    }
    out.push_str("')");
    out
}

fn text(node: &TypeNode, value: &Value) -> ChResult<String> {
    let limit = match node {
        TypeNode::FixedString(n) => Some(*n as usize),
        _ => None,
    };
    let too_long = |len: usize| limit.is_some_and(|n| len > n);

    match value {
        Value::String(s) if too_long(s.len()) => Err(out_of_range(node, quote_string(s))),
        Value::String(s) => Ok(quote_string(s)),
        Value::Bytes(b) if too_long(b.len()) => {
            Err(out_of_range(node, format!("{} bytes", b.len())))
        }
        Value::Bytes(b) => Ok(unhex(b)),
        Value::Enum { name, .. } => Ok(quote_string(name)),
        Value::Uuid(u) => Ok(quote_string(&u.to_string())),
        Value::Json(v) => Ok(quote_string(&v.to_string())),
        Value::Bool(b) => Ok(quote_string(&b.to_string())),
        Value::Int(n) => Ok(quote_string(&n.to_string())),
        Value::UInt(n) => Ok(quote_string(&n.to_string())),
        Value::Decimal(d) => Ok(quote_string(&d.to_string())),
        _ => Err(mismatch(node, value)),
    }
}

/// Canonical decimal digits of an integer string: optional `-`, no leading
/// zeros, no `-0`.
fn normalize_integer(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let (negative, digits) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let digits = digits.trim_start_matches('0');
    Some(match (negative, digits.is_empty()) {
        (_, true) => "0".to_string(),
        (true, false) => format!("-{}", digits),
        (false, false) => digits.to_string(),
    })
}

fn cmp_magnitude(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn integer_in_range(digits: &str, signed: bool, bits: u16) -> bool {
    let (negative, magnitude) = match digits.strip_prefix('-') {
        Some(m) => (true, m),
        None => (false, digits),
    };
    if negative && !signed {
        return false;
    }
    if bits <= 128 {
        let Ok(m) = magnitude.parse::<u128>() else {
            return false;
        };
        let limit = match (signed, negative) {
            (false, _) if bits == 128 => u128::MAX,
            (false, _) => (1u128 << bits) - 1,
            (true, false) => (1u128 << (bits - 1)) - 1,
            (true, true) => 1u128 << (bits - 1),
        };
        return m <= limit;
    }
    let limit = match (signed, negative) {
        (false, _) => UINT256_MAX,
        (true, false) => INT256_MAX,
        (true, true) => INT256_MIN_ABS,
    };
    cmp_magnitude(magnitude, limit) != Ordering::Greater
}

fn integer(node: &TypeNode, signed: bool, bits: u16, value: &Value) -> ChResult<String> {
    let digits = match value {
        Value::Int(n) => n.to_string(),
        Value::UInt(n) => n.to_string(),
        Value::Int128(n) => n.to_string(),
        Value::UInt128(n) => n.to_string(),
        Value::Enum { value, .. } => value.to_string(),
        Value::BigInt(s) => normalize_integer(s).ok_or_else(|| mismatch(node, value))?,
        Value::Decimal(d) if d.fract().is_zero() => d.trunc().normalize().to_string(),
        _ => return Err(mismatch(node, value)),
    };
    if integer_in_range(&digits, signed, bits) {
        Ok(digits)
    } else {
        Err(out_of_range(node, digits))
    }
}

fn format_float(f: f64) -> String {
    if f.is_nan() {
        "nan".to_string()
    } else if f == f64::INFINITY {
        "inf".to_string()
    } else if f == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        f.to_string()
    }
}

fn float(node: &TypeNode, value: &Value) -> ChResult<String> {
    match value {
        Value::Float(f) => Ok(format_float(*f)),
        Value::Int(n) => Ok(n.to_string()),
        Value::UInt(n) => Ok(n.to_string()),
        Value::Int128(n) => Ok(n.to_string()),
        Value::UInt128(n) => Ok(n.to_string()),
        Value::Decimal(d) => Ok(d.to_string()),
        _ => Err(mismatch(node, value)),
    }
}

/// Exact decimal text split into sign, integer digits and fraction digits.
/// Kept as digit strings so `Decimal128`/`Decimal256` values are not limited
/// by the 28-digit range of `rust_decimal`.
struct DecimalDigits {
    negative: bool,
    whole: String,
    fraction: String,
}

impl DecimalDigits {
    /// `[+-]digits[.digits]`, as written by `Display` for integers, floats
    /// and `rust_decimal`.
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (negative, body) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw.strip_prefix('+').unwrap_or(raw)),
        };
        let (whole, fraction) = body.split_once('.').unwrap_or((body, ""));
        let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !is_digits(whole) || !is_digits(fraction) {
            return None;
        }
        Some(Self {
            negative,
            whole: whole.trim_start_matches('0').to_string(),
            fraction: fraction.to_string(),
        })
    }

    fn from_value(node: &TypeNode, value: &Value) -> ChResult<Self> {
        let text = match value {
            Value::Decimal(d) => d.to_string(),
            Value::Int(n) => n.to_string(),
            Value::UInt(n) => n.to_string(),
            Value::Int128(n) => n.to_string(),
            Value::UInt128(n) => n.to_string(),
            Value::Float(f) if !f.is_finite() => return Err(out_of_range(node, format_float(*f))),
            // f64 `Display` is the shortest round-trip form and never uses an exponent.
            Value::Float(f) => f.to_string(),
            Value::String(s) | Value::BigInt(s) => s.clone(),
            _ => return Err(mismatch(node, value)),
        };
        Self::parse(&text).ok_or_else(|| mismatch(node, value))
    }

    /// Round half away from zero to exactly `scale` fraction digits.
    fn rescale(mut self, scale: usize) -> Self {
        if self.fraction.len() <= scale {
            let pad = scale - self.fraction.len();
            self.fraction.push_str(&"0".repeat(pad));
            return self;
        }
        let round_up = self.fraction.as_bytes()[scale] >= b'5';
        self.fraction.truncate(scale);
        if round_up {
            let mut digits: Vec<u8> = format!("{}{}", self.whole, self.fraction).into_bytes();
            let mut carry = true;
            for d in digits.iter_mut().rev() {
                if *d == b'9' {
                    *d = b'0';
                } else {
                    *d += 1;
                    carry = false;
                    break;
                }
            }
            if carry {
                digits.insert(0, b'1');
            }
            let split = digits.len() - scale;
            let text = String::from_utf8_lossy(&digits);
            self.fraction = text[split..].to_string();
            self.whole = text[..split].trim_start_matches('0').to_string();
        }
        self
    }

    fn is_zero(&self) -> bool {
        self.whole.is_empty() && self.fraction.bytes().all(|b| b == b'0')
    }

    fn render(&self) -> String {
        let sign = if self.negative && !self.is_zero() { "-" } else { "" };
        let whole = if self.whole.is_empty() { "0" } else { &self.whole };
        if self.fraction.is_empty() {
            format!("{}{}", sign, whole)
        } else {
            format!("{}{}.{}", sign, whole, self.fraction)
        }
    }
}

fn decimal(node: &TypeNode, value: &Value) -> ChResult<String> {
    let TypeNode::Decimal { precision, scale } = node else {
        return Err(mismatch(node, value));
    };
    let digits = DecimalDigits::from_value(node, value)?.rescale(usize::from(*scale));
    if digits.whole.len() > usize::from(precision.saturating_sub(*scale)) {
        return Err(out_of_range(node, digits.render()));
    }
    Ok(digits.render())
}

fn uuid(node: &TypeNode, value: &Value) -> ChResult<String> {
    let u = match value {
        Value::Uuid(u) => *u,
        Value::String(s) => Uuid::parse_str(s.trim()).map_err(|_| mismatch(node, value))?,
        _ => return Err(mismatch(node, value)),
    };
    Ok(quote_string(&u.to_string()))
}

fn date(node: &TypeNode, value: &Value) -> ChResult<String> {
    let d = match value {
        Value::Date(d) => *d,
        Value::DateTime(dt) => dt.date(),
        Value::DateTimeTz(dt) => dt.naive_utc().date(),
        Value::String(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map_err(|_| mismatch(node, value))?,
        _ => return Err(mismatch(node, value)),
    };
    let range = match node {
        TypeNode::Primitive(name) if name == "Date" => {
            NaiveDate::from_ymd_opt(1970, 1, 1).zip(NaiveDate::from_ymd_opt(2149, 6, 6))
        }
        _ => NaiveDate::from_ymd_opt(1900, 1, 1).zip(NaiveDate::from_ymd_opt(2299, 12, 31)),
    };
    if let Some((min, max)) = range {
        if d < min || d > max {
            return Err(out_of_range(node, d));
        }
    }
    Ok(format!("'{}'", d.format("%Y-%m-%d")))
}

/// Wall-clock UTC timestamp for a value; offset-aware values convert to UTC.
fn timestamp(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::DateTime(dt) => Some(*dt),
        Value::DateTimeTz(dt) => Some(dt.naive_utc()),
        Value::Date(d) => d.and_hms_opt(0, 0, 0),
        Value::Int(secs) => DateTime::from_timestamp(*secs, 0).map(|dt| dt.naive_utc()),
        Value::String(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.naive_utc())
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
                .ok()
        }
        _ => None,
    }
}

/// `YYYY-MM-DD hh:mm:ss` plus exactly `precision` fractional digits.
fn format_timestamp(ts: &NaiveDateTime, precision: u8) -> String {
    let mut out = ts.format("%Y-%m-%d %H:%M:%S").to_string();
    let precision = usize::from(precision.min(9));
    if precision > 0 {
        let nanos = format!("{:09}", ts.nanosecond() % 1_000_000_000);
        out.push('.');
        out.push_str(&nanos[..precision]);
    }
    out
}

fn ipv4(node: &TypeNode, value: &Value) -> ChResult<String> {
    let ip = match value {
        Value::Ipv4(ip) => *ip,
        Value::String(s) => Ipv4Addr::from_str(s.trim()).map_err(|_| mismatch(node, value))?,
        Value::UInt(n) => {
            Ipv4Addr::from(u32::try_from(*n).map_err(|_| out_of_range(node, n))?)
        }
        _ => return Err(mismatch(node, value)),
    };
    Ok(quote_string(&ip.to_string()))
}

fn ipv6(node: &TypeNode, value: &Value) -> ChResult<String> {
    let ip: Ipv6Addr = match value {
        Value::Ipv6(ip) => *ip,
        Value::Ipv4(ip) => ip.to_ipv6_mapped(),
        Value::String(s) => match IpAddr::from_str(s.trim()) {
            Ok(IpAddr::V6(ip)) => ip,
            Ok(IpAddr::V4(ip)) => ip.to_ipv6_mapped(),
            Err(_) => return Err(mismatch(node, value)),
        },
        _ => return Err(mismatch(node, value)),
    };
    Ok(quote_string(&ip.to_string()))
}

fn enumeration(node: &TypeNode, value: &Value) -> ChResult<String> {
    let TypeNode::Enum { members, .. } = node else {
        return Err(mismatch(node, value));
    };
    let by_name = |name: &str| members.iter().find(|m| m.name == name);
    let by_value = |v: i64| members.iter().find(|m| i64::from(m.value) == v);

    let member: Option<&EnumMember> = match value {
        Value::Enum { name, value } => by_name(name.as_str()).or_else(|| by_value(*value)),
        Value::String(name) => by_name(name.as_str()),
        Value::Int(v) => by_value(*v),
        Value::UInt(v) => i64::try_from(*v).ok().and_then(by_value),
        _ => return Err(mismatch(node, value)),
    };
    match member {
        Some(m) => Ok(m.value.to_string()),
        None => Err(out_of_range(node, describe(value))),
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Enum { name, value } => format!("{} ({})", quote_string(name), value),
        Value::String(s) => quote_string(s),
        other => other.to_json().to_string(),
    }
}

fn join(items: impl IntoIterator<Item = ChResult<String>>) -> ChResult<String> {
    Ok(items.into_iter().collect::<ChResult<Vec<_>>>()?.join(", "))
}

fn array(node: &TypeNode, value: &Value) -> ChResult<String> {
    let TypeNode::Array(inner) = node else {
        return Err(mismatch(node, value));
    };
    let body = match value {
        Value::Array(items) | Value::Tuple(items) => {
            join(items.iter().map(|item| format_value(inner, item)))?
        }
        Value::Bytes(bytes) if strip(inner) == &TypeNode::primitive("UInt8") => bytes
            .iter()
            .map(u8::to_string)
            .collect::<Vec<_>>()
            .join(", "),
        _ => return Err(mismatch(node, value)),
    };
    Ok(format!("[{}]", body))
}

fn map(node: &TypeNode, value: &Value) -> ChResult<String> {
    let TypeNode::Map(key, val) = node else {
        return Err(mismatch(node, value));
    };
    let pairs = match value {
        Value::Map(pairs) => join(pairs.iter().map(|(k, v)| -> ChResult<String> {
            Ok(format!("{}, {}", format_value(key, k)?, format_value(val, v)?))
        }))?,
        Value::Record(fields) => join(fields.iter().map(|(k, v)| -> ChResult<String> {
            let k = Value::String(k.clone());
            Ok(format!("{}, {}", format_value(key, &k)?, format_value(val, v)?))
        }))?,
        _ => return Err(mismatch(node, value)),
    };
    Ok(format!("map({})", pairs))
}

/// Values for each tuple element: positional for tuples and arrays, by
/// name (or position for unnamed elements) for records.
fn tuple_values<'v>(
    node: &TypeNode,
    elements: &[TupleElement],
    value: &'v Value,
) -> ChResult<Vec<&'v Value>> {
    match value {
        Value::Tuple(items) | Value::Array(items) if items.len() == elements.len() => {
            Ok(items.iter().collect())
        }
        Value::Record(fields) if fields.len() == elements.len() => elements
            .iter()
            .enumerate()
            .map(|(i, el)| {
                let field = match &el.name {
                    Some(name) => fields.iter().find(|(n, _)| n == name),
                    None => fields.get(i),
                };
                field.map(|(_, v)| v).ok_or_else(|| mismatch(node, value))
            })
            .collect(),
        _ => Err(mismatch(node, value)),
    }
}

fn tuple_literal(items: Vec<String>) -> String {
    match items.len() {
        0 => "tuple()".to_string(),
        1 => format!("tuple({})", items[0]),
        _ => format!("({})", items.join(", ")),
    }
}

fn tuple(node: &TypeNode, value: &Value) -> ChResult<String> {
    let TypeNode::Tuple(elements) = node else {
        return Err(mismatch(node, value));
    };
    let values = tuple_values(node, elements, value)?;
    let items = elements
        .iter()
        .zip(values)
        .map(|(el, v)| format_value(&el.node, v))
        .collect::<ChResult<Vec<_>>>()?;
    Ok(tuple_literal(items))
}

/// Nested columns are written as one array per field.
fn nested(node: &TypeNode, value: &Value) -> ChResult<String> {
    let TypeNode::Nested(fields) = node else {
        return Err(mismatch(node, value));
    };
    let columns: Vec<Vec<&Value>> = match value {
        Value::Array(rows) => {
            let mut columns = vec![Vec::with_capacity(rows.len()); fields.len()];
            for row in rows {
                for (i, field) in fields.iter().enumerate() {
                    let cell = nested_cell(field, i, row).ok_or_else(|| mismatch(node, row))?;
                    columns[i].push(cell);
                }
            }
            columns
        }
        // Already columnar: one array per field name.
        Value::Record(named) => fields
            .iter()
            .map(|field| match named.iter().find(|(n, _)| *n == field.name) {
                Some((_, Value::Array(items))) => Ok(items.iter().collect()),
                _ => Err(mismatch(node, value)),
            })
            .collect::<ChResult<_>>()?,
        _ => return Err(mismatch(node, value)),
    };

    join(fields.iter().zip(columns).map(|(field, cells)| -> ChResult<String> {
        let body = join(cells.into_iter().map(|cell| format_value(&field.node, cell)))?;
        Ok(format!("[{}]", body))
    }))
}

fn nested_cell<'v>(field: &NestedField, index: usize, row: &'v Value) -> Option<&'v Value> {
    match row {
        Value::Record(cells) => cells.iter().find(|(n, _)| *n == field.name).map(|(_, v)| v),
        Value::Tuple(cells) => cells.get(index),
        _ => None,
    }
}

/// Tuple/array shape behind a geo type name.
fn geo_shape(node: &TypeNode) -> Option<TypeNode> {
    let TypeNode::Primitive(name) = node else {
        return None;
    };
    let point = TypeNode::Tuple(vec![
        TupleElement::unnamed(TypeNode::primitive("Float64")),
        TupleElement::unnamed(TypeNode::primitive("Float64")),
    ]);
    let ring = TypeNode::array(point.clone());
    let polygon = TypeNode::array(ring.clone());
    Some(match name.as_str() {
        "Point" => point,
        "Ring" | "LineString" => ring,
        "MultiLineString" | "Polygon" => polygon,
        "MultiPolygon" => TypeNode::array(polygon),
        _ => return None,
    })
}

/// `Dynamic` columns take whatever the value is.
fn dynamic(value: &Value) -> ChResult<String> {
    Ok(match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(n) => n.to_string(),
        Value::UInt(n) => n.to_string(),
        Value::Int128(n) => n.to_string(),
        Value::UInt128(n) => n.to_string(),
        Value::BigInt(s) => normalize_integer(s).ok_or_else(|| ChError::LiteralMismatch {
            store_type: "Dynamic".to_string(),
            value: quote_string(s),
        })?,
        Value::Float(f) => format_float(*f),
        Value::Decimal(d) => d.to_string(),
        Value::String(s) => quote_string(s),
        Value::Bytes(b) => unhex(b),
        Value::Uuid(u) => quote_string(&u.to_string()),
        Value::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
        Value::DateTime(ts) => dynamic_timestamp(ts),
        Value::DateTimeTz(dt) => dynamic_timestamp(&dt.naive_utc()),
        Value::Ipv4(ip) => quote_string(&ip.to_string()),
        Value::Ipv6(ip) => quote_string(&ip.to_string()),
        Value::Array(items) => format!("[{}]", join(items.iter().map(dynamic))?),
        Value::Map(pairs) => format!(
            "map({})",
            join(
                pairs
                    .iter()
                    .map(|(k, v)| -> ChResult<String> {
                        Ok(format!("{}, {}", dynamic(k)?, dynamic(v)?))
                    })
            )?
        ),
        Value::Tuple(items) => {
            tuple_literal(items.iter().map(dynamic).collect::<ChResult<Vec<_>>>()?)
        }
        Value::Record(fields) => tuple_literal(
            fields
                .iter()
                .map(|(_, v)| dynamic(v))
                .collect::<ChResult<Vec<_>>>()?,
        ),
        Value::Enum { name, .. } => quote_string(name),
        Value::Json(v) => quote_string(&v.to_string()),
    })
}

fn dynamic_timestamp(ts: &NaiveDateTime) -> String {
    let precision = if ts.nanosecond() == 0 { 0 } else { 9 };
    format!("'{}'", format_timestamp(ts, precision))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NativeType;
    use crate::parser::parse_type;
    use rust_decimal::Decimal;

    fn fmt(store_type: &str, value: Value) -> ChResult<String> {
        format_value(&parse_type(store_type).unwrap(), &value)
    }

    #[test]
    fn test_string_escaping() {
        let cases = [
            ("plain", "'plain'"),
            ("it's", "'it\\'s'"),
            ("back\\slash", "'back\\\\slash'"),
            ("line\nbreak", "'line\\nbreak'"),
            ("cr\rtab\t", "'cr\\rtab\\t'"),
            ("nul\0", "'nul\\0'"),
        ];
        for (input, expected) in cases {
            assert_eq!(fmt("String", Value::from(input)).unwrap(), expected);
        }
    }

    #[test]
    fn test_fixed_string_length() {
        assert_eq!(fmt("FixedString(3)", Value::from("abc")).unwrap(), "'abc'");
        assert!(matches!(
            fmt("FixedString(2)", Value::from("abc")),
            Err(ChError::ValueOutOfRange { .. })
        ));
    }

    #[test]
    fn test_bytes_as_unhex() {
        let mapping = Mapping::new(TypeNode::primitive("String"), NativeType::Bytes);
        assert_eq!(
            format_literal(&mapping, &Value::Bytes(vec![0xde, 0xad, 0x01])).unwrap(),
            "unhex('DEAD01')"
        );
        assert_eq!(
            format_literal(&mapping, &Value::from("AB")).unwrap(),
            "unhex('4142')"
        );
    }

    #[test]
    fn test_integer_ranges() {
        assert_eq!(fmt("Int8", Value::Int(-128)).unwrap(), "-128");
        assert!(fmt("Int8", Value::Int(128)).is_err());
        assert!(fmt("UInt8", Value::Int(-1)).is_err());
        assert_eq!(fmt("UInt64", Value::UInt(u64::MAX)).unwrap(), u64::MAX.to_string());
        assert_eq!(
            fmt("UInt128", Value::UInt128(u128::MAX)).unwrap(),
            u128::MAX.to_string()
        );
        assert_eq!(
            fmt("Int256", Value::BigInt(format!("-{}", INT256_MIN_ABS))).unwrap(),
            format!("-{}", INT256_MIN_ABS)
        );
        assert!(matches!(
            fmt("Int256", Value::BigInt(INT256_MIN_ABS.to_string())),
            Err(ChError::ValueOutOfRange { .. })
        ));
        assert_eq!(fmt("Int256", Value::BigInt("+007".into())).unwrap(), "7");
        assert!(matches!(
            fmt("Int32", Value::BigInt("12a".into())),
            Err(ChError::LiteralMismatch { .. })
        ));
    }

    #[test]
    fn test_floats() {
        assert_eq!(fmt("Float64", Value::Float(1.5)).unwrap(), "1.5");
        assert_eq!(fmt("Float64", Value::Float(f64::NAN)).unwrap(), "nan");
        assert_eq!(fmt("Float32", Value::Float(f64::INFINITY)).unwrap(), "inf");
        assert_eq!(fmt("Float32", Value::Float(f64::NEG_INFINITY)).unwrap(), "-inf");
        assert_eq!(fmt("Float64", Value::Int(3)).unwrap(), "3");
    }

    #[test]
    fn test_decimals() {
        assert_eq!(
            fmt("Decimal(10, 2)", Value::Decimal(Decimal::new(12345, 3))).unwrap(),
            "12.35"
        );
        assert_eq!(fmt("Decimal(10, 2)", Value::Int(7)).unwrap(), "7.00");
        assert!(matches!(
            fmt("Decimal(4, 2)", Value::Int(100)),
            Err(ChError::ValueOutOfRange { .. })
        ));
        assert!(matches!(
            fmt("Decimal(10, 2)", Value::Float(f64::NAN)),
            Err(ChError::ValueOutOfRange { .. })
        ));
        assert_eq!(fmt("Decimal(10, 2)", Value::Float(-0.004)).unwrap(), "0.00");
        assert_eq!(fmt("Decimal(10, 2)", Value::Float(9.995)).unwrap(), "10.00");
        assert_eq!(fmt("Decimal(3, 0)", Value::from("0.5")).unwrap(), "1");
        assert!(matches!(
            fmt("Decimal(10, 2)", Value::from("1e5")),
            Err(ChError::LiteralMismatch { .. })
        ));
    }

    #[test]
    fn test_wide_decimals_keep_every_digit() {
        let big = "123456789012345678901234567890";
        assert_eq!(fmt("Decimal(38, 0)", Value::BigInt(big.into())).unwrap(), big);
        assert_eq!(
            fmt("Decimal(38, 30)", Value::Float(1.5)).unwrap(),
            format!("1.5{}", "0".repeat(29))
        );
        assert_eq!(
            fmt("Decimal256(40)", Value::from(format!("-0.{}15", "0".repeat(39)))).unwrap(),
            format!("-0.{}2", "0".repeat(39))
        );
        assert_eq!(
            fmt("Decimal(76, 0)", Value::BigInt("9".repeat(76))).unwrap(),
            "9".repeat(76)
        );
        assert!(matches!(
            fmt("Decimal(38, 0)", Value::BigInt("1".repeat(39))),
            Err(ChError::ValueOutOfRange { .. })
        ));
        assert!(matches!(
            fmt("Decimal(38, 2)", Value::BigInt("9".repeat(36) + ".999")),
            Err(ChError::ValueOutOfRange { .. })
        ));
    }

    #[test]
    fn test_datetime_precision_and_utc() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_nano_opt(12, 30, 5, 123_456_789)
            .unwrap();
        assert_eq!(
            fmt("DateTime", Value::DateTime(ts)).unwrap(),
            "'2024-03-01 12:30:05'"
        );
        assert_eq!(
            fmt("DateTime64(3)", Value::DateTime(ts)).unwrap(),
            "'2024-03-01 12:30:05.123'"
        );
        assert_eq!(
            fmt("DateTime64(9, 'UTC')", Value::DateTime(ts)).unwrap(),
            "'2024-03-01 12:30:05.123456789'"
        );

        let offset = DateTime::parse_from_rfc3339("2024-03-01T14:30:05.5+02:00").unwrap();
        assert_eq!(
            fmt("DateTime64(2)", Value::DateTimeTz(offset)).unwrap(),
            "'2024-03-01 12:30:05.50'"
        );
    }

    #[test]
    fn test_dates() {
        let d = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(fmt("Date32", Value::Date(d)).unwrap(), "'2024-02-29'");
        assert_eq!(fmt("Date", Value::from("2024-02-29")).unwrap(), "'2024-02-29'");
        let old = NaiveDate::from_ymd_opt(1950, 1, 1).unwrap();
        assert!(fmt("Date", Value::Date(old)).is_err());
        assert!(fmt("Date32", Value::Date(old)).is_ok());
    }

    #[test]
    fn test_uuid_and_ip() {
        let u = Uuid::nil();
        assert_eq!(
            fmt("UUID", Value::Uuid(u)).unwrap(),
            "'00000000-0000-0000-0000-000000000000'"
        );
        assert!(fmt("UUID", Value::from("nope")).is_err());
        assert_eq!(
            fmt("IPv4", Value::Ipv4(Ipv4Addr::new(10, 0, 0, 1))).unwrap(),
            "'10.0.0.1'"
        );
        assert_eq!(
            fmt("IPv6", Value::Ipv4(Ipv4Addr::new(10, 0, 0, 1))).unwrap(),
            "'::ffff:10.0.0.1'"
        );
    }

    #[test]
    fn test_enum_lookup() {
        let store = "Enum8('active' = 1, 'deleted' = 2)";
        assert_eq!(fmt(store, Value::from("deleted")).unwrap(), "2");
        assert_eq!(
            fmt(
                store,
                Value::Enum {
                    name: "active".into(),
                    value: 9
                }
            )
            .unwrap(),
            "1"
        );
        assert_eq!(fmt(store, Value::Int(2)).unwrap(), "2");
        assert!(matches!(
            fmt(store, Value::from("archived")),
            Err(ChError::ValueOutOfRange { .. })
        ));
    }

    #[test]
    fn test_arrays_maps_tuples() {
        assert_eq!(
            fmt("Array(Nullable(Int32))", Value::from(vec![Some(1), None])).unwrap(),
            "[1, NULL]"
        );
        assert_eq!(fmt("Array(String)", Value::Array(vec![])).unwrap(), "[]");
        assert_eq!(
            fmt(
                "Map(String, UInt8)",
                Value::Map(vec![(Value::from("a"), Value::UInt(1))])
            )
            .unwrap(),
            "map('a', 1)"
        );
        assert_eq!(
            fmt("Tuple(Int32, String)", Value::Tuple(vec![Value::Int(1), Value::from("x")]))
                .unwrap(),
            "(1, 'x')"
        );
        assert_eq!(
            fmt("Tuple(Int32)", Value::Tuple(vec![Value::Int(1)])).unwrap(),
            "tuple(1)"
        );
        assert_eq!(
            fmt(
                "Tuple(name String, id UInt64)",
                Value::Record(vec![
                    ("id".into(), Value::UInt(5)),
                    ("name".into(), Value::from("n")),
                ])
            )
            .unwrap(),
            "('n', 5)"
        );
        assert!(fmt("Tuple(Int32, Int32)", Value::Tuple(vec![Value::Int(1)])).is_err());
    }

    #[test]
    fn test_nested_as_parallel_arrays() {
        let rows = Value::Array(vec![
            Value::Record(vec![("sku".into(), Value::from("a")), ("qty".into(), Value::UInt(1))]),
            Value::Record(vec![("sku".into(), Value::from("b")), ("qty".into(), Value::UInt(2))]),
        ]);
        assert_eq!(
            fmt("Nested(sku String, qty UInt32)", rows).unwrap(),
            "['a', 'b'], [1, 2]"
        );
    }

    #[test]
    fn test_json_geo_and_null() {
        let json = Value::Json(serde_json::json!({"k": "it's"}));
        assert_eq!(fmt("JSON", json).unwrap(), r#"'{"k":"it\'s"}'"#);
        assert_eq!(
            fmt("Point", Value::Tuple(vec![Value::Float(1.0), Value::Float(2.5)])).unwrap(),
            "(1, 2.5)"
        );
        assert_eq!(fmt("Nullable(UUID)", Value::Null).unwrap(), "NULL");
        assert_eq!(
            fmt("LowCardinality(Nullable(String))", Value::Null).unwrap(),
            "NULL"
        );
        assert_eq!(fmt("Dynamic", Value::Null).unwrap(), "NULL");
        assert_eq!(fmt("JSON", Value::Null).unwrap(), "NULL");
    }

    #[test]
    fn test_null_requires_nullable_type() {
        for store_type in ["Int32", "String", "Array(Int32)", "LowCardinality(String)"] {
            assert!(
                matches!(fmt(store_type, Value::Null), Err(ChError::LiteralMismatch { .. })),
                "{}",
                store_type
            );
        }
        assert!(fmt("Array(Int32)", Value::from(vec![Some(1), None])).is_err());
    }

    #[test]
    fn test_mismatch_and_unsupported() {
        assert!(matches!(
            fmt("Int32", Value::from("1")),
            Err(ChError::LiteralMismatch { .. })
        ));
        assert!(matches!(
            fmt("AggregateFunction(uniq, UInt64)", Value::Int(1)),
            Err(ChError::LiteralMismatch { .. })
        ));
        assert_eq!(
            fmt("SimpleAggregateFunction(sum, UInt64)", Value::UInt(3)).unwrap(),
            "3"
        );
    }
}
