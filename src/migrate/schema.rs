//! Table Schema
//!
//! Declarative table, column, index and view definitions consumed by the
//! DDL translator. Column types are given either as a native type (resolved
//! through the registry) or as an explicit store type string.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use super::engine::EngineSpec;
use crate::ast::NativeType;
use crate::error::{ChError, ChResult, DdlFeature};
use crate::parser::{base, split_args, split_call};

/// How a column obtains its value when not inserted explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnDefault {
    Default(String),
    Materialized(String),
    Alias(String),
    Ephemeral(Option<String>),
}

impl fmt::Display for ColumnDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default(expr) => write!(f, "DEFAULT {}", expr),
            Self::Materialized(expr) => write!(f, "MATERIALIZED {}", expr),
            Self::Alias(expr) => write!(f, "ALIAS {}", expr),
            Self::Ephemeral(Some(expr)) => write!(f, "EPHEMERAL {}", expr),
            Self::Ephemeral(None) => write!(f, "EPHEMERAL"),
        }
    }
}

/// Column definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    /// Native type, resolved through the registry when `store_type` is unset.
    #[serde(default = "opaque_native")]
    pub native: NativeType,
    /// Explicit store type, e.g. `LowCardinality(String)`.
    #[serde(default, rename = "type")]
    pub store_type: Option<String>,
    #[serde(default)]
    pub default: Option<ColumnDefault>,
    #[serde(default)]
    pub codec: Option<Codec>,
    #[serde(default)]
    pub ttl: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

fn opaque_native() -> NativeType {
    NativeType::Opaque("unspecified".to_string())
}

impl Column {
    pub fn new(name: impl Into<String>, native: NativeType) -> Self {
        Self {
            name: name.into(),
            native,
            store_type: None,
            default: None,
            codec: None,
            ttl: None,
            comment: None,
        }
    }

    /// Column with an explicit store type.
    pub fn typed(name: impl Into<String>, store_type: impl Into<String>) -> Self {
        let mut col = Self::new(name, opaque_native());
        col.store_type = Some(store_type.into());
        col
    }

    pub fn store_type(mut self, store_type: impl Into<String>) -> Self {
        self.store_type = Some(store_type.into());
        self
    }

    pub fn default(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(ColumnDefault::Default(expr.into()));
        self
    }

    pub fn materialized(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(ColumnDefault::Materialized(expr.into()));
        self
    }

    pub fn alias(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(ColumnDefault::Alias(expr.into()));
        self
    }

    pub fn ephemeral(mut self, expr: Option<&str>) -> Self {
        self.default = Some(ColumnDefault::Ephemeral(expr.map(str::to_string)));
        self
    }

    pub fn codec(mut self, codec: Codec) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn ttl(mut self, expr: impl Into<String>) -> Self {
        self.ttl = Some(expr.into());
        self
    }

    pub fn comment(mut self, text: impl Into<String>) -> Self {
        self.comment = Some(text.into());
        self
    }
}

/// A single compression codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecKind {
    None,
    Lz4,
    Lz4hc(Option<u8>),
    Zstd(Option<u8>),
    Delta(Option<u8>),
    DoubleDelta(Option<u8>),
    Gorilla(Option<u8>),
    T64,
    Fpc(Option<u8>),
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, arg) = match self {
            Self::None => ("NONE", None),
            Self::Lz4 => ("LZ4", None),
            Self::Lz4hc(level) => ("LZ4HC", *level),
            Self::Zstd(level) => ("ZSTD", *level),
            Self::Delta(width) => ("Delta", *width),
            Self::DoubleDelta(width) => ("DoubleDelta", *width),
            Self::Gorilla(width) => ("Gorilla", *width),
            Self::T64 => ("T64", None),
            Self::Fpc(level) => ("FPC", *level),
        };
        match arg {
            Some(n) => write!(f, "{}({})", name, n),
            None => write!(f, "{}", name),
        }
    }
}

/// Codec chain, rendered inside `CODEC(...)`.
///
/// Parsing validates levels and widths eagerly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Codec(pub Vec<CodecKind>);

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join(", "))
    }
}

fn codec_arg(name: &str, arg: Option<&str>, allowed: impl Fn(u8) -> bool) -> ChResult<Option<u8>> {
    let Some(raw) = arg else {
        return Ok(None);
    };
    let n = base::complete(raw, base::parse_unsigned)
        .and_then(|n| u8::try_from(n).ok())
        .filter(|n| allowed(*n))
        .ok_or_else(|| ChError::invalid(format!("invalid {} codec parameter '{}'", name, raw)))?;
    Ok(Some(n))
}

fn is_width(n: u8) -> bool {
    matches!(n, 1 | 2 | 4 | 8)
}

impl FromStr for CodecKind {
    type Err = ChError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ChError::invalid(format!("malformed codec '{}'", s.trim()));
        let (head, args) = split_call(s).ok_or_else(malformed)?;
        let arg = match args.as_deref() {
            None => None,
            Some([one]) => Some(*one),
            Some(_) => return Err(malformed()),
        };
        let kind = match head.to_ascii_uppercase().as_str() {
            "NONE" if arg.is_none() => Self::None,
            "LZ4" if arg.is_none() => Self::Lz4,
            "T64" if arg.is_none() => Self::T64,
            "LZ4HC" => Self::Lz4hc(codec_arg("LZ4HC", arg, |n| (1..=12).contains(&n))?),
            "ZSTD" => Self::Zstd(codec_arg("ZSTD", arg, |n| (1..=22).contains(&n))?),
            "DELTA" => Self::Delta(codec_arg("Delta", arg, is_width)?),
            "DOUBLEDELTA" => Self::DoubleDelta(codec_arg("DoubleDelta", arg, is_width)?),
            "GORILLA" => Self::Gorilla(codec_arg("Gorilla", arg, is_width)?),
            "FPC" => Self::Fpc(codec_arg("FPC", arg, |n| (1..=28).contains(&n))?),
            _ => return Err(malformed()),
        };
        Ok(kind)
    }
}

impl FromStr for Codec {
    type Err = ChError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = split_args(s)
            .filter(|parts| !parts.is_empty())
            .ok_or_else(|| ChError::invalid(format!("malformed codec '{}'", s.trim())))?;
        let kinds = parts
            .into_iter()
            .map(str::parse)
            .collect::<ChResult<Vec<CodecKind>>>()?;
        if kinds.len() > 1 && kinds.contains(&CodecKind::None) {
            return Err(ChError::invalid("codec NONE cannot be combined"));
        }
        Ok(Self(kinds))
    }
}

impl TryFrom<String> for Codec {
    type Error = ChError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Codec> for String {
    fn from(codec: Codec) -> Self {
        codec.to_string()
    }
}

/// Data-skipping index type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum IndexKind {
    MinMax,
    Set(u32),
    BloomFilter(Option<f64>),
    NgramBf {
        n: u32,
        size: u32,
        hashes: u32,
        seed: u32,
    },
    TokenBf {
        size: u32,
        hashes: u32,
        seed: u32,
    },
    /// Any other index type, rendered verbatim.
    Custom(String),
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MinMax => write!(f, "minmax"),
            Self::Set(max_rows) => write!(f, "set({})", max_rows),
            Self::BloomFilter(Some(rate)) => write!(f, "bloom_filter({})", rate),
            Self::BloomFilter(None) => write!(f, "bloom_filter"),
            Self::NgramBf {
                n,
                size,
                hashes,
                seed,
            } => write!(f, "ngrambf_v1({}, {}, {}, {})", n, size, hashes, seed),
            Self::TokenBf { size, hashes, seed } => {
                write!(f, "tokenbf_v1({}, {}, {})", size, hashes, seed)
            }
            Self::Custom(raw) => write!(f, "{}", raw),
        }
    }
}

impl FromStr for IndexKind {
    type Err = ChError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let malformed = || ChError::invalid(format!("malformed index type '{}'", raw));
        let (head, args) = split_call(raw).ok_or_else(malformed)?;
        let numbers = |args: &[&str]| -> ChResult<Vec<u32>> {
            args.iter()
                .map(|a| {
                    base::complete(a, base::parse_unsigned)
                        .and_then(|n| u32::try_from(n).ok())
                        .ok_or_else(malformed)
                })
                .collect()
        };
        let kind = match (head.to_ascii_lowercase().as_str(), args.as_deref()) {
            ("minmax", None) => Self::MinMax,
            ("set", Some(args)) => match numbers(args)?.as_slice() {
                [max_rows] => Self::Set(*max_rows),
                _ => return Err(malformed()),
            },
            ("bloom_filter", None) => Self::BloomFilter(None),
            ("bloom_filter", Some([rate])) => {
                let rate: f64 = rate.parse().map_err(|_| malformed())?;
                if !(rate > 0.0 && rate < 1.0) {
                    return Err(ChError::invalid(format!(
                        "bloom_filter false positive rate must be in (0, 1), got {}",
                        rate
                    )));
                }
                Self::BloomFilter(Some(rate))
            }
            ("ngrambf_v1", Some(args)) => match numbers(args)?.as_slice() {
                [n, size, hashes, seed] => Self::NgramBf {
                    n: *n,
                    size: *size,
                    hashes: *hashes,
                    seed: *seed,
                },
                _ => return Err(malformed()),
            },
            ("tokenbf_v1", Some(args)) => match numbers(args)?.as_slice() {
                [size, hashes, seed] => Self::TokenBf {
                    size: *size,
                    hashes: *hashes,
                    seed: *seed,
                },
                _ => return Err(malformed()),
            },
            _ if !raw.is_empty() => Self::Custom(raw.to_string()),
            _ => return Err(malformed()),
        };
        Ok(kind)
    }
}

impl TryFrom<String> for IndexKind {
    type Error = ChError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<IndexKind> for String {
    fn from(kind: IndexKind) -> Self {
        kind.to_string()
    }
}

/// An index definition. `unique` indexes are rejected at translation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub expression: String,
    #[serde(default = "default_index_kind", rename = "type")]
    pub kind: IndexKind,
    #[serde(default = "default_granularity")]
    pub granularity: u32,
    #[serde(default)]
    pub unique: bool,
}

fn default_index_kind() -> IndexKind {
    IndexKind::MinMax
}

fn default_granularity() -> u32 {
    1
}

impl Index {
    pub fn new(name: impl Into<String>, expression: impl Into<String>, kind: IndexKind) -> Self {
        Self {
            name: name.into(),
            expression: expression.into(),
            kind,
            granularity: default_granularity(),
            unique: false,
        }
    }

    pub fn granularity(mut self, granularity: u32) -> Self {
        self.granularity = granularity;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// A named projection: `PROJECTION name (SELECT ...)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projection {
    pub name: String,
    pub query: String,
}

impl Projection {
    pub fn new(name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            query: query.into(),
        }
    }
}

/// `CONSTRAINT name CHECK expr`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckConstraint {
    pub name: String,
    pub expression: String,
}

/// A table definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub indexes: Vec<Index>,
    #[serde(default)]
    pub projections: Vec<Projection>,
    #[serde(default)]
    pub constraints: Vec<CheckConstraint>,
    /// `None` leaves the choice to the translator's engine defaults.
    #[serde(default)]
    pub engine: Option<EngineSpec>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub if_not_exists: bool,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn column(mut self, col: Column) -> Self {
        self.columns.push(col);
        self
    }

    pub fn index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn projection(mut self, projection: Projection) -> Self {
        self.projections.push(projection);
        self
    }

    pub fn check(mut self, name: impl Into<String>, expression: impl Into<String>) -> Self {
        self.constraints.push(CheckConstraint {
            name: name.into(),
            expression: expression.into(),
        });
        self
    }

    pub fn engine(mut self, engine: EngineSpec) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn comment(mut self, text: impl Into<String>) -> Self {
        self.comment = Some(text.into());
        self
    }

    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }

    /// `database.name` or `name`.
    pub fn qualified_name(&self) -> String {
        qualify(self.database.as_deref(), &self.name)
    }

    /// Reject duplicate names and unsupported index kinds before any DDL
    /// is produced.
    pub fn validate(&self) -> ChResult<()> {
        if self.columns.is_empty() {
            return Err(ChError::invalid(format!(
                "table '{}' has no columns",
                self.name
            )));
        }
        ensure_unique(&self.name, "column", self.columns.iter().map(|c| &c.name))?;
        ensure_unique(&self.name, "index", self.indexes.iter().map(|i| &i.name))?;
        ensure_unique(
            &self.name,
            "projection",
            self.projections.iter().map(|p| &p.name),
        )?;
        ensure_unique(
            &self.name,
            "constraint",
            self.constraints.iter().map(|c| &c.name),
        )?;
        if let Some(index) = self.indexes.iter().find(|i| i.unique) {
            return Err(unique_index_error(&index.name, &self.name));
        }
        match &self.engine {
            Some(engine) => engine.validate(),
            None => Ok(()),
        }
    }
}

/// Unsupported-feature error for a unique index.
pub(crate) fn unique_index_error(index: &str, table: &str) -> ChError {
    ChError::unsupported_with_hint(
        DdlFeature::UniqueIndex,
        format!("index '{}' on table '{}'", index, table),
        "use ReplacingMergeTree to deduplicate rows by sorting key",
    )
}

pub(crate) fn qualify(database: Option<&str>, name: &str) -> String {
    match database {
        Some(db) => format!("{}.{}", db, name),
        None => name.to_string(),
    }
}

/// Fail with `DuplicateNamedObject` on the first repeated name.
pub(crate) fn ensure_unique<'a>(
    table: &str,
    kind: &'static str,
    names: impl IntoIterator<Item = &'a String>,
) -> ChResult<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(ChError::DuplicateNamedObject {
                kind,
                name: name.clone(),
                table: table.to_string(),
            });
        }
    }
    Ok(())
}

/// A materialized view.
///
/// With `to_table` set the view writes into that table; otherwise it owns
/// its storage and `engine` applies (MergeTree with `ORDER BY tuple()` when
/// unset).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterializedView {
    pub name: String,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub to_table: Option<String>,
    pub query: String,
    #[serde(default)]
    pub engine: Option<EngineSpec>,
    #[serde(default)]
    pub populate: bool,
    #[serde(default)]
    pub if_not_exists: bool,
}

impl MaterializedView {
    pub fn new(name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn to_table(mut self, table: impl Into<String>) -> Self {
        self.to_table = Some(table.into());
        self
    }

    pub fn engine(mut self, engine: EngineSpec) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn populate(mut self) -> Self {
        self.populate = true;
        self
    }

    pub fn qualified_name(&self) -> String {
        qualify(self.database.as_deref(), &self.name)
    }

    pub fn validate(&self) -> ChResult<()> {
        if self.query.trim().is_empty() {
            return Err(ChError::invalid(format!(
                "materialized view '{}' has an empty query",
                self.name
            )));
        }
        if self.to_table.is_some() && self.populate {
            return Err(ChError::invalid(format!(
                "materialized view '{}': POPULATE cannot be combined with TO",
                self.name
            )));
        }
        if self.to_table.is_some() && self.engine.is_some() {
            return Err(ChError::invalid(format!(
                "materialized view '{}': ENGINE cannot be combined with TO",
                self.name
            )));
        }
        match &self.engine {
            Some(engine) => engine.validate(),
            None => Ok(()),
        }
    }
}
