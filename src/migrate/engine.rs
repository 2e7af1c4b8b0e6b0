//! Table Engines
//!
//! `EngineFamily` names the storage engine; `EngineSpec` carries everything
//! the `ENGINE = ...` fragment needs. Built once per table or view and
//! handed to `build_engine_clause`.
//!
//! # Example
//! ```ignore
//! let spec = EngineSpec::new(EngineFamily::ReplacingMergeTree)
//!     .order_by(["tenant_id", "id"])
//!     .partition_by("toYYYYMM(created_at)")
//!     .version_column("updated_at");
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ChError, ChResult};
use crate::transpiler::traits::is_plain_identifier;

/// Storage engine family.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EngineFamily {
    #[default]
    MergeTree,
    ReplacingMergeTree,
    SummingMergeTree,
    AggregatingMergeTree,
    CollapsingMergeTree,
    VersionedCollapsingMergeTree,
    GraphiteMergeTree,
    Log,
    TinyLog,
    StripeLog,
    Memory,
    Null,
    /// Any other engine, rendered verbatim.
    Custom(String),
}

impl EngineFamily {
    pub fn name(&self) -> &str {
        match self {
            Self::MergeTree => "MergeTree",
            Self::ReplacingMergeTree => "ReplacingMergeTree",
            Self::SummingMergeTree => "SummingMergeTree",
            Self::AggregatingMergeTree => "AggregatingMergeTree",
            Self::CollapsingMergeTree => "CollapsingMergeTree",
            Self::VersionedCollapsingMergeTree => "VersionedCollapsingMergeTree",
            Self::GraphiteMergeTree => "GraphiteMergeTree",
            Self::Log => "Log",
            Self::TinyLog => "TinyLog",
            Self::StripeLog => "StripeLog",
            Self::Memory => "Memory",
            Self::Null => "Null",
            Self::Custom(name) => name,
        }
    }

    /// Sorted engines that need an `ORDER BY` at creation time.
    pub fn is_merge_tree(&self) -> bool {
        self.name().ends_with("MergeTree")
    }
}

impl fmt::Display for EngineFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for EngineFamily {
    type Err = ChError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let known = [
            Self::MergeTree,
            Self::ReplacingMergeTree,
            Self::SummingMergeTree,
            Self::AggregatingMergeTree,
            Self::CollapsingMergeTree,
            Self::VersionedCollapsingMergeTree,
            Self::GraphiteMergeTree,
            Self::Log,
            Self::TinyLog,
            Self::StripeLog,
            Self::Memory,
            Self::Null,
        ];
        if let Some(family) = known.into_iter().find(|f| f.name().eq_ignore_ascii_case(s)) {
            return Ok(family);
        }
        if is_plain_identifier(s) {
            Ok(Self::Custom(s.to_string()))
        } else {
            Err(ChError::invalid(format!("invalid engine name '{}'", s)))
        }
    }
}

impl TryFrom<String> for EngineFamily {
    type Error = ChError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EngineFamily> for String {
    fn from(family: EngineFamily) -> Self {
        family.to_string()
    }
}

/// Coordination path and replica name for `Replicated*` engines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replication {
    pub zk_path: String,
    pub replica: String,
}

impl Default for Replication {
    fn default() -> Self {
        Self {
            zk_path: "/clickhouse/tables/{shard}/{database}/{table}".to_string(),
            replica: "{replica}".to_string(),
        }
    }
}

/// Engine declaration for a table or materialized view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSpec {
    pub family: EngineFamily,
    pub order_by: Vec<String>,
    pub partition_by: Option<String>,
    pub primary_key: Vec<String>,
    pub sample_by: Option<String>,
    pub ttl: Option<String>,
    /// Insertion-ordered `SETTINGS`
    pub settings: IndexMap<String, String>,
    /// CollapsingMergeTree / VersionedCollapsingMergeTree sign column
    pub sign_column: Option<String>,
    /// ReplacingMergeTree / VersionedCollapsingMergeTree version column
    pub version_column: Option<String>,
    /// ReplacingMergeTree delete marker, requires `version_column`
    pub is_deleted_column: Option<String>,
    /// SummingMergeTree columns to sum
    pub sum_columns: Vec<String>,
    pub replication: Option<Replication>,
    /// Explicit engine arguments, used verbatim
    pub engine_args: Vec<String>,
}

fn strings<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

impl EngineSpec {
    pub fn new(family: EngineFamily) -> Self {
        Self {
            family,
            ..Default::default()
        }
    }

    pub fn order_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order_by = strings(columns);
        self
    }

    pub fn partition_by(mut self, expr: impl Into<String>) -> Self {
        self.partition_by = Some(expr.into());
        self
    }

    pub fn primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = strings(columns);
        self
    }

    pub fn sample_by(mut self, expr: impl Into<String>) -> Self {
        self.sample_by = Some(expr.into());
        self
    }

    pub fn ttl(mut self, expr: impl Into<String>) -> Self {
        self.ttl = Some(expr.into());
        self
    }

    pub fn setting(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.settings.insert(key.into(), value.to_string());
        self
    }

    pub fn sign_column(mut self, column: impl Into<String>) -> Self {
        self.sign_column = Some(column.into());
        self
    }

    pub fn version_column(mut self, column: impl Into<String>) -> Self {
        self.version_column = Some(column.into());
        self
    }

    pub fn is_deleted_column(mut self, column: impl Into<String>) -> Self {
        self.is_deleted_column = Some(column.into());
        self
    }

    pub fn sum_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sum_columns = strings(columns);
        self
    }

    /// Use the `Replicated` variant with the given coordination path.
    pub fn replicated(mut self, zk_path: impl Into<String>, replica: impl Into<String>) -> Self {
        self.replication = Some(Replication {
            zk_path: zk_path.into(),
            replica: replica.into(),
        });
        self
    }

    pub fn engine_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.engine_args = strings(args);
        self
    }

    /// Check engine-specific requirements.
    pub fn validate(&self) -> ChResult<()> {
        let family = &self.family;
        match family {
            EngineFamily::CollapsingMergeTree if self.sign_column.is_none() => {
                return Err(ChError::invalid(format!(
                    "{} requires a sign column",
                    family
                )));
            }
            EngineFamily::VersionedCollapsingMergeTree
                if self.sign_column.is_none() || self.version_column.is_none() =>
            {
                return Err(ChError::invalid(format!(
                    "{} requires both a sign column and a version column",
                    family
                )));
            }
            EngineFamily::ReplacingMergeTree
                if self.is_deleted_column.is_some() && self.version_column.is_none() =>
            {
                return Err(ChError::invalid(format!(
                    "{} is_deleted column requires a version column",
                    family
                )));
            }
            _ => {}
        }
        if self.replication.is_some() && !family.is_merge_tree() {
            return Err(ChError::invalid(format!(
                "{} cannot be replicated",
                family
            )));
        }
        if let Some(key) = self.settings.keys().find(|k| !is_plain_identifier(k)) {
            return Err(ChError::invalid(format!("invalid setting name '{}'", key)));
        }
        Ok(())
    }
}
