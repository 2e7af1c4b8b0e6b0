//! # QAIL ClickHouse type bridge
//!
//! Maps native types onto ClickHouse store types and back, renders native
//! values as SQL literals, and turns schema operations into MergeTree DDL.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use qail_clickhouse::prelude::*;
//!
//! let registry = MappingRegistry::new();
//! let resolver = TypeResolver::new(&registry);
//!
//! let mapping = resolver.resolve_required(&NativeType::String, Some("LowCardinality(Nullable(String))"), None)?;
//! assert_eq!(format_literal(&mapping, &Value::from("it's"))?, "'it\\'s'");
//!
//! let table = Table::new("events")
//!     .column(Column::new("id", NativeType::U64))
//!     .engine(EngineSpec::new(EngineFamily::ReplacingMergeTree).order_by(["id"]));
//! let sql = DdlTranslator::new(&resolver).translate(&SchemaOp::CreateTable(table))?;
//! ```
//!
//! ## Components
//!
//! | Module       | Role                                              |
//! |--------------|---------------------------------------------------|
//! | `parser`     | Store-type grammar, `parse_type`                  |
//! | `mapping`    | Registry, cache and resolver                      |
//! | `transpiler` | Literals, engine clause and DDL                   |
//! | `migrate`    | Tables, columns, engines and schema operations    |

pub mod ast;
pub mod config;
pub mod error;
pub mod mapping;
pub mod migrate;
pub mod parser;
pub mod transpiler;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::config::BridgeConfig;
    pub use crate::error::*;
    pub use crate::mapping::{Mapping, MappingCache, MappingRegistry, TypeResolver};
    pub use crate::migrate::*;
    pub use crate::parser::parse_type;
    pub use crate::transpiler::{DdlTranslator, build_engine_clause, format_literal};
}

pub use parser::parse_type;
