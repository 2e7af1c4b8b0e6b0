//! SQL generation for ClickHouse.
//!
//! - `literal`: native values as SQL literals
//! - `engine`: the `ENGINE = ...` clause
//! - `ddl`: schema operations as DDL statements
//! - `traits`: identifier and string quoting

pub mod ddl;
pub mod engine;
pub mod literal;
pub mod traits;

pub use ddl::DdlTranslator;
pub use engine::build_engine_clause;
pub use literal::{format_literal, format_value};
pub use traits::{escape_identifier, quote_string};
