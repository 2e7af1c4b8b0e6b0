//! Schema model for DDL generation.
//!
//! - `engine`: engine families and `EngineSpec`
//! - `schema`: tables, columns, codecs, indexes, projections, views
//! - `alter`: schema operations and the `AlterTable` builder

pub mod alter;
pub mod engine;
pub mod schema;

pub use alter::{AlterTable, SchemaOp};
pub use engine::{EngineFamily, EngineSpec, Replication};
pub use schema::{
    CheckConstraint, Codec, CodecKind, Column, ColumnDefault, Index, IndexKind,
    MaterializedView, Projection, Table,
};
