//! Schema Operations
//!
//! Structural operations handed to the DDL translator. Some of them
//! (foreign keys, unique constraints, primary-key changes, column rename)
//! exist only so the translator can reject them with a typed error.
//!
//! # Example
//! ```ignore
//! use qail_clickhouse::migrate::{AlterTable, Column};
//!
//! let ops = AlterTable::new("events")
//!     .add_column(Column::new("country", NativeType::String))
//!     .drop_column("legacy")
//!     .add_projection(Projection::new("by_country", "SELECT * ORDER BY country"))
//!     .build();
//! ```

use super::schema::{Column, Index, MaterializedView, Projection, Table};

/// A single schema operation.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaOp {
    CreateDatabase {
        name: String,
        if_not_exists: bool,
    },
    DropDatabase {
        name: String,
        if_exists: bool,
    },
    CreateTable(Table),
    DropTable {
        table: String,
        if_exists: bool,
    },
    RenameTable {
        from: String,
        to: String,
    },
    AddColumn {
        table: String,
        column: Column,
        /// `AFTER column`
        after: Option<String>,
    },
    DropColumn {
        table: String,
        column: String,
    },
    /// Change type, default, codec, TTL or comment of an existing column
    ModifyColumn {
        table: String,
        column: Column,
    },
    RenameColumn {
        table: String,
        from: String,
        to: String,
    },
    CreateIndex {
        table: String,
        index: Index,
    },
    DropIndex {
        table: String,
        name: String,
    },
    AddProjection {
        table: String,
        projection: Projection,
    },
    DropProjection {
        table: String,
        name: String,
    },
    AddCheckConstraint {
        table: String,
        name: String,
        expression: String,
    },
    DropCheckConstraint {
        table: String,
        name: String,
    },
    AddForeignKey {
        table: String,
        name: String,
        columns: Vec<String>,
        ref_table: String,
        ref_columns: Vec<String>,
    },
    DropForeignKey {
        table: String,
        name: String,
    },
    AddUniqueConstraint {
        table: String,
        name: String,
        columns: Vec<String>,
    },
    AddPrimaryKey {
        table: String,
        columns: Vec<String>,
    },
    DropPrimaryKey {
        table: String,
    },
    CreateMaterializedView(MaterializedView),
    DropView {
        name: String,
        if_exists: bool,
    },
}

impl SchemaOp {
    /// Short operation name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateDatabase { .. } => "create_database",
            Self::DropDatabase { .. } => "drop_database",
            Self::CreateTable(_) => "create_table",
            Self::DropTable { .. } => "drop_table",
            Self::RenameTable { .. } => "rename_table",
            Self::AddColumn { .. } => "add_column",
            Self::DropColumn { .. } => "drop_column",
            Self::ModifyColumn { .. } => "modify_column",
            Self::RenameColumn { .. } => "rename_column",
            Self::CreateIndex { .. } => "create_index",
            Self::DropIndex { .. } => "drop_index",
            Self::AddProjection { .. } => "add_projection",
            Self::DropProjection { .. } => "drop_projection",
            Self::AddCheckConstraint { .. } => "add_check_constraint",
            Self::DropCheckConstraint { .. } => "drop_check_constraint",
            Self::AddForeignKey { .. } => "add_foreign_key",
            Self::DropForeignKey { .. } => "drop_foreign_key",
            Self::AddUniqueConstraint { .. } => "add_unique_constraint",
            Self::AddPrimaryKey { .. } => "add_primary_key",
            Self::DropPrimaryKey { .. } => "drop_primary_key",
            Self::CreateMaterializedView(_) => "create_materialized_view",
            Self::DropView { .. } => "drop_view",
        }
    }
}

/// Fluent builder for operations against one table.
#[derive(Debug, Clone)]
pub struct AlterTable {
    pub table: String,
    pub ops: Vec<SchemaOp>,
}

impl AlterTable {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ops: Vec::new(),
        }
    }

    fn push(mut self, op: SchemaOp) -> Self {
        self.ops.push(op);
        self
    }

    /// ADD COLUMN
    pub fn add_column(self, column: Column) -> Self {
        let table = self.table.clone();
        self.push(SchemaOp::AddColumn {
            table,
            column,
            after: None,
        })
    }

    /// ADD COLUMN ... AFTER existing
    pub fn add_column_after(self, column: Column, after: impl Into<String>) -> Self {
        let table = self.table.clone();
        self.push(SchemaOp::AddColumn {
            table,
            column,
            after: Some(after.into()),
        })
    }

    /// DROP COLUMN
    pub fn drop_column(self, name: impl Into<String>) -> Self {
        let table = self.table.clone();
        self.push(SchemaOp::DropColumn {
            table,
            column: name.into(),
        })
    }

    /// MODIFY COLUMN
    pub fn modify_column(self, column: Column) -> Self {
        let table = self.table.clone();
        self.push(SchemaOp::ModifyColumn { table, column })
    }

    /// RENAME COLUMN (rejected at translation time)
    pub fn rename_column(self, from: impl Into<String>, to: impl Into<String>) -> Self {
        let table = self.table.clone();
        self.push(SchemaOp::RenameColumn {
            table,
            from: from.into(),
            to: to.into(),
        })
    }

    /// ADD INDEX
    pub fn add_index(self, index: Index) -> Self {
        let table = self.table.clone();
        self.push(SchemaOp::CreateIndex { table, index })
    }

    /// DROP INDEX
    pub fn drop_index(self, name: impl Into<String>) -> Self {
        let table = self.table.clone();
        self.push(SchemaOp::DropIndex {
            table,
            name: name.into(),
        })
    }

    /// ADD PROJECTION
    pub fn add_projection(self, projection: Projection) -> Self {
        let table = self.table.clone();
        self.push(SchemaOp::AddProjection { table, projection })
    }

    /// DROP PROJECTION
    pub fn drop_projection(self, name: impl Into<String>) -> Self {
        let table = self.table.clone();
        self.push(SchemaOp::DropProjection {
            table,
            name: name.into(),
        })
    }

    /// ADD CONSTRAINT name CHECK expr
    pub fn add_check(self, name: impl Into<String>, expression: impl Into<String>) -> Self {
        let table = self.table.clone();
        self.push(SchemaOp::AddCheckConstraint {
            table,
            name: name.into(),
            expression: expression.into(),
        })
    }

    /// DROP CONSTRAINT
    pub fn drop_check(self, name: impl Into<String>) -> Self {
        let table = self.table.clone();
        self.push(SchemaOp::DropCheckConstraint {
            table,
            name: name.into(),
        })
    }

    /// RENAME TABLE
    pub fn rename_to(self, name: impl Into<String>) -> Self {
        let from = self.table.clone();
        self.push(SchemaOp::RenameTable {
            from,
            to: name.into(),
        })
    }

    pub fn build(self) -> Vec<SchemaOp> {
        self.ops
    }
}
