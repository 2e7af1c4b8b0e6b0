//! DDL generation for schema operations.
//!
//! Every [`SchemaOp`] maps to one statement or to a typed
//! `UnsupportedDdlFeature` error. Nothing is emitted for an operation that
//! fails validation.

use std::collections::{HashMap, HashSet};

use super::engine::build_engine_clause;
use super::traits::{escape_expression, escape_identifier, quote_string};
use crate::config::EngineDefaults;
use crate::error::{ChError, ChResult, DdlFeature};
use crate::mapping::TypeResolver;
use crate::migrate::SchemaOp;
use crate::migrate::engine::EngineSpec;
use crate::migrate::schema::{Column, Index, MaterializedView, Projection, Table, unique_index_error};

/// Translates schema operations into DDL text.
#[derive(Debug, Clone)]
pub struct DdlTranslator<'a> {
    resolver: &'a TypeResolver<'a>,
    cluster: Option<String>,
    engine_defaults: Option<EngineDefaults>,
}

impl<'a> DdlTranslator<'a> {
    pub fn new(resolver: &'a TypeResolver<'a>) -> Self {
        Self {
            resolver,
            cluster: None,
            engine_defaults: None,
        }
    }

    /// Append `ON CLUSTER name` to every statement.
    pub fn on_cluster(mut self, cluster: impl Into<String>) -> Self {
        self.cluster = Some(cluster.into());
        self
    }

    /// Engine family and settings for tables that leave them unset.
    pub fn with_engine_defaults(mut self, defaults: EngineDefaults) -> Self {
        self.engine_defaults = Some(defaults);
        self
    }

    /// Translate one operation.
    pub fn translate(&self, op: &SchemaOp) -> ChResult<String> {
        tracing::debug!("Translating {} operation", op.name());
        match op {
            SchemaOp::CreateDatabase {
                name,
                if_not_exists,
            } => Ok(format!(
                "CREATE DATABASE {}{}{}",
                if_not_exists_clause(*if_not_exists),
                escape_identifier(name),
                self.cluster_clause()
            )),
            SchemaOp::DropDatabase { name, if_exists } => Ok(self.drop("DATABASE", name, *if_exists)),
            SchemaOp::CreateTable(table) => self.create_table(table),
            SchemaOp::DropTable { table, if_exists } => Ok(self.drop("TABLE", table, *if_exists)),
            SchemaOp::RenameTable { from, to } => Ok(format!(
                "RENAME TABLE {} TO {}{}",
                escape_identifier(from),
                escape_identifier(to),
                self.cluster_clause()
            )),
            SchemaOp::AddColumn {
                table,
                column,
                after,
            } => {
                let mut sql = self.alter(table, &format!("ADD COLUMN {}", self.column_def(column)));
                if let Some(after) = after {
                    sql.push_str(" AFTER ");
                    sql.push_str(&escape_identifier(after));
                }
                Ok(sql)
            }
            SchemaOp::DropColumn { table, column } => {
                Ok(self.alter(table, &format!("DROP COLUMN {}", escape_identifier(column))))
            }
            SchemaOp::ModifyColumn { table, column } => {
                Ok(self.alter(table, &format!("MODIFY COLUMN {}", self.column_def(column))))
            }
            SchemaOp::RenameColumn { table, from, .. } => Err(ChError::unsupported_with_hint(
                DdlFeature::ColumnRename,
                format!("column '{}' on table '{}'", from, table),
                "add the new column, backfill it and drop the old one",
            )),
            SchemaOp::CreateIndex { table, index } => {
                if index.unique {
                    return Err(unique_index_error(&index.name, table));
                }
                Ok(self.alter(table, &format!("ADD {}", index_def(index))))
            }
            SchemaOp::DropIndex { table, name } => {
                Ok(self.alter(table, &format!("DROP INDEX {}", escape_identifier(name))))
            }
            SchemaOp::AddProjection { table, projection } => {
                validate_projection(projection, table)?;
                Ok(self.alter(table, &format!("ADD {}", projection_def(projection))))
            }
            SchemaOp::DropProjection { table, name } => {
                Ok(self.alter(table, &format!("DROP PROJECTION {}", escape_identifier(name))))
            }
            SchemaOp::AddCheckConstraint {
                table,
                name,
                expression,
            } => Ok(self.alter(
                table,
                &format!(
                    "ADD CONSTRAINT {} CHECK {}",
                    escape_identifier(name),
                    expression.trim()
                ),
            )),
            SchemaOp::DropCheckConstraint { table, name } => Ok(self.alter(
                table,
                &format!("DROP CONSTRAINT {}", escape_identifier(name)),
            )),
            SchemaOp::AddForeignKey { table, name, .. } | SchemaOp::DropForeignKey { table, name } => {
                Err(ChError::unsupported(
                    DdlFeature::ForeignKey,
                    format!("constraint '{}' on table '{}'", name, table),
                ))
            }
            SchemaOp::AddUniqueConstraint { table, name, .. } => {
                Err(ChError::unsupported_with_hint(
                    DdlFeature::UniqueConstraint,
                    format!("constraint '{}' on table '{}'", name, table),
                    "use ReplacingMergeTree to deduplicate rows by sorting key",
                ))
            }
            SchemaOp::AddPrimaryKey { table, .. } | SchemaOp::DropPrimaryKey { table } => {
                Err(ChError::unsupported_with_hint(
                    DdlFeature::PrimaryKeyChange,
                    format!("table '{}'", table),
                    "the primary key is fixed at creation by ORDER BY",
                ))
            }
            SchemaOp::CreateMaterializedView(view) => self.create_materialized_view(view),
            SchemaOp::DropView { name, if_exists } => Ok(self.drop("VIEW", name, *if_exists)),
        }
    }

    /// Translate a batch. Duplicate projection and index names across the
    /// batch are rejected up front, and the first failing operation aborts
    /// the whole batch.
    pub fn translate_all(&self, ops: &[SchemaOp]) -> ChResult<Vec<String>> {
        check_batch_names(ops)?;
        ops.iter().map(|op| self.translate(op)).collect()
    }

    fn cluster_clause(&self) -> String {
        match &self.cluster {
            Some(cluster) => format!(" ON CLUSTER {}", escape_identifier(cluster)),
            None => String::new(),
        }
    }

    fn alter(&self, table: &str, action: &str) -> String {
        format!(
            "ALTER TABLE {}{} {}",
            escape_identifier(table),
            self.cluster_clause(),
            action
        )
    }

    fn drop(&self, kind: &str, name: &str, if_exists: bool) -> String {
        format!(
            "DROP {} {}{}{}",
            kind,
            if if_exists { "IF EXISTS " } else { "" },
            escape_identifier(name),
            self.cluster_clause()
        )
    }

    fn engine_for(&self, spec: Option<&EngineSpec>) -> EngineSpec {
        match &self.engine_defaults {
            Some(defaults) => defaults.apply(spec),
            None => spec.cloned().unwrap_or_default(),
        }
    }

    /// `name Type [DEFAULT ..] [COMMENT '..'] [CODEC(..)] [TTL ..]`
    fn column_def(&self, column: &Column) -> String {
        let mapping =
            self.resolver
                .resolve_or_fallback(&column.native, column.store_type.as_deref(), None);
        let mut def = format!("{} {}", escape_identifier(&column.name), mapping.store_type);
        if let Some(default) = &column.default {
            def.push(' ');
            def.push_str(&default.to_string());
        }
        if let Some(comment) = &column.comment {
            def.push_str(" COMMENT ");
            def.push_str(&quote_string(comment));
        }
        if let Some(codec) = &column.codec {
            def.push_str(&format!(" CODEC({})", codec));
        }
        if let Some(ttl) = &column.ttl {
            def.push_str(" TTL ");
            def.push_str(ttl.trim());
        }
        def
    }

    fn create_table(&self, table: &Table) -> ChResult<String> {
        table.validate()?;
        let engine = self.engine_for(table.engine.as_ref());
        let engine_clause = build_engine_clause(&engine)?;

        let mut defs: Vec<String> = table.columns.iter().map(|c| self.column_def(c)).collect();
        defs.extend(table.indexes.iter().map(index_def));
        for projection in &table.projections {
            validate_projection(projection, &table.name)?;
            defs.push(projection_def(projection));
        }
        defs.extend(table.constraints.iter().map(|c| {
            format!(
                "CONSTRAINT {} CHECK {}",
                escape_identifier(&c.name),
                c.expression.trim()
            )
        }));

        let mut sql = format!(
            "CREATE TABLE {}{}{}\n(\n    {}\n)\n{}",
            if_not_exists_clause(table.if_not_exists),
            escape_identifier(&table.qualified_name()),
            self.cluster_clause(),
            defs.join(",\n    "),
            engine_clause
        );
        if let Some(comment) = &table.comment {
            sql.push_str("\nCOMMENT ");
            sql.push_str(&quote_string(comment));
        }
        Ok(sql)
    }

    fn create_materialized_view(&self, view: &MaterializedView) -> ChResult<String> {
        view.validate()?;
        let mut sql = format!(
            "CREATE MATERIALIZED VIEW {}{}{}",
            if_not_exists_clause(view.if_not_exists),
            escape_identifier(&view.qualified_name()),
            self.cluster_clause()
        );
        match &view.to_table {
            Some(target) => {
                sql.push_str(" TO ");
                sql.push_str(&escape_identifier(target));
            }
            None => {
                let engine = self.engine_for(view.engine.as_ref());
                sql.push('\n');
                sql.push_str(&build_engine_clause(&engine)?);
            }
        }
        if view.populate {
            sql.push_str("\nPOPULATE");
        }
        sql.push_str("\nAS ");
        sql.push_str(view.query.trim());
        Ok(sql)
    }
}

fn if_not_exists_clause(flag: bool) -> &'static str {
    if flag { "IF NOT EXISTS " } else { "" }
}

/// `INDEX name expr TYPE kind GRANULARITY n`
fn index_def(index: &Index) -> String {
    format!(
        "INDEX {} {} TYPE {} GRANULARITY {}",
        escape_identifier(&index.name),
        escape_expression(&index.expression),
        index.kind,
        index.granularity
    )
}

/// `PROJECTION name (query)`
fn projection_def(projection: &Projection) -> String {
    format!(
        "PROJECTION {} ({})",
        escape_identifier(&projection.name),
        projection.query.trim()
    )
}

fn validate_projection(projection: &Projection, table: &str) -> ChResult<()> {
    if projection.query.trim().is_empty() {
        return Err(ChError::invalid(format!(
            "projection '{}' on table '{}' has an empty query",
            projection.name, table
        )));
    }
    Ok(())
}

type BatchNames = HashMap<(String, &'static str), HashSet<String>>;

fn claim_name(names: &mut BatchNames, table: &str, kind: &'static str, name: &str) -> ChResult<()> {
    let set = names.entry((table.to_string(), kind)).or_default();
    if set.insert(name.to_string()) {
        Ok(())
    } else {
        Err(ChError::DuplicateNamedObject {
            kind,
            name: name.to_string(),
            table: table.to_string(),
        })
    }
}

fn release_name(names: &mut BatchNames, table: &str, kind: &'static str, name: &str) {
    if let Some(set) = names.get_mut(&(table.to_string(), kind)) {
        set.remove(name);
    }
}

/// Track projection and index names per table across a batch. Drops free
/// the name for later operations in the same batch.
fn check_batch_names(ops: &[SchemaOp]) -> ChResult<()> {
    let mut names = BatchNames::new();
    for op in ops {
        match op {
            SchemaOp::CreateTable(table) => {
                let qualified = table.qualified_name();
                for index in &table.indexes {
                    claim_name(&mut names, &qualified, "index", &index.name)?;
                }
                for projection in &table.projections {
                    claim_name(&mut names, &qualified, "projection", &projection.name)?;
                }
            }
            SchemaOp::CreateIndex { table, index } => {
                claim_name(&mut names, table, "index", &index.name)?
            }
            SchemaOp::AddProjection { table, projection } => {
                claim_name(&mut names, table, "projection", &projection.name)?
            }
            SchemaOp::DropIndex { table, name } => release_name(&mut names, table, "index", name),
            SchemaOp::DropProjection { table, name } => {
                release_name(&mut names, table, "projection", name)
            }
            SchemaOp::DropTable { table, .. } => names.retain(|(t, _), _| t != table),
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NativeType;
    use crate::mapping::MappingRegistry;
    use crate::migrate::engine::EngineFamily;
    use crate::migrate::schema::{CodecKind, IndexKind};
    use crate::migrate::{AlterTable, Codec};

    #[test]
    fn test_create_table() {
        let registry = MappingRegistry::new();
        let resolver = TypeResolver::new(&registry);
        let ddl = DdlTranslator::new(&resolver);

        let table = Table::new("events")
            .database("analytics")
            .column(Column::new("id", NativeType::U64))
            .column(
                Column::new("ts", NativeType::DateTime)
                    .default("now64(3)")
                    .codec(Codec(vec![CodecKind::Delta(Some(8)), CodecKind::Zstd(Some(3))])),
            )
            .column(Column::typed("payload", "Nullable(String)").comment("raw body"))
            .index(Index::new("ix_payload", "payload", IndexKind::BloomFilter(Some(0.01))).granularity(4))
            .projection(Projection::new("by_ts", "SELECT * ORDER BY ts"))
            .engine(EngineSpec::new(EngineFamily::MergeTree).order_by(["id"]))
            .comment("raw events");

        let sql = ddl.translate(&SchemaOp::CreateTable(table)).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE analytics.events\n\
             (\n    \
             id UInt64,\n    \
             ts DateTime64(3) DEFAULT now64(3) CODEC(Delta(8), ZSTD(3)),\n    \
             payload Nullable(String) COMMENT 'raw body',\n    \
             INDEX ix_payload payload TYPE bloom_filter(0.01) GRANULARITY 4,\n    \
             PROJECTION by_ts (SELECT * ORDER BY ts)\n\
             )\n\
             ENGINE = MergeTree()\n\
             ORDER BY id\n\
             COMMENT 'raw events'"
        );
    }

    #[test]
    fn test_alter_operations_on_cluster() {
        let registry = MappingRegistry::new();
        let resolver = TypeResolver::new(&registry);
        let ddl = DdlTranslator::new(&resolver).on_cluster("main");

        let ops = AlterTable::new("events")
            .add_column_after(Column::new("country", NativeType::String), "id")
            .drop_column("legacy")
            .drop_projection("old")
            .add_check("positive", "id > 0")
            .build();
        let sql = ddl.translate_all(&ops).unwrap();
        assert_eq!(
            sql,
            vec![
                "ALTER TABLE events ON CLUSTER main ADD COLUMN country String AFTER id",
                "ALTER TABLE events ON CLUSTER main DROP COLUMN legacy",
                "ALTER TABLE events ON CLUSTER main DROP PROJECTION old",
                "ALTER TABLE events ON CLUSTER main ADD CONSTRAINT positive CHECK id > 0",
            ]
        );
    }

    #[test]
    fn test_unsupported_features() {
        let registry = MappingRegistry::new();
        let resolver = TypeResolver::new(&registry);
        let ddl = DdlTranslator::new(&resolver);

        let cases = [
            (
                SchemaOp::AddForeignKey {
                    table: "orders".into(),
                    name: "fk_user".into(),
                    columns: vec!["user_id".into()],
                    ref_table: "users".into(),
                    ref_columns: vec!["id".into()],
                },
                DdlFeature::ForeignKey,
            ),
            (
                SchemaOp::AddUniqueConstraint {
                    table: "users".into(),
                    name: "uq_email".into(),
                    columns: vec!["email".into()],
                },
                DdlFeature::UniqueConstraint,
            ),
            (
                SchemaOp::DropPrimaryKey {
                    table: "users".into(),
                },
                DdlFeature::PrimaryKeyChange,
            ),
            (
                SchemaOp::RenameColumn {
                    table: "users".into(),
                    from: "mail".into(),
                    to: "email".into(),
                },
                DdlFeature::ColumnRename,
            ),
            (
                SchemaOp::CreateIndex {
                    table: "users".into(),
                    index: Index::new("ux_email", "email", IndexKind::MinMax).unique(),
                },
                DdlFeature::UniqueIndex,
            ),
        ];
        for (op, feature) in cases {
            let err = ddl.translate(&op).unwrap_err();
            assert_eq!(err.feature(), Some(feature), "{}", op.name());
        }
    }

    #[test]
    fn test_batch_duplicate_projection() {
        let registry = MappingRegistry::new();
        let resolver = TypeResolver::new(&registry);
        let ddl = DdlTranslator::new(&resolver);

        let ops = AlterTable::new("events")
            .add_projection(Projection::new("p", "SELECT * ORDER BY a"))
            .add_projection(Projection::new("p", "SELECT * ORDER BY b"))
            .build();
        assert!(matches!(
            ddl.translate_all(&ops),
            Err(ChError::DuplicateNamedObject { kind: "projection", .. })
        ));

        let ops = AlterTable::new("events")
            .add_projection(Projection::new("p", "SELECT * ORDER BY a"))
            .drop_projection("p")
            .add_projection(Projection::new("p", "SELECT * ORDER BY b"))
            .build();
        assert_eq!(ddl.translate_all(&ops).unwrap().len(), 3);
    }

    #[test]
    fn test_materialized_view() {
        let registry = MappingRegistry::new();
        let resolver = TypeResolver::new(&registry);
        let ddl = DdlTranslator::new(&resolver);

        let view = MaterializedView::new("daily_mv", "SELECT toDate(ts) AS day, count() AS c FROM events GROUP BY day")
            .to_table("daily");
        assert_eq!(
            ddl.translate(&SchemaOp::CreateMaterializedView(view)).unwrap(),
            "CREATE MATERIALIZED VIEW daily_mv TO daily\nAS SELECT toDate(ts) AS day, count() AS c FROM events GROUP BY day"
        );

        let owned = MaterializedView::new("mv", "SELECT 1").populate();
        assert_eq!(
            ddl.translate(&SchemaOp::CreateMaterializedView(owned)).unwrap(),
            "CREATE MATERIALIZED VIEW mv\nENGINE = MergeTree()\nORDER BY tuple()\nPOPULATE\nAS SELECT 1"
        );
    }

    #[test]
    fn test_engine_defaults_and_drops() {
        let registry = MappingRegistry::new();
        let resolver = TypeResolver::new(&registry);
        let mut defaults = EngineDefaults::default();
        defaults.family = EngineFamily::ReplacingMergeTree;
        let ddl = DdlTranslator::new(&resolver).with_engine_defaults(defaults);

        let table = Table::new("t").column(Column::new("id", NativeType::I32));
        let sql = ddl.translate(&SchemaOp::CreateTable(table)).unwrap();
        assert!(sql.ends_with("ENGINE = ReplacingMergeTree()\nORDER BY tuple()"));

        // An explicitly chosen family is kept even when it equals the built-in default.
        let explicit = Table::new("t")
            .column(Column::new("id", NativeType::I32))
            .engine(EngineSpec::new(EngineFamily::MergeTree).order_by(["id"]));
        let sql = ddl.translate(&SchemaOp::CreateTable(explicit)).unwrap();
        assert!(sql.ends_with("ENGINE = MergeTree()\nORDER BY id"), "{}", sql);

        assert_eq!(
            ddl.translate(&SchemaOp::DropTable {
                table: "t".into(),
                if_exists: true
            })
            .unwrap(),
            "DROP TABLE IF EXISTS t"
        );
        assert_eq!(
            ddl.translate(&SchemaOp::CreateDatabase {
                name: "analytics".into(),
                if_not_exists: true
            })
            .unwrap(),
            "CREATE DATABASE IF NOT EXISTS analytics"
        );
    }
}
