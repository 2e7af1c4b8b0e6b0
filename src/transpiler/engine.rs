//! Engine clause generation.
//!
//! Produces the fragment that follows the column list of `CREATE TABLE`:
//!
//! ```text
//! ENGINE = ReplacingMergeTree(updated_at)
//! PARTITION BY toYYYYMM(created_at)
//! ORDER BY (tenant_id, id)
//! SETTINGS index_granularity = 8192
//! ```

use super::traits::{escape_expression, quote_string};
use crate::error::ChResult;
use crate::migrate::engine::{EngineFamily, EngineSpec};

/// Build the engine clause, one clause per line in the order
/// `ENGINE`, `PARTITION BY`, `ORDER BY`, `PRIMARY KEY`, `SAMPLE BY`, `TTL`,
/// `SETTINGS`.
pub fn build_engine_clause(spec: &EngineSpec) -> ChResult<String> {
    spec.validate()?;

    let mut clauses = vec![format!("ENGINE = {}", engine_call(spec))];
    if let Some(expr) = &spec.partition_by {
        clauses.push(format!("PARTITION BY {}", escape_expression(expr)));
    }
    if let Some(order_by) = order_by_clause(spec) {
        clauses.push(format!("ORDER BY {}", order_by));
    }
    if !spec.primary_key.is_empty() {
        clauses.push(format!("PRIMARY KEY {}", key_list(&spec.primary_key)));
    }
    if let Some(expr) = &spec.sample_by {
        clauses.push(format!("SAMPLE BY {}", escape_expression(expr)));
    }
    if let Some(expr) = &spec.ttl {
        clauses.push(format!("TTL {}", expr.trim()));
    }
    if !spec.settings.is_empty() {
        let settings = spec
            .settings
            .iter()
            .map(|(key, value)| format!("{} = {}", key, setting_value(value)))
            .collect::<Vec<_>>()
            .join(", ");
        clauses.push(format!("SETTINGS {}", settings));
    }
    Ok(clauses.join("\n"))
}

/// `Name(args)`, with the `Replicated` prefix and coordination arguments
/// when replication is configured.
fn engine_call(spec: &EngineSpec) -> String {
    let family = &spec.family;
    let mut args: Vec<String> = Vec::new();
    let mut name = family.name().to_string();

    if let Some(replication) = &spec.replication {
        if !name.starts_with("Replicated") {
            name = format!("Replicated{}", name);
        }
        args.push(quote_string(&replication.zk_path));
        args.push(quote_string(&replication.replica));
    }

    if spec.engine_args.is_empty() {
        args.extend(default_args(spec));
    } else {
        args.extend(spec.engine_args.iter().map(|a| a.trim().to_string()));
    }

    if args.is_empty() && !family.is_merge_tree() {
        name
    } else {
        format!("{}({})", name, args.join(", "))
    }
}

/// Engine arguments implied by the sign, version and sum columns.
fn default_args(spec: &EngineSpec) -> Vec<String> {
    let column = |c: &Option<String>| c.as_deref().map(escape_expression);
    match spec.family {
        EngineFamily::ReplacingMergeTree => column(&spec.version_column)
            .into_iter()
            .chain(column(&spec.is_deleted_column))
            .collect(),
        EngineFamily::CollapsingMergeTree => column(&spec.sign_column).into_iter().collect(),
        EngineFamily::VersionedCollapsingMergeTree => column(&spec.sign_column)
            .into_iter()
            .chain(column(&spec.version_column))
            .collect(),
        EngineFamily::SummingMergeTree if !spec.sum_columns.is_empty() => {
            vec![key_list(&spec.sum_columns)]
        }
        _ => Vec::new(),
    }
}

/// Sorting key. MergeTree engines always get one: `order_by`, else the
/// primary key, else `tuple()`. Other engines only when set.
fn order_by_clause(spec: &EngineSpec) -> Option<String> {
    if !spec.order_by.is_empty() {
        return Some(key_list(&spec.order_by));
    }
    if !spec.family.is_merge_tree() {
        return None;
    }
    if !spec.primary_key.is_empty() {
        return Some(key_list(&spec.primary_key));
    }
    Some("tuple()".to_string())
}

/// `tuple()`, a bare column or expression, or `(a, b)`.
pub fn key_list(columns: &[String]) -> String {
    match columns {
        [] => "tuple()".to_string(),
        [single] => escape_expression(single),
        many => format!(
            "({})",
            many.iter()
                .map(|c| escape_expression(c))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

/// Numbers and booleans bare, anything else single-quoted.
fn setting_value(value: &str) -> String {
    let v = value.trim();
    let numeric = v.parse::<i64>().is_ok() || v.parse::<u64>().is_ok() || v.parse::<f64>().is_ok();
    if numeric && !v.eq_ignore_ascii_case("nan") && !v.to_ascii_lowercase().contains("inf") {
        v.to_string()
    } else if v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("false") {
        v.to_ascii_lowercase()
    } else {
        quote_string(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChError;
    use crate::migrate::engine::Replication;

    #[test]
    fn test_clause_order() {
        let spec = EngineSpec::new(EngineFamily::ReplacingMergeTree)
            .order_by(["tenant_id", "id"])
            .partition_by("toYYYYMM(created_at)")
            .primary_key(["tenant_id"])
            .sample_by("intHash32(id)")
            .ttl("created_at + INTERVAL 30 DAY")
            .version_column("updated_at")
            .setting("index_granularity", 8192)
            .setting("storage_policy", "hot_cold");

        assert_eq!(
            build_engine_clause(&spec).unwrap(),
            "ENGINE = ReplacingMergeTree(updated_at)\n\
             PARTITION BY toYYYYMM(created_at)\n\
             ORDER BY (tenant_id, id)\n\
             PRIMARY KEY tenant_id\n\
             SAMPLE BY intHash32(id)\n\
             TTL created_at + INTERVAL 30 DAY\n\
             SETTINGS index_granularity = 8192, storage_policy = 'hot_cold'"
        );
    }

    #[test]
    fn test_order_by_fallback() {
        let spec = EngineSpec::new(EngineFamily::MergeTree).primary_key(["id"]);
        assert_eq!(
            build_engine_clause(&spec).unwrap(),
            "ENGINE = MergeTree()\nORDER BY id\nPRIMARY KEY id"
        );

        let bare = EngineSpec::new(EngineFamily::AggregatingMergeTree);
        assert_eq!(
            build_engine_clause(&bare).unwrap(),
            "ENGINE = AggregatingMergeTree()\nORDER BY tuple()"
        );

        let custom = EngineSpec::new(EngineFamily::Custom("CoalescingMergeTree".into()));
        assert!(build_engine_clause(&custom).unwrap().ends_with("ORDER BY tuple()"));
    }

    #[test]
    fn test_non_merge_tree() {
        assert_eq!(
            build_engine_clause(&EngineSpec::new(EngineFamily::Memory)).unwrap(),
            "ENGINE = Memory"
        );
        let log = EngineSpec::new(EngineFamily::Log).order_by(["id"]);
        assert_eq!(build_engine_clause(&log).unwrap(), "ENGINE = Log\nORDER BY id");
    }

    #[test]
    fn test_collapsing_arguments() {
        let spec = EngineSpec::new(EngineFamily::VersionedCollapsingMergeTree)
            .sign_column("sign")
            .version_column("version")
            .order_by(["id"]);
        assert!(
            build_engine_clause(&spec)
                .unwrap()
                .starts_with("ENGINE = VersionedCollapsingMergeTree(sign, version)\n")
        );

        let missing = EngineSpec::new(EngineFamily::CollapsingMergeTree);
        assert!(matches!(
            build_engine_clause(&missing),
            Err(ChError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_summing_and_replicated() {
        let spec = EngineSpec::new(EngineFamily::SummingMergeTree)
            .sum_columns(["hits", "bytes"])
            .order_by(["day"])
            .replicated("/clickhouse/tables/{shard}/stats", "{replica}");
        assert_eq!(
            build_engine_clause(&spec).unwrap(),
            "ENGINE = ReplicatedSummingMergeTree('/clickhouse/tables/{shard}/stats', '{replica}', (hits, bytes))\nORDER BY day"
        );

        let mut defaults = EngineSpec::new(EngineFamily::MergeTree);
        defaults.replication = Some(Replication::default());
        assert!(
            build_engine_clause(&defaults)
                .unwrap()
                .starts_with("ENGINE = ReplicatedMergeTree('/clickhouse/tables/{shard}/{database}/{table}', '{replica}')")
        );
    }

    #[test]
    fn test_reserved_key_columns_are_quoted() {
        let spec = EngineSpec::new(EngineFamily::MergeTree).order_by(["order", "user"]);
        assert!(build_engine_clause(&spec).unwrap().contains("ORDER BY (`order`, `user`)"));
    }

    #[test]
    fn test_setting_values() {
        assert_eq!(setting_value("8192"), "8192");
        assert_eq!(setting_value("0.5"), "0.5");
        assert_eq!(setting_value("TRUE"), "true");
        assert_eq!(setting_value("inf"), "'inf'");
        assert_eq!(setting_value("it's"), "'it\\'s'");
    }
}
