//! Quoting and escaping shared by the literal formatter and DDL generation.

/// Keywords that must be backtick-quoted when used as identifiers.
pub const RESERVED_WORDS: &[&str] = &[
    "all",
    "alter",
    "and",
    "array",
    "as",
    "asc",
    "between",
    "by",
    "case",
    "cast",
    "check",
    "cluster",
    "codec",
    "column",
    "comment",
    "constraint",
    "create",
    "database",
    "default",
    "delete",
    "desc",
    "distinct",
    "drop",
    "else",
    "end",
    "engine",
    "false",
    "final",
    "format",
    "from",
    "global",
    "group",
    "having",
    "in",
    "index",
    "inner",
    "insert",
    "interval",
    "is",
    "join",
    "key",
    "left",
    "like",
    "limit",
    "not",
    "null",
    "offset",
    "on",
    "or",
    "order",
    "partition",
    "prewhere",
    "primary",
    "projection",
    "right",
    "sample",
    "select",
    "settings",
    "table",
    "then",
    "to",
    "true",
    "ttl",
    "union",
    "update",
    "user",
    "using",
    "view",
    "when",
    "where",
    "with",
];

/// Whether `name` is a plain identifier: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Escape an identifier if it's a reserved word or contains special chars.
/// Handles dotted identifiers (e.g., `db.table`) by quoting each part.
pub fn escape_identifier(name: &str) -> String {
    if name.contains('.') && !name.contains('`') {
        return name
            .split('.')
            .map(escape_name)
            .collect::<Vec<_>>()
            .join(".");
    }
    escape_name(name)
}

/// Escape one name as a whole; dots are part of the name, so
/// `a.b` becomes `` `a.b` ``. Used for tuple elements and nested fields.
pub fn escape_name(name: &str) -> String {
    let lower = name.to_lowercase();
    let needs_escaping = RESERVED_WORDS.contains(&lower.as_str()) || !is_plain_identifier(name);

    if needs_escaping {
        format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
    } else {
        name.to_string()
    }
}

/// Escape a key expression: plain identifiers go through `escape_identifier`,
/// anything else (`toYYYYMM(ts)`, `intHash32(id)`) passes through untouched.
pub fn escape_expression(expr: &str) -> String {
    let trimmed = expr.trim();
    if is_plain_identifier(trimmed) {
        escape_name(trimmed)
    } else {
        trimmed.to_string()
    }
}

/// Escape string content for a single-quoted literal. Each special
/// character is escaped on its own: `'`, `\`, newline, CR, tab and NUL.
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    for c in s.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            c => out.push(c),
        }
    }
    out
}

/// Wrap `s` in single quotes with escaping.
pub fn quote_string(s: &str) -> String {
    format!("'{}'", escape_string(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_identifier() {
        assert_eq!(escape_identifier("events"), "events");
        assert_eq!(escape_identifier("order"), "`order`");
        assert_eq!(escape_identifier("my col"), "`my col`");
        assert_eq!(escape_identifier("analytics.events"), "analytics.events");
        assert_eq!(escape_identifier("analytics.table"), "analytics.`table`");
        assert_eq!(escape_identifier("1st"), "`1st`");
    }

    #[test]
    fn test_escape_name_keeps_dots() {
        assert_eq!(escape_name("id"), "id");
        assert_eq!(escape_name("a.b"), "`a.b`");
        assert_eq!(escape_name("select"), "`select`");
        assert_eq!(escape_name("x`y"), "`x\\`y`");
    }

    #[test]
    fn test_escape_expression() {
        assert_eq!(escape_expression("toYYYYMM(ts)"), "toYYYYMM(ts)");
        assert_eq!(escape_expression(" user "), "`user`");
        assert_eq!(escape_expression("id"), "id");
    }

    #[test]
    fn test_quote_string() {
        assert_eq!(quote_string("UTC"), "'UTC'");
        assert_eq!(quote_string("a'b"), "'a\\'b'");
        assert_eq!(quote_string("tab\there"), "'tab\\there'");
    }
}
