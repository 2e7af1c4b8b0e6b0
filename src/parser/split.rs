//! Bracket-aware splitting of type calls and argument lists.

/// Split `Head(args)` into the head name and its top-level arguments.
///
/// A bare name yields `(name, None)`. Returns `None` when the parenthesis
/// opened after the head does not close at the very end of the input, or
/// when the argument list is unbalanced.
pub fn split_call(input: &str) -> Option<(&str, Option<Vec<&str>>)> {
    let input = input.trim();
    let Some(open) = input.find('(') else {
        return Some((input, None));
    };
    if !input.ends_with(')') {
        return None;
    }
    let head = input[..open].trim_end();
    let inner = &input[open + 1..input.len() - 1];
    let args = split_args(inner)?;
    Some((head, Some(args)))
}

/// Split a comma-separated list at nesting depth zero.
///
/// Depth counts `(`/`<` against `)`/`>`; commas and brackets inside
/// `'..'`, `".."` or backtick quotes are ignored. Each piece is trimmed.
/// An empty input yields an empty list. Returns `None` for unbalanced input.
pub fn split_args(input: &str) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth: usize = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in input.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => quote = Some(c),
            '(' | '<' => depth += 1,
            ')' | '>' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => {
                parts.push(input[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }

    if depth != 0 || quote.is_some() {
        return None;
    }
    let last = input[start..].trim();
    if !parts.is_empty() || !last.is_empty() {
        parts.push(last);
    }
    Some(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_args_respects_depth() {
        assert_eq!(
            split_args("String, Tuple(a Int32, b Map(String, UInt8)), Int64"),
            Some(vec![
                "String",
                "Tuple(a Int32, b Map(String, UInt8))",
                "Int64"
            ])
        );
        assert_eq!(split_args("Map<String, Int32>, X"), Some(vec!["Map<String, Int32>", "X"]));
    }

    #[test]
    fn test_split_args_ignores_quoted_separators() {
        assert_eq!(
            split_args("'a,b' = 1, 'c)\\'' = 2"),
            Some(vec!["'a,b' = 1", "'c)\\'' = 2"])
        );
    }

    #[test]
    fn test_split_args_unbalanced() {
        assert_eq!(split_args("Int32, Array(String"), None);
        assert_eq!(split_args("Int32)"), None);
        assert_eq!(split_args("'open"), None);
    }

    #[test]
    fn test_split_args_empty_pieces() {
        assert_eq!(split_args(""), Some(vec![]));
        assert_eq!(split_args("Int32,"), Some(vec!["Int32", ""]));
    }

    #[test]
    fn test_split_call() {
        assert_eq!(split_call(" UInt8 "), Some(("UInt8", None)));
        assert_eq!(
            split_call("Map(String, Array(UInt8))"),
            Some(("Map", Some(vec!["String", "Array(UInt8)"])))
        );
        assert_eq!(split_call("Tuple(Int32,"), None);
        assert_eq!(split_call("Nullable(Int32)(x)"), None);
    }
}
