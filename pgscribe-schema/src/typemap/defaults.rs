//! Default value normalization
//!
//! Column defaults arrive as raw SQL expressions (`'active'::user_status`,
//! `nextval('users_id_seq'::regclass)`, `CURRENT_TIMESTAMP`, `'{}'::jsonb`).
//! [`normalize_default`] rewrites them into a literal ready to be pasted into
//! generated code, or into a marker the generators special-case.

use super::PgType;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Normalized column default
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum NormalizedDefault {
    /// No default at all
    Empty,
    /// Generated by a sequence (`nextval`), never a static literal
    Sequence,
    /// Current-time expression; carries the database expression to emit
    Now(String),
    /// Literal ready for generated code: number, quoted string, `null`, `[]`, JSON
    Literal(String),
}

impl NormalizedDefault {
    /// Literal form; `Empty` and `Sequence` render as the empty sentinel and
    /// `Now` as `null`
    pub fn literal(&self) -> &str {
        match self {
            NormalizedDefault::Empty | NormalizedDefault::Sequence => "",
            NormalizedDefault::Now(_) => "null",
            NormalizedDefault::Literal(value) => value,
        }
    }

    pub fn is_now(&self) -> bool {
        matches!(self, NormalizedDefault::Now(_))
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, NormalizedDefault::Sequence)
    }

    /// Whether generators should emit a `defaultValue`
    pub fn has_value(&self) -> bool {
        matches!(self, NormalizedDefault::Literal(_) | NormalizedDefault::Now(_))
    }
}

static NUMERIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$").expect("valid regex")
});
static CAST_TARGET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^[A-Za-z_"][\w\s."]*(\(\s*\d+\s*(,\s*\d+\s*)?\))?(\s*\[\s*\])*$"#)
        .expect("valid regex")
});

/// Normalize a raw default expression for a column of the given type
pub fn normalize_default(raw: Option<&str>, pg_type: &PgType) -> NormalizedDefault {
    let raw = match raw {
        Some(raw) => raw.trim(),
        None => return NormalizedDefault::Empty,
    };

    let uncast = strip_casts(raw);
    let value = strip_quotes(&uncast);

    if pg_type.is_json() {
        let text = value.trim();
        if text.is_empty() || text.eq_ignore_ascii_case("null") {
            return NormalizedDefault::Literal("{}".to_string());
        }
        return NormalizedDefault::Literal(text.to_string());
    }

    if raw.contains("nextval") {
        return NormalizedDefault::Sequence;
    }

    let upper = value.to_ascii_uppercase();
    if upper.starts_with("CURRENT_")
        || upper == "NOW()"
        || upper == "TRANSACTION_TIMESTAMP()"
        || upper == "LOCALTIMESTAMP"
    {
        return NormalizedDefault::Now(value);
    }

    if upper.contains("ARRAY") {
        return NormalizedDefault::Literal("[]".to_string());
    }

    if pg_type.is_array() {
        if value.starts_with('{') && value.ends_with('}') {
            return NormalizedDefault::Literal(array_literal(&value));
        }
        if value.starts_with('[') && value.ends_with(']') {
            return NormalizedDefault::Literal(value);
        }
    }

    if upper.contains("NULL") {
        return NormalizedDefault::Literal("null".to_string());
    }

    if *pg_type == PgType::Boolean {
        let truthy = matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "t");
        return NormalizedDefault::Literal(truthy.to_string());
    }

    if NUMERIC.is_match(value.trim()) {
        return NormalizedDefault::Literal(value.trim().to_string());
    }

    if !value.is_empty() {
        let text = unquote_js(&uncast).unwrap_or(value);
        return NormalizedDefault::Literal(quote(&text));
    }

    NormalizedDefault::Empty
}

/// Remove trailing PostgreSQL casts (`::type`) and one layer of wrapping
/// parentheses, repeatedly: `('now'::text)::date` becomes `'now'`
pub fn strip_casts(raw: &str) -> String {
    let mut current = raw.trim().to_string();
    loop {
        let unwrapped = strip_wrapping_parens(&current);
        let next = match top_level_cast(&unwrapped) {
            Some(pos) if CAST_TARGET.is_match(unwrapped[pos + 2..].trim()) => {
                unwrapped[..pos].trim_end().to_string()
            }
            _ => unwrapped,
        };
        if next == current {
            return next;
        }
        current = next;
    }
}

/// Position of the last `::` outside quotes and brackets
fn top_level_cast(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut in_quote = false;
    let mut depth = 0i32;
    let mut found = None;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' => in_quote = !in_quote,
            b'(' | b'[' if !in_quote => depth += 1,
            b')' | b']' if !in_quote => depth -= 1,
            b':' if !in_quote && depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                found = Some(i);
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }
    found
}

fn strip_wrapping_parens(s: &str) -> String {
    let trimmed = s.trim();
    if !(trimmed.starts_with('(') && trimmed.ends_with(')')) {
        return trimmed.to_string();
    }
    // the opening paren must close at the very end
    let mut depth = 0i32;
    let mut in_quote = false;
    for (i, ch) in trimmed.char_indices() {
        match ch {
            '\'' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => {
                depth -= 1;
                if depth == 0 && i != trimmed.len() - 1 {
                    return trimmed.to_string();
                }
            }
            _ => {}
        }
    }
    trimmed[1..trimmed.len() - 1].trim().to_string()
}

fn strip_quotes(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('\'') && trimmed.ends_with('\'') {
        trimmed[1..trimmed.len() - 1].replace("''", "'")
    } else {
        trimmed.to_string()
    }
}

/// Single-quoted string literal for generated JavaScript/TypeScript
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Body of a literal already in [`quote`] form, where the only escapes are
/// `\'` and `\\` and no bare quote occurs inside
fn unquote_js(s: &str) -> Option<String> {
    let body = s.trim().strip_prefix('\'')?.strip_suffix('\'')?;
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some(escaped @ ('\\' | '\'')) => out.push(escaped),
                _ => return None,
            },
            '\'' => return None,
            other => out.push(other),
        }
    }
    Some(out)
}

/// Convert a PostgreSQL array literal (`{a,b}`) into a JavaScript array
fn array_literal(value: &str) -> String {
    let inner = value[1..value.len() - 1].trim();
    if inner.is_empty() {
        return "[]".to_string();
    }
    let items: Vec<String> = array_elements(inner)
        .into_iter()
        .map(|(item, quoted)| {
            if quoted {
                quote(&item)
            } else if item.starts_with('{') && item.ends_with('}') {
                array_literal(&item)
            } else if item.eq_ignore_ascii_case("null") {
                "null".to_string()
            } else if NUMERIC.is_match(&item) {
                item
            } else {
                quote(&item)
            }
        })
        .collect();
    format!("[{}]", items.join(", "))
}

/// Split an array body on top-level commas; double quotes group and `\`
/// escapes the next character. Each element reports whether it was quoted.
fn array_elements(inner: &str) -> Vec<(String, bool)> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut in_quotes = false;
    let mut depth = 0i32;
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if depth > 0 {
            // nested arrays are kept raw and parsed on recursion
            current.push(ch);
            match ch {
                '\\' => current.extend(chars.next()),
                '"' => in_quotes = !in_quotes,
                '{' if !in_quotes => depth += 1,
                '}' if !in_quotes => depth -= 1,
                _ => {}
            }
            continue;
        }
        match ch {
            '\\' => current.extend(chars.next()),
            '"' => {
                in_quotes = !in_quotes;
                quoted = true;
            }
            ',' if !in_quotes => {
                items.push(finish_element(&mut current, quoted));
                quoted = false;
            }
            '{' if !in_quotes => {
                depth += 1;
                current.push(ch);
            }
            c if c.is_whitespace() && !in_quotes && (quoted || current.is_empty()) => {}
            c => current.push(c),
        }
    }
    items.push(finish_element(&mut current, quoted));
    items
}

fn finish_element(current: &mut String, quoted: bool) -> (String, bool) {
    let item = std::mem::take(current);
    if quoted {
        (item, true)
    } else {
        (item.trim_end().to_string(), false)
    }
}
