//! Type classification
//!
//! Classification is a pure function of the type string: lowercase, trimmed and
//! with parameter suffixes such as `(10,2)` removed. Rules are tried in a fixed
//! order and the first match wins: numeric family, character family, boolean,
//! date/time family, uuid, json family, array, range, blob, then `String`.
//! Enum, domain and composite types cannot be recognised from the string alone;
//! the assembler resolves them through the catalog.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Classified PostgreSQL type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "element")]
pub enum PgType {
    String,
    Text,
    CiText,
    Integer,
    BigInt,
    SmallInt,
    Float,
    Real,
    Double,
    Decimal,
    DateTime,
    Date,
    Time,
    Boolean,
    Enum,
    Array(Box<PgType>),
    Json,
    JsonB,
    Blob,
    Uuid,
    Range(Box<PgType>),
    Composite,
}

impl PgType {
    pub fn is_json(&self) -> bool {
        matches!(self, PgType::Json | PgType::JsonB)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, PgType::Array(_))
    }

    /// Element type of arrays and ranges
    pub fn element(&self) -> Option<&PgType> {
        match self {
            PgType::Array(inner) | PgType::Range(inner) => Some(inner),
            _ => None,
        }
    }

    /// Innermost non-array type
    pub fn base(&self) -> &PgType {
        match self {
            PgType::Array(inner) => inner.base(),
            other => other,
        }
    }
}

static PARAMS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\([^)]*\)").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static PRECISION_SCALE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(\s*(\d+)\s*(?:,\s*(\d+)\s*)?\)").expect("valid regex"));

/// Lowercase, trim, collapse whitespace and drop parameter suffixes
pub fn normalize_type_name(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let stripped = PARAMS.replace_all(&lowered, "");
    let collapsed = WHITESPACE.replace_all(stripped.trim(), " ");
    collapsed.trim_matches('"').to_string()
}

/// Classify a raw PostgreSQL type string
pub fn classify(raw: &str) -> PgType {
    classify_normalized(&normalize_type_name(raw))
}

/// Classify an information_schema column, resolving `ARRAY` and
/// `USER-DEFINED` through the UDT name
pub fn classify_column(data_type: &str, udt_name: &str) -> PgType {
    let data_type = data_type.trim();
    if data_type.eq_ignore_ascii_case("ARRAY") {
        let element = udt_name.trim().strip_prefix('_').unwrap_or(udt_name.trim());
        if element.is_empty() {
            return PgType::Array(Box::new(PgType::String));
        }
        return PgType::Array(Box::new(classify(element)));
    }
    if data_type.eq_ignore_ascii_case("USER-DEFINED") {
        return classify(udt_name);
    }
    classify(data_type)
}

/// Extract `(precision, scale)` or `(length, None)` from the original,
/// non-stripped type string
pub fn type_params(original: &str) -> (Option<u32>, Option<u32>) {
    match PRECISION_SCALE.captures(original) {
        Some(caps) => {
            let first = caps.get(1).and_then(|m| m.as_str().parse().ok());
            let second = caps.get(2).and_then(|m| m.as_str().parse().ok());
            (first, second)
        }
        None => (None, None),
    }
}

fn classify_normalized(name: &str) -> PgType {
    if let Some(t) = numeric_family(name) {
        return t;
    }
    if let Some(t) = character_family(name) {
        return t;
    }
    if matches!(name, "boolean" | "bool") {
        return PgType::Boolean;
    }
    if let Some(t) = temporal_family(name) {
        return t;
    }
    if name == "uuid" {
        return PgType::Uuid;
    }
    match name {
        "json" => return PgType::Json,
        "jsonb" => return PgType::JsonB,
        _ => {}
    }
    if let Some(element) = array_element(name) {
        return PgType::Array(Box::new(classify_normalized(element)));
    }
    if let Some(element) = range_element(name) {
        return PgType::Range(Box::new(element));
    }
    if matches!(name, "bytea" | "blob") {
        return PgType::Blob;
    }
    PgType::String
}

fn numeric_family(name: &str) -> Option<PgType> {
    let t = match name {
        "numeric" | "decimal" | "money" => PgType::Decimal,
        "smallint" | "int2" | "smallserial" | "serial2" => PgType::SmallInt,
        "integer" | "int" | "int4" | "serial" | "serial4" => PgType::Integer,
        "bigint" | "int8" | "bigserial" | "serial8" => PgType::BigInt,
        "real" | "float4" => PgType::Real,
        "double precision" | "float8" => PgType::Double,
        "float" => PgType::Float,
        _ => return None,
    };
    Some(t)
}

fn character_family(name: &str) -> Option<PgType> {
    let t = match name {
        "character varying" | "varchar" | "character" | "char" | "bpchar" | "name" => {
            PgType::String
        }
        "text" => PgType::Text,
        "citext" => PgType::CiText,
        _ => return None,
    };
    Some(t)
}

fn temporal_family(name: &str) -> Option<PgType> {
    let t = match name {
        "timestamp"
        | "timestamp without time zone"
        | "timestamp with time zone"
        | "timestamptz" => PgType::DateTime,
        "date" => PgType::Date,
        "time" | "time without time zone" | "time with time zone" | "timetz" => PgType::Time,
        _ => return None,
    };
    Some(t)
}

fn array_element(name: &str) -> Option<&str> {
    if let Some(inner) = name.strip_suffix("[]") {
        return Some(inner.trim_end());
    }
    if let Some(inner) = name.strip_prefix('_') {
        return Some(inner);
    }
    if name == "array" {
        return Some("");
    }
    name.strip_prefix("array<")
        .and_then(|rest| rest.strip_suffix('>'))
        .map(str::trim)
}

fn range_element(name: &str) -> Option<PgType> {
    let base = name
        .strip_suffix("multirange")
        .or_else(|| name.strip_suffix("range"))?;
    let element = match base {
        "int4" => PgType::Integer,
        "int8" => PgType::BigInt,
        "num" => PgType::Decimal,
        "ts" | "tstz" => PgType::DateTime,
        "date" => PgType::Date,
        _ => return None,
    };
    Some(element)
}
