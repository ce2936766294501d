//! TypeScript type resolution
//!
//! `bigint` and `numeric` map to `string` so values keep their full precision.
//! JSON columns do not map to a primitive: they reference a named interface
//! derived from the column's default value.

use super::PgType;
use crate::codegen::{js_key, to_pascal_case};
use crate::{Result, SchemaError};
use serde::Serialize;
use serde_json::Value;

/// Suffix appended to generated JSON interface names
pub const INTERFACE_SUFFIX: &str = "Interface";

/// Result of resolving a column's TypeScript type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TsResolution {
    pub type_name: String,
    /// Name of the JSON interface that must be generated for this column
    pub interface: Option<String>,
}

/// A top-level TypeScript declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TsDeclaration {
    pub name: String,
    pub body: TsBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TsBody {
    Interface(Vec<TsProperty>),
    Alias(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TsProperty {
    pub name: String,
    /// Property key as written in source, quoted when not an identifier
    pub key: String,
    pub type_name: String,
}

/// Name of the interface generated for a JSON column
pub fn interface_name(model_name: &str, column_name: &str) -> String {
    format!(
        "{}{}{}",
        to_pascal_case(model_name),
        to_pascal_case(column_name),
        INTERFACE_SUFFIX
    )
}

/// Resolve the TypeScript type of a column
pub fn resolve_ts_type(
    pg_type: &PgType,
    udt_name: &str,
    model_name: &str,
    column_name: &str,
) -> TsResolution {
    let primitive = |name: &str| TsResolution {
        type_name: name.to_string(),
        interface: None,
    };

    match pg_type {
        PgType::String | PgType::Text | PgType::CiText => primitive("string"),
        PgType::Integer | PgType::SmallInt | PgType::Float | PgType::Real | PgType::Double => {
            primitive("number")
        }
        PgType::BigInt | PgType::Decimal => primitive("string"),
        PgType::DateTime | PgType::Date => primitive("Date"),
        PgType::Time => primitive("string"),
        PgType::Boolean => primitive("boolean"),
        PgType::Uuid => primitive("string"),
        PgType::Blob => primitive("Buffer"),
        PgType::Enum => primitive(&to_pascal_case(udt_name.trim_start_matches('_'))),
        PgType::Composite => primitive("Record<string, unknown>"),
        PgType::Json | PgType::JsonB => {
            let name = interface_name(model_name, column_name);
            TsResolution {
                type_name: name.clone(),
                interface: Some(name),
            }
        }
        PgType::Array(element) => {
            let inner = resolve_ts_type(element, udt_name, model_name, column_name);
            TsResolution {
                type_name: format!("{}[]", wrap_union(&inner.type_name)),
                interface: inner.interface,
            }
        }
        PgType::Range(element) => {
            let inner = resolve_ts_type(element, udt_name, model_name, column_name);
            TsResolution {
                type_name: format!("[{0}, {0}]", inner.type_name),
                interface: inner.interface,
            }
        }
    }
}

fn wrap_union(type_name: &str) -> String {
    if type_name.contains(' ') {
        format!("({})", type_name)
    } else {
        type_name.to_string()
    }
}

/// Build the declarations for a JSON interface from a JSON sample.
///
/// Objects become interfaces (nested objects become nested named interfaces),
/// anything else becomes a type alias. Malformed JSON is a typed error.
pub fn interface_from_json(name: &str, json_text: &str) -> Result<Vec<TsDeclaration>> {
    let value: Value = serde_json::from_str(json_text).map_err(|source| SchemaError::JsonInterface {
        interface: name.to_string(),
        source,
    })?;

    let mut declarations = Vec::new();
    match &value {
        Value::Object(_) => {
            object_interface(name, &value, &mut declarations);
        }
        other => {
            let type_name = value_type(name, other, &mut declarations);
            declarations.insert(
                0,
                TsDeclaration {
                    name: name.to_string(),
                    body: TsBody::Alias(type_name),
                },
            );
        }
    }
    Ok(declarations)
}

fn object_interface(name: &str, value: &Value, declarations: &mut Vec<TsDeclaration>) {
    let index = declarations.len();
    declarations.push(TsDeclaration {
        name: name.to_string(),
        body: TsBody::Interface(Vec::new()),
    });

    let mut properties = Vec::new();
    if let Value::Object(map) = value {
        for (key, child) in map {
            let child_name = format!("{}{}", name, to_pascal_case(key));
            properties.push(TsProperty {
                name: key.clone(),
                key: js_key(key),
                type_name: value_type(&child_name, child, declarations),
            });
        }
    }
    declarations[index].body = TsBody::Interface(properties);
}

fn value_type(name: &str, value: &Value, declarations: &mut Vec<TsDeclaration>) -> String {
    match value {
        Value::Null => "unknown".to_string(),
        Value::Bool(_) => "boolean".to_string(),
        Value::Number(_) => "number".to_string(),
        Value::String(_) => "string".to_string(),
        Value::Array(items) => match items.first() {
            Some(first) => {
                let item = value_type(&format!("{}Item", name), first, declarations);
                format!("{}[]", wrap_union(&item))
            }
            None => "unknown[]".to_string(),
        },
        Value::Object(_) => {
            let name = unique_name(name, declarations);
            object_interface(&name, value, declarations);
            name
        }
    }
}

/// `base`, or `base2`, `base3`, ... when an earlier declaration took the name
fn unique_name(base: &str, declarations: &[TsDeclaration]) -> String {
    let taken = |candidate: &str| declarations.iter().any(|d| d.name == candidate);
    if !taken(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{}{}", base, n))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(pg_type: PgType) -> String {
        resolve_ts_type(&pg_type, "", "User", "col").type_name
    }

    #[test]
    fn test_primitives() {
        assert_eq!(ts(PgType::String), "string");
        assert_eq!(ts(PgType::Integer), "number");
        assert_eq!(ts(PgType::Boolean), "boolean");
        assert_eq!(ts(PgType::DateTime), "Date");
        assert_eq!(ts(PgType::Blob), "Buffer");
    }

    #[test]
    fn test_arbitrary_precision_maps_to_string() {
        assert_eq!(ts(PgType::Decimal), "string");
        assert_eq!(ts(PgType::BigInt), "string");
    }

    #[test]
    fn test_arrays_and_ranges() {
        assert_eq!(ts(PgType::Array(Box::new(PgType::Integer))), "number[]");
        assert_eq!(
            ts(PgType::Array(Box::new(PgType::Array(Box::new(PgType::Text))))),
            "string[][]"
        );
        assert_eq!(ts(PgType::Range(Box::new(PgType::Date))), "[Date, Date]");
    }

    #[test]
    fn test_enum_uses_udt_name() {
        let resolved = resolve_ts_type(&PgType::Enum, "user_status", "User", "status");
        assert_eq!(resolved.type_name, "UserStatus");
        let resolved = resolve_ts_type(
            &PgType::Array(Box::new(PgType::Enum)),
            "_user_status",
            "User",
            "statuses",
        );
        assert_eq!(resolved.type_name, "UserStatus[]");
    }

    #[test]
    fn test_json_references_named_interface() {
        let resolved = resolve_ts_type(&PgType::JsonB, "jsonb", "UserProfile", "settings");
        assert_eq!(resolved.type_name, "UserProfileSettingsInterface");
        assert_eq!(resolved.interface.as_deref(), Some("UserProfileSettingsInterface"));
    }

    #[test]
    fn test_interface_from_nested_json() {
        let decls = interface_from_json(
            "UserSettingsInterface",
            r#"{"theme": "dark", "alerts": {"email": true}, "tags": ["a"], "max-items": 5}"#,
        )
        .unwrap();

        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].name, "UserSettingsInterface");
        let TsBody::Interface(props) = &decls[0].body else {
            panic!("expected interface");
        };
        let types: Vec<(&str, &str)> = props
            .iter()
            .map(|p| (p.key.as_str(), p.type_name.as_str()))
            .collect();
        assert_eq!(
            types,
            vec![
                ("theme", "string"),
                ("alerts", "UserSettingsInterfaceAlerts"),
                ("tags", "string[]"),
                ("'max-items'", "number"),
            ]
        );
        assert_eq!(decls[1].name, "UserSettingsInterfaceAlerts");
    }

    #[test]
    fn test_colliding_nested_names_get_suffixes() {
        let decls = interface_from_json(
            "EventPayloadInterface",
            r#"{"a_b": {"x": 1}, "aB": {"y": "s"}, "path\\name": true}"#,
        )
        .unwrap();

        let names: Vec<&str> = decls.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["EventPayloadInterface", "EventPayloadInterfaceAB", "EventPayloadInterfaceAB2"]
        );
        let TsBody::Interface(props) = &decls[0].body else {
            panic!("expected interface");
        };
        assert_eq!(props[0].type_name, "EventPayloadInterfaceAB");
        assert_eq!(props[1].type_name, "EventPayloadInterfaceAB2");
        assert_eq!(props[2].key, r"'path\\name'");
    }

    #[test]
    fn test_empty_object_and_non_object_json() {
        let decls = interface_from_json("EmptyInterface", "{}").unwrap();
        assert_eq!(decls[0].body, TsBody::Interface(Vec::new()));

        let decls = interface_from_json("ListInterface", "[]").unwrap();
        assert_eq!(decls[0].body, TsBody::Alias("unknown[]".to_string()));
    }

    #[test]
    fn test_malformed_json_is_typed_error() {
        let err = interface_from_json("BadInterface", "{not json").unwrap_err();
        assert!(matches!(err, SchemaError::JsonInterface { ref interface, .. } if interface == "BadInterface"));
    }
}
