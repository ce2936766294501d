//! Sequelize `DataTypes` formatting

use super::PgType;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Formatted ORM type: base name plus optional parameters or element type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrmType {
    pub name: String,
    pub params: Option<String>,
    pub element: Option<Box<OrmType>>,
}

impl OrmType {
    pub fn simple(name: &str) -> Self {
        Self {
            name: name.to_string(),
            params: None,
            element: None,
        }
    }

    pub fn with_params(name: &str, params: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            params: Some(params.into()),
            element: None,
        }
    }

    pub fn wrapping(name: &str, element: OrmType) -> Self {
        Self {
            name: name.to_string(),
            params: None,
            element: Some(Box::new(element)),
        }
    }

    /// Render with a namespace prefix, e.g. `DataTypes.ARRAY(DataTypes.INTEGER)`
    pub fn qualified(&self, namespace: &str) -> String {
        let mut out = format!("{}.{}", namespace, self.name);
        if let Some(element) = &self.element {
            out.push_str(&format!("({})", element.qualified(namespace)));
        } else if let Some(params) = &self.params {
            out.push_str(&format!("({})", params));
        }
        out
    }
}

impl fmt::Display for OrmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(element) = &self.element {
            write!(f, "({})", element)?;
        } else if let Some(params) = &self.params {
            write!(f, "({})", params)?;
        }
        Ok(())
    }
}

/// A user-defined type the ORM formatter cannot express
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{kind} type `{udt_name}` has no ORM mapping")]
pub struct UnsupportedType {
    pub udt_name: String,
    pub kind: String,
}

/// Column metadata the formatter needs next to the classified type
#[derive(Debug, Clone, Copy)]
pub struct OrmTypeInput<'a> {
    pub pg_type: &'a PgType,
    pub udt_name: &'a str,
    pub max_length: Option<i32>,
    pub precision: Option<i32>,
    pub scale: Option<i32>,
    pub enum_values: &'a [String],
}

/// Format the Sequelize type for a column
pub fn format_orm_type(input: &OrmTypeInput<'_>) -> Result<OrmType, UnsupportedType> {
    let t = match input.pg_type {
        PgType::String => match positive(input.max_length) {
            Some(length) => OrmType::with_params("STRING", length.to_string()),
            None => OrmType::simple("STRING"),
        },
        PgType::Decimal => match (positive(input.precision), positive(input.scale)) {
            (Some(p), Some(s)) => OrmType::with_params("DECIMAL", format!("{},{}", p, s)),
            (Some(p), None) => OrmType::with_params("DECIMAL", p.to_string()),
            _ => OrmType::simple("DECIMAL"),
        },
        PgType::Enum => OrmType::with_params("ENUM", enum_params(input.enum_values)),
        PgType::Array(element) => {
            let udt = input.udt_name.trim_start_matches('_');
            let element = match element_by_udt(udt) {
                Some(name) => OrmType::simple(name),
                None => format_orm_type(&OrmTypeInput {
                    pg_type: element,
                    udt_name: udt,
                    max_length: None,
                    precision: None,
                    scale: None,
                    enum_values: input.enum_values,
                })?,
            };
            OrmType::wrapping("ARRAY", element)
        }
        PgType::Range(element) => {
            let udt = input.udt_name.to_ascii_lowercase();
            let subtype = udt
                .strip_suffix("multirange")
                .or_else(|| udt.strip_suffix("range"))
                .and_then(range_element_by_udt);
            let element = match subtype {
                Some(name) => OrmType::simple(name),
                None => base_type(element).ok_or_else(|| UnsupportedType {
                    udt_name: input.udt_name.to_string(),
                    kind: "range".to_string(),
                })?,
            };
            OrmType::wrapping("RANGE", element)
        }
        PgType::Composite => {
            return Err(UnsupportedType {
                udt_name: input.udt_name.to_string(),
                kind: "composite".to_string(),
            })
        }
        other => match base_type(other) {
            Some(t) => t,
            None => {
                return Err(UnsupportedType {
                    udt_name: input.udt_name.to_string(),
                    kind: "user-defined".to_string(),
                })
            }
        },
    };
    Ok(t)
}

/// Parameterless mapping shared by columns, array elements and range subtypes
fn base_type(pg_type: &PgType) -> Option<OrmType> {
    let name = match pg_type {
        PgType::String => "STRING",
        PgType::Text => "TEXT",
        PgType::CiText => "CITEXT",
        PgType::Integer => "INTEGER",
        PgType::BigInt => "BIGINT",
        PgType::SmallInt => "SMALLINT",
        PgType::Float => "FLOAT",
        PgType::Real => "REAL",
        PgType::Double => "DOUBLE",
        PgType::Decimal => "DECIMAL",
        PgType::DateTime => "DATE",
        PgType::Date => "DATEONLY",
        PgType::Time => "TIME",
        PgType::Boolean => "BOOLEAN",
        PgType::Json => "JSON",
        PgType::JsonB => "JSONB",
        PgType::Blob => "BLOB",
        PgType::Uuid => "UUID",
        PgType::Enum | PgType::Array(_) | PgType::Range(_) | PgType::Composite => return None,
    };
    Some(OrmType::simple(name))
}

/// Array element lookup keyed by the element UDT name
fn element_by_udt(udt: &str) -> Option<&'static str> {
    let name = match udt {
        "int2" => "SMALLINT",
        "int4" => "INTEGER",
        "int8" => "BIGINT",
        "float4" => "REAL",
        "float8" => "DOUBLE",
        "numeric" => "DECIMAL",
        "varchar" | "bpchar" | "char" | "name" => "STRING",
        "text" => "TEXT",
        "citext" => "CITEXT",
        "bool" => "BOOLEAN",
        "date" => "DATEONLY",
        "time" | "timetz" => "TIME",
        "timestamp" | "timestamptz" => "DATE",
        "uuid" => "UUID",
        "json" => "JSON",
        "jsonb" => "JSONB",
        "bytea" => "BLOB",
        _ => return None,
    };
    Some(name)
}

fn range_element_by_udt(subtype: &str) -> Option<&'static str> {
    let name = match subtype {
        "int4" => "INTEGER",
        "int8" => "BIGINT",
        "num" => "DECIMAL",
        "ts" | "tstz" => "DATE",
        "date" => "DATEONLY",
        _ => return None,
    };
    Some(name)
}

fn positive(value: Option<i32>) -> Option<i32> {
    value.filter(|v| *v > 0)
}

fn enum_params(values: &[String]) -> String {
    values
        .iter()
        .map(|v| super::defaults::quote(v))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input<'a>(pg_type: &'a PgType, udt_name: &'a str) -> OrmTypeInput<'a> {
        OrmTypeInput {
            pg_type,
            udt_name,
            max_length: None,
            precision: None,
            scale: None,
            enum_values: &[],
        }
    }

    #[test]
    fn test_string_length() {
        let mut i = input(&PgType::String, "varchar");
        i.max_length = Some(255);
        assert_eq!(format_orm_type(&i).unwrap().to_string(), "STRING(255)");

        i.max_length = None;
        assert_eq!(format_orm_type(&i).unwrap().to_string(), "STRING");
    }

    #[test]
    fn test_decimal_precision_and_scale() {
        let mut i = input(&PgType::Decimal, "numeric");
        i.precision = Some(10);
        i.scale = Some(2);
        assert_eq!(format_orm_type(&i).unwrap().to_string(), "DECIMAL(10,2)");

        i.precision = Some(0);
        i.scale = Some(0);
        assert_eq!(format_orm_type(&i).unwrap().to_string(), "DECIMAL");

        i.precision = None;
        i.scale = None;
        assert_eq!(format_orm_type(&i).unwrap().to_string(), "DECIMAL");
    }

    #[test]
    fn test_enum_values_are_quoted() {
        let labels = vec!["active".to_string(), "o'neil".to_string()];
        let mut i = input(&PgType::Enum, "status");
        i.enum_values = &labels;
        assert_eq!(
            format_orm_type(&i).unwrap().to_string(),
            "ENUM('active','o\\'neil')"
        );
    }

    #[test]
    fn test_arrays_use_udt_lookup() {
        let t = PgType::Array(Box::new(PgType::Integer));
        let formatted = format_orm_type(&input(&t, "_int4")).unwrap();
        assert_eq!(formatted.to_string(), "ARRAY(INTEGER)");
        assert_eq!(
            formatted.qualified("DataTypes"),
            "DataTypes.ARRAY(DataTypes.INTEGER)"
        );
    }

    #[test]
    fn test_enum_arrays_fall_back_to_classification() {
        let labels = vec!["a".to_string()];
        let t = PgType::Array(Box::new(PgType::Enum));
        let mut i = input(&t, "_mood");
        i.enum_values = &labels;
        assert_eq!(format_orm_type(&i).unwrap().to_string(), "ARRAY(ENUM('a'))");
    }

    #[test]
    fn test_ranges() {
        let t = PgType::Range(Box::new(PgType::DateTime));
        assert_eq!(
            format_orm_type(&input(&t, "tstzrange")).unwrap().to_string(),
            "RANGE(DATE)"
        );
    }

    #[test]
    fn test_composite_is_unsupported() {
        let err = format_orm_type(&input(&PgType::Composite, "address")).unwrap_err();
        assert_eq!(err.kind, "composite");
        assert_eq!(err.udt_name, "address");
    }

    #[test]
    fn test_simple_types() {
        for (t, expected) in [
            (PgType::DateTime, "DATE"),
            (PgType::Date, "DATEONLY"),
            (PgType::JsonB, "JSONB"),
            (PgType::Uuid, "UUID"),
            (PgType::BigInt, "BIGINT"),
        ] {
            assert_eq!(format_orm_type(&input(&t, "")).unwrap().to_string(), expected);
        }
    }
}
