//! Output shapes shared by the database commands

use clap::ValueEnum;
use pgscribe_schema::{ColumnDescriptor, ForeignKey, Index, NormalizedDefault, TableModel};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

#[derive(Debug, Serialize)]
pub struct TableSummary {
    pub schema: String,
    pub name: String,
    pub kind: String,
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TableDescription {
    pub table: String,
    pub model: String,
    pub comment: Option<String>,
    pub columns: Vec<ColumnSummary>,
    pub indexes: Vec<Index>,
    pub foreign_keys: Vec<ForeignKey>,
    pub lookup_failures: usize,
}

#[derive(Debug, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub property: String,
    pub data_type: String,
    pub orm_type: String,
    pub ts_type: String,
    pub nullable: bool,
    pub key: &'static str,
    pub default: Option<String>,
    pub comment: Option<String>,
}

impl TableDescription {
    pub fn from_model(table: &TableModel) -> Self {
        Self {
            table: table.info.qualified_name(),
            model: table.model_name.clone(),
            comment: table.info.comment.clone(),
            columns: table
                .columns
                .iter()
                .map(|column| ColumnSummary::from_descriptor(table, column))
                .collect(),
            indexes: table.indexes.clone(),
            foreign_keys: table.foreign_keys.clone(),
            lookup_failures: table.lookup_failures.len(),
        }
    }
}

impl ColumnSummary {
    fn from_descriptor(table: &TableModel, column: &ColumnDescriptor) -> Self {
        let key = if column.flags.primary {
            "PRI"
        } else if column.references.is_some()
            || table.foreign_keys.iter().any(|fk| fk.columns.contains(&column.name))
        {
            "FK"
        } else if column.flags.unique {
            "UNI"
        } else {
            ""
        };

        let default = match &column.default_value {
            NormalizedDefault::Empty => None,
            NormalizedDefault::Sequence => Some("autoincrement".to_string()),
            NormalizedDefault::Now(expr) => Some(expr.clone()),
            NormalizedDefault::Literal(value) => Some(value.clone()),
        };

        Self {
            name: column.name.clone(),
            property: column.property_name.clone(),
            data_type: if column.data_type == "USER-DEFINED" || column.data_type == "ARRAY" {
                column.udt_name.clone()
            } else {
                column.data_type.clone()
            },
            orm_type: match &column.orm_type {
                Ok(orm) => orm.to_string(),
                Err(err) => format!("unsupported ({})", err.kind),
            },
            ts_type: column.target_type.clone(),
            nullable: column.flags.nullable,
            key,
            default,
            comment: column.comment.clone(),
        }
    }
}

/// Serialize `value` as pretty JSON or YAML
pub fn render_structured<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
        OutputFormat::Json | OutputFormat::Table => serde_json::to_string_pretty(value)?,
    })
}
