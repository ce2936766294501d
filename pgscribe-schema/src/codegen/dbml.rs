//! DBML diagram export (`diagram/schema.dbml` and `diagram/README.md`)

use crate::codegen::{CodeGenerator, GeneratedFile, GenerationOutput, TemplateGenerator};
use crate::typemap::{NormalizedDefault, PgType};
use crate::types::{ColumnDescriptor, ForeignKey, Index, SchemaModel, TableModel};
use crate::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

const SCHEMA_TEMPLATE: &str = include_str!("templates/schema.dbml.hbs");
const README_TEMPLATE: &str = include_str!("templates/diagram_readme.md.hbs");

static NUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("valid regex"));
static BARE_TYPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][\w]*(\(\d+(,\d+)?\))?$").expect("valid regex"));

#[derive(Debug, Serialize)]
struct DiagramDocument {
    database: String,
    project: String,
    enums: Vec<EnumDocument>,
    tables: Vec<TableDocument>,
    refs: Vec<RefDocument>,
}

#[derive(Debug, Serialize)]
struct EnumDocument {
    name: String,
    labels: Vec<String>,
}

#[derive(Debug, Serialize)]
struct TableDocument {
    name: String,
    columns: Vec<ColumnDocument>,
    indexes: Vec<IndexDocument>,
    note: Option<String>,
}

#[derive(Debug, Serialize)]
struct ColumnDocument {
    name: String,
    #[serde(rename = "type")]
    type_name: String,
    settings: String,
}

#[derive(Debug, Serialize)]
struct IndexDocument {
    columns: String,
    settings: String,
}

#[derive(Debug, Serialize)]
struct RefDocument {
    name: String,
    from: String,
    op: &'static str,
    to: String,
    settings: String,
}

#[derive(Debug, Serialize)]
struct ReadmeDocument {
    database: String,
    schemas: String,
    table_count: usize,
    ref_count: usize,
    enum_count: usize,
    tables: Vec<ReadmeTable>,
}

#[derive(Debug, Serialize)]
struct ReadmeTable {
    name: String,
    column_count: usize,
    primary_key: String,
    comment: String,
}

pub struct DiagramGenerator {
    template_generator: TemplateGenerator,
}

impl DiagramGenerator {
    pub fn new() -> Result<Self> {
        Ok(Self {
            template_generator: TemplateGenerator::with_templates(&[
                ("schema", SCHEMA_TEMPLATE),
                ("readme", README_TEMPLATE),
            ])?,
        })
    }

    /// Render `schema.dbml`
    pub fn generate_dbml(&self, schema: &SchemaModel) -> Result<String> {
        let document = DiagramDocument {
            database: schema.database.clone(),
            project: project_name(&schema.database),
            enums: schema
                .enums
                .iter()
                .map(|e| EnumDocument {
                    name: qualified(&e.schema, &e.name),
                    labels: e.labels.iter().map(|l| quoted(l)).collect(),
                })
                .collect(),
            tables: schema.tables.iter().map(table_document).collect(),
            refs: refs(schema),
        };
        self.template_generator.render("schema", &document)
    }

    /// Render the README accompanying the diagram
    pub fn generate_readme(&self, schema: &SchemaModel) -> Result<String> {
        let document = ReadmeDocument {
            database: schema.database.clone(),
            schemas: schema.schemas.join(", "),
            table_count: schema.tables.len(),
            ref_count: refs(schema).len(),
            enum_count: schema.enums.len(),
            tables: schema
                .tables
                .iter()
                .map(|t| ReadmeTable {
                    name: t.info.qualified_name(),
                    column_count: t.columns.len(),
                    primary_key: if t.primary_key.is_empty() {
                        "none".to_string()
                    } else {
                        t.primary_key.join(", ")
                    },
                    comment: t
                        .info
                        .comment
                        .as_deref()
                        .unwrap_or_default()
                        .replace('|', "\\|")
                        .replace('\n', " "),
                })
                .collect(),
        };
        self.template_generator.render("readme", &document)
    }
}

impl CodeGenerator for DiagramGenerator {
    fn generate_table(&self, _table: &TableModel, _schema: &SchemaModel) -> Result<Vec<GeneratedFile>> {
        Ok(Vec::new())
    }

    fn generate_schema(&self, schema: &SchemaModel) -> Result<GenerationOutput> {
        Ok(GenerationOutput {
            files: vec![
                GeneratedFile::new("diagram/schema.dbml", self.generate_dbml(schema)?),
                GeneratedFile::new("diagram/README.md", self.generate_readme(schema)?),
            ],
            skipped: Vec::new(),
        })
    }
}

fn project_name(database: &str) -> String {
    let name: String = database
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if name.is_empty() {
        "database".to_string()
    } else {
        name
    }
}

fn quoted(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\\\""))
}

/// `"name"` for the public schema, `"schema"."name"` otherwise
fn qualified(schema: &str, name: &str) -> String {
    if schema == "public" {
        quoted(name)
    } else {
        format!("{}.{}", quoted(schema), quoted(name))
    }
}

fn note(text: &str) -> String {
    format!("'{}'", text.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn table_document(table: &TableModel) -> TableDocument {
    TableDocument {
        name: qualified(&table.info.schema, &table.info.name),
        columns: table.columns.iter().map(column_document).collect(),
        indexes: table
            .indexes
            .iter()
            .filter(|i| !i.is_primary)
            .map(index_document)
            .collect(),
        note: table.info.comment.as_deref().map(note),
    }
}

fn column_document(column: &ColumnDescriptor) -> ColumnDocument {
    let mut settings = Vec::new();
    if column.flags.primary {
        settings.push("pk".to_string());
    }
    if column.flags.auto_increment {
        settings.push("increment".to_string());
    }
    if !column.flags.nullable && !column.flags.primary {
        settings.push("not null".to_string());
    }
    if column.flags.unique && !column.flags.primary {
        settings.push("unique".to_string());
    }
    if let Some(default) = default_setting(column) {
        settings.push(format!("default: {}", default));
    }
    if let Some(comment) = &column.comment {
        settings.push(format!("note: {}", note(comment)));
    }

    ColumnDocument {
        name: quoted(&column.name),
        type_name: dbml_type(column),
        settings: settings.join(", "),
    }
}

fn dbml_type(column: &ColumnDescriptor) -> String {
    let name = match column.data_type.as_str() {
        "ARRAY" => format!("{}[]", column.udt_name.trim_start_matches('_')),
        // must match the schema-qualified Enum declaration
        "USER-DEFINED" if !matches!(column.udt_schema.as_str(), "" | "public" | "pg_catalog") => {
            return qualified(&column.udt_schema, &column.udt_name);
        }
        "USER-DEFINED" => column.udt_name.clone(),
        _ => match (&column.pg_type, column.max_length, column.precision, column.scale) {
            (PgType::String, Some(length), _, _) if length > 0 => {
                format!("{}({})", column.udt_name, length)
            }
            (PgType::Decimal, _, Some(p), Some(s)) if p > 0 => {
                format!("{}({},{})", column.udt_name, p, s)
            }
            _ => column.udt_name.clone(),
        },
    };
    if BARE_TYPE.is_match(&name) {
        name
    } else {
        quoted(&name)
    }
}

fn default_setting(column: &ColumnDescriptor) -> Option<String> {
    match &column.default_value {
        NormalizedDefault::Empty | NormalizedDefault::Sequence => None,
        NormalizedDefault::Now(expr) => Some(format!("`{}`", expr)),
        NormalizedDefault::Literal(value) => {
            let simple = value == "null"
                || value == "true"
                || value == "false"
                || NUMERIC.is_match(value)
                || value.starts_with('\'');
            if simple {
                Some(value.clone())
            } else {
                let raw = column.default_value_raw.as_deref().unwrap_or(value);
                Some(format!("`{}`", raw.replace('`', "")))
            }
        }
    }
}

fn index_document(index: &Index) -> IndexDocument {
    let columns = if index.columns.len() == 1 {
        quoted(&index.columns[0])
    } else {
        format!(
            "({})",
            index
                .columns
                .iter()
                .map(|c| quoted(c))
                .collect::<Vec<_>>()
                .join(", ")
        )
    };
    let mut settings = Vec::new();
    if index.is_unique {
        settings.push("unique".to_string());
    }
    if index.method.as_deref() == Some("hash") {
        settings.push("type: hash".to_string());
    }
    settings.push(format!("name: {}", note(&index.name)));
    IndexDocument {
        columns,
        settings: settings.join(", "),
    }
}

fn refs(schema: &SchemaModel) -> Vec<RefDocument> {
    let mut refs = Vec::new();
    for table in &schema.tables {
        for fk in &table.foreign_keys {
            if schema.table(&fk.target_schema, &fk.target_table).is_none() {
                continue;
            }
            refs.push(ref_document(table, fk));
        }
    }
    refs
}

fn ref_document(table: &TableModel, fk: &ForeignKey) -> RefDocument {
    let endpoint = |schema: &str, name: &str, columns: &[String]| {
        let columns = if columns.len() == 1 {
            quoted(&columns[0])
        } else {
            format!(
                "({})",
                columns.iter().map(|c| quoted(c)).collect::<Vec<_>>().join(", ")
            )
        };
        format!("{}.{}", qualified(schema, name), columns)
    };

    let one_to_one = table.unique_constraints.iter().any(|set| *set == fk.columns)
        || (!table.primary_key.is_empty() && table.primary_key == fk.columns);

    let mut settings = Vec::new();
    for (action, rule) in [("update", &fk.on_update), ("delete", &fk.on_delete)] {
        let rule = rule.to_lowercase();
        if rule != "no action" && !rule.is_empty() {
            settings.push(format!("{}: {}", action, rule));
        }
    }

    RefDocument {
        name: project_name(&fk.name),
        from: endpoint(&table.info.schema, &table.info.name, &fk.columns),
        op: if one_to_one { "-" } else { ">" },
        to: endpoint(&fk.target_schema, &fk.target_table, &fk.target_columns),
        settings: settings.join(", "),
    }
}
