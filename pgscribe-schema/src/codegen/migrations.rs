//! Sequelize migration generator
//!
//! Files are named `<YYYYMMDDHHMMSS>-<suffix>.js`. Timestamps start at the
//! generator's base time and increase by one second per file, in dependency
//! order: domains, composite types, tables, functions, views, triggers and
//! finally one foreign key file per table.

use crate::codegen::{
    ensure_supported, is_generated, js_key, qualified_orm_type, quoted_list, to_snake_case,
    CodeGenerator, GeneratedFile, GenerationOutput, ObjectEntry, SkippedTable, TemplateGenerator,
};
use crate::typemap::{quote, NormalizedDefault};
use crate::types::*;
use crate::{Result, SchemaError};
use chrono::NaiveDateTime;
use serde::Serialize;

const TABLE_TEMPLATE: &str = include_str!("templates/migration_table.js.hbs");
const FOREIGN_KEYS_TEMPLATE: &str = include_str!("templates/migration_foreign_keys.js.hbs");
const SQL_TEMPLATE: &str = include_str!("templates/migration_sql.js.hbs");

#[derive(Debug, Serialize)]
struct TableMigration {
    table_ref: String,
    columns: Vec<ColumnMigration>,
    indexes: Vec<IndexMigration>,
}

#[derive(Debug, Serialize)]
struct ColumnMigration {
    key: String,
    options: Vec<ObjectEntry>,
}

#[derive(Debug, Serialize)]
struct IndexMigration {
    name: String,
    fields: String,
    unique: bool,
    using: Option<String>,
}

#[derive(Debug, Serialize)]
struct ForeignKeyMigration {
    table_ref: String,
    constraints: Vec<ConstraintMigration>,
}

#[derive(Debug, Serialize)]
struct ConstraintMigration {
    name: String,
    fields: String,
    target_ref: String,
    target_fields: String,
    on_update: String,
    on_delete: String,
}

/// Raw SQL migration with its reverse statement
#[derive(Debug, Serialize)]
struct SqlMigration {
    description: String,
    up: String,
    down: String,
}

/// Sequelize migration generator
pub struct MigrationGenerator {
    template_generator: TemplateGenerator,
    base: NaiveDateTime,
}

impl MigrationGenerator {
    /// Create a generator whose first file is stamped with `base`
    pub fn new(base: NaiveDateTime) -> Result<Self> {
        let template_generator = TemplateGenerator::with_templates(&[
            ("table", TABLE_TEMPLATE),
            ("foreign_keys", FOREIGN_KEYS_TEMPLATE),
            ("sql", SQL_TEMPLATE),
        ])?;
        Ok(Self {
            template_generator,
            base,
        })
    }

    fn timestamp(&self, sequence: usize) -> String {
        (self.base + chrono::Duration::seconds(sequence as i64))
            .format("%Y%m%d%H%M%S")
            .to_string()
    }

    fn file(&self, sequence: usize, suffix: &str, contents: String) -> GeneratedFile {
        GeneratedFile::new(
            format!("migrations/{}-{}.js", self.timestamp(sequence), suffix),
            contents,
        )
    }

    /// Render the `createTable` migration of one table
    pub fn generate_create_table(&self, table: &TableModel) -> Result<String> {
        ensure_supported(table)?;

        let columns = table
            .columns
            .iter()
            .map(|column| {
                Ok(ColumnMigration {
                    key: js_key(&column.name),
                    options: column_options(column)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let indexes = table
            .indexes
            .iter()
            .filter(|index| !index.is_primary && !backs_unique_column(table, index))
            .map(|index| IndexMigration {
                name: quote(&index.name),
                fields: quoted_list(&index.columns),
                unique: index.is_unique,
                using: index
                    .method
                    .as_ref()
                    .filter(|m| m.as_str() != "btree")
                    .map(|m| quote(m)),
            })
            .collect();

        let document = TableMigration {
            table_ref: table_ref(&table.info.schema, &table.info.name),
            columns,
            indexes,
        };
        self.template_generator.render("table", &document)
    }

    /// Render the foreign key migration of one table, if any key targets a generated table
    pub fn generate_foreign_keys(&self, table: &TableModel, schema: &SchemaModel) -> Result<Option<String>> {
        let constraints: Vec<ConstraintMigration> = table
            .foreign_keys
            .iter()
            .filter(|fk| is_generated(schema, &fk.target_schema, &fk.target_table))
            .map(|fk| ConstraintMigration {
                name: quote(&fk.name),
                fields: quoted_list(&fk.columns),
                target_ref: table_ref(&fk.target_schema, &fk.target_table),
                target_fields: quoted_list(&fk.target_columns),
                on_update: quote(&fk.on_update),
                on_delete: quote(&fk.on_delete),
            })
            .collect();

        if constraints.is_empty() {
            return Ok(None);
        }
        let document = ForeignKeyMigration {
            table_ref: table_ref(&table.info.schema, &table.info.name),
            constraints,
        };
        self.template_generator.render("foreign_keys", &document).map(Some)
    }

    fn render_sql(&self, migration: SqlMigration) -> Result<String> {
        let migration = SqlMigration {
            description: migration.description,
            up: template_literal(&migration.up),
            down: template_literal(&migration.down),
        };
        self.template_generator.render("sql", &migration)
    }
}

impl CodeGenerator for MigrationGenerator {
    fn generate_table(&self, table: &TableModel, _schema: &SchemaModel) -> Result<Vec<GeneratedFile>> {
        let contents = self.generate_create_table(table)?;
        Ok(vec![self.file(
            0,
            &format!("create_{}_table", to_snake_case(&table.info.name)),
            contents,
        )])
    }

    /// Every migration of the schema, stamped in dependency order
    fn generate_schema(&self, schema: &SchemaModel) -> Result<GenerationOutput> {
        let mut output = GenerationOutput::default();
        let mut pending: Vec<(String, String)> = Vec::new();

        for domain in &schema.domains {
            pending.push((
                format!("create_{}_domain", to_snake_case(&domain.name)),
                self.render_sql(domain_sql(domain))?,
            ));
        }
        for composite in &schema.composites {
            pending.push((
                format!("create_{}_type", to_snake_case(&composite.name)),
                self.render_sql(composite_sql(composite))?,
            ));
        }

        let mut generated = Vec::new();
        for table in &schema.tables {
            if !matches!(table.info.kind, TableKind::Table | TableKind::Foreign) {
                continue;
            }
            match self.generate_create_table(table) {
                Ok(contents) => {
                    pending.push((format!("create_{}_table", to_snake_case(&table.info.name)), contents));
                    generated.push(table);
                }
                Err(err @ SchemaError::UnsupportedUserType { .. }) => {
                    log::warn!("Skipping {}: {}", table.info.qualified_name(), err);
                    output.skipped.push(SkippedTable {
                        table: table.info.qualified_name(),
                        reason: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        for function in &schema.functions {
            pending.push((
                format!("create_{}_function", to_snake_case(&function.name)),
                self.render_sql(function_sql(function))?,
            ));
        }
        for view in &schema.views {
            pending.push((
                format!("create_{}_view", to_snake_case(&view.name)),
                self.render_sql(view_sql(view))?,
            ));
        }
        for trigger in &schema.triggers {
            if !generated
                .iter()
                .any(|t| t.info.schema == trigger.schema && t.info.name == trigger.table)
            {
                continue;
            }
            pending.push((
                format!("create_{}_trigger", to_snake_case(&trigger.name)),
                self.render_sql(trigger_sql(trigger))?,
            ));
        }

        for table in &generated {
            if let Some(contents) = self.generate_foreign_keys(table, schema)? {
                pending.push((
                    format!("add_{}_foreign_keys", to_snake_case(&table.info.name)),
                    contents,
                ));
            }
        }

        output.files = pending
            .into_iter()
            .enumerate()
            .map(|(sequence, (suffix, contents))| self.file(sequence, &suffix, contents))
            .collect();
        Ok(output)
    }
}

fn column_options(column: &ColumnDescriptor) -> Result<Vec<ObjectEntry>> {
    let mut options = vec![
        ObjectEntry::new("type", qualified_orm_type(column, "Sequelize")?),
        ObjectEntry::new("allowNull", column.flags.nullable.to_string()),
    ];
    if column.flags.primary {
        options.push(ObjectEntry::new("primaryKey", "true"));
    }
    if column.flags.auto_increment {
        options.push(ObjectEntry::new("autoIncrement", "true"));
    }
    if column.flags.unique && !column.flags.primary {
        options.push(ObjectEntry::new("unique", "true"));
    }
    match &column.default_value {
        NormalizedDefault::Now(expr) => options.push(ObjectEntry::new(
            "defaultValue",
            format!("Sequelize.literal({})", quote(expr)),
        )),
        NormalizedDefault::Literal(value) => {
            options.push(ObjectEntry::new("defaultValue", value.clone()))
        }
        NormalizedDefault::Empty | NormalizedDefault::Sequence => {}
    }
    if let Some(comment) = &column.comment {
        options.push(ObjectEntry::new("comment", quote(comment)));
    }
    Ok(options)
}

/// Single-column unique indexes are already expressed by `unique: true`
fn backs_unique_column(table: &TableModel, index: &Index) -> bool {
    index.is_unique
        && index.columns.len() == 1
        && table
            .unique_constraints
            .iter()
            .any(|set| set.len() == 1 && set[0] == index.columns[0])
}

fn table_ref(schema: &str, table: &str) -> String {
    format!("{{ tableName: {}, schema: {} }}", quote(table), quote(schema))
}

fn ident(schema: &str, name: &str) -> String {
    format!(
        "\"{}\".\"{}\"",
        schema.replace('"', "\"\""),
        name.replace('"', "\"\"")
    )
}

fn statement(sql: &str) -> String {
    let trimmed = sql.trim();
    if trimmed.ends_with(';') {
        trimmed.to_string()
    } else {
        format!("{};", trimmed)
    }
}

/// Escape SQL for a JavaScript template literal
fn template_literal(sql: &str) -> String {
    sql.replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace("${", "\\${")
}

fn domain_sql(domain: &DomainInfo) -> SqlMigration {
    let name = ident(&domain.schema, &domain.name);
    let mut up = format!("CREATE DOMAIN {} AS {}", name, domain.base_type);
    if let Some(default) = &domain.default {
        up.push_str(&format!(" DEFAULT {}", default));
    }
    if domain.not_null {
        up.push_str(" NOT NULL");
    }
    for check in &domain.checks {
        up.push_str(&format!(" {}", check));
    }
    SqlMigration {
        description: format!("domain {}.{}", domain.schema, domain.name),
        up: statement(&up),
        down: format!("DROP DOMAIN IF EXISTS {};", name),
    }
}

fn composite_sql(composite: &CompositeType) -> SqlMigration {
    let name = ident(&composite.schema, &composite.name);
    let attributes = composite
        .attributes
        .iter()
        .map(|a| format!("  \"{}\" {}", a.name.replace('"', "\"\""), a.data_type))
        .collect::<Vec<_>>()
        .join(",\n");
    SqlMigration {
        description: format!("composite type {}.{}", composite.schema, composite.name),
        up: format!("CREATE TYPE {} AS (\n{}\n);", name, attributes),
        down: format!("DROP TYPE IF EXISTS {};", name),
    }
}

fn function_sql(function: &FunctionInfo) -> SqlMigration {
    SqlMigration {
        description: format!("function {}.{}({})", function.schema, function.name, function.arguments),
        up: statement(&function.definition),
        down: format!(
            "DROP FUNCTION IF EXISTS {}({});",
            ident(&function.schema, &function.name),
            function.arguments
        ),
    }
}

fn view_sql(view: &ViewInfo) -> SqlMigration {
    let name = ident(&view.schema, &view.name);
    let (create, kind) = if view.materialized {
        ("CREATE MATERIALIZED VIEW", "MATERIALIZED VIEW")
    } else {
        ("CREATE OR REPLACE VIEW", "VIEW")
    };
    SqlMigration {
        description: format!("{} {}.{}", kind.to_lowercase(), view.schema, view.name),
        up: statement(&format!("{} {} AS\n{}", create, name, view.definition.trim())),
        down: format!("DROP {} IF EXISTS {};", kind, name),
    }
}

fn trigger_sql(trigger: &TriggerInfo) -> SqlMigration {
    SqlMigration {
        description: format!("trigger {} on {}.{}", trigger.name, trigger.schema, trigger.table),
        up: statement(&trigger.definition),
        down: format!(
            "DROP TRIGGER IF EXISTS \"{}\" ON {};",
            trigger.name.replace('"', "\"\""),
            ident(&trigger.schema, &trigger.table)
        ),
    }
}
