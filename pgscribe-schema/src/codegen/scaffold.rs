//! Repository scaffolds and the initial seeder stub

use crate::codegen::models::{association_target_exists, model_file};
use crate::codegen::{
    ensure_supported, js_key, to_camel_case, to_pascal_case, CodeGenerator,
    GeneratedFile, TemplateGenerator,
};
use crate::typemap::{quote, PgType};
use crate::types::{ColumnDescriptor, SchemaModel, TableModel};
use crate::Result;
use chrono::NaiveDateTime;
use serde::Serialize;

const BASE_TEMPLATE: &str = include_str!("templates/base_repository.ts.hbs");
const REPOSITORY_TEMPLATE: &str = include_str!("templates/repository.ts.hbs");
const SEEDER_TEMPLATE: &str = include_str!("templates/seeder.js.hbs");

#[derive(Debug, Serialize)]
struct RepositoryDocument {
    model_name: String,
    model_file: String,
    instance: String,
    id_type: String,
    finders: Vec<FinderDocument>,
    relations: Vec<RelationFinder>,
}

#[derive(Debug, Serialize)]
struct FinderDocument {
    method: String,
    property: String,
    ts_type: String,
}

#[derive(Debug, Serialize)]
struct RelationFinder {
    method: String,
    alias: String,
}

#[derive(Debug, Serialize)]
struct SeederDocument {
    tables: Vec<SeedTable>,
    reversed: Vec<SeedTable>,
}

#[derive(Debug, Clone, Serialize)]
struct SeedTable {
    table_ref: String,
    sample: String,
}

pub struct ScaffoldGenerator {
    template_generator: TemplateGenerator,
    timestamp: NaiveDateTime,
}

impl ScaffoldGenerator {
    /// `timestamp` names the seeder file
    pub fn new(timestamp: NaiveDateTime) -> Result<Self> {
        Ok(Self {
            template_generator: TemplateGenerator::with_templates(&[
                ("base", BASE_TEMPLATE),
                ("repository", REPOSITORY_TEMPLATE),
                ("seeder", SEEDER_TEMPLATE),
            ])?,
            timestamp,
        })
    }

    pub fn generate_repository(&self, table: &TableModel, schema: &SchemaModel) -> Result<String> {
        ensure_supported(table)?;

        let finders = table
            .columns
            .iter()
            .filter(|c| c.flags.unique && !c.flags.primary)
            .map(|c| FinderDocument {
                method: to_pascal_case(&c.property_name),
                property: js_key(&c.property_name),
                ts_type: c.target_type.clone(),
            })
            .collect();

        let relations = table
            .relationships
            .iter()
            .filter(|r| association_target_exists(r, schema))
            .map(|r| RelationFinder {
                method: to_pascal_case(&r.alias),
                alias: quote(&r.alias),
            })
            .collect();

        let id_type = match table.primary_key.as_slice() {
            [single] => table
                .column(single)
                .map(|c| c.target_type.clone())
                .unwrap_or_else(|| "number | string".to_string()),
            _ => "number | string".to_string(),
        };

        let document = RepositoryDocument {
            model_name: table.model_name.clone(),
            model_file: model_file(table),
            instance: format!("{}Repository", to_camel_case(&table.model_name)),
            id_type,
            finders,
            relations,
        };
        self.template_generator.render("repository", &document)
    }

    /// Seeder stub with one commented `bulkInsert` per table, parents first
    pub fn generate_seeder(&self, tables: &[&TableModel]) -> Result<String> {
        let ordered: Vec<SeedTable> = dependency_order(tables)
            .into_iter()
            .map(|table| SeedTable {
                table_ref: format!(
                    "{{ tableName: {}, schema: {} }}",
                    quote(&table.info.name),
                    quote(&table.info.schema)
                ),
                sample: table
                    .columns
                    .iter()
                    .filter(|c| !c.flags.auto_increment && !c.default_value.has_value())
                    .map(|c| format!("{}: {}", js_key(&c.name), placeholder(c)))
                    .collect::<Vec<_>>()
                    .join(", "),
            })
            .collect();

        let document = SeederDocument {
            reversed: ordered.iter().rev().cloned().collect(),
            tables: ordered,
        };
        self.template_generator.render("seeder", &document)
    }
}

impl CodeGenerator for ScaffoldGenerator {
    fn generate_table(&self, table: &TableModel, schema: &SchemaModel) -> Result<Vec<GeneratedFile>> {
        let contents = self.generate_repository(table, schema)?;
        Ok(vec![GeneratedFile::new(
            format!("repositories/{}.repository.ts", model_file(table)),
            contents,
        )])
    }

    fn generate_shared(&self, _schema: &SchemaModel, generated: &[&TableModel]) -> Result<Vec<GeneratedFile>> {
        let base = self.template_generator.render("base", &serde_json::json!({}))?;
        let seeder = self.generate_seeder(generated)?;
        Ok(vec![
            GeneratedFile::new("repositories/base.repository.ts", base),
            GeneratedFile::new(
                format!(
                    "seeders/{}-initial_seed.js",
                    self.timestamp.format("%Y%m%d%H%M%S")
                ),
                seeder,
            ),
        ])
    }
}

fn placeholder(column: &ColumnDescriptor) -> &'static str {
    if column.flags.nullable {
        return "null";
    }
    match column.pg_type {
        PgType::Integer
        | PgType::SmallInt
        | PgType::Float
        | PgType::Real
        | PgType::Double => "0",
        PgType::BigInt | PgType::Decimal => "'0'",
        PgType::Boolean => "false",
        PgType::DateTime | PgType::Date => "new Date()",
        PgType::Json | PgType::JsonB => "JSON.stringify({})",
        PgType::Array(_) => "[]",
        PgType::Uuid => "Sequelize.literal('gen_random_uuid()')",
        PgType::String
        | PgType::Text
        | PgType::CiText
        | PgType::Time
        | PgType::Enum
        | PgType::Blob
        | PgType::Range(_)
        | PgType::Composite => "''",
    }
}

/// Tables ordered so foreign key targets come before the tables referencing them
fn dependency_order<'t>(tables: &[&'t TableModel]) -> Vec<&'t TableModel> {
    let mut ordered: Vec<&TableModel> = Vec::with_capacity(tables.len());
    let mut remaining: Vec<&TableModel> = tables.to_vec();

    while !remaining.is_empty() {
        let ready = remaining.iter().position(|table| {
            table.foreign_keys.iter().all(|fk| {
                let self_reference =
                    fk.target_schema == table.info.schema && fk.target_table == table.info.name;
                let pending = remaining.iter().any(|other| {
                    other.info.schema == fk.target_schema && other.info.name == fk.target_table
                });
                self_reference || !pending
            })
        });
        // cycles fall back to declaration order
        let next = ready.unwrap_or(0);
        ordered.push(remaining.remove(next));
    }
    ordered
}
