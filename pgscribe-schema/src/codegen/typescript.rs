//! Combined TypeScript declarations for JSON columns (`types/json-interfaces.ts`)

use crate::codegen::{CodeGenerator, GeneratedFile, GenerationOutput, TemplateGenerator};
use crate::typemap::TsBody;
use crate::types::{SchemaModel, TableModel};
use crate::Result;
use serde::Serialize;

const TEMPLATE: &str = include_str!("templates/json_interfaces.ts.hbs");

#[derive(Debug, Serialize)]
struct InterfacesDocument {
    database: String,
    declarations: Vec<DeclarationDocument>,
}

#[derive(Debug, Serialize)]
struct DeclarationDocument {
    name: String,
    /// `table.column` the declaration was derived from
    source: String,
    alias: Option<String>,
    properties: Vec<PropertyDocument>,
}

#[derive(Debug, Serialize)]
struct PropertyDocument {
    key: String,
    type_name: String,
}

pub struct TypesGenerator {
    template_generator: TemplateGenerator,
}

impl TypesGenerator {
    pub fn new() -> Result<Self> {
        Ok(Self {
            template_generator: TemplateGenerator::with_templates(&[("interfaces", TEMPLATE)])?,
        })
    }

    /// Render every JSON interface of the given tables, first declaration of a name wins
    pub fn generate_interfaces(&self, database: &str, tables: &[&TableModel]) -> Result<String> {
        let mut declarations: Vec<DeclarationDocument> = Vec::new();
        let mut seen: Vec<(&str, &TsBody)> = Vec::new();
        for table in tables {
            for column in &table.columns {
                let Some(interface) = &column.target_interface else {
                    continue;
                };
                for declaration in &interface.declarations {
                    if let Some((_, first)) = seen.iter().find(|(name, _)| *name == declaration.name) {
                        if **first != declaration.body {
                            log::warn!(
                                "{} from {}.{} differs from an earlier declaration of the same name; keeping the first",
                                declaration.name,
                                table.info.name,
                                column.name
                            );
                        }
                        continue;
                    }
                    seen.push((declaration.name.as_str(), &declaration.body));
                    let (alias, properties) = match &declaration.body {
                        TsBody::Alias(alias) => (Some(alias.clone()), Vec::new()),
                        TsBody::Interface(props) => (
                            None,
                            props
                                .iter()
                                .map(|p| PropertyDocument {
                                    key: p.key.clone(),
                                    type_name: p.type_name.clone(),
                                })
                                .collect(),
                        ),
                    };
                    declarations.push(DeclarationDocument {
                        name: declaration.name.clone(),
                        source: format!("{}.{}", table.info.name, column.name),
                        alias,
                        properties,
                    });
                }
            }
        }

        let document = InterfacesDocument {
            database: database.to_string(),
            declarations,
        };
        self.template_generator.render("interfaces", &document)
    }
}

impl CodeGenerator for TypesGenerator {
    /// JSON interfaces do not depend on ORM support, so no table is refused
    fn generate_table(&self, _table: &TableModel, _schema: &SchemaModel) -> Result<Vec<GeneratedFile>> {
        Ok(Vec::new())
    }

    fn generate_schema(&self, schema: &SchemaModel) -> Result<GenerationOutput> {
        let tables: Vec<&TableModel> = schema.tables.iter().collect();
        let contents = self.generate_interfaces(&schema.database, &tables)?;
        Ok(GenerationOutput {
            files: vec![GeneratedFile::new("types/json-interfaces.ts", contents)],
            skipped: Vec::new(),
        })
    }
}
