//! Sequelize model generator
//!
//! Produces one `models/<model>.ts` per table (Sequelize v6 `Model.init`
//! with a typed attributes interface, enum declarations and associations)
//! plus `models/index.ts` wiring every model together.

use crate::codegen::{
    ensure_supported, is_generated, js_key, qualified_orm_type, quoted_list, to_camel_case,
    to_pascal_case, to_snake_case, CodeGenerator, GeneratedFile, ObjectEntry, TemplateGenerator,
};
use crate::typemap::{quote, NormalizedDefault, PgType};
use crate::types::{ColumnDescriptor, RelationKind, Relationship, SchemaModel, TableModel};
use crate::Result;
use serde::Serialize;

const MODEL_TEMPLATE: &str = include_str!("templates/model.ts.hbs");
const INDEX_TEMPLATE: &str = include_str!("templates/models_index.ts.hbs");

/// File stem shared by the model, its repository and the index imports
pub fn model_file(table: &TableModel) -> String {
    to_snake_case(&table.model_name)
}

#[derive(Debug, Serialize)]
struct ModelDocument {
    model_name: String,
    comment: Option<String>,
    json_imports: Vec<String>,
    enums: Vec<EnumDocument>,
    attributes: Vec<AttributeDocument>,
    creation_optional: String,
    model_options: Vec<ObjectEntry>,
    indexes: Vec<IndexDocument>,
    associations: Vec<AssociationDocument>,
}

#[derive(Debug, Serialize)]
struct EnumDocument {
    name: String,
    members: Vec<ObjectEntry>,
}

#[derive(Debug, Serialize)]
struct AttributeDocument {
    property: String,
    ts_type: String,
    comment: Option<String>,
    options: Vec<ObjectEntry>,
}

#[derive(Debug, Serialize)]
struct IndexDocument {
    /// Already quoted for the template
    name: String,
    unique: bool,
    fields: String,
    using: Option<String>,
}

#[derive(Debug, Serialize)]
struct AssociationDocument {
    method: &'static str,
    model: String,
    options: String,
}

#[derive(Debug, Serialize)]
struct IndexFileDocument {
    models: Vec<IndexEntry>,
}

#[derive(Debug, Serialize)]
struct IndexEntry {
    name: String,
    file: String,
}

/// Sequelize model generator
pub struct ModelGenerator {
    template_generator: TemplateGenerator,
}

impl ModelGenerator {
    pub fn new() -> Result<Self> {
        let template_generator = TemplateGenerator::with_templates(&[
            ("model", MODEL_TEMPLATE),
            ("index", INDEX_TEMPLATE),
        ])?;
        Ok(Self { template_generator })
    }

    /// Render the model source for one table
    pub fn generate_model(&self, table: &TableModel, schema: &SchemaModel) -> Result<String> {
        ensure_supported(table)?;

        let attributes = table
            .columns
            .iter()
            .map(attribute)
            .collect::<Result<Vec<_>>>()?;

        let creation_optional: Vec<String> = table
            .columns
            .iter()
            .filter(|c| c.flags.auto_increment || c.flags.nullable || c.default_value.has_value())
            .map(|c| quote(&c.property_name))
            .collect();

        let document = ModelDocument {
            model_name: table.model_name.clone(),
            comment: table.info.comment.as_ref().map(|c| c.replace("*/", "* /")),
            json_imports: json_imports(table),
            enums: enums(table),
            attributes,
            creation_optional: if creation_optional.is_empty() {
                "never".to_string()
            } else {
                creation_optional.join(" | ")
            },
            model_options: vec![
                ObjectEntry::new("sequelize", "sequelize"),
                ObjectEntry::new("tableName", quote(&table.info.name)),
                ObjectEntry::new("schema", quote(&table.info.schema)),
                ObjectEntry::new("timestamps", "false"),
            ],
            indexes: table
                .indexes
                .iter()
                .filter(|index| !index.is_primary)
                .map(|index| IndexDocument {
                    name: quote(&index.name),
                    unique: index.is_unique,
                    fields: quoted_list(&index.columns),
                    using: index
                        .method
                        .as_ref()
                        .filter(|m| m.as_str() != "btree")
                        .map(|m| quote(m)),
                })
                .collect(),
            associations: table
                .relationships
                .iter()
                .filter(|r| association_target_exists(r, schema))
                .map(association)
                .collect(),
        };

        self.template_generator.render("model", &document)
    }

    /// Render `models/index.ts` for the generated tables
    pub fn generate_index(&self, tables: &[&TableModel]) -> Result<String> {
        let document = IndexFileDocument {
            models: tables
                .iter()
                .map(|t| IndexEntry {
                    name: t.model_name.clone(),
                    file: model_file(t),
                })
                .collect(),
        };
        self.template_generator.render("index", &document)
    }
}

impl CodeGenerator for ModelGenerator {
    fn generate_table(&self, table: &TableModel, schema: &SchemaModel) -> Result<Vec<GeneratedFile>> {
        let contents = self.generate_model(table, schema)?;
        Ok(vec![GeneratedFile::new(
            format!("models/{}.ts", model_file(table)),
            contents,
        )])
    }

    fn generate_shared(&self, _schema: &SchemaModel, generated: &[&TableModel]) -> Result<Vec<GeneratedFile>> {
        Ok(vec![GeneratedFile::new("models/index.ts", self.generate_index(generated)?)])
    }
}

fn attribute(column: &ColumnDescriptor) -> Result<AttributeDocument> {
    let mut options = vec![
        ObjectEntry::new("type", qualified_orm_type(column, "DataTypes")?),
        ObjectEntry::new("allowNull", column.flags.nullable.to_string()),
    ];
    if column.property_name != column.name {
        options.push(ObjectEntry::new("field", quote(&column.name)));
    }
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
    if let Some(reference) = &column.references {
        options.push(ObjectEntry::new(
            "references",
            format!(
                "{{ model: {{ tableName: {}, schema: {} }}, key: {} }}",
                quote(&reference.table),
                quote(&reference.schema),
                quote(&reference.column)
            ),
        ));
    }
    if let Some(comment) = &column.comment {
        options.push(ObjectEntry::new("comment", quote(comment)));
    }

    let ts_type = if column.flags.nullable {
        format!("{} | null", column.target_type)
    } else {
        column.target_type.clone()
    };

    Ok(AttributeDocument {
        property: js_key(&column.property_name),
        ts_type,
        comment: column.comment.as_ref().map(|c| c.replace("*/", "* /")),
        options,
    })
}

fn json_imports(table: &TableModel) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for interface in table.json_interfaces() {
        if !names.contains(&interface.name) {
            names.push(interface.name.clone());
        }
    }
    names
}

fn enums(table: &TableModel) -> Vec<EnumDocument> {
    let mut documents: Vec<EnumDocument> = Vec::new();
    for column in &table.columns {
        if column.pg_type.base() != &PgType::Enum || column.enum_values.is_empty() {
            continue;
        }
        let name = column.target_type.trim_end_matches("[]").to_string();
        if documents.iter().any(|d| d.name == name) {
            continue;
        }
        documents.push(EnumDocument {
            name,
            members: column
                .enum_values
                .iter()
                .map(|label| ObjectEntry::new(&enum_member(label), quote(label)))
                .collect(),
        });
    }
    documents
}

fn enum_member(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let member = to_pascal_case(&cleaned);
    match member.chars().next() {
        Some(first) if !first.is_ascii_digit() => member,
        _ => format!("_{}", member),
    }
}

pub(crate) fn association_target_exists(relationship: &Relationship, schema: &SchemaModel) -> bool {
    if !is_generated(schema, &relationship.target_schema, &relationship.target_table) {
        return false;
    }
    match &relationship.through {
        Some(through) => schema
            .tables
            .iter()
            .any(|t| &t.model_name == through && ensure_supported(t).is_ok()),
        None => true,
    }
}

fn association(relationship: &Relationship) -> AssociationDocument {
    let mut options = vec![format!("as: {}", quote(&relationship.alias))];
    if let Some(through) = &relationship.through {
        options.push(format!("through: models.{}", through));
    }
    options.push(format!(
        "foreignKey: {}",
        quote(&to_camel_case(&relationship.foreign_key))
    ));
    match relationship.kind {
        RelationKind::BelongsTo => {
            if let Some(key) = &relationship.target_key {
                options.push(format!("targetKey: {}", quote(&to_camel_case(key))));
            }
        }
        RelationKind::HasOne | RelationKind::HasMany => {
            if let Some(key) = &relationship.target_key {
                options.push(format!("sourceKey: {}", quote(&to_camel_case(key))));
            }
        }
        RelationKind::BelongsToMany => {
            if let Some(key) = &relationship.other_key {
                options.push(format!("otherKey: {}", quote(&to_camel_case(key))));
            }
        }
    }

    AssociationDocument {
        method: relationship.kind.method(),
        model: relationship.target_model.clone(),
        options: options.join(", "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_member_names() {
        assert_eq!(enum_member("active"), "Active");
        assert_eq!(enum_member("on-hold"), "OnHold");
        assert_eq!(enum_member("2fa"), "_2fa");
    }

    #[test]
    fn test_association_options() {
        let relationship = Relationship {
            kind: RelationKind::BelongsTo,
            alias: "author".to_string(),
            target_schema: "public".to_string(),
            target_table: "users".to_string(),
            target_model: "Users".to_string(),
            foreign_key: "author_id".to_string(),
            target_key: Some("id".to_string()),
            through: None,
            other_key: None,
        };
        let doc = association(&relationship);
        assert_eq!(doc.method, "belongsTo");
        assert_eq!(doc.model, "Users");
        assert_eq!(doc.options, "as: 'author', foreignKey: 'authorId', targetKey: 'id'");
    }
}
