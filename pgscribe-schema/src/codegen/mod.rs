//! Code generation for pgscribe
//!
//! Every generator builds a serializable document per artifact and renders it
//! through a [`TemplateGenerator`]:
//! - Sequelize models with associations
//! - Sequelize migrations (tables, foreign keys, raw SQL objects)
//! - TypeScript interfaces for JSON columns
//! - DBML diagram and README
//! - Repository scaffolds and a seeder stub

use crate::typemap::quote;
use crate::types::{ColumnDescriptor, SchemaModel, TableModel};
use crate::{Result, SchemaError};
use handlebars::Handlebars;
use serde::Serialize;
use std::path::PathBuf;

pub mod dbml;
pub mod migrations;
pub mod models;
pub mod scaffold;
pub mod typescript;

pub use dbml::DiagramGenerator;
pub use migrations::MigrationGenerator;
pub use models::ModelGenerator;
pub use scaffold::ScaffoldGenerator;
pub use typescript::TypesGenerator;

/// A rendered artifact, relative to the output root
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub contents: String,
}

impl GeneratedFile {
    pub fn new(path: impl Into<PathBuf>, contents: String) -> Self {
        Self {
            path: path.into(),
            contents,
        }
    }
}

/// A table a generator refused, with the reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedTable {
    pub table: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationOutput {
    pub files: Vec<GeneratedFile>,
    pub skipped: Vec<SkippedTable>,
}

impl GenerationOutput {
    pub fn extend(&mut self, other: GenerationOutput) {
        self.files.extend(other.files);
        for skipped in other.skipped {
            if !self.skipped.contains(&skipped) {
                self.skipped.push(skipped);
            }
        }
    }
}

/// Base trait for code generators
pub trait CodeGenerator {
    /// Generate the files belonging to a single table
    fn generate_table(&self, table: &TableModel, schema: &SchemaModel) -> Result<Vec<GeneratedFile>>;

    /// Generate files spanning every generated table (indexes, combined files)
    fn generate_shared(
        &self,
        _schema: &SchemaModel,
        _generated: &[&TableModel],
    ) -> Result<Vec<GeneratedFile>> {
        Ok(Vec::new())
    }

    /// Generate code for the entire schema.
    ///
    /// A table with a column type the ORM cannot express is skipped and
    /// reported; every other error aborts the run.
    fn generate_schema(&self, schema: &SchemaModel) -> Result<GenerationOutput> {
        let mut output = GenerationOutput::default();
        let mut generated = Vec::new();

        for table in &schema.tables {
            match self.generate_table(table, schema) {
                Ok(files) => {
                    output.files.extend(files);
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

        output.files.extend(self.generate_shared(schema, &generated)?);
        Ok(output)
    }
}

/// Fail with [`SchemaError::UnsupportedUserType`] on the first column without an ORM type
pub fn ensure_supported(table: &TableModel) -> Result<()> {
    for column in &table.columns {
        if let Err(unsupported) = &column.orm_type {
            return Err(SchemaError::UnsupportedUserType {
                table: table.info.qualified_name(),
                column: column.name.clone(),
                source: unsupported.clone(),
            });
        }
    }
    Ok(())
}

/// Whether the table targeted by a relationship or foreign key gets a model
pub fn is_generated(schema: &SchemaModel, target_schema: &str, target_table: &str) -> bool {
    schema
        .table(target_schema, target_table)
        .map_or(false, |t| ensure_supported(t).is_ok())
}

/// Qualified ORM type of a column already checked by [`ensure_supported`]
pub(crate) fn qualified_orm_type(column: &ColumnDescriptor, namespace: &str) -> Result<String> {
    column
        .orm_type
        .as_ref()
        .map(|t| t.qualified(namespace))
        .map_err(|unsupported| SchemaError::CodeGen(unsupported.to_string()))
}

/// A `key: value` pair inside a generated object literal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectEntry {
    pub key: String,
    pub value: String,
}

impl ObjectEntry {
    pub fn new(key: &str, value: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            value: value.into(),
        }
    }
}

/// Template-based code generator
pub struct TemplateGenerator {
    handlebars: Handlebars<'static>,
}

impl TemplateGenerator {
    /// Create a new template generator
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(handlebars::no_escape);

        // Register helper functions
        handlebars.register_helper("snake_case", Box::new(snake_case_helper));
        handlebars.register_helper("camel_case", Box::new(camel_case_helper));
        handlebars.register_helper("pascal_case", Box::new(pascal_case_helper));
        handlebars.register_helper("pluralize", Box::new(pluralize_helper));

        Self { handlebars }
    }

    /// Create a generator with a set of named templates registered
    pub fn with_templates(templates: &[(&str, &str)]) -> Result<Self> {
        let mut generator = Self::new();
        for (name, template) in templates {
            generator.register_template(name, template)?;
        }
        Ok(generator)
    }

    /// Register a template
    pub fn register_template(&mut self, name: &str, template: &str) -> Result<()> {
        self.handlebars
            .register_template_string(name, template)
            .map_err(|e| SchemaError::CodeGen(format!("Template registration failed: {}", e)))?;
        Ok(())
    }

    /// Render a template with a document
    pub fn render<T: Serialize>(&self, template_name: &str, document: &T) -> Result<String> {
        Ok(self.handlebars.render(template_name, document)?)
    }
}

impl Default for TemplateGenerator {
    fn default() -> Self {
        Self::new()
    }
}

// Handlebars helper functions

fn string_param<'a>(h: &'a handlebars::Helper, name: &str) -> std::result::Result<&'a str, handlebars::RenderError> {
    let param = h
        .param(0)
        .ok_or_else(|| handlebars::RenderError::new(format!("{} helper requires a parameter", name)))?;
    param
        .value()
        .as_str()
        .ok_or_else(|| handlebars::RenderError::new(format!("{} helper requires a string parameter", name)))
}

fn snake_case_helper(
    h: &handlebars::Helper,
    _: &Handlebars,
    _: &handlebars::Context,
    _: &mut handlebars::RenderContext,
    out: &mut dyn handlebars::Output,
) -> handlebars::HelperResult {
    out.write(&to_snake_case(string_param(h, "snake_case")?))?;
    Ok(())
}

fn camel_case_helper(
    h: &handlebars::Helper,
    _: &Handlebars,
    _: &handlebars::Context,
    _: &mut handlebars::RenderContext,
    out: &mut dyn handlebars::Output,
) -> handlebars::HelperResult {
    out.write(&to_camel_case(string_param(h, "camel_case")?))?;
    Ok(())
}

fn pascal_case_helper(
    h: &handlebars::Helper,
    _: &Handlebars,
    _: &handlebars::Context,
    _: &mut handlebars::RenderContext,
    out: &mut dyn handlebars::Output,
) -> handlebars::HelperResult {
    out.write(&to_pascal_case(string_param(h, "pascal_case")?))?;
    Ok(())
}

fn pluralize_helper(
    h: &handlebars::Helper,
    _: &Handlebars,
    _: &handlebars::Context,
    _: &mut handlebars::RenderContext,
    out: &mut dyn handlebars::Output,
) -> handlebars::HelperResult {
    out.write(&pluralize(string_param(h, "pluralize")?))?;
    Ok(())
}

// String transformation utilities

fn words(input: &str) -> Vec<String> {
    input
        .split(|c: char| c == '_' || c == '-' || c == ' ' || c == '.')
        .filter(|w| !w.is_empty())
        .map(|w| {
            // SHOUTING words lose their case, camelCase keeps inner capitals
            if w.chars().any(|c| c.is_lowercase()) {
                w.to_string()
            } else {
                w.to_lowercase()
            }
        })
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn decapitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn to_snake_case(input: &str) -> String {
    let mut result = String::new();
    for word in words(input) {
        let mut prev_lower = false;
        if !result.is_empty() {
            result.push('_');
        }
        for ch in word.chars() {
            if ch.is_uppercase() {
                if prev_lower {
                    result.push('_');
                }
                result.extend(ch.to_lowercase());
                prev_lower = false;
            } else {
                result.push(ch);
                prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
            }
        }
    }
    result
}

pub fn to_camel_case(input: &str) -> String {
    decapitalize(&to_pascal_case(input))
}

pub fn to_pascal_case(input: &str) -> String {
    words(input).iter().map(|w| capitalize(w)).collect()
}

pub fn pluralize(input: &str) -> String {
    let lower = input.to_lowercase();
    let already_plural = lower.ends_with('s')
        && !lower.ends_with("ss")
        && !lower.ends_with("us")
        && !lower.ends_with("is");
    if already_plural {
        input.to_string()
    } else if lower.ends_with('y')
        && !["ay", "ey", "iy", "oy", "uy"].iter().any(|s| lower.ends_with(s))
    {
        format!("{}ies", &input[..input.len() - 1])
    } else if lower.ends_with('s')
        || lower.ends_with("sh")
        || lower.ends_with("ch")
        || lower.ends_with('x')
        || lower.ends_with('z')
    {
        format!("{}es", input)
    } else if lower.ends_with("fe") {
        format!("{}ves", &input[..input.len() - 2])
    } else if lower.ends_with('f') {
        format!("{}ves", &input[..input.len() - 1])
    } else {
        format!("{}s", input)
    }
}

/// Object key as written in JavaScript/TypeScript source, quoted when needed
pub fn js_key(key: &str) -> String {
    let mut chars = key.chars();
    let is_identifier = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' || first == '$' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        }
        _ => false,
    };
    if is_identifier {
        key.to_string()
    } else {
        quote(key)
    }
}

/// Comma-separated single-quoted list: `'a', 'b'`
pub(crate) fn quoted_list<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(|item| quote(item.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}
