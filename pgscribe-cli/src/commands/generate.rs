//! `pgscribe generate <target>`: introspect, render and write artifacts

use crate::commands::db::connect;
use crate::config::{masked_url, AppConfig, GenerateConfig};
use crate::output::{clean_output, write_files};
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use clap::{Args, ValueEnum};
use pgscribe_schema::codegen::{
    CodeGenerator, DiagramGenerator, GenerationOutput, MigrationGenerator, ModelGenerator,
    ScaffoldGenerator, TypesGenerator,
};
use pgscribe_schema::{Assembler, SchemaModel};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Target {
    /// Sequelize models and models/index.ts
    Models,
    /// Sequelize migrations for types, tables, functions, views and triggers
    Migrations,
    /// TypeScript declarations for JSON columns
    Types,
    /// DBML diagram and README
    Diagram,
    /// Repository classes and a seeder stub
    Scaffold,
    /// Every artifact above
    All,
}

impl Target {
    const EACH: [Target; 5] = [
        Target::Models,
        Target::Migrations,
        Target::Types,
        Target::Diagram,
        Target::Scaffold,
    ];

    fn expand(self) -> Vec<Target> {
        match self {
            Target::All => Self::EACH.to_vec(),
            target => vec![target],
        }
    }

    /// Directories under the output root this target writes to
    pub fn directories(self) -> Vec<&'static str> {
        match self {
            Target::Models => vec!["models"],
            Target::Migrations => vec!["migrations"],
            Target::Types => vec!["types"],
            Target::Diagram => vec!["diagram"],
            Target::Scaffold => vec!["repositories", "seeders"],
            Target::All => Self::EACH.iter().flat_map(|t| t.directories()).collect(),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Target::Models => "models",
            Target::Migrations => "migrations",
            Target::Types => "JSON column types",
            Target::Diagram => "DBML diagram",
            Target::Scaffold => "repositories and seeder",
            Target::All => "all artifacts",
        }
    }
}

#[derive(Debug, Args)]
pub struct GenerateCommand {
    /// What to generate
    #[arg(value_enum)]
    pub target: Target,

    /// Schemas to introspect (repeatable or comma separated, default public)
    #[arg(long = "schema", value_delimiter = ',')]
    pub schemas: Vec<String>,

    /// Only these tables (bare or schema-qualified)
    #[arg(long, value_delimiter = ',')]
    pub tables: Vec<String>,

    /// Tables to leave out
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Output root directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Remove only this target's directories under the output root before writing; other files in the root are kept
    #[arg(long)]
    pub clean: bool,

    /// Also generate read-only models for views
    #[arg(long)]
    pub include_views: bool,

    /// Base timestamp for migration and seeder names (YYYYMMDDHHMMSS)
    #[arg(long)]
    pub timestamp: Option<String>,
}

impl GenerateCommand {
    /// Flags given on the command line replace the configured values
    pub fn apply(&self, config: &mut GenerateConfig) {
        if !self.schemas.is_empty() {
            config.schemas = self.schemas.clone();
        }
        if !self.tables.is_empty() {
            config.tables = self.tables.clone();
        }
        if !self.exclude.is_empty() {
            config.exclude = self.exclude.clone();
        }
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        if let Some(timestamp) = &self.timestamp {
            config.timestamp = Some(timestamp.clone());
        }
        config.clean |= self.clean;
        config.include_views |= self.include_views;
    }

    pub async fn execute(self, mut config: AppConfig) -> Result<()> {
        self.apply(&mut config.generate);
        let settings = &config.generate;
        let timestamp = settings.timestamp_base()?;

        println!("🚀 Generating {}...", self.target.label());
        println!("📍 Database: {}", masked_url(&config.database.connection_url()?));
        println!("📁 Output: {}", settings.output.display());

        let catalog = connect(&config).await?;
        let assembled = Assembler::new(&catalog)
            .assemble_schema(&settings.assemble_options())
            .await;
        catalog.close().await;
        let schema = assembled.context("Failed to read the database schema")?;
        println!(
            "📋 Found {} tables in {}",
            schema.tables.len(),
            schema.schemas.join(", ")
        );

        let output = generate(&schema, self.target, timestamp)?;

        if settings.clean {
            clean_output(&settings.output, &self.target.directories()).await?;
        }
        let written = write_files(&settings.output, &output.files).await?;
        println!("✅ Wrote {} files to {}", written.len(), settings.output.display());

        report(&schema, &output);
        Ok(())
    }
}

/// Run the generators behind `target` over an assembled schema
pub fn generate(
    schema: &SchemaModel,
    target: Target,
    timestamp: NaiveDateTime,
) -> pgscribe_schema::Result<GenerationOutput> {
    let mut output = GenerationOutput::default();
    for target in target.expand() {
        log::debug!("Running {} generator", target.label());
        let part = match target {
            Target::Models => ModelGenerator::new()?.generate_schema(schema)?,
            Target::Migrations => MigrationGenerator::new(timestamp)?.generate_schema(schema)?,
            Target::Types => TypesGenerator::new()?.generate_schema(schema)?,
            Target::Diagram => DiagramGenerator::new()?.generate_schema(schema)?,
            Target::Scaffold => ScaffoldGenerator::new(timestamp)?.generate_schema(schema)?,
            Target::All => GenerationOutput::default(),
        };
        output.extend(part);
    }
    Ok(output)
}

/// Skipped tables, one line each, with the first reason seen
fn skipped_tables(output: &GenerationOutput) -> BTreeMap<&str, &str> {
    let mut skipped = BTreeMap::new();
    for entry in &output.skipped {
        skipped
            .entry(entry.table.as_str())
            .or_insert(entry.reason.as_str());
    }
    skipped
}

fn report(schema: &SchemaModel, output: &GenerationOutput) {
    let skipped = skipped_tables(output);
    if !skipped.is_empty() {
        println!("\n⏭️  Skipped {} tables:", skipped.len());
        for (table, reason) in &skipped {
            println!("  - {}: {}", table, reason);
        }
    }

    let failures = schema.failure_count();
    if failures > 0 {
        log::warn!("{} catalog lookups failed during introspection", failures);
        println!(
            "\n⚠️  {} catalog lookups failed; affected columns fell back to defaults (run with --verbose for details)",
            failures
        );
    }

    println!("\n🎉 Generation completed!");
}
