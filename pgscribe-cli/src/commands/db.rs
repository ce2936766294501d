//! Database introspection commands

mod common;
mod postgres;

use crate::config::{masked_url, AppConfig};
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use pgscribe_schema::codegen::to_pascal_case;
use pgscribe_schema::{Assembler, Catalog};

pub use common::*;
pub use postgres::PostgresCatalog;

#[derive(Debug, Args)]
pub struct DbCommand {
    #[command(subcommand)]
    pub action: DbAction,
}

#[derive(Debug, Subcommand)]
pub enum DbAction {
    /// Describe table structure as the generators see it
    Describe {
        /// Table name to describe
        table_name: String,

        /// Schema containing the table
        #[arg(long, default_value = "public")]
        schema: String,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// List tables, views and foreign tables of a schema
    ListTables {
        /// Schema to list
        #[arg(long, default_value = "public")]
        schema: String,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Test database connection
    TestConnection,
}

impl DbCommand {
    pub async fn execute(self, config: AppConfig) -> Result<()> {
        let catalog = connect(&config).await?;
        let result = match self.action {
            DbAction::Describe {
                table_name,
                schema,
                format,
            } => describe_table(&catalog, &schema, &table_name, format).await,
            DbAction::ListTables { schema, format } => list_tables(&catalog, &schema, format).await,
            DbAction::TestConnection => test_connection(&catalog).await,
        };
        catalog.close().await;
        result
    }
}

/// Open a pool for the configured database
pub async fn connect(config: &AppConfig) -> Result<PostgresCatalog> {
    let database_url = config.database.connection_url()?;
    log::info!("Connecting to {}", masked_url(&database_url));
    PostgresCatalog::connect(&database_url, config.database.max_connections)
        .await
        .with_context(|| format!("Failed to connect to {}", masked_url(&database_url)))
}

async fn test_connection(catalog: &PostgresCatalog) -> Result<()> {
    println!("🔌 Testing database connection...");

    let db_name = catalog.database_name().await?;
    println!("✅ Connection successful!");
    println!("📊 Database: {}", db_name);

    let tables = catalog.list_tables("public").await?;
    println!("📋 Tables found in public: {}", tables.len());
    Ok(())
}

async fn list_tables(catalog: &PostgresCatalog, schema: &str, format: OutputFormat) -> Result<()> {
    let tables: Vec<TableSummary> = catalog
        .list_tables(schema)
        .await?
        .into_iter()
        .map(|t| TableSummary {
            schema: t.schema,
            name: t.name,
            kind: format!("{:?}", t.kind).to_lowercase(),
            comment: t.comment,
        })
        .collect();

    if format != OutputFormat::Table {
        println!("{}", render_structured(&tables, format)?);
        return Ok(());
    }

    if tables.is_empty() {
        println!("No tables found in schema {}.", schema);
        return Ok(());
    }
    println!("📋 Tables in {}:\n", schema);
    println!("{:<35} {:<18} {}", "Table Name", "Type", "Comment");
    println!("{:-<80}", "");
    for table in &tables {
        println!(
            "{:<35} {:<18} {}",
            table.name,
            table.kind,
            table.comment.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

async fn describe_table(
    catalog: &PostgresCatalog,
    schema: &str,
    table_name: &str,
    format: OutputFormat,
) -> Result<()> {
    let info = catalog
        .list_tables(schema)
        .await?
        .into_iter()
        .find(|t| t.name == table_name)
        .with_context(|| format!("Table {}.{} not found", schema, table_name))?;

    let table = Assembler::new(catalog)
        .assemble_table(&info, &to_pascal_case(&info.name))
        .await?;
    let description = TableDescription::from_model(&table);

    if format != OutputFormat::Table {
        println!("{}", render_structured(&description, format)?);
        return Ok(());
    }

    println!("📊 Table: {} (model {})\n", description.table, description.model);
    if let Some(comment) = description.comment.as_deref().filter(|c| !c.is_empty()) {
        println!("📝 Description: {}\n", comment);
    }

    println!("📋 Columns:");
    println!(
        "{:<25} {:<20} {:<22} {:<10} {:<5} {:<15}",
        "Column", "Type", "Sequelize", "Nullable", "Key", "Default"
    );
    println!("{:-<100}", "");
    for column in &description.columns {
        println!(
            "{:<25} {:<20} {:<22} {:<10} {:<5} {:<15}",
            column.name,
            column.data_type,
            column.orm_type,
            if column.nullable { "YES" } else { "NO" },
            column.key,
            column.default.as_deref().unwrap_or("-")
        );
    }

    if !description.indexes.is_empty() {
        println!("\n📑 Indexes:");
        for index in &description.indexes {
            let unique = if index.is_unique { "UNIQUE" } else { "" };
            println!("  - {} ({}) {}", index.name, index.columns.join(", "), unique);
        }
    }

    if !description.foreign_keys.is_empty() {
        println!("\n🔗 Foreign keys:");
        for fk in &description.foreign_keys {
            println!(
                "  - {} ({}) -> {}.{} ({}) ON DELETE {}",
                fk.name,
                fk.columns.join(", "),
                fk.target_schema,
                fk.target_table,
                fk.target_columns.join(", "),
                fk.on_delete
            );
        }
    }

    if description.lookup_failures > 0 {
        println!(
            "\n⚠️  {} catalog lookups failed; run with --verbose for details",
            description.lookup_failures
        );
    }
    Ok(())
}
