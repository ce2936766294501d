//! pgscribe schema - PostgreSQL catalog type mapping and code generation
//!
//! This crate turns raw PostgreSQL catalog rows into assembled column
//! descriptors and renders them as Sequelize models, migration scripts,
//! TypeScript declarations and DBML diagrams.
//!
//! # Features
//!
//! - **Type pipeline**: classification, default normalization, ORM type
//!   formatting and TypeScript type resolution for every column
//! - **Catalog seam**: the [`Catalog`] trait abstracts the metadata queries so
//!   the assembler can run against a live database or an in-memory fixture
//! - **Structured generation**: every artifact is built as a serializable
//!   document first and rendered through Handlebars templates
//!
//! # Example
//!
//! ```rust,no_run
//! use pgscribe_schema::{Assembler, AssembleOptions, Catalog};
//! use pgscribe_schema::codegen::{CodeGenerator, ModelGenerator};
//!
//! # async fn example(catalog: &dyn Catalog) -> Result<(), Box<dyn std::error::Error>> {
//! let options = AssembleOptions::default();
//! let schema = Assembler::new(catalog).assemble_schema(&options).await?;
//!
//! let output = ModelGenerator::new()?.generate_schema(&schema)?;
//! for file in &output.files {
//!     println!("{}", file.path.display());
//! }
//! # Ok(())
//! # }
//! ```

use thiserror::Error;

pub mod assemble;
pub mod catalog;
pub mod codegen;
pub mod typemap;
pub mod types;

pub use assemble::{AssembleOptions, Assembler};
pub use catalog::{Catalog, CatalogError, CatalogResult};
pub use typemap::{NormalizedDefault, OrmType, PgType, UnsupportedType};
pub use types::*;

/// Schema system errors
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Unsupported user-defined type in {table}.{column}: {source}")]
    UnsupportedUserType {
        table: String,
        column: String,
        #[source]
        source: UnsupportedType,
    },

    #[error("Invalid JSON for interface {interface}: {source}")]
    JsonInterface {
        interface: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Code generation error: {0}")]
    CodeGen(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Template error: {0}")]
    Template(#[from] handlebars::RenderError),
}

pub type Result<T> = std::result::Result<T, SchemaError>;
