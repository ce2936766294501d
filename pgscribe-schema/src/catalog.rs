//! Catalog seam
//!
//! Every metadata query the assembler needs is a method on [`Catalog`]. The CLI
//! implements it over a PostgreSQL pool; tests implement it in memory.

use crate::types::{
    CompositeType, DomainInfo, EnumType, ForeignKey, FunctionInfo, Index, RawColumn, TableInfo,
    TriggerInfo, UdtKind, ViewInfo,
};
use async_trait::async_trait;
use thiserror::Error;

/// Failure of a single catalog query
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("query `{query}` failed: {message}")]
    Query { query: &'static str, message: String },

    #[error("failed to decode `{column}`: {message}")]
    Decode { column: String, message: String },

    #[error("{0} not found")]
    NotFound(String),
}

impl CatalogError {
    pub fn query(query: &'static str, err: impl std::fmt::Display) -> Self {
        CatalogError::Query {
            query,
            message: err.to_string(),
        }
    }
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

/// Read access to PostgreSQL catalog metadata
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Name of the connected database
    async fn database_name(&self) -> CatalogResult<String>;

    /// Tables, views and foreign tables of a schema
    async fn list_tables(&self, schema: &str) -> CatalogResult<Vec<TableInfo>>;

    /// Columns of a table in ordinal order
    async fn columns(&self, table: &TableInfo) -> CatalogResult<Vec<RawColumn>>;

    async fn column_comment(&self, table: &TableInfo, column: &str) -> CatalogResult<Option<String>>;

    /// Primary key columns in key order
    async fn primary_key(&self, table: &TableInfo) -> CatalogResult<Vec<String>>;

    /// Sequence owned by the column (`serial`/identity), if any
    async fn owned_sequence(&self, table: &TableInfo, column: &str) -> CatalogResult<Option<String>>;

    /// Column sets of the table's unique constraints
    async fn unique_constraints(&self, table: &TableInfo) -> CatalogResult<Vec<Vec<String>>>;

    /// Classify a user-defined type (enum, domain, composite, range)
    async fn udt_kind(&self, schema: &str, name: &str) -> CatalogResult<UdtKind>;

    async fn foreign_keys(&self, table: &TableInfo) -> CatalogResult<Vec<ForeignKey>>;

    async fn indexes(&self, table: &TableInfo) -> CatalogResult<Vec<Index>>;

    async fn views(&self, schema: &str) -> CatalogResult<Vec<ViewInfo>>;

    async fn functions(&self, schema: &str) -> CatalogResult<Vec<FunctionInfo>>;

    async fn triggers(&self, schema: &str) -> CatalogResult<Vec<TriggerInfo>>;

    async fn domains(&self, schema: &str) -> CatalogResult<Vec<DomainInfo>>;

    async fn composite_types(&self, schema: &str) -> CatalogResult<Vec<CompositeType>>;

    async fn enum_types(&self, schema: &str) -> CatalogResult<Vec<EnumType>>;
}
