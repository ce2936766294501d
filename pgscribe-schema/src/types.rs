//! Catalog facts and assembled descriptors

use crate::typemap::{NormalizedDefault, OrmType, PgType, TsDeclaration, UnsupportedType};
use serde::{Deserialize, Serialize};

/// Kind of relation reported by the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Table,
    View,
    MaterializedView,
    Foreign,
}

impl TableKind {
    /// Map an information_schema `table_type` value
    pub fn from_table_type(table_type: &str) -> Self {
        match table_type.to_ascii_uppercase().as_str() {
            "VIEW" => TableKind::View,
            "MATERIALIZED VIEW" => TableKind::MaterializedView,
            "FOREIGN" | "FOREIGN TABLE" => TableKind::Foreign,
            _ => TableKind::Table,
        }
    }
}

/// One table as listed by the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    pub schema: String,
    pub name: String,
    pub kind: TableKind,
    pub comment: Option<String>,
}

impl TableInfo {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            kind: TableKind::Table,
            comment: None,
        }
    }

    /// Schema-qualified name, e.g. `public.users`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}

/// One row of column introspection, exactly as the catalog reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawColumn {
    pub table_schema: String,
    pub table_name: String,
    pub column_name: String,
    /// information_schema `data_type` (`integer`, `ARRAY`, `USER-DEFINED`, ...)
    pub data_type: String,
    pub udt_schema: String,
    /// Underlying type name (`int4`, `_text`, `mood`, ...)
    pub udt_name: String,
    pub domain_schema: Option<String>,
    pub domain_name: Option<String>,
    pub is_nullable: bool,
    pub column_default: Option<String>,
    pub numeric_precision: Option<i32>,
    pub numeric_scale: Option<i32>,
    pub character_maximum_length: Option<i32>,
    pub ordinal_position: i32,
    pub is_identity: bool,
}

impl RawColumn {
    /// Minimal builder used by catalog fixtures
    pub fn new(table: &TableInfo, column_name: &str, data_type: &str, udt_name: &str) -> Self {
        Self {
            table_schema: table.schema.clone(),
            table_name: table.name.clone(),
            column_name: column_name.to_string(),
            data_type: data_type.to_string(),
            udt_schema: "pg_catalog".to_string(),
            udt_name: udt_name.to_string(),
            domain_schema: None,
            domain_name: None,
            is_nullable: true,
            column_default: None,
            numeric_precision: None,
            numeric_scale: None,
            character_maximum_length: None,
            ordinal_position: 0,
            is_identity: false,
        }
    }

    pub fn is_user_defined(&self) -> bool {
        self.data_type.eq_ignore_ascii_case("USER-DEFINED")
    }

    pub fn is_array(&self) -> bool {
        self.data_type.eq_ignore_ascii_case("ARRAY")
    }
}

/// Attribute of a composite type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeAttribute {
    pub name: String,
    pub data_type: String,
}

/// Classification of a user-defined type, resolved by a catalog lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UdtKind {
    Base,
    Enum { labels: Vec<String> },
    Domain { base_type: String },
    Composite { attributes: Vec<CompositeAttribute> },
    Range { subtype: String },
}

impl Default for UdtKind {
    fn default() -> Self {
        UdtKind::Base
    }
}

/// Structural flags of an assembled column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnFlags {
    pub nullable: bool,
    pub primary: bool,
    pub auto_increment: bool,
    pub default_now: bool,
    pub unique: bool,
}

/// Target of a single-column foreign key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnReference {
    pub schema: String,
    pub table: String,
    pub column: String,
}

/// Generated TypeScript interface for a JSON column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JsonInterface {
    pub name: String,
    pub declarations: Vec<TsDeclaration>,
}

/// The assembled per-column record consumed by every generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub property_name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub udt_schema: String,
    pub udt_name: String,
    pub pg_type: PgType,
    pub flags: ColumnFlags,
    pub default_value_raw: Option<String>,
    pub default_value: NormalizedDefault,
    pub comment: Option<String>,
    pub orm_type: std::result::Result<OrmType, UnsupportedType>,
    pub target_type: String,
    pub target_interface: Option<JsonInterface>,
    pub enum_values: Vec<String>,
    pub max_length: Option<i32>,
    pub precision: Option<i32>,
    pub scale: Option<i32>,
    pub references: Option<ColumnReference>,
}

/// Foreign key constraint, possibly spanning several columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: String,
    pub schema: String,
    pub table: String,
    pub columns: Vec<String>,
    pub target_schema: String,
    pub target_table: String,
    pub target_columns: Vec<String>,
    pub on_update: String,
    pub on_delete: String,
}

/// Index over one or more columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub columns: Vec<String>,
    pub is_unique: bool,
    pub is_primary: bool,
    pub method: Option<String>,
}

/// Cardinality of an association between two models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationKind {
    BelongsTo,
    HasOne,
    HasMany,
    BelongsToMany,
}

impl RelationKind {
    /// Sequelize association method name
    pub fn method(&self) -> &'static str {
        match self {
            RelationKind::BelongsTo => "belongsTo",
            RelationKind::HasOne => "hasOne",
            RelationKind::HasMany => "hasMany",
            RelationKind::BelongsToMany => "belongsToMany",
        }
    }
}

/// Association derived from the foreign keys of the schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub kind: RelationKind,
    pub alias: String,
    pub target_schema: String,
    pub target_table: String,
    pub target_model: String,
    pub foreign_key: String,
    pub target_key: Option<String>,
    pub through: Option<String>,
    pub other_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewInfo {
    pub schema: String,
    pub name: String,
    pub definition: String,
    pub materialized: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub schema: String,
    pub name: String,
    /// Identity arguments, used for `DROP FUNCTION name(args)`
    pub arguments: String,
    /// Full `CREATE OR REPLACE FUNCTION` statement
    pub definition: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerInfo {
    pub schema: String,
    pub table: String,
    pub name: String,
    /// Full `CREATE TRIGGER` statement
    pub definition: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainInfo {
    pub schema: String,
    pub name: String,
    pub base_type: String,
    pub default: Option<String>,
    pub not_null: bool,
    pub checks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeType {
    pub schema: String,
    pub name: String,
    pub attributes: Vec<CompositeAttribute>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumType {
    pub schema: String,
    pub name: String,
    pub labels: Vec<String>,
}

/// A catalog lookup that failed and was treated as "feature absent"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupFailure {
    pub object: String,
    pub lookup: String,
    pub message: String,
}

/// A table with all of its assembled columns and constraints
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableModel {
    pub info: TableInfo,
    pub model_name: String,
    pub columns: Vec<ColumnDescriptor>,
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<ForeignKey>,
    pub indexes: Vec<Index>,
    pub unique_constraints: Vec<Vec<String>>,
    pub relationships: Vec<Relationship>,
    pub lookup_failures: Vec<LookupFailure>,
}

impl TableModel {
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Columns carrying a generated JSON interface
    pub fn json_interfaces(&self) -> impl Iterator<Item = &JsonInterface> {
        self.columns.iter().filter_map(|c| c.target_interface.as_ref())
    }
}

/// Everything one generation run works from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaModel {
    pub database: String,
    pub schemas: Vec<String>,
    pub tables: Vec<TableModel>,
    pub views: Vec<ViewInfo>,
    pub functions: Vec<FunctionInfo>,
    pub triggers: Vec<TriggerInfo>,
    pub domains: Vec<DomainInfo>,
    pub composites: Vec<CompositeType>,
    pub enums: Vec<EnumType>,
    pub lookup_failures: Vec<LookupFailure>,
}

impl SchemaModel {
    pub fn table(&self, schema: &str, name: &str) -> Option<&TableModel> {
        self.tables
            .iter()
            .find(|t| t.info.schema == schema && t.info.name == name)
    }

    /// Total number of failed lookups, schema-level and per table
    pub fn failure_count(&self) -> usize {
        self.lookup_failures.len()
            + self
                .tables
                .iter()
                .map(|t| t.lookup_failures.len())
                .sum::<usize>()
    }
}
