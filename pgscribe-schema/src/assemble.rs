//! Column descriptor assembly
//!
//! The assembler walks schemas, tables and columns strictly in order, runs
//! every column through the type pipeline and joins in the per-column catalog
//! facts (comment, primary key, sequence ownership, user-defined type kind).
//!
//! Per-object lookups are best effort: a failed query is logged, recorded as a
//! [`LookupFailure`] and treated as "feature absent" so one broken lookup does
//! not abort the run. Listing tables and reading columns are not optional and
//! propagate their errors.

use crate::catalog::{Catalog, CatalogResult};
use crate::codegen::{pluralize, to_camel_case, to_pascal_case};
use crate::typemap::{
    classify, classify_column, format_orm_type, interface_from_json, normalize_default,
    resolve_ts_type, type_params, NormalizedDefault, OrmTypeInput, PgType,
};
use crate::types::*;
use crate::Result;
use std::collections::HashSet;

/// Which part of the database a run covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembleOptions {
    pub schemas: Vec<String>,
    /// Only these tables (bare or schema-qualified names); empty means all
    pub tables: Vec<String>,
    pub exclude: Vec<String>,
    /// Also assemble views as read-only models
    pub include_views: bool,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            schemas: vec!["public".to_string()],
            tables: Vec::new(),
            exclude: Vec::new(),
            include_views: false,
        }
    }
}

impl AssembleOptions {
    pub fn includes(&self, table: &TableInfo) -> bool {
        let kind_ok = match table.kind {
            TableKind::Table | TableKind::Foreign => true,
            TableKind::View | TableKind::MaterializedView => self.include_views,
        };
        if !kind_ok {
            return false;
        }
        let matches = |candidate: &String| {
            *candidate == table.name || *candidate == table.qualified_name()
        };
        if !self.tables.is_empty() && !self.tables.iter().any(matches) {
            return false;
        }
        !self.exclude.iter().any(matches)
    }
}

/// Keys of a table the column assembly joins against
struct TableKeys<'t> {
    primary_key: &'t [String],
    foreign_keys: &'t [ForeignKey],
    unique_constraints: &'t [Vec<String>],
}

/// Builds [`SchemaModel`]s from a [`Catalog`]
pub struct Assembler<'a, C: ?Sized> {
    catalog: &'a C,
}

impl<'a, C: Catalog + ?Sized> Assembler<'a, C> {
    pub fn new(catalog: &'a C) -> Self {
        Self { catalog }
    }

    /// Assemble every selected table plus the schema-level objects
    pub async fn assemble_schema(&self, options: &AssembleOptions) -> Result<SchemaModel> {
        let mut failures = Vec::new();
        let database = absent(
            &mut failures,
            "database",
            "database_name",
            self.catalog.database_name().await,
        );

        let mut selected = Vec::new();
        for schema in &options.schemas {
            let tables = self.catalog.list_tables(schema).await?;
            log::debug!("Schema {} lists {} relations", schema, tables.len());
            selected.extend(tables.into_iter().filter(|t| options.includes(t)));
        }

        let names = model_names(&selected);
        let mut tables = Vec::with_capacity(selected.len());
        for (info, model_name) in selected.iter().zip(names) {
            log::info!("Assembling {} as {}", info.qualified_name(), model_name);
            tables.push(self.assemble_table(info, &model_name).await?);
        }
        derive_relationships(&mut tables);

        let table_names: HashSet<(&str, &str)> = tables
            .iter()
            .map(|t| (t.info.schema.as_str(), t.info.name.as_str()))
            .collect();

        let mut model = SchemaModel {
            database,
            schemas: options.schemas.clone(),
            ..SchemaModel::default()
        };
        for schema in &options.schemas {
            model.views.extend(absent(&mut failures, schema, "views", self.catalog.views(schema).await));
            model
                .functions
                .extend(absent(&mut failures, schema, "functions", self.catalog.functions(schema).await));
            let triggers = absent(&mut failures, schema, "triggers", self.catalog.triggers(schema).await);
            model.triggers.extend(
                triggers
                    .into_iter()
                    .filter(|t| table_names.contains(&(t.schema.as_str(), t.table.as_str()))),
            );
            model
                .domains
                .extend(absent(&mut failures, schema, "domains", self.catalog.domains(schema).await));
            model.composites.extend(absent(
                &mut failures,
                schema,
                "composite_types",
                self.catalog.composite_types(schema).await,
            ));
            model
                .enums
                .extend(absent(&mut failures, schema, "enum_types", self.catalog.enum_types(schema).await));
        }
        model.tables = tables;
        model.lookup_failures = failures;
        Ok(model)
    }

    /// Assemble one table; relationships are filled in by [`derive_relationships`]
    pub async fn assemble_table(&self, info: &TableInfo, model_name: &str) -> Result<TableModel> {
        let mut failures = Vec::new();
        let object = info.qualified_name();

        // constraints first: column linkage depends on them
        let foreign_keys = absent(&mut failures, &object, "foreign_keys", self.catalog.foreign_keys(info).await);
        let primary_key = absent(&mut failures, &object, "primary_key", self.catalog.primary_key(info).await);
        let unique_constraints = absent(
            &mut failures,
            &object,
            "unique_constraints",
            self.catalog.unique_constraints(info).await,
        );
        let indexes = absent(&mut failures, &object, "indexes", self.catalog.indexes(info).await);

        let raw_columns = self.catalog.columns(info).await?;
        let keys = TableKeys {
            primary_key: &primary_key,
            foreign_keys: &foreign_keys,
            unique_constraints: &unique_constraints,
        };

        let mut columns = Vec::with_capacity(raw_columns.len());
        for raw in &raw_columns {
            columns.push(
                self.assemble_column(info, model_name, raw, &keys, &mut failures)
                    .await?,
            );
        }

        Ok(TableModel {
            info: info.clone(),
            model_name: model_name.to_string(),
            columns,
            primary_key,
            foreign_keys,
            indexes,
            unique_constraints,
            relationships: Vec::new(),
            lookup_failures: failures,
        })
    }

    async fn assemble_column(
        &self,
        info: &TableInfo,
        model_name: &str,
        raw: &RawColumn,
        keys: &TableKeys<'_>,
        failures: &mut Vec<LookupFailure>,
    ) -> Result<ColumnDescriptor> {
        let object = format!("{}.{}", info.qualified_name(), raw.column_name);

        let kind = match (&raw.domain_schema, &raw.domain_name) {
            (Some(schema), Some(name)) => {
                absent(failures, &object, "udt_kind", self.catalog.udt_kind(schema, name).await)
            }
            _ if needs_udt_lookup(raw) => {
                let name = element_udt(raw);
                absent(failures, &object, "udt_kind", self.catalog.udt_kind(&raw.udt_schema, name).await)
            }
            _ => UdtKind::Base,
        };

        let pg_type = resolve_pg_type(raw, &kind);

        let mut precision = raw.numeric_precision;
        let mut scale = raw.numeric_scale;
        let mut max_length = raw.character_maximum_length;
        if let UdtKind::Domain { base_type } = &kind {
            let (first, second) = type_params(base_type);
            match pg_type {
                PgType::Decimal => {
                    precision = precision.or(first.map(|p| p as i32));
                    scale = scale.or(second.map(|s| s as i32));
                }
                PgType::String => max_length = max_length.or(first.map(|l| l as i32)),
                _ => {}
            }
        }

        let enum_values = match &kind {
            UdtKind::Enum { labels } => labels.clone(),
            _ => Vec::new(),
        };

        let default_value = normalize_default(raw.column_default.as_deref(), &pg_type);

        let primary = keys.primary_key.iter().any(|c| *c == raw.column_name);
        let unique = keys
            .unique_constraints
            .iter()
            .any(|set| set.len() == 1 && set[0] == raw.column_name);

        let mut auto_increment = default_value.is_sequence() || raw.is_identity;
        if !auto_increment && matches!(pg_type, PgType::Integer | PgType::BigInt | PgType::SmallInt) {
            auto_increment = absent(
                failures,
                &object,
                "owned_sequence",
                self.catalog.owned_sequence(info, &raw.column_name).await,
            )
            .is_some();
        }

        let comment = absent(
            failures,
            &object,
            "column_comment",
            self.catalog.column_comment(info, &raw.column_name).await,
        );

        let orm_type = format_orm_type(&OrmTypeInput {
            pg_type: &pg_type,
            udt_name: &raw.udt_name,
            max_length,
            precision,
            scale,
            enum_values: &enum_values,
        });
        if let Err(unsupported) = &orm_type {
            log::warn!("{}: {}", object, unsupported);
        }

        let resolved = resolve_ts_type(&pg_type, &raw.udt_name, model_name, &raw.column_name);
        let target_interface = match resolved.interface {
            Some(name) => {
                let sample = match (&default_value, pg_type.is_json()) {
                    (NormalizedDefault::Literal(json), true) => json.as_str(),
                    _ => "{}",
                };
                let declarations = interface_from_json(&name, sample)?;
                Some(JsonInterface { name, declarations })
            }
            None => None,
        };

        let references = keys
            .foreign_keys
            .iter()
            .find(|fk| fk.columns.len() == 1 && fk.columns[0] == raw.column_name)
            .map(|fk| ColumnReference {
                schema: fk.target_schema.clone(),
                table: fk.target_table.clone(),
                column: fk.target_columns.first().cloned().unwrap_or_default(),
            });

        Ok(ColumnDescriptor {
            name: raw.column_name.clone(),
            property_name: to_camel_case(&raw.column_name),
            data_type: raw.data_type.clone(),
            udt_schema: raw.udt_schema.clone(),
            udt_name: raw.udt_name.clone(),
            flags: ColumnFlags {
                nullable: raw.is_nullable,
                primary,
                auto_increment,
                default_now: default_value.is_now(),
                unique,
            },
            pg_type,
            default_value_raw: raw.column_default.clone(),
            default_value,
            comment,
            orm_type,
            target_type: resolved.type_name,
            target_interface,
            enum_values,
            max_length,
            precision,
            scale,
            references,
        })
    }
}

/// Unwrap a best-effort lookup, recording the failure
fn absent<T: Default>(
    failures: &mut Vec<LookupFailure>,
    object: &str,
    lookup: &str,
    result: CatalogResult<T>,
) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            log::warn!("{} lookup for {} failed, treating as absent: {}", lookup, object, err);
            failures.push(LookupFailure {
                object: object.to_string(),
                lookup: lookup.to_string(),
                message: err.to_string(),
            });
            T::default()
        }
    }
}

fn element_udt(raw: &RawColumn) -> &str {
    if raw.is_array() {
        raw.udt_name.trim_start_matches('_')
    } else {
        raw.udt_name.as_str()
    }
}

/// Only names the string classifier cannot place need a catalog round-trip
fn needs_udt_lookup(raw: &RawColumn) -> bool {
    if !(raw.is_user_defined() || raw.is_array()) {
        return false;
    }
    let element = element_udt(raw);
    classify(element) == PgType::String
        && !matches!(element, "varchar" | "bpchar" | "char" | "name")
}

fn resolve_pg_type(raw: &RawColumn, kind: &UdtKind) -> PgType {
    let base = match kind {
        UdtKind::Base => return classify_column(&raw.data_type, &raw.udt_name),
        UdtKind::Enum { .. } => PgType::Enum,
        UdtKind::Domain { base_type } => classify(base_type),
        UdtKind::Composite { .. } => PgType::Composite,
        UdtKind::Range { subtype } => PgType::Range(Box::new(classify(subtype))),
    };
    if raw.is_array() {
        PgType::Array(Box::new(base))
    } else {
        base
    }
}

/// PascalCase model names, schema-prefixed when a table name repeats across schemas
fn model_names(tables: &[TableInfo]) -> Vec<String> {
    tables
        .iter()
        .map(|t| {
            let base = to_pascal_case(&t.name);
            let repeated = tables.iter().filter(|o| o.name == t.name).count() > 1;
            if repeated {
                format!("{}{}", to_pascal_case(&t.schema), base)
            } else {
                base
            }
        })
        .collect()
}

/// Derive associations from foreign keys.
///
/// A foreign key from `source` to `target` yields `source.belongsTo(target)`
/// and `target.hasMany(source)`, or `hasOne` when the key columns are the
/// primary key or a unique set. A junction table whose primary key is exactly
/// its two foreign keys yields `belongsToMany` on both sides.
pub fn derive_relationships(tables: &mut [TableModel]) {
    let position = |tables: &[TableModel], schema: &str, name: &str| {
        tables
            .iter()
            .position(|t| t.info.schema == schema && t.info.name == name)
    };

    let mut pending: Vec<(usize, Relationship, String)> = Vec::new();
    for (source_idx, source) in tables.iter().enumerate() {
        for fk in &source.foreign_keys {
            if fk.columns.len() != 1 || fk.target_columns.len() != 1 {
                log::debug!("Skipping composite foreign key {} on {}", fk.name, source.info.name);
                continue;
            }
            let Some(target_idx) = position(tables, &fk.target_schema, &fk.target_table) else {
                log::debug!("Foreign key {} targets unselected table {}", fk.name, fk.target_table);
                continue;
            };
            let target = &tables[target_idx];
            let column = &fk.columns[0];
            let target_column = &fk.target_columns[0];
            let by_column = format!("By{}", to_pascal_case(column));

            let belongs_alias = match column.strip_suffix("_id") {
                Some(stem) if !stem.is_empty() => to_camel_case(stem),
                _ => to_camel_case(&target.model_name),
            };
            pending.push((
                source_idx,
                Relationship {
                    kind: RelationKind::BelongsTo,
                    alias: belongs_alias.clone(),
                    target_schema: target.info.schema.clone(),
                    target_table: target.info.name.clone(),
                    target_model: target.model_name.clone(),
                    foreign_key: column.clone(),
                    target_key: Some(target_column.clone()),
                    through: None,
                    other_key: None,
                },
                format!("{}Ref", belongs_alias),
            ));

            let one_to_one = is_unique_set(source, &fk.columns);
            let (kind, alias) = if one_to_one {
                (RelationKind::HasOne, to_camel_case(&source.model_name))
            } else {
                (RelationKind::HasMany, to_camel_case(&pluralize(&source.model_name)))
            };
            pending.push((
                target_idx,
                Relationship {
                    kind,
                    alias: alias.clone(),
                    target_schema: source.info.schema.clone(),
                    target_table: source.info.name.clone(),
                    target_model: source.model_name.clone(),
                    foreign_key: column.clone(),
                    target_key: Some(target_column.clone()),
                    through: None,
                    other_key: None,
                },
                format!("{}{}", alias, by_column),
            ));
        }

        if let Some((left, right)) = junction_keys(source) {
            let left_idx = position(tables, &left.target_schema, &left.target_table);
            let right_idx = position(tables, &right.target_schema, &right.target_table);
            if let (Some(left_idx), Some(right_idx)) = (left_idx, right_idx) {
                for (from_idx, from_fk, to_idx, to_fk) in [
                    (left_idx, left, right_idx, right),
                    (right_idx, right, left_idx, left),
                ] {
                    let to = &tables[to_idx];
                    let alias = to_camel_case(&pluralize(&to.model_name));
                    pending.push((
                        from_idx,
                        Relationship {
                            kind: RelationKind::BelongsToMany,
                            alias: alias.clone(),
                            target_schema: to.info.schema.clone(),
                            target_table: to.info.name.clone(),
                            target_model: to.model_name.clone(),
                            foreign_key: from_fk.columns[0].clone(),
                            target_key: None,
                            through: Some(source.model_name.clone()),
                            other_key: Some(to_fk.columns[0].clone()),
                        },
                        format!("{}Via{}", alias, to_pascal_case(&source.model_name)),
                    ));
                }
            }
        }
    }

    for (idx, mut relationship, fallback) in pending {
        let table = &mut tables[idx];
        let taken: HashSet<String> = table
            .relationships
            .iter()
            .map(|r| r.alias.clone())
            .chain(table.columns.iter().map(|c| c.property_name.clone()))
            .collect();
        relationship.alias = unique_alias(&relationship.alias, &fallback, &taken);
        table.relationships.push(relationship);
    }
}

fn is_unique_set(table: &TableModel, columns: &[String]) -> bool {
    let wanted: HashSet<&String> = columns.iter().collect();
    let pk: HashSet<&String> = table.primary_key.iter().collect();
    if !pk.is_empty() && pk == wanted {
        return true;
    }
    table
        .unique_constraints
        .iter()
        .any(|set| set.iter().collect::<HashSet<_>>() == wanted)
}

fn junction_keys(table: &TableModel) -> Option<(&ForeignKey, &ForeignKey)> {
    if table.foreign_keys.len() != 2 {
        return None;
    }
    let (left, right) = (&table.foreign_keys[0], &table.foreign_keys[1]);
    if left.columns.len() != 1 || right.columns.len() != 1 {
        return None;
    }
    let keyed: HashSet<&String> = [&left.columns[0], &right.columns[0]].into_iter().collect();
    let pk: HashSet<&String> = table.primary_key.iter().collect();
    (keyed.len() == 2 && pk == keyed).then_some((left, right))
}

fn unique_alias(alias: &str, fallback: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(alias) {
        return alias.to_string();
    }
    if !taken.contains(fallback) {
        return fallback.to_string();
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}{}", fallback, n);
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_filter_tables() {
        let mut options = AssembleOptions::default();
        let users = TableInfo::new("public", "users");
        let mut view = TableInfo::new("public", "active_users");
        view.kind = TableKind::View;

        assert!(options.includes(&users));
        assert!(!options.includes(&view));

        options.exclude = vec!["public.users".to_string()];
        assert!(!options.includes(&users));

        options.exclude.clear();
        options.tables = vec!["orders".to_string()];
        assert!(!options.includes(&users));
    }

    #[test]
    fn test_model_names_prefix_repeated_tables() {
        let tables = vec![
            TableInfo::new("public", "users"),
            TableInfo::new("billing", "users"),
            TableInfo::new("public", "order_items"),
        ];
        assert_eq!(
            model_names(&tables),
            vec!["PublicUsers", "BillingUsers", "OrderItems"]
        );
    }

    #[test]
    fn test_unique_alias() {
        let taken: HashSet<String> = ["posts".to_string(), "postsByEditorId".to_string()]
            .into_iter()
            .collect();
        assert_eq!(unique_alias("author", "authorRef", &taken), "author");
        assert_eq!(unique_alias("posts", "postsByEditorId", &taken), "postsByEditorId2");
    }

    #[test]
    fn test_needs_udt_lookup() {
        let table = TableInfo::new("public", "t");
        let enum_col = RawColumn::new(&table, "mood", "USER-DEFINED", "mood");
        let citext_col = RawColumn::new(&table, "email", "USER-DEFINED", "citext");
        let int_array = RawColumn::new(&table, "ids", "ARRAY", "_int4");
        let varchar_array = RawColumn::new(&table, "names", "ARRAY", "_varchar");
        let enum_array = RawColumn::new(&table, "moods", "ARRAY", "_mood");

        assert!(needs_udt_lookup(&enum_col));
        assert!(!needs_udt_lookup(&citext_col));
        assert!(!needs_udt_lookup(&int_array));
        assert!(!needs_udt_lookup(&varchar_array));
        assert!(needs_udt_lookup(&enum_array));
    }
}
