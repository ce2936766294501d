//! PostgreSQL catalog implementation over a sqlx pool

use anyhow::Result;
use async_trait::async_trait;
use pgscribe_schema::{
    Catalog, CatalogError, CatalogResult, CompositeAttribute, CompositeType, DomainInfo, EnumType,
    ForeignKey, FunctionInfo, Index, RawColumn, TableInfo, TableKind, TriggerInfo, UdtKind,
    ViewInfo,
};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{Decode, Pool, Postgres, Row, Type};

/// Resolves `$1.$2` to the table's oid
const RELATION: &str = "format('%I.%I', $1::text, $2::text)::regclass";

pub struct PostgresCatalog {
    pool: Pool<Postgres>,
}

impl PostgresCatalog {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn fetch_all(
        &self,
        lookup: &'static str,
        sql: &str,
        binds: &[&str],
    ) -> CatalogResult<Vec<PgRow>> {
        let mut query = sqlx::query(sql);
        for bind in binds {
            query = query.bind(*bind);
        }
        query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CatalogError::query(lookup, e))
    }

    async fn fetch_optional(
        &self,
        lookup: &'static str,
        sql: &str,
        binds: &[&str],
    ) -> CatalogResult<Option<PgRow>> {
        let mut query = sqlx::query(sql);
        for bind in binds {
            query = query.bind(*bind);
        }
        query
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CatalogError::query(lookup, e))
    }

    async fn enum_labels(&self, schema: &str, name: &str) -> CatalogResult<Vec<String>> {
        let rows = self
            .fetch_all(
                "enum_labels",
                r#"
                SELECT e.enumlabel::text AS label
                FROM pg_enum e
                JOIN pg_type t ON t.oid = e.enumtypid
                JOIN pg_namespace n ON n.oid = t.typnamespace
                WHERE n.nspname = $1 AND t.typname = $2
                ORDER BY e.enumsortorder
                "#,
                &[schema, name],
            )
            .await?;
        rows.iter().map(|row| get(row, "label")).collect()
    }

    async fn composite_attributes(&self, schema: &str, name: &str) -> CatalogResult<Vec<CompositeAttribute>> {
        let rows = self
            .fetch_all(
                "composite_attributes",
                r#"
                SELECT a.attname::text AS name,
                       format_type(a.atttypid, a.atttypmod) AS data_type
                FROM pg_attribute a
                JOIN pg_type t ON t.typrelid = a.attrelid
                JOIN pg_namespace n ON n.oid = t.typnamespace
                WHERE n.nspname = $1 AND t.typname = $2
                  AND a.attnum > 0 AND NOT a.attisdropped
                ORDER BY a.attnum
                "#,
                &[schema, name],
            )
            .await?;
        rows.iter()
            .map(|row| {
                Ok(CompositeAttribute {
                    name: get(row, "name")?,
                    data_type: get(row, "data_type")?,
                })
            })
            .collect()
    }
}

fn get<'r, T>(row: &'r PgRow, column: &str) -> CatalogResult<T>
where
    T: Decode<'r, Postgres> + Type<Postgres>,
{
    row.try_get(column).map_err(|e| CatalogError::Decode {
        column: column.to_string(),
        message: e.to_string(),
    })
}

#[async_trait]
impl Catalog for PostgresCatalog {
    async fn database_name(&self) -> CatalogResult<String> {
        let rows = self
            .fetch_all("database_name", "SELECT current_database()::text AS db_name", &[])
            .await?;
        match rows.first() {
            Some(row) => get(row, "db_name"),
            None => Err(CatalogError::NotFound("current database".to_string())),
        }
    }

    async fn list_tables(&self, schema: &str) -> CatalogResult<Vec<TableInfo>> {
        let rows = self
            .fetch_all(
                "list_tables",
                r#"
                SELECT t.table_name::text AS table_name,
                       t.table_type::text AS table_type,
                       obj_description(format('%I.%I', t.table_schema, t.table_name)::regclass, 'pg_class') AS comment
                FROM information_schema.tables t
                WHERE t.table_schema = $1
                UNION ALL
                SELECT m.matviewname::text,
                       'MATERIALIZED VIEW',
                       obj_description(format('%I.%I', m.schemaname, m.matviewname)::regclass, 'pg_class')
                FROM pg_matviews m
                WHERE m.schemaname = $1
                ORDER BY table_name
                "#,
                &[schema],
            )
            .await?;

        rows.iter()
            .map(|row| {
                let table_type: String = get(row, "table_type")?;
                Ok(TableInfo {
                    schema: schema.to_string(),
                    name: get(row, "table_name")?,
                    kind: TableKind::from_table_type(&table_type),
                    comment: get(row, "comment")?,
                })
            })
            .collect()
    }

    async fn columns(&self, table: &TableInfo) -> CatalogResult<Vec<RawColumn>> {
        let rows = self
            .fetch_all(
                "columns",
                r#"
                SELECT column_name::text AS column_name,
                       data_type::text AS data_type,
                       udt_schema::text AS udt_schema,
                       udt_name::text AS udt_name,
                       domain_schema::text AS domain_schema,
                       domain_name::text AS domain_name,
                       is_nullable::text = 'YES' AS is_nullable,
                       column_default::text AS column_default,
                       numeric_precision::int4 AS numeric_precision,
                       numeric_scale::int4 AS numeric_scale,
                       character_maximum_length::int4 AS character_maximum_length,
                       ordinal_position::int4 AS ordinal_position,
                       is_identity::text = 'YES' AS is_identity
                FROM information_schema.columns
                WHERE table_schema = $1 AND table_name = $2
                ORDER BY ordinal_position
                "#,
                &[table.schema.as_str(), table.name.as_str()],
            )
            .await?;

        rows.iter()
            .map(|row| {
                Ok(RawColumn {
                    table_schema: table.schema.clone(),
                    table_name: table.name.clone(),
                    column_name: get(row, "column_name")?,
                    data_type: get(row, "data_type")?,
                    udt_schema: get(row, "udt_schema")?,
                    udt_name: get(row, "udt_name")?,
                    domain_schema: get(row, "domain_schema")?,
                    domain_name: get(row, "domain_name")?,
                    is_nullable: get(row, "is_nullable")?,
                    column_default: get(row, "column_default")?,
                    numeric_precision: get(row, "numeric_precision")?,
                    numeric_scale: get(row, "numeric_scale")?,
                    character_maximum_length: get(row, "character_maximum_length")?,
                    ordinal_position: get(row, "ordinal_position")?,
                    is_identity: get(row, "is_identity")?,
                })
            })
            .collect()
    }

    async fn column_comment(&self, table: &TableInfo, column: &str) -> CatalogResult<Option<String>> {
        let sql = format!(
            r#"
            SELECT col_description(a.attrelid, a.attnum) AS comment
            FROM pg_attribute a
            WHERE a.attrelid = {RELATION} AND a.attname = $3
            "#
        );
        let row = self
            .fetch_optional("column_comment", &sql, &[table.schema.as_str(), table.name.as_str(), column])
            .await?;
        match row {
            Some(row) => get(&row, "comment"),
            None => Ok(None),
        }
    }

    async fn primary_key(&self, table: &TableInfo) -> CatalogResult<Vec<String>> {
        let sql = format!(
            r#"
            SELECT a.attname::text AS column_name
            FROM pg_index i
            JOIN LATERAL unnest(i.indkey::int2[]) WITH ORDINALITY AS k(attnum, ord) ON true
            JOIN pg_attribute a ON a.attrelid = i.indrelid AND a.attnum = k.attnum
            WHERE i.indrelid = {RELATION} AND i.indisprimary
            ORDER BY k.ord
            "#
        );
        let rows = self
            .fetch_all("primary_key", &sql, &[table.schema.as_str(), table.name.as_str()])
            .await?;
        rows.iter().map(|row| get(row, "column_name")).collect()
    }

    async fn owned_sequence(&self, table: &TableInfo, column: &str) -> CatalogResult<Option<String>> {
        let row = self
            .fetch_optional(
                "owned_sequence",
                "SELECT pg_get_serial_sequence(format('%I.%I', $1::text, $2::text), $3) AS sequence",
                &[table.schema.as_str(), table.name.as_str(), column],
            )
            .await?;
        match row {
            Some(row) => get(&row, "sequence"),
            None => Ok(None),
        }
    }

    async fn unique_constraints(&self, table: &TableInfo) -> CatalogResult<Vec<Vec<String>>> {
        let sql = format!(
            r#"
            SELECT ARRAY(
                       SELECT a.attname::text
                       FROM unnest(c.conkey) WITH ORDINALITY AS k(attnum, ord)
                       JOIN pg_attribute a ON a.attrelid = c.conrelid AND a.attnum = k.attnum
                       ORDER BY k.ord
                   ) AS columns
            FROM pg_constraint c
            WHERE c.conrelid = {RELATION} AND c.contype = 'u'
            ORDER BY c.conname
            "#
        );
        let rows = self
            .fetch_all("unique_constraints", &sql, &[table.schema.as_str(), table.name.as_str()])
            .await?;
        rows.iter().map(|row| get(row, "columns")).collect()
    }

    async fn udt_kind(&self, schema: &str, name: &str) -> CatalogResult<UdtKind> {
        let row = self
            .fetch_optional(
                "udt_kind",
                r#"
                SELECT t.typtype::text AS typtype,
                       format_type(t.typbasetype, t.typtypmod) AS base_type,
                       format_type(r.rngsubtype, NULL) AS subtype
                FROM pg_type t
                JOIN pg_namespace n ON n.oid = t.typnamespace
                LEFT JOIN pg_range r ON r.rngtypid = t.oid
                WHERE n.nspname = $1 AND t.typname = $2
                "#,
                &[schema, name],
            )
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("type {}.{}", schema, name)))?;

        let typtype: String = get(&row, "typtype")?;
        let kind = match typtype.as_str() {
            "e" => UdtKind::Enum {
                labels: self.enum_labels(schema, name).await?,
            },
            "d" => UdtKind::Domain {
                base_type: get(&row, "base_type")?,
            },
            "c" => UdtKind::Composite {
                attributes: self.composite_attributes(schema, name).await?,
            },
            "r" => UdtKind::Range {
                subtype: get(&row, "subtype")?,
            },
            _ => UdtKind::Base,
        };
        log::debug!("Type {}.{} resolved to {:?}", schema, name, kind);
        Ok(kind)
    }

    async fn foreign_keys(&self, table: &TableInfo) -> CatalogResult<Vec<ForeignKey>> {
        let sql = format!(
            r#"
            SELECT c.conname::text AS name,
                   tn.nspname::text AS target_schema,
                   tc.relname::text AS target_table,
                   ARRAY(
                       SELECT a.attname::text
                       FROM unnest(c.conkey) WITH ORDINALITY AS k(attnum, ord)
                       JOIN pg_attribute a ON a.attrelid = c.conrelid AND a.attnum = k.attnum
                       ORDER BY k.ord
                   ) AS columns,
                   ARRAY(
                       SELECT a.attname::text
                       FROM unnest(c.confkey) WITH ORDINALITY AS k(attnum, ord)
                       JOIN pg_attribute a ON a.attrelid = c.confrelid AND a.attnum = k.attnum
                       ORDER BY k.ord
                   ) AS target_columns,
                   CASE c.confupdtype
                       WHEN 'c' THEN 'CASCADE' WHEN 'n' THEN 'SET NULL'
                       WHEN 'd' THEN 'SET DEFAULT' WHEN 'r' THEN 'RESTRICT'
                       ELSE 'NO ACTION'
                   END AS on_update,
                   CASE c.confdeltype
                       WHEN 'c' THEN 'CASCADE' WHEN 'n' THEN 'SET NULL'
                       WHEN 'd' THEN 'SET DEFAULT' WHEN 'r' THEN 'RESTRICT'
                       ELSE 'NO ACTION'
                   END AS on_delete
            FROM pg_constraint c
            JOIN pg_class tc ON tc.oid = c.confrelid
            JOIN pg_namespace tn ON tn.oid = tc.relnamespace
            WHERE c.conrelid = {RELATION} AND c.contype = 'f'
            ORDER BY c.conname
            "#
        );
        let rows = self
            .fetch_all("foreign_keys", &sql, &[table.schema.as_str(), table.name.as_str()])
            .await?;

        rows.iter()
            .map(|row| {
                Ok(ForeignKey {
                    name: get(row, "name")?,
                    schema: table.schema.clone(),
                    table: table.name.clone(),
                    columns: get(row, "columns")?,
                    target_schema: get(row, "target_schema")?,
                    target_table: get(row, "target_table")?,
                    target_columns: get(row, "target_columns")?,
                    on_update: get(row, "on_update")?,
                    on_delete: get(row, "on_delete")?,
                })
            })
            .collect()
    }

    async fn indexes(&self, table: &TableInfo) -> CatalogResult<Vec<Index>> {
        let sql = format!(
            r#"
            SELECT i.relname::text AS name,
                   ix.indisunique AS is_unique,
                   ix.indisprimary AS is_primary,
                   am.amname::text AS method,
                   ARRAY(
                       SELECT a.attname::text
                       FROM unnest(ix.indkey::int2[]) WITH ORDINALITY AS k(attnum, ord)
                       JOIN pg_attribute a ON a.attrelid = ix.indrelid AND a.attnum = k.attnum
                       ORDER BY k.ord
                   ) AS columns
            FROM pg_index ix
            JOIN pg_class i ON i.oid = ix.indexrelid
            JOIN pg_am am ON am.oid = i.relam
            WHERE ix.indrelid = {RELATION}
            ORDER BY i.relname
            "#
        );
        let rows = self
            .fetch_all("indexes", &sql, &[table.schema.as_str(), table.name.as_str()])
            .await?;

        rows.iter()
            .map(|row| {
                Ok(Index {
                    name: get(row, "name")?,
                    columns: get(row, "columns")?,
                    is_unique: get(row, "is_unique")?,
                    is_primary: get(row, "is_primary")?,
                    method: get(row, "method")?,
                })
            })
            .collect()
    }

    async fn views(&self, schema: &str) -> CatalogResult<Vec<ViewInfo>> {
        let rows = self
            .fetch_all(
                "views",
                r#"
                SELECT viewname::text AS name, definition, false AS materialized
                FROM pg_views
                WHERE schemaname = $1
                UNION ALL
                SELECT matviewname::text, definition, true
                FROM pg_matviews
                WHERE schemaname = $1
                ORDER BY name
                "#,
                &[schema],
            )
            .await?;

        rows.iter()
            .map(|row| {
                Ok(ViewInfo {
                    schema: schema.to_string(),
                    name: get(row, "name")?,
                    definition: get(row, "definition")?,
                    materialized: get(row, "materialized")?,
                })
            })
            .collect()
    }

    async fn functions(&self, schema: &str) -> CatalogResult<Vec<FunctionInfo>> {
        // extension-owned functions are recreated by their extension
        let rows = self
            .fetch_all(
                "functions",
                r#"
                SELECT p.proname::text AS name,
                       pg_get_function_identity_arguments(p.oid) AS arguments,
                       pg_get_functiondef(p.oid) AS definition
                FROM pg_proc p
                JOIN pg_namespace n ON n.oid = p.pronamespace
                LEFT JOIN pg_depend d ON d.objid = p.oid AND d.deptype = 'e'
                WHERE n.nspname = $1 AND p.prokind = 'f' AND d.objid IS NULL
                ORDER BY p.proname
                "#,
                &[schema],
            )
            .await?;

        rows.iter()
            .map(|row| {
                Ok(FunctionInfo {
                    schema: schema.to_string(),
                    name: get(row, "name")?,
                    arguments: get(row, "arguments")?,
                    definition: get(row, "definition")?,
                })
            })
            .collect()
    }

    async fn triggers(&self, schema: &str) -> CatalogResult<Vec<TriggerInfo>> {
        let rows = self
            .fetch_all(
                "triggers",
                r#"
                SELECT c.relname::text AS table_name,
                       t.tgname::text AS name,
                       pg_get_triggerdef(t.oid) AS definition
                FROM pg_trigger t
                JOIN pg_class c ON c.oid = t.tgrelid
                JOIN pg_namespace n ON n.oid = c.relnamespace
                WHERE n.nspname = $1 AND NOT t.tgisinternal
                ORDER BY c.relname, t.tgname
                "#,
                &[schema],
            )
            .await?;

        rows.iter()
            .map(|row| {
                Ok(TriggerInfo {
                    schema: schema.to_string(),
                    table: get(row, "table_name")?,
                    name: get(row, "name")?,
                    definition: get(row, "definition")?,
                })
            })
            .collect()
    }

    async fn domains(&self, schema: &str) -> CatalogResult<Vec<DomainInfo>> {
        let rows = self
            .fetch_all(
                "domains",
                r#"
                SELECT t.typname::text AS name,
                       format_type(t.typbasetype, t.typtypmod) AS base_type,
                       t.typdefault AS default_value,
                       t.typnotnull AS not_null,
                       ARRAY(
                           SELECT pg_get_constraintdef(c.oid)
                           FROM pg_constraint c
                           WHERE c.contypid = t.oid AND c.contype = 'c'
                           ORDER BY c.conname
                       ) AS checks
                FROM pg_type t
                JOIN pg_namespace n ON n.oid = t.typnamespace
                WHERE n.nspname = $1 AND t.typtype = 'd'
                ORDER BY t.typname
                "#,
                &[schema],
            )
            .await?;

        rows.iter()
            .map(|row| {
                Ok(DomainInfo {
                    schema: schema.to_string(),
                    name: get(row, "name")?,
                    base_type: get(row, "base_type")?,
                    default: get(row, "default_value")?,
                    not_null: get(row, "not_null")?,
                    checks: get(row, "checks")?,
                })
            })
            .collect()
    }

    async fn composite_types(&self, schema: &str) -> CatalogResult<Vec<CompositeType>> {
        // relkind 'c' excludes the row types of tables and views
        let rows = self
            .fetch_all(
                "composite_types",
                r#"
                SELECT t.typname::text AS name
                FROM pg_type t
                JOIN pg_namespace n ON n.oid = t.typnamespace
                JOIN pg_class c ON c.oid = t.typrelid
                WHERE n.nspname = $1 AND t.typtype = 'c' AND c.relkind = 'c'
                ORDER BY t.typname
                "#,
                &[schema],
            )
            .await?;

        let mut composites = Vec::with_capacity(rows.len());
        for row in &rows {
            let name: String = get(row, "name")?;
            let attributes = self.composite_attributes(schema, &name).await?;
            composites.push(CompositeType {
                schema: schema.to_string(),
                name,
                attributes,
            });
        }
        Ok(composites)
    }

    async fn enum_types(&self, schema: &str) -> CatalogResult<Vec<EnumType>> {
        let rows = self
            .fetch_all(
                "enum_types",
                r#"
                SELECT t.typname::text AS name,
                       array_agg(e.enumlabel::text ORDER BY e.enumsortorder) AS labels
                FROM pg_type t
                JOIN pg_enum e ON e.enumtypid = t.oid
                JOIN pg_namespace n ON n.oid = t.typnamespace
                WHERE n.nspname = $1
                GROUP BY t.typname
                ORDER BY t.typname
                "#,
                &[schema],
            )
            .await?;

        rows.iter()
            .map(|row| {
                Ok(EnumType {
                    schema: schema.to_string(),
                    name: get(row, "name")?,
                    labels: get(row, "labels")?,
                })
            })
            .collect()
    }
}
