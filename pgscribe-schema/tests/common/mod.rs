//! In-memory catalog fixture shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use pgscribe_schema::{
    Catalog, CatalogError, CatalogResult, CompositeAttribute, CompositeType, DomainInfo, EnumType,
    ForeignKey, FunctionInfo, Index, RawColumn, TableInfo, TriggerInfo, UdtKind, ViewInfo,
};
use std::collections::{HashMap, HashSet};

#[derive(Default)]
pub struct FakeCatalog {
    pub database: String,
    pub tables: Vec<TableInfo>,
    pub columns: HashMap<String, Vec<RawColumn>>,
    pub comments: HashMap<(String, String), String>,
    pub primary_keys: HashMap<String, Vec<String>>,
    pub sequences: HashMap<(String, String), String>,
    pub uniques: HashMap<String, Vec<Vec<String>>>,
    pub udts: HashMap<String, UdtKind>,
    pub foreign_keys: HashMap<String, Vec<ForeignKey>>,
    pub indexes: HashMap<String, Vec<Index>>,
    pub views: Vec<ViewInfo>,
    pub functions: Vec<FunctionInfo>,
    pub triggers: Vec<TriggerInfo>,
    pub domains: Vec<DomainInfo>,
    pub composites: Vec<CompositeType>,
    pub enums: Vec<EnumType>,
    /// Lookups that fail with a query error
    pub failing: HashSet<&'static str>,
}

impl FakeCatalog {
    fn check(&self, lookup: &'static str) -> CatalogResult<()> {
        if self.failing.contains(lookup) {
            Err(CatalogError::query(lookup, "connection reset by peer"))
        } else {
            Ok(())
        }
    }

    pub fn add_table(&mut self, name: &str, columns: Vec<RawColumn>) {
        self.tables.push(TableInfo::new("public", name));
        let columns = columns
            .into_iter()
            .enumerate()
            .map(|(i, mut c)| {
                c.ordinal_position = i as i32 + 1;
                c
            })
            .collect();
        self.columns.insert(name.to_string(), columns);
    }

    pub fn add_foreign_key(&mut self, table: &str, column: &str, target: &str, on_delete: &str) {
        self.foreign_keys
            .entry(table.to_string())
            .or_default()
            .push(ForeignKey {
                name: format!("{}_{}_fkey", table, column),
                schema: "public".to_string(),
                table: table.to_string(),
                columns: vec![column.to_string()],
                target_schema: "public".to_string(),
                target_table: target.to_string(),
                target_columns: vec!["id".to_string()],
                on_update: "NO ACTION".to_string(),
                on_delete: on_delete.to_string(),
            });
    }
}

#[async_trait]
impl Catalog for FakeCatalog {
    async fn database_name(&self) -> CatalogResult<String> {
        self.check("database_name")?;
        Ok(self.database.clone())
    }

    async fn list_tables(&self, schema: &str) -> CatalogResult<Vec<TableInfo>> {
        self.check("list_tables")?;
        Ok(self.tables.iter().filter(|t| t.schema == schema).cloned().collect())
    }

    async fn columns(&self, table: &TableInfo) -> CatalogResult<Vec<RawColumn>> {
        self.check("columns")?;
        Ok(self.columns.get(&table.name).cloned().unwrap_or_default())
    }

    async fn column_comment(&self, table: &TableInfo, column: &str) -> CatalogResult<Option<String>> {
        self.check("column_comment")?;
        Ok(self
            .comments
            .get(&(table.name.clone(), column.to_string()))
            .cloned())
    }

    async fn primary_key(&self, table: &TableInfo) -> CatalogResult<Vec<String>> {
        self.check("primary_key")?;
        Ok(self.primary_keys.get(&table.name).cloned().unwrap_or_default())
    }

    async fn owned_sequence(&self, table: &TableInfo, column: &str) -> CatalogResult<Option<String>> {
        self.check("owned_sequence")?;
        Ok(self
            .sequences
            .get(&(table.name.clone(), column.to_string()))
            .cloned())
    }

    async fn unique_constraints(&self, table: &TableInfo) -> CatalogResult<Vec<Vec<String>>> {
        self.check("unique_constraints")?;
        Ok(self.uniques.get(&table.name).cloned().unwrap_or_default())
    }

    async fn udt_kind(&self, _schema: &str, name: &str) -> CatalogResult<UdtKind> {
        self.check("udt_kind")?;
        Ok(self.udts.get(name).cloned().unwrap_or_default())
    }

    async fn foreign_keys(&self, table: &TableInfo) -> CatalogResult<Vec<ForeignKey>> {
        self.check("foreign_keys")?;
        Ok(self.foreign_keys.get(&table.name).cloned().unwrap_or_default())
    }

    async fn indexes(&self, table: &TableInfo) -> CatalogResult<Vec<Index>> {
        self.check("indexes")?;
        Ok(self.indexes.get(&table.name).cloned().unwrap_or_default())
    }

    async fn views(&self, _schema: &str) -> CatalogResult<Vec<ViewInfo>> {
        self.check("views")?;
        Ok(self.views.clone())
    }

    async fn functions(&self, _schema: &str) -> CatalogResult<Vec<FunctionInfo>> {
        self.check("functions")?;
        Ok(self.functions.clone())
    }

    async fn triggers(&self, _schema: &str) -> CatalogResult<Vec<TriggerInfo>> {
        self.check("triggers")?;
        Ok(self.triggers.clone())
    }

    async fn domains(&self, _schema: &str) -> CatalogResult<Vec<DomainInfo>> {
        self.check("domains")?;
        Ok(self.domains.clone())
    }

    async fn composite_types(&self, _schema: &str) -> CatalogResult<Vec<CompositeType>> {
        self.check("composite_types")?;
        Ok(self.composites.clone())
    }

    async fn enum_types(&self, _schema: &str) -> CatalogResult<Vec<EnumType>> {
        self.check("enum_types")?;
        Ok(self.enums.clone())
    }
}

fn column(table: &str, name: &str, data_type: &str, udt: &str) -> RawColumn {
    RawColumn::new(&TableInfo::new("public", table), name, data_type, udt)
}

fn not_null(mut c: RawColumn) -> RawColumn {
    c.is_nullable = false;
    c
}

fn with_default(mut c: RawColumn, default: &str) -> RawColumn {
    c.column_default = Some(default.to_string());
    c
}

fn serial_id(table: &str) -> RawColumn {
    not_null(with_default(
        column(table, "id", "integer", "int4"),
        &format!("nextval('{}_id_seq'::regclass)", table),
    ))
}

/// A small blog database: users, posts, tags, a post/tag junction table and a
/// table using a composite type
pub fn blog_catalog() -> FakeCatalog {
    let mut catalog = FakeCatalog {
        database: "blog".to_string(),
        ..FakeCatalog::default()
    };

    let mut email = not_null(column("users", "email", "character varying", "varchar"));
    email.character_maximum_length = Some(255);
    let mut nickname = with_default(
        column("users", "nickname", "character varying", "varchar"),
        "NULL::character varying",
    );
    nickname.character_maximum_length = Some(255);
    let mut status = not_null(with_default(
        column("users", "status", "USER-DEFINED", "user_status"),
        "'active'::user_status",
    ));
    status.udt_schema = "public".to_string();
    let mut balance = column("users", "balance", "numeric", "numeric");
    balance.numeric_precision = Some(10);
    balance.numeric_scale = Some(2);

    catalog.add_table(
        "users",
        vec![
            serial_id("users"),
            email,
            nickname,
            status,
            with_default(
                column("users", "settings", "jsonb", "jsonb"),
                r#"'{"theme": "dark", "notifications": {"email": true}}'::jsonb"#,
            ),
            balance,
            not_null(with_default(
                column("users", "created_at", "timestamp without time zone", "timestamp"),
                "CURRENT_TIMESTAMP",
            )),
        ],
    );
    catalog.primary_keys.insert("users".into(), vec!["id".into()]);
    catalog.uniques.insert("users".into(), vec![vec!["email".into()]]);
    catalog
        .comments
        .insert(("users".into(), "email".into()), "Login address".into());
    catalog.udts.insert(
        "user_status".into(),
        UdtKind::Enum {
            labels: vec!["active".into(), "suspended".into()],
        },
    );
    catalog.enums.push(EnumType {
        schema: "public".into(),
        name: "user_status".into(),
        labels: vec!["active".into(), "suspended".into()],
    });
    catalog.indexes.insert(
        "users".into(),
        vec![
            Index {
                name: "users_pkey".into(),
                columns: vec!["id".into()],
                is_unique: true,
                is_primary: true,
                method: Some("btree".into()),
            },
            Index {
                name: "users_email_key".into(),
                columns: vec!["email".into()],
                is_unique: true,
                is_primary: false,
                method: Some("btree".into()),
            },
        ],
    );

    catalog.add_table(
        "posts",
        vec![
            serial_id("posts"),
            not_null(column("posts", "author_id", "integer", "int4")),
            not_null(column("posts", "title", "text", "text")),
            with_default(column("posts", "tags", "ARRAY", "_text"), "'{}'::text[]"),
            with_default(column("posts", "metadata", "json", "json"), "'{}'::json"),
        ],
    );
    catalog.primary_keys.insert("posts".into(), vec!["id".into()]);
    catalog.add_foreign_key("posts", "author_id", "users", "CASCADE");

    catalog.add_table(
        "tags",
        vec![serial_id("tags"), not_null(column("tags", "name", "text", "text"))],
    );
    catalog.primary_keys.insert("tags".into(), vec!["id".into()]);

    catalog.add_table(
        "post_tags",
        vec![
            not_null(column("post_tags", "post_id", "integer", "int4")),
            not_null(column("post_tags", "tag_id", "integer", "int4")),
        ],
    );
    catalog
        .primary_keys
        .insert("post_tags".into(), vec!["post_id".into(), "tag_id".into()]);
    catalog.add_foreign_key("post_tags", "post_id", "posts", "CASCADE");
    catalog.add_foreign_key("post_tags", "tag_id", "tags", "CASCADE");

    let mut location = column("places", "location", "USER-DEFINED", "address");
    location.udt_schema = "public".to_string();
    catalog.add_table("places", vec![serial_id("places"), location]);
    catalog.primary_keys.insert("places".into(), vec!["id".into()]);
    let attributes = vec![
        CompositeAttribute {
            name: "street".into(),
            data_type: "text".into(),
        },
        CompositeAttribute {
            name: "city".into(),
            data_type: "text".into(),
        },
    ];
    catalog.udts.insert(
        "address".into(),
        UdtKind::Composite {
            attributes: attributes.clone(),
        },
    );
    catalog.composites.push(CompositeType {
        schema: "public".into(),
        name: "address".into(),
        attributes,
    });

    catalog.views.push(ViewInfo {
        schema: "public".into(),
        name: "active_users".into(),
        definition: " SELECT users.id, users.email FROM users WHERE users.status = 'active'::user_status;".into(),
        materialized: false,
    });
    catalog.domains.push(DomainInfo {
        schema: "public".into(),
        name: "positive_int".into(),
        base_type: "integer".into(),
        default: None,
        not_null: false,
        checks: vec!["CHECK ((VALUE > 0))".into()],
    });
    catalog.functions.push(FunctionInfo {
        schema: "public".into(),
        name: "touch_updated_at".into(),
        arguments: String::new(),
        definition: "CREATE OR REPLACE FUNCTION public.touch_updated_at()\n RETURNS trigger\n LANGUAGE plpgsql\nAS $function$\nBEGIN\n  NEW.updated_at = now();\n  RETURN NEW;\nEND;\n$function$\n".into(),
    });
    catalog.triggers.push(TriggerInfo {
        schema: "public".into(),
        table: "posts".into(),
        name: "posts_touch".into(),
        definition: "CREATE TRIGGER posts_touch BEFORE UPDATE ON public.posts FOR EACH ROW EXECUTE FUNCTION touch_updated_at()".into(),
    });
    catalog.triggers.push(TriggerInfo {
        schema: "public".into(),
        table: "audit_log".into(),
        name: "audit_touch".into(),
        definition: "CREATE TRIGGER audit_touch BEFORE UPDATE ON public.audit_log FOR EACH ROW EXECUTE FUNCTION touch_updated_at()".into(),
    });

    catalog
}
