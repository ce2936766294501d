//! Tests for the code generation module

mod common;

use chrono::{NaiveDate, NaiveDateTime};
use common::blog_catalog;
use pgscribe_schema::codegen::{
    CodeGenerator, DiagramGenerator, GenerationOutput, MigrationGenerator, ModelGenerator,
    ScaffoldGenerator, TypesGenerator,
};
use pgscribe_schema::{
    AssembleOptions, Assembler, EnumType, Index, RawColumn, SchemaModel, TableInfo, UdtKind,
};
use std::path::Path;

async fn blog_schema() -> SchemaModel {
    let catalog = blog_catalog();
    Assembler::new(&catalog)
        .assemble_schema(&AssembleOptions::default())
        .await
        .expect("assembly succeeds")
}

fn base_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn file<'a>(output: &'a GenerationOutput, path: &str) -> &'a str {
    output
        .files
        .iter()
        .find(|f| f.path == Path::new(path))
        .map(|f| f.contents.as_str())
        .unwrap_or_else(|| panic!("missing {}", path))
}

fn paths(output: &GenerationOutput) -> Vec<String> {
    output
        .files
        .iter()
        .map(|f| f.path.to_string_lossy().into_owned())
        .collect()
}

#[tokio::test]
async fn test_models_skip_composite_tables() {
    let schema = blog_schema().await;
    let output = ModelGenerator::new().unwrap().generate_schema(&schema).unwrap();

    assert_eq!(
        paths(&output),
        vec![
            "models/users.ts",
            "models/posts.ts",
            "models/tags.ts",
            "models/post_tags.ts",
            "models/index.ts",
        ]
    );
    assert_eq!(output.skipped.len(), 1);
    assert_eq!(output.skipped[0].table, "public.places");
    assert!(output.skipped[0].reason.contains("location"));

    let index = file(&output, "models/index.ts");
    assert!(index.contains("import { Users } from './users';"));
    assert!(index.contains("PostTags.initModel(sequelize);"));
    assert!(index.contains("Users.associate(models);"));
    assert!(!index.contains("Places"));
}

#[tokio::test]
async fn test_user_model_attributes() {
    let schema = blog_schema().await;
    let output = ModelGenerator::new().unwrap().generate_schema(&schema).unwrap();
    let users = file(&output, "models/users.ts");

    assert!(users.contains("export class Users"));
    assert!(users.contains("type: DataTypes.STRING(255)"));
    assert!(users.contains("type: DataTypes.DECIMAL(10,2)"));
    assert!(users.contains("type: DataTypes.ENUM('active','suspended')"));
    assert!(users.contains("autoIncrement: true"));
    assert!(users.contains("defaultValue: Sequelize.literal('CURRENT_TIMESTAMP')"));
    assert!(users.contains("defaultValue: 'active'"));
    assert!(users.contains("field: 'created_at'"));
    assert!(users.contains("comment: 'Login address'"));
    assert!(!users.contains("nextval"));

    assert!(users.contains("export enum UserStatus {"));
    assert!(users.contains("Active = 'active',"));
    assert!(users.contains("status: UserStatus;"));
    assert!(users.contains("declare balance: string | null;"));
    assert!(users.contains("import type { UsersSettingsInterface } from '../types/json-interfaces';"));
    assert!(users.contains("settings: UsersSettingsInterface | null;"));
    assert!(users.contains(r#"defaultValue: {"theme": "dark", "notifications": {"email": true}}"#));
    assert!(users.contains(
        "Users.hasMany(models.Posts, { as: 'posts', foreignKey: 'authorId', sourceKey: 'id' });"
    ));
    assert!(users.contains("tableName: 'users'"));
}

#[tokio::test]
async fn test_post_model_associations() {
    let schema = blog_schema().await;
    let output = ModelGenerator::new().unwrap().generate_schema(&schema).unwrap();
    let posts = file(&output, "models/posts.ts");

    assert!(posts.contains("type: DataTypes.ARRAY(DataTypes.TEXT)"));
    assert!(posts.contains("defaultValue: []"));
    assert!(posts.contains(
        "Posts.belongsTo(models.Users, { as: 'author', foreignKey: 'authorId', targetKey: 'id' });"
    ));
    assert!(posts.contains(
        "Posts.belongsToMany(models.Tags, { as: 'tagsViaPostTags', through: models.PostTags, foreignKey: 'postId', otherKey: 'tagId' });"
    ));
    assert!(posts.contains("references: { model: { tableName: 'users', schema: 'public' }, key: 'id' }"));
}

#[tokio::test]
async fn test_migrations_are_ordered_and_timestamped() {
    let schema = blog_schema().await;
    let output = MigrationGenerator::new(base_time())
        .unwrap()
        .generate_schema(&schema)
        .unwrap();

    assert_eq!(
        paths(&output),
        vec![
            "migrations/20240101000000-create_positive_int_domain.js",
            "migrations/20240101000001-create_address_type.js",
            "migrations/20240101000002-create_users_table.js",
            "migrations/20240101000003-create_posts_table.js",
            "migrations/20240101000004-create_tags_table.js",
            "migrations/20240101000005-create_post_tags_table.js",
            "migrations/20240101000006-create_touch_updated_at_function.js",
            "migrations/20240101000007-create_active_users_view.js",
            "migrations/20240101000008-create_posts_touch_trigger.js",
            "migrations/20240101000009-add_posts_foreign_keys.js",
            "migrations/20240101000010-add_post_tags_foreign_keys.js",
        ]
    );
    assert_eq!(output.skipped.len(), 1);
}

#[tokio::test]
async fn test_table_and_foreign_key_migrations() {
    let schema = blog_schema().await;
    let output = MigrationGenerator::new(base_time())
        .unwrap()
        .generate_schema(&schema)
        .unwrap();

    let users = file(&output, "migrations/20240101000002-create_users_table.js");
    assert!(users.contains("await queryInterface.createTable("));
    assert!(users.contains("{ tableName: 'users', schema: 'public' }"));
    assert!(users.contains("type: Sequelize.STRING(255)"));
    assert!(users.contains("defaultValue: Sequelize.literal('CURRENT_TIMESTAMP')"));
    assert!(users.contains("primaryKey: true"));
    assert!(users.contains("unique: true"));
    // the unique constraint's index is covered by `unique: true`
    assert!(!users.contains("addIndex"));
    assert!(users.contains("await queryInterface.dropTable({ tableName: 'users', schema: 'public' });"));

    let fks = file(&output, "migrations/20240101000010-add_post_tags_foreign_keys.js");
    assert!(fks.contains("name: 'post_tags_post_id_fkey'"));
    assert!(fks.contains("fields: ['tag_id']"));
    assert!(fks.contains("onDelete: 'CASCADE'"));
    assert!(fks.contains("removeConstraint({ tableName: 'post_tags', schema: 'public' }, 'post_tags_tag_id_fkey')"));

    let function = file(&output, "migrations/20240101000006-create_touch_updated_at_function.js");
    assert!(function.contains("CREATE OR REPLACE FUNCTION public.touch_updated_at()"));
    assert!(function.contains("DROP FUNCTION IF EXISTS \"public\".\"touch_updated_at\"();"));

    let domain = file(&output, "migrations/20240101000000-create_positive_int_domain.js");
    assert!(domain.contains("CREATE DOMAIN \"public\".\"positive_int\" AS integer CHECK ((VALUE > 0));"));
}

#[tokio::test]
async fn test_json_interfaces_file() {
    let schema = blog_schema().await;
    let output = TypesGenerator::new().unwrap().generate_schema(&schema).unwrap();
    let types = file(&output, "types/json-interfaces.ts");

    assert!(types.contains("export interface UsersSettingsInterface {"));
    assert!(types.contains("theme: string;"));
    assert!(types.contains("notifications: UsersSettingsInterfaceNotifications;"));
    assert!(types.contains("export interface UsersSettingsInterfaceNotifications {"));
    assert!(types.contains("email: boolean;"));
    assert!(types.contains("export interface PostsMetadataInterface {"));
    assert!(types.contains("[key: string]: unknown;"));
    assert!(types.contains("/** users.settings */"));
}

#[tokio::test]
async fn test_dbml_diagram() {
    let schema = blog_schema().await;
    let output = DiagramGenerator::new().unwrap().generate_schema(&schema).unwrap();
    let dbml = file(&output, "diagram/schema.dbml");

    assert!(dbml.contains("Project blog {"));
    assert!(dbml.contains("Enum \"user_status\" {"));
    assert!(dbml.contains("Table \"users\" {"));
    assert!(dbml.contains("\"id\" int4 [pk, increment]"));
    assert!(dbml.contains("\"email\" varchar(255) [not null, unique, note: 'Login address']"));
    assert!(dbml.contains("\"balance\" numeric(10,2)"));
    assert!(dbml.contains("\"created_at\" timestamp [not null, default: `CURRENT_TIMESTAMP`]"));
    assert!(dbml.contains("\"tags\" \"text[]\""));
    assert!(dbml.contains(
        "Ref posts_author_id_fkey: \"posts\".\"author_id\" > \"users\".\"id\" [delete: cascade]"
    ));
    // composite tables still appear in the diagram
    assert!(dbml.contains("Table \"places\" {"));

    let readme = file(&output, "diagram/README.md");
    assert!(readme.contains("# blog schema diagram"));
    assert!(readme.contains("| Tables | 5 |"));
    assert!(readme.contains("| Relationships | 3 |"));
    assert!(readme.contains("| `public.users` | 7 | id |"));
}

#[tokio::test]
async fn test_scaffold_repositories_and_seeder() {
    let schema = blog_schema().await;
    let output = ScaffoldGenerator::new(base_time())
        .unwrap()
        .generate_schema(&schema)
        .unwrap();

    let names = paths(&output);
    assert!(names.contains(&"repositories/users.repository.ts".to_string()));
    assert!(names.contains(&"repositories/base.repository.ts".to_string()));
    assert!(names.contains(&"seeders/20240101000000-initial_seed.js".to_string()));
    assert!(!names.contains(&"repositories/places.repository.ts".to_string()));

    let users = file(&output, "repositories/users.repository.ts");
    assert!(users.contains("import { Users } from '../models/users';"));
    assert!(users.contains("export class UsersRepository extends BaseRepository<Users>"));
    assert!(users.contains("findByEmail(value: string): Promise<Users | null>"));
    assert!(users.contains("findWithPosts(id: number): Promise<Users | null>"));
    assert!(users.contains("export const usersRepository = new UsersRepository();"));

    let base = file(&output, "repositories/base.repository.ts");
    assert!(base.contains("export abstract class BaseRepository<M extends Model>"));

    let seeder = file(&output, "seeders/20240101000000-initial_seed.js");
    let users_at = seeder.find("tableName: 'users'").unwrap();
    let posts_at = seeder.find("tableName: 'posts'").unwrap();
    let post_tags_at = seeder.find("tableName: 'post_tags'").unwrap();
    assert!(users_at < posts_at && posts_at < post_tags_at);
    assert!(seeder.contains("email: '', balance: null"));
}

#[tokio::test]
async fn test_repository_finders_follow_model_associations() {
    let mut catalog = blog_catalog();
    let mut label = RawColumn::new(&TableInfo::new("public", "post_tags"), "label", "USER-DEFINED", "address");
    label.udt_schema = "public".to_string();
    label.ordinal_position = 3;
    catalog.columns.get_mut("post_tags").unwrap().push(label);
    let schema = Assembler::new(&catalog)
        .assemble_schema(&AssembleOptions::default())
        .await
        .unwrap();

    let models = ModelGenerator::new().unwrap().generate_schema(&schema).unwrap();
    assert!(models.skipped.iter().any(|s| s.table == "public.post_tags"));
    let post_model = file(&models, "models/posts.ts");
    assert!(!post_model.contains("tagsViaPostTags"));

    let output = ScaffoldGenerator::new(base_time())
        .unwrap()
        .generate_schema(&schema)
        .unwrap();
    let posts = file(&output, "repositories/posts.repository.ts");
    assert!(posts.contains("findWithAuthor("));
    assert!(!posts.contains("findWithTagsViaPostTags"));
    assert!(!posts.contains("tagsViaPostTags"));
}

#[tokio::test]
async fn test_model_index_options_are_escaped() {
    let mut catalog = blog_catalog();
    catalog.indexes.get_mut("users").unwrap().push(Index {
        name: "users_o'brien_idx".into(),
        columns: vec!["nickname".into()],
        is_unique: false,
        is_primary: false,
        method: Some("gin".into()),
    });
    let schema = Assembler::new(&catalog)
        .assemble_schema(&AssembleOptions::default())
        .await
        .unwrap();

    let output = ModelGenerator::new().unwrap().generate_schema(&schema).unwrap();
    let users = file(&output, "models/users.ts");
    assert!(users.contains(
        r"{ name: 'users_o\'brien_idx', unique: false, fields: ['nickname'], using: 'gin' },"
    ));
    assert!(users.contains("{ name: 'users_email_key', unique: true, fields: ['email'] },"));
}

#[tokio::test]
async fn test_dbml_enum_columns_match_schema_qualified_enums() {
    let mut catalog = common::FakeCatalog {
        database: "shop".to_string(),
        ..Default::default()
    };
    let orders = TableInfo::new("sales", "orders");
    let mut state = RawColumn::new(&orders, "state", "USER-DEFINED", "order_state");
    state.udt_schema = "sales".to_string();
    catalog.tables.push(orders);
    catalog.columns.insert("orders".into(), vec![state]);
    catalog.udts.insert(
        "order_state".into(),
        UdtKind::Enum {
            labels: vec!["open".into(), "shipped".into()],
        },
    );
    catalog.enums.push(EnumType {
        schema: "sales".into(),
        name: "order_state".into(),
        labels: vec!["open".into(), "shipped".into()],
    });

    let options = AssembleOptions {
        schemas: vec!["sales".to_string()],
        ..AssembleOptions::default()
    };
    let schema = Assembler::new(&catalog).assemble_schema(&options).await.unwrap();
    let dbml = DiagramGenerator::new().unwrap().generate_dbml(&schema).unwrap();

    assert!(dbml.contains("Enum \"sales\".\"order_state\" {"));
    assert!(dbml.contains("\"state\" \"sales\".\"order_state\""));
}
