//! PostgreSQL type pipeline
//!
//! Each column passes through four stages that must agree on [`PgType`]:
//!
//! - [`classify`] turns a raw type string into a closed set of tags
//! - [`defaults`] rewrites the raw default expression into a literal or marker
//! - [`orm`] formats the Sequelize `DataTypes` descriptor
//! - [`typescript`] resolves the TypeScript type and JSON interfaces

pub mod classify;
pub mod defaults;
pub mod orm;
pub mod typescript;

pub use classify::{classify, classify_column, type_params, PgType};
pub use defaults::{normalize_default, quote, strip_casts, NormalizedDefault};
pub use orm::{format_orm_type, OrmType, OrmTypeInput, UnsupportedType};
pub use typescript::{interface_from_json, resolve_ts_type, TsBody, TsDeclaration, TsProperty, TsResolution};
