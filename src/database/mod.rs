pub mod manager;
pub mod models;
pub mod query_builder;
pub mod repository;
pub mod row;
pub mod schema;

pub use manager::{DatabaseError, DatabaseManager};
pub use repository::{Repository, UpsertOperation, UpsertOutcome, UpsertPlan};
pub use schema::{ColumnInfo, MySqlSchema, SchemaIntrospector, StaticSchema};
