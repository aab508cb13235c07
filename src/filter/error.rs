use thiserror::Error;

/// Raised only by query construction. Building descriptors from request
/// parameters never fails; bad input is dropped instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("Invalid table name: {0}")]
    InvalidTableName(String),
}
