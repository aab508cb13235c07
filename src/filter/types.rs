use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FilterOp {
    #[serde(rename = "=")] Eq,
    #[serde(rename = ">")] Gt,
    #[serde(rename = ">=")] Gte,
    #[serde(rename = "<")] Lt,
    #[serde(rename = "<=")] Lte,
    #[serde(rename = "like")] Like,
    #[serde(rename = "in")] In,
    #[serde(rename = "not_in")] NotIn,
    #[serde(rename = "find_in_set")] FindInSet,
}

impl FilterOp {
    /// Parameter suffixes in the order they are evaluated for each column.
    pub const SUFFIXES: [(&'static str, FilterOp); 7] = [
        ("gt", FilterOp::Gt),
        ("gte", FilterOp::Gte),
        ("lt", FilterOp::Lt),
        ("lte", FilterOp::Lte),
        ("like", FilterOp::Like),
        ("in", FilterOp::In),
        ("not_in", FilterOp::NotIn),
    ];

    /// SQL comparison token for the plain binary operators
    pub fn to_sql(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
            FilterOp::Like => "LIKE",
            FilterOp::In => "IN",
            FilterOp::NotIn => "NOT IN",
            FilterOp::FindInSet => "FIND_IN_SET",
        }
    }
}

/// One bound-parameter predicate against a whitelisted column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Condition {
    pub field: String,
    pub operator: FilterOp,
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: FilterOp, value: Value) -> Self {
        Self { field: field.into(), operator, value }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterDescriptor {
    Simple(Condition),
    OrGroup { conditions: Vec<Condition> },
    GroupBy { column: String },
}

impl FilterDescriptor {
    pub fn is_group_by(&self) -> bool {
        matches!(self, FilterDescriptor::GroupBy { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Anything other than asc/desc (case-insensitive) falls back to desc.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("asc") {
            SortDirection::Asc
        } else {
            SortDirection::Desc
        }
    }

    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOrderInfo {
    pub column: String,
    pub sort: SortDirection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<Value>,
}
