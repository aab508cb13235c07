use serde_json::Value;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::types::{Condition, FilterDescriptor, FilterOp, FilterOrderInfo, SqlResult};

/// Query-construction interface that filter descriptors are rendered against.
pub trait FilterTarget {
    fn where_condition(&mut self, condition: &Condition);
    /// Parenthesised OR of the conditions, AND-ed with everything else
    fn where_any(&mut self, conditions: &[Condition]);
    fn group_by(&mut self, column: &str);
}

/// Apply descriptors in build order. Grouping always lands after every predicate.
pub fn apply_filters<T: FilterTarget + ?Sized>(target: &mut T, filters: &[FilterDescriptor]) {
    for filter in filters {
        match filter {
            FilterDescriptor::Simple(condition) => target.where_condition(condition),
            FilterDescriptor::OrGroup { conditions } => target.where_any(conditions),
            FilterDescriptor::GroupBy { .. } => {}
        }
    }
    for filter in filters {
        if let FilterDescriptor::GroupBy { column } = filter {
            target.group_by(column);
        }
    }
}

/// MySQL SELECT over a single table with bound parameters.
#[derive(Debug, Clone)]
pub struct SelectQuery {
    table_name: String,
    wheres: Vec<String>,
    params: Vec<Value>,
    group_by: Vec<String>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl SelectQuery {
    pub fn new(table_name: impl Into<String>) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        validate_identifier(&table_name).map_err(FilterError::InvalidTableName)?;
        Ok(Self {
            table_name,
            wheres: vec![],
            params: vec![],
            group_by: vec![],
            order_data: vec![],
            limit: None,
            offset: None,
        })
    }

    pub fn filtered(table_name: impl Into<String>, filters: &[FilterDescriptor]) -> Result<Self, FilterError> {
        let mut query = Self::new(table_name)?;
        apply_filters(&mut query, filters);
        Ok(query)
    }

    pub fn order(&mut self, order: Vec<FilterOrderInfo>) -> &mut Self {
        self.order_data = order;
        self
    }

    pub fn limit(&mut self, limit: i64, offset: i64) -> &mut Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    pub fn to_sql(&self) -> SqlResult {
        let limit_clause = match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => format!("LIMIT {} OFFSET {}", limit, offset),
            (Some(limit), None) => format!("LIMIT {}", limit),
            _ => String::new(),
        };

        let query = [
            format!("SELECT * FROM {}", quote_identifier(&self.table_name)),
            self.where_clause(),
            self.group_clause(),
            FilterOrder::generate(&self.order_data),
            limit_clause,
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        SqlResult { query, params: self.params.clone() }
    }

    /// Same predicates, no ordering or pagination. Grouped queries count groups.
    pub fn to_count_sql(&self) -> SqlResult {
        let table = quote_identifier(&self.table_name);
        let where_clause = self.where_clause();

        let query = if self.group_by.is_empty() {
            [format!("SELECT COUNT(*) AS count FROM {}", table), where_clause]
                .into_iter()
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        } else {
            let inner = [format!("SELECT 1 FROM {}", table), where_clause, self.group_clause()]
                .into_iter()
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            format!("SELECT COUNT(*) AS count FROM ({}) AS grouped", inner)
        };

        SqlResult { query, params: self.params.clone() }
    }

    fn where_clause(&self) -> String {
        if self.wheres.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.wheres.join(" AND "))
        }
    }

    fn group_clause(&self) -> String {
        if self.group_by.is_empty() {
            String::new()
        } else {
            let columns: Vec<String> = self.group_by.iter().map(|c| quote_identifier(c)).collect();
            format!("GROUP BY {}", columns.join(", "))
        }
    }

    /// Render one condition to SQL, pushing its bound values. `None` means no constraint.
    fn render(&mut self, condition: &Condition) -> Option<String> {
        let column = quote_identifier(&condition.field);
        match condition.operator {
            FilterOp::In | FilterOp::NotIn => {
                let items = match &condition.value {
                    Value::Array(items) => items.clone(),
                    other => vec![other.clone()],
                };
                if items.is_empty() {
                    // IN () matches nothing; NOT IN () excludes nothing
                    return match condition.operator {
                        FilterOp::In => Some("1 = 0".to_string()),
                        _ => None,
                    };
                }
                let placeholders = vec!["?"; items.len()].join(", ");
                self.params.extend(items);
                Some(format!("{} {} ({})", column, condition.operator.to_sql(), placeholders))
            }
            FilterOp::FindInSet => {
                self.params.push(condition.value.clone());
                Some(format!("FIND_IN_SET(?, {})", column))
            }
            op => {
                self.params.push(condition.value.clone());
                Some(format!("{} {} ?", column, op.to_sql()))
            }
        }
    }
}

impl FilterTarget for SelectQuery {
    fn where_condition(&mut self, condition: &Condition) {
        if let Some(sql) = self.render(condition) {
            self.wheres.push(sql);
        }
    }

    fn where_any(&mut self, conditions: &[Condition]) {
        let parts: Vec<String> = conditions.iter().filter_map(|c| self.render(c)).collect();
        if !parts.is_empty() {
            self.wheres.push(format!("({})", parts.join(" OR ")));
        }
    }

    fn group_by(&mut self, column: &str) {
        self.group_by.push(column.to_string());
    }
}

/// Backtick-quote a MySQL identifier
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

pub fn validate_identifier(name: &str) -> Result<(), String> {
    let mut chars = name.chars();
    match chars.next() {
        None => Err("name cannot be empty".to_string()),
        Some(first) if !(first.is_ascii_alphabetic() || first == '_') => Err(format!("invalid name format: {}", name)),
        Some(_) if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') => Err(format!("invalid name format: {}", name)),
        Some(_) => Ok(()),
    }
}
