use serde_json::Value;

use super::params::{is_scalar, value_list, RequestParams};
use super::types::{Condition, FilterDescriptor, FilterOp};

/// Ordered column list of the target table. The only source of column names
/// that may reach SQL text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnWhitelist {
    columns: Vec<String>,
}

impl ColumnWhitelist {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { columns: columns.into_iter().map(Into::into).collect() }
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

pub struct FilterWhere;

impl FilterWhere {
    /// Translate request parameters into filter descriptors. Rules run in a fixed
    /// order and each contributes independently; nothing here can fail.
    pub fn build(params: &RequestParams, whitelist: &ColumnWhitelist) -> Vec<FilterDescriptor> {
        let mut filters = Vec::new();
        Self::exact_matches(params, whitelist, &mut filters);
        Self::search(params, whitelist, &mut filters);
        Self::operator_suffixes(params, whitelist, &mut filters);
        Self::find_in_set(params, whitelist, &mut filters);
        Self::group_by(params, whitelist, &mut filters);
        filters
    }

    fn exact_matches(params: &RequestParams, whitelist: &ColumnWhitelist, out: &mut Vec<FilterDescriptor>) {
        for column in whitelist.columns() {
            // Empty strings count as absent; sequences never match exactly
            if let Some(value) = params.filled(column).filter(|v| is_scalar(v)) {
                out.push(FilterDescriptor::Simple(Condition::new(column, FilterOp::Eq, value.clone())));
            }
        }
    }

    fn search(params: &RequestParams, whitelist: &ColumnWhitelist, out: &mut Vec<FilterDescriptor>) {
        let Some(term) = params.str("search") else { return };

        let fields = params
            .list("search_fields")
            .unwrap_or_else(|| whitelist.columns().to_vec());

        let conditions: Vec<Condition> = fields
            .into_iter()
            .filter(|f| whitelist.contains(f))
            .map(|f| Condition::new(f, FilterOp::Like, Value::String(format!("%{}%", term))))
            .collect();

        if !conditions.is_empty() {
            out.push(FilterDescriptor::OrGroup { conditions });
        }
    }

    fn operator_suffixes(params: &RequestParams, whitelist: &ColumnWhitelist, out: &mut Vec<FilterDescriptor>) {
        for column in whitelist.columns() {
            for (suffix, op) in FilterOp::SUFFIXES {
                let Some(value) = params.filled(&format!("{}_{}", column, suffix)) else { continue };

                let value = match op {
                    FilterOp::In | FilterOp::NotIn => {
                        let items = value_list(value);
                        if items.is_empty() {
                            continue;
                        }
                        Value::Array(items.into_iter().map(Value::String).collect())
                    }
                    _ if is_scalar(value) => value.clone(),
                    _ => continue,
                };

                out.push(FilterDescriptor::Simple(Condition::new(column, op, value)));
            }
        }
    }

    fn find_in_set(params: &RequestParams, whitelist: &ColumnWhitelist, out: &mut Vec<FilterDescriptor>) {
        for column in whitelist.columns() {
            if let Some(value) = params.filled(&format!("{}_find_in_set", column)).filter(|v| is_scalar(v)) {
                out.push(FilterDescriptor::Simple(Condition::new(column, FilterOp::FindInSet, value.clone())));
            }
        }

        for column in whitelist.columns() {
            let Some(values) = params.list(&format!("{}_find_in_set_any", column)) else { continue };
            let conditions: Vec<Condition> = values
                .into_iter()
                .map(|v| Condition::new(column, FilterOp::FindInSet, Value::String(v)))
                .collect();
            if !conditions.is_empty() {
                out.push(FilterDescriptor::OrGroup { conditions });
            }
        }
    }

    fn group_by(params: &RequestParams, whitelist: &ColumnWhitelist, out: &mut Vec<FilterDescriptor>) {
        let Some(columns) = params.list("group_by") else { return };
        for column in columns {
            if whitelist.contains(&column) {
                out.push(FilterDescriptor::GroupBy { column });
            } else {
                tracing::debug!("Dropping non-whitelisted group_by column: {}", column);
            }
        }
    }
}
