use serde_json::Value;

use super::filter::quote_identifier;
use super::params::{scalar_text, RequestParams};
use super::types::{FilterOrderInfo, SortDirection};

pub const DEFAULT_ORDER_BY: &str = "id";

pub struct FilterOrder;

impl FilterOrder {
    /// Pair `order_by` entries with `order_direction` entries by position.
    /// A column survives only if the table really has it; matching is
    /// case-insensitive and the table's own spelling is used.
    pub fn resolve(params: &RequestParams, table_columns: &[String]) -> Vec<FilterOrderInfo> {
        let columns = params
            .filled("order_by")
            .map(positional)
            .unwrap_or_else(|| vec![DEFAULT_ORDER_BY.to_string()]);
        let directions = params.filled("order_direction").map(positional).unwrap_or_default();

        columns
            .iter()
            .enumerate()
            .filter_map(|(index, requested)| {
                let canonical = table_columns.iter().find(|c| c.eq_ignore_ascii_case(requested))?;
                let sort = directions
                    .get(index)
                    .map(|d| SortDirection::parse(d))
                    .unwrap_or(SortDirection::Desc);
                Some(FilterOrderInfo { column: canonical.clone(), sort })
            })
            .collect()
    }

    pub fn generate(infos: &[FilterOrderInfo]) -> String {
        if infos.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = infos
            .iter()
            .map(|i| format!("{} {}", quote_identifier(&i.column), i.sort.to_sql()))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }
}

/// Split without dropping empties so positions stay aligned.
fn positional(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|v| scalar_text(v).unwrap_or_default().trim().to_string())
            .collect(),
        other => scalar_text(other)
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_to_id_desc_when_column_exists() {
        let order = FilterOrder::resolve(&RequestParams::from_query(""), &columns(&["ID", "name"]));
        assert_eq!(order, vec![FilterOrderInfo { column: "ID".to_string(), sort: SortDirection::Desc }]);
    }

    #[test]
    fn default_is_skipped_without_id_column() {
        let order = FilterOrder::resolve(&RequestParams::from_query(""), &columns(&["code", "name"]));
        assert!(order.is_empty());
    }

    #[test]
    fn pairs_columns_with_directions_positionally() {
        let params = RequestParams::from_query("order_by=name, city,age&order_direction=ASC,sideways");
        let order = FilterOrder::resolve(&params, &columns(&["name", "city", "age"]));
        assert_eq!(
            order,
            vec![
                FilterOrderInfo { column: "name".to_string(), sort: SortDirection::Asc },
                FilterOrderInfo { column: "city".to_string(), sort: SortDirection::Desc },
                FilterOrderInfo { column: "age".to_string(), sort: SortDirection::Desc },
            ]
        );
    }

    #[test]
    fn unknown_columns_are_dropped_without_shifting_directions() {
        let params = RequestParams::from_query("order_by[]=bogus&order_by[]=name&order_direction[]=desc&order_direction[]=asc");
        let order = FilterOrder::resolve(&params, &columns(&["name"]));
        assert_eq!(order, vec![FilterOrderInfo { column: "name".to_string(), sort: SortDirection::Asc }]);
    }

    #[test]
    fn generates_order_clause() {
        let infos = vec![
            FilterOrderInfo { column: "a".to_string(), sort: SortDirection::Asc },
            FilterOrderInfo { column: "b".to_string(), sort: SortDirection::Desc },
        ];
        assert_eq!(FilterOrder::generate(&infos), "ORDER BY `a` ASC, `b` DESC");
        assert_eq!(FilterOrder::generate(&[]), "");
    }
}
