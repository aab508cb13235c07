//! Whitelist-driven translation of request parameters into SQL predicates.

pub mod error;
pub mod filter;
pub mod filter_order;
pub mod filter_where;
pub mod pagination;
pub mod params;
pub mod types;

pub use error::FilterError;
pub use filter::{apply_filters, quote_identifier, FilterTarget, SelectQuery};
pub use filter_order::FilterOrder;
pub use filter_where::{ColumnWhitelist, FilterWhere};
pub use pagination::{PageMeta, Pagination};
pub use params::RequestParams;
pub use types::*;

/// Build descriptors for `params` against the given column whitelist.
pub fn build_filters(params: &RequestParams, whitelist: &ColumnWhitelist) -> Vec<FilterDescriptor> {
    FilterWhere::build(params, whitelist)
}
