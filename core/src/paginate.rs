//! Request pagination.
//!
//! Turns query-string pairs into a [`Pagination`]: `page`/`size` become
//! offset and limit, `order` tokens (`field,DIR`) become ORDER BY entries,
//! `filter` carries a serialized [`Filter`], and every other pair is an
//! equality filter on the field of the same name.

use compact_str::CompactString;
use indexmap::IndexMap;

use crate::compiler::OrderBy;
use crate::config::PaginationConfig;
use crate::error::Result;
use crate::filter::{Filter, FilterNode, IntoFilter, Logic};

/// Filter, ordering and bounds to apply to a compiler.
#[derive(Debug, Clone, PartialEq)]
pub struct Pagination {
    pub filter: Filter,
    pub orders: IndexMap<CompactString, OrderBy>,
    pub offset: u64,
    /// `None` means no LIMIT clause
    pub limit: Option<u64>,
}

impl Default for Pagination {
    fn default() -> Self {
        Self::with_config(&PaginationConfig::default())
    }
}

impl Pagination {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty pagination bounded by the configured default limit.
    pub fn with_config(config: &PaginationConfig) -> Self {
        Self {
            filter: Filter::new(),
            orders: IndexMap::new(),
            offset: 0,
            limit: Some(config.default_limit),
        }
    }

    /// Parses query pairs with the default configuration.
    pub fn parse<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Self::parse_with(pairs, &PaginationConfig::default())
    }

    /// Parses query pairs. `order` may repeat (also as `order[]`); an unknown
    /// direction fails with `InvalidOrder` and a malformed `filter` with `Transport`.
    pub fn parse_with<I, K, V>(pairs: I, config: &PaginationConfig) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut pagination = Self::with_config(config);
        let mut page = None;
        let mut size = None;
        let mut encoded_filter = None;
        let mut equalities = Vec::new();

        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref());
            match key {
                "page" => page = value.trim().parse::<u64>().ok(),
                "size" => size = value.trim().parse::<u64>().ok(),
                "order" | "order[]" => {
                    if !value.is_empty() {
                        pagination.add_order_token(value)?;
                    }
                }
                "filter" => {
                    if !value.is_empty() {
                        encoded_filter = Some(value.to_string());
                    }
                }
                _ => equalities.push((key.to_string(), value.to_string())),
            }
        }

        // An offset past u64::MAX keeps the default bounds.
        if let (Some(page @ 1..), Some(size @ 1..)) = (page, size) {
            let size = config.max_limit.map_or(size, |max| size.min(max));
            if let Some(offset) = (page - 1).checked_mul(size) {
                pagination.offset = offset;
                pagination.limit = Some(size);
            }
        }

        if let Some(encoded) = encoded_filter {
            pagination.r#where(Filter::deserialize(&encoded)?);
        }

        for (field, value) in equalities {
            pagination.add_filter(&field, "=", value.as_str());
        }
        Ok(pagination)
    }

    pub fn add_order(&mut self, field: impl Into<CompactString>, direction: OrderBy) {
        self.orders.insert(field.into(), direction);
    }

    /// Adds one `field,DIR` token; the direction defaults to ascending.
    pub fn add_order_token(&mut self, token: &str) -> Result<()> {
        let (field, direction) = match token.split_once(',') {
            Some((field, direction)) => (field, OrderBy::parse(direction)?),
            None => (token, OrderBy::Asc),
        };
        self.add_order(field.trim(), direction);
        Ok(())
    }

    /// Adds a comparison under AND; the value `NULL` turns it into `IS NULL`.
    pub fn add_filter(&mut self, field: &str, operator: &str, value: &str) {
        let node = if value == "NULL" {
            FilterNode::unary(field, "IS NULL")
        } else {
            FilterNode::binary(field, operator, value)
        };
        self.filter.push(Logic::And, node);
    }

    pub fn r#where(&mut self, expr: impl IntoFilter) -> &mut Self {
        if let Some(node) = expr.into_filter() {
            self.filter.push(Logic::And, node);
        }
        self
    }
}
