//! Core of tusk: filter trees, SELECT compilation, records, result sets and
//! relation hydration. Database access goes through the [`Engine`] trait.

#[macro_use]
mod tracing;

pub mod collection;
pub mod compiler;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod hydrate;
pub mod paginate;
pub mod record;
pub mod value;

// Re-export key types and traits
pub use collection::ResultSet;
pub use compiler::{CompiledQuery, JoinTarget, OrderBy, QueryCompiler, quote_ident};
pub use config::{Config, HydrationConfig, PaginationConfig};
pub use engine::Engine;
pub use error::{Result, TuskError};
pub use filter::{Filter, FilterNode, IntoFilter, Logic};
pub use hydrate::{HydrationPass, hydrate, hydrate_all};
pub use paginate::Pagination;
pub use record::{Entity, Fields, Inheritance, ModelInfo, Record, Relation, load_boxed};
pub use value::{FromValue, Value};

// Used by `record!` expansions
#[doc(hidden)]
pub use paste;
#[doc(hidden)]
pub use serde_json;

/// Shorthand for `QueryCompiler::new`.
pub fn compile(table: &str) -> QueryCompiler {
    QueryCompiler::new(table)
}
