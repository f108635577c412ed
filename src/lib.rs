//! # Tusk
//!
//! A small record mapper for MySQL-style databases: composable filter trees,
//! a SELECT compiler with named placeholders, record types with lifecycle
//! hooks, and depth-bounded relation hydration.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tusk::prelude::*;
//!
//! tusk::record! {
//!     pub struct Post {
//!         table: "post",
//!         primary_key: ["post_id"],
//!         fields: { post_id: i64, author_id: i64, title: String },
//!     }
//! }
//!
//! # fn run(engine: &dyn Engine) -> tusk::Result<()> {
//! let compiled = tusk::compile("post")
//!     .r#where(("author_id", "=", 7))
//!     .order("post_id", OrderBy::Desc)
//!     .limit(10)
//!     .build();
//! assert_eq!(
//!     compiled.sql,
//!     "SELECT SQL_CALC_FOUND_ROWS `post`.* FROM `post` WHERE `post`.`author_id` = :value1 ORDER BY `post_id` DESC LIMIT 0, 10"
//! );
//!
//! let posts = Post::find_all(engine, ("author_id", "=", 7))?;
//! let json = tusk::hydrate_all(&posts, engine, &HydrationConfig::default())?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! | Feature   | Effect                                             |
//! |-----------|----------------------------------------------------|
//! | `tracing` | Emit `tracing` events for queries and hydration    |

/// Result type for tusk operations
pub use tusk_core::error::Result;

/// Error types
pub mod error {
    pub use tusk_core::error::TuskError;
}

pub use tusk_core::{
    CompiledQuery, Config, Entity, Engine, Fields, Filter, FilterNode, FromValue, HydrationConfig,
    HydrationPass, Inheritance, IntoFilter, JoinTarget, Logic, ModelInfo, OrderBy, Pagination,
    PaginationConfig, QueryCompiler, Record, Relation, ResultSet, TuskError, Value, compile,
    hydrate, hydrate_all, quote_ident,
};

/// Module-level access to the core building blocks.
pub mod core {
    pub use tusk_core::{
        collection, compiler, config, engine, filter, hydrate, paginate, record, value,
    };
}

/// Declares a record type; see [`tusk_core::record!`].
pub use tusk_core::record;

/// Everything needed to declare records and build queries.
pub mod prelude {
    pub use tusk_core::{
        Engine, Entity, Fields, Filter, FilterNode, FromValue, HydrationConfig, IntoFilter,
        OrderBy, Pagination, QueryCompiler, Record, Relation, ResultSet, TuskError, Value,
    };
}
