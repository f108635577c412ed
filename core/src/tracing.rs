//! Tracing utilities for query and hydration observability.
//!
//! Enable the `tracing` feature to emit events via the `tracing` crate.
//! These macros no-op when the feature is disabled, avoiding `#[cfg]` boilerplate
//! at every call site.

/// Emit a debug-level tracing event with the SQL text and bound value count.
///
/// ```ignore
/// tusk_trace_query!(&compiled.sql, compiled.values.len());
/// ```
#[macro_export]
macro_rules! tusk_trace_query {
    ($sql:expr, $value_count:expr) => {
        #[cfg(feature = "tracing")]
        tracing::debug!(sql = %$sql, values = $value_count, "tusk.query");
    };
}

/// Emit a trace-level event for a hydration step (memo hit, leaf cut-off).
///
/// ```ignore
/// tusk_trace_hydrate!("memo_hit", model.name, relation);
/// ```
#[macro_export]
macro_rules! tusk_trace_hydrate {
    ($event:literal, $model:expr, $detail:expr) => {
        #[cfg(feature = "tracing")]
        tracing::trace!(event = $event, model = %$model, detail = %$detail, "tusk.hydrate");
    };
}
