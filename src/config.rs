//! Execution-wide configuration: the handful of policy knobs this engine
//! leaves open rather than hard-coding, per the ambient configuration
//! surface every complete crate needs (§2).

/// Tunables governing one execution (or a whole server's default for all
/// of its executions).
#[derive(Clone, Copy, Debug)]
pub struct ExecutionConfig {
    /// Default `initialCount` for a `@stream` directive that omits the
    /// argument: how many leading list items are included in the
    /// synchronous (initial or enclosing) payload before the rest stream
    /// as their own incremental record. The GraphQL incremental-delivery
    /// spec leaves the default to the implementation; `0` streams every
    /// item, matching the directive's stated intent of returning control
    /// to the client as early as possible.
    pub default_stream_initial_count: usize,
    /// Upper bound on simultaneously in-flight `@defer`/`@stream` records
    /// for one operation, enforced by [`crate::incremental::Coordinator`]
    /// (§5). Bounds the memory and scheduler pressure a single pathological
    /// query (hundreds of deferred fragments) can exert.
    pub max_concurrent_incremental_records: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            default_stream_initial_count: 0,
            max_concurrent_incremental_records: 64,
        }
    }
}
