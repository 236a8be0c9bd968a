//! Structured logging at the seams this crate instruments: field
//! resolution start/stop, resolver errors, abort observations, and
//! incremental-record scheduling/completion (§2 ambient stack).
//!
//! Gated behind the optional `tracing` feature the same way the teacher
//! crate gates its own `tracing` integration: these compile to nothing at
//! all when the feature is off, so there is no cost (not even a disabled
//! span) for a caller who never enables it.

#[doc(hidden)]
#[macro_export]
macro_rules! __trace_internal {
    ($trace_type:ident; $($element:expr),*) => {{
        #[cfg(feature = "tracing")]
        tracing::$trace_type!($($element),*);
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __trace {
    ($($element:expr),*) => {{
        $crate::__trace_internal!(trace; $($element),*)
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __trace_debug {
    ($($element:expr),*) => {{
        $crate::__trace_internal!(debug; $($element),*)
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __trace_warn {
    ($($element:expr),*) => {{
        $crate::__trace_internal!(warn; $($element),*)
    }};
}
