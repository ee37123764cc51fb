//! A lightweight, hierarchical, instrumentation-based profiler.
//!
//! Call sites mark named scopes. The profiler accumulates the CPU cycles spent
//! in every scope across all of its invocations and attributes them to the
//! enclosing scope. At the end of a profiling [session](Session), a [`Report`]
//! breaks the total down into the self time of every scope, its share of the
//! total, and the share spent in its children.
//!
//! Scopes are timed with the CPU's [cycle counter](timer::CycleCounter), which
//! is cheap enough to read on every entry and exit. Its frequency is unknown in
//! general, so it is [estimated](frequency::estimate_counter_frequency) against
//! the operating system's clock once, when the session finishes.
//!
//! # Examples
//!
//! Explicit sessions hand out [scope guards](ScopeGuard). The time between
//! creating a guard and dropping it is attributed to the guard's scope. Nested
//! scopes are opened through the guard of the enclosing scope:
//!
//! ```
//! # use cycle_profiler::Session;
//! fn fib(session: &mut Session, n: u64) -> u64 {
//!     let mut scope = session.scope("fib");
//!     match n {
//!         0 | 1 => n,
//!         _ => fib(&mut scope, n - 1) + fib(&mut scope, n - 2),
//!     }
//! }
//!
//! let mut session = Session::new();
//! let fib_15 = {
//!     let mut scope = session.scope("main");
//!     fib(&mut scope, 15)
//! };
//! let report = session.finish();
//!
//! assert_eq!(610, fib_15);
//! let main = report.line("main").unwrap();
//! assert!(main.children_percentage.is_some());
//! ```
//!
//! For profiling code without passing a session around, every thread has a
//! default session. See the [`profiler`] module and
//! [`profile_scope!`](crate::profile_scope).

// Only set by `cargo llvm-cov` on a nightly toolchain. Allows excluding test
// modules from coverage reports with `#[coverage(off)]`.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub use timer;

pub use crate::aggregate::AggregateTable;
pub use crate::aggregate::ScopeAggregate;
pub use crate::aggregate::SlotIndex;
pub use crate::config::Config;
pub use crate::error::ProfilerError;
pub use crate::report::ColoredReport;
pub use crate::report::Report;
pub use crate::report::ReportLine;
pub use crate::scope::ScopeGuard;
pub use crate::session::Session;

pub mod aggregate;
pub mod config;
pub mod error;
pub mod frequency;
pub mod profiler;
pub mod report;
pub mod scope;
pub mod session;

#[cfg(test)]
mod shared_tests;
