//! A default [`Session`] per thread, for profiling code without passing a
//! session around.
//!
//! Begin the session with [`begin_session`], mark scopes with
//! [`profile_scope!`](crate::profile_scope), and get the [`Report`] through
//! [`end_session`]:
//!
//! ```
//! # use cycle_profiler::profile_scope;
//! # use cycle_profiler::profiler;
//! fn fib(n: u64) -> u64 {
//!     profile_scope!("fib");
//!     match n {
//!         0 | 1 => n,
//!         _ => fib(n - 1) + fib(n - 2),
//!     }
//! }
//!
//! profiler::begin_session();
//! let fib_20 = fib(20);
//! let report = profiler::end_session();
//!
//! assert_eq!(6765, fib_20);
//! # let _ = report;
//! ```
//!
//! Every thread has its own session. Scopes entered on one thread never show
//! up in the report of another.
//!
//! # Disabling Profiling
//!
//! In release builds, the feature `no_profile` compiles the thread-local
//! profiler out: [`begin_session`] does nothing, [`profile_scope!`] does not
//! read any clock, and [`end_session`] always returns an empty report. Builds
//! with `debug_assertions` always profile. Explicitly created [`Session`]s are
//! not affected by the feature.
//!
//! [`profile_scope!`]: crate::profile_scope

use std::cell::RefCell;

use crate::report::Report;
use crate::scope::OpenScope;
use crate::session::Session;

thread_local! {
    pub(crate) static PROFILER: RefCell<Option<Session>> = const { RefCell::new(None) };
}

const PROFILING_IS_ENABLED: bool = cfg!(any(debug_assertions, not(feature = "no_profile")));

/// Start profiling on the current thread. If a session is already running on
/// this thread, it is discarded and a new one begins.
pub fn begin_session() {
    if PROFILING_IS_ENABLED {
        PROFILER.replace(Some(Session::new()));
    }
}

/// Stop profiling on the current thread and generate the [`Report`]. If no
/// session is running, an empty report is returned.
///
/// Scopes that are still open are missing from the report. Leaving them later
/// has no effect.
pub fn end_session() -> Report {
    PROFILER
        .take()
        .map(|mut session| session.finish())
        .unwrap_or_default()
}

/// Whether a session is running on the current thread.
pub fn is_running() -> bool {
    PROFILER.with_borrow(Option::is_some)
}

/// A scope in the current thread's session. Usually created through
/// [`profile_scope!`](crate::profile_scope).
///
/// If no session is running when the scope is entered, the guard is inert.
/// If the session ends or is replaced while the guard is alive, dropping the
/// guard has no effect.
#[must_use = "the scope ends as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ThreadScope {
    scope: Option<OpenScope>,
}

impl ThreadScope {
    pub fn enter(label: &str) -> Self {
        if !PROFILING_IS_ENABLED {
            return Self { scope: None };
        }

        let scope = PROFILER.with_borrow_mut(|profiler| {
            profiler.as_mut().map(|session| session.enter(label))
        });
        Self { scope }
    }

    /// Whether the guard belongs to a session. Does not tell whether that
    /// session is still running.
    pub fn is_active(&self) -> bool {
        self.scope.is_some()
    }
}

impl Drop for ThreadScope {
    fn drop(&mut self) {
        let Some(scope) = self.scope.take() else {
            return;
        };

        // the thread-local might already be gone if the thread is shutting down
        let _ = PROFILER.try_with(|profiler| {
            if let Some(session) = profiler.borrow_mut().as_mut() {
                session.exit(scope);
            }
        });
    }
}

/// Profile the rest of the enclosing block as a scope with the given label in
/// the current thread's [session](crate::profiler).
///
/// ```
/// # use cycle_profiler::profile_scope;
/// fn parse(input: &str) -> Vec<u32> {
///     profile_scope!("parse");
///     input.split(',').filter_map(|token| token.trim().parse().ok()).collect()
/// }
/// # cycle_profiler::profiler::begin_session();
/// # assert_eq!(vec![1, 2], parse("1, 2"));
/// # let _ = cycle_profiler::profiler::end_session();
/// ```
#[macro_export]
macro_rules! profile_scope {
    ($label:expr) => {
        let _profile_scope_guard = $crate::profiler::ThreadScope::enter($label);
    };
}
