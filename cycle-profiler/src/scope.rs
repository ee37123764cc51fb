use std::ops::Deref;
use std::ops::DerefMut;

use timer::TickSource;
use timer::WallClock;

use crate::aggregate::SlotIndex;
use crate::session::Session;

/// Everything that needs to be remembered between entering and leaving a
/// scope.
///
/// The parent is captured on entry. By the time the scope is left, nested
/// scopes have pushed and popped the session's cursor back to this very
/// scope's slot, so reading the cursor then would attribute the time to the
/// scope itself instead of its caller.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub(crate) struct OpenScope {
    pub slot: SlotIndex,
    pub parent: SlotIndex,

    /// The slot's [inclusive time](crate::aggregate::ScopeAggregate::elapsed_inclusive)
    /// on entry. Leaving the scope overwrites the inclusive time with this
    /// value plus the elapsed time, which undoes anything nested invocations
    /// of the same scope have added in the meantime.
    pub inclusive_at_entry: u64,

    pub start: u64,

    /// Identifies the session (and its reset) in which the scope was entered.
    pub generation: u64,
}

#[cfg(test)]
impl OpenScope {
    pub(crate) fn for_test(slot: SlotIndex, parent: SlotIndex) -> Self {
        Self {
            slot,
            parent,
            inclusive_at_entry: 0,
            start: 0,
            generation: 0,
        }
    }
}

/// A profiled scope. Created by [`Session::scope`]; the scope ends when the
/// guard is dropped, no matter how the enclosing block is left: by falling off
/// its end, through an early `return`, through `?`, or by unwinding a panic.
///
/// The guard borrows its session mutably and dereferences to it. Nested scopes
/// are opened through the guard of the enclosing scope, which guarantees that
/// scopes are left in the reverse order of entering them.
///
/// ```
/// # use cycle_profiler::Session;
/// fn parse(session: &mut Session, input: &str) -> Vec<u32> {
///     let mut scope = session.scope("parse");
///     input.split(',').map(|token| {
///         let _scope = scope.scope("parse token");
///         token.trim().parse().unwrap_or_default()
///     }).collect()
/// }
///
/// let mut session = Session::new();
/// let numbers = parse(&mut session, "1, 2, 3");
/// assert_eq!(vec![1, 2, 3], numbers);
/// ```
#[must_use = "the scope ends as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ScopeGuard<'session, C: TickSource, W: WallClock> {
    session: &'session mut Session<C, W>,
    scope: OpenScope,
}

impl<'session, C: TickSource, W: WallClock> ScopeGuard<'session, C, W> {
    pub(crate) fn new(session: &'session mut Session<C, W>, label: &str) -> Self {
        let scope = session.enter(label);
        Self { session, scope }
    }

    /// The slot of the profiled scope.
    pub fn slot(&self) -> SlotIndex {
        self.scope.slot
    }
}

impl<C: TickSource, W: WallClock> Deref for ScopeGuard<'_, C, W> {
    type Target = Session<C, W>;

    fn deref(&self) -> &Self::Target {
        self.session
    }
}

impl<C: TickSource, W: WallClock> DerefMut for ScopeGuard<'_, C, W> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.session
    }
}

impl<C: TickSource, W: WallClock> Drop for ScopeGuard<'_, C, W> {
    fn drop(&mut self) {
        self.session.exit(self.scope);
    }
}
