use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use std::ops::Index;

use indexmap::IndexSet;

use crate::scope::OpenScope;

/// The stable position of a scope's [aggregate](ScopeAggregate) in an
/// [`AggregateTable`].
///
/// Slots are handed out in the order in which scope names are first seen.
/// Slot 0 is reserved for the [root](SlotIndex::ROOT), which stands for "no
/// enclosing scope".
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SlotIndex(usize);

impl SlotIndex {
    pub const ROOT: Self = Self(0);

    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }

    pub fn value(self) -> usize {
        self.0
    }

    fn from_name_index(name_index: usize) -> Self {
        Self(name_index + 1)
    }

    fn name_index(self) -> Option<usize> {
        self.0.checked_sub(1)
    }
}

impl Display for SlotIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "#{}", self.0)
    }
}

/// Cycles accumulated by all invocations of one named scope.
#[derive(Debug, Default, Clone, Eq, PartialEq, Hash)]
pub struct ScopeAggregate {
    pub label: String,

    /// The cycles spent in this scope, summed over all invocations, including
    /// the time spent in nested scopes.
    ///
    /// If the scope recurses, nested invocations of the scope are counted once
    /// per invocation. The difference to [`elapsed_in_children`][children] is
    /// still exactly the self time.
    ///
    /// [children]: Self::elapsed_in_children
    pub elapsed_self_and_descendants: u64,

    /// The cycles spent in scopes that were entered while this scope was the
    /// innermost active one.
    pub elapsed_in_children: u64,

    /// The cycles between entering and leaving the outermost invocation of
    /// this scope, summed over all outermost invocations. Unlike
    /// [`elapsed_self_and_descendants`][total], recursion is not counted
    /// twice.
    ///
    /// [total]: Self::elapsed_self_and_descendants
    pub elapsed_inclusive: u64,

    /// The number of times the scope was left.
    pub hit_count: u64,
}

impl ScopeAggregate {
    /// The cycles spent in this scope but not in any of its children.
    pub fn self_time(&self) -> u64 {
        self.elapsed_self_and_descendants
            .saturating_sub(self.elapsed_in_children)
    }

    /// Whether any time was ever recorded for this scope.
    pub fn is_empty(&self) -> bool {
        self.elapsed_self_and_descendants == 0
    }
}

/// All [aggregates](ScopeAggregate) of one profiling session, together with
/// the mapping from scope names to [slots](SlotIndex).
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AggregateTable {
    names: IndexSet<String>,

    /// Indexed by [`SlotIndex`]. Always contains at least the root.
    aggregates: Vec<ScopeAggregate>,
}

impl AggregateTable {
    pub fn new() -> Self {
        Self {
            names: IndexSet::new(),
            aggregates: vec![ScopeAggregate::default()],
        }
    }

    /// The slot for the given scope name. Unseen names get the next free slot.
    pub fn get_or_create_slot(&mut self, name: &str) -> SlotIndex {
        if let Some(name_index) = self.names.get_index_of(name) {
            return SlotIndex::from_name_index(name_index);
        }

        let (name_index, _) = self.names.insert_full(name.to_string());
        self.aggregates.push(ScopeAggregate::default());
        SlotIndex::from_name_index(name_index)
    }

    /// The slot of a scope name, if the name was seen.
    pub fn slot_of(&self, name: &str) -> Option<SlotIndex> {
        self.names
            .get_index_of(name)
            .map(SlotIndex::from_name_index)
    }

    /// The scope name a slot was created for. The root has no name.
    pub fn name_of(&self, slot: SlotIndex) -> Option<&str> {
        let name_index = slot.name_index()?;
        self.names.get_index(name_index).map(String::as_str)
    }

    pub fn get(&self, slot: SlotIndex) -> Option<&ScopeAggregate> {
        self.aggregates.get(slot.0)
    }

    /// The aggregate of the root, which collects the time spent in all
    /// top-level scopes as its [children's time][children].
    ///
    /// [children]: ScopeAggregate::elapsed_in_children
    pub fn root(&self) -> &ScopeAggregate {
        &self[SlotIndex::ROOT]
    }

    /// The number of slots, including the root.
    pub fn len(&self) -> usize {
        self.aggregates.len()
    }

    /// Whether no scope name was seen yet. The root always exists.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// All slots in slot order, starting with the root.
    pub fn iter(&self) -> impl Iterator<Item = (SlotIndex, &ScopeAggregate)> {
        self.aggregates
            .iter()
            .enumerate()
            .map(|(index, aggregate)| (SlotIndex(index), aggregate))
    }

    /// Forget all scope names and aggregates.
    pub fn clear(&mut self) {
        self.names.clear();
        self.aggregates.clear();
        self.aggregates.push(ScopeAggregate::default());
    }

    /// Fold the time spent in a scope that was just left into its own
    /// aggregate and into the aggregate of the scope that was active when it
    /// was entered.
    pub(crate) fn record_exit(&mut self, scope: &OpenScope, elapsed: u64) {
        self.aggregates[scope.parent.0].elapsed_in_children += elapsed;

        let aggregate = &mut self.aggregates[scope.slot.0];
        aggregate.elapsed_self_and_descendants += elapsed;
        aggregate.elapsed_inclusive = scope.inclusive_at_entry + elapsed;
        aggregate.hit_count += 1;

        if let Some(name) = scope.slot.name_index().and_then(|i| self.names.get_index(i)) {
            if aggregate.label != *name {
                aggregate.label.clone_from(name);
            }
        }
    }
}

impl Default for AggregateTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<SlotIndex> for AggregateTable {
    type Output = ScopeAggregate;

    fn index(&self, slot: SlotIndex) -> &Self::Output {
        &self.aggregates[slot.0]
    }
}
