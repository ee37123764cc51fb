use std::io;
use std::io::Write;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use timer::CycleCounter;
use timer::OsWallClock;
use timer::TickSource;
use timer::WallClock;
use tracing::debug;
use tracing::trace;

use crate::aggregate::AggregateTable;
use crate::aggregate::SlotIndex;
use crate::config;
use crate::config::Config;
use crate::error::ProfilerError;
use crate::frequency::estimate_counter_frequency;
use crate::report::Report;
use crate::scope::OpenScope;
use crate::scope::ScopeGuard;

/// Distinguishes sessions and their resets, across all threads. Scopes that
/// outlive the session generation they were entered in are ignored.
static NEXT_GENERATION: AtomicU64 = AtomicU64::new(0);

fn next_generation() -> u64 {
    NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)
}

/// One profiling session: all [aggregates](crate::aggregate::ScopeAggregate)
/// collected between [beginning](Session::begin) and
/// [finishing](Session::finish) it.
///
/// A session is generic over its clocks. The defaults read the CPU's
/// [cycle counter](CycleCounter) for timing scopes and the
/// [operating system's clock](OsWallClock) for calibrating the cycle counter's
/// frequency.
///
/// Sessions are meant to be used from a single thread. Independent sessions
/// may coexist, for example one per thread.
#[derive(Debug)]
pub struct Session<C = CycleCounter, W = OsWallClock> {
    counter: C,
    wall_clock: W,
    config: Config,

    /// The counter's reading when the session began.
    start: u64,

    table: AggregateTable,

    /// The slot of the innermost active scope.
    active_parent: SlotIndex,

    generation: u64,
}

impl Session {
    /// A session using the CPU's cycle counter and the current thread's
    /// [configuration](config). The session begins immediately.
    pub fn new() -> Self {
        Self::with_sources(CycleCounter, OsWallClock)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: TickSource, W: WallClock> Session<C, W> {
    /// A session using the given clocks and the current thread's
    /// [configuration](config). The session begins immediately.
    pub fn with_sources(counter: C, wall_clock: W) -> Self {
        Self::with_config(counter, wall_clock, config::current())
    }

    /// A session using the given clocks and configuration. The session begins
    /// immediately.
    pub fn with_config(counter: C, wall_clock: W, config: Config) -> Self {
        let mut session = Self {
            counter,
            wall_clock,
            config,
            start: 0,
            table: AggregateTable::new(),
            active_parent: SlotIndex::ROOT,
            generation: 0,
        };
        session.begin();
        session
    }

    /// Discard everything recorded so far and start measuring anew.
    ///
    /// Scopes that are still open are forgotten: leaving them later has no
    /// effect.
    pub fn begin(&mut self) {
        self.table.clear();
        self.active_parent = SlotIndex::ROOT;
        self.generation = next_generation();
        debug!(generation = self.generation, "profiling session begins");
        self.start = self.counter.read_ticks();
    }

    /// Start profiling a scope. The scope ends when the returned guard is
    /// dropped. Scopes with equal labels share one
    /// [aggregate](crate::aggregate::ScopeAggregate).
    pub fn scope(&mut self, label: &str) -> ScopeGuard<'_, C, W> {
        ScopeGuard::new(self, label)
    }

    pub fn aggregates(&self) -> &AggregateTable {
        &self.table
    }

    /// The slot of the innermost active scope, or the [root](SlotIndex::ROOT)
    /// if no scope is active.
    pub fn active_parent(&self) -> SlotIndex {
        self.active_parent
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The number of cycles that have passed since the session began.
    pub fn elapsed(&self) -> u64 {
        self.counter.read_ticks().saturating_sub(self.start)
    }

    pub(crate) fn enter(&mut self, label: &str) -> OpenScope {
        let slot = self.table.get_or_create_slot(label);
        let parent = std::mem::replace(&mut self.active_parent, slot);
        let inclusive_at_entry = self.table[slot].elapsed_inclusive;
        trace!(label, %slot, %parent, "enter scope");

        OpenScope {
            slot,
            parent,
            inclusive_at_entry,
            generation: self.generation,
            start: self.counter.read_ticks(),
        }
    }

    pub(crate) fn exit(&mut self, scope: OpenScope) {
        let stop = self.counter.read_ticks();
        if scope.generation != self.generation {
            trace!(slot = %scope.slot, "ignoring scope from a previous session");
            return;
        }

        self.active_parent = scope.parent;
        let elapsed = stop.saturating_sub(scope.start);
        self.table.record_exit(&scope, elapsed);
        trace!(slot = %scope.slot, elapsed, "exit scope");
    }

    /// Stop measuring and turn all aggregates into a [`Report`].
    ///
    /// Estimating the frequency of the cycle counter busy-waits for the
    /// configured [calibration window](Config::calibration_window). The
    /// estimation is skipped if there is nothing to report.
    ///
    /// Finishing does not reset the session. Scopes that are still open are
    /// missing from the report.
    pub fn finish(&mut self) -> Report {
        let total_elapsed = self.counter.read_ticks().saturating_sub(self.start);
        let label_width = self.config.label_width();

        let nothing_to_report = self.table.iter().all(|(_, aggregate)| aggregate.is_empty());
        if total_elapsed == 0 || nothing_to_report {
            debug!(total_elapsed, "profiling session finished without anything to report");
            return Report::empty(total_elapsed, label_width);
        }

        let window = self.config.calibration_window();
        let frequency = estimate_counter_frequency(&self.counter, &self.wall_clock, window);
        let report = Report::new(&self.table, total_elapsed, frequency, label_width);
        debug!(
            total_elapsed,
            frequency,
            num_lines = report.lines().len(),
            "profiling session finished"
        );

        report
    }

    /// [Finish](Self::finish) the session and print the report to standard
    /// output.
    ///
    /// # Errors
    ///
    /// Errors if the report cannot be written.
    pub fn end(&mut self) -> Result<Report, ProfilerError> {
        self.end_to(&mut io::stdout().lock())
    }

    /// [Finish](Self::finish) the session and write the report to the given
    /// writer.
    ///
    /// # Errors
    ///
    /// Errors if the report cannot be written.
    pub fn end_to(&mut self, writer: &mut impl Write) -> Result<Report, ProfilerError> {
        let report = self.finish();
        report.write_to(writer)?;
        Ok(report)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use assert2::assert;
    use assert2::let_assert;
    use itertools::Itertools;
    use test_strategy::proptest;

    use super::*;
    use crate::shared_tests::SimulatedSession;
    use crate::shared_tests::SimulatedTime;
    use crate::shared_tests::simulated_session;

    fn assert_close(expected: f64, actual: f64) {
        assert!((expected - actual).abs() < 1e-9);
    }

    #[test]
    fn new_session_begins_at_the_root() {
        let (session, _) = simulated_session();
        assert!(session.active_parent().is_root());
        assert!(session.aggregates().is_empty());
        assert!(0 == session.elapsed());
    }

    #[test]
    fn nested_scopes_split_self_time_between_parent_and_child() {
        let (mut session, time) = simulated_session();
        {
            let mut a = session.scope("A");
            time.advance(5_000_000);
            let _b = a.scope("B");
            time.advance(5_000_000);
        }
        let report = session.finish();

        let labels = report.lines().iter().map(|line| line.label.as_str()).collect_vec();
        assert!(vec!["A", "B"] == labels);

        let_assert!(Some(a) = report.line("A"));
        assert_close(50.0, a.self_percentage);
        let_assert!(Some(a_children) = a.children_percentage);
        assert_close(50.0, a_children);
        let_assert!(Some(a_inclusive) = a.inclusive_percentage);
        assert_close(100.0, a_inclusive);
        assert!((a.self_time_ms - 5.0).abs() < 0.05);

        let_assert!(Some(rendered_a) = report.to_string().lines().next().map(str::to_string));
        assert!(rendered_a.starts_with("A "));
        assert!(rendered_a.ends_with("ms 50.00%  50.00%"));

        let_assert!(Some(b) = report.line("B"));
        assert_close(50.0, b.self_percentage);
        assert!(b.inclusive_percentage.is_none());
        assert!(b.children_percentage.is_none());
    }

    #[test]
    fn sequential_scopes_at_root_level_add_up_to_everything() {
        let (mut session, time) = simulated_session();
        {
            let _x = session.scope("X");
            time.advance(3_000_000);
        }
        {
            let _y = session.scope("Y");
            time.advance(7_000_000);
        }
        let report = session.finish();

        let_assert!([x, y] = report.lines());
        assert_close(30.0, x.self_percentage);
        assert_close(70.0, y.self_percentage);
        assert!(x.children_percentage.is_none());
        assert!(y.children_percentage.is_none());
    }

    #[test]
    fn ending_a_session_without_scopes_reports_nothing() {
        let (mut session, time) = simulated_session();
        time.advance(1_000);
        let report = session.finish();
        assert!(report.is_empty());
        assert!(0 == report.frequency());
    }

    #[test]
    fn ending_an_instantaneous_session_reports_nothing() {
        let (mut session, _) = simulated_session();
        let report = session.finish();
        assert!(report.is_empty());
        assert!(0 == report.total_elapsed());
    }

    #[test]
    fn names_that_were_never_entered_produce_no_line() {
        let (mut session, time) = simulated_session();
        {
            let _scope = session.scope("used");
            time.advance(10);
        }
        {
            // entered, but no measurable time passes
            let _scope = session.scope("instantaneous");
        }
        let report = session.finish();

        assert!(1 == report.lines().len());
        assert!(report.line("used").is_some());
        assert!(report.line("instantaneous").is_none());
    }

    #[test]
    fn beginning_anew_discards_previous_results() {
        let (mut session, time) = simulated_session();
        {
            let _scope = session.scope("before");
            time.advance(10);
        }
        session.begin();
        {
            let _scope = session.scope("after");
            time.advance(10);
        }
        let report = session.finish();

        assert!(report.line("before").is_none());
        assert!(report.line("after").is_some());
        assert!(10 == report.total_elapsed());
    }

    #[test]
    fn line_order_is_first_seen_order_across_session_resets() {
        fn workload(session: &mut SimulatedSession, time: &SimulatedTime) {
            for label in ["zeta", "alpha", "mu", "alpha", "zeta"] {
                let _scope = session.scope(label);
                time.advance(label.len() as u64);
            }
        }

        let (mut session, time) = simulated_session();
        workload(&mut session, &time);
        let first = session.finish();
        session.begin();
        workload(&mut session, &time);
        let second = session.finish();

        let labels = |report: &Report| report.lines().iter().map(|l| l.label.clone()).collect_vec();
        assert!(vec!["zeta", "alpha", "mu"] == labels(&first));
        assert!(labels(&first) == labels(&second));
    }

    #[test]
    fn recursion_accumulates_into_one_slot_without_double_counting() {
        fn recurse(session: &mut SimulatedSession, time: &SimulatedTime, depth: u64) {
            let mut scope = session.scope("recurse");
            time.advance(10);
            if depth > 0 {
                recurse(&mut scope, time, depth - 1);
            }
        }

        let (mut session, time) = simulated_session();
        recurse(&mut session, &time, 3);

        let_assert!(Some(slot) = session.aggregates().slot_of("recurse"));
        let aggregate = &session.aggregates()[slot];
        assert!(4 == aggregate.hit_count);
        assert!(40 + 30 + 20 + 10 == aggregate.elapsed_self_and_descendants);
        assert!(30 + 20 + 10 == aggregate.elapsed_in_children);
        assert!(40 == aggregate.self_time());
        assert!(40 == aggregate.elapsed_inclusive);
        assert!(40 == session.aggregates().root().elapsed_in_children);

        let report = session.finish();
        let_assert!(Some(line) = report.line("recurse"));
        assert_close(100.0, line.self_percentage);
        let_assert!(Some(children) = line.children_percentage);
        assert_close(150.0, children);
        let_assert!(Some(inclusive) = line.inclusive_percentage);
        assert_close(100.0, inclusive);
        assert!(report.to_string().ends_with("100.00% 150.00%\n"));
    }

    #[test]
    fn re_entering_a_scope_attributes_child_time_to_the_current_caller() {
        let (mut session, time) = simulated_session();
        {
            let mut first = session.scope("first caller");
            let _shared = first.scope("shared");
            time.advance(3);
        }
        {
            let mut second = session.scope("second caller");
            let _shared = second.scope("shared");
            time.advance(5);
        }

        let table = session.aggregates();
        let_assert!(Some(first) = table.slot_of("first caller"));
        let_assert!(Some(second) = table.slot_of("second caller"));
        let_assert!(Some(shared) = table.slot_of("shared"));
        assert!(3 == table[first].elapsed_in_children);
        assert!(5 == table[second].elapsed_in_children);
        assert!(8 == table[shared].self_time());
    }

    #[test]
    fn scopes_left_after_reset_are_ignored() {
        let (mut session, time) = simulated_session();
        let mut scope = session.scope("stale");
        time.advance(5);
        scope.begin();
        let fresh_scope = scope.scope("fresh");
        drop(fresh_scope);
        drop(scope);

        assert!(session.active_parent().is_root());
        assert!(session.aggregates().slot_of("stale").is_none());
        let_assert!(Some(fresh) = session.aggregates().slot_of("fresh"));
        assert!(1 == session.aggregates()[fresh].hit_count);
    }

    #[test]
    fn report_can_be_written_to_any_writer() {
        let (mut session, time) = simulated_session();
        {
            let _scope = session.scope("written");
            time.advance(100);
        }
        let mut buffer = vec![];
        let_assert!(Ok(report) = session.end_to(&mut buffer));
        let_assert!(Ok(output) = String::from_utf8(buffer));
        assert!(report.to_string() == output);
        assert!(output.starts_with("written"));
    }

    #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, test_strategy::Arbitrary)]
    enum Label {
        Parse,
        Compute,
        Render,
    }

    impl Label {
        fn name(self) -> &'static str {
            match self {
                Label::Parse => "parse",
                Label::Compute => "compute",
                Label::Render => "render",
            }
        }
    }

    #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, test_strategy::Arbitrary)]
    enum Step {
        Work(#[strategy(1_u64..1_000)] u64),
        Scope {
            label: Label,
            #[strategy(0_usize..4)]
            num_inner_steps: usize,
        },
    }

    /// Execute at most `max_steps` steps on the current nesting level, counting
    /// the entered scopes per label.
    fn execute(
        session: &mut SimulatedSession,
        time: &SimulatedTime,
        steps: &mut Vec<Step>,
        max_steps: usize,
        hits: &mut [u64; 3],
    ) {
        for _ in 0..max_steps {
            let Some(step) = steps.pop() else {
                return;
            };
            match step {
                Step::Work(cycles) => time.advance(cycles),
                Step::Scope {
                    label,
                    num_inner_steps,
                } => {
                    hits[label as usize] += 1;
                    let mut scope = session.scope(label.name());
                    execute(&mut scope, time, steps, num_inner_steps, hits);
                }
            }
        }
    }

    #[proptest]
    fn attribution_never_loses_or_invents_cycles(mut steps: Vec<Step>) {
        let (mut session, time) = simulated_session();
        let mut hits = [0; 3];
        execute(&mut session, &time, &mut steps, usize::MAX, &mut hits);

        let total = session.elapsed();
        let table = session.aggregates();
        assert!(session.active_parent().is_root());

        for (_, aggregate) in table.iter() {
            assert!(aggregate.elapsed_self_and_descendants >= aggregate.elapsed_in_children);
            assert!(aggregate.elapsed_inclusive <= total);
        }

        let sum_of_self_times = table.iter().skip(1).map(|(_, a)| a.self_time()).sum::<u64>();
        let time_in_scopes = table.root().elapsed_in_children;
        assert!(time_in_scopes == sum_of_self_times);
        assert!(time_in_scopes <= total);

        for label in [Label::Parse, Label::Compute, Label::Render] {
            let hit_count = table
                .slot_of(label.name())
                .map_or(0, |slot| table[slot].hit_count);
            assert!(hits[label as usize] == hit_count);
        }
    }
}
