use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use std::io;
use std::io::Write;
use std::time::Duration;

use colored::Color;
use colored::Colorize;
use itertools::Itertools;
use tracing::warn;
use unicode_width::UnicodeWidthStr;

use crate::aggregate::AggregateTable;
use crate::aggregate::ScopeAggregate;
use crate::config::DEFAULT_LABEL_WIDTH;
use crate::error::ProfilerError;
use crate::frequency::cycles_to_nanoseconds;

/// The result of one profiling session: one [line](ReportLine) per scope in
/// which any time was spent, in the order the scopes were first entered.
///
/// The [`Display`] implementation renders the plain text report. Use
/// [`Report::colored`] to highlight the heavy scopes.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    lines: Vec<ReportLine>,
    total_elapsed: u64,
    frequency: u64,
    label_width: usize,
}

impl Report {
    pub(crate) fn new(
        table: &AggregateTable,
        total_elapsed: u64,
        frequency: u64,
        label_width: usize,
    ) -> Self {
        if frequency == 0 {
            warn!("cycle counter frequency is unknown, reporting all times as 0 ms");
        }

        let lines = table
            .iter()
            .filter(|(slot, aggregate)| !slot.is_root() && !aggregate.is_empty())
            .map(|(_, aggregate)| ReportLine::new(aggregate, total_elapsed, frequency))
            .collect_vec();

        Self {
            lines,
            total_elapsed,
            frequency,
            label_width,
        }
    }

    pub(crate) fn empty(total_elapsed: u64, label_width: usize) -> Self {
        Self {
            total_elapsed,
            label_width,
            ..Self::default()
        }
    }

    pub fn lines(&self) -> &[ReportLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The first line with the given label, if any.
    pub fn line(&self, label: &str) -> Option<&ReportLine> {
        self.lines.iter().find(|line| line.label == label)
    }

    /// The cycles between beginning and finishing the session.
    pub fn total_elapsed(&self) -> u64 {
        self.total_elapsed
    }

    /// The estimated frequency of the cycle counter in Hz, or 0 if it is
    /// unknown.
    pub fn frequency(&self) -> u64 {
        self.frequency
    }

    /// The wall-clock time between beginning and finishing the session.
    pub fn total_time(&self) -> Duration {
        let nanos = cycles_to_nanoseconds(self.total_elapsed, self.frequency);
        Duration::try_from_secs_f64(nanos / 1e9).unwrap_or_default()
    }

    pub fn label_width(&self) -> usize {
        self.label_width
    }

    #[must_use]
    pub fn with_label_width(mut self, label_width: usize) -> Self {
        self.label_width = label_width;
        self
    }

    /// A view of the report that colors every line by its share of the total
    /// time.
    pub fn colored(&self) -> ColoredReport<'_> {
        ColoredReport(self)
    }

    /// # Errors
    ///
    /// Errors if the writer does.
    pub fn write_to(&self, writer: &mut impl Write) -> Result<(), ProfilerError> {
        write!(writer, "{self}")?;
        writer.flush()?;
        Ok(())
    }

    /// Print the plain report to standard output.
    ///
    /// # Errors
    ///
    /// Errors if standard output is closed.
    pub fn print(&self) -> Result<(), ProfilerError> {
        self.write_to(&mut io::stdout().lock())
    }
}

impl Default for Report {
    fn default() -> Self {
        Self {
            lines: vec![],
            total_elapsed: 0,
            frequency: 0,
            label_width: DEFAULT_LABEL_WIDTH,
        }
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for line in &self.lines {
            writeln!(f, "{}", line.render(self.label_width))?;
        }
        Ok(())
    }
}

/// See [`Report::colored`].
#[derive(Debug, Copy, Clone)]
pub struct ColoredReport<'report>(&'report Report);

impl Display for ColoredReport<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for line in &self.0.lines {
            let color = line.weight().color();
            writeln!(f, "{}", line.render(self.0.label_width).color(color))?;
        }
        Ok(())
    }
}

/// The cycles spent in one named scope, converted to time and put in relation
/// to the session's total.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLine {
    pub label: String,

    /// The cycles spent in the scope itself, excluding its children.
    pub self_cycles: u64,
    pub self_time_ms: f64,

    /// The share of the session's total that was spent in the scope itself.
    pub self_percentage: f64,

    /// The share of the session's total that was spent in the scope's
    /// children. Only present if the scope has children. Rendered as the
    /// report's last column. Exceeds 100 % for recursive scopes, since nested
    /// invocations are counted once per invocation.
    pub children_percentage: Option<f64>,

    /// The share of the session's total that was spent in the scope including
    /// its children, with nested invocations of the same scope counted once.
    /// Only present if the scope has children.
    pub inclusive_percentage: Option<f64>,

    pub hit_count: u64,
}

impl ReportLine {
    pub fn new(aggregate: &ScopeAggregate, total_elapsed: u64, frequency: u64) -> Self {
        let self_cycles = aggregate.self_time();
        let self_time_ms = cycles_to_nanoseconds(self_cycles, frequency) / 1e6;
        let percentage_of_total = |cycles: u64| {
            if total_elapsed == 0 {
                return 0.0;
            }
            cycles as f64 / total_elapsed as f64 * 100.0
        };

        let has_children = aggregate.elapsed_in_children != 0;
        let children_percentage =
            has_children.then(|| percentage_of_total(aggregate.elapsed_in_children));
        let inclusive_percentage =
            has_children.then(|| percentage_of_total(aggregate.elapsed_inclusive));

        Self {
            label: aggregate.label.clone(),
            self_cycles,
            self_time_ms,
            self_percentage: percentage_of_total(self_cycles),
            children_percentage,
            inclusive_percentage,
            hit_count: aggregate.hit_count,
        }
    }

    fn weight(&self) -> Weight {
        Weight::weigh(self.self_percentage / 100.0)
    }

    fn render(&self, label_width: usize) -> String {
        let padding = " ".repeat(label_width.saturating_sub(self.label.width()));
        let mut line = format!(
            "{label}{padding}{ms:>10.3}ms {percentage:>5.2}%",
            label = self.label,
            ms = self.self_time_ms,
            percentage = self.self_percentage,
        );
        if let Some(children) = self.children_percentage {
            line.push_str(&format!(" {children:>6.2}%"));
        }
        line
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
enum Weight {
    LikeNothing,
    VeryLittle,
    Light,
    Noticeable,
    Heavy,
    Massive,
    SuperMassive,
}

impl Weight {
    /// Assign a weight based on a relative cost, which is a number between 0
    /// and 1.
    fn weigh(relative_cost: f64) -> Self {
        match relative_cost {
            rc if rc >= 0.4 => Self::SuperMassive,
            rc if rc >= 0.3 => Self::Massive,
            rc if rc >= 0.2 => Self::Heavy,
            rc if rc >= 0.1 => Self::Noticeable,
            rc if rc >= 0.07 => Self::Light,
            rc if rc >= 0.04 => Self::VeryLittle,
            _ => Self::LikeNothing,
        }
    }

    fn color(self) -> Color {
        let [r, g, b] = match self {
            Self::LikeNothing => [120; 3],
            Self::VeryLittle => [200; 3],
            Self::Light => [255; 3],
            Self::Noticeable => [255, 255, 120],
            Self::Heavy => [255, 150, 0],
            Self::Massive => [255, 75, 0],
            Self::SuperMassive => [255, 0, 0],
        };

        Color::TrueColor { r, g, b }
    }
}
