use serde::Serialize;

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub begin: u64,
    pub end: u64,
}

impl TimeRange {
    pub fn new(begin: u64, end: u64) -> Self {
        debug_assert!(begin <= end);
        Self { begin, end }
    }
}

/// One typed table cell, as exposed on the machine interface.
///
/// `Duration` is carried in nanoseconds as a float so that derived values
/// (averages, standard deviations) keep sub-nanosecond precision; absolute
/// timestamps stay exact in `Timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Cell {
    TimeRange { begin: u64, end: u64 },
    Timestamp { ts: u64 },
    Duration { ns: f64 },
    Integer { value: i64 },
    Irq { is_hard: bool, nr: u32, name: String },
    Cpu { id: u32 },
    Process { tid: u32, comm: String },
    Empty,
    Unknown,
}

impl Cell {
    pub fn time_range(range: TimeRange) -> Cell {
        Cell::TimeRange {
            begin: range.begin,
            end: range.end,
        }
    }

    pub fn duration_ns(ns: u64) -> Cell {
        Cell::Duration { ns: ns as f64 }
    }

    pub fn duration_us(us: f64) -> Cell {
        Cell::Duration { ns: us * 1000.0 }
    }

    /// Standard deviations are NaN below two samples; that surfaces as
    /// `Unknown`.
    pub fn stdev(ns: f64) -> Cell {
        if ns.is_nan() {
            Cell::Unknown
        } else {
            Cell::Duration { ns }
        }
    }

    /// Microsecond view of a duration cell, used by the text renderer.
    pub fn as_us(&self) -> Option<f64> {
        match self {
            Cell::Duration { ns } => Some(ns / 1000.0),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TableClass {
    Log,
    Stats,
    RaiseStats,
    Freq,
    Summary,
}

impl TableClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableClass::Log => "log",
            TableClass::Stats => "stats",
            TableClass::RaiseStats => "raise-stats",
            TableClass::Freq => "freq",
            TableClass::Summary => "summary",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Column {
    pub key: &'static str,
    pub title: &'static str,
}

/// Append-only result table: a class, a covered time range, a fixed column
/// layout and typed rows.
#[derive(Debug, Clone, Serialize)]
pub struct ResultTable {
    pub class: TableClass,
    pub time_range: TimeRange,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub columns: &'static [Column],
    pub rows: Vec<Vec<Cell>>,
}

impl ResultTable {
    pub fn new(class: TableClass, time_range: TimeRange, columns: &'static [Column]) -> Self {
        Self {
            class,
            time_range,
            subtitle: None,
            columns,
            rows: Vec::new(),
        }
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn append_row(&mut self, row: Vec<Cell>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

pub const SUMMARY_COLUMNS: &[Column] = &[
    Column {
        key: "time_range",
        title: "Time range",
    },
    Column {
        key: "count",
        title: "Total count",
    },
];

/// Build the end-of-analysis summary: for every per-period stats table, one
/// row per stats row carrying the period's time range and that row's count.
pub fn build_summary(stats_tables: &[&ResultTable]) -> ResultTable {
    let begin = stats_tables.first().map_or(0, |t| t.time_range.begin);
    let end = stats_tables.last().map_or(0, |t| t.time_range.end);
    let mut summary = ResultTable::new(
        TableClass::Summary,
        TimeRange { begin, end },
        SUMMARY_COLUMNS,
    );
    for table in stats_tables {
        let count_idx = table.columns.iter().position(|c| c.key == "count");
        let Some(count_idx) = count_idx else { continue };
        for row in &table.rows {
            if let Some(count @ Cell::Integer { .. }) = row.get(count_idx) {
                summary.append_row(vec![Cell::time_range(table.time_range), count.clone()]);
            }
        }
    }
    summary
}
