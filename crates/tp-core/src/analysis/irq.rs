use std::collections::{BTreeMap, HashMap};

use crate::analysis::{AnalysisConfig, Collector};
use crate::state::Notification;
use crate::stats::{IrqStats, duration_histogram};
use crate::table::{Cell, Column, ResultTable, TableClass, TimeRange};

// ---------------------------------------------------------------------------
// Soft IRQ vector names
// ---------------------------------------------------------------------------

const SOFTIRQ_NAMES: [&str; 10] = [
    "HI",
    "TIMER",
    "NET_TX",
    "NET_RX",
    "BLOCK",
    "BLOCK_IOPOLL",
    "TASKLET",
    "SCHED",
    "HRTIMER",
    "RCU",
];

pub fn softirq_name(vec: u32) -> String {
    SOFTIRQ_NAMES
        .get(vec as usize)
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("vec{vec}"))
}

// ---------------------------------------------------------------------------
// Columns
// ---------------------------------------------------------------------------

pub const LOG_COLUMNS: &[Column] = &[
    Column {
        key: "time_range",
        title: "Time range",
    },
    Column {
        key: "raised_ts",
        title: "Raised timestamp",
    },
    Column {
        key: "cpu",
        title: "CPU",
    },
    Column {
        key: "irq",
        title: "Interrupt",
    },
];

pub const STATS_COLUMNS: &[Column] = &[
    Column {
        key: "irq",
        title: "Interrupt",
    },
    Column {
        key: "count",
        title: "Interrupt count",
    },
    Column {
        key: "min_duration",
        title: "Minimum duration",
    },
    Column {
        key: "avg_duration",
        title: "Average duration",
    },
    Column {
        key: "max_duration",
        title: "Maximum duration",
    },
    Column {
        key: "stdev_duration",
        title: "Duration standard deviation",
    },
];

pub const RAISE_STATS_COLUMNS: &[Column] = &[
    Column {
        key: "irq",
        title: "Interrupt",
    },
    Column {
        key: "count",
        title: "Raise count",
    },
    Column {
        key: "min_latency",
        title: "Minimum raise latency",
    },
    Column {
        key: "avg_latency",
        title: "Average raise latency",
    },
    Column {
        key: "max_latency",
        title: "Maximum raise latency",
    },
    Column {
        key: "stdev_latency",
        title: "Raise latency standard deviation",
    },
];

pub const FREQ_COLUMNS: &[Column] = &[
    Column {
        key: "duration_lower",
        title: "Duration (lower bound)",
    },
    Column {
        key: "duration_upper",
        title: "Duration (upper bound)",
    },
    Column {
        key: "count",
        title: "Interrupt count",
    },
];

// ---------------------------------------------------------------------------
// Per-period state
// ---------------------------------------------------------------------------

/// One completed interrupt, kept in completion order for the log table.
#[derive(Debug, Clone)]
pub struct IrqRecord {
    pub is_hard: bool,
    pub id: u32,
    pub name: String,
    pub cpu: u32,
    pub begin_ts: u64,
    pub end_ts: u64,
    pub raise_ts: Option<u64>,
}

#[derive(Debug, Default)]
struct IrqPeriodState {
    hard_stats: BTreeMap<u32, IrqStats>,
    soft_stats: BTreeMap<u32, IrqStats>,
    log: Vec<IrqRecord>,
    /// In-flight hard interrupts, keyed by `(cpu, irq)`: begin ts and name.
    hard_open: HashMap<(u32, u32), (u64, String)>,
    /// In-flight soft interrupts, keyed by `(cpu, vec)`: begin ts and the
    /// raise ts captured at entry.
    soft_open: HashMap<(u32, u32), (u64, Option<u64>)>,
    /// Pending raises not yet consumed by a softirq entry.
    raises: HashMap<(u32, u32), u64>,
}

impl IrqPeriodState {
    fn record_hard_end(&mut self, cpu: u32, irq: u32, end_ts: u64, conf: &AnalysisConfig) {
        let Some((begin_ts, name)) = self.hard_open.remove(&(cpu, irq)) else {
            return;
        };
        debug_assert!(end_ts >= begin_ts);
        let duration = end_ts - begin_ts;
        if !conf.cpu_included(cpu) || !conf.duration_in_range(duration) {
            return;
        }
        self.hard_stats
            .entry(irq)
            .or_insert_with(|| IrqStats::new(irq, name.clone()))
            .update_duration(duration);
        self.log.push(IrqRecord {
            is_hard: true,
            id: irq,
            name,
            cpu,
            begin_ts,
            end_ts,
            raise_ts: None,
        });
    }

    fn record_soft_end(&mut self, cpu: u32, vec: u32, end_ts: u64, conf: &AnalysisConfig) {
        let Some((begin_ts, raise_ts)) = self.soft_open.remove(&(cpu, vec)) else {
            return;
        };
        debug_assert!(end_ts >= begin_ts);
        let duration = end_ts - begin_ts;
        if !conf.cpu_included(cpu) || !conf.duration_in_range(duration) {
            return;
        }
        let name = softirq_name(vec);
        let stats = self
            .soft_stats
            .entry(vec)
            .or_insert_with(|| IrqStats::new(vec, name.clone()));
        stats.update_duration(duration);
        if let Some(raise_ts) = raise_ts {
            debug_assert!(raise_ts <= begin_ts);
            stats.update_raise_latency(begin_ts - raise_ts);
        }
        self.log.push(IrqRecord {
            is_hard: false,
            id: vec,
            name,
            cpu,
            begin_ts,
            end_ts,
            raise_ts,
        });
    }
}

// ---------------------------------------------------------------------------
// Collector
// ---------------------------------------------------------------------------

/// Interrupt analysis: per-id duration statistics, soft IRQ raise
/// latencies, a chronological log and duration histograms, all scoped to
/// the period instance.
#[derive(Debug, Default)]
pub struct IrqCollector {
    periods: HashMap<u64, IrqPeriodState>,
}

impl IrqCollector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Collector for IrqCollector {
    fn open_period(&mut self, period: u64) {
        self.periods.insert(period, IrqPeriodState::default());
    }

    fn notify(&mut self, period: u64, note: &Notification, conf: &AnalysisConfig) {
        let Some(state) = self.periods.get_mut(&period) else {
            return;
        };
        match note {
            Notification::HardIrqBegin {
                cpu,
                irq,
                name,
                ts,
            } => {
                state.hard_open.insert((*cpu, *irq), (*ts, name.clone()));
            }
            Notification::HardIrqEnd { cpu, irq, ts } => {
                state.record_hard_end(*cpu, *irq, *ts, conf);
            }
            Notification::SoftIrqRaise { cpu, vec, ts } => {
                state.raises.insert((*cpu, *vec), *ts);
            }
            Notification::SoftIrqBegin { cpu, vec, ts } => {
                let raise_ts = state.raises.remove(&(*cpu, *vec));
                state.soft_open.insert((*cpu, *vec), (*ts, raise_ts));
            }
            Notification::SoftIrqEnd { cpu, vec, ts } => {
                state.record_soft_end(*cpu, *vec, *ts, conf);
            }
            Notification::SchedSwitch { .. } | Notification::PrioChanged { .. } => {}
        }
    }

    fn close_period(
        &mut self,
        period: u64,
        range: TimeRange,
        conf: &AnalysisConfig,
    ) -> Vec<ResultTable> {
        let state = self.periods.remove(&period).unwrap_or_default();
        let mut tables = Vec::new();

        if conf.log {
            tables.push(build_log_table(&state, range, conf));
        }

        if conf.stats || conf.freq {
            let mut stats_table = ResultTable::new(TableClass::Stats, range, STATS_COLUMNS);
            let mut raise_table =
                ResultTable::new(TableClass::RaiseStats, range, RAISE_STATS_COLUMNS);
            let mut freq_tables = Vec::new();

            let fill_hard = conf.irq_filter.is_some() || conf.softirq_filter.is_none();
            let fill_soft = conf.softirq_filter.is_some() || conf.irq_filter.is_none();
            if fill_hard {
                fill_stats_freq(
                    true,
                    &state.hard_stats,
                    conf.irq_filter.as_deref(),
                    conf,
                    range,
                    &mut stats_table,
                    &mut raise_table,
                    &mut freq_tables,
                );
            }
            if fill_soft {
                fill_stats_freq(
                    false,
                    &state.soft_stats,
                    conf.softirq_filter.as_deref(),
                    conf,
                    range,
                    &mut stats_table,
                    &mut raise_table,
                    &mut freq_tables,
                );
            }

            if conf.stats {
                if !stats_table.is_empty() {
                    tables.push(stats_table);
                }
                if !raise_table.is_empty() {
                    tables.push(raise_table);
                }
            }
            if conf.freq {
                tables.extend(freq_tables);
            }
        }

        tables
    }
}

// ---------------------------------------------------------------------------
// Table building
// ---------------------------------------------------------------------------

fn build_log_table(state: &IrqPeriodState, range: TimeRange, conf: &AnalysisConfig) -> ResultTable {
    let mut table = ResultTable::new(TableClass::Log, range, LOG_COLUMNS);
    for rec in &state.log {
        if !log_record_included(rec, conf) {
            continue;
        }
        let raised = if rec.is_hard {
            Cell::Empty
        } else {
            match rec.raise_ts {
                Some(ts) => Cell::Timestamp { ts },
                None => Cell::Unknown,
            }
        };
        table.append_row(vec![
            Cell::TimeRange {
                begin: rec.begin_ts,
                end: rec.end_ts,
            },
            raised,
            Cell::Cpu { id: rec.cpu },
            Cell::Irq {
                is_hard: rec.is_hard,
                nr: rec.id,
                name: rec.name.clone(),
            },
        ]);
    }
    table
}

fn log_record_included(rec: &IrqRecord, conf: &AnalysisConfig) -> bool {
    if rec.is_hard {
        if let Some(filter) = &conf.irq_filter {
            return filter.contains(&rec.id);
        }
        if conf.softirq_filter.is_some() {
            return false;
        }
    } else {
        if let Some(filter) = &conf.softirq_filter {
            return filter.contains(&rec.id);
        }
        if conf.irq_filter.is_some() {
            return false;
        }
    }
    true
}

#[allow(clippy::too_many_arguments)]
fn fill_stats_freq(
    is_hard: bool,
    stats: &BTreeMap<u32, IrqStats>,
    filter: Option<&[u32]>,
    conf: &AnalysisConfig,
    range: TimeRange,
    stats_table: &mut ResultTable,
    raise_table: &mut ResultTable,
    freq_tables: &mut Vec<ResultTable>,
) {
    for (&id, st) in stats {
        if let Some(filter) = filter
            && !filter.contains(&id)
        {
            continue;
        }
        if st.count == 0 {
            continue;
        }
        if conf.stats {
            stats_table.append_row(vec![
                Cell::Irq {
                    is_hard,
                    nr: id,
                    name: st.name.clone(),
                },
                Cell::Integer {
                    value: st.count as i64,
                },
                Cell::duration_ns(st.min_duration.unwrap_or(0)),
                Cell::Duration {
                    ns: st.avg_duration(),
                },
                Cell::duration_ns(st.max_duration.unwrap_or(0)),
                Cell::stdev(st.duration_stdev()),
            ]);
            if !is_hard && st.raise_count > 0 {
                raise_table.append_row(vec![
                    Cell::Irq {
                        is_hard: false,
                        nr: id,
                        name: st.name.clone(),
                    },
                    Cell::Integer {
                        value: st.raise_count as i64,
                    },
                    Cell::duration_ns(st.min_raise_latency.unwrap_or(0)),
                    Cell::Duration {
                        ns: st.avg_raise_latency(),
                    },
                    Cell::duration_ns(st.max_raise_latency.unwrap_or(0)),
                    Cell::stdev(st.raise_latency_stdev()),
                ]);
            }
        }
        if conf.freq {
            let min_us = st.min_duration.unwrap_or(0) as f64 / 1000.0;
            let max_us = st.max_duration.unwrap_or(0) as f64 / 1000.0;
            let mut freq_table = ResultTable::new(TableClass::Freq, range, FREQ_COLUMNS)
                .with_subtitle(format!("{} ({})", st.name, id));
            for bucket in duration_histogram(&st.durations, min_us, max_us, conf.freq_resolution) {
                freq_table.append_row(vec![
                    Cell::duration_us(bucket.lower_us),
                    Cell::duration_us(bucket.upper_us),
                    Cell::Integer {
                        value: bucket.count as i64,
                    },
                ]);
            }
            // kept even when empty: stats row indexes and freq table
            // indexes stay 1-to-1
            freq_tables.push(freq_table);
        }
    }
}
