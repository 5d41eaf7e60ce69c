use std::collections::{BTreeMap, HashMap};

use crate::analysis::{AnalysisConfig, Collector};
use crate::state::Notification;
use crate::stats::{PrioChange, ProcessSchedStats, SchedEvent, duration_histogram};
use crate::table::{Cell, Column, ResultTable, TableClass, TimeRange};

// ---------------------------------------------------------------------------
// Columns
// ---------------------------------------------------------------------------

pub const LOG_COLUMNS: &[Column] = &[
    Column {
        key: "time_range",
        title: "Time range",
    },
    Column {
        key: "latency",
        title: "Latency",
    },
    Column {
        key: "prio",
        title: "Priority",
    },
    Column {
        key: "target_cpu",
        title: "Target CPU",
    },
    Column {
        key: "wakee",
        title: "Wakee",
    },
    Column {
        key: "waker",
        title: "Waker",
    },
];

pub const STATS_COLUMNS: &[Column] = &[
    Column {
        key: "process",
        title: "Process",
    },
    Column {
        key: "count",
        title: "Wakeup count",
    },
    Column {
        key: "min_latency",
        title: "Minimum latency",
    },
    Column {
        key: "avg_latency",
        title: "Average latency",
    },
    Column {
        key: "max_latency",
        title: "Maximum latency",
    },
    Column {
        key: "stdev_latency",
        title: "Latency standard deviation",
    },
];

pub const FREQ_COLUMNS: &[Column] = &[
    Column {
        key: "latency_lower",
        title: "Latency (lower bound)",
    },
    Column {
        key: "latency_upper",
        title: "Latency (upper bound)",
    },
    Column {
        key: "count",
        title: "Wakeup count",
    },
];

// ---------------------------------------------------------------------------
// Per-period state
// ---------------------------------------------------------------------------

/// One logged wake→switch pair with the names resolved at switch time.
#[derive(Debug, Clone)]
struct SchedRecord {
    ev: SchedEvent,
    wakee_comm: String,
    waker_comm: Option<String>,
}

#[derive(Debug, Default)]
struct SchedPeriodState {
    tids: BTreeMap<u32, ProcessSchedStats>,
    log: Vec<SchedRecord>,
}

// ---------------------------------------------------------------------------
// Collector
// ---------------------------------------------------------------------------

/// Scheduler latency analysis: wake→switch latencies per tid, priority
/// history, a chronological log and latency histograms, scoped to the
/// period instance.
#[derive(Debug, Default)]
pub struct SchedCollector {
    periods: HashMap<u64, SchedPeriodState>,
}

impl SchedCollector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Collector for SchedCollector {
    fn open_period(&mut self, period: u64) {
        self.periods.insert(period, SchedPeriodState::default());
    }

    fn notify(&mut self, period: u64, note: &Notification, conf: &AnalysisConfig) {
        let Some(state) = self.periods.get_mut(&period) else {
            return;
        };
        match note {
            Notification::SchedSwitch {
                cpu,
                wakee,
                waker,
                ts,
            } => {
                let Some(wakeup_ts) = wakee.last_wakeup else {
                    return;
                };
                debug_assert!(*ts >= wakeup_ts);
                let latency = ts - wakeup_ts;
                if !conf.duration_in_range(latency)
                    || !conf.cpu_included(*cpu)
                    || !conf.process_included(&wakee.comm, wakee.tid)
                {
                    return;
                }
                let stats = state
                    .tids
                    .entry(wakee.tid)
                    .or_insert_with(|| ProcessSchedStats::new(wakee.tid, wakee.comm.clone()));
                // a prio change may have created the entry before the first
                // switch; fill in the identity now
                stats.comm = wakee.comm.clone();
                stats.pid = wakee.pid;
                let ev = SchedEvent {
                    wakeup_ts,
                    switch_ts: *ts,
                    wakee_tid: wakee.tid,
                    waker_tid: wakee.last_waker.or_else(|| waker.as_ref().map(|w| w.tid)),
                    target_cpu: wakee.target_cpu,
                    prio: wakee.prio,
                };
                stats.update(ev.clone());
                state.log.push(SchedRecord {
                    ev,
                    wakee_comm: wakee.comm.clone(),
                    waker_comm: waker.as_ref().map(|w| w.comm.clone()),
                });
            }
            Notification::PrioChanged { tid, ts, prio } => {
                state
                    .tids
                    .entry(*tid)
                    .or_insert_with(|| ProcessSchedStats::new(*tid, ""))
                    .prio_history
                    .push(PrioChange {
                        ts: *ts,
                        prio: *prio,
                    });
            }
            _ => {}
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
            tables.push(build_log_table(&state, range));
        }

        if conf.stats || conf.freq {
            let mut stats_table = ResultTable::new(TableClass::Stats, range, STATS_COLUMNS);
            let mut freq_tables = Vec::new();

            for (&tid, st) in &state.tids {
                if st.count() == 0 {
                    continue;
                }
                if conf.stats {
                    stats_table.append_row(vec![
                        Cell::Process {
                            tid,
                            comm: st.comm.clone(),
                        },
                        Cell::Integer {
                            value: st.count() as i64,
                        },
                        Cell::duration_ns(st.min_latency.unwrap_or(0)),
                        Cell::Duration {
                            ns: st.avg_latency(),
                        },
                        Cell::duration_ns(st.max_latency.unwrap_or(0)),
                        Cell::stdev(st.latency_stdev()),
                    ]);
                }
                if conf.freq {
                    // explicit --min/--max bound the histogram, like the
                    // duration filter they express
                    let min_us = conf
                        .min_duration
                        .unwrap_or(st.min_latency.unwrap_or(0))
                        as f64
                        / 1000.0;
                    let max_us = conf
                        .max_duration
                        .unwrap_or(st.max_latency.unwrap_or(0))
                        as f64
                        / 1000.0;
                    let samples = st.latency_samples();
                    let mut freq_table = ResultTable::new(TableClass::Freq, range, FREQ_COLUMNS)
                        .with_subtitle(format!("{} ({})", st.comm, tid));
                    for bucket in
                        duration_histogram(&samples, min_us, max_us, conf.freq_resolution)
                    {
                        freq_table.append_row(vec![
                            Cell::duration_us(bucket.lower_us),
                            Cell::duration_us(bucket.upper_us),
                            Cell::Integer {
                                value: bucket.count as i64,
                            },
                        ]);
                    }
                    // kept even when empty: stats row indexes and freq
                    // table indexes stay 1-to-1
                    freq_tables.push(freq_table);
                }
            }

            if conf.stats && !stats_table.is_empty() {
                tables.push(stats_table);
            }
            if conf.freq {
                tables.extend(freq_tables);
            }
        }

        tables
    }
}

fn build_log_table(state: &SchedPeriodState, range: TimeRange) -> ResultTable {
    let mut table = ResultTable::new(TableClass::Log, range, LOG_COLUMNS);
    for rec in &state.log {
        table.append_row(vec![
            Cell::TimeRange {
                begin: rec.ev.wakeup_ts,
                end: rec.ev.switch_ts,
            },
            Cell::duration_ns(rec.ev.latency()),
            Cell::Integer {
                value: rec.ev.prio as i64,
            },
            match rec.ev.target_cpu {
                Some(id) => Cell::Cpu { id },
                None => Cell::Unknown,
            },
            Cell::Process {
                tid: rec.ev.wakee_tid,
                comm: rec.wakee_comm.clone(),
            },
            match (&rec.waker_comm, rec.ev.waker_tid) {
                (Some(comm), Some(tid)) => Cell::Process {
                    tid,
                    comm: comm.clone(),
                },
                _ => Cell::Empty,
            },
        ]);
    }
    table
}
