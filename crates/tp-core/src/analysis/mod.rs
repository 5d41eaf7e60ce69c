pub mod irq;
pub mod sched;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use orion_error::prelude::*;
use tp_lang::{PeriodDefinition, parse_period};

use crate::error::{CoreReason, CoreResult};
use crate::event::Event;
use crate::period::{PeriodEngine, PeriodInstance};
use crate::state::{Notification, StateLayer};
use crate::table::{ResultTable, TableClass, TimeRange, build_summary};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Analysis parameters, durations and timestamps in nanoseconds.
///
/// The duration window is a closed interval: samples sitting exactly on
/// `min_duration` or `max_duration` are kept.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub begin_ts: Option<u64>,
    pub end_ts: Option<u64>,
    pub refresh_period: Option<u64>,
    pub min_duration: Option<u64>,
    pub max_duration: Option<u64>,
    pub proc_filter: Option<Vec<String>>,
    pub tid_filter: Option<Vec<u32>>,
    pub cpu_filter: Option<Vec<u32>>,
    pub irq_filter: Option<Vec<u32>>,
    pub softirq_filter: Option<Vec<u32>>,
    pub period_defs: Vec<Arc<PeriodDefinition>>,
    pub freq_resolution: usize,
    pub log: bool,
    pub stats: bool,
    pub freq: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            begin_ts: None,
            end_ts: None,
            refresh_period: None,
            min_duration: None,
            max_duration: None,
            proc_filter: None,
            tid_filter: None,
            cpu_filter: None,
            irq_filter: None,
            softirq_filter: None,
            period_defs: Vec::new(),
            freq_resolution: 20,
            log: false,
            stats: false,
            freq: false,
        }
    }
}

impl AnalysisConfig {
    pub fn duration_in_range(&self, ns: u64) -> bool {
        if let Some(min) = self.min_duration
            && ns < min
        {
            return false;
        }
        if let Some(max) = self.max_duration
            && ns > max
        {
            return false;
        }
        true
    }

    pub fn cpu_included(&self, cpu: u32) -> bool {
        match &self.cpu_filter {
            Some(list) => list.contains(&cpu),
            None => true,
        }
    }

    pub fn process_included(&self, comm: &str, tid: u32) -> bool {
        if let Some(procs) = &self.proc_filter
            && !procs.iter().any(|p| p == comm)
        {
            return false;
        }
        if let Some(tids) = &self.tid_filter
            && !tids.contains(&tid)
        {
            return false;
        }
        true
    }
}

/// Parse repeatable `--period` arguments into shared definitions.
pub fn parse_period_defs(args: &[String]) -> CoreResult<Vec<Arc<PeriodDefinition>>> {
    let mut defs = Vec::with_capacity(args.len());
    for arg in args {
        let def = parse_period(arg)
            .map_err(|e| StructError::from(CoreReason::Expression).with_detail(e.to_string()))?;
        defs.push(Arc::new(def));
    }
    Ok(defs)
}

/// Parse a comma-separated id list (`"42,43"`).
pub fn parse_id_list(raw: &str) -> CoreResult<Vec<u32>> {
    raw.split(',')
        .map(|part| {
            part.trim().parse::<u32>().map_err(|_| {
                StructError::from(CoreReason::Config)
                    .with_detail(format!("invalid id in list: `{part}`"))
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Collector interface
// ---------------------------------------------------------------------------

/// Per-domain accumulation driven by the dispatcher.
///
/// A collector owns the period-scoped aggregator state, addressed by the
/// engine's instance id. `close_period` materialises the result tables for
/// one instance and drops its state; it never fails, an untouched instance
/// simply yields empty tables.
pub trait Collector {
    fn open_period(&mut self, period: u64);
    fn notify(&mut self, period: u64, note: &Notification, conf: &AnalysisConfig);
    fn close_period(
        &mut self,
        period: u64,
        range: TimeRange,
        conf: &AnalysisConfig,
    ) -> Vec<ResultTable>;
}

/// Result tables of one closed period instance.
#[derive(Debug, Clone)]
pub struct PeriodReport {
    pub name: Option<String>,
    pub time_range: TimeRange,
    pub tables: Vec<ResultTable>,
}

/// Everything an analysis produced: per-period reports in closing order plus
/// the end-of-analysis summary.
#[derive(Debug, Clone)]
pub struct AnalysisResults {
    pub reports: Vec<PeriodReport>,
    pub summary: ResultTable,
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Drives the state layer, the period engine and a collector from the event
/// stream.
///
/// Single-threaded: every transition happens synchronously inside
/// [`process_event`](Self::process_event). Per event the order is fixed:
/// analysis end check, begin gate, state update (notifications are routed to
/// the instances active at the start of the event), period end evaluation,
/// period begin evaluation, refresh check.
pub struct Analysis<C: Collector> {
    conf: AnalysisConfig,
    state: Box<dyn StateLayer>,
    engine: PeriodEngine,
    collector: C,
    started: bool,
    ended: bool,
    last_event_ts: Option<u64>,
    reports: Vec<PeriodReport>,
}

impl<C: Collector> Analysis<C> {
    pub fn new(conf: AnalysisConfig, state: Box<dyn StateLayer>, collector: C) -> Self {
        let engine = PeriodEngine::new(conf.period_defs.clone());
        Self {
            conf,
            state,
            engine,
            collector,
            started: false,
            ended: false,
            last_event_ts: None,
            reports: Vec::new(),
        }
    }

    pub fn conf(&self) -> &AnalysisConfig {
        &self.conf
    }

    pub fn ended(&self) -> bool {
        self.ended
    }

    pub fn process_event(&mut self, ev: &Event) {
        if self.ended {
            return;
        }
        if let Some(end_ts) = self.conf.end_ts
            && ev.timestamp > end_ts
        {
            log::debug!("analysis window ended at {end_ts}, dropping event stream tail");
            self.ended = true;
            return;
        }
        if !self.started {
            if let Some(begin_ts) = self.conf.begin_ts
                && ev.timestamp < begin_ts
            {
                return;
            }
            self.started = true;
            if let Some(id) = self.engine.bootstrap(ev.timestamp) {
                self.collector.open_period(id);
            }
        }
        self.last_event_ts = Some(ev.timestamp);

        // state update: notifications hit the instances that were active
        // when the event arrived, including ones about to close below
        let notes = self.state.ingest(ev);
        if !notes.is_empty() {
            let active = self.engine.active_ids();
            for note in &notes {
                for &period in &active {
                    self.collector.notify(period, note, &self.conf);
                }
            }
        }

        let outcome = self.engine.step(ev);
        for inst in outcome.closed {
            self.finish_instance(inst, ev.timestamp);
        }
        for id in outcome.opened {
            self.collector.open_period(id);
        }

        if let Some(refresh) = self.conf.refresh_period {
            for id in self.engine.refresh_due(ev.timestamp, refresh) {
                if let Some((inst, new_id)) = self.engine.rotate(id, ev.timestamp) {
                    self.finish_instance(inst, ev.timestamp);
                    self.collector.open_period(new_id);
                }
            }
        }
    }

    /// End of stream: close every live instance and assemble the summary.
    pub fn end_analysis(mut self) -> AnalysisResults {
        let end = self.last_event_ts;
        for inst in self.engine.close_all() {
            let end_ts = end.unwrap_or(inst.start_ts);
            self.finish_instance(inst, end_ts);
        }
        let stats_tables: Vec<&ResultTable> = self
            .reports
            .iter()
            .flat_map(|r| r.tables.iter())
            .filter(|t| t.class == TableClass::Stats)
            .collect();
        let summary = build_summary(&stats_tables);
        AnalysisResults {
            reports: self.reports,
            summary,
        }
    }

    fn finish_instance(&mut self, inst: PeriodInstance, end_ts: u64) {
        let range = TimeRange::new(inst.start_ts, end_ts);
        let tables = self.collector.close_period(inst.id, range, &self.conf);
        self.reports.push(PeriodReport {
            name: inst.name().map(str::to_string),
            time_range: range,
            tables,
        });
    }
}
