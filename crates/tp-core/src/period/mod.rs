mod eval;

pub use eval::expr_matches;


use std::sync::Arc;

use tp_lang::PeriodDefinition;

use crate::event::{Event, MatchContext};

// ---------------------------------------------------------------------------
// Period instances
// ---------------------------------------------------------------------------

/// A live occurrence of a period definition.
///
/// Identity is the instance, not the definition: a definition whose begin
/// expression matches twice yields two concurrent instances. The begin event
/// is snapshotted (owned) so end predicates can reference it long after the
/// stream has moved on. Anonymous and refresh-opened instances carry no
/// definition / no snapshot.
#[derive(Debug, Clone)]
pub struct PeriodInstance {
    pub id: u64,
    pub def: Option<Arc<PeriodDefinition>>,
    pub start_ts: u64,
    pub begin_event: Option<Event>,
}

impl PeriodInstance {
    pub fn name(&self) -> Option<&str> {
        self.def.as_ref().and_then(|d| d.name.as_deref())
    }
}

/// What one engine step did: instances closed by their end predicate and
/// ids of instances opened by a begin predicate.
#[derive(Debug, Default)]
pub struct StepOutcome {
    pub closed: Vec<PeriodInstance>,
    pub opened: Vec<u64>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Drives period open/close from the event stream.
///
/// Per event the engine closes every instance whose end predicate matches,
/// then opens an instance for every definition whose begin predicate
/// matches. Close-before-open is load-bearing: a definition whose begin and
/// end are the same expression re-arms on every matching event, and the
/// just-closed window must not also contain the reopening event.
pub struct PeriodEngine {
    defs: Vec<Arc<PeriodDefinition>>,
    active: Vec<PeriodInstance>,
    next_id: u64,
}

impl PeriodEngine {
    pub fn new(defs: Vec<Arc<PeriodDefinition>>) -> Self {
        Self {
            defs,
            active: Vec::new(),
            next_id: 1,
        }
    }

    pub fn active(&self) -> &[PeriodInstance] {
        &self.active
    }

    pub fn active_ids(&self) -> Vec<u64> {
        self.active.iter().map(|inst| inst.id).collect()
    }

    /// With no definitions configured, synthesise the single anonymous
    /// instance covering the whole analysis. Returns its id on the first
    /// call, `None` otherwise.
    pub fn bootstrap(&mut self, start_ts: u64) -> Option<u64> {
        if self.defs.is_empty() && self.active.is_empty() {
            Some(self.open(None, start_ts, None))
        } else {
            None
        }
    }

    pub fn step(&mut self, ev: &Event) -> StepOutcome {
        let cur = MatchContext::new(ev);

        let mut closed = Vec::new();
        let mut kept = Vec::with_capacity(self.active.len());
        for inst in std::mem::take(&mut self.active) {
            let ends = match &inst.def {
                Some(def) => {
                    let begin_ctx = inst.begin_event.as_ref().map(MatchContext::new);
                    expr_matches(&def.end_expr, &cur, begin_ctx.as_ref())
                }
                // anonymous instances only close at refresh or end of stream
                None => false,
            };
            if ends {
                closed.push(inst);
            } else {
                kept.push(inst);
            }
        }
        self.active = kept;

        let mut opened = Vec::new();
        let defs = self.defs.clone();
        for def in defs {
            if expr_matches(&def.begin_expr, &cur, None) {
                let id = self.open(Some(def), ev.timestamp, Some(ev.clone()));
                opened.push(id);
            }
        }

        StepOutcome { closed, opened }
    }

    /// Instances whose refresh interval has elapsed at `now`.
    pub fn refresh_due(&self, now: u64, refresh_period: u64) -> Vec<u64> {
        self.active
            .iter()
            .filter(|inst| now.saturating_sub(inst.start_ts) >= refresh_period)
            .map(|inst| inst.id)
            .collect()
    }

    /// Refresh rotation: close `id` and open a replacement at `now` with the
    /// same definition and no begin snapshot.
    pub fn rotate(&mut self, id: u64, now: u64) -> Option<(PeriodInstance, u64)> {
        let idx = self.active.iter().position(|inst| inst.id == id)?;
        let inst = self.active.remove(idx);
        let def = inst.def.clone();
        let new_id = self.open(def, now, None);
        Some((inst, new_id))
    }

    /// Drain every active instance, in opening order. Used at end of stream.
    pub fn close_all(&mut self) -> Vec<PeriodInstance> {
        std::mem::take(&mut self.active)
    }

    fn open(
        &mut self,
        def: Option<Arc<PeriodDefinition>>,
        start_ts: u64,
        begin_event: Option<Event>,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.active.push(PeriodInstance {
            id,
            def,
            start_ts,
            begin_event,
        });
        id
    }
}
