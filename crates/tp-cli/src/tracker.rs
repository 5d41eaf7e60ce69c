use std::collections::HashMap;

use tp_core::event::Event;
use tp_core::state::{Notification, ProcessInfo, StateLayer};

// ---------------------------------------------------------------------------
// Kernel state tracker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
struct Process {
    pid: Option<u32>,
    comm: String,
    prio: i32,
    last_wakeup: Option<u64>,
    last_waker: Option<u32>,
    target_cpu: Option<u32>,
}

/// Minimal kernel-state reconstruction from the standard event names.
///
/// Tracks known processes, the task currently running on each CPU and
/// pending wakeups, and translates interrupt and scheduler events into the
/// notifications the analysis subscribes to. A wakeup is consumed by the
/// switch that reports it, so one wake yields at most one latency sample.
#[derive(Debug, Default)]
pub struct KernelTracker {
    procs: HashMap<u32, Process>,
    current: HashMap<u32, u32>,
}

impl KernelTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn proc_entry(&mut self, tid: u32) -> &mut Process {
        self.procs.entry(tid).or_default()
    }

    fn snapshot(&self, tid: u32) -> Option<ProcessInfo> {
        self.procs.get(&tid).map(|p| ProcessInfo {
            tid,
            pid: p.pid,
            comm: p.comm.clone(),
            prio: p.prio,
            last_wakeup: p.last_wakeup,
            last_waker: p.last_waker,
            target_cpu: p.target_cpu,
        })
    }

    fn on_wakeup(&mut self, ev: &Event) {
        let Some(tid) = ev.field_i64("tid") else {
            return;
        };
        let waker = self.current.get(&ev.cpu_id).copied();
        let ts = ev.timestamp;
        let target_cpu = ev.field_i64("target_cpu").map(|c| c as u32);
        let comm = ev.field_str("comm").map(str::to_string);
        let prio = ev.field_i64("prio");

        let p = self.proc_entry(tid as u32);
        if let Some(comm) = comm {
            p.comm = comm;
        }
        if let Some(prio) = prio {
            p.prio = prio as i32;
        }
        if target_cpu.is_some() {
            p.target_cpu = target_cpu;
        }
        p.last_wakeup = Some(ts);
        p.last_waker = waker;
    }

    fn on_switch(&mut self, ev: &Event) -> Option<Notification> {
        let prev_tid = ev.field_i64("prev_tid")? as u32;
        let next_tid = ev.field_i64("next_tid")? as u32;

        let prev = self.proc_entry(prev_tid);
        if let Some(comm) = ev.field_str("prev_comm") {
            prev.comm = comm.to_string();
        }
        if let Some(prio) = ev.field_i64("prev_prio") {
            prev.prio = prio as i32;
        }
        let next = self.proc_entry(next_tid);
        if let Some(comm) = ev.field_str("next_comm") {
            next.comm = comm.to_string();
        }
        if let Some(prio) = ev.field_i64("next_prio") {
            next.prio = prio as i32;
        }

        let wakee = self.snapshot(next_tid)?;
        let waker = wakee.last_waker.and_then(|tid| self.snapshot(tid));
        self.current.insert(ev.cpu_id, next_tid);
        // the wakeup is reported exactly once
        self.proc_entry(next_tid).last_wakeup = None;

        Some(Notification::SchedSwitch {
            cpu: ev.cpu_id,
            wakee,
            waker,
            ts: ev.timestamp,
        })
    }
}

impl StateLayer for KernelTracker {
    fn ingest(&mut self, ev: &Event) -> Vec<Notification> {
        let ts = ev.timestamp;
        let cpu = ev.cpu_id;
        match ev.name.as_str() {
            "irq_handler_entry" => {
                let (Some(irq), Some(name)) = (ev.field_i64("irq"), ev.field_str("name")) else {
                    return Vec::new();
                };
                vec![Notification::HardIrqBegin {
                    cpu,
                    irq: irq as u32,
                    name: name.to_string(),
                    ts,
                }]
            }
            "irq_handler_exit" => match ev.field_i64("irq") {
                Some(irq) => vec![Notification::HardIrqEnd {
                    cpu,
                    irq: irq as u32,
                    ts,
                }],
                None => Vec::new(),
            },
            "softirq_raise" => match ev.field_i64("vec") {
                Some(vec) => vec![Notification::SoftIrqRaise {
                    cpu,
                    vec: vec as u32,
                    ts,
                }],
                None => Vec::new(),
            },
            "softirq_entry" => match ev.field_i64("vec") {
                Some(vec) => vec![Notification::SoftIrqBegin {
                    cpu,
                    vec: vec as u32,
                    ts,
                }],
                None => Vec::new(),
            },
            "softirq_exit" => match ev.field_i64("vec") {
                Some(vec) => vec![Notification::SoftIrqEnd {
                    cpu,
                    vec: vec as u32,
                    ts,
                }],
                None => Vec::new(),
            },
            "sched_waking" | "sched_wakeup" | "sched_wakeup_new" => {
                self.on_wakeup(ev);
                Vec::new()
            }
            "sched_switch" => self.on_switch(ev).into_iter().collect(),
            "sched_pi_setprio" => {
                let (Some(tid), Some(prio)) = (ev.field_i64("tid"), ev.field_i64("newprio"))
                else {
                    return Vec::new();
                };
                self.proc_entry(tid as u32).prio = prio as i32;
                vec![Notification::PrioChanged {
                    tid: tid as u32,
                    ts,
                    prio: prio as i32,
                }]
            }
            "sched_process_free" => {
                if let Some(tid) = ev.field_i64("tid") {
                    self.procs.remove(&(tid as u32));
                }
                Vec::new()
            }
            _ => Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
