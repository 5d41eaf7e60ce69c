use crate::event::Event;

// ---------------------------------------------------------------------------
// State layer interface
// ---------------------------------------------------------------------------

/// Process snapshot attached to scheduler notifications.
///
/// `last_wakeup` is the timestamp of the most recent wake targeting this
/// process that has not yet been consumed by a switch; the state layer is
/// responsible for clearing it once reported.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessInfo {
    pub tid: u32,
    pub pid: Option<u32>,
    pub comm: String,
    pub prio: i32,
    pub last_wakeup: Option<u64>,
    pub last_waker: Option<u32>,
    pub target_cpu: Option<u32>,
}

/// Higher-level notification emitted by the state layer while ingesting one
/// event. Timestamps are event timestamps in nanoseconds.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    HardIrqBegin {
        cpu: u32,
        irq: u32,
        name: String,
        ts: u64,
    },
    HardIrqEnd {
        cpu: u32,
        irq: u32,
        ts: u64,
    },
    SoftIrqRaise {
        cpu: u32,
        vec: u32,
        ts: u64,
    },
    SoftIrqBegin {
        cpu: u32,
        vec: u32,
        ts: u64,
    },
    SoftIrqEnd {
        cpu: u32,
        vec: u32,
        ts: u64,
    },
    /// A wakee was switched in; carries the wakee's snapshot (including its
    /// pending wakeup, if any) and the switched-out waker when known.
    SchedSwitch {
        cpu: u32,
        wakee: ProcessInfo,
        waker: Option<ProcessInfo>,
        ts: u64,
    },
    PrioChanged {
        tid: u32,
        ts: u64,
        prio: i32,
    },
}

/// The kernel-state reconstruction collaborator.
///
/// Implementations track processes, pending wakeups and in-flight
/// interrupts, and translate raw events into [`Notification`]s. The core
/// only consumes this interface; the CLI crate ships a tracker built from
/// the standard event names, and tests use scripted stubs.
pub trait StateLayer {
    fn ingest(&mut self, ev: &Event) -> Vec<Notification>;
}
