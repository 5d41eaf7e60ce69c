// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Unbiased sample standard deviation, in the unit of the samples.
///
/// Fewer than two samples has no defined deviation and yields NaN; callers
/// surface that as an `Unknown` table cell.
pub fn sample_stdev(samples: &[u64]) -> f64 {
    if samples.len() < 2 {
        return f64::NAN;
    }
    let n = samples.len() as f64;
    let mean = samples.iter().map(|&v| v as f64).sum::<f64>() / n;
    let ss = samples
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>();
    (ss / (n - 1.0)).sqrt()
}

/// One histogram bin: `[lower_us, upper_us)`, last bin closed.
#[derive(Debug, Clone, PartialEq)]
pub struct FreqBucket {
    pub lower_us: f64,
    pub upper_us: f64,
    pub count: u64,
}

/// Bucket nanosecond samples into `resolution` bins over `[min_us, max_us]`.
///
/// Step is `(max − min) / resolution`; a zero step (all samples equal, or an
/// empty sample set) yields an empty histogram. Samples beyond the bounds
/// clamp into the first/last bin.
pub fn duration_histogram(
    samples_ns: &[u64],
    min_us: f64,
    max_us: f64,
    resolution: usize,
) -> Vec<FreqBucket> {
    if resolution == 0 {
        return Vec::new();
    }
    let step = (max_us - min_us) / resolution as f64;
    if step <= 0.0 || !step.is_finite() {
        return Vec::new();
    }
    let mut counts = vec![0u64; resolution];
    for &ns in samples_ns {
        let us = ns as f64 / 1000.0;
        let index = ((us - min_us) / step) as usize;
        counts[index.min(resolution - 1)] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| FreqBucket {
            lower_us: min_us + i as f64 * step,
            upper_us: min_us + (i + 1) as f64 * step,
            count,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Per-IRQ statistics
// ---------------------------------------------------------------------------

/// Duration and raise-latency accumulator for one interrupt id inside one
/// period instance.
///
/// The full sample vectors are kept so standard deviation and histograms are
/// exact; memory grows with the number of completed interrupts in the
/// period.
#[derive(Debug, Clone)]
pub struct IrqStats {
    pub id: u32,
    pub name: String,
    pub count: u64,
    pub total_duration: u64,
    pub min_duration: Option<u64>,
    pub max_duration: Option<u64>,
    pub durations: Vec<u64>,
    pub raise_count: u64,
    pub total_raise_latency: u64,
    pub min_raise_latency: Option<u64>,
    pub max_raise_latency: Option<u64>,
    pub raise_latencies: Vec<u64>,
}

impl IrqStats {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            count: 0,
            total_duration: 0,
            min_duration: None,
            max_duration: None,
            durations: Vec::new(),
            raise_count: 0,
            total_raise_latency: 0,
            min_raise_latency: None,
            max_raise_latency: None,
            raise_latencies: Vec::new(),
        }
    }

    pub fn update_duration(&mut self, duration: u64) {
        self.count += 1;
        self.total_duration += duration;
        self.min_duration = Some(self.min_duration.map_or(duration, |m| m.min(duration)));
        self.max_duration = Some(self.max_duration.map_or(duration, |m| m.max(duration)));
        self.durations.push(duration);
    }

    pub fn update_raise_latency(&mut self, latency: u64) {
        self.raise_count += 1;
        self.total_raise_latency += latency;
        self.min_raise_latency = Some(self.min_raise_latency.map_or(latency, |m| m.min(latency)));
        self.max_raise_latency = Some(self.max_raise_latency.map_or(latency, |m| m.max(latency)));
        self.raise_latencies.push(latency);
    }

    pub fn avg_duration(&self) -> f64 {
        debug_assert!(self.count > 0);
        self.total_duration as f64 / self.count as f64
    }

    pub fn avg_raise_latency(&self) -> f64 {
        debug_assert!(self.raise_count > 0);
        self.total_raise_latency as f64 / self.raise_count as f64
    }

    pub fn duration_stdev(&self) -> f64 {
        sample_stdev(&self.durations)
    }

    pub fn raise_latency_stdev(&self) -> f64 {
        sample_stdev(&self.raise_latencies)
    }
}

// ---------------------------------------------------------------------------
// Per-process scheduling statistics
// ---------------------------------------------------------------------------

/// One wake→switch pair.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedEvent {
    pub wakeup_ts: u64,
    pub switch_ts: u64,
    pub wakee_tid: u32,
    pub waker_tid: Option<u32>,
    pub target_cpu: Option<u32>,
    pub prio: i32,
}

impl SchedEvent {
    pub fn latency(&self) -> u64 {
        self.switch_ts - self.wakeup_ts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrioChange {
    pub ts: u64,
    pub prio: i32,
}

/// Wake-to-switch latency accumulator for one tid inside one period
/// instance.
#[derive(Debug, Clone)]
pub struct ProcessSchedStats {
    pub tid: u32,
    pub pid: Option<u32>,
    pub comm: String,
    pub total_latency: u64,
    pub min_latency: Option<u64>,
    pub max_latency: Option<u64>,
    pub sched_events: Vec<SchedEvent>,
    pub prio_history: Vec<PrioChange>,
}

impl ProcessSchedStats {
    pub fn new(tid: u32, comm: impl Into<String>) -> Self {
        Self {
            tid,
            pid: None,
            comm: comm.into(),
            total_latency: 0,
            min_latency: None,
            max_latency: None,
            sched_events: Vec::new(),
            prio_history: Vec::new(),
        }
    }

    pub fn count(&self) -> u64 {
        self.sched_events.len() as u64
    }

    pub fn update(&mut self, ev: SchedEvent) {
        let latency = ev.latency();
        self.total_latency += latency;
        self.min_latency = Some(self.min_latency.map_or(latency, |m| m.min(latency)));
        self.max_latency = Some(self.max_latency.map_or(latency, |m| m.max(latency)));
        self.sched_events.push(ev);
    }

    pub fn avg_latency(&self) -> f64 {
        debug_assert!(!self.sched_events.is_empty());
        self.total_latency as f64 / self.sched_events.len() as f64
    }

    pub fn latency_samples(&self) -> Vec<u64> {
        self.sched_events.iter().map(SchedEvent::latency).collect()
    }

    pub fn latency_stdev(&self) -> f64 {
        sample_stdev(&self.latency_samples())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
