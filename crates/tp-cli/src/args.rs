use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};

use tp_core::analysis::{AnalysisConfig, parse_id_list, parse_period_defs};

#[derive(Parser)]
#[command(name = "tracepulse", about = "Kernel trace interrupt and scheduler latency analyzer")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Interrupt statistics, log and frequency distribution
    Irq(AnalysisArgs),
    /// Scheduler wake→switch latency analysis
    Sched(AnalysisArgs),
    /// Interrupt analysis with the frequency distribution enabled
    Freq(AnalysisArgs),
}

/// Which subcommand is running; `Freq` is the irq analysis with `--freq`
/// implied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPoint {
    Irq,
    Sched,
    Freq,
}

#[derive(Debug, clap::Args)]
pub struct AnalysisArgs {
    /// Decoded trace in JSONL form, one event object per line
    pub trace: PathBuf,

    /// Output the events in chronological order
    #[arg(long)]
    pub log: bool,

    /// Output statistics
    #[arg(long)]
    pub stats: bool,

    /// Output the frequency distribution of durations
    #[arg(long)]
    pub freq: bool,

    /// Number of histogram bins
    #[arg(long, default_value_t = 20, value_name = "N")]
    pub freq_resolution: usize,

    /// Only account durations of at least this many microseconds
    #[arg(long, value_name = "US")]
    pub min: Option<f64>,

    /// Only account durations of at most this many microseconds
    #[arg(long, value_name = "US")]
    pub max: Option<f64>,

    /// Only show results for this list of hard IRQ numbers
    #[arg(long, value_name = "CSV")]
    pub irq: Option<String>,

    /// Only show results for this list of soft IRQ vectors
    #[arg(long, value_name = "CSV")]
    pub softirq: Option<String>,

    /// Only account processes with these command names
    #[arg(long, value_name = "CSV")]
    pub procname: Option<String>,

    /// Only account these tids
    #[arg(long, value_name = "CSV")]
    pub tid: Option<String>,

    /// Only account events on these CPUs
    #[arg(long, value_name = "CSV")]
    pub cpu: Option<String>,

    /// Render timestamps in GMT instead of local time
    #[arg(long)]
    pub gmt: bool,

    /// Render dates alongside timestamps
    #[arg(long)]
    pub multi_day: bool,

    /// Period definition `[name]:<begin>[:<end>]`; repeatable
    #[arg(long = "period", value_name = "EXPR")]
    pub periods: Vec<String>,

    /// Rotate period instances every this many nanoseconds
    #[arg(long, value_name = "NS")]
    pub refresh: Option<u64>,

    /// Drop events before this timestamp (ns)
    #[arg(long, value_name = "NS")]
    pub begin: Option<u64>,

    /// Drop events after this timestamp (ns)
    #[arg(long, value_name = "NS")]
    pub end: Option<u64>,

    /// Emit result tables as JSON instead of text
    #[arg(long)]
    pub json: bool,
}

impl AnalysisArgs {
    pub fn to_config(&self, entry: EntryPoint) -> Result<AnalysisConfig> {
        let mut conf = AnalysisConfig {
            begin_ts: self.begin,
            end_ts: self.end,
            refresh_period: self.refresh,
            min_duration: self.min.map(us_to_ns),
            max_duration: self.max.map(us_to_ns),
            freq_resolution: self.freq_resolution,
            log: self.log,
            stats: self.stats,
            freq: self.freq || entry == EntryPoint::Freq,
            ..Default::default()
        };
        // a bare invocation means statistics
        if !(conf.log || conf.stats || conf.freq) {
            conf.stats = true;
        }

        conf.period_defs = parse_period_defs(&self.periods).map_err(|e| anyhow!("{e}"))?;
        if let Some(raw) = &self.irq {
            conf.irq_filter = Some(parse_id_list(raw).map_err(|e| anyhow!("{e}"))?);
        }
        if let Some(raw) = &self.softirq {
            conf.softirq_filter = Some(parse_id_list(raw).map_err(|e| anyhow!("{e}"))?);
        }
        if let Some(raw) = &self.tid {
            conf.tid_filter = Some(parse_id_list(raw).map_err(|e| anyhow!("{e}"))?);
        }
        if let Some(raw) = &self.cpu {
            conf.cpu_filter = Some(parse_id_list(raw).map_err(|e| anyhow!("{e}"))?);
        }
        if let Some(raw) = &self.procname {
            conf.proc_filter = Some(raw.split(',').map(|p| p.trim().to_string()).collect());
        }
        Ok(conf)
    }
}

fn us_to_ns(us: f64) -> u64 {
    (us * 1000.0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> AnalysisArgs {
        match Cli::parse_from(argv).command {
            Commands::Irq(a) | Commands::Sched(a) | Commands::Freq(a) => a,
        }
    }

    #[test]
    fn bare_invocation_defaults_to_stats() {
        let args = parse(&["tracepulse", "irq", "trace.jsonl"]);
        let conf = args.to_config(EntryPoint::Irq).unwrap();
        assert!(conf.stats && !conf.log && !conf.freq);
    }

    #[test]
    fn freq_entry_implies_freq() {
        let args = parse(&["tracepulse", "freq", "trace.jsonl"]);
        let conf = args.to_config(EntryPoint::Freq).unwrap();
        assert!(conf.freq && !conf.stats);
    }

    #[test]
    fn min_max_convert_to_nanoseconds() {
        let args = parse(&["tracepulse", "irq", "--min", "2", "--max", "4.5", "t.jsonl"]);
        let conf = args.to_config(EntryPoint::Irq).unwrap();
        assert_eq!(conf.min_duration, Some(2_000));
        assert_eq!(conf.max_duration, Some(4_500));
    }

    #[test]
    fn filters_parse_csv_lists() {
        let args = parse(&[
            "tracepulse",
            "irq",
            "--irq",
            "42,43",
            "--cpu",
            "0, 2",
            "t.jsonl",
        ]);
        let conf = args.to_config(EntryPoint::Irq).unwrap();
        assert_eq!(conf.irq_filter, Some(vec![42, 43]));
        assert_eq!(conf.cpu_filter, Some(vec![0, 2]));
    }

    #[test]
    fn malformed_period_is_fatal() {
        let args = parse(&["tracepulse", "irq", "--period", "not a period", "t.jsonl"]);
        assert!(args.to_config(EntryPoint::Irq).is_err());
    }

    #[test]
    fn periods_parse_and_accumulate() {
        let args = parse(&[
            "tracepulse",
            "irq",
            "--period",
            r#"a:$evt.$name == "x""#,
            "--period",
            r#"b:$evt.$name == "y""#,
            "t.jsonl",
        ]);
        let conf = args.to_config(EntryPoint::Irq).unwrap();
        assert_eq!(conf.period_defs.len(), 2);
        assert_eq!(conf.period_defs[0].name.as_deref(), Some("a"));
    }
}
