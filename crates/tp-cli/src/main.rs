use std::io::Write;

use anyhow::Result;
use clap::Parser;

use tp_core::analysis::irq::IrqCollector;
use tp_core::analysis::sched::SchedCollector;
use tp_core::analysis::{Analysis, AnalysisResults, Collector};
use tp_core::state::StateLayer;

mod args;
mod input;
mod render;
mod tracker;

use args::{AnalysisArgs, Cli, Commands, EntryPoint};
use render::RenderOpts;
use tracker::KernelTracker;

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Irq(args) => run(&args, EntryPoint::Irq),
        Commands::Sched(args) => run(&args, EntryPoint::Sched),
        Commands::Freq(args) => run(&args, EntryPoint::Freq),
    }
}

fn run(args: &AnalysisArgs, entry: EntryPoint) -> Result<()> {
    let conf = args.to_config(entry)?;
    let state: Box<dyn StateLayer> = Box::new(KernelTracker::new());
    match entry {
        EntryPoint::Irq | EntryPoint::Freq => {
            drive(args, Analysis::new(conf, state, IrqCollector::new()))
        }
        EntryPoint::Sched => drive(args, Analysis::new(conf, state, SchedCollector::new())),
    }
}

fn drive<C: Collector>(args: &AnalysisArgs, mut analysis: Analysis<C>) -> Result<()> {
    let reader = input::EventReader::open(&args.trace)?;
    let mut count = 0u64;
    for ev in reader {
        analysis.process_event(&ev?);
        count += 1;
    }
    log::info!("processed {count} events from {}", args.trace.display());

    let results = analysis.end_analysis();
    emit(args, &results)
}

fn emit(args: &AnalysisArgs, results: &AnalysisResults) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if args.json {
        render::json::emit(results, &mut out)?;
    } else {
        let opts = RenderOpts {
            gmt: args.gmt,
            multi_day: args.multi_day,
        };
        render::text::print_results(results, &opts, &mut out)?;
    }
    out.flush()?;
    Ok(())
}
