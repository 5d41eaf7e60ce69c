use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Local, Utc};

use tp_core::analysis::{AnalysisResults, PeriodReport};
use tp_core::table::{Cell, ResultTable, TableClass};

use super::{RenderOpts, graph};

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// `HH:MM:SS.nnnnnnnnn`, local time unless `gmt`; `multi_day` adds the date.
pub fn format_timestamp(ts: u64, opts: &RenderOpts) -> String {
    let secs = (ts / 1_000_000_000) as i64;
    let nanos = (ts % 1_000_000_000) as u32;
    let Some(utc) = DateTime::<Utc>::from_timestamp(secs, nanos) else {
        return ts.to_string();
    };
    let (date, time) = if opts.gmt {
        (
            utc.format("%Y-%m-%d").to_string(),
            utc.format("%H:%M:%S").to_string(),
        )
    } else {
        let local = utc.with_timezone(&Local);
        (
            local.format("%Y-%m-%d").to_string(),
            local.format("%H:%M:%S").to_string(),
        )
    };
    if opts.multi_day {
        format!("{date} {time}.{nanos:09}")
    } else {
        format!("{time}.{nanos:09}")
    }
}

fn cell_text(cell: &Cell, opts: &RenderOpts) -> String {
    match cell {
        Cell::TimeRange { begin, end } => format!(
            "[{}, {}]",
            format_timestamp(*begin, opts),
            format_timestamp(*end, opts)
        ),
        Cell::Timestamp { ts } => format_timestamp(*ts, opts),
        Cell::Duration { ns } => format!("{:.3}", ns / 1000.0),
        Cell::Integer { value } => value.to_string(),
        Cell::Irq { is_hard, nr, name } => {
            let kind = if *is_hard { "IRQ" } else { "SoftIRQ" };
            format!("{kind} {nr} <{name}>")
        }
        Cell::Cpu { id } => id.to_string(),
        Cell::Process { tid, comm } => format!("{comm} ({tid})"),
        Cell::Empty => String::new(),
        Cell::Unknown => "?".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

fn table_title(table: &ResultTable) -> &'static str {
    match table.class {
        TableClass::Log => "Log",
        TableClass::Stats => "Statistics",
        TableClass::RaiseStats => "Raise latency statistics",
        TableClass::Freq => "Frequency distribution",
        TableClass::Summary => "Summary",
    }
}

fn write_table(out: &mut impl Write, title: &str, table: &ResultTable, opts: &RenderOpts) -> Result<()> {
    let headers: Vec<&str> = table.columns.iter().map(|c| c.title).collect();
    let rows: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| row.iter().map(|cell| cell_text(cell, opts)).collect())
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.len());
        }
    }
    let total: usize = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);

    writeln!(out, "{title}")?;
    writeln!(out, "{}", "-".repeat(total))?;
    let header_line: Vec<String> = headers
        .iter()
        .zip(widths.iter().copied())
        .map(|(h, w)| format!("{h:<w$}"))
        .collect();
    writeln!(out, "{}", header_line.join("  "))?;
    writeln!(out, "{}", "-".repeat(total))?;
    for row in &rows {
        let line: Vec<String> = row
            .iter()
            .zip(widths.iter().copied())
            .map(|(c, w)| format!("{c:<w$}"))
            .collect();
        writeln!(out, "{}", line.join("  "))?;
    }
    Ok(())
}

fn write_freq(out: &mut impl Write, table: &ResultTable) -> Result<()> {
    let data: Vec<(String, u64)> = table
        .rows
        .iter()
        .map(|row| {
            let label = row[0]
                .as_us()
                .map(|us| format!("{us:.3}"))
                .unwrap_or_default();
            let count = match &row[2] {
                Cell::Integer { value } => (*value).max(0) as u64,
                _ => 0,
            };
            (label, count)
        })
        .collect();
    let title = match &table.subtitle {
        Some(subtitle) => format!("Frequency distribution {subtitle} (usec)"),
        None => "Frequency distribution (usec)".to_string(),
    };
    for line in graph::render(&title, &data, graph::DEFAULT_WIDTH) {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

fn print_report(report: &PeriodReport, opts: &RenderOpts, out: &mut impl Write) -> Result<()> {
    match &report.name {
        Some(name) => writeln!(out, "Period: {name}")?,
        None => writeln!(out, "Period")?,
    }
    writeln!(
        out,
        "Timerange: [{}, {}]",
        format_timestamp(report.time_range.begin, opts),
        format_timestamp(report.time_range.end, opts)
    )?;
    for table in &report.tables {
        match table.class {
            // empty freq tables keep their slot in the report but render
            // nothing
            TableClass::Freq if table.rows.is_empty() => {}
            TableClass::Freq => {
                writeln!(out)?;
                write_freq(out, table)?;
            }
            _ => {
                writeln!(out)?;
                write_table(out, table_title(table), table, opts)?;
            }
        }
    }
    writeln!(out)?;
    Ok(())
}

pub fn print_results(
    results: &AnalysisResults,
    opts: &RenderOpts,
    out: &mut impl Write,
) -> Result<()> {
    for report in &results.reports {
        print_report(report, opts, out)?;
    }
    if !results.summary.rows.is_empty() {
        write_table(out, "Summary", &results.summary, opts)?;
    }
    Ok(())
}
