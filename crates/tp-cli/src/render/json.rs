use std::collections::BTreeMap;
use std::io::Write;

use anyhow::Result;
use serde::Serialize;

use tp_core::analysis::{AnalysisResults, PeriodReport};
use tp_core::table::{ResultTable, TimeRange};

/// One machine-interface line per closed period: its tables grouped and
/// keyed by table class, rows as typed cells.
#[derive(Serialize)]
struct ReportEnvelope<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    period: Option<&'a str>,
    time_range: TimeRange,
    tables: BTreeMap<&'static str, Vec<&'a ResultTable>>,
}

#[derive(Serialize)]
struct SummaryEnvelope<'a> {
    summary: &'a ResultTable,
}

fn envelope(report: &PeriodReport) -> ReportEnvelope<'_> {
    let mut tables: BTreeMap<&'static str, Vec<&ResultTable>> = BTreeMap::new();
    for table in &report.tables {
        tables.entry(table.class.as_str()).or_default().push(table);
    }
    ReportEnvelope {
        period: report.name.as_deref(),
        time_range: report.time_range,
        tables,
    }
}

pub fn emit(results: &AnalysisResults, out: &mut impl Write) -> Result<()> {
    for report in &results.reports {
        serde_json::to_writer(&mut *out, &envelope(report))?;
        writeln!(out)?;
    }
    serde_json::to_writer(
        &mut *out,
        &SummaryEnvelope {
            summary: &results.summary,
        },
    )?;
    writeln!(out)?;
    Ok(())
}
