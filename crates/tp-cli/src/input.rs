use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use tp_core::event::{Event, FieldValue, Scope};

/// Streaming JSONL reader for decoded trace events.
///
/// One JSON object per line: `ts` (ns), `name` and `cpu` at the top level,
/// fields grouped under per-scope objects (`payload`, `ctx`, `stream_ctx`,
/// `header`, `pkt_ctx`, `pkt_header`; `fields` is accepted as an alias of
/// `payload`). Blank lines are skipped.
pub struct EventReader {
    lines: Lines<BufReader<File>>,
    line_no: usize,
}

impl EventReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("cannot open trace `{}`", path.display()))?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            line_no: 0,
        })
    }
}

impl Iterator for EventReader {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            return Some(
                parse_event(&line).with_context(|| format!("trace line {}", self.line_no)),
            );
        }
    }
}

const SCOPE_KEYS: &[(&str, Scope)] = &[
    ("payload", Scope::Payload),
    ("fields", Scope::Payload),
    ("ctx", Scope::EventContext),
    ("stream_ctx", Scope::StreamContext),
    ("header", Scope::EventHeader),
    ("pkt_ctx", Scope::PacketContext),
    ("pkt_header", Scope::PacketHeader),
];

pub fn parse_event(line: &str) -> Result<Event> {
    let value: Value = serde_json::from_str(line).context("invalid JSON")?;
    let obj = value.as_object().context("event must be a JSON object")?;

    let ts = obj
        .get("ts")
        .and_then(Value::as_u64)
        .context("missing `ts`")?;
    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .context("missing `name`")?;
    let cpu = obj.get("cpu").and_then(Value::as_u64).unwrap_or(0) as u32;

    let mut ev = Event::new(ts, name, cpu);
    for (key, scope) in SCOPE_KEYS {
        if let Some(fields) = obj.get(*key).and_then(Value::as_object) {
            for (fname, fval) in fields {
                if let Some(field) = field_value(fval) {
                    ev.set_field(*scope, fname, field);
                }
            }
        }
    }
    Ok(ev)
}

fn field_value(value: &Value) -> Option<FieldValue> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(FieldValue::Integer(i))
            } else {
                n.as_f64().map(FieldValue::Float)
            }
        }
        Value::String(s) => Some(FieldValue::String(s.clone())),
        _ => None,
    }
}
