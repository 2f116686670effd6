use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

// JSONL event sink for layout runs. Write failures are swallowed so logging never
// changes the produced document.
#[derive(Clone)]
pub(crate) struct DebugLogger {
    inner: Arc<Mutex<DebugState>>,
}

struct DebugState {
    writer: BufWriter<File>,
    counters: HashMap<String, u64>,
}

impl DebugLogger {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(DebugState {
                writer: BufWriter::new(file),
                counters: HashMap::new(),
            })),
        })
    }

    pub fn log_json(&self, json: &str) {
        if let Ok(mut state) = self.inner.lock() {
            let _ = writeln!(state.writer, "{json}");
        }
    }

    pub fn log_dataset_parsed(
        &self,
        headers: &[String],
        rows: usize,
        has_headers: bool,
        delimiter: &str,
    ) {
        self.log_json(&format!(
            "{{\"type\":\"dataset.parsed\",\"headers\":{},\"rows\":{},\"hasHeaders\":{},\"delimiter\":\"{}\"}}",
            json_string_array(headers),
            rows,
            has_headers,
            json_escape(delimiter)
        ));
    }

    pub fn log_label_placed(
        &self,
        record: usize,
        page: usize,
        row: usize,
        column: usize,
        lines: usize,
    ) {
        self.log_json(&format!(
            "{{\"type\":\"label.placed\",\"record\":{},\"page\":{},\"row\":{},\"column\":{},\"lines\":{}}}",
            record, page, row, column, lines
        ));
    }

    pub fn log_label_failed(&self, record: usize, cause: &str) {
        self.log_json(&format!(
            "{{\"type\":\"label.failed\",\"record\":{},\"cause\":\"{}\"}}",
            record,
            json_escape(cause)
        ));
    }

    pub fn log_page_done(&self, page: usize, labels: usize, commands: usize) {
        self.log_json(&format!(
            "{{\"type\":\"page.done\",\"page\":{},\"labels\":{},\"commands\":{}}}",
            page, labels, commands
        ));
    }

    pub fn increment(&self, key: &str, amount: u64) {
        if amount == 0 {
            return;
        }
        if let Ok(mut state) = self.inner.lock() {
            let entry = state.counters.entry(key.to_string()).or_insert(0);
            *entry = entry.saturating_add(amount);
        }
    }

    // One `debug.summary` event per run; counters start again from zero afterwards.
    pub fn emit_summary(&self, context: &str) {
        if let Ok(mut state) = self.inner.lock() {
            let mut counters: Vec<(String, u64)> = state.counters.drain().collect();
            counters.sort_by(|a, b| a.0.cmp(&b.0));
            let mut counts_json = String::from("{");
            for (idx, (key, value)) in counters.iter().enumerate() {
                if idx > 0 {
                    counts_json.push(',');
                }
                counts_json.push_str(&format!("\"{}\":{}", json_escape(key), value));
            }
            counts_json.push('}');
            let json = format!(
                "{{\"type\":\"debug.summary\",\"context\":\"{}\",\"counts\":{}}}",
                json_escape(context),
                counts_json
            );
            let _ = writeln!(state.writer, "{json}");
        }
    }

    pub fn flush(&self) {
        if let Ok(mut state) = self.inner.lock() {
            let _ = state.writer.flush();
        }
    }
}

pub(crate) fn json_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 8);
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            _ => out.push(ch),
        }
    }
    out
}

pub(crate) fn json_string_array(values: &[String]) -> String {
    let items = values
        .iter()
        .map(|value| format!("\"{}\"", json_escape(value)))
        .collect::<Vec<_>>()
        .join(",");
    format!("[{}]", items)
}
