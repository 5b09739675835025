use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::common::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A structured breadcrumb emitted while cleaning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticEvent {
    /// Coarse tag such as `cleanup.run` or `cleanup.item`
    pub category: String,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl DiagnosticEvent {
    pub fn new(category: &str, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            category: category.to_string(),
            severity,
            message: message.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }
}

/// Where diagnostic events go. Callers ignore the result beyond logging it.
pub trait DiagnosticsSink: Send + Sync {
    fn record(&self, event: &DiagnosticEvent) -> Result<()>;
}

/// Forwards events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn record(&self, event: &DiagnosticEvent) -> Result<()> {
        let metadata = format!("{:?}", event.metadata);
        match event.severity {
            Severity::Info => {
                tracing::debug!(category = %event.category, %metadata, "{}", event.message)
            }
            Severity::Warning => {
                tracing::warn!(category = %event.category, %metadata, "{}", event.message)
            }
            Severity::Error => {
                tracing::error!(category = %event.category, %metadata, "{}", event.message)
            }
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct JsonlRecord<'a> {
    run_id: &'a str,
    timestamp: DateTime<Utc>,
    #[serde(flatten)]
    event: &'a DiagnosticEvent,
}

/// Appends events as JSON lines, each tagged with this process's run id
#[derive(Debug)]
pub struct JsonlSink {
    path: PathBuf,
    run_id: String,
    lock: Mutex<()>,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            run_id: uuid::Uuid::new_v4().to_string(),
            lock: Mutex::new(()),
        }
    }

    /// `~/.tidyguard/logs/diagnostics.jsonl`
    pub fn open_default() -> Self {
        Self::new(Config::logs_dir().join("diagnostics.jsonl"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }
}

impl DiagnosticsSink for JsonlSink {
    fn record(&self, event: &DiagnosticEvent) -> Result<()> {
        let record = JsonlRecord {
            run_id: &self.run_id,
            timestamp: Utc::now(),
            event,
        };
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let _held = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }
}

/// Fans one event out to several sinks; the first error is reported after
/// every sink has been tried
pub struct FanoutSink {
    sinks: Vec<Box<dyn DiagnosticsSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Box<dyn DiagnosticsSink>>) -> Self {
        Self { sinks }
    }
}

impl DiagnosticsSink for FanoutSink {
    fn record(&self, event: &DiagnosticEvent) -> Result<()> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.record(event) {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Deliver an event and swallow any sink failure
pub fn emit(sink: &dyn DiagnosticsSink, event: DiagnosticEvent) {
    if let Err(e) = sink.record(&event) {
        tracing::debug!(error = %e, category = %event.category, "diagnostics sink failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Broken;

    impl DiagnosticsSink for Broken {
        fn record(&self, _event: &DiagnosticEvent) -> Result<()> {
            anyhow::bail!("disk full")
        }
    }

    #[test]
    fn test_jsonl_appends_lines() {
        let dir = TempDir::new().unwrap();
        let sink = JsonlSink::new(dir.path().join("logs/diag.jsonl"));
        sink.record(&DiagnosticEvent::new("cleanup.run", Severity::Info, "start").with("count", 3))
            .unwrap();
        sink.record(&DiagnosticEvent::new("cleanup.category", Severity::Error, "failed"))
            .unwrap();

        let content = std::fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["run_id"], sink.run_id());
        assert_eq!(lines[0]["metadata"]["count"], "3");
        assert_eq!(lines[1]["severity"], "error");
    }

    #[test]
    fn test_emit_swallows_errors() {
        emit(&Broken, DiagnosticEvent::new("cleanup.run", Severity::Info, "start"));
    }

    #[test]
    fn test_fanout_tries_every_sink() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("diag.jsonl");
        let fanout = FanoutSink::new(vec![Box::new(Broken), Box::new(JsonlSink::new(&path))]);
        assert!(fanout
            .record(&DiagnosticEvent::new("cleanup.item", Severity::Info, "queued"))
            .is_err());
        assert!(path.exists());
    }
}
