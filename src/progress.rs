//! Migration progress reporting.
//!
//! Reports what the run is doing while it works through legacy assets and
//! documents. Progress is emitted on **stderr** so stdout (the report, or the
//! `--json` output) stays parseable for scripts.

use std::io::Write;

use clap::ValueEnum;

/// A single progress event for one migration run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MigrationProgressEvent {
    /// Listing legacy assets in the dataset. Total unknown.
    Scanning { dataset: String },
    /// Resolving legacy asset `n` of `total` and locating its references.
    Resolving { n: u64, total: u64 },
    /// Committed document `n` of `total`.
    Applying { n: u64, total: u64 },
}

/// Reports migration progress. Implementations write to stderr (human or JSON).
pub trait MigrationProgressReporter: Send + Sync {
    fn report(&self, event: MigrationProgressEvent);
}

/// Human-friendly progress on stderr: "migrate  resolving  12 / 1,024 assets".
pub struct StderrProgress;

impl MigrationProgressReporter for StderrProgress {
    fn report(&self, event: MigrationProgressEvent) {
        let line = match &event {
            MigrationProgressEvent::Scanning { dataset } => {
                format!("migrate {}  scanning...\n", dataset)
            }
            MigrationProgressEvent::Resolving { n, total } => format!(
                "migrate  resolving  {} / {} assets\n",
                format_number(*n),
                format_number(*total)
            ),
            MigrationProgressEvent::Applying { n, total } => format!(
                "migrate  applying  {} / {} documents\n",
                format_number(*n),
                format_number(*total)
            ),
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl JsonProgress {
    fn to_json(event: &MigrationProgressEvent) -> serde_json::Value {
        match event {
            MigrationProgressEvent::Scanning { dataset } => serde_json::json!({
                "event": "progress",
                "phase": "scanning",
                "dataset": dataset
            }),
            MigrationProgressEvent::Resolving { n, total } => serde_json::json!({
                "event": "progress",
                "phase": "resolving",
                "n": n,
                "total": total
            }),
            MigrationProgressEvent::Applying { n, total } => serde_json::json!({
                "event": "progress",
                "phase": "applying",
                "n": n,
                "total": total
            }),
        }
    }
}

impl MigrationProgressReporter for JsonProgress {
    fn report(&self, event: MigrationProgressEvent) {
        if let Ok(line) = serde_json::to_string(&Self::to_json(&event)) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl MigrationProgressReporter for NoProgress {
    fn report(&self, _event: MigrationProgressEvent) {}
}

pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn MigrationProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(1), "1");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234), "1,234");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn json_events_carry_phase() {
        let scanning = JsonProgress::to_json(&MigrationProgressEvent::Scanning {
            dataset: "production".into(),
        });
        assert_eq!(scanning["phase"], "scanning");
        assert_eq!(scanning["dataset"], "production");

        let applying = JsonProgress::to_json(&MigrationProgressEvent::Applying { n: 2, total: 5 });
        assert_eq!(applying["phase"], "applying");
        assert_eq!(applying["n"], 2);
        assert_eq!(applying["total"], 5);
    }

    #[test]
    fn progress_mode_parses_from_cli_value() {
        assert_eq!(ProgressMode::from_str("json", true).unwrap(), ProgressMode::Json);
        assert_eq!(ProgressMode::from_str("off", true).unwrap(), ProgressMode::Off);
        assert!(ProgressMode::from_str("loud", true).is_err());
    }
}
