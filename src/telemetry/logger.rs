//! # JSONL Telemetry Logger
//!
//! One JSON object per line:
//!
//! ```text
//! {"timestamp":"2026-10-16T12:00:00.000Z","kind":"attitude","roll":10.0,"pitch":-2.4,"yaw":10}
//! {"timestamp":"2026-10-16T12:00:00.004Z","kind":"battery","voltage":12.3}
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::TelemetryConfig;
use crate::error::Result;
use crate::msp::registry::Reading;

/// Log file name prefix
const FILE_PREFIX: &str = "telemetry_";

/// Log file extension
const FILE_EXTENSION: &str = "jsonl";

/// A reading with its receive time
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryRecord {
    pub timestamp: String,

    #[serde(flatten)]
    pub reading: Reading,
}

impl TelemetryRecord {
    pub fn new(reading: Reading, at: DateTime<Utc>) -> Self {
        Self {
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            reading,
        }
    }
}

/// Writes telemetry records to rotating JSONL files
pub struct TelemetryLogger {
    log_dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    writer: Option<BufWriter<File>>,
    current_path: Option<PathBuf>,
    records_in_file: usize,
    files_created: u64,
}

impl std::fmt::Debug for TelemetryLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryLogger")
            .field("log_dir", &self.log_dir)
            .field("current_path", &self.current_path)
            .field("records_in_file", &self.records_in_file)
            .finish_non_exhaustive()
    }
}

impl TelemetryLogger {
    /// Create a logger writing into `config.log_dir` (created if missing)
    pub fn new(config: &TelemetryConfig) -> Result<Self> {
        let log_dir = PathBuf::from(&config.log_dir);
        fs::create_dir_all(&log_dir)?;

        info!("Recording telemetry to {}", log_dir.display());

        Ok(Self {
            log_dir,
            max_records_per_file: config.max_records_per_file.max(1),
            max_files_to_keep: config.max_files_to_keep.max(1),
            writer: None,
            current_path: None,
            records_in_file: 0,
            files_created: 0,
        })
    }

    /// Path of the file currently being written, if any
    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    /// Record a reading stamped with the current time
    pub fn log(&mut self, reading: &Reading) -> Result<()> {
        self.write_record(&TelemetryRecord::new(*reading, Utc::now()))
    }

    /// Append one record, rotating first if the current file is full
    pub fn write_record(&mut self, record: &TelemetryRecord) -> Result<()> {
        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        let line = serde_json::to_string(record)?;
        if let Some(writer) = self.writer.as_mut() {
            writeln!(writer, "{}", line)?;
            writer.flush()?;
        }
        self.records_in_file += 1;
        Ok(())
    }

    fn rotate(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }

        let name = format!(
            "{}{}_{:04}.{}",
            FILE_PREFIX,
            Utc::now().format("%Y%m%d_%H%M%S"),
            self.files_created,
            FILE_EXTENSION
        );
        let path = self.log_dir.join(name);

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        debug!("Opened telemetry file {}", path.display());

        self.writer = Some(BufWriter::new(file));
        self.current_path = Some(path);
        self.records_in_file = 0;
        self.files_created += 1;

        self.prune_old_files()
    }

    /// Delete the oldest log files beyond the retention limit
    fn prune_old_files(&self) -> Result<()> {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.log_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_telemetry_file(path))
            .collect();

        if files.len() <= self.max_files_to_keep {
            return Ok(());
        }

        // Names embed timestamp and sequence, so lexical order is creation order
        files.sort();
        let excess = files.len() - self.max_files_to_keep;

        for path in files.into_iter().take(excess) {
            match fs::remove_file(&path) {
                Ok(()) => debug!("Removed old telemetry file {}", path.display()),
                Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
        Ok(())
    }
}

fn is_telemetry_file(path: &Path) -> bool {
    let name_matches = path
        .file_name()
        .and_then(|n| n.to_str())
        .map_or(false, |n| n.starts_with(FILE_PREFIX));
    let extension_matches = path.extension().map_or(false, |e| e == FILE_EXTENSION);
    name_matches && extension_matches
}
