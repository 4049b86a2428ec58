//! Recording
//!
//! Writes the keyframe stream through a [`RecordingStorage`] backend.
//! Writes are synchronous and flushed per line. Recording is best-effort:
//! per-line writes report a [`RecordStatus`] instead of an error, and the
//! first failure latches the recorder so later writes are skipped without
//! touching storage again.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::clock::Clock;
use crate::replay::codec::{encode_line, snapshot_world, StreamRecord};
use crate::sim::entity::World;

/// Default directory for file recordings.
pub const RECORDINGS_DIR: &str = "recordings";

/// File extension of recordings.
pub const RECORDING_EXTENSION: &str = "jsonl";

// =============================================================================
// ERRORS AND STATUS
// =============================================================================

/// Recording storage errors.
#[derive(Debug, Error)]
pub enum RecordingError {
    /// Underlying I/O failed
    #[error("recording I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Write or close before open
    #[error("recording storage is not open")]
    NotOpen,

    /// A control record could not be encoded
    #[error("failed to encode stream record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Outcome of a single best-effort write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordStatus {
    /// The line reached storage
    Written,
    /// Not recording, or a previous write failed
    Skipped,
    /// This write failed; the recorder is now faulted
    Failed,
}

// =============================================================================
// STORAGE
// =============================================================================

/// Line-oriented sink for a recording.
pub trait RecordingStorage {
    /// Start a new recording called `name`, replacing any open one.
    fn open_for_write(&mut self, name: &str) -> Result<(), RecordingError>;

    /// Append one line. Implementations add the newline and flush.
    fn write_line(&mut self, line: &str) -> Result<(), RecordingError>;

    /// Finish the current recording.
    fn close(&mut self) -> Result<(), RecordingError>;
}

/// Writes `<dir>/<name>.jsonl`.
#[derive(Debug)]
pub struct FileRecordingStorage {
    dir: PathBuf,
    writer: Option<BufWriter<File>>,
    path: Option<PathBuf>,
}

impl FileRecordingStorage {
    /// Storage rooted at `dir`, created on first open.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), writer: None, path: None }
    }

    /// Path of the current (or last) recording.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl Default for FileRecordingStorage {
    fn default() -> Self {
        Self::new(RECORDINGS_DIR)
    }
}

impl RecordingStorage for FileRecordingStorage {
    fn open_for_write(&mut self, name: &str) -> Result<(), RecordingError> {
        self.close()?;
        fs::create_dir_all(&self.dir)?;

        let path = self.dir.join(format!("{}.{}", name, RECORDING_EXTENSION));
        let file = File::create(&path)?;
        debug!(path = %path.display(), "recording file opened");

        self.writer = Some(BufWriter::new(file));
        self.path = Some(path);
        Ok(())
    }

    fn write_line(&mut self, line: &str) -> Result<(), RecordingError> {
        let writer = self.writer.as_mut().ok_or(RecordingError::NotOpen)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), RecordingError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}

/// Keeps the recording in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryRecordingStorage {
    name: Option<String>,
    lines: Vec<String>,
    open: bool,
}

impl MemoryRecordingStorage {
    /// Empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Name passed to the last open.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Lines written so far.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Whole recording as newline-terminated text.
    pub fn contents(&self) -> String {
        let mut text = String::new();
        for line in &self.lines {
            text.push_str(line);
            text.push('\n');
        }
        text
    }
}

impl RecordingStorage for MemoryRecordingStorage {
    fn open_for_write(&mut self, name: &str) -> Result<(), RecordingError> {
        self.name = Some(name.to_string());
        self.lines.clear();
        self.open = true;
        Ok(())
    }

    fn write_line(&mut self, line: &str) -> Result<(), RecordingError> {
        if !self.open {
            return Err(RecordingError::NotOpen);
        }
        self.lines.push(line.to_string());
        Ok(())
    }

    fn close(&mut self) -> Result<(), RecordingError> {
        self.open = false;
        Ok(())
    }
}

// =============================================================================
// SERVICE
// =============================================================================

/// Samples the world into a storage backend.
#[derive(Debug)]
pub struct RecordingService<S: RecordingStorage, C: Clock> {
    storage: S,
    clock: C,
    recording: bool,
    faulted: bool,
    started_ms: u64,
    written: u64,
}

impl<S: RecordingStorage, C: Clock> RecordingService<S, C> {
    /// Create an idle recorder.
    pub fn new(storage: S, clock: C) -> Self {
        Self {
            storage,
            clock,
            recording: false,
            faulted: false,
            started_ms: 0,
            written: 0,
        }
    }

    /// Open `name` and write the header.
    pub fn start(&mut self, name: &str, width: u32, height: u32) -> Result<(), RecordingError> {
        self.storage.open_for_write(name)?;

        let header = StreamRecord::Header { time: self.clock.wall_ms(), w: width, h: height };
        let written = header
            .encode()
            .map_err(RecordingError::from)
            .and_then(|line| self.storage.write_line(&line));
        if let Err(e) = written {
            if let Err(close) = self.storage.close() {
                warn!(error = %close, "closing recording after failed header");
            }
            return Err(e);
        }

        self.started_ms = self.clock.now_ms();
        self.recording = true;
        self.faulted = false;
        self.written = 1;
        info!(name, width, height, "recording started");
        Ok(())
    }

    /// Write the end marker and close storage.
    ///
    /// Storage is always closed. A failed end marker or close latches the
    /// fault like any other write and returns `Failed`. `Skipped` when not
    /// recording or already faulted.
    pub fn stop(&mut self) -> RecordStatus {
        if !self.recording {
            return RecordStatus::Skipped;
        }
        self.recording = false;

        let mut status = match StreamRecord::End.encode() {
            Ok(line) => self.write(&line),
            Err(e) => self.fault(&RecordingError::from(e)),
        };
        if let Err(e) = self.storage.close() {
            status = if self.faulted { RecordStatus::Failed } else { self.fault(&e) };
        }
        info!(lines = self.written, faulted = self.faulted, "recording stopped");
        status
    }

    /// Record a key press.
    pub fn record_input(&mut self, key: u32) -> RecordStatus {
        if !self.recording {
            return RecordStatus::Skipped;
        }
        let record = StreamRecord::Input { time: self.elapsed_ms(), key };
        match record.encode() {
            Ok(line) => self.write(&line),
            Err(e) => self.fault(&RecordingError::from(e)),
        }
    }

    /// Snapshot the world at the current elapsed time.
    pub fn record_keyframe(&mut self, world: &World) -> RecordStatus {
        if !self.recording {
            return RecordStatus::Skipped;
        }
        let sample = snapshot_world(world, self.elapsed_ms());
        self.write(&encode_line(&sample))
    }

    fn write(&mut self, line: &str) -> RecordStatus {
        if self.faulted {
            return RecordStatus::Skipped;
        }
        match self.storage.write_line(line) {
            Ok(()) => {
                self.written += 1;
                RecordStatus::Written
            }
            Err(e) => self.fault(&e),
        }
    }

    fn fault(&mut self, error: &RecordingError) -> RecordStatus {
        warn!(error = %error, "recording write failed, further writes are skipped");
        self.faulted = true;
        RecordStatus::Failed
    }

    /// Milliseconds since `start`.
    pub fn elapsed_ms(&self) -> i64 {
        i64::try_from(self.clock.now_ms().saturating_sub(self.started_ms)).unwrap_or(i64::MAX)
    }

    /// Whether a recording is open.
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Whether a write has failed since `start`.
    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    /// Lines written since `start`, header included.
    pub fn lines_written(&self) -> u64 {
        self.written
    }

    /// The storage backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Give back the storage backend.
    pub fn into_storage(self) -> S {
        self.storage
    }
}
