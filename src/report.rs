// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Message sink for errors, warnings and status notes.
//!
//! Every component takes a [`Reporter`] parameter instead of writing to a
//! process-wide sink. Messages are tagged w/ a severity, mirrored to the
//! matching `tracing` macro and, if a log file was configured, appended to
//! it one line per message. The reporter also latches whether any error or
//! warning occurred, which drives the process exit code.
//!

use crate::Error;
use std::{
    cell::{Cell, RefCell},
    fs::File,
    io::{BufWriter, Write},
};
use tracing::{debug, error, info, warn};

/// Severity tag attached to every diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal defect; the run will be aborted by the caller.
    Error,
    /// Non-fatal defect, e.g. a skipped record.
    Warning,
    /// Progress or status information.
    Note,
    /// Developer chatter.
    Debug,
}

/// Line-oriented diagnostics sink.
///
/// The pipeline is single-threaded, so interior mutability via `Cell` and
/// `RefCell` is all the synchronization needed.
#[derive(Debug, Default)]
pub struct Reporter {
    log: Option<RefCell<BufWriter<File>>>,
    errors: Cell<u32>,
    warnings: Cell<u32>,
}

impl Reporter {
    /// A reporter that only feeds the `tracing` subscriber.
    pub fn to_console() -> Self {
        Self::default()
    }

    /// A reporter that additionally appends every message to the log file
    /// at `path` (created or truncated).
    pub fn with_log_file(path: &str) -> Result<Self, Error> {
        let file = File::create(path).map_err(|source| Error::IoOpen {
            path: path.into(),
            source,
        })?;
        Ok(Reporter {
            log: Some(RefCell::new(BufWriter::new(file))),
            ..Default::default()
        })
    }

    /// Report a message w/ an explicit severity tag.
    pub fn emit(&self, severity: Severity, msg: impl AsRef<str>) {
        let msg = msg.as_ref();
        match severity {
            Severity::Error => {
                self.errors.set(self.errors.get() + 1);
                error!("{msg}");
                self.append("ERROR", msg);
            }
            Severity::Warning => {
                self.warnings.set(self.warnings.get() + 1);
                warn!("{msg}");
                self.append("WARNING", msg);
            }
            Severity::Note => {
                info!("{msg}");
                self.append("NOTE", msg);
            }
            Severity::Debug => {
                debug!("{msg}");
                self.append("DEBUG", msg);
            }
        }
    }

    /// Report a fatal error message.
    pub fn error(&self, msg: impl AsRef<str>) {
        self.emit(Severity::Error, msg);
    }

    /// Report a non-fatal warning.
    pub fn warning(&self, msg: impl AsRef<str>) {
        self.emit(Severity::Warning, msg);
    }

    /// Report a status note.
    pub fn note(&self, msg: impl AsRef<str>) {
        self.emit(Severity::Note, msg);
    }

    /// Report developer-level detail.
    pub fn debug(&self, msg: impl AsRef<str>) {
        self.emit(Severity::Debug, msg);
    }

    /// Report a per-record defect as a warning and note that the record
    /// was skipped.
    pub fn record_skipped(&self, defect: &Error) {
        self.warning(format!("{defect}\nRecord skipped."));
    }

    /// Whether any error was reported.
    pub fn has_errors(&self) -> bool {
        self.errors.get() > 0
    }

    /// Whether any warning was reported.
    pub fn has_warnings(&self) -> bool {
        self.warnings.get() > 0
    }

    /// Number of warnings reported so far.
    pub fn warning_count(&self) -> u32 {
        self.warnings.get()
    }

    /// Suggested process exit code: 0 on success, nonzero after any fatal
    /// error.
    pub fn exit_code(&self) -> i32 {
        if self.has_errors() { 1 } else { 0 }
    }

    fn append(&self, tag: &str, msg: &str) {
        if let Some(log) = &self.log {
            let mut w = log.borrow_mut();
            // a failing log write must not abort the run
            let _ = writeln!(w, "{tag}: {msg}");
            let _ = w.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_status_flags() {
        let r = Reporter::to_console();
        assert!(!r.has_errors());
        assert!(!r.has_warnings());
        assert_eq!(r.exit_code(), 0);

        r.note("reading input");
        assert!(!r.has_warnings());

        r.warning("suspicious record");
        assert!(r.has_warnings());
        assert_eq!(r.warning_count(), 1);
        assert_eq!(r.exit_code(), 0);

        r.error("schema defect");
        assert!(r.has_errors());
        assert_eq!(r.exit_code(), 1);
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_messages_reach_tracing() {
        let r = Reporter::to_console();
        r.warning("suspicious vertex");
        r.note("multiplexing done");
        r.debug("slot 17 reused");

        assert!(logs_contain("suspicious vertex"));
        assert!(logs_contain("multiplexing done"));
        assert!(logs_contain("slot 17 reused"));
        assert!(!logs_contain("never emitted"));
    }

    #[test]
    fn test_log_file_lines_are_tagged() {
        let path = std::env::temp_dir().join("survey_gis_report_test.log");
        let path = path.to_str().unwrap().to_owned();
        {
            let r = Reporter::with_log_file(&path).unwrap();
            r.note("one");
            r.warning("two");
        }
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("NOTE: one"));
        assert!(text.contains("WARNING: two"));
        let _ = fs::remove_file(&path);
    }
}
