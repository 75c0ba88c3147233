// Copyright (c) The testreplay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Crash-durable writing of execution logs.

use super::format::{EventRecord, LogHeader, LogLine};
use crate::{
    errors::LogWriteError,
    identity::{OutcomeKind, TestIdentity, WorkerId},
};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::Local;
use std::{
    collections::HashMap,
    fs::{File, OpenOptions},
    io::Write,
};
use tracing::{debug, trace};

/// Appends test events to an execution log, forcing each one to stable
/// storage before returning.
///
/// A `LogWriter` exclusively owns its file for the duration of a run. It also
/// keeps the ordered list of started tests in memory, so that a replay
/// script can be produced at the end of a clean run without reading the log
/// back.
#[derive(Debug)]
pub struct LogWriter {
    path: Utf8PathBuf,
    // None after close.
    file: Option<File>,
    started: Vec<TestIdentity>,
    // Number of starts for each test that have not yet seen an outcome.
    open_starts: HashMap<TestIdentity, usize>,
    // A start whose write failed after bytes may have reached the file.
    unconfirmed_start: Option<TestIdentity>,
    poisoned: bool,
}

impl LogWriter {
    /// Creates (or truncates) the log at `path` and durably writes its header.
    ///
    /// Missing parent directories are created. The log's directory entry and
    /// the entry of every directory created along the way are synced too.
    pub fn open(path: &Utf8Path, worker_id: Option<WorkerId>) -> Result<Self, LogWriteError> {
        let dirs_to_sync = dirs_to_sync(path);
        if let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|error| LogWriteError::Create {
                path: path.to_owned(),
                error,
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(path)
            .map_err(|error| LogWriteError::Create {
                path: path.to_owned(),
                error,
            })?;

        let mut writer = Self {
            path: path.to_owned(),
            file: Some(file),
            started: Vec::new(),
            open_starts: HashMap::new(),
            unconfirmed_start: None,
            poisoned: false,
        };

        let header = LogHeader::new(worker_id, Local::now().fixed_offset());
        writer.append(&LogLine::Header(header))?;
        sync_dirs(&dirs_to_sync)?;

        debug!("opened execution log at {path}");
        Ok(writer)
    }

    /// Returns the path to the log.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Returns the tests started so far, in the order they were started.
    ///
    /// Repeated starts of the same test are preserved.
    ///
    /// Only starts whose writes succeeded are included. A start whose write
    /// failed part way may still be in the file; see
    /// [`Self::unconfirmed_start`].
    pub fn started(&self) -> &[TestIdentity] {
        &self.started
    }

    /// Returns the test whose start record failed to write, if any.
    ///
    /// The failure may have happened after some or all of the record reached
    /// the file (for example if only the final sync failed), so the log may or
    /// may not show this test as started.
    pub fn unconfirmed_start(&self) -> Option<&TestIdentity> {
        self.unconfirmed_start.as_ref()
    }

    /// Returns true if the log has been closed.
    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    /// Returns true if a write has failed. A poisoned writer accepts no
    /// further records.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Durably records that `test` is about to run.
    pub fn record_start(&mut self, test: &TestIdentity) -> Result<(), LogWriteError> {
        if let Err(error) = self.append(&LogLine::from(EventRecord::Start(test.clone()))) {
            if matches!(
                error,
                LogWriteError::Write { .. } | LogWriteError::Sync { .. }
            ) {
                self.unconfirmed_start = Some(test.clone());
            }
            return Err(error);
        }

        self.started.push(test.clone());
        *self.open_starts.entry(test.clone()).or_default() += 1;
        trace!("recorded start of {test}");
        Ok(())
    }

    /// Durably records that `test` finished with `outcome`.
    ///
    /// Fails without writing anything if `test` has no start record that is
    /// still waiting for an outcome.
    pub fn record_outcome(
        &mut self,
        test: &TestIdentity,
        outcome: OutcomeKind,
    ) -> Result<(), LogWriteError> {
        if !self.open_starts.contains_key(test) {
            return Err(LogWriteError::OutcomeWithoutStart {
                test: test.to_string(),
                outcome,
            });
        }

        self.append(&LogLine::from(EventRecord::Outcome(test.clone(), outcome)))?;

        if let Some(count) = self.open_starts.get_mut(test) {
            *count -= 1;
            if *count == 0 {
                self.open_starts.remove(test);
            }
        }
        trace!("recorded outcome of {test}: {outcome}");
        Ok(())
    }

    /// Closes the log, releasing the file handle.
    ///
    /// Every record is already on stable storage, so closing only drops the
    /// handle. Calling this more than once is a no-op.
    pub fn close(&mut self) {
        if self.file.take().is_some() {
            debug!("closed execution log at {}", self.path);
        }
    }

    fn append(&mut self, line: &LogLine) -> Result<(), LogWriteError> {
        if self.poisoned {
            return Err(LogWriteError::Poisoned {
                path: self.path.clone(),
            });
        }
        // Writing after close is treated like a failed write.
        let Some(file) = self.file.as_mut() else {
            return Err(LogWriteError::Poisoned {
                path: self.path.clone(),
            });
        };

        let bytes = line
            .to_line_bytes()
            .map_err(|error| LogWriteError::Serialize { error })?;

        let result = file
            .write_all(&bytes)
            .and_then(|()| file.flush())
            .map_err(|error| LogWriteError::Write {
                path: self.path.clone(),
                error,
            })
            .and_then(|()| {
                file.sync_data().map_err(|error| LogWriteError::Sync {
                    path: self.path.clone(),
                    error,
                })
            });

        if result.is_err() {
            self.poisoned = true;
        }
        result
    }
}

#[cfg(test)]
impl LogWriter {
    /// Swaps the file handle for a read-only one, so that every later write
    /// fails.
    pub(crate) fn make_read_only(&mut self) {
        self.file = Some(File::open(&self.path).unwrap());
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        self.close();
    }
}

/// Returns the directories whose entries change when `path` is created: its
/// parent, plus the parent of every ancestor that doesn't exist yet.
///
/// Must be called before any directories are created.
fn dirs_to_sync(path: &Utf8Path) -> Vec<Utf8PathBuf> {
    let mut dirs = Vec::new();
    let mut current = path;
    while let Some(parent) = current.parent() {
        let parent = if parent.as_str().is_empty() {
            Utf8Path::new(".")
        } else {
            parent
        };
        dirs.push(parent.to_owned());
        if parent.exists() {
            break;
        }
        current = parent;
    }
    dirs
}

/// Syncs each of `dirs`, so that new directory entries in them are durable.
fn sync_dirs(dirs: &[Utf8PathBuf]) -> Result<(), LogWriteError> {
    cfg_if::cfg_if! {
        if #[cfg(unix)] {
            for dir in dirs {
                File::open(dir)
                    .and_then(|dir_file| dir_file.sync_all())
                    .map_err(|error| LogWriteError::DirSync {
                        dir: dir.clone(),
                        error,
                    })?;
            }
            Ok(())
        } else {
            // Directories can't be opened as files on Windows; NTFS journals
            // directory entries itself.
            let _ = dirs;
            Ok(())
        }
    }
}
