// Copyright (c) The testreplay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-worker file layout inside the output directory.
//!
//! Every worker process owns its own execution log and replay script. Because
//! files are never shared, workers need no locking or coordination; the only
//! shared operation is creating the output directory, which is idempotent.

use crate::{
    errors::{ConfigError, LogReadError},
    identity::WorkerId,
};
use camino::{Utf8Path, Utf8PathBuf};
use std::io;

/// Prefix of every file name testreplay writes.
pub const FILE_PREFIX: &str = ".testreplay";

/// Extension used for execution logs.
pub const LOG_EXTENSION: &str = "log";

/// Returns the path for a file with the given extension, owned by `worker_id`.
///
/// Single-process runs (no worker ID) use `<base_dir>/.testreplay.<ext>`;
/// workers use `<base_dir>/.testreplay-<worker>.<ext>`. Worker IDs are
/// validated to be file-name safe, so distinct workers never share a path.
pub fn path_for(base_dir: &Utf8Path, worker_id: Option<&WorkerId>, extension: &str) -> Utf8PathBuf {
    let file_name = match worker_id {
        Some(worker_id) => format!("{FILE_PREFIX}-{worker_id}.{extension}"),
        None => format!("{FILE_PREFIX}.{extension}"),
    };
    base_dir.join(file_name)
}

/// Creates `base_dir` and any missing parents.
///
/// Several workers may race to create the same directory; losing that race
/// is not an error.
pub fn ensure_base_dir(base_dir: &Utf8Path) -> Result<(), ConfigError> {
    match std::fs::create_dir_all(base_dir) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::AlreadyExists && base_dir.is_dir() => Ok(()),
        Err(error) => Err(ConfigError::OutputDirCreate {
            dir: base_dir.to_owned(),
            error,
        }),
    }
}

/// The files owned by one worker (or by a single-process run).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplayPaths {
    base_dir: Utf8PathBuf,
    worker_id: Option<WorkerId>,
}

impl ReplayPaths {
    /// Creates a new `ReplayPaths`.
    pub fn new(base_dir: impl Into<Utf8PathBuf>, worker_id: Option<WorkerId>) -> Self {
        Self {
            base_dir: base_dir.into(),
            worker_id,
        }
    }

    /// Returns the output directory.
    pub fn base_dir(&self) -> &Utf8Path {
        &self.base_dir
    }

    /// Returns the worker ID, if any.
    pub fn worker_id(&self) -> Option<&WorkerId> {
        self.worker_id.as_ref()
    }

    /// Returns the path to this worker's execution log.
    pub fn log_path(&self) -> Utf8PathBuf {
        path_for(&self.base_dir, self.worker_id.as_ref(), LOG_EXTENSION)
    }

    /// Returns the path to this worker's replay script for the given
    /// extension.
    pub fn script_path(&self, extension: &str) -> Utf8PathBuf {
        path_for(&self.base_dir, self.worker_id.as_ref(), extension)
    }
}

/// Lists every execution log in `base_dir`, sorted by file name.
///
/// Used to gather the logs of all workers of a distributed run.
pub fn discover_logs(base_dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, LogReadError> {
    let entries = base_dir
        .read_dir_utf8()
        .map_err(|error| LogReadError::Discover {
            dir: base_dir.to_owned(),
            error,
        })?;

    let mut logs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|error| {
            if error.kind() == io::ErrorKind::InvalidData {
                LogReadError::NonUtf8Path {
                    dir: base_dir.to_owned(),
                }
            } else {
                LogReadError::Discover {
                    dir: base_dir.to_owned(),
                    error,
                }
            }
        })?;
        if is_log_file_name(entry.file_name()) && entry.path().is_file() {
            logs.push(entry.into_path());
        }
    }

    logs.sort_unstable();
    Ok(logs)
}

fn is_log_file_name(file_name: &str) -> bool {
    let Some(stem) = file_name
        .strip_prefix(FILE_PREFIX)
        .and_then(|rest| rest.strip_suffix(LOG_EXTENSION))
        .and_then(|rest| rest.strip_suffix('.'))
    else {
        return false;
    };
    match stem.strip_prefix('-') {
        Some(worker) => WorkerId::new(worker).is_ok(),
        None => stem.is_empty(),
    }
}
