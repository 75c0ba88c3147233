// Copyright (c) The testreplay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identifiers for tests, their outcomes, and the workers that run them.

use crate::errors::{OutcomeKindParseError, WorkerIdParseError};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::{borrow::Borrow, fmt, str::FromStr};

/// A stable textual key naming one test invocation, for example
/// `tests/basic.rs::test_cwd` or `mod1::test_param[1-2]`.
///
/// The identity is opaque: it is compared by exact string equality and its
/// internal structure is never parsed or normalized.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestIdentity(SmolStr);

impl TestIdentity {
    /// Creates a new test identity.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(SmolStr::new(id))
    }

    /// Returns the identity as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for TestIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TestIdentity {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for TestIdentity {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for TestIdentity {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TestIdentity {
    fn from(id: String) -> Self {
        Self(SmolStr::from(id))
    }
}

/// The outcome of a single test, as reported by the host.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
#[serde(rename_all = "kebab-case")]
pub enum OutcomeKind {
    /// The test passed.
    Passed,

    /// The test ran to completion and failed.
    Failed,

    /// The test was skipped by the host.
    Skipped,

    /// The test errored out (for example, a fixture failed) rather than
    /// completing.
    Error,
}

impl OutcomeKind {
    /// Returns all known outcome kinds.
    pub const ALL: [Self; 4] = [Self::Passed, Self::Failed, Self::Skipped, Self::Error];

    /// Returns the token used for this outcome in logs and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::Error => "error",
        }
    }

    /// Returns the string representations of all known outcome kinds.
    pub fn variants() -> [&'static str; 4] {
        Self::ALL.map(Self::as_str)
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutcomeKind {
    type Err = OutcomeKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| OutcomeKindParseError::new(s))
    }
}

/// Identifies one worker process in a distributed run.
///
/// Worker IDs become part of file names, so they are restricted to lowercase
/// ASCII letters, digits, `-`, `_` and `.`, must be non-empty, and may not
/// begin with `.`. Two distinct worker IDs therefore always map to distinct
/// files, even on case-insensitive filesystems.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WorkerId(SmolStr);

impl WorkerId {
    /// Maximum length of a worker ID, in bytes.
    pub const MAX_LEN: usize = 64;

    /// Parses and validates a worker ID.
    pub fn new(id: &str) -> Result<Self, WorkerIdParseError> {
        if id.is_empty() {
            return Err(WorkerIdParseError::Empty);
        }
        if id.len() > Self::MAX_LEN {
            return Err(WorkerIdParseError::TooLong {
                input: id.to_owned(),
                max_len: Self::MAX_LEN,
            });
        }
        if id.starts_with('.') {
            return Err(WorkerIdParseError::LeadingDot {
                input: id.to_owned(),
            });
        }
        if id.chars().any(|ch| ch.is_ascii_uppercase()) {
            return Err(WorkerIdParseError::Uppercase {
                input: id.to_owned(),
            });
        }
        if let Some(ch) = id
            .chars()
            .find(|ch| !(ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.')))
        {
            return Err(WorkerIdParseError::InvalidChar {
                input: id.to_owned(),
                ch,
            });
        }

        Ok(Self(SmolStr::new(id)))
    }

    /// Returns the worker ID as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for WorkerId {
    type Err = WorkerIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for WorkerId {
    type Error = WorkerIdParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<WorkerId> for String {
    fn from(value: WorkerId) -> Self {
        value.0.into()
    }
}
