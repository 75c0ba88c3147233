// Copyright (c) The testreplay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::DialectParseError;
use serde::{Deserialize, Serialize};
use std::{borrow::Cow, fmt, str::FromStr};

/// The syntax rules of a target shell.
///
/// Implementations only know how to quote a single argument and how to
/// continue a command onto the next line; the order and selection of tests is
/// decided elsewhere.
pub trait ScriptDialect: fmt::Debug + Send + Sync {
    /// A short name for the dialect, used in status messages.
    fn name(&self) -> &'static str;

    /// The file extension for scripts in this dialect, without the leading dot.
    fn extension(&self) -> &'static str;

    /// The prefix of a comment line.
    fn comment_prefix(&self) -> &'static str;

    /// The token that forwards the script's own arguments to the command.
    fn args_passthrough(&self) -> &'static str;

    /// The token placed at the end of a line to continue the command on the
    /// next line.
    fn continuation(&self) -> &'static str;

    /// Quotes `arg` so that the shell passes it through verbatim as a single
    /// argument. Arguments are always quoted, even if they don't need it.
    ///
    /// Only meaningful if [`Self::find_unrepresentable`] returned `None` for
    /// `arg`.
    fn quote<'a>(&self, arg: &'a str) -> Cow<'a, str>;

    /// Returns the first character of `arg` that no quoting in this dialect
    /// can pass through verbatim, if any.
    fn find_unrepresentable(&self, arg: &str) -> Option<char> {
        // No shell can pass a NUL byte in an argument.
        arg.chars().find(|&ch| ch == '\0')
    }
}

/// POSIX `sh`-compatible shells.
///
/// Arguments are wrapped in single quotes, inside which nothing is special
/// except the single quote itself. An embedded `'` is written as `'\''`.
#[derive(Clone, Copy, Debug, Default)]
pub struct PosixShell;

impl ScriptDialect for PosixShell {
    fn name(&self) -> &'static str {
        "sh"
    }

    fn extension(&self) -> &'static str {
        "sh"
    }

    fn comment_prefix(&self) -> &'static str {
        "#"
    }

    fn args_passthrough(&self) -> &'static str {
        "$*"
    }

    fn continuation(&self) -> &'static str {
        "\\"
    }

    fn quote<'a>(&self, arg: &'a str) -> Cow<'a, str> {
        Cow::Owned(format!("'{}'", arg.replace('\'', r"'\''")))
    }
}

/// Windows `cmd.exe` batch files.
///
/// Arguments are wrapped in double quotes. An embedded `"` is doubled, and
/// `%` is doubled to prevent variable expansion in batch files. Inside double
/// quotes, `^`, `&`, `|`, `<` and `>` are literal.
///
/// `cmd.exe` ends a command at a line break even inside quotes, so
/// arguments containing `\n` or `\r` can't be represented.
#[derive(Clone, Copy, Debug, Default)]
pub struct WindowsBatch;

impl ScriptDialect for WindowsBatch {
    fn name(&self) -> &'static str {
        "bat"
    }

    fn extension(&self) -> &'static str {
        "bat"
    }

    fn comment_prefix(&self) -> &'static str {
        "REM"
    }

    fn args_passthrough(&self) -> &'static str {
        "%*"
    }

    fn continuation(&self) -> &'static str {
        "^"
    }

    fn quote<'a>(&self, arg: &'a str) -> Cow<'a, str> {
        Cow::Owned(format!(
            "\"{}\"",
            arg.replace('"', "\"\"").replace('%', "%%")
        ))
    }

    fn find_unrepresentable(&self, arg: &str) -> Option<char> {
        arg.chars().find(|&ch| matches!(ch, '\n' | '\r' | '\0'))
    }
}

/// The set of dialects that can be selected by name, in configuration or on
/// the command line.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
#[serde(rename_all = "kebab-case")]
pub enum DialectKind {
    /// POSIX shell (`.sh`).
    #[default]
    Sh,

    /// Windows batch file (`.bat`).
    Bat,
}

impl DialectKind {
    /// All selectable dialects.
    pub const ALL: [Self; 2] = [Self::Sh, Self::Bat];

    /// Returns the dialect implementation.
    pub fn dialect(self) -> &'static dyn ScriptDialect {
        match self {
            Self::Sh => &PosixShell,
            Self::Bat => &WindowsBatch,
        }
    }

    /// Returns the selector token for this dialect.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sh => "sh",
            Self::Bat => "bat",
        }
    }

    /// Returns the selector tokens for all dialects.
    pub fn variants() -> [&'static str; 2] {
        Self::ALL.map(Self::as_str)
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DialectKind {
    type Err = DialectParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| DialectParseError::new(s))
    }
}
