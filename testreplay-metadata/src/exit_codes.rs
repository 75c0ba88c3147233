// Copyright (c) The testreplay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `testreplay` failures.
///
/// Recording never changes the exit code of the host test process. These
/// codes only apply to the `testreplay` command-line tool itself.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum ReplayExitCode {}

impl ReplayExitCode {
    /// No errors occurred and testreplay exited normally.
    pub const OK: i32 = 0;

    /// A user issue happened while setting up a testreplay invocation (bad
    /// configuration, unknown dialect, unwritable output directory).
    pub const SETUP_ERROR: i32 = 96;

    /// An execution log could not be read or parsed.
    pub const LOG_READ_FAILED: i32 = 104;

    /// A replay script could not be written.
    pub const SCRIPT_WRITE_FAILED: i32 = 105;

    /// Writing data to stdout or stderr produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}
