// Copyright (c) The testreplay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for testreplay.
//!
//! testreplay records, as each test starts and finishes, a durable log of the
//! tests a test-suite run executed. Every record is forced to stable storage
//! before the call that wrote it returns, so the log survives abrupt process
//! termination (segfaults, `SIGKILL`, the OOM killer) that skips all cleanup.
//!
//! From that record testreplay can:
//!
//! - write a replay script that re-runs exactly the tests that were started,
//!   in their original order (see [`script`]).
//! - compute the set of tests that definitively finished, so that a crashed
//!   run can be resumed without re-running them (see [`resume`]).
//!
//! Hosts drive recording through the [`session::SessionHooks`] interface.

pub mod config;
pub mod errors;
pub mod identity;
pub mod log;
pub mod partition;
pub mod resume;
pub mod script;
pub mod session;
