// Copyright (c) The testreplay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Replay scripts: shell scripts that re-run a recorded list of tests.
//!
//! A replay script consists of a header comment followed by a single
//! invocation of the test command, with one quoted test identity per
//! continuation line:
//!
//! ```text
//! # generated by testreplay
//! cargo test -- --exact $* \
//!   'mod1::foo' \
//!   'mod1::bar'
//! ```
//!
//! Quoting and line continuation are provided by a [`ScriptDialect`].

mod dialect;
mod materialize;

pub use dialect::{DialectKind, PosixShell, ScriptDialect, WindowsBatch};
pub use materialize::{GENERATOR_NAME, materialize, render_script};
