// Copyright (c) The testreplay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command-line front end for testreplay.
//!
//! The `testreplay` binary inspects the execution logs written during a test
//! run, computes which tests can be skipped when resuming a crashed run, and
//! turns a persisted log into a replay script.
//!
//! This crate is not meant to be used as a library; its API is unstable.

mod dispatch;
mod errors;
mod output;

#[doc(hidden)]
pub use dispatch::main_impl;
#[doc(hidden)]
pub use errors::ExpectedError;
