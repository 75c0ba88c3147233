// Copyright (c) The testreplay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The execution log: a crash-durable, append-only record of test events.
//!
//! # Format
//!
//! An execution log is a JSON Lines file. The first line is a
//! [`LogHeader`]; every following line is one [`EventRecord`], in the order
//! the events occurred:
//!
//! ```text
//! {"type":"header","format-version":1,"worker-id":"gw0","started-at":"2026-10-17T09:30:00+00:00"}
//! {"type":"start","test":"mod1::foo"}
//! {"type":"outcome","test":"mod1::foo","outcome":"passed"}
//! {"type":"start","test":"mod1::bar"}
//! ```
//!
//! Each line is forced to stable storage before the call that wrote it
//! returns. A log that ends with a `start` record and no matching `outcome`
//! is what a test that crashed the process looks like.

mod format;
mod reader;
mod writer;

pub use format::{EventRecord, LOG_FORMAT_VERSION, LogHeader};
pub use reader::ExecutionLog;
pub use writer::LogWriter;
