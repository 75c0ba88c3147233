// Copyright (c) The testreplay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Stable, documented values shared between testreplay and the tools that
//! drive it.

mod exit_codes;

pub use exit_codes::*;
