// Copyright (c) The testreplay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A duplicate of testreplay's main.rs, so that integration tests can run the
//! CLI without rebuilding the binary under test while it is in use.

use color_eyre::Result;

fn main() -> Result<()> {
    color_eyre::install()?;
    let _ = enable_ansi_support::enable_ansi_support();

    testreplay::main_impl()
}
