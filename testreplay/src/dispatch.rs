// Copyright (c) The testreplay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ExpectedError,
    errors::Result,
    output::{OutputContext, OutputOpts, OutputWriter, Styles, clap_styles},
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use owo_colors::OwoColorize;
use std::io::{self, Write};
use testreplay_metadata::ReplayExitCode;
use testreplay_runner::{
    config::DEFAULT_COMMAND,
    identity::{OutcomeKind, TestIdentity},
    log::{EventRecord, ExecutionLog},
    partition::discover_logs,
    resume::{ResumePolicy, ResumeState},
    script::{DialectKind, materialize},
};
use tracing::{debug, info, warn};

/// Inspect test execution logs and generate replay scripts.
///
/// Execution logs are written by a test host as each test starts and
/// finishes, and survive crashes of the test process. Arguments that accept a
/// directory read every execution log in it.
#[derive(Debug, Parser)]
#[command(version, styles = clap_styles::style())]
pub(crate) struct ReplayApp {
    #[clap(flatten)]
    output: OutputOpts,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Summarize execution logs
    ///
    /// For each log, prints the worker that wrote it, outcome counts, and the
    /// tests that were started but never finished. When a run crashed, the
    /// crash happened while one of those tests was running.
    Show {
        /// Execution logs, or directories containing them
        #[arg(required = true, value_name = "LOG|DIR")]
        paths: Vec<Utf8PathBuf>,
    },

    /// Print the tests that can be skipped when resuming a run
    ///
    /// Prints one test per line, merged across all logs. A test that finished
    /// in any log is skipped, unless a start of it never finished.
    SkipSet(SetOpts),

    /// Print the tests that must run again when resuming a run
    ///
    /// These are tests that never finished, plus tests whose outcome requires
    /// a rerun under the chosen policy, in the order they were first started.
    RerunSet(SetOpts),

    /// Write a replay script from an execution log
    ///
    /// Scripts are normally written when a test session finishes. After a
    /// crash, this produces one from the log the crashed process left behind.
    Script(ScriptOpts),
}

#[derive(Debug, Args)]
struct SetOpts {
    /// Which finished tests count as done
    #[arg(long, value_enum, default_value_t)]
    policy: ResumePolicy,

    /// Execution logs, or directories containing them
    #[arg(required = true, value_name = "LOG|DIR")]
    paths: Vec<Utf8PathBuf>,
}

#[derive(Debug, Args)]
struct ScriptOpts {
    /// Shell dialect of the script
    #[arg(long, value_enum, default_value_t, env = "TESTREPLAY_DIALECT")]
    dialect: DialectKind,

    /// Command the script invokes with the test list
    #[arg(long, default_value = DEFAULT_COMMAND, env = "TESTREPLAY_COMMAND")]
    command: String,

    /// Output path [default: the log's path with the dialect's extension]
    #[arg(long, short)]
    output: Option<Utf8PathBuf>,

    /// Leave out tests that finished in the log
    #[arg(long)]
    exclude_completed: bool,

    /// With --exclude-completed, which finished tests count as done
    #[arg(long, value_enum, default_value_t)]
    policy: ResumePolicy,

    /// The execution log
    #[arg(value_name = "LOG")]
    log: Utf8PathBuf,
}

impl Command {
    fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        match self {
            Self::Show { paths } => {
                let logs = read_logs(&paths)?;
                let styles = output.stdout_styles();
                let mut writer = output_writer.stdout_writer();
                for (i, log) in logs.iter().enumerate() {
                    if i > 0 {
                        writeln!(writer).map_err(ExpectedError::write_output_error)?;
                    }
                    write_summary(log, &styles, &mut writer)
                        .map_err(ExpectedError::write_output_error)?;
                }
                writer.flush().map_err(ExpectedError::write_output_error)?;
            }
            Self::SkipSet(opts) => {
                let state = ResumeState::from_logs(&read_logs(&opts.paths)?, opts.policy);
                write_identities(state.skip(), output_writer)?;
            }
            Self::RerunSet(opts) => {
                let state = ResumeState::from_logs(&read_logs(&opts.paths)?, opts.policy);
                write_identities(state.outstanding(), output_writer)?;
            }
            Self::Script(opts) => opts.exec()?,
        }
        Ok(ReplayExitCode::OK)
    }
}

impl ScriptOpts {
    fn exec(self) -> Result<()> {
        let log = ExecutionLog::read(&self.log).map_err(ExpectedError::log_read_failed)?;
        if log.has_torn_tail() {
            warn!(
                "execution log at {} ends with an incomplete record, which was ignored",
                log.path()
            );
        }

        let identities: Vec<TestIdentity> = if self.exclude_completed {
            let state = ResumeState::from_logs(std::slice::from_ref(&log), self.policy);
            log.started()
                .filter(|test| !state.should_skip(test))
                .cloned()
                .collect()
        } else {
            log.started().cloned().collect()
        };

        let dialect = self.dialect.dialect();
        let output = self
            .output
            .unwrap_or_else(|| log.path().with_extension(dialect.extension()));
        materialize(&identities, &output, &self.command, dialect)
            .map_err(ExpectedError::script_write_failed)?;

        info!(
            "wrote {} replay script for {} tests to {output}",
            dialect.name(),
            identities.len(),
        );
        Ok(())
    }
}

fn read_logs(paths: &[Utf8PathBuf]) -> Result<Vec<ExecutionLog>> {
    let mut logs = Vec::new();
    for path in paths {
        if path.is_dir() {
            let found = discover_logs(path).map_err(ExpectedError::log_read_failed)?;
            debug!("found {} execution logs in {path}", found.len());
            for log_path in found {
                logs.push(read_log(&log_path)?);
            }
        } else {
            logs.push(read_log(path)?);
        }
    }

    if logs.is_empty() {
        return Err(ExpectedError::NoLogsFound {
            paths: paths.to_vec(),
        });
    }
    Ok(logs)
}

fn read_log(path: &Utf8Path) -> Result<ExecutionLog> {
    ExecutionLog::read(path).map_err(ExpectedError::log_read_failed)
}

fn write_identities<'a>(
    identities: impl Iterator<Item = &'a TestIdentity>,
    output_writer: &mut OutputWriter,
) -> Result<()> {
    let mut writer = output_writer.stdout_writer();
    for test in identities {
        writeln!(writer, "{test}").map_err(ExpectedError::write_output_error)?;
    }
    writer.flush().map_err(ExpectedError::write_output_error)
}

fn write_summary(log: &ExecutionLog, styles: &Styles, writer: &mut dyn Write) -> io::Result<()> {
    let header = log.header();
    writeln!(writer, "{}", log.path().style(styles.bold))?;
    match &header.worker_id {
        Some(worker_id) => writeln!(writer, "  worker:     {worker_id}")?,
        None => writeln!(writer, "  worker:     (single process)")?,
    }
    writeln!(writer, "  started at: {}", header.started_at.to_rfc3339())?;

    let mut counts = [0_usize; OutcomeKind::ALL.len()];
    let mut starts = 0;
    for record in log.records() {
        match record {
            EventRecord::Start(_) => starts += 1,
            EventRecord::Outcome(_, outcome) => {
                if let Some(i) = OutcomeKind::ALL.iter().position(|kind| kind == outcome) {
                    counts[i] += 1;
                }
            }
        }
    }
    writeln!(writer, "  starts:     {}", starts.style(styles.count))?;

    let outcomes: Vec<_> = OutcomeKind::ALL
        .iter()
        .zip(counts)
        .map(|(kind, count)| format!("{} {kind}", count.style(styles.count)))
        .collect();
    writeln!(writer, "  outcomes:   {}", outcomes.join(", "))?;

    let state = ResumeState::from_logs(std::slice::from_ref(log), ResumePolicy::Completed);
    let incomplete: Vec<_> = state.incomplete().collect();
    writeln!(
        writer,
        "  incomplete: {}",
        incomplete.len().style(styles.count)
    )?;
    for test in incomplete {
        writeln!(writer, "    {}", test.style(styles.warning_text))?;
    }

    if log.has_torn_tail() {
        writeln!(
            writer,
            "  {}",
            "note: the final record was cut off mid-write and ignored".style(styles.warning_text)
        )?;
    }
    Ok(())
}

/// Main entry point for the `testreplay` binary. Both the binary and the
/// integration test duplicate use this.
pub fn main_impl() -> ! {
    let app = ReplayApp::parse();
    let output = app.output.init();

    match app.command.exec(output, &mut OutputWriter::default()) {
        Ok(code) => std::process::exit(code),
        Err(error) => {
            error.display_to_stderr(&output.stderr_styles());
            std::process::exit(error.process_exit_code())
        }
    }
}
