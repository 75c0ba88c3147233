// Copyright (c) The testreplay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resuming a previous, possibly crashed, run.
//!
//! Execution logs are read back in a new process and classified per test
//! identity. Tests that definitively finished form the *skip set*, which a
//! test selector can use as an exclusion filter. Tests that were started but
//! never reported an outcome are *incomplete*: the process most likely died
//! while running one of them, so they are always re-run.

use crate::{
    identity::{OutcomeKind, TestIdentity},
    log::{EventRecord, ExecutionLog},
};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt};

/// Returns the identities in `log` that have an outcome other than
/// [`OutcomeKind::Error`], in the order they were first started.
///
/// A start without a matching outcome means the test did not complete, so it
/// is not part of the skip set.
pub fn compute_skip_set(log: &ExecutionLog) -> IndexSet<TestIdentity> {
    ResumeState::from_logs(std::slice::from_ref(log), ResumePolicy::Completed)
        .skip()
        .cloned()
        .collect()
}

/// Which finished tests count as done when resuming.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
#[serde(rename_all = "kebab-case")]
pub enum ResumePolicy {
    /// Skip every test that ran to completion, whether it passed, failed or
    /// was skipped by the host.
    #[default]
    Completed,

    /// Skip only tests that passed or were skipped by the host. Failures are
    /// run again.
    Passed,
}

impl ResumePolicy {
    /// Returns true if a test that finished with `outcome` is done under this
    /// policy.
    pub fn is_done(self, outcome: OutcomeKind) -> bool {
        match (self, outcome) {
            (_, OutcomeKind::Error) => false,
            (_, OutcomeKind::Passed | OutcomeKind::Skipped) => true,
            (Self::Completed, OutcomeKind::Failed) => true,
            (Self::Passed, OutcomeKind::Failed) => false,
        }
    }
}

/// The resume classification of a single test.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResumeStatus {
    /// The test is done and can be skipped.
    Done(OutcomeKind),

    /// The test was started but no outcome was ever recorded.
    Incomplete,

    /// The test finished, but with an outcome that requires running it again.
    Rerun(OutcomeKind),
}

impl ResumeStatus {
    /// Returns true if the test should be run again.
    pub fn is_outstanding(self) -> bool {
        !matches!(self, Self::Done(_))
    }
}

impl fmt::Display for ResumeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done(outcome) => write!(f, "done ({outcome})"),
            Self::Incomplete => f.write_str("incomplete"),
            Self::Rerun(outcome) => write!(f, "rerun ({outcome})"),
        }
    }
}

#[derive(Default)]
struct Accum {
    done: Option<OutcomeKind>,
    incomplete: bool,
    last_outcome: Option<OutcomeKind>,
}

/// The merged resume classification of one or more execution logs.
///
/// Logs from several workers can be merged. A test with a start that never
/// saw an outcome, in any log, is incomplete. Otherwise it is done if it is
/// done in any log. Tests are kept in the order they were first started.
#[derive(Clone, Debug)]
pub struct ResumeState {
    policy: ResumePolicy,
    statuses: IndexMap<TestIdentity, ResumeStatus>,
}

impl ResumeState {
    /// Classifies every test started in `logs`.
    pub fn from_logs(logs: &[ExecutionLog], policy: ResumePolicy) -> Self {
        let mut accums: IndexMap<TestIdentity, Accum> = IndexMap::new();

        for log in logs {
            let mut pending: HashMap<&TestIdentity, usize> = HashMap::new();
            for record in log.records() {
                match record {
                    EventRecord::Start(test) => {
                        accums.entry(test.clone()).or_default();
                        *pending.entry(test).or_default() += 1;
                    }
                    EventRecord::Outcome(test, outcome) => {
                        if let Some(count) = pending.get_mut(test) {
                            *count -= 1;
                        }
                        let accum = accums.entry(test.clone()).or_default();
                        accum.last_outcome = Some(*outcome);
                        if accum.done.is_none() && policy.is_done(*outcome) {
                            accum.done = Some(*outcome);
                        }
                    }
                }
            }

            for (test, count) in pending {
                if count > 0
                    && let Some(accum) = accums.get_mut(test)
                {
                    accum.incomplete = true;
                }
            }
        }

        let statuses = accums
            .into_iter()
            .map(|(test, accum)| {
                // An open start anywhere wins over any earlier completion.
                let status = match (accum.incomplete, accum.done, accum.last_outcome) {
                    (true, _, _) | (false, None, None) => ResumeStatus::Incomplete,
                    (false, Some(outcome), _) => ResumeStatus::Done(outcome),
                    (false, None, Some(outcome)) => ResumeStatus::Rerun(outcome),
                };
                (test, status)
            })
            .collect();

        Self { policy, statuses }
    }

    /// Returns the policy used to classify tests.
    pub fn policy(&self) -> ResumePolicy {
        self.policy
    }

    /// Returns the status of `test`, or `None` if it was never started.
    pub fn status(&self, test: &TestIdentity) -> Option<ResumeStatus> {
        self.statuses.get(test).copied()
    }

    /// Returns true if `test` is done and should be excluded from the next
    /// run.
    pub fn should_skip(&self, test: &TestIdentity) -> bool {
        matches!(self.status(test), Some(ResumeStatus::Done(_)))
    }

    /// Iterates over all tests and their statuses, in first-start order.
    pub fn iter(&self) -> impl Iterator<Item = (&TestIdentity, ResumeStatus)> + '_ {
        self.statuses.iter().map(|(test, status)| (test, *status))
    }

    /// Returns the skip set: tests that are done.
    pub fn skip(&self) -> impl Iterator<Item = &TestIdentity> + '_ {
        self.iter()
            .filter_map(|(test, status)| (!status.is_outstanding()).then_some(test))
    }

    /// Returns tests that were started but never finished.
    pub fn incomplete(&self) -> impl Iterator<Item = &TestIdentity> + '_ {
        self.iter()
            .filter_map(|(test, status)| (status == ResumeStatus::Incomplete).then_some(test))
    }

    /// Returns tests that finished with an outcome that requires a rerun.
    pub fn rerun(&self) -> impl Iterator<Item = &TestIdentity> + '_ {
        self.iter().filter_map(|(test, status)| {
            matches!(status, ResumeStatus::Rerun(_)).then_some(test)
        })
    }

    /// Returns every test that must run again: incomplete tests and reruns,
    /// in first-start order.
    pub fn outstanding(&self) -> impl Iterator<Item = &TestIdentity> + '_ {
        self.iter()
            .filter_map(|(test, status)| status.is_outstanding().then_some(test))
    }

    /// Returns the number of distinct tests started across all logs.
    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    /// Returns true if no tests were started.
    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}
