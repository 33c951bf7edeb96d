//! Per-row outcomes and the run report.

use crate::store::StoreError;
use serde::Serialize;
use serde_json::{Value, json};
use std::fmt;
use uuid::Uuid;

/// The two provider calls that activate an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationStep {
    /// Account creation with the bootstrap password.
    Create,
    /// Permanent password commit.
    SetPassword,
}

impl fmt::Display for ActivationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivationStep::Create => f.write_str("create"),
            ActivationStep::SetPassword => f.write_str("set-password"),
        }
    }
}

/// What happened to one input row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RowOutcome {
    /// The email already counts as present; no call was made.
    Skipped {
        /// Usernames of the existing accounts that matched.
        matched: Vec<String>,
    },
    /// Created and activated with the row's password.
    Created,
    /// Dry run: would have been created.
    WouldCreate,
    /// A provider call failed. After a `SetPassword` failure the account exists
    /// but still carries the bootstrap password.
    Failed {
        step: ActivationStep,
        kind: String,
        message: String,
    },
}

impl RowOutcome {
    /// Outcome for a provider call that failed at `step`.
    pub fn failed(step: ActivationStep, error: &StoreError) -> Self {
        RowOutcome::Failed {
            step,
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, RowOutcome::Failed { .. })
    }
}

/// Outcome of one row, keyed by its 1-based position in the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowReport {
    pub row: usize,
    pub email: String,
    #[serde(flatten)]
    pub outcome: RowOutcome,
}

/// Everything a run did, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionReport {
    pub run_id: Uuid,
    pub pool_id: String,
    /// Size of the directory snapshot taken before any mutation.
    pub existing_users: usize,
    pub dry_run: bool,
    pub rows: Vec<RowReport>,
}

impl ProvisionReport {
    pub fn new(
        run_id: Uuid,
        pool_id: impl Into<String>,
        existing_users: usize,
        dry_run: bool,
    ) -> Self {
        Self {
            run_id,
            pool_id: pool_id.into(),
            existing_users,
            dry_run,
            rows: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, row: usize, email: &str, outcome: RowOutcome) {
        self.rows.push(RowReport {
            row,
            email: email.to_string(),
            outcome,
        });
    }

    fn count(&self, predicate: impl Fn(&RowOutcome) -> bool) -> usize {
        self.rows.iter().filter(|r| predicate(&r.outcome)).count()
    }

    pub fn created(&self) -> usize {
        self.count(|o| matches!(o, RowOutcome::Created))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, RowOutcome::Skipped { .. }))
    }

    pub fn would_create(&self) -> usize {
        self.count(|o| matches!(o, RowOutcome::WouldCreate))
    }

    pub fn failed(&self) -> usize {
        self.count(RowOutcome::is_failure)
    }

    /// Rows that failed, in input order.
    pub fn failures(&self) -> impl Iterator<Item = &RowReport> {
        self.rows.iter().filter(|r| r.outcome.is_failure())
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// One-line human summary.
    pub fn summary(&self) -> String {
        if self.dry_run {
            format!(
                "Dry run: {} would be created, {} skipped ({} rows)",
                self.would_create(),
                self.skipped(),
                self.rows.len()
            )
        } else {
            format!(
                "{} created, {} skipped, {} failed ({} rows)",
                self.created(),
                self.skipped(),
                self.failed(),
                self.rows.len()
            )
        }
    }

    /// Report plus counts, for machine consumption.
    pub fn to_json(&self) -> Value {
        json!({
            "run_id": self.run_id,
            "pool_id": self.pool_id,
            "existing_users": self.existing_users,
            "dry_run": self.dry_run,
            "created": self.created(),
            "skipped": self.skipped(),
            "would_create": self.would_create(),
            "failed": self.failed(),
            "rows": self.rows,
        })
    }
}
