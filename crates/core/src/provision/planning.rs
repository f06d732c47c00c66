//! Pure functions for calculating provisioning plans (Functional Core).

use std::fmt;

use crate::storage::{CREATED_AT_INDEX, TODOS_TABLE};

/// The structures the service needs before it can accept traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionTarget {
    pub table: String,
    pub index: String,
}

impl Default for ProvisionTarget {
    fn default() -> Self {
        Self {
            table: TODOS_TABLE.to_string(),
            index: CREATED_AT_INDEX.to_string(),
        }
    }
}

/// What a probe of the storage engine found.
///
/// A probe that failed counts as "missing": the matching creation step is
/// then attempted and its own failure is reported instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProvisionState {
    pub database: bool,
    pub table: bool,
    pub index: bool,
}

impl ProvisionState {
    pub fn is_complete(&self) -> bool {
        self.database && self.table && self.index
    }
}

/// One creation step. Steps always run in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProvisionStep {
    CreateDatabase,
    CreateTable,
    CreateIndex,
}

impl fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvisionStep::CreateDatabase => write!(f, "create database"),
            ProvisionStep::CreateTable => write!(f, "create table"),
            ProvisionStep::CreateIndex => write!(f, "create index"),
        }
    }
}

/// How a provisioning run converged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// The first index probe succeeded; nothing was created.
    AlreadyReady,
    /// The creation sequence ran and the index is now ready.
    Provisioned {
        /// Steps that completed.
        applied: Vec<ProvisionStep>,
        /// Steps that failed without preventing convergence.
        skipped: Vec<ProvisionStep>,
    },
}

/// Pure function: Calculate which creation steps are needed.
///
/// A missing database implies a missing table, and a missing table implies a
/// missing index, whatever the probe reported for the inner levels.
pub fn calculate_provision_plan(state: &ProvisionState) -> Vec<ProvisionStep> {
    let mut steps = Vec::new();

    if !state.database {
        steps.push(ProvisionStep::CreateDatabase);
    }
    if !state.database || !state.table {
        steps.push(ProvisionStep::CreateTable);
    }
    if !state.database || !state.table || !state.index {
        steps.push(ProvisionStep::CreateIndex);
    }

    steps
}

/// Pure function: Format a provisioning plan for display.
pub fn format_provision_plan(
    database: &str,
    target: &ProvisionTarget,
    steps: &[ProvisionStep],
) -> Vec<String> {
    if steps.is_empty() {
        return vec![format!(
            "= {database}.{}[{}] is up to date",
            target.table, target.index
        )];
    }

    steps
        .iter()
        .map(|step| match step {
            ProvisionStep::CreateDatabase => format!("+ Create database: {database}"),
            ProvisionStep::CreateTable => format!("+ Create table: {database}.{}", target.table),
            ProvisionStep::CreateIndex => {
                format!("+ Create index: {}[{}]", target.table, target.index)
            }
        })
        .collect()
}
