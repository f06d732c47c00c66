//! Startup provisioning (Imperative Shell).
//!
//! Makes sure the database, the todos table and its `createdAt` index exist
//! and the index is ready before the server accepts traffic. What to create
//! is decided by the pure planner in `todos_core::provision`; this module
//! probes the engine, runs the planned steps and does the final wait.

use thiserror::Error;

use todos_core::provision::{
    calculate_provision_plan, format_provision_plan, ProvisionOutcome, ProvisionState,
    ProvisionStep, ProvisionTarget,
};
use todos_core::storage::{Connection, Connector, StorageError};

use crate::storage::ConnectionLease;

/// Provisioning failures. Both are fatal at startup.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Could not open a connection to initialize the database: {0}")]
    Connect(#[source] StorageError),
    #[error("Index `{index}` on table `{table}` is not ready after provisioning: {source}")]
    IndexNotReady {
        table: String,
        index: String,
        #[source]
        source: StorageError,
    },
}

/// Ensures `target` exists and its index is ready.
///
/// Opens one dedicated connection and closes it before returning, whatever
/// the outcome.
pub async fn provision(
    connector: &dyn Connector,
    target: &ProvisionTarget,
) -> Result<ProvisionOutcome, ProvisionError> {
    let lease = ConnectionLease::acquire(connector)
        .await
        .map_err(ProvisionError::Connect)?;

    let result = run(lease.connection().as_ref(), target).await;

    lease.release().await;
    result
}

async fn run(
    conn: &dyn Connection,
    target: &ProvisionTarget,
) -> Result<ProvisionOutcome, ProvisionError> {
    if conn.wait_for_index(&target.table, &target.index).await.is_ok() {
        tracing::info!(
            database = %conn.database(),
            table = %target.table,
            index = %target.index,
            "Index already available"
        );
        return Ok(ProvisionOutcome::AlreadyReady);
    }

    let state = probe(conn, target).await;
    let plan = calculate_provision_plan(&state);
    for line in format_provision_plan(conn.database(), target, &plan) {
        tracing::info!("{line}");
    }

    let mut applied = Vec::new();
    let mut skipped = Vec::new();
    for step in plan {
        match execute_step(conn, target, step).await {
            Ok(()) => {
                tracing::debug!(step = %step, "Provisioning step applied");
                applied.push(step);
            }
            Err(e) if e.is_already_exists() => {
                tracing::warn!(step = %step, error = %e, "Already created by another process");
                skipped.push(step);
            }
            Err(e) => {
                tracing::warn!(step = %step, error = %e, "Provisioning step failed, continuing");
                skipped.push(step);
            }
        }
    }

    conn.wait_for_index(&target.table, &target.index)
        .await
        .map_err(|source| ProvisionError::IndexNotReady {
            table: target.table.clone(),
            index: target.index.clone(),
            source,
        })?;

    Ok(ProvisionOutcome::Provisioned { applied, skipped })
}

/// Probes each level. A failed probe counts as missing.
async fn probe(conn: &dyn Connection, target: &ProvisionTarget) -> ProvisionState {
    let database = conn.database_exists().await.unwrap_or(false);
    let table = database && conn.table_exists(&target.table).await.unwrap_or(false);
    let index = table
        && conn
            .index_exists(&target.table, &target.index)
            .await
            .unwrap_or(false);

    ProvisionState {
        database,
        table,
        index,
    }
}

async fn execute_step(
    conn: &dyn Connection,
    target: &ProvisionTarget,
    step: ProvisionStep,
) -> Result<(), StorageError> {
    match step {
        ProvisionStep::CreateDatabase => conn.create_database().await,
        ProvisionStep::CreateTable => conn.create_table(&target.table).await,
        ProvisionStep::CreateIndex => conn.create_index(&target.table, &target.index).await,
    }
}
