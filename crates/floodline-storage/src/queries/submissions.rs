// SPDX-FileCopyrightText: 2026 Floodline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Submission operations: upsert, lookup, listing, and lease-guarded transitions.
//!
//! Every transition after a delivery attempt is conditional on `lease_owner`,
//! so an outcome reported by a flush that lost its lease is dropped instead of
//! clobbering a newer write.

use std::str::FromStr;
use std::time::Duration;

use floodline_core::{FailureOutcome, FloodlineError};
use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Database, map_tr_err};
use crate::models::{QueueCounts, SosSubmission, SubmissionStatus};

const SELECT_COLUMNS: &str =
    "SELECT id, payload, status, attempt_count, last_error, created_at, updated_at
     FROM sos_submissions";

/// Outcome of a manual transition that only applies to failed entries.
enum ManualTransition {
    Applied,
    Missing,
    WrongState(String),
}

fn row_to_submission(row: &Row<'_>) -> Result<SosSubmission, rusqlite::Error> {
    let status: String = row.get(2)?;
    let status = SubmissionStatus::from_str(&status).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(SosSubmission {
        id: row.get(0)?,
        payload: row.get(1)?,
        status,
        attempt_count: row.get(3)?,
        last_error: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

/// SQLite datetime modifier for a lease of the given length.
fn lease_modifier(lease: Duration) -> String {
    format!("+{:.3} seconds", lease.as_secs_f64())
}

/// Insert a submission or overwrite the one with the same id.
///
/// An overwrite keeps the original `created_at` (and therefore its position in
/// the delivery order) and drops any lease held on the old version.
pub async fn put(db: &Database, submission: &SosSubmission) -> Result<(), FloodlineError> {
    let s = submission.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO sos_submissions
                     (id, payload, status, attempt_count, last_error, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                     payload = excluded.payload,
                     status = excluded.status,
                     attempt_count = excluded.attempt_count,
                     last_error = excluded.last_error,
                     updated_at = excluded.updated_at,
                     lease_owner = NULL,
                     lease_expires_at = NULL",
                params![
                    s.id,
                    s.payload,
                    s.status.to_string(),
                    s.attempt_count,
                    s.last_error,
                    s.created_at,
                    s.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a submission by id.
pub async fn get(db: &Database, id: &str) -> Result<Option<SosSubmission>, FloodlineError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                params![id],
                row_to_submission,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// List submissions in `status`, ordered by creation time then insertion order.
pub async fn list(
    db: &Database,
    status: SubmissionStatus,
) -> Result<Vec<SosSubmission>, FloodlineError> {
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "{SELECT_COLUMNS} WHERE status = ?1 ORDER BY created_at ASC, rowid ASC"
            ))?;
            let rows = stmt.query_map(params![status], row_to_submission)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Count submissions per status.
pub async fn counts(db: &Database) -> Result<QueueCounts, FloodlineError> {
    db.connection()
        .call(|conn| {
            conn.query_row(
                "SELECT
                     COALESCE(SUM(status = 'pending'), 0),
                     COALESCE(SUM(status = 'failed'), 0)
                 FROM sos_submissions",
                [],
                |row| {
                    let pending: i64 = row.get(0)?;
                    let failed: i64 = row.get(1)?;
                    Ok(QueueCounts {
                        pending: pending as usize,
                        failed: failed as usize,
                    })
                },
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Take the delivery lease on a pending entry.
///
/// Succeeds only if the entry is pending and unleased, or its lease expired.
pub async fn claim(
    db: &Database,
    id: &str,
    owner: &str,
    lease: Duration,
) -> Result<bool, FloodlineError> {
    let id = id.to_string();
    let owner = owner.to_string();
    let modifier = lease_modifier(lease);
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE sos_submissions
                 SET lease_owner = ?2,
                     lease_expires_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?3)
                 WHERE id = ?1
                   AND status = 'pending'
                   AND (lease_owner IS NULL
                        OR lease_expires_at <= strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
                params![id, owner, modifier],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Drop every delivery lease, returning how many entries were held.
///
/// Only valid while no flush is running against this file: leases left behind
/// by a process that died mid-flush belong to nobody after a restart.
pub async fn release_leases(db: &Database) -> Result<usize, FloodlineError> {
    db.connection()
        .call(|conn| {
            conn.execute(
                "UPDATE sos_submissions
                 SET lease_owner = NULL, lease_expires_at = NULL
                 WHERE lease_owner IS NOT NULL",
                [],
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Delete an acknowledged entry if `owner` still holds its lease.
pub async fn complete(db: &Database, id: &str, owner: &str) -> Result<bool, FloodlineError> {
    let id = id.to_string();
    let owner = owner.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "DELETE FROM sos_submissions WHERE id = ?1 AND lease_owner = ?2",
                params![id, owner],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Count a failed attempt and release the lease.
///
/// With `max_attempts = Some(n)` the entry becomes failed once its count reaches `n`.
pub async fn record_failure(
    db: &Database,
    id: &str,
    owner: &str,
    error: &str,
    max_attempts: Option<u32>,
) -> Result<FailureOutcome, FloodlineError> {
    let id = id.to_string();
    let owner = owner.to_string();
    let error = error.to_string();
    db.connection()
        .call(move |conn| {
            let updated: Option<(u32, String)> = conn
                .query_row(
                    "UPDATE sos_submissions
                     SET attempt_count = attempt_count + 1,
                         last_error = ?3,
                         status = CASE
                             WHEN ?4 IS NOT NULL AND attempt_count + 1 >= ?4 THEN 'failed'
                             ELSE 'pending'
                         END,
                         lease_owner = NULL,
                         lease_expires_at = NULL,
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?1 AND lease_owner = ?2 AND status = 'pending'
                     RETURNING attempt_count, status",
                    params![id, owner, error, max_attempts],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            Ok(match updated {
                None => FailureOutcome::LeaseLost,
                Some((attempt_count, status)) if status == "failed" => {
                    FailureOutcome::Exhausted { attempt_count }
                }
                Some((attempt_count, _)) => FailureOutcome::Retrying { attempt_count },
            })
        })
        .await
        .map_err(map_tr_err)
}

/// Count the attempt and mark the entry permanently failed.
pub async fn mark_failed(
    db: &Database,
    id: &str,
    owner: &str,
    error: &str,
) -> Result<bool, FloodlineError> {
    let id = id.to_string();
    let owner = owner.to_string();
    let error = error.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE sos_submissions
                 SET status = 'failed',
                     attempt_count = attempt_count + 1,
                     last_error = ?3,
                     lease_owner = NULL,
                     lease_expires_at = NULL,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND lease_owner = ?2 AND status = 'pending'",
                params![id, owner, error],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Move a failed entry back to pending with its attempt count reset.
pub async fn requeue(db: &Database, id: &str) -> Result<(), FloodlineError> {
    manual_transition(
        db,
        id,
        "UPDATE sos_submissions
         SET status = 'pending',
             attempt_count = 0,
             lease_owner = NULL,
             lease_expires_at = NULL,
             updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
         WHERE id = ?1 AND status = 'failed'",
    )
    .await
}

/// Delete a failed entry.
pub async fn discard(db: &Database, id: &str) -> Result<(), FloodlineError> {
    manual_transition(
        db,
        id,
        "DELETE FROM sos_submissions WHERE id = ?1 AND status = 'failed'",
    )
    .await
}

/// Apply `sql` to a failed entry, reporting why nothing changed otherwise.
async fn manual_transition(
    db: &Database,
    id: &str,
    sql: &'static str,
) -> Result<(), FloodlineError> {
    let key = id.to_string();
    let outcome = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let outcome = if tx.execute(sql, params![key])? == 1 {
                ManualTransition::Applied
            } else {
                let status: Option<String> = tx
                    .query_row(
                        "SELECT status FROM sos_submissions WHERE id = ?1",
                        params![key],
                        |row| row.get(0),
                    )
                    .optional()?;
                match status {
                    None => ManualTransition::Missing,
                    Some(status) => ManualTransition::WrongState(status),
                }
            };
            tx.commit()?;
            Ok(outcome)
        })
        .await
        .map_err(map_tr_err)?;

    match outcome {
        ManualTransition::Applied => Ok(()),
        ManualTransition::Missing => Err(FloodlineError::NotFound { id: id.to_string() }),
        ManualTransition::WrongState(status) => Err(FloodlineError::InvalidState {
            id: id.to_string(),
            message: format!("is {status}, expected failed"),
        }),
    }
}
