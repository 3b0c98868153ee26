use chrono::{DateTime, Utc};
use log::debug;
use sqlx::{sqlite::SqliteRow, FromRow, Row, SqliteConnection};
use storefront_common::Secret;

use super::decode_err;
use crate::db_types::{
    LedgerActor,
    NewWithdrawal,
    Withdrawal,
    WithdrawalActorType,
    WithdrawalDecision,
    WithdrawalStatus,
};

impl FromRow<'_, SqliteRow> for Withdrawal {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let actor_type: String = row.try_get("actor_type")?;
        let method: String = row.try_get("method")?;
        let status: String = row.try_get("status")?;
        let account_details: String = row.try_get("account_details")?;
        Ok(Self {
            id: row.try_get("id")?,
            actor_id: row.try_get("actor_id")?,
            actor_type: actor_type.parse().map_err(|e| decode_err("actor_type", e))?,
            amount: row.try_get("amount")?,
            method: method.parse().map_err(|e| decode_err("method", e))?,
            account_details: Secret::new(account_details),
            status: status.parse().map_err(|e| decode_err("status", e))?,
            request_date: row.try_get("request_date")?,
            processed_date: row.try_get("processed_date")?,
            processed_by: row.try_get("processed_by")?,
            rejection_reason: row.try_get("rejection_reason")?,
        })
    }
}

pub async fn insert_withdrawal(
    withdrawal: NewWithdrawal,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Withdrawal, sqlx::Error> {
    let inserted: Vec<Withdrawal> = sqlx::query_as(
        r#"
            INSERT INTO withdrawals (actor_id, actor_type, amount, method, account_details, request_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(withdrawal.actor_id)
    .bind(withdrawal.actor_type.to_string())
    .bind(withdrawal.amount)
    .bind(withdrawal.method.to_string())
    .bind(withdrawal.account_details.reveal())
    .bind(now)
    .fetch_all(conn)
    .await?;
    let withdrawal = inserted.into_iter().next().ok_or(sqlx::Error::RowNotFound)?;
    debug!(
        "🗃️ Withdrawal #{} of {} for {}:{} recorded as pending",
        withdrawal.id, withdrawal.amount, withdrawal.actor_type, withdrawal.actor_id
    );
    Ok(withdrawal)
}

pub async fn fetch_withdrawal(id: i64, conn: &mut SqliteConnection) -> Result<Option<Withdrawal>, sqlx::Error> {
    let withdrawal = sqlx::query_as("SELECT * FROM withdrawals WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(withdrawal)
}

pub async fn fetch_withdrawals_for_actor(
    actor: &LedgerActor,
    conn: &mut SqliteConnection,
) -> Result<Vec<Withdrawal>, sqlx::Error> {
    let (actor_type, actor_id) = match actor {
        LedgerActor::Vendor(id) => (WithdrawalActorType::Vendor, id),
        LedgerActor::Affiliate(id) => (WithdrawalActorType::Affiliate, id),
        LedgerActor::Platform => return Ok(Vec::new()),
    };
    let withdrawals =
        sqlx::query_as("SELECT * FROM withdrawals WHERE actor_type = $1 AND actor_id = $2 ORDER BY id ASC")
            .bind(actor_type.to_string())
            .bind(actor_id)
            .fetch_all(conn)
            .await?;
    Ok(withdrawals)
}

/// Compare-and-set resolution. Returns `None` unless the withdrawal exists and is still pending.
pub async fn resolve_pending(
    id: i64,
    decision: WithdrawalDecision,
    processed_by: &str,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Withdrawal>, sqlx::Error> {
    let (status, reason) = match decision {
        WithdrawalDecision::Approve => (WithdrawalStatus::Completed, None),
        WithdrawalDecision::Reject { reason } => (WithdrawalStatus::Rejected, Some(reason)),
    };
    let resolved: Vec<Withdrawal> = sqlx::query_as(
        r#"
            UPDATE withdrawals SET
                status = $1,
                processed_date = $2,
                processed_by = $3,
                rejection_reason = $4
            WHERE id = $5 AND status = 'pending'
            RETURNING *;
        "#,
    )
    .bind(status.to_string())
    .bind(now)
    .bind(processed_by)
    .bind(reason)
    .bind(id)
    .fetch_all(conn)
    .await?;
    Ok(resolved.into_iter().next())
}
