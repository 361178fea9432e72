//! Ledger engine: every path that moves a pending also moves the group's
//! `base_money` aggregate through the store's atomic adjustment, so the
//! aggregate stays equal to the signed sum of the group's pendings.

use crate::constants::MAX_MONEY;
use crate::core::errors::TallyError;
use crate::core::models::Pending;
use crate::infrastructure::storage::Storage;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use tracing::{error, warn};
use uuid::Uuid;

/// Parses a transaction date: RFC 3339 first, then bare `YYYY-MM-DD`
/// (midnight UTC). Anything else is rejected before any read or write.
pub fn parse_date(raw: &str) -> Result<DateTime<Utc>, TallyError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Ok(date.and_time(NaiveTime::MIN).and_utc()),
        Err(_) => Err(TallyError::InvalidDate(raw.to_string())),
    }
}

/// Signed amounts are allowed; only the magnitude is bounded.
pub fn validate_money(money: Decimal) -> Result<(), TallyError> {
    if money.abs() > Decimal::from(MAX_MONEY) {
        return Err(TallyError::InvalidMoney);
    }
    Ok(())
}

/// Calendar-month filter bounds for the pending listing.
pub fn validate_period(month: u32, year: i32) -> Result<(), TallyError> {
    if !(1..=12).contains(&month) || !(1970..=9999).contains(&year) {
        return Err(TallyError::InvalidPeriod { month, year });
    }
    Ok(())
}

/// Inserts the pending and credits its amount to the group aggregate.
pub async fn apply_create<S: Storage>(
    storage: &S,
    pending: Pending,
) -> Result<Pending, TallyError> {
    let stored = storage.create_pending(pending).await?;
    if let Err(err) = storage.adjust_group_balance(stored.group_id, stored.money).await {
        error!(
            group_id = %stored.group_id,
            pending_id = %stored.id,
            delta = %stored.money,
            %err,
            "balance adjustment failed after pending insert"
        );
        return Err(TallyError::LedgerInconsistency(format!(
            "pending {} inserted but group {} balance not adjusted",
            stored.id, stored.group_id
        )));
    }
    Ok(stored)
}

/// Replaces the stored pending and applies `new - old` to the aggregate.
/// The delta is derived from the record the store actually replaced, so
/// interleaved updates each contribute exactly their own difference.
/// Returns the previous record.
pub async fn apply_update<S: Storage>(
    storage: &S,
    updated: Pending,
) -> Result<Pending, TallyError> {
    let new_money = updated.money;
    let previous = storage.update_pending(updated).await?;
    let delta = new_money - previous.money;
    if delta != Decimal::ZERO {
        if let Err(err) = storage.adjust_group_balance(previous.group_id, delta).await {
            error!(
                group_id = %previous.group_id,
                pending_id = %previous.id,
                %delta,
                %err,
                "balance adjustment failed after pending update"
            );
            return Err(TallyError::LedgerInconsistency(format!(
                "pending {} updated but group {} balance not adjusted",
                previous.id, previous.group_id
            )));
        }
    }
    Ok(previous)
}

/// Removes the pending and debits its amount from the aggregate. The store
/// hands back the removed record exactly once, so a concurrent double
/// delete cannot subtract the amount twice.
pub async fn apply_delete<S: Storage>(
    storage: &S,
    pending_id: Uuid,
) -> Result<Pending, TallyError> {
    let removed = storage.delete_pending(pending_id).await?;
    if let Err(err) = storage.adjust_group_balance(removed.group_id, -removed.money).await {
        error!(
            group_id = %removed.group_id,
            pending_id = %removed.id,
            delta = %-removed.money,
            %err,
            "balance adjustment failed after pending delete"
        );
        return Err(TallyError::LedgerInconsistency(format!(
            "pending {} deleted but group {} balance not adjusted",
            removed.id, removed.group_id
        )));
    }
    Ok(removed)
}

/// Recomputes the signed sum over the group's pendings and rewrites the
/// aggregate to it. Returns `(stored, recomputed)`; drift is logged.
pub async fn reconcile<S: Storage>(
    storage: &S,
    group_id: Uuid,
) -> Result<(Decimal, Decimal), TallyError> {
    let group = storage
        .get_group(group_id)
        .await?
        .ok_or_else(|| TallyError::GroupNotFound(group_id.to_string()))?;
    let pendings = storage.get_group_pendings(group_id).await?;
    let recomputed = pendings
        .iter()
        .fold(Decimal::ZERO, |acc, pending| acc + pending.money);
    if recomputed != group.base_money {
        warn!(
            group_id = %group_id,
            stored = %group.base_money,
            %recomputed,
            "group balance drifted from pending sum"
        );
    }
    storage.set_group_balance(group_id, recomputed).await?;
    Ok((group.base_money, recomputed))
}
