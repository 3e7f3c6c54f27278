//! Subscription maintenance.

use quillhouse_commerce::db::SubscriptionRepository;

use super::{CommandError, connect};

/// Mark subscriptions past their end date as expired.
///
/// Access checks already ignore ended subscriptions; this keeps the stored
/// status in line for reports and the back-office. Safe to run from cron.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the update fails.
pub async fn expire() -> Result<(), CommandError> {
    let pool = connect().await?;

    let expired = SubscriptionRepository::new(&pool).expire_stale().await?;

    tracing::info!(expired, "Expired ended subscriptions");
    Ok(())
}
