//! Subscription plans, subscriptions and the e-book library.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use quillhouse_core::{
    BookId, LibrarySource, Money, PlanId, SubscriptionId, SubscriptionStatus, UserId,
};

use super::marketing::default_true;

/// An e-book subscription plan.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub id: PlanId,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub duration_days: i32,
    pub active: bool,
}

/// Admin input for a plan.
#[derive(Debug, Clone, Deserialize)]
pub struct PlanInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub duration_days: i32,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// A customer's subscription.
#[derive(Debug, Clone, Serialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub plan_id: PlanId,
    pub plan_name: String,
    /// Charged for this subscription, fixed when checkout started.
    pub amount: Money,
    pub status: SubscriptionStatus,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub gateway_order_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    /// Whether the subscription grants access at `now`.
    #[must_use]
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active && self.ends_at.is_some_and(|end| now < end)
    }
}

/// A book in a user's e-book library.
#[derive(Debug, Clone, Serialize)]
pub struct LibraryEntry {
    pub book_id: BookId,
    pub title: String,
    pub author_name: String,
    pub cover_url: Option<String>,
    pub source: LibrarySource,
    pub granted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn subscription(status: SubscriptionStatus, ends_in_days: i64) -> Subscription {
        let now = Utc::now();
        Subscription {
            id: SubscriptionId::new(1),
            user_id: UserId::new(1),
            plan_id: PlanId::new(1),
            plan_name: "Monthly".to_owned(),
            amount: Money::inr(Decimal::from(199)),
            status,
            starts_at: Some(now - Duration::days(1)),
            ends_at: Some(now + Duration::days(ends_in_days)),
            gateway_order_id: None,
            created_at: now,
        }
    }

    #[test]
    fn test_is_current() {
        let now = Utc::now();
        assert!(subscription(SubscriptionStatus::Active, 10).is_current(now));
        assert!(!subscription(SubscriptionStatus::Active, -1).is_current(now));
        assert!(!subscription(SubscriptionStatus::Pending, 10).is_current(now));
    }

    #[test]
    fn test_amount_is_exposed() {
        let json = serde_json::to_value(subscription(SubscriptionStatus::Pending, 30)).unwrap();
        assert_eq!(json["plan_name"], "Monthly");
        assert!(json.get("amount").is_some());
    }
}
