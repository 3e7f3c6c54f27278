//! Coupons, affiliate links and hero banners.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use quillhouse_core::coupon::CouponRules;
use quillhouse_core::{AffiliateLinkId, AuthorId, BannerId, BookId, CouponId, DiscountKind};

/// A stored coupon.
#[derive(Debug, Clone, Serialize)]
pub struct Coupon {
    pub id: CouponId,
    pub description: String,
    /// Set when the coupon belongs to an author's affiliate link.
    pub affiliate_link_id: Option<AffiliateLinkId>,
    #[serde(flatten)]
    pub rules: CouponRules,
    pub created_at: DateTime<Utc>,
}

/// Admin input for creating or editing a coupon.
#[derive(Debug, Clone, Deserialize)]
pub struct CouponInput {
    pub code: String,
    #[serde(default)]
    pub description: String,
    pub kind: DiscountKind,
    pub value: Decimal,
    pub max_discount: Option<Decimal>,
    pub min_order_value: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub per_user_limit: Option<i32>,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub active: bool,
    pub affiliate_link_id: Option<AffiliateLinkId>,
}

impl CouponInput {
    /// Rules as they will be stored (usage count starts at zero).
    #[must_use]
    pub fn to_rules(&self, code: String) -> CouponRules {
        CouponRules {
            code,
            kind: self.kind,
            value: self.value,
            max_discount: self.max_discount,
            min_order_value: self.min_order_value,
            usage_limit: self.usage_limit,
            usage_count: 0,
            per_user_limit: self.per_user_limit,
            starts_at: self.starts_at,
            expires_at: self.expires_at,
            active: self.active,
        }
    }
}

/// An author's tracked referral link.
#[derive(Debug, Clone, Serialize)]
pub struct AffiliateLink {
    pub id: AffiliateLinkId,
    pub author_id: AuthorId,
    pub book_id: Option<BookId>,
    pub code: String,
    pub clicks: i64,
    /// Paid orders attributed to this code.
    pub orders: i64,
    pub created_at: DateTime<Utc>,
}

/// A storefront hero banner.
#[derive(Debug, Clone, Serialize)]
pub struct Banner {
    pub id: BannerId,
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: String,
    pub link_url: Option<String>,
    /// Lower positions are shown first.
    pub position: i32,
    pub active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

/// Admin input for a banner.
#[derive(Debug, Clone, Deserialize)]
pub struct BannerInput {
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: String,
    pub link_url: Option<String>,
    #[serde(default)]
    pub position: i32,
    #[serde(default = "default_true")]
    pub active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

pub(crate) const fn default_true() -> bool {
    true
}
