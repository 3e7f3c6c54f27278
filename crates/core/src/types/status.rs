//! Status and kind enums for the store's entities.
//!
//! Every enum here is stored as `TEXT` (see [`crate::pg_text_enum`]) and
//! serialized in `snake_case`, so the database, JSON and query-string forms
//! are identical.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when parsing an unknown enum value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    /// Name of the enum being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            /// All variants, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The stored/serialized form.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $text, )+
                }
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $text => Ok(Self::$variant), )+
                    _ => Err(ParseEnumError {
                        kind: $kind,
                        value: s.to_owned(),
                    }),
                }
            }
        }

        $crate::pg_text_enum!($name);
    };
}

text_enum! {
    /// Account role. Authors are customers with a publishing profile; admins
    /// can use the back-office.
    UserRole, "user role" {
        Customer => "customer",
        Author => "author",
        Admin => "admin",
    }
}

impl UserRole {
    /// Whether this role may use the author portal.
    #[must_use]
    pub const fn can_publish(self) -> bool {
        matches!(self, Self::Author | Self::Admin)
    }
}

text_enum! {
    /// Editorial state of a book.
    BookStatus, "book status" {
        /// Author is still editing; not visible to customers.
        Draft => "draft",
        /// Submitted by the author, waiting for an admin.
        PendingReview => "pending_review",
        /// Visible in the catalog.
        Published => "published",
        /// Sent back to the author with a reason.
        Rejected => "rejected",
        /// Withdrawn from sale.
        Archived => "archived",
    }
}

impl BookStatus {
    /// Whether the author may still edit the book's details.
    #[must_use]
    pub const fn is_editable_by_author(self) -> bool {
        matches!(self, Self::Draft | Self::Rejected)
    }

    /// Whether the editorial workflow allows moving to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Draft | Self::Rejected, Self::PendingReview)
                | (Self::PendingReview, Self::Published | Self::Rejected)
                | (Self::Published, Self::Archived)
                | (Self::Archived, Self::Published)
        )
    }
}

text_enum! {
    /// How a book is sold.
    BookFormat, "book format" {
        Print => "print",
        Ebook => "ebook",
    }
}

impl BookFormat {
    /// Whether the format needs physical shipping and stock.
    #[must_use]
    pub const fn is_physical(self) -> bool {
        matches!(self, Self::Print)
    }
}

text_enum! {
    /// Order lifecycle. Transitions live in [`crate::order_flow`].
    OrderStatus, "order status" {
        PendingPayment => "pending_payment",
        Placed => "placed",
        Processing => "processing",
        Shipped => "shipped",
        Delivered => "delivered",
        Cancelled => "cancelled",
        Refunded => "refunded",
    }
}

text_enum! {
    /// Payment state of an order or subscription.
    PaymentStatus, "payment status" {
        Pending => "pending",
        Paid => "paid",
        Failed => "failed",
        PartiallyRefunded => "partially_refunded",
        Refunded => "refunded",
    }
}

text_enum! {
    /// Ledger entry kind.
    TransactionKind, "transaction kind" {
        Payment => "payment",
        Refund => "refund",
    }
}

text_enum! {
    /// Gateway-side state of a ledger entry.
    TransactionStatus, "transaction status" {
        Created => "created",
        Captured => "captured",
        Pending => "pending",
        Processed => "processed",
        Failed => "failed",
    }
}

text_enum! {
    /// E-book subscription state.
    SubscriptionStatus, "subscription status" {
        Pending => "pending",
        Active => "active",
        Cancelled => "cancelled",
        Expired => "expired",
    }
}

text_enum! {
    /// Job application review state.
    ApplicationStatus, "application status" {
        Received => "received",
        Reviewing => "reviewing",
        Rejected => "rejected",
        Hired => "hired",
    }
}

text_enum! {
    /// Why a user can read an e-book.
    LibrarySource, "library source" {
        Purchase => "purchase",
        Subscription => "subscription",
    }
}

text_enum! {
    /// How a coupon's value is applied.
    DiscountKind, "discount kind" {
        /// `value` is a percentage of the subtotal.
        Percentage => "percentage",
        /// `value` is a fixed amount off.
        Fixed => "fixed",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_all_order_statuses() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), *status);
        }
    }

    #[test]
    fn test_parse_unknown_value() {
        let err = "lost".parse::<OrderStatus>().unwrap_err();
        assert_eq!(err.to_string(), "invalid order status: lost");
    }

    #[test]
    fn test_serde_matches_stored_form() {
        let json = serde_json::to_string(&BookStatus::PendingReview).unwrap();
        assert_eq!(json, "\"pending_review\"");
        assert_eq!(PaymentStatus::PartiallyRefunded.to_string(), "partially_refunded");
    }

    #[test]
    fn test_book_workflow() {
        assert!(BookStatus::Draft.can_transition_to(BookStatus::PendingReview));
        assert!(BookStatus::Rejected.can_transition_to(BookStatus::PendingReview));
        assert!(BookStatus::PendingReview.can_transition_to(BookStatus::Published));
        assert!(!BookStatus::Draft.can_transition_to(BookStatus::Published));
        assert!(!BookStatus::Published.can_transition_to(BookStatus::Draft));
        assert!(BookStatus::Rejected.is_editable_by_author());
        assert!(!BookStatus::Published.is_editable_by_author());
    }

    #[test]
    fn test_roles() {
        assert!(UserRole::Author.can_publish());
        assert!(!UserRole::Customer.can_publish());
    }
}
