//! Domain types loaded and stored by the repositories.
//!
//! These are validated domain objects, separate from the `FromRow` row types
//! that live next to each query.

pub mod catalog;
pub mod content;
pub mod marketing;
pub mod order;
pub mod subscription;
pub mod user;

pub use catalog::{Author, Book, BookDraft, BookFilter, Review};
pub use content::{Job, JobApplication, JobInput, NewApplication, Update, UpdateInput};
pub use marketing::{AffiliateLink, Banner, BannerInput, Coupon, CouponInput};
pub use order::{
    NewOrder, NewOrderItem, Order, OrderItem, ShippingAddress, Transaction, TransactionFilter,
};
pub use subscription::{LibraryEntry, Plan, PlanInput, Subscription};
pub use user::{NewUser, UserAccount};
