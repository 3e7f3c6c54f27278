//! Business logic services.

pub mod auth;
pub mod catalog;
pub mod checkout;
pub mod orders;
pub mod subscriptions;

pub use auth::{AuthError, AuthService};
pub use catalog::Catalog;
pub use checkout::Checkout;
