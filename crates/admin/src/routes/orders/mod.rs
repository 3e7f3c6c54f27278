//! Order management route handlers.
//!
//! Listing, detail, status changes, cancellation, refunds and Shiprocket
//! shipments.

mod actions;
mod detail;
mod list;
pub mod types;

pub use actions::{cancel, create_shipment, refund, update_status};
pub use detail::{show, tracking};
pub use list::index;
