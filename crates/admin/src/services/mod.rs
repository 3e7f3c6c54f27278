//! Back-office workflows spanning several repositories or clients.

pub mod fulfillment;
