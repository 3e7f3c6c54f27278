//! Quillhouse Core - Shared types and business rules.
//!
//! This crate provides common types used across all Quillhouse components:
//! - `storefront` - Customer-facing catalog, checkout and author portal
//! - `admin` - Back-office API and privileged user management
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP clients. Anything that can be decided from
//! values already in memory (coupon checks, cart totals, order state
//! transitions, sales aggregation) lives here so both binaries agree on it.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money, emails and status enums
//! - [`cart`] - Cart lines and order totals
//! - [`coupon`] - Coupon validation and discount computation
//! - [`order_flow`] - Order status transitions and refund eligibility
//! - [`sales`] - Sales report aggregation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod coupon;
pub mod order_flow;
pub mod sales;
pub mod types;

pub use types::*;
