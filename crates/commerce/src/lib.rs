//! Quillhouse Commerce - I/O shared by the storefront and admin binaries.
//!
//! - [`db`] - `PostgreSQL` repositories for the `shop` schema
//! - [`models`] - Domain types loaded by the repositories
//! - [`razorpay`] - Payment gateway client (orders, signature checks, refunds)
//! - [`shiprocket`] - Shipping aggregator client (orders, AWB, tracking)
//! - [`email`] - Transactional email over SMTP
//! - [`password`] - Argon2 password hashing
//! - [`refunds`] - Cancellation and refund flows

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod db;
pub mod email;
pub mod models;
pub mod password;
pub mod razorpay;
pub mod refunds;
pub mod shiprocket;
