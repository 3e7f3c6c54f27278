//! Quillhouse Admin library.
//!
//! The back-office JSON API and the user-management API, built as a
//! library so the router can be exercised in tests.
//!
//! # Security
//!
//! This crate holds HIGH PRIVILEGE access:
//! - Razorpay refunds
//! - Shiprocket shipment booking and cancellation
//! - Disabling and deleting user accounts

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use routes::app;
