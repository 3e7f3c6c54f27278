//! Quillhouse Storefront library.
//!
//! The customer-facing JSON API and the author portal, built as a library
//! so the router can be exercised in tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use routes::app;
