//! Herbal Core - Shared types library.
//!
//! This crate provides the domain types shared by the storefront binary and
//! its integration tests:
//! - typed identifiers for backend records
//! - validated email addresses
//! - decimal prices with currency formatting
//! - order status and product rating values
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. The backend
//! owns every authoritative invariant; these types only cover presence and
//! format checks plus display arithmetic.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
