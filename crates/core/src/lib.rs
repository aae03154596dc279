//! Ölföng Core - Shared types library.
//!
//! This crate provides common types used across all Ölföng components:
//! - `api` - REST backend for the storefront and the admin back-office
//! - `cli` - Command-line tools for migrations, admin users and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, emails, locales, statuses, VAT and discount math

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
