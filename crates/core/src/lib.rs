//! Core business logic for Kasa.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and calculations live here.
//!
//! # Modules
//!
//! - `ledger` - Append-only client debt ledger and balance derivation
//! - `currency` - Category to currency policy and per-currency totals
//! - `order` - Order validation, item diffing, stock and debt reconciliation plans
//! - `invoice` - Invoice data assembly
//! - `dashboard` - Revenue and summary figures
//! - `auth` - Password hashing and access rules

pub mod auth;
pub mod currency;
pub mod dashboard;
pub mod invoice;
pub mod ledger;
pub mod order;
