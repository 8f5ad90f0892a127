//! Lustre Core - Shared domain types and checkout rules.
//!
//! This crate provides the types and pure rules used across all Lustre components:
//! - `storefront` - Public-facing jewelry storefront API
//! - `admin` - Back-office console API
//! - `cli` - Command-line tools for migrations
//!
//! # Architecture
//!
//! The core crate contains only types and rules - no I/O, no database access,
//! no HTTP clients. The remote commerce backend owns every record; the rules
//! here decide what is sent to it and when.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, money, emails, and statuses
//! - [`cart`] - Cart lines and quantity validation
//! - [`shipping`] - Addresses, shipping methods, and the location heuristic
//! - [`payment`] - Payment methods and the payment sub-flow state machine
//! - [`checkout`] - The three-step checkout orchestrator
//! - [`order`] - Order request assembly and totals
//! - [`gst`] - GSTIN parsing and address autofill

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod checkout;
pub mod gst;
pub mod order;
pub mod payment;
pub mod shipping;
pub mod types;

pub use types::*;
