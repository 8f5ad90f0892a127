//! Lustre Admin library.
//!
//! Back-office JSON API. Every record lives in the commerce backend; the
//! console validates edits, forwards them with the signed-in admin's token
//! and keeps nothing but the session.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
