//! Lustre Storefront library.
//!
//! The storefront is a JSON API in front of the commerce backend. It keeps
//! the cart, wishlist and checkout progress in the server-side session and
//! forwards everything else to the backend.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
