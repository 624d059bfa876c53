//! Client-side cart and session engine for the storefront.
//!
//! Keeps a shopping cart consistent with the storefront REST API across
//! guest and signed-in states, merges the guest cart on sign-in and clears
//! the cart once an order is confirmed.

pub mod client;
pub mod config;
pub mod dto;
pub mod error;
pub mod guest;
pub mod identity;
pub mod models;
pub mod response;
pub mod storage;
pub mod store;
