//! Cartforge
//!
//! Cart reconciliation, pricing, and coupon evaluation engine for a
//! quick-commerce backend. The crate owns no HTTP surface: route handlers,
//! auth, and partner integrations live in the surrounding system and invoke
//! the services exposed here.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod services;

pub mod prelude {
    pub use crate::config::AppConfig;
    pub use crate::db::*;
    pub use crate::errors::*;
    pub use crate::events::*;
    pub use crate::services::*;
}
