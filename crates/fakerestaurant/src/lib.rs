//! `fakerestaurant` - Restaurant reviews with community voting
//!
//! This library provides the storage, vote ledger and HTTP API behind the
//! `fakerest` binary. Users list restaurants, write reviews and vote on each
//! other's reviews; every user holds at most one vote per review, and
//! submitting the same vote twice withdraws it.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod seed;
pub mod server;
pub mod storage;
pub mod uploads;

pub use api::{router, AppState};
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use storage::{Storage, StorageStats};
