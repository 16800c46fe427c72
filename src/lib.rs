//! Exchange-rate acquisition and caching.
//!
//! Polls a live rate provider on the schedule its own expiry timestamps
//! declare, assembles per-day history series, persists both to a durable
//! key-value store, and shares one polling engine per key between any
//! number of subscribers.

pub mod board;
pub mod cache;
pub mod calculator;
pub mod clock;
pub mod config;
pub mod currency;
pub mod engine;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod storage;
pub mod stream;

pub use error::{RateError, Result};
