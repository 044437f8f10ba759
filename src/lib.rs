// src/lib.rs

//! HKEX new-listing monitor library.
//!
//! Polls the exchange's JSON feed of listing applications, detects filings
//! that were not announced before, and posts alerts to a Telegram chat.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
