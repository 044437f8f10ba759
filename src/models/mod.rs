// src/models/mod.rs

//! Domain models for the listing monitor.

mod config;
mod feed;
mod listing;

// Re-export all public types
pub use config::{
    Config, DetectionConfig, FeedConfig, LoggingConfig, MonitorConfig, StateConfig,
    TelegramConfig,
};
pub use feed::Snapshot;
pub use listing::{Document, Listing, ListingStatus};
