//! Services talking to the outside world.
//!
//! - `feed`: snapshot fetcher for the upstream JSON feed
//! - `message`: alert text rendering
//! - `telegram`: message delivery through the Telegram Bot API

pub mod feed;
pub mod message;
pub mod telegram;

pub use feed::{FeedClient, SnapshotSource};
pub use message::MessageFormatter;
pub use telegram::{Notifier, TelegramNotifier};
