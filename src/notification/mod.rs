//! In-app notifications: a deduplicating store fed by the live push feed,
//! plus a background sweeper that purges old read items.

pub mod feed;
pub mod store;
pub mod sweeper;

pub use feed::{FeedStats, run_feed};
pub use store::NotificationStore;
pub use sweeper::{NotificationSweeper, SweeperConfig};
