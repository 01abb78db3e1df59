//! 自选列表与价格快照的 JSON 文件持久化。

pub mod file;
pub mod snapshot;
pub mod watchlist;

pub use snapshot::JsonPriceStateStore;
pub use watchlist::JsonWatchlistStore;
