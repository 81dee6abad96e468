pub mod store;
pub mod sweeper;

pub use store::{CachedEntry, Freshness, ResultCache};
pub use sweeper::SweeperHandle;
