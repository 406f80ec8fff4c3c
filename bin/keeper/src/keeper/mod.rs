mod keeper;

pub use keeper::{KeeperLoop, KeeperLoopConfig, PeriodicTask, RunMode};
