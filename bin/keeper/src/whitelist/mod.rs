mod sentinel;

pub use sentinel::{WhitelistSentinel, WhitelistSentinelConfig};
