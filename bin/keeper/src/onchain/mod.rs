mod gate;
mod submitter;
mod types;

pub use submitter::OnchainSubmitter;
pub use types::TxReceipt;
