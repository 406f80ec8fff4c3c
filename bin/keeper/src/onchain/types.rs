use std::fmt;

/// Transaction receipt summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: String,
    pub block_number: u64,
    pub gas_used: u128,
    /// `false` when the transaction was mined but reverted
    pub status: bool,
}

impl fmt::Display for TxReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (block {}, gas {}, {})",
            self.tx_hash,
            self.block_number,
            self.gas_used,
            if self.status { "success" } else { "reverted" }
        )
    }
}
