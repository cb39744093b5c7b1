//! Transactions over a name store.
//!
//! Every public service operation opens exactly one transaction. Reads run
//! `ReadOnly`; anything that writes, including the multi-entity atomic
//! insert, runs `ReadWrite` and ends in either `commit_tx` or
//! `rollback_tx`.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxMode {
    ReadOnly,
    ReadWrite,
}

impl TxMode {
    pub fn is_writable(&self) -> bool {
        matches!(self, TxMode::ReadWrite)
    }
}

impl fmt::Display for TxMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TxMode::ReadOnly => "read-only",
            TxMode::ReadWrite => "read-write",
        })
    }
}

/// Store-assigned transaction number, unique per store instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxId(pub u64);

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx-{}", self.0)
    }
}

/// Handle a `NameStore` hands out from `begin_tx`.
pub trait Transaction: Send + Sync {
    fn mode(&self) -> TxMode;
    fn id(&self) -> TxId;
}
