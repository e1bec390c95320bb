use thiserror::Error;

use super::instructions::Mnemonic;
use crate::constants::Word;

/// Reason a machine stopped in the faulted state
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// `LOADI`/`SAVEI` with register B pointing outside of memory
    #[error("invalid indexed memory access at {address} by {instruction}")]
    InvalidIndexedAccess { instruction: Mnemonic, address: Word },

    /// `LOAD`/`SAVE` on an address outside of a memory smaller than 256 cells
    #[error("invalid memory access at {address} by {instruction}")]
    InvalidAddress { instruction: Mnemonic, address: Word },

    /// Jump outside of a memory smaller than 256 cells
    #[error("invalid jump to {address}")]
    InvalidJump { address: Word },
}
