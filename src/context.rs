//! Call-frame context definitions

use bytes::Bytes;
use primitive_types::{H160, H256, U256};

/// Immutable call-frame fields: who is executing, on whose behalf, with what
/// input. Set once before the first step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallContext {
    /// Account that sent the message.
    pub caller: H160,
    /// Account being executed.
    pub callee: H160,
    /// Value sent along the message.
    pub value: U256,
    /// Message input data.
    pub calldata: Bytes,
    /// Call-stack depth of this frame.
    pub depth: usize,
    /// Set under STATICCALL: state writes are forbidden.
    pub is_static: bool,
}

impl CallContext {
    /// Context for an external (top-level) call.
    pub fn external(caller: H160, callee: H160, value: U256, calldata: Bytes) -> Self {
        Self {
            caller,
            callee,
            value,
            calldata,
            depth: 0,
            is_static: false,
        }
    }

    /// Derive the context of a child frame at `depth + 1`. A static parent
    /// makes every child static.
    pub fn child(&self, callee: H160, value: U256, calldata: Bytes, is_static: bool) -> Self {
        Self {
            caller: self.callee,
            callee,
            value,
            calldata,
            depth: self.depth + 1,
            is_static: self.is_static || is_static,
        }
    }
}

/// Transaction and block environment read by the 0x3a and 0x40-range
/// opcodes. Defaults to all-zero values for standalone reference runs; the
/// host fills it in when embedding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockEnv {
    /// Transaction sender (ORIGIN).
    pub origin: H160,
    /// Effective gas price (GASPRICE).
    pub gas_price: U256,
    /// Block beneficiary (COINBASE).
    pub coinbase: H160,
    /// Block timestamp (TIMESTAMP).
    pub timestamp: U256,
    /// Block number (NUMBER).
    pub number: U256,
    /// Randomness beacon (PREVRANDAO).
    pub prevrandao: H256,
    /// Block gas limit (GASLIMIT).
    pub gas_limit: u64,
    /// Chain id (CHAINID).
    pub chain_id: u64,
    /// Base fee per gas (BASEFEE).
    pub base_fee: U256,
    /// Versioned blob hashes (BLOBHASH).
    pub blob_hashes: Vec<H256>,
    /// Blob base fee (BLOBBASEFEE).
    pub blob_base_fee: U256,
}
