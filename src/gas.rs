//! Gas schedule for the reference interpreter
//!
//! London-era costs with EIP-2929 access-list pricing. Static per-opcode
//! costs live in [`static_cost`]; dynamic components (memory expansion,
//! per-byte and per-word charges, warm/cold surcharges) are separate
//! functions charged by the individual handlers.

use primitive_types::U256;

use crate::arith;
use crate::opcode::Opcode;

/// Cheapest tier: context reads like ADDRESS or GAS.
pub const BASE: u64 = 2;
/// Very-low tier: ALU, PUSH, DUP, SWAP, MLOAD/MSTORE.
pub const VERYLOW: u64 = 3;
/// Low tier: MUL, DIV and friends.
pub const LOW: u64 = 5;
/// Mid tier: ADDMOD, MULMOD, JUMP.
pub const MID: u64 = 8;
/// High tier: JUMPI.
pub const HIGH: u64 = 10;
/// JUMPDEST marker.
pub const JUMPDEST: u64 = 1;
/// BLOCKHASH lookup.
pub const BLOCKHASH: u64 = 20;

/// KECCAK256 base.
pub const KECCAK256: u64 = 30;
/// KECCAK256 per input word.
pub const KECCAK256_WORD: u64 = 6;
/// Per-word charge of the copy family.
pub const COPY_WORD: u64 = 3;
/// EXP base.
pub const EXP: u64 = 10;
/// EXP per significant exponent byte.
pub const EXP_BYTE: u64 = 50;

/// LOG base.
pub const LOG: u64 = 375;
/// LOG per topic.
pub const LOG_TOPIC: u64 = 375;
/// LOG per data byte.
pub const LOG_DATA: u64 = 8;

/// Warm storage/account read (EIP-2929).
pub const WARM_ACCESS: u64 = 100;
/// Cold storage-slot surcharge (EIP-2929).
pub const COLD_SLOAD: u64 = 2100;
/// Cold account-access surcharge (EIP-2929).
pub const COLD_ACCOUNT_ACCESS: u64 = 2600;

/// SSTORE from zero to non-zero.
pub const SSTORE_SET: u64 = 20000;
/// SSTORE overwriting a non-zero slot.
pub const SSTORE_RESET: u64 = 2900;
/// Refund for clearing a slot (EIP-3529).
pub const SSTORE_CLEARS_REFUND: u64 = 4800;

/// TLOAD/TSTORE flat cost (EIP-1153).
pub const TRANSIENT_ACCESS: u64 = 100;

/// CALL value-transfer surcharge.
pub const CALL_VALUE: u64 = 9000;
/// Stipend forwarded with a value-bearing call.
pub const CALL_STIPEND: u64 = 2300;
/// Surcharge for touching a previously empty account with value.
pub const NEW_ACCOUNT: u64 = 25000;
/// CREATE/CREATE2 base.
pub const CREATE: u64 = 32000;
/// Per-word charge on init code (EIP-3860).
pub const INITCODE_WORD: u64 = 2;
/// SELFDESTRUCT base.
pub const SELFDESTRUCT: u64 = 5000;

/// Per-word memory charge.
pub const MEMORY_WORD: u64 = 3;
/// Quadratic memory-cost divisor.
pub const MEMORY_QUAD_DIVISOR: u64 = 512;

/// Static cost of an opcode, exclusive of any dynamic component. Opcodes
/// whose whole cost is dynamic (the access-list family, SSTORE, calls)
/// return zero here.
pub const fn static_cost(op: Opcode) -> u64 {
    use Opcode::*;

    match op {
        Stop | Return | Revert | Invalid => 0,

        // EXP charges its base together with the per-byte part in the
        // handler.
        Exp => 0,

        Add | Sub | Not | Lt | Gt | Slt | Sgt | Eq | Iszero | And | Or | Xor | Byte | Shl
        | Shr | Sar | Calldataload | Mload | Mstore | Mstore8 => VERYLOW,

        Mul | Div | Sdiv | Mod | Smod | Signextend | Selfbalance => LOW,

        Addmod | Mulmod | Jump => MID,

        Jumpi => HIGH,

        Jumpdest => JUMPDEST,

        Address | Origin | Caller | Callvalue | Calldatasize | Codesize | Gasprice
        | Returndatasize | Pc | Msize | Gas | Coinbase | Timestamp | Number | Prevrandao
        | Gaslimit | Chainid | Basefee | Blobbasefee | Pop | Push0 => BASE,

        Blockhash => BLOCKHASH,
        Blobhash => VERYLOW,

        Keccak256 => KECCAK256,

        // Copy opcodes carry a VERYLOW base plus per-word and memory parts.
        Calldatacopy | Codecopy | Returndatacopy | Mcopy => VERYLOW,

        Tload | Tstore => TRANSIENT_ACCESS,

        Log0 | Log1 | Log2 | Log3 | Log4 => LOG,

        Create | Create2 => CREATE,
        Selfdestruct => SELFDESTRUCT,

        // Whole cost is access-list dependent.
        Balance | Extcodesize | Extcodecopy | Extcodehash | Sload | Sstore | Call | Callcode
        | Delegatecall | Staticcall => 0,

        _ => {
            // PUSH1..=PUSH32, DUP, SWAP
            VERYLOW
        }
    }
}

/// Total memory cost of holding `words` 32-byte words.
pub const fn memory_cost(words: u64) -> u64 {
    MEMORY_WORD * words + (words * words) / MEMORY_QUAD_DIVISOR
}

/// Expansion charge for growing from `old_words` to `new_words`. Zero when
/// memory does not grow.
pub const fn memory_expansion_cost(old_words: u64, new_words: u64) -> u64 {
    if new_words <= old_words {
        0
    } else {
        memory_cost(new_words) - memory_cost(old_words)
    }
}

/// Number of 32-byte words covering `len` bytes.
pub const fn words_for(len: u64) -> u64 {
    (len + 31) / 32
}

/// Dynamic part of KECCAK256 for `len` input bytes.
pub const fn keccak_cost(len: u64) -> u64 {
    KECCAK256_WORD * words_for(len)
}

/// Per-word part of the copy family for `len` copied bytes.
pub const fn copy_cost(len: u64) -> u64 {
    COPY_WORD * words_for(len)
}

/// Dynamic part of EXP for the given exponent.
pub fn exp_cost(exponent: U256) -> u64 {
    EXP_BYTE * arith::byte_len(exponent)
}

/// Full LOG cost for `topics` topics over `len` data bytes, exclusive of
/// memory expansion.
pub const fn log_cost(topics: u64, len: u64) -> u64 {
    LOG + LOG_TOPIC * topics + LOG_DATA * len
}

/// Cold surcharge for an account access; zero when warm.
pub const fn account_access_cost(was_cold: bool) -> u64 {
    if was_cold {
        COLD_ACCOUNT_ACCESS
    } else {
        WARM_ACCESS
    }
}

/// SLOAD cost under EIP-2929.
pub const fn sload_cost(was_cold: bool) -> u64 {
    if was_cold {
        COLD_SLOAD + WARM_ACCESS
    } else {
        WARM_ACCESS
    }
}

/// SSTORE cost under the London rules: cold surcharge plus set/reset/no-op
/// pricing against the current value.
pub const fn sstore_cost(was_cold: bool, current_is_zero: bool, unchanged: bool) -> u64 {
    let surcharge = if was_cold { COLD_SLOAD } else { 0 };

    let write = if unchanged {
        WARM_ACCESS
    } else if current_is_zero {
        SSTORE_SET
    } else {
        SSTORE_RESET
    };

    surcharge + write
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_cost_is_quadratic_delta() {
        assert_eq!(memory_cost(0), 0);
        assert_eq!(memory_cost(1), 3);
        assert_eq!(memory_cost(32), 32 * 3 + 2);
        assert_eq!(memory_expansion_cost(0, 1), 3);
        assert_eq!(memory_expansion_cost(1, 1), 0);
        assert_eq!(memory_expansion_cost(2, 1), 0);
        assert_eq!(
            memory_expansion_cost(10, 20),
            memory_cost(20) - memory_cost(10)
        );
    }

    #[test]
    fn exp_cost_counts_significant_bytes() {
        assert_eq!(exp_cost(U256::zero()), 0);
        assert_eq!(exp_cost(U256::from(0xff)), EXP_BYTE);
        assert_eq!(exp_cost(U256::from(0x100)), 2 * EXP_BYTE);
        assert_eq!(exp_cost(U256::MAX), 32 * EXP_BYTE);
    }

    #[test]
    fn sstore_pricing() {
        // cold set
        assert_eq!(sstore_cost(true, true, false), COLD_SLOAD + SSTORE_SET);
        // warm reset
        assert_eq!(sstore_cost(false, false, false), SSTORE_RESET);
        // warm no-op
        assert_eq!(sstore_cost(false, false, true), WARM_ACCESS);
    }

    #[test]
    fn push_dup_swap_fall_through_to_verylow() {
        assert_eq!(static_cost(Opcode::Push1), VERYLOW);
        assert_eq!(static_cost(Opcode::Dup16), VERYLOW);
        assert_eq!(static_cost(Opcode::Swap3), VERYLOW);
        assert_eq!(static_cost(Opcode::Push0), BASE);
    }
}
