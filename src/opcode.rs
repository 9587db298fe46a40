//! EVM opcode definitions
//!
//! Primitive opcodes occupy the byte range `0x00..=0xff`. The fast
//! interpreter additionally dispatches synthetic (fused) opcodes above
//! [`SYNTHETIC_BASE`](crate::consts::SYNTHETIC_BASE); those never appear in
//! bytecode and expand to a fixed number of primitive steps.

use crate::consts::SYNTHETIC_BASE;

/// A primitive EVM opcode.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "UPPERCASE")]
#[repr(u8)]
pub enum Opcode {
    Stop = 0x00,
    Add = 0x01,
    Mul = 0x02,
    Sub = 0x03,
    Div = 0x04,
    Sdiv = 0x05,
    Mod = 0x06,
    Smod = 0x07,
    Addmod = 0x08,
    Mulmod = 0x09,
    Exp = 0x0a,
    Signextend = 0x0b,

    Lt = 0x10,
    Gt = 0x11,
    Slt = 0x12,
    Sgt = 0x13,
    Eq = 0x14,
    Iszero = 0x15,
    And = 0x16,
    Or = 0x17,
    Xor = 0x18,
    Not = 0x19,
    Byte = 0x1a,
    Shl = 0x1b,
    Shr = 0x1c,
    Sar = 0x1d,

    Keccak256 = 0x20,

    Address = 0x30,
    Balance = 0x31,
    Origin = 0x32,
    Caller = 0x33,
    Callvalue = 0x34,
    Calldataload = 0x35,
    Calldatasize = 0x36,
    Calldatacopy = 0x37,
    Codesize = 0x38,
    Codecopy = 0x39,
    Gasprice = 0x3a,
    Extcodesize = 0x3b,
    Extcodecopy = 0x3c,
    Returndatasize = 0x3d,
    Returndatacopy = 0x3e,
    Extcodehash = 0x3f,

    Blockhash = 0x40,
    Coinbase = 0x41,
    Timestamp = 0x42,
    Number = 0x43,
    Prevrandao = 0x44,
    Gaslimit = 0x45,
    Chainid = 0x46,
    Selfbalance = 0x47,
    Basefee = 0x48,
    Blobhash = 0x49,
    Blobbasefee = 0x4a,

    Pop = 0x50,
    Mload = 0x51,
    Mstore = 0x52,
    Mstore8 = 0x53,
    Sload = 0x54,
    Sstore = 0x55,
    Jump = 0x56,
    Jumpi = 0x57,
    Pc = 0x58,
    Msize = 0x59,
    Gas = 0x5a,
    Jumpdest = 0x5b,
    Tload = 0x5c,
    Tstore = 0x5d,
    Mcopy = 0x5e,

    Push0 = 0x5f,
    Push1 = 0x60,
    Push2 = 0x61,
    Push3 = 0x62,
    Push4 = 0x63,
    Push5 = 0x64,
    Push6 = 0x65,
    Push7 = 0x66,
    Push8 = 0x67,
    Push9 = 0x68,
    Push10 = 0x69,
    Push11 = 0x6a,
    Push12 = 0x6b,
    Push13 = 0x6c,
    Push14 = 0x6d,
    Push15 = 0x6e,
    Push16 = 0x6f,
    Push17 = 0x70,
    Push18 = 0x71,
    Push19 = 0x72,
    Push20 = 0x73,
    Push21 = 0x74,
    Push22 = 0x75,
    Push23 = 0x76,
    Push24 = 0x77,
    Push25 = 0x78,
    Push26 = 0x79,
    Push27 = 0x7a,
    Push28 = 0x7b,
    Push29 = 0x7c,
    Push30 = 0x7d,
    Push31 = 0x7e,
    Push32 = 0x7f,

    Dup1 = 0x80,
    Dup2 = 0x81,
    Dup3 = 0x82,
    Dup4 = 0x83,
    Dup5 = 0x84,
    Dup6 = 0x85,
    Dup7 = 0x86,
    Dup8 = 0x87,
    Dup9 = 0x88,
    Dup10 = 0x89,
    Dup11 = 0x8a,
    Dup12 = 0x8b,
    Dup13 = 0x8c,
    Dup14 = 0x8d,
    Dup15 = 0x8e,
    Dup16 = 0x8f,

    Swap1 = 0x90,
    Swap2 = 0x91,
    Swap3 = 0x92,
    Swap4 = 0x93,
    Swap5 = 0x94,
    Swap6 = 0x95,
    Swap7 = 0x96,
    Swap8 = 0x97,
    Swap9 = 0x98,
    Swap10 = 0x99,
    Swap11 = 0x9a,
    Swap12 = 0x9b,
    Swap13 = 0x9c,
    Swap14 = 0x9d,
    Swap15 = 0x9e,
    Swap16 = 0x9f,

    Log0 = 0xa0,
    Log1 = 0xa1,
    Log2 = 0xa2,
    Log3 = 0xa3,
    Log4 = 0xa4,

    Create = 0xf0,
    Call = 0xf1,
    Callcode = 0xf2,
    Return = 0xf3,
    Delegatecall = 0xf4,
    Create2 = 0xf5,
    Staticcall = 0xfa,
    Revert = 0xfd,
    Invalid = 0xfe,
    Selfdestruct = 0xff,
}

impl Opcode {
    /// Decode a code byte. Returns `None` for unassigned bytes, which the
    /// interpreter treats the same as `INVALID`.
    pub const fn from_u8(byte: u8) -> Option<Self> {
        Some(match byte {
            0x00 => Self::Stop,
            0x01 => Self::Add,
            0x02 => Self::Mul,
            0x03 => Self::Sub,
            0x04 => Self::Div,
            0x05 => Self::Sdiv,
            0x06 => Self::Mod,
            0x07 => Self::Smod,
            0x08 => Self::Addmod,
            0x09 => Self::Mulmod,
            0x0a => Self::Exp,
            0x0b => Self::Signextend,
            0x10 => Self::Lt,
            0x11 => Self::Gt,
            0x12 => Self::Slt,
            0x13 => Self::Sgt,
            0x14 => Self::Eq,
            0x15 => Self::Iszero,
            0x16 => Self::And,
            0x17 => Self::Or,
            0x18 => Self::Xor,
            0x19 => Self::Not,
            0x1a => Self::Byte,
            0x1b => Self::Shl,
            0x1c => Self::Shr,
            0x1d => Self::Sar,
            0x20 => Self::Keccak256,
            0x30 => Self::Address,
            0x31 => Self::Balance,
            0x32 => Self::Origin,
            0x33 => Self::Caller,
            0x34 => Self::Callvalue,
            0x35 => Self::Calldataload,
            0x36 => Self::Calldatasize,
            0x37 => Self::Calldatacopy,
            0x38 => Self::Codesize,
            0x39 => Self::Codecopy,
            0x3a => Self::Gasprice,
            0x3b => Self::Extcodesize,
            0x3c => Self::Extcodecopy,
            0x3d => Self::Returndatasize,
            0x3e => Self::Returndatacopy,
            0x3f => Self::Extcodehash,
            0x40 => Self::Blockhash,
            0x41 => Self::Coinbase,
            0x42 => Self::Timestamp,
            0x43 => Self::Number,
            0x44 => Self::Prevrandao,
            0x45 => Self::Gaslimit,
            0x46 => Self::Chainid,
            0x47 => Self::Selfbalance,
            0x48 => Self::Basefee,
            0x49 => Self::Blobhash,
            0x4a => Self::Blobbasefee,
            0x50 => Self::Pop,
            0x51 => Self::Mload,
            0x52 => Self::Mstore,
            0x53 => Self::Mstore8,
            0x54 => Self::Sload,
            0x55 => Self::Sstore,
            0x56 => Self::Jump,
            0x57 => Self::Jumpi,
            0x58 => Self::Pc,
            0x59 => Self::Msize,
            0x5a => Self::Gas,
            0x5b => Self::Jumpdest,
            0x5c => Self::Tload,
            0x5d => Self::Tstore,
            0x5e => Self::Mcopy,
            0x5f => Self::Push0,
            0x60..=0x7f => {
                // PUSH1..=PUSH32 are contiguous; transmute through the
                // discriminant is avoided in favor of an exhaustive match
                // below for the remaining ranges.
                return Self::from_push(byte);
            }
            0x80..=0x8f => return Self::from_dup(byte),
            0x90..=0x9f => return Self::from_swap(byte),
            0xa0 => Self::Log0,
            0xa1 => Self::Log1,
            0xa2 => Self::Log2,
            0xa3 => Self::Log3,
            0xa4 => Self::Log4,
            0xf0 => Self::Create,
            0xf1 => Self::Call,
            0xf2 => Self::Callcode,
            0xf3 => Self::Return,
            0xf4 => Self::Delegatecall,
            0xf5 => Self::Create2,
            0xfa => Self::Staticcall,
            0xfd => Self::Revert,
            0xfe => Self::Invalid,
            0xff => Self::Selfdestruct,
            _ => return None,
        })
    }

    const fn from_push(byte: u8) -> Option<Self> {
        Some(match byte {
            0x60 => Self::Push1,
            0x61 => Self::Push2,
            0x62 => Self::Push3,
            0x63 => Self::Push4,
            0x64 => Self::Push5,
            0x65 => Self::Push6,
            0x66 => Self::Push7,
            0x67 => Self::Push8,
            0x68 => Self::Push9,
            0x69 => Self::Push10,
            0x6a => Self::Push11,
            0x6b => Self::Push12,
            0x6c => Self::Push13,
            0x6d => Self::Push14,
            0x6e => Self::Push15,
            0x6f => Self::Push16,
            0x70 => Self::Push17,
            0x71 => Self::Push18,
            0x72 => Self::Push19,
            0x73 => Self::Push20,
            0x74 => Self::Push21,
            0x75 => Self::Push22,
            0x76 => Self::Push23,
            0x77 => Self::Push24,
            0x78 => Self::Push25,
            0x79 => Self::Push26,
            0x7a => Self::Push27,
            0x7b => Self::Push28,
            0x7c => Self::Push29,
            0x7d => Self::Push30,
            0x7e => Self::Push31,
            0x7f => Self::Push32,
            _ => return None,
        })
    }

    const fn from_dup(byte: u8) -> Option<Self> {
        Some(match byte {
            0x80 => Self::Dup1,
            0x81 => Self::Dup2,
            0x82 => Self::Dup3,
            0x83 => Self::Dup4,
            0x84 => Self::Dup5,
            0x85 => Self::Dup6,
            0x86 => Self::Dup7,
            0x87 => Self::Dup8,
            0x88 => Self::Dup9,
            0x89 => Self::Dup10,
            0x8a => Self::Dup11,
            0x8b => Self::Dup12,
            0x8c => Self::Dup13,
            0x8d => Self::Dup14,
            0x8e => Self::Dup15,
            0x8f => Self::Dup16,
            _ => return None,
        })
    }

    const fn from_swap(byte: u8) -> Option<Self> {
        Some(match byte {
            0x90 => Self::Swap1,
            0x91 => Self::Swap2,
            0x92 => Self::Swap3,
            0x93 => Self::Swap4,
            0x94 => Self::Swap5,
            0x95 => Self::Swap6,
            0x96 => Self::Swap7,
            0x97 => Self::Swap8,
            0x98 => Self::Swap9,
            0x99 => Self::Swap10,
            0x9a => Self::Swap11,
            0x9b => Self::Swap12,
            0x9c => Self::Swap13,
            0x9d => Self::Swap14,
            0x9e => Self::Swap15,
            0x9f => Self::Swap16,
            _ => return None,
        })
    }

    /// The code byte of this opcode.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Immediate length for PUSH opcodes, zero otherwise. PUSH0 has no
    /// immediate.
    pub const fn push_size(self) -> usize {
        let byte = self as u8;

        if byte >= Self::Push1 as u8 && byte <= Self::Push32 as u8 {
            (byte - Self::Push1 as u8) as usize + 1
        } else {
            0
        }
    }

    /// Stack depth index for DUPn (1-based), zero otherwise.
    pub const fn dup_depth(self) -> usize {
        let byte = self as u8;

        if byte >= Self::Dup1 as u8 && byte <= Self::Dup16 as u8 {
            (byte - Self::Dup1 as u8) as usize + 1
        } else {
            0
        }
    }

    /// Stack depth index for SWAPn (1-based), zero otherwise.
    pub const fn swap_depth(self) -> usize {
        let byte = self as u8;

        if byte >= Self::Swap1 as u8 && byte <= Self::Swap16 as u8 {
            (byte - Self::Swap1 as u8) as usize + 1
        } else {
            0
        }
    }

    /// Topic count for LOGn, zero otherwise.
    pub const fn log_topics(self) -> usize {
        let byte = self as u8;

        if byte >= Self::Log0 as u8 && byte <= Self::Log4 as u8 {
            (byte - Self::Log0 as u8) as usize
        } else {
            0
        }
    }

    /// Return `true` if this opcode always ends the current frame.
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Stop | Self::Return | Self::Revert | Self::Invalid | Self::Selfdestruct
        )
    }

    /// Return `true` if cumulative gas must reconcile immediately after this
    /// opcode. The fast interpreter charges gas per basic block, so the
    /// comparison points are block boundaries and terminal halts.
    pub const fn is_gas_boundary(self) -> bool {
        matches!(self, Self::Jumpdest | Self::Jump | Self::Jumpi) || self.is_terminal()
    }

    /// Return `true` if executing this opcode mutates state and is therefore
    /// forbidden in a static call context.
    pub const fn is_state_write(self) -> bool {
        matches!(
            self,
            Self::Sstore
                | Self::Tstore
                | Self::Log0
                | Self::Log1
                | Self::Log2
                | Self::Log3
                | Self::Log4
                | Self::Create
                | Self::Create2
                | Self::Selfdestruct
        )
    }
}

/// A synthetic opcode produced by the fast interpreter's fusion pass. Each
/// variant stands for a fixed sequence of primitive steps.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u16)]
pub enum SyntheticOpcode {
    PushAddInline = 0x100,
    PushSubInline = 0x101,
    PushMulInline = 0x102,
    PushDupInline = 0x103,
    PushJump = 0x104,
    PushJumpi = 0x105,
    IszeroJumpi = 0x106,
    DupSwap = 0x107,
    SwapPop = 0x108,
    FunctionDispatch = 0x109,
}

impl SyntheticOpcode {
    /// Decode a fused dispatch code.
    pub const fn from_code(code: u16) -> Option<Self> {
        Some(match code {
            0x100 => Self::PushAddInline,
            0x101 => Self::PushSubInline,
            0x102 => Self::PushMulInline,
            0x103 => Self::PushDupInline,
            0x104 => Self::PushJump,
            0x105 => Self::PushJumpi,
            0x106 => Self::IszeroJumpi,
            0x107 => Self::DupSwap,
            0x108 => Self::SwapPop,
            0x109 => Self::FunctionDispatch,
            _ => return None,
        })
    }

    /// Number of primitive reference steps this fusion spans. Total over the
    /// synthetic set; derivable from the tag alone.
    pub const fn step_count(self) -> usize {
        match self {
            Self::PushAddInline
            | Self::PushSubInline
            | Self::PushMulInline
            | Self::PushDupInline
            | Self::PushJump
            | Self::PushJumpi
            | Self::IszeroJumpi
            | Self::DupSwap
            | Self::SwapPop => 2,
            // PUSH4, EQ, PUSH, JUMPI
            Self::FunctionDispatch => 4,
        }
    }
}

/// A dispatch code as reported by the fast interpreter: either a primitive
/// byte or a synthetic fusion above [`SYNTHETIC_BASE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchCode {
    /// One primitive EVM opcode.
    Primitive(Opcode),
    /// A fused sequence of primitive opcodes.
    Synthetic(SyntheticOpcode),
}

impl DispatchCode {
    /// Classify a raw fast-interpreter dispatch code.
    pub const fn from_raw(code: u16) -> Option<Self> {
        if code < SYNTHETIC_BASE {
            match Opcode::from_u8(code as u8) {
                Some(op) => Some(Self::Primitive(op)),
                None => None,
            }
        } else {
            match SyntheticOpcode::from_code(code) {
                Some(op) => Some(Self::Synthetic(op)),
                None => None,
            }
        }
    }

    /// Number of primitive reference steps this dispatch spans.
    pub const fn step_count(self) -> usize {
        match self {
            Self::Primitive(_) => 1,
            Self::Synthetic(op) => op.step_count(),
        }
    }

    /// Mnemonic of the dispatch code.
    pub fn name(self) -> &'static str {
        match self {
            Self::Primitive(op) => op.into(),
            Self::Synthetic(op) => op.into(),
        }
    }

    /// The raw code as the fast interpreter reports it.
    pub const fn as_raw(self) -> u16 {
        match self {
            Self::Primitive(op) => op as u16,
            Self::Synthetic(op) => op as u16,
        }
    }
}
