//! EVM parameters

/* STACK AND WORD TYPES */

/// Maximum number of words the stack may hold.
pub const STACK_LIMIT: usize = 1024;

/// Length of an EVM word, in bytes.
pub const WORD_SIZE: usize = 32;

/// Length of an address, in bytes.
pub const ADDRESS_SIZE: usize = 20;

/* END */

/* MEMORY TYPES */

/// Memory growth quantum, in bytes. Memory length is always a multiple of
/// this.
pub const MEMORY_QUANTUM: usize = 32;

/// Largest addressable memory offset. Any access reaching past this limit
/// fails with `MemoryLimitExceeded` before gas is charged for it.
pub const MEMORY_LIMIT: u64 = u32::MAX as u64;

/* END */

/* CODE TYPES */

/// The JUMPDEST marker byte.
pub const JUMPDEST_BYTE: u8 = 0x5b;

/// Largest PUSH immediate length, in bytes.
pub const PUSH_IMMEDIATE_MAX: usize = 32;

/* END */

/* SYNCHRONIZATION TYPES */

/// First code point of the synthetic (fused) opcode space. Primitive EVM
/// opcodes occupy 0x00..=0xff.
pub const SYNTHETIC_BASE: u16 = 0x100;

/* END */
