//! Immutable bytecode representation with jump-destination analysis

use bytes::Bytes;

use crate::consts::JUMPDEST_BYTE;
use crate::opcode::Opcode;

/// A frame's bytecode together with its precomputed valid-JUMPDEST bitset.
///
/// The bitset is computed once at frame initialization. Bytes lying inside a
/// PUSH immediate are data, not code, so a `0x5b` there is never a valid
/// jump target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bytecode {
    code: Bytes,
    jumpdests: JumpDestMap,
}

impl Bytecode {
    /// Analyze `code` and record every valid JUMPDEST.
    pub fn new(code: Bytes) -> Self {
        let jumpdests = JumpDestMap::analyze(&code);

        Self { code, jumpdests }
    }

    /// Raw code bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.code
    }

    /// Code length in bytes.
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// Return `true` if the code is empty.
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Byte at `pc`, or `None` past the end of code. Executing past the end
    /// behaves as an implicit STOP.
    pub fn get(&self, pc: usize) -> Option<u8> {
        self.code.get(pc).copied()
    }

    /// The immediate bytes of a PUSH at `pc`, truncated at the end of code.
    /// Missing bytes pad the value with zeros on the low-order end.
    pub fn push_immediate(&self, pc: usize, size: usize) -> &[u8] {
        let start = self.code.len().min(pc.saturating_add(1));
        let end = self.code.len().min(start.saturating_add(size));

        &self.code[start..end]
    }

    /// Return `true` if `target` is a valid jump destination.
    pub fn is_valid_jumpdest(&self, target: usize) -> bool {
        self.jumpdests.contains(target)
    }

    /// Offsets of every valid JUMPDEST, ascending.
    pub fn jumpdests(&self) -> impl Iterator<Item = usize> + '_ {
        let code_len = self.code.len();

        (0..code_len).filter(move |pc| self.jumpdests.contains(*pc))
    }
}

/// Bitset of valid JUMPDEST offsets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct JumpDestMap {
    bits: Vec<u64>,
}

impl JumpDestMap {
    fn analyze(code: &[u8]) -> Self {
        let mut bits = vec![0u64; (code.len() + 63) / 64];
        let mut pc = 0;

        while pc < code.len() {
            let byte = code[pc];

            if byte == JUMPDEST_BYTE {
                bits[pc / 64] |= 1 << (pc % 64);
                pc += 1;
            } else {
                let skip = Opcode::from_u8(byte).map(Opcode::push_size).unwrap_or(0);
                pc += 1 + skip;
            }
        }

        Self { bits }
    }

    fn contains(&self, pc: usize) -> bool {
        self.bits
            .get(pc / 64)
            .map(|word| word & (1 << (pc % 64)) != 0)
            .unwrap_or(false)
    }
}
