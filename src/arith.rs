//! 256-bit word arithmetic for the reference interpreter
//!
//! All operations wrap modulo 2^256. Signed variants interpret their
//! operands as two's complement.

use primitive_types::U256;

use crate::consts::WORD_SIZE;

/// The most significant bit of a word, i.e. the sign bit of its signed
/// interpretation.
pub const SIGN_BIT: usize = 255;

/// Wrapping addition.
#[inline(always)]
pub fn add(a: U256, b: U256) -> U256 {
    a.overflowing_add(b).0
}

/// Wrapping subtraction.
#[inline(always)]
pub fn sub(a: U256, b: U256) -> U256 {
    a.overflowing_sub(b).0
}

/// Wrapping multiplication.
#[inline(always)]
pub fn mul(a: U256, b: U256) -> U256 {
    a.overflowing_mul(b).0
}

/// Unsigned division. Division by zero yields zero.
#[inline(always)]
pub fn div(a: U256, b: U256) -> U256 {
    a.checked_div(b).unwrap_or_default()
}

/// Unsigned remainder. Modulo zero yields zero.
#[inline(always)]
pub fn rem(a: U256, b: U256) -> U256 {
    a.checked_rem(b).unwrap_or_default()
}

/// Addition modulo an arbitrary word. `ADDMOD` semantics: the intermediate
/// sum is not truncated to 256 bits.
pub fn addmod(a: U256, b: U256, n: U256) -> U256 {
    if n.is_zero() {
        return U256::zero();
    }

    // Widen through the carry bit. (a mod n) + (b mod n) < 2n <= 2^257, so a
    // single conditional correction after a wrapping add is sufficient.
    let a = rem(a, n);
    let b = rem(b, n);
    let (sum, carry) = a.overflowing_add(b);

    if carry || sum >= n {
        sum.overflowing_sub(n).0
    } else {
        sum
    }
}

/// Multiplication modulo an arbitrary word. `MULMOD` semantics: the
/// intermediate product is not truncated to 256 bits.
pub fn mulmod(a: U256, b: U256, n: U256) -> U256 {
    if n.is_zero() {
        return U256::zero();
    }

    let a = rem(a, n);
    let mut b = rem(b, n);
    let mut acc = U256::zero();
    let mut shifted = a;

    // Russian-peasant multiplication with modular reduction at every step,
    // keeping all intermediates below n.
    while !b.is_zero() {
        if b.bit(0) {
            acc = addmod(acc, shifted, n);
        }
        shifted = addmod(shifted, shifted, n);
        b = b >> 1;
    }

    acc
}

/// Exponentiation modulo 2^256 by square-and-multiply.
pub fn exp(base: U256, exponent: U256) -> U256 {
    let mut result = U256::one();
    let mut base = base;
    let mut exponent = exponent;

    while !exponent.is_zero() {
        if exponent.bit(0) {
            result = mul(result, base);
        }
        base = mul(base, base);
        exponent = exponent >> 1;
    }

    result
}

/// Return `true` if the signed interpretation of `a` is negative.
#[inline(always)]
pub fn is_negative(a: U256) -> bool {
    a.bit(SIGN_BIT)
}

/// Two's complement negation.
#[inline(always)]
pub fn neg(a: U256) -> U256 {
    (!a).overflowing_add(U256::one()).0
}

/// Signed division. `MIN_INT / -1` wraps back to `MIN_INT`; division by zero
/// yields zero.
pub fn sdiv(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::zero();
    }

    let negative = is_negative(a) != is_negative(b);
    let a = if is_negative(a) { neg(a) } else { a };
    let b = if is_negative(b) { neg(b) } else { b };

    // MIN_INT / -1: both magnitudes are MIN_INT after negation, quotient
    // overflows back to MIN_INT through the final negation.
    let q = div(a, b);

    if negative {
        neg(q)
    } else {
        q
    }
}

/// Signed remainder. The result takes the sign of the dividend.
pub fn smod(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::zero();
    }

    let negative = is_negative(a);
    let abs_a = if is_negative(a) { neg(a) } else { a };
    let abs_b = if is_negative(b) { neg(b) } else { b };
    let r = rem(abs_a, abs_b);

    if negative {
        neg(r)
    } else {
        r
    }
}

/// Signed less-than.
pub fn slt(a: U256, b: U256) -> bool {
    match (is_negative(a), is_negative(b)) {
        (true, false) => true,
        (false, true) => false,
        _ => a < b,
    }
}

/// Signed greater-than.
pub fn sgt(a: U256, b: U256) -> bool {
    slt(b, a)
}

/// Logical shift left. Shifts of 256 or more yield zero.
pub fn shl(shift: U256, value: U256) -> U256 {
    if shift >= U256::from(256u16) {
        U256::zero()
    } else {
        value << shift.as_usize()
    }
}

/// Logical shift right. Shifts of 256 or more yield zero.
pub fn shr(shift: U256, value: U256) -> U256 {
    if shift >= U256::from(256u16) {
        U256::zero()
    } else {
        value >> shift.as_usize()
    }
}

/// Arithmetic shift right, filling with the sign bit.
pub fn sar(shift: U256, value: U256) -> U256 {
    let negative = is_negative(value);

    if shift >= U256::from(256u16) {
        return if negative { U256::max_value() } else { U256::zero() };
    }

    let shift = shift.as_usize();
    let shifted = value >> shift;

    if negative && shift > 0 {
        // Fill the vacated high bits with ones.
        shifted | (U256::max_value() << (256 - shift))
    } else {
        shifted
    }
}

/// `BYTE` semantics: the `i`-th byte of `value` counting from the most
/// significant end, or zero if `i >= 32`.
pub fn byte(i: U256, value: U256) -> U256 {
    if i >= U256::from(WORD_SIZE) {
        return U256::zero();
    }

    // U256::byte indexes from the least significant end.
    let index = WORD_SIZE - 1 - i.as_usize();
    U256::from(value.byte(index))
}

/// `SIGNEXTEND` semantics: extend the sign of the `b`-th byte (counting from
/// the least significant end) through all higher bytes. `b >= 31` is the
/// identity.
pub fn signextend(b: U256, value: U256) -> U256 {
    if b >= U256::from(WORD_SIZE - 1) {
        return value;
    }

    let bit = b.as_usize() * 8 + 7;
    let mask = (U256::one() << (bit + 1)).overflowing_sub(U256::one()).0;

    if value.bit(bit) {
        value | !mask
    } else {
        value & mask
    }
}

/// Number of significant bytes in the exponent, as used by the `EXP` gas
/// charge.
pub fn byte_len(value: U256) -> u64 {
    ((value.bits() as u64) + 7) / 8
}

/// Serialize a word to its 32-byte big-endian representation.
pub fn to_be_bytes(value: U256) -> [u8; WORD_SIZE] {
    let mut buf = [0u8; WORD_SIZE];
    value.to_big_endian(&mut buf);
    buf
}

/// Parse a word from a 32-byte big-endian representation.
pub fn from_be_bytes(bytes: &[u8; WORD_SIZE]) -> U256 {
    U256::from_big_endian(bytes)
}

/// Parse a word from up to 32 big-endian bytes, as a PUSH immediate is read
/// from the code. Missing low-order bytes are implicitly zero.
pub fn from_be_slice(bytes: &[u8]) -> U256 {
    debug_assert!(bytes.len() <= WORD_SIZE);
    U256::from_big_endian(bytes)
}
