//! Fixed-width integers from 8 to 1024 bits.
//!
//! Values are stored as sixteen little-endian `u64` limbs; only the low
//! `bits` bits are ever non-zero. Every arithmetic operation reports
//! overflow the way Rust's `overflowing_*` methods do, for both unsigned and
//! two's complement interpretations.

#![allow(clippy::cast_possible_truncation, clippy::needless_range_loop)]

use core::cmp::Ordering;

/// Number of 64-bit limbs in the widest register.
pub const MAX_LIMBS: usize = 16;

type Limbs = [u64; MAX_LIMBS];

/// An integer of a fixed bit width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Uint {
    limbs: Limbs,
    bits: u16,
}

fn add_limbs(a: &Limbs, b: &Limbs, n: usize) -> (Limbs, bool) {
    let mut out = [0u64; MAX_LIMBS];
    let mut carry = false;
    for i in 0..n {
        let (s1, c1) = a[i].overflowing_add(b[i]);
        let (s2, c2) = s1.overflowing_add(u64::from(carry));
        out[i] = s2;
        carry = c1 | c2;
    }
    (out, carry)
}

fn sub_limbs(a: &Limbs, b: &Limbs, n: usize) -> (Limbs, bool) {
    let mut out = [0u64; MAX_LIMBS];
    let mut borrow = false;
    for i in 0..n {
        let (d1, b1) = a[i].overflowing_sub(b[i]);
        let (d2, b2) = d1.overflowing_sub(u64::from(borrow));
        out[i] = d2;
        borrow = b1 | b2;
    }
    (out, borrow)
}

fn full_product(a: &Limbs, b: &Limbs, n: usize) -> [u64; 2 * MAX_LIMBS] {
    let mut out = [0u64; 2 * MAX_LIMBS];
    for i in 0..n {
        let mut carry = 0u128;
        for j in 0..n {
            let t = u128::from(a[i]) * u128::from(b[j]) + u128::from(out[i + j]) + carry;
            out[i + j] = t as u64;
            carry = t >> 64;
        }
        out[i + n] = carry as u64;
    }
    out
}

/// True when any bit at position `bits` or above is set.
fn exceeds(wide: &[u64], bits: u32) -> bool {
    let limb = (bits / 64) as usize;
    let rem = bits % 64;
    if limb >= wide.len() {
        return false;
    }
    let partial = rem != 0 && wide[limb] >> rem != 0;
    let start = if rem == 0 { limb } else { limb + 1 };
    partial || wide[start.min(wide.len())..].iter().any(|word| *word != 0)
}

/// True when exactly bit `bit` is set and nothing else.
fn is_power_of_two_at(wide: &[u64], bit: u32) -> bool {
    let limb = (bit / 64) as usize;
    wide.iter()
        .enumerate()
        .all(|(i, word)| *word == if i == limb { 1u64 << (bit % 64) } else { 0 })
}

fn shl_limbs(src: &Limbs, amount: u32) -> Limbs {
    let limb_shift = (amount / 64) as usize;
    let bit_shift = amount % 64;
    let mut out = [0u64; MAX_LIMBS];
    for i in limb_shift..MAX_LIMBS {
        let s = i - limb_shift;
        out[i] = src[s] << bit_shift;
        if bit_shift != 0 && s > 0 {
            out[i] |= src[s - 1] >> (64 - bit_shift);
        }
    }
    out
}

fn shr_limbs(src: &Limbs, amount: u32) -> Limbs {
    let limb_shift = (amount / 64) as usize;
    let bit_shift = amount % 64;
    let mut out = [0u64; MAX_LIMBS];
    for i in 0..MAX_LIMBS.saturating_sub(limb_shift) {
        let s = i + limb_shift;
        out[i] = src[s] >> bit_shift;
        if bit_shift != 0 && s + 1 < MAX_LIMBS {
            out[i] |= src[s + 1] << (64 - bit_shift);
        }
    }
    out
}

impl Uint {
    /// Zero at the given width.
    #[must_use]
    pub const fn zero(bits: u16) -> Self {
        Self {
            limbs: [0; MAX_LIMBS],
            bits,
        }
    }

    /// Truncates `value` to the given width.
    #[must_use]
    pub fn from_u64(bits: u16, value: u64) -> Self {
        let mut limbs = [0u64; MAX_LIMBS];
        limbs[0] = value;
        Self { limbs, bits }.normalized()
    }

    /// Truncates `value` to the given width.
    #[must_use]
    pub fn from_u128(bits: u16, value: u128) -> Self {
        let mut limbs = [0u64; MAX_LIMBS];
        limbs[0] = value as u64;
        limbs[1] = (value >> 64) as u64;
        Self { limbs, bits }.normalized()
    }

    /// Reads a little-endian register image.
    #[must_use]
    pub fn from_le_bytes(bits: u16, bytes: &[u8]) -> Self {
        let mut limbs = [0u64; MAX_LIMBS];
        for (limb, chunk) in limbs.iter_mut().zip(bytes.chunks(8)) {
            let mut buf = [0u8; 8];
            buf[..chunk.len()].copy_from_slice(chunk);
            *limb = u64::from_le_bytes(buf);
        }
        Self { limbs, bits }.normalized()
    }

    /// Writes the value little-endian into `out`, which should be `bits / 8` bytes.
    pub fn write_le_bytes(&self, out: &mut [u8]) {
        for (chunk, limb) in out.chunks_mut(8).zip(self.limbs) {
            let bytes = limb.to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    /// All bits set.
    #[must_use]
    pub fn max_value(bits: u16) -> Self {
        Self {
            limbs: [u64::MAX; MAX_LIMBS],
            bits,
        }
        .normalized()
    }

    /// Most negative two's complement value: only the sign bit set.
    #[must_use]
    pub fn min_signed(bits: u16) -> Self {
        let mut value = Self::zero(bits);
        value.set_bit(u32::from(bits) - 1);
        value
    }

    /// Bit width.
    #[must_use]
    pub const fn bits(&self) -> u16 {
        self.bits
    }

    /// Low 64 bits.
    #[must_use]
    pub const fn low_u64(&self) -> u64 {
        self.limbs[0]
    }

    /// Low 128 bits.
    #[must_use]
    pub fn low_u128(&self) -> u128 {
        u128::from(self.limbs[0]) | (u128::from(self.limbs[1]) << 64)
    }

    const fn limb_count(&self) -> usize {
        (self.bits as usize).div_ceil(64)
    }

    fn normalized(mut self) -> Self {
        let n = self.limb_count();
        let rem = self.bits % 64;
        if rem != 0 {
            self.limbs[n - 1] &= (1u64 << rem) - 1;
        }
        for limb in &mut self.limbs[n..] {
            *limb = 0;
        }
        self
    }

    fn above_width(&self) -> bool {
        exceeds(&self.limbs, u32::from(self.bits))
    }

    /// Returns true when every bit is clear.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.limbs.iter().all(|limb| *limb == 0)
    }

    /// Bit `index`, counting from the least significant bit.
    #[must_use]
    pub fn bit(&self, index: u32) -> bool {
        index < u32::from(self.bits) && (self.limbs[(index / 64) as usize] >> (index % 64)) & 1 == 1
    }

    fn set_bit(&mut self, index: u32) {
        self.limbs[(index / 64) as usize] |= 1u64 << (index % 64);
    }

    /// Two's complement sign bit.
    #[must_use]
    pub fn sign_bit(&self) -> bool {
        self.bit(u32::from(self.bits) - 1)
    }

    fn with_limbs(&self, limbs: Limbs) -> Self {
        Self { limbs, bits: self.bits }.normalized()
    }

    fn wrapping_neg(self) -> Self {
        let one = Self::from_u64(self.bits, 1);
        self.complement().overflowing_add(one, false).0
    }

    fn magnitude(self) -> Self {
        if self.sign_bit() {
            self.wrapping_neg()
        } else {
            self
        }
    }

    /// Wrapping addition and its overflow flag.
    #[must_use]
    pub fn overflowing_add(self, rhs: Self, signed: bool) -> (Self, bool) {
        let (raw, carry) = add_limbs(&self.limbs, &rhs.limbs, self.limb_count());
        let unsigned_overflow = carry || Self { limbs: raw, bits: self.bits }.above_width();
        let result = self.with_limbs(raw);
        let overflow = if signed {
            self.sign_bit() == rhs.sign_bit() && result.sign_bit() != self.sign_bit()
        } else {
            unsigned_overflow
        };
        (result, overflow)
    }

    /// Wrapping subtraction and its overflow flag.
    #[must_use]
    pub fn overflowing_sub(self, rhs: Self, signed: bool) -> (Self, bool) {
        let (raw, borrow) = sub_limbs(&self.limbs, &rhs.limbs, self.limb_count());
        let result = self.with_limbs(raw);
        let overflow = if signed {
            self.sign_bit() != rhs.sign_bit() && result.sign_bit() != self.sign_bit()
        } else {
            borrow
        };
        (result, overflow)
    }

    /// Wrapping multiplication and its overflow flag.
    #[must_use]
    pub fn overflowing_mul(self, rhs: Self, signed: bool) -> (Self, bool) {
        let n = self.limb_count();
        let bits = u32::from(self.bits);
        let product = full_product(&self.limbs, &rhs.limbs, n);
        let mut low = [0u64; MAX_LIMBS];
        low.copy_from_slice(&product[..MAX_LIMBS]);
        let result = self.with_limbs(low);

        let overflow = if signed {
            let magnitude = full_product(&self.magnitude().limbs, &rhs.magnitude().limbs, n);
            let negative = self.sign_bit() != rhs.sign_bit();
            exceeds(&magnitude, bits - 1) && !(negative && is_power_of_two_at(&magnitude, bits - 1))
        } else {
            exceeds(&product, bits)
        };
        (result, overflow)
    }

    fn unsigned_div_rem(self, rhs: Self) -> (Self, Self) {
        if self.limb_count() == 1 {
            return (
                Self::from_u64(self.bits, self.limbs[0] / rhs.limbs[0]),
                Self::from_u64(self.bits, self.limbs[0] % rhs.limbs[0]),
            );
        }
        let bits = u32::from(self.bits);
        let mut quotient = Self::zero(self.bits);
        let mut remainder = Self::zero(self.bits);
        for i in (0..bits).rev() {
            let carried_out = remainder.sign_bit();
            remainder = remainder.with_limbs(shl_limbs(&remainder.limbs, 1));
            if self.bit(i) {
                remainder.limbs[0] |= 1;
            }
            if carried_out || remainder.ucmp(&rhs) != Ordering::Less {
                remainder = remainder.overflowing_sub(rhs, false).0;
                quotient.set_bit(i);
            }
        }
        (quotient, remainder)
    }

    fn div_rem(self, rhs: Self, signed: bool) -> Option<(Self, Self, bool)> {
        if rhs.is_zero() {
            return None;
        }
        if !signed {
            let (q, r) = self.unsigned_div_rem(rhs);
            return Some((q, r, false));
        }
        if self == Self::min_signed(self.bits) && rhs == Self::max_value(self.bits) {
            return Some((self, Self::zero(self.bits), true));
        }
        let (q, r) = self.magnitude().unsigned_div_rem(rhs.magnitude());
        let q = if self.sign_bit() == rhs.sign_bit() { q } else { q.wrapping_neg() };
        let r = if self.sign_bit() { r.wrapping_neg() } else { r };
        Some((q, r, false))
    }

    /// Quotient and overflow flag; `None` on division by zero.
    ///
    /// Signed division truncates toward zero.
    #[must_use]
    pub fn overflowing_div(self, rhs: Self, signed: bool) -> Option<(Self, bool)> {
        self.div_rem(rhs, signed).map(|(q, _, overflow)| (q, overflow))
    }

    /// Remainder and overflow flag; `None` on division by zero.
    ///
    /// A signed remainder takes the sign of the dividend.
    #[must_use]
    pub fn overflowing_rem(self, rhs: Self, signed: bool) -> Option<(Self, bool)> {
        self.div_rem(rhs, signed).map(|(_, r, overflow)| (r, overflow))
    }

    /// Two's complement negation; overflows only for the most negative value.
    #[must_use]
    pub fn overflowing_neg(self) -> (Self, bool) {
        (self.wrapping_neg(), self == Self::min_signed(self.bits))
    }

    /// Bitwise and.
    #[must_use]
    pub fn bit_and(self, rhs: Self) -> Self {
        let mut limbs = self.limbs;
        for (limb, other) in limbs.iter_mut().zip(rhs.limbs) {
            *limb &= other;
        }
        self.with_limbs(limbs)
    }

    /// Bitwise or.
    #[must_use]
    pub fn bit_or(self, rhs: Self) -> Self {
        let mut limbs = self.limbs;
        for (limb, other) in limbs.iter_mut().zip(rhs.limbs) {
            *limb |= other;
        }
        self.with_limbs(limbs)
    }

    /// Bitwise exclusive or.
    #[must_use]
    pub fn bit_xor(self, rhs: Self) -> Self {
        let mut limbs = self.limbs;
        for (limb, other) in limbs.iter_mut().zip(rhs.limbs) {
            *limb ^= other;
        }
        self.with_limbs(limbs)
    }

    /// Bitwise complement within the width.
    #[must_use]
    pub fn complement(self) -> Self {
        let mut limbs = self.limbs;
        for limb in &mut limbs {
            *limb = !*limb;
        }
        self.with_limbs(limbs)
    }

    /// Logical left shift. The flag reports whether a set bit was shifted out.
    ///
    /// Shifting by the width or more yields zero.
    #[must_use]
    pub fn overflowing_shl(self, amount: u32) -> (Self, bool) {
        let bits = u32::from(self.bits);
        if amount == 0 {
            return (self, false);
        }
        if amount >= bits {
            return (Self::zero(self.bits), !self.is_zero());
        }
        let result = self.with_limbs(shl_limbs(&self.limbs, amount));
        let lost = !self.with_limbs(shr_limbs(&self.limbs, bits - amount)).is_zero();
        (result, lost)
    }

    /// Logical right shift. The flag reports whether a set bit was shifted out.
    ///
    /// Shifting by the width or more yields zero.
    #[must_use]
    pub fn overflowing_shr(self, amount: u32) -> (Self, bool) {
        let bits = u32::from(self.bits);
        if amount == 0 {
            return (self, false);
        }
        if amount >= bits {
            return (Self::zero(self.bits), !self.is_zero());
        }
        let result = self.with_limbs(shr_limbs(&self.limbs, amount));
        let lost = !self.with_limbs(shl_limbs(&self.limbs, bits - amount)).is_zero();
        (result, lost)
    }

    /// Left rotation by `amount` modulo the width.
    #[must_use]
    pub fn rotate_left(self, amount: u32) -> Self {
        let bits = u32::from(self.bits);
        let k = amount % bits;
        if k == 0 {
            return self;
        }
        let high = shl_limbs(&self.limbs, k);
        let low = shr_limbs(&self.limbs, bits - k);
        self.with_limbs(high).bit_or(self.with_limbs(low))
    }

    /// Right rotation by `amount` modulo the width.
    #[must_use]
    pub fn rotate_right(self, amount: u32) -> Self {
        let bits = u32::from(self.bits);
        let k = amount % bits;
        if k == 0 {
            self
        } else {
            self.rotate_left(bits - k)
        }
    }

    /// Unsigned comparison.
    #[must_use]
    pub fn ucmp(&self, rhs: &Self) -> Ordering {
        self.limbs.iter().rev().cmp(rhs.limbs.iter().rev())
    }

    /// Two's complement comparison.
    #[must_use]
    pub fn scmp(&self, rhs: &Self) -> Ordering {
        match (self.sign_bit(), rhs.sign_bit()) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => self.ucmp(rhs),
        }
    }

    fn resize(self, bits: u16, signed: bool) -> Self {
        let mut limbs = self.limbs;
        if signed && bits > self.bits && self.sign_bit() {
            let from = u32::from(self.bits);
            let limb = (from / 64) as usize;
            let rem = from % 64;
            let start = if rem == 0 {
                limb
            } else {
                limbs[limb] |= u64::MAX << rem;
                limb + 1
            };
            for word in &mut limbs[start..] {
                *word = u64::MAX;
            }
        }
        Self { limbs, bits }.normalized()
    }

    /// Converts to another width, zero- or sign-extending when widening and
    /// truncating when narrowing. The flag reports whether the value changed.
    #[must_use]
    pub fn convert(self, bits: u16, signed: bool) -> (Self, bool) {
        let result = self.resize(bits, signed);
        let lost = result.resize(self.bits, signed) != self;
        (result, lost)
    }
}

#[cfg(test)]
mod tests {
    use core::cmp::Ordering;

    use proptest::prelude::*;

    use super::Uint;

    macro_rules! native_width_suite {
        ($name:ident, $u:ty, $i:ty, $bits:expr) => {
            mod $name {
                use super::*;

                fn u(v: $u) -> Uint {
                    Uint::from_u128($bits, v as u128)
                }

                fn s(v: $i) -> Uint {
                    Uint::from_u128($bits, v as $u as u128)
                }

                proptest! {
                    #[test]
                    fn unsigned_ops_match_native(a in any::<$u>(), b in any::<$u>()) {
                        let (sum, o) = a.overflowing_add(b);
                        prop_assert_eq!(u(a).overflowing_add(u(b), false), (u(sum), o));
                        let (diff, o) = a.overflowing_sub(b);
                        prop_assert_eq!(u(a).overflowing_sub(u(b), false), (u(diff), o));
                        let (prod, o) = a.overflowing_mul(b);
                        prop_assert_eq!(u(a).overflowing_mul(u(b), false), (u(prod), o));
                        prop_assert_eq!(u(a).overflowing_div(u(b), false), a.checked_div(b).map(|q| (u(q), false)));
                        prop_assert_eq!(u(a).overflowing_rem(u(b), false), a.checked_rem(b).map(|r| (u(r), false)));
                        prop_assert_eq!(u(a).ucmp(&u(b)), a.cmp(&b));
                    }

                    #[test]
                    fn signed_ops_match_native(a in any::<$i>(), b in any::<$i>()) {
                        let (sum, o) = a.overflowing_add(b);
                        prop_assert_eq!(s(a).overflowing_add(s(b), true), (s(sum), o));
                        let (diff, o) = a.overflowing_sub(b);
                        prop_assert_eq!(s(a).overflowing_sub(s(b), true), (s(diff), o));
                        let (prod, o) = a.overflowing_mul(b);
                        prop_assert_eq!(s(a).overflowing_mul(s(b), true), (s(prod), o));
                        let (neg, o) = a.overflowing_neg();
                        prop_assert_eq!(s(a).overflowing_neg(), (s(neg), o));
                        if b != 0 {
                            let (q, o) = a.overflowing_div(b);
                            prop_assert_eq!(s(a).overflowing_div(s(b), true), Some((s(q), o)));
                            let (r, o) = a.overflowing_rem(b);
                            prop_assert_eq!(s(a).overflowing_rem(s(b), true), Some((s(r), o)));
                        }
                        prop_assert_eq!(s(a).scmp(&s(b)), a.cmp(&b));
                    }

                    #[test]
                    fn shifts_match_native(a in any::<$u>(), amount in 0u32..($bits as u32 * 2)) {
                        let bits = $bits as u32;
                        let expected_shl = if amount >= bits { 0 } else { a << amount };
                        let lost_shl = amount > 0 && (amount >= bits && a != 0 || amount < bits && (a >> (bits - amount)) != 0);
                        prop_assert_eq!(u(a).overflowing_shl(amount), (u(expected_shl), lost_shl));

                        let expected_shr = if amount >= bits { 0 } else { a >> amount };
                        let lost_shr = amount > 0 && (amount >= bits && a != 0 || amount < bits && (a << (bits - amount)) != 0);
                        prop_assert_eq!(u(a).overflowing_shr(amount), (u(expected_shr), lost_shr));

                        prop_assert_eq!(u(a).rotate_left(amount), u(a.rotate_left(amount)));
                        prop_assert_eq!(u(a).rotate_right(amount), u(a.rotate_right(amount)));
                    }
                }
            }
        };
    }

    native_width_suite!(w8, u8, i8, 8u16);
    native_width_suite!(w16, u16, i16, 16u16);
    native_width_suite!(w32, u32, i32, 32u16);
    native_width_suite!(w64, u64, i64, 64u16);
    native_width_suite!(w128, u128, i128, 128u16);

    #[test]
    fn signed_edge_cases_report_overflow() {
        let min = Uint::min_signed(256);
        let minus_one = Uint::max_value(256);
        assert_eq!(min.overflowing_div(minus_one, true), Some((min, true)));
        assert_eq!(min.overflowing_rem(minus_one, true), Some((Uint::zero(256), true)));
        assert_eq!(min.overflowing_neg(), (min, true));
        assert_eq!(Uint::from_u64(256, 5).overflowing_div(Uint::zero(256), false), None);
    }

    #[test]
    fn wide_addition_carries_across_limbs() {
        let max = Uint::max_value(1024);
        let one = Uint::from_u64(1024, 1);
        assert_eq!(max.overflowing_add(one, false), (Uint::zero(1024), true));
        let (sum, overflow) = Uint::from_u128(256, u128::MAX).overflowing_add(one, false);
        assert!(!overflow);
        assert!(sum.bit(128));
        assert_eq!(sum.low_u128(), 0);
    }

    #[test]
    fn wide_multiplication_detects_overflow() {
        let half = Uint::min_signed(512).overflowing_shr(256).0;
        let (product, overflow) = half.overflowing_mul(half, false);
        assert!(!overflow);
        assert!(product.bit(510));
        let (_, overflow) = Uint::min_signed(512).overflowing_mul(Uint::from_u64(512, 2), false);
        assert!(overflow);
        let min = Uint::min_signed(512);
        let (product, overflow) = min.overflowing_shr(1).0.overflowing_neg().0.overflowing_mul(Uint::from_u64(512, 2), true);
        assert_eq!((product, overflow), (min, false));
    }

    #[test]
    fn wide_division_matches_long_hand() {
        let a = Uint::from_u128(1024, u128::MAX).overflowing_shl(700).0;
        let b = Uint::from_u128(1024, 3).overflowing_shl(500).0;
        let (q, _) = a.overflowing_div(b, false).expect("non-zero divisor");
        let (r, _) = a.overflowing_rem(b, false).expect("non-zero divisor");
        let (back, overflow) = q.overflowing_mul(b, false);
        assert!(!overflow);
        assert_eq!(back.overflowing_add(r, false).0, a);
        assert_eq!(r.ucmp(&b), Ordering::Less);
    }

    #[test]
    fn conversion_reports_loss() {
        let neg_one_8 = Uint::max_value(8);
        let (wide, lost) = neg_one_8.convert(64, true);
        assert_eq!((wide, lost), (Uint::max_value(64), false));
        let (wide, lost) = neg_one_8.convert(64, false);
        assert_eq!((wide.low_u64(), lost), (0xFF, false));
        let (narrow, lost) = Uint::from_u64(32, 0x1FF).convert(8, false);
        assert_eq!((narrow.low_u64(), lost), (0xFF, true));
        let (narrow, lost) = Uint::max_value(1024).convert(8, true);
        assert_eq!((narrow, lost), (Uint::max_value(8), false));
        let (narrow, lost) = Uint::from_u64(16, 0x80).convert(8, true);
        assert_eq!((narrow.low_u64(), lost), (0x80, true));
    }

    #[test]
    fn byte_images_roundtrip() {
        let bytes: Vec<u8> = (0..=127).collect();
        let value = Uint::from_le_bytes(1024, &bytes);
        let mut out = vec![0u8; 128];
        value.write_le_bytes(&mut out);
        assert_eq!(out, bytes);
        let mut short = [0u8; 2];
        Uint::from_u64(16, 0xBEEF).write_le_bytes(&mut short);
        assert_eq!(short, [0xEF, 0xBE]);
    }
}
