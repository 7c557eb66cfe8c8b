//! IEEE 754 arithmetic on raw register bit patterns.
//!
//! Results are rounded to nearest, ties to even. Binary16 operations are
//! evaluated in binary32 and rounded once, which is exact for the basic
//! operations. Every NaN result is replaced by the canonical quiet NaN of
//! its width so results never depend on host NaN payload propagation.

#![allow(clippy::cast_possible_truncation)]

use half::f16;

use crate::decoder::{FloatCmp, FloatOp};
use crate::state::FloatBank;

/// Canonical quiet NaN for binary16.
pub const CANONICAL_NAN_F16: u16 = 0x7E00;
/// Canonical quiet NaN for binary32.
pub const CANONICAL_NAN_F32: u32 = 0x7FC0_0000;
/// Canonical quiet NaN for binary64.
pub const CANONICAL_NAN_F64: u64 = 0x7FF8_0000_0000_0000;

fn apply<T>(op: FloatOp, a: T, b: T) -> T
where
    T: core::ops::Add<Output = T>
        + core::ops::Sub<Output = T>
        + core::ops::Mul<Output = T>
        + core::ops::Div<Output = T>,
{
    match op {
        FloatOp::Add => a + b,
        FloatOp::Sub => a - b,
        FloatOp::Mul => a * b,
        FloatOp::Div => a / b,
    }
}

/// Applies a binary operation to two raw register values.
#[must_use]
pub fn arith(bank: FloatBank, op: FloatOp, a: u64, b: u64) -> u64 {
    match bank {
        FloatBank::F16 => {
            let x = f16::from_bits(a as u16).to_f32();
            let y = f16::from_bits(b as u16).to_f32();
            let result = f16::from_f32(apply(op, x, y));
            if result.is_nan() {
                u64::from(CANONICAL_NAN_F16)
            } else {
                u64::from(result.to_bits())
            }
        }
        FloatBank::F32 => {
            let result = apply(op, f32::from_bits(a as u32), f32::from_bits(b as u32));
            if result.is_nan() {
                u64::from(CANONICAL_NAN_F32)
            } else {
                u64::from(result.to_bits())
            }
        }
        FloatBank::F64 => {
            let result = apply(op, f64::from_bits(a), f64::from_bits(b));
            if result.is_nan() {
                CANONICAL_NAN_F64
            } else {
                result.to_bits()
            }
        }
    }
}

/// Flips the sign bit.
#[must_use]
pub const fn negate(bank: FloatBank, a: u64) -> u64 {
    let sign = match bank {
        FloatBank::F16 => 1 << 15,
        FloatBank::F32 => 1 << 31,
        FloatBank::F64 => 1 << 63,
    };
    a ^ sign
}

/// Ordered comparison; any NaN operand compares false.
#[must_use]
pub fn compare(bank: FloatBank, op: FloatCmp, a: u64, b: u64) -> bool {
    let (x, y) = match bank {
        FloatBank::F16 => (
            f64::from(f16::from_bits(a as u16).to_f32()),
            f64::from(f16::from_bits(b as u16).to_f32()),
        ),
        FloatBank::F32 => (
            f64::from(f32::from_bits(a as u32)),
            f64::from(f32::from_bits(b as u32)),
        ),
        FloatBank::F64 => (f64::from_bits(a), f64::from_bits(b)),
    };
    match op {
        FloatCmp::Eq => x == y,
        FloatCmp::Lt => x < y,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]

    use half::f16;
    use proptest::prelude::*;

    use super::{arith, compare, negate, CANONICAL_NAN_F16, CANONICAL_NAN_F32, CANONICAL_NAN_F64};
    use crate::decoder::{FloatCmp, FloatOp};
    use crate::state::FloatBank;

    fn f32_bits(v: f32) -> u64 {
        u64::from(v.to_bits())
    }

    #[test]
    fn nan_results_are_canonical() {
        let inf = f32_bits(f32::INFINITY);
        assert_eq!(arith(FloatBank::F32, FloatOp::Sub, inf, inf), u64::from(CANONICAL_NAN_F32));
        let payload_nan = 0x7FF0_0000_0000_0001;
        assert_eq!(arith(FloatBank::F64, FloatOp::Add, payload_nan, 0), CANONICAL_NAN_F64);
        let zero16 = u64::from(f16::ZERO.to_bits());
        assert_eq!(arith(FloatBank::F16, FloatOp::Div, zero16, zero16), u64::from(CANONICAL_NAN_F16));
    }

    #[test]
    fn half_precision_rounds_to_nearest_even() {
        let one = u64::from(f16::ONE.to_bits());
        let eps_half = u64::from(f16::from_f32(f16::EPSILON.to_f32() / 2.0).to_bits());
        assert_eq!(arith(FloatBank::F16, FloatOp::Add, one, eps_half), one);
        let max = u64::from(f16::MAX.to_bits());
        assert_eq!(
            arith(FloatBank::F16, FloatOp::Add, max, max),
            u64::from(f16::INFINITY.to_bits())
        );
    }

    #[test]
    fn negation_and_comparison() {
        let two = f32_bits(2.0);
        assert_eq!(negate(FloatBank::F32, two), f32_bits(-2.0));
        assert!(compare(FloatBank::F32, FloatCmp::Lt, negate(FloatBank::F32, two), two));
        assert!(compare(FloatBank::F32, FloatCmp::Eq, f32_bits(0.0), f32_bits(-0.0)));
        let nan = u64::from(CANONICAL_NAN_F32);
        assert!(!compare(FloatBank::F32, FloatCmp::Eq, nan, nan));
        assert!(!compare(FloatBank::F32, FloatCmp::Lt, nan, two));
    }

    proptest! {
        #[test]
        fn binary64_matches_host_for_non_nan(a in any::<f64>(), b in any::<f64>()) {
            let got = arith(FloatBank::F64, FloatOp::Mul, a.to_bits(), b.to_bits());
            let expected = a * b;
            if expected.is_nan() {
                prop_assert_eq!(got, CANONICAL_NAN_F64);
            } else {
                prop_assert_eq!(got, expected.to_bits());
            }
        }
    }
}
