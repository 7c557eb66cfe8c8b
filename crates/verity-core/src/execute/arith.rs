//! Integer and float ALU instructions.

use core::cmp::Ordering;

use crate::alu::{float, Uint};
use crate::context::ExecutionContext;
use crate::decoder::{BitOp, CmpOp, Instruction, IntOp, ShiftOp};
use crate::state::{IntBank, RegIdx};

fn read(ctx: &ExecutionContext, bank: IntBank, idx: RegIdx) -> Uint {
    Uint::from_le_bytes(bank.bits(), ctx.registers.slot(bank.bank(), idx))
}

fn write(ctx: &mut ExecutionContext, bank: IntBank, idx: RegIdx, value: Uint) {
    value.write_le_bytes(ctx.registers.slot_mut(bank.bank(), idx));
}

/// Add, subtract, multiply, divide and remainder.
///
/// The carry flag receives the overflow flag. Division by zero leaves the
/// destination and carry untouched and raises the failure flag instead.
pub(super) fn integer(
    ctx: &mut ExecutionContext,
    op: IntOp,
    signed: bool,
    bank: IntBank,
    dst: RegIdx,
    a: RegIdx,
    b: RegIdx,
) {
    let (x, y) = (read(ctx, bank, a), read(ctx, bank, b));
    let result = match op {
        IntOp::Add => Some(x.overflowing_add(y, signed)),
        IntOp::Sub => Some(x.overflowing_sub(y, signed)),
        IntOp::Mul => Some(x.overflowing_mul(y, signed)),
        IntOp::Div => x.overflowing_div(y, signed),
        IntOp::Rem => x.overflowing_rem(y, signed),
    };
    match result {
        Some((value, overflow)) => {
            write(ctx, bank, dst, value);
            ctx.control.set_carry(overflow);
        }
        None => ctx.control.raise_failure(),
    }
}

pub(super) fn logic(ctx: &mut ExecutionContext, instruction: &Instruction) {
    match *instruction {
        Instruction::Neg { bank, dst, src } => {
            let (value, overflow) = read(ctx, bank, src).overflowing_neg();
            write(ctx, bank, dst, value);
            ctx.control.set_carry(overflow);
        }
        Instruction::Compare { op, bank, a, b } => {
            let (x, y) = (read(ctx, bank, a), read(ctx, bank, b));
            let holds = match op {
                CmpOp::Eq => x == y,
                CmpOp::Lt => x.ucmp(&y) == Ordering::Less,
                CmpOp::LtSigned => x.scmp(&y) == Ordering::Less,
            };
            ctx.control.set_carry(holds);
        }
        Instruction::Bitwise { op, bank, dst, a, b } => {
            let (x, y) = (read(ctx, bank, a), read(ctx, bank, b));
            let value = match op {
                BitOp::And => x.bit_and(y),
                BitOp::Or => x.bit_or(y),
                BitOp::Xor => x.bit_xor(y),
            };
            write(ctx, bank, dst, value);
        }
        Instruction::Not { bank, dst, src } => {
            let value = read(ctx, bank, src).complement();
            write(ctx, bank, dst, value);
        }
        Instruction::Shift { op, bank, dst, src, amount } => {
            let value = read(ctx, bank, src);
            let amount = u32::from(ctx.registers.a16(amount));
            match op {
                ShiftOp::Shl | ShiftOp::Shr => {
                    let (shifted, lost) = if op == ShiftOp::Shl {
                        value.overflowing_shl(amount)
                    } else {
                        value.overflowing_shr(amount)
                    };
                    write(ctx, bank, dst, shifted);
                    ctx.control.set_carry(lost);
                }
                ShiftOp::Rol => write(ctx, bank, dst, value.rotate_left(amount)),
                ShiftOp::Ror => write(ctx, bank, dst, value.rotate_right(amount)),
            }
        }
        _ => {}
    }
}

/// Float arithmetic leaves the carry flag alone; comparisons write it.
pub(super) fn float(ctx: &mut ExecutionContext, instruction: &Instruction) {
    match *instruction {
        Instruction::Float { op, bank, dst, a, b } => {
            let x = ctx.registers.read_u64(bank.bank(), a);
            let y = ctx.registers.read_u64(bank.bank(), b);
            ctx.registers
                .write_u64(bank.bank(), dst, float::arith(bank, op, x, y));
        }
        Instruction::FNeg { bank, dst, src } => {
            let x = ctx.registers.read_u64(bank.bank(), src);
            ctx.registers.write_u64(bank.bank(), dst, float::negate(bank, x));
        }
        Instruction::FCompare { op, bank, a, b } => {
            let x = ctx.registers.read_u64(bank.bank(), a);
            let y = ctx.registers.read_u64(bank.bank(), b);
            ctx.control.set_carry(float::compare(bank, op, x, y));
        }
        _ => {}
    }
}
