//! Instruction execution.
//!
//! The context charges complexity before calling in here, so execution only
//! has to apply the instruction. Every fault is raised before the first
//! architectural write of the faulting instruction.

#![allow(clippy::cast_possible_truncation, clippy::cast_lossless)]

mod arith;
mod control;
mod crypto;
mod data;

use crate::api::TraceSink;
use crate::context::ExecutionContext;
use crate::decoder::{Decoded, Instruction};
use crate::fault::FaultCode;
use crate::library::LibraryResolver;

/// Where execution continues after an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    /// Fall through to the next instruction.
    Next,
    /// Continue at an offset of the program now executing.
    Jump(u16),
    /// `stop` executed.
    Halt,
}

/// Applies one decoded instruction to the context.
///
/// Failure-flag changes are reported through the control registers; only
/// hard faults are returned as errors.
pub(crate) fn execute_instruction(
    ctx: &mut ExecutionContext,
    decoded: &Decoded,
    resolver: &dyn LibraryResolver,
    trace: &mut dyn TraceSink,
) -> Result<Flow, FaultCode> {
    match decoded.instruction {
        Instruction::Nop => {}
        Instruction::Stop => return Ok(Flow::Halt),
        Instruction::Fail => ctx.control.raise_failure(),
        Instruction::Succ => ctx.control.clear_failure(),
        Instruction::AutoHalt { enabled } => ctx.control.set_auto_halt(enabled),
        Instruction::InvCarry => {
            let carry = ctx.control.carry();
            ctx.control.set_carry(!carry);
        }
        Instruction::ClearCarry => ctx.control.set_carry(false),

        Instruction::Jmp { .. }
        | Instruction::Jmpr { .. }
        | Instruction::Jif { .. }
        | Instruction::Jifr { .. } => return control::jump(ctx, decoded),
        Instruction::Call { target } => return control::call(ctx, target, decoded.next),
        Instruction::CallLib { library, entry } => {
            return control::call_library(ctx, library, entry, decoded.next, resolver, trace)
        }
        Instruction::Ret => return control::ret(ctx, trace),

        Instruction::Put { .. }
        | Instruction::Mov { .. }
        | Instruction::Swp { .. }
        | Instruction::Clr { .. }
        | Instruction::Conv { .. } => data::register(ctx, &decoded.instruction),
        Instruction::Ldc { .. }
        | Instruction::Ld { .. }
        | Instruction::St { .. }
        | Instruction::Len { .. } => data::memory(ctx, &decoded.instruction)?,

        Instruction::Arith { op, signed, bank, dst, a, b } => {
            arith::integer(ctx, op, signed, bank, dst, a, b);
        }
        Instruction::Neg { .. }
        | Instruction::Compare { .. }
        | Instruction::Bitwise { .. }
        | Instruction::Not { .. }
        | Instruction::Shift { .. } => arith::logic(ctx, &decoded.instruction),
        Instruction::Float { .. } | Instruction::FNeg { .. } | Instruction::FCompare { .. } => {
            arith::float(ctx, &decoded.instruction);
        }

        Instruction::Sha3 { .. }
        | Instruction::Sha3Mem { .. }
        | Instruction::VerifySchnorr { .. }
        | Instruction::VerifyEcdsa { .. }
        | Instruction::VerifyMerkle { .. } => crypto::execute(ctx, &decoded.instruction)?,
    }
    Ok(Flow::Next)
}
