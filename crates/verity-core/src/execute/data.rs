//! Register moves and segment access.

use crate::alu::Uint;
use crate::context::ExecutionContext;
use crate::decoder::Instruction;
use crate::fault::FaultCode;
use crate::memory::Segment;
use crate::state::{Bank, RegIdx};

/// Widest register in bytes.
const MAX_SLOT_BYTES: usize = 128;

/// Copies one register into a stack buffer so it can be written elsewhere.
fn snapshot(ctx: &ExecutionContext, bank: Bank, idx: RegIdx) -> ([u8; MAX_SLOT_BYTES], usize) {
    let slot = ctx.registers.slot(bank, idx);
    let mut buf = [0u8; MAX_SLOT_BYTES];
    buf[..slot.len()].copy_from_slice(slot);
    (buf, slot.len())
}

pub(super) fn register(ctx: &mut ExecutionContext, instruction: &Instruction) {
    match *instruction {
        Instruction::Put { bank, dst, imm } => {
            ctx.registers
                .slot_mut(bank, dst)
                .copy_from_slice(&imm[..bank.bytes()]);
        }
        Instruction::Mov { bank, dst, src } => {
            let (buf, len) = snapshot(ctx, bank, src);
            ctx.registers.slot_mut(bank, dst).copy_from_slice(&buf[..len]);
        }
        Instruction::Swp { bank, a, b } => ctx.registers.swap(bank, a, b),
        Instruction::Clr { bank, dst } => ctx.registers.slot_mut(bank, dst).fill(0),
        Instruction::Conv { dst_bank, dst, src_bank, src, signed } => {
            let value = Uint::from_le_bytes(src_bank.bits(), ctx.registers.slot(src_bank.bank(), src));
            let (converted, lost) = value.convert(dst_bank.bits(), signed);
            converted.write_le_bytes(ctx.registers.slot_mut(dst_bank.bank(), dst));
            ctx.control.set_carry(lost);
        }
        _ => {}
    }
}

pub(super) fn memory(ctx: &mut ExecutionContext, instruction: &Instruction) -> Result<(), FaultCode> {
    match *instruction {
        Instruction::Ldc { bank, dst, offset } => load(ctx, Segment::Constant, bank, dst, u32::from(offset)),
        Instruction::Ld { seg, bank, dst, addr } => {
            let addr = ctx.registers.a32(addr);
            load(ctx, seg, bank, dst, addr)
        }
        Instruction::St { seg, bank, src, addr } => {
            let addr = ctx.registers.a32(addr);
            let (buf, len) = snapshot(ctx, bank, src);
            ctx.memory.write(seg, addr, &buf[..len])
        }
        Instruction::Len { seg, dst } => {
            let len = ctx.memory.len(seg, ctx.program.constants());
            ctx.registers.set_a32(dst, u32::try_from(len).unwrap_or(u32::MAX));
            Ok(())
        }
        _ => Ok(()),
    }
}

fn load(
    ctx: &mut ExecutionContext,
    seg: Segment,
    bank: Bank,
    dst: RegIdx,
    addr: u32,
) -> Result<(), FaultCode> {
    let bytes = ctx
        .memory
        .read(seg, ctx.program.constants(), addr, bank.bytes())?;
    ctx.registers.slot_mut(bank, dst).copy_from_slice(bytes);
    Ok(())
}
