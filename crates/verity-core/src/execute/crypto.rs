//! Hash and verification instructions.
//!
//! A verification that does not hold raises the failure flag. Reading the
//! hashed range or the Merkle proof out of bounds is a segment fault.

use crate::alu::{sha3_256, verify_ecdsa, verify_merkle, verify_schnorr, DIGEST_BYTES, MERKLE_MAX_DEPTH};
use crate::context::ExecutionContext;
use crate::decoder::Instruction;
use crate::fault::FaultCode;
use crate::memory::Segment;
use crate::state::{Bank, RegIdx};

/// Merkle proof header: depth byte and little-endian leaf index.
const MERKLE_HEADER_BYTES: usize = 1 + 4;

fn digest_register(ctx: &ExecutionContext, idx: RegIdx) -> [u8; DIGEST_BYTES] {
    let mut out = [0u8; DIGEST_BYTES];
    out.copy_from_slice(ctx.registers.slot(Bank::R256, idx));
    out
}

pub(super) fn execute(ctx: &mut ExecutionContext, instruction: &Instruction) -> Result<(), FaultCode> {
    match *instruction {
        Instruction::Sha3 { bank, dst, src } => {
            let digest = sha3_256(ctx.registers.slot(bank.bank(), src));
            ctx.registers.slot_mut(Bank::R256, dst).copy_from_slice(&digest);
        }
        Instruction::Sha3Mem { seg, dst, addr, len } => {
            let addr = ctx.registers.a32(addr);
            let len = ctx.registers.a32(len) as usize;
            let bytes = ctx.memory.read(seg, ctx.program.constants(), addr, len)?;
            let digest = sha3_256(bytes);
            ctx.registers.slot_mut(Bank::R256, dst).copy_from_slice(&digest);
        }
        Instruction::VerifySchnorr { pk, sig, msg } => {
            let valid = verify_schnorr(
                ctx.registers.slot(Bank::R256, pk),
                ctx.registers.slot(Bank::R512, sig),
                ctx.registers.slot(Bank::R256, msg),
            );
            if !valid {
                ctx.control.raise_failure();
            }
        }
        Instruction::VerifyEcdsa { pk, sig, msg } => {
            let valid = verify_ecdsa(
                ctx.registers.slot(Bank::R512, pk),
                ctx.registers.slot(Bank::R512, sig),
                ctx.registers.slot(Bank::R256, msg),
            );
            if !valid {
                ctx.control.raise_failure();
            }
        }
        Instruction::VerifyMerkle { root, leaf, seg, addr } => {
            if !merkle(ctx, root, leaf, seg, ctx.registers.a32(addr))? {
                ctx.control.raise_failure();
            }
        }
        _ => {}
    }
    Ok(())
}

/// Reads a proof from memory and checks it.
///
/// The header is read first; an over-deep proof is rejected without
/// reading its siblings.
fn merkle(
    ctx: &ExecutionContext,
    root: RegIdx,
    leaf: RegIdx,
    seg: Segment,
    addr: u32,
) -> Result<bool, FaultCode> {
    let constants = ctx.program.constants();
    let header = ctx.memory.read(seg, constants, addr, MERKLE_HEADER_BYTES)?;
    let depth = usize::from(header[0]);
    let index = u32::from_le_bytes([header[1], header[2], header[3], header[4]]);
    if depth > MERKLE_MAX_DEPTH {
        return Ok(false);
    }

    let siblings_at = addr
        .checked_add(MERKLE_HEADER_BYTES as u32)
        .ok_or(FaultCode::SegmentOutOfBounds)?;
    let raw = ctx
        .memory
        .read(seg, constants, siblings_at, depth * DIGEST_BYTES)?;
    let mut siblings = [[0u8; DIGEST_BYTES]; MERKLE_MAX_DEPTH];
    for (sibling, chunk) in siblings.iter_mut().zip(raw.chunks_exact(DIGEST_BYTES)) {
        sibling.copy_from_slice(chunk);
    }

    Ok(verify_merkle(
        &digest_register(ctx, root),
        &digest_register(ctx, leaf),
        index,
        &siblings[..depth],
    ))
}
