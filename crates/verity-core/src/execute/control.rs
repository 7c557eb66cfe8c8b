//! Jumps, calls, returns and library transfers.

use super::Flow;
use crate::api::{TraceEvent, TraceSink};
use crate::context::ExecutionContext;
use crate::decoder::{Decoded, Instruction};
use crate::fault::FaultCode;
use crate::library::LibraryResolver;
use crate::memory::Frame;
use crate::monitor::record_cycle;
use crate::program::{Program, ProgramId};

pub(super) fn jump(ctx: &mut ExecutionContext, decoded: &Decoded) -> Result<Flow, FaultCode> {
    let taken = match decoded.instruction {
        Instruction::Jif { cond, .. } | Instruction::Jifr { cond, .. } => {
            cond.holds(ctx.control.carry(), ctx.control.failure())
        }
        _ => true,
    };
    if !taken {
        return Ok(Flow::Next);
    }
    let target = decoded.local_target().ok_or(FaultCode::IllegalInstruction)?;
    record_cycle(&mut ctx.control)?;
    Ok(Flow::Jump(target))
}

/// Pushes a return frame once the stack and the cycle counter both allow it.
fn enter(ctx: &mut ExecutionContext, frame: Frame) -> Result<(), FaultCode> {
    if !ctx.call_stack.fits(&frame) {
        return Err(FaultCode::StackOverflow);
    }
    record_cycle(&mut ctx.control)?;
    ctx.call_stack.push(frame)
}

pub(super) fn call(ctx: &mut ExecutionContext, target: u16, ret: u16) -> Result<Flow, FaultCode> {
    enter(ctx, Frame::Local { ret })?;
    Ok(Flow::Jump(target))
}

/// Finds a library in the context cache or asks the host for it.
fn resolve(
    ctx: &ExecutionContext,
    library: ProgramId,
    resolver: &dyn LibraryResolver,
) -> Result<Program, FaultCode> {
    if let Some(program) = ctx.libraries.get(&library) {
        return Ok(program.clone());
    }
    let program = resolver
        .resolve_library(&library)
        .ok_or(FaultCode::LibraryNotFound)?;
    if program.id() != library {
        return Err(FaultCode::LibraryMismatch);
    }
    Ok(program)
}

pub(super) fn call_library(
    ctx: &mut ExecutionContext,
    library: ProgramId,
    entry: u16,
    ret: u16,
    resolver: &dyn LibraryResolver,
    trace: &mut dyn TraceSink,
) -> Result<Flow, FaultCode> {
    let program = resolve(ctx, library, resolver)?;
    if !program.is_boundary(entry) {
        return Err(FaultCode::InvalidLibraryEntry);
    }
    let caller = ctx.program.id();
    enter(ctx, Frame::Library { caller, ret })?;
    ctx.libraries.entry(library).or_insert_with(|| program.clone());
    ctx.program = program;
    trace.on_event(TraceEvent::LibraryCall { library, entry });
    Ok(Flow::Jump(entry))
}

pub(super) fn ret(ctx: &mut ExecutionContext, trace: &mut dyn TraceSink) -> Result<Flow, FaultCode> {
    if ctx.call_stack.is_empty() {
        return Err(FaultCode::StackUnderflow);
    }
    record_cycle(&mut ctx.control)?;
    match ctx.call_stack.pop()? {
        Frame::Local { ret } => Ok(Flow::Jump(ret)),
        Frame::Library { caller, ret } => {
            let program = ctx
                .libraries
                .get(&caller)
                .cloned()
                .ok_or(FaultCode::LibraryNotFound)?;
            ctx.program = program;
            trace.on_event(TraceEvent::LibraryReturn { caller, ret });
            Ok(Flow::Jump(ret))
        }
    }
}
