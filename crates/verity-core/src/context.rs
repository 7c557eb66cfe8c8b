//! Execution context: one program run from load to verdict.

use std::collections::BTreeMap;

use crate::api::{
    NoTrace, RegisterSnapshot, StepOutcome, TraceEvent, TraceSink, Verdict, VmConfig,
};
use crate::complexity::instruction_cost;
use crate::decoder::{DecodeError, Decoder};
use crate::execute::{execute_instruction, Flow};
use crate::fault::{FailureReason, FaultCode};
use crate::library::LibraryResolver;
use crate::memory::{
    CallStack, DataMemory, Segment, CALL_STACK_SEGMENT_MAX, INPUT_SEGMENT_MAX,
    OUTPUT_SEGMENT_MAX, STATIC_SEGMENT_MAX,
};
use crate::monitor::{charge_complexity, cycles_used};
use crate::program::{LoadError, Program, ProgramId};
use crate::state::{ControlRegisters, RegisterFile, RunState};

/// A sandboxed run of one entry program.
///
/// The context owns every piece of mutable state the program can touch.
/// Libraries entered through `calll` are cached here so that returns and
/// repeated calls never consult the host again.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    config: VmConfig,
    entry: ProgramId,
    pub(crate) program: Program,
    pub(crate) libraries: BTreeMap<ProgramId, Program>,
    pc: u16,
    pub(crate) registers: RegisterFile,
    pub(crate) control: ControlRegisters,
    pub(crate) memory: DataMemory,
    pub(crate) call_stack: CallStack,
    run_state: RunState,
}

const fn check_capacity(segment: Segment, requested: usize, max: usize) -> Result<(), LoadError> {
    if requested > max {
        return Err(LoadError::CapacityTooLarge { segment, requested, max });
    }
    Ok(())
}

impl ExecutionContext {
    /// Validates a program and prepares it to run with default capacities.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] when the program fails validation or the
    /// input exceeds the input segment maximum.
    pub fn load(
        code: &[u8],
        constants: &[u8],
        input: Vec<u8>,
        complexity_limit: Option<u64>,
    ) -> Result<Self, LoadError> {
        let program = Program::new(code, constants)?;
        let config = VmConfig {
            complexity_limit,
            ..VmConfig::default()
        };
        Self::with_config(program, input, &config)
    }

    /// Prepares an already validated program to run under `config`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::SegmentTooLarge`] for oversized input and
    /// [`LoadError::CapacityTooLarge`] when a configured capacity exceeds its
    /// segment maximum.
    pub fn with_config(program: Program, input: Vec<u8>, config: &VmConfig) -> Result<Self, LoadError> {
        if input.len() > INPUT_SEGMENT_MAX {
            return Err(LoadError::SegmentTooLarge {
                segment: Segment::Input,
                len: input.len(),
                max: INPUT_SEGMENT_MAX,
            });
        }
        check_capacity(Segment::Static, config.static_capacity, STATIC_SEGMENT_MAX)?;
        check_capacity(Segment::CallStack, config.stack_capacity, CALL_STACK_SEGMENT_MAX)?;
        check_capacity(Segment::Output, config.output_capacity, OUTPUT_SEGMENT_MAX)?;

        let entry = program.id();
        let mut libraries = BTreeMap::new();
        libraries.insert(entry, program.clone());
        Ok(Self {
            config: *config,
            entry,
            program,
            libraries,
            pc: 0,
            registers: RegisterFile::new(),
            control: ControlRegisters::new(config.complexity_limit, config.auto_halt),
            memory: DataMemory::new(config.static_capacity, config.output_capacity, input),
            call_stack: CallStack::new(config.stack_capacity),
            run_state: RunState::Running,
        })
    }

    /// Configuration this context was created with.
    #[must_use]
    pub const fn config(&self) -> &VmConfig {
        &self.config
    }

    /// Id of the entry program.
    #[must_use]
    pub const fn entry_id(&self) -> ProgramId {
        self.entry
    }

    /// Program currently executing; a library while inside `calll`.
    #[must_use]
    pub const fn current_program(&self) -> &Program {
        &self.program
    }

    /// Offset of the next instruction in the current program.
    #[must_use]
    pub const fn pc(&self) -> u16 {
        self.pc
    }

    /// Register banks.
    #[must_use]
    pub const fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    /// Flags and resource counters.
    #[must_use]
    pub const fn control(&self) -> &ControlRegisters {
        &self.control
    }

    /// Lifecycle state.
    #[must_use]
    pub const fn run_state(&self) -> RunState {
        self.run_state
    }

    /// Bytes written to the output segment so far.
    #[must_use]
    pub fn output(&self) -> &[u8] {
        self.memory.output()
    }

    /// Executes one instruction.
    pub fn step(&mut self, resolver: &dyn LibraryResolver) -> StepOutcome {
        self.step_traced(resolver, &mut NoTrace)
    }

    /// Executes one instruction, reporting trace events to `trace`.
    pub fn step_traced(&mut self, resolver: &dyn LibraryResolver, trace: &mut dyn TraceSink) -> StepOutcome {
        if self.run_state.is_halted() {
            return StepOutcome::Halted { state: self.run_state };
        }
        let pc = self.pc;
        match self.try_step(resolver, trace) {
            Ok(outcome) => outcome,
            Err(fault) => self.halt(pc, RunState::HaltedFailure(FailureReason::Runtime(fault)), trace),
        }
    }

    fn try_step(
        &mut self,
        resolver: &dyn LibraryResolver,
        trace: &mut dyn TraceSink,
    ) -> Result<StepOutcome, FaultCode> {
        let pc = self.pc;
        let decoded = Decoder::decode(self.program.code(), pc).map_err(|error| match error {
            DecodeError::EndOfCode { .. } => FaultCode::EndOfCode,
            _ => FaultCode::IllegalInstruction,
        })?;
        trace.on_event(TraceEvent::InstructionStart {
            program: self.program.id(),
            pc,
            opcode: decoded.instruction.opcode(),
        });

        charge_complexity(&mut self.control, instruction_cost(&decoded.instruction))?;
        let failures = self.control.failure_count();
        let flow = execute_instruction(self, &decoded, resolver, trace)?;
        self.control
            .set_call_stack_pointer(u32::try_from(self.call_stack.used()).unwrap_or(u32::MAX));

        if self.control.failure_count() != failures {
            trace.on_event(TraceEvent::FailureRaised {
                pc,
                failure_count: self.control.failure_count(),
            });
            if self.control.auto_halt() {
                return Ok(self.halt(pc, RunState::HaltedFailure(FailureReason::Rejected), trace));
            }
        }

        match flow {
            Flow::Next => self.pc = decoded.next,
            Flow::Jump(target) => {
                trace.on_event(TraceEvent::ControlTransfer {
                    from: pc,
                    to: target,
                    cycles: self.control.cycles(),
                });
                self.pc = target;
            }
            Flow::Halt => {
                let state = if self.control.failure() {
                    RunState::HaltedFailure(FailureReason::Rejected)
                } else {
                    RunState::HaltedSuccess
                };
                return Ok(self.halt(pc, state, trace));
            }
        }
        Ok(StepOutcome::Retired { pc, next: self.pc })
    }

    fn halt(&mut self, pc: u16, state: RunState, trace: &mut dyn TraceSink) -> StepOutcome {
        self.run_state = state;
        trace.on_event(TraceEvent::Halted {
            pc,
            reason: state.failure_reason(),
        });
        StepOutcome::Halted { state }
    }

    /// Runs to completion and returns the verdict.
    ///
    /// Termination is guaranteed: straight-line execution ends at the end of
    /// the code segment and every backward transfer spends a cycle.
    pub fn run(&mut self, resolver: &dyn LibraryResolver) -> Verdict {
        self.run_traced(resolver, &mut NoTrace)
    }

    /// Runs to completion, reporting trace events to `trace`.
    pub fn run_traced(&mut self, resolver: &dyn LibraryResolver, trace: &mut dyn TraceSink) -> Verdict {
        loop {
            if let Some(verdict) = self.verdict() {
                return verdict;
            }
            self.step_traced(resolver, trace);
        }
    }

    /// Verdict of a halted context; `None` while running.
    #[must_use]
    pub fn verdict(&self) -> Option<Verdict> {
        match self.run_state {
            RunState::Running => None,
            RunState::HaltedSuccess => Some(Verdict::Success {
                output: self.memory.output().to_vec(),
                registers: RegisterSnapshot {
                    registers: self.registers.clone(),
                    control: self.control,
                },
            }),
            RunState::HaltedFailure(reason) => Some(Verdict::Failure {
                reason,
                failure_count: self.control.failure_count(),
                complexity_used: self.control.complexity(),
                cycles_used: cycles_used(&self.control, reason.fault()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::ExecutionContext;
    use crate::api::{StepOutcome, TraceEvent, Verdict, VmConfig};
    use crate::decoder::{assemble, Condition, Instruction, IntOp};
    use crate::encoding::Opcode;
    use crate::fault::{FailureReason, FaultCode};
    use crate::library::NoLibraries;
    use crate::memory::{Segment, STATIC_SEGMENT_MAX};
    use crate::program::{LoadError, Program};
    use crate::state::{Bank, IntBank, RegIdx, RunState};

    fn r(index: u8) -> RegIdx {
        RegIdx::new(index).expect("valid index")
    }

    fn put_a64(dst: u8, value: u64) -> Instruction {
        let mut imm = [0u8; 32];
        imm[..8].copy_from_slice(&value.to_le_bytes());
        Instruction::Put { bank: Bank::A64, dst: r(dst), imm }
    }

    fn run(program: &[Instruction]) -> (ExecutionContext, Verdict) {
        let mut ctx = ExecutionContext::load(&assemble(program), &[], Vec::new(), None).expect("loads");
        let verdict = ctx.run(&NoLibraries);
        (ctx, verdict)
    }

    #[test]
    fn stop_with_clear_flag_succeeds() {
        let (ctx, verdict) = run(&[
            put_a64(0, 40),
            put_a64(1, 2),
            Instruction::Arith { op: IntOp::Add, signed: false, bank: IntBank::A64, dst: r(2), a: r(0), b: r(1) },
            Instruction::Stop,
        ]);
        assert!(verdict.is_success());
        assert_eq!(ctx.registers().a64(r(2)), 42);
        assert_eq!(ctx.control().complexity(), 2 + 2 + 2 + 1);
        assert_eq!(ctx.run_state(), RunState::HaltedSuccess);
    }

    #[test]
    fn stop_with_failure_flag_is_a_rejection() {
        let (_, verdict) = run(&[Instruction::Fail, Instruction::Stop]);
        assert_eq!(verdict.failure_reason(), Some(FailureReason::Rejected));
        match verdict {
            Verdict::Failure { failure_count, .. } => assert_eq!(failure_count, 1),
            Verdict::Success { .. } => panic!("expected failure"),
        }
    }

    #[test]
    fn running_off_the_end_is_a_fault() {
        let (_, verdict) = run(&[Instruction::Nop]);
        assert_eq!(verdict.failure_reason(), Some(FailureReason::Runtime(FaultCode::EndOfCode)));
    }

    #[test]
    fn auto_halt_stops_at_the_failing_instruction() {
        let (ctx, verdict) = run(&[
            Instruction::AutoHalt { enabled: true },
            Instruction::Fail,
            Instruction::Succ,
            Instruction::Stop,
        ]);
        assert_eq!(verdict.failure_reason(), Some(FailureReason::Rejected));
        assert_eq!(ctx.pc(), 2);
    }

    #[test]
    fn halted_context_does_not_step() {
        let (mut ctx, _) = run(&[Instruction::Stop]);
        assert_eq!(
            ctx.step(&NoLibraries),
            StepOutcome::Halted { state: RunState::HaltedSuccess }
        );
    }

    #[test]
    fn taken_branches_count_cycles_and_trace_transfers() {
        let code = assemble(&[
            Instruction::ClearCarry,
            Instruction::Jif { cond: Condition::CarryClear, target: 6 },
            Instruction::Fail,
            Instruction::Stop,
        ]);
        let mut ctx = ExecutionContext::load(&code, &[], Vec::new(), None).expect("loads");
        let mut events = Vec::new();
        let verdict = ctx.run_traced(&NoLibraries, &mut events);
        assert!(verdict.is_success());
        assert_eq!(ctx.control().cycles(), 1);
        assert!(events.contains(&TraceEvent::ControlTransfer { from: 1, to: 6, cycles: 1 }));
        assert!(events.iter().all(|event| !matches!(
            event,
            TraceEvent::InstructionStart { opcode: Opcode::Fail, .. }
        )));
        assert_eq!(events.last(), Some(&TraceEvent::Halted { pc: 6, reason: None }));
    }

    #[test]
    fn complexity_limit_refuses_the_crossing_instruction() {
        let code = assemble(&[Instruction::Nop, Instruction::Nop, Instruction::Stop]);
        let mut ctx = ExecutionContext::load(&code, &[], Vec::new(), Some(2)).expect("loads");
        let verdict = ctx.run(&NoLibraries);
        assert_eq!(
            verdict,
            Verdict::Failure {
                reason: FailureReason::Runtime(FaultCode::ComplexityLimitExceeded),
                failure_count: 0,
                complexity_used: 2,
                cycles_used: 0,
            }
        );
        assert_eq!(ctx.pc(), 2);
    }

    #[rstest]
    #[case(VmConfig { static_capacity: STATIC_SEGMENT_MAX + 1, ..VmConfig::default() }, Segment::Static)]
    #[case(VmConfig { stack_capacity: usize::MAX, ..VmConfig::default() }, Segment::CallStack)]
    #[case(VmConfig { output_capacity: 1 << 30, ..VmConfig::default() }, Segment::Output)]
    fn oversized_capacities_are_refused(#[case] config: VmConfig, #[case] expected: Segment) {
        let program = Program::new(&assemble(&[Instruction::Stop]), &[]).expect("loads");
        match ExecutionContext::with_config(program, Vec::new(), &config) {
            Err(LoadError::CapacityTooLarge { segment, .. }) => assert_eq!(segment, expected),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn oversized_input_is_refused() {
        let program = Program::new(&assemble(&[Instruction::Stop]), &[]).expect("loads");
        let input = vec![0; crate::memory::INPUT_SEGMENT_MAX + 1];
        assert!(matches!(
            ExecutionContext::with_config(program, input, &VmConfig::default()),
            Err(LoadError::SegmentTooLarge { segment: Segment::Input, .. })
        ));
    }
}
