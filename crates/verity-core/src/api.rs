//! Host-facing configuration, verdict and trace types.

use crate::encoding::Opcode;
use crate::fault::FailureReason;
use crate::memory::{CALL_STACK_SEGMENT_MAX, OUTPUT_SEGMENT_MAX, STATIC_SEGMENT_MAX};
use crate::program::ProgramId;
use crate::state::{ControlRegisters, RegisterFile, RunState, CONTROL_REGISTERS_CANONICAL_BYTES};

/// Verdict tag for a successful run in [`Verdict::canonical_bytes`].
pub const VERDICT_TAG_SUCCESS: u8 = 0x00;
/// Verdict tag for a failed run in [`Verdict::canonical_bytes`].
pub const VERDICT_TAG_FAILURE: u8 = 0x01;

/// Immutable configuration for one execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct VmConfig {
    /// Complexity ceiling; `None` runs without one.
    pub complexity_limit: Option<u64>,
    /// Initial value of the auto-halt flag.
    pub auto_halt: bool,
    /// Size of the zero-initialized static segment.
    pub static_capacity: usize,
    /// Size of the call stack segment.
    pub stack_capacity: usize,
    /// Capacity of the output segment.
    pub output_capacity: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            complexity_limit: None,
            auto_halt: false,
            static_capacity: STATIC_SEGMENT_MAX,
            stack_capacity: CALL_STACK_SEGMENT_MAX,
            output_capacity: OUTPUT_SEGMENT_MAX,
        }
    }
}

impl VmConfig {
    /// Returns this configuration with a complexity limit.
    #[must_use]
    pub const fn with_complexity_limit(mut self, limit: u64) -> Self {
        self.complexity_limit = Some(limit);
        self
    }

    /// Returns this configuration with the auto-halt flag preset.
    #[must_use]
    pub const fn with_auto_halt(mut self, enabled: bool) -> Self {
        self.auto_halt = enabled;
        self
    }
}

/// Every register bank plus the control registers at the moment of halting.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterSnapshot {
    /// All eleven register banks.
    pub registers: RegisterFile,
    /// Flags and counters.
    pub control: ControlRegisters,
}

/// Final result of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Verdict {
    /// `stop` executed with the failure flag clear.
    Success {
        /// Bytes written to the output segment.
        output: Vec<u8>,
        /// Register state at halt.
        registers: RegisterSnapshot,
    },
    /// The program rejected its input or the runtime could not finish it.
    Failure {
        /// Rejection or runtime fault.
        reason: FailureReason,
        /// Failure events raised during the run.
        failure_count: u64,
        /// Complexity committed before halting.
        complexity_used: u64,
        /// Control transfers consumed; the full ceiling on cycle exhaustion.
        cycles_used: u32,
    },
}

impl Verdict {
    /// Returns true for a success verdict.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Failure reason, if the run failed.
    #[must_use]
    pub const fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { reason, .. } => Some(*reason),
        }
    }

    /// Output bytes of a successful run.
    #[must_use]
    pub fn output(&self) -> Option<&[u8]> {
        match self {
            Self::Success { output, .. } => Some(output),
            Self::Failure { .. } => None,
        }
    }

    /// Stable byte encoding for cross-host comparison.
    ///
    /// Success: tag, output length (u32 LE), output, register arena, control
    /// image. Failure: tag, reason byte, failure count (u64 LE), complexity
    /// (u64 LE), cycles (u32 LE).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn canonical_bytes(&self) -> Vec<u8> {
        match self {
            Self::Success { output, registers } => {
                let arena = registers.registers.as_bytes();
                let mut out = Vec::with_capacity(
                    1 + 4 + output.len() + arena.len() + CONTROL_REGISTERS_CANONICAL_BYTES,
                );
                out.push(VERDICT_TAG_SUCCESS);
                out.extend_from_slice(&(output.len() as u32).to_le_bytes());
                out.extend_from_slice(output);
                out.extend_from_slice(arena);
                out.extend_from_slice(&registers.control.canonical_bytes());
                out
            }
            Self::Failure { reason, failure_count, complexity_used, cycles_used } => {
                let mut out = Vec::with_capacity(1 + 1 + 8 + 8 + 4);
                out.push(VERDICT_TAG_FAILURE);
                out.push(reason.as_u8());
                out.extend_from_slice(&failure_count.to_le_bytes());
                out.extend_from_slice(&complexity_used.to_le_bytes());
                out.extend_from_slice(&cycles_used.to_le_bytes());
                out
            }
        }
    }
}

/// Result of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepOutcome {
    /// One instruction executed and the context is still running.
    Retired {
        /// Offset of the executed instruction.
        pc: u16,
        /// Offset of the next instruction, in the program now executing.
        next: u16,
    },
    /// The context is halted; stepping again has no effect.
    Halted {
        /// Final run state.
        state: RunState,
    },
}

/// Deterministic trace events emitted during execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceEvent {
    /// An instruction decoded and is about to be charged and executed.
    InstructionStart {
        /// Program the instruction belongs to.
        program: ProgramId,
        /// Offset of the instruction.
        pc: u16,
        /// Decoded opcode.
        opcode: Opcode,
    },
    /// A jump, call or return was taken.
    ControlTransfer {
        /// Offset of the transferring instruction.
        from: u16,
        /// Destination offset.
        to: u16,
        /// Cycle counter after the transfer.
        cycles: u16,
    },
    /// Execution entered a library.
    LibraryCall {
        /// Library id.
        library: ProgramId,
        /// Entry offset inside the library.
        entry: u16,
    },
    /// Execution returned from a library into its caller.
    LibraryReturn {
        /// Program resumed.
        caller: ProgramId,
        /// Offset resumed at.
        ret: u16,
    },
    /// An instruction raised the failure flag.
    FailureRaised {
        /// Offset of the instruction.
        pc: u16,
        /// Failure counter after the event.
        failure_count: u64,
    },
    /// Execution halted.
    Halted {
        /// Offset of the last instruction attempted.
        pc: u16,
        /// `None` on success.
        reason: Option<FailureReason>,
    },
}

/// Sink trait for deterministic trace hooks.
pub trait TraceSink {
    /// Records an event in execution order.
    fn on_event(&mut self, event: TraceEvent);
}

/// Sink that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTrace;

impl TraceSink for NoTrace {
    fn on_event(&mut self, _event: TraceEvent) {}
}

impl TraceSink for Vec<TraceEvent> {
    fn on_event(&mut self, event: TraceEvent) {
        self.push(event);
    }
}
