//! Deterministic, sandboxed register VM for resource-bounded validation programs.
//!
//! A program is a code segment plus a constant segment, identified by the
//! SHA3-256 digest of both. [`ExecutionContext`] runs one program against a
//! host-supplied input and produces a [`Verdict`]: success with the output
//! segment and a register snapshot, a rejection raised by the program, or a
//! runtime fault. Every run terminates within the 16-bit cycle counter and
//! the optional complexity limit, and produces the same verdict bytes on
//! every host.

/// Runtime fault taxonomy and failure reasons.
pub mod fault;
pub use fault::{FailureReason, FaultClass, FaultCode};

/// Register banks, control registers and run state.
pub mod state;
pub use state::{
    Bank, ControlRegisters, FloatBank, IntBank, RegIdx, RegisterFile, RunState, WideBank,
    CONTROL_REGISTERS_CANONICAL_BYTES, REGISTER_FILE_BYTES, REGISTER_SLOTS,
};

/// Memory segments and the call stack.
pub mod memory;
pub use memory::{
    checked_range, CallStack, DataMemory, Frame, Segment, SegmentDescriptor,
    CALL_STACK_SEGMENT_MAX, CODE_SEGMENT_MAX, CONSTANT_SEGMENT_MAX, INPUT_SEGMENT_MAX,
    LIBRARY_FRAME_BYTES, LOCAL_FRAME_BYTES, OUTPUT_SEGMENT_MAX, SEGMENT_TABLE, STATIC_SEGMENT_MAX,
};

/// Deterministic opcode classification tables.
pub mod encoding;
pub use encoding::{classify_opcode, Opcode, OpcodeClass, OPCODE_TABLE};

/// Instruction decoding, validation and encoding.
pub mod decoder;
pub use decoder::{
    assemble, BitOp, CmpOp, Condition, DecodeError, Decoded, Decoder, FloatCmp, FloatOp,
    Instruction, IntOp, ShiftOp, MAX_IMMEDIATE_BYTES, MAX_INSTRUCTION_BYTES,
};

/// Program validation and content identifiers.
pub mod program;
pub use program::{LoadError, Program, ProgramId, PROGRAM_ID_BYTES};

/// Host library resolution for `calll`.
pub mod library;
pub use library::{LibraryResolver, NoLibraries, StaticLibraryStore};

/// Arithmetic, float and cryptographic primitives.
pub mod alu;
pub use alu::{
    merkle_node, merkle_root, sha3_256, verify_ecdsa, verify_merkle, verify_schnorr, Uint,
    CANONICAL_NAN_F16, CANONICAL_NAN_F32, CANONICAL_NAN_F64, DIGEST_BYTES, MERKLE_MAX_DEPTH,
    MERKLE_NODE_TAG,
};

/// Fixed per-instruction complexity costs.
pub mod complexity;
pub use complexity::{classify, complexity_cost, instruction_cost, ComplexityKind, COMPLEXITY_COST_TABLE};

/// Cycle counter and complexity accumulator.
pub mod monitor;
pub use monitor::{charge_complexity, cycles_used, record_cycle, CYCLE_CEILING};

/// Host-facing configuration, verdict and trace types.
pub mod api;
pub use api::{
    NoTrace, RegisterSnapshot, StepOutcome, TraceEvent, TraceSink, Verdict, VmConfig,
    VERDICT_TAG_FAILURE, VERDICT_TAG_SUCCESS,
};

mod execute;

/// Execution context and run loop.
pub mod context;
pub use context::ExecutionContext;

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
