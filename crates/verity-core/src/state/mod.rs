//! Register file, control registers and run state.

/// Typed register banks and the register arena.
pub mod registers;
/// Flags, resource counters and call-stack pointer.
pub mod control;

pub use control::{ControlRegisters, CONTROL_REGISTERS_CANONICAL_BYTES};
pub use registers::{
    Bank, FloatBank, IntBank, RegIdx, RegisterFile, WideBank, REGISTER_FILE_BYTES, REGISTER_SLOTS,
};

use crate::fault::FailureReason;

/// Execution lifecycle of a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RunState {
    /// Instructions are still being executed.
    #[default]
    Running,
    /// `stop` executed with the failure flag clear.
    HaltedSuccess,
    /// Execution ended in a failure verdict.
    HaltedFailure(FailureReason),
}

impl RunState {
    /// Returns true once no further instruction will execute.
    #[must_use]
    pub const fn is_halted(self) -> bool {
        !matches!(self, Self::Running)
    }

    /// Failure reason for a failed halt.
    #[must_use]
    pub const fn failure_reason(self) -> Option<FailureReason> {
        match self {
            Self::HaltedFailure(reason) => Some(reason),
            Self::Running | Self::HaltedSuccess => None,
        }
    }
}
