use thiserror::Error;

/// Fault classes used for verdict reporting and trace aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FaultClass {
    /// The byte stream at the program counter is not a valid instruction.
    Decode,
    /// A data segment access fell outside the segment.
    Memory,
    /// Control transfer, call stack, or library resolution failure.
    Control,
    /// A cycle or complexity ceiling was reached.
    Resource,
}

/// Runtime faults that halt a program with a hard failure.
///
/// Soft failures (the failure flag) are not faults: they are recorded in
/// [`crate::ControlRegisters`] and only become a verdict at `stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum FaultCode {
    /// Bytes at the program counter do not decode.
    #[error("illegal instruction encoding")]
    IllegalInstruction = 0x01,
    /// Execution ran past the last instruction without `stop`.
    #[error("execution reached the end of the code segment")]
    EndOfCode = 0x02,
    /// Load or store addressed bytes outside the segment.
    #[error("data access outside segment bounds")]
    SegmentOutOfBounds = 0x03,
    /// A call did not fit into the call stack segment.
    #[error("call stack overflow")]
    StackOverflow = 0x04,
    /// `ret` executed with an empty call stack.
    #[error("call stack underflow")]
    StackUnderflow = 0x05,
    /// The host resolver had no program for a library id.
    #[error("library not found")]
    LibraryNotFound = 0x06,
    /// The resolver returned a program whose id differs from the requested one.
    #[error("resolved library does not match requested id")]
    LibraryMismatch = 0x07,
    /// A library call entry point is outside the library or not an instruction boundary.
    #[error("invalid library entry point")]
    InvalidLibraryEntry = 0x08,
    /// The 16-bit cycle counter would exceed its ceiling.
    #[error("cycle limit exceeded")]
    CycleLimitExceeded = 0x09,
    /// The complexity accumulator would exceed the configured limit.
    #[error("complexity limit exceeded")]
    ComplexityLimitExceeded = 0x0A,
}

impl FaultCode {
    /// Converts a fault code to its stable byte value.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Converts a stable byte value back into a fault code.
    #[must_use]
    pub const fn from_u8(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Self::IllegalInstruction),
            0x02 => Some(Self::EndOfCode),
            0x03 => Some(Self::SegmentOutOfBounds),
            0x04 => Some(Self::StackOverflow),
            0x05 => Some(Self::StackUnderflow),
            0x06 => Some(Self::LibraryNotFound),
            0x07 => Some(Self::LibraryMismatch),
            0x08 => Some(Self::InvalidLibraryEntry),
            0x09 => Some(Self::CycleLimitExceeded),
            0x0A => Some(Self::ComplexityLimitExceeded),
            _ => None,
        }
    }

    /// Returns the fault class for this fault code.
    #[must_use]
    pub const fn class(self) -> FaultClass {
        match self {
            Self::IllegalInstruction => FaultClass::Decode,
            Self::SegmentOutOfBounds => FaultClass::Memory,
            Self::EndOfCode
            | Self::StackOverflow
            | Self::StackUnderflow
            | Self::LibraryNotFound
            | Self::LibraryMismatch
            | Self::InvalidLibraryEntry => FaultClass::Control,
            Self::CycleLimitExceeded | Self::ComplexityLimitExceeded => FaultClass::Resource,
        }
    }

    /// Resource faults are the only ones a correct program can hit by running too long.
    #[must_use]
    pub const fn is_resource_exhaustion(self) -> bool {
        matches!(self.class(), FaultClass::Resource)
    }
}

/// Why a program ended in a failure verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FailureReason {
    /// The program halted (or auto-halted) with the failure flag set.
    Rejected,
    /// Execution stopped on a runtime fault.
    Runtime(FaultCode),
}

impl FailureReason {
    /// Stable byte used in canonical verdict encoding: `0` for rejection, the fault code otherwise.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Rejected => 0,
            Self::Runtime(code) => code.as_u8(),
        }
    }

    /// Returns the runtime fault, if any.
    #[must_use]
    pub const fn fault(self) -> Option<FaultCode> {
        match self {
            Self::Rejected => None,
            Self::Runtime(code) => Some(code),
        }
    }
}
