//! Loaded programs and their content identifiers.

use core::fmt;
use std::sync::Arc;

use sha3::{Digest, Sha3_256};
use thiserror::Error;

use crate::decoder::{DecodeError, Decoder};
use crate::memory::{Segment, CODE_SEGMENT_MAX, CONSTANT_SEGMENT_MAX};

/// Length of a program id in bytes.
pub const PROGRAM_ID_BYTES: usize = 32;

const PROGRAM_ID_TAG: &[u8] = b"verity:program";

/// Content identifier of a program: SHA3-256 over its code and constants.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ProgramId([u8; PROGRAM_ID_BYTES]);

impl ProgramId {
    /// Wraps raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; PROGRAM_ID_BYTES]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; PROGRAM_ID_BYTES] {
        &self.0
    }

    /// Computes the id of a code segment and constant segment pair.
    ///
    /// Both segments are length-prefixed so that moving bytes between them
    /// changes the id.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn compute(code: &[u8], constants: &[u8]) -> Self {
        let mut hasher = Sha3_256::new();
        hasher.update(PROGRAM_ID_TAG);
        hasher.update((code.len() as u32).to_le_bytes());
        hasher.update(code);
        hasher.update((constants.len() as u32).to_le_bytes());
        hasher.update(constants);
        let mut id = [0u8; PROGRAM_ID_BYTES];
        id.copy_from_slice(&hasher.finalize());
        Self(id)
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProgramId({self})")
    }
}

/// Reasons a program, input or configuration is refused before execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// A segment exceeds its architectural maximum.
    #[error("{segment:?} segment is {len} bytes, maximum is {max}")]
    SegmentTooLarge {
        /// Offending segment.
        segment: Segment,
        /// Supplied length.
        len: usize,
        /// Architectural maximum.
        max: usize,
    },
    /// A configured segment capacity exceeds its architectural maximum.
    #[error("{segment:?} capacity of {requested} bytes exceeds maximum {max}")]
    CapacityTooLarge {
        /// Configured segment.
        segment: Segment,
        /// Requested capacity.
        requested: usize,
        /// Architectural maximum.
        max: usize,
    },
    /// The static sweep hit bytes that do not decode.
    #[error("invalid instruction at offset {offset}: {source}")]
    Decode {
        /// Offset of the instruction that failed.
        offset: u16,
        /// Decoder rejection.
        #[source]
        source: DecodeError,
    },
    /// A local jump or call targets the middle of an instruction.
    #[error("instruction at offset {offset} targets {target}, which is not an instruction boundary")]
    MisalignedJumpTarget {
        /// Offset of the jump or call.
        offset: u16,
        /// Unresolved target.
        target: u16,
    },
}

/// A validated program: immutable code and constants plus its id.
///
/// Cloning is cheap; segments are shared.
#[derive(Clone, PartialEq, Eq)]
pub struct Program {
    id: ProgramId,
    code: Arc<[u8]>,
    constants: Arc<[u8]>,
    boundaries: Arc<[u64]>,
}

impl Program {
    /// Validates and loads a program.
    ///
    /// Every instruction from offset 0 to the end of the code segment must
    /// decode, and every local jump or call must land on the first byte of
    /// an instruction.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::SegmentTooLarge`] for oversized segments,
    /// [`LoadError::Decode`] for undecodable bytes and
    /// [`LoadError::MisalignedJumpTarget`] for jumps into an instruction.
    pub fn new(code: &[u8], constants: &[u8]) -> Result<Self, LoadError> {
        check_len(Segment::Code, code.len(), CODE_SEGMENT_MAX)?;
        check_len(Segment::Constant, constants.len(), CONSTANT_SEGMENT_MAX)?;

        let mut boundaries = vec![0u64; code.len().div_ceil(64)];
        let mut targets = Vec::new();
        let mut offset = 0u16;
        while usize::from(offset) < code.len() {
            let decoded = Decoder::decode(code, offset)
                .map_err(|source| LoadError::Decode { offset, source })?;
            boundaries[usize::from(offset) / 64] |= 1 << (offset % 64);
            if let Some(target) = decoded.local_target() {
                targets.push((offset, target));
            }
            offset = decoded.next;
        }

        let program = Self {
            id: ProgramId::compute(code, constants),
            code: Arc::from(code),
            constants: Arc::from(constants),
            boundaries: Arc::from(boundaries),
        };
        if let Some((offset, target)) = targets
            .into_iter()
            .find(|(_, target)| !program.is_boundary(*target))
        {
            return Err(LoadError::MisalignedJumpTarget { offset, target });
        }
        Ok(program)
    }

    /// Content id.
    #[must_use]
    pub const fn id(&self) -> ProgramId {
        self.id
    }

    /// Code segment.
    #[must_use]
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// Constant segment.
    #[must_use]
    pub fn constants(&self) -> &[u8] {
        &self.constants
    }

    /// Returns true when an instruction starts at `offset`.
    #[must_use]
    pub fn is_boundary(&self, offset: u16) -> bool {
        self.boundaries
            .get(usize::from(offset) / 64)
            .is_some_and(|word| word & (1 << (offset % 64)) != 0)
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("id", &self.id)
            .field("code_len", &self.code.len())
            .field("constants_len", &self.constants.len())
            .finish()
    }
}

const fn check_len(segment: Segment, len: usize, max: usize) -> Result<(), LoadError> {
    if len > max {
        Err(LoadError::SegmentTooLarge { segment, len, max })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{LoadError, Program, ProgramId};
    use crate::decoder::{assemble, DecodeError, Instruction};
    use crate::memory::{Segment, CODE_SEGMENT_MAX};

    #[test]
    fn id_depends_on_segment_split() {
        let a = ProgramId::compute(&[0x00, 0x01], &[]);
        let b = ProgramId::compute(&[0x00], &[0x01]);
        assert_ne!(a, b);
        assert_eq!(a, ProgramId::compute(&[0x00, 0x01], &[]));
        assert_eq!(format!("{a}").len(), 64);
    }

    #[test]
    fn boundaries_follow_the_linear_sweep() {
        let code = assemble(&[Instruction::Jmp { target: 3 }, Instruction::Nop, Instruction::Stop]);
        let program = Program::new(&code, &[]).expect("valid program");
        assert!(program.is_boundary(0));
        assert!(!program.is_boundary(1));
        assert!(program.is_boundary(3));
        assert!(program.is_boundary(4));
        assert!(!program.is_boundary(5));
        assert_eq!(program.id(), ProgramId::compute(&code, &[]));
    }

    #[test]
    fn jump_into_an_instruction_is_refused() {
        let code = assemble(&[Instruction::Jmp { target: 1 }, Instruction::Stop]);
        assert_eq!(
            Program::new(&code, &[]),
            Err(LoadError::MisalignedJumpTarget { offset: 0, target: 1 })
        );
    }

    #[test]
    fn undecodable_tail_is_refused() {
        assert_eq!(
            Program::new(&[0x00, 0xEE], &[]),
            Err(LoadError::Decode {
                offset: 1,
                source: DecodeError::UnknownOpcode { opcode: 0xEE }
            })
        );
    }

    #[test]
    fn oversized_segments_are_refused() {
        let code = vec![0u8; CODE_SEGMENT_MAX + 1];
        assert_eq!(
            Program::new(&code, &[]),
            Err(LoadError::SegmentTooLarge {
                segment: Segment::Code,
                len: CODE_SEGMENT_MAX + 1,
                max: CODE_SEGMENT_MAX
            })
        );
        let full = vec![0u8; CODE_SEGMENT_MAX];
        assert!(Program::new(&full, &[]).is_ok());
    }

    #[test]
    fn empty_program_loads() {
        let program = Program::new(&[], &[]).expect("empty code is valid");
        assert!(program.code().is_empty());
        assert!(!program.is_boundary(0));
    }
}
