use crate::fault::FaultCode;
use crate::program::{ProgramId, PROGRAM_ID_BYTES};

const TAG_LOCAL: u8 = 0x00;
const TAG_LIBRARY: u8 = 0x01;

/// Bytes used by a local return frame: return offset and tag.
pub const LOCAL_FRAME_BYTES: usize = 2 + 1;
/// Bytes used by a library return frame: caller id, return offset and tag.
pub const LIBRARY_FRAME_BYTES: usize = PROGRAM_ID_BYTES + 2 + 1;

/// A return frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Frame {
    /// Return into the same program.
    Local {
        /// Offset of the instruction after the call.
        ret: u16,
    },
    /// Return from a library into the calling program.
    Library {
        /// Program that issued the library call.
        caller: ProgramId,
        /// Offset of the instruction after the call, in the caller.
        ret: u16,
    },
}

impl Frame {
    /// Encoded size of this frame.
    #[must_use]
    pub const fn encoded_len(&self) -> usize {
        match self {
            Self::Local { .. } => LOCAL_FRAME_BYTES,
            Self::Library { .. } => LIBRARY_FRAME_BYTES,
        }
    }
}

/// Fixed-capacity LIFO of return frames, stored as bytes.
///
/// Frames are written payload first with the tag byte last, so `pop` reads
/// the tag at the top to learn how many bytes to unwind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallStack {
    arena: Box<[u8]>,
    top: usize,
}

impl CallStack {
    /// Allocates an empty call stack of `capacity` bytes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            arena: vec![0; capacity].into_boxed_slice(),
            top: 0,
        }
    }

    /// Total capacity in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.arena.len()
    }

    /// Bytes currently used.
    #[must_use]
    pub const fn used(&self) -> usize {
        self.top
    }

    /// Returns true when no frame is stored.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.top == 0
    }

    /// Returns true when `frame` can be pushed without overflowing.
    #[must_use]
    pub fn fits(&self, frame: &Frame) -> bool {
        self.top
            .checked_add(frame.encoded_len())
            .is_some_and(|end| end <= self.arena.len())
    }

    /// Pushes a frame.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::StackOverflow`] when the frame does not fit; the stack is unchanged.
    pub fn push(&mut self, frame: Frame) -> Result<(), FaultCode> {
        let len = frame.encoded_len();
        let end = self
            .top
            .checked_add(len)
            .filter(|end| *end <= self.arena.len())
            .ok_or(FaultCode::StackOverflow)?;
        let slot = &mut self.arena[self.top..end];
        match frame {
            Frame::Local { ret } => {
                slot[..2].copy_from_slice(&ret.to_le_bytes());
                slot[2] = TAG_LOCAL;
            }
            Frame::Library { caller, ret } => {
                slot[..PROGRAM_ID_BYTES].copy_from_slice(caller.as_bytes());
                slot[PROGRAM_ID_BYTES..PROGRAM_ID_BYTES + 2].copy_from_slice(&ret.to_le_bytes());
                slot[PROGRAM_ID_BYTES + 2] = TAG_LIBRARY;
            }
        }
        self.top = end;
        Ok(())
    }

    /// Pops the most recent frame.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::StackUnderflow`] when no frame is stored.
    pub fn pop(&mut self) -> Result<Frame, FaultCode> {
        let tag = match self.top.checked_sub(1) {
            Some(tag_at) => self.arena[tag_at],
            None => return Err(FaultCode::StackUnderflow),
        };
        let len = match tag {
            TAG_LOCAL => LOCAL_FRAME_BYTES,
            TAG_LIBRARY => LIBRARY_FRAME_BYTES,
            _ => return Err(FaultCode::StackUnderflow),
        };
        let start = self.top.checked_sub(len).ok_or(FaultCode::StackUnderflow)?;
        let bytes = &self.arena[start..self.top];
        let frame = if tag == TAG_LOCAL {
            Frame::Local {
                ret: u16::from_le_bytes([bytes[0], bytes[1]]),
            }
        } else {
            let mut id = [0u8; PROGRAM_ID_BYTES];
            id.copy_from_slice(&bytes[..PROGRAM_ID_BYTES]);
            Frame::Library {
                caller: ProgramId::from_bytes(id),
                ret: u16::from_le_bytes([bytes[PROGRAM_ID_BYTES], bytes[PROGRAM_ID_BYTES + 1]]),
            }
        };
        self.top = start;
        Ok(frame)
    }
}
