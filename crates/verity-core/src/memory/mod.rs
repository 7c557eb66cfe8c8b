//! Segmented memory: data segments, segment policy and the call stack.

/// Return-frame stack.
pub mod call_stack;
/// Segment identifiers, permissions and size limits.
pub mod segment;

pub use call_stack::{CallStack, Frame, LIBRARY_FRAME_BYTES, LOCAL_FRAME_BYTES};
pub use segment::{
    checked_range, Segment, SegmentDescriptor, CALL_STACK_SEGMENT_MAX, CODE_SEGMENT_MAX,
    CONSTANT_SEGMENT_MAX, INPUT_SEGMENT_MAX, OUTPUT_SEGMENT_MAX, SEGMENT_TABLE, STATIC_SEGMENT_MAX,
};

use crate::fault::FaultCode;

/// Data segments owned by one execution context.
///
/// The constant segment belongs to whichever program is executing and is
/// passed in by the caller.
#[derive(Clone, PartialEq, Eq)]
pub struct DataMemory {
    static_segment: Box<[u8]>,
    input: Box<[u8]>,
    output: Box<[u8]>,
    output_len: usize,
}

impl DataMemory {
    /// Allocates zeroed static and output segments and takes ownership of the input.
    #[must_use]
    pub fn new(static_capacity: usize, output_capacity: usize, input: Vec<u8>) -> Self {
        Self {
            static_segment: vec![0; static_capacity].into_boxed_slice(),
            input: input.into_boxed_slice(),
            output: vec![0; output_capacity].into_boxed_slice(),
            output_len: 0,
        }
    }

    /// Current size of a data segment as seen by `len`.
    ///
    /// The output segment reports its high-water mark, not its capacity.
    #[must_use]
    pub fn len(&self, segment: Segment, constants: &[u8]) -> usize {
        match segment {
            Segment::Constant => constants.len(),
            Segment::Static => self.static_segment.len(),
            Segment::Input => self.input.len(),
            Segment::Output => self.output_len,
            Segment::Code | Segment::CallStack => 0,
        }
    }

    /// Borrows `len` bytes at `addr` from a readable segment.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::SegmentOutOfBounds`] when the range is not fully
    /// inside the segment or the segment is not readable.
    pub fn read<'a>(
        &'a self,
        segment: Segment,
        constants: &'a [u8],
        addr: u32,
        len: usize,
    ) -> Result<&'a [u8], FaultCode> {
        let backing: &[u8] = match segment {
            Segment::Constant => constants,
            Segment::Static => &self.static_segment,
            Segment::Input => &self.input,
            Segment::Output | Segment::Code | Segment::CallStack => {
                return Err(FaultCode::SegmentOutOfBounds)
            }
        };
        let range = checked_range(backing.len(), addr, len).ok_or(FaultCode::SegmentOutOfBounds)?;
        Ok(&backing[range])
    }

    /// Copies `bytes` to `addr` in a writable segment.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::SegmentOutOfBounds`] when the range exceeds the
    /// segment capacity or the segment is not writable. Nothing is written then.
    pub fn write(&mut self, segment: Segment, addr: u32, bytes: &[u8]) -> Result<(), FaultCode> {
        let backing: &mut [u8] = match segment {
            Segment::Static => &mut self.static_segment,
            Segment::Output => &mut self.output,
            Segment::Constant | Segment::Input | Segment::Code | Segment::CallStack => {
                return Err(FaultCode::SegmentOutOfBounds)
            }
        };
        let range =
            checked_range(backing.len(), addr, bytes.len()).ok_or(FaultCode::SegmentOutOfBounds)?;
        let end = range.end;
        backing[range].copy_from_slice(bytes);
        if segment == Segment::Output {
            self.output_len = self.output_len.max(end);
        }
        Ok(())
    }

    /// Bytes written to the output segment, up to the highest written offset.
    #[must_use]
    pub fn output(&self) -> &[u8] {
        &self.output[..self.output_len]
    }

    /// Host input bytes.
    #[must_use]
    pub fn input(&self) -> &[u8] {
        &self.input
    }

    /// Static segment contents.
    #[must_use]
    pub fn static_segment(&self) -> &[u8] {
        &self.static_segment
    }
}

impl core::fmt::Debug for DataMemory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DataMemory")
            .field("static_len", &self.static_segment.len())
            .field("input_len", &self.input.len())
            .field("output_capacity", &self.output.len())
            .field("output_len", &self.output_len)
            .finish()
    }
}
