/// Maximum code segment size. Every offset, including end-of-code, fits the 16-bit program counter.
pub const CODE_SEGMENT_MAX: usize = u16::MAX as usize;
/// Maximum constant segment size.
pub const CONSTANT_SEGMENT_MAX: usize = 64 * 1024;
/// Maximum static (read-write scratch) segment size.
pub const STATIC_SEGMENT_MAX: usize = 64 * 1024;
/// Maximum call stack segment size.
pub const CALL_STACK_SEGMENT_MAX: usize = 192 * 1024;
/// Maximum input segment size.
pub const INPUT_SEGMENT_MAX: usize = 1024 * 1024;
/// Maximum output segment size.
pub const OUTPUT_SEGMENT_MAX: usize = 256 * 1024;

/// Memory segments of an execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Segment {
    /// Program bytecode. Only reachable through instruction fetch.
    Code,
    /// Read-only constants bundled with the program.
    Constant,
    /// Zero-initialized read-write scratch memory.
    Static,
    /// Return frames. Only reachable through `call`, `calll` and `ret`.
    CallStack,
    /// Read-only host input.
    Input,
    /// Write-only program output.
    Output,
}

/// Per-segment permissions and limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SegmentDescriptor {
    /// Segment being described.
    pub segment: Segment,
    /// Largest size the segment may have.
    pub max_len: usize,
    /// Readable by data instructions.
    pub readable: bool,
    /// Writable by data instructions.
    pub writable: bool,
}

/// Canonical segment table.
pub const SEGMENT_TABLE: [SegmentDescriptor; 6] = [
    SegmentDescriptor { segment: Segment::Code, max_len: CODE_SEGMENT_MAX, readable: false, writable: false },
    SegmentDescriptor { segment: Segment::Constant, max_len: CONSTANT_SEGMENT_MAX, readable: true, writable: false },
    SegmentDescriptor { segment: Segment::Static, max_len: STATIC_SEGMENT_MAX, readable: true, writable: true },
    SegmentDescriptor { segment: Segment::CallStack, max_len: CALL_STACK_SEGMENT_MAX, readable: false, writable: false },
    SegmentDescriptor { segment: Segment::Input, max_len: INPUT_SEGMENT_MAX, readable: true, writable: false },
    SegmentDescriptor { segment: Segment::Output, max_len: OUTPUT_SEGMENT_MAX, readable: false, writable: true },
];

impl Segment {
    /// Returns this segment's descriptor.
    #[must_use]
    pub const fn descriptor(self) -> SegmentDescriptor {
        SEGMENT_TABLE[self as usize]
    }

    /// Largest size the segment may have.
    #[must_use]
    pub const fn max_len(self) -> usize {
        self.descriptor().max_len
    }

    /// Readable by `ld`, `sha3m` and `vmerkle`.
    #[must_use]
    pub const fn is_readable(self) -> bool {
        self.descriptor().readable
    }

    /// Writable by `st`.
    #[must_use]
    pub const fn is_writable(self) -> bool {
        self.descriptor().writable
    }

    /// Decodes a data segment selector byte.
    #[must_use]
    pub const fn from_operand(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Constant),
            1 => Some(Self::Static),
            2 => Some(Self::Input),
            3 => Some(Self::Output),
            _ => None,
        }
    }

    /// Selector byte for data segments; `None` for code and call stack.
    #[must_use]
    pub const fn operand_code(self) -> Option<u8> {
        match self {
            Self::Constant => Some(0),
            Self::Static => Some(1),
            Self::Input => Some(2),
            Self::Output => Some(3),
            Self::Code | Self::CallStack => None,
        }
    }
}

/// Bounds-checks `len` bytes at `addr` in a segment of `segment_len` bytes.
#[must_use]
pub fn checked_range(segment_len: usize, addr: u32, len: usize) -> Option<core::ops::Range<usize>> {
    let start = usize::try_from(addr).ok()?;
    let end = start.checked_add(len)?;
    (end <= segment_len).then_some(start..end)
}

const _: () = {
    let mut i = 0;
    while i < SEGMENT_TABLE.len() {
        assert!(SEGMENT_TABLE[i].segment as usize == i);
        i += 1;
    }
};
