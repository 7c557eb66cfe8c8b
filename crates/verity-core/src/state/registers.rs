use core::fmt;

/// Number of registers in every bank (`0..=31`).
pub const REGISTER_SLOTS: usize = 32;

/// Size in bytes of the flat register arena holding all eleven banks.
pub const REGISTER_FILE_BYTES: usize = REGISTER_SLOTS * (1 + 2 + 4 + 8 + 2 + 4 + 8 + 16 + 32 + 64 + 128);

/// A register bank: thirty-two registers of one fixed width.
///
/// The discriminant is the bank selector byte used in instruction encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum Bank {
    /// 8-bit integer registers.
    A8 = 0x00,
    /// 16-bit integer registers.
    A16 = 0x01,
    /// 32-bit integer registers.
    A32 = 0x02,
    /// 64-bit integer registers.
    A64 = 0x03,
    /// IEEE 754 binary16 registers.
    F16 = 0x10,
    /// IEEE 754 binary32 registers.
    F32 = 0x11,
    /// IEEE 754 binary64 registers.
    F64 = 0x12,
    /// 128-bit general registers.
    R128 = 0x20,
    /// 256-bit general registers.
    R256 = 0x21,
    /// 512-bit general registers.
    R512 = 0x22,
    /// 1024-bit general registers.
    R1024 = 0x23,
}

impl Bank {
    /// All banks in arena order.
    pub const ALL: [Self; 11] = [
        Self::A8,
        Self::A16,
        Self::A32,
        Self::A64,
        Self::F16,
        Self::F32,
        Self::F64,
        Self::R128,
        Self::R256,
        Self::R512,
        Self::R1024,
    ];

    /// Decodes a bank selector byte.
    #[must_use]
    pub const fn from_u8(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(Self::A8),
            0x01 => Some(Self::A16),
            0x02 => Some(Self::A32),
            0x03 => Some(Self::A64),
            0x10 => Some(Self::F16),
            0x11 => Some(Self::F32),
            0x12 => Some(Self::F64),
            0x20 => Some(Self::R128),
            0x21 => Some(Self::R256),
            0x22 => Some(Self::R512),
            0x23 => Some(Self::R1024),
            _ => None,
        }
    }

    /// Returns the bank selector byte.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Width of one register in bytes.
    #[must_use]
    pub const fn bytes(self) -> usize {
        match self {
            Self::A8 => 1,
            Self::A16 | Self::F16 => 2,
            Self::A32 | Self::F32 => 4,
            Self::A64 | Self::F64 => 8,
            Self::R128 => 16,
            Self::R256 => 32,
            Self::R512 => 64,
            Self::R1024 => 128,
        }
    }

    /// Width of one register in bits.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn bits(self) -> u16 {
        (self.bytes() * 8) as u16
    }

    /// Byte offset of slot `0` of this bank inside the register arena.
    #[must_use]
    pub const fn arena_offset(self) -> usize {
        let mut offset = 0;
        let mut i = 0;
        while i < Self::ALL.len() {
            if Self::ALL[i] as u8 == self as u8 {
                return offset;
            }
            offset += Self::ALL[i].bytes() * REGISTER_SLOTS;
            i += 1;
        }
        offset
    }

    /// Returns true for the IEEE float banks.
    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F16 | Self::F32 | Self::F64)
    }
}

impl fmt::Display for Bank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::A8 => "a8",
            Self::A16 => "a16",
            Self::A32 => "a32",
            Self::A64 => "a64",
            Self::F16 => "f16",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::R128 => "r128",
            Self::R256 => "r256",
            Self::R512 => "r512",
            Self::R1024 => "r1024",
        };
        f.write_str(name)
    }
}

macro_rules! bank_subset {
    ($(#[$meta:meta])* $name:ident { $($variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
        #[allow(missing_docs)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Narrows a bank into this category, if it belongs to it.
            #[must_use]
            pub const fn from_bank(bank: Bank) -> Option<Self> {
                match bank {
                    $(Bank::$variant => Some(Self::$variant),)+
                    #[allow(unreachable_patterns)]
                    _ => None,
                }
            }

            /// Decodes a bank selector byte restricted to this category.
            #[must_use]
            pub const fn from_u8(code: u8) -> Option<Self> {
                match Bank::from_u8(code) {
                    Some(bank) => Self::from_bank(bank),
                    None => None,
                }
            }

            /// Widens back to the full bank type.
            #[must_use]
            pub const fn bank(self) -> Bank {
                match self {
                    $(Self::$variant => Bank::$variant),+
                }
            }

            /// Width of one register in bits.
            #[must_use]
            pub const fn bits(self) -> u16 {
                self.bank().bits()
            }

            /// Width of one register in bytes.
            #[must_use]
            pub const fn bytes(self) -> usize {
                self.bank().bytes()
            }
        }

        impl From<$name> for Bank {
            fn from(value: $name) -> Self {
                value.bank()
            }
        }
    };
}

bank_subset!(
    /// Banks usable by integer arithmetic, comparisons and bitwise operations.
    IntBank { A8, A16, A32, A64, R128, R256, R512, R1024 }
);

bank_subset!(
    /// IEEE 754 float banks.
    FloatBank { F16, F32, F64 }
);

bank_subset!(
    /// Wide general banks accepted by hashing.
    WideBank { R128, R256, R512, R1024 }
);

/// Register index inside a bank, always below [`REGISTER_SLOTS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegIdx(u8);

impl RegIdx {
    /// Validates a raw register index.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn new(index: u8) -> Option<Self> {
        if (index as usize) < REGISTER_SLOTS {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Returns the raw encoded index.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }

    /// Returns the index as an array offset.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Every register of every bank, stored little-endian in one fixed arena.
///
/// Registers start zeroed; there is no undefined register state.
#[derive(Clone, PartialEq, Eq)]
pub struct RegisterFile {
    arena: Box<[u8]>,
}

impl RegisterFile {
    /// Creates a register file with every register set to zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            arena: vec![0; REGISTER_FILE_BYTES].into_boxed_slice(),
        }
    }

    /// Rebuilds a register file from a canonical arena image.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        (bytes.len() == REGISTER_FILE_BYTES).then(|| Self {
            arena: bytes.to_vec().into_boxed_slice(),
        })
    }

    /// Canonical arena image: banks in [`Bank::ALL`] order, slots ascending, little-endian.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.arena
    }

    const fn range(bank: Bank, idx: RegIdx) -> core::ops::Range<usize> {
        let start = bank.arena_offset() + idx.index() * bank.bytes();
        start..start + bank.bytes()
    }

    /// Little-endian bytes of one register.
    #[must_use]
    pub fn slot(&self, bank: Bank, idx: RegIdx) -> &[u8] {
        &self.arena[Self::range(bank, idx)]
    }

    /// Mutable little-endian bytes of one register.
    pub fn slot_mut(&mut self, bank: Bank, idx: RegIdx) -> &mut [u8] {
        &mut self.arena[Self::range(bank, idx)]
    }

    /// Swaps the contents of two registers of the same bank.
    pub fn swap(&mut self, bank: Bank, a: RegIdx, b: RegIdx) {
        if a == b {
            return;
        }
        let (ra, rb) = (Self::range(bank, a), Self::range(bank, b));
        for (x, y) in ra.zip(rb) {
            self.arena.swap(x, y);
        }
    }

    /// Reads a register of at most 64 bits as an unsigned integer (float banks yield raw bits).
    #[must_use]
    pub fn read_u64(&self, bank: Bank, idx: RegIdx) -> u64 {
        let mut buf = [0u8; 8];
        let slot = self.slot(bank, idx);
        let len = slot.len().min(8);
        buf[..len].copy_from_slice(&slot[..len]);
        u64::from_le_bytes(buf)
    }

    /// Writes the low bytes of `value` into a register of at most 64 bits, zeroing the rest.
    pub fn write_u64(&mut self, bank: Bank, idx: RegIdx, value: u64) {
        let bytes = value.to_le_bytes();
        let slot = self.slot_mut(bank, idx);
        slot.fill(0);
        let len = slot.len().min(8);
        slot[..len].copy_from_slice(&bytes[..len]);
    }

    /// Reads an `a16` register.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn a16(&self, idx: RegIdx) -> u16 {
        self.read_u64(Bank::A16, idx) as u16
    }

    /// Reads an `a32` register.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn a32(&self, idx: RegIdx) -> u32 {
        self.read_u64(Bank::A32, idx) as u32
    }

    /// Reads an `a64` register.
    #[must_use]
    pub fn a64(&self, idx: RegIdx) -> u64 {
        self.read_u64(Bank::A64, idx)
    }

    /// Writes an `a32` register.
    pub fn set_a32(&mut self, idx: RegIdx, value: u32) {
        self.write_u64(Bank::A32, idx, u64::from(value));
    }

    /// Writes an `a64` register.
    pub fn set_a64(&mut self, idx: RegIdx, value: u64) {
        self.write_u64(Bank::A64, idx, value);
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RegisterFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let live = self.arena.iter().filter(|byte| **byte != 0).count();
        f.debug_struct("RegisterFile")
            .field("bytes", &self.arena.len())
            .field("nonzero_bytes", &live)
            .finish()
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for RegisterFile {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.arena)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for RegisterFile {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes = <Vec<u8> as serde::Deserialize<'de>>::deserialize(deserializer)?;
        Self::from_bytes(&bytes).ok_or_else(|| {
            serde::de::Error::invalid_length(bytes.len(), &"a complete register file image")
        })
    }
}

const _: () = {
    assert!(Bank::R1024.arena_offset() + Bank::R1024.bytes() * REGISTER_SLOTS == REGISTER_FILE_BYTES);
    assert!(Bank::A8.arena_offset() == 0);
    assert!(Bank::R128.arena_offset() == 928);
};
