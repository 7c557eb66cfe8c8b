/// Opcode classes, selected by the high nibble of the opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum OpcodeClass {
    Control = 0x0,
    Register = 0x1,
    Integer = 0x2,
    Bitwise = 0x3,
    Float = 0x4,
    Crypto = 0x5,
}

impl OpcodeClass {
    /// Converts the high nibble of an opcode byte into an assigned class.
    #[must_use]
    pub const fn from_u4(nibble: u8) -> Option<Self> {
        match nibble {
            0x0 => Some(Self::Control),
            0x1 => Some(Self::Register),
            0x2 => Some(Self::Integer),
            0x3 => Some(Self::Bitwise),
            0x4 => Some(Self::Float),
            0x5 => Some(Self::Crypto),
            _ => None,
        }
    }
}

/// Assigned opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub enum Opcode {
    Nop,
    Stop,
    Fail,
    Succ,
    Jmp,
    Jmpr,
    Jif,
    Jifr,
    Call,
    CallLib,
    Ret,
    AutoHalt,
    InvCarry,
    ClearCarry,
    Put,
    Mov,
    Swp,
    Clr,
    Conv,
    Ldc,
    Ld,
    St,
    Len,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    AddS,
    SubS,
    MulS,
    DivS,
    RemS,
    Neg,
    Eq,
    Lt,
    LtS,
    And,
    Or,
    Xor,
    Not,
    Shl,
    Shr,
    Rol,
    Ror,
    FAdd,
    FSub,
    FMul,
    FDiv,
    FNeg,
    FEq,
    FLt,
    Sha3,
    Sha3Mem,
    VerifySchnorr,
    VerifyEcdsa,
    VerifyMerkle,
}

/// Single source-of-truth opcode table: byte value, opcode and mnemonic.
///
/// Any byte not present here is an illegal opcode.
pub const OPCODE_TABLE: &[(u8, Opcode, &str)] = &[
    (0x00, Opcode::Nop, "nop"),
    (0x01, Opcode::Stop, "stop"),
    (0x02, Opcode::Fail, "fail"),
    (0x03, Opcode::Succ, "succ"),
    (0x04, Opcode::Jmp, "jmp"),
    (0x05, Opcode::Jmpr, "jmpr"),
    (0x06, Opcode::Jif, "jif"),
    (0x07, Opcode::Jifr, "jifr"),
    (0x08, Opcode::Call, "call"),
    (0x09, Opcode::CallLib, "calll"),
    (0x0A, Opcode::Ret, "ret"),
    (0x0B, Opcode::AutoHalt, "ahalt"),
    (0x0C, Opcode::InvCarry, "invco"),
    (0x0D, Opcode::ClearCarry, "clco"),
    (0x10, Opcode::Put, "put"),
    (0x11, Opcode::Mov, "mov"),
    (0x12, Opcode::Swp, "swp"),
    (0x13, Opcode::Clr, "clr"),
    (0x14, Opcode::Conv, "conv"),
    (0x15, Opcode::Ldc, "ldc"),
    (0x16, Opcode::Ld, "ld"),
    (0x17, Opcode::St, "st"),
    (0x18, Opcode::Len, "len"),
    (0x20, Opcode::Add, "add"),
    (0x21, Opcode::Sub, "sub"),
    (0x22, Opcode::Mul, "mul"),
    (0x23, Opcode::Div, "div"),
    (0x24, Opcode::Rem, "rem"),
    (0x25, Opcode::AddS, "adds"),
    (0x26, Opcode::SubS, "subs"),
    (0x27, Opcode::MulS, "muls"),
    (0x28, Opcode::DivS, "divs"),
    (0x29, Opcode::RemS, "rems"),
    (0x2A, Opcode::Neg, "neg"),
    (0x2B, Opcode::Eq, "eq"),
    (0x2C, Opcode::Lt, "lt"),
    (0x2D, Opcode::LtS, "lts"),
    (0x30, Opcode::And, "and"),
    (0x31, Opcode::Or, "or"),
    (0x32, Opcode::Xor, "xor"),
    (0x33, Opcode::Not, "not"),
    (0x34, Opcode::Shl, "shl"),
    (0x35, Opcode::Shr, "shr"),
    (0x36, Opcode::Rol, "rol"),
    (0x37, Opcode::Ror, "ror"),
    (0x40, Opcode::FAdd, "fadd"),
    (0x41, Opcode::FSub, "fsub"),
    (0x42, Opcode::FMul, "fmul"),
    (0x43, Opcode::FDiv, "fdiv"),
    (0x44, Opcode::FNeg, "fneg"),
    (0x45, Opcode::FEq, "feq"),
    (0x46, Opcode::FLt, "flt"),
    (0x50, Opcode::Sha3, "sha3"),
    (0x51, Opcode::Sha3Mem, "sha3m"),
    (0x52, Opcode::VerifySchnorr, "vschnorr"),
    (0x53, Opcode::VerifyEcdsa, "vecdsa"),
    (0x54, Opcode::VerifyMerkle, "vmerkle"),
];

/// Returns the assigned opcode for a byte value.
#[must_use]
pub fn classify_opcode(byte: u8) -> Option<Opcode> {
    OPCODE_TABLE
        .iter()
        .find_map(|(value, opcode, _)| (*value == byte).then_some(*opcode))
}

impl Opcode {
    /// Byte value of this opcode.
    #[must_use]
    pub fn as_u8(self) -> u8 {
        OPCODE_TABLE
            .iter()
            .find_map(|(value, opcode, _)| (*opcode == self).then_some(*value))
            .unwrap_or(u8::MAX)
    }

    /// Assembly mnemonic of this opcode.
    #[must_use]
    pub fn mnemonic(self) -> &'static str {
        OPCODE_TABLE
            .iter()
            .find_map(|(_, opcode, name)| (*opcode == self).then_some(*name))
            .unwrap_or("?")
    }

    /// Opcode class selected by the high nibble.
    #[must_use]
    pub fn class(self) -> Option<OpcodeClass> {
        OpcodeClass::from_u4(self.as_u8() >> 4)
    }
}

impl core::fmt::Display for Opcode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.mnemonic())
    }
}
