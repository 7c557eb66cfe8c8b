//! Instruction decoder and encoder.
//!
//! Instructions are variable length: one opcode byte followed by operand
//! bytes whose layout is fixed per opcode. Decoding validates every operand
//! (register indices, bank categories, segment permissions, jump targets)
//! so that execution never sees a malformed instruction.

#![allow(missing_docs)]

use thiserror::Error;

use crate::encoding::{classify_opcode, Opcode};
use crate::memory::Segment;
use crate::program::{ProgramId, PROGRAM_ID_BYTES};
use crate::state::{Bank, FloatBank, IntBank, RegIdx, WideBank};

/// Longest possible encoded instruction in bytes.
pub const MAX_INSTRUCTION_BYTES: usize = 36;
/// Widest register a `put` immediate may fill.
pub const MAX_IMMEDIATE_BYTES: usize = 32;

/// Branch condition evaluated against the control flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum Condition {
    CarrySet = 0,
    CarryClear = 1,
    FailureSet = 2,
    FailureClear = 3,
}

impl Condition {
    #[must_use]
    pub const fn from_u8(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::CarrySet),
            1 => Some(Self::CarryClear),
            2 => Some(Self::FailureSet),
            3 => Some(Self::FailureClear),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Evaluates the condition for the given flag values.
    #[must_use]
    pub const fn holds(self, carry: bool, failure: bool) -> bool {
        match self {
            Self::CarrySet => carry,
            Self::CarryClear => !carry,
            Self::FailureSet => failure,
            Self::FailureClear => !failure,
        }
    }
}

/// Integer arithmetic operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum IntOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

/// Integer comparison writing the carry flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum CmpOp {
    Eq,
    Lt,
    LtSigned,
}

/// Bitwise binary operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum BitOp {
    And,
    Or,
    Xor,
}

/// Shift or rotate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ShiftOp {
    Shl,
    Shr,
    Rol,
    Ror,
}

/// IEEE float arithmetic operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FloatOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// IEEE float comparison writing the carry flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FloatCmp {
    Eq,
    Lt,
}

/// A fully validated instruction.
///
/// Register operands of crypto instructions have fixed banks: public keys
/// and signatures live in `r256`/`r512`, digests and Merkle nodes in `r256`,
/// memory addresses and lengths in `a32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Instruction {
    Nop,
    /// Halt; success iff the failure flag is clear.
    Stop,
    /// Raise the failure flag.
    Fail,
    /// Clear the failure flag.
    Succ,
    Jmp { target: u16 },
    /// Jump relative to the next instruction.
    Jmpr { offset: i8 },
    Jif { cond: Condition, target: u16 },
    Jifr { cond: Condition, offset: i8 },
    Call { target: u16 },
    CallLib { library: ProgramId, entry: u16 },
    Ret,
    AutoHalt { enabled: bool },
    InvCarry,
    ClearCarry,
    Put { bank: Bank, dst: RegIdx, imm: [u8; MAX_IMMEDIATE_BYTES] },
    Mov { bank: Bank, dst: RegIdx, src: RegIdx },
    Swp { bank: Bank, a: RegIdx, b: RegIdx },
    Clr { bank: Bank, dst: RegIdx },
    Conv { dst_bank: IntBank, dst: RegIdx, src_bank: IntBank, src: RegIdx, signed: bool },
    /// Load a register from a fixed constant-segment offset.
    Ldc { bank: Bank, dst: RegIdx, offset: u16 },
    /// Load from `seg` at the address held in `a32[addr]`.
    Ld { seg: Segment, bank: Bank, dst: RegIdx, addr: RegIdx },
    /// Store to `seg` at the address held in `a32[addr]`.
    St { seg: Segment, bank: Bank, src: RegIdx, addr: RegIdx },
    /// Write the current length of `seg` into `a32[dst]`.
    Len { seg: Segment, dst: RegIdx },
    Arith { op: IntOp, signed: bool, bank: IntBank, dst: RegIdx, a: RegIdx, b: RegIdx },
    Neg { bank: IntBank, dst: RegIdx, src: RegIdx },
    Compare { op: CmpOp, bank: IntBank, a: RegIdx, b: RegIdx },
    Bitwise { op: BitOp, bank: IntBank, dst: RegIdx, a: RegIdx, b: RegIdx },
    Not { bank: IntBank, dst: RegIdx, src: RegIdx },
    /// Shift `src` by the amount held in `a16[amount]`.
    Shift { op: ShiftOp, bank: IntBank, dst: RegIdx, src: RegIdx, amount: RegIdx },
    Float { op: FloatOp, bank: FloatBank, dst: RegIdx, a: RegIdx, b: RegIdx },
    FNeg { bank: FloatBank, dst: RegIdx, src: RegIdx },
    FCompare { op: FloatCmp, bank: FloatBank, a: RegIdx, b: RegIdx },
    /// `r256[dst] = SHA3-256(bank[src])`.
    Sha3 { bank: WideBank, dst: RegIdx, src: RegIdx },
    /// `r256[dst] = SHA3-256(seg[a32[addr] .. a32[addr] + a32[len]])`.
    Sha3Mem { seg: Segment, dst: RegIdx, addr: RegIdx, len: RegIdx },
    /// BIP-340 check of `r512[sig]` over `r256[msg]` by x-only key `r256[pk]`.
    VerifySchnorr { pk: RegIdx, sig: RegIdx, msg: RegIdx },
    /// ECDSA check of compact `r512[sig]` over prehash `r256[msg]` by key `r512[pk]` (x ‖ y).
    VerifyEcdsa { pk: RegIdx, sig: RegIdx, msg: RegIdx },
    /// Merkle inclusion of `r256[leaf]` under `r256[root]`, proof read from `seg` at `a32[addr]`.
    VerifyMerkle { root: RegIdx, leaf: RegIdx, seg: Segment, addr: RegIdx },
}

/// Decoder rejection reasons. Any of these at run time is an illegal instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum DecodeError {
    #[error("offset {offset} is past the end of the code segment")]
    EndOfCode { offset: u16 },
    #[error("unassigned opcode {opcode:#04x}")]
    UnknownOpcode { opcode: u8 },
    #[error("`{opcode}` is truncated by the end of the code segment")]
    Truncated { opcode: Opcode },
    #[error("register index {index} is out of range")]
    InvalidRegister { index: u8 },
    #[error("bank selector {code:#04x} is not valid for `{opcode}`")]
    InvalidBank { opcode: Opcode, code: u8 },
    #[error("segment selector {code} is not valid for `{opcode}`")]
    InvalidSegment { opcode: Opcode, code: u8 },
    #[error("condition selector {code} is invalid")]
    InvalidCondition { code: u8 },
    #[error("`{opcode}` flag operand {value} is not 0 or 1")]
    InvalidFlag { opcode: Opcode, value: u8 },
    #[error("jump target {target} is outside the code segment")]
    JumpOutOfCode { target: i32 },
}

/// An instruction with its position in the code segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decoded {
    pub instruction: Instruction,
    /// Offset of the opcode byte.
    pub offset: u16,
    /// Offset of the following instruction.
    pub next: u16,
}

impl Decoded {
    /// Target of a local jump or call, resolved against this instruction's position.
    #[must_use]
    pub fn local_target(&self) -> Option<u16> {
        match self.instruction {
            Instruction::Jmp { target }
            | Instruction::Jif { target, .. }
            | Instruction::Call { target } => Some(target),
            Instruction::Jmpr { offset } | Instruction::Jifr { offset, .. } => {
                relative_target(self.next, offset).and_then(|t| u16::try_from(t).ok())
            }
            _ => None,
        }
    }
}

fn relative_target(next: u16, offset: i8) -> Option<i32> {
    i32::from(next).checked_add(i32::from(offset))
}

struct Cursor<'a> {
    code: &'a [u8],
    pos: usize,
    opcode: Opcode,
}

impl Cursor<'_> {
    fn byte(&mut self) -> Result<u8, DecodeError> {
        let byte = *self
            .code
            .get(self.pos)
            .ok_or(DecodeError::Truncated { opcode: self.opcode })?;
        self.pos += 1;
        Ok(byte)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        for slot in &mut out {
            *slot = self.byte()?;
        }
        Ok(out)
    }

    fn u16(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    fn i8(&mut self) -> Result<i8, DecodeError> {
        Ok(i8::from_le_bytes([self.byte()?]))
    }

    fn reg(&mut self) -> Result<RegIdx, DecodeError> {
        let index = self.byte()?;
        RegIdx::new(index).ok_or(DecodeError::InvalidRegister { index })
    }

    fn flag(&mut self) -> Result<bool, DecodeError> {
        match self.byte()? {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(DecodeError::InvalidFlag { opcode: self.opcode, value }),
        }
    }

    fn cond(&mut self) -> Result<Condition, DecodeError> {
        let code = self.byte()?;
        Condition::from_u8(code).ok_or(DecodeError::InvalidCondition { code })
    }

    fn typed_bank<T>(&mut self, narrow: impl FnOnce(u8) -> Option<T>) -> Result<T, DecodeError> {
        let code = self.byte()?;
        narrow(code).ok_or(DecodeError::InvalidBank { opcode: self.opcode, code })
    }

    fn bank(&mut self) -> Result<Bank, DecodeError> {
        self.typed_bank(Bank::from_u8)
    }

    fn int_bank(&mut self) -> Result<IntBank, DecodeError> {
        self.typed_bank(IntBank::from_u8)
    }

    fn float_bank(&mut self) -> Result<FloatBank, DecodeError> {
        self.typed_bank(FloatBank::from_u8)
    }

    fn wide_bank(&mut self) -> Result<WideBank, DecodeError> {
        self.typed_bank(WideBank::from_u8)
    }

    fn segment(&mut self, allowed: impl FnOnce(Segment) -> bool) -> Result<Segment, DecodeError> {
        let code = self.byte()?;
        Segment::from_operand(code)
            .filter(|segment| allowed(*segment))
            .ok_or(DecodeError::InvalidSegment { opcode: self.opcode, code })
    }

    fn absolute_target(&mut self) -> Result<u16, DecodeError> {
        let target = self.u16()?;
        if usize::from(target) < self.code.len() {
            Ok(target)
        } else {
            Err(DecodeError::JumpOutOfCode { target: i32::from(target) })
        }
    }

    fn relative_offset(&mut self) -> Result<i8, DecodeError> {
        let offset = self.i8()?;
        let next = i32::try_from(self.pos).unwrap_or(i32::MAX);
        let target = next.saturating_add(i32::from(offset));
        match usize::try_from(target) {
            Ok(t) if t < self.code.len() => Ok(offset),
            _ => Err(DecodeError::JumpOutOfCode { target }),
        }
    }
}

/// Stateless instruction decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decoder;

impl Decoder {
    /// Decodes the instruction starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] when `offset` is past the end of `code`, the
    /// opcode is unassigned, the instruction is truncated, or an operand is
    /// invalid for the opcode.
    pub fn decode(code: &[u8], offset: u16) -> Result<Decoded, DecodeError> {
        let start = usize::from(offset);
        let byte = *code.get(start).ok_or(DecodeError::EndOfCode { offset })?;
        let opcode = classify_opcode(byte).ok_or(DecodeError::UnknownOpcode { opcode: byte })?;
        let mut cur = Cursor { code, pos: start + 1, opcode };
        let instruction = Self::operands(opcode, &mut cur)?;
        let next = u16::try_from(cur.pos).map_err(|_| DecodeError::Truncated { opcode })?;
        Ok(Decoded { instruction, offset, next })
    }

    #[allow(clippy::too_many_lines)]
    fn operands(opcode: Opcode, cur: &mut Cursor<'_>) -> Result<Instruction, DecodeError> {
        let arith = |op, signed, cur: &mut Cursor<'_>| -> Result<Instruction, DecodeError> {
            Ok(Instruction::Arith {
                op,
                signed,
                bank: cur.int_bank()?,
                dst: cur.reg()?,
                a: cur.reg()?,
                b: cur.reg()?,
            })
        };
        let readable = Segment::is_readable;

        Ok(match opcode {
            Opcode::Nop => Instruction::Nop,
            Opcode::Stop => Instruction::Stop,
            Opcode::Fail => Instruction::Fail,
            Opcode::Succ => Instruction::Succ,
            Opcode::Jmp => Instruction::Jmp { target: cur.absolute_target()? },
            Opcode::Jmpr => Instruction::Jmpr { offset: cur.relative_offset()? },
            Opcode::Jif => Instruction::Jif {
                cond: cur.cond()?,
                target: cur.absolute_target()?,
            },
            Opcode::Jifr => Instruction::Jifr {
                cond: cur.cond()?,
                offset: cur.relative_offset()?,
            },
            Opcode::Call => Instruction::Call { target: cur.absolute_target()? },
            Opcode::CallLib => Instruction::CallLib {
                library: ProgramId::from_bytes(cur.array::<PROGRAM_ID_BYTES>()?),
                entry: cur.u16()?,
            },
            Opcode::Ret => Instruction::Ret,
            Opcode::AutoHalt => Instruction::AutoHalt { enabled: cur.flag()? },
            Opcode::InvCarry => Instruction::InvCarry,
            Opcode::ClearCarry => Instruction::ClearCarry,
            Opcode::Put => {
                let bank = cur.typed_bank(|code| {
                    Bank::from_u8(code).filter(|bank| bank.bytes() <= MAX_IMMEDIATE_BYTES)
                })?;
                let dst = cur.reg()?;
                let mut imm = [0u8; MAX_IMMEDIATE_BYTES];
                for slot in imm.iter_mut().take(bank.bytes()) {
                    *slot = cur.byte()?;
                }
                Instruction::Put { bank, dst, imm }
            }
            Opcode::Mov => Instruction::Mov {
                bank: cur.bank()?,
                dst: cur.reg()?,
                src: cur.reg()?,
            },
            Opcode::Swp => Instruction::Swp {
                bank: cur.bank()?,
                a: cur.reg()?,
                b: cur.reg()?,
            },
            Opcode::Clr => Instruction::Clr {
                bank: cur.bank()?,
                dst: cur.reg()?,
            },
            Opcode::Conv => Instruction::Conv {
                dst_bank: cur.int_bank()?,
                dst: cur.reg()?,
                src_bank: cur.int_bank()?,
                src: cur.reg()?,
                signed: cur.flag()?,
            },
            Opcode::Ldc => Instruction::Ldc {
                bank: cur.bank()?,
                dst: cur.reg()?,
                offset: cur.u16()?,
            },
            Opcode::Ld => Instruction::Ld {
                seg: cur.segment(readable)?,
                bank: cur.bank()?,
                dst: cur.reg()?,
                addr: cur.reg()?,
            },
            Opcode::St => Instruction::St {
                seg: cur.segment(Segment::is_writable)?,
                bank: cur.bank()?,
                src: cur.reg()?,
                addr: cur.reg()?,
            },
            Opcode::Len => Instruction::Len {
                seg: cur.segment(|_| true)?,
                dst: cur.reg()?,
            },
            Opcode::Add => arith(IntOp::Add, false, cur)?,
            Opcode::Sub => arith(IntOp::Sub, false, cur)?,
            Opcode::Mul => arith(IntOp::Mul, false, cur)?,
            Opcode::Div => arith(IntOp::Div, false, cur)?,
            Opcode::Rem => arith(IntOp::Rem, false, cur)?,
            Opcode::AddS => arith(IntOp::Add, true, cur)?,
            Opcode::SubS => arith(IntOp::Sub, true, cur)?,
            Opcode::MulS => arith(IntOp::Mul, true, cur)?,
            Opcode::DivS => arith(IntOp::Div, true, cur)?,
            Opcode::RemS => arith(IntOp::Rem, true, cur)?,
            Opcode::Neg => Instruction::Neg {
                bank: cur.int_bank()?,
                dst: cur.reg()?,
                src: cur.reg()?,
            },
            Opcode::Eq | Opcode::Lt | Opcode::LtS => Instruction::Compare {
                op: match opcode {
                    Opcode::Eq => CmpOp::Eq,
                    Opcode::Lt => CmpOp::Lt,
                    _ => CmpOp::LtSigned,
                },
                bank: cur.int_bank()?,
                a: cur.reg()?,
                b: cur.reg()?,
            },
            Opcode::And | Opcode::Or | Opcode::Xor => Instruction::Bitwise {
                op: match opcode {
                    Opcode::And => BitOp::And,
                    Opcode::Or => BitOp::Or,
                    _ => BitOp::Xor,
                },
                bank: cur.int_bank()?,
                dst: cur.reg()?,
                a: cur.reg()?,
                b: cur.reg()?,
            },
            Opcode::Not => Instruction::Not {
                bank: cur.int_bank()?,
                dst: cur.reg()?,
                src: cur.reg()?,
            },
            Opcode::Shl | Opcode::Shr | Opcode::Rol | Opcode::Ror => Instruction::Shift {
                op: match opcode {
                    Opcode::Shl => ShiftOp::Shl,
                    Opcode::Shr => ShiftOp::Shr,
                    Opcode::Rol => ShiftOp::Rol,
                    _ => ShiftOp::Ror,
                },
                bank: cur.int_bank()?,
                dst: cur.reg()?,
                src: cur.reg()?,
                amount: cur.reg()?,
            },
            Opcode::FAdd | Opcode::FSub | Opcode::FMul | Opcode::FDiv => Instruction::Float {
                op: match opcode {
                    Opcode::FAdd => FloatOp::Add,
                    Opcode::FSub => FloatOp::Sub,
                    Opcode::FMul => FloatOp::Mul,
                    _ => FloatOp::Div,
                },
                bank: cur.float_bank()?,
                dst: cur.reg()?,
                a: cur.reg()?,
                b: cur.reg()?,
            },
            Opcode::FNeg => Instruction::FNeg {
                bank: cur.float_bank()?,
                dst: cur.reg()?,
                src: cur.reg()?,
            },
            Opcode::FEq | Opcode::FLt => Instruction::FCompare {
                op: if opcode == Opcode::FEq { FloatCmp::Eq } else { FloatCmp::Lt },
                bank: cur.float_bank()?,
                a: cur.reg()?,
                b: cur.reg()?,
            },
            Opcode::Sha3 => Instruction::Sha3 {
                bank: cur.wide_bank()?,
                dst: cur.reg()?,
                src: cur.reg()?,
            },
            Opcode::Sha3Mem => Instruction::Sha3Mem {
                seg: cur.segment(readable)?,
                dst: cur.reg()?,
                addr: cur.reg()?,
                len: cur.reg()?,
            },
            Opcode::VerifySchnorr => Instruction::VerifySchnorr {
                pk: cur.reg()?,
                sig: cur.reg()?,
                msg: cur.reg()?,
            },
            Opcode::VerifyEcdsa => Instruction::VerifyEcdsa {
                pk: cur.reg()?,
                sig: cur.reg()?,
                msg: cur.reg()?,
            },
            Opcode::VerifyMerkle => Instruction::VerifyMerkle {
                root: cur.reg()?,
                leaf: cur.reg()?,
                seg: cur.segment(readable)?,
                addr: cur.reg()?,
            },
        })
    }
}

impl Instruction {
    /// Opcode of this instruction.
    #[must_use]
    pub const fn opcode(&self) -> Opcode {
        match self {
            Self::Nop => Opcode::Nop,
            Self::Stop => Opcode::Stop,
            Self::Fail => Opcode::Fail,
            Self::Succ => Opcode::Succ,
            Self::Jmp { .. } => Opcode::Jmp,
            Self::Jmpr { .. } => Opcode::Jmpr,
            Self::Jif { .. } => Opcode::Jif,
            Self::Jifr { .. } => Opcode::Jifr,
            Self::Call { .. } => Opcode::Call,
            Self::CallLib { .. } => Opcode::CallLib,
            Self::Ret => Opcode::Ret,
            Self::AutoHalt { .. } => Opcode::AutoHalt,
            Self::InvCarry => Opcode::InvCarry,
            Self::ClearCarry => Opcode::ClearCarry,
            Self::Put { .. } => Opcode::Put,
            Self::Mov { .. } => Opcode::Mov,
            Self::Swp { .. } => Opcode::Swp,
            Self::Clr { .. } => Opcode::Clr,
            Self::Conv { .. } => Opcode::Conv,
            Self::Ldc { .. } => Opcode::Ldc,
            Self::Ld { .. } => Opcode::Ld,
            Self::St { .. } => Opcode::St,
            Self::Len { .. } => Opcode::Len,
            Self::Arith { op, signed, .. } => match (op, signed) {
                (IntOp::Add, false) => Opcode::Add,
                (IntOp::Sub, false) => Opcode::Sub,
                (IntOp::Mul, false) => Opcode::Mul,
                (IntOp::Div, false) => Opcode::Div,
                (IntOp::Rem, false) => Opcode::Rem,
                (IntOp::Add, true) => Opcode::AddS,
                (IntOp::Sub, true) => Opcode::SubS,
                (IntOp::Mul, true) => Opcode::MulS,
                (IntOp::Div, true) => Opcode::DivS,
                (IntOp::Rem, true) => Opcode::RemS,
            },
            Self::Neg { .. } => Opcode::Neg,
            Self::Compare { op, .. } => match op {
                CmpOp::Eq => Opcode::Eq,
                CmpOp::Lt => Opcode::Lt,
                CmpOp::LtSigned => Opcode::LtS,
            },
            Self::Bitwise { op, .. } => match op {
                BitOp::And => Opcode::And,
                BitOp::Or => Opcode::Or,
                BitOp::Xor => Opcode::Xor,
            },
            Self::Not { .. } => Opcode::Not,
            Self::Shift { op, .. } => match op {
                ShiftOp::Shl => Opcode::Shl,
                ShiftOp::Shr => Opcode::Shr,
                ShiftOp::Rol => Opcode::Rol,
                ShiftOp::Ror => Opcode::Ror,
            },
            Self::Float { op, .. } => match op {
                FloatOp::Add => Opcode::FAdd,
                FloatOp::Sub => Opcode::FSub,
                FloatOp::Mul => Opcode::FMul,
                FloatOp::Div => Opcode::FDiv,
            },
            Self::FNeg { .. } => Opcode::FNeg,
            Self::FCompare { op, .. } => match op {
                FloatCmp::Eq => Opcode::FEq,
                FloatCmp::Lt => Opcode::FLt,
            },
            Self::Sha3 { .. } => Opcode::Sha3,
            Self::Sha3Mem { .. } => Opcode::Sha3Mem,
            Self::VerifySchnorr { .. } => Opcode::VerifySchnorr,
            Self::VerifyEcdsa { .. } => Opcode::VerifyEcdsa,
            Self::VerifyMerkle { .. } => Opcode::VerifyMerkle,
        }
    }

    /// Appends the canonical encoding of this instruction to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        fn seg(segment: Segment) -> u8 {
            segment.operand_code().unwrap_or(u8::MAX)
        }

        out.push(self.opcode().as_u8());
        match *self {
            Self::Nop
            | Self::Stop
            | Self::Fail
            | Self::Succ
            | Self::Ret
            | Self::InvCarry
            | Self::ClearCarry => {}
            Self::Jmp { target } | Self::Call { target } => out.extend_from_slice(&target.to_le_bytes()),
            Self::Jmpr { offset } => out.extend_from_slice(&offset.to_le_bytes()),
            Self::Jif { cond, target } => {
                out.push(cond.as_u8());
                out.extend_from_slice(&target.to_le_bytes());
            }
            Self::Jifr { cond, offset } => {
                out.push(cond.as_u8());
                out.extend_from_slice(&offset.to_le_bytes());
            }
            Self::CallLib { library, entry } => {
                out.extend_from_slice(library.as_bytes());
                out.extend_from_slice(&entry.to_le_bytes());
            }
            Self::AutoHalt { enabled } => out.push(u8::from(enabled)),
            Self::Put { bank, dst, imm } => {
                out.extend_from_slice(&[bank.as_u8(), dst.as_u8()]);
                out.extend_from_slice(&imm[..bank.bytes().min(MAX_IMMEDIATE_BYTES)]);
            }
            Self::Mov { bank, dst: a, src: b } | Self::Swp { bank, a, b } => {
                out.extend_from_slice(&[bank.as_u8(), a.as_u8(), b.as_u8()]);
            }
            Self::Clr { bank, dst } => out.extend_from_slice(&[bank.as_u8(), dst.as_u8()]),
            Self::Conv { dst_bank, dst, src_bank, src, signed } => out.extend_from_slice(&[
                dst_bank.bank().as_u8(),
                dst.as_u8(),
                src_bank.bank().as_u8(),
                src.as_u8(),
                u8::from(signed),
            ]),
            Self::Ldc { bank, dst, offset } => {
                out.extend_from_slice(&[bank.as_u8(), dst.as_u8()]);
                out.extend_from_slice(&offset.to_le_bytes());
            }
            Self::Ld { seg: s, bank, dst: r, addr } | Self::St { seg: s, bank, src: r, addr } => {
                out.extend_from_slice(&[seg(s), bank.as_u8(), r.as_u8(), addr.as_u8()]);
            }
            Self::Len { seg: s, dst } => out.extend_from_slice(&[seg(s), dst.as_u8()]),
            Self::Arith { bank, dst, a, b, .. } | Self::Bitwise { bank, dst, a, b, .. } => {
                out.extend_from_slice(&[bank.bank().as_u8(), dst.as_u8(), a.as_u8(), b.as_u8()]);
            }
            Self::Neg { bank, dst, src } | Self::Not { bank, dst, src } => {
                out.extend_from_slice(&[bank.bank().as_u8(), dst.as_u8(), src.as_u8()]);
            }
            Self::Compare { bank, a, b, .. } => {
                out.extend_from_slice(&[bank.bank().as_u8(), a.as_u8(), b.as_u8()]);
            }
            Self::Shift { bank, dst, src, amount, .. } => out.extend_from_slice(&[
                bank.bank().as_u8(),
                dst.as_u8(),
                src.as_u8(),
                amount.as_u8(),
            ]),
            Self::Float { bank, dst, a, b, .. } => {
                out.extend_from_slice(&[bank.bank().as_u8(), dst.as_u8(), a.as_u8(), b.as_u8()]);
            }
            Self::FNeg { bank, dst, src } => {
                out.extend_from_slice(&[bank.bank().as_u8(), dst.as_u8(), src.as_u8()]);
            }
            Self::FCompare { bank, a, b, .. } => {
                out.extend_from_slice(&[bank.bank().as_u8(), a.as_u8(), b.as_u8()]);
            }
            Self::Sha3 { bank, dst, src } => {
                out.extend_from_slice(&[bank.bank().as_u8(), dst.as_u8(), src.as_u8()]);
            }
            Self::Sha3Mem { seg: s, dst, addr, len } => {
                out.extend_from_slice(&[seg(s), dst.as_u8(), addr.as_u8(), len.as_u8()]);
            }
            Self::VerifySchnorr { pk, sig, msg } | Self::VerifyEcdsa { pk, sig, msg } => {
                out.extend_from_slice(&[pk.as_u8(), sig.as_u8(), msg.as_u8()]);
            }
            Self::VerifyMerkle { root, leaf, seg: s, addr } => {
                out.extend_from_slice(&[root.as_u8(), leaf.as_u8(), seg(s), addr.as_u8()]);
            }
        }
    }

    /// Canonical encoding as a fresh byte vector.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(MAX_INSTRUCTION_BYTES);
        self.encode(&mut out);
        out
    }
}

/// Encodes a sequence of instructions into a code segment.
#[must_use]
pub fn assemble(instructions: &[Instruction]) -> Vec<u8> {
    let mut out = Vec::new();
    for instruction in instructions {
        instruction.encode(&mut out);
    }
    out
}
