use crate::decoder::{Instruction, IntOp};
use crate::state::IntBank;

/// Instruction classes that carry a fixed complexity cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComplexityKind {
    /// No-operation instruction.
    Nop,
    /// `stop`.
    Halt,
    /// Failure/carry/auto-halt flag manipulation.
    FlagOp,
    /// Unconditional jump.
    Jump,
    /// Conditional jump, taken or not.
    Branch,
    /// Local call.
    Call,
    /// Library call, including resolution.
    LibraryCall,
    /// Return.
    Return,
    /// Immediate, register move, swap, clear and width conversion.
    Move,
    /// Segment load, store and length.
    Memory,
    /// Add, subtract or negate up to 64 bits.
    IntNarrow,
    /// Add, subtract or negate above 64 bits.
    IntWide,
    /// Multiply, divide or remainder up to 64 bits.
    MulDivNarrow,
    /// Multiply, divide or remainder above 64 bits.
    MulDivWide,
    /// Integer comparison.
    Compare,
    /// Bitwise and/or/xor/not.
    Bitwise,
    /// Shift or rotate.
    Shift,
    /// Float add, subtract, multiply, negate or compare.
    Float,
    /// Float division.
    FloatDiv,
    /// SHA3 of a register.
    HashRegister,
    /// SHA3 of a memory range.
    HashMemory,
    /// BIP-340 Schnorr verification.
    Schnorr,
    /// ECDSA verification.
    Ecdsa,
    /// Merkle inclusion proof.
    Merkle,
}

/// Single source-of-truth complexity-cost table.
pub const COMPLEXITY_COST_TABLE: &[(ComplexityKind, u64)] = &[
    (ComplexityKind::Nop, 1),
    (ComplexityKind::Halt, 1),
    (ComplexityKind::FlagOp, 1),
    (ComplexityKind::Jump, 2),
    (ComplexityKind::Branch, 2),
    (ComplexityKind::Call, 2),
    (ComplexityKind::LibraryCall, 16),
    (ComplexityKind::Return, 2),
    (ComplexityKind::Move, 2),
    (ComplexityKind::Memory, 4),
    (ComplexityKind::IntNarrow, 2),
    (ComplexityKind::IntWide, 8),
    (ComplexityKind::MulDivNarrow, 4),
    (ComplexityKind::MulDivWide, 64),
    (ComplexityKind::Compare, 2),
    (ComplexityKind::Bitwise, 2),
    (ComplexityKind::Shift, 3),
    (ComplexityKind::Float, 4),
    (ComplexityKind::FloatDiv, 8),
    (ComplexityKind::HashRegister, 200),
    (ComplexityKind::HashMemory, 1000),
    (ComplexityKind::Schnorr, 20_000),
    (ComplexityKind::Ecdsa, 20_000),
    (ComplexityKind::Merkle, 6000),
];

/// Looks up the cost of a complexity kind.
#[must_use]
pub fn complexity_cost(kind: ComplexityKind) -> Option<u64> {
    COMPLEXITY_COST_TABLE
        .iter()
        .find_map(|(entry_kind, cost)| (*entry_kind == kind).then_some(*cost))
}

const fn is_wide(bank: IntBank) -> bool {
    bank.bits() > 64
}

/// Classifies an instruction for complexity accounting.
#[must_use]
pub const fn classify(instruction: &Instruction) -> ComplexityKind {
    match instruction {
        Instruction::Nop => ComplexityKind::Nop,
        Instruction::Stop => ComplexityKind::Halt,
        Instruction::Fail
        | Instruction::Succ
        | Instruction::AutoHalt { .. }
        | Instruction::InvCarry
        | Instruction::ClearCarry => ComplexityKind::FlagOp,
        Instruction::Jmp { .. } | Instruction::Jmpr { .. } => ComplexityKind::Jump,
        Instruction::Jif { .. } | Instruction::Jifr { .. } => ComplexityKind::Branch,
        Instruction::Call { .. } => ComplexityKind::Call,
        Instruction::CallLib { .. } => ComplexityKind::LibraryCall,
        Instruction::Ret => ComplexityKind::Return,
        Instruction::Put { .. }
        | Instruction::Mov { .. }
        | Instruction::Swp { .. }
        | Instruction::Clr { .. }
        | Instruction::Conv { .. } => ComplexityKind::Move,
        Instruction::Ldc { .. } | Instruction::Ld { .. } | Instruction::St { .. } | Instruction::Len { .. } => {
            ComplexityKind::Memory
        }
        Instruction::Arith { op: IntOp::Add | IntOp::Sub, bank, .. } | Instruction::Neg { bank, .. } => {
            if is_wide(*bank) {
                ComplexityKind::IntWide
            } else {
                ComplexityKind::IntNarrow
            }
        }
        Instruction::Arith { bank, .. } => {
            if is_wide(*bank) {
                ComplexityKind::MulDivWide
            } else {
                ComplexityKind::MulDivNarrow
            }
        }
        Instruction::Compare { .. } => ComplexityKind::Compare,
        Instruction::Bitwise { .. } | Instruction::Not { .. } => ComplexityKind::Bitwise,
        Instruction::Shift { .. } => ComplexityKind::Shift,
        Instruction::Float { op: crate::decoder::FloatOp::Div, .. } => ComplexityKind::FloatDiv,
        Instruction::Float { .. } | Instruction::FNeg { .. } | Instruction::FCompare { .. } => {
            ComplexityKind::Float
        }
        Instruction::Sha3 { .. } => ComplexityKind::HashRegister,
        Instruction::Sha3Mem { .. } => ComplexityKind::HashMemory,
        Instruction::VerifySchnorr { .. } => ComplexityKind::Schnorr,
        Instruction::VerifyEcdsa { .. } => ComplexityKind::Ecdsa,
        Instruction::VerifyMerkle { .. } => ComplexityKind::Merkle,
    }
}

/// Complexity charged before an instruction executes.
#[must_use]
pub fn instruction_cost(instruction: &Instruction) -> u64 {
    complexity_cost(classify(instruction)).unwrap_or(u64::MAX)
}
