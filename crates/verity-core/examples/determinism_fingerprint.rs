//! Deterministic verdict fingerprint generator used by CI cross-host comparison.

use half as _;
use k256 as _;
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use sha3 as _;
use thiserror as _;
use verity_core::{
    assemble, Bank, ExecutionContext, FloatBank, FloatOp, Instruction, IntBank, IntOp, NoLibraries,
    RegIdx, Segment, Verdict,
};

fn r(index: u8) -> RegIdx {
    RegIdx::new(index).expect("register index should be valid")
}

fn hash_bytes(hash: &mut u64, bytes: &[u8]) {
    for byte in bytes {
        *hash ^= u64::from(*byte);
        *hash = hash.wrapping_mul(0x1000_0000_01B3);
    }
}

fn run(program: &[Instruction], constants: &[u8], input: &[u8]) -> Verdict {
    ExecutionContext::load(&assemble(program), constants, input.to_vec(), None)
        .expect("program should load")
        .run(&NoLibraries)
}

fn fingerprint() -> String {
    let hashing = [
        Instruction::Len { seg: Segment::Input, dst: r(1) },
        Instruction::Sha3Mem { seg: Segment::Input, dst: r(0), addr: r(0), len: r(1) },
        Instruction::St { seg: Segment::Output, bank: Bank::R256, src: r(0), addr: r(0) },
        Instruction::Stop,
    ];
    let floats = [
        Instruction::Ldc { bank: Bank::F32, dst: r(0), offset: 0 },
        Instruction::Ldc { bank: Bank::F32, dst: r(1), offset: 4 },
        Instruction::Float { op: FloatOp::Div, bank: FloatBank::F32, dst: r(2), a: r(0), b: r(1) },
        Instruction::Float { op: FloatOp::Sub, bank: FloatBank::F32, dst: r(3), a: r(2), b: r(2) },
        Instruction::St { seg: Segment::Output, bank: Bank::F32, src: r(3), addr: r(4) },
        Instruction::Stop,
    ];
    let float_constants = [1.0_f32.to_le_bytes(), 0.0_f32.to_le_bytes()].concat();
    let overflow = [
        Instruction::Ldc { bank: Bank::R128, dst: r(0), offset: 0 },
        Instruction::Arith { op: IntOp::Mul, signed: false, bank: IntBank::R128, dst: r(1), a: r(0), b: r(0) },
        Instruction::Fail,
        Instruction::Stop,
    ];
    let spin = [Instruction::Jmp { target: 0 }];

    let verdicts = [
        run(&hashing, &[], b"fingerprint"),
        run(&floats, &float_constants, &[]),
        run(&overflow, &[0xFF; 16], &[]),
        run(&spin, &[], &[]),
    ];

    let mut hash = 0xcbf2_9ce4_8422_2325_u64;
    for verdict in &verdicts {
        hash_bytes(&mut hash, &verdict.canonical_bytes());
    }

    format!("{hash:016x}")
}

fn main() {
    println!("{}", fingerprint());
}
