//! Arithmetic and memory suite: integer, float and segment access semantics.

#![allow(
    clippy::pedantic,
    clippy::nursery,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::float_cmp
)]

use half as _;
use k256 as _;
use proptest::prelude::*;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use sha3 as _;
use thiserror as _;
use verity_core::{
    assemble, checked_range, Bank, CmpOp, DecodeError, ExecutionContext, FailureReason, FaultCode,
    FloatBank, FloatCmp, FloatOp, Instruction, IntBank, IntOp, LoadError, NoLibraries, Opcode,
    Program, RegIdx, Segment, ShiftOp, Verdict, CANONICAL_NAN_F64,
};

fn r(index: u8) -> RegIdx {
    RegIdx::new(index).expect("valid index")
}

fn put(bank: Bank, dst: u8, bytes: &[u8]) -> Instruction {
    let mut imm = [0u8; 32];
    imm[..bytes.len()].copy_from_slice(bytes);
    Instruction::Put { bank, dst: r(dst), imm }
}

fn arith(op: IntOp, signed: bool, bank: IntBank) -> Instruction {
    Instruction::Arith { op, signed, bank, dst: r(2), a: r(0), b: r(1) }
}

fn run_with_input(program: &[Instruction], constants: &[u8], input: Vec<u8>) -> (ExecutionContext, Verdict) {
    let mut ctx = ExecutionContext::load(&assemble(program), constants, input, None).expect("program loads");
    let verdict = ctx.run(&NoLibraries);
    (ctx, verdict)
}

fn run(program: &[Instruction]) -> (ExecutionContext, Verdict) {
    run_with_input(program, &[], Vec::new())
}

fn fault(verdict: &Verdict) -> Option<FaultCode> {
    verdict.failure_reason().and_then(FailureReason::fault)
}

proptest! {
    #[test]
    fn unsigned_32_bit_ops_match_native(a in any::<u32>(), b in any::<u32>(), op_index in 0usize..3) {
        let op = [IntOp::Add, IntOp::Sub, IntOp::Mul][op_index];
        let (ctx, verdict) = run(&[
            put(Bank::A32, 0, &a.to_le_bytes()),
            put(Bank::A32, 1, &b.to_le_bytes()),
            arith(op, false, IntBank::A32),
            Instruction::Stop,
        ]);
        let (expected, overflow) = match op {
            IntOp::Add => a.overflowing_add(b),
            IntOp::Sub => a.overflowing_sub(b),
            _ => a.overflowing_mul(b),
        };
        prop_assert!(verdict.is_success());
        prop_assert_eq!(ctx.registers().a32(r(2)), expected);
        prop_assert_eq!(ctx.control().carry(), overflow);
    }

    #[test]
    fn signed_64_bit_ops_match_native(a in any::<i64>(), b in any::<i64>(), op_index in 0usize..5) {
        let op = [IntOp::Add, IntOp::Sub, IntOp::Mul, IntOp::Div, IntOp::Rem][op_index];
        let (ctx, _) = run(&[
            put(Bank::A64, 0, &a.to_le_bytes()),
            put(Bank::A64, 1, &b.to_le_bytes()),
            arith(op, true, IntBank::A64),
            Instruction::Stop,
        ]);
        let native = match op {
            IntOp::Add => Some(a.overflowing_add(b)),
            IntOp::Sub => Some(a.overflowing_sub(b)),
            IntOp::Mul => Some(a.overflowing_mul(b)),
            IntOp::Div => (b != 0).then(|| a.overflowing_div(b)),
            IntOp::Rem => (b != 0).then(|| a.overflowing_rem(b)),
        };
        match native {
            Some((expected, overflow)) => {
                prop_assert_eq!(ctx.registers().a64(r(2)) as i64, expected);
                prop_assert_eq!(ctx.control().carry(), overflow);
                prop_assert!(!ctx.control().failure());
            }
            None => {
                prop_assert_eq!(ctx.registers().a64(r(2)), 0);
                prop_assert!(ctx.control().failure());
            }
        }
    }
}

#[rstest]
#[case(IntOp::Div)]
#[case(IntOp::Rem)]
fn division_by_zero_keeps_destination_and_raises_failure(#[case] op: IntOp) {
    let (ctx, verdict) = run(&[
        put(Bank::A16, 0, &100u16.to_le_bytes()),
        put(Bank::A16, 2, &7u16.to_le_bytes()),
        arith(op, false, IntBank::A16),
        Instruction::Stop,
    ]);
    assert_eq!(ctx.registers().a16(r(2)), 7);
    assert!(ctx.control().failure());
    assert_eq!(verdict.failure_reason(), Some(FailureReason::Rejected));
}

#[test]
fn division_by_zero_can_be_recovered_with_succ() {
    let (_, verdict) = run(&[arith(IntOp::Div, false, IntBank::A8), Instruction::Succ, Instruction::Stop]);
    match verdict {
        Verdict::Success { registers, .. } => assert_eq!(registers.control.failure_count(), 1),
        Verdict::Failure { .. } => panic!("succ clears the flag"),
    }
}

#[rstest]
#[case(IntOp::Div, i8::MIN as u8)]
#[case(IntOp::Rem, 0)]
fn signed_min_by_minus_one_wraps_with_carry(#[case] op: IntOp, #[case] expected: u8) {
    let (ctx, verdict) = run(&[
        put(Bank::A8, 0, &[i8::MIN as u8]),
        put(Bank::A8, 1, &[0xFF]),
        arith(op, true, IntBank::A8),
        Instruction::Stop,
    ]);
    assert!(verdict.is_success());
    assert_eq!(ctx.registers().read_u64(Bank::A8, r(2)), u64::from(expected));
    assert!(ctx.control().carry());
}

#[test]
fn wide_multiplication_reports_overflow() {
    let (ctx, _) = run(&[
        put(Bank::R256, 0, &[0xFF; 32]),
        put(Bank::R256, 1, &[2]),
        Instruction::Conv { dst_bank: IntBank::R1024, dst: r(0), src_bank: IntBank::R256, src: r(0), signed: false },
        Instruction::Conv { dst_bank: IntBank::R1024, dst: r(1), src_bank: IntBank::R256, src: r(1), signed: false },
        arith(IntOp::Mul, false, IntBank::R1024),
        Instruction::Stop,
    ]);
    assert!(!ctx.control().carry());
    let product = ctx.registers().slot(Bank::R1024, r(2));
    assert_eq!(product[0], 0xFE);
    assert!(product[1..32].iter().all(|byte| *byte == 0xFF));
    assert_eq!(product[32], 0x01);
    assert!(product[33..].iter().all(|byte| *byte == 0));

    let (ctx, _) = run(&[
        put(Bank::R128, 0, &[0xFF; 16]),
        put(Bank::R128, 1, &[2]),
        arith(IntOp::Mul, false, IntBank::R128),
        Instruction::Stop,
    ]);
    assert!(ctx.control().carry());
}

#[rstest]
#[case(ShiftOp::Shl, 1, 0x02, true)]
#[case(ShiftOp::Shl, 0, 0x81, false)]
#[case(ShiftOp::Shr, 1, 0x40, true)]
#[case(ShiftOp::Shr, 8, 0x00, true)]
#[case(ShiftOp::Shl, 300, 0x00, true)]
#[case(ShiftOp::Rol, 9, 0x03, false)]
#[case(ShiftOp::Ror, 1, 0xC0, false)]
fn shifts_are_width_aware(#[case] op: ShiftOp, #[case] amount: u16, #[case] expected: u8, #[case] carry: bool) {
    let (ctx, _) = run(&[
        put(Bank::A8, 0, &[0x81]),
        put(Bank::A16, 0, &amount.to_le_bytes()),
        Instruction::Shift { op, bank: IntBank::A8, dst: r(1), src: r(0), amount: r(0) },
        Instruction::Stop,
    ]);
    assert_eq!(ctx.registers().read_u64(Bank::A8, r(1)), u64::from(expected));
    assert_eq!(ctx.control().carry(), carry);
}

#[test]
fn rotates_leave_carry_untouched() {
    let (ctx, _) = run(&[
        Instruction::InvCarry,
        Instruction::Shift { op: ShiftOp::Rol, bank: IntBank::A64, dst: r(0), src: r(0), amount: r(0) },
        Instruction::Stop,
    ]);
    assert!(ctx.control().carry());
}

#[rstest]
#[case(IntBank::A8, &[0xFF][..], IntBank::A16, true, 0xFFFF, false)]
#[case(IntBank::A8, &[0xFF][..], IntBank::A16, false, 0x00FF, false)]
#[case(IntBank::A16, &[0x34, 0x12][..], IntBank::A8, false, 0x34, true)]
#[case(IntBank::A16, &[0xFE, 0xFF][..], IntBank::A8, true, 0xFE, false)]
fn conversions_flag_lost_information(
    #[case] from: IntBank,
    #[case] bytes: &[u8],
    #[case] to: IntBank,
    #[case] signed: bool,
    #[case] expected: u64,
    #[case] lost: bool,
) {
    let (ctx, _) = run(&[
        put(from.bank(), 0, bytes),
        Instruction::Conv { dst_bank: to, dst: r(1), src_bank: from, src: r(0), signed },
        Instruction::Stop,
    ]);
    assert_eq!(ctx.registers().read_u64(to.bank(), r(1)), expected);
    assert_eq!(ctx.control().carry(), lost);
}

#[rstest]
#[case(CmpOp::Eq, 5, 5, true)]
#[case(CmpOp::Lt, 0xFFFF_FFFF, 1, false)]
#[case(CmpOp::LtSigned, 0xFFFF_FFFF, 1, true)]
fn comparisons_write_carry(#[case] op: CmpOp, #[case] a: u32, #[case] b: u32, #[case] expected: bool) {
    let (ctx, _) = run(&[
        put(Bank::A32, 0, &a.to_le_bytes()),
        put(Bank::A32, 1, &b.to_le_bytes()),
        Instruction::Compare { op, bank: IntBank::A32, a: r(0), b: r(1) },
        Instruction::Stop,
    ]);
    assert_eq!(ctx.control().carry(), expected);
}

#[test]
fn float_arithmetic_is_ieee_with_canonical_nan() {
    let (ctx, _) = run(&[
        put(Bank::F64, 0, &1.5f64.to_le_bytes()),
        put(Bank::F64, 1, &2.25f64.to_le_bytes()),
        Instruction::Float { op: FloatOp::Add, bank: FloatBank::F64, dst: r(2), a: r(0), b: r(1) },
        Instruction::Float { op: FloatOp::Div, bank: FloatBank::F64, dst: r(3), a: r(4), b: r(4) },
        Instruction::FNeg { bank: FloatBank::F64, dst: r(5), src: r(0) },
        Instruction::FCompare { op: FloatCmp::Lt, bank: FloatBank::F64, a: r(5), b: r(0) },
        Instruction::Stop,
    ]);
    let regs = ctx.registers();
    assert_eq!(f64::from_bits(regs.read_u64(Bank::F64, r(2))), 3.75);
    assert_eq!(regs.read_u64(Bank::F64, r(3)), CANONICAL_NAN_F64);
    assert_eq!(f64::from_bits(regs.read_u64(Bank::F64, r(5))), -1.5);
    assert!(ctx.control().carry());
}

#[test]
fn nan_never_compares_equal() {
    let (ctx, _) = run(&[
        Instruction::Float { op: FloatOp::Div, bank: FloatBank::F32, dst: r(0), a: r(1), b: r(1) },
        Instruction::InvCarry,
        Instruction::FCompare { op: FloatCmp::Eq, bank: FloatBank::F32, a: r(0), b: r(0) },
        Instruction::Stop,
    ]);
    assert!(!ctx.control().carry());
}

#[test]
fn stores_fill_output_up_to_the_high_water_mark() {
    let (ctx, verdict) = run(&[
        put(Bank::A32, 0, &4u32.to_le_bytes()),
        put(Bank::A16, 1, &0xBEEFu16.to_le_bytes()),
        Instruction::St { seg: Segment::Output, bank: Bank::A16, src: r(1), addr: r(0) },
        Instruction::Len { seg: Segment::Output, dst: r(2) },
        Instruction::Stop,
    ]);
    assert_eq!(verdict.output(), Some(&[0, 0, 0, 0, 0xEF, 0xBE][..]));
    assert_eq!(ctx.registers().a32(r(2)), 6);
}

#[test]
fn input_constants_and_static_round_trip_through_registers() {
    let (ctx, verdict) = run_with_input(
        &[
            put(Bank::A32, 0, &1u32.to_le_bytes()),
            Instruction::Ld { seg: Segment::Input, bank: Bank::A16, dst: r(0), addr: r(0) },
            Instruction::Ldc { bank: Bank::A8, dst: r(0), offset: 2 },
            Instruction::St { seg: Segment::Static, bank: Bank::A16, src: r(0), addr: r(0) },
            Instruction::Ld { seg: Segment::Static, bank: Bank::A32, dst: r(1), addr: r(1) },
            Instruction::Len { seg: Segment::Input, dst: r(2) },
            Instruction::Len { seg: Segment::Constant, dst: r(3) },
            Instruction::Stop,
        ],
        &[10, 20, 30],
        vec![1, 2, 3, 4],
    );
    assert!(verdict.is_success());
    let regs = ctx.registers();
    assert_eq!(regs.a16(r(0)), 0x0302);
    assert_eq!(regs.read_u64(Bank::A8, r(0)), 30);
    assert_eq!(regs.a32(r(1)), 0x0003_0200);
    assert_eq!(regs.a32(r(2)), 4);
    assert_eq!(regs.a32(r(3)), 3);
}

#[rstest]
#[case(Segment::Input, 3)]
#[case(Segment::Input, u32::MAX)]
#[case(Segment::Constant, 0)]
fn reads_past_the_segment_fault(#[case] seg: Segment, #[case] addr: u32) {
    let (ctx, verdict) = run_with_input(
        &[
            put(Bank::A32, 0, &addr.to_le_bytes()),
            Instruction::Ld { seg, bank: Bank::A16, dst: r(1), addr: r(0) },
            Instruction::Stop,
        ],
        &[],
        vec![9, 9, 9, 9],
    );
    assert_eq!(fault(&verdict), Some(FaultCode::SegmentOutOfBounds));
    assert_eq!(ctx.registers().a16(r(1)), 0);
}

#[test]
fn writes_past_the_output_capacity_fault() {
    let (ctx, verdict) = run(&[
        put(Bank::A32, 0, &(verity_core::OUTPUT_SEGMENT_MAX as u32 - 4).to_le_bytes()),
        Instruction::St { seg: Segment::Output, bank: Bank::A64, src: r(0), addr: r(0) },
        Instruction::Stop,
    ]);
    assert_eq!(fault(&verdict), Some(FaultCode::SegmentOutOfBounds));
    assert!(ctx.output().is_empty());
}

proptest! {
    #[test]
    fn loads_succeed_exactly_when_in_bounds(
        input in proptest::collection::vec(any::<u8>(), 0..64),
        addr in 0u32..80,
        bank_index in 0usize..5,
    ) {
        let bank = [Bank::A8, Bank::A16, Bank::A32, Bank::A64, Bank::R128][bank_index];
        let (ctx, verdict) = run_with_input(
            &[
                put(Bank::A32, 0, &addr.to_le_bytes()),
                Instruction::Ld { seg: Segment::Input, bank, dst: r(1), addr: r(0) },
                Instruction::Stop,
            ],
            &[],
            input.clone(),
        );
        match checked_range(input.len(), addr, bank.bytes()) {
            Some(range) => {
                prop_assert!(verdict.is_success());
                prop_assert_eq!(ctx.registers().slot(bank, r(1)), &input[range]);
            }
            None => prop_assert_eq!(fault(&verdict), Some(FaultCode::SegmentOutOfBounds)),
        }
    }
}

#[rstest]
#[case(Opcode::St, 2)]
#[case(Opcode::St, 0)]
#[case(Opcode::Ld, 3)]
#[case(Opcode::Ld, 9)]
fn segment_permissions_are_checked_at_load(#[case] opcode: Opcode, #[case] seg: u8) {
    let code = [opcode.as_u8(), seg, Bank::A8.as_u8(), 0, 0, Opcode::Stop.as_u8()];
    match Program::new(&code, &[]) {
        Err(LoadError::Decode { source, .. }) => {
            assert_eq!(source, DecodeError::InvalidSegment { opcode, code: seg });
        }
        other => panic!("unexpected {other:?}"),
    }
}
