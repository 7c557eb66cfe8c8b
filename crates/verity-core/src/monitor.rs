//! Resource accounting: the cycle counter and the complexity accumulator.

use crate::fault::FaultCode;
use crate::state::ControlRegisters;

/// Number of control transfers a program may take before it is stopped.
pub const CYCLE_CEILING: u32 = 1 << 16;

/// Charges `cost` complexity units before an instruction executes.
///
/// The accumulator never exceeds the configured limit: a charge that would
/// cross it is refused and nothing is committed.
///
/// # Errors
///
/// Returns [`FaultCode::ComplexityLimitExceeded`] when the charge would push
/// the accumulator above the limit.
pub const fn charge_complexity(control: &mut ControlRegisters, cost: u64) -> Result<(), FaultCode> {
    let next = control.complexity().saturating_add(cost);
    if let Some(limit) = control.complexity_limit() {
        if next > limit {
            return Err(FaultCode::ComplexityLimitExceeded);
        }
    }
    control.set_complexity(next);
    Ok(())
}

/// Counts one control transfer (taken jump, call or return).
///
/// # Errors
///
/// Returns [`FaultCode::CycleLimitExceeded`] when the 16-bit counter would
/// wrap; the counter keeps its last value.
pub const fn record_cycle(control: &mut ControlRegisters) -> Result<(), FaultCode> {
    match control.cycles().checked_add(1) {
        Some(cycles) => {
            control.set_cycles(cycles);
            Ok(())
        }
        None => Err(FaultCode::CycleLimitExceeded),
    }
}

/// Cycles consumed as reported in verdicts.
///
/// A run refused at the ceiling reports the full ceiling even though the
/// 16-bit counter stopped one short of it.
#[must_use]
#[allow(clippy::cast_lossless)]
pub const fn cycles_used(control: &ControlRegisters, fault: Option<FaultCode>) -> u32 {
    match fault {
        Some(FaultCode::CycleLimitExceeded) => CYCLE_CEILING,
        _ => control.cycles() as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::{charge_complexity, cycles_used, record_cycle, CYCLE_CEILING};
    use crate::fault::FaultCode;
    use crate::state::ControlRegisters;

    #[test]
    fn complexity_stops_exactly_at_the_limit() {
        let mut control = ControlRegisters::new(Some(10), false);
        assert_eq!(charge_complexity(&mut control, 6), Ok(()));
        assert_eq!(charge_complexity(&mut control, 4), Ok(()));
        assert_eq!(control.complexity(), 10);
        assert_eq!(
            charge_complexity(&mut control, 1),
            Err(FaultCode::ComplexityLimitExceeded)
        );
        assert_eq!(control.complexity(), 10);
    }

    #[test]
    fn unlimited_complexity_saturates() {
        let mut control = ControlRegisters::new(None, false);
        assert_eq!(charge_complexity(&mut control, u64::MAX), Ok(()));
        assert_eq!(charge_complexity(&mut control, 5), Ok(()));
        assert_eq!(control.complexity(), u64::MAX);
    }

    #[test]
    fn cycle_counter_refuses_the_transfer_past_the_ceiling() {
        let mut control = ControlRegisters::default();
        for _ in 0..u16::MAX {
            assert_eq!(record_cycle(&mut control), Ok(()));
        }
        assert_eq!(control.cycles(), u16::MAX);
        assert_eq!(record_cycle(&mut control), Err(FaultCode::CycleLimitExceeded));
        assert_eq!(control.cycles(), u16::MAX);
        assert_eq!(cycles_used(&control, Some(FaultCode::CycleLimitExceeded)), CYCLE_CEILING);
        assert_eq!(cycles_used(&control, None), 65_535);
    }
}
