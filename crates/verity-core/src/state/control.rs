/// Control registers: status flags, resource counters and the call-stack pointer.
///
/// Counters only move through [`crate::monitor`] and the executor; hosts
/// observe them through the verdict snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(clippy::struct_excessive_bools)]
pub struct ControlRegisters {
    failure: bool,
    carry: bool,
    auto_halt: bool,
    failure_count: u64,
    cycles: u16,
    complexity: u64,
    complexity_limit: Option<u64>,
    call_stack_pointer: u32,
}

/// Length of [`ControlRegisters::canonical_bytes`].
pub const CONTROL_REGISTERS_CANONICAL_BYTES: usize = 1 + 8 + 2 + 8 + 1 + 8 + 4;

impl ControlRegisters {
    /// Creates control registers for a fresh execution.
    #[must_use]
    pub const fn new(complexity_limit: Option<u64>, auto_halt: bool) -> Self {
        Self {
            failure: false,
            carry: false,
            auto_halt,
            failure_count: 0,
            cycles: 0,
            complexity: 0,
            complexity_limit,
            call_stack_pointer: 0,
        }
    }

    /// Soft failure flag.
    #[must_use]
    pub const fn failure(&self) -> bool {
        self.failure
    }

    /// Sets the failure flag and counts the failure event.
    pub const fn raise_failure(&mut self) {
        self.failure = true;
        self.failure_count = self.failure_count.saturating_add(1);
    }

    /// Clears the failure flag. The failure count is kept.
    pub const fn clear_failure(&mut self) {
        self.failure = false;
    }

    /// Carry/overflow flag, also the result of comparisons.
    #[must_use]
    pub const fn carry(&self) -> bool {
        self.carry
    }

    /// Overwrites the carry flag.
    pub const fn set_carry(&mut self, carry: bool) {
        self.carry = carry;
    }

    /// Whether raising the failure flag halts execution at once.
    #[must_use]
    pub const fn auto_halt(&self) -> bool {
        self.auto_halt
    }

    /// Enables or disables auto-halt.
    pub const fn set_auto_halt(&mut self, enabled: bool) {
        self.auto_halt = enabled;
    }

    /// Number of failure events raised so far.
    #[must_use]
    pub const fn failure_count(&self) -> u64 {
        self.failure_count
    }

    /// Control transfers taken so far.
    #[must_use]
    pub const fn cycles(&self) -> u16 {
        self.cycles
    }

    pub(crate) const fn set_cycles(&mut self, cycles: u16) {
        self.cycles = cycles;
    }

    /// Complexity units consumed so far.
    #[must_use]
    pub const fn complexity(&self) -> u64 {
        self.complexity
    }

    pub(crate) const fn set_complexity(&mut self, complexity: u64) {
        self.complexity = complexity;
    }

    /// Configured complexity ceiling, if any.
    #[must_use]
    pub const fn complexity_limit(&self) -> Option<u64> {
        self.complexity_limit
    }

    /// Bytes currently in use in the call stack segment.
    #[must_use]
    pub const fn call_stack_pointer(&self) -> u32 {
        self.call_stack_pointer
    }

    pub(crate) const fn set_call_stack_pointer(&mut self, pointer: u32) {
        self.call_stack_pointer = pointer;
    }

    /// Fixed-layout little-endian image used for verdict hashing.
    ///
    /// Layout: flags byte (bit 0 failure, bit 1 carry, bit 2 auto-halt),
    /// failure count, cycles, complexity, limit presence byte, limit, call-stack pointer.
    #[must_use]
    pub fn canonical_bytes(&self) -> [u8; CONTROL_REGISTERS_CANONICAL_BYTES] {
        let mut out = [0u8; CONTROL_REGISTERS_CANONICAL_BYTES];
        out[0] = u8::from(self.failure) | (u8::from(self.carry) << 1) | (u8::from(self.auto_halt) << 2);
        out[1..9].copy_from_slice(&self.failure_count.to_le_bytes());
        out[9..11].copy_from_slice(&self.cycles.to_le_bytes());
        out[11..19].copy_from_slice(&self.complexity.to_le_bytes());
        out[19] = u8::from(self.complexity_limit.is_some());
        out[20..28].copy_from_slice(&self.complexity_limit.unwrap_or(0).to_le_bytes());
        out[28..32].copy_from_slice(&self.call_stack_pointer.to_le_bytes());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::ControlRegisters;

    #[test]
    fn fresh_registers_are_clear() {
        let control = ControlRegisters::new(Some(10), true);
        assert!(!control.failure());
        assert!(!control.carry());
        assert!(control.auto_halt());
        assert_eq!(control.failure_count(), 0);
        assert_eq!(control.cycles(), 0);
        assert_eq!(control.complexity(), 0);
        assert_eq!(control.complexity_limit(), Some(10));
    }

    #[test]
    fn failure_count_survives_clearing_the_flag() {
        let mut control = ControlRegisters::default();
        control.raise_failure();
        control.raise_failure();
        control.clear_failure();
        assert!(!control.failure());
        assert_eq!(control.failure_count(), 2);
    }

    #[test]
    fn canonical_bytes_encode_flags_and_counters() {
        let mut control = ControlRegisters::new(None, false);
        control.set_carry(true);
        control.raise_failure();
        control.set_cycles(0x0102);
        let bytes = control.canonical_bytes();
        assert_eq!(bytes[0], 0b011);
        assert_eq!(bytes[1], 1);
        assert_eq!(&bytes[9..11], &[0x02, 0x01]);
        assert_eq!(bytes[19], 0);
    }
}
