use bitvec::{array::BitArray, field::BitField, order::Lsb0};

use super::Interrupt;

const USER_SOFTWARE_INTERRUPT: usize = Interrupt::UserSoftwareInterrupt as usize;
const USER_TIMER_INTERRUPT: usize = Interrupt::UserTimerInterrupt as usize;
const USER_EXTERNAL_INTERRUPT: usize = Interrupt::UserExternalInterrupt as usize;
const SUPERVISOR_SOFTWARE_INTERRUPT: usize = Interrupt::SupervisorSoftwareInterrupt as usize;
const MACHINE_SOFTWARE_INTERRUPT: usize = Interrupt::MachineSoftwareInterrupt as usize;
const SUPERVISOR_TIMER_INTERRUPT: usize = Interrupt::SupervisorTimerInterrupt as usize;
const MACHINE_TIMER_INTERRUPT: usize = Interrupt::MachineTimerInterrupt as usize;
const SUPERVISOR_EXTERNAL_INTERRUPT: usize = Interrupt::SupervisorExternalInterrupt as usize;
const MACHINE_EXTERNAL_INTERRUPT: usize = Interrupt::MachineExternalInterrupt as usize;

#[allow(clippy::identity_op)]
const VALID_INTERRUPTS_MASK: u16 = 0
    | USER_INTERRUPTS_MASK
    | (1 << SUPERVISOR_SOFTWARE_INTERRUPT)
    | (1 << MACHINE_SOFTWARE_INTERRUPT)
    | (1 << SUPERVISOR_TIMER_INTERRUPT)
    | (1 << MACHINE_TIMER_INTERRUPT)
    | (1 << SUPERVISOR_EXTERNAL_INTERRUPT)
    | (1 << MACHINE_EXTERNAL_INTERRUPT);

#[allow(clippy::identity_op)]
const USER_INTERRUPTS_MASK: u16 = 0
    | (1 << USER_SOFTWARE_INTERRUPT)
    | (1 << USER_TIMER_INTERRUPT)
    | (1 << USER_EXTERNAL_INTERRUPT);

#[allow(clippy::identity_op)]
const SUPERVISOR_INTERRUPTS_MASK: u16 = 0
    | (1 << SUPERVISOR_SOFTWARE_INTERRUPT)
    | (1 << SUPERVISOR_TIMER_INTERRUPT)
    | (1 << SUPERVISOR_EXTERNAL_INTERRUPT);

/// Pending bits software may write through mip. The machine-level bits are only driven from
/// outside the hart, see [`Interrupts::set_pending`].
const MIP_WRITE_MASK: u16 = SUPERVISOR_INTERRUPTS_MASK | USER_INTERRUPTS_MASK;

/// Pending bits software may write through sip.
const SIP_WRITE_MASK: u16 = 1 << SUPERVISOR_SOFTWARE_INTERRUPT;

const_assert_eq!(VALID_INTERRUPTS_MASK, 0x0BBB);
const_assert_eq!(USER_INTERRUPTS_MASK, 0x0111);
const_assert_eq!(SUPERVISOR_INTERRUPTS_MASK, 0x0222);

/// Provides the mip, mie, mideleg, sip and sie registers.
///
/// Traps are always taken into M-mode, so mideleg only holds its value.
#[derive(Debug, Clone)]
pub struct Interrupts {
    /// The mip register, with for each bit index matching an interrupt's code whether that
    /// interrupt is pending.
    mip: BitArray<[u16; 1], Lsb0>,

    /// The mie register.
    mie: BitArray<[u16; 1], Lsb0>,

    /// The mideleg register.
    mideleg: BitArray<[u16; 1], Lsb0>,
}

impl Default for Interrupts {
    fn default() -> Self {
        Self::new()
    }
}

impl Interrupts {
    pub fn new() -> Self {
        Self {
            mip: BitArray::new([0x0000]),
            mie: BitArray::new([0x0000]),
            mideleg: BitArray::new([0x0000]),
        }
    }

    /// Marks `interrupt` as pending (or not). This is how devices outside the hart raise
    /// interrupts.
    pub fn set_pending(&mut self, interrupt: Interrupt, value: bool) {
        self.mip.set(interrupt as usize, value);
    }

    pub fn is_pending(&self, interrupt: Interrupt) -> bool {
        self.mip[interrupt as usize]
    }

    pub fn is_enabled(&self, interrupt: Interrupt) -> bool {
        self.mie[interrupt as usize]
    }

    /// Returns the highest priority interrupt that is both pending and enabled in mie.
    ///
    /// Whether it can be taken also depends on the global enable bit in mstatus and the current
    /// privilege level, which is decided by the core.
    pub fn highest_priority_enabled(&self) -> Option<Interrupt> {
        Interrupt::BY_PRIORITY
            .into_iter()
            .find(|&interrupt| self.is_pending(interrupt) && self.is_enabled(interrupt))
    }

    pub fn read_mip(&self) -> u64 {
        self.mip.load_le::<u16>() as u64
    }

    pub fn write_mip(&mut self, value: u64) {
        Self::write_masked(&mut self.mip, value, MIP_WRITE_MASK);
    }

    pub fn read_mie(&self) -> u64 {
        self.mie.load_le::<u16>() as u64
    }

    pub fn write_mie(&mut self, value: u64) {
        Self::write_masked(&mut self.mie, value, VALID_INTERRUPTS_MASK);
    }

    pub fn read_sip(&self) -> u64 {
        self.read_mip() & SUPERVISOR_INTERRUPTS_MASK as u64
    }

    pub fn write_sip(&mut self, value: u64) {
        Self::write_masked(&mut self.mip, value, SIP_WRITE_MASK);
    }

    pub fn read_sie(&self) -> u64 {
        self.read_mie() & SUPERVISOR_INTERRUPTS_MASK as u64
    }

    pub fn write_sie(&mut self, value: u64) {
        Self::write_masked(&mut self.mie, value, SUPERVISOR_INTERRUPTS_MASK);
    }

    pub fn read_mideleg(&self) -> u64 {
        self.mideleg.load_le::<u16>() as u64
    }

    pub fn write_mideleg(&mut self, value: u64) {
        Self::write_masked(&mut self.mideleg, value, SUPERVISOR_INTERRUPTS_MASK);
    }

    fn write_masked(register: &mut BitArray<[u16; 1], Lsb0>, value: u64, mask: u16) {
        let old = register.load_le::<u16>();
        register.store_le(old & !mask | value as u16 & mask);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority() {
        let mut interrupts = Interrupts::new();
        interrupts.write_mie(u64::MAX);
        assert_eq!(0x0BBB, interrupts.read_mie());
        assert_eq!(None, interrupts.highest_priority_enabled());
        interrupts.set_pending(Interrupt::SupervisorTimerInterrupt, true);
        interrupts.set_pending(Interrupt::MachineTimerInterrupt, true);
        assert_eq!(
            Some(Interrupt::MachineTimerInterrupt),
            interrupts.highest_priority_enabled()
        );
        interrupts.set_pending(Interrupt::MachineSoftwareInterrupt, true);
        assert_eq!(
            Some(Interrupt::MachineSoftwareInterrupt),
            interrupts.highest_priority_enabled()
        );
        interrupts.write_mie(1 << SUPERVISOR_TIMER_INTERRUPT);
        assert_eq!(
            Some(Interrupt::SupervisorTimerInterrupt),
            interrupts.highest_priority_enabled()
        );
        interrupts.set_pending(Interrupt::UserTimerInterrupt, true);
        interrupts.write_mie(1 << USER_TIMER_INTERRUPT | 1 << SUPERVISOR_TIMER_INTERRUPT);
        assert_eq!(
            Some(Interrupt::SupervisorTimerInterrupt),
            interrupts.highest_priority_enabled()
        );
        interrupts.write_mie(1 << USER_TIMER_INTERRUPT);
        assert_eq!(
            Some(Interrupt::UserTimerInterrupt),
            interrupts.highest_priority_enabled()
        );
    }

    #[test]
    fn test_machine_pending_bits_are_read_only() {
        let mut interrupts = Interrupts::new();
        interrupts.write_mip(u64::MAX);
        assert_eq!(0x0333, interrupts.read_mip());
        interrupts.write_sip(0);
        assert_eq!(0x0220, interrupts.read_sip());
        interrupts.set_pending(Interrupt::MachineExternalInterrupt, true);
        assert_eq!(0x0B31, interrupts.read_mip());
        assert_eq!(0x0220, interrupts.read_sip());
    }
}
