use bitvec::{field::BitField, order::Lsb0, view::BitView};

/// Trap Vector Base Address Register (mtvec and stvec).
///
/// # mtvec
///
/// > The mtvec register is an MXLEN-bit WARL read/write register that holds trap vector
/// > configuration, consisting of a vector base address (BASE) and a vector mode (MODE).
///
/// > When MODE=Direct, all traps into machine mode cause the pc to be set to the address in the
/// > BASE field. When MODE=Vectored, all synchronous exceptions into machine mode cause the pc to
/// > be set to the address in the BASE field, whereas interrupts cause the pc to be set to the
/// > address in the BASE field plus four times the interrupt cause number. For example, a
/// > machine-mode timer interrupt [...] causes the pc to be set to BASE+0x1c.
///
/// # stvec
///
/// > The stvec register is an SXLEN-bit read/write register that holds trap vector configuration,
/// > consisting of a vector base address (BASE) and a vector mode (MODE).
#[derive(Debug, Clone, Default)]
pub struct Tvec(u64);

impl Tvec {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn read(&self) -> u64 {
        self.0
    }

    pub fn write(&mut self, value: u64) {
        if value & 0b11 >= 2 {
            // Reserved MODE.
            // Since this is a WARL register, we can set the register to any legal value here.
            // Choose to preserve the old value.
        } else {
            self.0 = value;
        }
    }

    /// Returns the vector base address (stored in BASE field).
    ///
    /// Note that the returned address was encoded in the field right shifted by 2 bits.
    pub fn base(&self) -> u64 {
        self.0.view_bits::<Lsb0>()[2..].load_le::<u64>() << 2
    }

    /// Returns the vector mode (stored in MODE field).
    pub fn mode(&self) -> VectorMode {
        // Since MODE values >= 2 are never stored, only bit 0 matters.
        match self.0.view_bits::<Lsb0>()[0] {
            false => VectorMode::Direct,
            true => VectorMode::Vectored,
        }
    }

    /// Returns the address the pc is set to when trapping with the given `code`.
    pub fn trap_address(&self, is_interrupt: bool, code: u64) -> u64 {
        match (self.mode(), is_interrupt) {
            (VectorMode::Vectored, true) => self.base().wrapping_add(4 * code),
            _ => self.base(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorMode {
    Direct,
    Vectored,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_mode_keeps_old_value() {
        let mut tvec = Tvec::new();
        tvec.write(0x8000_0001);
        assert_eq!(VectorMode::Vectored, tvec.mode());
        tvec.write(0x1234_0002);
        assert_eq!(0x8000_0001, tvec.read());
        tvec.write(0x1234_0003);
        assert_eq!(0x8000_0001, tvec.read());
    }

    #[test]
    fn test_trap_address() {
        let mut tvec = Tvec::new();
        tvec.write(0x100);
        assert_eq!(0x100, tvec.trap_address(true, 7));
        tvec.write(0x101);
        assert_eq!(0x100, tvec.base());
        assert_eq!(0x100, tvec.trap_address(false, 11));
        assert_eq!(0x11C, tvec.trap_address(true, 7));
    }
}
