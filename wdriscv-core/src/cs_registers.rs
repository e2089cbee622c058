//! Control and Status Registers.
//!
//! Part of the "Zicsr" extension.

use crate::core::control::Tvec;
use crate::core::interrupts::Interrupts;
use crate::core::status::Status;
use crate::{PrivilegeLevel, RawPrivilegeLevel, Xlen};
use thiserror::Error;

/// Control and Status Registers for a single hart with registers of width `X`.
///
/// > RISC-V defines a separate address space of 4096 Control and Status registers associated with
/// > each hart.
///
/// > The standard RISC-V ISA sets aside a 12-bit encoding space (csr\[11:0]) for up to 4,096 CSRs.
/// > By convention, the upper 4 bits of the CSR address (csr\[11:8]) are used to encode the read
/// > and write accessibility of the CSRs according to privilege level as shown in Table 2.1. The
/// > top two bits (csr\[11:10]) indicate whether the register is read/write (00, 01, or 10) or
/// > read-only (11). The next two bits (csr\[9:8]) encode the lowest privilege level that can
/// > access the CSR.
///
/// Each implemented CSR applies its own mask of writable bits. Writes to read-only bits (or
/// fields) of a read/write CSR are silently dropped, while writes to a read-only CSR fail.
#[derive(Debug, Clone)]
pub struct CsRegisters<X: Xlen> {
    /// Whether the C extension is enabled, which affects misa and the alignment of xepc.
    compressed: bool,
    status: Status,
    interrupts: Interrupts,
    medeleg: X,
    mtvec: Tvec,
    stvec: Tvec,

    mscratch: X,
    mepc: X,
    mcause: X,
    mtval: X,

    sscratch: X,
    sepc: X,
    scause: X,
    stval: X,

    /// > RISC-V ISAs provide a set of up to 32×64-bit performance counters and timers [...]. The
    /// > first three of these (CYCLE, TIME, and INSTRET) have dedicated functions (cycle count,
    /// > real-time clock, and instructions-retired respectively).
    ///
    /// Every instruction takes a single cycle, but only instructions that don't trap retire.
    mcycle: u64,
    minstret: u64,
}

/// Mode whose trap registers (xepc, xcause, xtval, xtvec) are accessed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TrapMode {
    Machine,
    Supervisor,
}

impl<X: Xlen> CsRegisters<X> {
    /// Creates a fresh collection of registers initialized to their reset values.
    pub fn new(compressed: bool) -> Self {
        Self {
            compressed,
            status: Status::new(X::BASE),
            interrupts: Interrupts::new(),
            medeleg: X::ZERO,
            mtvec: Tvec::new(),
            stvec: Tvec::new(),
            mscratch: X::ZERO,
            mepc: X::ZERO,
            mcause: X::ZERO,
            mtval: X::ZERO,
            sscratch: X::ZERO,
            sepc: X::ZERO,
            scause: X::ZERO,
            stval: X::ZERO,
            mcycle: 0,
            minstret: 0,
        }
    }

    /// Force all Control and Status registers to their reset state.
    pub fn reset(&mut self) {
        *self = Self::new(self.compressed);
    }

    /// Read the value of a CSR by its specifier.
    ///
    /// `privilege_level` indicates at what privilege level the read is performed. If the CSR that
    /// is being read requires a higher privilege level (see
    /// [`specifier::required_privilege_level`]), then an [`AccessError::Privileged`] will be given.
    pub fn read(
        &self,
        specifier: CsrSpecifier,
        privilege_level: PrivilegeLevel,
    ) -> Result<X, AccessError> {
        Self::check_access(specifier, privilege_level)?;
        self.peek(specifier)
            .ok_or(AccessError::CsrUnsupported(specifier))
    }

    /// Returns the value of a CSR without checking privileges, or `None` if it isn't implemented.
    pub fn peek(&self, specifier: CsrSpecifier) -> Option<X> {
        let rv32 = !X::BASE.is_rv64();
        Some(match specifier {
            specifier::MVENDORID
            | specifier::MARCHID
            | specifier::MIMPID
            | specifier::MHARTID => X::ZERO,
            specifier::MISA => self.misa(),
            specifier::MSTATUS => X::from_u64(self.status.read_mstatus()),
            specifier::MEDELEG => self.medeleg,
            specifier::MIDELEG => X::from_u64(self.interrupts.read_mideleg()),
            specifier::MIE => X::from_u64(self.interrupts.read_mie()),
            specifier::MTVEC => X::from_u64(self.mtvec.read()),
            specifier::MSCRATCH => self.mscratch,
            specifier::MEPC => self.mepc,
            specifier::MCAUSE => self.mcause,
            specifier::MTVAL => self.mtval,
            specifier::MIP => X::from_u64(self.interrupts.read_mip()),
            specifier::SSTATUS => X::from_u64(self.status.read_sstatus()),
            specifier::SIE => X::from_u64(self.interrupts.read_sie()),
            specifier::STVEC => X::from_u64(self.stvec.read()),
            specifier::SSCRATCH => self.sscratch,
            specifier::SEPC => self.sepc,
            specifier::SCAUSE => self.scause,
            specifier::STVAL => self.stval,
            specifier::SIP => X::from_u64(self.interrupts.read_sip()),
            specifier::MCYCLE | specifier::CYCLE => X::from_u64(self.mcycle),
            specifier::MINSTRET | specifier::INSTRET => X::from_u64(self.minstret),
            specifier::MCYCLEH | specifier::CYCLEH if rv32 => X::from_u64(self.mcycle >> 32),
            specifier::MINSTRETH | specifier::INSTRETH if rv32 => {
                X::from_u64(self.minstret >> 32)
            }
            _ => return None,
        })
    }

    /// Write `value` to a CSR by its specifier, applying the CSR's mask of writable bits.
    ///
    /// Fails without side effects if the CSR doesn't exist, requires a higher privilege level, or
    /// is read-only.
    pub fn write(
        &mut self,
        specifier: CsrSpecifier,
        value: X,
        privilege_level: PrivilegeLevel,
    ) -> Result<(), AccessError> {
        Self::check_access(specifier, privilege_level)?;
        if specifier::is_read_only(specifier) {
            return Err(AccessError::WriteToReadOnly(specifier));
        }
        let rv32 = !X::BASE.is_rv64();
        let raw = value.to_u64();
        match specifier {
            // misa is read/write by address, but the implementation is fixed.
            specifier::MISA => {}
            specifier::MSTATUS => self.status.write_mstatus(raw),
            specifier::MEDELEG => {
                self.medeleg = X::from_u64(raw & DELEGATABLE_EXCEPTIONS_MASK);
            }
            specifier::MIDELEG => self.interrupts.write_mideleg(raw),
            specifier::MIE => self.interrupts.write_mie(raw),
            specifier::MTVEC => self.mtvec.write(raw),
            specifier::MSCRATCH => self.mscratch = value,
            specifier::MEPC => self.mepc = value.and(self.epc_mask()),
            specifier::MCAUSE => self.mcause = value,
            specifier::MTVAL => self.mtval = value,
            specifier::MIP => self.interrupts.write_mip(raw),
            specifier::SSTATUS => self.status.write_sstatus(raw),
            specifier::SIE => self.interrupts.write_sie(raw),
            specifier::STVEC => self.stvec.write(raw),
            specifier::SSCRATCH => self.sscratch = value,
            specifier::SEPC => self.sepc = value.and(self.epc_mask()),
            specifier::SCAUSE => self.scause = value,
            specifier::STVAL => self.stval = value,
            specifier::SIP => self.interrupts.write_sip(raw),
            specifier::MCYCLE if rv32 => self.mcycle = self.mcycle & !0xFFFF_FFFF | raw,
            specifier::MCYCLE => self.mcycle = raw,
            specifier::MCYCLEH if rv32 => self.mcycle = self.mcycle & 0xFFFF_FFFF | raw << 32,
            specifier::MINSTRET if rv32 => self.minstret = self.minstret & !0xFFFF_FFFF | raw,
            specifier::MINSTRET => self.minstret = raw,
            specifier::MINSTRETH if rv32 => {
                self.minstret = self.minstret & 0xFFFF_FFFF | raw << 32;
            }
            _ => return Err(AccessError::CsrUnsupported(specifier)),
        }
        Ok(())
    }

    fn check_access(
        specifier: CsrSpecifier,
        privilege_level: PrivilegeLevel,
    ) -> Result<(), AccessError> {
        if !specifier::is_valid(specifier) {
            return Err(AccessError::CsrUnsupported(specifier));
        }
        let required_level = specifier::required_privilege_level(specifier);
        if privilege_level < required_level {
            return Err(AccessError::Privileged {
                specifier,
                required_level,
                actual_level: privilege_level,
            });
        }
        Ok(())
    }

    /// The misa register. MXL is in the top two bits, followed by one bit per extension.
    fn misa(&self) -> X {
        let mut extensions: u64 = 1 << (b'I' - b'A')
            | 1 << (b'M' - b'A')
            | 1 << (b'S' - b'A')
            | 1 << (b'U' - b'A');
        if self.compressed {
            extensions |= 1 << (b'C' - b'A');
        }
        X::from_u64((X::BASE.mxl() as u64) << (X::BITS - 2) | extensions)
    }

    /// Mask applied to xepc. With the C extension, bit 0 is always zero; without it, bits 1:0.
    fn epc_mask(&self) -> X {
        match self.compressed {
            true => X::from_u64(!0b1),
            false => X::from_u64(!0b11),
        }
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn status_mut(&mut self) -> &mut Status {
        &mut self.status
    }

    pub fn interrupts(&self) -> &Interrupts {
        &self.interrupts
    }

    pub fn interrupts_mut(&mut self) -> &mut Interrupts {
        &mut self.interrupts
    }

    /// Returns the trap vector of `mode` (mtvec or stvec).
    pub fn tvec(&self, mode: TrapMode) -> &Tvec {
        match mode {
            TrapMode::Machine => &self.mtvec,
            TrapMode::Supervisor => &self.stvec,
        }
    }

    /// Returns the exception program counter of `mode` (mepc or sepc).
    pub fn epc(&self, mode: TrapMode) -> X {
        match mode {
            TrapMode::Machine => self.mepc,
            TrapMode::Supervisor => self.sepc,
        }
    }

    /// Sets the exception program counter of `mode`, clearing the bits that must be zero.
    pub fn set_epc(&mut self, mode: TrapMode, value: X) {
        let value = value.and(self.epc_mask());
        match mode {
            TrapMode::Machine => self.mepc = value,
            TrapMode::Supervisor => self.sepc = value,
        }
    }

    /// Returns the trap cause of `mode` (mcause or scause).
    pub fn cause(&self, mode: TrapMode) -> X {
        match mode {
            TrapMode::Machine => self.mcause,
            TrapMode::Supervisor => self.scause,
        }
    }

    pub fn set_cause(&mut self, mode: TrapMode, value: X) {
        match mode {
            TrapMode::Machine => self.mcause = value,
            TrapMode::Supervisor => self.scause = value,
        }
    }

    /// Returns the trap value of `mode` (mtval or stval).
    pub fn tval(&self, mode: TrapMode) -> X {
        match mode {
            TrapMode::Machine => self.mtval,
            TrapMode::Supervisor => self.stval,
        }
    }

    pub fn set_tval(&mut self, mode: TrapMode, value: X) {
        match mode {
            TrapMode::Machine => self.mtval = value,
            TrapMode::Supervisor => self.stval = value,
        }
    }

    /// Count a cycle in which an instruction retired.
    pub fn retire(&mut self) {
        self.mcycle = self.mcycle.wrapping_add(1);
        self.minstret = self.minstret.wrapping_add(1);
    }

    /// Count a cycle in which no instruction retired (a trap was taken instead).
    pub fn tick(&mut self) {
        self.mcycle = self.mcycle.wrapping_add(1);
    }

    pub fn mcycle(&self) -> u64 {
        self.mcycle
    }

    pub fn minstret(&self) -> u64 {
        self.minstret
    }
}

// Exceptions software may mark as delegated. Environment calls from M-mode can never be delegated.
#[allow(clippy::identity_op)]
const DELEGATABLE_EXCEPTIONS_MASK: u64 = 0
    | (1 << 0) // instruction address misaligned
    | (1 << 1) // instruction access fault
    | (1 << 2) // illegal instruction
    | (1 << 3) // breakpoint
    | (1 << 4) // load address misaligned
    | (1 << 5) // load access fault
    | (1 << 6) // store/AMO address misaligned
    | (1 << 7) // store/AMO access fault
    | (1 << 8) // environment call from U-mode
    | (1 << 9) // environment call from S-mode
    | (1 << 12) // instruction page fault
    | (1 << 13) // load page fault
    | (1 << 15); // store/AMO page fault

/// Errors that can occur when attempting to access a CSR.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum AccessError {
    #[error("unsupported CSR: {0:#05X}")]
    CsrUnsupported(CsrSpecifier),
    /// Attempt to access a CSR that requires a higher privilege level.
    #[error(
        "cannot access specifier {specifier:#05X} from privilege level {actual_level}, \
             since it requires privilege level {required_level}"
    )]
    Privileged {
        /// The CSR for which access was requested.
        specifier: CsrSpecifier,
        /// The minimum required privilege level to access that CSR.
        required_level: RawPrivilegeLevel,
        /// The actual privilege level from which the access was performed.
        actual_level: PrivilegeLevel,
    },
    /// Attempt to write to a read-only register.
    #[error("writing to read-only CSR {0:#05X} is invalid")]
    WriteToReadOnly(CsrSpecifier),
}

/// General 12-bit value representing a CSR specifier. Note that this can hold any 12-bit value,
/// even if the value represents an unsupported or non-existent CSR.
pub type CsrSpecifier = u16;

/// Specifiers for all supported CSRs.
pub mod specifier {
    use crate::RawPrivilegeLevel;

    use super::CsrSpecifier;

    //
    // Unprivileged counters/timers (`0xC00..=0xC1F`, `0xC80..=0xC9F`).
    //
    /// Cycle counter for RDCYCLE instruction.
    pub const CYCLE: CsrSpecifier = 0xC00;
    /// Instructions-retired counter for RDINSTRET instruction.
    pub const INSTRET: CsrSpecifier = 0xC02;
    /// Upper 32 bits of [`CYCLE`], RV32 only.
    pub const CYCLEH: CsrSpecifier = 0xC80;
    /// Upper 32 bits of [`INSTRET`], RV32 only.
    pub const INSTRETH: CsrSpecifier = 0xC82;

    //
    // Supervisor trap setup (`0x100`, `0x104..=0x105`).
    //
    /// Supervisor status register.
    pub const SSTATUS: CsrSpecifier = 0x100;
    /// Supervisor interrupt-enable register.
    pub const SIE: CsrSpecifier = 0x104;
    /// Supervisor trap handler base address.
    pub const STVEC: CsrSpecifier = 0x105;

    //
    // Supervisor trap handling (`0x140..=0x144`).
    //
    /// Scratch register for supervisor trap handling.
    pub const SSCRATCH: CsrSpecifier = 0x140;
    /// Supervisor exception program counter.
    pub const SEPC: CsrSpecifier = 0x141;
    /// Supervisor trap cause.
    pub const SCAUSE: CsrSpecifier = 0x142;
    /// Supervisor bad address or instruction.
    pub const STVAL: CsrSpecifier = 0x143;
    /// Supervisor interrupt pending.
    pub const SIP: CsrSpecifier = 0x144;

    //
    // Machine information registers (`0xF11..=0xF14`).
    //
    /// Vendor ID.
    pub const MVENDORID: CsrSpecifier = 0xF11;
    /// Architecture ID.
    pub const MARCHID: CsrSpecifier = 0xF12;
    /// Implementation ID.
    pub const MIMPID: CsrSpecifier = 0xF13;
    /// Hardware thread ID.
    pub const MHARTID: CsrSpecifier = 0xF14;

    //
    // Machine trap setup (`0x300..=0x305`).
    //
    /// Machine status register.
    pub const MSTATUS: CsrSpecifier = 0x300;
    /// ISA and extensions.
    pub const MISA: CsrSpecifier = 0x301;
    /// Machine exception delegation register.
    pub const MEDELEG: CsrSpecifier = 0x302;
    /// Machine interrupt delegation register.
    pub const MIDELEG: CsrSpecifier = 0x303;
    /// Machine interrupt-enable register.
    pub const MIE: CsrSpecifier = 0x304;
    /// Machine trap-handler base address.
    pub const MTVEC: CsrSpecifier = 0x305;

    //
    // Machine trap handling (`0x340..=0x344`).
    //
    /// Scratch register for machine trap handlers.
    pub const MSCRATCH: CsrSpecifier = 0x340;
    /// Machine exception program counter.
    pub const MEPC: CsrSpecifier = 0x341;
    /// Machine trap cause.
    pub const MCAUSE: CsrSpecifier = 0x342;
    /// Machine bad address or instruction.
    pub const MTVAL: CsrSpecifier = 0x343;
    /// Machine interrupt pending.
    pub const MIP: CsrSpecifier = 0x344;

    //
    // Machine counter/timers (`0xB00..=0xB1F`, `0xB80..=0xB9F`).
    //
    /// Machine cycle counter.
    pub const MCYCLE: CsrSpecifier = 0xB00;
    /// Machine instructions-retired counter.
    pub const MINSTRET: CsrSpecifier = 0xB02;
    /// Upper 32 bits of [`MCYCLE`], RV32 only.
    pub const MCYCLEH: CsrSpecifier = 0xB80;
    /// Upper 32 bits of [`MINSTRET`], RV32 only.
    pub const MINSTRETH: CsrSpecifier = 0xB82;

    /// Returns the conventional name of an implemented CSR.
    pub fn name(specifier: CsrSpecifier) -> Option<&'static str> {
        Some(match specifier {
            CYCLE => "cycle",
            INSTRET => "instret",
            CYCLEH => "cycleh",
            INSTRETH => "instreth",
            SSTATUS => "sstatus",
            SIE => "sie",
            STVEC => "stvec",
            SSCRATCH => "sscratch",
            SEPC => "sepc",
            SCAUSE => "scause",
            STVAL => "stval",
            SIP => "sip",
            MVENDORID => "mvendorid",
            MARCHID => "marchid",
            MIMPID => "mimpid",
            MHARTID => "mhartid",
            MSTATUS => "mstatus",
            MISA => "misa",
            MEDELEG => "medeleg",
            MIDELEG => "mideleg",
            MIE => "mie",
            MTVEC => "mtvec",
            MSCRATCH => "mscratch",
            MEPC => "mepc",
            MCAUSE => "mcause",
            MTVAL => "mtval",
            MIP => "mip",
            MCYCLE => "mcycle",
            MINSTRET => "minstret",
            MCYCLEH => "mcycleh",
            MINSTRETH => "minstreth",
            _ => return None,
        })
    }

    /// Returns `true` if `specifier` is valid, which is the case if it fits in 12 bits.
    pub fn is_valid(specifier: CsrSpecifier) -> bool {
        specifier < 1 << 12
    }

    /// Returns `true` if this CSR only supports read access.
    ///
    /// Requires [`is_valid(specifier)`](is_valid), otherwise the return value is undefined.
    pub fn is_read_only(specifier: CsrSpecifier) -> bool {
        // The top two bits of a CSR specifier indicate whether the CSR is read-only (0b11) or
        // read/write (0b00, 0b01, 0b10)
        specifier >> 10 == 0b11
    }

    /// Returns the minimum required privilege level to access this CSR.
    ///
    /// Requires [`is_valid(specifier)`](is_valid), otherwise the return value is undefined.
    ///
    /// Note that this returns a [`RawPrivilegeLevel`], meaning the minimum required privilege level
    /// may be a reserved level. This still has a defined meaning: only higher privilege levels are
    /// allowed to access the CSR.
    pub fn required_privilege_level(specifier: CsrSpecifier) -> RawPrivilegeLevel {
        // Bits `9:8` indicate the minimum required privilege level
        RawPrivilegeLevel::from_u2(((specifier >> 8) & 0b11) as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::trap::Interrupt;

    #[test]
    fn test_specifier_encoding() {
        assert!(specifier::is_read_only(specifier::MHARTID));
        assert!(specifier::is_read_only(specifier::CYCLE));
        assert!(!specifier::is_read_only(specifier::MSTATUS));
        assert_eq!(
            RawPrivilegeLevel::Machine,
            specifier::required_privilege_level(specifier::MEPC)
        );
        assert_eq!(
            RawPrivilegeLevel::Supervisor,
            specifier::required_privilege_level(specifier::SEPC)
        );
        assert_eq!(
            RawPrivilegeLevel::User,
            specifier::required_privilege_level(specifier::INSTRET)
        );
        assert!(!specifier::is_valid(0x1000));
        assert_eq!(Some("mtvec"), specifier::name(0x305));
    }

    #[test]
    fn test_privileged_write_leaves_csr_unchanged() {
        let mut csrs = CsRegisters::<u32>::new(true);
        csrs.write(specifier::MSCRATCH, 42, PrivilegeLevel::Machine)
            .unwrap();
        assert_eq!(
            Err(AccessError::Privileged {
                specifier: specifier::MSCRATCH,
                required_level: RawPrivilegeLevel::Machine,
                actual_level: PrivilegeLevel::Supervisor,
            }),
            csrs.write(specifier::MSCRATCH, 7, PrivilegeLevel::Supervisor)
        );
        assert!(csrs
            .read(specifier::MSCRATCH, PrivilegeLevel::User)
            .is_err());
        assert_eq!(Some(42), csrs.peek(specifier::MSCRATCH));
    }

    #[test]
    fn test_read_only_and_unsupported() {
        let mut csrs = CsRegisters::<u64>::new(true);
        assert_eq!(
            Err(AccessError::WriteToReadOnly(specifier::MHARTID)),
            csrs.write(specifier::MHARTID, 1, PrivilegeLevel::Machine)
        );
        assert_eq!(
            Err(AccessError::CsrUnsupported(0x7C0)),
            csrs.read(0x7C0, PrivilegeLevel::Machine)
        );
        // The upper counter halves only exist on RV32.
        assert_eq!(
            Err(AccessError::CsrUnsupported(specifier::MCYCLEH)),
            csrs.read(specifier::MCYCLEH, PrivilegeLevel::Machine)
        );
        // misa ignores writes, without failing.
        let misa = csrs.peek(specifier::MISA);
        csrs.write(specifier::MISA, 0, PrivilegeLevel::Machine)
            .unwrap();
        assert_eq!(misa, csrs.peek(specifier::MISA));
    }

    #[test]
    fn test_misa() {
        let csrs = CsRegisters::<u32>::new(true);
        assert_eq!(Some(0x4014_1104), csrs.peek(specifier::MISA));
        let csrs = CsRegisters::<u64>::new(false);
        assert_eq!(Some(0x8000_0000_0014_1100), csrs.peek(specifier::MISA));
    }

    #[test]
    fn test_epc_alignment() {
        let mut csrs = CsRegisters::<u32>::new(true);
        csrs.write(specifier::MEPC, 0x1003, PrivilegeLevel::Machine)
            .unwrap();
        assert_eq!(0x1002, csrs.epc(TrapMode::Machine));
        let mut csrs = CsRegisters::<u32>::new(false);
        csrs.set_epc(TrapMode::Supervisor, 0x1003);
        assert_eq!(Some(0x1000), csrs.peek(specifier::SEPC));
    }

    #[test]
    fn test_counters() {
        let mut csrs = CsRegisters::<u32>::new(true);
        csrs.write(specifier::MCYCLE, 0xFFFF_FFFF, PrivilegeLevel::Machine)
            .unwrap();
        csrs.retire();
        csrs.tick();
        assert_eq!(Some(1), csrs.peek(specifier::CYCLE));
        assert_eq!(Some(1), csrs.peek(specifier::CYCLEH));
        assert_eq!(Some(1), csrs.peek(specifier::INSTRET));
        assert_eq!(
            Ok(1),
            csrs.read(specifier::CYCLE, PrivilegeLevel::User)
        );
        csrs.write(specifier::MINSTRETH, 2, PrivilegeLevel::Machine)
            .unwrap();
        assert_eq!(0x2_0000_0001, csrs.minstret());
    }

    #[test]
    fn test_supervisor_views() {
        let mut csrs = CsRegisters::<u32>::new(true);
        csrs.write(specifier::SIE, 0xFFFF_FFFF, PrivilegeLevel::Supervisor)
            .unwrap();
        assert_eq!(Some(0x222), csrs.peek(specifier::MIE));
        csrs.interrupts_mut()
            .set_pending(Interrupt::MachineTimerInterrupt, true);
        assert_eq!(Some(0x80), csrs.peek(specifier::MIP));
        assert_eq!(Some(0), csrs.peek(specifier::SIP));
        csrs.write(specifier::MSTATUS, 0x8, PrivilegeLevel::Machine)
            .unwrap();
        assert_eq!(Some(0), csrs.peek(specifier::SSTATUS));
    }

    #[test]
    fn test_reset() {
        let mut csrs = CsRegisters::<u64>::new(true);
        csrs.write(specifier::MTVEC, 0x8000_0000, PrivilegeLevel::Machine)
            .unwrap();
        csrs.retire();
        csrs.reset();
        assert_eq!(Some(0), csrs.peek(specifier::MTVEC));
        assert_eq!(0, csrs.mcycle());
    }
}
