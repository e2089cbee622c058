use bitvec::{field::BitField, order::Lsb0, view::BitView};

use crate::{Base, PrivilegeLevel, RawPrivilegeLevel};

/// Bits of mstatus that are writable through the mstatus CSR.
const MSTATUS_WRITE_MASK: u64 = 1 << idx::SIE
    | 1 << idx::MIE
    | 1 << idx::SPIE
    | 1 << idx::MPIE
    | 1 << idx::SPP
    | 0b11 << idx::MPP;

/// Bits of mstatus that are visible through the sstatus CSR.
const SSTATUS_READ_MASK: u64 = 1 << idx::SIE
    | 1 << idx::SPIE
    | 1 << idx::SPP
    | 0b11 << idx::UXL;

/// Bits of mstatus that are writable through the sstatus CSR.
const SSTATUS_WRITE_MASK: u64 = 1 << idx::SIE | 1 << idx::SPIE | 1 << idx::SPP;

/// Provides the mstatus and sstatus registers.
///
/// > The mstatus register is an MXLEN-bit read/write register [...]. The mstatus register keeps
/// > track of and controls the hart’s current operating state. A restricted view of mstatus appears
/// > as the sstatus register in the S-level ISA.
///
/// The register is stored as 64 bits independent of the hart's width. On RV64 the read-only UXL and
/// SXL fields report 64-bit U-mode and S-mode. On RV32 they don't exist and the bits above 31 are
/// never observable.
#[derive(Debug, Clone)]
pub struct Status {
    mstatus: u64,
}

impl Status {
    pub fn new(base: Base) -> Self {
        let mut mstatus: u64 = 0;
        if base.is_rv64() {
            let view = mstatus.view_bits_mut::<Lsb0>();
            view[idx::UXL..idx::UXL + 2].store_le(base.mxl());
            view[idx::SXL..idx::SXL + 2].store_le(base.mxl());
        }
        Self { mstatus }
    }

    pub fn read_mstatus(&self) -> u64 {
        self.mstatus
    }

    pub fn write_mstatus(&mut self, value: u64) {
        let mpp = self.mpp();
        self.mstatus = self.mstatus & !MSTATUS_WRITE_MASK | value & MSTATUS_WRITE_MASK;
        // MPP is a WARL field: writing the reserved level 2 leaves the old value in place.
        if self.mstatus.view_bits::<Lsb0>()[idx::MPP..idx::MPP + 2].load_le::<u8>() == 2 {
            self.set_mpp(mpp);
        }
    }

    pub fn read_sstatus(&self) -> u64 {
        self.mstatus & SSTATUS_READ_MASK
    }

    pub fn write_sstatus(&mut self, value: u64) {
        self.mstatus = self.mstatus & !SSTATUS_WRITE_MASK | value & SSTATUS_WRITE_MASK;
    }

    /// Returns `true` if the MIE (M-mode Interrupt Enable) bit is set.
    pub fn mie(&self) -> bool {
        self.mstatus.view_bits::<Lsb0>()[idx::MIE]
    }

    /// Sets the MIE (M-mode Interrupt Enable) bit to `value`.
    pub fn set_mie(&mut self, value: bool) {
        self.mstatus.view_bits_mut::<Lsb0>().set(idx::MIE, value);
    }

    /// Returns `true` if the SIE (S-mode Interrupt Enable) bit is set.
    pub fn sie(&self) -> bool {
        self.mstatus.view_bits::<Lsb0>()[idx::SIE]
    }

    /// Sets the SIE (S-mode Interrupt Enable) bit to `value`.
    pub fn set_sie(&mut self, value: bool) {
        self.mstatus.view_bits_mut::<Lsb0>().set(idx::SIE, value);
    }

    /// Returns `true` if the MPIE (M-mode Previous Interrupt Enable) bit is set.
    pub fn mpie(&self) -> bool {
        self.mstatus.view_bits::<Lsb0>()[idx::MPIE]
    }

    /// Sets the MPIE (M-mode Previous Interrupt Enable) bit to `value`.
    pub fn set_mpie(&mut self, value: bool) {
        self.mstatus.view_bits_mut::<Lsb0>().set(idx::MPIE, value);
    }

    /// Returns `true` if the SPIE (S-mode Previous Interrupt Enable) bit is set.
    pub fn spie(&self) -> bool {
        self.mstatus.view_bits::<Lsb0>()[idx::SPIE]
    }

    /// Sets the SPIE (S-mode Previous Interrupt Enable) bit to `value`.
    pub fn set_spie(&mut self, value: bool) {
        self.mstatus.view_bits_mut::<Lsb0>().set(idx::SPIE, value);
    }

    /// Returns the privilege level encoded by the MPP (M-mode Previous Privilege level) field.
    ///
    /// The MPP field is **WARL**, so it never holds the reserved level.
    pub fn mpp(&self) -> PrivilegeLevel {
        let raw = RawPrivilegeLevel::from_u2(
            self.mstatus.view_bits::<Lsb0>()[idx::MPP..(idx::MPP + 2)].load_le(),
        );
        PrivilegeLevel::try_from(raw).unwrap_or(PrivilegeLevel::User)
    }

    /// Sets the privilege level encoded by the MPP (M-mode Previous Privilege level) field.
    pub fn set_mpp(&mut self, value: PrivilegeLevel) {
        self.mstatus.view_bits_mut::<Lsb0>()[idx::MPP..(idx::MPP + 2)].store_le(value as u8);
    }

    /// Returns the privilege level encoded by the SPP (S-mode Previous Privilege level) field.
    pub fn spp(&self) -> PrivilegeLevel {
        match self.mstatus.view_bits::<Lsb0>()[idx::SPP] {
            false => PrivilegeLevel::User,
            true => PrivilegeLevel::Supervisor,
        }
    }

    /// Sets the privilege level encoded by the SPP (S-mode Previous Privilege level) field.
    ///
    /// The SPP field is **WARL**: only User and Supervisor can be represented, so Machine is
    /// ignored.
    pub fn set_spp(&mut self, value: PrivilegeLevel) {
        if value <= PrivilegeLevel::Supervisor {
            let bit = value == PrivilegeLevel::Supervisor;
            self.mstatus.view_bits_mut::<Lsb0>().set(idx::SPP, bit);
        }
    }
}

/// Bit indices for the fields of the mstatus register.
mod idx {
    pub const SIE: usize = 1;
    pub const MIE: usize = 3;
    pub const SPIE: usize = 5;
    pub const MPIE: usize = 7;
    pub const SPP: usize = 8;
    pub const MPP: usize = 11;
    /// RV64 only.
    pub const UXL: usize = 32;
    /// RV64 only.
    pub const SXL: usize = 34;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_value() {
        assert_eq!(0, Status::new(Base::Rv32I).read_mstatus());
        assert_eq!(0xA_0000_0000, Status::new(Base::Rv64I).read_mstatus());
        assert_eq!(0x2_0000_0000, Status::new(Base::Rv64I).read_sstatus());
    }

    #[test]
    fn test_write_mask() {
        let mut status = Status::new(Base::Rv32I);
        status.write_mstatus(u64::MAX);
        assert_eq!(0x19AA, status.read_mstatus());
        assert!(status.mie());
        assert!(status.sie());
        assert_eq!(PrivilegeLevel::Machine, status.mpp());
        assert_eq!(PrivilegeLevel::Supervisor, status.spp());
        status.write_sstatus(0);
        assert_eq!(0x1888, status.read_mstatus());
    }

    #[test]
    fn test_mpp_is_warl() {
        let mut status = Status::new(Base::Rv64I);
        status.set_mpp(PrivilegeLevel::Supervisor);
        status.write_mstatus(2 << idx::MPP);
        assert_eq!(PrivilegeLevel::Supervisor, status.mpp());
        status.write_mstatus(0);
        assert_eq!(PrivilegeLevel::User, status.mpp());
    }

    #[test]
    fn test_spp_is_warl() {
        let mut status = Status::new(Base::Rv32I);
        status.set_spp(PrivilegeLevel::Supervisor);
        status.set_spp(PrivilegeLevel::Machine);
        assert_eq!(PrivilegeLevel::Supervisor, status.spp());
        status.set_spp(PrivilegeLevel::User);
        assert_eq!(PrivilegeLevel::User, status.spp());
    }
}
