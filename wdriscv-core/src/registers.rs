//! General purpose (`x`) registers.

use crate::Xlen;
use std::fmt::{self, Formatter};

/// The maximum number of `x` registers that can be encoded in an instruction.
pub const LEN: u8 = 32;

/// A RISC-V hart's general purpose registers.
///
/// There are up to 32 `x` registers of width `X` (see [`Xlen`]), named `x0` up to `x31`. The
/// number of registers is fixed at construction, which allows modeling the reduced register file of
/// the embedded base ISAs.
///
/// The register `x0` (aka `zero`) is always zero. Writes to it are ignored.
///
/// > Register x0 is hardwired with all bits equal to 0. General purpose registers x1–x31 hold
/// > values that various instructions interpret as a collection of Boolean values, or as two’s
/// > complement signed binary integers or unsigned binary integers.
///
/// It is not possible to get a mutable reference to an `x` register, since that would allow
/// unchecked writes to register `x0`.
#[derive(Debug, Clone)]
pub struct Registers<X: Xlen> {
    x_registers: Vec<X>,
}

impl<X: Xlen> Default for Registers<X> {
    fn default() -> Self {
        Self::new(LEN as usize)
    }
}

impl<X: Xlen> Registers<X> {
    /// Returns a fresh set of `count` all-zero registers.
    ///
    /// `count` is clamped to `1..=32`, since `x0` always exists and no more than 32 registers can
    /// be addressed.
    pub fn new(count: usize) -> Self {
        Self {
            x_registers: vec![X::ZERO; count.clamp(1, LEN as usize)],
        }
    }

    /// Returns the number of registers.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.x_registers.len()
    }

    /// Returns `true` if `specifier` names one of the available registers.
    pub fn contains(&self, specifier: Specifier) -> bool {
        usize::from(specifier) < self.x_registers.len()
    }

    /// Force all registers back to zero.
    pub fn reset(&mut self) {
        self.x_registers.fill(X::ZERO);
    }

    /// Returns the value of an `x` register.
    ///
    /// Registers beyond [`len`](Self::len) read as zero. The core never executes an instruction
    /// naming such a register, see [`contains`](Self::contains).
    pub fn x(&self, specifier: Specifier) -> X {
        self.peek(usize::from(specifier)).unwrap_or(X::ZERO)
    }

    /// Sets the value of an `x` register.
    ///
    /// Writes to register `x0` are ignored.
    pub fn set_x(&mut self, specifier: Specifier, value: X) {
        self.replace_x(specifier, value);
    }

    /// Replaces the value of an `x` register, returning its old value.
    ///
    /// Writes to register `x0` (or to a register beyond [`len`](Self::len)) are ignored.
    pub fn replace_x(&mut self, specifier: Specifier, value: X) -> X {
        match self.x_registers.get_mut(usize::from(specifier)) {
            Some(register) if specifier != Specifier::X0 => std::mem::replace(register, value),
            _ => X::ZERO, // Ignore writes to register `x0`
        }
    }

    /// Returns the value of the register with index `index`, or `None` if there is no such
    /// register.
    pub fn peek(&self, index: usize) -> Option<X> {
        self.x_registers.get(index).copied()
    }
}

/// An `x` register specifier. Can take values in the range `0..LEN`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Specifier(u8);

impl Specifier {
    /// Register `x0`, a.k.a. register `zero`, always returns `0` on read, and ignores any writes.
    pub const X0: Self = Specifier(0);

    /// Register `x1`, a.k.a. register `ra`, the standard return address register.
    pub const RA: Self = Specifier(1);

    /// Register `x2`, a.k.a. register `sp`, the standard stack pointer.
    pub const SP: Self = Specifier(2);

    /// Convert a 5-bit value into a register specifier.
    /// Panics if the value doesn't fit in 5 bits (`0..=31`).
    pub fn from_u5(value_u5: u8) -> Self {
        const_assert_eq!(LEN, 32);
        if value_u5 > 31 {
            panic!("out of range u5 used");
        }
        Self(value_u5)
    }

    /// Convert a 3-bit compressed register field into a register specifier (`x8` up to `x15`).
    /// Panics if the value doesn't fit in 3 bits (`0..=7`).
    pub fn from_u3_compressed(value_u3: u8) -> Self {
        if value_u3 > 7 {
            panic!("out of range u3 used");
        }
        Self(8 + value_u3)
    }
}

impl From<Specifier> for u8 {
    fn from(value: Specifier) -> Self {
        value.0
    }
}

impl From<Specifier> for u32 {
    fn from(value: Specifier) -> Self {
        value.0 as u32
    }
}

impl From<Specifier> for usize {
    fn from(value: Specifier) -> Self {
        value.0 as usize
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        const_assert!(LEN > 1);
        assert_eq!(32, Registers::<u32>::default().len());
        assert_eq!(1, Registers::<u32>::new(0).len());
        assert_eq!(32, Registers::<u64>::new(100).len());
    }

    #[test]
    fn test_write_to_zero() {
        let mut registers = Registers::<u32>::default();
        assert_eq!(0, registers.x(Specifier::X0));
        registers.set_x(Specifier::X0, 0xDEADBEEF);
        assert_eq!(0, registers.x(Specifier::X0));
        assert_eq!(Some(0), registers.peek(0));

        let mut registers = Registers::<u64>::default();
        for value in [1, u64::MAX, 0x8000_0000_0000_0000] {
            registers.set_x(Specifier::X0, value);
            assert_eq!(0, registers.x(Specifier::X0));
        }
    }

    #[test]
    fn test_get_x() {
        let registers = Registers::<u32>::default();
        for i in 0..LEN {
            assert_eq!(0, registers.x(Specifier::from_u5(i)));
        }
    }

    #[test]
    fn test_set_x() {
        let mut registers = Registers::<u32>::default();
        registers.set_x(Specifier::X0, 1);
        for i in 1..LEN {
            registers.set_x(Specifier::from_u5(i), i as u32 + 1);
        }
        assert_eq!(0, registers.x(Specifier::X0));
        for i in 1..LEN {
            assert_eq!(i as u32 + 1, registers.x(Specifier::from_u5(i)));
        }
    }

    #[test]
    fn test_replace_x() {
        let mut registers = Registers::<u64>::default();
        assert_eq!(0, registers.replace_x(Specifier::X0, 0));
        for i in 1..LEN {
            assert_eq!(0, registers.replace_x(Specifier::from_u5(i), i as u64));
        }
        assert_eq!(0, registers.replace_x(Specifier::X0, 1));
        for i in 1..LEN {
            assert_eq!(
                i as u64,
                registers.replace_x(Specifier::from_u5(i), i as u64 + 1)
            );
        }
        assert_eq!(0, registers.x(Specifier::X0));
    }

    #[test]
    fn test_reduced_register_file() {
        let mut registers = Registers::<u32>::new(16);
        let x20 = Specifier::from_u5(20);
        assert!(!registers.contains(x20));
        assert!(registers.contains(Specifier::from_u5(15)));
        registers.set_x(x20, 7);
        assert_eq!(0, registers.x(x20));
        assert_eq!(None, registers.peek(20));
        assert_eq!(None, registers.peek(16));
    }

    #[test]
    fn test_compressed_specifier() {
        assert_eq!(Specifier::from_u5(8), Specifier::from_u3_compressed(0));
        assert_eq!(Specifier::from_u5(15), Specifier::from_u3_compressed(7));
        assert_eq!(Specifier::SP, Specifier::from_u5(2));
        assert_eq!("x1", Specifier::RA.to_string());
    }
}
