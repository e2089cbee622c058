//! Register width abstraction.
//!
//! All instruction semantics are written once against [`Xlen`], which is implemented for `u32`
//! (RV32) and `u64` (RV64). Arithmetic that needs more room than the register width is done by
//! widening to `u64`/`i64` (or `u128`/`i128` for the high half of products) and truncating back
//! with [`Xlen::from_u64`] or [`Xlen::from_i64`].

use std::fmt::{Debug, Display, LowerHex};
use std::hash::Hash;

/// The base integer ISA a core implements.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Base {
    /// 32-bit registers and addresses.
    Rv32I,
    /// 64-bit registers and addresses.
    Rv64I,
}

impl Base {
    /// Returns `true` for the 64-bit base ISA.
    pub fn is_rv64(self) -> bool {
        matches!(self, Self::Rv64I)
    }

    /// The `XLEN` of this base ISA.
    pub fn xlen(self) -> u32 {
        match self {
            Self::Rv32I => 32,
            Self::Rv64I => 64,
        }
    }

    /// The value of the 2-bit MXL field of `misa` for this base ISA.
    pub fn mxl(self) -> u8 {
        match self {
            Self::Rv32I => 1,
            Self::Rv64I => 2,
        }
    }
}

/// An unsigned integer type holding the contents of one `x` register.
///
/// The associated [`Signed`](Xlen::Signed) type is the two's complement reinterpretation of the
/// same bits, used wherever an instruction compares or shifts values as signed numbers.
pub trait Xlen:
    Copy + Default + Eq + Ord + Hash + Debug + Display + LowerHex + Send + Sync + 'static
{
    /// Signed counterpart of `Self` (`i32` for `u32`, `i64` for `u64`).
    type Signed: Copy + Ord + Debug;

    /// Number of bits in a register.
    const BITS: u32;

    /// The base ISA implied by the register width.
    const BASE: Base;

    /// All-zero value.
    const ZERO: Self;

    /// All-ones value.
    const MAX: Self;

    /// Truncates `value` to the register width.
    fn from_u64(value: u64) -> Self;

    /// Truncates the two's complement representation of `value` to the register width.
    fn from_i64(value: i64) -> Self {
        Self::from_u64(value as u64)
    }

    /// Zero-extends the register value to 64 bits.
    fn to_u64(self) -> u64;

    /// Sign-extends the register value to 64 bits.
    fn to_i64(self) -> i64;

    /// Reinterprets the bits as a signed number of the same width.
    fn to_signed(self) -> Self::Signed;

    /// The value of the most significant (sign) bit only.
    fn sign_bit() -> Self {
        Self::from_u64(1 << (Self::BITS - 1))
    }

    /// Mask for the shift amount of register-width shifts (`XLEN - 1`).
    fn shift_mask() -> u32 {
        Self::BITS - 1
    }

    fn wrapping_add(self, rhs: Self) -> Self {
        Self::from_u64(self.to_u64().wrapping_add(rhs.to_u64()))
    }

    fn wrapping_sub(self, rhs: Self) -> Self {
        Self::from_u64(self.to_u64().wrapping_sub(rhs.to_u64()))
    }

    fn wrapping_add_signed(self, rhs: i64) -> Self {
        Self::from_u64(self.to_u64().wrapping_add(rhs as u64))
    }

    fn and(self, rhs: Self) -> Self {
        Self::from_u64(self.to_u64() & rhs.to_u64())
    }

    fn or(self, rhs: Self) -> Self {
        Self::from_u64(self.to_u64() | rhs.to_u64())
    }

    fn xor(self, rhs: Self) -> Self {
        Self::from_u64(self.to_u64() ^ rhs.to_u64())
    }

    fn not(self) -> Self {
        Self::from_u64(!self.to_u64())
    }

    fn is_zero(self) -> bool {
        self == Self::ZERO
    }
}

macro_rules! impl_xlen {
    ( $( $u:ident, $s:ident => $base:expr ),* $(,)? ) => {
        $(
            impl Xlen for $u {
                type Signed = $s;

                const BITS: u32 = $u::BITS;
                const BASE: Base = $base;
                const ZERO: Self = 0;
                const MAX: Self = $u::MAX;

                #[inline]
                fn from_u64(value: u64) -> Self {
                    value as $u
                }

                #[inline]
                fn to_u64(self) -> u64 {
                    self as u64
                }

                #[inline]
                fn to_i64(self) -> i64 {
                    self as $s as i64
                }

                #[inline]
                fn to_signed(self) -> $s {
                    self as $s
                }
            }
        )*
    };
}

impl_xlen! {
    u32, i32 => Base::Rv32I,
    u64, i64 => Base::Rv64I,
}

const_assert_eq!(<u32 as Xlen>::BITS, 32);
const_assert_eq!(<u64 as Xlen>::BITS, 64);
