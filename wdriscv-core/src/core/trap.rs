//! Trap causes and the encoding of the `xcause` registers.

use crate::Xlen;
use std::fmt;

/// Synchronous exceptions, with their exception codes as discriminants.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Exception {
    /// Instruction address is not aligned to the minimum instruction alignment.
    InstructionAddressMisaligned = 0,
    InstructionAccessFault = 1,
    /// Generic exception used to communicate one of many possible scenarios:
    ///
    /// - Attempt to decode a reserved or unsupported instruction.
    /// - Attempt to access a non-existent CSR.
    /// - Attempt to access a CSR without the appropriate privilege level.
    /// - Attempt to write to a read-only CSR.
    /// - Attempt to execute an xRET instruction from too low a privilege level.
    IllegalInstruction = 2,
    Breakpoint = 3,
    LoadAddressMisaligned = 4,
    LoadAccessFault = 5,
    StoreOrAmoAddressMisaligned = 6,
    StoreOrAmoAccessFault = 7,
    EnvironmentCallFromUMode = 8,
    EnvironmentCallFromSMode = 9,
    EnvironmentCallFromMMode = 11,
    /// Never raised, since address translation isn't supported.
    InstructionPageFault = 12,
    /// Never raised, since address translation isn't supported.
    LoadPageFault = 13,
    /// Never raised, since address translation isn't supported.
    StoreOrAmoPageFault = 15,
}

impl Exception {
    /// Returns the exception code (cause) for this exception.
    pub fn code(self) -> u64 {
        self as u64
    }

    /// Returns the exception for an exception code, or `None` if the code is reserved.
    pub fn from_code(code: u64) -> Option<Self> {
        Some(match code {
            0 => Self::InstructionAddressMisaligned,
            1 => Self::InstructionAccessFault,
            2 => Self::IllegalInstruction,
            3 => Self::Breakpoint,
            4 => Self::LoadAddressMisaligned,
            5 => Self::LoadAccessFault,
            6 => Self::StoreOrAmoAddressMisaligned,
            7 => Self::StoreOrAmoAccessFault,
            8 => Self::EnvironmentCallFromUMode,
            9 => Self::EnvironmentCallFromSMode,
            11 => Self::EnvironmentCallFromMMode,
            12 => Self::InstructionPageFault,
            13 => Self::LoadPageFault,
            15 => Self::StoreOrAmoPageFault,
            _ => return None,
        })
    }
}

/// Asynchronous interrupts, with their exception codes as discriminants.
///
/// The code doubles as the bit index of the interrupt in the `mip` and `mie` registers.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Interrupt {
    UserSoftwareInterrupt = 0,
    SupervisorSoftwareInterrupt = 1,
    MachineSoftwareInterrupt = 3,
    UserTimerInterrupt = 4,
    SupervisorTimerInterrupt = 5,
    MachineTimerInterrupt = 7,
    UserExternalInterrupt = 8,
    SupervisorExternalInterrupt = 9,
    MachineExternalInterrupt = 11,
}

impl Interrupt {
    /// All interrupts, in decreasing order of priority.
    ///
    /// > Multiple simultaneous interrupts destined for M-mode are handled in the following
    /// > decreasing priority order: MEI, MSI, MTI, SEI, SSI, STI.
    ///
    /// The user-level interrupts follow in the same order, below all supervisor interrupts.
    pub const BY_PRIORITY: [Self; 9] = [
        Self::MachineExternalInterrupt,
        Self::MachineSoftwareInterrupt,
        Self::MachineTimerInterrupt,
        Self::SupervisorExternalInterrupt,
        Self::SupervisorSoftwareInterrupt,
        Self::SupervisorTimerInterrupt,
        Self::UserExternalInterrupt,
        Self::UserSoftwareInterrupt,
        Self::UserTimerInterrupt,
    ];

    /// Returns the exception code (cause) for this interrupt.
    pub fn code(self) -> u64 {
        self as u64
    }

    pub fn from_code(code: u64) -> Option<Self> {
        Self::BY_PRIORITY
            .into_iter()
            .find(|interrupt| interrupt.code() == code)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TrapCause {
    Exception(Exception),
    Interrupt(Interrupt),
}

impl TrapCause {
    pub fn is_interrupt(self) -> bool {
        matches!(self, Self::Interrupt(_))
    }

    pub fn code(self) -> u64 {
        match self {
            Self::Exception(exception) => exception.code(),
            Self::Interrupt(interrupt) => interrupt.code(),
        }
    }

    /// Encodes the cause as written to `xcause`: the exception code, with the most significant bit
    /// set for interrupts.
    pub fn to_xcause<X: Xlen>(self) -> X {
        let code = X::from_u64(self.code());
        match self {
            Self::Exception(_) => code,
            Self::Interrupt(_) => code.or(X::sign_bit()),
        }
    }

    /// Decodes an `xcause` value. Returns `None` if the code is reserved.
    pub fn from_xcause<X: Xlen>(value: X) -> Option<Self> {
        let code = value.and(X::sign_bit().not()).to_u64();
        match value.and(X::sign_bit()).is_zero() {
            true => Exception::from_code(code).map(Self::Exception),
            false => Interrupt::from_code(code).map(Self::Interrupt),
        }
    }
}

impl From<Exception> for TrapCause {
    fn from(value: Exception) -> Self {
        Self::Exception(value)
    }
}

impl From<Interrupt> for TrapCause {
    fn from(value: Interrupt) -> Self {
        Self::Interrupt(value)
    }
}

impl fmt::Display for TrapCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exception(exception) => write!(f, "{exception:?}"),
            Self::Interrupt(interrupt) => write!(f, "{interrupt:?}"),
        }
    }
}

/// A synchronous exception raised by an instruction, together with the value for `mtval`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Fault<X: Xlen> {
    pub exception: Exception,
    pub trap_value: X,
}

impl<X: Xlen> Fault<X> {
    pub fn new(exception: Exception, trap_value: X) -> Self {
        Self {
            exception,
            trap_value,
        }
    }

    /// A fault that doesn't provide any further information (`mtval` is set to zero).
    pub fn without_value(exception: Exception) -> Self {
        Self::new(exception, X::ZERO)
    }
}

impl<X: Xlen> From<Exception> for Fault<X> {
    fn from(exception: Exception) -> Self {
        Self::without_value(exception)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(11, Exception::EnvironmentCallFromMMode.code());
        assert_eq!(2, Exception::IllegalInstruction.code());
        assert_eq!(None, Exception::from_code(10));
        assert_eq!(Some(Exception::Breakpoint), Exception::from_code(3));
        assert_eq!(7, Interrupt::MachineTimerInterrupt.code());
        assert_eq!(
            Some(Interrupt::UserSoftwareInterrupt),
            Interrupt::from_code(0)
        );
        assert_eq!(Some(Interrupt::UserTimerInterrupt), Interrupt::from_code(4));
        assert_eq!(
            Some(Interrupt::UserExternalInterrupt),
            Interrupt::from_code(8)
        );
        assert_eq!(None, Interrupt::from_code(2));
    }

    #[test]
    fn test_xcause_encoding() {
        let cause = TrapCause::Interrupt(Interrupt::MachineTimerInterrupt);
        assert_eq!(0x8000_0007_u32, cause.to_xcause());
        assert_eq!(0x8000_0000_0000_0007_u64, cause.to_xcause());
        assert_eq!(Some(cause), TrapCause::from_xcause(0x8000_0007_u32));
        let cause = TrapCause::Exception(Exception::LoadAccessFault);
        assert_eq!(5_u64, cause.to_xcause());
        assert_eq!(Some(cause), TrapCause::from_xcause(5_u64));
        assert_eq!(None, TrapCause::from_xcause(0x8000_0002_u32));
    }
}
