//! Flat, byte-addressable simulated memory.

use thiserror::Error;

macro_rules! access_fns {
    ( $( $read_fn:ident, $write_fn:ident => $u:ident ),* $(,)? ) => {
        $(
            /// Reads a little-endian value at `address`.
            ///
            /// The address doesn't need to be naturally aligned. Fails with
            /// [`MemoryError::AccessFault`] if any of the accessed bytes lies outside of memory.
            pub fn $read_fn(&self, address: u64) -> Result<$u, MemoryError> {
                let mut buf = [0u8; std::mem::size_of::<$u>()];
                self.read(&mut buf, address).map(|()| $u::from_le_bytes(buf))
            }

            /// Writes `value` in little-endian byte order at `address`.
            ///
            /// The address doesn't need to be naturally aligned. Fails with
            /// [`MemoryError::AccessFault`], without writing anything, if any of the accessed
            /// bytes lies outside of memory.
            pub fn $write_fn(&mut self, address: u64, value: $u) -> Result<(), MemoryError> {
                self.write(address, &value.to_le_bytes())
            }
        )*
    };
}

/// Zero-initialized RAM of a fixed size, starting at address `0`.
///
/// This can be categorized as *main memory* according to the types of memory resources defined by
/// the RISC-V ISA manual. All multi-byte values are stored in little-endian byte order,
/// independent of the host. Alignment is not checked here: whether a misaligned access is allowed
/// is decided by the load/store instruction handlers.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// Create a new zero-initialized memory that can hold `size` bytes.
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0; size],
        }
    }

    /// Returns the size expressed in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Force memory back to its reset state, which is all-zeros.
    pub fn reset(&mut self) {
        self.data.fill(0);
    }

    /// Reads `buf.len()` bytes starting at `address` into `buf`. Does not have side effects.
    pub fn read(&self, buf: &mut [u8], address: u64) -> Result<(), MemoryError> {
        let range = self.range(address, buf.len())?;
        buf.copy_from_slice(&self.data[range]);
        Ok(())
    }

    /// Writes all bytes of `buf` starting at `address`.
    ///
    /// Either all bytes are written or, on error, none are.
    pub fn write(&mut self, address: u64, buf: &[u8]) -> Result<(), MemoryError> {
        let range = self.range(address, buf.len())?;
        self.data[range].copy_from_slice(buf);
        Ok(())
    }

    /// Copies a program image into memory. Same as [`write`](Self::write), but reads more
    /// naturally at the call sites of the loaders.
    pub fn load(&mut self, address: u64, bytes: &[u8]) -> Result<(), MemoryError> {
        self.write(address, bytes)
    }

    /// Sets `len` bytes starting at `address` to zero.
    ///
    /// Either all bytes are cleared or, on error, none are.
    pub fn zero(&mut self, address: u64, len: u64) -> Result<(), MemoryError> {
        let len = usize::try_from(len).map_err(|_| MemoryError::AccessFault)?;
        let range = self.range(address, len)?;
        self.data[range].fill(0);
        Ok(())
    }

    pub fn read_byte(&self, address: u64) -> Result<u8, MemoryError> {
        let mut buf = [0];
        self.read(&mut buf, address).map(|()| buf[0])
    }

    pub fn write_byte(&mut self, address: u64, value: u8) -> Result<(), MemoryError> {
        self.write(address, &[value])
    }

    access_fns! {
        read_halfword, write_halfword => u16,
        read_word, write_word => u32,
        read_doubleword, write_doubleword => u64,
    }

    /// Bounds-checks an access of `size` bytes at `address`, returning the byte range it covers.
    fn range(&self, address: u64, size: usize) -> Result<std::ops::Range<usize>, MemoryError> {
        let start = usize::try_from(address).map_err(|_| MemoryError::AccessFault)?;
        let end = start.checked_add(size).ok_or(MemoryError::AccessFault)?;
        if end > self.data.len() {
            return Err(MemoryError::AccessFault);
        }
        Ok(start..end)
    }
}

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum MemoryError {
    #[error("access fault")]
    AccessFault,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_little_endian() {
        let mut memory = Memory::new(16);
        memory.write_word(0, 0x1234_5678).unwrap();
        assert_eq!(0x78, memory.read_byte(0).unwrap());
        assert_eq!(0x56, memory.read_byte(1).unwrap());
        assert_eq!(0x5678, memory.read_halfword(0).unwrap());
        assert_eq!(0x1234, memory.read_halfword(2).unwrap());
        memory.write_doubleword(8, 0x0102_0304_0506_0708).unwrap();
        assert_eq!(0x0506_0708, memory.read_word(8).unwrap());
        assert_eq!(0x0102_0304_0506_0708, memory.read_doubleword(8).unwrap());
    }

    #[test]
    fn test_misaligned_access_is_allowed() {
        let mut memory = Memory::new(16);
        memory.write_word(3, 0xDEAD_BEEF).unwrap();
        assert_eq!(0xDEAD_BEEF, memory.read_word(3).unwrap());
        assert_eq!(0xEF, memory.read_byte(3).unwrap());
    }

    #[test]
    fn test_bounds() {
        let mut memory = Memory::new(16);
        assert_eq!(16, memory.size());
        assert!(memory.read_byte(15).is_ok());
        assert_eq!(Err(MemoryError::AccessFault), memory.read_byte(16));
        assert_eq!(Err(MemoryError::AccessFault), memory.read_word(13));
        assert_eq!(Err(MemoryError::AccessFault), memory.read_doubleword(u64::MAX));
        assert_eq!(
            Err(MemoryError::AccessFault),
            memory.write_halfword(15, 0xFFFF)
        );
        // A failed write must not write the bytes that were in range.
        assert_eq!(0, memory.read_byte(15).unwrap());
    }

    #[test]
    fn test_zero() {
        let mut memory = Memory::new(8);
        memory.load(0, &[0xFF; 8]).unwrap();
        memory.zero(2, 4).unwrap();
        assert_eq!(0xFFFF_0000_0000_FFFF, memory.read_doubleword(0).unwrap());
        assert_eq!(Err(MemoryError::AccessFault), memory.zero(4, 5));
        assert_eq!(Err(MemoryError::AccessFault), memory.zero(1, u64::MAX));
        assert_eq!(0xFF, memory.read_byte(7).unwrap());
    }

    #[test]
    fn test_reset() {
        let mut memory = Memory::new(4);
        memory.load(0, &[1, 2, 3, 4]).unwrap();
        memory.reset();
        assert_eq!(0, memory.read_word(0).unwrap());
    }
}
