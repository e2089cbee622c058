//! Loading programs into memory, from hex files or ELF executables.

use crate::memory::Memory;
use crate::Base;
use goblin::elf::header::EM_RISCV;
use goblin::elf::program_header::PT_LOAD;
use goblin::elf::Elf;
use log::debug;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read program file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed hex file on line {line}: {reason}")]
    Malformed { line: usize, reason: String },
    #[error("failed to parse ELF file: {0}")]
    Elf(#[from] goblin::error::Error),
    #[error("ELF file is not a RISC-V executable (machine {0})")]
    WrongMachine(u16),
    #[error("expected a {expected}-bit ELF file")]
    ClassMismatch { expected: u32 },
    #[error("segment data at offset {offset:#x} extends beyond the end of the file")]
    Truncated { offset: u64 },
    #[error("{len} bytes at {address:#x} do not fit in memory")]
    OutOfBounds { address: u64, len: u64 },
}

/// What remains of an ELF file after its segments are loaded.
#[derive(Debug, Clone)]
pub struct ElfFile {
    entry: u64,
    symbols: HashMap<String, u64>,
}

impl ElfFile {
    /// Returns the address execution should start at.
    pub fn entry(&self) -> u64 {
        self.entry
    }

    /// Looks up the value of a symbol from the symbol table, such as `tohost` or
    /// `begin_signature`.
    pub fn symbol(&self, name: &str) -> Option<u64> {
        self.symbols.get(name).copied()
    }
}

/// Loads a hex file into memory.
///
/// See [`load_hex`] for the format.
pub fn load_hex_file<P: AsRef<Path>>(memory: &mut Memory, path: P) -> Result<(), LoadError> {
    let text = fs::read_to_string(path)?;
    load_hex(memory, &text)
}

/// Loads a program in hex format into memory.
///
/// Every line is either `@` followed by a hexadecimal address, which moves the write cursor to that
/// address, or a whitespace separated list of two-digit hexadecimal bytes that are written starting
/// at the cursor. Blank lines and `//` comments are ignored. The cursor starts at address `0`.
///
/// On error, everything before the offending line stays written to memory.
pub fn load_hex(memory: &mut Memory, text: &str) -> Result<(), LoadError> {
    let mut address: u64 = 0;
    for (index, line) in text.lines().enumerate() {
        let line_number = index + 1;
        let malformed = |reason: String| LoadError::Malformed {
            line: line_number,
            reason,
        };
        let line = match line.find("//") {
            Some(comment) => &line[..comment],
            None => line,
        }
        .trim();
        if line.is_empty() {
            continue;
        }

        if let Some(target) = line.strip_prefix('@') {
            address = u64::from_str_radix(target.trim(), 16)
                .map_err(|_| malformed(format!("invalid address `{target}`")))?;
            continue;
        }

        let bytes = line
            .split_whitespace()
            .map(|token| match token.len() {
                2 => u8::from_str_radix(token, 16).ok(),
                _ => None,
            }
            .ok_or_else(|| malformed(format!("invalid byte `{token}`"))))
            .collect::<Result<Vec<u8>, LoadError>>()?;
        memory
            .load(address, &bytes)
            .map_err(|_| LoadError::OutOfBounds {
                address,
                len: bytes.len() as u64,
            })?;
        address = address.wrapping_add(bytes.len() as u64);
    }
    Ok(())
}

/// Loads all loadable segments of an ELF executable into memory, at their physical addresses.
///
/// The class of the file (32 or 64 bit) must match `base`.
pub fn load_elf_file<P: AsRef<Path>>(
    memory: &mut Memory,
    path: P,
    base: Base,
) -> Result<ElfFile, LoadError> {
    let buf = fs::read(path)?;
    load_elf(memory, &buf, base)
}

/// Like [`load_elf_file`], with the file contents already read into `buf`.
pub fn load_elf(memory: &mut Memory, buf: &[u8], base: Base) -> Result<ElfFile, LoadError> {
    let elf = Elf::parse(buf)?;
    if elf.header.e_machine != EM_RISCV {
        return Err(LoadError::WrongMachine(elf.header.e_machine));
    }
    if elf.is_64 != base.is_rv64() {
        return Err(LoadError::ClassMismatch {
            expected: base.xlen(),
        });
    }

    for header in elf.program_headers.iter().filter(|h| h.p_type == PT_LOAD) {
        let address = header.p_paddr;
        let len = header.p_memsz.max(header.p_filesz);
        // The whole segment is checked up front, its sizes come straight from the file.
        let fits = address
            .checked_add(len)
            .is_some_and(|end| end <= memory.size() as u64);
        if !fits {
            return Err(LoadError::OutOfBounds { address, len });
        }
        let data = segment_data(buf, header.p_offset, header.p_filesz).ok_or(
            LoadError::Truncated {
                offset: header.p_offset,
            },
        )?;
        debug!("Loading segment of {len:#x} bytes at {address:#x}");
        let out_of_bounds = || LoadError::OutOfBounds { address, len };
        memory.load(address, data).map_err(|_| out_of_bounds())?;
        if header.p_memsz > header.p_filesz {
            memory
                .zero(
                    address + header.p_filesz,
                    header.p_memsz - header.p_filesz,
                )
                .map_err(|_| out_of_bounds())?;
        }
    }

    let symbols = elf
        .syms
        .iter()
        .filter_map(|sym| {
            let name = elf.strtab.get_at(sym.st_name)?;
            (!name.is_empty()).then(|| (name.to_owned(), sym.st_value))
        })
        .collect();
    Ok(ElfFile {
        entry: elf.entry,
        symbols,
    })
}

/// Returns the `filesz` bytes at `offset` in the file, or `None` if they aren't all there.
fn segment_data(buf: &[u8], offset: u64, filesz: u64) -> Option<&[u8]> {
    let start = usize::try_from(offset).ok()?;
    let end = start.checked_add(usize::try_from(filesz).ok()?)?;
    buf.get(start..end)
}
