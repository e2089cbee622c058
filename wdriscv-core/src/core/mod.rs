//! Provides a simulatable RV32IMC / RV64IMC core implementation.

pub mod control;
pub mod interrupts;
pub mod status;
pub mod trap;

mod execute;

use crate::compressed;
use crate::cs_registers::{CsRegisters, CsrSpecifier, TrapMode};
use crate::disassembler;
use crate::instruction::{
    BranchCondition, Instruction, LoadWidth, RegImmOp, RegRegOp, RegRegOp32, RegShiftImmOp,
    StoreWidth,
};
use crate::loader::{self, ElfFile, LoadError};
use crate::memory::Memory;
use crate::registers::Registers;
use crate::{Alignment, PrivilegeLevel, Xlen};
use execute::Executor;
use log::{debug, log_enabled, trace, Level};
use std::path::Path;
use thiserror::Error;

pub use trap::{Exception, Fault, Interrupt, TrapCause};

/// Result of executing the semantics of a single instruction.
///
/// A fault is turned into a trap by the caller, the handler itself never modifies state when it
/// faults.
pub type ExecutionResult<X> = Result<(), Fault<X>>;

#[derive(Debug, Clone)]
pub struct Config {
    /// Size in bytes of the flat memory, starting at address `0`.
    pub memory_size: usize,
    /// Number of `x` registers, `32` for the full register file or `16` for an RV32E-like one.
    /// Instructions naming a register beyond this count are illegal.
    pub register_count: usize,
    /// Address to which the core's pc is reset.
    pub reset_vector: u64,
    /// If `true`, the C extension is enabled and instructions only need two-byte alignment.
    pub compressed: bool,
    /// If `true`, non-naturally-aligned memory accesses are supported.
    /// If `false`, they will generate an address-misaligned exception.
    pub support_misaligned_memory_access: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            memory_size: 1 << 20,
            register_count: 32,
            reset_vector: 0,
            compressed: true,
            support_misaligned_memory_access: false,
        }
    }
}

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum ConfigError {
    #[error("register count must be between 1 and 32, got {0}")]
    InvalidRegisterCount(usize),
    #[error("reset vector {0:#x} does not fit the register width")]
    ResetVectorOutOfRange(u64),
    #[error("reset vector {0:#x} is not aligned to the instruction alignment")]
    MisalignedResetVector(u64),
}

/// What happened during a single [`step`](Core::step).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum StepResult<X: Xlen> {
    /// An instruction completed.
    Retired,
    /// A trap was taken instead of completing an instruction.
    Trap {
        cause: TrapCause,
        /// The pc saved in mepc.
        epc: X,
        /// The value written to mtval.
        tval: X,
    },
}

impl<X: Xlen> StepResult<X> {
    pub fn is_trap(&self) -> bool {
        matches!(self, Self::Trap { .. })
    }
}

/// RISC-V core with a single hart, generic over the width of its `x` registers.
///
/// > From the perspective of software running in a given execution environment, a hart is a
/// > resource that autonomously fetches and executes RISC-V instructions within that execution
/// > environment.
///
/// The core exclusively owns its memory, registers and CSRs, so independent cores can be run side
/// by side.
#[derive(Debug)]
pub struct Core<X: Xlen> {
    config: Config,
    memory: Memory,
    registers: Registers<X>,
    cs_registers: CsRegisters<X>,
    /// Address of the next instruction to fetch.
    pc: X,
    /// Address of the instruction being executed.
    curr_pc: X,
    privilege_mode: PrivilegeLevel,
}

impl<X: Xlen> Core<X> {
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        if !(1..=32).contains(&config.register_count) {
            return Err(ConfigError::InvalidRegisterCount(config.register_count));
        }
        let reset_vector = X::from_u64(config.reset_vector);
        if reset_vector.to_u64() != config.reset_vector {
            return Err(ConfigError::ResetVectorOutOfRange(config.reset_vector));
        }
        if !Self::alignment_for(&config).is_aligned(config.reset_vector) {
            return Err(ConfigError::MisalignedResetVector(config.reset_vector));
        }
        Ok(Self {
            memory: Memory::new(config.memory_size),
            registers: Registers::new(config.register_count),
            cs_registers: CsRegisters::new(config.compressed),
            pc: reset_vector,
            curr_pc: reset_vector,
            privilege_mode: PrivilegeLevel::Machine,
            config,
        })
    }

    /// Force this core to its reset state.
    ///
    /// Memory is left untouched, so a loaded program can be run again.
    pub fn reset(&mut self) {
        self.registers.reset();
        self.cs_registers.reset();
        self.privilege_mode = PrivilegeLevel::Machine;
        self.pc = X::from_u64(self.config.reset_vector);
        self.curr_pc = self.pc;
    }

    /// Provide a read-only view of this core's configuration.
    ///
    /// It is not possible to modify the configuration after creation.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn registers(&self) -> &Registers<X> {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut Registers<X> {
        &mut self.registers
    }

    pub fn cs_registers(&self) -> &CsRegisters<X> {
        &self.cs_registers
    }

    pub fn cs_registers_mut(&mut self) -> &mut CsRegisters<X> {
        &mut self.cs_registers
    }

    pub fn pc(&self) -> X {
        self.pc
    }

    pub fn set_pc(&mut self, pc: X) {
        self.pc = pc;
    }

    pub fn privilege_mode(&self) -> PrivilegeLevel {
        self.privilege_mode
    }

    /// Returns the value of `x` register `index`, or `None` if there is no such register.
    pub fn peek_int_reg(&self, index: usize) -> Option<X> {
        self.registers.peek(index)
    }

    /// Returns the value of a CSR without any privilege check or side effect.
    pub fn peek_csr(&self, specifier: CsrSpecifier) -> Option<X> {
        self.cs_registers.peek(specifier)
    }

    /// Raises or clears an interrupt from outside the hart.
    pub fn set_interrupt_pending(&mut self, interrupt: Interrupt, pending: bool) {
        self.cs_registers
            .interrupts_mut()
            .set_pending(interrupt, pending);
    }

    /// Expands a compressed instruction into the equivalent 32-bit instruction.
    pub fn expand_inst(&self, code: u16) -> Option<u32> {
        compressed::expand(code, X::BASE)
    }

    pub fn disassemble_inst(&self, raw_instruction: u32) -> String {
        disassembler::disassemble(raw_instruction, X::BASE)
    }

    /// Loads a program in hex format into memory.
    pub fn load_hex_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), LoadError> {
        loader::load_hex_file(&mut self.memory, path)
    }

    /// Loads the segments of an ELF executable into memory.
    ///
    /// The pc is not changed, the entry point is part of the returned [`ElfFile`].
    pub fn load_elf_file<P: AsRef<Path>>(&mut self, path: P) -> Result<ElfFile, LoadError> {
        loader::load_elf_file(&mut self.memory, path, X::BASE)
    }

    /// Executes instructions forever.
    pub fn run(&mut self) -> ! {
        loop {
            self.step();
        }
    }

    /// Executes instructions until the pc equals `address`. The instruction at `address` is not
    /// executed.
    pub fn run_until_address(&mut self, address: X) {
        while self.pc != address {
            self.step();
        }
    }

    /// Executes at most `max_steps` steps, returning the number of steps taken. Stops early when
    /// the pc reaches `stop_address`, if given.
    pub fn run_steps(&mut self, max_steps: u64, stop_address: Option<X>) -> u64 {
        let mut steps = 0;
        while steps < max_steps && Some(self.pc) != stop_address {
            self.step();
            steps += 1;
        }
        steps
    }

    /// Takes a pending interrupt, or fetches and executes a single instruction.
    pub fn step(&mut self) -> StepResult<X> {
        if let Some(interrupt) = self.pending_interrupt() {
            let epc = self.pc;
            self.initiate_interrupt(interrupt, epc);
            self.cs_registers.tick();
            return StepResult::Trap {
                cause: interrupt.into(),
                epc,
                tval: X::ZERO,
            };
        }

        self.curr_pc = self.pc;
        match self.fetch_instruction(self.pc) {
            Ok((raw_instruction, true)) => self.execute16(raw_instruction as u16),
            Ok((raw_instruction, false)) => self.execute32(raw_instruction),
            Err(fault) => self.take_exception(fault),
        }
    }

    /// Executes a 16-bit instruction as if it were fetched at the current pc.
    pub fn execute16(&mut self, code: u16) -> StepResult<X> {
        self.execute_raw_instruction(code as u32, true)
    }

    /// Executes a 32-bit instruction as if it were fetched at the current pc.
    pub fn execute32(&mut self, raw_instruction: u32) -> StepResult<X> {
        self.execute_raw_instruction(raw_instruction, false)
    }

    /// Raises a synchronous exception. `pc` is saved as the address of the faulting instruction
    /// and `info` becomes the trap value.
    pub fn initiate_exception(&mut self, exception: Exception, pc: X, info: X) {
        self.initiate_trap(exception.into(), pc, info);
    }

    /// Takes an interrupt, `pc` being the address of the instruction to resume at.
    pub fn initiate_interrupt(&mut self, interrupt: Interrupt, pc: X) {
        self.initiate_trap(interrupt.into(), pc, X::ZERO);
    }

    /// Enters the trap handler.
    ///
    /// > When a trap is taken into M-mode, mepc is written with the virtual address of the
    /// > instruction that was interrupted or that encountered the exception. [...] mcause is
    /// > written with a code indicating the event that caused the trap.
    ///
    /// > When a trap is taken from privilege mode y into privilege mode x, xPIE is set to the value
    /// > of xIE; xIE is set to 0; and xPP is set to y.
    ///
    /// All traps are taken into M-mode, medeleg and mideleg are not consulted.
    pub fn initiate_trap(&mut self, cause: TrapCause, pc_to_save: X, info: X) {
        debug!(
            cause = cause.code(),
            interrupt = cause.is_interrupt(),
            epc = pc_to_save.to_u64(),
            tval = info.to_u64();
            "Taking trap: {cause}"
        );
        let cs_registers = &mut self.cs_registers;
        cs_registers.set_epc(TrapMode::Machine, pc_to_save);
        cs_registers.set_cause(TrapMode::Machine, cause.to_xcause());
        cs_registers.set_tval(TrapMode::Machine, info);

        let status = cs_registers.status_mut();
        status.set_mpie(status.mie());
        status.set_mie(false);
        status.set_mpp(self.privilege_mode);
        self.privilege_mode = PrivilegeLevel::Machine;

        let target = cs_registers
            .tvec(TrapMode::Machine)
            .trap_address(cause.is_interrupt(), cause.code());
        self.pc = X::from_u64(target);
    }

    /// Minimum alignment of instruction addresses.
    pub fn instruction_alignment(&self) -> Alignment {
        Self::alignment_for(&self.config)
    }

    fn alignment_for(config: &Config) -> Alignment {
        match config.compressed {
            true => Alignment::HALFWORD,
            false => Alignment::WORD,
        }
    }

    /// Returns the interrupt to take before the next instruction, if any.
    ///
    /// > Interrupts for higher-privilege modes, y>x, are always globally enabled regardless of the
    /// > setting of the global yIE bit for the higher-privilege mode.
    fn pending_interrupt(&self) -> Option<Interrupt> {
        let globally_enabled = self.privilege_mode < PrivilegeLevel::Machine
            || self.cs_registers.status().mie();
        match globally_enabled {
            true => self.cs_registers.interrupts().highest_priority_enabled(),
            false => None,
        }
    }

    /// "Independent instruction fetch unit"
    ///
    /// > Instructions are stored in memory as a sequence of 16-bit little-endian parcels,
    /// > regardless of memory system endianness. Parcels forming one instruction are stored at
    /// > increasing halfword addresses, with the lowest-addressed parcel holding the
    /// > lowest-numbered bits in the instruction specification.
    ///
    /// Returns the raw instruction and whether it is a compressed one.
    fn fetch_instruction(&self, address: X) -> Result<(u32, bool), Fault<X>> {
        if !self.instruction_alignment().is_aligned(address.to_u64()) {
            return Err(Fault::new(Exception::InstructionAddressMisaligned, address));
        }
        let fetch_parcel = |address: X| {
            self.memory
                .read_halfword(address.to_u64())
                .map_err(|_| Fault::new(Exception::InstructionAccessFault, address))
        };
        let low = fetch_parcel(address)?;
        if compressed::is_compressed(low) {
            return Ok((low as u32, true));
        }
        let high = fetch_parcel(address.wrapping_add_signed(2))?;
        Ok(((high as u32) << 16 | low as u32, false))
    }

    fn execute_raw_instruction(&mut self, raw_instruction: u32, is_compressed: bool) -> StepResult<X> {
        self.curr_pc = self.pc;
        let size = if is_compressed { 2 } else { 4 };
        self.pc = self.pc.wrapping_add_signed(size);

        let result = self
            .decode(raw_instruction, is_compressed)
            .and_then(|instruction| self.execute_instruction(instruction, raw_instruction));
        match result {
            Ok(()) => {
                self.cs_registers.retire();
                if log_enabled!(Level::Trace) {
                    trace!(
                        "{:#010x}: {}",
                        self.curr_pc.to_u64(),
                        disassembler::disassemble(raw_instruction, X::BASE)
                    );
                }
                StepResult::Retired
            }
            Err(fault) => self.take_exception(fault),
        }
    }

    /// Decodes a raw instruction, expanding it first if it is compressed.
    ///
    /// # Unspecified behavior
    ///
    /// > The behavior upon decoding a reserved instruction is UNSPECIFIED.
    ///
    /// This implementation chooses to raise an [`Exception::IllegalInstruction`] for reserved and
    /// unsupported encodings, and for instructions naming registers beyond the configured count.
    fn decode(&self, raw_instruction: u32, is_compressed: bool) -> Result<Instruction, Fault<X>> {
        let illegal = || {
            Fault::new(
                Exception::IllegalInstruction,
                X::from_u64(raw_instruction as u64),
            )
        };
        let raw_instruction = match is_compressed {
            true if !self.config.compressed => return Err(illegal()),
            true => compressed::expand(raw_instruction as u16, X::BASE).ok_or_else(illegal)?,
            false => raw_instruction,
        };
        let instruction = Instruction::decode(raw_instruction, X::BASE).map_err(|_| illegal())?;
        let all_registers_exist = instruction
            .specifiers()
            .into_iter()
            .flatten()
            .all(|specifier| self.registers.contains(specifier));
        match all_registers_exist {
            true => Ok(instruction),
            false => Err(illegal()),
        }
    }

    fn take_exception(&mut self, fault: Fault<X>) -> StepResult<X> {
        let epc = self.curr_pc;
        self.initiate_exception(fault.exception, epc, fault.trap_value);
        self.cs_registers.tick();
        StepResult::Trap {
            cause: fault.exception.into(),
            epc,
            tval: fault.trap_value,
        }
    }

    /// Execute a single decoded instruction on this core.
    ///
    /// This only takes care of the instruction-specific operations, such as updating `x` registers,
    /// memory, CSRs and the `pc`. The `pc` must already point to the next sequential instruction.
    fn execute_instruction(
        &mut self,
        instruction: Instruction,
        raw_instruction: u32,
    ) -> ExecutionResult<X> {
        let mut executor = Executor {
            core: self,
            raw_instruction,
        };
        match instruction {
            Instruction::OpImm {
                op,
                dest,
                src,
                immediate,
            } => {
                let op = match op {
                    RegImmOp::Addi => Executor::addi,
                    RegImmOp::Slti => Executor::slti,
                    RegImmOp::Sltiu => Executor::sltiu,
                    RegImmOp::Xori => Executor::xori,
                    RegImmOp::Ori => Executor::ori,
                    RegImmOp::Andi => Executor::andi,
                };
                op(&mut executor, dest, src, immediate)
            }
            Instruction::OpShiftImm {
                op,
                dest,
                src,
                shift_amount,
            } => {
                let op = match op {
                    RegShiftImmOp::Slli => Executor::slli,
                    RegShiftImmOp::Srli => Executor::srli,
                    RegShiftImmOp::Srai => Executor::srai,
                };
                op(&mut executor, dest, src, shift_amount)
            }
            Instruction::OpImm32 {
                dest,
                src,
                immediate,
            } => executor.addiw(dest, src, immediate),
            Instruction::OpShiftImm32 {
                op,
                dest,
                src,
                shift_amount_u5,
            } => {
                let op = match op {
                    RegShiftImmOp::Slli => Executor::slliw,
                    RegShiftImmOp::Srli => Executor::srliw,
                    RegShiftImmOp::Srai => Executor::sraiw,
                };
                op(&mut executor, dest, src, shift_amount_u5)
            }
            Instruction::Auipc { dest, immediate } => executor.auipc(dest, immediate),
            Instruction::Lui { dest, immediate } => executor.lui(dest, immediate),
            Instruction::Op {
                op,
                dest,
                src1,
                src2,
            } => {
                let op = match op {
                    RegRegOp::Add => Executor::add,
                    RegRegOp::Slt => Executor::slt,
                    RegRegOp::Sltu => Executor::sltu,
                    RegRegOp::And => Executor::and,
                    RegRegOp::Or => Executor::or,
                    RegRegOp::Xor => Executor::xor,
                    RegRegOp::Sll => Executor::sll,
                    RegRegOp::Srl => Executor::srl,
                    RegRegOp::Sub => Executor::sub,
                    RegRegOp::Sra => Executor::sra,
                    RegRegOp::Mul => Executor::mul,
                    RegRegOp::Mulh => Executor::mulh,
                    RegRegOp::Mulhsu => Executor::mulhsu,
                    RegRegOp::Mulhu => Executor::mulhu,
                    RegRegOp::Div => Executor::div,
                    RegRegOp::Divu => Executor::divu,
                    RegRegOp::Rem => Executor::rem,
                    RegRegOp::Remu => Executor::remu,
                };
                op(&mut executor, dest, src1, src2)
            }
            Instruction::Op32 {
                op,
                dest,
                src1,
                src2,
            } => {
                let op = match op {
                    RegRegOp32::Addw => Executor::addw,
                    RegRegOp32::Subw => Executor::subw,
                    RegRegOp32::Sllw => Executor::sllw,
                    RegRegOp32::Srlw => Executor::srlw,
                    RegRegOp32::Sraw => Executor::sraw,
                    RegRegOp32::Mulw => Executor::mulw,
                    RegRegOp32::Divw => Executor::divw,
                    RegRegOp32::Divuw => Executor::divuw,
                    RegRegOp32::Remw => Executor::remw,
                    RegRegOp32::Remuw => Executor::remuw,
                };
                op(&mut executor, dest, src1, src2)
            }
            Instruction::Jal { dest, offset } => executor.jal(dest, offset),
            Instruction::Jalr { dest, base, offset } => executor.jalr(dest, base, offset),
            Instruction::Branch {
                condition,
                src1,
                src2,
                offset,
            } => {
                let op = match condition {
                    BranchCondition::Beq => Executor::beq,
                    BranchCondition::Bne => Executor::bne,
                    BranchCondition::Blt => Executor::blt,
                    BranchCondition::Bltu => Executor::bltu,
                    BranchCondition::Bge => Executor::bge,
                    BranchCondition::Bgeu => Executor::bgeu,
                };
                op(&mut executor, src1, src2, offset)
            }
            Instruction::Load {
                width,
                dest,
                base,
                offset,
            } => {
                let op = match width {
                    LoadWidth::Lb => Executor::lb,
                    LoadWidth::Lh => Executor::lh,
                    LoadWidth::Lw => Executor::lw,
                    LoadWidth::Ld => Executor::ld,
                    LoadWidth::Lbu => Executor::lbu,
                    LoadWidth::Lhu => Executor::lhu,
                    LoadWidth::Lwu => Executor::lwu,
                };
                op(&mut executor, dest, base, offset)
            }
            Instruction::Store {
                width,
                src,
                base,
                offset,
            } => {
                let op = match width {
                    StoreWidth::Sb => Executor::sb,
                    StoreWidth::Sh => Executor::sh,
                    StoreWidth::Sw => Executor::sw,
                    StoreWidth::Sd => Executor::sd,
                };
                op(&mut executor, src, base, offset)
            }
            Instruction::Fence {
                predecessor,
                successor,
            } => executor.fence(predecessor, successor),
            Instruction::FenceI => executor.fence_i(),
            Instruction::Csr {
                op,
                dest,
                source,
                csr,
            } => executor.csr(op, dest, source, csr),
            Instruction::Ecall => executor.ecall(),
            Instruction::Ebreak => executor.ebreak(),
            Instruction::Mret => executor.mret(),
            Instruction::Sret => executor.sret(),
            Instruction::Wfi => executor.wfi(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cs_registers::specifier;
    use crate::registers::Specifier;

    fn x(index: u8) -> Specifier {
        Specifier::from_u5(index)
    }

    fn rv32() -> Core<u32> {
        Core::new(Config {
            memory_size: 0x1000,
            ..Config::default()
        })
        .unwrap()
    }

    fn rv64() -> Core<u64> {
        Core::new(Config {
            memory_size: 0x1000,
            ..Config::default()
        })
        .unwrap()
    }

    fn load_words<X: Xlen>(core: &mut Core<X>, address: u64, words: &[u32]) {
        let bytes: Vec<u8> = words.iter().flat_map(|word| word.to_le_bytes()).collect();
        core.memory_mut().load(address, &bytes).unwrap();
    }

    fn mtvec<X: Xlen>(core: &mut Core<X>, value: u64) {
        core.cs_registers_mut()
            .write(specifier::MTVEC, X::from_u64(value), PrivilegeLevel::Machine)
            .unwrap();
    }

    #[test]
    fn test_config_validation() {
        let config = Config {
            register_count: 33,
            ..Config::default()
        };
        assert_eq!(
            ConfigError::InvalidRegisterCount(33),
            Core::<u32>::new(config).unwrap_err()
        );
        let config = Config {
            reset_vector: 1 << 32,
            ..Config::default()
        };
        assert_eq!(
            ConfigError::ResetVectorOutOfRange(1 << 32),
            Core::<u32>::new(config.clone()).unwrap_err()
        );
        assert!(Core::<u64>::new(config).is_ok());
        let config = Config {
            reset_vector: 2,
            compressed: false,
            ..Config::default()
        };
        assert_eq!(
            ConfigError::MisalignedResetVector(2),
            Core::<u32>::new(config).unwrap_err()
        );
    }

    #[test]
    fn test_step_addi() {
        let mut core = rv32();
        load_words(&mut core, 0, &[0x00400513]);
        assert_eq!(StepResult::Retired, core.step());
        assert_eq!(Some(4), core.peek_int_reg(10));
        assert_eq!(4, core.pc());
        assert_eq!(1, core.cs_registers().minstret());
    }

    #[test]
    fn test_x0_stays_zero() {
        let mut core = rv64();
        // addi x0, x0, 5
        core.execute32(0x00500013);
        assert_eq!(Some(0), core.peek_int_reg(0));
    }

    #[test]
    fn test_divide_by_zero() {
        let mut core = rv32();
        core.registers_mut().set_x(x(1), 1234);
        // div x3, x1, x2; rem x4, x1, x2
        core.execute32(0x0220C1B3);
        core.execute32(0x0220E233);
        assert_eq!(u32::MAX, core.registers().x(x(3)));
        assert_eq!(1234, core.registers().x(x(4)));

        let mut core = rv64();
        core.registers_mut().set_x(x(1), 1234);
        core.execute32(0x0220C1B3);
        core.execute32(0x0220E233);
        assert_eq!(u64::MAX, core.registers().x(x(3)));
        assert_eq!(1234, core.registers().x(x(4)));
    }

    #[test]
    fn test_signed_division_overflow() {
        let mut core = rv32();
        core.registers_mut().set_x(x(1), i32::MIN as u32);
        core.registers_mut().set_x(x(2), u32::MAX);
        core.execute32(0x0220C1B3);
        core.execute32(0x0220E233);
        assert_eq!(i32::MIN as u32, core.registers().x(x(3)));
        assert_eq!(0, core.registers().x(x(4)));

        let mut core = rv64();
        core.registers_mut().set_x(x(1), i64::MIN as u64);
        core.registers_mut().set_x(x(2), u64::MAX);
        core.execute32(0x0220C1B3);
        core.execute32(0x0220E233);
        assert_eq!(i64::MIN as u64, core.registers().x(x(3)));
        assert_eq!(0, core.registers().x(x(4)));
    }

    #[test]
    fn test_mulh() {
        let mut core = rv32();
        core.registers_mut().set_x(x(1), -2i32 as u32);
        core.registers_mut().set_x(x(2), 3);
        // mulh x3, x1, x2; mulhu x4, x1, x2
        core.execute32(0x022091B3);
        core.execute32(0x0220B233);
        assert_eq!(u32::MAX, core.registers().x(x(3)));
        assert_eq!(2, core.registers().x(x(4)));
    }

    #[test]
    fn test_word_operations_sign_extend() {
        let mut core = rv64();
        core.registers_mut().set_x(x(6), 0x7FFF_FFFF);
        core.registers_mut().set_x(x(7), 1);
        // addw x5, x6, x7
        core.execute32(0x007302BB);
        assert_eq!(0xFFFF_FFFF_8000_0000, core.registers().x(x(5)));
    }

    #[test]
    fn test_word_operations_illegal_on_rv32() {
        let mut core = rv32();
        mtvec(&mut core, 0x100);
        let result = core.execute32(0x007302BB);
        assert_eq!(
            StepResult::Trap {
                cause: Exception::IllegalInstruction.into(),
                epc: 0,
                tval: 0x007302BB,
            },
            result
        );
        assert_eq!(0x100, core.pc());
    }

    #[test]
    fn test_misaligned_jump_does_not_commit() {
        let mut core = Core::<u32>::new(Config {
            memory_size: 0x1000,
            compressed: false,
            ..Config::default()
        })
        .unwrap();
        mtvec(&mut core, 0x200);
        // jal x1, 2
        let result = core.execute32(0x002000EF);
        assert!(result.is_trap());
        assert_eq!(0, core.registers().x(x(1)));
        assert_eq!(0x200, core.pc());
        assert_eq!(Some(0), core.peek_csr(specifier::MCAUSE));
        assert_eq!(Some(2), core.peek_csr(specifier::MTVAL));
        assert_eq!(Some(0), core.peek_csr(specifier::MEPC));

        // beq x0, x0, 2
        core.set_pc(0);
        core.execute32(0x00000163);
        assert_eq!(0x200, core.pc());
        assert_eq!(Some(2), core.peek_csr(specifier::MTVAL));
    }

    #[test]
    fn test_jump_with_compressed_alignment() {
        let mut core = rv32();
        core.set_pc(0x10);
        core.execute32(0x002000EF);
        assert_eq!(0x12, core.pc());
        assert_eq!(0x14, core.registers().x(x(1)));
    }

    #[test]
    fn test_misaligned_load_store() {
        let mut core = rv64();
        core.registers_mut().set_x(x(5), 0xDEAD_BEEF);
        // lw x5, 1(x0)
        let result = core.execute32(0x00102283);
        assert_eq!(
            StepResult::Trap {
                cause: Exception::LoadAddressMisaligned.into(),
                epc: 0,
                tval: 1,
            },
            result
        );
        assert_eq!(0xDEAD_BEEF, core.registers().x(x(5)));

        // sw x5, 2(x0)
        core.set_pc(0);
        let result = core.execute32(0x00502123);
        assert_eq!(
            StepResult::Trap {
                cause: Exception::StoreOrAmoAddressMisaligned.into(),
                epc: 0,
                tval: 2,
            },
            result
        );
        assert_eq!(Ok(0), core.memory().read_word(0));
    }

    #[test]
    fn test_misaligned_access_supported() {
        let mut core = Core::<u32>::new(Config {
            memory_size: 0x100,
            support_misaligned_memory_access: true,
            ..Config::default()
        })
        .unwrap();
        core.memory_mut().load(1, &[0x78, 0x56, 0x34, 0x12]).unwrap();
        assert_eq!(StepResult::Retired, core.execute32(0x00102283));
        assert_eq!(0x1234_5678, core.registers().x(x(5)));
    }

    #[test]
    fn test_load_access_fault() {
        let mut core = rv32();
        core.registers_mut().set_x(x(6), 0x1000);
        // lw x5, 0(x6)
        let result = core.execute32(0x00032283);
        assert_eq!(
            StepResult::Trap {
                cause: Exception::LoadAccessFault.into(),
                epc: 0,
                tval: 0x1000,
            },
            result
        );
    }

    #[test]
    fn test_narrow_loads_extend() {
        let mut core = rv64();
        core.memory_mut().load(0x100, &[0x80, 0xFF]).unwrap();
        core.registers_mut().set_x(x(6), 0x100);
        // lb x5, 0(x6); lbu x7, 0(x6); lh x8, 0(x6); lhu x9, 0(x6)
        core.execute32(0x00030283);
        core.execute32(0x00034383);
        core.execute32(0x00031403);
        core.execute32(0x00035483);
        assert_eq!(-128i64 as u64, core.registers().x(x(5)));
        assert_eq!(0x80, core.registers().x(x(7)));
        assert_eq!(0xFFFF_FFFF_FFFF_FF80, core.registers().x(x(8)));
        assert_eq!(0xFF80, core.registers().x(x(9)));
    }

    #[test]
    fn test_ecall_in_machine_mode() {
        let mut core = rv32();
        mtvec(&mut core, 0x80);
        load_words(&mut core, 0, &[0x00000073]);
        let result = core.step();
        assert_eq!(
            StepResult::Trap {
                cause: Exception::EnvironmentCallFromMMode.into(),
                epc: 0,
                tval: 0,
            },
            result
        );
        assert_eq!(Some(11), core.peek_csr(specifier::MCAUSE));
        assert_eq!(0x80, core.pc());
        assert_eq!(0, core.cs_registers().minstret());
    }

    #[test]
    fn test_trap_and_return_from_user_mode() {
        let mut core = rv64();
        mtvec(&mut core, 0x100);
        // Enter user mode at 0x40 through mret.
        core.cs_registers_mut()
            .write(specifier::MEPC, 0x40, PrivilegeLevel::Machine)
            .unwrap();
        core.cs_registers_mut().status_mut().set_mpie(true);
        core.execute32(0x30200073);
        assert_eq!(PrivilegeLevel::User, core.privilege_mode());
        assert_eq!(0x40, core.pc());
        assert!(core.cs_registers().status().mie());

        core.execute32(0x00000073);
        assert_eq!(Some(8), core.peek_csr(specifier::MCAUSE));
        assert_eq!(Some(0x40), core.peek_csr(specifier::MEPC));
        assert_eq!(PrivilegeLevel::Machine, core.privilege_mode());
        assert_eq!(PrivilegeLevel::User, core.cs_registers().status().mpp());
        assert!(!core.cs_registers().status().mie());
        assert!(core.cs_registers().status().mpie());
        assert_eq!(0x100, core.pc());
    }

    #[test]
    fn test_privileged_csr_write_from_user_mode() {
        let mut core = rv32();
        core.privilege_mode = PrivilegeLevel::User;
        core.registers_mut().set_x(x(5), u32::MAX);
        // csrrw x0, mscratch, x5
        let result = core.execute32(0x34029073);
        assert_eq!(
            StepResult::Trap {
                cause: Exception::IllegalInstruction.into(),
                epc: 0,
                tval: 0x34029073,
            },
            result
        );
        assert_eq!(Some(0), core.peek_csr(specifier::MSCRATCH));
        assert_eq!(PrivilegeLevel::Machine, core.privilege_mode());
    }

    #[test]
    fn test_csr_read_modify_write() {
        let mut core = rv64();
        // csrr a0, mhartid
        assert_eq!(StepResult::Retired, core.execute32(0xF1402573));
        assert_eq!(0, core.registers().x(x(10)));

        core.registers_mut().set_x(x(5), 0x1234);
        // csrrw x6, mscratch, x5
        core.execute32(0x34029373);
        assert_eq!(0, core.registers().x(x(6)));
        assert_eq!(Some(0x1234), core.peek_csr(specifier::MSCRATCH));
        // csrrci x7, mscratch, 4
        core.execute32(0x340273F3);
        assert_eq!(0x1234, core.registers().x(x(7)));
        assert_eq!(Some(0x1230), core.peek_csr(specifier::MSCRATCH));
    }

    #[test]
    fn test_csr_read_only_only_traps_on_write() {
        let mut core = rv32();
        // csrrs a0, mhartid, x0 reads fine, csrrw x0, mhartid, x5 doesn't.
        assert_eq!(StepResult::Retired, core.execute32(0xF1402573));
        assert!(core.execute32(0xF1429073).is_trap());
    }

    #[test]
    fn test_mret_requires_machine_mode() {
        let mut core = rv32();
        core.privilege_mode = PrivilegeLevel::Supervisor;
        let result = core.execute32(0x30200073);
        assert!(result.is_trap());
        assert_eq!(Some(2), core.peek_csr(specifier::MCAUSE));
        assert_eq!(PrivilegeLevel::Machine, core.privilege_mode());
    }

    #[test]
    fn test_wfi() {
        let mut core = rv32();
        assert_eq!(StepResult::Retired, core.execute32(0x10500073));
        core.privilege_mode = PrivilegeLevel::User;
        assert!(core.execute32(0x10500073).is_trap());
    }

    #[test]
    fn test_reduced_register_file() {
        let mut core = Core::<u32>::new(Config {
            memory_size: 0x100,
            register_count: 16,
            ..Config::default()
        })
        .unwrap();
        // addi x20, x0, 1
        assert!(core.execute32(0x00100A13).is_trap());
        assert_eq!(None, core.peek_int_reg(20));
        assert_eq!(Some(2), core.peek_csr(specifier::MCAUSE));
    }

    #[test]
    fn test_compressed_matches_expansion() {
        for (code, base_regs) in [(0x4511u16, [10u8, 0]), (0x852E, [10, 11]), (0x157D, [10, 0])] {
            let mut compressed = rv64();
            let mut expanded = rv64();
            for core in [&mut compressed, &mut expanded] {
                for index in base_regs {
                    core.registers_mut().set_x(x(index), 0x55);
                }
            }
            let word = expanded.expand_inst(code).unwrap();
            assert_eq!(compressed.execute16(code), expanded.execute32(word));
            for index in 0..32 {
                assert_eq!(compressed.peek_int_reg(index), expanded.peek_int_reg(index));
            }
            assert_eq!(2, compressed.pc());
            assert_eq!(4, expanded.pc());
        }
    }

    /// Runs `code` on one core and its expansion on another, after the same `setup`, and checks
    /// that both end up with the same registers and memory.
    fn run_both_ways<X: Xlen>(code: u16, setup: impl Fn(&mut Core<X>)) -> (Core<X>, Core<X>) {
        let config = Config {
            memory_size: 0x1000,
            ..Config::default()
        };
        let mut compressed = Core::<X>::new(config.clone()).unwrap();
        let mut expanded = Core::<X>::new(config).unwrap();
        for core in [&mut compressed, &mut expanded] {
            core.set_pc(X::from_u64(0x100));
            setup(core);
        }
        let word = expanded.expand_inst(code).unwrap();
        assert_eq!(
            compressed.execute16(code),
            expanded.execute32(word),
            "{code:#06x}"
        );
        for index in 0..32 {
            assert_eq!(
                compressed.peek_int_reg(index),
                expanded.peek_int_reg(index),
                "{code:#06x} x{index}"
            );
        }
        assert!(compressed.memory() == expanded.memory(), "{code:#06x}");
        (compressed, expanded)
    }

    #[test]
    fn test_compressed_loads_and_stores() {
        // c.lw x9, 0x4C(x8)
        let (core, _) = run_both_ways::<u32>(0x4464, |core| {
            core.registers_mut().set_x(x(8), 0x200);
            core.memory_mut().write_word(0x24C, 0x8765_4321).unwrap();
        });
        assert_eq!(0x8765_4321, core.registers().x(x(9)));
        assert_eq!(0x102, core.pc());

        // c.sw x9, 0x4C(x8)
        let (core, _) = run_both_ways::<u32>(0xC464, |core| {
            core.registers_mut().set_x(x(8), 0x200);
            core.registers_mut().set_x(x(9), 0x1234_5678);
        });
        assert_eq!(Ok(0x1234_5678), core.memory().read_word(0x24C));

        // c.ldsp x10, 0x1E8(sp)
        let (core, _) = run_both_ways::<u64>(0x753E, |core| {
            core.registers_mut().set_x(Specifier::SP, 0x200);
            core.memory_mut()
                .write_doubleword(0x3E8, 0x0123_4567_89AB_CDEF)
                .unwrap();
        });
        assert_eq!(0x0123_4567_89AB_CDEF, core.registers().x(x(10)));

        // c.sdsp x10, 0x1E8(sp)
        let (core, _) = run_both_ways::<u64>(0xF7AA, |core| {
            core.registers_mut().set_x(Specifier::SP, 0x200);
            core.registers_mut().set_x(x(10), 0xFEDC_BA98_7654_3210);
        });
        assert_eq!(
            Ok(0xFEDC_BA98_7654_3210),
            core.memory().read_doubleword(0x3E8)
        );
    }

    #[test]
    fn test_compressed_branches() {
        // c.beqz x8, 0x2A and c.bnez x8, 0x2A
        for (code, x8, taken) in [
            (0xC40D, 0, true),
            (0xC40D, 1, false),
            (0xE40D, 0, false),
            (0xE40D, 1, true),
        ] {
            let (compressed, expanded) = run_both_ways::<u32>(code, |core| {
                core.registers_mut().set_x(x(8), x8);
            });
            match taken {
                true => {
                    assert_eq!(0x12A, compressed.pc());
                    assert_eq!(0x12A, expanded.pc());
                }
                false => {
                    assert_eq!(0x102, compressed.pc());
                    assert_eq!(0x104, expanded.pc());
                }
            }
        }

        // c.beqz x8, -2
        let (compressed, expanded) = run_both_ways::<u64>(0xDC7D, |_| {});
        assert_eq!(0xFE, compressed.pc());
        assert_eq!(0xFE, expanded.pc());
    }

    #[test]
    fn test_compressed_jumps() {
        // c.j -2
        let (compressed, expanded) = run_both_ways::<u64>(0xBFFD, |_| {});
        assert_eq!(0xFE, compressed.pc());
        assert_eq!(0xFE, expanded.pc());

        // c.jal -2 links the address of the next compressed instruction.
        let config = Config {
            memory_size: 0x1000,
            ..Config::default()
        };
        let mut core = Core::<u32>::new(config.clone()).unwrap();
        core.set_pc(0x100);
        assert_eq!(StepResult::Retired, core.execute16(0x3FFD));
        assert_eq!(0xFE, core.pc());
        assert_eq!(0x102, core.registers().x(Specifier::RA));
        let mut core = Core::<u32>::new(config.clone()).unwrap();
        core.set_pc(0x100);
        let word = core.expand_inst(0x3FFD).unwrap();
        assert_eq!(StepResult::Retired, core.execute32(word));
        assert_eq!(0xFE, core.pc());
        assert_eq!(0x104, core.registers().x(Specifier::RA));

        // c.jr x1
        let (compressed, expanded) = run_both_ways::<u32>(0x8082, |core| {
            core.registers_mut().set_x(Specifier::RA, 0x200);
        });
        assert_eq!(0x200, compressed.pc());
        assert_eq!(0x200, expanded.pc());

        // c.jalr x5
        let mut core = Core::<u64>::new(config).unwrap();
        core.set_pc(0x100);
        core.registers_mut().set_x(x(5), 0x200);
        assert_eq!(StepResult::Retired, core.execute16(0x9282));
        assert_eq!(0x200, core.pc());
        assert_eq!(0x102, core.registers().x(Specifier::RA));
        core.set_pc(0x100);
        let word = core.expand_inst(0x9282).unwrap();
        assert_eq!(StepResult::Retired, core.execute32(word));
        assert_eq!(0x200, core.pc());
        assert_eq!(0x104, core.registers().x(Specifier::RA));
    }

    #[test]
    fn test_compressed_disabled() {
        let mut core = Core::<u32>::new(Config {
            memory_size: 0x100,
            compressed: false,
            ..Config::default()
        })
        .unwrap();
        core.memory_mut().write_halfword(0, 0x4511).unwrap();
        let result = core.step();
        assert_eq!(
            StepResult::Trap {
                cause: Exception::IllegalInstruction.into(),
                epc: 0,
                tval: 0x4511,
            },
            result
        );
    }

    #[test]
    fn test_fetch_faults() {
        let mut core = rv32();
        mtvec(&mut core, 0x100);
        core.set_pc(0x1000);
        let result = core.step();
        assert_eq!(
            StepResult::Trap {
                cause: Exception::InstructionAccessFault.into(),
                epc: 0x1000,
                tval: 0x1000,
            },
            result
        );
        // A 32-bit instruction whose second parcel lies outside of memory.
        core.memory_mut().write_halfword(0xFFE, 0x0513).unwrap();
        core.set_pc(0xFFE);
        let result = core.step();
        assert_eq!(
            StepResult::Trap {
                cause: Exception::InstructionAccessFault.into(),
                epc: 0xFFE,
                tval: 0x1000,
            },
            result
        );
    }

    #[test]
    fn test_interrupt() {
        let mut core = rv32();
        mtvec(&mut core, 0x101);
        load_words(&mut core, 0, &[0x00400513, 0x00400513]);
        core.cs_registers_mut()
            .write(specifier::MIE, 1 << 7, PrivilegeLevel::Machine)
            .unwrap();
        core.set_interrupt_pending(Interrupt::MachineTimerInterrupt, true);
        // Globally disabled in M-mode.
        assert_eq!(StepResult::Retired, core.step());

        core.cs_registers_mut().status_mut().set_mie(true);
        let result = core.step();
        assert_eq!(
            StepResult::Trap {
                cause: Interrupt::MachineTimerInterrupt.into(),
                epc: 4,
                tval: 0,
            },
            result
        );
        assert_eq!(Some(0x8000_0007), core.peek_csr(specifier::MCAUSE));
        assert_eq!(Some(4), core.peek_csr(specifier::MEPC));
        // Vectored mode.
        assert_eq!(0x11C, core.pc());
        assert!(!core.cs_registers().status().mie());
    }

    #[test]
    fn test_user_interrupts() {
        let mut core = rv32();
        mtvec(&mut core, 0x100);
        load_words(&mut core, 0, &[0x00400513]);
        core.cs_registers_mut()
            .write(specifier::MIE, 1 << 4, PrivilegeLevel::Machine)
            .unwrap();
        core.set_interrupt_pending(Interrupt::UserTimerInterrupt, true);
        core.cs_registers_mut().status_mut().set_mie(true);
        let result = core.step();
        assert_eq!(
            StepResult::Trap {
                cause: Interrupt::UserTimerInterrupt.into(),
                epc: 0,
                tval: 0,
            },
            result
        );
        let mcause = core.cs_registers().cause(TrapMode::Machine);
        assert_eq!(0x8000_0004, mcause);
        assert_eq!(
            Some(TrapCause::Interrupt(Interrupt::UserTimerInterrupt)),
            TrapCause::from_xcause(mcause)
        );
        assert_eq!(0x100, core.pc());

        core.initiate_interrupt(Interrupt::UserSoftwareInterrupt, 0x20);
        assert_eq!(Some(0x8000_0000), core.peek_csr(specifier::MCAUSE));
        assert_eq!(Some(0x20), core.peek_csr(specifier::MEPC));
        assert_eq!(0x100, core.pc());
    }

    #[test]
    fn test_initiate_trap() {
        let mut core = rv64();
        mtvec(&mut core, 0x400);
        core.initiate_exception(Exception::Breakpoint, 0x24, 0);
        assert_eq!(Some(0x24), core.peek_csr(specifier::MEPC));
        assert_eq!(Some(3), core.peek_csr(specifier::MCAUSE));
        assert_eq!(0x400, core.pc());
    }

    #[test]
    fn test_run_until_address() {
        let mut core = rv32();
        // Three times addi a0, a0, 1, then jal x0, 0
        load_words(&mut core, 0, &[0x00150513, 0x00150513, 0x00150513, 0x0000006F]);
        core.run_until_address(0xC);
        assert_eq!(0xC, core.pc());
        assert_eq!(3, core.registers().x(x(10)));
        assert_eq!(5, core.run_steps(5, None));
        assert_eq!(0xC, core.pc());
        assert_eq!(0, core.run_steps(5, Some(0xC)));
    }

    #[test]
    fn test_reset_keeps_memory() {
        let mut core = rv32();
        load_words(&mut core, 0, &[0x00400513]);
        core.step();
        core.reset();
        assert_eq!(0, core.pc());
        assert_eq!(0, core.registers().x(x(10)));
        assert_eq!(Ok(0x00400513), core.memory().read_word(0));
        assert_eq!(PrivilegeLevel::Machine, core.privilege_mode());
    }
}
