use crate::cs_registers::CsrSpecifier;
use crate::registers::Specifier;
use crate::Base;
use thiserror::Error;

/// Data structure that can hold any supported instruction in its decoded form.
///
/// Compressed instructions are never represented directly: they are first expanded into their
/// 32-bit equivalent (see [`crate::compressed::expand`]) and then decoded.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Instruction {
    OpImm {
        op: RegImmOp,
        dest: Specifier,
        src: Specifier,
        immediate: i32,
    },
    OpShiftImm {
        op: RegShiftImmOp,
        dest: Specifier,
        src: Specifier,
        shift_amount: u32,
    },
    /// `addiw`, RV64 only.
    OpImm32 {
        dest: Specifier,
        src: Specifier,
        immediate: i32,
    },
    /// `slliw`, `srliw`, `sraiw`, RV64 only.
    OpShiftImm32 {
        op: RegShiftImmOp,
        dest: Specifier,
        src: Specifier,
        shift_amount_u5: u32,
    },
    Auipc {
        dest: Specifier,
        immediate: i32,
    },
    Lui {
        dest: Specifier,
        immediate: i32,
    },
    Op {
        op: RegRegOp,
        dest: Specifier,
        src1: Specifier,
        src2: Specifier,
    },
    /// Word-sized register-register operations, RV64 only.
    Op32 {
        op: RegRegOp32,
        dest: Specifier,
        src1: Specifier,
        src2: Specifier,
    },
    Jal {
        dest: Specifier,
        offset: i32,
    },
    Jalr {
        dest: Specifier,
        base: Specifier,
        offset: i32,
    },
    Branch {
        condition: BranchCondition,
        src1: Specifier,
        src2: Specifier,
        offset: i32,
    },
    Load {
        width: LoadWidth,
        dest: Specifier,
        base: Specifier,
        offset: i32,
    },
    Store {
        width: StoreWidth,
        src: Specifier,
        base: Specifier,
        offset: i32,
    },
    Fence {
        predecessor: FenceOrderCombination,
        successor: FenceOrderCombination,
    },
    FenceI,
    Csr {
        op: CsrOp,
        dest: Specifier,
        source: CsrSource,
        csr: CsrSpecifier,
    },
    Ecall,
    Ebreak,
    Mret,
    Sret,
    Wfi,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RegImmOp {
    Addi,
    Slti,
    Sltiu,
    Xori,
    Ori,
    Andi,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RegShiftImmOp {
    Slli,
    Srli,
    Srai,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RegRegOp {
    Add,
    Slt,
    Sltu,
    And,
    Or,
    Xor,
    Sll,
    Srl,
    Sub,
    Sra,
    Mul,
    Mulh,
    Mulhsu,
    Mulhu,
    Div,
    Divu,
    Rem,
    Remu,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RegRegOp32 {
    Addw,
    Subw,
    Sllw,
    Srlw,
    Sraw,
    Mulw,
    Divw,
    Divuw,
    Remw,
    Remuw,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BranchCondition {
    Beq,
    Bne,
    Blt,
    Bltu,
    Bge,
    Bgeu,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LoadWidth {
    Lb,
    Lh,
    Lw,
    Ld,
    Lbu,
    Lhu,
    Lwu,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum StoreWidth {
    Sb,
    Sh,
    Sw,
    Sd,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CsrOp {
    /// Atomic read/write.
    Csrrw,
    /// Atomic read and set bits.
    Csrrs,
    /// Atomic read and clear bits.
    Csrrc,
}

/// Operand of a CSR instruction: either a register, or a 5-bit zero-extended immediate.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CsrSource {
    Register(Specifier),
    Immediate(u8),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FenceOrderCombination {
    pub device_input: bool,
    pub device_output: bool,
    pub memory_reads: bool,
    pub memory_writes: bool,
}

impl Instruction {
    /// Decodes a 32-bit instruction for a hart implementing the `base` integer ISA (plus the
    /// M and Zicsr extensions, and the privileged instructions).
    pub fn decode(raw_instruction: u32, base: Base) -> Result<Self, DecodeError> {
        let rv64 = base.is_rv64();
        match opcode(raw_instruction).ok_or(DecodeError::UnsupportedOpcode)? {
            Opcode::OpImm => match i_funct(raw_instruction) {
                Some(op) => Ok(Self::OpImm {
                    op,
                    dest: rd(raw_instruction),
                    src: rs1(raw_instruction),
                    immediate: i_imm(raw_instruction),
                }),
                None => match i_shfunct(raw_instruction, base) {
                    Some(op) => Ok(Self::OpShiftImm {
                        op,
                        dest: rd(raw_instruction),
                        src: rs1(raw_instruction),
                        shift_amount: shamt(raw_instruction, base),
                    }),
                    None => Err(DecodeError::IllegalInstruction),
                },
            },
            Opcode::OpImm32 if rv64 => match funct3(raw_instruction) {
                0b000 => Ok(Self::OpImm32 {
                    dest: rd(raw_instruction),
                    src: rs1(raw_instruction),
                    immediate: i_imm(raw_instruction),
                }),
                _ => match i_shfunct(raw_instruction, Base::Rv32I) {
                    Some(op) => Ok(Self::OpShiftImm32 {
                        op,
                        dest: rd(raw_instruction),
                        src: rs1(raw_instruction),
                        shift_amount_u5: shamt(raw_instruction, Base::Rv32I),
                    }),
                    None => Err(DecodeError::IllegalInstruction),
                },
            },
            Opcode::Auipc => Ok(Self::Auipc {
                dest: rd(raw_instruction),
                immediate: u_imm(raw_instruction),
            }),
            Opcode::Lui => Ok(Self::Lui {
                dest: rd(raw_instruction),
                immediate: u_imm(raw_instruction),
            }),
            Opcode::Op => match r_funct(raw_instruction) {
                Some(op) => Ok(Self::Op {
                    op,
                    dest: rd(raw_instruction),
                    src1: rs1(raw_instruction),
                    src2: rs2(raw_instruction),
                }),
                None => Err(DecodeError::IllegalInstruction),
            },
            Opcode::Op32 if rv64 => match r_funct32(raw_instruction) {
                Some(op) => Ok(Self::Op32 {
                    op,
                    dest: rd(raw_instruction),
                    src1: rs1(raw_instruction),
                    src2: rs2(raw_instruction),
                }),
                None => Err(DecodeError::IllegalInstruction),
            },
            Opcode::OpImm32 | Opcode::Op32 => Err(DecodeError::UnsupportedOpcode),
            Opcode::Jal => Ok(Self::Jal {
                dest: rd(raw_instruction),
                offset: j_imm(raw_instruction),
            }),
            Opcode::Jalr => match funct3(raw_instruction) {
                0b000 => Ok(Self::Jalr {
                    dest: rd(raw_instruction),
                    base: rs1(raw_instruction),
                    offset: i_imm(raw_instruction),
                }),
                _ => Err(DecodeError::IllegalInstruction),
            },
            Opcode::Branch => match b_funct(raw_instruction) {
                Some(condition) => Ok(Self::Branch {
                    condition,
                    src1: rs1(raw_instruction),
                    src2: rs2(raw_instruction),
                    offset: b_imm(raw_instruction),
                }),
                None => Err(DecodeError::IllegalInstruction),
            },
            Opcode::Load => match i_width(raw_instruction, base) {
                Some(width) => Ok(Self::Load {
                    width,
                    dest: rd(raw_instruction),
                    base: rs1(raw_instruction),
                    offset: i_imm(raw_instruction),
                }),
                None => Err(DecodeError::IllegalInstruction),
            },
            Opcode::Store => match s_width(raw_instruction, base) {
                Some(width) => Ok(Self::Store {
                    width,
                    src: rs2(raw_instruction),
                    base: rs1(raw_instruction),
                    offset: s_imm(raw_instruction),
                }),
                None => Err(DecodeError::IllegalInstruction),
            },
            Opcode::MiscMem => match i_mem(raw_instruction) {
                Some(MemFunct::Fence) => {
                    // Unused fields of FENCE (fm, rs1, rd) are reserved for future use and must be
                    // treated as a normal fence for forward compatibility. FENCE.TSO is not
                    // supported, and therefore also decoded as a normal fence.
                    let predecessor = FenceOrderCombination {
                        device_input: (raw_instruction >> 27) & 0b1 == 1,
                        device_output: (raw_instruction >> 26) & 0b1 == 1,
                        memory_reads: (raw_instruction >> 25) & 0b1 == 1,
                        memory_writes: (raw_instruction >> 24) & 0b1 == 1,
                    };
                    let successor = FenceOrderCombination {
                        device_input: (raw_instruction >> 23) & 0b1 == 1,
                        device_output: (raw_instruction >> 22) & 0b1 == 1,
                        memory_reads: (raw_instruction >> 21) & 0b1 == 1,
                        memory_writes: (raw_instruction >> 20) & 0b1 == 1,
                    };
                    Ok(Self::Fence {
                        predecessor,
                        successor,
                    })
                }
                Some(MemFunct::FenceI) => Ok(Self::FenceI),
                None => Err(DecodeError::IllegalInstruction),
            },
            Opcode::System => match i_sys(raw_instruction) {
                Some(sys) => Ok(match sys {
                    Sys::Ecall => Self::Ecall,
                    Sys::Ebreak => Self::Ebreak,
                    Sys::Mret => Self::Mret,
                    Sys::Sret => Self::Sret,
                    Sys::Wfi => Self::Wfi,
                    Sys::Csr(op, immediate) => Self::Csr {
                        op,
                        dest: rd(raw_instruction),
                        source: match immediate {
                            false => CsrSource::Register(rs1(raw_instruction)),
                            true => CsrSource::Immediate(u8::from(rs1(raw_instruction))),
                        },
                        csr: (raw_instruction >> 20) as CsrSpecifier,
                    },
                }),
                None => Err(DecodeError::IllegalInstruction),
            },
        }
    }

    /// Returns all `x` registers this instruction reads or writes.
    pub fn specifiers(&self) -> [Option<Specifier>; 3] {
        match *self {
            Self::OpImm { dest, src, .. }
            | Self::OpShiftImm { dest, src, .. }
            | Self::OpImm32 { dest, src, .. }
            | Self::OpShiftImm32 { dest, src, .. } => [Some(dest), Some(src), None],
            Self::Auipc { dest, .. } | Self::Lui { dest, .. } | Self::Jal { dest, .. } => {
                [Some(dest), None, None]
            }
            Self::Op {
                dest, src1, src2, ..
            }
            | Self::Op32 {
                dest, src1, src2, ..
            } => [Some(dest), Some(src1), Some(src2)],
            Self::Jalr { dest, base, .. } | Self::Load { dest, base, .. } => {
                [Some(dest), Some(base), None]
            }
            Self::Branch { src1, src2, .. } => [Some(src1), Some(src2), None],
            Self::Store { src, base, .. } => [Some(src), Some(base), None],
            Self::Csr { dest, source, .. } => match source {
                CsrSource::Register(src) => [Some(dest), Some(src), None],
                CsrSource::Immediate(_) => [Some(dest), None, None],
            },
            Self::Fence { .. }
            | Self::FenceI
            | Self::Ecall
            | Self::Ebreak
            | Self::Mret
            | Self::Sret
            | Self::Wfi => [None, None, None],
        }
    }
}

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum DecodeError {
    /// The major opcode is reserved, custom, or belongs to an extension that is not implemented.
    #[error("instruction has unsupported opcode")]
    UnsupportedOpcode,
    /// The major opcode is supported, but the remaining fields don't form a valid instruction.
    #[error("illegal instruction")]
    IllegalInstruction,
}

/// Returns the 7-bit *opcode* value of the instruction, or `None` if it isn't supported.
fn opcode(raw_instruction: u32) -> Option<Opcode> {
    #[allow(clippy::unusual_byte_groupings)]
    match raw_instruction & 0x7F {
        0b00_000_11 => Some(Opcode::Load),
        // LoadFp = 0b00_001_11,
        // custom-0
        0b00_011_11 => Some(Opcode::MiscMem),
        0b00_100_11 => Some(Opcode::OpImm),
        0b00_101_11 => Some(Opcode::Auipc),
        0b00_110_11 => Some(Opcode::OpImm32),
        // 48b
        0b01_000_11 => Some(Opcode::Store),
        // StoreFp = 0b01_001_11,
        // custom-1
        // Amo = 0b01_011_11,
        0b01_100_11 => Some(Opcode::Op),
        0b01_101_11 => Some(Opcode::Lui),
        0b01_110_11 => Some(Opcode::Op32),
        // 64b
        // Madd = 0b10_000_11,
        // Msub = 0b10_001_11,
        // Nmsub = 0b10_010_11,
        // Nmadd = 0b10_011_11,
        // OpFp = 0b10_100_11,
        // reserved
        // custom-2/rv128
        // 48b
        0b11_000_11 => Some(Opcode::Branch),
        0b11_001_11 => Some(Opcode::Jalr),
        // reserved
        0b11_011_11 => Some(Opcode::Jal),
        0b11_100_11 => Some(Opcode::System),
        // reserved
        // custom-3/rv128
        // >= 80b
        _ => None,
    }
}

/// Returns the 5-bit *rd* value for R-type, I-type, U-type, J-type instructions.
fn rd(raw_instruction: u32) -> Specifier {
    Specifier::from_u5(((raw_instruction >> 7) & 0x1F) as u8)
}

/// Returns the 5-bit *rs1* value for R-type, I-type, S-type, B-type instructions.
fn rs1(raw_instruction: u32) -> Specifier {
    Specifier::from_u5(((raw_instruction >> 15) & 0x1F) as u8)
}

/// Returns the 5-bit *rs2* value for R-type, S-type, B-type instructions.
fn rs2(raw_instruction: u32) -> Specifier {
    Specifier::from_u5(((raw_instruction >> 20) & 0x1F) as u8)
}

fn i_funct(raw_instruction: u32) -> Option<RegImmOp> {
    match funct3(raw_instruction) {
        0b000 => Some(RegImmOp::Addi),
        0b010 => Some(RegImmOp::Slti),
        0b011 => Some(RegImmOp::Sltiu),
        0b100 => Some(RegImmOp::Xori),
        0b110 => Some(RegImmOp::Ori),
        0b111 => Some(RegImmOp::Andi),
        _ => None,
    }
}

/// Decodes the immediate shift operations. On RV64 the shift amount is 6 bits wide, so only the
/// top 6 bits act as function code; on RV32 (and for the `*w` variants) it's the top 7 bits.
fn i_shfunct(raw_instruction: u32, base: Base) -> Option<RegShiftImmOp> {
    let (funct, arithmetic) = match base {
        Base::Rv32I => (raw_instruction >> 25, 0b0100000),
        Base::Rv64I => (raw_instruction >> 26, 0b010000),
    };
    match (funct, funct3(raw_instruction)) {
        (0, 0b001) => Some(RegShiftImmOp::Slli),
        (0, 0b101) => Some(RegShiftImmOp::Srli),
        (f, 0b101) if f == arithmetic => Some(RegShiftImmOp::Srai),
        _ => None,
    }
}

fn i_sys(raw_instruction: u32) -> Option<Sys> {
    match funct3(raw_instruction) {
        0b000 => match raw_instruction {
            0x0000_0073 => Some(Sys::Ecall),
            0x0010_0073 => Some(Sys::Ebreak),
            0x1020_0073 => Some(Sys::Sret),
            0x3020_0073 => Some(Sys::Mret),
            0x1050_0073 => Some(Sys::Wfi),
            _ => None,
        },
        0b001 => Some(Sys::Csr(CsrOp::Csrrw, false)),
        0b010 => Some(Sys::Csr(CsrOp::Csrrs, false)),
        0b011 => Some(Sys::Csr(CsrOp::Csrrc, false)),
        0b101 => Some(Sys::Csr(CsrOp::Csrrw, true)),
        0b110 => Some(Sys::Csr(CsrOp::Csrrs, true)),
        0b111 => Some(Sys::Csr(CsrOp::Csrrc, true)),
        _ => None,
    }
}

fn i_mem(raw_instruction: u32) -> Option<MemFunct> {
    match funct3(raw_instruction) {
        0b000 => Some(MemFunct::Fence),
        0b001 => Some(MemFunct::FenceI),
        _ => None,
    }
}

fn i_width(raw_instruction: u32, base: Base) -> Option<LoadWidth> {
    match (funct3(raw_instruction), base) {
        (0b000, _) => Some(LoadWidth::Lb),
        (0b001, _) => Some(LoadWidth::Lh),
        (0b010, _) => Some(LoadWidth::Lw),
        (0b011, Base::Rv64I) => Some(LoadWidth::Ld),
        (0b100, _) => Some(LoadWidth::Lbu),
        (0b101, _) => Some(LoadWidth::Lhu),
        (0b110, Base::Rv64I) => Some(LoadWidth::Lwu),
        _ => None,
    }
}

fn s_width(raw_instruction: u32, base: Base) -> Option<StoreWidth> {
    match (funct3(raw_instruction), base) {
        (0b000, _) => Some(StoreWidth::Sb),
        (0b001, _) => Some(StoreWidth::Sh),
        (0b010, _) => Some(StoreWidth::Sw),
        (0b011, Base::Rv64I) => Some(StoreWidth::Sd),
        _ => None,
    }
}

fn r_funct(raw_instruction: u32) -> Option<RegRegOp> {
    match (funct7(raw_instruction), funct3(raw_instruction)) {
        (0b0000000, 0b000) => Some(RegRegOp::Add),
        (0b0000000, 0b001) => Some(RegRegOp::Sll),
        (0b0000000, 0b010) => Some(RegRegOp::Slt),
        (0b0000000, 0b011) => Some(RegRegOp::Sltu),
        (0b0000000, 0b100) => Some(RegRegOp::Xor),
        (0b0000000, 0b101) => Some(RegRegOp::Srl),
        (0b0000000, 0b110) => Some(RegRegOp::Or),
        (0b0000000, 0b111) => Some(RegRegOp::And),
        (0b0100000, 0b000) => Some(RegRegOp::Sub),
        (0b0100000, 0b101) => Some(RegRegOp::Sra),
        (0b0000001, 0b000) => Some(RegRegOp::Mul),
        (0b0000001, 0b001) => Some(RegRegOp::Mulh),
        (0b0000001, 0b010) => Some(RegRegOp::Mulhsu),
        (0b0000001, 0b011) => Some(RegRegOp::Mulhu),
        (0b0000001, 0b100) => Some(RegRegOp::Div),
        (0b0000001, 0b101) => Some(RegRegOp::Divu),
        (0b0000001, 0b110) => Some(RegRegOp::Rem),
        (0b0000001, 0b111) => Some(RegRegOp::Remu),
        _ => None,
    }
}

fn r_funct32(raw_instruction: u32) -> Option<RegRegOp32> {
    match (funct7(raw_instruction), funct3(raw_instruction)) {
        (0b0000000, 0b000) => Some(RegRegOp32::Addw),
        (0b0100000, 0b000) => Some(RegRegOp32::Subw),
        (0b0000000, 0b001) => Some(RegRegOp32::Sllw),
        (0b0000000, 0b101) => Some(RegRegOp32::Srlw),
        (0b0100000, 0b101) => Some(RegRegOp32::Sraw),
        (0b0000001, 0b000) => Some(RegRegOp32::Mulw),
        (0b0000001, 0b100) => Some(RegRegOp32::Divw),
        (0b0000001, 0b101) => Some(RegRegOp32::Divuw),
        (0b0000001, 0b110) => Some(RegRegOp32::Remw),
        (0b0000001, 0b111) => Some(RegRegOp32::Remuw),
        _ => None,
    }
}

fn b_funct(raw_instruction: u32) -> Option<BranchCondition> {
    match funct3(raw_instruction) {
        0b000 => Some(BranchCondition::Beq),
        0b001 => Some(BranchCondition::Bne),
        0b100 => Some(BranchCondition::Blt),
        0b101 => Some(BranchCondition::Bge),
        0b110 => Some(BranchCondition::Bltu),
        0b111 => Some(BranchCondition::Bgeu),
        _ => None,
    }
}

/// Returns the 3-bit *funct3* value for R-type, I-type, S-type, B-type instructions.
fn funct3(raw_instruction: u32) -> u8 {
    ((raw_instruction >> 12) & 0b111) as u8
}

/// Returns the 7-bit *funct7* value for R-type instructions.
fn funct7(raw_instruction: u32) -> u8 {
    (raw_instruction >> 25) as u8
}

/// Returns the *shamt* value for immediate shift instructions: 5 bits on RV32, 6 bits on RV64.
fn shamt(raw_instruction: u32, base: Base) -> u32 {
    match base {
        Base::Rv32I => (raw_instruction >> 20) & 0x1F,
        Base::Rv64I => (raw_instruction >> 20) & 0x3F,
    }
}

/// Returns the 12-bit I-immediate sign-extended to 32 bits.
fn i_imm(raw_instruction: u32) -> i32 {
    raw_instruction as i32 >> 20
}

/// Returns the 12-bit S-immediate sign-extended to 32 bits.
fn s_imm(raw_instruction: u32) -> i32 {
    let imm_11_5 = raw_instruction & 0xFE00_0000;
    let imm_4_0 = raw_instruction & 0x0000_0F80;
    (imm_11_5 | (imm_4_0 << 13)) as i32 >> 20
}

/// Returns the 13-bit B-immediate sign-extended to 32 bits.
fn b_imm(raw_instruction: u32) -> i32 {
    let imm_12 = raw_instruction & 0x8000_0000;
    let imm_10_5 = raw_instruction & 0x7E00_0000;
    let imm_4_1 = raw_instruction & 0x0000_0F00;
    let imm_11 = raw_instruction & 0x0000_0080;
    (imm_12 | (imm_11 << 23) | (imm_10_5 >> 1) | (imm_4_1 << 12)) as i32 >> 19
}

/// Returns the signed 32-bit U-immediate.
fn u_imm(raw_instruction: u32) -> i32 {
    (raw_instruction & 0xFFFF_F000) as i32
}

/// Returns the 21-bit J-immediate sign-extended to 32 bits.
fn j_imm(raw_instruction: u32) -> i32 {
    let imm_20 = raw_instruction & 0x8000_0000;
    let imm_10_1 = raw_instruction & 0x7FE0_0000;
    let imm_11 = raw_instruction & 0x0010_0000;
    let imm_19_12 = raw_instruction & 0x000F_F000;
    (imm_20 | (imm_19_12 << 11) | (imm_11 << 2) | (imm_10_1 >> 9)) as i32 >> 11
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Opcode {
    OpImm,
    OpImm32,
    Auipc,
    Lui,
    Op,
    Op32,
    Jal,
    Jalr,
    Branch,
    Load,
    Store,
    MiscMem,
    System,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Sys {
    Ecall,
    Ebreak,
    Mret,
    Sret,
    Wfi,
    /// CSR operation, and whether the source operand is an immediate.
    Csr(CsrOp, bool),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum MemFunct {
    Fence,
    FenceI,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x(index: u8) -> Specifier {
        Specifier::from_u5(index)
    }

    #[test]
    fn test_i_imm() {
        assert_eq!(0, i_imm(0x0000_0000));
        assert_eq!(-1, i_imm(0xFFF0_0000));
        assert_eq!(2047, i_imm(2047 << 20));
        assert_eq!(-2048, i_imm(0x8000_0000));
        assert_eq!(-42, i_imm((-42_i32 << 20) as u32));
        // Check other bits are ignored
        assert_eq!(0, i_imm(0x000F_FFFF));
        assert_eq!(-1, i_imm(0xFFF1_2345));
        assert_eq!(1209, i_imm((1209 << 20) | 0x000C_D10A));
    }

    #[test]
    fn test_s_imm() {
        // sw x2, -4(x8)
        assert_eq!(-4, s_imm(0xFE24_2E23));
        // sw x5, 8(x10)
        assert_eq!(8, s_imm(0x0055_2423));
    }

    #[test]
    fn test_b_and_j_imm() {
        // beq x0, x0, -8
        assert_eq!(-8, b_imm(0xFE00_0CE3));
        // bne x1, x2, 16
        assert_eq!(16, b_imm(0x0020_9863));
        // jal x1, 2048
        assert_eq!(2048, j_imm(0x0010_00EF));
        // jal x0, -4
        assert_eq!(-4, j_imm(0xFFDF_F06F));
    }

    #[test]
    fn test_decode_addi() {
        // addi x10, x0, 4
        assert_eq!(
            Ok(Instruction::OpImm {
                op: RegImmOp::Addi,
                dest: x(10),
                src: x(0),
                immediate: 4,
            }),
            Instruction::decode(0x0040_0513, Base::Rv32I)
        );
    }

    #[test]
    fn test_decode_shifts() {
        // srai x5, x6, 3
        assert_eq!(
            Ok(Instruction::OpShiftImm {
                op: RegShiftImmOp::Srai,
                dest: x(5),
                src: x(6),
                shift_amount: 3,
            }),
            Instruction::decode(0x4033_5293, Base::Rv32I)
        );
        // slli x5, x6, 33 is only valid on RV64
        let raw = 0x0213_1293;
        assert_eq!(
            Err(DecodeError::IllegalInstruction),
            Instruction::decode(raw, Base::Rv32I)
        );
        assert_eq!(
            Ok(Instruction::OpShiftImm {
                op: RegShiftImmOp::Slli,
                dest: x(5),
                src: x(6),
                shift_amount: 33,
            }),
            Instruction::decode(raw, Base::Rv64I)
        );
    }

    #[test]
    fn test_decode_rv64_only() {
        // ld x5, 8(x10)
        let ld = 0x0085_3283;
        assert_eq!(
            Err(DecodeError::IllegalInstruction),
            Instruction::decode(ld, Base::Rv32I)
        );
        assert_eq!(
            Ok(Instruction::Load {
                width: LoadWidth::Ld,
                dest: x(5),
                base: x(10),
                offset: 8,
            }),
            Instruction::decode(ld, Base::Rv64I)
        );
        // addw x5, x6, x7
        let addw = 0x0073_02BB;
        assert_eq!(
            Err(DecodeError::UnsupportedOpcode),
            Instruction::decode(addw, Base::Rv32I)
        );
        assert_eq!(
            Ok(Instruction::Op32 {
                op: RegRegOp32::Addw,
                dest: x(5),
                src1: x(6),
                src2: x(7),
            }),
            Instruction::decode(addw, Base::Rv64I)
        );
    }

    #[test]
    fn test_decode_muldiv() {
        // mul x5, x6, x7
        assert_eq!(
            Ok(Instruction::Op {
                op: RegRegOp::Mul,
                dest: x(5),
                src1: x(6),
                src2: x(7),
            }),
            Instruction::decode(0x0273_02B3, Base::Rv32I)
        );
        // remu x5, x6, x7
        assert_eq!(
            Ok(Instruction::Op {
                op: RegRegOp::Remu,
                dest: x(5),
                src1: x(6),
                src2: x(7),
            }),
            Instruction::decode(0x0273_72B3, Base::Rv32I)
        );
    }

    #[test]
    fn test_decode_system() {
        assert_eq!(Ok(Instruction::Ecall), Instruction::decode(0x0000_0073, Base::Rv32I));
        assert_eq!(Ok(Instruction::Ebreak), Instruction::decode(0x0010_0073, Base::Rv32I));
        assert_eq!(Ok(Instruction::Mret), Instruction::decode(0x3020_0073, Base::Rv64I));
        assert_eq!(Ok(Instruction::Sret), Instruction::decode(0x1020_0073, Base::Rv64I));
        assert_eq!(Ok(Instruction::Wfi), Instruction::decode(0x1050_0073, Base::Rv32I));
        // csrrs x10, mhartid, x0 (csrr a0, mhartid)
        assert_eq!(
            Ok(Instruction::Csr {
                op: CsrOp::Csrrs,
                dest: x(10),
                source: CsrSource::Register(x(0)),
                csr: 0xF14,
            }),
            Instruction::decode(0xF140_2573, Base::Rv32I)
        );
        // csrrwi x0, mstatus, 8
        assert_eq!(
            Ok(Instruction::Csr {
                op: CsrOp::Csrrw,
                dest: x(0),
                source: CsrSource::Immediate(8),
                csr: 0x300,
            }),
            Instruction::decode(0x3004_5073, Base::Rv32I)
        );
        // funct3 == 0b100 is reserved
        assert_eq!(
            Err(DecodeError::IllegalInstruction),
            Instruction::decode(0x0000_4073, Base::Rv32I)
        );
    }

    #[test]
    fn test_decode_unsupported() {
        assert_eq!(
            Err(DecodeError::UnsupportedOpcode),
            Instruction::decode(0x0000_0000, Base::Rv32I)
        );
        assert_eq!(
            Err(DecodeError::UnsupportedOpcode),
            Instruction::decode(0xFFFF_FFFF, Base::Rv64I)
        );
    }

    #[test]
    fn test_specifiers() {
        let instruction = Instruction::decode(0x0273_02B3, Base::Rv32I).unwrap();
        assert_eq!([Some(x(5)), Some(x(6)), Some(x(7))], instruction.specifiers());
        assert_eq!([None, None, None], Instruction::Ecall.specifiers());
    }
}
