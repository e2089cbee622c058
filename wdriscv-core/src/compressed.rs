//! Expansion of compressed (RVC) instructions into their 32-bit equivalents.
//!
//! > Each RVC instruction expands into a single 32-bit instruction in either the base ISA
//! > (RV32I/E or RV64I/E) or the F and D standard extensions.
//!
//! Since floating point isn't supported, the floating point forms are treated as invalid, the same
//! as the reserved encodings.

use crate::registers::Specifier;
use crate::Base;

const OP_LOAD: u32 = 0b00_000_11;
const OP_IMM: u32 = 0b00_100_11;
const OP_IMM_32: u32 = 0b00_110_11;
const OP_STORE: u32 = 0b01_000_11;
const OP: u32 = 0b01_100_11;
const OP_LUI: u32 = 0b01_101_11;
const OP_32: u32 = 0b01_110_11;
const OP_BRANCH: u32 = 0b11_000_11;
const OP_JALR: u32 = 0b11_001_11;
const OP_JAL: u32 = 0b11_011_11;

const EBREAK: u32 = 0x0010_0073;

/// Returns `true` if the 16-bit parcel is the start of a compressed instruction.
pub fn is_compressed(parcel: u16) -> bool {
    parcel & 0b11 != 0b11
}

/// Expands the compressed instruction `code` into the equivalent 32-bit instruction, for a hart
/// implementing the `base` integer ISA.
///
/// Returns `None` if `code` isn't a valid compressed instruction. This includes the all-zero
/// parcel, which is defined to be illegal, and 32-bit parcels (low bits `0b11`).
pub fn expand(code: u16, base: Base) -> Option<u32> {
    let rv64 = base.is_rv64();
    let funct3 = field(code, 13, 3);
    // Full 5-bit register fields
    let rd = field(code, 7, 5);
    let rs2 = field(code, 2, 5);
    // Compressed 3-bit register fields, mapping to x8 up to x15
    let rd_c = compressed_register(field(code, 2, 3));
    let rs1_c = compressed_register(field(code, 7, 3));
    let rs2_c = rd_c;
    let sp = u32::from(Specifier::SP);
    let ra = u32::from(Specifier::RA);

    match code & 0b11 {
        0b00 => match funct3 {
            // c.addi4spn
            0b000 => {
                let imm = field(code, 6, 1) << 2
                    | field(code, 5, 1) << 3
                    | field(code, 11, 2) << 4
                    | field(code, 7, 4) << 6;
                (imm != 0).then(|| i_type(imm as i32, sp, 0b000, rd_c, OP_IMM))
            }
            // c.lw
            0b010 => Some(i_type(cl_word_offset(code), rs1_c, 0b010, rd_c, OP_LOAD)),
            // c.ld
            0b011 if rv64 => Some(i_type(cl_double_offset(code), rs1_c, 0b011, rd_c, OP_LOAD)),
            // c.sw
            0b110 => Some(s_type(cl_word_offset(code), rs2_c, rs1_c, 0b010)),
            // c.sd
            0b111 if rv64 => Some(s_type(cl_double_offset(code), rs2_c, rs1_c, 0b011)),
            // c.fld, c.flw, c.fsd, c.fsw, and the reserved funct3 0b100
            _ => None,
        },
        0b01 => match funct3 {
            // c.addi, c.nop
            0b000 => Some(i_type(ci_imm(code), rd, 0b000, rd, OP_IMM)),
            // c.addiw
            0b001 if rv64 => (rd != 0).then(|| i_type(ci_imm(code), rd, 0b000, rd, OP_IMM_32)),
            // c.jal
            0b001 => Some(j_type(cj_offset(code), ra)),
            // c.li
            0b010 => Some(i_type(ci_imm(code), 0, 0b000, rd, OP_IMM)),
            // c.addi16sp
            0b011 if rd == sp => {
                let imm = field(code, 6, 1) << 4
                    | field(code, 2, 1) << 5
                    | field(code, 5, 1) << 6
                    | field(code, 3, 2) << 7
                    | field(code, 12, 1) << 9;
                (imm != 0).then(|| i_type(sign_extend(imm, 10), sp, 0b000, sp, OP_IMM))
            }
            // c.lui
            0b011 => {
                let imm = field(code, 2, 5) << 12 | field(code, 12, 1) << 17;
                (imm != 0).then(|| u_type(sign_extend(imm, 18), rd, OP_LUI))
            }
            0b100 => match field(code, 10, 2) {
                // c.srli, c.srai
                op @ (0b00 | 0b01) => {
                    let shamt = field(code, 2, 5) | field(code, 12, 1) << 5;
                    if !rv64 && shamt >= 32 {
                        return None;
                    }
                    let funct = if op == 0b01 { 0b0100000 << 5 } else { 0 };
                    Some(i_type((funct | shamt) as i32, rs1_c, 0b101, rs1_c, OP_IMM))
                }
                // c.andi
                0b10 => Some(i_type(ci_imm(code), rs1_c, 0b111, rs1_c, OP_IMM)),
                _ => match (field(code, 12, 1), field(code, 5, 2)) {
                    // c.sub
                    (0, 0b00) => Some(r_type(0b0100000, rs2_c, rs1_c, 0b000, rs1_c, OP)),
                    // c.xor
                    (0, 0b01) => Some(r_type(0, rs2_c, rs1_c, 0b100, rs1_c, OP)),
                    // c.or
                    (0, 0b10) => Some(r_type(0, rs2_c, rs1_c, 0b110, rs1_c, OP)),
                    // c.and
                    (0, 0b11) => Some(r_type(0, rs2_c, rs1_c, 0b111, rs1_c, OP)),
                    // c.subw
                    (1, 0b00) if rv64 => {
                        Some(r_type(0b0100000, rs2_c, rs1_c, 0b000, rs1_c, OP_32))
                    }
                    // c.addw
                    (1, 0b01) if rv64 => Some(r_type(0, rs2_c, rs1_c, 0b000, rs1_c, OP_32)),
                    _ => None,
                },
            },
            // c.j
            0b101 => Some(j_type(cj_offset(code), 0)),
            // c.beqz
            0b110 => Some(b_type(cb_offset(code), 0, rs1_c, 0b000)),
            // c.bnez
            _ => Some(b_type(cb_offset(code), 0, rs1_c, 0b001)),
        },
        0b10 => match funct3 {
            // c.slli
            0b000 => {
                let shamt = field(code, 2, 5) | field(code, 12, 1) << 5;
                if !rv64 && shamt >= 32 {
                    return None;
                }
                Some(i_type(shamt as i32, rd, 0b001, rd, OP_IMM))
            }
            // c.lwsp
            0b010 => {
                let imm = field(code, 4, 3) << 2 | field(code, 12, 1) << 5 | field(code, 2, 2) << 6;
                (rd != 0).then(|| i_type(imm as i32, sp, 0b010, rd, OP_LOAD))
            }
            // c.ldsp
            0b011 if rv64 => {
                let imm = field(code, 5, 2) << 3 | field(code, 12, 1) << 5 | field(code, 2, 3) << 6;
                (rd != 0).then(|| i_type(imm as i32, sp, 0b011, rd, OP_LOAD))
            }
            0b100 => match (field(code, 12, 1), rd, rs2) {
                // reserved
                (0, 0, 0) => None,
                // c.jr
                (0, rs1, 0) => Some(i_type(0, rs1, 0b000, 0, OP_JALR)),
                // c.mv
                (0, rd, rs2) => Some(r_type(0, rs2, 0, 0b000, rd, OP)),
                // c.ebreak
                (_, 0, 0) => Some(EBREAK),
                // c.jalr
                (_, rs1, 0) => Some(i_type(0, rs1, 0b000, ra, OP_JALR)),
                // c.add
                (_, rd, rs2) => Some(r_type(0, rs2, rd, 0b000, rd, OP)),
            },
            // c.swsp
            0b110 => {
                let imm = field(code, 9, 4) << 2 | field(code, 7, 2) << 6;
                Some(s_type(imm as i32, rs2, sp, 0b010))
            }
            // c.sdsp
            0b111 if rv64 => {
                let imm = field(code, 10, 3) << 3 | field(code, 7, 3) << 6;
                Some(s_type(imm as i32, rs2, sp, 0b011))
            }
            // c.fldsp, c.flwsp, c.fsdsp, c.fswsp
            _ => None,
        },
        _ => None,
    }
}

/// Returns `len` bits of `code` starting at bit `lo`.
fn field(code: u16, lo: u32, len: u32) -> u32 {
    ((code as u32) >> lo) & ((1 << len) - 1)
}

/// Register number of a 3-bit compressed register field.
fn compressed_register(field_u3: u32) -> u32 {
    u32::from(Specifier::from_u3_compressed(field_u3 as u8))
}

/// Sign-extends the lowest `bits` bits of `value`.
fn sign_extend(value: u32, bits: u32) -> i32 {
    ((value << (32 - bits)) as i32) >> (32 - bits)
}

/// 6-bit signed immediate of CI-format instructions.
fn ci_imm(code: u16) -> i32 {
    sign_extend(field(code, 2, 5) | field(code, 12, 1) << 5, 6)
}

/// Word offset of `c.lw` and `c.sw`.
fn cl_word_offset(code: u16) -> i32 {
    (field(code, 6, 1) << 2 | field(code, 10, 3) << 3 | field(code, 5, 1) << 6) as i32
}

/// Doubleword offset of `c.ld` and `c.sd`.
fn cl_double_offset(code: u16) -> i32 {
    (field(code, 10, 3) << 3 | field(code, 5, 2) << 6) as i32
}

/// 12-bit signed jump offset of `c.j` and `c.jal`.
fn cj_offset(code: u16) -> i32 {
    let offset = field(code, 3, 3) << 1
        | field(code, 11, 1) << 4
        | field(code, 2, 1) << 5
        | field(code, 7, 1) << 6
        | field(code, 6, 1) << 7
        | field(code, 9, 2) << 8
        | field(code, 8, 1) << 10
        | field(code, 12, 1) << 11;
    sign_extend(offset, 12)
}

/// 9-bit signed branch offset of `c.beqz` and `c.bnez`.
fn cb_offset(code: u16) -> i32 {
    let offset = field(code, 3, 2) << 1
        | field(code, 10, 2) << 3
        | field(code, 2, 1) << 5
        | field(code, 5, 2) << 6
        | field(code, 12, 1) << 8;
    sign_extend(offset, 9)
}

fn r_type(funct7: u32, rs2: u32, rs1: u32, funct3: u32, rd: u32, opcode: u32) -> u32 {
    funct7 << 25 | rs2 << 20 | rs1 << 15 | funct3 << 12 | rd << 7 | opcode
}

fn i_type(imm: i32, rs1: u32, funct3: u32, rd: u32, opcode: u32) -> u32 {
    (imm as u32 & 0xFFF) << 20 | rs1 << 15 | funct3 << 12 | rd << 7 | opcode
}

fn s_type(imm: i32, rs2: u32, rs1: u32, funct3: u32) -> u32 {
    let imm = imm as u32;
    (imm >> 5 & 0x7F) << 25 | rs2 << 20 | rs1 << 15 | funct3 << 12 | (imm & 0x1F) << 7 | OP_STORE
}

fn b_type(imm: i32, rs2: u32, rs1: u32, funct3: u32) -> u32 {
    let imm = imm as u32;
    (imm >> 12 & 0x1) << 31
        | (imm >> 5 & 0x3F) << 25
        | rs2 << 20
        | rs1 << 15
        | funct3 << 12
        | (imm >> 1 & 0xF) << 8
        | (imm >> 11 & 0x1) << 7
        | OP_BRANCH
}

fn u_type(imm: i32, rd: u32, opcode: u32) -> u32 {
    imm as u32 & 0xFFFF_F000 | rd << 7 | opcode
}

fn j_type(imm: i32, rd: u32) -> u32 {
    let imm = imm as u32;
    (imm >> 20 & 0x1) << 31
        | (imm >> 1 & 0x3FF) << 21
        | (imm >> 11 & 0x1) << 20
        | (imm >> 12 & 0xFF) << 12
        | rd << 7
        | OP_JAL
}
