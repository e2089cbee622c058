//! Renders instructions as assembly text.
//!
//! The text is produced from the decoded [`Instruction`], so it always agrees with what the core
//! executes. Compressed instructions are shown as their 32-bit expansion.

use crate::compressed;
use crate::cs_registers::{specifier, CsrSpecifier};
use crate::instruction::{
    BranchCondition, CsrOp, CsrSource, FenceOrderCombination, Instruction, LoadWidth, RegImmOp,
    RegRegOp, RegRegOp32, RegShiftImmOp, StoreWidth,
};
use crate::Base;
use std::fmt;

/// Disassembles a raw instruction, which may be a compressed instruction in its low 16 bits.
///
/// Encodings that don't decode are rendered as `unknown` followed by the raw bits.
pub fn disassemble(raw_instruction: u32, base: Base) -> String {
    let expanded = match compressed::is_compressed(raw_instruction as u16) {
        true => compressed::expand(raw_instruction as u16, base),
        false => Some(raw_instruction),
    };
    match expanded.map(|raw| Instruction::decode(raw, base)) {
        Some(Ok(instruction)) => instruction.to_string(),
        _ if compressed::is_compressed(raw_instruction as u16) => {
            format!("unknown {:#06x}", raw_instruction as u16)
        }
        _ => format!("unknown {raw_instruction:#010x}"),
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Instruction::OpImm {
                op,
                dest,
                src,
                immediate,
            } => write!(f, "{} {dest}, {src}, {immediate}", op.mnemonic()),
            Instruction::OpShiftImm {
                op,
                dest,
                src,
                shift_amount,
            } => write!(f, "{} {dest}, {src}, {shift_amount}", op.mnemonic()),
            Instruction::OpImm32 {
                dest,
                src,
                immediate,
            } => write!(f, "addiw {dest}, {src}, {immediate}"),
            Instruction::OpShiftImm32 {
                op,
                dest,
                src,
                shift_amount_u5,
            } => write!(f, "{}w {dest}, {src}, {shift_amount_u5}", op.mnemonic()),
            Instruction::Auipc { dest, immediate } => {
                write!(f, "auipc {dest}, {:#x}", (immediate as u32) >> 12)
            }
            Instruction::Lui { dest, immediate } => {
                write!(f, "lui {dest}, {:#x}", (immediate as u32) >> 12)
            }
            Instruction::Op {
                op,
                dest,
                src1,
                src2,
            } => write!(f, "{} {dest}, {src1}, {src2}", op.mnemonic()),
            Instruction::Op32 {
                op,
                dest,
                src1,
                src2,
            } => write!(f, "{} {dest}, {src1}, {src2}", op.mnemonic()),
            Instruction::Jal { dest, offset } => write!(f, "jal {dest}, {offset}"),
            Instruction::Jalr { dest, base, offset } => write!(f, "jalr {dest}, {offset}({base})"),
            Instruction::Branch {
                condition,
                src1,
                src2,
                offset,
            } => write!(f, "{} {src1}, {src2}, {offset}", condition.mnemonic()),
            Instruction::Load {
                width,
                dest,
                base,
                offset,
            } => write!(f, "{} {dest}, {offset}({base})", width.mnemonic()),
            Instruction::Store {
                width,
                src,
                base,
                offset,
            } => write!(f, "{} {src}, {offset}({base})", width.mnemonic()),
            Instruction::Fence {
                predecessor,
                successor,
            } => write!(f, "fence {predecessor}, {successor}"),
            Instruction::FenceI => f.write_str("fence.i"),
            Instruction::Csr {
                op,
                dest,
                source,
                csr,
            } => {
                let csr = CsrName(csr);
                match source {
                    CsrSource::Register(src) => {
                        write!(f, "{} {dest}, {csr}, {src}", op.mnemonic())
                    }
                    CsrSource::Immediate(uimm) => {
                        write!(f, "{}i {dest}, {csr}, {uimm}", op.mnemonic())
                    }
                }
            }
            Instruction::Ecall => f.write_str("ecall"),
            Instruction::Ebreak => f.write_str("ebreak"),
            Instruction::Mret => f.write_str("mret"),
            Instruction::Sret => f.write_str("sret"),
            Instruction::Wfi => f.write_str("wfi"),
        }
    }
}

impl fmt::Display for FenceOrderCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags = [
            (self.device_input, 'i'),
            (self.device_output, 'o'),
            (self.memory_reads, 'r'),
            (self.memory_writes, 'w'),
        ];
        if flags.iter().all(|&(set, _)| !set) {
            return f.write_str("0");
        }
        for (_, flag) in flags.into_iter().filter(|&(set, _)| set) {
            write!(f, "{flag}")?;
        }
        Ok(())
    }
}

/// A CSR, displayed by name when it is known.
struct CsrName(CsrSpecifier);

impl fmt::Display for CsrName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match specifier::name(self.0) {
            Some(name) => f.write_str(name),
            None => write!(f, "{:#05x}", self.0),
        }
    }
}

impl RegImmOp {
    fn mnemonic(self) -> &'static str {
        match self {
            RegImmOp::Addi => "addi",
            RegImmOp::Slti => "slti",
            RegImmOp::Sltiu => "sltiu",
            RegImmOp::Xori => "xori",
            RegImmOp::Ori => "ori",
            RegImmOp::Andi => "andi",
        }
    }
}

impl RegShiftImmOp {
    fn mnemonic(self) -> &'static str {
        match self {
            RegShiftImmOp::Slli => "slli",
            RegShiftImmOp::Srli => "srli",
            RegShiftImmOp::Srai => "srai",
        }
    }
}

impl RegRegOp {
    fn mnemonic(self) -> &'static str {
        match self {
            RegRegOp::Add => "add",
            RegRegOp::Slt => "slt",
            RegRegOp::Sltu => "sltu",
            RegRegOp::And => "and",
            RegRegOp::Or => "or",
            RegRegOp::Xor => "xor",
            RegRegOp::Sll => "sll",
            RegRegOp::Srl => "srl",
            RegRegOp::Sub => "sub",
            RegRegOp::Sra => "sra",
            RegRegOp::Mul => "mul",
            RegRegOp::Mulh => "mulh",
            RegRegOp::Mulhsu => "mulhsu",
            RegRegOp::Mulhu => "mulhu",
            RegRegOp::Div => "div",
            RegRegOp::Divu => "divu",
            RegRegOp::Rem => "rem",
            RegRegOp::Remu => "remu",
        }
    }
}

impl RegRegOp32 {
    fn mnemonic(self) -> &'static str {
        match self {
            RegRegOp32::Addw => "addw",
            RegRegOp32::Subw => "subw",
            RegRegOp32::Sllw => "sllw",
            RegRegOp32::Srlw => "srlw",
            RegRegOp32::Sraw => "sraw",
            RegRegOp32::Mulw => "mulw",
            RegRegOp32::Divw => "divw",
            RegRegOp32::Divuw => "divuw",
            RegRegOp32::Remw => "remw",
            RegRegOp32::Remuw => "remuw",
        }
    }
}

impl BranchCondition {
    fn mnemonic(self) -> &'static str {
        match self {
            BranchCondition::Beq => "beq",
            BranchCondition::Bne => "bne",
            BranchCondition::Blt => "blt",
            BranchCondition::Bltu => "bltu",
            BranchCondition::Bge => "bge",
            BranchCondition::Bgeu => "bgeu",
        }
    }
}

impl LoadWidth {
    fn mnemonic(self) -> &'static str {
        match self {
            LoadWidth::Lb => "lb",
            LoadWidth::Lh => "lh",
            LoadWidth::Lw => "lw",
            LoadWidth::Ld => "ld",
            LoadWidth::Lbu => "lbu",
            LoadWidth::Lhu => "lhu",
            LoadWidth::Lwu => "lwu",
        }
    }
}

impl StoreWidth {
    fn mnemonic(self) -> &'static str {
        match self {
            StoreWidth::Sb => "sb",
            StoreWidth::Sh => "sh",
            StoreWidth::Sw => "sw",
            StoreWidth::Sd => "sd",
        }
    }
}

impl CsrOp {
    fn mnemonic(self) -> &'static str {
        match self {
            CsrOp::Csrrw => "csrrw",
            CsrOp::Csrrs => "csrrs",
            CsrOp::Csrrc => "csrrc",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disassemble() {
        let cases = [
            (0x00400513, "addi x10, x0, 4"),
            (0x40335293, "srai x5, x6, 3"),
            (0x00853283, "ld x5, 8(x10)"),
            (0x00502123, "sw x5, 2(x0)"),
            (0x00000163, "beq x0, x0, 2"),
            (0x800000B7, "lui x1, 0x80000"),
            (0x027372B3, "remu x5, x6, x7"),
            (0xF1402573, "csrrs x10, mhartid, x0"),
            (0x30045073, "csrrwi x0, mstatus, 8"),
            (0x0FF0000F, "fence iorw, iorw"),
            (0x30200073, "mret"),
        ];
        for (raw, text) in cases {
            assert_eq!(text, disassemble(raw, Base::Rv64I));
        }
    }

    #[test]
    fn test_disassemble_compressed() {
        assert_eq!("addi x10, x0, 4", disassemble(0x4511, Base::Rv32I));
        assert_eq!("jalr x0, 0(x1)", disassemble(0x8082, Base::Rv64I));
        assert_eq!("unknown 0x0000", disassemble(0x0000, Base::Rv64I));
    }

    #[test]
    fn test_disassemble_width_dependent() {
        assert_eq!("addw x5, x6, x7", disassemble(0x007302BB, Base::Rv64I));
        assert_eq!("unknown 0x007302bb", disassemble(0x007302BB, Base::Rv32I));
    }
}
