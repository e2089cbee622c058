use super::{Core, Exception, ExecutionResult, Fault};
use crate::cs_registers::{CsrSpecifier, TrapMode};
use crate::instruction::{CsrOp, CsrSource, FenceOrderCombination};
use crate::memory::MemoryError;
use crate::registers::Specifier;
use crate::{Alignment, PrivilegeLevel, Xlen};

/// Executes the semantics of a single decoded instruction on a core.
///
/// When an executor method is called, `pc` already points to the next sequential instruction and
/// `curr_pc` to the instruction being executed. A method either completes the instruction and
/// returns `Ok`, or returns the fault to trap with, without having modified any state.
#[derive(Debug)]
pub(super) struct Executor<'c, X: Xlen> {
    pub core: &'c mut Core<X>,
    /// The instruction as fetched (before expansion, if compressed), used as trap value for
    /// illegal instruction exceptions.
    pub raw_instruction: u32,
}

impl<'c, X: Xlen> Executor<'c, X> {
    /// Executes an `addi` instruction.
    ///
    /// Corresponds to the assembly instruction `addi dest src immediate`.
    ///
    /// > ADDI adds the sign-extended 12-bit immediate to register rs1. Arithmetic overflow is
    /// > ignored and the result is simply the low XLEN bits of the result. ADDI rd, rs1, 0 is used
    /// > to implement the MV rd, rs1 assembler pseudoinstruction.
    pub fn addi(&mut self, dest: Specifier, src: Specifier, immediate: i32) -> ExecutionResult<X> {
        self.reg_imm_op(dest, src, immediate, |s, imm| s.wrapping_add_signed(imm as i64))
    }

    /// Executes a `slti` instruction.
    ///
    /// Corresponds to the assembly instruction `slti dest src immediate`.
    ///
    /// > SLTI (set less than immediate) places the value 1 in register rd if register rs1 is less
    /// > than the sign-extended immediate when both are treated as signed numbers, else 0 is
    /// > written to rd.
    pub fn slti(&mut self, dest: Specifier, src: Specifier, immediate: i32) -> ExecutionResult<X> {
        self.reg_imm_op(dest, src, immediate, |s, imm| {
            bool_to_x(s.to_i64() < imm as i64)
        })
    }

    /// Executes a `sltiu` instruction.
    ///
    /// Corresponds to the assembly instruction `sltiu dest src immediate`.
    ///
    /// > SLTIU is similar but compares the values as unsigned numbers (i.e., the immediate is first
    /// > sign-extended to XLEN bits then treated as an unsigned number). Note, SLTIU rd, rs1, 1
    /// > sets rd to 1 if rs1 equals zero, otherwise sets rd to 0 (assembler pseudoinstruction
    /// > SEQZ rd, rs).
    pub fn sltiu(&mut self, dest: Specifier, src: Specifier, immediate: i32) -> ExecutionResult<X> {
        self.reg_imm_op(dest, src, immediate, |s, imm| {
            bool_to_x(s < X::from_i64(imm as i64))
        })
    }

    /// Executes an `andi` instruction.
    ///
    /// Corresponds to the assembly instruction `andi dest src immediate`.
    ///
    /// > ANDI, ORI, XORI are logical operations that perform bitwise AND, OR, and XOR on register
    /// > rs1 and the sign-extended 12-bit immediate and place the result in rd.
    pub fn andi(&mut self, dest: Specifier, src: Specifier, immediate: i32) -> ExecutionResult<X> {
        self.reg_imm_op(dest, src, immediate, |s, imm| s.and(X::from_i64(imm as i64)))
    }

    /// Executes an `ori` instruction.
    ///
    /// Corresponds to the assembly instruction `ori dest src immediate`.
    pub fn ori(&mut self, dest: Specifier, src: Specifier, immediate: i32) -> ExecutionResult<X> {
        self.reg_imm_op(dest, src, immediate, |s, imm| s.or(X::from_i64(imm as i64)))
    }

    /// Executes a `xori` instruction.
    ///
    /// Corresponds to the assembly instruction `xori dest src immediate`.
    ///
    /// > Note, XORI rd, rs1, -1 performs a bitwise logical inversion of register rs1 (assembler
    /// > pseudoinstruction NOT rd, rs).
    pub fn xori(&mut self, dest: Specifier, src: Specifier, immediate: i32) -> ExecutionResult<X> {
        self.reg_imm_op(dest, src, immediate, |s, imm| s.xor(X::from_i64(imm as i64)))
    }

    /// Executes a `slli` instruction.
    ///
    /// Corresponds to the assembly instruction `slli dest src shift_amount`.
    ///
    /// > SLLI is a logical left shift (zeros are shifted into the lower bits).
    ///
    /// The shift amount is masked to the register width, the decoder already rejects larger
    /// values.
    pub fn slli(&mut self, dest: Specifier, src: Specifier, shift_amount: u32) -> ExecutionResult<X> {
        self.reg_shamt_op(dest, src, shift_amount, |s, shamt| {
            X::from_u64(s.to_u64() << shamt)
        })
    }

    /// Executes a `srli` instruction.
    ///
    /// Corresponds to the assembly instruction `srli dest src shift_amount`.
    ///
    /// > SRLI is a logical right shift (zeros are shifted into the upper bits).
    pub fn srli(&mut self, dest: Specifier, src: Specifier, shift_amount: u32) -> ExecutionResult<X> {
        self.reg_shamt_op(dest, src, shift_amount, |s, shamt| {
            X::from_u64(s.to_u64() >> shamt)
        })
    }

    /// Executes a `srai` instruction.
    ///
    /// Corresponds to the assembly instruction `srai dest src shift_amount`.
    ///
    /// > SRAI is an arithmetic right shift (the original sign bit is copied into the vacated upper
    /// > bits).
    pub fn srai(&mut self, dest: Specifier, src: Specifier, shift_amount: u32) -> ExecutionResult<X> {
        self.reg_shamt_op(dest, src, shift_amount, |s, shamt| {
            X::from_i64(s.to_i64() >> shamt)
        })
    }

    /// Executes an `addiw` instruction (RV64 only).
    ///
    /// > ADDIW is an RV64I instruction that adds the sign-extended 12-bit immediate to register rs1
    /// > and produces the proper sign extension of a 32-bit result in rd. Overflows are ignored and
    /// > the result is the low 32 bits of the result sign-extended to 64 bits.
    pub fn addiw(&mut self, dest: Specifier, src: Specifier, immediate: i32) -> ExecutionResult<X> {
        self.reg_imm_op(dest, src, immediate, |s, imm| {
            sign_extend_word(low_word(s).wrapping_add(imm))
        })
    }

    /// Executes a `slliw` instruction (RV64 only).
    pub fn slliw(&mut self, dest: Specifier, src: Specifier, shift_amount: u32) -> ExecutionResult<X> {
        self.reg_shamt_op(dest, src, shift_amount & 0x1F, |s, shamt| {
            sign_extend_word(((low_word(s) as u32) << shamt) as i32)
        })
    }

    /// Executes a `srliw` instruction (RV64 only).
    pub fn srliw(&mut self, dest: Specifier, src: Specifier, shift_amount: u32) -> ExecutionResult<X> {
        self.reg_shamt_op(dest, src, shift_amount & 0x1F, |s, shamt| {
            sign_extend_word(((low_word(s) as u32) >> shamt) as i32)
        })
    }

    /// Executes a `sraiw` instruction (RV64 only).
    pub fn sraiw(&mut self, dest: Specifier, src: Specifier, shift_amount: u32) -> ExecutionResult<X> {
        self.reg_shamt_op(dest, src, shift_amount & 0x1F, |s, shamt| {
            sign_extend_word(low_word(s) >> shamt)
        })
    }

    /// Executes a `lui` instruction.
    ///
    /// Corresponds to the assembly instruction `lui dest immediate`.
    ///
    /// > LUI (load upper immediate) is used to build 32-bit constants and uses the U-type format.
    /// > LUI places the U-immediate value in the top 20 bits of the destination register rd,
    /// > filling in the lowest 12 bits with zeros.
    ///
    /// On RV64 the 32-bit result is sign-extended. Note that the bottom 12 bits of `immediate` need
    /// not be zero, they will always be discarded.
    pub fn lui(&mut self, dest: Specifier, immediate: i32) -> ExecutionResult<X> {
        let result = X::from_i64((immediate & !0xFFF) as i64);
        self.core.registers.set_x(dest, result);
        Ok(())
    }

    /// Executes an `auipc` instruction.
    ///
    /// Corresponds to the assembly instruction `auipc dest immediate`.
    ///
    /// > AUIPC (add upper immediate to pc) is used to build pc-relative addresses and uses the
    /// > U-type format. AUIPC forms a 32-bit offset from the 20-bit U-immediate, filling in the
    /// > lowest 12 bits with zeros, adds this offset to the address of the AUIPC instruction, then
    /// > places the result in register rd.
    pub fn auipc(&mut self, dest: Specifier, immediate: i32) -> ExecutionResult<X> {
        let result = self
            .core
            .curr_pc
            .wrapping_add_signed((immediate & !0xFFF) as i64);
        self.core.registers.set_x(dest, result);
        Ok(())
    }

    /// Executes an `add` instruction.
    ///
    /// Corresponds to the assembly instruction `add dest src1 src2`.
    ///
    /// > ADD performs the addition of rs1 and rs2.
    pub fn add(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) -> ExecutionResult<X> {
        self.reg_reg_op(dest, src1, src2, |s1, s2| s1.wrapping_add(s2))
    }

    /// Executes a `sub` instruction.
    ///
    /// Corresponds to the assembly instruction `sub dest src1 src2`.
    ///
    /// > SUB performs the subtraction of rs2 from rs1.
    pub fn sub(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) -> ExecutionResult<X> {
        self.reg_reg_op(dest, src1, src2, |s1, s2| s1.wrapping_sub(s2))
    }

    /// Executes a `slt` instruction.
    ///
    /// Corresponds to the assembly instruction `slt dest src1 src2`.
    ///
    /// > SLT and SLTU perform signed and unsigned compares respectively, writing 1 to rd if
    /// > rs1 < rs2, 0 otherwise.
    pub fn slt(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) -> ExecutionResult<X> {
        self.reg_reg_op(dest, src1, src2, |s1, s2| {
            bool_to_x(s1.to_signed() < s2.to_signed())
        })
    }

    /// Executes a `sltu` instruction.
    ///
    /// Corresponds to the assembly instruction `sltu dest src1 src2`.
    ///
    /// > Note, SLTU rd, x0, rs2 sets rd to 1 if rs2 is not equal to zero, otherwise sets rd to zero
    /// > (assembler pseudoinstruction SNEZ rd, rs).
    pub fn sltu(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) -> ExecutionResult<X> {
        self.reg_reg_op(dest, src1, src2, |s1, s2| bool_to_x(s1 < s2))
    }

    /// Executes an `and` instruction.
    ///
    /// > AND, OR, and XOR perform bitwise logical operations.
    pub fn and(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) -> ExecutionResult<X> {
        self.reg_reg_op(dest, src1, src2, |s1, s2| s1.and(s2))
    }

    /// Executes an `or` instruction.
    pub fn or(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) -> ExecutionResult<X> {
        self.reg_reg_op(dest, src1, src2, |s1, s2| s1.or(s2))
    }

    /// Executes a `xor` instruction.
    pub fn xor(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) -> ExecutionResult<X> {
        self.reg_reg_op(dest, src1, src2, |s1, s2| s1.xor(s2))
    }

    /// Executes a `sll` instruction.
    ///
    /// Corresponds to the assembly instruction `sll dest src1 src2`.
    ///
    /// > SLL, SRL, and SRA perform logical left, logical right, and arithmetic right shifts on the
    /// > value in register rs1 by the shift amount held in the lower 5 bits of register rs2.
    ///
    /// On RV64 the lower 6 bits of rs2 are used.
    pub fn sll(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) -> ExecutionResult<X> {
        self.reg_reg_op(dest, src1, src2, |s1, s2| {
            X::from_u64(s1.to_u64() << shift_amount(s2))
        })
    }

    /// Executes a `srl` instruction.
    pub fn srl(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) -> ExecutionResult<X> {
        self.reg_reg_op(dest, src1, src2, |s1, s2| {
            X::from_u64(s1.to_u64() >> shift_amount(s2))
        })
    }

    /// Executes a `sra` instruction.
    pub fn sra(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) -> ExecutionResult<X> {
        self.reg_reg_op(dest, src1, src2, |s1, s2| {
            X::from_i64(s1.to_i64() >> shift_amount(s2))
        })
    }

    /// Executes a `mul` instruction.
    ///
    /// > MUL performs an XLEN-bit×XLEN-bit multiplication of rs1 by rs2 and places the lower XLEN
    /// > bits in the destination register.
    pub fn mul(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) -> ExecutionResult<X> {
        self.reg_reg_op(dest, src1, src2, |s1, s2| {
            X::from_u64(s1.to_u64().wrapping_mul(s2.to_u64()))
        })
    }

    /// Executes a `mulh` instruction.
    ///
    /// > MULH, MULHU, and MULHSU perform the same multiplication but return the upper XLEN bits of
    /// > the full 2×XLEN-bit product, for signed×signed, unsigned×unsigned, and
    /// > signed rs1×unsigned rs2 multiplication, respectively.
    pub fn mulh(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) -> ExecutionResult<X> {
        self.reg_reg_op(dest, src1, src2, |s1, s2| {
            let product = s1.to_i64() as i128 * s2.to_i64() as i128;
            X::from_u64((product >> X::BITS) as u64)
        })
    }

    /// Executes a `mulhsu` instruction.
    pub fn mulhsu(
        &mut self,
        dest: Specifier,
        src1: Specifier,
        src2: Specifier,
    ) -> ExecutionResult<X> {
        self.reg_reg_op(dest, src1, src2, |s1, s2| {
            let product = s1.to_i64() as i128 * s2.to_u64() as i128;
            X::from_u64((product >> X::BITS) as u64)
        })
    }

    /// Executes a `mulhu` instruction.
    pub fn mulhu(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) -> ExecutionResult<X> {
        self.reg_reg_op(dest, src1, src2, |s1, s2| {
            let product = s1.to_u64() as u128 * s2.to_u64() as u128;
            X::from_u64((product >> X::BITS) as u64)
        })
    }

    /// Executes a `div` instruction.
    ///
    /// > DIV and DIVU perform an XLEN bits by XLEN bits signed and unsigned integer division of rs1
    /// > by rs2, rounding towards zero.
    ///
    /// > The quotient of division by zero has all bits set, and the remainder of division by zero
    /// > equals the dividend. Signed division overflow occurs only when the most-negative integer is
    /// > divided by −1. The quotient of a signed division with overflow is equal to the dividend,
    /// > and the remainder is zero.
    pub fn div(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) -> ExecutionResult<X> {
        self.reg_reg_op(dest, src1, src2, |s1, s2| {
            if s2.is_zero() {
                X::MAX
            } else if s1 == X::sign_bit() && s2 == X::MAX {
                s1
            } else {
                X::from_i64(s1.to_i64().wrapping_div(s2.to_i64()))
            }
        })
    }

    /// Executes a `divu` instruction.
    pub fn divu(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) -> ExecutionResult<X> {
        self.reg_reg_op(dest, src1, src2, |s1, s2| {
            match s2.is_zero() {
                true => X::MAX,
                false => X::from_u64(s1.to_u64() / s2.to_u64()),
            }
        })
    }

    /// Executes a `rem` instruction.
    ///
    /// > REM and REMU provide the remainder of the corresponding division operation. For REM, the
    /// > sign of a nonzero result equals the sign of the dividend.
    pub fn rem(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) -> ExecutionResult<X> {
        self.reg_reg_op(dest, src1, src2, |s1, s2| {
            if s2.is_zero() {
                s1
            } else if s1 == X::sign_bit() && s2 == X::MAX {
                X::ZERO
            } else {
                X::from_i64(s1.to_i64().wrapping_rem(s2.to_i64()))
            }
        })
    }

    /// Executes a `remu` instruction.
    pub fn remu(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) -> ExecutionResult<X> {
        self.reg_reg_op(dest, src1, src2, |s1, s2| {
            match s2.is_zero() {
                true => s1,
                false => X::from_u64(s1.to_u64() % s2.to_u64()),
            }
        })
    }

    /// Executes an `addw` instruction (RV64 only).
    ///
    /// > ADDW and SUBW are RV64I-only instructions that are defined analogously to ADD and SUB but
    /// > operate on 32-bit values and produce signed 32-bit results. Overflows are ignored, and the
    /// > low 32-bits of the result is sign-extended to 64-bits and written to the destination
    /// > register.
    pub fn addw(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) -> ExecutionResult<X> {
        self.reg_reg_word_op(dest, src1, src2, |s1, s2| s1.wrapping_add(s2))
    }

    /// Executes a `subw` instruction (RV64 only).
    pub fn subw(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) -> ExecutionResult<X> {
        self.reg_reg_word_op(dest, src1, src2, |s1, s2| s1.wrapping_sub(s2))
    }

    /// Executes a `sllw` instruction (RV64 only).
    ///
    /// > SLLW, SRLW, and SRAW are RV64I-only instructions that are analogously defined but operate
    /// > on 32-bit values and sign-extend their 32-bit results to 64 bits. The shift amount is
    /// > given by rs2[4:0].
    pub fn sllw(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) -> ExecutionResult<X> {
        self.reg_reg_word_op(dest, src1, src2, |s1, s2| {
            ((s1 as u32) << (s2 & 0x1F)) as i32
        })
    }

    /// Executes a `srlw` instruction (RV64 only).
    pub fn srlw(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) -> ExecutionResult<X> {
        self.reg_reg_word_op(dest, src1, src2, |s1, s2| {
            ((s1 as u32) >> (s2 & 0x1F)) as i32
        })
    }

    /// Executes a `sraw` instruction (RV64 only).
    pub fn sraw(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) -> ExecutionResult<X> {
        self.reg_reg_word_op(dest, src1, src2, |s1, s2| s1 >> (s2 & 0x1F))
    }

    /// Executes a `mulw` instruction (RV64 only).
    pub fn mulw(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) -> ExecutionResult<X> {
        self.reg_reg_word_op(dest, src1, src2, |s1, s2| s1.wrapping_mul(s2))
    }

    /// Executes a `divw` instruction (RV64 only).
    pub fn divw(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) -> ExecutionResult<X> {
        self.reg_reg_word_op(dest, src1, src2, |s1, s2| match s2 {
            0 => -1,
            _ => s1.wrapping_div(s2),
        })
    }

    /// Executes a `divuw` instruction (RV64 only).
    pub fn divuw(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) -> ExecutionResult<X> {
        self.reg_reg_word_op(dest, src1, src2, |s1, s2| match s2 {
            0 => -1,
            _ => ((s1 as u32) / (s2 as u32)) as i32,
        })
    }

    /// Executes a `remw` instruction (RV64 only).
    pub fn remw(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) -> ExecutionResult<X> {
        self.reg_reg_word_op(dest, src1, src2, |s1, s2| match s2 {
            0 => s1,
            _ => s1.wrapping_rem(s2),
        })
    }

    /// Executes a `remuw` instruction (RV64 only).
    pub fn remuw(&mut self, dest: Specifier, src1: Specifier, src2: Specifier) -> ExecutionResult<X> {
        self.reg_reg_word_op(dest, src1, src2, |s1, s2| match s2 {
            0 => s1,
            _ => ((s1 as u32) % (s2 as u32)) as i32,
        })
    }

    /// Executes a `jal` instruction.
    ///
    /// > The jump and link (JAL) instruction uses the J-type format, where the J-immediate encodes
    /// > a signed offset in multiples of 2 bytes. The offset is sign-extended and added to the
    /// > address of the jump instruction to form the jump target address. JAL stores the address of
    /// > the instruction following the jump ('pc'+4) into register rd.
    pub fn jal(&mut self, dest: Specifier, offset: i32) -> ExecutionResult<X> {
        let target = self.core.curr_pc.wrapping_add_signed(offset as i64);
        self.jump_op(dest, target)
    }

    /// Executes a `jalr` instruction.
    ///
    /// > The target address is obtained by adding the sign-extended 12-bit I-immediate to the
    /// > register rs1, then setting the least-significant bit of the result to zero.
    pub fn jalr(&mut self, dest: Specifier, base: Specifier, offset: i32) -> ExecutionResult<X> {
        let target = self
            .core
            .registers
            .x(base)
            .wrapping_add_signed(offset as i64)
            .and(X::from_i64(!1));
        self.jump_op(dest, target)
    }

    pub fn beq(&mut self, src1: Specifier, src2: Specifier, offset: i32) -> ExecutionResult<X> {
        self.cond_branch(src1, src2, offset, |s1, s2| s1 == s2)
    }

    pub fn bne(&mut self, src1: Specifier, src2: Specifier, offset: i32) -> ExecutionResult<X> {
        self.cond_branch(src1, src2, offset, |s1, s2| s1 != s2)
    }

    pub fn blt(&mut self, src1: Specifier, src2: Specifier, offset: i32) -> ExecutionResult<X> {
        self.cond_branch(src1, src2, offset, |s1, s2| s1.to_signed() < s2.to_signed())
    }

    pub fn bltu(&mut self, src1: Specifier, src2: Specifier, offset: i32) -> ExecutionResult<X> {
        self.cond_branch(src1, src2, offset, |s1, s2| s1 < s2)
    }

    pub fn bge(&mut self, src1: Specifier, src2: Specifier, offset: i32) -> ExecutionResult<X> {
        self.cond_branch(src1, src2, offset, |s1, s2| s1.to_signed() >= s2.to_signed())
    }

    pub fn bgeu(&mut self, src1: Specifier, src2: Specifier, offset: i32) -> ExecutionResult<X> {
        self.cond_branch(src1, src2, offset, |s1, s2| s1 >= s2)
    }

    pub fn lb(&mut self, dest: Specifier, base: Specifier, offset: i32) -> ExecutionResult<X> {
        self.load_op(dest, base, offset, Alignment::BYTE, |memory, address| {
            memory
                .read_byte(address)
                .map(|value| X::from_i64(value as i8 as i64))
        })
    }

    pub fn lbu(&mut self, dest: Specifier, base: Specifier, offset: i32) -> ExecutionResult<X> {
        self.load_op(dest, base, offset, Alignment::BYTE, |memory, address| {
            memory.read_byte(address).map(|value| X::from_u64(value as u64))
        })
    }

    pub fn lh(&mut self, dest: Specifier, base: Specifier, offset: i32) -> ExecutionResult<X> {
        self.load_op(dest, base, offset, Alignment::HALFWORD, |memory, address| {
            memory
                .read_halfword(address)
                .map(|value| X::from_i64(value as i16 as i64))
        })
    }

    pub fn lhu(&mut self, dest: Specifier, base: Specifier, offset: i32) -> ExecutionResult<X> {
        self.load_op(dest, base, offset, Alignment::HALFWORD, |memory, address| {
            memory
                .read_halfword(address)
                .map(|value| X::from_u64(value as u64))
        })
    }

    pub fn lw(&mut self, dest: Specifier, base: Specifier, offset: i32) -> ExecutionResult<X> {
        self.load_op(dest, base, offset, Alignment::WORD, |memory, address| {
            memory
                .read_word(address)
                .map(|value| X::from_i64(value as i32 as i64))
        })
    }

    /// Executes a `lwu` instruction (RV64 only).
    pub fn lwu(&mut self, dest: Specifier, base: Specifier, offset: i32) -> ExecutionResult<X> {
        self.load_op(dest, base, offset, Alignment::WORD, |memory, address| {
            memory.read_word(address).map(|value| X::from_u64(value as u64))
        })
    }

    /// Executes a `ld` instruction (RV64 only).
    pub fn ld(&mut self, dest: Specifier, base: Specifier, offset: i32) -> ExecutionResult<X> {
        self.load_op(dest, base, offset, Alignment::DOUBLEWORD, |memory, address| {
            memory.read_doubleword(address).map(X::from_u64)
        })
    }

    pub fn sb(&mut self, src: Specifier, base: Specifier, offset: i32) -> ExecutionResult<X> {
        self.store_op(src, base, offset, Alignment::BYTE, |memory, address, value| {
            memory.write_byte(address, value as u8)
        })
    }

    pub fn sh(&mut self, src: Specifier, base: Specifier, offset: i32) -> ExecutionResult<X> {
        self.store_op(src, base, offset, Alignment::HALFWORD, |memory, address, value| {
            memory.write_halfword(address, value as u16)
        })
    }

    pub fn sw(&mut self, src: Specifier, base: Specifier, offset: i32) -> ExecutionResult<X> {
        self.store_op(src, base, offset, Alignment::WORD, |memory, address, value| {
            memory.write_word(address, value as u32)
        })
    }

    /// Executes a `sd` instruction (RV64 only).
    pub fn sd(&mut self, src: Specifier, base: Specifier, offset: i32) -> ExecutionResult<X> {
        self.store_op(src, base, offset, Alignment::DOUBLEWORD, |memory, address, value| {
            memory.write_doubleword(address, value)
        })
    }

    pub fn fence(
        &mut self,
        _predecessor: FenceOrderCombination,
        _successor: FenceOrderCombination,
    ) -> ExecutionResult<X> {
        // Since only one hart is supported, this is equivalent to a nop instruction.
        Ok(())
    }

    /// Executes a `fence.i` instruction.
    ///
    /// Instructions are always fetched from memory as it is at that moment, so there is nothing to
    /// synchronize.
    pub fn fence_i(&mut self) -> ExecutionResult<X> {
        Ok(())
    }

    /// Executes an `ecall` instruction.
    ///
    /// > The ECALL instruction is used to make a request to the supporting execution environment.
    pub fn ecall(&mut self) -> ExecutionResult<X> {
        let exception = match self.core.privilege_mode {
            PrivilegeLevel::User => Exception::EnvironmentCallFromUMode,
            PrivilegeLevel::Supervisor => Exception::EnvironmentCallFromSMode,
            PrivilegeLevel::Machine => Exception::EnvironmentCallFromMMode,
        };
        Err(Fault::without_value(exception))
    }

    /// Executes an `ebreak` instruction.
    ///
    /// > The EBREAK instruction is used to return control to a debugging environment.
    pub fn ebreak(&mut self) -> ExecutionResult<X> {
        Err(Fault::without_value(Exception::Breakpoint))
    }

    /// Executes an `mret` instruction.
    ///
    /// > An MRET or SRET instruction is used to return from a trap in M-mode or S-mode
    /// > respectively. When executing an xRET instruction, supposing xPP holds the value y, xIE is
    /// > set to xPIE; the privilege mode is changed to y; xPIE is set to 1; and xPP is set to the
    /// > least-privileged supported mode (U if U-mode is implemented, else M).
    pub fn mret(&mut self) -> ExecutionResult<X> {
        if self.core.privilege_mode < PrivilegeLevel::Machine {
            return Err(self.illegal_instruction());
        }
        let status = self.core.cs_registers.status_mut();
        let previous = status.mpp();
        status.set_mie(status.mpie());
        status.set_mpie(true);
        status.set_mpp(PrivilegeLevel::User);
        self.core.privilege_mode = previous;
        self.core.pc = self.core.cs_registers.epc(TrapMode::Machine);
        Ok(())
    }

    /// Executes an `sret` instruction.
    pub fn sret(&mut self) -> ExecutionResult<X> {
        if self.core.privilege_mode < PrivilegeLevel::Supervisor {
            return Err(self.illegal_instruction());
        }
        let status = self.core.cs_registers.status_mut();
        let previous = status.spp();
        status.set_sie(status.spie());
        status.set_spie(true);
        status.set_spp(PrivilegeLevel::User);
        self.core.privilege_mode = previous;
        self.core.pc = self.core.cs_registers.epc(TrapMode::Supervisor);
        Ok(())
    }

    /// Executes a `wfi` instruction.
    ///
    /// > The Wait for Interrupt instruction (WFI) provides a hint to the implementation that the
    /// > current hart can be stalled until an interrupt might need servicing.
    ///
    /// Implemented as a nop: pending interrupts are checked before every instruction anyway.
    pub fn wfi(&mut self) -> ExecutionResult<X> {
        if self.core.privilege_mode < PrivilegeLevel::Supervisor {
            return Err(self.illegal_instruction());
        }
        Ok(())
    }

    /// Executes any of the Zicsr instructions.
    ///
    /// > The CSRRW (Atomic Read/Write CSR) instruction atomically swaps values in the CSRs and
    /// > integer registers. [...] If rd=x0, then the instruction shall not read the CSR and shall
    /// > not cause any of the side effects that might occur on a CSR read.
    ///
    /// > For both CSRRS and CSRRC, if rs1=x0, then the instruction will not write to the CSR at
    /// > all, and so shall not cause any of the side effects that might otherwise occur on a CSR
    /// > write, nor raise illegal-instruction exceptions on accesses to read-only CSRs.
    ///
    /// The immediate forms behave the same, with a zero immediate taking the role of `x0`.
    pub fn csr(
        &mut self,
        op: CsrOp,
        dest: Specifier,
        source: CsrSource,
        csr: CsrSpecifier,
    ) -> ExecutionResult<X> {
        let privilege_level = self.core.privilege_mode;
        let (operand, source_is_zero) = match source {
            CsrSource::Register(src) => (self.core.registers.x(src), src == Specifier::X0),
            CsrSource::Immediate(uimm) => (X::from_u64(uimm as u64), uimm == 0),
        };
        let read = !(op == CsrOp::Csrrw && dest == Specifier::X0);
        let write = op == CsrOp::Csrrw || !source_is_zero;

        let old_value = match read {
            true => self
                .core
                .cs_registers
                .read(csr, privilege_level)
                .map_err(|_| self.illegal_instruction())?,
            false => X::ZERO,
        };
        if write {
            let new_value = match op {
                CsrOp::Csrrw => operand,
                CsrOp::Csrrs => old_value.or(operand),
                CsrOp::Csrrc => old_value.and(operand.not()),
            };
            let fault = self.illegal_instruction();
            self.core
                .cs_registers
                .write(csr, new_value, privilege_level)
                .map_err(|_| fault)?;
        }
        if read {
            self.core.registers.set_x(dest, old_value);
        }
        Ok(())
    }

    /// Fault for an illegal instruction, with the instruction bits as trap value.
    fn illegal_instruction(&self) -> Fault<X> {
        Fault::new(
            Exception::IllegalInstruction,
            X::from_u64(self.raw_instruction as u64),
        )
    }

    #[inline]
    fn reg_imm_op<F>(
        &mut self,
        dest: Specifier,
        src: Specifier,
        immediate: i32,
        op: F,
    ) -> ExecutionResult<X>
    where
        F: FnOnce(X, i32) -> X,
    {
        let registers = &mut self.core.registers;
        registers.set_x(dest, op(registers.x(src), immediate));
        Ok(())
    }

    #[inline]
    fn reg_shamt_op<F>(
        &mut self,
        dest: Specifier,
        src: Specifier,
        shift_amount: u32,
        op: F,
    ) -> ExecutionResult<X>
    where
        F: FnOnce(X, u32) -> X,
    {
        let registers = &mut self.core.registers;
        let shift_amount = shift_amount & X::shift_mask();
        registers.set_x(dest, op(registers.x(src), shift_amount));
        Ok(())
    }

    #[inline]
    fn reg_reg_op<F>(
        &mut self,
        dest: Specifier,
        src1: Specifier,
        src2: Specifier,
        op: F,
    ) -> ExecutionResult<X>
    where
        F: FnOnce(X, X) -> X,
    {
        let registers = &mut self.core.registers;
        registers.set_x(dest, op(registers.x(src1), registers.x(src2)));
        Ok(())
    }

    /// Like [`reg_reg_op`](Self::reg_reg_op), but operating on the low 32 bits of both operands,
    /// with the 32-bit result sign-extended.
    #[inline]
    fn reg_reg_word_op<F>(
        &mut self,
        dest: Specifier,
        src1: Specifier,
        src2: Specifier,
        op: F,
    ) -> ExecutionResult<X>
    where
        F: FnOnce(i32, i32) -> i32,
    {
        self.reg_reg_op(dest, src1, src2, |s1, s2| {
            sign_extend_word(op(low_word(s1), low_word(s2)))
        })
    }

    /// Jumps to `target`, writing the address of the next instruction to `dest`.
    ///
    /// Nothing is written if the target is misaligned.
    fn jump_op(&mut self, dest: Specifier, target: X) -> ExecutionResult<X> {
        self.check_target_alignment(target)?;
        let link = std::mem::replace(&mut self.core.pc, target);
        self.core.registers.set_x(dest, link);
        Ok(())
    }

    // Takes the branch if `predicate` returns `true`.
    fn cond_branch<P>(
        &mut self,
        src1: Specifier,
        src2: Specifier,
        offset: i32,
        predicate: P,
    ) -> ExecutionResult<X>
    where
        P: FnOnce(X, X) -> bool,
    {
        let registers = &self.core.registers;
        if predicate(registers.x(src1), registers.x(src2)) {
            let target = self.core.curr_pc.wrapping_add_signed(offset as i64);
            self.check_target_alignment(target)?;
            self.core.pc = target;
        }
        Ok(())
    }

    /// > The JAL and JALR instructions will generate an instruction-address-misaligned exception if
    /// > the target address is not aligned to a four-byte boundary.
    ///
    /// With the C extension enabled, two-byte alignment suffices.
    fn check_target_alignment(&self, target: X) -> Result<(), Fault<X>> {
        match self.core.instruction_alignment().is_aligned(target.to_u64()) {
            true => Ok(()),
            false => Err(Fault::new(Exception::InstructionAddressMisaligned, target)),
        }
    }

    #[inline]
    fn load_op<F>(
        &mut self,
        dest: Specifier,
        base: Specifier,
        offset: i32,
        alignment: Alignment,
        op: F,
    ) -> ExecutionResult<X>
    where
        F: FnOnce(&crate::memory::Memory, u64) -> Result<X, MemoryError>,
    {
        let address = self
            .core
            .registers
            .x(base)
            .wrapping_add_signed(offset as i64);
        self.check_data_alignment(address, alignment, Exception::LoadAddressMisaligned)?;
        match op(&self.core.memory, address.to_u64()) {
            Ok(value) => {
                self.core.registers.set_x(dest, value);
                Ok(())
            }
            Err(MemoryError::AccessFault) => {
                Err(Fault::new(Exception::LoadAccessFault, address))
            }
        }
    }

    #[inline]
    fn store_op<F>(
        &mut self,
        src: Specifier,
        base: Specifier,
        offset: i32,
        alignment: Alignment,
        op: F,
    ) -> ExecutionResult<X>
    where
        F: FnOnce(&mut crate::memory::Memory, u64, u64) -> Result<(), MemoryError>,
    {
        let registers = &self.core.registers;
        let value = registers.x(src);
        let address = registers.x(base).wrapping_add_signed(offset as i64);
        self.check_data_alignment(address, alignment, Exception::StoreOrAmoAddressMisaligned)?;
        match op(&mut self.core.memory, address.to_u64(), value.to_u64()) {
            Ok(()) => Ok(()),
            Err(MemoryError::AccessFault) => {
                Err(Fault::new(Exception::StoreOrAmoAccessFault, address))
            }
        }
    }

    fn check_data_alignment(
        &self,
        address: X,
        alignment: Alignment,
        exception: Exception,
    ) -> Result<(), Fault<X>> {
        if self.core.config.support_misaligned_memory_access
            || alignment.is_aligned(address.to_u64())
        {
            Ok(())
        } else {
            Err(Fault::new(exception, address))
        }
    }
}

fn bool_to_x<X: Xlen>(value: bool) -> X {
    X::from_u64(value as u64)
}

/// Register-width shift amount taken from the low bits of a register.
fn shift_amount<X: Xlen>(value: X) -> u32 {
    value.to_u64() as u32 & X::shift_mask()
}

/// Returns the low 32 bits of a register value, as a signed number.
fn low_word<X: Xlen>(value: X) -> i32 {
    value.to_u64() as u32 as i32
}

fn sign_extend_word<X: Xlen>(value: i32) -> X {
    X::from_i64(value as i64)
}
