//! The opcode table and the composed instruction machine.
//!
//! One entry per opcode: the addressing mode paired with the logical
//! operation. The table is a compile-time constant; composition happens at
//! dispatch by handing the mode machine's output (operand byte or
//! effective address) to the operation machine.
//!
//! Entries that stay `None` are the genuinely unstable undocumented
//! opcodes (XAA, AHX, TAS, SHY, SHX, LXA, LAS); fetching one invokes the
//! driver's invalid-opcode hook.

use crate::addressing::{AddressingMode, ModeMachine, ModeOutcome};
use crate::microcycle::Microcycle;
use crate::operations::{Access, Cond, OpInput, OpMachine, OpOutcome, Operation};
use crate::state::CpuState;

/// A decoded instruction: addressing mode plus operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub mode: AddressingMode,
    pub op: Operation,
}

impl Instruction {
    /// Look up an opcode. `None` for the unstable opcodes the core does
    /// not implement.
    #[must_use]
    pub fn decode(opcode: u8) -> Option<Self> {
        OPCODE_TABLE[opcode as usize]
    }
}

/// A composed instruction machine: addressing mode feeding an operation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Executor {
    mode: ModeMachine,
    op: OpMachine,
    in_op: bool,
}

impl Executor {
    /// Start executing a decoded instruction. `pc` already points past the
    /// opcode; returns the machine and the instruction's second cycle.
    pub(crate) fn begin(instr: Instruction, st: &CpuState) -> (Self, Microcycle) {
        let always_fixup = matches!(instr.op.access(), Access::Write | Access::Rmw);
        let tail = instr.op.tail_cycles(instr.mode);
        let taken = match instr.op {
            Operation::Branch(cond) => cond.eval(st.flags),
            _ => false,
        };
        let (mode, first) = ModeMachine::begin(instr.mode, always_fixup, tail, taken, st);
        (
            Self {
                mode,
                op: OpMachine::new(instr.op),
                in_op: false,
            },
            first,
        )
    }

    /// Advance past the serviced cycle; `value` is the byte the bus
    /// returned (the written byte for writes).
    pub(crate) fn advance(&mut self, st: &mut CpuState, value: u8) -> OpOutcome {
        if self.in_op {
            return self.op.advance(st, value);
        }
        match self.mode.advance(st, value) {
            ModeOutcome::Cycle(mc) => OpOutcome::Cycle(mc),
            ModeOutcome::Done => OpOutcome::Done,
            ModeOutcome::Operand(byte) => {
                self.in_op = true;
                self.op.begin(st, OpInput::Operand(byte))
            }
            ModeOutcome::Address(addr) => {
                self.in_op = true;
                self.op.begin(st, OpInput::Address(addr))
            }
            ModeOutcome::Implied => {
                self.in_op = true;
                self.op.begin(st, OpInput::Implied)
            }
        }
    }
}

pub(crate) static OPCODE_TABLE: [Option<Instruction>; 256] = compile();

const fn entry(mode: AddressingMode, op: Operation) -> Option<Instruction> {
    Some(Instruction { mode, op })
}

#[allow(clippy::too_many_lines)]
const fn compile() -> [Option<Instruction>; 256] {
    use AddressingMode::{
        Absolute, AbsoluteX, AbsoluteY, Accumulator, Immediate, Implied, IndexedIndirect,
        Indirect, IndirectIndexed, Relative, ZeroPage, ZeroPageX, ZeroPageY,
    };
    use Operation::{
        Adc, Alr, Anc, And, Arr, Asl, AslA, Axs, Bit, Branch, Brk, Clc, Cld, Cli, Clv, Cmp, Cpx,
        Cpy, Dcp, Dec, Dex, Dey, Eor, Inc, Inx, Iny, Isb, Jmp, Jsr, Kil, Lax, Lda, Ldx, Ldy, Lsr,
        LsrA, Nop, Ora, Pha, Php, Pla, Plp, Rla, Rol, RolA, Ror, RorA, Rra, Rti, Rts, Sax, Sbc,
        Sec, Sed, Sei, Slo, Sre, Sta, Stx, Sty, Tax, Tay, Tsx, Txa, Txs, Tya,
    };

    let mut t: [Option<Instruction>; 256] = [None; 256];

    // $00 row
    t[0x00] = entry(Immediate, Brk); // BRK - 7
    t[0x01] = entry(IndexedIndirect, Ora); // ORA (zp,X) - 6
    t[0x02] = entry(Implied, Kil);
    t[0x03] = entry(IndexedIndirect, Slo); // SLO (zp,X) - 8
    t[0x04] = entry(ZeroPage, Nop); // NOP zp - 3
    t[0x05] = entry(ZeroPage, Ora); // ORA zp - 3
    t[0x06] = entry(ZeroPage, Asl); // ASL zp - 5
    t[0x07] = entry(ZeroPage, Slo); // SLO zp - 5
    t[0x08] = entry(Implied, Php); // PHP - 3
    t[0x09] = entry(Immediate, Ora); // ORA imm - 2
    t[0x0A] = entry(Accumulator, AslA); // ASL A - 2
    t[0x0B] = entry(Immediate, Anc); // ANC imm - 2
    t[0x0C] = entry(Absolute, Nop); // NOP abs - 4
    t[0x0D] = entry(Absolute, Ora); // ORA abs - 4
    t[0x0E] = entry(Absolute, Asl); // ASL abs - 6
    t[0x0F] = entry(Absolute, Slo); // SLO abs - 6

    // $10 row
    t[0x10] = entry(Relative, Branch(Cond::Plus)); // BPL - 2/3/4
    t[0x11] = entry(IndirectIndexed, Ora); // ORA (zp),Y - 5/6
    t[0x12] = entry(Implied, Kil);
    t[0x13] = entry(IndirectIndexed, Slo); // SLO (zp),Y - 8
    t[0x14] = entry(ZeroPageX, Nop); // NOP zp,X - 4
    t[0x15] = entry(ZeroPageX, Ora); // ORA zp,X - 4
    t[0x16] = entry(ZeroPageX, Asl); // ASL zp,X - 6
    t[0x17] = entry(ZeroPageX, Slo); // SLO zp,X - 6
    t[0x18] = entry(Implied, Clc); // CLC - 2
    t[0x19] = entry(AbsoluteY, Ora); // ORA abs,Y - 4/5
    t[0x1A] = entry(Implied, Nop); // NOP - 2
    t[0x1B] = entry(AbsoluteY, Slo); // SLO abs,Y - 7
    t[0x1C] = entry(AbsoluteX, Nop); // NOP abs,X - 4/5
    t[0x1D] = entry(AbsoluteX, Ora); // ORA abs,X - 4/5
    t[0x1E] = entry(AbsoluteX, Asl); // ASL abs,X - 7
    t[0x1F] = entry(AbsoluteX, Slo); // SLO abs,X - 7

    // $20 row
    t[0x20] = entry(Immediate, Jsr); // JSR abs - 6
    t[0x21] = entry(IndexedIndirect, And); // AND (zp,X) - 6
    t[0x22] = entry(Implied, Kil);
    t[0x23] = entry(IndexedIndirect, Rla); // RLA (zp,X) - 8
    t[0x24] = entry(ZeroPage, Bit); // BIT zp - 3
    t[0x25] = entry(ZeroPage, And); // AND zp - 3
    t[0x26] = entry(ZeroPage, Rol); // ROL zp - 5
    t[0x27] = entry(ZeroPage, Rla); // RLA zp - 5
    t[0x28] = entry(Implied, Plp); // PLP - 4
    t[0x29] = entry(Immediate, And); // AND imm - 2
    t[0x2A] = entry(Accumulator, RolA); // ROL A - 2
    t[0x2B] = entry(Immediate, Anc); // ANC imm - 2
    t[0x2C] = entry(Absolute, Bit); // BIT abs - 4
    t[0x2D] = entry(Absolute, And); // AND abs - 4
    t[0x2E] = entry(Absolute, Rol); // ROL abs - 6
    t[0x2F] = entry(Absolute, Rla); // RLA abs - 6

    // $30 row
    t[0x30] = entry(Relative, Branch(Cond::Minus)); // BMI - 2/3/4
    t[0x31] = entry(IndirectIndexed, And); // AND (zp),Y - 5/6
    t[0x32] = entry(Implied, Kil);
    t[0x33] = entry(IndirectIndexed, Rla); // RLA (zp),Y - 8
    t[0x34] = entry(ZeroPageX, Nop); // NOP zp,X - 4
    t[0x35] = entry(ZeroPageX, And); // AND zp,X - 4
    t[0x36] = entry(ZeroPageX, Rol); // ROL zp,X - 6
    t[0x37] = entry(ZeroPageX, Rla); // RLA zp,X - 6
    t[0x38] = entry(Implied, Sec); // SEC - 2
    t[0x39] = entry(AbsoluteY, And); // AND abs,Y - 4/5
    t[0x3A] = entry(Implied, Nop); // NOP - 2
    t[0x3B] = entry(AbsoluteY, Rla); // RLA abs,Y - 7
    t[0x3C] = entry(AbsoluteX, Nop); // NOP abs,X - 4/5
    t[0x3D] = entry(AbsoluteX, And); // AND abs,X - 4/5
    t[0x3E] = entry(AbsoluteX, Rol); // ROL abs,X - 7
    t[0x3F] = entry(AbsoluteX, Rla); // RLA abs,X - 7

    // $40 row
    t[0x40] = entry(Implied, Rti); // RTI - 6
    t[0x41] = entry(IndexedIndirect, Eor); // EOR (zp,X) - 6
    t[0x42] = entry(Implied, Kil);
    t[0x43] = entry(IndexedIndirect, Sre); // SRE (zp,X) - 8
    t[0x44] = entry(ZeroPage, Nop); // NOP zp - 3
    t[0x45] = entry(ZeroPage, Eor); // EOR zp - 3
    t[0x46] = entry(ZeroPage, Lsr); // LSR zp - 5
    t[0x47] = entry(ZeroPage, Sre); // SRE zp - 5
    t[0x48] = entry(Implied, Pha); // PHA - 3
    t[0x49] = entry(Immediate, Eor); // EOR imm - 2
    t[0x4A] = entry(Accumulator, LsrA); // LSR A - 2
    t[0x4B] = entry(Immediate, Alr); // ALR imm - 2
    t[0x4C] = entry(Absolute, Jmp); // JMP abs - 3
    t[0x4D] = entry(Absolute, Eor); // EOR abs - 4
    t[0x4E] = entry(Absolute, Lsr); // LSR abs - 6
    t[0x4F] = entry(Absolute, Sre); // SRE abs - 6

    // $50 row
    t[0x50] = entry(Relative, Branch(Cond::OverflowClear)); // BVC - 2/3/4
    t[0x51] = entry(IndirectIndexed, Eor); // EOR (zp),Y - 5/6
    t[0x52] = entry(Implied, Kil);
    t[0x53] = entry(IndirectIndexed, Sre); // SRE (zp),Y - 8
    t[0x54] = entry(ZeroPageX, Nop); // NOP zp,X - 4
    t[0x55] = entry(ZeroPageX, Eor); // EOR zp,X - 4
    t[0x56] = entry(ZeroPageX, Lsr); // LSR zp,X - 6
    t[0x57] = entry(ZeroPageX, Sre); // SRE zp,X - 6
    t[0x58] = entry(Implied, Cli); // CLI - 2
    t[0x59] = entry(AbsoluteY, Eor); // EOR abs,Y - 4/5
    t[0x5A] = entry(Implied, Nop); // NOP - 2
    t[0x5B] = entry(AbsoluteY, Sre); // SRE abs,Y - 7
    t[0x5C] = entry(AbsoluteX, Nop); // NOP abs,X - 4/5
    t[0x5D] = entry(AbsoluteX, Eor); // EOR abs,X - 4/5
    t[0x5E] = entry(AbsoluteX, Lsr); // LSR abs,X - 7
    t[0x5F] = entry(AbsoluteX, Sre); // SRE abs,X - 7

    // $60 row
    t[0x60] = entry(Implied, Rts); // RTS - 6
    t[0x61] = entry(IndexedIndirect, Adc); // ADC (zp,X) - 6
    t[0x62] = entry(Implied, Kil);
    t[0x63] = entry(IndexedIndirect, Rra); // RRA (zp,X) - 8
    t[0x64] = entry(ZeroPage, Nop); // NOP zp - 3
    t[0x65] = entry(ZeroPage, Adc); // ADC zp - 3
    t[0x66] = entry(ZeroPage, Ror); // ROR zp - 5
    t[0x67] = entry(ZeroPage, Rra); // RRA zp - 5
    t[0x68] = entry(Implied, Pla); // PLA - 4
    t[0x69] = entry(Immediate, Adc); // ADC imm - 2
    t[0x6A] = entry(Accumulator, RorA); // ROR A - 2
    t[0x6B] = entry(Immediate, Arr); // ARR imm - 2
    t[0x6C] = entry(Indirect, Jmp); // JMP (ind) - 5
    t[0x6D] = entry(Absolute, Adc); // ADC abs - 4
    t[0x6E] = entry(Absolute, Ror); // ROR abs - 6
    t[0x6F] = entry(Absolute, Rra); // RRA abs - 6

    // $70 row
    t[0x70] = entry(Relative, Branch(Cond::OverflowSet)); // BVS - 2/3/4
    t[0x71] = entry(IndirectIndexed, Adc); // ADC (zp),Y - 5/6
    t[0x72] = entry(Implied, Kil);
    t[0x73] = entry(IndirectIndexed, Rra); // RRA (zp),Y - 8
    t[0x74] = entry(ZeroPageX, Nop); // NOP zp,X - 4
    t[0x75] = entry(ZeroPageX, Adc); // ADC zp,X - 4
    t[0x76] = entry(ZeroPageX, Ror); // ROR zp,X - 6
    t[0x77] = entry(ZeroPageX, Rra); // RRA zp,X - 6
    t[0x78] = entry(Implied, Sei); // SEI - 2
    t[0x79] = entry(AbsoluteY, Adc); // ADC abs,Y - 4/5
    t[0x7A] = entry(Implied, Nop); // NOP - 2
    t[0x7B] = entry(AbsoluteY, Rra); // RRA abs,Y - 7
    t[0x7C] = entry(AbsoluteX, Nop); // NOP abs,X - 4/5
    t[0x7D] = entry(AbsoluteX, Adc); // ADC abs,X - 4/5
    t[0x7E] = entry(AbsoluteX, Ror); // ROR abs,X - 7
    t[0x7F] = entry(AbsoluteX, Rra); // RRA abs,X - 7

    // $80 row
    t[0x80] = entry(Immediate, Nop); // NOP imm - 2
    t[0x81] = entry(IndexedIndirect, Sta); // STA (zp,X) - 6
    t[0x82] = entry(Immediate, Nop); // NOP imm - 2
    t[0x83] = entry(IndexedIndirect, Sax); // SAX (zp,X) - 6
    t[0x84] = entry(ZeroPage, Sty); // STY zp - 3
    t[0x85] = entry(ZeroPage, Sta); // STA zp - 3
    t[0x86] = entry(ZeroPage, Stx); // STX zp - 3
    t[0x87] = entry(ZeroPage, Sax); // SAX zp - 3
    t[0x88] = entry(Implied, Dey); // DEY - 2
    t[0x89] = entry(Immediate, Nop); // NOP imm - 2
    t[0x8A] = entry(Implied, Txa); // TXA - 2
    // $8B XAA: unstable, not implemented
    t[0x8C] = entry(Absolute, Sty); // STY abs - 4
    t[0x8D] = entry(Absolute, Sta); // STA abs - 4
    t[0x8E] = entry(Absolute, Stx); // STX abs - 4
    t[0x8F] = entry(Absolute, Sax); // SAX abs - 4

    // $90 row
    t[0x90] = entry(Relative, Branch(Cond::CarryClear)); // BCC - 2/3/4
    t[0x91] = entry(IndirectIndexed, Sta); // STA (zp),Y - 6
    t[0x92] = entry(Implied, Kil);
    // $93 AHX: unstable, not implemented
    t[0x94] = entry(ZeroPageX, Sty); // STY zp,X - 4
    t[0x95] = entry(ZeroPageX, Sta); // STA zp,X - 4
    t[0x96] = entry(ZeroPageY, Stx); // STX zp,Y - 4
    t[0x97] = entry(ZeroPageY, Sax); // SAX zp,Y - 4
    t[0x98] = entry(Implied, Tya); // TYA - 2
    t[0x99] = entry(AbsoluteY, Sta); // STA abs,Y - 5
    t[0x9A] = entry(Implied, Txs); // TXS - 2
    // $9B TAS, $9C SHY, $9E SHX, $9F AHX: unstable, not implemented
    t[0x9D] = entry(AbsoluteX, Sta); // STA abs,X - 5

    // $A0 row
    t[0xA0] = entry(Immediate, Ldy); // LDY imm - 2
    t[0xA1] = entry(IndexedIndirect, Lda); // LDA (zp,X) - 6
    t[0xA2] = entry(Immediate, Ldx); // LDX imm - 2
    t[0xA3] = entry(IndexedIndirect, Lax); // LAX (zp,X) - 6
    t[0xA4] = entry(ZeroPage, Ldy); // LDY zp - 3
    t[0xA5] = entry(ZeroPage, Lda); // LDA zp - 3
    t[0xA6] = entry(ZeroPage, Ldx); // LDX zp - 3
    t[0xA7] = entry(ZeroPage, Lax); // LAX zp - 3
    t[0xA8] = entry(Implied, Tay); // TAY - 2
    t[0xA9] = entry(Immediate, Lda); // LDA imm - 2
    t[0xAA] = entry(Implied, Tax); // TAX - 2
    // $AB LXA: unstable, not implemented
    t[0xAC] = entry(Absolute, Ldy); // LDY abs - 4
    t[0xAD] = entry(Absolute, Lda); // LDA abs - 4
    t[0xAE] = entry(Absolute, Ldx); // LDX abs - 4
    t[0xAF] = entry(Absolute, Lax); // LAX abs - 4

    // $B0 row
    t[0xB0] = entry(Relative, Branch(Cond::CarrySet)); // BCS - 2/3/4
    t[0xB1] = entry(IndirectIndexed, Lda); // LDA (zp),Y - 5/6
    t[0xB2] = entry(Implied, Kil);
    t[0xB3] = entry(IndirectIndexed, Lax); // LAX (zp),Y - 5/6
    t[0xB4] = entry(ZeroPageX, Ldy); // LDY zp,X - 4
    t[0xB5] = entry(ZeroPageX, Lda); // LDA zp,X - 4
    t[0xB6] = entry(ZeroPageY, Ldx); // LDX zp,Y - 4
    t[0xB7] = entry(ZeroPageY, Lax); // LAX zp,Y - 4
    t[0xB8] = entry(Implied, Clv); // CLV - 2
    t[0xB9] = entry(AbsoluteY, Lda); // LDA abs,Y - 4/5
    t[0xBA] = entry(Implied, Tsx); // TSX - 2
    // $BB LAS: unstable, not implemented
    t[0xBC] = entry(AbsoluteX, Ldy); // LDY abs,X - 4/5
    t[0xBD] = entry(AbsoluteX, Lda); // LDA abs,X - 4/5
    t[0xBE] = entry(AbsoluteY, Ldx); // LDX abs,Y - 4/5
    t[0xBF] = entry(AbsoluteY, Lax); // LAX abs,Y - 4/5

    // $C0 row
    t[0xC0] = entry(Immediate, Cpy); // CPY imm - 2
    t[0xC1] = entry(IndexedIndirect, Cmp); // CMP (zp,X) - 6
    t[0xC2] = entry(Immediate, Nop); // NOP imm - 2
    t[0xC3] = entry(IndexedIndirect, Dcp); // DCP (zp,X) - 8
    t[0xC4] = entry(ZeroPage, Cpy); // CPY zp - 3
    t[0xC5] = entry(ZeroPage, Cmp); // CMP zp - 3
    t[0xC6] = entry(ZeroPage, Dec); // DEC zp - 5
    t[0xC7] = entry(ZeroPage, Dcp); // DCP zp - 5
    t[0xC8] = entry(Implied, Iny); // INY - 2
    t[0xC9] = entry(Immediate, Cmp); // CMP imm - 2
    t[0xCA] = entry(Implied, Dex); // DEX - 2
    t[0xCB] = entry(Immediate, Axs); // AXS imm - 2
    t[0xCC] = entry(Absolute, Cpy); // CPY abs - 4
    t[0xCD] = entry(Absolute, Cmp); // CMP abs - 4
    t[0xCE] = entry(Absolute, Dec); // DEC abs - 6
    t[0xCF] = entry(Absolute, Dcp); // DCP abs - 6

    // $D0 row
    t[0xD0] = entry(Relative, Branch(Cond::NotEqual)); // BNE - 2/3/4
    t[0xD1] = entry(IndirectIndexed, Cmp); // CMP (zp),Y - 5/6
    t[0xD2] = entry(Implied, Kil);
    t[0xD3] = entry(IndirectIndexed, Dcp); // DCP (zp),Y - 8
    t[0xD4] = entry(ZeroPageX, Nop); // NOP zp,X - 4
    t[0xD5] = entry(ZeroPageX, Cmp); // CMP zp,X - 4
    t[0xD6] = entry(ZeroPageX, Dec); // DEC zp,X - 6
    t[0xD7] = entry(ZeroPageX, Dcp); // DCP zp,X - 6
    t[0xD8] = entry(Implied, Cld); // CLD - 2
    t[0xD9] = entry(AbsoluteY, Cmp); // CMP abs,Y - 4/5
    t[0xDA] = entry(Implied, Nop); // NOP - 2
    t[0xDB] = entry(AbsoluteY, Dcp); // DCP abs,Y - 7
    t[0xDC] = entry(AbsoluteX, Nop); // NOP abs,X - 4/5
    t[0xDD] = entry(AbsoluteX, Cmp); // CMP abs,X - 4/5
    t[0xDE] = entry(AbsoluteX, Dec); // DEC abs,X - 7
    t[0xDF] = entry(AbsoluteX, Dcp); // DCP abs,X - 7

    // $E0 row
    t[0xE0] = entry(Immediate, Cpx); // CPX imm - 2
    t[0xE1] = entry(IndexedIndirect, Sbc); // SBC (zp,X) - 6
    t[0xE2] = entry(Immediate, Nop); // NOP imm - 2
    t[0xE3] = entry(IndexedIndirect, Isb); // ISB (zp,X) - 8
    t[0xE4] = entry(ZeroPage, Cpx); // CPX zp - 3
    t[0xE5] = entry(ZeroPage, Sbc); // SBC zp - 3
    t[0xE6] = entry(ZeroPage, Inc); // INC zp - 5
    t[0xE7] = entry(ZeroPage, Isb); // ISB zp - 5
    t[0xE8] = entry(Implied, Inx); // INX - 2
    t[0xE9] = entry(Immediate, Sbc); // SBC imm - 2
    t[0xEA] = entry(Implied, Nop); // NOP - 2
    t[0xEB] = entry(Immediate, Sbc); // SBC imm (mirror) - 2
    t[0xEC] = entry(Absolute, Cpx); // CPX abs - 4
    t[0xED] = entry(Absolute, Sbc); // SBC abs - 4
    t[0xEE] = entry(Absolute, Inc); // INC abs - 6
    t[0xEF] = entry(Absolute, Isb); // ISB abs - 6

    // $F0 row
    t[0xF0] = entry(Relative, Branch(Cond::Equal)); // BEQ - 2/3/4
    t[0xF1] = entry(IndirectIndexed, Sbc); // SBC (zp),Y - 5/6
    t[0xF2] = entry(Implied, Kil);
    t[0xF3] = entry(IndirectIndexed, Isb); // ISB (zp),Y - 8
    t[0xF4] = entry(ZeroPageX, Nop); // NOP zp,X - 4
    t[0xF5] = entry(ZeroPageX, Sbc); // SBC zp,X - 4
    t[0xF6] = entry(ZeroPageX, Inc); // INC zp,X - 6
    t[0xF7] = entry(ZeroPageX, Isb); // ISB zp,X - 6
    t[0xF8] = entry(Implied, Sed); // SED - 2
    t[0xF9] = entry(AbsoluteY, Sbc); // SBC abs,Y - 4/5
    t[0xFA] = entry(Implied, Nop); // NOP - 2
    t[0xFB] = entry(AbsoluteY, Isb); // ISB abs,Y - 7
    t[0xFC] = entry(AbsoluteX, Nop); // NOP abs,X - 4/5
    t[0xFD] = entry(AbsoluteX, Sbc); // SBC abs,X - 4/5
    t[0xFE] = entry(AbsoluteX, Inc); // INC abs,X - 7
    t[0xFF] = entry(AbsoluteX, Isb); // ISB abs,X - 7

    t
}
