//! Operation micro-machines.
//!
//! One logical operation per instruction family. An operation is composed
//! with an addressing mode by the opcode table: the mode produces an
//! operand byte or an effective address, the operation performs whatever
//! bus cycles remain (none for register-only work, one read or write for
//! loads and stores, the read/write/write triple for read-modify-writes,
//! longer scripts for the stack and flow instructions).
//!
//! Undocumented opcodes follow the stable NMOS behavior:
//! - LAX, SAX, DCP, ISB (essential tier)
//! - SLO, SRE, RLA, RRA (combined shift + ALU)
//! - ANC, ALR, ARR, AXS (immediate-only)
//! - multi-byte NOPs and the KIL halts

use crate::addressing::AddressingMode;
use crate::flags::{self, Flags};
use crate::microcycle::Microcycle;
use crate::state::CpuState;

/// Branch conditions, one per branch opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    /// BPL: N clear.
    Plus,
    /// BMI: N set.
    Minus,
    /// BVC: V clear.
    OverflowClear,
    /// BVS: V set.
    OverflowSet,
    /// BCC: C clear.
    CarryClear,
    /// BCS: C set.
    CarrySet,
    /// BNE: Z clear.
    NotEqual,
    /// BEQ: Z set.
    Equal,
}

impl Cond {
    pub(crate) fn eval(self, f: Flags) -> bool {
        match self {
            Self::Plus => !f.is_set(flags::N),
            Self::Minus => f.is_set(flags::N),
            Self::OverflowClear => !f.is_set(flags::V),
            Self::OverflowSet => f.is_set(flags::V),
            Self::CarryClear => !f.is_set(flags::C),
            Self::CarrySet => f.is_set(flags::C),
            Self::NotEqual => !f.is_set(flags::Z),
            Self::Equal => f.is_set(flags::Z),
        }
    }
}

/// The logical operations of the instruction set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    // Loads
    Lda,
    Ldx,
    Ldy,
    // Stores
    Sta,
    Stx,
    Sty,
    // ALU reads
    Adc,
    Sbc,
    And,
    Ora,
    Eor,
    Cmp,
    Cpx,
    Cpy,
    Bit,
    // Read-modify-write
    Asl,
    Lsr,
    Rol,
    Ror,
    Inc,
    Dec,
    // Accumulator shift variants
    AslA,
    LsrA,
    RolA,
    RorA,
    // Register increment/decrement
    Inx,
    Iny,
    Dex,
    Dey,
    // Transfers
    Tax,
    Tay,
    Txa,
    Tya,
    Tsx,
    Txs,
    // Flag set/clear
    Clc,
    Sec,
    Cli,
    Sei,
    Cld,
    Sed,
    Clv,
    // Stack
    Pha,
    Php,
    Pla,
    Plp,
    // Flow
    Jmp,
    Jsr,
    Rts,
    Rti,
    Brk,
    Branch(Cond),
    Nop,
    // Undocumented
    Lax,
    Sax,
    Dcp,
    Isb,
    Slo,
    Rla,
    Sre,
    Rra,
    Anc,
    Alr,
    Arr,
    Axs,
    Kil,
}

/// Memory access class, used by the addressing modes for the page-cross
/// fix-up rule and by the table compiler for poll placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Access {
    Read,
    Write,
    Rmw,
    None,
}

impl Operation {
    pub(crate) const fn access(self) -> Access {
        match self {
            Self::Lda
            | Self::Ldx
            | Self::Ldy
            | Self::Adc
            | Self::Sbc
            | Self::And
            | Self::Ora
            | Self::Eor
            | Self::Cmp
            | Self::Cpx
            | Self::Cpy
            | Self::Bit
            | Self::Lax
            | Self::Anc
            | Self::Alr
            | Self::Arr
            | Self::Axs
            | Self::Nop => Access::Read,
            Self::Sta | Self::Stx | Self::Sty | Self::Sax => Access::Write,
            Self::Asl
            | Self::Lsr
            | Self::Rol
            | Self::Ror
            | Self::Inc
            | Self::Dec
            | Self::Slo
            | Self::Rla
            | Self::Sre
            | Self::Rra
            | Self::Dcp
            | Self::Isb => Access::Rmw,
            _ => Access::None,
        }
    }

    /// Bus cycles this operation contributes after its addressing mode
    /// completes. Feeds the interrupt-poll placement in the mode machines.
    pub(crate) const fn tail_cycles(self, mode: AddressingMode) -> u8 {
        match self {
            Self::Jmp | Self::Kil | Self::Branch(_) => 0,
            Self::Jsr | Self::Rts | Self::Rti => 4,
            Self::Brk => 5,
            Self::Pha | Self::Php => 1,
            Self::Pla | Self::Plp => 2,
            _ => match self.access() {
                Access::Read | Access::Write => match mode {
                    AddressingMode::Immediate
                    | AddressingMode::Implied
                    | AddressingMode::Accumulator => 0,
                    _ => 1,
                },
                Access::Rmw => 3,
                Access::None => 0,
            },
        }
    }
}

/// Input handed to an operation when its addressing mode completes.
#[derive(Debug, Clone, Copy)]
pub(crate) enum OpInput {
    /// Operand byte (immediate-style fetch).
    Operand(u8),
    /// Effective address.
    Address(u16),
    /// Register-only operation.
    Implied,
}

/// What an operation machine produced when advanced.
#[derive(Debug, Clone, Copy)]
pub(crate) enum OpOutcome {
    /// Another bus cycle to run.
    Cycle(Microcycle),
    /// Instruction complete; next cycle fetches.
    Done,
    /// KIL: instruction complete and the CPU is jammed.
    Halt,
}

/// A running operation micro-machine.
#[derive(Debug, Clone, Copy)]
pub(crate) struct OpMachine {
    op: Operation,
    step: u8,
    /// Effective address for memory operations.
    addr: u16,
    /// Data byte scratch (RMW original value, pulled/pushed bytes).
    data: u8,
}

impl OpMachine {
    pub(crate) const fn new(op: Operation) -> Self {
        Self {
            op,
            step: 0,
            addr: 0,
            data: 0,
        }
    }

    /// Take over from the addressing mode.
    pub(crate) fn begin(&mut self, st: &mut CpuState, input: OpInput) -> OpOutcome {
        match input {
            OpInput::Operand(value) => match self.op {
                // JSR interleaves with its operand fetch: the target low
                // byte arrives here, the high byte is read after the
                // return address is pushed.
                Operation::Jsr => {
                    self.data = value;
                    OpOutcome::Cycle(Microcycle::read(st.stack_addr()))
                }
                // BRK consumed (and discarded) its padding byte.
                Operation::Brk => {
                    let pch = (st.pc >> 8) as u8;
                    OpOutcome::Cycle(Microcycle::write(st.push(), pch))
                }
                _ => {
                    self.apply_read(st, value);
                    OpOutcome::Done
                }
            },
            OpInput::Address(addr) => {
                self.addr = addr;
                match self.op.access() {
                    Access::Read | Access::Rmw => OpOutcome::Cycle(Microcycle::read(addr)),
                    Access::Write => {
                        let value = self.store_value(st);
                        OpOutcome::Cycle(Microcycle::write(addr, value))
                    }
                    // JMP: the address is the whole result.
                    Access::None => {
                        st.pc = addr;
                        OpOutcome::Done
                    }
                }
            }
            OpInput::Implied => match self.op {
                Operation::Pha => {
                    let value = st.a;
                    OpOutcome::Cycle(Microcycle::write(st.push(), value))
                }
                Operation::Php => {
                    let value = st.flags.to_pushed(true);
                    OpOutcome::Cycle(Microcycle::write(st.push(), value))
                }
                // Dummy read at the stack while S increments.
                Operation::Pla | Operation::Plp => {
                    OpOutcome::Cycle(Microcycle::read(st.stack_addr()).polled(true))
                }
                Operation::Rts | Operation::Rti => {
                    OpOutcome::Cycle(Microcycle::read(st.stack_addr()))
                }
                Operation::Kil => OpOutcome::Halt,
                _ => {
                    self.apply_implied(st);
                    OpOutcome::Done
                }
            },
        }
    }

    /// Advance past the cycle the driver just serviced.
    pub(crate) fn advance(&mut self, st: &mut CpuState, value: u8) -> OpOutcome {
        self.step += 1;
        match self.op.access() {
            Access::Read => {
                self.apply_read(st, value);
                OpOutcome::Done
            }
            Access::Write => OpOutcome::Done,
            Access::Rmw => match self.step {
                1 => {
                    // Write the original value back while the ALU works.
                    self.data = value;
                    OpOutcome::Cycle(Microcycle::write(self.addr, value).polled(true))
                }
                2 => {
                    let original = self.data;
                    let modified = self.apply_rmw(st, original);
                    OpOutcome::Cycle(Microcycle::write(self.addr, modified))
                }
                _ => OpOutcome::Done,
            },
            Access::None => self.advance_flow(st, value),
        }
    }

    fn advance_flow(&mut self, st: &mut CpuState, value: u8) -> OpOutcome {
        match self.op {
            Operation::Jsr => match self.step {
                1 => {
                    let pch = (st.pc >> 8) as u8;
                    OpOutcome::Cycle(Microcycle::write(st.push(), pch))
                }
                2 => {
                    let pcl = st.pc as u8;
                    OpOutcome::Cycle(Microcycle::write(st.push(), pcl).polled(true))
                }
                3 => OpOutcome::Cycle(Microcycle::read(st.pc)),
                _ => {
                    st.pc = u16::from(value) << 8 | u16::from(self.data);
                    OpOutcome::Done
                }
            },
            Operation::Rts => match self.step {
                1 => OpOutcome::Cycle(Microcycle::read(st.pop())),
                2 => {
                    self.data = value;
                    OpOutcome::Cycle(Microcycle::read(st.pop()).polled(true))
                }
                3 => {
                    st.pc = u16::from(value) << 8 | u16::from(self.data);
                    // RTS returns to the pushed address plus one.
                    OpOutcome::Cycle(Microcycle::read(st.pc))
                }
                _ => {
                    st.pc = st.pc.wrapping_add(1);
                    OpOutcome::Done
                }
            },
            Operation::Rti => match self.step {
                1 => OpOutcome::Cycle(Microcycle::read(st.pop())),
                2 => {
                    st.flags = Flags::from_pulled(value);
                    OpOutcome::Cycle(Microcycle::read(st.pop()).polled(true))
                }
                3 => {
                    self.data = value;
                    OpOutcome::Cycle(Microcycle::read(st.pop()))
                }
                _ => {
                    st.pc = u16::from(value) << 8 | u16::from(self.data);
                    OpOutcome::Done
                }
            },
            Operation::Brk => match self.step {
                1 => {
                    let pcl = st.pc as u8;
                    OpOutcome::Cycle(Microcycle::write(st.push(), pcl))
                }
                2 => {
                    let pushed = st.flags.to_pushed(true);
                    OpOutcome::Cycle(Microcycle::write(st.push(), pushed))
                }
                3 => {
                    st.flags.set(flags::I);
                    OpOutcome::Cycle(Microcycle::read(0xFFFE).polled(true))
                }
                4 => {
                    self.data = value;
                    OpOutcome::Cycle(Microcycle::read(0xFFFF))
                }
                _ => {
                    st.pc = u16::from(value) << 8 | u16::from(self.data);
                    OpOutcome::Done
                }
            },
            Operation::Pha | Operation::Php => OpOutcome::Done,
            Operation::Pla => match self.step {
                1 => OpOutcome::Cycle(Microcycle::read(st.pop())),
                _ => {
                    st.a = value;
                    st.flags.update_nz(value);
                    OpOutcome::Done
                }
            },
            Operation::Plp => match self.step {
                1 => OpOutcome::Cycle(Microcycle::read(st.pop())),
                _ => {
                    st.flags = Flags::from_pulled(value);
                    OpOutcome::Done
                }
            },
            _ => unreachable!(),
        }
    }

    // =========================================================================
    // Appliers
    // =========================================================================

    fn apply_read(&mut self, st: &mut CpuState, m: u8) {
        match self.op {
            Operation::Lda => {
                st.a = m;
                st.flags.update_nz(m);
            }
            Operation::Ldx => {
                st.x = m;
                st.flags.update_nz(m);
            }
            Operation::Ldy => {
                st.y = m;
                st.flags.update_nz(m);
            }
            Operation::And => {
                st.a &= m;
                st.flags.update_nz(st.a);
            }
            Operation::Ora => {
                st.a |= m;
                st.flags.update_nz(st.a);
            }
            Operation::Eor => {
                st.a ^= m;
                st.flags.update_nz(st.a);
            }
            Operation::Adc => st.adc(m),
            Operation::Sbc => st.sbc(m),
            Operation::Cmp => st.compare(st.a, m),
            Operation::Cpx => st.compare(st.x, m),
            Operation::Cpy => st.compare(st.y, m),
            Operation::Bit => st.bit(m),
            Operation::Lax => {
                st.a = m;
                st.x = m;
                st.flags.update_nz(m);
            }
            Operation::Anc => {
                st.a &= m;
                st.flags.update_nz(st.a);
                let negative = st.flags.is_set(flags::N);
                st.flags.set_if(flags::C, negative);
            }
            Operation::Alr => {
                st.a &= m;
                let a = st.a;
                st.a = lsr(st, a);
            }
            Operation::Arr => arr(st, m),
            Operation::Axs => {
                let t = st.a & st.x;
                st.x = t.wrapping_sub(m);
                st.flags.set_if(flags::C, t >= m);
                let x = st.x;
                st.flags.update_nz(x);
            }
            Operation::Nop => {}
            _ => unreachable!(),
        }
    }

    fn store_value(&self, st: &CpuState) -> u8 {
        match self.op {
            Operation::Sta => st.a,
            Operation::Stx => st.x,
            Operation::Sty => st.y,
            Operation::Sax => st.a & st.x,
            _ => unreachable!(),
        }
    }

    fn apply_rmw(&mut self, st: &mut CpuState, v: u8) -> u8 {
        match self.op {
            Operation::Asl => asl(st, v),
            Operation::Lsr => lsr(st, v),
            Operation::Rol => rol(st, v),
            Operation::Ror => ror(st, v),
            Operation::Inc => inc(st, v),
            Operation::Dec => dec(st, v),
            Operation::Slo => {
                let r = asl(st, v);
                st.a |= r;
                let a = st.a;
                st.flags.update_nz(a);
                r
            }
            Operation::Rla => {
                let r = rol(st, v);
                st.a &= r;
                let a = st.a;
                st.flags.update_nz(a);
                r
            }
            Operation::Sre => {
                let r = lsr(st, v);
                st.a ^= r;
                let a = st.a;
                st.flags.update_nz(a);
                r
            }
            Operation::Rra => {
                // ROR's carry-out feeds straight into the ADC.
                let r = ror(st, v);
                st.adc(r);
                r
            }
            Operation::Dcp => {
                let r = v.wrapping_sub(1);
                st.compare(st.a, r);
                r
            }
            Operation::Isb => {
                let r = v.wrapping_add(1);
                st.sbc(r);
                r
            }
            _ => unreachable!(),
        }
    }

    fn apply_implied(&mut self, st: &mut CpuState) {
        match self.op {
            Operation::Tax => {
                st.x = st.a;
                let x = st.x;
                st.flags.update_nz(x);
            }
            Operation::Tay => {
                st.y = st.a;
                let y = st.y;
                st.flags.update_nz(y);
            }
            Operation::Txa => {
                st.a = st.x;
                let a = st.a;
                st.flags.update_nz(a);
            }
            Operation::Tya => {
                st.a = st.y;
                let a = st.a;
                st.flags.update_nz(a);
            }
            Operation::Tsx => {
                st.x = st.s;
                let x = st.x;
                st.flags.update_nz(x);
            }
            // TXS does not affect flags.
            Operation::Txs => st.s = st.x,
            Operation::Inx => {
                st.x = st.x.wrapping_add(1);
                let x = st.x;
                st.flags.update_nz(x);
            }
            Operation::Iny => {
                st.y = st.y.wrapping_add(1);
                let y = st.y;
                st.flags.update_nz(y);
            }
            Operation::Dex => {
                st.x = st.x.wrapping_sub(1);
                let x = st.x;
                st.flags.update_nz(x);
            }
            Operation::Dey => {
                st.y = st.y.wrapping_sub(1);
                let y = st.y;
                st.flags.update_nz(y);
            }
            Operation::Clc => st.flags.clear(flags::C),
            Operation::Sec => st.flags.set(flags::C),
            Operation::Cli => st.flags.clear(flags::I),
            Operation::Sei => st.flags.set(flags::I),
            Operation::Cld => st.flags.clear(flags::D),
            Operation::Sed => st.flags.set(flags::D),
            Operation::Clv => st.flags.clear(flags::V),
            Operation::AslA => {
                let a = st.a;
                st.a = asl(st, a);
            }
            Operation::LsrA => {
                let a = st.a;
                st.a = lsr(st, a);
            }
            Operation::RolA => {
                let a = st.a;
                st.a = rol(st, a);
            }
            Operation::RorA => {
                let a = st.a;
                st.a = ror(st, a);
            }
            Operation::Nop => {}
            _ => unreachable!(),
        }
    }
}

// =========================================================================
// Shared modify helpers
// =========================================================================

fn asl(st: &mut CpuState, v: u8) -> u8 {
    st.flags.set_if(flags::C, v & 0x80 != 0);
    let r = v << 1;
    st.flags.update_nz(r);
    r
}

fn lsr(st: &mut CpuState, v: u8) -> u8 {
    st.flags.set_if(flags::C, v & 0x01 != 0);
    let r = v >> 1;
    st.flags.update_nz(r);
    r
}

fn rol(st: &mut CpuState, v: u8) -> u8 {
    let carry = u8::from(st.flags.is_set(flags::C));
    st.flags.set_if(flags::C, v & 0x80 != 0);
    let r = (v << 1) | carry;
    st.flags.update_nz(r);
    r
}

fn ror(st: &mut CpuState, v: u8) -> u8 {
    let carry = if st.flags.is_set(flags::C) { 0x80 } else { 0 };
    st.flags.set_if(flags::C, v & 0x01 != 0);
    let r = (v >> 1) | carry;
    st.flags.update_nz(r);
    r
}

fn inc(st: &mut CpuState, v: u8) -> u8 {
    let r = v.wrapping_add(1);
    st.flags.update_nz(r);
    r
}

fn dec(st: &mut CpuState, v: u8) -> u8 {
    let r = v.wrapping_sub(1);
    st.flags.update_nz(r);
    r
}

/// ARR: AND then ROR, with its own flag rules and a BCD fix-up in decimal
/// mode.
fn arr(st: &mut CpuState, m: u8) {
    let t = st.a & m;
    let carry_in = st.flags.is_set(flags::C);
    let mut a = (t >> 1) | if carry_in { 0x80 } else { 0x00 };

    st.flags.set_if(flags::N, carry_in);
    st.flags.set_if(flags::Z, a == 0);
    st.flags.set_if(flags::V, (t ^ a) & 0x40 != 0);

    if st.flags.is_set(flags::D) {
        if (t & 0x0F) + (t & 0x01) > 0x05 {
            a = (a & 0xF0) | (a.wrapping_add(0x06) & 0x0F);
        }
        if u16::from(t & 0xF0) + u16::from(t & 0x10) > 0x50 {
            a = a.wrapping_add(0x60);
            st.flags.set(flags::C);
        } else {
            st.flags.clear(flags::C);
        }
    } else {
        st.flags.set_if(flags::C, a & 0x40 != 0);
    }
    st.a = a;
}
