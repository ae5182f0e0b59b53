//! Addressing-mode micro-machines.
//!
//! The 6502 has 13 addressing modes:
//! - Implied: no operand (e.g., CLC, RTS)
//! - Accumulator: operates on A (e.g., ASL A)
//! - Immediate: #$nn (literal value)
//! - Zero Page: $nn (8-bit address in page zero)
//! - Zero Page,X / Zero Page,Y: $nn,X ($nn,Y), wraps within page zero
//! - Absolute: $nnnn (16-bit address)
//! - Absolute,X / Absolute,Y: $nnnn,X ($nnnn,Y), may cross a page
//! - Indirect: ($nnnn) (JMP only, buggy page boundary behavior)
//! - Indexed Indirect: ($nn,X) (pointer in zero page indexed by X)
//! - Indirect Indexed: ($nn),Y (zero page pointer plus Y)
//! - Relative: branch offset (-128 to +127)
//!
//! Each mode is a micro-machine advanced one bus cycle at a time. On
//! completion it hands the following operation either the fetched operand
//! byte, the effective address, or nothing (implied forms). The indexed
//! modes own the page-cross fix-up rule: reads pay the extra dummy read
//! only when the high byte changes, writes and read-modify-writes always
//! pay it (the CPU has to put *some* address on the bus while it adds the
//! carry into the high byte).

use crate::microcycle::Microcycle;
use crate::state::CpuState;

/// The thirteen 6502 addressing modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    /// ($nn,X)
    IndexedIndirect,
    /// ($nn),Y
    IndirectIndexed,
    /// ($nnnn), JMP only.
    Indirect,
    Relative,
}

/// What a mode machine produced when advanced.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ModeOutcome {
    /// Another bus cycle to run.
    Cycle(Microcycle),
    /// Operand byte in hand (immediate-style fetch).
    Operand(u8),
    /// Effective address computed; the operation performs its own access.
    Address(u16),
    /// Dummy read done; the operation acts on registers only.
    Implied,
    /// The mode consumed the whole instruction (branches).
    Done,
}

/// A running addressing-mode micro-machine.
///
/// `tail` is the number of bus cycles the composed operation contributes
/// after the mode completes; the machine uses it to place the
/// interrupt-poll mark on the cycle it can statically identify as
/// penultimate. Dynamic tails (indexed reads before the page-cross
/// decision, branches) leave the mark off and rely on the driver's
/// fetch-time fallback poll.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ModeMachine {
    mode: AddressingMode,
    step: u8,
    /// Zero-page pointer scratch.
    ptr: u8,
    /// Address low byte scratch.
    lo: u8,
    /// Base address before indexing.
    base: u16,
    /// Effective address once known.
    addr: u16,
    /// Branch condition outcome (relative mode only).
    taken: bool,
    /// Indexed modes: always perform the fix-up read (writes and RMW).
    always_fixup: bool,
    /// Bus cycles the operation adds after this mode completes.
    tail: u8,
}

impl ModeMachine {
    /// Start the mode machine; returns the machine and the first cycle
    /// after the opcode fetch. `pc` already points past the opcode.
    pub(crate) fn begin(
        mode: AddressingMode,
        always_fixup: bool,
        tail: u8,
        taken: bool,
        st: &CpuState,
    ) -> (Self, Microcycle) {
        let machine = Self {
            mode,
            step: 0,
            ptr: 0,
            lo: 0,
            base: 0,
            addr: 0,
            taken,
            always_fixup,
            tail,
        };

        // Every mode opens by putting `pc` on the bus: the operand (or a
        // dummy in the implied forms). Statically-penultimate openings get
        // the poll mark.
        let poll = match mode {
            AddressingMode::Implied
            | AddressingMode::Accumulator
            | AddressingMode::Immediate
            | AddressingMode::ZeroPage => tail == 1,
            AddressingMode::Absolute => tail == 0,
            _ => false,
        };
        (machine, Microcycle::read(st.pc).polled(poll))
    }

    /// Advance past the cycle the driver just serviced. `value` is the
    /// byte the bus returned.
    pub(crate) fn advance(&mut self, st: &mut CpuState, value: u8) -> ModeOutcome {
        self.step += 1;
        match self.mode {
            AddressingMode::Implied | AddressingMode::Accumulator => ModeOutcome::Implied,

            AddressingMode::Immediate => {
                st.pc = st.pc.wrapping_add(1);
                ModeOutcome::Operand(value)
            }

            AddressingMode::ZeroPage => {
                st.pc = st.pc.wrapping_add(1);
                ModeOutcome::Address(u16::from(value))
            }

            AddressingMode::ZeroPageX | AddressingMode::ZeroPageY => match self.step {
                1 => {
                    st.pc = st.pc.wrapping_add(1);
                    self.ptr = value;
                    // Dummy read at the unindexed address while the CPU
                    // adds the index.
                    ModeOutcome::Cycle(Microcycle::read(u16::from(self.ptr)).polled(self.tail == 1))
                }
                _ => {
                    let index = if self.mode == AddressingMode::ZeroPageX {
                        st.x
                    } else {
                        st.y
                    };
                    ModeOutcome::Address(u16::from(self.ptr.wrapping_add(index)))
                }
            },

            AddressingMode::Absolute => match self.step {
                1 => {
                    st.pc = st.pc.wrapping_add(1);
                    self.lo = value;
                    ModeOutcome::Cycle(Microcycle::read(st.pc).polled(self.tail == 1))
                }
                _ => {
                    st.pc = st.pc.wrapping_add(1);
                    ModeOutcome::Address(u16::from(value) << 8 | u16::from(self.lo))
                }
            },

            AddressingMode::AbsoluteX | AddressingMode::AbsoluteY => match self.step {
                1 => {
                    st.pc = st.pc.wrapping_add(1);
                    self.lo = value;
                    ModeOutcome::Cycle(Microcycle::read(st.pc))
                }
                2 => {
                    st.pc = st.pc.wrapping_add(1);
                    let index = if self.mode == AddressingMode::AbsoluteX {
                        st.x
                    } else {
                        st.y
                    };
                    self.base = u16::from(value) << 8 | u16::from(self.lo);
                    self.addr = self.base.wrapping_add(u16::from(index));
                    self.fixup_or_finish()
                }
                _ => ModeOutcome::Address(self.addr),
            },

            AddressingMode::IndexedIndirect => match self.step {
                1 => {
                    st.pc = st.pc.wrapping_add(1);
                    self.ptr = value;
                    // Dummy read at the unindexed pointer.
                    ModeOutcome::Cycle(Microcycle::read(u16::from(self.ptr)))
                }
                2 => {
                    self.ptr = self.ptr.wrapping_add(st.x);
                    ModeOutcome::Cycle(Microcycle::read(u16::from(self.ptr)))
                }
                3 => {
                    self.lo = value;
                    // High pointer byte wraps within page zero.
                    ModeOutcome::Cycle(
                        Microcycle::read(u16::from(self.ptr.wrapping_add(1)))
                            .polled(self.tail == 1),
                    )
                }
                _ => ModeOutcome::Address(u16::from(value) << 8 | u16::from(self.lo)),
            },

            AddressingMode::IndirectIndexed => match self.step {
                1 => {
                    st.pc = st.pc.wrapping_add(1);
                    self.ptr = value;
                    ModeOutcome::Cycle(Microcycle::read(u16::from(self.ptr)))
                }
                2 => {
                    self.lo = value;
                    ModeOutcome::Cycle(Microcycle::read(u16::from(self.ptr.wrapping_add(1))))
                }
                3 => {
                    self.base = u16::from(value) << 8 | u16::from(self.lo);
                    self.addr = self.base.wrapping_add(u16::from(st.y));
                    self.fixup_or_finish()
                }
                _ => ModeOutcome::Address(self.addr),
            },

            AddressingMode::Indirect => match self.step {
                1 => {
                    st.pc = st.pc.wrapping_add(1);
                    self.lo = value;
                    ModeOutcome::Cycle(Microcycle::read(st.pc))
                }
                2 => {
                    st.pc = st.pc.wrapping_add(1);
                    self.base = u16::from(value) << 8 | u16::from(self.lo);
                    ModeOutcome::Cycle(Microcycle::read(self.base).polled(self.tail == 0))
                }
                3 => {
                    self.lo = value;
                    // 6502 bug: the high byte of the target comes from the
                    // same page as the low byte.
                    let hi_addr = (self.base & 0xFF00) | (self.base.wrapping_add(1) & 0x00FF);
                    ModeOutcome::Cycle(Microcycle::read(hi_addr))
                }
                _ => ModeOutcome::Address(u16::from(value) << 8 | u16::from(self.lo)),
            },

            AddressingMode::Relative => match self.step {
                1 => {
                    st.pc = st.pc.wrapping_add(1);
                    if self.taken {
                        self.lo = value;
                        // Dummy read at the pre-add pc.
                        ModeOutcome::Cycle(Microcycle::read(st.pc))
                    } else {
                        ModeOutcome::Done
                    }
                }
                2 => {
                    let offset = i16::from(self.lo as i8);
                    let target = st.pc.wrapping_add(offset as u16);
                    if (target ^ st.pc) & 0xFF00 == 0 {
                        st.pc = target;
                        ModeOutcome::Done
                    } else {
                        self.addr = target;
                        // One more dummy read at the not-yet-fixed-up
                        // address (old high byte, new low byte).
                        ModeOutcome::Cycle(Microcycle::read(
                            (st.pc & 0xFF00) | (target & 0x00FF),
                        ))
                    }
                }
                _ => {
                    st.pc = self.addr;
                    ModeOutcome::Done
                }
            },
        }
    }

    /// Indexed modes after the high byte arrives: emit the fix-up read if
    /// this access class always pays it or the page was crossed, otherwise
    /// finish with the effective address.
    fn fixup_or_finish(&mut self) -> ModeOutcome {
        let crossed = (self.base ^ self.addr) & 0xFF00 != 0;
        if self.always_fixup || crossed {
            let wrong = (self.base & 0xFF00) | (self.addr & 0x00FF);
            ModeOutcome::Cycle(Microcycle::read(wrong).polled(self.tail == 1))
        } else {
            ModeOutcome::Address(self.addr)
        }
    }
}
