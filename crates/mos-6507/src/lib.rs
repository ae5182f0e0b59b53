//! Cycle-accurate MOS 6507/6502 CPU core.
//!
//! The 6502 has no "instruction step": its fundamental unit of time is the
//! bus cycle, one read or write per clock. Each call to
//! [`Mos6507::cycle`] performs exactly one bus access and advances an
//! internal micro-machine, so hardware clocked against the CPU (a TIA
//! stepped at three pixels per CPU cycle, say) can observe and react at
//! sub-instruction granularity.
//!
//! Instructions are composed from two micro-machines: an addressing mode
//! (computes the operand or effective address over 0-4 cycles, including
//! every dummy read the real part performs) and an operation (the
//! remaining data and stack traffic). A 256-entry compile-time table maps
//! opcodes to compositions, covering the documented set plus the stable
//! undocumented opcodes.
//!
//! Interrupts follow the NMOS polling discipline: the lines are sampled on
//! the penultimate cycle of an instruction (or at the next fetch when that
//! cycle can't be known in advance), NMI is edge-triggered and always
//! wins, IRQ is level-sensitive and masked by I.

mod addressing;
mod cpu;
pub mod flags;
mod microcycle;
mod opcodes;
mod operations;
mod state;
mod vectors;

pub use addressing::AddressingMode;
pub use cpu::{InvalidOpcodeHook, Mos6507};
pub use flags::Flags;
pub use microcycle::{BusOp, Microcycle};
pub use opcodes::Instruction;
pub use operations::{Cond, Operation};
pub use state::CpuState;
