//! The CPU driver.
//!
//! `cycle()` performs exactly one bus access and advances the running
//! micro-machine. The surrounding machine calls it once per CPU clock;
//! on a TIA-driven console that is once every three pixel clocks, with the
//! video chip observing the bus between calls.

use emu_core::{Bus, Rng};

use crate::flags::{self, Flags};
use crate::microcycle::{BusOp, Microcycle};
use crate::opcodes::{Executor, OPCODE_TABLE};
use crate::operations::OpOutcome;
use crate::state::CpuState;
use crate::vectors::{VectorKind, VectorMachine};

/// Hook invoked when the fetch stage reads an opcode with no table entry.
///
/// The hook must not re-enter the CPU; a host that wants to stop
/// emulation calls [`Mos6507::halt`] afterwards. With no hook installed
/// the driver stays in fetch and re-reads the same opcode every cycle.
pub type InvalidOpcodeHook = Box<dyn FnMut(u8)>;

/// Execution phase of the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Running the reset boot sequence.
    Boot,
    /// About to read an opcode.
    Fetch,
    /// Running an instruction or interrupt entry.
    Execute,
}

/// The micro-machine currently holding the bus.
#[derive(Debug, Clone, Copy)]
enum Running {
    Idle,
    Instruction(Executor),
    Vector(VectorMachine),
}

/// The MOS 6507/6502 CPU.
///
/// The 6507 is the 6502 die in a 28-pin package; this core models the full
/// part, including the interrupt lines the small package does not bond
/// out, so it serves both the TIA console and full-size 6502 machines.
pub struct Mos6507 {
    /// CPU registers. Hosts may observe freely; mutating outside of test
    /// setup breaks the machinery's invariants.
    pub state: CpuState,

    phase: Phase,
    running: Running,
    /// The pending bus access, serviced by the next `cycle()`.
    current: Option<Microcycle>,

    halted: bool,
    /// Level-sensitive IRQ line, sampled by the interrupt poll.
    irq_line: bool,
    /// Edge-triggered NMI request, consumed by the interrupt poll.
    nmi_latch: bool,
    /// The running instruction already had its interrupt poll.
    polled: bool,

    /// `pc` at the start of the most recent fetch.
    last_fetch_pc: u16,
    total_cycles: u64,

    rng: Option<Box<dyn Rng>>,
    invalid_opcode_hook: Option<InvalidOpcodeHook>,
}

impl Default for Mos6507 {
    fn default() -> Self {
        Self::new()
    }
}

impl Mos6507 {
    /// Create a CPU with zeroed power-on state, ready to fetch.
    ///
    /// Most hosts call [`reset`](Self::reset) next; tests that want full
    /// control set `state.pc` directly and start cycling.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: CpuState::new(),
            phase: Phase::Fetch,
            running: Running::Idle,
            current: None,
            halted: false,
            irq_line: false,
            nmi_latch: false,
            polled: false,
            last_fetch_pc: 0,
            total_cycles: 0,
            rng: None,
            invalid_opcode_hook: None,
        }
    }

    /// Create a CPU whose reset scrambles the registers from `rng`.
    #[must_use]
    pub fn with_rng(rng: Box<dyn Rng>) -> Self {
        let mut cpu = Self::new();
        cpu.rng = Some(rng);
        cpu
    }

    /// Advance one bus cycle.
    pub fn cycle<B: Bus>(&mut self, bus: &mut B) {
        // A halted CPU swallows reads (the clock keeps running for the
        // rest of the machine) but still drains a pending write.
        if self.halted && !self.write_pending() {
            return;
        }
        self.total_cycles += 1;

        match self.phase {
            Phase::Fetch => self.fetch(bus),
            Phase::Boot | Phase::Execute => self.step_machine(bus),
        }
    }

    /// Reset: scramble or zero the registers, then start the boot
    /// sequence. The scrambled `pc` is overwritten by the reset vector
    /// seven cycles later and never surfaces to observers.
    pub fn reset(&mut self) {
        match self.rng.as_mut() {
            Some(rng) => {
                self.state.a = rng.int(0xFF) as u8;
                self.state.x = rng.int(0xFF) as u8;
                self.state.y = rng.int(0xFF) as u8;
                self.state.pc = rng.int(0xFFFF) as u16;
                self.state.flags = Flags::from_pulled(rng.int(0xFF) as u8 | flags::I);
            }
            None => {
                self.state.a = 0;
                self.state.x = 0;
                self.state.y = 0;
                self.state.pc = 0;
                self.state.flags = Flags(flags::E | flags::I);
            }
        }
        self.state.s = 0xFD;
        self.state.irq = false;
        self.state.nmi = false;
        self.irq_line = false;
        self.nmi_latch = false;
        self.halted = false;
        self.polled = false;

        let (boot, first) = VectorMachine::begin(VectorKind::Reset, &self.state);
        self.running = Running::Vector(boot);
        self.current = Some(first);
        self.phase = Phase::Boot;
    }

    /// Drive the level-sensitive IRQ line.
    pub fn set_irq(&mut self, asserted: bool) {
        self.irq_line = asserted;
    }

    /// Current state of the IRQ line.
    #[must_use]
    pub fn irq_asserted(&self) -> bool {
        self.irq_line
    }

    /// Raise a non-maskable interrupt (edge-triggered latch).
    pub fn nmi(&mut self) {
        self.nmi_latch = true;
    }

    /// Freeze execution. Reads stop reaching the bus; a pending write is
    /// still issued.
    pub fn halt(&mut self) {
        self.halted = true;
    }

    /// Undo [`halt`](Self::halt) (and un-jam a KIL'd CPU).
    pub fn resume(&mut self) {
        self.halted = false;
    }

    /// True if the CPU is halted.
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Install or remove the invalid-opcode hook.
    pub fn set_invalid_opcode_hook(&mut self, hook: Option<InvalidOpcodeHook>) {
        self.invalid_opcode_hook = hook;
    }

    /// True if an invalid-opcode hook is installed.
    #[must_use]
    pub fn invalid_opcode_hook_installed(&self) -> bool {
        self.invalid_opcode_hook.is_some()
    }

    /// `pc` at the start of the most recent fetch. Hosts use this for
    /// disassembly displays.
    #[must_use]
    pub fn last_instruction_pc(&self) -> u16 {
        self.last_fetch_pc
    }

    /// True when the next cycle will fetch an opcode.
    #[must_use]
    pub fn is_instruction_boundary(&self) -> bool {
        self.phase == Phase::Fetch
    }

    /// Total cycles executed (halted cycles don't count).
    #[must_use]
    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    /// Current program counter.
    #[must_use]
    pub fn pc(&self) -> u16 {
        self.state.pc
    }

    fn write_pending(&self) -> bool {
        matches!(&self.current, Some(mc) if mc.bus.is_write())
    }

    /// Fetch stage: poll interrupts if the finished instruction didn't,
    /// read the opcode, then deliver a pending interrupt or dispatch.
    fn fetch<B: Bus>(&mut self, bus: &mut B) {
        if !self.polled {
            self.poll_interrupts();
        }
        self.polled = false;

        self.last_fetch_pc = self.state.pc;
        let opcode = bus.read(self.state.pc);

        // NMI always wins; neither entry advances pc, so the interrupted
        // instruction is the one pushed.
        if self.state.nmi {
            self.state.nmi = false;
            self.start_vector(VectorKind::Nmi);
            return;
        }
        if self.state.irq && !self.state.flags.is_set(flags::I) {
            self.state.irq = false;
            self.start_vector(VectorKind::Irq);
            return;
        }

        match OPCODE_TABLE[opcode as usize] {
            Some(instr) => {
                self.state.pc = self.state.pc.wrapping_add(1);
                let (exec, first) = Executor::begin(instr, &self.state);
                self.running = Running::Instruction(exec);
                self.current = Some(first);
                self.phase = Phase::Execute;
            }
            None => {
                // Stay in fetch with pc unchanged: the next cycle re-reads
                // the same opcode, which keeps the fault visible to hosts
                // that poll the hook lazily.
                if let Some(hook) = self.invalid_opcode_hook.as_mut() {
                    hook(opcode);
                }
            }
        }
    }

    fn start_vector(&mut self, kind: VectorKind) {
        let (entry, first) = VectorMachine::begin(kind, &self.state);
        self.running = Running::Vector(entry);
        self.current = Some(first);
        self.phase = Phase::Execute;
    }

    /// Execute stage: service the pending bus access, honor its poll mark,
    /// then advance the running micro-machine.
    fn step_machine<B: Bus>(&mut self, bus: &mut B) {
        let Some(mc) = self.current.take() else {
            unreachable!("execute phase without a pending microcycle");
        };

        let value = match mc.bus {
            BusOp::Read(addr) => bus.read(addr),
            BusOp::Write(addr, value) => {
                bus.write(addr, value);
                value
            }
        };

        if mc.poll_interrupts {
            self.poll_interrupts();
            self.polled = true;
        }

        let next = match &mut self.running {
            Running::Instruction(exec) => match exec.advance(&mut self.state, value) {
                OpOutcome::Cycle(mc) => Some(mc),
                OpOutcome::Done => None,
                OpOutcome::Halt => {
                    self.halted = true;
                    None
                }
            },
            Running::Vector(entry) => entry.advance(&mut self.state, value),
            Running::Idle => unreachable!(),
        };

        match next {
            Some(mc) => self.current = Some(mc),
            None => {
                self.running = Running::Idle;
                self.phase = Phase::Fetch;
            }
        }
    }

    /// The interrupt poll: promote the external request latches into the
    /// in-flight state the fetch stage consumes. NMI is edge-triggered and
    /// always wins; IRQ is level-sensitive and re-evaluated on every poll,
    /// so dropping the line before the poll cancels the interrupt.
    fn poll_interrupts(&mut self) {
        self.state.irq = false;
        if self.nmi_latch {
            self.state.nmi = true;
            self.nmi_latch = false;
        } else if self.irq_line && !self.state.nmi && !self.state.flags.is_set(flags::I) {
            self.state.irq = true;
        }
    }
}

impl emu_core::Cpu for Mos6507 {
    fn cycle<B: Bus>(&mut self, bus: &mut B) {
        Self::cycle(self, bus);
    }

    fn reset(&mut self) {
        Self::reset(self);
    }

    fn pc(&self) -> u16 {
        self.state.pc
    }

    fn is_halted(&self) -> bool {
        self.halted
    }

    fn set_irq(&mut self, asserted: bool) {
        Self::set_irq(self, asserted);
    }

    fn nmi(&mut self) {
        Self::nmi(self);
    }
}
