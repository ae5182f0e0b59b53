//! Unit tests for instruction behavior.

use emu_core::{Bus, SimpleBus};
use mos_6507::{flags, Mos6507};

/// Run one complete instruction (fetch + execute cycles).
fn run_instruction(cpu: &mut Mos6507, bus: &mut SimpleBus) {
    cpu.cycle(bus);

    for _ in 0..20 {
        if cpu.is_instruction_boundary() {
            return;
        }
        cpu.cycle(bus);
    }
    panic!("Instruction did not complete within 20 cycles");
}

/// Load a program at $0200 and point the CPU there.
fn setup_program(bus: &mut SimpleBus, cpu: &mut Mos6507, program: &[u8]) {
    bus.load(0x0200, program);
    cpu.state.pc = 0x0200;
}

#[test]
fn lda_adc_immediate_sequence() {
    // Scenario: A9 05 69 03.
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6507::new();
    setup_program(&mut bus, &mut cpu, &[0xA9, 0x05, 0x69, 0x03]);

    cpu.cycle(&mut bus);
    cpu.cycle(&mut bus);
    assert_eq!(cpu.state.a, 0x05);
    assert!(!cpu.state.flags.is_set(flags::N));
    assert!(!cpu.state.flags.is_set(flags::Z));

    cpu.cycle(&mut bus);
    cpu.cycle(&mut bus);
    assert_eq!(cpu.state.a, 0x08);
    assert!(!cpu.state.flags.is_set(flags::C));
    assert!(!cpu.state.flags.is_set(flags::V));
    assert!(!cpu.state.flags.is_set(flags::N));
    assert!(!cpu.state.flags.is_set(flags::Z));
}

#[test]
fn txs_does_not_touch_flags() {
    // Scenario: A2 FF 9A.
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6507::new();
    setup_program(&mut bus, &mut cpu, &[0xA2, 0xFF, 0x9A]);

    cpu.cycle(&mut bus);
    cpu.cycle(&mut bus);
    assert_eq!(cpu.state.x, 0xFF);
    let flags_after_ldx = cpu.state.flags;

    cpu.cycle(&mut bus);
    cpu.cycle(&mut bus);
    assert_eq!(cpu.state.x, 0xFF);
    assert_eq!(cpu.state.s, 0xFF);
    assert_eq!(
        cpu.state.flags, flags_after_ldx,
        "TXS must leave the flags alone"
    );
}

#[test]
fn adc_decimal_mode() {
    // Scenario: F8 A9 09 69 01 gives A=$10 in BCD.
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6507::new();
    setup_program(&mut bus, &mut cpu, &[0xF8, 0xA9, 0x09, 0x69, 0x01]);

    for _ in 0..3 {
        run_instruction(&mut cpu, &mut bus);
    }

    assert_eq!(cpu.state.a, 0x10);
    assert!(!cpu.state.flags.is_set(flags::C));
}

#[test]
fn jmp_indirect_page_wrap() {
    // 6C FF 10 at $1000 with the pointer straddling a page: the target
    // high byte is read from $1000, not $1100. $1000 also holds the JMP
    // opcode, so swap in the pointer byte once the opcode has been
    // fetched - legal at this granularity, one bus access per cycle.
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6507::new();
    bus.load(0x1000, &[0x6C, 0xFF, 0x10]);
    bus.write(0x10FF, 0x34);
    cpu.state.pc = 0x1000;

    cpu.cycle(&mut bus); // opcode fetched
    bus.write(0x1000, 0x12);
    for _ in 0..4 {
        cpu.cycle(&mut bus);
    }

    assert_eq!(cpu.state.pc, 0x1234);
    assert!(cpu.is_instruction_boundary());
}

#[test]
fn jmp_indirect_page_wrap_clean_pointer() {
    // Same bug with a pointer page that doesn't alias the instruction:
    // pointer at $02FF, high byte read from $0200.
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6507::new();
    setup_program(&mut bus, &mut cpu, &[0x6C, 0xFF, 0x02]);
    bus.write(0x02FF, 0x34);
    bus.write(0x0200, 0x12);

    for _ in 0..5 {
        cpu.cycle(&mut bus);
    }
    assert_eq!(cpu.state.pc, 0x1234);
}

#[test]
fn stack_pha_pla() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6507::new();

    // LDA #$42; LDX #$FF; TXS; PHA; LDA #$00; PLA
    let program = [
        0xA9, 0x42, // LDA #$42
        0xA2, 0xFF, // LDX #$FF
        0x9A, // TXS
        0x48, // PHA
        0xA9, 0x00, // LDA #$00
        0x68, // PLA
    ];
    setup_program(&mut bus, &mut cpu, &program);

    for _ in 0..6 {
        run_instruction(&mut cpu, &mut bus);
    }

    assert_eq!(cpu.state.a, 0x42, "PLA should restore A");
    assert_eq!(cpu.state.s, 0xFF, "SP should be back to $FF after PLA");
    assert!(!cpu.state.flags.is_set(flags::Z));
    assert!(!cpu.state.flags.is_set(flags::N));
}

#[test]
fn pla_sets_nz_from_restored_value() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6507::new();

    let program = [
        0xA9, 0x80, // LDA #$80
        0x48, // PHA
        0xA9, 0x01, // LDA #$01
        0x68, // PLA
    ];
    setup_program(&mut bus, &mut cpu, &program);

    for _ in 0..4 {
        run_instruction(&mut cpu, &mut bus);
    }

    assert_eq!(cpu.state.a, 0x80);
    assert!(cpu.state.flags.is_set(flags::N));
    assert!(!cpu.state.flags.is_set(flags::Z));
}

#[test]
fn stack_php_plp() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6507::new();

    // LDX #$FF; TXS; SEC; PHP; CLC; PLP
    let program = [
        0xA2, 0xFF, // LDX #$FF
        0x9A, // TXS
        0x38, // SEC
        0x08, // PHP
        0x18, // CLC
        0x28, // PLP
    ];
    setup_program(&mut bus, &mut cpu, &program);

    for _ in 0..6 {
        run_instruction(&mut cpu, &mut bus);
    }

    assert!(
        cpu.state.flags.is_set(flags::C),
        "PLP should restore the carry flag"
    );
    assert_eq!(cpu.state.s, 0xFF);
    // The pushed byte had B and E set; the live register must not hold B.
    assert_eq!(bus.peek(0x01FF) & 0x30, 0x30);
    assert_eq!(cpu.state.flags.bits() & flags::B, 0);
    assert_ne!(cpu.state.flags.bits() & flags::E, 0);
}

#[test]
fn php_pushes_b_and_e() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6507::new();

    let program = [
        0xA2, 0xFF, // LDX #$FF
        0x9A, // TXS
        0x08, // PHP
    ];
    setup_program(&mut bus, &mut cpu, &program);

    for _ in 0..3 {
        run_instruction(&mut cpu, &mut bus);
    }

    let pushed = bus.peek(0x01FF);
    assert_eq!(pushed & 0x30, 0x30, "PHP pushes with B and E set");
}

#[test]
fn jsr_rts_round_trip() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6507::new();

    // $0200: JSR $0300; LDA #$01
    // $0300: RTS
    let program = [
        0x20, 0x00, 0x03, // JSR $0300
        0xA9, 0x01, // LDA #$01
    ];
    setup_program(&mut bus, &mut cpu, &program);
    bus.write(0x0300, 0x60); // RTS
    cpu.state.s = 0xFF;

    run_instruction(&mut cpu, &mut bus); // JSR
    assert_eq!(cpu.state.pc, 0x0300);
    // The pushed return address points at the last byte of the JSR.
    assert_eq!(bus.peek(0x01FF), 0x02);
    assert_eq!(bus.peek(0x01FE), 0x02);

    run_instruction(&mut cpu, &mut bus); // RTS
    assert_eq!(cpu.state.pc, 0x0203, "RTS lands on the instruction after JSR");
    assert_eq!(cpu.state.s, 0xFF);

    run_instruction(&mut cpu, &mut bus); // LDA #$01
    assert_eq!(cpu.state.a, 0x01);
}

#[test]
fn brk_stack_layout() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6507::new();

    bus.write(0xFFFE, 0x00);
    bus.write(0xFFFF, 0x03);

    // LDX #$FF; TXS; CLI; BRK; NOP padding
    let program = [
        0xA2, 0xFF, // LDX #$FF    @ $0200
        0x9A, // TXS         @ $0202
        0x58, // CLI         @ $0203
        0x00, // BRK         @ $0204
        0xEA, // padding     @ $0205 (skipped)
    ];
    setup_program(&mut bus, &mut cpu, &program);

    for _ in 0..4 {
        run_instruction(&mut cpu, &mut bus);
    }

    assert_eq!(cpu.state.pc, 0x0300, "PC should be at the BRK vector target");
    assert_eq!(cpu.state.s, 0xFC, "three pushes from $FF");
    assert!(cpu.state.flags.is_set(flags::I), "BRK sets I");

    let pushed_pch = bus.peek(0x01FF);
    let pushed_pcl = bus.peek(0x01FE);
    let pushed_p = bus.peek(0x01FD);

    // BRK is a two-byte instruction: return address skips the padding.
    assert_eq!(pushed_pch, 0x02);
    assert_eq!(pushed_pcl, 0x06);
    assert_eq!(pushed_p & 0x30, 0x30, "pushed flags carry B and E");
    assert_eq!(pushed_p & flags::I, 0, "I was clear when BRK pushed");
}

#[test]
fn rti_restores_flags_and_pc() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6507::new();

    bus.write(0xFFFE, 0x00);
    bus.write(0xFFFF, 0x03);

    // Main: SEC; BRK; (padding); LDA #$07
    let program = [
        0x38, // SEC       @ $0200
        0x00, // BRK       @ $0201
        0xEA, // padding   @ $0202
        0xA9, 0x07, // LDA #$07  @ $0203
    ];
    setup_program(&mut bus, &mut cpu, &program);
    bus.write(0x0300, 0x18); // CLC in the handler
    bus.write(0x0301, 0x40); // RTI
    cpu.state.s = 0xFF;

    run_instruction(&mut cpu, &mut bus); // SEC
    run_instruction(&mut cpu, &mut bus); // BRK
    assert_eq!(cpu.state.pc, 0x0300);

    run_instruction(&mut cpu, &mut bus); // CLC
    assert!(!cpu.state.flags.is_set(flags::C));

    run_instruction(&mut cpu, &mut bus); // RTI
    assert_eq!(cpu.state.pc, 0x0203, "RTI returns past the padding byte");
    assert!(cpu.state.flags.is_set(flags::C), "RTI restored the pushed C");
    assert_eq!(cpu.state.flags.bits() & flags::B, 0);

    run_instruction(&mut cpu, &mut bus); // LDA #$07
    assert_eq!(cpu.state.a, 0x07);
}

#[test]
fn zero_page_x_wraps() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6507::new();

    // LDX #$02; LDA $FF,X  -> reads $0001, not $0101
    let program = [0xA2, 0x02, 0xB5, 0xFF];
    setup_program(&mut bus, &mut cpu, &program);
    bus.write(0x0001, 0xAB);
    bus.write(0x0101, 0xCD);

    run_instruction(&mut cpu, &mut bus);
    run_instruction(&mut cpu, &mut bus);

    assert_eq!(cpu.state.a, 0xAB);
}

#[test]
fn indexed_indirect_wraps_in_zero_page() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6507::new();

    // LDX #$03; LDA ($FE,X): pointer at $01/$02.
    let program = [0xA2, 0x03, 0xA1, 0xFE];
    setup_program(&mut bus, &mut cpu, &program);
    bus.write(0x0001, 0x20);
    bus.write(0x0002, 0x13);
    bus.write(0x1320, 0x5A);

    run_instruction(&mut cpu, &mut bus);
    run_instruction(&mut cpu, &mut bus);

    assert_eq!(cpu.state.a, 0x5A);
}

#[test]
fn indirect_indexed_reads_through_pointer() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6507::new();

    // LDY #$10; LDA ($40),Y
    let program = [0xA0, 0x10, 0xB1, 0x40];
    setup_program(&mut bus, &mut cpu, &program);
    bus.write(0x0040, 0x00);
    bus.write(0x0041, 0x30);
    bus.write(0x3010, 0x77);

    run_instruction(&mut cpu, &mut bus);
    run_instruction(&mut cpu, &mut bus);

    assert_eq!(cpu.state.a, 0x77);
}

#[test]
fn cmp_family_flags() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6507::new();

    // LDA #$40; CMP #$41
    setup_program(&mut bus, &mut cpu, &[0xA9, 0x40, 0xC9, 0x41]);
    run_instruction(&mut cpu, &mut bus);
    run_instruction(&mut cpu, &mut bus);

    assert!(!cpu.state.flags.is_set(flags::C));
    assert!(!cpu.state.flags.is_set(flags::Z));
    assert!(cpu.state.flags.is_set(flags::N), "0x40 - 0x41 = 0xFF");
}

#[test]
fn bit_flags() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6507::new();

    // LDA #$01; BIT $10 with $10 = $C0
    setup_program(&mut bus, &mut cpu, &[0xA9, 0x01, 0x24, 0x10]);
    bus.write(0x0010, 0xC0);

    run_instruction(&mut cpu, &mut bus);
    run_instruction(&mut cpu, &mut bus);

    assert!(cpu.state.flags.is_set(flags::N));
    assert!(cpu.state.flags.is_set(flags::V));
    assert!(cpu.state.flags.is_set(flags::Z), "A & m == 0");
}

#[test]
fn rmw_shifts_on_memory_and_accumulator() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6507::new();

    // ASL $10; LDA #$81; LSR A
    setup_program(&mut bus, &mut cpu, &[0x06, 0x10, 0xA9, 0x81, 0x4A]);
    bus.write(0x0010, 0x81);

    run_instruction(&mut cpu, &mut bus); // ASL $10
    assert_eq!(bus.peek(0x0010), 0x02);
    assert!(cpu.state.flags.is_set(flags::C));

    run_instruction(&mut cpu, &mut bus); // LDA #$81
    run_instruction(&mut cpu, &mut bus); // LSR A
    assert_eq!(cpu.state.a, 0x40);
    assert!(cpu.state.flags.is_set(flags::C), "bit 0 went into carry");
}

#[test]
fn lax_loads_a_and_x() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6507::new();

    setup_program(&mut bus, &mut cpu, &[0xA7, 0x10]); // LAX $10
    bus.write(0x0010, 0x8F);

    run_instruction(&mut cpu, &mut bus);

    assert_eq!(cpu.state.a, 0x8F);
    assert_eq!(cpu.state.x, 0x8F);
    assert!(cpu.state.flags.is_set(flags::N));
}

#[test]
fn sax_stores_a_and_x() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6507::new();

    // LDA #$F0; LDX #$0F; SAX $10
    setup_program(&mut bus, &mut cpu, &[0xA9, 0xF0, 0xA2, 0x0F, 0x87, 0x10]);

    for _ in 0..3 {
        run_instruction(&mut cpu, &mut bus);
    }

    assert_eq!(bus.peek(0x0010), 0x00);
    // SAX sets no flags; N is still from LDX.
    assert!(!cpu.state.flags.is_set(flags::Z));
}

#[test]
fn dcp_decrements_then_compares() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6507::new();

    // LDA #$40; DCP $10 with $10 = $41 -> memory $40, compare equal.
    setup_program(&mut bus, &mut cpu, &[0xA9, 0x40, 0xC7, 0x10]);
    bus.write(0x0010, 0x41);

    run_instruction(&mut cpu, &mut bus);
    run_instruction(&mut cpu, &mut bus);

    assert_eq!(bus.peek(0x0010), 0x40);
    assert!(cpu.state.flags.is_set(flags::Z));
    assert!(cpu.state.flags.is_set(flags::C));
}

#[test]
fn isb_increments_then_subtracts() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6507::new();

    // SEC; LDA #$10; ISB $10 with $10 = $04 -> memory $05, A = $0B.
    setup_program(&mut bus, &mut cpu, &[0x38, 0xA9, 0x10, 0xE7, 0x10]);
    bus.write(0x0010, 0x04);

    for _ in 0..3 {
        run_instruction(&mut cpu, &mut bus);
    }

    assert_eq!(bus.peek(0x0010), 0x05);
    assert_eq!(cpu.state.a, 0x0B);
}

#[test]
fn slo_shifts_and_ors() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6507::new();

    // LDA #$01; SLO $10 with $10 = $80 -> memory $00, C=1, A = $01.
    setup_program(&mut bus, &mut cpu, &[0xA9, 0x01, 0x07, 0x10]);
    bus.write(0x0010, 0x80);

    run_instruction(&mut cpu, &mut bus);
    run_instruction(&mut cpu, &mut bus);

    assert_eq!(bus.peek(0x0010), 0x00);
    assert!(cpu.state.flags.is_set(flags::C));
    assert_eq!(cpu.state.a, 0x01);
}

#[test]
fn rra_rotates_then_adds() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6507::new();

    // CLC; LDA #$10; RRA $10 with $10 = $03:
    // ROR $03 -> $01 with carry out 1; ADC $01 + carry = $12.
    setup_program(&mut bus, &mut cpu, &[0x18, 0xA9, 0x10, 0x67, 0x10]);
    bus.write(0x0010, 0x03);

    for _ in 0..3 {
        run_instruction(&mut cpu, &mut bus);
    }

    assert_eq!(bus.peek(0x0010), 0x01);
    assert_eq!(cpu.state.a, 0x12);
}

#[test]
fn sbc_binary_borrow_chain() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6507::new();

    // SEC; LDA #$50; SBC #$60 -> $F0, borrow out (C=0), N set, V clear.
    setup_program(&mut bus, &mut cpu, &[0x38, 0xA9, 0x50, 0xE9, 0x60]);

    for _ in 0..3 {
        run_instruction(&mut cpu, &mut bus);
    }

    assert_eq!(cpu.state.a, 0xF0);
    assert!(!cpu.state.flags.is_set(flags::C));
    assert!(cpu.state.flags.is_set(flags::N));
    assert!(!cpu.state.flags.is_set(flags::V));
}
