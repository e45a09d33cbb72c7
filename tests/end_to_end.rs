use trc3::asm::{assemble, disassemble, AssemblerError};
use trc3::cpu::{Cpu, RunConfig, StopReason};
use trc3::io::ScriptedPorts;
use trc3::isa::decode_word;
use std::sync::atomic::AtomicBool;

fn boot(source: &str) -> Cpu {
    let image = assemble(source).expect("could not assemble the program");
    let mut cpu = Cpu::new();
    cpu.load_image(image.bytes()).expect("could not load the image");
    cpu
}

fn opcodes(bytes: &[u8], count: usize) -> Vec<u8> {
    bytes
        .chunks(2)
        .take(count)
        .map(|pair| decode_word(u16::from_le_bytes([pair[0], pair[1]])).unwrap().0.value())
        .collect()
}

#[test]
fn test_load_add_halt() {
    let source = "LDI r1 5\nLDI r2 10\nADD r1 r2 r3\nHLT";
    let image = assemble(source).unwrap();
    assert_eq!(image.len(), 8);
    assert_eq!(opcodes(image.bytes(), 4), vec![12, 12, 2, 1]);

    let mut cpu = boot(source);
    let mut io = ScriptedPorts::default();
    cpu.run(&mut io).unwrap();

    assert!(cpu.is_halted());
    assert_eq!(cpu.regs.read(3), 15);
    assert!(!cpu.regs.zero);
    assert!(!cpu.regs.carry);
    assert_eq!(cpu.regs.pc, 3);
}

#[test]
fn test_variable_follows_program() {
    let image = assemble(".x 42\nLDI r1 x\nHLT").unwrap();
    assert_eq!(image.len(), 5);
    assert_eq!(image.bytes()[4], 42);

    let mut cpu = boot(".x 42\nLDI r1 x\nHLT");
    cpu.run(&mut ScriptedPorts::default()).unwrap();
    assert_eq!(cpu.regs.read(1), 4);
    assert_eq!(cpu.mem.read(4), 42);
}

#[test]
fn test_variable_read_through_page() {
    // r1 <- address of x, r2 <- mem[r1 + 0]
    let mut cpu = boot(".x 42\nLDI r1 x\nREA r1 0 r2\nHLT");
    cpu.run(&mut ScriptedPorts::default()).unwrap();
    assert_eq!(cpu.regs.read(2), 42);
}

#[test]
fn test_recursive_call_drops_oldest_returns() {
    let mut cpu = boot("foo:\nNOP\nCAL foo\nHLT");
    let executed = cpu.run_limited(&mut ScriptedPorts::default(), 200).unwrap();

    assert_eq!(executed, 200);
    assert!(cpu.is_running());
    assert!(cpu.stack.slots().iter().all(|&slot| slot == 2));
}

#[test]
fn test_xor_carry_literal_cases() {
    let mut cpu = boot("LDI r1 5\nLDI r2 10\nXOR r1 r2 r3\nHLT");
    cpu.run(&mut ScriptedPorts::default()).unwrap();
    assert_eq!(cpu.regs.read(3), 15);
    assert!(!cpu.regs.carry);

    let mut cpu = boot("LDI r1 10\nLDI r2 5\nXOR r1 r2 r3\nHLT");
    cpu.run(&mut ScriptedPorts::default()).unwrap();
    assert_eq!(cpu.regs.read(3), 15);
    assert!(cpu.regs.carry);
}

#[test]
fn test_shorthand_forms_match_full_forms() {
    assert_eq!(assemble("RSH r1 r2").unwrap(), assemble("RSH r1 0 r2").unwrap());
    assert_eq!(assemble("PAS r3").unwrap(), assemble("PAS 0 r3").unwrap());
}

#[test]
fn test_ret_on_empty_stack_is_nop() {
    let mut cpu = boot("RET\nHLT");
    let mut io = ScriptedPorts::default();
    cpu.step(&mut io).unwrap();
    assert_eq!(cpu.regs.pc, 1);
    assert!(cpu.is_running());
}

#[test]
fn test_subroutine_call_and_return() {
    let source = "\
        LDI r1 3
        CAL double
        GPO r1 p0
        HLT
        double:
        ADD r1 r1 r1
        RET";
    let mut cpu = boot(source);
    let mut io = ScriptedPorts::default();
    cpu.run(&mut io).unwrap();
    assert_eq!(io.port_output(0), vec![6]);
    assert!(cpu.stack.looks_empty());
}

#[test]
fn test_countdown_loop_with_branch() {
    let source = "\
        #start 3
        LDI r1 start
        LDI r2 1
        loop:
        GPO r1 p1
        SUB r1 r2 r1  ; count down
        BNE loop
        HLT";
    let mut cpu = boot(source);
    let mut io = ScriptedPorts::default();
    cpu.run(&mut io).unwrap();
    assert_eq!(io.port_output(1), vec![3, 2, 1]);
    assert_eq!(cpu.regs.read(1), 0);
}

#[test]
fn test_echo_through_ports() {
    let mut cpu = boot("GPI p4 r1\nADI r1 1\nGPO r1 p5\nBEL\nHLT");
    let mut io = ScriptedPorts::new([41]);
    cpu.run(&mut io).unwrap();
    assert_eq!(io.port_output(5), vec![42]);
    assert_eq!(io.bells, 1);
}

#[test]
fn test_running_off_the_end() {
    let mut cpu = Cpu::new();
    let stop = AtomicBool::new(false);
    let reason = cpu.run_with(&mut ScriptedPorts::default(), &RunConfig::default(), &stop).unwrap();
    assert_eq!(reason, StopReason::EndOfMemory);
    assert_eq!(cpu.cycles, 1024);
}

#[test]
fn test_cycle_limit() {
    let mut cpu = boot("top:\nJMP top");
    let config = RunConfig {
        max_cycles: Some(50),
        clock_hz: None,
    };
    let stop = AtomicBool::new(false);
    let reason = cpu.run_with(&mut ScriptedPorts::default(), &config, &stop).unwrap();
    assert_eq!(reason, StopReason::CycleLimit);
    assert_eq!(cpu.cycles, 50);
}

#[test]
fn test_all_errors_reported_together() {
    let err = assemble("FOO r1\nLDI r1\nLDI r1 300\nJMP nowhere\nHLT").unwrap_err();
    match err {
        AssemblerError::Syntax { count, ref diagnostics } => {
            assert_eq!(count, 4);
            let lines: Vec<usize> = diagnostics.iter().map(|d| d.line).collect();
            assert_eq!(lines, vec![1, 2, 3, 4]);
        }
        other => panic!("expected syntax errors, got {:?}", other),
    }
}

#[test]
fn test_disassembly_lists_code_and_data() {
    let image = assemble(".x 42\nLDI r1 x\nHLT").unwrap();
    let listing = disassemble(image.bytes(), Some(image.instruction_count()));
    assert!(listing.contains("LDI r1 4"));
    assert!(listing.contains("HLT"));
    assert!(listing.contains("00101010"));
}

#[test]
fn test_dump_state_is_json() {
    let mut cpu = boot("LDI r1 7\nHLT");
    cpu.run(&mut ScriptedPorts::default()).unwrap();
    let json = serde_json::to_value(&cpu).unwrap();
    assert_eq!(json["state"], "Halted");
    assert_eq!(json["cycles"], 2);
}
