use ab8_emulator::assembler::{AssemblyErrorKind, Assembler};
use ab8_emulator::runtime::{BitWidth, Fault, Mnemonic, ProcessorError, State};
use ab8_emulator::{assemble, Computer, MachineConfig};
use indoc::indoc;
use pretty_assertions::assert_eq;

const HELLO: &str = include_str!("../../programs/hello.s");
const DOUBLE: &str = include_str!("../../programs/double.s");
const COUNTDOWN: &str = include_str!("../../programs/countdown.s");
const FAULT: &str = include_str!("../../programs/fault.s");

fn boot(source: &str, width: BitWidth) -> Computer {
    let config = MachineConfig::new(width, 256).unwrap();
    let program = Assembler::for_config(&config).assemble_text(source).unwrap();
    let mut computer = Computer::new(config);
    computer.load(&program, 0).unwrap();
    computer
}

/// Run like the command line does, collecting output after every tick
fn run_to_halt(computer: &mut Computer) -> Vec<u64> {
    let mut output = Vec::new();
    while !computer.is_halted() {
        computer.tick();
        if computer.output_written() {
            output.extend(computer.pop_output());
        }
    }
    output
}

#[test]
fn round_trip_test() {
    let mut computer = boot("SET 05\nWRITE\nHALT", BitWidth::W8);
    assert_eq!(run_to_halt(&mut computer), vec![5]);
    assert!(computer.is_halted());
    assert!(!computer.is_faulted());
}

#[test]
fn skip_with_label_test() {
    let source = indoc! {"
        JUMP :end
        SET 01
        end:
        HALT
    "};
    let program = assemble(source, 256).unwrap();
    assert_eq!(program[1], 4);

    let mut computer = boot(source, BitWidth::W8);
    computer.run().unwrap();
    assert_eq!(computer.registers.a, 0);
}

#[test]
fn missing_label_test() {
    let error = assemble("JUMP :missing\nHALT", 256).unwrap_err();
    assert_eq!(
        error.kind,
        AssemblyErrorKind::UnresolvedLabel("missing".to_string())
    );
}

#[test]
fn program_too_large_test() {
    let source = "NOP\n".repeat(20);
    let mut assembler = Assembler::new(16);
    let mut failed_at = None;
    for line in source.lines() {
        if let Err(error) = assembler.assemble_line(line) {
            failed_at = Some(error);
            break;
        }
    }

    let error = failed_at.unwrap();
    assert_eq!(error.line, 17);
    assert_eq!(error.kind, AssemblyErrorKind::ProgramTooLarge { size: 16 });
    assert_eq!(assembler.program().len(), 16);
}

#[test]
fn hello_test() {
    for width in [BitWidth::W8, BitWidth::W16, BitWidth::W64] {
        let mut computer = boot(HELLO, width);
        let output: Vec<u8> = run_to_halt(&mut computer)
            .into_iter()
            .map(|value| u8::try_from(value).unwrap())
            .collect();
        assert_eq!(String::from_utf8(output).unwrap(), "Hello, world!\n");
        assert_eq!(computer.state(), State::Halted);
    }
}

#[test]
fn double_test() {
    let mut computer = boot(DOUBLE, BitWidth::W8);
    computer.extend_input([1, 2, 200, 0, 7]);
    assert_eq!(run_to_halt(&mut computer), vec![2, 4, 144]);
    assert_eq!(computer.ports().pending_input(), 1);

    let mut computer = boot(DOUBLE, BitWidth::W16);
    computer.extend_input([1, 2, 200]);
    // The port runs dry, which reads as a zero
    assert_eq!(run_to_halt(&mut computer), vec![2, 4, 400]);
}

#[test]
fn countdown_test() {
    let mut computer = boot(COUNTDOWN, BitWidth::W4);
    assert_eq!(run_to_halt(&mut computer), vec![5, 4, 3, 2, 1, 0]);
}

#[test]
fn fault_test() {
    let mut computer = boot(FAULT, BitWidth::W16);
    assert_eq!(
        computer.run(),
        Err(ProcessorError::Fault(Fault::InvalidIndexedAccess {
            instruction: Mnemonic::Loadi,
            address: 256
        }))
    );
    assert!(computer.is_faulted());
    assert!(computer.is_halted());

    let mut computer = boot(FAULT, BitWidth::W8);
    assert_eq!(computer.run(), Ok(4));
    assert!(computer.overflow());
    assert_eq!(computer.registers.a, 0xa7);
}

#[test]
fn reset_and_reload_test() {
    let config = MachineConfig::default();
    let program = Assembler::for_config(&config)
        .assemble_text(COUNTDOWN)
        .unwrap();
    let mut computer = Computer::new(config);

    let mut runs = Vec::new();
    for _ in 0..3 {
        computer.reset();
        computer.load(&program, 0).unwrap();
        let output = run_to_halt(&mut computer);
        runs.push((output, computer.registers.clone(), computer.ticks()));
    }

    assert_eq!(runs[0], runs[1]);
    assert_eq!(runs[1], runs[2]);
}

#[test]
fn load_at_offset_test() {
    // Code at 0 jumps into a block loaded further in memory
    let mut computer = Computer::default();
    computer.load(&assemble("JUMP 80", 256).unwrap(), 0).unwrap();
    computer
        .load(&assemble("SET 2a\nWRITE\nHALT", 256).unwrap(), 0x80)
        .unwrap();
    assert_eq!(run_to_halt(&mut computer), vec![42]);
}
