//! This module implements the TTY interactive interface.
//!
//! It is mainly based on two crates:
//!   - rustyline, to handle the line-editting logic
//!   - clap, to handle the parsing of those interactive commands
//!
//! Using Parser to do this is a bit of a hack, and requires some weird options
//! to have it working but works nonetheless.

use std::collections::{BTreeMap, BTreeSet};

use ab8_emulator::assembler::DebugInfo;
use ab8_emulator::constants as C;
use ab8_emulator::disassemble;
use ab8_emulator::runtime::{Computer, Reg, State};
use clap::Parser;
use rustyline::history::DefaultHistory;
use rustyline::{Behavior, CompletionType, Config, EditMode, Editor};
use tracing::{debug, info, warn};

mod helper;
mod parse;
use self::helper::RunHelper;

static HELP: &str = r#"
Run "help [command]" for command-specific help.
An empty line re-runs the last valid command."#;

#[derive(Parser, Clone, Debug)]
#[command(
    help_template = "{about}\n\nCOMMANDS:\n{subcommands}\n{after-help}",
    after_help = HELP,
    disable_version_flag = true,
    infer_subcommands = true,
    no_binary_name = true,
)]
/// Interactive mode commands
enum Command {
    /// Execute the next instructions
    #[command(alias = "s")]
    Step {
        /// Number of ticks to execute
        #[arg(default_value_t = 1)]
        number: u64,
    },

    /// Exit the emulator
    Exit,

    /// Show the state of registers
    Registers { register: Option<Reg> },

    /// Show the content of a block in memory
    Memory {
        /// The first address to show. Can be a number, a label (`:label`) or
        /// a register.
        address: parse::Argument,

        /// Number of memory cells to show
        #[arg(default_value_t = 1)]
        number: usize,
    },

    /// Set a register or a memory cell
    Set {
        /// The register or address to set
        target: parse::AssignmentTarget,

        /// The value to set
        value: parse::Argument,
    },

    /// Push values to the input port
    Input {
        #[arg(required = true, allow_negative_numbers = true)]
        values: Vec<i128>,
    },

    /// Show the next few instructions
    List {
        /// Number of instructions to show
        #[arg(default_value_t = 10)]
        number: usize,
    },

    /// Set a breakpoint
    Break {
        /// The address where to set the breakpoint
        address: parse::Argument,
    },

    /// Remove a breakpoint
    Unbreak {
        /// The address of the breakpoint to remove
        address: parse::Argument,
    },

    /// Continue the program until the next breakpoint or until it halts
    #[command(alias = "c")]
    Continue,

    /// Show informations about the current debugging session
    Info {
        #[command(subcommand)]
        sub: Option<InfoCommand>,
    },
}

#[derive(clap::Subcommand, Clone, Debug)]
enum InfoCommand {
    /// List active breakpoints
    Breakpoints,

    /// List program labels
    Labels,

    /// Show the number of ticks since the beginning of the program
    Ticks,
}

/// Holds informations about a interactive session
#[derive(Debug, Default)]
struct Session {
    /// List of active breakpoints
    breakpoints: BTreeSet<C::Address>,

    /// Map of labels in program
    labels: BTreeMap<String, C::Address>,

    /// Current address for the `list` command
    list_address: Option<C::Address>,
}

impl Session {
    fn from_debug_info(info: DebugInfo) -> Session {
        Session {
            labels: info.labels,
            ..Default::default()
        }
    }

    fn add_breakpoint(&mut self, address: C::Address) {
        if self.breakpoints.insert(address) {
            info!(address, "Setting a breakpoint");
        } else {
            warn!(address, "A breakpoint was already set");
        }
    }

    fn remove_breakpoint(&mut self, address: C::Address) {
        if self.breakpoints.remove(&address) {
            info!(address, "Removing breakpoint");
        } else {
            warn!(address, "No breakpoint was set here");
        }
    }

    fn has_breakpoint(&self, address: C::Address) -> bool {
        self.breakpoints.contains(&address)
    }

    /// Reset the `list` command (after running an instruction)
    fn reset_list(&mut self) {
        self.list_address = None;
    }

    /// Display `number` instructions, continuing where the last `list` stopped
    fn list(&mut self, computer: &Computer, number: usize) {
        let start = self
            .list_address
            .unwrap_or_else(|| computer.next_address());
        let code = computer.memory.as_slice().get(start..).unwrap_or_default();

        let mut next = start;
        for (offset, entry) in disassemble(code).take(number) {
            let address = start + offset;
            self.display_labels_at(address);
            info!("{} {:>5}    {}", self.gutter(computer, address), address, entry);
            next = start + offset + entry.len();
        }

        self.list_address = Some(next);
    }

    /// What to show before an address: breakpoint and next instruction markers
    fn gutter(&self, computer: &Computer, address: C::Address) -> &'static str {
        let is_next = computer.next_address() == address;
        match (self.has_breakpoint(address), is_next) {
            (true, true) => "B>",
            (true, false) => "B ",
            (false, true) => " >",
            (false, false) => "  ",
        }
    }

    fn display_labels_at(&self, address: C::Address) {
        self.labels
            .iter()
            .filter(|(_, &a)| a == address)
            .for_each(|(label, _)| info!("          {}:", label));
    }

    fn display_breakpoints(&self, computer: &Computer) {
        match self.breakpoints.len() {
            0 => info!("No breakpoints"),
            1 => info!("1 breakpoint:"),
            x => info!("{} breakpoints:", x),
        }

        for &address in &self.breakpoints {
            let code = computer.memory.as_slice().get(address..).unwrap_or_default();
            let entry = disassemble(code)
                .next()
                .map(|(_, entry)| entry.to_string())
                .unwrap_or_default();
            info!("{} {:>5}    {}", self.gutter(computer, address), address, entry);
        }
    }

    fn display_labels(&self) {
        match self.labels.len() {
            0 => info!("No labels"),
            1 => info!("1 label:"),
            x => info!("{} labels:", x),
        }

        for (label, &addr) in &self.labels {
            info!("  {} => {}", label, addr);
        }
    }

    fn display_ticks(computer: &Computer) {
        info!("Ticks: {}", computer.ticks());
    }
}

/// Run one tick, showing what was written to the output port
///
/// Returns `false` once the machine is halted.
fn tick(computer: &mut Computer) -> bool {
    let state = computer.tick();
    for value in computer.drain_output() {
        info!(value, "Output");
    }

    match state {
        State::Running => true,
        State::Halted => {
            info!(registers = %computer.registers, "Halted");
            false
        }
        State::Faulted => {
            if let Some(fault) = computer.fault() {
                warn!(error = &fault as &dyn std::error::Error, "Faulted");
            }
            false
        }
    }
}

#[allow(clippy::too_many_lines)]
pub(crate) fn run_interactive(computer: &mut Computer, debug_info: DebugInfo) -> anyhow::Result<()> {
    info!("Running in interactive mode. Type \"help\" to list available commands.");
    let config = Config::builder()
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .edit_mode(EditMode::Emacs)
        .behavior(Behavior::PreferTerm)
        .auto_add_history(true)
        .build();

    let helper: RunHelper<Command> = RunHelper::new(debug_info.labels.keys());
    let mut session = Session::from_debug_info(debug_info);

    let mut rl: Editor<RunHelper<Command>, DefaultHistory> = Editor::with_config(config)?;
    rl.set_helper(Some(helper));

    let mut last_command: Option<Command> = None;

    'read: loop {
        // A macro to unwrap an error, log it and continue the loop
        macro_rules! warn_and_continue {
            ($e:expr) => {
                match $e {
                    Ok(o) => o,
                    Err(e) => {
                        tracing::warn!(error = %e);
                        continue 'read;
                    }
                }
            };
        }

        let Ok(readline) = rl.readline(">> ") else {
            info!("EOF, exitting");
            return Ok(());
        };

        let command = if readline.is_empty() {
            if let Some(command) = &last_command {
                command.clone()
            } else {
                info!("Type \"help\" to get the list of available commands");
                continue 'read;
            }
        } else {
            let Ok(words) = shell_words::split(readline.as_str()) else {
                warn!("Invalid input");
                continue 'read;
            };

            let command = warn_and_continue!(Command::try_parse_from(words));
            last_command = Some(command.clone());
            command
        };

        debug!("Executing command: {:?}", command);

        match (command, computer.is_halted()) {
            (Command::Exit, _) => break,

            (Command::Step { number }, false) => {
                session.reset_list();

                for _ in 0..number {
                    if !tick(computer) {
                        continue 'read;
                    }
                }
                info!("{}", computer);
            }

            (Command::Continue, false) => {
                session.reset_list();

                loop {
                    if !tick(computer) {
                        continue 'read;
                    }

                    if session.has_breakpoint(computer.next_address()) {
                        info!(address = computer.next_address(), "Stopped at a breakpoint");
                        break;
                    }
                }
            }

            (Command::Registers { register }, _) => {
                if let Some(reg) = register {
                    info!("Register {} = {}", reg, computer.registers.get(reg));
                } else {
                    info!("Registers: {}", computer.registers);
                    info!(overflow = computer.overflow(), state = %computer.state(), "Flags");
                }
            }

            (Command::Memory { address, number }, _) => {
                let address = warn_and_continue!(address.evaluate_address(computer, &session.labels));
                for address in address..address.saturating_add(number) {
                    let value = warn_and_continue!(computer.memory.get(address));
                    info!("{:>5}    {:#04x} ({})", address, value, value);
                }
            }

            (Command::Set { target, value }, false) => {
                let value = warn_and_continue!(value.evaluate(computer, &session.labels));
                match target {
                    parse::AssignmentTarget::Address(address) => {
                        let address = warn_and_continue!(address.evaluate_address(computer, &session.labels));
                        let byte = value.to_le_bytes()[0];
                        info!("Setting memory at address {address} to {byte}");
                        *warn_and_continue!(computer.memory.get_mut(address)) = byte;
                    }

                    parse::AssignmentTarget::Register(Reg::PC) => {
                        warn!("The program counter can only be changed by the program");
                    }

                    parse::AssignmentTarget::Register(reg) => {
                        let value = computer.width().wrap(i128::from(value));
                        info!("Setting register {reg} to {value}");
                        if reg == Reg::A {
                            computer.registers.a = value;
                        } else {
                            computer.registers.b = value;
                        }
                    }
                }
            }

            (Command::Input { values }, _) => {
                info!(count = values.len(), "Pushing values to the input port");
                computer.extend_input(values);
            }

            (Command::List { number }, _) => session.list(computer, number),

            (Command::Break { address }, _) => {
                let address = warn_and_continue!(address.evaluate_address(computer, &session.labels));
                session.add_breakpoint(address);
            }

            (Command::Unbreak { address }, _) => {
                let address = warn_and_continue!(address.evaluate_address(computer, &session.labels));
                session.remove_breakpoint(address);
            }

            (Command::Info { sub }, _) => match sub {
                Some(InfoCommand::Breakpoints) => session.display_breakpoints(computer),
                Some(InfoCommand::Labels) => session.display_labels(),
                Some(InfoCommand::Ticks) => Session::display_ticks(computer),
                None => {
                    session.display_breakpoints(computer);
                    info!("–");
                    session.display_labels();
                    info!("–");
                    Session::display_ticks(computer);
                }
            },

            (_, true) => {
                // Computer is halted but the user asked to continue, we just warn
                warn!("Computer is halted. Use \"exit\" to quit");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn verify_command_test() {
        Command::command().debug_assert();
    }

    #[test]
    fn parse_command_test() {
        let command = Command::try_parse_from(["s", "3"]).unwrap();
        assert!(matches!(command, Command::Step { number: 3 }));

        let command = Command::try_parse_from(["input", "1", "-2"]).unwrap();
        assert!(matches!(command, Command::Input { values } if values == vec![1, -2]));

        let command = Command::try_parse_from(["break", ":loop"]).unwrap();
        assert!(
            matches!(command, Command::Break { address: parse::Argument::Label(label) } if label == "loop")
        );
    }

    #[test]
    fn list_test() {
        // SET 05; WRITE; HALT
        let mut computer = Computer::default();
        computer.load(&[0xa6, 0x05, 0x04, 0x06], 0).unwrap();
        let mut session = Session::default();

        session.list(&computer, 2);
        assert_eq!(session.list_address, Some(3));
        session.list(&computer, 1);
        assert_eq!(session.list_address, Some(4));

        session.reset_list();
        computer.tick();
        session.list(&computer, 1);
        assert_eq!(session.list_address, Some(3));
    }
}
