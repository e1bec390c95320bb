use std::io::Write;
use std::time::Duration;

use ab8_emulator::assembler::DebugInfo;
use ab8_emulator::constants as C;
use ab8_emulator::runtime::ProcessorError;
use ab8_emulator::Computer;
use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{Parser, ValueHint};
use tracing::{debug, info};

use super::{assemble_file, read_input, MachineOpt};
use crate::interactive::run_interactive;

/// Pause between two ticks with `--slow`
const SLOW_TICK: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
pub struct RunOpt {
    /// Program file to execute. Use `-` to read the program from stdin
    #[arg(value_hint = ValueHint::FilePath)]
    program: Utf8PathBuf,

    /// The program is an assembly source, assemble it before running it
    #[arg(short, long)]
    assemble: bool,

    #[command(flatten)]
    machine: MachineOpt,

    /// Pause between every tick
    #[arg(short, long)]
    slow: bool,

    /// Show the machine state before every tick
    #[arg(short, long)]
    debug: bool,

    /// Input and output port data are numbers instead of bytes
    #[arg(short, long)]
    number_mode: bool,

    /// Data to push into the input port. With `--number-mode`, this is a list
    /// of numbers separated by commas
    #[arg(short, long, allow_hyphen_values = true)]
    portin: Option<String>,

    /// Give up if the machine did not halt after this many ticks
    #[arg(long)]
    max_ticks: Option<u64>,

    /// Run the program in interactive mode
    #[arg(short, long, conflicts_with_all = ["slow", "debug", "max_ticks"])]
    interactive: bool,
}

/// Parse the `--portin` data
fn parse_portin(data: &str, number_mode: bool) -> anyhow::Result<Vec<i128>> {
    if number_mode {
        data.split(',')
            .map(|number| number.trim().parse::<i128>())
            .collect::<Result<_, _>>()
            .context(
                "could not parse portin data in number mode, \
                 it should be a list of numbers separated by commas",
            )
    } else {
        Ok(data.chars().map(|c| i128::from(u32::from(c))).collect())
    }
}

/// Render a value written to the output port
fn format_output(value: C::Word, number_mode: bool) -> String {
    if number_mode {
        format!("{value} ")
    } else {
        char::from(value.to_le_bytes()[0]).to_string()
    }
}

impl RunOpt {
    pub fn exec(self) -> anyhow::Result<()> {
        let config = self.machine.config()?;

        let (program, debug_info) = if self.assemble {
            assemble_file(&self.program, &config)?
        } else {
            info!(path = %self.program, "Reading program");
            (read_input(&self.program)?, DebugInfo::default())
        };

        debug!(width = %config.width(), memory_size = config.memory_size(), "Building computer");
        let mut computer = Computer::new(config);
        computer
            .load(&program, 0)
            .context("could not load the program")?;

        if let Some(data) = &self.portin {
            computer.extend_input(parse_portin(data, self.number_mode)?);
        }

        info!("Running program");
        if self.interactive {
            run_interactive(&mut computer, debug_info)?;
            return Ok(());
        }

        self.run(&mut computer)?;

        if let Some(fault) = computer.fault() {
            return Err(ProcessorError::from(fault).into());
        }

        info!(registers = %computer.registers, ticks = computer.ticks(), "End of program");
        Ok(())
    }

    fn run(&self, computer: &mut Computer) -> anyhow::Result<()> {
        let mut stdout = std::io::stdout().lock();

        while !computer.is_halted() {
            if let Some(max_ticks) = self.max_ticks {
                if computer.ticks() >= max_ticks {
                    stdout.flush()?;
                    return Err(ProcessorError::TickLimit(max_ticks).into());
                }
            }

            if self.debug {
                writeln!(stdout, "{computer}")?;
            }

            computer.tick();

            if computer.output_written() {
                for value in computer.drain_output() {
                    let data = format_output(value, self.number_mode);
                    if self.debug {
                        writeln!(stdout, ">> {data}")?;
                    } else {
                        write!(stdout, "{data}")?;
                        stdout.flush()?;
                    }
                }
            }

            if self.slow {
                std::thread::sleep(SLOW_TICK);
            }
        }

        stdout.flush()?;
        Ok(())
    }
}
