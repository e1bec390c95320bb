use std::io::Write;

use ab8_emulator::constants as C;
use ab8_emulator::runtime::BitWidth;
use ab8_emulator::MachineConfig;
use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{Parser, ValueHint};
use tracing::info;

use super::assemble_file;

#[derive(Parser, Debug)]
pub struct AsmOpt {
    /// Source file to assemble. Use `-` to read it from stdin
    #[arg(value_hint = ValueHint::FilePath)]
    input: Utf8PathBuf,

    /// Where to write the machine code. Defaults to stdout
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    output: Option<Utf8PathBuf>,

    /// Size of the memory the program must fit in
    #[arg(short = 'm', long, default_value_t = C::MEMORY_SIZE)]
    memsize: usize,

    /// Print the offset of every label
    #[arg(short, long)]
    labels: bool,
}

impl AsmOpt {
    pub fn exec(self) -> anyhow::Result<()> {
        // Registers width has no effect on the machine code
        let config = MachineConfig::new(BitWidth::default(), self.memsize)?;
        let (program, debug_info) = assemble_file(&self.input, &config)?;
        info!(size = program.len(), "Program assembled");

        if self.labels {
            for (label, offset) in &debug_info.labels {
                info!("{:>5}    {}", offset, label);
            }
        }

        if let Some(path) = &self.output {
            std::fs::write(path, &program).with_context(|| format!("could not write {path}"))?;
        } else {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&program)?;
            stdout.flush()?;
        }

        Ok(())
    }
}
