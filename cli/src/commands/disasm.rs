use ab8_emulator::disassemble;
use camino::Utf8PathBuf;
use clap::{Parser, ValueHint};

use super::read_input;

#[derive(Parser, Debug)]
pub struct DisasmOpt {
    /// Machine code file. Use `-` to read it from stdin
    #[arg(value_hint = ValueHint::FilePath)]
    input: Utf8PathBuf,
}

impl DisasmOpt {
    pub fn exec(self) -> anyhow::Result<()> {
        let code = read_input(&self.input)?;
        for (offset, entry) in disassemble(&code) {
            println!("{offset:>5}    {entry}");
        }

        Ok(())
    }
}
