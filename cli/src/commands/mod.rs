use std::io::Read;
use std::ops::Range;
use std::process::exit;

use ab8_emulator::assembler::{AssemblyError, DebugInfo};
use ab8_emulator::constants as C;
use ab8_emulator::runtime::BitWidth;
use ab8_emulator::{Assembler, MachineConfig};
use anyhow::Context;
use camino::Utf8Path;
use clap::builder::{PossibleValuesParser, TypedValueParser};
use clap::Args;
use miette::{Diagnostic, MietteDiagnostic};
use tracing::{debug, info};

mod asm;
mod bench;
mod completion;
mod disasm;
mod run;

#[derive(clap::Subcommand, Debug)]
pub enum Subcommand {
    /// Run a program
    Run(self::run::RunOpt),

    /// Assemble a source file to machine code
    Asm(self::asm::AsmOpt),

    /// List the instructions of a machine code file
    Disasm(self::disasm::DisasmOpt),

    /// Measure how many ticks per second the emulator runs
    Bench(self::bench::BenchOpt),

    /// Generate shell completions
    Completion(self::completion::CompletionOpt),
}

impl Subcommand {
    /// Run a subcommand
    pub fn exec(self) -> anyhow::Result<()> {
        match self {
            Self::Run(opt) => opt.exec(),
            Self::Asm(opt) => opt.exec(),
            Self::Disasm(opt) => opt.exec(),
            Self::Bench(opt) => opt.exec(),
            Self::Completion(opt) => opt.exec(),
        }
    }
}

/// Shape of the emulated machine
#[derive(Args, Debug, Clone)]
pub struct MachineOpt {
    /// Width of the A and B registers, in bits
    #[arg(
        short = 'w',
        long,
        default_value_t = BitWidth::default(),
        value_parser = PossibleValuesParser::new(["4", "8", "16", "32", "64"])
            .try_map(|width| width.parse::<BitWidth>()),
    )]
    bitwidth: BitWidth,

    /// Number of memory cells
    #[arg(short = 'm', long, default_value_t = C::MEMORY_SIZE)]
    memsize: usize,
}

impl MachineOpt {
    pub fn config(&self) -> anyhow::Result<MachineConfig> {
        let config = MachineConfig::new(self.bitwidth, self.memsize)?;
        Ok(config)
    }
}

/// Read a whole file, `-` meaning the standard input
pub fn read_input(path: &Utf8Path) -> anyhow::Result<Vec<u8>> {
    if path.as_str() == "-" {
        debug!("Reading from stdin");
        let mut buf = Vec::new();
        std::io::stdin()
            .lock()
            .read_to_end(&mut buf)
            .context("could not read from stdin")?;
        Ok(buf)
    } else {
        debug!(%path, "Reading file");
        std::fs::read(path).with_context(|| format!("could not read {path}"))
    }
}

/// Byte range of a 1-based line in the source, without its line terminator
fn line_span(source: &str, line: usize) -> Option<Range<usize>> {
    let mut start = 0;
    for (index, text) in source.split_inclusive('\n').enumerate() {
        if index + 1 == line {
            let text = text.trim_end_matches(['\n', '\r']);
            return Some(start..start + text.len());
        }
        start += text.len();
    }
    None
}

fn report_assembly_error(path: &Utf8Path, source: &str, error: &AssemblyError) -> miette::Report {
    let mut diagnostic = MietteDiagnostic::new(format!("Failed to assemble program: {error}"))
        .with_labels(
            line_span(source, error.line)
                .map(|span| miette::LabeledSpan::at(span, error.kind.to_string())),
        );

    if let Some(code) = error.code() {
        diagnostic = diagnostic.with_code(code.to_string());
    }

    if let Some(help) = error.help() {
        diagnostic = diagnostic.with_help(help.to_string());
    }

    miette::Report::new(diagnostic)
        .with_source_code(miette::NamedSource::new(path.as_str(), source.to_owned()))
}

/// Assemble a source file, reporting errors on the source and exiting on failure
pub fn assemble_file(
    path: &Utf8Path,
    config: &MachineConfig,
) -> anyhow::Result<(Vec<C::Byte>, DebugInfo)> {
    let source = String::from_utf8(read_input(path)?)
        .with_context(|| format!("{path} is not valid UTF-8"))?;

    info!(%path, "Assembling program");
    match Assembler::for_config(config).assemble_text_with_debug_info(&source) {
        Ok(res) => Ok(res),
        Err(e) => {
            let report = report_assembly_error(path, &source, &e);
            eprintln!("{report:?}");
            exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn line_span_test() {
        let source = "SET 05\r\nWRITE\n\nHALT";
        assert_eq!(line_span(source, 1), Some(0..6));
        assert_eq!(line_span(source, 2), Some(8..13));
        assert_eq!(line_span(source, 3), Some(14..14));
        assert_eq!(line_span(source, 4), Some(15..19));
        assert_eq!(line_span(source, 5), None);
    }
}
