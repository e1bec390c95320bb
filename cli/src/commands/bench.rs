use std::time::Instant;

use ab8_emulator::Computer;
use camino::Utf8PathBuf;
use clap::{Parser, ValueHint};
use tracing::{debug, info};

use super::{assemble_file, MachineOpt};

#[derive(Parser, Debug)]
pub struct BenchOpt {
    /// Assembly source of the program to run
    #[arg(value_hint = ValueHint::FilePath)]
    input: Utf8PathBuf,

    /// How many times the program is run
    #[arg(short = 'n', long, default_value_t = 20_000)]
    iterations: u32,

    #[command(flatten)]
    machine: MachineOpt,
}

impl BenchOpt {
    pub fn exec(self) -> anyhow::Result<()> {
        let config = self.machine.config()?;
        let (program, _) = assemble_file(&self.input, &config)?;
        let mut computer = Computer::new(config);

        info!(iterations = self.iterations, "Running benchmark");
        let start = Instant::now();
        let mut ticks: u64 = 0;
        for iteration in 0..self.iterations {
            computer.reset();
            computer.load(&program, 0)?;
            let count = computer.run().inspect_err(|_| {
                debug!(iteration, "Benchmark stopped on a fault");
            })?;
            ticks += count;
        }
        let duration = start.elapsed();

        #[allow(clippy::cast_precision_loss)]
        let tps = ticks as f64 / duration.as_secs_f64();
        println!(
            "done {ticks} ticks in {:.05} seconds ( {tps:.1} tps )",
            duration.as_secs_f64()
        );

        Ok(())
    }
}
