use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use std::fs;
use tpu_core::api::{Tpu, TpuError, SIMULATION_CYCLE_CAP};

#[derive(Debug, Parser)]
struct Args {
    /// Compiled program image
    #[arg(short = 'p', long, default_value = "program.bin")]
    program_path: String,
    /// Initial host memory image
    #[arg(short = 'm', long, default_value = "memory.bin")]
    memory_path: String,
    /// Host memory size in MiB
    #[arg(long, default_value_t = 4)]
    host_memory_mb: usize,
    /// Cycle cap before the simulation is abandoned
    #[arg(long, default_value_t = SIMULATION_CYCLE_CAP)]
    max_cycles: u64,
    /// Write the final host memory image to this path after halt
    #[arg(long)]
    dump_memory: Option<String>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let program = fs::read(&args.program_path)
        .with_context(|| format!("Error reading program image from '{}'", args.program_path))?;
    let memory = fs::read(&args.memory_path)
        .with_context(|| format!("Error reading host memory image from '{}'", args.memory_path))?;

    let mut tpu = Tpu::builder().host_memory_len(args.host_memory_mb * 1024 * 1024).build();
    tpu.load_program(&program)?;
    tpu.load_host_memory(&memory)?;

    log::info!("Running cycle-accurate simulation");

    match tpu.run_until_halt(args.max_cycles) {
        Ok(()) => {
            log::info!("Simulation halted after {} cycles", tpu.stats().total_cycles);
        }
        // The timeout still gets a report; the machine is simply abandoned
        // mid-instruction
        Err(err @ TpuError::Timeout { .. }) => log::error!("{err}"),
        Err(err) => return Err(err.into()),
    }

    println!("{}", tpu.stats());

    if let Some(dump_path) = &args.dump_memory {
        fs::write(dump_path, tpu.host_memory())
            .with_context(|| format!("Error writing host memory dump to '{dump_path}'"))?;
        log::info!("Wrote host memory dump to '{dump_path}'");
    }

    Ok(())
}
