use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use botcore_rs::memory::ports;
use botcore_rs::{disasm, ProcessState, Reg};

#[derive(Parser, Debug)]
#[command(author, version, about = "Run a bot memory image on the interpreter")]
struct Opts {
    /// Number of instructions to execute
    #[arg(short, long, default_value_t = 10_000)]
    ticks: u64,
    /// Print each instruction before it executes
    #[arg(long)]
    trace: bool,
    /// Dump the final machine state as JSON to this path
    #[arg(long, value_name = "JSONFILE")]
    dump_state: Option<PathBuf>,
    #[arg(value_name = "BINFILE")]
    input: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();
    let bytes = std::fs::read(&opts.input)
        .with_context(|| format!("reading {}", opts.input.display()))?;
    let mut st = ProcessState::load(&bytes);

    for _ in 0..opts.ticks {
        if opts.trace {
            let ip = st.regs.get(Reg::Ip);
            println!("{ip:04X}  {}", disasm::fmt_instr(&st.peek()));
        }
        st.step();
    }

    // The driver-convention output ports, as a battle driver would read them.
    println!(
        "move={} turn={} fire={} sensor_dir={}",
        st.mem.read_u8(ports::MOVE),
        st.mem.read_u8(ports::TURN),
        st.mem.read_u8(ports::FIRE),
        st.mem.read_u8(ports::SENSOR_DIR),
    );

    if let Some(path) = opts.dump_state {
        let json = serde_json::to_string_pretty(&st)?;
        std::fs::write(&path, json)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}
