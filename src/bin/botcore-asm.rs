use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use botcore_rs::{assemble, disasm, parse, Instr, SourceText};

#[derive(Parser, Debug)]
#[command(author, version, about = "Assemble bot assembly source into a memory image")]
struct Opts {
    /// Output image path (defaults to the input with a .bin extension)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Print an address/instruction listing after assembling
    #[arg(long)]
    listing: bool,
    #[arg(value_name = "ASMFILE")]
    input: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();
    let path = opts.input.display().to_string();
    let text = std::fs::read_to_string(&opts.input)
        .with_context(|| format!("reading {path}"))?;

    let (prog, diags) = parse(&SourceText::new(text));
    if !diags.is_clean() {
        for err in &diags.errors {
            eprintln!("{path}:{err}");
        }
        if diags.truncated {
            eprintln!("{path}: too many errors, output truncated");
        }
        bail!("{} parse error(s)", diags.errors.len());
    }

    let image = match assemble(&prog) {
        Ok(image) => image,
        Err(err) => bail!("{path}:{err}"),
    };

    if opts.listing {
        for (addr, line) in image.source_map.iter() {
            let instr = Instr::decode(&image.memory.read_window(addr));
            println!("{:04X}  {:>5}  {}", addr, line + 1, disasm::fmt_instr(&instr));
        }
    }

    // The image zero-fills on load, so trailing zeros need not be stored.
    let bytes = image.memory.as_bytes();
    let used = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    let out_path = opts
        .output
        .unwrap_or_else(|| opts.input.with_extension("bin"));
    std::fs::write(&out_path, &bytes[..used])
        .with_context(|| format!("writing {}", out_path.display()))?;
    tracing::info!(bytes = used, out = %out_path.display(), "image written");
    Ok(())
}
