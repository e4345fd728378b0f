use anyhow::{bail, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use asmsim::{assemble, Arch};

#[derive(Parser, Debug)]
#[command(author, version, about = "Assemble 8086 / 8051 source into a raw binary")]
struct Opts {
    #[arg(short, long, value_enum, default_value_t = Arch::I8086)]
    arch: Arch,
    /// Input assembly file (one instruction per line)
    #[arg(short, long)]
    input: PathBuf,
    /// Output binary file
    #[arg(short, long)]
    output: PathBuf,
    /// Print the address/bytes listing
    #[arg(long)]
    listing: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();
    let source = fs::read_to_string(&opts.input)?;
    let asm = assemble(&source, opts.arch);
    if !asm.is_ok() {
        for err in &asm.errors {
            eprintln!("{}: {err}", opts.input.display());
        }
        bail!("{} line(s) failed to assemble", asm.errors.len());
    }
    fs::write(&opts.output, &asm.bytes)?;
    if opts.listing {
        print!("{}", asm.listing());
    }
    Ok(())
}
