use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use asmsim::{literal, Arch, LogEntry, RunOutcome, Session, SessionConfig, Snapshot};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Run an 8086 or 8051 assembly file on the asmsim interpreter"
)]
struct Opts {
    #[arg(short, long, value_enum)]
    arch: Option<Arch>,
    /// JSON session config (`{"arch": "8051", "step_limit": 100}`)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,
    /// Preload 8051 external memory, `ADDR:V1,V2,...` (hex digits)
    #[arg(long, value_name = "ADDR:BYTES")]
    xmem: Vec<String>,
    #[arg(long)]
    step_limit: Option<usize>,
    #[arg(value_name = "ASMFILE")]
    input: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Serialize)]
struct Report<'a> {
    outcome: RunOutcome,
    log: &'a [LogEntry],
    state: Snapshot,
}

fn parse_xmem(spec: &str) -> Result<(u16, Vec<u8>)> {
    let (addr, values) = spec
        .split_once(':')
        .ok_or_else(|| anyhow!("expected ADDR:V1,V2,... got {spec:?}"))?;
    let addr = literal::parse(addr, 16).ok_or_else(|| anyhow!("bad address {addr:?}"))?;
    let addr = u16::try_from(addr).with_context(|| format!("address {addr:#x} out of range"))?;
    let bytes = values
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| {
            literal::parse(v, 16)
                .and_then(|n| u8::try_from(n).ok())
                .ok_or_else(|| anyhow!("bad byte {v:?}"))
        })
        .collect::<Result<Vec<u8>>>()?;
    Ok((addr, bytes))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();
    let mut cfg = match &opts.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            SessionConfig::from_json(&text)?
        }
        None => SessionConfig::default(),
    };
    if let Some(arch) = opts.arch {
        cfg.arch = arch;
    }
    if opts.step_limit.is_some() {
        cfg.step_limit = opts.step_limit;
    }

    let source = std::fs::read_to_string(&opts.input)
        .with_context(|| format!("reading {}", opts.input.display()))?;
    let mut session = Session::new(cfg);
    session.set_source(&source);
    session.load_program();
    for spec in &opts.xmem {
        let (addr, bytes) = parse_xmem(spec)?;
        session.load_external_memory(addr, &bytes)?;
    }

    let outcome = session.run();
    match opts.format {
        Format::Text => {
            for entry in session.log() {
                println!("{}", entry.message);
            }
            println!("{}", session.snapshot());
        }
        Format::Json => {
            let report = Report {
                outcome,
                log: session.log(),
                state: session.snapshot(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xmem_spec() {
        let (addr, bytes) = parse_xmem("8500:3,4").unwrap();
        assert_eq!(addr, 0x8500);
        assert_eq!(bytes, vec![3, 4]);
        assert!(parse_xmem("8500").is_err());
        assert!(parse_xmem("10000:1").is_err());
        assert!(parse_xmem("0:100").is_err());
    }
}
