use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use serde::Serialize;

use asmsim::{assemble, Arch, Assembly, DisasmLine, Disassembly};
use asmsim_disasm::{load_raw_bin, parse_addr};

#[derive(Parser, Debug)]
#[command(author, version, about = "8086 / 8051 disassembler CLI", long_about = None)]
struct Cli {
    /// Instruction set of the input
    #[arg(short, long, value_enum, default_value_t = Arch::I8086)]
    arch: Arch,
    /// Output format: text or json
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Disassemble a range [start, end) of a raw binary
    Range {
        /// Input binary path
        #[arg(value_name = "BINFILE")]
        input: PathBuf,
        /// Start address (hex or dec)
        start: String,
        /// End address (hex or dec, exclusive)
        end: String,
        /// Load address for the binary
        #[arg(long, default_value_t = 0u32)]
        base: u32,
        /// Skip N bytes at start of file before loading
        #[arg(long, default_value_t = 0usize)]
        skip: usize,
        /// Limit bytes loaded (default: to EOF after --skip)
        #[arg(long)]
        len: Option<usize>,
        /// Show instruction bytes
        #[arg(long)]
        show_bytes: bool,
        /// Write output to file instead of stdout
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Assemble a source file and list the bytes with their disassembly
    Listing {
        #[arg(value_name = "ASMFILE")]
        input: PathBuf,
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Serialize)]
struct RangeReport<'a> {
    arch: Arch,
    start: u32,
    end: u32,
    lines: &'a [DisasmLine],
}

#[derive(Debug, Serialize)]
struct ListingReport<'a> {
    assembly: &'a Assembly,
    disassembly: &'a [DisasmLine],
}

fn render(lines: &[DisasmLine], show_bytes: bool) -> String {
    let mut buf = String::new();
    for l in lines {
        let _ = write!(buf, "{:#06x}: ", l.address);
        if show_bytes {
            let hex: Vec<String> = l.bytes.iter().map(|b| format!("{b:02x}")).collect();
            let _ = write!(buf, "{:<12}  ", hex.join(" "));
        }
        let _ = writeln!(buf, "{}", l.text());
    }
    buf
}

fn emit(out: Option<&Path>, text: String) -> Result<()> {
    match out {
        Some(path) => std::fs::write(path, text)?,
        None => print!("{text}"),
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Range {
            input,
            start,
            end,
            base,
            skip,
            len,
            show_bytes,
            out,
        } => {
            let img = load_raw_bin(&input, base, skip, len)?;
            let start = parse_addr(&start)?;
            let end = parse_addr(&end)?;
            anyhow::ensure!(end >= start, "end must be >= start");
            let window = img
                .window(start, end)
                .ok_or_else(|| anyhow::anyhow!("{start:#x} is outside the image"))?;
            let lines: Vec<DisasmLine> = Disassembly::new(window, cli.arch)
                .map(|mut l| {
                    l.address += start;
                    l
                })
                .collect();
            let text = match cli.format {
                OutputFormat::Text => render(&lines, show_bytes),
                OutputFormat::Json => {
                    let report = RangeReport {
                        arch: cli.arch,
                        start,
                        end,
                        lines: &lines,
                    };
                    serde_json::to_string_pretty(&report)? + "\n"
                }
            };
            emit(out.as_deref(), text)?;
        }
        Command::Listing { input, out } => {
            let source = std::fs::read_to_string(&input)?;
            let asm = assemble(&source, cli.arch);
            for err in &asm.errors {
                eprintln!("error: {err}");
            }
            let lines: Vec<DisasmLine> = Disassembly::new(&asm.bytes, cli.arch).collect();
            let text = match cli.format {
                OutputFormat::Text => {
                    let mut buf = asm.listing();
                    buf.push_str("\n; disassembly\n");
                    buf.push_str(&render(&lines, true));
                    buf
                }
                OutputFormat::Json => {
                    let report = ListingReport {
                        assembly: &asm,
                        disassembly: &lines,
                    };
                    serde_json::to_string_pretty(&report)? + "\n"
                }
            };
            emit(out.as_deref(), text)?;
        }
    }
    Ok(())
}
