use std::fmt;

use serde::{Deserialize, Serialize};

/// One source line split into a mnemonic and its raw operand strings.
///
/// Operands keep the user's spelling (`#imm`, `@DPTR`, `AX`); each
/// architecture decides what they mean.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub mnemonic: String,
    pub operands: Vec<String>,
    /// 1-based line in the source text, when parsed from a file.
    pub line: Option<usize>,
}

impl Instruction {
    pub fn new(mnemonic: &str, operands: &[&str]) -> Self {
        Self {
            mnemonic: mnemonic.to_ascii_uppercase(),
            operands: operands.iter().map(|s| s.to_string()).collect(),
            line: None,
        }
    }

    pub fn operand(&self, idx: usize) -> Option<&str> {
        self.operands.get(idx).map(String::as_str)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.operands.is_empty() {
            write!(f, "{}", self.mnemonic)
        } else {
            write!(f, "{} {}", self.mnemonic, self.operands.join(", "))
        }
    }
}

fn strip_comment(line: &str) -> &str {
    let cut = [line.find(';'), line.find("//")]
        .into_iter()
        .flatten()
        .min();
    match cut {
        Some(p) => &line[..p],
        None => line,
    }
}

/// Split one line of assembly. Blank and comment-only lines give `None`.
pub fn parse_line(text: &str) -> Option<Instruction> {
    let s = strip_comment(text).trim();
    if s.is_empty() {
        return None;
    }
    let mut parts = s.split_whitespace();
    let mnemonic = parts.next()?.to_ascii_uppercase();
    let rest = parts.collect::<Vec<_>>().join(" ");
    let operands = rest
        .split(',')
        .map(str::trim)
        .filter(|op| !op.is_empty())
        .map(str::to_string)
        .collect();
    Some(Instruction {
        mnemonic,
        operands,
        line: None,
    })
}

/// Parse every line of `source`, tagging instructions with their line number.
pub fn parse_source(source: &str) -> Vec<Instruction> {
    source
        .lines()
        .enumerate()
        .filter_map(|(i, line)| {
            parse_line(line).map(|mut inst| {
                inst.line = Some(i + 1);
                inst
            })
        })
        .collect()
}
