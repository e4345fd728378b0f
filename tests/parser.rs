use asmsim::parser::{parse_line, parse_source};
use asmsim::Instruction;
use pretty_assertions::assert_eq;

#[test]
fn operands_keep_their_raw_spelling() {
    let inst = parse_line("movx @dptr, a").unwrap();
    assert_eq!(inst.mnemonic, "MOVX");
    assert_eq!(inst.operands, vec!["@dptr", "a"]);

    let inst = parse_line("MOV A, #03H   ; load three").unwrap();
    assert_eq!(inst.operands, vec!["A", "#03H"]);
}

#[test]
fn comment_forms() {
    assert_eq!(parse_line(";MOV AX, 1"), None);
    assert_eq!(parse_line("// MOV AX, 1"), None);
    let inst = parse_line("INC AX // bump").unwrap();
    assert_eq!(inst, Instruction::new("INC", &["AX"]));
}

#[test]
fn mnemonic_only_lines() {
    let inst = parse_line("  hlt  ").unwrap();
    assert_eq!(inst.mnemonic, "HLT");
    assert!(inst.operands.is_empty());
}

#[test]
fn source_line_numbers_skip_blank_lines() {
    let src = "; Example 8086 Assembly Code\nMOV AX, 10\n\nMOV BX, 20\nADD AX, BX\n";
    let lines: Vec<Option<usize>> = parse_source(src).iter().map(|i| i.line).collect();
    assert_eq!(lines, vec![Some(2), Some(4), Some(5)]);
}
