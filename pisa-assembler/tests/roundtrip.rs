//! Textual round-trip tests: parse → format → parse must be lossless.

use pisa_assembler::{parse_line, parse_program, write_program};

fn roundtrip(line: &str) {
    let instr = parse_line(line).unwrap();
    let formatted = instr.to_string();
    let reparsed = parse_line(&formatted).unwrap();
    assert_eq!(instr, reparsed, "reparse diverged for {line:?}");
    assert_eq!(formatted, parse_line(&formatted).unwrap().to_string());
}

#[test]
fn test_roundtrip_every_variant() {
    roundtrip("14, add, c_0_0, a_0_0, b_0_0, 1");
    roundtrip("14, sub, c_0_0, a_0_0, b_0_0, 0");
    roundtrip("14, mul, c_0_0, a_0_0, b_0_0, 2");
    roundtrip("14, mac, acc_0_0, a_0_0, b_0_0, 1");
    roundtrip("14, maci, acc_0_0, a_0_0, factor, 1");
    roundtrip("14, muli, c_0_0, a_0_0, factor, 1");
    roundtrip("14, copy, d_0_0, s_0_0");
    roundtrip("16, ntt, o_0_0_0, o_0_0_1, i_0_0_0, i_0_0_1, w_1_2_0, 1");
    roundtrip("16, intt, o_0_0_0, o_0_0_1, i_0_0_0, i_0_0_1, w_1_2_0, 1, 1");
}

#[test]
fn test_roundtrip_preserves_banks() {
    roundtrip("14, add, c_0_0 (1), a_0_0 (0), b_0_0 (1), 1");
}

#[test]
fn test_roundtrip_normalizes_whitespace() {
    let instr = parse_line("14,  add ,  c_0_0,a_0_0 , b_0_0,1").unwrap();
    assert_eq!(instr.to_string(), "14, add, c_0_0, a_0_0, b_0_0, 1");
}

#[test]
fn test_program_roundtrip_preserves_order() {
    let source = "\
14, mul, x_0_0, a_0_0, b_0_0, 0
14, mul, y_0_0, x_0_0, c_0_0, 0
14, add, z_0_0, y_0_0, b_0_0, 0
";
    let instructions = parse_program(source).unwrap();
    let emitted = write_program(&instructions);
    assert_eq!(emitted, source);
    assert_eq!(parse_program(&emitted).unwrap(), instructions);
}
