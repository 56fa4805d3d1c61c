//! CSV instruction parser
//!
//! Parses comma-separated P-ISA lines against the per-variant schema in
//! [`Opcode::schema`]. Whitespace around fields is trimmed; the opcode sits
//! at field index 1 in every variant.

use crate::error::{ParseError, Result};
use pisa_spec::{Field, Instruction, Opcode, Operand, PisaError, WParam};

/// Field index of the opcode in every schema.
const OP_CODE_FIELD: usize = 1;

/// Parse one CSV instruction line.
pub fn parse_line(line: &str) -> std::result::Result<Instruction, PisaError> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();

    let opcode: Opcode = fields
        .get(OP_CODE_FIELD)
        .copied()
        .unwrap_or_default()
        .parse()?;

    let schema = opcode.schema();
    if fields.len() != schema.len() {
        return Err(PisaError::FieldCountMismatch {
            opcode: opcode.as_str().to_string(),
            expected: schema.len(),
            found: fields.len(),
        });
    }

    let mut instr = Instruction::new(opcode);
    for (field, text) in schema.iter().zip(fields) {
        parse_field(*field, text, &mut instr)?;
    }
    Ok(instr)
}

fn parse_field(field: Field, text: &str, instr: &mut Instruction) -> std::result::Result<(), PisaError> {
    let number = |name: &str| -> std::result::Result<u64, PisaError> {
        text.parse::<u64>().map_err(|e| PisaError::InvalidNumber {
            field: name.to_string(),
            source: e,
        })
    };

    match field {
        Field::Pmd => instr.pmd = number("pmd")? as u32,
        Field::OpName => {} // already decoded for dispatch
        Field::InputOperand => instr.inputs.push(Operand::parse(text)?),
        Field::OutputOperand => instr.outputs.push(Operand::parse(text)?),
        Field::InputOutputOperand => {
            let op = Operand::parse(text)?;
            instr.inputs.push(op.clone());
            instr.outputs.push(op);
        }
        Field::Immediate => {
            let mut op = Operand::parse(text)?;
            op.set_immediate(true);
            instr.inputs.push(op);
        }
        Field::WParam => instr.w_param = text.parse::<WParam>()?,
        Field::Residue => instr.residue = number("residue")? as usize,
        Field::GaloisElement => instr.galois_element = number("galois_element")? as u32,
    }
    Ok(())
}

/// Parse a whole instruction stream, one instruction per line. Blank lines
/// are skipped; trailing carriage returns are tolerated.
pub fn parse_program(source: &str) -> Result<Vec<Instruction>> {
    let mut instructions = Vec::new();
    for (number, line) in source.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let instr = parse_line(line).map_err(|source| ParseError::Malformed {
            line: number + 1,
            source,
        })?;
        instructions.push(instr);
    }
    tracing::debug!(count = instructions.len(), "parsed instruction stream");
    Ok(instructions)
}

/// Parse an instruction stream from a file.
pub fn parse_file(path: impl AsRef<std::path::Path>) -> Result<Vec<Instruction>> {
    let source = std::fs::read_to_string(path)?;
    parse_program(&source)
}

/// Emit an instruction stream in its textual form, one line per instruction.
pub fn write_program(instructions: &[Instruction]) -> String {
    let mut out = String::new();
    for instr in instructions {
        out.push_str(&instr.to_string());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_add() {
        let instr = parse_line("14, add, c_0_0, a_0_0, b_0_0, 1").unwrap();
        assert_eq!(instr.opcode, Opcode::Add);
        assert_eq!(instr.pmd, 14);
        assert_eq!(instr.residue, 1);
        assert_eq!(instr.outputs[0].location(), "c_0_0");
        assert_eq!(instr.inputs[0].location(), "a_0_0");
        assert_eq!(instr.inputs[1].location(), "b_0_0");
    }

    #[test]
    fn test_parse_mac_duplicates_accumulator() {
        let instr = parse_line("14, mac, acc_0_0, a_0_0, b_0_0, 0").unwrap();
        assert_eq!(instr.num_inputs(), 3);
        assert_eq!(instr.num_outputs(), 1);
        assert_eq!(instr.inputs[0].location(), "acc_0_0");
        assert_eq!(instr.outputs[0].location(), "acc_0_0");
    }

    #[test]
    fn test_parse_maci_flags_immediate() {
        let instr = parse_line("14, maci, acc_0_0, a_0_0, factor, 2").unwrap();
        assert!(instr.inputs[2].is_immediate());
        assert_eq!(instr.inputs[2].location(), "factor");
    }

    #[test]
    fn test_parse_ntt_wparam() {
        let instr =
            parse_line("16, ntt, o_0, o_1, i_0, i_1, w_2_3_1, 2").unwrap();
        assert_eq!(instr.opcode, Opcode::Ntt);
        assert_eq!(instr.w_param, WParam::new(2, 3, 1));
        assert_eq!(instr.num_outputs(), 2);
        assert_eq!(instr.num_inputs(), 2);
    }

    #[test]
    fn test_parse_intt_galois_element() {
        let instr =
            parse_line("16, intt, o_0, o_1, i_0, i_1, w_0_1_0, 0, 3").unwrap();
        assert_eq!(instr.galois_element, 3);
    }

    #[test]
    fn test_parse_bank_suffix() {
        let instr = parse_line("14, copy, d_0_0 (1), s_0_0 (0)").unwrap();
        assert_eq!(instr.outputs[0].location(), "d_0_0");
        assert_eq!(instr.outputs[0].bank(), Some(1));
        assert_eq!(instr.inputs[0].bank(), Some(0));
    }

    #[test]
    fn test_parse_rejects_unknown_opcode() {
        assert!(matches!(
            parse_line("14, xor, a, b, c, 0"),
            Err(PisaError::UnknownOpcode(_))
        ));
    }

    #[test]
    fn test_parse_rejects_field_count() {
        assert!(matches!(
            parse_line("14, add, c, a, 0"),
            Err(PisaError::FieldCountMismatch { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_non_numeric_residue() {
        assert!(matches!(
            parse_line("14, add, c, a, b, q"),
            Err(PisaError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_parse_program_skips_blank_lines_and_cr() {
        let text = "14, add, c, a, b, 0\r\n\n14, copy, d, c\r\n";
        let instructions = parse_program(text).unwrap();
        assert_eq!(instructions.len(), 2);
        assert_eq!(instructions[1].opcode, Opcode::Copy);
    }

    #[test]
    fn test_parse_program_reports_line_numbers() {
        let text = "14, add, c, a, b, 0\n14, bogus, c, a\n";
        match parse_program(text) {
            Err(ParseError::Malformed { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected malformed error, got {other:?}"),
        }
    }
}
