//! P-ISA instruction set
//!
//! Every instruction is a uniform record over the closed opcode taxonomy.
//! The per-variant CSV layout is described by [`Opcode::schema`]; parsing and
//! emission both walk that field list, so the textual form round-trips.

use crate::error::PisaError;
use crate::operand::Operand;
use crate::wparam::WParam;
use crate::DEFAULT_GALOIS_ELEMENT;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of P-ISA operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Opcode {
    Add,
    Sub,
    Mul,
    Mac,
    Maci,
    Muli,
    Ntt,
    Intt,
    Copy,
}

/// One element of a variant's textual schema, in field order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Pmd,
    OpName,
    InputOperand,
    OutputOperand,
    /// Accumulator operand appearing in both the input and output lists.
    InputOutputOperand,
    Immediate,
    WParam,
    Residue,
    GaloisElement,
}

impl Opcode {
    pub const ALL: [Opcode; 9] = [
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Mac,
        Opcode::Maci,
        Opcode::Muli,
        Opcode::Ntt,
        Opcode::Intt,
        Opcode::Copy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Mul => "mul",
            Opcode::Mac => "mac",
            Opcode::Maci => "maci",
            Opcode::Muli => "muli",
            Opcode::Ntt => "ntt",
            Opcode::Intt => "intt",
            Opcode::Copy => "copy",
        }
    }

    /// CSV field layout for this variant.
    pub fn schema(&self) -> &'static [Field] {
        use Field::*;
        match self {
            Opcode::Add | Opcode::Sub | Opcode::Mul => &[
                Pmd,
                OpName,
                OutputOperand,
                InputOperand,
                InputOperand,
                Residue,
            ],
            Opcode::Mac => &[
                Pmd,
                OpName,
                InputOutputOperand,
                InputOperand,
                InputOperand,
                Residue,
            ],
            Opcode::Maci => &[
                Pmd,
                OpName,
                InputOutputOperand,
                InputOperand,
                Immediate,
                Residue,
            ],
            Opcode::Muli => &[Pmd, OpName, OutputOperand, InputOperand, Immediate, Residue],
            Opcode::Ntt => &[
                Pmd,
                OpName,
                OutputOperand,
                OutputOperand,
                InputOperand,
                InputOperand,
                WParam,
                Residue,
            ],
            Opcode::Intt => &[
                Pmd,
                OpName,
                OutputOperand,
                OutputOperand,
                InputOperand,
                InputOperand,
                WParam,
                Residue,
                GaloisElement,
            ],
            Opcode::Copy => &[Pmd, OpName, OutputOperand, InputOperand],
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Opcode {
    type Err = PisaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "add" => Ok(Opcode::Add),
            "sub" => Ok(Opcode::Sub),
            "mul" => Ok(Opcode::Mul),
            "mac" => Ok(Opcode::Mac),
            "maci" => Ok(Opcode::Maci),
            "muli" => Ok(Opcode::Muli),
            "ntt" => Ok(Opcode::Ntt),
            "intt" => Ok(Opcode::Intt),
            "copy" => Ok(Opcode::Copy),
            other => Err(PisaError::UnknownOpcode(other.to_string())),
        }
    }
}

/// A single P-ISA instruction.
///
/// The record is uniform across variants; which attributes are meaningful is
/// governed by the opcode's schema. Instructions are immutable after
/// construction apart from the late intermediate-rename pass, which rewrites
/// operand locations only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    pub inputs: Vec<Operand>,
    pub outputs: Vec<Operand>,
    /// log2 of the polynomial ring dimension
    pub pmd: u32,
    /// Index into the modulus chain
    pub residue: usize,
    /// Packed (residue, stage, block), ntt/intt only
    pub w_param: WParam,
    /// iNTT twiddle-table selector
    pub galois_element: u32,
    // Scheduling metadata
    pub group_id: u32,
    pub stage: u32,
    pub block: u32,
}

impl Instruction {
    /// Bare instruction for the given opcode; operands and attributes are
    /// filled by the parser or the per-variant constructors.
    pub fn new(opcode: Opcode) -> Self {
        Instruction {
            opcode,
            inputs: Vec::new(),
            outputs: Vec::new(),
            pmd: 0,
            residue: 0,
            w_param: WParam::default(),
            galois_element: DEFAULT_GALOIS_ELEMENT,
            group_id: 0,
            stage: 0,
            block: 0,
        }
    }

    fn binary(opcode: Opcode, pmd: u32, dst: Operand, src1: Operand, src2: Operand, residue: usize) -> Self {
        let mut instr = Instruction::new(opcode);
        instr.pmd = pmd;
        instr.outputs.push(dst);
        instr.inputs.push(src1);
        instr.inputs.push(src2);
        instr.residue = residue;
        instr
    }

    pub fn add(pmd: u32, dst: Operand, src1: Operand, src2: Operand, residue: usize) -> Self {
        Self::binary(Opcode::Add, pmd, dst, src1, src2, residue)
    }

    pub fn sub(pmd: u32, dst: Operand, src1: Operand, src2: Operand, residue: usize) -> Self {
        Self::binary(Opcode::Sub, pmd, dst, src1, src2, residue)
    }

    pub fn mul(pmd: u32, dst: Operand, src1: Operand, src2: Operand, residue: usize) -> Self {
        Self::binary(Opcode::Mul, pmd, dst, src1, src2, residue)
    }

    /// `dst = dst + src1*src2`; the accumulator joins both operand lists.
    pub fn mac(pmd: u32, accum: Operand, src1: Operand, src2: Operand, residue: usize) -> Self {
        let mut instr = Instruction::new(Opcode::Mac);
        instr.pmd = pmd;
        instr.outputs.push(accum.clone());
        instr.inputs.push(accum);
        instr.inputs.push(src1);
        instr.inputs.push(src2);
        instr.residue = residue;
        instr
    }

    /// `dst = dst + src1*imm`
    pub fn maci(pmd: u32, accum: Operand, src1: Operand, mut imm: Operand, residue: usize) -> Self {
        imm.set_immediate(true);
        let mut instr = Instruction::new(Opcode::Maci);
        instr.pmd = pmd;
        instr.outputs.push(accum.clone());
        instr.inputs.push(accum);
        instr.inputs.push(src1);
        instr.inputs.push(imm);
        instr.residue = residue;
        instr
    }

    /// `dst = src1*imm`
    pub fn muli(pmd: u32, dst: Operand, src1: Operand, mut imm: Operand, residue: usize) -> Self {
        imm.set_immediate(true);
        let mut instr = Instruction::new(Opcode::Muli);
        instr.pmd = pmd;
        instr.outputs.push(dst);
        instr.inputs.push(src1);
        instr.inputs.push(imm);
        instr.residue = residue;
        instr
    }

    pub fn copy(pmd: u32, dst: Operand, src: Operand) -> Self {
        let mut instr = Instruction::new(Opcode::Copy);
        instr.pmd = pmd;
        instr.outputs.push(dst);
        instr.inputs.push(src);
        instr
    }

    /// One forward-NTT stage over a half-block register pair.
    #[allow(clippy::too_many_arguments)]
    pub fn ntt(
        pmd: u32,
        dst_top: Operand,
        dst_bot: Operand,
        src_top: Operand,
        src_bot: Operand,
        w_param: WParam,
        residue: usize,
    ) -> Self {
        let mut instr = Instruction::new(Opcode::Ntt);
        instr.pmd = pmd;
        instr.outputs.push(dst_top);
        instr.outputs.push(dst_bot);
        instr.inputs.push(src_top);
        instr.inputs.push(src_bot);
        instr.w_param = w_param;
        instr.residue = residue;
        instr
    }

    /// One inverse-NTT stage over a half-block register pair.
    #[allow(clippy::too_many_arguments)]
    pub fn intt(
        pmd: u32,
        dst_top: Operand,
        dst_bot: Operand,
        src_top: Operand,
        src_bot: Operand,
        w_param: WParam,
        residue: usize,
        galois_element: u32,
    ) -> Self {
        let mut instr = Instruction::new(Opcode::Intt);
        instr.pmd = pmd;
        instr.outputs.push(dst_top);
        instr.outputs.push(dst_bot);
        instr.inputs.push(src_top);
        instr.inputs.push(src_bot);
        instr.w_param = w_param;
        instr.residue = residue;
        instr.galois_element = galois_element;
        instr
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut input_count = 0;
        let mut output_count = 0;
        for (element, field) in self.opcode.schema().iter().enumerate() {
            if element != 0 {
                write!(f, ", ")?;
            }
            match field {
                Field::Pmd => write!(f, "{}", self.pmd)?,
                Field::OpName => write!(f, "{}", self.opcode)?,
                Field::OutputOperand => {
                    write!(f, "{}", self.outputs[output_count])?;
                    output_count += 1;
                }
                Field::InputOperand | Field::Immediate => {
                    write!(f, "{}", self.inputs[input_count])?;
                    input_count += 1;
                }
                Field::InputOutputOperand => {
                    write!(f, "{}", self.outputs[output_count])?;
                    output_count += 1;
                    input_count += 1;
                }
                Field::WParam => write!(f, "{}", self.w_param)?,
                Field::Residue => write!(f, "{}", self.residue)?,
                Field::GaloisElement => write!(f, "{}", self.galois_element)?,
            }
        }
        Ok(())
    }
}
