//! Instruction execution trace
//!
//! When tracing is enabled, every decoded instruction captures owned copies
//! of its input registers before execution and its output registers after.

use crate::multi_register::MultiRegister;
use pisa_spec::Instruction;

/// One captured instruction with its operand snapshots.
#[derive(Debug, Clone)]
pub struct InstructionTrace {
    instruction: Instruction,
    inputs: Vec<MultiRegister>,
    outputs: Vec<MultiRegister>,
}

impl InstructionTrace {
    pub fn new(instruction: Instruction) -> Self {
        InstructionTrace {
            instruction,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn instruction(&self) -> &Instruction {
        &self.instruction
    }

    pub fn inputs(&self) -> &[MultiRegister] {
        &self.inputs
    }

    pub fn set_inputs(&mut self, inputs: Vec<MultiRegister>) {
        self.inputs = inputs;
    }

    pub fn outputs(&self) -> &[MultiRegister] {
        &self.outputs
    }

    pub fn set_outputs(&mut self, outputs: Vec<MultiRegister>) {
        self.outputs = outputs;
    }

    /// Log the entry through the diagnostic sink, truncating each snapshot
    /// to `max_values` leading elements.
    pub fn log(&self, max_values: usize) {
        tracing::info!(instruction = %self.instruction, "trace entry");
        for (operand, values) in self.instruction.inputs.iter().zip(&self.inputs) {
            tracing::info!(
                location = operand.location(),
                values = %preview(values, max_values),
                "  input"
            );
        }
        for (operand, values) in self.instruction.outputs.iter().zip(&self.outputs) {
            tracing::info!(
                location = operand.location(),
                values = %preview(values, max_values),
                "  output"
            );
        }
    }
}

fn preview(register: &MultiRegister, max_values: usize) -> String {
    let shown: Vec<String> = register
        .data()
        .iter()
        .take(max_values)
        .map(|v| v.to_string())
        .collect();
    let suffix = if register.len() > max_values { ", .." } else { "" };
    format!("[{}{}]", shown.join(", "), suffix)
}
