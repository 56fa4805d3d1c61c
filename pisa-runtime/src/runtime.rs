//! Program runtime
//!
//! Orchestration over the functional model: load the execution context,
//! partition program inputs into device registers, run the instruction
//! stream linearly or layer by layer, and read results back for validation.

use crate::data::ProgramData;
use crate::engine::{FunctionalModel, TwiddleMap};
use crate::error::{Result, RuntimeError};
use crate::multi_register::MultiRegister;
use crate::validate::ValidationReport;
use pisa_spec::{Instruction, Word, DEFAULT_REGISTER_WIDTH};

/// Number of leading snapshot values shown when a trace is flushed.
const TRACE_PREVIEW_VALUES: usize = 10;

#[derive(Debug, Default)]
pub struct ProgramRuntime {
    model: FunctionalModel,
    debug_mode: bool,
}

impl ProgramRuntime {
    pub fn new() -> Self {
        Self::with_register_width(DEFAULT_REGISTER_WIDTH)
    }

    pub fn with_register_width(register_width: usize) -> Self {
        ProgramRuntime {
            model: FunctionalModel::with_register_width(register_width),
            debug_mode: false,
        }
    }

    pub fn model(&self) -> &FunctionalModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut FunctionalModel {
        &mut self.model
    }

    /// Debug mode records an execution trace and flushes it when a fatal
    /// error interrupts the program.
    pub fn debug_mode(&self) -> bool {
        self.debug_mode
    }

    pub fn set_debug_mode(&mut self, enabled: bool) {
        self.debug_mode = enabled;
    }

    pub fn set_modulus_chain(&mut self, chain: Vec<Word>) {
        self.model.set_modulus_chain(chain);
    }

    pub fn set_ntt_twiddle_factors(&mut self, twiddle: Vec<Vec<Word>>) {
        self.model.set_twiddle_ntt(twiddle);
    }

    pub fn set_intt_twiddle_factors(&mut self, twiddle: TwiddleMap) {
        self.model.set_twiddle_intt(twiddle);
    }

    /// Load a complete execution context from a data file: modulus chain,
    /// twiddle tables, program inputs, and immediates.
    pub fn load_data(&mut self, data: &ProgramData) -> Result<()> {
        self.set_modulus_chain(data.modulus_chain.clone());
        self.set_ntt_twiddle_factors(data.twiddles.ntt.clone());
        self.set_intt_twiddle_factors(
            data.twiddles
                .intt
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        );
        for (root, values) in &data.inputs {
            self.set_param_memory(root, values)?;
        }
        for (name, &value) in &data.immediates {
            self.set_immediate(name, value);
        }
        Ok(())
    }

    /// Partition a 2-param input vector into W-wide device slices
    /// `root_<k>`. Fails when the vector is not a multiple of W.
    pub fn set_param_memory(&mut self, root: &str, values: &[Word]) -> Result<()> {
        let width = self.model.register_width();
        if values.len() % width != 0 {
            return Err(RuntimeError::UnevenInput {
                name: root.to_string(),
                len: values.len(),
                width,
            });
        }

        for (slice, chunk) in values.chunks(width).enumerate() {
            let address = format!("{root}_{slice}");
            self.model
                .memory_mut()
                .write(&address, MultiRegister::from(chunk.to_vec()));
        }
        Ok(())
    }

    /// Width-1 register holding an immediate value.
    pub fn set_immediate(&mut self, name: &str, value: Word) {
        self.model
            .memory_mut()
            .write(name, MultiRegister::from(vec![value]));
    }

    /// Execute the stream in input order. In debug mode the execution trace
    /// is captured and, on a fatal error, flushed before the error is
    /// re-raised.
    pub fn execute_program(&mut self, instructions: &[Instruction]) -> Result<()> {
        if self.debug_mode {
            self.model.enable_execution_trace();
        }

        let result = instructions
            .iter()
            .try_for_each(|instr| self.model.decode(instr));

        if self.debug_mode {
            self.model.stop_execution_trace();
            if let Err(ref err) = result {
                tracing::error!(error = %err, "dumping execution log");
                self.model.flush_execution_trace(TRACE_PREVIEW_VALUES);
                tracing::error!("execution log dump finished");
            } else {
                self.model.flush_execution_trace(TRACE_PREVIEW_VALUES);
            }
        }

        result
    }

    /// Execute layer by layer. Instructions within a layer are mutually
    /// independent, so any sequential order of a layer is a valid
    /// interleaving.
    pub fn execute_layers(&mut self, layers: &[Vec<Instruction>]) -> Result<()> {
        for layer in layers {
            for instr in layer {
                self.model.decode(instr)?;
            }
        }
        Ok(())
    }

    /// Reassemble a 2-param vector from its device slices, sorted by the
    /// trailing slice index.
    pub fn get_param_memory(&mut self, root: &str) -> Result<Vec<Word>> {
        let names = self.model.matching_3param_register_names(root);
        let start = root.len() + 1;

        let mut indexed: Vec<(usize, String)> = Vec::with_capacity(names.len());
        for name in names {
            let index: usize = name[start..].parse().map_err(|_| {
                RuntimeError::Other(format!("register {name} has a non-numeric slice suffix"))
            })?;
            indexed.push((index, name));
        }
        indexed.sort();

        let mut combined = Vec::new();
        for (_, name) in indexed {
            combined.extend_from_slice(self.model.memory_mut().read(&name).data());
        }
        Ok(combined)
    }

    /// Compare every declared output (and optionally intermediate) against
    /// the expected vectors.
    pub fn validate(
        &mut self,
        data: &ProgramData,
        verbose: bool,
        include_intermediates: bool,
    ) -> Result<ValidationReport> {
        let mut report = ValidationReport::default();
        for (root, expected) in &data.outputs {
            let actual = self.get_param_memory(root)?;
            report.compare(root, expected, &actual, verbose);
        }
        if include_intermediates {
            for (root, expected) in &data.intermediates {
                let actual = self.get_param_memory(root)?;
                report.compare(root, expected, &actual, verbose);
            }
        }
        Ok(report)
    }
}
